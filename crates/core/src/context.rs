use crate::models::{AssembledContext, AssemblyOptions, ContextKind, RetrievedMatch};

/// Builds the context handed to the generator and classifies it.
///
/// Any targeted match makes the context targeted. Only when there are none
/// are up to `fallback_limit` broad matches used. Each included match is cut
/// to `per_chunk_char_limit` characters.
pub fn assemble_context(
    matches: &[RetrievedMatch],
    fallback_matches: &[RetrievedMatch],
    options: &AssemblyOptions,
) -> AssembledContext {
    if !matches.is_empty() {
        return AssembledContext {
            text: join_truncated(matches, options.per_chunk_char_limit, &options.targeted_separator),
            kind: ContextKind::Targeted,
            included: matches.len(),
        };
    }

    if !fallback_matches.is_empty() {
        let sample = &fallback_matches[..fallback_matches.len().min(options.fallback_limit)];
        return AssembledContext {
            text: join_truncated(sample, options.per_chunk_char_limit, &options.fallback_separator),
            kind: ContextKind::Fallback,
            included: sample.len(),
        };
    }

    AssembledContext::empty()
}

fn join_truncated(matches: &[RetrievedMatch], per_chunk_char_limit: usize, separator: &str) -> String {
    matches
        .iter()
        .map(|item| truncate_chars(&item.text, per_chunk_char_limit))
        .collect::<Vec<_>>()
        .join(separator)
}

pub fn truncate_chars(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((byte, _)) => &text[..byte],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieved(texts: &[&str]) -> Vec<RetrievedMatch> {
        texts
            .iter()
            .enumerate()
            .map(|(rank, text)| RetrievedMatch {
                text: text.to_string(),
                score: 1.0 - rank as f32 * 0.1,
                rank,
                source_id: "doc.pdf".to_string(),
                sequence_index: rank,
            })
            .collect()
    }

    #[test]
    fn targeted_context_truncates_each_match() {
        let long = "x".repeat(900);
        let matches = retrieved(&[long.as_str(), long.as_str(), long.as_str()]);
        let options = AssemblyOptions::default();

        let context = assemble_context(&matches, &[], &options);

        assert_eq!(context.kind, ContextKind::Targeted);
        assert_eq!(context.included, 3);
        assert!(context.text.chars().count() <= 1200 + 2 * options.targeted_separator.len());
        assert_eq!(context.text.split("\n\n").count(), 3);
        assert!(context.text.split("\n\n").all(|piece| piece.len() == 400));
    }

    #[test]
    fn targeted_matches_keep_rank_order_and_ignore_fallback() {
        let matches = retrieved(&["first", "second"]);
        let fallback = retrieved(&["broad"]);

        let context = assemble_context(&matches, &fallback, &AssemblyOptions::default());

        assert_eq!(context.text, "first\n\nsecond");
        assert_eq!(context.kind, ContextKind::Targeted);
    }

    #[test]
    fn nothing_retrieved_is_classified_none() {
        let context = assemble_context(&[], &[], &AssemblyOptions::default());

        assert_eq!(context.kind, ContextKind::None);
        assert!(context.text.is_empty());
        assert_eq!(context.included, 0);
        assert!(!context.is_answerable());
    }

    #[test]
    fn fallback_is_capped_and_space_joined() {
        let texts = (0..10).map(|i| format!("part{i}")).collect::<Vec<_>>();
        let fallback = retrieved(&texts.iter().map(String::as_str).collect::<Vec<_>>());

        let context = assemble_context(&[], &fallback, &AssemblyOptions::default());

        assert_eq!(context.kind, ContextKind::Fallback);
        assert_eq!(context.included, 8);
        assert_eq!(
            context.text,
            "part0 part1 part2 part3 part4 part5 part6 part7"
        );
    }

    #[test]
    fn blank_targeted_matches_still_classify_as_targeted() {
        let matches = retrieved(&["   ", ""]);
        let fallback = retrieved(&["summary material"]);

        let context = assemble_context(&matches, &fallback, &AssemblyOptions::default());

        assert_eq!(context.kind, ContextKind::Targeted);
        assert_eq!(context.included, 2);
        assert_eq!(context.text, "   \n\n");
        assert!(context.is_answerable());
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("größer", 3), "grö");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("abc", 0), "");
    }

    #[test]
    fn custom_limits_apply() {
        let options = AssemblyOptions {
            per_chunk_char_limit: 2,
            fallback_limit: 1,
            ..AssemblyOptions::default()
        };
        let fallback = retrieved(&["abcdef", "ghijkl"]);

        let context = assemble_context(&[], &fallback, &options);

        assert_eq!(context.text, "ab");
        assert_eq!(context.included, 1);
    }
}
