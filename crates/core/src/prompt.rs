use crate::models::{AssembledContext, ContextKind, UNKNOWN_ANSWER};

/// Builds the generator prompt for an assembled context.
///
/// Returns `None` for [`ContextKind::None`]: there is nothing to ground an
/// answer on and the generator must not be called.
pub fn build_prompt(question: &str, context: &AssembledContext) -> Option<String> {
    let instructions = match context.kind {
        ContextKind::Targeted => format!(
            "You are a helpful assistant. Answer the question using only the context below.\n\
             If the answer is not in the context, reply exactly \"{UNKNOWN_ANSWER}\""
        ),
        ContextKind::Fallback => format!(
            "You are a helpful assistant. No passage matched the question directly, so the \
             context below is a broad sample of the uploaded documents.\n\
             You may summarize this material to answer broad questions such as \
             \"what is this document about?\".\n\
             If the question cannot be answered from it, reply exactly \"{UNKNOWN_ANSWER}\""
        ),
        ContextKind::None => return None,
    };

    Some(format!(
        "{instructions}\n\nContext:\n{}\n\nQuestion: {}\nAnswer:",
        context.text,
        question.trim()
    ))
}
