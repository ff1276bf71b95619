pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

pub trait Embedder {
    fn dimensions(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Feature-hashed character trigrams over lowercased words.
///
/// Every word is padded with spaces so that prefixes and suffixes get their
/// own trigrams; the resulting vector is L2-normalised. Blank text embeds to
/// the zero vector.
#[derive(Debug, Clone, Copy)]
pub struct TrigramEmbedder {
    pub dimensions: usize,
}

impl Default for TrigramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl Embedder for TrigramEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let buckets = vector.len() as u64;

        for word in text.split_whitespace() {
            let padded = format!(" {} ", word.to_lowercase())
                .chars()
                .collect::<Vec<_>>();
            for window in padded.windows(3) {
                let mut hash = FNV_OFFSET;
                for ch in window {
                    hash ^= *ch as u64;
                    hash = hash.wrapping_mul(FNV_PRIME);
                }
                vector[(hash % buckets) as usize] += 1.0;
            }
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            vector.iter_mut().for_each(|value| *value /= magnitude);
        }
        vector
    }
}

/// Cosine similarity; zero when either side has no magnitude.
pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot = left.iter().zip(right).map(|(a, b)| a * b).sum::<f32>();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}
