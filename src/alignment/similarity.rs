/*!
 * Paragraph similarity.
 *
 * Normalized Levenshtein ratio in [0, 1], case-insensitive. Short paragraphs
 * are compared character by character; long ones word by word, which keeps
 * the quadratic cost bounded for chapter-sized text.
 */

/// Paragraph length (in characters) up to which character-level distance is used
pub const DEFAULT_CHAR_LEVEL_LIMIT: usize = 200;

/// Similarity scorer for paragraph pairs
#[derive(Debug, Clone)]
pub struct ParagraphMatcher {
    char_level_limit: usize,
}

impl Default for ParagraphMatcher {
    fn default() -> Self {
        Self {
            char_level_limit: DEFAULT_CHAR_LEVEL_LIMIT,
        }
    }
}

impl ParagraphMatcher {
    pub fn new(char_level_limit: usize) -> Self {
        Self { char_level_limit }
    }

    /// Similarity between two paragraphs (0.0-1.0)
    pub fn similarity(&self, a: &str, b: &str) -> f32 {
        let a_lower = a.trim().to_lowercase();
        let b_lower = b.trim().to_lowercase();

        if a_lower.is_empty() && b_lower.is_empty() {
            return 1.0;
        }
        if a_lower.is_empty() || b_lower.is_empty() {
            return 0.0;
        }

        let a_chars: Vec<char> = a_lower.chars().collect();
        let b_chars: Vec<char> = b_lower.chars().collect();

        if a_chars.len() <= self.char_level_limit && b_chars.len() <= self.char_level_limit {
            return ratio(&a_chars, &b_chars);
        }

        let a_words: Vec<&str> = a_lower.split_whitespace().collect();
        let b_words: Vec<&str> = b_lower.split_whitespace().collect();
        ratio(&a_words, &b_words)
    }
}

fn ratio<T: PartialEq>(a: &[T], b: &[T]) -> f32 {
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(a, b) as f32 / max_len as f32)
}

/// Levenshtein distance between two token sequences
pub fn levenshtein_distance<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows are enough
    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row: Vec<usize> = vec![0; b.len() + 1];

    for (i, a_item) in a.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_item) in b.iter().enumerate() {
            let cost = usize::from(a_item != b_item);
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b.len()]
}
