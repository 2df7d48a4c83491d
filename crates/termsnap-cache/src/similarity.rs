//! Text normalization and the bounded similarity used for keyword hits.

use std::collections::HashSet;

/// Trim and collapse runs of whitespace to a single space.
pub fn normalize_input(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-set Jaccard similarity in `[0, 1]`.
///
/// Tokens are the lower-cased, whitespace-separated words of each text.
/// Two texts with no tokens at all are identical (`1.0`).
pub fn jaccard_similarity(a: &str, b: &str) -> f32 {
    let left = token_set(a);
    let right = token_set(b);

    if left.is_empty() && right.is_empty() {
        return 1.0;
    }

    let intersection = left.intersection(&right).count();
    let union = left.union(&right).count();
    intersection as f32 / union as f32
}

fn token_set(text: &str) -> HashSet<String> {
    text.split_whitespace().map(str::to_lowercase).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_input() {
        assert_eq!(normalize_input("  restart   nginx\t now \n"), "restart nginx now");
        assert_eq!(normalize_input("   "), "");
    }

    #[test]
    fn test_identical_token_sets() {
        assert_eq!(jaccard_similarity("List Files", "files list"), 1.0);
        assert_eq!(jaccard_similarity("a a b", "b a"), 1.0);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(jaccard_similarity("", ""), 1.0);
        assert_eq!(jaccard_similarity("", "ls"), 0.0);
    }

    #[test]
    fn test_partial_overlap() {
        let sim = jaccard_similarity("list all files in home directory", "show me all files in home");
        assert!((sim - 0.5).abs() < 1e-6);

        // The typo shares only one of three distinct tokens.
        let sim = jaccard_similarity("restart ngin", "restart nginx");
        assert!((sim - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint() {
        assert_eq!(jaccard_similarity("df -h", "uptime"), 0.0);
    }
}
