//! Shared comment-stripping pass, applied before any extractor's pattern
//! matching, so TODOs/docstrings/disabled code never produce a match.

use once_cell::sync::Lazy;
use regex::Regex;

static LINE_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"//[^\n]*").unwrap());
static BLOCK_COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/").unwrap());

/// Removes single-line and block comments so TODOs, docstrings, and disabled
/// code cannot produce a pattern match (§4.4 rule 3). Preserves line breaks
/// inside block comments by replacing with an equal number of newlines, so
/// downstream line numbers stay accurate.
pub fn strip_comments(text: &str) -> String {
    let without_block = BLOCK_COMMENT.replace_all(text, |caps: &regex::Captures| {
        caps.get(0)
            .unwrap()
            .as_str()
            .chars()
            .map(|c| if c == '\n' { '\n' } else { ' ' })
            .collect::<String>()
    });
    LINE_COMMENT.replace_all(&without_block, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_line_and_block_comments() {
        let src = "const x = 1; // TODO: handleStripeWebhook\n/* block\n comment */ const y = 2;";
        let stripped = strip_comments(src);
        assert!(!stripped.contains("handleStripeWebhook"));
        assert!(!stripped.contains("block"));
        assert!(stripped.contains("const y = 2;"));
    }

    #[test]
    fn preserves_line_count_across_block_comments() {
        let src = "a\n/* x\ny\nz */\nb";
        let stripped = strip_comments(src);
        assert_eq!(stripped.lines().count(), src.lines().count());
    }
}
