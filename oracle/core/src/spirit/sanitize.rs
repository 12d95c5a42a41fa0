//! Answer sanitizer
//!
//! Models ramble. The board can only show `YES`, `NO`, `GOOD BYE` or a single
//! run of `A`-`Z`/`0`-`9`, so raw output is folded into one of those.

use crate::board::symbols;

/// Shown when nothing usable survives sanitizing
pub const SILENCE: &str = "SILENCE";

/// Fold raw model output into something the board can spell
///
/// Rules, in order:
/// 1. Upper-case and trim.
/// 2. Anything mentioning `GOOD BYE` is `GOOD BYE`.
/// 3. Exactly `YES` or `NO` pass through.
/// 4. Drop everything but `A`-`Z`, `0`-`9` and whitespace, keep the first
///    word.
/// 5. Nothing left is [`SILENCE`].
#[must_use]
pub fn sanitize_answer(raw: &str) -> String {
    let upper = raw.to_uppercase();
    let text = upper.trim();

    if text.contains(symbols::GOOD_BYE) {
        return symbols::GOOD_BYE.to_string();
    }
    if text == symbols::YES || text == symbols::NO {
        return text.to_string();
    }

    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c.is_whitespace())
        .collect();

    cleaned
        .split_whitespace()
        .next()
        .map_or_else(|| SILENCE.to_string(), str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_answers() {
        assert_eq!(sanitize_answer("  yes "), "YES");
        assert_eq!(sanitize_answer("No"), "NO");
        assert_eq!(sanitize_answer("I must say good bye now."), "GOOD BYE");
    }

    #[test]
    fn test_first_word_survives() {
        assert_eq!(sanitize_answer("Blood, and bone."), "BLOOD");
        assert_eq!(sanitize_answer("1776!"), "1776");
        assert_eq!(sanitize_answer("yes indeed"), "YES");
    }

    #[test]
    fn test_punctuation_inside_word_is_removed() {
        assert_eq!(sanitize_answer("don't"), "DONT");
        assert_eq!(sanitize_answer("\"NO.\""), "NO");
    }

    #[test]
    fn test_leading_symbols_do_not_swallow_the_word() {
        assert_eq!(sanitize_answer("... whisper"), "WHISPER");
        assert_eq!(sanitize_answer("yes\nno"), "YES");
    }

    #[test]
    fn test_degenerate_output_is_silence() {
        assert_eq!(sanitize_answer(""), SILENCE);
        assert_eq!(sanitize_answer("   "), SILENCE);
        assert_eq!(sanitize_answer("?!…"), SILENCE);
        assert_eq!(sanitize_answer("日本"), SILENCE);
    }
}
