// Dungeon Oracle — Text Sanitizer
//
// Generated replies may carry an "achievement box":
//
//   🏆 ACHIEVEMENT UNLOCKED: <title>
//   …
//   Reward: <reward>
//
// That markup must never be replayed into future prompts, so every text on
// its way into memory, the active-quest slot or prompt context goes through
// `clean_text()` first.

use regex::Regex;
use std::sync::LazyLock;

static ACHIEVEMENT_BOX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)🏆\s*ACHIEVEMENT UNLOCKED:[\s\S]*?Reward:[^\n]*(?:\n|$)")
        .expect("achievement box pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Strip achievement boxes and collapse all whitespace runs to one space.
pub fn clean_text(raw: &str) -> String {
    let stripped = ACHIEVEMENT_BOX.replace_all(raw, " ");
    collapse_whitespace(&stripped)
}

pub fn collapse_whitespace(raw: &str) -> String {
    WHITESPACE.replace_all(raw, " ").trim().to_string()
}

/// Truncate to at most `max_chars` characters, on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Dedup key for hooks: trimmed, lowercased.
pub fn hook_key(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_box_and_collapses() {
        let raw = "The bells ring.\n\n🏆 ACHIEVEMENT UNLOCKED: Bell Ringer\nYou rang it.\nReward: +1 swagger\nGo   north.";
        assert_eq!(clean_text(raw), "The bells ring. Go north.");
    }

    #[test]
    fn box_match_is_case_insensitive_and_lazy() {
        let raw = "A 🏆 achievement unlocked: x Reward: y\nmiddle 🏆 ACHIEVEMENT UNLOCKED: z\nReward: w";
        assert_eq!(clean_text(raw), "A middle");
    }

    #[test]
    fn box_without_reward_is_left_alone() {
        let raw = "🏆 ACHIEVEMENT UNLOCKED: unfinished";
        assert_eq!(clean_text(raw), raw);
    }

    #[test]
    fn plain_text_only_collapses() {
        assert_eq!(clean_text("  a\tb \n c  "), "a b c");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }

    #[test]
    fn hook_key_normalizes() {
        assert_eq!(hook_key("  The Bells "), "the bells");
    }
}
