// src/utils/format.rs

// Truncate a string if it's too long
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_are_untouched() {
        assert_eq!(truncate_string("alice", 10), "alice");
        assert_eq!(truncate_string("", 0), "");
    }

    #[test]
    fn long_strings_end_in_ellipsis() {
        assert_eq!(truncate_string("abcdefghij", 8), "abcde...");
        assert_eq!(truncate_string("żółw żółw żółw", 7), "żółw...");
    }
}
