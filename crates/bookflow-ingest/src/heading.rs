//! Heading detection for plain-text import.
//!
//! A pure function over the trimmed, lowercased line. Keyword tiers come
//! from the book corpora this importer grew up on, hence the Russian
//! variants next to the English ones.

/// Section keywords, strongest tier first.
const VOLUME_KEYWORDS: &[&str] = &["volume", "vol", "том"];
const PART_KEYWORDS: &[&str] = &["part", "часть"];
const CHAPTER_KEYWORDS: &[&str] = &["chapter", "глава"];

/// Longest heading line the numeric rule accepts.
const MAX_NUMERIC_HEADING_LEN: usize = 80;

/// Classifies a line as a heading level; 0 means not a heading.
///
/// Keyword matches require the keyword to be followed by a space or the end
/// of the line, so `Chapter 3` is a heading and `Chapter1` is not. A line of
/// digits and dots (`12`, `3.1.4`) maps to level 4 plus one per dot.
#[must_use]
pub fn heading_level(line: &str) -> u32 {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return 0;
    }
    let lower = trimmed.to_lowercase();
    if starts_with_keyword(&lower, VOLUME_KEYWORDS) {
        return 1;
    }
    if starts_with_keyword(&lower, PART_KEYWORDS) {
        return 2;
    }
    if starts_with_keyword(&lower, CHAPTER_KEYWORDS) {
        return 3;
    }

    let mut chars = trimmed.chars();
    if !chars.next().is_some_and(|c| c.is_ascii_digit()) {
        return 0;
    }
    let mut dots = 0u32;
    let mut len = 1usize;
    for ch in chars {
        len += 1;
        if ch.is_ascii_digit() {
            continue;
        }
        if ch != '.' {
            return 0;
        }
        dots += 1;
    }
    if len < MAX_NUMERIC_HEADING_LEN {
        4 + dots
    } else {
        0
    }
}

fn starts_with_keyword(lower: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| {
        lower
            .strip_prefix(kw)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_not_a_heading() {
        assert_eq!(heading_level(""), 0);
        assert_eq!(heading_level("   "), 0);
    }

    #[test]
    fn test_keyword_tiers() {
        assert_eq!(heading_level("Volume One"), 1);
        assert_eq!(heading_level("vol 2"), 1);
        assert_eq!(heading_level("Part Two"), 2);
        assert_eq!(heading_level("Chapter 7"), 3);
        assert_eq!(heading_level("chapter"), 3);
    }

    #[test]
    fn test_russian_keywords() {
        assert_eq!(heading_level("Том первый"), 1);
        assert_eq!(heading_level("Часть вторая"), 2);
        assert_eq!(heading_level("Глава 3"), 3);
    }

    #[test]
    fn test_keyword_requires_separator() {
        assert_eq!(heading_level("Chapter1"), 0);
        assert_eq!(heading_level("Chapters"), 0);
        assert_eq!(heading_level("partition"), 0);
        assert_eq!(heading_level("volcano"), 0);
    }

    #[test]
    fn test_numeric_headings() {
        assert_eq!(heading_level("123"), 4);
        assert_eq!(heading_level("1.2"), 5);
        assert_eq!(heading_level("1.2.3"), 6);
        assert_eq!(heading_level("3."), 5);
    }

    #[test]
    fn test_numeric_with_other_chars_is_not_a_heading() {
        assert_eq!(heading_level("12a"), 0);
        assert_eq!(heading_level("1-2"), 0);
        assert_eq!(heading_level("Fig. 3"), 0);
    }

    #[test]
    fn test_overlong_numeric_line_is_rejected() {
        let long = "1".repeat(80);
        assert_eq!(heading_level(&long), 0);
        let just_under = "1".repeat(79);
        assert_eq!(heading_level(&just_under), 4);
    }

    #[test]
    fn test_surrounding_whitespace_is_ignored() {
        assert_eq!(heading_level("   Chapter 9   "), 3);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(heading_level("CHAPTER 12"), 3);
        assert_eq!(heading_level("ГЛАВА 1"), 3);
    }
}
