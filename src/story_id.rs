//! Story identifier extraction from free-text record fields.
//!
//! Sizing records carry no story key, only loose text. The recognized forms
//! are `Story X.Y`, `story-X.Y`, and `ralph/story-X.Y` (case-insensitive,
//! X.Y two dot-separated integers). Fields are tried in priority order:
//! description, then project, then branch; the first capture wins. A record
//! that matches nowhere is unusable for matching and gets excluded upstream.

use once_cell::sync::Lazy;
use regex::Regex;

static STORY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bStory\s+(\d+\.\d+)\b").unwrap(),
        Regex::new(r"(?i)\bstory-(\d+\.\d+)\b").unwrap(),
        Regex::new(r"(?i)\bralph/story-(\d+\.\d+)\b").unwrap(),
    ]
});

/// Pull a story identifier out of the descriptive fields, or `None` when no
/// recognized form appears anywhere.
pub fn extract_story_id(description: &str, project: &str, branch: &str) -> Option<String> {
    for field in [description, project, branch] {
        for pattern in STORY_PATTERNS.iter() {
            if let Some(caps) = pattern.captures(field) {
                return Some(caps[1].to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_description() {
        assert_eq!(
            extract_story_id("Implement Story 3.2 end to end", "", ""),
            Some("3.2".to_string())
        );
    }

    #[test]
    fn test_extract_hyphenated_form() {
        assert_eq!(
            extract_story_id("work on story-10.4 today", "", ""),
            Some("10.4".to_string())
        );
    }

    #[test]
    fn test_extract_branch_path_form() {
        assert_eq!(
            extract_story_id("", "", "ralph/story-2.7"),
            Some("2.7".to_string())
        );
    }

    #[test]
    fn test_description_wins_over_branch() {
        assert_eq!(
            extract_story_id("Story 1.1 cleanup", "", "ralph/story-9.9"),
            Some("1.1".to_string())
        );
    }

    #[test]
    fn test_project_wins_over_branch() {
        assert_eq!(
            extract_story_id("", "story-4.5 sandbox", "ralph/story-9.9"),
            Some("4.5".to_string())
        );
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(
            extract_story_id("STORY 6.0 hotfix", "", ""),
            Some("6.0".to_string())
        );
    }

    #[test]
    fn test_no_match_anywhere() {
        assert_eq!(extract_story_id("refactor parser", "tooling", "main"), None);
    }

    #[test]
    fn test_partial_identifier_does_not_match() {
        assert_eq!(extract_story_id("Story 3", "", ""), None);
    }
}
