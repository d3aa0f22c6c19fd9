//! Article field rules and derived values.

use super::entities::ArticleRecord;
use super::error::DomainError;

pub const TITLE_MIN_CHARS: usize = 3;
pub const TITLE_MAX_CHARS: usize = 255;
pub const CONTENT_MIN_CHARS: usize = 10;
pub const EXCERPT_MAX_CHARS: usize = 500;
pub const DERIVED_EXCERPT_CHARS: usize = 200;
pub const TAGS_MAX_CHARS: usize = 200;
pub const MAX_TAGS: usize = 10;
pub const TAG_MAX_CHARS: usize = 50;
pub const WORDS_PER_MINUTE: usize = 200;

pub const DUPLICATE_TITLE_MESSAGE: &str = "An article with this title already exists.";

/// Trim and length-check a title.
pub fn normalize_title(title: &str) -> Result<String, DomainError> {
    let title = title.trim();
    let len = title.chars().count();
    if len < TITLE_MIN_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("Title must be at least {TITLE_MIN_CHARS} characters long."),
        ));
    }
    if len > TITLE_MAX_CHARS {
        return Err(DomainError::validation(
            "title",
            format!("Title must be at most {TITLE_MAX_CHARS} characters long."),
        ));
    }
    Ok(title.to_string())
}

pub fn validate_content(content: &str) -> Result<(), DomainError> {
    if content.trim().chars().count() < CONTENT_MIN_CHARS {
        return Err(DomainError::validation(
            "content",
            format!("Content must be at least {CONTENT_MIN_CHARS} characters long."),
        ));
    }
    Ok(())
}

/// First [`DERIVED_EXCERPT_CHARS`] characters of the content.
pub fn derive_excerpt(content: &str) -> String {
    content.chars().take(DERIVED_EXCERPT_CHARS).collect()
}

/// Use the supplied excerpt when non-blank, otherwise derive one.
pub fn resolve_excerpt(explicit: Option<&str>, content: &str) -> Result<String, DomainError> {
    match explicit.map(str::trim).filter(|value| !value.is_empty()) {
        Some(excerpt) => {
            if excerpt.chars().count() > EXCERPT_MAX_CHARS {
                return Err(DomainError::validation(
                    "excerpt",
                    format!("Excerpt must be at most {EXCERPT_MAX_CHARS} characters long."),
                ));
            }
            Ok(excerpt.to_string())
        }
        None => Ok(derive_excerpt(content)),
    }
}

/// Join a tag list into the stored comma-separated form.
pub fn join_tags(tags: &[String]) -> Result<String, DomainError> {
    if tags.len() > MAX_TAGS {
        return Err(DomainError::validation(
            "tags_list",
            format!("Maximum {MAX_TAGS} tags allowed."),
        ));
    }

    let mut cleaned = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if tag.chars().count() > TAG_MAX_CHARS {
            return Err(DomainError::validation(
                "tags_list",
                format!("Each tag must be at most {TAG_MAX_CHARS} characters long."),
            ));
        }
        if !tag.is_empty() {
            cleaned.push(tag);
        }
    }

    normalize_tags_text(&cleaned.join(", "))
}

/// Check the free-text tag column.
pub fn normalize_tags_text(tags: &str) -> Result<String, DomainError> {
    let tags = tags.trim();
    if tags.chars().count() > TAGS_MAX_CHARS {
        return Err(DomainError::validation(
            "tags",
            format!("Tags must be at most {TAGS_MAX_CHARS} characters long."),
        ));
    }
    Ok(tags.to_string())
}

/// Split stored tags on commas, trimming and dropping empties.
pub fn parse_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Estimated minutes to read, never less than one.
pub fn reading_time(content: &str) -> u32 {
    let words = content.split_whitespace().count();
    let minutes = (words as f64 / WORDS_PER_MINUTE as f64).round_ties_even() as u32;
    minutes.max(1)
}

impl ArticleRecord {
    pub fn tags_list(&self) -> Vec<String> {
        parse_tags(&self.tags)
    }

    pub fn reading_time(&self) -> u32 {
        reading_time(&self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_bounds_are_enforced() {
        assert!(normalize_title("ab").is_err());
        assert_eq!(normalize_title("  abc  ").expect("valid"), "abc");
        assert!(normalize_title(&"x".repeat(256)).is_err());
        assert!(normalize_title(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn short_content_is_rejected_with_message() {
        let err = validate_content("too short").expect_err("nine chars");
        assert_eq!(
            err.to_string(),
            "Content must be at least 10 characters long."
        );
        assert!(validate_content("long enough!").is_ok());
    }

    #[test]
    fn excerpt_defaults_to_content_prefix() {
        let content = "é".repeat(250);
        let excerpt = resolve_excerpt(None, &content).expect("derived");
        assert_eq!(excerpt.chars().count(), DERIVED_EXCERPT_CHARS);

        let short = resolve_excerpt(Some("   "), "short body text").expect("derived");
        assert_eq!(short, "short body text");

        let explicit = resolve_excerpt(Some("Custom"), &content).expect("explicit");
        assert_eq!(explicit, "Custom");

        assert!(resolve_excerpt(Some(&"x".repeat(501)), &content).is_err());
    }

    #[test]
    fn tags_are_joined_and_parsed() {
        let joined = join_tags(&["rust".into(), " web ".into(), String::new()]).expect("tags");
        assert_eq!(joined, "rust, web");
        assert_eq!(parse_tags(" rust,, web ,"), vec!["rust", "web"]);
    }

    #[test]
    fn more_than_ten_tags_fail() {
        let tags: Vec<String> = (0..11).map(|i| format!("t{i}")).collect();
        let err = join_tags(&tags).expect_err("too many");
        assert_eq!(err.to_string(), "Maximum 10 tags allowed.");
    }

    #[test]
    fn reading_time_rounds_half_to_even_with_floor_of_one() {
        assert_eq!(reading_time(""), 1);
        assert_eq!(reading_time(&"word ".repeat(100)), 1);
        assert_eq!(reading_time(&"word ".repeat(300)), 2);
        assert_eq!(reading_time(&"word ".repeat(500)), 2);
        assert_eq!(reading_time(&"word ".repeat(700)), 4);
    }
}
