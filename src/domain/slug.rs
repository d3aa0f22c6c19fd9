//! Slug derivation and collision-free allocation for articles.
//!
//! Normalization is delegated to the `slug` crate: input is transliterated to
//! ASCII, lowercased, runs of non-alphanumerics become a single hyphen, and
//! leading or trailing hyphens are dropped. Allocation is kept pure so the
//! caller decides how the set of taken slugs is obtained.

use std::collections::HashSet;

use slug::slugify;
use thiserror::Error;
use uuid::Uuid;

const FALLBACK_PREFIX: &str = "article";

/// Errors that can occur while deriving a slug.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlugError {
    #[error("slug source text is empty")]
    EmptyInput,
    #[error("failed to derive slug from `{input}`")]
    Unrepresentable { input: String },
}

/// Derive a base slug from the provided human-readable text.
pub fn derive_slug(input: &str) -> Result<String, SlugError> {
    if input.trim().is_empty() {
        return Err(SlugError::EmptyInput);
    }

    let candidate = slugify(input);
    if candidate.is_empty() {
        return Err(SlugError::Unrepresentable {
            input: input.to_string(),
        });
    }

    Ok(candidate)
}

/// Base slug used when a title has no representable characters.
pub fn fallback_base(id: Uuid) -> String {
    let simple = id.simple().to_string();
    format!("{FALLBACK_PREFIX}-{}", &simple[..8])
}

/// Derive a base slug, falling back to an identifier-based base.
pub fn derive_slug_or_fallback(input: &str, id: Uuid) -> String {
    derive_slug(input).unwrap_or_else(|_| fallback_base(id))
}

/// Return `base` when free, otherwise the first free `base-1`, `base-2`, ...
///
/// `taken` holds every slug already stored, deleted rows included. The probe
/// always terminates because `taken` is finite.
pub fn next_available_slug(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }

    let mut suffix: u64 = 1;
    loop {
        let candidate = format!("{base}-{suffix}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// True when `slug` is `base` or `base-<digits>`.
pub fn belongs_to_base(slug: &str, base: &str) -> bool {
    match slug.strip_prefix(base) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('-')
            .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}
