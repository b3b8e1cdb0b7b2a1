//! Input validation for new and edited URLs
//!
//! Checks run in a fixed order and stop at the first failure.

use crate::error::ValidationError;
use crate::format::ensure_scheme;
use crate::models::{MAX_ENTRIES, MAX_URL_LEN};

/// Validate raw input for an insert and return the URL to store
///
/// Order: capacity, empty, length, scheme prefix, duplicate.
pub fn validate_insert<'a, I>(raw: &str, existing: I, current_len: usize) -> Result<String, ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    if current_len >= MAX_ENTRIES {
        return Err(ValidationError::CapacityExceeded { limit: MAX_ENTRIES });
    }

    let url = normalize_input(raw)?;

    if existing.into_iter().any(|u| u == url) {
        return Err(ValidationError::DuplicateEntry { url });
    }

    Ok(url)
}

/// Validate an edited value for an existing entry
///
/// Same pipeline as insert minus the capacity check. A value that ends up
/// equal to `original` is `Unchanged`.
pub fn validate_rename<'a, I>(raw: &str, existing: I, original: &str) -> Result<String, ValidationError>
where
    I: IntoIterator<Item = &'a str>,
{
    let url = normalize_input(raw)?;

    if url == original {
        return Err(ValidationError::Unchanged);
    }

    if existing.into_iter().any(|u| u == url) {
        return Err(ValidationError::DuplicateEntry { url });
    }

    Ok(url)
}

pub(crate) fn normalize_input(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyInput);
    }

    let len = trimmed.chars().count();
    if len > MAX_URL_LEN {
        return Err(ValidationError::InputTooLong {
            len,
            limit: MAX_URL_LEN,
        });
    }

    Ok(ensure_scheme(trimmed))
}
