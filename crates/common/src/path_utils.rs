//! Key path helpers for bucket object keys.
//!
//! Object keys always use `/` as separator regardless of the host OS, so these
//! helpers work on strings rather than `std::path`.

/// Return the last segment of an object key.
///
/// # Arguments
/// * `key` - Object key, e.g. `raw/2022-01-05/studyA/img123.dcm`
///
/// # Returns
/// The file name part, e.g. `img123.dcm`. Keys without a separator are returned whole.
pub fn key_file_name(key: &str) -> &str {
    match key.rfind('/') {
        Some(index) => &key[index + 1..],
        None => key,
    }
}

/// Return the file name of an object key without its final extension.
///
/// A leading dot does not start an extension (`.hidden` has stem `.hidden`).
///
/// # Arguments
/// * `key` - Object key
///
/// # Returns
/// The stem, e.g. `img123` for `raw/2022-01-05/studyA/img123.dcm`.
pub fn key_file_stem(key: &str) -> &str {
    let name: &str = key_file_name(key);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(index) => &name[..index],
    }
}

/// Check the final extension of an object key, ignoring case.
///
/// # Arguments
/// * `key` - Object key
/// * `extension` - Expected extension without the dot, e.g. `dcm`
pub fn has_extension(key: &str, extension: &str) -> bool {
    let name: &str = key_file_name(key);
    match name.rfind('.') {
        Some(0) | None => false,
        Some(index) => name[index + 1..].eq_ignore_ascii_case(extension),
    }
}

/// Extract the drop date from a raw object key.
///
/// The date is the literal path segment immediately following `prefix`. It
/// must be non-empty, consist of ASCII digits and dashes, and be followed by
/// a `/` and a non-empty remainder. The segment is returned as-is, never
/// reformatted.
///
/// # Arguments
/// * `key` - Object key, e.g. `raw/2022-01-05/studyA/img123.dcm`
/// * `prefix` - Raw prefix including its trailing slash, e.g. `raw/`
///
/// # Returns
/// The date segment, or `None` when the key does not follow the layout.
pub fn date_from_key<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let rest: &str = key.strip_prefix(prefix)?;
    let (date, remainder) = rest.split_once('/')?;
    if date.is_empty() || remainder.is_empty() {
        return None;
    }
    if !date.chars().all(|c: char| c.is_ascii_digit() || c == '-') {
        return None;
    }
    Some(date)
}
