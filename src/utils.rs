use chrono::Utc;
use regex::Regex;

/// Reduce an uploaded filename to `[A-Za-z0-9._-]`, dropping any path
/// components. Returns `None` when nothing usable survives.
pub fn sanitize_object_name(input: &str) -> Option<String> {
    let name = input.rsplit(['/', '\\']).next().unwrap_or_default();

    let spaces = Regex::new(r"\s+").unwrap();
    let mut s = spaces.replace_all(name.trim(), "-").into_owned();

    let clean = Regex::new(r"[^A-Za-z0-9._-]").unwrap();
    s = clean.replace_all(&s, "").into_owned();

    // Leading or trailing dots would produce hidden or traversal-looking
    // object names.
    let s = s.trim_matches('.').to_string();

    if s.is_empty() { None } else { Some(s) }
}

/// Prefix an object name with the upload instant so repeated filenames
/// never collide in the blob store.
pub fn timestamped(name: &str) -> String {
    format!("{}-{}", Utc::now().timestamp_millis(), name)
}
