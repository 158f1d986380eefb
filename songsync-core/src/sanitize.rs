//! Cross-platform filename sanitization.

/// Longest stem, in characters, that [`sanitize_filename`] will produce.
pub const MAX_FILENAME_CHARS: usize = 200;

/// Characters that are invalid in a filename on at least one supported
/// platform.
pub const FORBIDDEN_CHARS: [char; 9] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Map an arbitrary title into a stable, filesystem-safe filename stem.
///
/// Forbidden characters become `_`, whitespace runs collapse to a single
/// space, and the result is trimmed and cut to [`MAX_FILENAME_CHARS`].
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| if FORBIDDEN_CHARS.contains(&c) { '_' } else { c })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");

    // Truncation can expose a trailing space from the collapsed form.
    let truncated: String = collapsed.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim_end().to_string()
}
