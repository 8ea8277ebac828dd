//! Fingerprint display formatting and comparison.
//!
//! Fingerprints are stored exactly as the handshake layer supplied them and
//! only reshaped here for display. No cryptography happens in this module;
//! it is string work only.

/// Separator between display groups.
pub const GROUP_SEPARATOR: char = ':';

/// Characters per display group.
pub const GROUP_WIDTH: usize = 2;

/// Formats a raw fingerprint into colon-separated fixed-width groups for
/// display, e.g. `aabbcc` becomes `AA:BB:CC`.
///
/// Pure-hex input is uppercased; anything else (e.g. a base64 digest) keeps
/// its case. Idempotent: input that already contains the separator is
/// returned unchanged, so formatting a display string is a no-op. Callers
/// should only ever pass raw stored fingerprints.
pub fn format(raw: &str) -> String {
    if raw.contains(GROUP_SEPARATOR) {
        return raw.to_string();
    }

    let display = if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
        raw.to_ascii_uppercase()
    } else {
        raw.to_string()
    };

    display
        .chars()
        .collect::<Vec<_>>()
        .chunks(GROUP_WIDTH)
        .map(|group| group.iter().collect::<String>())
        .collect::<Vec<_>>()
        .join(&GROUP_SEPARATOR.to_string())
}

/// Compares two fingerprints ignoring separators and ASCII case, so a
/// provisioned display form (`AA:BB:CC`) matches raw handshake output
/// (`aabbcc`). Empty fingerprints never match anything.
pub fn matches(a: &str, b: &str) -> bool {
    let a = normalize(a);
    let b = normalize(b);
    !a.is_empty() && a == b
}

fn normalize(fingerprint: &str) -> String {
    fingerprint
        .chars()
        .filter(|c| *c != GROUP_SEPARATOR)
        .collect::<String>()
        .to_ascii_lowercase()
}
