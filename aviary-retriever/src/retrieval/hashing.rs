//! Content fingerprints for change detection.

/// 128-bit content fingerprint, hex encoded (32 characters).
///
/// Collision-resistant enough for change detection; never used for
/// authentication and never leaves the store. Truncated blake3 keeps the
/// digest cheap while staying stable across platforms.
pub fn fingerprint(content: &[u8]) -> String {
    let hash = blake3::hash(content);
    hash.as_bytes()[..16]
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
