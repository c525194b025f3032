//! Triple-DES key derivation from vendor-issued key strings.

/// Key length 3DES EDE3 requires, in bytes.
pub const KEY_LEN: usize = 24;

/// Derives the 24-byte cipher key from a raw key string.
///
/// The rule matches the vendor's reference clients bit for bit:
///
/// - empty input → 24 zero bytes,
/// - exactly 24 bytes → used as-is,
/// - longer → truncated to the first 24,
/// - shorter → repeated cyclically until 24 bytes are filled.
pub fn derive_key(raw: &str) -> [u8; KEY_LEN] {
    let src = raw.as_bytes();
    let mut key = [0u8; KEY_LEN];
    if src.is_empty() {
        return key;
    }
    if src.len() >= KEY_LEN {
        key.copy_from_slice(&src[..KEY_LEN]);
    } else {
        for (i, slot) in key.iter_mut().enumerate() {
            *slot = src[i % src.len()];
        }
    }
    key
}

/// Normalizes a bet selection key the way the vendor's clients do: the
/// first character is lowercased, the rest is left alone (`"Banker"` →
/// `"banker"`, `"P"` → `"p"`).
pub fn normalize_bet_key(source: &str) -> String {
    let mut chars = source.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
    }
}
