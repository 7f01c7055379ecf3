//! Form encoding for query strings and `application/x-www-form-urlencoded`
//! bodies.
//!
//! Values are percent-encoded with the `encodeURIComponent` rules: ASCII
//! alphanumerics and `-_.!~*'()` pass through, every other UTF-8 byte becomes
//! `%XX`. Keys are emitted verbatim.

/// Serialize `params` as `k1=v1&k2=v2`, in iteration order.
///
/// An empty iterator yields an empty string.
pub fn encode_params<I, K, V>(params: I) -> String
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut out = String::new();
    for (key, value) in params {
        if !out.is_empty() {
            out.push('&');
        }
        out.push_str(key.as_ref());
        out.push('=');
        encode_component_into(value.as_ref(), &mut out);
    }
    out
}

/// Percent-encode a single value.
pub fn encode_component(src: &str) -> String {
    let mut out = String::with_capacity(src.len());
    encode_component_into(src, &mut out);
    out
}

fn encode_component_into(src: &str, out: &mut String) {
    for b in src.bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(to_hex_upper(b >> 4));
            out.push(to_hex_upper(b & 0x0F));
        }
    }
}

/// Reverse of [`encode_component`]. Returns `None` on a truncated or non-hex
/// escape, or when the decoded bytes are not UTF-8.
pub fn decode_component(src: &str) -> Option<String> {
    let bytes = src.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hi = from_hex(*bytes.get(i + 1)?)?;
            let lo = from_hex(*bytes.get(i + 2)?)?;
            out.push((hi << 4) | lo);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }
    String::from_utf8(out).ok()
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

fn to_hex_upper(nibble: u8) -> char {
    char::from_digit(u32::from(nibble), 16)
        .map(|c| c.to_ascii_uppercase())
        .unwrap_or('0')
}

fn from_hex(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}
