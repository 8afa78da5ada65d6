// ABOUTME: Decoder for Cloudflare-obfuscated e-mail addresses found in profile pages.
// ABOUTME: The first hex byte is an XOR key applied to every following byte.

/// Decodes a Cloudflare `data-cfemail` hex string.
///
/// Malformed input (odd length, non-hex digits) decodes to an empty string.
pub fn cf_decode_email(encoded: &str) -> String {
    let encoded = encoded.trim();
    if encoded.len() < 2 || encoded.len() % 2 != 0 || !encoded.is_ascii() {
        return String::new();
    }

    let bytes: Option<Vec<u8>> = (0..encoded.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&encoded[i..i + 2], 16).ok())
        .collect();
    let Some(bytes) = bytes else {
        return String::new();
    };

    let key = bytes[0];
    bytes[1..].iter().map(|b| char::from(b ^ key)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_known_value() {
        // key 0x42, "a@b.c"
        let encoded = "422302206c21";
        assert_eq!(cf_decode_email(encoded), "a@b.c");
    }

    #[test]
    fn test_malformed_is_empty() {
        assert_eq!(cf_decode_email(""), "");
        assert_eq!(cf_decode_email("abc"), "");
        assert_eq!(cf_decode_email("zz11"), "");
    }
}
