// src/utils/pem.rs
//! PEM rendering for signer public keys.

/// Renders DER-encoded SubjectPublicKeyInfo bytes as a PEM block.
///
/// Base64 payload is wrapped at 64 characters per line between the
/// standard `PUBLIC KEY` armor, matching what mail recipients expect to
/// paste into verification tooling.
pub fn public_key_to_pem(der: &[u8]) -> String {
    let encoded = base64::encode(der);
    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        // Chunks of a valid base64 string are themselves valid UTF-8.
        pem.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----");
    pem
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_armor_and_line_wrap() {
        let der = vec![0xAB; 100];
        let pem = public_key_to_pem(&der);

        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----\n"));
        assert!(pem.ends_with("-----END PUBLIC KEY-----"));

        let body: Vec<&str> = pem
            .lines()
            .filter(|l| !l.starts_with("-----"))
            .collect();
        assert!(!body.is_empty());
        for line in &body[..body.len() - 1] {
            assert_eq!(line.len(), 64);
        }
        assert!(body[body.len() - 1].len() <= 64);

        let rejoined: String = body.concat();
        assert_eq!(base64::decode(rejoined).unwrap(), der);
    }

    #[test]
    fn test_empty_key() {
        let pem = public_key_to_pem(&[]);
        assert_eq!(pem, "-----BEGIN PUBLIC KEY-----\n-----END PUBLIC KEY-----");
    }
}
