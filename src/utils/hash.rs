use sha2::{Digest, Sha256};

pub fn text_digest(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_stable_per_text() {
        assert_eq!(text_digest("hello"), text_digest("hello"));
        assert_ne!(text_digest("hello"), text_digest("Hello"));
    }

    #[test]
    fn digest_handles_non_ascii_text() {
        let digest = text_digest("canción ✓ 剪贴板");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
