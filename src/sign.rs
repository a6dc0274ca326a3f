use std::collections::BTreeMap;

use md5::{Digest, Md5};

pub(crate) const SIGN_KEY: &str = "sign";

/// Upper-case hex MD5 over `secret + k1v1k2v2... + secret`, keys ascending.
/// A `sign` entry already present in `params` is ignored.
pub(crate) fn sign_params(params: &BTreeMap<&'static str, String>, app_secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(app_secret.as_bytes());
    for (key, value) in params.iter().filter(|(k, _)| **k != SIGN_KEY) {
        hasher.update(key.as_bytes());
        hasher.update(value.as_bytes());
    }
    hasher.update(app_secret.as_bytes());
    format!("{:X}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            ("token", "tok".to_string()),
            ("app_key", "key".to_string()),
            ("timestamp", "2024-01-01 00:00:00".to_string()),
        ])
    }

    #[test]
    fn matches_manual_canonical_string() {
        let canonical = "secretapp_keykeytimestamp2024-01-01 00:00:00tokentoksecret";
        let expected = format!("{:X}", Md5::digest(canonical.as_bytes()));
        assert_eq!(sign_params(&params(), "secret"), expected);
    }

    #[test]
    fn existing_sign_is_excluded() {
        let mut with_sign = params();
        with_sign.insert(SIGN_KEY, "STALE".to_string());
        assert_eq!(sign_params(&with_sign, "secret"), sign_params(&params(), "secret"));
    }

    #[test]
    fn output_is_uppercase_hex() {
        let sign = sign_params(&params(), "secret");
        assert_eq!(sign.len(), 32);
        assert!(sign.chars().all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn secret_changes_sign() {
        assert_ne!(sign_params(&params(), "a"), sign_params(&params(), "b"));
    }
}
