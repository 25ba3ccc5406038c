//! Utility functions and helpers

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;

/// Generate a URL-safe random token (using cryptographically secure RNG)
///
/// Used for session ids, OAuth2 CSRF state and OAuth1 nonces.
pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Expand environment variable references ($env:VAR_NAME)
///
/// Unset variables expand to an empty string.
pub fn expand_env_value(value: &str) -> String {
    match value.strip_prefix("$env:") {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => value.to_string(),
    }
}

/// Constant-time string comparison for tokens echoed back by providers
pub fn tokens_match(expected: &str, actual: &str) -> bool {
    use subtle::ConstantTimeEq;
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_tokens_are_unique_and_url_safe() {
        let a = generate_secure_token();
        let b = generate_secure_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(
            a.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_expand_env_value() {
        unsafe {
            std::env::set_var("CONSOLE_UTILS_TEST_SECRET", "s3cret");
        }
        assert_eq!(expand_env_value("$env:CONSOLE_UTILS_TEST_SECRET"), "s3cret");
        assert_eq!(expand_env_value("$env:CONSOLE_UTILS_TEST_UNSET_VAR"), "");
        assert_eq!(expand_env_value("literal"), "literal");
    }

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("abc", "abc"));
        assert!(!tokens_match("abc", "abd"));
        assert!(!tokens_match("abc", "abcd"));
    }
}
