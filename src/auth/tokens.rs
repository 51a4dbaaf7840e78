use rand::{Rng, RngCore};
use time::{Duration, OffsetDateTime};

/// Verification codes are short-lived and human-enterable; reset tokens are
/// high-entropy and only ever travel inside an emailed link.
pub const VERIFICATION_CODE_TTL: Duration = Duration::hours(24);
pub const RESET_TOKEN_TTL: Duration = Duration::hours(1);

/// Random 6-digit numeric code for email verification.
pub fn verification_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

pub fn verification_code_expiry() -> OffsetDateTime {
    OffsetDateTime::now_utc() + VERIFICATION_CODE_TTL
}

/// Random 160-bit hex token for password resets.
pub fn reset_token() -> String {
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn reset_token_expiry() -> OffsetDateTime {
    OffsetDateTime::now_utc() + RESET_TOKEN_TTL
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verification_code_is_six_digits() {
        for _ in 0..100 {
            let code = verification_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn reset_token_is_forty_hex_chars() {
        let token = reset_token();
        assert_eq!(token.len(), 40);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn reset_tokens_do_not_repeat() {
        let a = reset_token();
        let b = reset_token();
        assert_ne!(a, b);
    }

    #[test]
    fn expiry_windows_match_contract() {
        let now = OffsetDateTime::now_utc();
        let verify = verification_code_expiry();
        let reset = reset_token_expiry();
        assert!(verify > now + Duration::hours(23));
        assert!(verify <= now + Duration::hours(24) + Duration::seconds(5));
        assert!(reset > now + Duration::minutes(59));
        assert!(reset <= now + Duration::hours(1) + Duration::seconds(5));
    }
}
