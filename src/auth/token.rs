use crate::error::{
    DecodeTokenClaimsSnafu, JiEduResult, MalformedTokenSnafu, ReadTokenClaimsSnafu,
};
use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::Value;
use snafu::{OptionExt, ResultExt};

/// The parts of the access token payload we care about. The signature is the
/// backend's business, so it is never checked here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl AccessClaims {
    pub fn decode(token: &SecretString) -> JiEduResult<Self> {
        let payload = token
            .expose_secret()
            .split('.')
            .nth(1)
            .context(MalformedTokenSnafu {
                reason: "expected three dot-separated segments",
            })?;

        let bytes = BASE64_URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .context(DecodeTokenClaimsSnafu)?;
        serde_json::from_slice(&bytes).context(ReadTokenClaimsSnafu)
    }

    pub fn expires_at(&self) -> Option<Timestamp> {
        self.exp.and_then(|exp| Timestamp::from_second(exp).ok())
    }

    pub fn backend_user_id(&self) -> Option<String> {
        match self.user_id.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token_with(payload: &str) -> SecretString {
        SecretString::from(format!(
            "eyJhbGciOiJIUzI1NiJ9.{}.signature",
            BASE64_URL_SAFE_NO_PAD.encode(payload)
        ))
    }

    #[test]
    fn reads_user_and_expiry() {
        let claims =
            AccessClaims::decode(&token_with(r#"{"user_id": 42, "exp": 1700000000}"#)).unwrap();

        assert_eq!(claims.backend_user_id().as_deref(), Some("42"));
        assert_eq!(claims.expires_at().unwrap().as_second(), 1_700_000_000);
    }

    #[test]
    fn missing_claims_are_fine() {
        let claims = AccessClaims::decode(&token_with("{}")).unwrap();

        assert!(claims.backend_user_id().is_none());
        assert!(claims.expires_at().is_none());
    }

    #[test]
    fn opaque_tokens_are_rejected() {
        assert!(AccessClaims::decode(&SecretString::from("not-a-jwt")).is_err());
        assert!(AccessClaims::decode(&SecretString::from("a.!!!.c")).is_err());
    }
}
