use crate::{
    auth::{backend::JiEduAuthBackend, token::AccessClaims},
    error::{JiEduError, JiEduResult},
};
use axum_login::{AuthSession, AuthUser};
use jiff::Timestamp;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

pub mod backend;
pub mod token;

pub type JiEduSession = AuthSession<JiEduAuthBackend>;

/// Someone signed in through this server, holding their backend access token.
#[derive(Debug, Clone)]
pub struct JiEduUser {
    pub id: Uuid,
    pub username: String,
    pub backend_user_id: Option<String>,
    access: SecretString,
    expires_at: Option<Timestamp>,
}

impl JiEduUser {
    pub fn new(username: String, access: SecretString) -> Self {
        // opaque tokens still work, they just never expire on our side
        let claims = AccessClaims::decode(&access).unwrap_or_else(|e| {
            warn!(?e, "Access token claims unreadable");
            AccessClaims::default()
        });

        Self {
            id: Uuid::new_v4(),
            username,
            backend_user_id: claims.backend_user_id(),
            access,
            expires_at: claims.expires_at(),
        }
    }

    pub const fn token(&self) -> &SecretString {
        &self.access
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

impl AuthUser for JiEduUser {
    type Id = Uuid;

    fn id(&self) -> Self::Id {
        self.id
    }

    fn session_auth_hash(&self) -> &[u8] {
        self.access.expose_secret().as_bytes()
    }
}

pub trait AuthUtilities {
    fn signed_in(&self) -> JiEduResult<&JiEduUser>;
}

impl AuthUtilities for JiEduSession {
    fn signed_in(&self) -> JiEduResult<&JiEduUser> {
        self.user.as_ref().ok_or(JiEduError::NotSignedIn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};

    #[test]
    fn expiry_comes_from_the_token() {
        let payload = BASE64_URL_SAFE_NO_PAD.encode(r#"{"user_id": 7, "exp": 1000}"#);
        let user = JiEduUser::new("registrar".into(), SecretString::from(format!("h.{payload}.s")));

        assert_eq!(user.backend_user_id.as_deref(), Some("7"));
        assert!(user.is_expired(Timestamp::from_second(1000).unwrap()));
        assert!(!user.is_expired(Timestamp::from_second(999).unwrap()));
    }

    #[test]
    fn opaque_tokens_never_expire() {
        let user = JiEduUser::new("registrar".into(), SecretString::from("opaque"));

        assert!(!user.is_expired(Timestamp::MAX));
    }
}
