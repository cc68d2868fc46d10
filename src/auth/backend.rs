use crate::{auth::JiEduUser, error::JiEduError, state::JiEduState};
use async_trait::async_trait;
use axum_login::{AuthnBackend, UserId};
use jiff::Timestamp;
use secrecy::SecretString;

/// Authenticates against the REST backend's token endpoint and keeps the
/// resulting access tokens server-side, keyed by session user id.
#[derive(Clone)]
pub struct JiEduAuthBackend {
    state: JiEduState,
}

impl JiEduAuthBackend {
    pub const fn new(state: JiEduState) -> Self {
        Self { state }
    }
}

pub enum JiEduAuthCredentials {
    UsernamePassword {
        username: String,
        password: SecretString,
    },
}

#[async_trait]
impl AuthnBackend for JiEduAuthBackend {
    type User = JiEduUser;
    type Credentials = JiEduAuthCredentials;
    type Error = JiEduError;

    async fn authenticate(
        &self,
        creds: Self::Credentials,
    ) -> Result<Option<Self::User>, Self::Error> {
        match creds {
            JiEduAuthCredentials::UsernamePassword { username, password } => {
                let Some(tokens) = self.state.api().obtain_token(&username, &password).await?
                else {
                    return Ok(None);
                };

                let user = JiEduUser::new(username, tokens.access);
                self.state.remember_user(user.clone()).await;
                info!(
                    username = %user.username,
                    backend_user_id = ?user.backend_user_id,
                    "Signed in"
                );
                Ok(Some(user))
            }
        }
    }

    async fn get_user(&self, user_id: &UserId<Self>) -> Result<Option<Self::User>, Self::Error> {
        let Some(user) = self.state.find_user(*user_id).await else {
            return Ok(None);
        };

        if user.is_expired(Timestamp::now()) {
            debug!(username = %user.username, "Access token expired");
            self.state.forget_user(*user_id).await;
            return Ok(None);
        }

        Ok(Some(user))
    }
}
