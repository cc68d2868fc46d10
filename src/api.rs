//! Client for the JiEdu REST backend.
//!
//! Every call but sign-in carries the signed-in user's bearer token, so the
//! usual entry point is [`ApiClient::authorised`].

use crate::{
    batch::ItemResponse,
    config::ApiConfig,
    data::pagination::{ListQuery, Paginated},
    error::{
        BuildHttpClientSnafu, DecodeResponseSnafu, FALLBACK_MESSAGE, JiEduError, JiEduResult,
        SendRequestSnafu,
    },
};
use reqwest::{RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use snafu::ResultExt;
use std::sync::Arc;

#[derive(Clone, Debug)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: Arc<str>,
}

#[derive(Debug, Deserialize)]
pub struct TokenPair {
    pub access: SecretString,
    #[allow(dead_code)]
    pub refresh: Option<SecretString>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    username: &'a str,
    password: &'a str,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> JiEduResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(BuildHttpClientSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().into(),
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.base_url)
    }

    /// Exchanges credentials for a token pair. Bad credentials are `Ok(None)`.
    pub async fn obtain_token(
        &self,
        username: &str,
        password: &SecretString,
    ) -> JiEduResult<Option<TokenPair>> {
        let endpoint = "/api/token/";
        let response = self
            .client
            .post(self.url(endpoint))
            .json(&TokenRequest {
                username,
                password: password.expose_secret(),
            })
            .send()
            .await
            .context(SendRequestSnafu { endpoint })?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST
        ) {
            return Ok(None);
        }

        parse_response(response, endpoint).await.map(Some)
    }

    pub const fn authorised<'a>(&'a self, token: &'a SecretString) -> Authorised<'a> {
        Authorised { api: self, token }
    }
}

/// An [`ApiClient`] paired with the bearer token of whoever is asking.
#[derive(Clone, Copy)]
pub struct Authorised<'a> {
    api: &'a ApiClient,
    token: &'a SecretString,
}

impl Authorised<'_> {
    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.bearer_auth(self.token.expose_secret())
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> JiEduResult<T> {
        let response = self
            .request(self.api.client.get(self.api.url(endpoint)))
            .send()
            .await
            .context(SendRequestSnafu { endpoint })?;

        parse_response(response, endpoint).await
    }

    pub async fn get_with_query<T: DeserializeOwned, Q: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        query: &Q,
    ) -> JiEduResult<T> {
        let response = self
            .request(self.api.client.get(self.api.url(endpoint)).query(query))
            .send()
            .await
            .context(SendRequestSnafu { endpoint })?;

        parse_response(response, endpoint).await
    }

    pub async fn list<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &ListQuery,
    ) -> JiEduResult<Paginated<T>> {
        self.get_with_query(
            endpoint,
            &[("search", query.search().to_string()), ("page", query.page().to_string())],
        )
        .await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> JiEduResult<T> {
        let response = self.send_post(endpoint, body).await?;
        parse_response(response, endpoint).await
    }

    /// Posts one item of a batch. A rejection whose body names per-item
    /// `error`s comes back as `Ok` so the caller can stop on it; any other
    /// non-2xx response is an error, never a success.
    pub async fn post_item<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> JiEduResult<ItemResponse> {
        let response = self.send_post(endpoint, body).await?;
        let status = response.status();

        if status.is_success() {
            return response.json().await.context(DecodeResponseSnafu { endpoint });
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(JiEduError::Unauthorised);
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            if let Ok(item) = serde_json::from_str::<ItemResponse>(&body) {
                if !item.error.is_empty() {
                    return Ok(item);
                }
            }
        }
        warn!(%status, %endpoint, "Backend rejected item");
        Err(rejection(status, &body))
    }

    async fn send_post<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> JiEduResult<Response> {
        self.request(self.api.client.post(self.api.url(endpoint)).json(body))
            .send()
            .await
            .context(SendRequestSnafu { endpoint })
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response, endpoint: &str) -> JiEduResult<T> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.context(DecodeResponseSnafu { endpoint });
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(JiEduError::Unauthorised);
    }

    let body = response.text().await.unwrap_or_default();
    warn!(%status, %endpoint, "Backend rejected request");
    Err(rejection(status, &body))
}

fn rejection(status: StatusCode, body: &str) -> JiEduError {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .as_ref()
        .and_then(rejection_message)
        .unwrap_or_else(|| FALLBACK_MESSAGE.to_string());

    JiEduError::ApiRejected {
        status: status.as_u16(),
        message,
    }
}

/// Pulls a human-readable message out of an error body, trying `error`, then
/// `detail`, then `message`. Each may be a string or a list of strings.
pub fn rejection_message(body: &Value) -> Option<String> {
    ["error", "detail", "message"]
        .into_iter()
        .filter_map(|key| body.get(key))
        .find_map(|value| match value {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join("; ");
                (!joined.is_empty()).then_some(joined)
            }
            _ => None,
        })
}

#[cfg(test)]
pub mod test_backend {
    use super::ApiClient;
    use crate::config::ApiConfig;
    use axum::Router;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Serves `router` on a random local port and returns a client pointed at it.
    pub async fn spawn(router: Router) -> ApiClient {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        ApiClient::new(&ApiConfig {
            base_url: format!("http://{addr}"),
            request_timeout: Duration::from_secs(5),
        })
        .unwrap()
    }
}
