use crate::{auth::backend::JiEduAuthBackend, maud_conveniences::error_alert};
use axum::{
    http::{HeaderValue, StatusCode},
    response::{Html, IntoResponse, Response},
};
use snafu::Snafu;
use std::num::ParseIntError;

pub type JiEduResult<T> = Result<T, JiEduError>;

/// Shown whenever the backend gives us nothing better to say.
pub const FALLBACK_MESSAGE: &str = "Something went wrong. Please try again.";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum JiEduError {
    #[snafu(display("Error building HTTP client"))]
    BuildHttpClient { source: reqwest::Error },
    #[snafu(display("Unable to reach {}", endpoint))]
    SendRequest {
        source: reqwest::Error,
        endpoint: String,
    },
    #[snafu(display("Unable to understand the response from {}", endpoint))]
    DecodeResponse {
        source: reqwest::Error,
        endpoint: String,
    },
    #[snafu(display("{}", message))]
    ApiRejected { status: u16, message: String },
    #[snafu(display("Your session has expired, please sign in again"))]
    Unauthorised,
    #[snafu(display("You need to sign in first"))]
    NotSignedIn,
    #[snafu(display("Unable to parse `{}` as a number", name))]
    ParseNumber {
        source: ParseIntError,
        name: &'static str,
    },
    #[snafu(display("`{}` must be greater than zero", name))]
    ZeroDuration { name: &'static str },
    #[snafu(display("Access token is malformed: {}", reason))]
    MalformedToken { reason: &'static str },
    #[snafu(display("Unable to decode access token claims"))]
    DecodeTokenClaims { source: base64::DecodeError },
    #[snafu(display("Unable to read access token claims"))]
    ReadTokenClaims { source: serde_json::Error },
    #[snafu(display("Error with sessions"))]
    TowerSession {
        source: axum_login::tower_sessions::session::Error,
    },
    #[snafu(display("Unknown application module `{}`", app))]
    UnknownApp { app: String },
    #[snafu(display("Select at least one {} first", what))]
    NothingSelected { what: &'static str },
    #[snafu(display("`{}` is not a valid email address", email))]
    InvalidEmail {
        source: email_address::Error,
        email: String,
    },
    #[snafu(display("`{}` is not a valid phone number", phone))]
    InvalidPhone { phone: String },
    #[snafu(display("{} cannot be empty", field))]
    EmptyField { field: &'static str },
    #[snafu(display("Error with CSVs"))]
    Csv { source: csv::Error },
    #[snafu(display("Error finishing CSV export"))]
    FlushCsv { source: std::io::Error },
}

impl From<axum_login::Error<JiEduAuthBackend>> for JiEduError {
    fn from(value: axum_login::Error<JiEduAuthBackend>) -> Self {
        match value {
            axum_login::Error::Session(source) => Self::TowerSession { source },
            axum_login::Error::Backend(backend) => backend,
        }
    }
}

impl JiEduError {
    /// The text the user sees for this failure.
    pub fn user_message(&self) -> String {
        match self {
            Self::SendRequest { .. } | Self::DecodeResponse { .. } => FALLBACK_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for JiEduError {
    #[allow(clippy::match_same_arms)]
    fn into_response(self) -> Response {
        const ISE: StatusCode = StatusCode::INTERNAL_SERVER_ERROR; //internal server error
        const BG: StatusCode = StatusCode::BAD_GATEWAY; //backend misbehaved
        const NF: StatusCode = StatusCode::NOT_FOUND; //not found
        const UA: StatusCode = StatusCode::UNAUTHORIZED; //not signed in
        const BI: StatusCode = StatusCode::BAD_REQUEST; //bad input

        let status_code = match &self {
            Self::BuildHttpClient { .. } => ISE,
            Self::SendRequest { .. } | Self::DecodeResponse { .. } => BG,
            Self::ApiRejected { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(BG)
            }
            Self::Unauthorised | Self::NotSignedIn => UA,
            Self::ParseNumber { .. } | Self::ZeroDuration { .. } => ISE,
            Self::MalformedToken { .. } => UA,
            Self::DecodeTokenClaims { .. } | Self::ReadTokenClaims { .. } => UA,
            Self::TowerSession { .. } => ISE,
            Self::UnknownApp { .. } => NF,
            Self::NothingSelected { .. } => BI,
            Self::InvalidEmail { .. } | Self::InvalidPhone { .. } | Self::EmptyField { .. } => BI,
            Self::Csv { .. } | Self::FlushCsv { .. } => ISE,
        };

        error!(?self, "Error!");

        let mut response = (status_code, Html(error_alert(self.user_message()))).into_response();
        // htmx only swaps 2xx by default, so errors need telling where to land
        let headers = response.headers_mut();
        if status_code == UA {
            headers.insert("HX-Redirect", HeaderValue::from_static("/signin"));
        } else {
            headers.insert("HX-Retarget", HeaderValue::from_static("#alerts"));
            headers.insert("HX-Reswap", HeaderValue::from_static("innerHTML"));
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_rejections_keep_their_status() {
        let response = JiEduError::ApiRejected {
            status: 409,
            message: "Student already allocated".into(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert_eq!(response.headers()["HX-Retarget"], "#alerts");
    }

    #[test]
    fn expired_sessions_redirect_to_sign_in() {
        let response = JiEduError::Unauthorised.into_response();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["HX-Redirect"], "/signin");
    }
}
