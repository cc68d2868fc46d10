use crate::error::{JiEduResult, ParseNumberSnafu, ZeroDurationSnafu};
use dotenvy::var;
use snafu::{ResultExt, ensure};
use std::{sync::Arc, time::Duration};

#[derive(Clone, Debug)]
pub struct RuntimeConfiguration {
    api_config: Arc<ApiConfig>,
    ui_config: Arc<UiConfig>,
}

impl RuntimeConfiguration {
    pub fn new() -> JiEduResult<Self> {
        Ok(Self {
            api_config: Arc::new(ApiConfig::new()?),
            ui_config: Arc::new(UiConfig::new()?),
        })
    }

    #[cfg(test)]
    pub fn from_parts(api_config: ApiConfig, ui_config: UiConfig) -> Self {
        Self {
            api_config: Arc::new(api_config),
            ui_config: Arc::new(ui_config),
        }
    }

    pub fn api_config(&self) -> Arc<ApiConfig> {
        self.api_config.clone()
    }

    pub fn ui_config(&self) -> Arc<UiConfig> {
        self.ui_config.clone()
    }
}

fn number_from<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> JiEduResult<T> {
    match raw {
        Some(raw) => raw.trim().parse().context(ParseNumberSnafu { name }),
        None => Ok(default),
    }
}

fn number_or<T: std::str::FromStr<Err = std::num::ParseIntError>>(
    name: &'static str,
    default: T,
) -> JiEduResult<T> {
    number_from(name, var(name).ok(), default)
}

/// Timers can't run on a zero period, so zero is refused up front.
fn positive_millis(name: &'static str, raw: Option<String>, default: u64) -> JiEduResult<Duration> {
    let millis = number_from(name, raw, default)?;
    ensure!(millis > 0, ZeroDurationSnafu { name });
    Ok(Duration::from_millis(millis))
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub request_timeout: Duration,
}

impl ApiConfig {
    pub fn new() -> JiEduResult<Self> {
        let base_url =
            var("JIEDU_API_URL").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(number_or("JIEDU_REQUEST_TIMEOUT_SECS", 30)?),
        })
    }
}

/// Timings the rendered pages and live feeds run on.
#[derive(Debug, Clone)]
pub struct UiConfig {
    pub search_debounce: Duration,
    pub dashboard_poll: Duration,
    pub toast_stagger: Duration,
}

fn ui_millis(name: &'static str, default: u64) -> JiEduResult<Duration> {
    positive_millis(name, var(name).ok(), default)
}

impl UiConfig {
    pub fn new() -> JiEduResult<Self> {
        Ok(Self {
            search_debounce: ui_millis("JIEDU_SEARCH_DEBOUNCE_MS", 300)?,
            dashboard_poll: ui_millis("JIEDU_DASHBOARD_POLL_MS", 3_000)?,
            toast_stagger: ui_millis("JIEDU_TOAST_STAGGER_MS", 2_100)?,
        })
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            search_debounce: Duration::from_millis(300),
            dashboard_poll: Duration::from_millis(3_000),
            toast_stagger: Duration::from_millis(2_100),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JiEduError;

    #[test]
    fn timings_fall_back_to_defaults() {
        assert_eq!(
            positive_millis("JIEDU_DASHBOARD_POLL_MS", None, 3_000).unwrap(),
            Duration::from_millis(3_000)
        );
        assert_eq!(
            positive_millis("JIEDU_DASHBOARD_POLL_MS", Some(" 500 ".into()), 3_000).unwrap(),
            Duration::from_millis(500)
        );
    }

    #[test]
    fn zero_and_garbage_timings_are_refused() {
        assert!(matches!(
            positive_millis("JIEDU_DASHBOARD_POLL_MS", Some("0".into()), 3_000),
            Err(JiEduError::ZeroDuration { name: "JIEDU_DASHBOARD_POLL_MS" })
        ));
        assert!(matches!(
            positive_millis("JIEDU_TOAST_STAGGER_MS", Some("soon".into()), 2_100),
            Err(JiEduError::ParseNumber { name: "JIEDU_TOAST_STAGGER_MS", .. })
        ));
    }
}
