//! Applying one action to many selected records.
//!
//! Approvals, declines and promotions go to the backend as one request and
//! come back as one entry per id. Class allocation is one request per student,
//! sent one at a time, and stops at the first rejection. Nothing already
//! applied is rolled back.

use crate::error::{JiEduError, JiEduResult};
use serde::{Deserialize, Deserializer};
use std::{future::Future, time::Duration};

/// One per-id entry of a batch response: `{message}` or `{error}`, where
/// `error` may be a string or a list of strings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ItemResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub error: Vec<String>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    let messages = match Option::<OneOrMany>::deserialize(deserializer)? {
        None => vec![],
        Some(OneOrMany::One(message)) => vec![message],
        Some(OneOrMany::Many(messages)) => messages,
    };
    Ok(messages
        .into_iter()
        .filter(|message| !message.trim().is_empty())
        .collect())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Succeeded(String),
    Rejected(String),
}

impl From<ItemResponse> for ItemOutcome {
    fn from(value: ItemResponse) -> Self {
        if value.error.is_empty() {
            Self::Succeeded(value.message.unwrap_or_else(|| "Done".to_string()))
        } else {
            Self::Rejected(value.error.join("; "))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub text: String,
    pub delay: Duration,
}

pub fn toast_schedule(count: usize, stagger: Duration) -> impl Iterator<Item = Duration> {
    (0..count).map(move |i| stagger.saturating_mul(u32::try_from(i).unwrap_or(u32::MAX)))
}

/// One toast per outcome, in order, the `i`th shown `i * stagger` after the first.
pub fn toasts_for(
    outcomes: impl IntoIterator<Item = ItemOutcome>,
    stagger: Duration,
) -> Vec<Toast> {
    let outcomes: Vec<_> = outcomes.into_iter().collect();
    let schedule = toast_schedule(outcomes.len(), stagger);

    outcomes
        .into_iter()
        .zip(schedule)
        .map(|(outcome, delay)| match outcome {
            ItemOutcome::Succeeded(text) => Toast {
                kind: ToastKind::Success,
                text,
                delay,
            },
            ItemOutcome::Rejected(text) => Toast {
                kind: ToastKind::Error,
                text,
                delay,
            },
        })
        .collect()
}

/// Actions the backend takes as one request for many ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchAction {
    Approve,
    Decline,
    Promote,
}

impl BatchAction {
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::Approve => "/api/applicants/approve/",
            Self::Decline => "/api/applicants/decline/",
            Self::Promote => "/api/students/promote/",
        }
    }

    pub const fn endpoint_slug(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Decline => "decline",
            Self::Promote => "promote",
        }
    }

    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Approve => "approved",
            Self::Decline => "declined",
            Self::Promote => "promoted",
        }
    }

    pub const fn subject(self) -> &'static str {
        match self {
            Self::Approve | Self::Decline => "applicant",
            Self::Promote => "student",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationStop {
    Rejected { id: i64, errors: Vec<String> },
    Failed { id: i64, message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationReport {
    pub requested: usize,
    pub applied: Vec<(i64, Option<String>)>,
    pub stopped: Option<AllocationStop>,
}

impl AllocationReport {
    pub fn outcomes(&self) -> Vec<ItemOutcome> {
        let mut outcomes: Vec<_> = self
            .applied
            .iter()
            .map(|(id, message)| {
                ItemOutcome::Succeeded(
                    message
                        .clone()
                        .unwrap_or_else(|| format!("Student {id} allocated")),
                )
            })
            .collect();

        match &self.stopped {
            Some(AllocationStop::Rejected { id, errors }) => {
                outcomes.push(ItemOutcome::Rejected(format!(
                    "Student {id}: {}",
                    errors.join("; ")
                )));
            }
            Some(AllocationStop::Failed { id, message }) => {
                outcomes.push(ItemOutcome::Rejected(format!("Student {id}: {message}")));
            }
            None => {}
        }
        outcomes
    }
}

/// Allocates each id in turn, stopping at the first response carrying an
/// error. Ids after that are never attempted.
pub async fn allocate_sequentially<F, Fut>(
    ids: &[i64],
    mut allocate_one: F,
) -> JiEduResult<AllocationReport>
where
    F: FnMut(i64) -> Fut,
    Fut: Future<Output = JiEduResult<ItemResponse>>,
{
    let mut report = AllocationReport {
        requested: ids.len(),
        ..Default::default()
    };

    for &id in ids {
        match allocate_one(id).await {
            Ok(ItemResponse { message, error }) if error.is_empty() => {
                report.applied.push((id, message));
            }
            Ok(ItemResponse { error, .. }) => {
                warn!(
                    id,
                    ?error,
                    applied = report.applied.len(),
                    "Allocation rejected, stopping"
                );
                report.stopped = Some(AllocationStop::Rejected { id, errors: error });
                break;
            }
            Err(JiEduError::Unauthorised) => return Err(JiEduError::Unauthorised),
            Err(e) => {
                error!(?e, id, "Allocation request failed, stopping");
                report.stopped = Some(AllocationStop::Failed {
                    id,
                    message: e.user_message(),
                });
                break;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn ok(message: &str) -> ItemResponse {
        ItemResponse {
            message: Some(message.into()),
            error: vec![],
        }
    }

    fn rejected(error: &str) -> ItemResponse {
        ItemResponse {
            message: None,
            error: vec![error.into()],
        }
    }

    #[test]
    fn item_errors_may_be_strings_lists_or_blank() {
        let single: ItemResponse = serde_json::from_str(r#"{"error": "Class is full"}"#).unwrap();
        let many: ItemResponse =
            serde_json::from_str(r#"{"error": ["Fees pending", " "], "message": null}"#).unwrap();
        let blank: ItemResponse =
            serde_json::from_str(r#"{"error": [], "message": "Allocated"}"#).unwrap();

        assert_eq!(single.error, vec!["Class is full"]);
        assert_eq!(many.error, vec!["Fees pending"]);
        assert_eq!(ItemOutcome::from(blank), ItemOutcome::Succeeded("Allocated".into()));
    }

    #[test]
    fn toasts_are_staggered_in_order() {
        let toasts = toasts_for(
            [
                ItemOutcome::Succeeded("Approved Amina".into()),
                ItemOutcome::Rejected("Brian has no KCSE results".into()),
                ItemOutcome::Succeeded("Approved Chege".into()),
            ],
            Duration::from_millis(2_100),
        );

        let delays: Vec<_> = toasts.iter().map(|t| t.delay.as_millis()).collect();
        assert_eq!(delays, vec![0, 2_100, 4_200]);
        assert_eq!(toasts[1].kind, ToastKind::Error);
        assert_eq!(toasts[2].text, "Approved Chege");
    }

    #[tokio::test]
    async fn allocation_stops_at_the_first_error() {
        let attempted = RefCell::new(vec![]);

        let report = allocate_sequentially(&[1, 2, 3, 4], |id| {
            attempted.borrow_mut().push(id);
            async move {
                Ok(if id == 2 { rejected("Class is full") } else { ok("Allocated") })
            }
        })
        .await
        .unwrap();

        assert_eq!(*attempted.borrow(), vec![1, 2]);
        assert_eq!(report.requested, 4);
        assert_eq!(report.applied, vec![(1, Some("Allocated".to_string()))]);
        assert_eq!(
            report.stopped,
            Some(AllocationStop::Rejected { id: 2, errors: vec!["Class is full".into()] })
        );
        assert_eq!(report.outcomes().len(), 2);
    }

    #[tokio::test]
    async fn allocation_runs_through_when_nothing_fails() {
        let report = allocate_sequentially(&[5, 6], |_| async { Ok(ItemResponse::default()) })
            .await
            .unwrap();

        assert_eq!(report.applied.len(), 2);
        assert!(report.stopped.is_none());
        assert_eq!(
            report.outcomes()[0],
            ItemOutcome::Succeeded("Student 5 allocated".into())
        );
    }

    #[tokio::test]
    async fn transport_failures_stop_the_loop_too() {
        let attempted = RefCell::new(0);

        let report = allocate_sequentially(&[1, 2, 3], |id| {
            *attempted.borrow_mut() += 1;
            async move {
                if id == 1 {
                    Err(JiEduError::ApiRejected {
                        status: 502,
                        message: "Bad gateway".into(),
                    })
                } else {
                    Ok(ok("Allocated"))
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(*attempted.borrow(), 1);
        assert!(report.applied.is_empty());
        assert!(matches!(report.stopped, Some(AllocationStop::Failed { id: 1, .. })));
    }

    #[tokio::test]
    async fn forbidden_allocations_stop_the_loop() {
        use crate::api::test_backend;
        use axum::{Json, Router, http::StatusCode, routing::post};
        use secrecy::SecretString;
        use serde_json::json;
        use std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        };

        let hits = Arc::new(AtomicUsize::new(0));
        let backend_hits = hits.clone();
        let backend = Router::new().route(
            "/api/students/{id}/allocate/",
            post(move || {
                let hits = backend_hits.clone();
                async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (
                        StatusCode::FORBIDDEN,
                        Json(json!({"detail": "You do not have permission."})),
                    )
                }
            }),
        );
        let client = test_backend::spawn(backend).await;
        let token = SecretString::from("t");
        let api = client.authorised(&token);

        let report = allocate_sequentially(&[1, 2, 3], |id| {
            let endpoint = format!("/api/students/{id}/allocate/");
            async move { api.post_item(&endpoint, &json!({"class_id": 9})).await }
        })
        .await
        .unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(report.applied.is_empty());
        assert_eq!(
            report.stopped,
            Some(AllocationStop::Failed {
                id: 1,
                message: "You do not have permission.".into(),
            })
        );
        assert_eq!(
            report.outcomes(),
            vec![ItemOutcome::Rejected("Student 1: You do not have permission.".into())]
        );
    }

    #[tokio::test]
    async fn expired_sessions_abort_the_whole_batch() {
        let result =
            allocate_sequentially(&[1, 2], |_| async { Err(JiEduError::Unauthorised) }).await;

        assert!(matches!(result, Err(JiEduError::Unauthorised)));
    }
}
