use crate::{
    api::{ApiClient, Authorised},
    auth::{JiEduSession, JiEduUser},
    config::RuntimeConfiguration,
    data::{
        pagination::Listing,
        permissions::{Permission, PermissionMap},
    },
    error::JiEduResult,
    routes::sse::SseEvent,
};
use jiff::{SignedDuration, Timestamp};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{
    RwLock,
    broadcast::{Receiver, Sender, channel},
};
use uuid::Uuid;

/// How long a session may sit unused before it and its token are dropped.
pub const SESSION_IDLE_HOURS: i64 = 12;

const TOAST_KEYFRAMES: &str = "@keyframes toast-lifecycle { 0% { opacity: 0; transform: translateX(1rem); } 10%, 85% { opacity: 1; transform: none; } 100% { opacity: 0; } }";
const HTMX_CONFIG: &str = r#"{"responseHandling": [{"code": "204", "swap": false}, {"code": "[23]..", "swap": true}, {"code": "[45]..", "swap": true, "error": true}]}"#;

#[derive(Clone, Debug)]
struct SignedIn {
    user: JiEduUser,
    last_seen: Timestamp,
}

/// Drops users whose token has expired or who have not been seen for longer
/// than a session may idle.
fn prune_signed_in(signed_in: &mut HashMap<Uuid, SignedIn>, now: Timestamp) {
    let idle_limit = SignedDuration::from_hours(SESSION_IDLE_HOURS);
    let before = signed_in.len();

    signed_in.retain(|_, entry| {
        !entry.user.is_expired(now) && now.duration_since(entry.last_seen) <= idle_limit
    });

    let pruned = before - signed_in.len();
    if pruned > 0 {
        debug!(pruned, remaining = signed_in.len(), "Pruned stale sign-ins");
    }
}

#[derive(Clone, Debug)]
pub struct JiEduState {
    api: ApiClient,
    config: RuntimeConfiguration,
    sse_events_sender: Sender<SseEvent>,
    signed_in: Arc<RwLock<HashMap<Uuid, SignedIn>>>,
    permission_map: Arc<RwLock<Option<Arc<PermissionMap>>>>,
}

impl JiEduState {
    pub fn new(config: RuntimeConfiguration) -> JiEduResult<Self> {
        let api = ApiClient::new(&config.api_config())?;
        let (tx, _rx) = channel(16);

        Ok(Self {
            api,
            config,
            sse_events_sender: tx,
            signed_in: Arc::default(),
            permission_map: Arc::default(),
        })
    }

    pub const fn api(&self) -> &ApiClient {
        &self.api
    }

    pub const fn config(&self) -> &RuntimeConfiguration {
        &self.config
    }

    #[allow(clippy::unused_self, clippy::needless_pass_by_value)]
    pub fn render(&self, session: &JiEduSession, markup: Markup) -> Markup {
        let nav = crate::routes::index::render_nav(session.user.as_ref());

        html! {
            (DOCTYPE)
            html {
                head {
                    meta charset="UTF-8" {}
                    meta name="viewport" content="width=device-width, initial-scale=1.0" {}
                    meta name="htmx-config" content=(HTMX_CONFIG) {}
                    script src="https://unpkg.com/htmx.org@2.0.4" integrity="sha384-HGfztofotfshcF7+8n44JQL2oJmowVChPTg48S+jvZoztPfvwD79OC/LTtG6dMp+" crossorigin="anonymous" {}
                    script src="https://unpkg.com/htmx-ext-sse@2.2.3" integrity="sha384-Y4gc0CK6Kg+hmulDc6rZPJu0tqvk7EWlih0Oh+2OkAi1ZDlCbBDCQEE2uVk472Ky" crossorigin="anonymous" {}
                    script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4" {}
                    style { (PreEscaped(TOAST_KEYFRAMES)) }
                    title { "JiEdu Admin" }
                }
                body hx-ext="sse" class="bg-gray-900 min-h-screen flex flex-col items-center text-white" {
                    (nav)
                    div id="alerts" {}
                    div id="toasts" class="fixed top-4 right-4 flex flex-col space-y-2 z-50" {}
                    main class="w-full flex flex-col items-center p-4" {
                        (markup)
                    }
                }
            }
        }
    }

    pub fn subscribe_to_sse_feed(&self) -> Receiver<SseEvent> {
        self.sse_events_sender.subscribe()
    }

    pub fn send_sse_event(&self, event: SseEvent) {
        let _ = self.sse_events_sender.send(event);
    }

    pub async fn remember_user(&self, user: JiEduUser) {
        let now = Timestamp::now();
        let mut signed_in = self.signed_in.write().await;
        prune_signed_in(&mut signed_in, now);
        signed_in.insert(
            user.id,
            SignedIn {
                user,
                last_seen: now,
            },
        );
    }

    pub async fn find_user(&self, id: Uuid) -> Option<JiEduUser> {
        let mut signed_in = self.signed_in.write().await;
        let entry = signed_in.get_mut(&id)?;
        entry.last_seen = Timestamp::now();
        Some(entry.user.clone())
    }

    pub async fn forget_user(&self, id: Uuid) {
        self.signed_in.write().await.remove(&id);
    }

    /// The codename to id map is fetched on first use and then kept.
    pub async fn permission_map(&self, api: Authorised<'_>) -> JiEduResult<Arc<PermissionMap>> {
        if let Some(map) = self.permission_map.read().await.as_ref() {
            return Ok(map.clone());
        }

        let mut slot = self.permission_map.write().await;
        if let Some(map) = slot.as_ref() {
            return Ok(map.clone());
        }

        let listing: Listing<Permission> = api.get("/api/permissions/").await?;
        let map = Arc::new(PermissionMap::from_permissions(listing.into_vec()));
        info!(count = map.len(), "Loaded permission codenames");
        *slot = Some(map.clone());
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
    use secrecy::SecretString;

    fn user_expiring_at(exp: i64) -> JiEduUser {
        let payload = BASE64_URL_SAFE_NO_PAD.encode(format!(r#"{{"user_id": 1, "exp": {exp}}}"#));
        JiEduUser::new("bursar".into(), SecretString::from(format!("h.{payload}.s")))
    }

    fn entry(user: JiEduUser, last_seen: Timestamp) -> (Uuid, SignedIn) {
        (user.id, SignedIn { user, last_seen })
    }

    #[test]
    fn expired_and_idle_sign_ins_are_dropped() {
        let now = Timestamp::from_second(1_000_000).unwrap();
        let long_ago = now - SignedDuration::from_hours(SESSION_IDLE_HOURS + 1);
        let recently = now - SignedDuration::from_mins(5);

        let fresh = user_expiring_at(2_000_000);
        let fresh_id = fresh.id;
        let opaque = JiEduUser::new("registrar".into(), SecretString::from("opaque"));
        let opaque_id = opaque.id;

        let mut signed_in = HashMap::from([
            entry(fresh, recently),
            entry(user_expiring_at(999_999), recently),
            entry(user_expiring_at(2_000_000), long_ago),
            entry(opaque, recently),
        ]);
        prune_signed_in(&mut signed_in, now);

        let mut kept: Vec<_> = signed_in.keys().copied().collect();
        kept.sort();
        let mut expected = vec![fresh_id, opaque_id];
        expected.sort();
        assert_eq!(kept, expected);
    }

    #[test]
    fn opaque_tokens_still_go_when_idle() {
        let now = Timestamp::from_second(1_000_000).unwrap();
        let opaque = JiEduUser::new("registrar".into(), SecretString::from("opaque"));

        let mut signed_in = HashMap::from([entry(
            opaque,
            now - SignedDuration::from_hours(SESSION_IDLE_HOURS * 2),
        )]);
        prune_signed_in(&mut signed_in, now);

        assert!(signed_in.is_empty());
    }
}
