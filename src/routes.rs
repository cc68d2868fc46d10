use crate::{
    auth::{JiEduSession, backend::JiEduAuthBackend},
    data::{
        Resource,
        academics::{Branch, Course, SchoolClass, Unit},
        finance::{Invoice, Receipt, Votehead},
        people::{Applicant, Student, User},
    },
    error::JiEduError,
    maud_conveniences::urlencode,
    routes::{
        batch::{
            get_allocation_page, internal_get_allocation_students, internal_post_allocation,
            internal_post_batch,
        },
        dashboard::dashboard_feed,
        export::export_csv,
        index::get_index_route,
        lists::{get_list_page, internal_get_list},
        registration::{get_new_student, internal_post_new_student},
        roles::{get_role, get_roles, internal_get_matrix, internal_post_matrix},
        signin::{get_signin, post_signin, post_signout},
        sse::sse_feed,
        units::get_unit,
    },
    state::{JiEduState, SESSION_IDLE_HOURS},
};
use axum::{
    Router,
    extract::Request,
    middleware::{Next, from_fn},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use axum_login::AuthManagerLayerBuilder;
use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer, cookie::time::Duration};

pub mod batch;
pub mod dashboard;
pub mod export;
pub mod index;
pub mod lists;
pub mod registration;
pub mod roles;
pub mod signin;
pub mod sse;
pub mod units;

const MAX_BODY_BYTES: usize = 256 * 1024;

/// Everything but sign-in needs a session. Full page loads are sent to the
/// sign-in page, htmx requests are told to go there themselves.
async fn require_sign_in(session: JiEduSession, request: Request, next: Next) -> Response {
    if session.user.is_some() {
        return next.run(request).await;
    }

    if request.headers().contains_key("HX-Request") {
        return JiEduError::NotSignedIn.into_response();
    }

    let wanted = request
        .uri()
        .path_and_query()
        .map_or("/", |path_and_query| path_and_query.as_str());
    Redirect::to(&format!("/signin?next={}", urlencode(wanted))).into_response()
}

fn resource_routes<R: Resource>(router: Router<JiEduState>) -> Router<JiEduState> {
    router
        .route(&format!("/{}", R::SLUG), get(get_list_page::<R>))
        .route(&format!("/internal/list/{}", R::SLUG), get(internal_get_list::<R>))
        .route(&format!("/export/{}", R::SLUG), get(export_csv::<R>))
}

pub fn router(state: JiEduState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_expiry(Expiry::OnInactivity(Duration::hours(SESSION_IDLE_HOURS)));
    let auth_backend = JiEduAuthBackend::new(state.clone());
    let auth_layer = AuthManagerLayerBuilder::new(auth_backend, session_layer).build();

    let mut guarded = Router::new()
        .route("/", get(get_index_route))
        .route("/dashboard/live", get(dashboard_feed))
        .route("/sse_feed", get(sse_feed))
        .route("/students/new", get(get_new_student))
        .route("/internal/students/new", post(internal_post_new_student))
        .route("/units/{id}", get(get_unit))
        .route("/allocation", get(get_allocation_page))
        .route("/internal/allocation", post(internal_post_allocation))
        .route(
            "/internal/allocation/students",
            get(internal_get_allocation_students),
        )
        .route("/internal/batch/{action}", post(internal_post_batch))
        .route("/roles", get(get_roles))
        .route("/roles/{group}", get(get_role))
        .route(
            "/internal/roles/{group}/matrix",
            get(internal_get_matrix).post(internal_post_matrix),
        );

    guarded = resource_routes::<Student>(guarded);
    guarded = resource_routes::<Applicant>(guarded);
    guarded = resource_routes::<User>(guarded);
    guarded = resource_routes::<SchoolClass>(guarded);
    guarded = resource_routes::<Course>(guarded);
    guarded = resource_routes::<Branch>(guarded);
    guarded = resource_routes::<Unit>(guarded);
    guarded = resource_routes::<Votehead>(guarded);
    guarded = resource_routes::<Invoice>(guarded);
    guarded = resource_routes::<Receipt>(guarded);

    Router::new()
        .route("/signin", get(get_signin).post(post_signin))
        .route("/signout", post(post_signout))
        .merge(guarded.route_layer(from_fn(require_sign_in)))
        .layer(auth_layer)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiConfig, RuntimeConfiguration, UiConfig};
    use axum::{
        body::Body,
        http::{self, StatusCode, header},
    };
    use tower::ServiceExt;

    fn app() -> Router {
        let config = RuntimeConfiguration::from_parts(
            ApiConfig {
                base_url: "http://127.0.0.1:9".into(),
                request_timeout: std::time::Duration::from_secs(1),
            },
            UiConfig::default(),
        );
        router(JiEduState::new(config).unwrap())
    }

    fn get_request(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn pages_redirect_to_sign_in() {
        let response = app()
            .oneshot(get_request("/students?page=2"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/signin?next=%2Fstudents%3Fpage%3D2"
        );
    }

    #[tokio::test]
    async fn htmx_requests_are_told_to_redirect() {
        let response = app()
            .oneshot(
                http::Request::builder()
                    .uri("/internal/list/applicants")
                    .header("HX-Request", "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()["HX-Redirect"], "/signin");
    }

    #[tokio::test]
    async fn sign_in_page_is_public() {
        let response = app()
            .oneshot(get_request("/signin"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn every_resource_has_a_list_and_an_export() {
        for slug in [
            "students", "applicants", "users", "classes", "courses", "branches", "units",
            "voteheads", "invoices", "receipts",
        ] {
            for path in [format!("/{slug}"), format!("/export/{slug}")] {
                let response = app()
                    .oneshot(get_request(&path))
                    .await
                    .unwrap();

                assert_eq!(response.status(), StatusCode::SEE_OTHER, "{path}");
            }
        }
    }
}
