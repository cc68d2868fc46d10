use crate::{
    auth::{JiEduSession, backend::JiEduAuthCredentials},
    error::JiEduResult,
    maud_conveniences::{form_submit_button, simple_form_element, title, urlencode},
    state::JiEduState,
};
use axum::{
    Form,
    extract::{Query, State},
    response::Redirect,
};
use maud::{Markup, html};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SigninOptions {
    pub next: Option<String>,
    pub login_failed: Option<bool>,
}

/// Only same-site paths are followed after signing in.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        // browsers read `/\` like `//`
        Some(next)
            if next.starts_with('/') && !next.starts_with("//") && !next.starts_with("/\\") =>
        {
            next
        }
        _ => "/",
    }
}

pub async fn get_signin(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Query(SigninOptions { next, login_failed }): Query<SigninOptions>,
) -> Markup {
    // shown even with a session, the backend may have stopped honouring its token
    state.render(&session, html! {
        div class="bg-gray-800 shadow-md rounded px-8 pt-6 pb-8 mb-4 w-full max-w-sm" {
            (title("Sign In"))
            @if login_failed.unwrap_or(false) {
                div role="alert" class="bg-red-100 border border-red-400 text-red-700 px-4 py-4 rounded relative" {
                    strong class="font-bold" {"Alert!"}
                    br;
                    span class="block sm:inline" {"Username or password incorrect"}
                }
                br;
            }

            form method="post" action="/signin" {
                @if let Some(next) = next {
                    input type="hidden" name="next" value=(next);
                }
                (simple_form_element("username", "Username", true, None, None))
                (simple_form_element("password", "Password", true, Some("password"), None))
                (form_submit_button(Some("Sign In")))
            }
        }
    })
}

#[derive(Deserialize)]
pub struct SigninForm {
    username: String,
    password: SecretString,
    next: Option<String>,
}

pub async fn post_signin(
    mut session: JiEduSession,
    Form(SigninForm {
        username,
        password,
        next,
    }): Form<SigninForm>,
) -> JiEduResult<Redirect> {
    let credentials = JiEduAuthCredentials::UsernamePassword {
        username: username.trim().to_string(),
        password,
    };

    match session.authenticate(credentials).await? {
        Some(user) => {
            session.login(&user).await?;
            Ok(Redirect::to(safe_next(next.as_deref())))
        }
        None => {
            let mut redirect = "/signin?login_failed=true".to_string();
            if let Some(next) = next {
                redirect += &format!("&next={}", urlencode(&next));
            }
            Ok(Redirect::to(&redirect))
        }
    }
}

pub async fn post_signout(
    State(state): State<JiEduState>,
    mut session: JiEduSession,
) -> JiEduResult<Redirect> {
    if let Some(user) = session.logout().await? {
        state.forget_user(user.id).await;
        info!(username = %user.username, "Signed out");
    }
    Ok(Redirect::to("/signin"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_paths_are_followed() {
        assert_eq!(safe_next(Some("/students?page=2")), "/students?page=2");
        assert_eq!(safe_next(Some("https://elsewhere.example")), "/");
        assert_eq!(safe_next(Some("//elsewhere.example")), "/");
        assert_eq!(safe_next(Some(r"/\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
