use crate::{
    auth::{JiEduSession, JiEduUser},
    routes::dashboard::dashboard_tiles,
    state::JiEduState,
};
use axum::extract::State;
use maud::{Markup, html};

const NAV_LINKS: &[(&str, &str)] = &[
    ("/", "Dashboard"),
    ("/students", "Students"),
    ("/applicants", "Applicants"),
    ("/allocation", "Allocation"),
    ("/classes", "Classes"),
    ("/courses", "Courses"),
    ("/branches", "Branches"),
    ("/units", "Units"),
    ("/voteheads", "Voteheads"),
    ("/invoices", "Invoices"),
    ("/receipts", "Receipts"),
    ("/users", "Users"),
    ("/roles", "Roles"),
];

pub fn render_nav(user: Option<&JiEduUser>) -> Markup {
    html! {
        nav class="w-full bg-gray-800 shadow-md px-4 py-2 flex flex-row items-center justify-between" {
            a href="/" class="text-xl font-bold text-blue-400" {"JiEdu"}
            @if let Some(user) = user {
                div class="flex flex-row flex-wrap gap-2" {
                    @for (href, label) in NAV_LINKS {
                        a href=(href) class="hover:bg-slate-700 py-1 px-2 rounded" {(label)}
                    }
                }
                form method="post" action="/signout" class="flex flex-row items-center space-x-2" {
                    span class="text-gray-400" {(user.username)}
                    button type="submit" class="bg-slate-600 hover:bg-slate-800 font-bold py-1 px-3 rounded" {"Sign Out"}
                }
            } @else {
                a href="/signin" class="bg-blue-600 hover:bg-blue-800 font-bold py-1 px-3 rounded" {"Sign In"}
            }
        }
    }
}

pub async fn get_index_route(State(state): State<JiEduState>, session: JiEduSession) -> Markup {
    state.render(&session, html! {
        div class="w-full max-w-6xl flex flex-col space-y-4" {
            h1 class="text-3xl font-semibold" {"Dashboard"}
            (dashboard_tiles())
        }
    })
}
