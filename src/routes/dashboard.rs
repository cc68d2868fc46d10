//! Live summary tiles. Each open dashboard gets its own SSE stream which
//! re-fetches the tiles on a fixed interval until the browser goes away.

use crate::{
    api::ApiClient,
    auth::{AuthUtilities, JiEduSession, JiEduUser},
    data::{
        academics::{AttendanceSummary, ClassCount, Lesson},
        pagination::Listing,
    },
    error::JiEduResult,
    maud_conveniences::{render_table, subtitle},
    state::JiEduState,
};
use axum::{
    extract::State,
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::{Stream, StreamExt, stream};
use maud::{Markup, html};
use serde::de::DeserializeOwned;
use std::convert::Infallible;
use tokio::time::{Interval, MissedTickBehavior, interval};

pub const TILE_PAGE_SIZE: usize = 5;

/// Pages through a list a fixed number of rows at a time, wrapping around.
#[derive(Debug, Default, Clone, Copy)]
pub struct TileRotation {
    next_page: usize,
}

impl TileRotation {
    /// Returns this tick's rows along with the (1-based) page shown and the page count.
    pub fn advance<'a, T>(&mut self, items: &'a [T], page_size: usize) -> (&'a [T], usize, usize) {
        let page_size = page_size.max(1);
        let pages = items.len().div_ceil(page_size).max(1);
        let page = self.next_page % pages;
        self.next_page = (page + 1) % pages;

        let start = page * page_size;
        let end = (start + page_size).min(items.len());
        (&items[start.min(items.len())..end], page + 1, pages)
    }
}

pub fn dashboard_tiles() -> Markup {
    let tile = |name: &str, heading: &str| {
        html! {
            div class="bg-gray-800 rounded shadow-md p-4" {
                (subtitle(heading))
                div sse-swap=(name) {
                    p class="italic text-gray-400" {"Loading..."}
                }
            }
        }
    };

    html! {
        div hx-ext="sse" sse-connect="/dashboard/live" class="grid grid-cols-1 lg:grid-cols-3 gap-4" {
            (tile("attendance", "Attendance Today"))
            (tile("class_counts", "Classes per Course"))
            (tile("lessons", "Happening Now"))
        }
    }
}

fn unavailable() -> Markup {
    html! {
        p class="italic text-red-400" {"Unavailable right now"}
    }
}

fn render_attendance(rows: &[AttendanceSummary], page: usize, pages: usize) -> Markup {
    html! {
        (render_table(
            &["Class", "Present", "Absent", "Rate"],
            rows.iter()
                .map(|row| vec![
                    html! { (row.class_name) },
                    html! { (row.present) },
                    html! { (row.absent) },
                    html! {
                        @match row.rate() {
                            Some(rate) => { (rate) "%" }
                            None => { "-" }
                        }
                    },
                ])
                .collect(),
        ))
        p class="text-right text-sm text-gray-400 mt-2" {(page) " / " (pages)}
    }
}

fn render_class_counts(rows: &[ClassCount]) -> Markup {
    render_table(
        &["Course", "Classes", "Students"],
        rows.iter()
            .map(|row| {
                vec![
                    html! { (row.course) },
                    html! { (row.classes) },
                    html! { (row.students) },
                ]
            })
            .collect(),
    )
}

fn render_lessons(rows: &[Lesson]) -> Markup {
    render_table(
        &["Time", "Unit", "Class", "Lecturer", "Room"],
        rows.iter()
            .map(|row| {
                vec![
                    html! { (row.start.strftime("%H:%M")) "–" (row.end.strftime("%H:%M")) },
                    html! { (row.unit) },
                    html! { (row.class_name) },
                    html! { (row.lecturer.as_deref().unwrap_or("-")) },
                    html! { (row.room.as_deref().unwrap_or("-")) },
                ]
            })
            .collect(),
    )
}

async fn fetch_tile<T: DeserializeOwned>(
    api: &ApiClient,
    user: &JiEduUser,
    endpoint: &str,
) -> JiEduResult<Vec<T>> {
    let listing: Listing<T> = api.authorised(user.token()).get(endpoint).await?;
    Ok(listing.into_vec())
}

struct FeedState {
    api: ApiClient,
    user: JiEduUser,
    ticker: Interval,
    rotation: TileRotation,
}

impl FeedState {
    /// One refresh of every tile. Tiles are fetched one after another so a
    /// slow backend delays the next tick instead of stacking requests.
    async fn tick(&mut self) -> Vec<Event> {
        self.ticker.tick().await;

        let attendance = match fetch_tile::<AttendanceSummary>(
            &self.api,
            &self.user,
            "/api/dashboard/attendance-summary/",
        )
        .await
        {
            Ok(rows) => {
                let (window, page, pages) = self.rotation.advance(&rows, TILE_PAGE_SIZE);
                render_attendance(window, page, pages)
            }
            Err(e) => {
                warn!(?e, "Attendance tile failed");
                unavailable()
            }
        };

        let class_counts =
            fetch_tile::<ClassCount>(&self.api, &self.user, "/api/dashboard/class-counts/")
                .await
                .map_or_else(
                    |e| {
                        warn!(?e, "Class counts tile failed");
                        unavailable()
                    },
                    |rows| render_class_counts(&rows),
                );

        let lessons = fetch_tile::<Lesson>(&self.api, &self.user, "/api/timetable/current-lessons/")
            .await
            .map_or_else(
                |e| {
                    warn!(?e, "Lessons tile failed");
                    unavailable()
                },
                |rows| render_lessons(&rows),
            );

        vec![
            Event::default().event("attendance").data(attendance.into_string()),
            Event::default().event("class_counts").data(class_counts.into_string()),
            Event::default().event("lessons").data(lessons.into_string()),
        ]
    }
}

pub async fn dashboard_feed(
    State(state): State<JiEduState>,
    session: JiEduSession,
) -> JiEduResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let user = session.signed_in()?.clone();

    let mut ticker = interval(state.config().ui_config().dashboard_poll);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let feed = FeedState {
        api: state.api().clone(),
        user,
        ticker,
        rotation: TileRotation::default(),
    };

    // dropped, and so stopped, as soon as the client disconnects
    let events = stream::unfold(feed, |mut feed| async move {
        let events = feed.tick().await;
        Some((stream::iter(events.into_iter().map(Ok)), feed))
    })
    .flatten();

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}
