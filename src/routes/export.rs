use crate::{
    api::Authorised,
    auth::{AuthUtilities, JiEduSession},
    data::{Resource, pagination::ListQuery},
    error::{CsvSnafu, FlushCsvSnafu, JiEduResult},
    state::JiEduState,
};
use axum::{
    extract::{Query, State},
    http::header,
    response::IntoResponse,
};
use serde::Deserialize;
use snafu::ResultExt;

/// Upper bound on pages walked for one export.
const MAX_EXPORT_PAGES: u32 = 200;

#[derive(Deserialize)]
pub struct ExportQuery {
    pub search: Option<String>,
}

async fn collect_all<R: Resource>(api: Authorised<'_>, search: &str) -> JiEduResult<Vec<R>> {
    let mut query = ListQuery::first_page(search);
    let mut items = vec![];

    loop {
        let page = api.list::<R>(R::ENDPOINT, &query).await?;
        let total = page.page_count();
        items.extend(page.results);

        let current = query.page();
        if current >= total {
            break;
        }
        if current >= MAX_EXPORT_PAGES {
            warn!(resource = R::SLUG, total, "Export truncated");
            break;
        }
        query = query.with_page(current + 1);
    }

    Ok(items)
}

pub fn write_csv<R: Resource>(items: &[R]) -> JiEduResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(vec![]);
    writer.write_record(R::CSV_HEADER).context(CsvSnafu)?;
    for item in items {
        writer.write_record(item.csv_record()).context(CsvSnafu)?;
    }

    writer
        .into_inner()
        .map_err(csv::IntoInnerError::into_error)
        .context(FlushCsvSnafu)
}

pub async fn export_csv<R: Resource>(
    State(state): State<JiEduState>,
    session: JiEduSession,
    Query(ExportQuery { search }): Query<ExportQuery>,
) -> JiEduResult<impl IntoResponse> {
    let user = session.signed_in()?;
    let search = search.unwrap_or_default();

    let items = collect_all::<R>(state.api().authorised(user.token()), search.trim()).await?;
    info!(resource = R::SLUG, count = items.len(), "Exporting CSV");
    let body = write_csv(&items)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}.csv\"", R::SLUG),
            ),
        ],
        body,
    ))
}
