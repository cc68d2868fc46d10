use serde::{Deserialize, Serialize};

/// One page of a list endpoint.
///
/// The backend is not consistent about which page-count field it sends, so
/// both are accepted and [`Paginated::page_count`] picks whichever is present.
#[derive(Debug, Clone, Deserialize)]
pub struct Paginated<T> {
    pub results: Vec<T>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub num_pages: Option<u32>,
    #[serde(default)]
    pub count: Option<u64>,
}

impl<T> Paginated<T> {
    pub fn page_count(&self) -> u32 {
        self.total_pages.or(self.num_pages).unwrap_or(1).max(1)
    }
}

/// Endpoints that are not always paginated come back in either shape.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Listing<T> {
    Plain(Vec<T>),
    Paged { results: Vec<T> },
}

impl<T> Listing<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Self::Plain(items) | Self::Paged { results: items } => items,
        }
    }
}

/// Query string accepted by every list view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
}

impl ListQuery {
    pub fn search(&self) -> &str {
        self.search.as_deref().map_or("", str::trim)
    }

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn first_page(search: &str) -> Self {
        Self {
            search: Some(search.to_string()),
            page: Some(1),
        }
    }

    pub fn with_page(&self, page: u32) -> Self {
        Self {
            search: self.search.clone(),
            page: Some(page),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageControls {
    pub page: u32,
    pub total: u32,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl PageControls {
    pub fn new(page: u32, total: u32) -> Self {
        let total = total.max(1);
        let page = page.clamp(1, total);

        Self {
            page,
            total,
            previous: (page > 1).then(|| page - 1),
            next: (page < total).then(|| page + 1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_count_falls_back_to_num_pages_then_one() {
        let with_total: Paginated<u8> =
            serde_json::from_str(r#"{"results": [], "total_pages": 4, "num_pages": 9}"#).unwrap();
        let with_num: Paginated<u8> =
            serde_json::from_str(r#"{"results": [], "num_pages": 9}"#).unwrap();
        let with_neither: Paginated<u8> = serde_json::from_str(r#"{"results": []}"#).unwrap();
        let with_zero: Paginated<u8> =
            serde_json::from_str(r#"{"results": [], "total_pages": 0}"#).unwrap();

        assert_eq!(with_total.page_count(), 4);
        assert_eq!(with_num.page_count(), 9);
        assert_eq!(with_neither.page_count(), 1);
        assert_eq!(with_zero.page_count(), 1);
    }

    #[test]
    fn controls_clamp_into_range() {
        assert_eq!(
            PageControls::new(0, 3),
            PageControls {
                page: 1,
                total: 3,
                previous: None,
                next: Some(2),
            }
        );
        assert_eq!(
            PageControls::new(7, 3),
            PageControls {
                page: 3,
                total: 3,
                previous: Some(2),
                next: None,
            }
        );
        assert_eq!(
            PageControls::new(1, 0),
            PageControls {
                page: 1,
                total: 1,
                previous: None,
                next: None,
            }
        );
    }

    #[test]
    fn missing_or_zero_page_means_first_page() {
        assert_eq!(ListQuery::default().page(), 1);
        let zeroth = ListQuery {
            search: None,
            page: Some(0),
        };
        assert_eq!(zeroth.page(), 1);
        assert_eq!(ListQuery::first_page("  ada ").search(), "ada");
    }
}
