//! Filtering, search and pagination over station lists.
//!
//! Everything here is pure: the inputs are a feed snapshot's stations and the
//! request's parameters, the output is the list of `StationView`s to return.

use crate::domain::{Station, StationStatus, StationView};

/// Page size used when the request does not override it.
pub const DEFAULT_PER_PAGE: usize = 20;

/// Project every station, preserving upstream order.
pub fn all_stations(stations: &[Station]) -> Vec<StationView> {
    stations.iter().map(StationView::from).collect()
}

/// Stations whose status equals `status`, in upstream order.
pub fn filter_by_status(stations: &[Station], status: StationStatus) -> Vec<StationView> {
    stations
        .iter()
        .filter(|s| s.status == status)
        .map(StationView::from)
        .collect()
}

/// Stations whose name or address lines contain `query`.
///
/// Matching is case-insensitive and ignores surrounding whitespace in the
/// query. A query that is empty after trimming matches nothing.
pub fn filter_by_substring(stations: &[Station], query: &str) -> Vec<StationView> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    stations
        .iter()
        .filter(|s| s.search_key().contains(&needle))
        .map(StationView::from)
        .collect()
}

/// Paging parameters after validation.
///
/// Only built through [`Page::from_params`], so `per_page` is always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Requested 1-based page. `None` when absent, unparseable or below 1.
    number: Option<usize>,
    per_page: usize,
}

impl Page {
    pub fn number(&self) -> Option<usize> {
        self.number
    }

    pub fn per_page(&self) -> usize {
        self.per_page
    }

    /// Build from raw `page` / `perPage` query values.
    ///
    /// An override of `perPage` is only honoured when it is a positive
    /// integer. A `page` that is not a positive integer disables paging.
    pub fn from_params(page: Option<&str>, per_page: Option<&str>) -> Self {
        let per_page = per_page
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&n| n > 0)
            .map(|n| n as usize)
            .unwrap_or(DEFAULT_PER_PAGE);

        let number = page
            .and_then(|v| v.trim().parse::<i64>().ok())
            .filter(|&n| n >= 1)
            .map(|n| n as usize);

        Self { number, per_page }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self {
            number: None,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

/// Slice one page out of `views`.
///
/// Pages past the last full page are clamped to the final `per_page` items
/// instead of returning an empty list.
pub fn paginate(mut views: Vec<StationView>, page: Page) -> Vec<StationView> {
    let total = views.len();
    let per_page = page.per_page;

    let Some(number) = page.number else {
        return views;
    };
    if total <= per_page {
        return views;
    }

    let (index_min, index_max) = if number > total / per_page {
        (total - per_page, total)
    } else {
        let index_min = (number - 1) * per_page;
        (index_min, index_min + per_page)
    };

    views.truncate(index_max);
    views.drain(..index_min);
    views
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::station;

    fn views(n: usize) -> Vec<StationView> {
        (0..n)
            .map(|i| StationView {
                name: format!("Station {i}"),
                address: String::new(),
                available_docks: i as i64,
                total_docks: 20,
            })
            .collect()
    }

    fn names(views: &[StationView]) -> Vec<String> {
        views.iter().map(|v| v.name.clone()).collect()
    }

    fn page(number: usize, per_page: usize) -> Page {
        Page {
            number: Some(number),
            per_page,
        }
    }

    #[test]
    fn status_filter_preserves_order() {
        let stations = vec![
            station(1, "Alpha", 3, StationStatus::InService),
            station(2, "Bravo", 3, StationStatus::NotInService),
            station(3, "Charlie", 3, StationStatus::InService),
        ];

        let in_service = filter_by_status(&stations, StationStatus::InService);
        assert_eq!(names(&in_service), vec!["Alpha", "Charlie"]);

        let not_in_service = filter_by_status(&stations, StationStatus::NotInService);
        assert_eq!(names(&not_in_service), vec!["Bravo"]);
    }

    #[test]
    fn substring_search_is_case_insensitive_and_trimmed() {
        let mut main = station(1, "Corner", 3, StationStatus::InService);
        main.address1 = "Main St".to_string();
        let other = station(2, "Broadway", 3, StationStatus::InService);

        let found = filter_by_substring(&[main, other], "  MAIN  ");
        assert_eq!(names(&found), vec!["Corner"]);
    }

    #[test]
    fn substring_search_matches_second_address_line() {
        let mut s = station(1, "Franklin", 3, StationStatus::InService);
        s.address2 = "W Broadway".to_string();

        assert_eq!(filter_by_substring(&[s], "broadway").len(), 1);
    }

    #[test]
    fn blank_query_matches_nothing() {
        let stations = vec![station(1, "Alpha", 3, StationStatus::InService)];

        assert!(filter_by_substring(&stations, "").is_empty());
        assert!(filter_by_substring(&stations, "   ").is_empty());
    }

    #[test]
    fn no_page_returns_everything() {
        let result = paginate(views(45), Page::from_params(None, None));
        assert_eq!(result.len(), 45);
    }

    #[test]
    fn short_list_is_not_paged() {
        let result = paginate(views(15), page(2, 20));
        assert_eq!(result.len(), 15);
    }

    #[test]
    fn in_range_page_is_a_contiguous_slice() {
        let result = paginate(views(45), page(2, 20));
        assert_eq!(result, views(45)[20..40].to_vec());
    }

    #[test]
    fn page_past_the_end_is_clamped_to_last_full_window() {
        let result = paginate(views(25), page(5, 10));
        assert_eq!(result, views(25)[15..25].to_vec());
    }

    #[test]
    fn partial_last_page_is_clamped() {
        // 25 / 10 == 2 full pages, so page 3 clamps rather than returning 5 items.
        let result = paginate(views(25), page(3, 10));
        assert_eq!(result, views(25)[15..25].to_vec());
    }

    #[test]
    fn per_page_override() {
        let p = Page::from_params(Some("1"), Some("7"));
        assert_eq!(p, page(1, 7));
        assert_eq!(paginate(views(30), p).len(), 7);
    }

    #[test]
    fn invalid_per_page_is_ignored() {
        assert_eq!(Page::from_params(None, Some("0")).per_page, DEFAULT_PER_PAGE);
        assert_eq!(Page::from_params(None, Some("-3")).per_page, DEFAULT_PER_PAGE);
        assert_eq!(Page::from_params(None, Some("lots")).per_page, DEFAULT_PER_PAGE);
    }

    #[test]
    fn zero_per_page_never_reaches_the_division() {
        let result = paginate(views(30), Page::from_params(Some("2"), Some("0")));
        // Falls back to 20 per page; 30 / 20 == 1 full page, so page 2 clamps.
        assert_eq!(result, views(30)[10..30].to_vec());
    }

    #[test]
    fn invalid_page_disables_paging() {
        assert_eq!(Page::from_params(Some("invalidpage"), None).number, None);
        assert_eq!(Page::from_params(Some("0"), None).number, None);
        assert_eq!(Page::from_params(Some("-1"), None).number, None);

        let result = paginate(views(45), Page::from_params(Some("invalidpage"), None));
        assert_eq!(result.len(), 45);
    }
}
