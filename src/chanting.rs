use crate::errors::ApiError;
use crate::http::{ApiClient, RequestOptions};
use crate::models::{ChantingEntry, DashboardStats, NewChantingEntry, Page};
use crate::notify::{surface_error, Notifier};
use crate::stats::{range_window_at, DashboardRange};
use crate::validation::check_rounds;
use chrono::{Duration, NaiveDate};
use std::sync::Arc;

pub const CHANTING_PATH: &str = "/api/chanting";
pub const DASHBOARD_PATH: &str = "/api/chanting/dashboard";

/// Entries older than this many days can no longer be edited or deleted.
pub const EDIT_WINDOW_DAYS: i64 = 5;
pub const PAGE_SIZES: [u32; 4] = [10, 25, 50, 100];
pub const DEFAULT_SORT_FIELD: &str = "chantingDate";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    /// Zero-based.
    pub page: u32,
    pub size: u32,
    pub sort_field: String,
    pub direction: SortDirection,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: PAGE_SIZES[0],
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

impl PageRequest {
    pub fn sort_param(&self) -> String {
        format!("{},{}", self.sort_field, self.direction.as_str())
    }

    pub fn to_options(&self) -> RequestOptions {
        RequestOptions::new()
            .query("page", self.page)
            .query("size", self.size)
            .query("sort", self.sort_param())
    }
}

/// Pagination and sort state of the history table. Pages are 1-based here
/// and converted when a request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTable {
    page: u32,
    size: u32,
    direction: SortDirection,
    total_pages: u32,
}

impl Default for HistoryTable {
    fn default() -> Self {
        Self {
            page: 1,
            size: PAGE_SIZES[0],
            direction: SortDirection::Desc,
            total_pages: 1,
        }
    }
}

impl HistoryTable {
    pub fn new(page: u32, size: u32, direction: SortDirection) -> Self {
        let mut table = Self {
            direction,
            ..Self::default()
        };
        table.set_size(size);
        table.page = page.max(1);
        table
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    /// Unsupported sizes snap back to the smallest one; the page is kept.
    pub fn set_size(&mut self, size: u32) {
        self.size = if PAGE_SIZES.contains(&size) { size } else { PAGE_SIZES[0] };
    }

    pub fn toggle_direction(&mut self) {
        self.direction = self.direction.toggled();
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn prev(&mut self) {
        if self.has_prev() {
            self.page -= 1;
        }
    }

    pub fn next(&mut self) {
        if self.has_next() {
            self.page += 1;
        }
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    /// Records how many pages the server reported.
    pub fn observe<T>(&mut self, page: &Page<T>) {
        self.total_pages = page.total_pages();
    }

    pub fn to_request(&self) -> PageRequest {
        PageRequest {
            page: self.page - 1,
            size: self.size,
            sort_field: DEFAULT_SORT_FIELD.to_string(),
            direction: self.direction,
        }
    }
}

/// Whether edit/delete controls are offered for an entry on `date`. The
/// backend enforces its own rule.
pub fn can_modify(date: NaiveDate, today: NaiveDate) -> bool {
    date > today - Duration::days(EDIT_WINDOW_DAYS)
}

/// Dates offered when logging rounds: today first, then the five days before.
pub fn selectable_dates(today: NaiveDate) -> Vec<NaiveDate> {
    (0..=EDIT_WINDOW_DAYS)
        .map(|offset| today - Duration::days(offset))
        .collect()
}

#[derive(Clone)]
pub struct ChantingApi {
    client: ApiClient,
    notifier: Arc<dyn Notifier>,
}

impl ChantingApi {
    pub fn new(client: ApiClient, notifier: Arc<dyn Notifier>) -> Self {
        Self { client, notifier }
    }

    pub async fn list(&self, request: &PageRequest) -> Result<Page<ChantingEntry>, ApiError> {
        self.client
            .get(CHANTING_PATH, request.to_options())
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to fetch records"))
    }

    pub async fn add(&self, entry: &NewChantingEntry) -> Result<(), ApiError> {
        check_rounds(entry.chanting_rounds).map_err(ApiError::Validation)?;
        self.client
            .post_unit(CHANTING_PATH, entry)
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to add record"))?;
        self.notifier.success("Record added");
        Ok(())
    }

    pub async fn update(&self, entry: &ChantingEntry) -> Result<ChantingEntry, ApiError> {
        check_rounds(entry.chanting_rounds).map_err(ApiError::Validation)?;
        let updated = self
            .client
            .put(CHANTING_PATH, entry)
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to update record"))?;
        self.notifier.success("Record updated");
        Ok(updated)
    }

    pub async fn delete(&self, chanting_id: i64) -> Result<(), ApiError> {
        self.client
            .delete(&format!("{CHANTING_PATH}/{chanting_id}"))
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to delete record"))?;
        self.notifier.success("Record deleted");
        Ok(())
    }

    pub async fn dashboard(
        &self,
        range: DashboardRange,
        today: NaiveDate,
    ) -> Result<DashboardStats, ApiError> {
        let (from, to) = range_window_at(today, range);
        let mut options = RequestOptions::new().query("toDate", to);
        if let Some(from) = from {
            options = options.query("fromDate", from);
        }
        self.client
            .get(DASHBOARD_PATH, options)
            .await
            .inspect_err(|err| surface_error(&*self.notifier, err, "Failed to load dashboard"))
    }
}
