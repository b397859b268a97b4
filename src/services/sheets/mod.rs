//! Spreadsheet-as-datastore seam.
//!
//! Each business owns one spreadsheet document (its store location). Records
//! live on named tabs whose first row is a fixed header. Every operation is a
//! fresh round trip to the backend; nothing is cached.

pub mod google;
pub mod local;
mod locks;
#[cfg(test)]
pub mod memory;

pub use locks::WriteLocks;

use async_trait::async_trait;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tab {
    Appointments,
    Doctors,
    Services,
    Faq,
}

impl Tab {
    pub fn title(self) -> &'static str {
        match self {
            Tab::Appointments => "Appointments",
            Tab::Doctors => "Doctors",
            Tab::Services => "Services",
            Tab::Faq => "FAQ",
        }
    }

    pub fn headers(self) -> &'static [&'static str] {
        match self {
            Tab::Appointments => &["Name", "Phone", "Date", "Time", "Status"],
            Tab::Doctors => &["Name", "Specialty", "Availability"],
            Tab::Services => &["Service", "Price", "Description"],
            Tab::Faq => &["Question", "Answer"],
        }
    }

    fn column(self, name: &str) -> Option<usize> {
        self.headers().iter().position(|h| *h == name)
    }
}

/// One data row, cells in the tab's header order.
///
/// `handle` is backend-specific: a row id for the local backend, the 1-based
/// sheet row number for Google Sheets. It is only valid until the next write.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetRow {
    pub tab: Tab,
    pub handle: i64,
    cells: Vec<String>,
}

impl SheetRow {
    pub fn new(tab: Tab, handle: i64, mut cells: Vec<String>) -> Self {
        cells.resize(tab.headers().len(), String::new());
        Self { tab, handle, cells }
    }

    pub fn get(&self, column: &str) -> &str {
        self.tab
            .column(column)
            .and_then(|i| self.cells.get(i))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn set(&mut self, column: &str, value: impl Into<String>) {
        if let Some(i) = self.tab.column(column) {
            self.cells[i] = value.into();
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }

    /// Exact, case-sensitive match on every `(column, value)` pair.
    pub fn matches(&self, filter: &[(&str, &str)]) -> bool {
        filter.iter().all(|(column, value)| self.get(column) == *value)
    }
}

#[async_trait]
pub trait SheetBackend: Send + Sync {
    async fn rows(&self, sheet_id: &str, tab: Tab) -> anyhow::Result<Vec<SheetRow>>;

    async fn query(
        &self,
        sheet_id: &str,
        tab: Tab,
        filter: &[(&str, &str)],
    ) -> anyhow::Result<Vec<SheetRow>> {
        let rows = self.rows(sheet_id, tab).await?;
        Ok(rows.into_iter().filter(|r| r.matches(filter)).collect())
    }

    /// Appends `cells` (header order) after the last row.
    async fn append(&self, sheet_id: &str, tab: Tab, cells: Vec<String>) -> anyhow::Result<()>;

    async fn update(&self, sheet_id: &str, row: &SheetRow) -> anyhow::Result<()>;

    async fn delete(&self, sheet_id: &str, row: &SheetRow) -> anyhow::Result<()>;
}
