use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;

use super::{SheetBackend, SheetRow, Tab};
use crate::db::queries;

/// SQLite stand-in for a spreadsheet, used in development and tests.
pub struct LocalSheets {
    db: Arc<Mutex<Connection>>,
}

impl LocalSheets {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    fn with_db<T>(&self, f: impl FnOnce(&Connection) -> anyhow::Result<T>) -> anyhow::Result<T> {
        let db = self
            .db
            .lock()
            .map_err(|_| anyhow::anyhow!("sheet database lock poisoned"))?;
        f(&db)
    }
}

#[async_trait]
impl SheetBackend for LocalSheets {
    async fn rows(&self, sheet_id: &str, tab: Tab) -> anyhow::Result<Vec<SheetRow>> {
        let rows = self.with_db(|db| queries::sheet_rows(db, sheet_id, tab.title()))?;
        Ok(rows
            .into_iter()
            .map(|(id, cells)| SheetRow::new(tab, id, cells))
            .collect())
    }

    async fn append(&self, sheet_id: &str, tab: Tab, cells: Vec<String>) -> anyhow::Result<()> {
        let row = SheetRow::new(tab, 0, cells);
        self.with_db(|db| queries::insert_sheet_row(db, sheet_id, tab.title(), row.cells()))?;
        Ok(())
    }

    async fn update(&self, _sheet_id: &str, row: &SheetRow) -> anyhow::Result<()> {
        let updated = self.with_db(|db| queries::update_sheet_row(db, row.handle, row.cells()))?;
        anyhow::ensure!(updated, "row {} no longer exists", row.handle);
        Ok(())
    }

    async fn delete(&self, _sheet_id: &str, row: &SheetRow) -> anyhow::Result<()> {
        let deleted = self.with_db(|db| queries::delete_sheet_row(db, row.handle))?;
        anyhow::ensure!(deleted, "row {} no longer exists", row.handle);
        Ok(())
    }
}
