use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{SheetBackend, SheetRow, Tab};

/// In-memory sheet that numbers rows the way Google Sheets does: the handle
/// is the sheet row number, so a delete shifts every row below it.
///
/// Every read pauses for `read_delay`, which lets concurrent writers
/// interleave between reading a row and writing it back.
pub struct MemorySheets {
    tabs: Mutex<HashMap<(String, Tab), Vec<Vec<String>>>>,
    read_delay: Duration,
}

impl MemorySheets {
    pub fn new(read_delay: Duration) -> Self {
        Self {
            tabs: Mutex::new(HashMap::new()),
            read_delay,
        }
    }

    pub fn column(&self, sheet_id: &str, tab: Tab, column: &str) -> Vec<String> {
        let tabs = self.tabs.lock().unwrap();
        let rows = tabs.get(&(sheet_id.to_string(), tab)).cloned().unwrap_or_default();
        rows.into_iter()
            .enumerate()
            .map(|(i, cells)| SheetRow::new(tab, i as i64 + 2, cells).get(column).to_string())
            .collect()
    }
}

#[async_trait]
impl SheetBackend for MemorySheets {
    async fn rows(&self, sheet_id: &str, tab: Tab) -> anyhow::Result<Vec<SheetRow>> {
        let rows: Vec<SheetRow> = {
            let tabs = self.tabs.lock().unwrap();
            tabs.get(&(sheet_id.to_string(), tab))
                .into_iter()
                .flatten()
                .enumerate()
                .map(|(i, cells)| SheetRow::new(tab, i as i64 + 2, cells.clone()))
                .collect()
        };
        tokio::time::sleep(self.read_delay).await;
        Ok(rows)
    }

    async fn append(&self, sheet_id: &str, tab: Tab, cells: Vec<String>) -> anyhow::Result<()> {
        let row = SheetRow::new(tab, 0, cells);
        self.tabs
            .lock()
            .unwrap()
            .entry((sheet_id.to_string(), tab))
            .or_default()
            .push(row.cells().to_vec());
        Ok(())
    }

    async fn update(&self, sheet_id: &str, row: &SheetRow) -> anyhow::Result<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let rows = tabs.entry((sheet_id.to_string(), row.tab)).or_default();
        let slot = rows
            .get_mut((row.handle - 2) as usize)
            .ok_or_else(|| anyhow::anyhow!("row {} is past the end", row.handle))?;
        *slot = row.cells().to_vec();
        Ok(())
    }

    async fn delete(&self, sheet_id: &str, row: &SheetRow) -> anyhow::Result<()> {
        let mut tabs = self.tabs.lock().unwrap();
        let rows = tabs.entry((sheet_id.to_string(), row.tab)).or_default();
        let index = (row.handle - 2) as usize;
        anyhow::ensure!(index < rows.len(), "row {} is past the end", row.handle);
        rows.remove(index);
        Ok(())
    }
}
