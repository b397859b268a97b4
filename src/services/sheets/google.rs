use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{SheetBackend, SheetRow, Tab};

const SHEETS_API_URL: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Google Sheets v4 values API. Authenticates with an OAuth access token.
pub struct GoogleSheets {
    access_token: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

#[derive(Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetMeta>,
}

#[derive(Deserialize)]
struct SheetMeta {
    properties: SheetProperties,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
}

impl GoogleSheets {
    pub fn new(access_token: String) -> Self {
        Self {
            access_token,
            client: reqwest::Client::new(),
        }
    }

    /// A1 range covering one full row of `tab`.
    fn row_range(tab: Tab, row_number: i64) -> String {
        let last = column_letter(tab.headers().len());
        format!("{}!A{row_number}:{last}{row_number}", tab.title())
    }

    async fn grid_id(&self, sheet_id: &str, tab: Tab) -> anyhow::Result<i64> {
        let meta: SpreadsheetMeta = self
            .client
            .get(format!("{SHEETS_API_URL}/{sheet_id}"))
            .query(&[("fields", "sheets.properties(sheetId,title)")])
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("failed to call Sheets API")?
            .error_for_status()
            .context("Sheets API returned error")?
            .json()
            .await
            .context("failed to parse spreadsheet metadata")?;

        meta.sheets
            .into_iter()
            .find(|s| s.properties.title == tab.title())
            .map(|s| s.properties.sheet_id)
            .ok_or_else(|| anyhow::anyhow!("tab {} not found in {sheet_id}", tab.title()))
    }
}

fn column_letter(n: usize) -> char {
    (b'A' + (n.clamp(1, 26) - 1) as u8) as char
}

#[async_trait]
impl SheetBackend for GoogleSheets {
    async fn rows(&self, sheet_id: &str, tab: Tab) -> anyhow::Result<Vec<SheetRow>> {
        let range: ValueRange = self
            .client
            .get(format!("{SHEETS_API_URL}/{sheet_id}/values/{}", tab.title()))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("failed to call Sheets API")?
            .error_for_status()
            .context("Sheets API returned error")?
            .json()
            .await
            .context("failed to parse Sheets values")?;

        // Row 1 is the header; data starts on sheet row 2.
        Ok(range
            .values
            .into_iter()
            .enumerate()
            .skip(1)
            .map(|(i, cells)| SheetRow::new(tab, i as i64 + 1, cells))
            .collect())
    }

    async fn append(&self, sheet_id: &str, tab: Tab, cells: Vec<String>) -> anyhow::Result<()> {
        let row = SheetRow::new(tab, 0, cells);
        self.client
            .post(format!(
                "{SHEETS_API_URL}/{sheet_id}/values/{}!A1:append",
                tab.title()
            ))
            .query(&[
                ("valueInputOption", "RAW"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .bearer_auth(&self.access_token)
            .json(&json!({ "values": [row.cells()] }))
            .send()
            .await
            .context("failed to call Sheets API")?
            .error_for_status()
            .context("Sheets API returned error")?;
        Ok(())
    }

    async fn update(&self, sheet_id: &str, row: &SheetRow) -> anyhow::Result<()> {
        let range = Self::row_range(row.tab, row.handle);
        self.client
            .put(format!("{SHEETS_API_URL}/{sheet_id}/values/{range}"))
            .query(&[("valueInputOption", "RAW")])
            .bearer_auth(&self.access_token)
            .json(&json!({ "range": range, "values": [row.cells()] }))
            .send()
            .await
            .context("failed to call Sheets API")?
            .error_for_status()
            .context("Sheets API returned error")?;
        Ok(())
    }

    async fn delete(&self, sheet_id: &str, row: &SheetRow) -> anyhow::Result<()> {
        let grid_id = self.grid_id(sheet_id, row.tab).await?;
        let body = json!({
            "requests": [{
                "deleteDimension": {
                    "range": {
                        "sheetId": grid_id,
                        "dimension": "ROWS",
                        "startIndex": row.handle - 1,
                        "endIndex": row.handle,
                    }
                }
            }]
        });

        self.client
            .post(format!("{SHEETS_API_URL}/{sheet_id}:batchUpdate"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .context("failed to call Sheets API")?
            .error_for_status()
            .context("Sheets API returned error")?;
        Ok(())
    }
}
