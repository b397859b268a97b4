use rusqlite::{params, Connection, OptionalExtension};

use crate::models::Business;

// ── Businesses ──

const BUSINESS_COLUMNS: &str =
    "id, phone_number, name, system_instruction, sheet_id, timezone, knowledge_base";

fn parse_business_row(row: &rusqlite::Row) -> rusqlite::Result<Business> {
    Ok(Business {
        id: row.get(0)?,
        phone_number: row.get(1)?,
        name: row.get(2)?,
        system_instruction: row.get(3)?,
        sheet_id: row.get(4)?,
        timezone: row.get(5)?,
        knowledge_base: row.get::<_, i32>(6)? != 0,
    })
}

pub fn list_businesses(conn: &Connection) -> rusqlite::Result<Vec<Business>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY created_at ASC, rowid ASC"
    ))?;
    let rows = stmt.query_map([], parse_business_row)?;

    let mut businesses = vec![];
    for row in rows {
        businesses.push(row?);
    }
    Ok(businesses)
}

pub fn get_business(conn: &Connection, id: &str) -> rusqlite::Result<Option<Business>> {
    conn.query_row(
        &format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE id = ?1"),
        params![id],
        parse_business_row,
    )
    .optional()
}

pub fn get_business_by_phone(
    conn: &Connection,
    phone_number: &str,
) -> rusqlite::Result<Option<Business>> {
    conn.query_row(
        &format!("SELECT {BUSINESS_COLUMNS} FROM businesses WHERE phone_number = ?1"),
        params![phone_number],
        parse_business_row,
    )
    .optional()
}

pub fn first_business(conn: &Connection) -> rusqlite::Result<Option<Business>> {
    conn.query_row(
        &format!(
            "SELECT {BUSINESS_COLUMNS} FROM businesses ORDER BY created_at ASC, rowid ASC LIMIT 1"
        ),
        [],
        parse_business_row,
    )
    .optional()
}

pub fn insert_business(conn: &Connection, business: &Business) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO businesses (id, phone_number, name, system_instruction, sheet_id, timezone, knowledge_base)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            business.id,
            business.phone_number,
            business.name,
            business.system_instruction,
            business.sheet_id,
            business.timezone,
            business.knowledge_base as i32,
        ],
    )?;
    Ok(())
}

pub fn update_business(conn: &Connection, business: &Business) -> rusqlite::Result<bool> {
    let count = conn.execute(
        "UPDATE businesses SET
           phone_number = ?2,
           name = ?3,
           system_instruction = ?4,
           sheet_id = ?5,
           timezone = ?6,
           knowledge_base = ?7,
           updated_at = datetime('now')
         WHERE id = ?1",
        params![
            business.id,
            business.phone_number,
            business.name,
            business.system_instruction,
            business.sheet_id,
            business.timezone,
            business.knowledge_base as i32,
        ],
    )?;
    Ok(count > 0)
}

pub fn delete_business(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM businesses WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Local sheet rows ──

pub fn sheet_rows(
    conn: &Connection,
    sheet_id: &str,
    tab: &str,
) -> anyhow::Result<Vec<(i64, Vec<String>)>> {
    let mut stmt = conn.prepare(
        "SELECT id, cells FROM sheet_rows WHERE sheet_id = ?1 AND tab = ?2 ORDER BY id ASC",
    )?;

    let rows = stmt.query_map(params![sheet_id, tab], |row| {
        Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
    })?;

    let mut result = vec![];
    for row in rows {
        let (id, cells_json) = row?;
        let cells: Vec<String> = serde_json::from_str(&cells_json)?;
        result.push((id, cells));
    }
    Ok(result)
}

pub fn insert_sheet_row(
    conn: &Connection,
    sheet_id: &str,
    tab: &str,
    cells: &[String],
) -> anyhow::Result<i64> {
    conn.execute(
        "INSERT INTO sheet_rows (sheet_id, tab, cells) VALUES (?1, ?2, ?3)",
        params![sheet_id, tab, serde_json::to_string(cells)?],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_sheet_row(conn: &Connection, id: i64, cells: &[String]) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE sheet_rows SET cells = ?1 WHERE id = ?2",
        params![serde_json::to_string(cells)?, id],
    )?;
    Ok(count > 0)
}

pub fn delete_sheet_row(conn: &Connection, id: i64) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM sheet_rows WHERE id = ?1", params![id])?;
    Ok(count > 0)
}
