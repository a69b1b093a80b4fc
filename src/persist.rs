//! Whole-aggregate persistence: `AppData` as one JSON document in the
//! key/value store.

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::db;
use crate::model::AppData;

pub const STORAGE_KEY: &str = "captrack-data";

pub fn to_json(data: &AppData) -> Result<String> {
    serde_json::to_string(data).context("failed to serialize tracker data")
}

pub fn to_json_pretty(data: &AppData) -> Result<String> {
    serde_json::to_string_pretty(data).context("failed to serialize tracker data")
}

/// Parse a persisted aggregate. All three collections must be present and
/// every date must parse.
pub fn from_json(text: &str) -> Result<AppData> {
    serde_json::from_str(text).context("malformed tracker data")
}

pub fn save(conn: &Connection, data: &AppData) -> Result<()> {
    let json = to_json(data)?;
    db::set_item(conn, STORAGE_KEY, &json).context("failed to save tracker data")
}

/// Result of reading the stored aggregate.
#[derive(Debug)]
pub struct Loaded {
    pub data: AppData,
    /// Set when stored data existed but could not be parsed; `data` is then empty.
    pub error: Option<anyhow::Error>,
}

/// Read the aggregate. A missing key yields empty data; unparseable data
/// yields empty data plus the parse error. Only storage failures are `Err`.
pub fn load(conn: &Connection) -> Result<Loaded> {
    let Some(text) = db::get_item(conn, STORAGE_KEY)? else {
        return Ok(Loaded {
            data: AppData::default(),
            error: None,
        });
    };
    match from_json(&text) {
        Ok(data) => Ok(Loaded { data, error: None }),
        Err(e) => {
            log::error!("stored tracker data is unreadable, starting empty: {e:#}");
            Ok(Loaded {
                data: AppData::default(),
                error: Some(e),
            })
        }
    }
}
