//! LanceDB connection helpers.

use anyhow::Result;
use lancedb::{connect, Connection};
use std::path::Path;

pub async fn open_db(location: &Path) -> Result<Connection> {
    Ok(connect(location.to_string_lossy().as_ref()).execute().await?)
}

pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    let names = conn.table_names().execute().await?;
    Ok(names.iter().any(|n| n == name))
}
