use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{Connection, Row};
use std::path::Path;

use crate::models::Draw;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS draws (
    draw_date   TEXT PRIMARY KEY,
    ball_1      INTEGER NOT NULL,
    ball_2      INTEGER NOT NULL,
    ball_3      INTEGER NOT NULL,
    ball_4      INTEGER NOT NULL,
    ball_5      INTEGER NOT NULL,
    powerball   INTEGER NOT NULL,
    multiplier  INTEGER
);
";

const SELECT_COLUMNS: &str =
    "SELECT draw_date, ball_1, ball_2, ball_3, ball_4, ball_5, powerball, multiplier FROM draws";

pub fn db_path() -> std::path::PathBuf {
    let mut path = std::env::current_dir().unwrap_or_default();
    path.push("data");
    path.push("powerstat.db");
    path
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create directory {:?}", parent))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Cannot open database {:?}", path))?;
    Ok(conn)
}

pub fn migrate(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)
        .context("Migration failed")?;
    Ok(())
}

pub fn insert_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (draw_date, ball_1, ball_2, ball_3, ball_4, ball_5, powerball, multiplier)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            draw.date,
            draw.white_balls[0],
            draw.white_balls[1],
            draw.white_balls[2],
            draw.white_balls[3],
            draw.white_balls[4],
            draw.powerball,
            draw.multiplier,
        ],
    ).context("Insert failed")?;
    Ok(changed > 0)
}

fn draw_from_row(row: &Row<'_>) -> rusqlite::Result<Draw> {
    Ok(Draw {
        date: row.get::<_, NaiveDate>(0)?,
        white_balls: [
            row.get::<_, u8>(1)?,
            row.get::<_, u8>(2)?,
            row.get::<_, u8>(3)?,
            row.get::<_, u8>(4)?,
            row.get::<_, u8>(5)?,
        ],
        powerball: row.get::<_, u8>(6)?,
        multiplier: row.get::<_, Option<u8>>(7)?,
    })
}

/// All draws, oldest first. The analysis engine expects this ordering.
pub fn fetch_draws(conn: &Connection) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY draw_date ASC"))?;
    let draws = stmt
        .query_map([], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

/// Most recent draws first.
pub fn fetch_last_draws(conn: &Connection, limit: u32) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY draw_date DESC LIMIT ?1"))?;
    let draws = stmt
        .query_map([limit], draw_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(draws)
}

pub fn count_draws(conn: &Connection) -> Result<u32> {
    let count: u32 = conn.query_row("SELECT COUNT(*) FROM draws", [], |row| row.get(0))?;
    Ok(count)
}
