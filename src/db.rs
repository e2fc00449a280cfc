// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("io.recurdesk", "Recurdesk", "recurdesk"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("recurdesk.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    let path = db_path()?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS users(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        is_admin INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS vouchers(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        description TEXT NOT NULL,
        amount TEXT,
        vat_amount TEXT,
        account_name TEXT NOT NULL,
        repeat_day INTEGER NOT NULL CHECK(repeat_day BETWEEN 0 AND 31),
        user_id INTEGER NOT NULL,
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_vouchers_user ON vouchers(user_id);

    -- one row per completed (voucher, year, month); absence means unhandled
    CREATE TABLE IF NOT EXISTS voucher_completions(
        voucher_id INTEGER NOT NULL,
        year INTEGER NOT NULL,
        month INTEGER NOT NULL,
        completed_at TEXT NOT NULL DEFAULT (datetime('now')),
        PRIMARY KEY(voucher_id, year, month),
        FOREIGN KEY(voucher_id) REFERENCES vouchers(id) ON DELETE CASCADE
    );

    CREATE TABLE IF NOT EXISTS contract_categories(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS contracts(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        company TEXT,
        amount TEXT,
        start_date TEXT,
        end_date TEXT NOT NULL,
        contact_info TEXT,
        notes TEXT,
        category_id INTEGER NOT NULL,
        user_id INTEGER NOT NULL,
        deleted_at TEXT,
        created_at TEXT NOT NULL DEFAULT (datetime('now')),
        FOREIGN KEY(category_id) REFERENCES contract_categories(id),
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );
    CREATE INDEX IF NOT EXISTS idx_contracts_end ON contracts(end_date);

    -- immutable snapshot of a contract's term taken at renewal; names are
    -- denormalized so history survives category/user changes
    CREATE TABLE IF NOT EXISTS contract_history(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        original_id INTEGER NOT NULL,
        name TEXT NOT NULL,
        company TEXT,
        amount TEXT,
        start_date TEXT,
        end_date TEXT NOT NULL,
        contact_info TEXT,
        notes TEXT,
        category_name TEXT NOT NULL,
        user_name TEXT NOT NULL,
        contract_created_at TEXT,
        renewed_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS alert_history(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id INTEGER NOT NULL,
        email TEXT NOT NULL,
        voucher_count INTEGER NOT NULL,
        contract_count INTEGER NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('success','failed')),
        error TEXT,
        sent_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS mail_settings(
        user_id INTEGER PRIMARY KEY,
        email TEXT NOT NULL,
        is_active INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
    );
    "#,
    )?;
    seed_defaults(conn)?;
    Ok(())
}

fn seed_defaults(conn: &Connection) -> Result<()> {
    for name in [
        "rental",
        "maintenance",
        "service",
        "purchase",
        "vehicle",
        "other",
    ] {
        conn.execute(
            "INSERT OR IGNORE INTO contract_categories(name) VALUES (?1)",
            [name],
        )?;
    }
    for (key, value) in [("mail_send_hour", "9"), ("mail_send_minute", "0")] {
        conn.execute(
            "INSERT OR IGNORE INTO settings(key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
    }
    Ok(())
}
