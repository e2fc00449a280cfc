// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rusqlite::{params, Connection};
use rust_decimal::Decimal;

use crate::models::Scope;

/// Day-counts before expiry that trigger a contract alert. Matching is exact:
/// a contract 44 days out does not alert, one exactly 45 days out does.
pub const CONTRACT_ALERT_DAYS: [i64; 7] = [45, 30, 20, 10, 3, 2, 1];

/// Window (in days) within which a contract is shown as "expiring soon" on
/// lists. Display classification only; alerting uses [`CONTRACT_ALERT_DAYS`].
pub const EXPIRING_SOON_DAYS: i64 = 45;

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", s))
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

pub fn parse_year_month(s: &str) -> Result<(i32, u32)> {
    let d = NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d")
        .with_context(|| format!("Invalid month '{}', expected YYYY-MM", s))?;
    use chrono::Datelike;
    Ok((d.year(), d.month()))
}

/// Spreadsheet date cells arrive either as ISO-ish strings or as Excel serial
/// numbers (days since 1899-12-30). Serial 25569 is the Unix epoch.
pub fn parse_sheet_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    if let Ok(serial) = s.parse::<i64>() {
        if serial > 59 {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
            return Ok(epoch + chrono::Duration::days(serial - 25569));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y/%m/%d"))
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD or Excel serial", s))
}

pub fn last_day_of_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => unreachable!("invalid month {}", month),
    }
}

/// Resolve a voucher's recurrence day for a concrete month. 0 is the sentinel
/// for "last day of month"; any other value passes through unchanged.
pub fn resolve_repeat_day(repeat_day: u32, year: i32, month: u32) -> u32 {
    if repeat_day == 0 {
        last_day_of_month(year, month)
    } else {
        repeat_day
    }
}

/// Whether a voucher recurs at all in the given month. Day-0 vouchers recur
/// every month; a day-d voucher skips months shorter than d days.
pub fn due_in_month(repeat_day: u32, year: i32, month: u32) -> bool {
    repeat_day == 0 || repeat_day <= last_day_of_month(year, month)
}

/// Signed whole days from `today` to `end`, both at midnight. 0 means the
/// contract expires today; negative means it has already expired.
pub fn days_until(end: NaiveDate, today: NaiveDate) -> i64 {
    (end - today).num_days()
}

pub fn is_contract_alert_day(days: i64) -> bool {
    CONTRACT_ALERT_DAYS.contains(&days)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    Expired,
    ExpiringSoon,
    Active,
}

pub fn classify_expiry(days: i64) -> ExpiryStatus {
    if days < 0 {
        ExpiryStatus::Expired
    } else if days <= EXPIRING_SOON_DAYS {
        ExpiryStatus::ExpiringSoon
    } else {
        ExpiryStatus::Active
    }
}

impl ExpiryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpiryStatus::Expired => "expired",
            ExpiryStatus::ExpiringSoon => "expiring-soon",
            ExpiryStatus::Active => "active",
        }
    }
}

pub fn repeat_day_label(day: u32) -> String {
    if day == 0 {
        "last day".to_string()
    } else {
        format!("day {}", day)
    }
}

pub fn fmt_amount(d: &Option<Decimal>) -> String {
    match d {
        Some(v) => v.round_dp(2).to_string(),
        None => "-".to_string(),
    }
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

/// Resolve the acting user by email into an authorization scope. Admin users
/// see all records; everyone else is confined to their own.
pub fn resolve_scope(conn: &Connection, email: &str) -> Result<Scope> {
    let (id, is_admin): (i64, bool) = conn
        .query_row(
            "SELECT id, is_admin FROM users WHERE email=?1",
            params![email],
            |r| Ok((r.get(0)?, r.get::<_, i64>(1)? != 0)),
        )
        .with_context(|| format!("User '{}' not found", email))?;
    Ok(if is_admin { Scope::Admin } else { Scope::User(id) })
}

pub fn id_for_category(conn: &Connection, name: &str) -> Result<i64> {
    let mut stmt = conn.prepare("SELECT id FROM contract_categories WHERE name=?1")?;
    let id: i64 = stmt
        .query_row(params![name], |r| r.get(0))
        .with_context(|| format!("Category '{}' not found", name))?;
    Ok(id)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    use rusqlite::OptionalExtension;
    let v: Option<String> = conn
        .query_row("SELECT value FROM settings WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}
