// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{Datelike, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::models::{MonthlyVoucher, NotFound, Scope, Voucher};
use crate::utils::{
    due_in_month, fmt_amount, maybe_print_json, parse_decimal, parse_year_month, pretty_table,
    repeat_day_label, resolve_repeat_day, resolve_scope,
};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("pending", sub)) => pending(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("complete", sub)) => complete(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn voucher_from_row(r: &Row) -> rusqlite::Result<(Voucher, Option<String>, Option<String>)> {
    Ok((
        Voucher {
            id: r.get(0)?,
            description: r.get(1)?,
            amount: None,
            vat_amount: None,
            account_name: r.get(4)?,
            repeat_day: r.get::<_, i64>(5)? as u32,
            user_id: r.get(6)?,
        },
        r.get::<_, Option<String>>(2)?,
        r.get::<_, Option<String>>(3)?,
    ))
}

fn finish_voucher(
    (mut v, amount, vat): (Voucher, Option<String>, Option<String>),
) -> Result<Voucher> {
    if let Some(s) = amount {
        v.amount = Some(parse_decimal(&s).with_context(|| format!("voucher {} amount", v.id))?);
    }
    if let Some(s) = vat {
        v.vat_amount = Some(parse_decimal(&s).with_context(|| format!("voucher {} vat", v.id))?);
    }
    Ok(v)
}

const VOUCHER_COLS: &str =
    "id, description, amount, vat_amount, account_name, repeat_day, user_id";

/// All active (non-deleted) vouchers visible to the scope, in display order:
/// ascending repeat_day, so day-0 ("last day") vouchers list first.
pub fn fetch_active(conn: &Connection, scope: Scope) -> Result<Vec<Voucher>> {
    let sql = format!(
        "SELECT {} FROM vouchers WHERE deleted_at IS NULL{} ORDER BY repeat_day ASC, id ASC",
        VOUCHER_COLS,
        match scope.user_filter() {
            Some(_) => " AND user_id=?1",
            None => "",
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match scope.user_filter() {
        Some(uid) => stmt.query(params![uid])?,
        None => stmt.query([])?,
    };
    let mut out = Vec::new();
    while let Some(r) = rows.next()? {
        out.push(finish_voucher(voucher_from_row(r)?)?);
    }
    Ok(out)
}

fn completed_for(conn: &Connection, voucher_id: i64, year: i32, month: u32) -> Result<bool> {
    let hit: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM voucher_completions WHERE voucher_id=?1 AND year=?2 AND month=?3",
            params![voucher_id, year, month],
            |r| r.get(0),
        )
        .optional()?;
    Ok(hit.is_some())
}

/// Every active voucher annotated with its completion state for (year, month),
/// whether or not it recurs that month. Export wants this unfiltered view so
/// short months don't drop rows from the file.
pub fn annotated_for_month(
    conn: &Connection,
    scope: Scope,
    year: i32,
    month: u32,
) -> Result<Vec<MonthlyVoucher>> {
    let mut out = Vec::new();
    for v in fetch_active(conn, scope)? {
        let completed = completed_for(conn, v.id, year, month)?;
        out.push(MonthlyVoucher {
            voucher: v,
            completed,
        });
    }
    Ok(out)
}

/// Vouchers due in (year, month), each annotated with that month's completion
/// state. A day-31 voucher is absent in months shorter than 31 days.
pub fn due_for_month(
    conn: &Connection,
    scope: Scope,
    year: i32,
    month: u32,
) -> Result<Vec<MonthlyVoucher>> {
    Ok(annotated_for_month(conn, scope, year, month)?
        .into_iter()
        .filter(|mv| due_in_month(mv.voucher.repeat_day, year, month))
        .collect())
}

/// The forward-looking "needs attention" subset used by the dashboard and the
/// daily digest: due this month, due-day not yet past, and not marked complete.
pub fn pending_for_today(conn: &Connection, scope: Scope, today: NaiveDate) -> Result<Vec<Voucher>> {
    let (year, month, day) = (today.year(), today.month(), today.day());
    let mut out = Vec::new();
    for mv in due_for_month(conn, scope, year, month)? {
        if mv.completed {
            continue;
        }
        if resolve_repeat_day(mv.voucher.repeat_day, year, month) >= day {
            out.push(mv.voucher);
        }
    }
    Ok(out)
}

fn fetch_owned(conn: &Connection, scope: Scope, id: i64) -> Result<Voucher> {
    let sql = format!(
        "SELECT {} FROM vouchers WHERE id=?1 AND deleted_at IS NULL{}",
        VOUCHER_COLS,
        match scope.user_filter() {
            Some(_) => " AND user_id=?2",
            None => "",
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = match scope.user_filter() {
        Some(uid) => stmt.query_row(params![id, uid], voucher_from_row),
        None => stmt.query_row(params![id], voucher_from_row),
    }
    .optional()?;
    match row {
        Some(raw) => finish_voucher(raw),
        None => Err(NotFound.into()),
    }
}

/// Mark or unmark a voucher's completion for one specific (year, month).
/// Idempotent in both directions: re-marking inserts nothing new and
/// unmarking a missing row is a no-op.
pub fn set_completion(
    conn: &Connection,
    scope: Scope,
    voucher_id: i64,
    year: i32,
    month: u32,
    done: bool,
) -> Result<()> {
    fetch_owned(conn, scope, voucher_id)?;
    if done {
        conn.execute(
            "INSERT OR IGNORE INTO voucher_completions(voucher_id, year, month) VALUES (?1, ?2, ?3)",
            params![voucher_id, year, month],
        )?;
    } else {
        conn.execute(
            "DELETE FROM voucher_completions WHERE voucher_id=?1 AND year=?2 AND month=?3",
            params![voucher_id, year, month],
        )?;
    }
    Ok(())
}

pub fn soft_delete(conn: &Connection, scope: Scope, id: i64) -> Result<()> {
    fetch_owned(conn, scope, id)?;
    conn.execute(
        "UPDATE vouchers SET deleted_at=datetime('now') WHERE id=?1",
        params![id],
    )?;
    Ok(())
}

fn current_year_month() -> (i32, u32) {
    let now = chrono::Local::now().date_naive();
    (now.year(), now.month())
}

fn scope_from(conn: &Connection, sub: &clap::ArgMatches) -> Result<Scope> {
    resolve_scope(conn, sub.get_one::<String>("as").unwrap())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let description = sub.get_one::<String>("description").unwrap().trim();
    let account = sub.get_one::<String>("account").unwrap().trim();
    let day: u32 = *sub.get_one::<u32>("day").unwrap();
    let amount = sub
        .get_one::<String>("amount")
        .map(|s| parse_decimal(s))
        .transpose()?;
    let vat = sub
        .get_one::<String>("vat")
        .map(|s| parse_decimal(s))
        .transpose()?;

    let user_id = match scope {
        Scope::User(id) => id,
        Scope::Admin => {
            // Admins still own what they create.
            conn.query_row(
                "SELECT id FROM users WHERE email=?1",
                params![sub.get_one::<String>("as").unwrap()],
                |r| r.get(0),
            )?
        }
    };
    conn.execute(
        "INSERT INTO vouchers(description, amount, vat_amount, account_name, repeat_day, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            description,
            amount.map(|d| d.to_string()),
            vat.map(|d| d.to_string()),
            account,
            day,
            user_id
        ],
    )?;
    println!(
        "Added voucher '{}' ({}, recurs {})",
        description,
        account,
        repeat_day_label(day)
    );
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let (year, month) = match sub.get_one::<String>("month") {
        Some(s) => parse_year_month(s)?,
        None => current_year_month(),
    };
    let data = due_for_month(conn, scope, year, month)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|mv| {
                vec![
                    mv.voucher.id.to_string(),
                    mv.voucher.description.clone(),
                    mv.voucher.account_name.clone(),
                    fmt_amount(&mv.voucher.amount),
                    fmt_amount(&mv.voucher.vat_amount),
                    repeat_day_label(mv.voucher.repeat_day),
                    if mv.completed { "done" } else { "open" }.to_string(),
                ]
            })
            .collect();
        let month_col = format!("{}-{:02}", year, month);
        println!(
            "{}",
            pretty_table(
                &["ID", "Description", "Account", "Amount", "VAT", "Recurs", month_col.as_str()],
                rows,
            )
        );
    }
    Ok(())
}

fn pending(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let today = match sub.get_one::<String>("date") {
        Some(s) => crate::utils::parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    let data = pending_for_today(conn, scope, today)?;
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|v| {
                vec![
                    v.id.to_string(),
                    v.description.clone(),
                    v.account_name.clone(),
                    fmt_amount(&v.amount),
                    repeat_day_label(v.repeat_day),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["ID", "Description", "Account", "Amount", "Recurs"], rows)
        );
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    let mut existing = fetch_owned(conn, scope, id)?;

    if let Some(v) = sub.get_one::<String>("description") {
        existing.description = v.trim().to_string();
    }
    if let Some(v) = sub.get_one::<String>("account") {
        existing.account_name = v.trim().to_string();
    }
    if let Some(v) = sub.get_one::<u32>("day") {
        existing.repeat_day = *v;
    }
    if let Some(v) = sub.get_one::<String>("amount") {
        existing.amount = Some(parse_decimal(v)?);
    }
    if let Some(v) = sub.get_one::<String>("vat") {
        existing.vat_amount = Some(parse_decimal(v)?);
    }

    conn.execute(
        "UPDATE vouchers SET description=?2, amount=?3, vat_amount=?4, account_name=?5, repeat_day=?6 WHERE id=?1",
        params![
            id,
            existing.description,
            existing.amount.map(|d| d.to_string()),
            existing.vat_amount.map(|d| d.to_string()),
            existing.account_name,
            existing.repeat_day
        ],
    )?;
    println!("Updated voucher {}", id);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    soft_delete(conn, scope, id)?;
    println!("Moved voucher {} to trash", id);
    Ok(())
}

fn complete(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    let (year, month) = match sub.get_one::<String>("month") {
        Some(s) => parse_year_month(s)?,
        None => current_year_month(),
    };
    let undo = sub.get_flag("undo");
    set_completion(conn, scope, id, year, month, !undo)?;
    println!(
        "Voucher {} {} for {}-{:02}",
        id,
        if undo { "reopened" } else { "completed" },
        year,
        month
    );
    Ok(())
}
