// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use csv::ReaderBuilder;
use rusqlite::{params, Connection};
use std::collections::HashMap;

use crate::models::Scope;
use crate::utils::{id_for_category, parse_decimal, parse_sheet_date, resolve_scope};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("vouchers", sub)) => import_vouchers(conn, sub),
        Some(("contracts", sub)) => import_contracts(conn, sub),
        _ => Ok(()),
    }
}

fn header_index(rdr: &mut csv::Reader<std::fs::File>) -> Result<HashMap<String, usize>> {
    Ok(rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| (h.trim().to_lowercase(), i))
        .collect())
}

fn field<'a>(rec: &'a csv::StringRecord, idx: Option<&usize>) -> Option<&'a str> {
    idx.and_then(|i| rec.get(*i))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_repeat_day(raw: &str) -> u32 {
    if raw.eq_ignore_ascii_case("last") {
        return 0;
    }
    match raw.trim_end_matches(|c: char| !c.is_ascii_digit()).parse::<u32>() {
        Ok(d) if d <= 31 => d,
        _ => 1,
    }
}

fn owner_id(conn: &Connection, scope: Scope, email: &str) -> Result<i64> {
    match scope {
        Scope::User(id) => Ok(id),
        Scope::Admin => Ok(conn.query_row(
            "SELECT id FROM users WHERE email=?1",
            params![email],
            |r| r.get(0),
        )?),
    }
}

/// Header-mapped voucher import. Rows missing description or account name are
/// skipped; the batch succeeds with a count of what made it in.
fn import_vouchers(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let as_email = sub.get_one::<String>("as").unwrap();
    let scope = resolve_scope(conn, as_email)?;
    let user_id = owner_id(conn, scope, as_email)?;
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;
    let idx = header_index(&mut rdr)?;

    let tx = conn.transaction()?;
    let mut count = 0usize;
    for result in rdr.records() {
        let rec = result?;
        let Some(description) = field(&rec, idx.get("description")) else {
            continue;
        };
        let Some(account) = field(&rec, idx.get("account_name")) else {
            continue;
        };
        let repeat_day = field(&rec, idx.get("repeat_day"))
            .map(parse_repeat_day)
            .unwrap_or(1);
        let amount = field(&rec, idx.get("amount"))
            .map(parse_decimal)
            .transpose()
            .unwrap_or(None);
        let vat = field(&rec, idx.get("vat_amount"))
            .map(parse_decimal)
            .transpose()
            .unwrap_or(None);

        tx.execute(
            "INSERT INTO vouchers(description, amount, vat_amount, account_name, repeat_day, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                description,
                amount.map(|d| d.to_string()),
                vat.map(|d| d.to_string()),
                account,
                repeat_day,
                user_id
            ],
        )?;
        count += 1;
    }
    tx.commit()?;
    println!("Imported {} vouchers from {}", count, path);
    Ok(())
}

/// Header-mapped contract import. Rows missing name, category, or end date are
/// skipped; unknown categories fall back to 'other'. Date cells accept ISO
/// strings or Excel serial numbers.
fn import_contracts(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let as_email = sub.get_one::<String>("as").unwrap();
    let scope = resolve_scope(conn, as_email)?;
    let user_id = owner_id(conn, scope, as_email)?;
    let path = sub.get_one::<String>("path").unwrap().trim();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("Open CSV {}", path))?;
    let idx = header_index(&mut rdr)?;

    let fallback_category = id_for_category(conn, "other").ok();

    let tx = conn.transaction()?;
    let mut count = 0usize;
    for result in rdr.records() {
        let rec = result?;
        let Some(name) = field(&rec, idx.get("name")) else {
            continue;
        };
        let Some(category) = field(&rec, idx.get("category")) else {
            continue;
        };
        let Some(end_raw) = field(&rec, idx.get("end_date")) else {
            continue;
        };
        let Ok(end_date) = parse_sheet_date(end_raw) else {
            continue;
        };

        let category_id = match id_for_category(&tx, category) {
            Ok(id) => id,
            Err(_) => match fallback_category {
                Some(id) => id,
                None => continue,
            },
        };
        let start_date = field(&rec, idx.get("start_date")).and_then(|s| parse_sheet_date(s).ok());
        let amount = field(&rec, idx.get("amount"))
            .map(parse_decimal)
            .transpose()
            .unwrap_or(None);

        tx.execute(
            "INSERT INTO contracts(name, company, amount, start_date, end_date, contact_info, notes, category_id, user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                name,
                field(&rec, idx.get("company")),
                amount.map(|d| d.to_string()),
                start_date.map(|d| d.to_string()),
                end_date.to_string(),
                field(&rec, idx.get("contact_info")),
                field(&rec, idx.get("notes")),
                category_id,
                user_id
            ],
        )?;
        count += 1;
    }
    tx.commit()?;
    println!("Imported {} contracts from {}", count, path);
    Ok(())
}
