// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::models::{Contract, ExpiringContract, NotFound, Scope};
use crate::utils::{
    classify_expiry, days_until, fmt_amount, id_for_category, is_contract_alert_day,
    maybe_print_json, parse_date, parse_decimal, pretty_table, resolve_scope,
};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => add(conn, sub)?,
        Some(("list", sub)) => list(conn, sub)?,
        Some(("edit", sub)) => edit(conn, sub)?,
        Some(("rm", sub)) => rm(conn, sub)?,
        Some(("renew", sub)) => renew_cmd(conn, sub)?,
        Some(("history", sub)) => history(conn, sub)?,
        _ => {}
    }
    Ok(())
}

const CONTRACT_COLS: &str =
    "c.id, c.name, c.company, c.amount, c.start_date, c.end_date, c.contact_info, c.notes, c.category_id, c.user_id";

fn contract_from_row(r: &Row) -> rusqlite::Result<(Contract, Option<String>)> {
    Ok((
        Contract {
            id: r.get(0)?,
            name: r.get(1)?,
            company: r.get(2)?,
            amount: None,
            start_date: r
                .get::<_, Option<String>>(4)?
                .and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()),
            end_date: {
                let s: String = r.get(5)?;
                NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(e),
                    )
                })?
            },
            contact_info: r.get(6)?,
            notes: r.get(7)?,
            category_id: r.get(8)?,
            user_id: r.get(9)?,
        },
        r.get::<_, Option<String>>(3)?,
    ))
}

fn finish_contract((mut c, amount): (Contract, Option<String>)) -> Result<Contract> {
    if let Some(s) = amount {
        c.amount = Some(parse_decimal(&s).with_context(|| format!("contract {} amount", c.id))?);
    }
    Ok(c)
}

/// Active contracts visible to the scope, ordered by end date (soonest first),
/// each with its category name and computed days-until-expiry.
pub fn fetch_active(
    conn: &Connection,
    scope: Scope,
    today: NaiveDate,
) -> Result<Vec<ExpiringContract>> {
    let sql = format!(
        "SELECT {}, cc.name FROM contracts c JOIN contract_categories cc ON c.category_id=cc.id
         WHERE c.deleted_at IS NULL{} ORDER BY c.end_date ASC, c.id ASC",
        CONTRACT_COLS,
        match scope.user_filter() {
            Some(_) => " AND c.user_id=?1",
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
        let category_name: String = r.get(10)?;
        let contract = finish_contract(contract_from_row(r)?)?;
        let days = days_until(contract.end_date, today);
        out.push(ExpiringContract {
            contract,
            category_name,
            days_until: days,
        });
    }
    Ok(out)
}

/// Contracts sitting exactly on one of the alert thresholds today. This is the
/// digest rule; list display uses the broader [0, 45] classification instead.
pub fn alert_matches(
    conn: &Connection,
    scope: Scope,
    today: NaiveDate,
) -> Result<Vec<ExpiringContract>> {
    Ok(fetch_active(conn, scope, today)?
        .into_iter()
        .filter(|c| is_contract_alert_day(c.days_until))
        .collect())
}

fn fetch_owned(conn: &Connection, scope: Scope, id: i64) -> Result<Contract> {
    let sql = format!(
        "SELECT {} FROM contracts c WHERE c.id=?1 AND c.deleted_at IS NULL{}",
        CONTRACT_COLS,
        match scope.user_filter() {
            Some(_) => " AND c.user_id=?2",
            None => "",
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let row = match scope.user_filter() {
        Some(uid) => stmt.query_row(params![id, uid], contract_from_row),
        None => stmt.query_row(params![id], contract_from_row),
    }
    .optional()?;
    match row {
        Some(raw) => finish_contract(raw),
        None => Err(NotFound.into()),
    }
}

#[derive(Debug, Default)]
pub struct RenewalInput {
    pub new_end_date: NaiveDate,
    pub new_start_date: Option<NaiveDate>,
    pub new_amount: Option<Decimal>,
    pub new_contact_info: Option<String>,
    pub new_notes: Option<String>,
}

impl RenewalInput {
    pub fn new(end: NaiveDate) -> Self {
        RenewalInput {
            new_end_date: end,
            ..Default::default()
        }
    }
}

/// Renew a contract: snapshot its current term into contract_history, then
/// replace the term in place. The new start date defaults to the old end date;
/// amount, contact info, and notes change only when explicitly provided.
/// Both writes happen in one transaction; an out-of-scope or missing contract
/// aborts before anything is written.
pub fn renew(conn: &mut Connection, scope: Scope, id: i64, input: RenewalInput) -> Result<Contract> {
    let existing = fetch_owned(conn, scope, id)?;
    let tx = conn.transaction()?;

    let (category_name, user_name, created_at): (String, String, Option<String>) = tx.query_row(
        "SELECT cc.name, u.name, c.created_at FROM contracts c
         JOIN contract_categories cc ON c.category_id=cc.id
         JOIN users u ON c.user_id=u.id
         WHERE c.id=?1",
        params![id],
        |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
    )?;

    tx.execute(
        "INSERT INTO contract_history(original_id, name, company, amount, start_date, end_date,
             contact_info, notes, category_name, user_name, contract_created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            existing.id,
            existing.name,
            existing.company,
            existing.amount.map(|d| d.to_string()),
            existing.start_date.map(|d| d.to_string()),
            existing.end_date.to_string(),
            existing.contact_info,
            existing.notes,
            category_name,
            user_name,
            created_at
        ],
    )?;

    let new_start = input.new_start_date.unwrap_or(existing.end_date);
    let new_amount = input.new_amount.or(existing.amount);
    let new_contact = input.new_contact_info.or(existing.contact_info);
    let new_notes = input.new_notes.or(existing.notes);
    tx.execute(
        "UPDATE contracts SET start_date=?2, end_date=?3, amount=?4, contact_info=?5, notes=?6 WHERE id=?1",
        params![
            id,
            new_start.to_string(),
            input.new_end_date.to_string(),
            new_amount.map(|d| d.to_string()),
            new_contact,
            new_notes
        ],
    )?;
    tx.commit()?;

    fetch_owned(conn, scope, id)
}

pub fn soft_delete(conn: &Connection, scope: Scope, id: i64) -> Result<()> {
    fetch_owned(conn, scope, id)?;
    conn.execute(
        "UPDATE contracts SET deleted_at=datetime('now') WHERE id=?1",
        params![id],
    )?;
    Ok(())
}

fn scope_from(conn: &Connection, sub: &clap::ArgMatches) -> Result<Scope> {
    resolve_scope(conn, sub.get_one::<String>("as").unwrap())
}

fn add(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let name = sub.get_one::<String>("name").unwrap().trim();
    let category = sub.get_one::<String>("category").unwrap().trim();
    let end_date = parse_date(sub.get_one::<String>("end").unwrap())?;
    let start_date = sub
        .get_one::<String>("start")
        .map(|s| parse_date(s))
        .transpose()?;
    let company = sub.get_one::<String>("company").map(|s| s.trim().to_string());
    let amount = sub
        .get_one::<String>("amount")
        .map(|s| parse_decimal(s))
        .transpose()?;
    let contact = sub.get_one::<String>("contact").map(|s| s.to_string());
    let notes = sub.get_one::<String>("notes").map(|s| s.to_string());

    let category_id = id_for_category(conn, category)?;
    let user_id = match scope {
        Scope::User(id) => id,
        Scope::Admin => conn.query_row(
            "SELECT id FROM users WHERE email=?1",
            params![sub.get_one::<String>("as").unwrap()],
            |r| r.get(0),
        )?,
    };

    conn.execute(
        "INSERT INTO contracts(name, company, amount, start_date, end_date, contact_info, notes, category_id, user_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            name,
            company,
            amount.map(|d| d.to_string()),
            start_date.map(|d| d.to_string()),
            end_date.to_string(),
            contact,
            notes,
            category_id,
            user_id
        ],
    )?;
    println!("Added contract '{}' expiring {}", name, end_date);
    Ok(())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let today = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    let mut data = fetch_active(conn, scope, today)?;
    if sub.get_flag("expiring") {
        data.retain(|c| classify_expiry(c.days_until) != crate::utils::ExpiryStatus::Active);
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|c| {
                vec![
                    c.contract.id.to_string(),
                    c.contract.name.clone(),
                    c.category_name.clone(),
                    c.contract.company.clone().unwrap_or_default(),
                    fmt_amount(&c.contract.amount),
                    c.contract.end_date.to_string(),
                    format!("D-{}", c.days_until),
                    classify_expiry(c.days_until).as_str().to_string(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["ID", "Name", "Category", "Company", "Amount", "Expires", "D-Day", "Status"],
                rows,
            )
        );
    }
    Ok(())
}

fn edit(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    let mut existing = fetch_owned(conn, scope, id)?;

    if let Some(v) = sub.get_one::<String>("name") {
        existing.name = v.trim().to_string();
    }
    if let Some(v) = sub.get_one::<String>("company") {
        existing.company = Some(v.trim().to_string());
    }
    if let Some(v) = sub.get_one::<String>("amount") {
        existing.amount = Some(parse_decimal(v)?);
    }
    if let Some(v) = sub.get_one::<String>("start") {
        existing.start_date = Some(parse_date(v)?);
    }
    if let Some(v) = sub.get_one::<String>("end") {
        existing.end_date = parse_date(v)?;
    }
    if let Some(v) = sub.get_one::<String>("contact") {
        existing.contact_info = Some(v.to_string());
    }
    if let Some(v) = sub.get_one::<String>("notes") {
        existing.notes = Some(v.to_string());
    }
    let category_id = match sub.get_one::<String>("category") {
        Some(name) => id_for_category(conn, name.trim())?,
        None => existing.category_id,
    };

    conn.execute(
        "UPDATE contracts SET name=?2, company=?3, amount=?4, start_date=?5, end_date=?6,
             contact_info=?7, notes=?8, category_id=?9 WHERE id=?1",
        params![
            id,
            existing.name,
            existing.company,
            existing.amount.map(|d| d.to_string()),
            existing.start_date.map(|d| d.to_string()),
            existing.end_date.to_string(),
            existing.contact_info,
            existing.notes,
            category_id
        ],
    )?;
    println!("Updated contract {}", id);
    Ok(())
}

fn rm(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    soft_delete(conn, scope, id)?;
    println!("Moved contract {} to trash", id);
    Ok(())
}

fn renew_cmd(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    let mut input = RenewalInput::new(parse_date(sub.get_one::<String>("end").unwrap())?);
    input.new_start_date = sub
        .get_one::<String>("start")
        .map(|s| parse_date(s))
        .transpose()?;
    input.new_amount = sub
        .get_one::<String>("amount")
        .map(|s| parse_decimal(s))
        .transpose()?;
    input.new_contact_info = sub.get_one::<String>("contact").map(|s| s.to_string());
    input.new_notes = sub.get_one::<String>("notes").map(|s| s.to_string());

    let renewed = renew(conn, scope, id, input)?;
    println!(
        "Renewed contract {} ({} through {})",
        id,
        renewed
            .start_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".into()),
        renewed.end_date
    );
    Ok(())
}

fn history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    // History rows are snapshots; scope them through the surviving contract.
    let sql = format!(
        "SELECT h.original_id, h.name, h.category_name, h.start_date, h.end_date, h.amount, h.renewed_at
         FROM contract_history h{}
         ORDER BY h.renewed_at DESC, h.id DESC",
        match scope.user_filter() {
            Some(_) => " JOIN contracts c ON h.original_id=c.id AND c.user_id=?1",
            None => "",
        }
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match scope.user_filter() {
        Some(uid) => stmt.query(params![uid])?,
        None => stmt.query([])?,
    };
    let mut data = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(vec![
            r.get::<_, i64>(0)?.to_string(),
            r.get::<_, String>(1)?,
            r.get::<_, String>(2)?,
            r.get::<_, Option<String>>(3)?.unwrap_or_default(),
            r.get::<_, String>(4)?,
            r.get::<_, Option<String>>(5)?.unwrap_or_else(|| "-".into()),
            r.get::<_, String>(6)?,
        ]);
    }
    println!(
        "{}",
        pretty_table(
            &["Contract", "Name", "Category", "Start", "End", "Amount", "Renewed"],
            data,
        )
    );
    Ok(())
}
