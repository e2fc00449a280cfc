// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Datelike;
use rusqlite::Connection;
use serde_json::json;

use crate::commands::{contracts, vouchers};
use crate::utils::{classify_expiry, fmt_amount, resolve_scope};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("vouchers", sub)) => export_vouchers(conn, sub),
        Some(("contracts", sub)) => export_contracts(conn, sub),
        Some(("template", sub)) => export_template(sub),
        _ => Ok(()),
    }
}

const VOUCHER_HEADERS: [&str; 6] = [
    "description",
    "amount",
    "vat_amount",
    "account_name",
    "repeat_day",
    "completed_this_month",
];

const CONTRACT_HEADERS: [&str; 9] = [
    "name",
    "category",
    "company",
    "amount",
    "start_date",
    "end_date",
    "contact_info",
    "notes",
    "days_until",
];

// Inverse of the importer's repeat_day cell: bare digits, or "last" for the
// month-end sentinel, so an exported file re-imports without loss.
fn sheet_repeat_day(day: u32) -> String {
    if day == 0 {
        "last".to_string()
    } else {
        day.to_string()
    }
}

fn export_vouchers(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = resolve_scope(conn, sub.get_one::<String>("as").unwrap())?;
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    // every active voucher, only annotated with this month's completion state
    let now = chrono::Local::now().date_naive();
    let data = vouchers::annotated_for_month(conn, scope, now.year(), now.month())?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(VOUCHER_HEADERS)?;
            for mv in &data {
                wtr.write_record([
                    mv.voucher.description.clone(),
                    mv.voucher
                        .amount
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    mv.voucher
                        .vat_amount
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    mv.voucher.account_name.clone(),
                    sheet_repeat_day(mv.voucher.repeat_day),
                    if mv.completed { "yes" } else { "no" }.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = data
                .iter()
                .map(|mv| {
                    json!({
                        "description": mv.voucher.description,
                        "amount": mv.voucher.amount,
                        "vat_amount": mv.voucher.vat_amount,
                        "account_name": mv.voucher.account_name,
                        "repeat_day": mv.voucher.repeat_day,
                        "completed_this_month": mv.completed,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported {} vouchers to {}", data.len(), out);
    Ok(())
}

fn export_contracts(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = resolve_scope(conn, sub.get_one::<String>("as").unwrap())?;
    let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
    let out = sub.get_one::<String>("out").unwrap();

    let today = chrono::Local::now().date_naive();
    let data = contracts::fetch_active(conn, scope, today)?;

    match fmt.as_str() {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record(CONTRACT_HEADERS)?;
            for c in &data {
                wtr.write_record([
                    c.contract.name.clone(),
                    c.category_name.clone(),
                    c.contract.company.clone().unwrap_or_default(),
                    c.contract
                        .amount
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    c.contract
                        .start_date
                        .map(|d| d.to_string())
                        .unwrap_or_default(),
                    c.contract.end_date.to_string(),
                    c.contract.contact_info.clone().unwrap_or_default(),
                    c.contract.notes.clone().unwrap_or_default(),
                    c.days_until.to_string(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let items: Vec<_> = data
                .iter()
                .map(|c| {
                    json!({
                        "name": c.contract.name,
                        "category": c.category_name,
                        "company": c.contract.company,
                        "amount": fmt_amount(&c.contract.amount),
                        "start_date": c.contract.start_date,
                        "end_date": c.contract.end_date,
                        "days_until": c.days_until,
                        "status": classify_expiry(c.days_until).as_str(),
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&items)?)?;
        }
        _ => {
            eprintln!("Unknown format: {} (use csv|json)", fmt);
            return Ok(());
        }
    }
    println!("Exported {} contracts to {}", data.len(), out);
    Ok(())
}

fn export_template(sub: &clap::ArgMatches) -> Result<()> {
    let kind = sub.get_one::<String>("kind").unwrap();
    let out = sub.get_one::<String>("out").unwrap();
    let mut wtr = csv::Writer::from_path(out)?;
    match kind.as_str() {
        "vouchers" => {
            wtr.write_record(["description", "amount", "vat_amount", "account_name", "repeat_day"])?
        }
        "contracts" => wtr.write_record([
            "name",
            "category",
            "company",
            "amount",
            "start_date",
            "end_date",
            "contact_info",
            "notes",
        ])?,
        other => {
            eprintln!("Unknown kind: {} (use vouchers|contracts)", other);
            return Ok(());
        }
    }
    wtr.flush()?;
    println!("Wrote {} import template to {}", kind, out);
    Ok(())
}
