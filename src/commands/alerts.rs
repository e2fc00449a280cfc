// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::NaiveDate;
use log::{info, warn};
use rusqlite::{params, Connection};

use crate::commands::{contracts, vouchers};
use crate::mailer::{self, MailTransport, SmtpMailer};
use crate::models::Scope;
use crate::utils::{maybe_print_json, parse_date, pretty_table, resolve_scope};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("run", sub)) => run(conn, sub)?,
        Some(("history", sub)) => history(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub sent: usize,
    pub failed: usize,
    pub skipped: usize,
}

struct Recipient {
    user_id: i64,
    user_name: String,
    email: String,
}

/// One daily orchestrator pass: for every user with an active mail setting,
/// gather this month's unhandled vouchers and exact-threshold contracts, mail
/// a digest when there is anything to say, and append an alert_history row per
/// delivery attempt. A failing recipient never aborts the rest of the run;
/// users with nothing due get neither mail nor history. Stateless and safe to
/// re-invoke; re-sending on a second run the same day is accepted.
pub fn run_daily(
    conn: &mut Connection,
    transport: &dyn MailTransport,
    today: NaiveDate,
) -> Result<RunReport> {
    let recipients: Vec<Recipient> = {
        let mut stmt = conn.prepare(
            "SELECT ms.user_id, u.name, ms.email FROM mail_settings ms
             JOIN users u ON ms.user_id=u.id
             WHERE ms.is_active=1 AND ms.email != ''
             ORDER BY ms.user_id",
        )?;
        let rows = stmt.query_map([], |r| {
            Ok(Recipient {
                user_id: r.get(0)?,
                user_name: r.get(1)?,
                email: r.get(2)?,
            })
        })?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut report = RunReport::default();
    for rcpt in recipients {
        let scope = Scope::User(rcpt.user_id);
        let due_vouchers = vouchers::pending_for_today(conn, scope, today)?;
        let due_contracts = contracts::alert_matches(conn, scope, today)?;

        if due_vouchers.is_empty() && due_contracts.is_empty() {
            report.skipped += 1;
            continue;
        }

        let html = mailer::render_digest(&rcpt.user_name, today, &due_vouchers, &due_contracts);
        let subject = mailer::digest_subject(today);
        match transport.send_html(&rcpt.email, &subject, &html) {
            Ok(()) => {
                info!("digest sent to {}", rcpt.email);
                conn.execute(
                    "INSERT INTO alert_history(user_id, email, voucher_count, contract_count, status)
                     VALUES (?1, ?2, ?3, ?4, 'success')",
                    params![
                        rcpt.user_id,
                        rcpt.email,
                        due_vouchers.len() as i64,
                        due_contracts.len() as i64
                    ],
                )?;
                report.sent += 1;
            }
            Err(e) => {
                warn!("digest to {} failed: {:#}", rcpt.email, e);
                conn.execute(
                    "INSERT INTO alert_history(user_id, email, voucher_count, contract_count, status, error)
                     VALUES (?1, ?2, ?3, ?4, 'failed', ?5)",
                    params![
                        rcpt.user_id,
                        rcpt.email,
                        due_vouchers.len() as i64,
                        due_contracts.len() as i64,
                        format!("{:#}", e)
                    ],
                )?;
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

fn run(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let today = match sub.get_one::<String>("date") {
        Some(s) => parse_date(s)?,
        None => chrono::Local::now().date_naive(),
    };
    let Some(mailer) = SmtpMailer::from_settings(conn)? else {
        info!("SMTP not configured, skipping daily alerts");
        println!("SMTP not configured (settings smtp set); nothing sent");
        return Ok(());
    };
    let report = run_daily(conn, &mailer, today)?;
    println!(
        "Daily alerts for {}: {} sent, {} failed, {} skipped",
        today, report.sent, report.failed, report.skipped
    );
    Ok(())
}

fn history(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = resolve_scope(conn, sub.get_one::<String>("as").unwrap())?;
    let limit: i64 = *sub.get_one::<i64>("limit").unwrap_or(&20);
    let sql = format!(
        "SELECT id, user_id, email, voucher_count, contract_count, status, error, sent_at
         FROM alert_history{} ORDER BY sent_at DESC, id DESC LIMIT {}",
        match scope.user_filter() {
            Some(_) => " WHERE user_id=?1",
            None => "",
        },
        limit
    );
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match scope.user_filter() {
        Some(uid) => stmt.query(params![uid])?,
        None => stmt.query([])?,
    };
    let mut data: Vec<crate::models::AlertRecord> = Vec::new();
    while let Some(r) = rows.next()? {
        data.push(crate::models::AlertRecord {
            id: r.get(0)?,
            user_id: r.get(1)?,
            email: r.get(2)?,
            voucher_count: r.get(3)?,
            contract_count: r.get(4)?,
            status: r.get(5)?,
            error: r.get(6)?,
            sent_at: r.get(7)?,
        });
    }
    if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|h| {
                vec![
                    h.sent_at.clone(),
                    h.email.clone(),
                    h.voucher_count.to_string(),
                    h.contract_count.to_string(),
                    h.status.clone(),
                    h.error.clone().unwrap_or_default(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(
                &["Sent", "Email", "Vouchers", "Contracts", "Status", "Error"],
                rows,
            )
        );
    }
    Ok(())
}
