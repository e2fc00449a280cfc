// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::utils::{get_setting, pretty_table, set_setting};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("mail", sub)) => mail(conn, sub)?,
        Some(("smtp", sub)) => smtp(conn, sub)?,
        _ => {}
    }
    Ok(())
}

fn mail(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    match sub.subcommand() {
        Some(("set", s)) => {
            let email_arg = s.get_one::<String>("as").unwrap();
            let user_id: i64 = conn.query_row(
                "SELECT id FROM users WHERE email=?1",
                params![email_arg],
                |r| r.get(0),
            )?;
            let address = s.get_one::<String>("email").map(|v| v.trim().to_string());
            let active = s.get_one::<bool>("active").copied();

            let existing: Option<(String, i64)> = conn
                .query_row(
                    "SELECT email, is_active FROM mail_settings WHERE user_id=?1",
                    params![user_id],
                    |r| Ok((r.get(0)?, r.get(1)?)),
                )
                .optional()?;
            let (cur_email, cur_active) = existing.unwrap_or((String::new(), 0));
            let new_email = address.unwrap_or(cur_email);
            let new_active = active.map(|b| b as i64).unwrap_or(cur_active);

            conn.execute(
                "INSERT INTO mail_settings(user_id, email, is_active) VALUES (?1, ?2, ?3)
                 ON CONFLICT(user_id) DO UPDATE SET email=excluded.email, is_active=excluded.is_active",
                params![user_id, new_email, new_active],
            )?;
            println!(
                "Mail digest for {}: {} ({})",
                email_arg,
                if new_active != 0 { "on" } else { "off" },
                if new_email.is_empty() { "-" } else { &new_email }
            );
        }
        Some(("show", _)) => {
            let mut stmt = conn.prepare(
                "SELECT u.email, ms.email, ms.is_active FROM mail_settings ms
                 JOIN users u ON ms.user_id=u.id ORDER BY u.email",
            )?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (user, dest, active) = row?;
                data.push(vec![
                    user,
                    dest,
                    if active != 0 { "on" } else { "off" }.into(),
                ]);
            }
            println!("{}", pretty_table(&["User", "Digest to", "Active"], data));
        }
        _ => {}
    }
    Ok(())
}

fn smtp(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    match sub.subcommand() {
        Some(("set", s)) => {
            for (arg, key) in [
                ("host", "smtp_host"),
                ("port", "smtp_port"),
                ("user", "smtp_user"),
                ("pass", "smtp_pass"),
                ("from", "smtp_from"),
                ("hour", "mail_send_hour"),
                ("minute", "mail_send_minute"),
            ] {
                if let Some(v) = s.get_one::<String>(arg) {
                    set_setting(conn, key, v.trim())?;
                }
            }
            println!("SMTP settings updated");
        }
        Some(("show", _)) => {
            let mut data = Vec::new();
            for key in [
                "smtp_host",
                "smtp_port",
                "smtp_user",
                "smtp_from",
                "mail_send_hour",
                "mail_send_minute",
            ] {
                data.push(vec![
                    key.to_string(),
                    get_setting(conn, key)?.unwrap_or_else(|| "-".into()),
                ]);
            }
            // password intentionally not echoed
            println!("{}", pretty_table(&["Key", "Value"], data));
        }
        _ => {}
    }
    Ok(())
}
