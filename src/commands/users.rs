// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::{params, Connection};

pub fn handle(conn: &Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let name = sub.get_one::<String>("name").unwrap().trim();
            let email = sub.get_one::<String>("email").unwrap().trim();
            let is_admin = sub.get_flag("admin");
            conn.execute(
                "INSERT INTO users(name, email, is_admin) VALUES (?1, ?2, ?3)",
                params![name, email, is_admin as i64],
            )?;
            println!(
                "Added user '{}' <{}>{}",
                name,
                email,
                if is_admin { " (admin)" } else { "" }
            );
        }
        Some(("list", _)) => {
            let mut stmt = conn
                .prepare("SELECT name, email, is_admin, created_at FROM users ORDER BY name")?;
            let rows = stmt.query_map([], |r| {
                Ok((
                    r.get::<_, String>(0)?,
                    r.get::<_, String>(1)?,
                    r.get::<_, i64>(2)?,
                    r.get::<_, String>(3)?,
                ))
            })?;
            let mut data = Vec::new();
            for row in rows {
                let (n, e, a, cr) = row?;
                data.push(vec![n, e, if a != 0 { "yes" } else { "no" }.into(), cr]);
            }
            println!(
                "{}",
                pretty_table(&["Name", "Email", "Admin", "Created"], data)
            );
        }
        _ => {}
    }
    Ok(())
}
