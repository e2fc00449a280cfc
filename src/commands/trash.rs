// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{NotFound, Scope};
use crate::utils::{pretty_table, resolve_scope};

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => list(conn, sub)?,
        Some(("restore", sub)) => restore_cmd(conn, sub)?,
        Some(("rm", sub)) => purge_cmd(conn, sub)?,
        Some(("empty", sub)) => empty_cmd(conn, sub)?,
        _ => {}
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Voucher,
    Contract,
}

impl Kind {
    fn table(&self) -> &'static str {
        match self {
            Kind::Voucher => "vouchers",
            Kind::Contract => "contracts",
        }
    }

    fn parse(s: &str) -> Result<Kind> {
        match s {
            "voucher" => Ok(Kind::Voucher),
            "contract" => Ok(Kind::Contract),
            _ => Err(anyhow::anyhow!("Unknown kind '{}' (use voucher|contract)", s)),
        }
    }
}

fn find_trashed(conn: &Connection, scope: Scope, kind: Kind, id: i64) -> Result<()> {
    let sql = format!(
        "SELECT 1 FROM {} WHERE id=?1 AND deleted_at IS NOT NULL{}",
        kind.table(),
        match scope.user_filter() {
            Some(_) => " AND user_id=?2",
            None => "",
        }
    );
    let hit: Option<i64> = match scope.user_filter() {
        Some(uid) => conn.query_row(&sql, params![id, uid], |r| r.get(0)),
        None => conn.query_row(&sql, params![id], |r| r.get(0)),
    }
    .optional()?;
    if hit.is_none() {
        return Err(NotFound.into());
    }
    Ok(())
}

/// Bring a trashed record back to the active set.
pub fn restore(conn: &Connection, scope: Scope, kind: Kind, id: i64) -> Result<()> {
    find_trashed(conn, scope, kind, id)?;
    conn.execute(
        &format!("UPDATE {} SET deleted_at=NULL WHERE id=?1", kind.table()),
        params![id],
    )?;
    Ok(())
}

/// Physically delete a trashed record. Voucher completions cascade away with
/// their parent row.
pub fn purge(conn: &Connection, scope: Scope, kind: Kind, id: i64) -> Result<()> {
    find_trashed(conn, scope, kind, id)?;
    conn.execute(
        &format!("DELETE FROM {} WHERE id=?1", kind.table()),
        params![id],
    )?;
    Ok(())
}

/// Physically delete everything in the caller's trash. Returns the number of
/// purged records (vouchers + contracts).
pub fn empty(conn: &mut Connection, scope: Scope) -> Result<usize> {
    let tx = conn.transaction()?;
    let mut purged = 0usize;
    for table in ["contracts", "vouchers"] {
        let sql = format!(
            "DELETE FROM {} WHERE deleted_at IS NOT NULL{}",
            table,
            match scope.user_filter() {
                Some(_) => " AND user_id=?1",
                None => "",
            }
        );
        purged += match scope.user_filter() {
            Some(uid) => tx.execute(&sql, params![uid])?,
            None => tx.execute(&sql, [])?,
        };
    }
    tx.commit()?;
    Ok(purged)
}

fn scope_from(conn: &Connection, sub: &clap::ArgMatches) -> Result<Scope> {
    resolve_scope(conn, sub.get_one::<String>("as").unwrap())
}

fn list(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let mut data = Vec::new();
    for (kind, sql) in [
        (
            "voucher",
            format!(
                "SELECT id, description, deleted_at FROM vouchers WHERE deleted_at IS NOT NULL{} ORDER BY deleted_at DESC",
                match scope.user_filter() {
                    Some(_) => " AND user_id=?1",
                    None => "",
                }
            ),
        ),
        (
            "contract",
            format!(
                "SELECT id, name, deleted_at FROM contracts WHERE deleted_at IS NOT NULL{} ORDER BY deleted_at DESC",
                match scope.user_filter() {
                    Some(_) => " AND user_id=?1",
                    None => "",
                }
            ),
        ),
    ] {
        let mut stmt = conn.prepare(&sql)?;
        let mut rows = match scope.user_filter() {
            Some(uid) => stmt.query(params![uid])?,
            None => stmt.query([])?,
        };
        while let Some(r) = rows.next()? {
            data.push(vec![
                kind.to_string(),
                r.get::<_, i64>(0)?.to_string(),
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
            ]);
        }
    }
    println!(
        "{}",
        pretty_table(&["Kind", "ID", "Description", "Deleted"], data)
    );
    Ok(())
}

fn restore_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let kind = Kind::parse(sub.get_one::<String>("kind").unwrap())?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    restore(conn, scope, kind, id)?;
    println!("Restored {} {}", sub.get_one::<String>("kind").unwrap(), id);
    Ok(())
}

fn purge_cmd(conn: &Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let kind = Kind::parse(sub.get_one::<String>("kind").unwrap())?;
    let id: i64 = *sub.get_one::<i64>("id").unwrap();
    purge(conn, scope, kind, id)?;
    println!(
        "Permanently deleted {} {}",
        sub.get_one::<String>("kind").unwrap(),
        id
    );
    Ok(())
}

fn empty_cmd(conn: &mut Connection, sub: &clap::ArgMatches) -> Result<()> {
    let scope = scope_from(conn, sub)?;
    let purged = empty(conn, scope)?;
    println!("Emptied trash ({} records)", purged);
    Ok(())
}
