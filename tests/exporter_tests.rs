// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use recurdesk::{cli, commands::exporter, commands::importer, db};
use rusqlite::{params, Connection};
use tempfile::tempdir;

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO users(id, name, email, is_admin) VALUES (1, 'Alice', 'alice@example.com', 0)",
        [],
    )
    .unwrap();
    conn
}

fn run_export(conn: &Connection, args: &[&str]) {
    let mut argv = vec!["recurdesk", "export"];
    argv.extend_from_slice(args);
    let matches = cli::build_cli().get_matches_from(argv);
    if let Some(("export", sub)) = matches.subcommand() {
        exporter::handle(conn, sub).unwrap();
    } else {
        panic!("no export subcommand");
    }
}

#[test]
fn voucher_csv_export_includes_completion_column() {
    let conn = base_conn();
    conn.execute(
        "INSERT INTO vouchers(id, description, amount, account_name, repeat_day, user_id)
         VALUES (1, 'Office rent', '1250.50', '6000', 0, 1)",
        [],
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let out = dir.path().join("vouchers.csv");
    run_export(
        &conn,
        &["vouchers", "--as", "alice@example.com", "--out", out.to_str().unwrap()],
    );

    let body = std::fs::read_to_string(&out).unwrap();
    let mut lines = body.lines();
    assert_eq!(
        lines.next().unwrap(),
        "description,amount,vat_amount,account_name,repeat_day,completed_this_month"
    );
    let row = lines.next().unwrap();
    assert!(row.starts_with("Office rent,1250.50,"));
    // the repeat_day cell is the importer's format, not a display label
    assert!(row.contains(",last,"));
    assert!(row.ends_with(",no"));
}

#[test]
fn voucher_export_round_trips_through_the_importer() {
    let mut conn = base_conn();
    for (id, description, day) in [(1, "month-end close", 0), (2, "payroll", 15), (3, "rent", 31)] {
        conn.execute(
            "INSERT INTO vouchers(id, description, account_name, repeat_day, user_id)
             VALUES (?1, ?2, '6000', ?3, 1)",
            params![id, description, day],
        )
        .unwrap();
    }

    let dir = tempdir().unwrap();
    let out = dir.path().join("vouchers.csv");
    run_export(
        &conn,
        &["vouchers", "--as", "alice@example.com", "--out", out.to_str().unwrap()],
    );

    // day-31 vouchers are exported even in months where they do not recur
    let body = std::fs::read_to_string(&out).unwrap();
    assert_eq!(body.lines().count(), 4);

    conn.execute("DELETE FROM vouchers", []).unwrap();
    let matches = cli::build_cli().get_matches_from([
        "recurdesk", "import", "vouchers", "--as", "alice@example.com", "--path",
        out.to_str().unwrap(),
    ]);
    if let Some(("import", sub)) = matches.subcommand() {
        importer::handle(&mut conn, sub).unwrap();
    } else {
        panic!("no import subcommand");
    }

    let days: Vec<(String, i64)> = {
        let mut stmt = conn
            .prepare("SELECT description, repeat_day FROM vouchers ORDER BY repeat_day")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    };
    assert_eq!(
        days,
        vec![
            ("month-end close".to_string(), 0),
            ("payroll".to_string(), 15),
            ("rent".to_string(), 31),
        ]
    );
}

#[test]
fn contract_json_export_carries_status() {
    let conn = base_conn();
    let cat: i64 = conn
        .query_row(
            "SELECT id FROM contract_categories WHERE name='rental'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    // far enough out to classify as active regardless of run date
    conn.execute(
        "INSERT INTO contracts(name, end_date, category_id, user_id) VALUES ('Lease', '2099-12-31', ?1, 1)",
        params![cat],
    )
    .unwrap();

    let dir = tempdir().unwrap();
    let out = dir.path().join("contracts.json");
    run_export(
        &conn,
        &[
            "contracts", "--as", "alice@example.com", "--format", "json", "--out",
            out.to_str().unwrap(),
        ],
    );

    let body = std::fs::read_to_string(&out).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&body).unwrap();
    let items = parsed.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Lease");
    assert_eq!(items[0]["category"], "rental");
    assert_eq!(items[0]["status"], "active");
}

#[test]
fn template_headers_round_trip_into_the_importer() {
    let conn = base_conn();
    let dir = tempdir().unwrap();
    let out = dir.path().join("template.csv");
    run_export(&conn, &["template", "--kind", "contracts", "--out", out.to_str().unwrap()]);

    let body = std::fs::read_to_string(&out).unwrap();
    assert_eq!(
        body.trim(),
        "name,category,company,amount,start_date,end_date,contact_info,notes"
    );
}
