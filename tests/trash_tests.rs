// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use recurdesk::commands::trash::{self, Kind};
use recurdesk::commands::vouchers;
use recurdesk::db;
use recurdesk::models::{NotFound, Scope};
use rusqlite::{params, Connection};

fn base_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn.execute(
        "INSERT INTO users(id, name, email, is_admin) VALUES (1, 'Alice', 'alice@example.com', 0)",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO users(id, name, email, is_admin) VALUES (2, 'Bob', 'bob@example.com', 0)",
        [],
    )
    .unwrap();
    conn
}

fn add_voucher(conn: &Connection, id: i64, user_id: i64) {
    conn.execute(
        "INSERT INTO vouchers(id, description, account_name, repeat_day, user_id)
         VALUES (?1, 'v', 'acct', 5, ?2)",
        params![id, user_id],
    )
    .unwrap();
}

fn add_contract(conn: &Connection, id: i64, user_id: i64) {
    let cat: i64 = conn
        .query_row(
            "SELECT id FROM contract_categories WHERE name='other'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    conn.execute(
        "INSERT INTO contracts(id, name, end_date, category_id, user_id)
         VALUES (?1, 'c', '2025-12-31', ?2, ?3)",
        params![id, cat, user_id],
    )
    .unwrap();
}

#[test]
fn restore_round_trip_keeps_completions() {
    let conn = base_conn();
    add_voucher(&conn, 1, 1);
    vouchers::set_completion(&conn, Scope::User(1), 1, 2025, 6, true).unwrap();
    vouchers::soft_delete(&conn, Scope::User(1), 1).unwrap();

    trash::restore(&conn, Scope::User(1), Kind::Voucher, 1).unwrap();

    assert_eq!(vouchers::fetch_active(&conn, Scope::User(1)).unwrap().len(), 1);
    // soft delete and restore never touch completion marks
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM voucher_completions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn restore_requires_a_trashed_record() {
    let conn = base_conn();
    add_voucher(&conn, 1, 1);
    // still active, so there is nothing to restore
    let err = trash::restore(&conn, Scope::User(1), Kind::Voucher, 1).unwrap_err();
    assert!(err.downcast_ref::<NotFound>().is_some());
}

#[test]
fn purge_cascades_voucher_completions() {
    let conn = base_conn();
    add_voucher(&conn, 1, 1);
    vouchers::set_completion(&conn, Scope::User(1), 1, 2025, 6, true).unwrap();
    vouchers::soft_delete(&conn, Scope::User(1), 1).unwrap();

    trash::purge(&conn, Scope::User(1), Kind::Voucher, 1).unwrap();

    let vouchers_left: i64 = conn
        .query_row("SELECT COUNT(*) FROM vouchers", [], |r| r.get(0))
        .unwrap();
    let completions_left: i64 = conn
        .query_row("SELECT COUNT(*) FROM voucher_completions", [], |r| r.get(0))
        .unwrap();
    assert_eq!(vouchers_left, 0);
    assert_eq!(completions_left, 0);
}

#[test]
fn trash_is_scoped_to_the_caller() {
    let mut conn = base_conn();
    add_voucher(&conn, 1, 1);
    add_voucher(&conn, 2, 2);
    add_contract(&conn, 1, 2);
    vouchers::soft_delete(&conn, Scope::Admin, 1).unwrap();
    vouchers::soft_delete(&conn, Scope::Admin, 2).unwrap();
    recurdesk::commands::contracts::soft_delete(&conn, Scope::Admin, 1).unwrap();

    // Alice cannot see or purge Bob's trash
    let err = trash::purge(&conn, Scope::User(1), Kind::Voucher, 2).unwrap_err();
    assert!(err.downcast_ref::<NotFound>().is_some());

    // emptying Alice's trash leaves Bob's records alone
    let purged = trash::empty(&mut conn, Scope::User(1)).unwrap();
    assert_eq!(purged, 1);
    let left: i64 = conn
        .query_row(
            "SELECT (SELECT COUNT(*) FROM vouchers) + (SELECT COUNT(*) FROM contracts)",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(left, 2);
}

#[test]
fn admin_empty_clears_everything() {
    let mut conn = base_conn();
    add_voucher(&conn, 1, 1);
    add_voucher(&conn, 2, 2);
    add_contract(&conn, 1, 1);
    vouchers::soft_delete(&conn, Scope::Admin, 1).unwrap();
    vouchers::soft_delete(&conn, Scope::Admin, 2).unwrap();
    recurdesk::commands::contracts::soft_delete(&conn, Scope::Admin, 1).unwrap();

    let purged = trash::empty(&mut conn, Scope::Admin).unwrap();
    assert_eq!(purged, 3);
}
