// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::{Duration, NaiveDate};
use recurdesk::commands::alerts::{self, RunReport};
use recurdesk::db;
use recurdesk::mailer::MailTransport;
use rusqlite::{params, Connection};
use std::cell::RefCell;

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

fn opt_in(conn: &Connection, user_id: i64, email: &str) {
    conn.execute(
        "INSERT INTO mail_settings(user_id, email, is_active) VALUES (?1, ?2, 1)",
        params![user_id, email],
    )
    .unwrap();
}

fn add_voucher(conn: &Connection, description: &str, repeat_day: u32, user_id: i64) {
    conn.execute(
        "INSERT INTO vouchers(description, account_name, repeat_day, user_id)
         VALUES (?1, 'acct', ?2, ?3)",
        params![description, repeat_day, user_id],
    )
    .unwrap();
}

fn add_contract(conn: &Connection, name: &str, end: NaiveDate, user_id: i64) {
    let cat: i64 = conn
        .query_row(
            "SELECT id FROM contract_categories WHERE name='service'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    conn.execute(
        "INSERT INTO contracts(name, end_date, category_id, user_id) VALUES (?1, ?2, ?3, ?4)",
        params![name, end.to_string(), cat, user_id],
    )
    .unwrap();
}

#[derive(Default)]
struct RecordingMailer {
    sent: RefCell<Vec<(String, String, String)>>,
}

impl MailTransport for RecordingMailer {
    fn send_html(&self, to: &str, subject: &str, html: &str) -> anyhow::Result<()> {
        self.sent
            .borrow_mut()
            .push((to.to_string(), subject.to_string(), html.to_string()));
        Ok(())
    }
}

struct FailingMailer;

impl MailTransport for FailingMailer {
    fn send_html(&self, _to: &str, _subject: &str, _html: &str) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("connection refused"))
    }
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

#[test]
fn digest_goes_to_users_with_something_due() {
    let mut conn = base_conn();
    opt_in(&conn, 1, "alice@example.com");
    add_voucher(&conn, "rent", 15, 1);
    let today = d(2025, 6, 10);
    add_contract(&conn, "lease", today + Duration::days(45), 1);

    let mailer = RecordingMailer::default();
    let report = alerts::run_daily(&mut conn, &mailer, today).unwrap();
    assert_eq!(
        report,
        RunReport {
            sent: 1,
            failed: 0,
            skipped: 0
        }
    );

    let sent = mailer.sent.borrow();
    assert_eq!(sent.len(), 1);
    let (to, subject, html) = &sent[0];
    assert_eq!(to, "alice@example.com");
    assert!(subject.contains("2025-06-10"));
    assert!(html.contains("rent"));
    assert!(html.contains("lease"));

    let (vouchers, contracts, status): (i64, i64, String) = conn
        .query_row(
            "SELECT voucher_count, contract_count, status FROM alert_history WHERE user_id=1",
            [],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
        )
        .unwrap();
    assert_eq!((vouchers, contracts), (1, 1));
    assert_eq!(status, "success");
}

#[test]
fn nothing_due_means_no_mail_and_no_history() {
    let mut conn = base_conn();
    opt_in(&conn, 1, "alice@example.com");
    // voucher already handled for this month
    add_voucher(&conn, "rent", 15, 1);
    conn.execute(
        "INSERT INTO voucher_completions(voucher_id, year, month) VALUES (1, 2025, 6)",
        [],
    )
    .unwrap();
    // contract off-threshold
    let today = d(2025, 6, 10);
    add_contract(&conn, "lease", today + Duration::days(44), 1);

    let mailer = RecordingMailer::default();
    let report = alerts::run_daily(&mut conn, &mailer, today).unwrap();
    assert_eq!(
        report,
        RunReport {
            sent: 0,
            failed: 0,
            skipped: 1
        }
    );
    assert!(mailer.sent.borrow().is_empty());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM alert_history", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn opted_out_and_unsubscribed_users_are_ignored() {
    let mut conn = base_conn();
    add_voucher(&conn, "rent", 15, 1);
    add_voucher(&conn, "rates", 15, 2);
    // Alice opted out, Bob never configured mail at all
    conn.execute(
        "INSERT INTO mail_settings(user_id, email, is_active) VALUES (1, 'alice@example.com', 0)",
        [],
    )
    .unwrap();

    let mailer = RecordingMailer::default();
    let report = alerts::run_daily(&mut conn, &mailer, d(2025, 6, 10)).unwrap();
    assert_eq!(report, RunReport::default());
    assert!(mailer.sent.borrow().is_empty());
}

#[test]
fn failing_recipient_is_recorded_and_does_not_abort_the_run() {
    let mut conn = base_conn();
    opt_in(&conn, 1, "alice@example.com");
    opt_in(&conn, 2, "bob@example.com");
    add_voucher(&conn, "rent", 15, 1);
    add_voucher(&conn, "rates", 15, 2);

    let report = alerts::run_daily(&mut conn, &FailingMailer, d(2025, 6, 10)).unwrap();
    assert_eq!(
        report,
        RunReport {
            sent: 0,
            failed: 2,
            skipped: 0
        }
    );

    let rows: Vec<(String, Option<String>)> = {
        let mut stmt = conn
            .prepare("SELECT status, error FROM alert_history ORDER BY user_id")
            .unwrap();
        stmt.query_map([], |r| Ok((r.get(0)?, r.get(1)?)))
            .unwrap()
            .collect::<rusqlite::Result<_>>()
            .unwrap()
    };
    assert_eq!(rows.len(), 2);
    for (status, error) in rows {
        assert_eq!(status, "failed");
        assert!(error.unwrap().contains("connection refused"));
    }
}

#[test]
fn digests_are_scoped_per_recipient() {
    let mut conn = base_conn();
    opt_in(&conn, 1, "alice@example.com");
    opt_in(&conn, 2, "bob@example.com");
    add_voucher(&conn, "alice rent", 15, 1);
    add_voucher(&conn, "bob rates", 15, 2);

    let mailer = RecordingMailer::default();
    let report = alerts::run_daily(&mut conn, &mailer, d(2025, 6, 10)).unwrap();
    assert_eq!(report.sent, 2);

    let sent = mailer.sent.borrow();
    let alice = sent.iter().find(|(to, _, _)| to == "alice@example.com").unwrap();
    assert!(alice.2.contains("alice rent"));
    assert!(!alice.2.contains("bob rates"));
    let bob = sent.iter().find(|(to, _, _)| to == "bob@example.com").unwrap();
    assert!(bob.2.contains("bob rates"));
    assert!(!bob.2.contains("alice rent"));
}

#[test]
fn rerunning_the_same_day_sends_again() {
    let mut conn = base_conn();
    opt_in(&conn, 1, "alice@example.com");
    add_voucher(&conn, "rent", 15, 1);

    let mailer = RecordingMailer::default();
    let today = d(2025, 6, 10);
    alerts::run_daily(&mut conn, &mailer, today).unwrap();
    alerts::run_daily(&mut conn, &mailer, today).unwrap();

    assert_eq!(mailer.sent.borrow().len(), 2);
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM alert_history", [], |r| r.get(0))
        .unwrap();
    assert_eq!(count, 2);
}
