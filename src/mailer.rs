// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use rusqlite::Connection;

use crate::models::{ExpiringContract, Voucher};
use crate::utils::{fmt_amount, get_setting, repeat_day_label};

/// Outbound mail seam. The daily orchestrator only needs "send HTML to an
/// address"; tests substitute a recording implementation.
pub trait MailTransport {
    fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<()>;
}

pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from the smtp_* keys in the settings table. Returns
    /// Ok(None) when host or port is missing, so callers can skip the run
    /// cleanly instead of failing it.
    pub fn from_settings(conn: &Connection) -> Result<Option<SmtpMailer>> {
        let Some(host) = get_setting(conn, "smtp_host")? else {
            return Ok(None);
        };
        let Some(port) = get_setting(conn, "smtp_port")? else {
            return Ok(None);
        };
        let port: u16 = port
            .parse()
            .with_context(|| format!("Invalid smtp_port '{}'", port))?;
        let user = get_setting(conn, "smtp_user")?.unwrap_or_default();
        let pass = get_setting(conn, "smtp_pass")?.unwrap_or_default();
        let from = get_setting(conn, "smtp_from")?
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| user.clone());
        let from: Mailbox = from
            .parse()
            .with_context(|| format!("Invalid smtp_from address '{}'", from))?;

        // Port 465 is implicit TLS; anything else goes through STARTTLS.
        let mut builder = if port == 465 {
            SmtpTransport::relay(&host)
                .with_context(|| format!("Invalid SMTP host '{}'", host))?
                .port(port)
        } else {
            SmtpTransport::starttls_relay(&host)
                .with_context(|| format!("Invalid SMTP host '{}'", host))?
                .port(port)
        };
        if !user.is_empty() && !pass.is_empty() {
            builder = builder.credentials(Credentials::new(user, pass));
        }
        Ok(Some(SmtpMailer {
            transport: builder.build(),
            from,
        }))
    }
}

impl MailTransport for SmtpMailer {
    fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let to: Mailbox = to
            .parse()
            .with_context(|| format!("Invalid recipient address '{}'", to))?;
        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_HTML)
            .body(html.to_string())
            .context("Build email message")?;
        self.transport.send(&email).context("SMTP send")?;
        Ok(())
    }
}

pub fn digest_subject(today: NaiveDate) -> String {
    format!("[recurdesk] Daily digest for {}", today.format("%Y-%m-%d"))
}

/// Render the daily digest: unhandled vouchers for the current month plus
/// contracts sitting exactly on an alert threshold.
pub fn render_digest(
    user_name: &str,
    today: NaiveDate,
    vouchers: &[Voucher],
    contracts: &[ExpiringContract],
) -> String {
    let mut html = String::new();
    html.push_str("<!DOCTYPE html><html><body style=\"font-family: sans-serif;\">");
    html.push_str(&format!(
        "<h1 style=\"font-size: 18px;\">Daily digest &mdash; {}</h1>",
        today.format("%Y-%m-%d")
    ));
    html.push_str(&format!("<p>Hello, <strong>{}</strong>.</p>", user_name));

    if !vouchers.is_empty() {
        html.push_str(&format!(
            "<h2 style=\"font-size: 15px;\">Vouchers to handle this month ({})</h2>",
            vouchers.len()
        ));
        html.push_str("<table border=\"1\" cellpadding=\"6\" cellspacing=\"0\">");
        html.push_str(
            "<tr><th>Description</th><th>Account</th><th>Amount</th><th>Recurs</th></tr>",
        );
        for v in vouchers {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td align=\"right\">{}</td><td>{}</td></tr>",
                v.description,
                v.account_name,
                fmt_amount(&v.amount),
                repeat_day_label(v.repeat_day)
            ));
        }
        html.push_str("</table>");
    }

    if !contracts.is_empty() {
        html.push_str(&format!(
            "<h2 style=\"font-size: 15px;\">Contracts nearing expiry ({})</h2>",
            contracts.len()
        ));
        html.push_str("<table border=\"1\" cellpadding=\"6\" cellspacing=\"0\">");
        html.push_str(
            "<tr><th>Name</th><th>Category</th><th>Company</th><th>Amount</th><th>Expires</th><th>D-Day</th></tr>",
        );
        for c in contracts {
            html.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td align=\"right\">{}</td><td>{}</td><td>D-{}</td></tr>",
                c.contract.name,
                c.category_name,
                c.contract.company.as_deref().unwrap_or("-"),
                fmt_amount(&c.contract.amount),
                c.contract.end_date.format("%Y-%m-%d"),
                c.days_until
            ));
        }
        html.push_str("</table>");
    }

    html.push_str(
        "<p style=\"color: #888; font-size: 12px;\">Vouchers drop off once marked \
         complete for the month. Contracts alert at 45, 30, 20, 10, 3, 2, and 1 \
         days before expiry.</p>",
    );
    html.push_str("</body></html>");
    html
}
