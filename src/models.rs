// Copyright (c) 2025 Recurdesk Contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Caller identity passed explicitly into every data-access call. Admins see
/// every record; plain users only their own. Out-of-scope lookups fail closed
/// with [`NotFound`] so record existence is not leaked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Admin,
    User(i64),
}

impl Scope {
    pub fn user_filter(&self) -> Option<i64> {
        match self {
            Scope::Admin => None,
            Scope::User(id) => Some(*id),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("record not found")]
pub struct NotFound;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voucher {
    pub id: i64,
    pub description: String,
    pub amount: Option<Decimal>,
    pub vat_amount: Option<Decimal>,
    pub account_name: String,
    pub repeat_day: u32,
    pub user_id: i64,
}

/// A voucher due in a specific month, annotated with that month's completion
/// state. Completion is independent per (year, month).
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyVoucher {
    #[serde(flatten)]
    pub voucher: Voucher,
    pub completed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub name: String,
    pub company: Option<String>,
    pub amount: Option<Decimal>,
    pub start_date: Option<NaiveDate>,
    pub end_date: NaiveDate,
    pub contact_info: Option<String>,
    pub notes: Option<String>,
    pub category_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpiringContract {
    #[serde(flatten)]
    pub contract: Contract,
    pub category_name: String,
    pub days_until: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertRecord {
    pub id: i64,
    pub user_id: i64,
    pub email: String,
    pub voucher_count: i64,
    pub contract_count: i64,
    pub status: String,
    pub error: Option<String>,
    pub sent_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MailSetting {
    pub user_id: i64,
    pub email: String,
    pub is_active: bool,
}
