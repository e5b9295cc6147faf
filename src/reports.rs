//! Derived figures for the accounts and attendance pages.

use crate::records::{
    Accounts, AdminAttendance, BankTransaction, CashTransaction, Expense, SiteAttendance, User,
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountsSummary {
    pub capital: f64,
    pub total_expenses: f64,
    pub total_bank_transactions: f64,
    pub total_cash_transactions: f64,
}

impl AccountsSummary {
    pub fn compute(
        accounts: &Accounts,
        expenses: &[Expense],
        bank: &[BankTransaction],
        cash: &[CashTransaction],
    ) -> Self {
        Self {
            capital: accounts.capital,
            total_expenses: expenses.iter().map(|e| e.amount).sum(),
            total_bank_transactions: bank.iter().map(|t| t.amount).sum(),
            total_cash_transactions: cash.iter().map(|t| t.amount).sum(),
        }
    }
}

/// An attendance mark for one user on one day
pub trait AttendanceEntry {
    fn user_id(&self) -> &str;
    fn date(&self) -> &str;
}

impl AttendanceEntry for AdminAttendance {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn date(&self) -> &str {
        &self.date
    }
}

impl AttendanceEntry for SiteAttendance {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn date(&self) -> &str {
        &self.date
    }
}

/// Leading `YYYY-MM-DD` of a date or timestamp
fn entry_day(date: &str) -> Option<NaiveDate> {
    let day = date.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Share of this month's days so far on which `user_id` was present
///
/// Counts distinct days from the first of `today`'s month through `today`,
/// divided by the day of month, as a percentage rounded to one decimal.
pub fn attendance_percentage<E: AttendanceEntry>(records: &[E], user_id: &str, today: NaiveDate) -> f64 {
    let Some(start) = today.with_day(1) else {
        return 0.0;
    };
    let days: BTreeSet<NaiveDate> = records
        .iter()
        .filter(|r| r.user_id() == user_id)
        .filter_map(|r| entry_day(r.date()))
        .filter(|d| *d >= start && *d <= today)
        .collect();

    let pct = days.len() as f64 / today.day() as f64 * 100.0;
    (pct * 10.0).round() / 10.0
}

/// Monthly salary scaled by attendance, rounded to a whole amount
pub fn salary_for_month<E: AttendanceEntry>(user: &User, records: &[E], today: NaiveDate) -> f64 {
    let pct = attendance_percentage(records, &user.id, today);
    (user.salary * pct / 100.0).round()
}
