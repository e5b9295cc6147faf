//! Record schemas for every persisted collection.
//!
//! Records are stored as camelCase JSON. Numeric fields accept either a
//! JSON number or a numeric string (forms submit `"5000"`), so reading a
//! record through its schema also normalizes it.

use base64::Engine;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Role carried by an identity or a user record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    #[serde(rename = "admin")]
    Admin,
    #[serde(rename = "sitemanager")]
    SiteManager,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::SiteManager => "sitemanager",
        }
    }
}

/// Every top-level field of the collection blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Projects,
    Users,
    Labours,
    Expenses,
    Stocks,
    Machines,
    Vendors,
    Notifications,
    Transfers,
    AttendanceAdmin,
    AttendanceSite,
    LabourAttendances,
    BankTransactions,
    CashTransactions,
    Payments,
    Gallery,
    DailyReports,
    Accounts,
}

impl Collection {
    pub const ALL: [Collection; 18] = [
        Self::Projects,
        Self::Users,
        Self::Labours,
        Self::Expenses,
        Self::Stocks,
        Self::Machines,
        Self::Vendors,
        Self::Notifications,
        Self::Transfers,
        Self::AttendanceAdmin,
        Self::AttendanceSite,
        Self::LabourAttendances,
        Self::BankTransactions,
        Self::CashTransactions,
        Self::Payments,
        Self::Gallery,
        Self::DailyReports,
        Self::Accounts,
    ];

    /// Field name in the persisted blob
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Projects => "projects",
            Self::Users => "users",
            Self::Labours => "labours",
            Self::Expenses => "expenses",
            Self::Stocks => "stocks",
            Self::Machines => "machines",
            Self::Vendors => "vendors",
            Self::Notifications => "notifications",
            Self::Transfers => "transfers",
            Self::AttendanceAdmin => "attendanceAdmin",
            Self::AttendanceSite => "attendanceSite",
            Self::LabourAttendances => "labourAttendances",
            Self::BankTransactions => "bankTransactions",
            Self::CashTransactions => "cashTransactions",
            Self::Payments => "payments",
            Self::Gallery => "gallery",
            Self::DailyReports => "dailyReports",
            Self::Accounts => "accounts",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == s)
    }

    /// `accounts` holds a single object rather than an array of records
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Accounts)
    }

    /// REST resource under `/admin/` or `/site/`
    pub fn api_resource(&self) -> &'static str {
        match self {
            Self::AttendanceAdmin | Self::AttendanceSite => "attendance",
            Self::LabourAttendances => "labour-attendance",
            Self::BankTransactions => "bank-transactions",
            Self::CashTransactions => "cash-transactions",
            Self::DailyReports => "daily-reports",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed record living in one collection
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    /// Field-level checks beyond what the schema enforces
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

// ============================================================================
// Field coercion
// ============================================================================

/// Accept a number, a numeric string, an empty string or null
pub fn coerce_number(value: &Value) -> Result<f64, String> {
    match value {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| format!("{} is out of range", n)),
        Value::String(s) if s.trim().is_empty() => Ok(0.0),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("'{}' is not a number", s)),
        Value::Null => Ok(0.0),
        other => Err(format!("expected a number, got {}", other)),
    }
}

fn de_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(deserializer)?;
    coerce_number(&value).map_err(serde::de::Error::custom)
}

fn de_opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        _ => coerce_number(&value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

fn default_one() -> f64 {
    1.0
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("{} is required", field))
    } else {
        Ok(())
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), String> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(format!("{} must be a non-negative number", field))
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{} '{}' is not a YYYY-MM-DD date", field, value))
}

/// Camera captures arrive as `data:image/...;base64,<payload>` or bare base64
pub fn validate_image(data: &str) -> Result<(), String> {
    let payload = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| "image data URL has no payload".to_string())?;
            if !header.starts_with("image/") || !header.ends_with(";base64") {
                return Err(format!("unsupported image encoding '{}'", header));
            }
            payload
        }
        None => data,
    };
    base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map(|_| ())
        .map_err(|e| format!("image is not valid base64: {}", e))
}

// ============================================================================
// Schemas
// ============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, deserialize_with = "de_number")]
    pub budget: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default = "default_project_status")]
    pub status: String,
}

fn default_project_status() -> String {
    "Active".to_string()
}

impl Record for Project {
    const COLLECTION: Collection = Collection::Projects;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        non_negative("budget", self.budget)?;
        let start = match self.start_date.as_deref().filter(|d| !d.is_empty()) {
            Some(d) => Some(parse_date("startDate", d)?),
            None => None,
        };
        let end = match self.end_date.as_deref().filter(|d| !d.is_empty()) {
            Some(d) => Some(parse_date("endDate", d)?),
            None => None,
        };
        if let (Some(start), Some(end)) = (start, end) {
            if end < start {
                return Err("endDate is before startDate".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default, deserialize_with = "de_number")]
    pub salary: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_joining: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assigned_sites: Vec<String>,
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        if !is_valid_email(&self.email) {
            return Err(format!("email '{}' is not valid", self.email));
        }
        non_negative("salary", self.salary)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Labour {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub designation: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub daily_wage: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_site: Option<String>,
    #[serde(default, deserialize_with = "de_number")]
    pub pending_payout: f64,
}

impl Record for Labour {
    const COLLECTION: Collection = Collection::Labours;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        non_negative("dailyWage", self.daily_wage)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    #[default]
    Material,
    Labour,
    Machinery,
    Transport,
    Other,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub name: String,
    #[serde(deserialize_with = "de_number")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voucher_number: Option<String>,
    #[serde(default)]
    pub category: ExpenseCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for Expense {
    const COLLECTION: Collection = Collection::Expenses;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("projectId", &self.project_id)?;
        require("name", &self.name)?;
        non_negative("amount", self.amount)
    }
}

pub const STOCK_UNITS: &[&str] = &[
    "kg", "ltr", "bags", "ft", "meter", "ton", "piece", "box", "bundle",
];

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stock {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor_id: Option<String>,
    pub material_name: String,
    #[serde(default)]
    pub unit: String,
    #[serde(deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(
        default,
        deserialize_with = "de_opt_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Record for Stock {
    const COLLECTION: Collection = Collection::Stocks;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("projectId", &self.project_id)?;
        require("materialName", &self.material_name)?;
        if !self.unit.is_empty() && !STOCK_UNITS.contains(&self.unit.as_str()) {
            return Err(format!("unknown unit '{}'", self.unit));
        }
        non_negative("quantity", self.quantity)?;
        if let Some(price) = self.price {
            non_negative("price", price)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MachineStatus {
    #[default]
    Available,
    InUse,
    Maintenance,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plate_number: Option<String>,
    #[serde(default = "default_one", deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(default)]
    pub status: MachineStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

impl Record for Machine {
    const COLLECTION: Collection = Collection::Machines;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        non_negative("quantity", self.quantity)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Record for Vendor {
    const COLLECTION: Collection = Collection::Vendors;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("name", &self.name)?;
        match self.email.as_deref().filter(|e| !e.is_empty()) {
            Some(email) if !is_valid_email(email) => {
                Err(format!("email '{}' is not valid", email))
            }
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipient_id: Option<String>,
    pub message: String,
    #[serde(rename = "type", default = "default_notification_kind")]
    pub kind: String,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

fn default_notification_kind() -> String {
    "general".to_string()
}

impl Record for Notification {
    const COLLECTION: Collection = Collection::Notifications;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("message", &self.message)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    #[default]
    Labour,
    Machine,
    Stock,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: TransferKind,
    pub item_id: String,
    pub from_project: String,
    pub to_project: String,
    #[serde(default = "default_one", deserialize_with = "de_number")]
    pub quantity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Record for Transfer {
    const COLLECTION: Collection = Collection::Transfers;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("itemId", &self.item_id)?;
        require("fromProject", &self.from_project)?;
        require("toProject", &self.to_project)?;
        if self.from_project == self.to_project {
            return Err("fromProject and toProject must differ".to_string());
        }
        if self.quantity <= 0.0 {
            return Err("quantity must be positive".to_string());
        }
        Ok(())
    }
}

/// Attendance of a site manager as reviewed by an admin
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAttendance {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Record for AdminAttendance {
    const COLLECTION: Collection = Collection::AttendanceAdmin;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("userId", &self.user_id)?;
        parse_date("date", &self.date).map(|_| ())
    }
}

/// Attendance marked by a site manager, usually with a photo
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteAttendance {
    #[serde(default)]
    pub id: String,
    pub user_id: String,
    pub project_id: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Record for SiteAttendance {
    const COLLECTION: Collection = Collection::AttendanceSite;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("userId", &self.user_id)?;
        require("projectId", &self.project_id)?;
        parse_date("date", &self.date)?;
        match self.photo.as_deref().filter(|p| !p.is_empty()) {
            Some(photo) => validate_image(photo),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabourAttendance {
    #[serde(default)]
    pub id: String,
    pub labour_id: String,
    pub project_id: String,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
}

impl Record for LabourAttendance {
    const COLLECTION: Collection = Collection::LabourAttendances;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("labourId", &self.labour_id)?;
        require("projectId", &self.project_id)?;
        parse_date("date", &self.date).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankTransaction {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(deserialize_with = "de_number")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for BankTransaction {
    const COLLECTION: Collection = Collection::BankTransactions;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CashTransaction {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(deserialize_with = "de_number")]
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for CashTransaction {
    const COLLECTION: Collection = Collection::CashTransactions;

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Cash,
    Bank,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    #[serde(default)]
    pub id: String,
    pub labour_id: String,
    #[serde(deserialize_with = "de_number")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de_number")]
    pub deduction: f64,
    #[serde(default)]
    pub payment_mode: PaymentMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Payment {
    /// Amount actually handed over
    pub fn net_amount(&self) -> f64 {
        self.amount - self.deduction
    }
}

impl Record for Payment {
    const COLLECTION: Collection = Collection::Payments;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("labourId", &self.labour_id)?;
        non_negative("amount", self.amount)?;
        non_negative("deduction", self.deduction)?;
        if self.net_amount() < 0.0 {
            return Err("deduction exceeds amount".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    pub images: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for GalleryItem {
    const COLLECTION: Collection = Collection::Gallery;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("projectId", &self.project_id)?;
        if self.images.is_empty() {
            return Err("at least one image is required".to_string());
        }
        self.images.iter().try_for_each(|img| validate_image(img))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportType {
    #[default]
    Morning,
    Evening,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyReport {
    #[serde(default)]
    pub id: String,
    pub project_id: String,
    #[serde(default)]
    pub report_type: ReportType,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Record for DailyReport {
    const COLLECTION: Collection = Collection::DailyReports;

    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> Result<(), String> {
        require("projectId", &self.project_id)?;
        self.photos.iter().try_for_each(|p| validate_image(p))
    }
}

/// The single `accounts` document
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
pub struct Accounts {
    #[serde(default, deserialize_with = "de_number")]
    pub capital: f64,
}

// ============================================================================
// Untyped validation
// ============================================================================

fn check<T: DeserializeOwned + Record>(value: &Value) -> Result<(), String> {
    let record: T = serde_json::from_value(value.clone()).map_err(|e| e.to_string())?;
    record.validate()
}

/// Validate a raw JSON record against its collection's schema
pub fn validate_value(collection: Collection, value: &Value) -> Result<(), String> {
    if !value.is_object() {
        return Err("record must be a JSON object".to_string());
    }
    match collection {
        Collection::Projects => check::<Project>(value),
        Collection::Users => check::<User>(value),
        Collection::Labours => check::<Labour>(value),
        Collection::Expenses => check::<Expense>(value),
        Collection::Stocks => check::<Stock>(value),
        Collection::Machines => check::<Machine>(value),
        Collection::Vendors => check::<Vendor>(value),
        Collection::Notifications => check::<Notification>(value),
        Collection::Transfers => check::<Transfer>(value),
        Collection::AttendanceAdmin => check::<AdminAttendance>(value),
        Collection::AttendanceSite => check::<SiteAttendance>(value),
        Collection::LabourAttendances => check::<LabourAttendance>(value),
        Collection::BankTransactions => check::<BankTransaction>(value),
        Collection::CashTransactions => check::<CashTransaction>(value),
        Collection::Payments => check::<Payment>(value),
        Collection::Gallery => check::<GalleryItem>(value),
        Collection::DailyReports => check::<DailyReport>(value),
        Collection::Accounts => serde_json::from_value::<Accounts>(value.clone())
            .map(|_| ())
            .map_err(|e| e.to_string()),
    }
}
