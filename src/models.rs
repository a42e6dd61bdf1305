use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceKind {
    CheckIn,
    CheckOut,
}

impl AttendanceKind {
    pub fn opposite(self) -> Self {
        match self {
            AttendanceKind::CheckIn => AttendanceKind::CheckOut,
            AttendanceKind::CheckOut => AttendanceKind::CheckIn,
        }
    }

    /// Label shown on the clock-in screen.
    pub fn label(self) -> &'static str {
        match self {
            AttendanceKind::CheckIn => "Entrada",
            AttendanceKind::CheckOut => "Saída",
        }
    }
}

impl fmt::Display for AttendanceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub kind: AttendanceKind,
    pub occurred_at: DateTime<Utc>,
    pub image_ref: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: String,
    pub description: String,
    pub amount: f64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyBucket {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct UserRecords {
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub sales: Vec<SaleRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct AppData {
    pub users: BTreeMap<String, UserRecords>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: String,
    pub name: String,
    pub qr_code_data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketOrder {
    pub id: String,
    pub buyer: String,
    pub date: NaiveDate,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterAttendanceRequest {
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
pub struct RegisterSaleRequest {
    #[serde(default)]
    pub description: String,
    pub amount: AmountInput,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VisitDateRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Serialize)]
pub struct DayGroup {
    pub date: NaiveDate,
    pub records: Vec<AttendanceRecord>,
}

#[derive(Debug, Serialize)]
pub struct AttendanceHistoryResponse {
    pub next_kind: AttendanceKind,
    pub days: Vec<DayGroup>,
}

#[derive(Debug, Serialize)]
pub struct SalesSummary {
    pub current_month_total: f64,
    pub year_total: f64,
    pub goal: f64,
    pub goal_progress: u8,
    pub monthly_series: Vec<MonthlyBucket>,
    pub recent: Vec<SaleRecord>,
}

#[derive(Debug, Serialize)]
pub struct TicketView {
    pub id: String,
    pub name: String,
    pub qr_code_data: String,
    pub qr_image_url: String,
}

#[derive(Debug, Serialize)]
pub struct OrderValidationResponse {
    pub order_id: String,
    pub buyer: String,
    pub date: NaiveDate,
    pub ticket_count: usize,
    pub tickets: Vec<TicketView>,
}
