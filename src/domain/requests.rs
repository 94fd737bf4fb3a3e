//! Request payloads and insert records.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::TxKind;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub roll_number: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFaculty {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCourse {
    pub course_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub faculty_id: Option<i32>,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSemester {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Ether amount; the configured default applies when absent.
    #[serde(default)]
    pub fee_amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    #[serde(default)]
    pub location: Option<String>,
    pub capacity: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub room_id: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
}

/// `wallet_address` on the action requests overrides the address stored on the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRegistrationRequest {
    pub user_id: i32,
    pub course_id: i32,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CertificateRequest {
    pub user_id: i32,
    pub course_id: i32,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeePaymentRequest {
    pub user_id: i32,
    pub semester_id: i32,
    /// Ether amount; must equal the semester fee.
    pub amount: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomBookingRequest {
    pub user_id: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventJoinRequest {
    pub user_id: i32,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    pub user_id: i32,
    pub course_id: i32,
    pub grade: i16,
}

/// Audit row written next to every chain-backed insert.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub user_id: i32,
    pub kind: TxKind,
    pub amount: Option<String>,
    pub tx_hash: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewCertificate {
    pub user_id: i32,
    pub course_id: i32,
    pub uri: String,
    pub token_id: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFeePayment {
    pub user_id: i32,
    pub semester_id: i32,
    pub amount: String,
    pub token_uri: String,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub user_id: i32,
    pub room_id: Option<i32>,
    pub event_id: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}
