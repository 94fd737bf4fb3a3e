//! Persisted rows.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A registered student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub user_id: i32,
    pub roll_number: String,
    pub name: String,
    pub email: String,
    pub dob: Option<NaiveDate>,
    pub wallet_address: Option<String>,
    /// On-chain identity token; its presence is the capability for later actions.
    pub identity_token_id: Option<String>,
    pub identity_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Faculty {
    pub faculty_id: i32,
    pub name: String,
    pub email: String,
    pub department: Option<String>,
    pub wallet_address: Option<String>,
    pub identity_token_id: Option<String>,
    pub identity_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Course {
    pub course_id: i32,
    pub course_name: String,
    pub description: Option<String>,
    pub faculty_id: Option<i32>,
    pub end_date: NaiveDate,
}

impl Course {
    /// A course has ended once its end date is strictly before `today`.
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        self.end_date < today
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Registration {
    pub registration_id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub grade: Option<i16>,
    pub tx_hash: Option<String>,
    pub registration_date: DateTime<Utc>,
}

/// A course as listed on a student's dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct RegisteredCourse {
    pub course_id: i32,
    pub course_name: String,
    pub end_date: NaiveDate,
    pub grade: Option<i16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Certificate {
    pub certificate_id: i32,
    pub user_id: i32,
    pub course_id: i32,
    pub nft_certificate_uri: String,
    pub token_id: Option<String>,
    pub tx_hash: Option<String>,
    pub issued_date: DateTime<Utc>,
}

/// Kind of on-chain action recorded in the `transactions` audit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    IdentityMint,
    CourseRegistration,
    CertificateIssue,
    FeePayment,
    RoomBooking,
    EventJoin,
}

impl TxKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxKind::IdentityMint => "identity_mint",
            TxKind::CourseRegistration => "course_registration",
            TxKind::CertificateIssue => "certificate_issue",
            TxKind::FeePayment => "fee_payment",
            TxKind::RoomBooking => "room_booking",
            TxKind::EventJoin => "event_join",
        }
    }
}

impl std::fmt::Display for TxKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Row of the `transactions` audit table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LedgerTransaction {
    pub transaction_id: i32,
    pub user_id: i32,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub amount: Option<String>,
    pub transaction_hash: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Semester {
    pub semester_id: i32,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Fee in ether.
    pub fee_amount: String,
}

impl Semester {
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}

/// Row of `fees_paid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeePayment {
    pub payment_id: i32,
    pub user_id: i32,
    pub semester_id: i32,
    pub amount: String,
    pub token_uri: String,
    pub tx_hash: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Room {
    pub room_id: i32,
    pub name: String,
    pub location: Option<String>,
    pub capacity: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Event {
    pub event_id: i32,
    pub title: String,
    pub description: Option<String>,
    pub room_id: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub capacity: i32,
}

/// A room reservation or an event seat. Exactly one of `room_id`/`event_id` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub booking_id: i32,
    pub user_id: i32,
    pub room_id: Option<i32>,
    pub event_id: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub token_uri: Option<String>,
    pub tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Certificate page entry: a registered course and whether it can be certified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateEligibility {
    pub course_id: i32,
    pub course_name: String,
    pub end_date: NaiveDate,
    pub eligible: bool,
    pub issued: bool,
}

/// Fee page summary for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeStatus {
    pub user: User,
    pub semester: Option<Semester>,
    pub amount_eth: String,
    pub paid: bool,
}
