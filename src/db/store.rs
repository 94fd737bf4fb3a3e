//! Storage port for the portal.
//!
//! Every read the handlers need is a direct query; there is no cache in
//! front of the store. Writes that accompany a chain call take the audit
//! [`LedgerEntry`] so the row and its `transactions` record land together.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::*;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A referenced row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A CHECK constraint rejected the write.
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Connection, pool or protocol failure.
    #[error("Database error: {0}")]
    Database(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PortalStore: Send + Sync {
    /// Cheap liveness probe.
    async fn ping(&self) -> StoreResult<()>;

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User>;
    async fn find_user(&self, user_id: i32) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    /// Record the minted identity token on the user and audit the mint.
    async fn set_user_identity(
        &self,
        user_id: i32,
        token_id: Option<&str>,
        entry: &LedgerEntry,
    ) -> StoreResult<User>;
    async fn delete_user(&self, user_id: i32) -> StoreResult<()>;

    async fn insert_faculty(&self, faculty: &NewFaculty) -> StoreResult<Faculty>;
    async fn find_faculty(&self, faculty_id: i32) -> StoreResult<Option<Faculty>>;
    async fn find_faculty_by_email(&self, email: &str) -> StoreResult<Option<Faculty>>;
    async fn set_faculty_identity(
        &self,
        faculty_id: i32,
        token_id: Option<&str>,
        tx_hash: &str,
    ) -> StoreResult<Faculty>;
    async fn delete_faculty(&self, faculty_id: i32) -> StoreResult<()>;

    async fn insert_course(&self, course: &NewCourse) -> StoreResult<Course>;
    async fn find_course(&self, course_id: i32) -> StoreResult<Option<Course>>;
    async fn list_courses(&self) -> StoreResult<Vec<Course>>;

    async fn find_registration(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Registration>>;
    async fn insert_registration(
        &self,
        user_id: i32,
        course_id: i32,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Registration>;
    async fn list_registered_courses(&self, user_id: i32) -> StoreResult<Vec<RegisteredCourse>>;
    async fn set_grade(&self, registration_id: i32, grade: i16) -> StoreResult<Registration>;

    async fn find_certificate(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Certificate>>;
    async fn list_certificates(&self, user_id: i32) -> StoreResult<Vec<Certificate>>;
    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Certificate>;

    /// Audit rows for a user, newest first.
    async fn list_transactions(&self, user_id: i32) -> StoreResult<Vec<LedgerTransaction>>;

    async fn insert_semester(
        &self,
        semester: &NewSemester,
        fee_amount: &str,
    ) -> StoreResult<Semester>;
    async fn find_semester(&self, semester_id: i32) -> StoreResult<Option<Semester>>;
    async fn list_semesters(&self) -> StoreResult<Vec<Semester>>;

    async fn find_fee_payment(
        &self,
        user_id: i32,
        semester_id: i32,
    ) -> StoreResult<Option<FeePayment>>;
    /// Insert the `fees_paid` row and its audit entry in one transaction.
    async fn insert_fee_payment(
        &self,
        payment: &NewFeePayment,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<FeePayment>;

    async fn insert_room(&self, room: &NewRoom) -> StoreResult<Room>;
    async fn find_room(&self, room_id: i32) -> StoreResult<Option<Room>>;
    async fn list_rooms(&self) -> StoreResult<Vec<Room>>;

    async fn insert_event(&self, event: &NewEvent) -> StoreResult<Event>;
    async fn find_event(&self, event_id: i32) -> StoreResult<Option<Event>>;
    async fn list_events(&self) -> StoreResult<Vec<Event>>;

    /// Room bookings whose interval intersects `[starts_at, ends_at)`.
    async fn count_overlapping_bookings(
        &self,
        room_id: i32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<i64>;
    async fn count_event_bookings(&self, event_id: i32) -> StoreResult<i64>;
    async fn find_event_booking(&self, user_id: i32, event_id: i32)
        -> StoreResult<Option<Booking>>;
    async fn find_booking(&self, booking_id: i32) -> StoreResult<Option<Booking>>;
    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking>;
    /// Attach the token URI and, when the chain recorded it, the tx hash plus audit row.
    async fn set_booking_receipt(
        &self,
        booking_id: i32,
        token_uri: &str,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Booking>;
    async fn delete_booking(&self, booking_id: i32) -> StoreResult<()>;
    async fn list_room_bookings(&self, room_id: i32) -> StoreResult<Vec<Booking>>;
}
