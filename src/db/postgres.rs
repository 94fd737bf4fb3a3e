//! PostgreSQL store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Transaction};

use crate::db::store::{PortalStore, StoreError, StoreResult};
use crate::domain::*;

// NUMERIC columns are read back as text so amounts keep their decimal form.
const SEMESTER_COLUMNS: &str =
    "semester_id, name, start_date, end_date, fee_amount::text AS fee_amount";
const FEE_COLUMNS: &str =
    "payment_id, user_id, semester_id, amount::text AS amount, token_uri, tx_hash, paid_at";
const TRANSACTION_COLUMNS: &str =
    "transaction_id, user_id, type, amount::text AS amount, transaction_hash, transaction_date";

/// Map driver errors onto the store taxonomy using Postgres SQLSTATE codes.
fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let detail = db_err
                .constraint()
                .map(|c| format!("{} ({})", db_err.message(), c))
                .unwrap_or_else(|| db_err.message().to_string());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(detail),
                Some("23503") => StoreError::NotFound(format!("referenced row: {}", detail)),
                Some("23514") | Some("22003") => StoreError::Constraint(detail),
                Some(code) => StoreError::Database(format!("[{}] {}", code, detail)),
                None => StoreError::Database(detail),
            }
        }
        sqlx::Error::RowNotFound => StoreError::NotFound("row".to_string()),
        _ => StoreError::Database(err.to_string()),
    }
}

/// Store backed by a shared `PgPool`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool.begin().await.map_err(map_sqlx_error)
    }
}

async fn insert_ledger_entry(
    tx: &mut Transaction<'static, Postgres>,
    entry: &LedgerEntry,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO transactions (user_id, type, amount, transaction_hash) \
         VALUES ($1, $2, $3::numeric, $4)",
    )
    .bind(entry.user_id)
    .bind(entry.kind.as_str())
    .bind(entry.amount.as_deref())
    .bind(&entry.tx_hash)
    .execute(&mut **tx)
    .await
    .map_err(map_sqlx_error)?;
    Ok(())
}

#[async_trait]
impl PortalStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (roll_number, name, email, dob, wallet_address) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(&user.roll_number)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.dob)
        .bind(user.wallet_address.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_user(&self, user_id: i32) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn set_user_identity(
        &self,
        user_id: i32,
        token_id: Option<&str>,
        entry: &LedgerEntry,
    ) -> StoreResult<User> {
        let mut tx = self.begin().await?;
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET identity_token_id = $2, identity_tx_hash = $3 \
             WHERE user_id = $1 RETURNING *",
        )
        .bind(user_id)
        .bind(token_id)
        .bind(&entry.tx_hash)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        insert_ledger_entry(&mut tx, entry).await?;
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(user)
    }

    async fn delete_user(&self, user_id: i32) -> StoreResult<()> {
        sqlx::query("DELETE FROM users WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_faculty(&self, faculty: &NewFaculty) -> StoreResult<Faculty> {
        sqlx::query_as::<_, Faculty>(
            "INSERT INTO faculty (name, email, department, wallet_address) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&faculty.name)
        .bind(&faculty.email)
        .bind(faculty.department.as_deref())
        .bind(faculty.wallet_address.as_deref())
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_faculty(&self, faculty_id: i32) -> StoreResult<Option<Faculty>> {
        sqlx::query_as::<_, Faculty>("SELECT * FROM faculty WHERE faculty_id = $1")
            .bind(faculty_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_faculty_by_email(&self, email: &str) -> StoreResult<Option<Faculty>> {
        sqlx::query_as::<_, Faculty>("SELECT * FROM faculty WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn set_faculty_identity(
        &self,
        faculty_id: i32,
        token_id: Option<&str>,
        tx_hash: &str,
    ) -> StoreResult<Faculty> {
        sqlx::query_as::<_, Faculty>(
            "UPDATE faculty SET identity_token_id = $2, identity_tx_hash = $3 \
             WHERE faculty_id = $1 RETURNING *",
        )
        .bind(faculty_id)
        .bind(token_id)
        .bind(tx_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StoreError::NotFound(format!("faculty {}", faculty_id)))
    }

    async fn delete_faculty(&self, faculty_id: i32) -> StoreResult<()> {
        sqlx::query("DELETE FROM faculty WHERE faculty_id = $1")
            .bind(faculty_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn insert_course(&self, course: &NewCourse) -> StoreResult<Course> {
        sqlx::query_as::<_, Course>(
            "INSERT INTO courses (course_name, description, faculty_id, end_date) \
             VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&course.course_name)
        .bind(course.description.as_deref())
        .bind(course.faculty_id)
        .bind(course.end_date)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_course(&self, course_id: i32) -> StoreResult<Option<Course>> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses WHERE course_id = $1")
            .bind(course_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        sqlx::query_as::<_, Course>("SELECT * FROM courses ORDER BY course_id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_registration(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Registration>> {
        sqlx::query_as::<_, Registration>(
            "SELECT * FROM registrations WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_registration(
        &self,
        user_id: i32,
        course_id: i32,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Registration> {
        let mut tx = self.begin().await?;
        let registration = sqlx::query_as::<_, Registration>(
            "INSERT INTO registrations (user_id, course_id, tx_hash) \
             VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(user_id)
        .bind(course_id)
        .bind(entry.map(|e| e.tx_hash.as_str()))
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if let Some(entry) = entry {
            insert_ledger_entry(&mut tx, entry).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(registration)
    }

    async fn list_registered_courses(&self, user_id: i32) -> StoreResult<Vec<RegisteredCourse>> {
        sqlx::query_as::<_, RegisteredCourse>(
            "SELECT r.course_id, c.course_name, c.end_date, r.grade \
             FROM registrations r JOIN courses c ON r.course_id = c.course_id \
             WHERE r.user_id = $1 ORDER BY r.registration_date",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_grade(&self, registration_id: i32, grade: i16) -> StoreResult<Registration> {
        sqlx::query_as::<_, Registration>(
            "UPDATE registrations SET grade = $2 WHERE registration_id = $1 RETURNING *",
        )
        .bind(registration_id)
        .bind(grade)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StoreError::NotFound(format!("registration {}", registration_id)))
    }

    async fn find_certificate(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 AND course_id = $2",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_certificates(&self, user_id: i32) -> StoreResult<Vec<Certificate>> {
        sqlx::query_as::<_, Certificate>(
            "SELECT * FROM certificates WHERE user_id = $1 ORDER BY certificate_id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Certificate> {
        let mut tx = self.begin().await?;
        let row = sqlx::query_as::<_, Certificate>(
            "INSERT INTO certificates (user_id, course_id, nft_certificate_uri, token_id, tx_hash) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(certificate.user_id)
        .bind(certificate.course_id)
        .bind(&certificate.uri)
        .bind(certificate.token_id.as_deref())
        .bind(certificate.tx_hash.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if let Some(entry) = entry {
            insert_ledger_entry(&mut tx, entry).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row)
    }

    async fn list_transactions(&self, user_id: i32) -> StoreResult<Vec<LedgerTransaction>> {
        sqlx::query_as::<_, LedgerTransaction>(&format!(
            "SELECT {} FROM transactions WHERE user_id = $1 \
             ORDER BY transaction_date DESC, transaction_id DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_semester(
        &self,
        semester: &NewSemester,
        fee_amount: &str,
    ) -> StoreResult<Semester> {
        sqlx::query_as::<_, Semester>(&format!(
            "INSERT INTO semesters (name, start_date, end_date, fee_amount) \
             VALUES ($1, $2, $3, $4::numeric) RETURNING {}",
            SEMESTER_COLUMNS
        ))
        .bind(&semester.name)
        .bind(semester.start_date)
        .bind(semester.end_date)
        .bind(fee_amount)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_semester(&self, semester_id: i32) -> StoreResult<Option<Semester>> {
        sqlx::query_as::<_, Semester>(&format!(
            "SELECT {} FROM semesters WHERE semester_id = $1",
            SEMESTER_COLUMNS
        ))
        .bind(semester_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list_semesters(&self) -> StoreResult<Vec<Semester>> {
        sqlx::query_as::<_, Semester>(&format!(
            "SELECT {} FROM semesters ORDER BY start_date",
            SEMESTER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_fee_payment(
        &self,
        user_id: i32,
        semester_id: i32,
    ) -> StoreResult<Option<FeePayment>> {
        sqlx::query_as::<_, FeePayment>(&format!(
            "SELECT {} FROM fees_paid WHERE user_id = $1 AND semester_id = $2",
            FEE_COLUMNS
        ))
        .bind(user_id)
        .bind(semester_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn insert_fee_payment(
        &self,
        payment: &NewFeePayment,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<FeePayment> {
        let mut tx = self.begin().await?;
        let row = sqlx::query_as::<_, FeePayment>(&format!(
            "INSERT INTO fees_paid (user_id, semester_id, amount, token_uri, tx_hash) \
             VALUES ($1, $2, $3::numeric, $4, $5) RETURNING {}",
            FEE_COLUMNS
        ))
        .bind(payment.user_id)
        .bind(payment.semester_id)
        .bind(&payment.amount)
        .bind(&payment.token_uri)
        .bind(payment.tx_hash.as_deref())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;
        if let Some(entry) = entry {
            insert_ledger_entry(&mut tx, entry).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(row)
    }

    async fn insert_room(&self, room: &NewRoom) -> StoreResult<Room> {
        sqlx::query_as::<_, Room>(
            "INSERT INTO rooms (name, location, capacity) VALUES ($1, $2, $3) RETURNING *",
        )
        .bind(&room.name)
        .bind(room.location.as_deref())
        .bind(room.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_room(&self, room_id: i32) -> StoreResult<Option<Room>> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms WHERE room_id = $1")
            .bind(room_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        sqlx::query_as::<_, Room>("SELECT * FROM rooms ORDER BY room_id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_event(&self, event: &NewEvent) -> StoreResult<Event> {
        sqlx::query_as::<_, Event>(
            "INSERT INTO events (title, description, room_id, starts_at, ends_at, capacity) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING *",
        )
        .bind(&event.title)
        .bind(event.description.as_deref())
        .bind(event.room_id)
        .bind(event.starts_at)
        .bind(event.ends_at)
        .bind(event.capacity)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_event(&self, event_id: i32) -> StoreResult<Option<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events WHERE event_id = $1")
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        sqlx::query_as::<_, Event>("SELECT * FROM events ORDER BY starts_at")
            .fetch_all(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn count_overlapping_bookings(
        &self,
        room_id: i32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings \
             WHERE room_id = $1 AND starts_at < $3 AND ends_at > $2",
        )
        .bind(room_id)
        .bind(starts_at)
        .bind(ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn count_event_bookings(&self, event_id: i32) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE event_id = $1")
            .bind(event_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_event_booking(
        &self,
        user_id: i32,
        event_id: i32,
    ) -> StoreResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE user_id = $1 AND event_id = $2")
            .bind(user_id)
            .bind(event_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn find_booking(&self, booking_id: i32) -> StoreResult<Option<Booking>> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking> {
        sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (user_id, room_id, event_id, starts_at, ends_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(booking.user_id)
        .bind(booking.room_id)
        .bind(booking.event_id)
        .bind(booking.starts_at)
        .bind(booking.ends_at)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn set_booking_receipt(
        &self,
        booking_id: i32,
        token_uri: &str,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Booking> {
        let mut tx = self.begin().await?;
        let booking = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET token_uri = $2, tx_hash = $3 WHERE booking_id = $1 RETURNING *",
        )
        .bind(booking_id)
        .bind(token_uri)
        .bind(entry.map(|e| e.tx_hash.as_str()))
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?
        .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))?;
        if let Some(entry) = entry {
            insert_ledger_entry(&mut tx, entry).await?;
        }
        tx.commit().await.map_err(map_sqlx_error)?;
        Ok(booking)
    }

    async fn delete_booking(&self, booking_id: i32) -> StoreResult<()> {
        sqlx::query("DELETE FROM bookings WHERE booking_id = $1")
            .bind(booking_id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn list_room_bookings(&self, room_id: i32) -> StoreResult<Vec<Booking>> {
        sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE room_id = $1 ORDER BY starts_at",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
