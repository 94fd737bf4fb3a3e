//! In-memory store for demos and tests.
//!
//! Enforces the same UNIQUE, CHECK and reference constraints as the
//! PostgreSQL schema so both backends reject the same writes.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::db::store::{PortalStore, StoreError, StoreResult};
use crate::domain::*;

#[derive(Default)]
struct Tables {
    next_id: BTreeMap<&'static str, i32>,
    users: BTreeMap<i32, User>,
    faculty: BTreeMap<i32, Faculty>,
    courses: BTreeMap<i32, Course>,
    registrations: BTreeMap<i32, Registration>,
    certificates: BTreeMap<i32, Certificate>,
    transactions: BTreeMap<i32, LedgerTransaction>,
    semesters: BTreeMap<i32, Semester>,
    fees_paid: BTreeMap<i32, FeePayment>,
    rooms: BTreeMap<i32, Room>,
    events: BTreeMap<i32, Event>,
    bookings: BTreeMap<i32, Booking>,
}

impl Tables {
    /// SERIAL emulation: ids start at 1 and are never reused.
    fn next(&mut self, table: &'static str) -> i32 {
        let id = self.next_id.entry(table).or_insert(0);
        *id += 1;
        *id
    }

    fn require_user(&self, user_id: i32) -> StoreResult<()> {
        if self.users.contains_key(&user_id) {
            Ok(())
        } else {
            Err(StoreError::NotFound(format!("referenced row: user {}", user_id)))
        }
    }

    fn push_ledger_entry(&mut self, entry: &LedgerEntry) -> StoreResult<()> {
        self.require_user(entry.user_id)?;
        if let Some(amount) = &entry.amount {
            check_amount("transactions.amount", amount)?;
        }
        let transaction_id = self.next("transactions");
        self.transactions.insert(
            transaction_id,
            LedgerTransaction {
                transaction_id,
                user_id: entry.user_id,
                kind: entry.kind.to_string(),
                amount: entry.amount.clone(),
                transaction_hash: Some(entry.tx_hash.clone()),
                transaction_date: Utc::now(),
            },
        );
        Ok(())
    }
}

fn check_amount(column: &str, amount: &str) -> StoreResult<()> {
    parse_amount(amount)
        .map(|_| ())
        .map_err(|_| StoreError::Constraint(format!("{} must be a non-negative amount", column)))
}

/// Store holding every table behind one lock.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PortalStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        if t.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict(format!("email {} already registered", user.email)));
        }
        let user_id = t.next("users");
        let row = User {
            user_id,
            roll_number: user.roll_number.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            dob: user.dob,
            wallet_address: user.wallet_address.clone(),
            identity_token_id: None,
            identity_tx_hash: None,
            created_at: Utc::now(),
        };
        t.users.insert(user_id, row.clone());
        Ok(row)
    }

    async fn find_user(&self, user_id: i32) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let t = self.tables.read().await;
        Ok(t.users.values().find(|u| u.email == email).cloned())
    }

    async fn set_user_identity(
        &self,
        user_id: i32,
        token_id: Option<&str>,
        entry: &LedgerEntry,
    ) -> StoreResult<User> {
        let mut t = self.tables.write().await;
        let user = t
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        user.identity_token_id = token_id.map(str::to_string);
        user.identity_tx_hash = Some(entry.tx_hash.clone());
        let user = user.clone();
        t.push_ledger_entry(entry)?;
        Ok(user)
    }

    async fn delete_user(&self, user_id: i32) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        let referenced = t.registrations.values().any(|r| r.user_id == user_id)
            || t.transactions.values().any(|r| r.user_id == user_id)
            || t.bookings.values().any(|r| r.user_id == user_id);
        if referenced {
            return Err(StoreError::Constraint(format!("user {} is still referenced", user_id)));
        }
        t.users.remove(&user_id);
        Ok(())
    }

    async fn insert_faculty(&self, faculty: &NewFaculty) -> StoreResult<Faculty> {
        let mut t = self.tables.write().await;
        if t.faculty.values().any(|f| f.email == faculty.email) {
            return Err(StoreError::Conflict(format!(
                "email {} already registered",
                faculty.email
            )));
        }
        let faculty_id = t.next("faculty");
        let row = Faculty {
            faculty_id,
            name: faculty.name.clone(),
            email: faculty.email.clone(),
            department: faculty.department.clone(),
            wallet_address: faculty.wallet_address.clone(),
            identity_token_id: None,
            identity_tx_hash: None,
            created_at: Utc::now(),
        };
        t.faculty.insert(faculty_id, row.clone());
        Ok(row)
    }

    async fn find_faculty(&self, faculty_id: i32) -> StoreResult<Option<Faculty>> {
        Ok(self.tables.read().await.faculty.get(&faculty_id).cloned())
    }

    async fn find_faculty_by_email(&self, email: &str) -> StoreResult<Option<Faculty>> {
        let t = self.tables.read().await;
        Ok(t.faculty.values().find(|f| f.email == email).cloned())
    }

    async fn set_faculty_identity(
        &self,
        faculty_id: i32,
        token_id: Option<&str>,
        tx_hash: &str,
    ) -> StoreResult<Faculty> {
        let mut t = self.tables.write().await;
        let faculty = t
            .faculty
            .get_mut(&faculty_id)
            .ok_or_else(|| StoreError::NotFound(format!("faculty {}", faculty_id)))?;
        faculty.identity_token_id = token_id.map(str::to_string);
        faculty.identity_tx_hash = Some(tx_hash.to_string());
        Ok(faculty.clone())
    }

    async fn delete_faculty(&self, faculty_id: i32) -> StoreResult<()> {
        let mut t = self.tables.write().await;
        if t.courses.values().any(|c| c.faculty_id == Some(faculty_id)) {
            return Err(StoreError::Constraint(format!(
                "faculty {} is still referenced",
                faculty_id
            )));
        }
        t.faculty.remove(&faculty_id);
        Ok(())
    }

    async fn insert_course(&self, course: &NewCourse) -> StoreResult<Course> {
        let mut t = self.tables.write().await;
        if let Some(faculty_id) = course.faculty_id {
            if !t.faculty.contains_key(&faculty_id) {
                return Err(StoreError::NotFound(format!(
                    "referenced row: faculty {}",
                    faculty_id
                )));
            }
        }
        let course_id = t.next("courses");
        let row = Course {
            course_id,
            course_name: course.course_name.clone(),
            description: course.description.clone(),
            faculty_id: course.faculty_id,
            end_date: course.end_date,
        };
        t.courses.insert(course_id, row.clone());
        Ok(row)
    }

    async fn find_course(&self, course_id: i32) -> StoreResult<Option<Course>> {
        Ok(self.tables.read().await.courses.get(&course_id).cloned())
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        Ok(self.tables.read().await.courses.values().cloned().collect())
    }

    async fn find_registration(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Registration>> {
        let t = self.tables.read().await;
        Ok(t
            .registrations
            .values()
            .find(|r| r.user_id == user_id && r.course_id == course_id)
            .cloned())
    }

    async fn insert_registration(
        &self,
        user_id: i32,
        course_id: i32,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Registration> {
        let mut t = self.tables.write().await;
        t.require_user(user_id)?;
        if !t.courses.contains_key(&course_id) {
            return Err(StoreError::NotFound(format!("referenced row: course {}", course_id)));
        }
        if t
            .registrations
            .values()
            .any(|r| r.user_id == user_id && r.course_id == course_id)
        {
            return Err(StoreError::Conflict(format!(
                "user {} already registered for course {}",
                user_id, course_id
            )));
        }
        let registration_id = t.next("registrations");
        let row = Registration {
            registration_id,
            user_id,
            course_id,
            grade: None,
            tx_hash: entry.map(|e| e.tx_hash.clone()),
            registration_date: Utc::now(),
        };
        if let Some(entry) = entry {
            t.push_ledger_entry(entry)?;
        }
        t.registrations.insert(registration_id, row.clone());
        Ok(row)
    }

    async fn list_registered_courses(&self, user_id: i32) -> StoreResult<Vec<RegisteredCourse>> {
        let t = self.tables.read().await;
        Ok(t
            .registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                t.courses.get(&r.course_id).map(|c| RegisteredCourse {
                    course_id: c.course_id,
                    course_name: c.course_name.clone(),
                    end_date: c.end_date,
                    grade: r.grade,
                })
            })
            .collect())
    }

    async fn set_grade(&self, registration_id: i32, grade: i16) -> StoreResult<Registration> {
        if !(0..=100).contains(&grade) {
            return Err(StoreError::Constraint(format!("grade {} outside 0..=100", grade)));
        }
        let mut t = self.tables.write().await;
        let registration = t
            .registrations
            .get_mut(&registration_id)
            .ok_or_else(|| StoreError::NotFound(format!("registration {}", registration_id)))?;
        registration.grade = Some(grade);
        Ok(registration.clone())
    }

    async fn find_certificate(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Certificate>> {
        let t = self.tables.read().await;
        Ok(t
            .certificates
            .values()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned())
    }

    async fn list_certificates(&self, user_id: i32) -> StoreResult<Vec<Certificate>> {
        let t = self.tables.read().await;
        Ok(t.certificates.values().filter(|c| c.user_id == user_id).cloned().collect())
    }

    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Certificate> {
        let mut t = self.tables.write().await;
        t.require_user(certificate.user_id)?;
        if !t.courses.contains_key(&certificate.course_id) {
            return Err(StoreError::NotFound(format!(
                "referenced row: course {}",
                certificate.course_id
            )));
        }
        if t
            .certificates
            .values()
            .any(|c| c.user_id == certificate.user_id && c.course_id == certificate.course_id)
        {
            return Err(StoreError::Conflict(format!(
                "certificate already issued for user {} course {}",
                certificate.user_id, certificate.course_id
            )));
        }
        let certificate_id = t.next("certificates");
        let row = Certificate {
            certificate_id,
            user_id: certificate.user_id,
            course_id: certificate.course_id,
            nft_certificate_uri: certificate.uri.clone(),
            token_id: certificate.token_id.clone(),
            tx_hash: certificate.tx_hash.clone(),
            issued_date: Utc::now(),
        };
        if let Some(entry) = entry {
            t.push_ledger_entry(entry)?;
        }
        t.certificates.insert(certificate_id, row.clone());
        Ok(row)
    }

    async fn list_transactions(&self, user_id: i32) -> StoreResult<Vec<LedgerTransaction>> {
        let t = self.tables.read().await;
        Ok(t
            .transactions
            .values()
            .rev()
            .filter(|tx| tx.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_semester(
        &self,
        semester: &NewSemester,
        fee_amount: &str,
    ) -> StoreResult<Semester> {
        check_amount("semesters.fee_amount", fee_amount)?;
        if semester.end_date < semester.start_date {
            return Err(StoreError::Constraint("semester ends before it starts".to_string()));
        }
        let mut t = self.tables.write().await;
        let semester_id = t.next("semesters");
        let row = Semester {
            semester_id,
            name: semester.name.clone(),
            start_date: semester.start_date,
            end_date: semester.end_date,
            fee_amount: fee_amount.to_string(),
        };
        t.semesters.insert(semester_id, row.clone());
        Ok(row)
    }

    async fn find_semester(&self, semester_id: i32) -> StoreResult<Option<Semester>> {
        Ok(self.tables.read().await.semesters.get(&semester_id).cloned())
    }

    async fn list_semesters(&self) -> StoreResult<Vec<Semester>> {
        let t = self.tables.read().await;
        let mut semesters: Vec<Semester> = t.semesters.values().cloned().collect();
        semesters.sort_by_key(|s| s.start_date);
        Ok(semesters)
    }

    async fn find_fee_payment(
        &self,
        user_id: i32,
        semester_id: i32,
    ) -> StoreResult<Option<FeePayment>> {
        let t = self.tables.read().await;
        Ok(t
            .fees_paid
            .values()
            .find(|p| p.user_id == user_id && p.semester_id == semester_id)
            .cloned())
    }

    async fn insert_fee_payment(
        &self,
        payment: &NewFeePayment,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<FeePayment> {
        check_amount("fees_paid.amount", &payment.amount)?;
        let mut t = self.tables.write().await;
        t.require_user(payment.user_id)?;
        if !t.semesters.contains_key(&payment.semester_id) {
            return Err(StoreError::NotFound(format!(
                "referenced row: semester {}",
                payment.semester_id
            )));
        }
        if t
            .fees_paid
            .values()
            .any(|p| p.user_id == payment.user_id && p.semester_id == payment.semester_id)
        {
            return Err(StoreError::Conflict(format!(
                "fees already paid by user {} for semester {}",
                payment.user_id, payment.semester_id
            )));
        }
        let payment_id = t.next("fees_paid");
        let row = FeePayment {
            payment_id,
            user_id: payment.user_id,
            semester_id: payment.semester_id,
            amount: payment.amount.clone(),
            token_uri: payment.token_uri.clone(),
            tx_hash: payment.tx_hash.clone(),
            paid_at: Utc::now(),
        };
        if let Some(entry) = entry {
            t.push_ledger_entry(entry)?;
        }
        t.fees_paid.insert(payment_id, row.clone());
        Ok(row)
    }

    async fn insert_room(&self, room: &NewRoom) -> StoreResult<Room> {
        if room.capacity <= 0 {
            return Err(StoreError::Constraint("rooms.capacity must be > 0".to_string()));
        }
        let mut t = self.tables.write().await;
        let room_id = t.next("rooms");
        let row = Room {
            room_id,
            name: room.name.clone(),
            location: room.location.clone(),
            capacity: room.capacity,
        };
        t.rooms.insert(room_id, row.clone());
        Ok(row)
    }

    async fn find_room(&self, room_id: i32) -> StoreResult<Option<Room>> {
        Ok(self.tables.read().await.rooms.get(&room_id).cloned())
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        Ok(self.tables.read().await.rooms.values().cloned().collect())
    }

    async fn insert_event(&self, event: &NewEvent) -> StoreResult<Event> {
        if event.capacity <= 0 {
            return Err(StoreError::Constraint("events.capacity must be > 0".to_string()));
        }
        if event.ends_at <= event.starts_at {
            return Err(StoreError::Constraint("event ends before it starts".to_string()));
        }
        let mut t = self.tables.write().await;
        if let Some(room_id) = event.room_id {
            if !t.rooms.contains_key(&room_id) {
                return Err(StoreError::NotFound(format!("referenced row: room {}", room_id)));
            }
        }
        let event_id = t.next("events");
        let row = Event {
            event_id,
            title: event.title.clone(),
            description: event.description.clone(),
            room_id: event.room_id,
            starts_at: event.starts_at,
            ends_at: event.ends_at,
            capacity: event.capacity,
        };
        t.events.insert(event_id, row.clone());
        Ok(row)
    }

    async fn find_event(&self, event_id: i32) -> StoreResult<Option<Event>> {
        Ok(self.tables.read().await.events.get(&event_id).cloned())
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        let t = self.tables.read().await;
        let mut events: Vec<Event> = t.events.values().cloned().collect();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn count_overlapping_bookings(
        &self,
        room_id: i32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t
            .bookings
            .values()
            .filter(|b| b.room_id == Some(room_id) && b.starts_at < ends_at && b.ends_at > starts_at)
            .count() as i64)
    }

    async fn count_event_bookings(&self, event_id: i32) -> StoreResult<i64> {
        let t = self.tables.read().await;
        Ok(t.bookings.values().filter(|b| b.event_id == Some(event_id)).count() as i64)
    }

    async fn find_event_booking(
        &self,
        user_id: i32,
        event_id: i32,
    ) -> StoreResult<Option<Booking>> {
        let t = self.tables.read().await;
        Ok(t
            .bookings
            .values()
            .find(|b| b.user_id == user_id && b.event_id == Some(event_id))
            .cloned())
    }

    async fn find_booking(&self, booking_id: i32) -> StoreResult<Option<Booking>> {
        Ok(self.tables.read().await.bookings.get(&booking_id).cloned())
    }

    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking> {
        if booking.room_id.is_some() == booking.event_id.is_some() {
            return Err(StoreError::Constraint(
                "booking must reference exactly one of room or event".to_string(),
            ));
        }
        if booking.ends_at <= booking.starts_at {
            return Err(StoreError::Constraint("booking ends before it starts".to_string()));
        }
        let mut t = self.tables.write().await;
        t.require_user(booking.user_id)?;
        if let Some(room_id) = booking.room_id {
            if !t.rooms.contains_key(&room_id) {
                return Err(StoreError::NotFound(format!("referenced row: room {}", room_id)));
            }
        }
        if let Some(event_id) = booking.event_id {
            if !t.events.contains_key(&event_id) {
                return Err(StoreError::NotFound(format!("referenced row: event {}", event_id)));
            }
            if t
                .bookings
                .values()
                .any(|b| b.user_id == booking.user_id && b.event_id == Some(event_id))
            {
                return Err(StoreError::Conflict(format!(
                    "user {} already joined event {}",
                    booking.user_id, event_id
                )));
            }
        }
        let booking_id = t.next("bookings");
        let row = Booking {
            booking_id,
            user_id: booking.user_id,
            room_id: booking.room_id,
            event_id: booking.event_id,
            starts_at: booking.starts_at,
            ends_at: booking.ends_at,
            token_uri: None,
            tx_hash: None,
            created_at: Utc::now(),
        };
        t.bookings.insert(booking_id, row.clone());
        Ok(row)
    }

    async fn set_booking_receipt(
        &self,
        booking_id: i32,
        token_uri: &str,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Booking> {
        let mut t = self.tables.write().await;
        let booking = t
            .bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))?;
        booking.token_uri = Some(token_uri.to_string());
        booking.tx_hash = entry.map(|e| e.tx_hash.clone());
        let booking = booking.clone();
        if let Some(entry) = entry {
            t.push_ledger_entry(entry)?;
        }
        Ok(booking)
    }

    async fn delete_booking(&self, booking_id: i32) -> StoreResult<()> {
        self.tables.write().await.bookings.remove(&booking_id);
        Ok(())
    }

    async fn list_room_bookings(&self, room_id: i32) -> StoreResult<Vec<Booking>> {
        let t = self.tables.read().await;
        let mut bookings: Vec<Booking> = t
            .bookings
            .values()
            .filter(|b| b.room_id == Some(room_id))
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.starts_at);
        Ok(bookings)
    }
}
