//! Test doubles for portal unit tests.

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::Portal;
use crate::blockchain::types::{BlockchainError, BlockchainResult, ChainReceipt};
use crate::blockchain::{LedgerInfo, NftLedger};
use crate::config::PortalConfig;
use crate::db::{MemoryStore, PortalStore, StoreError, StoreResult};
use crate::domain::*;

pub const WALLET_A: &str = "0x00000000000000000000000000000000000000aa";
pub const WALLET_B: &str = "0x00000000000000000000000000000000000000bb";

/// Ledger that records each call and fails the ones it was told to.
pub struct ScriptedLedger {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    next_token: AtomicU64,
}

impl ScriptedLedger {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            failing: Mutex::new(HashSet::new()),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, method: &'static str, detail: String) -> BlockchainResult<ChainReceipt> {
        self.calls.lock().unwrap().push(format!("{} {}", method, detail));
        if self.failing.lock().unwrap().contains(method) {
            return Err(BlockchainError::Reverted(format!("{} rejected", method)));
        }
        let n = self.next_token.fetch_add(1, Ordering::SeqCst);
        Ok(ChainReceipt {
            tx_hash: format!("0x{:064x}", n),
            block_number: Some(n),
            token_id: Some(n.to_string()),
        })
    }
}

#[async_trait]
impl NftLedger for ScriptedLedger {
    async fn mint_identity(&self, email: &str, token_uri: &str) -> BlockchainResult<ChainReceipt> {
        self.record("mint_identity", format!("{} {}", email, token_uri))
    }

    async fn register_course(
        &self,
        student: Address,
        course_id: u64,
    ) -> BlockchainResult<ChainReceipt> {
        self.record("register_course", format!("{} {}", student, course_id))
    }

    async fn issue_certificate(
        &self,
        student: Address,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        self.record("issue_certificate", format!("{} {}", student, token_uri))
    }

    async fn pay_fees(&self, token_uri: &str, value: U256) -> BlockchainResult<ChainReceipt> {
        self.record("pay_fees", format!("{} {}", token_uri, value))
    }

    async fn book_room(
        &self,
        user: Address,
        room_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        self.record("book_room", format!("{} {} {}", user, room_id, token_uri))
    }

    async fn join_event(
        &self,
        user: Address,
        event_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        self.record("join_event", format!("{} {} {}", user, event_id, token_uri))
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn info(&self) -> LedgerInfo {
        LedgerInfo {
            sender: WALLET_A.to_string(),
            chain_id: 1337,
            contracts: Vec::new(),
        }
    }
}

pub fn portal_without_chain() -> (Portal, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let portal = Portal::new(store.clone(), None, Arc::new(PortalConfig::default()));
    (portal, store)
}

pub fn portal_with_ledger(ledger: Arc<ScriptedLedger>) -> (Portal, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let portal = Portal::new(store.clone(), Some(ledger), Arc::new(PortalConfig::default()));
    (portal, store)
}

static SEEDED: AtomicU64 = AtomicU64::new(1);

pub async fn seed_user(store: &MemoryStore, wallet: Option<&str>) -> User {
    let n = SEEDED.fetch_add(1, Ordering::SeqCst);
    let user = NewUser {
        roll_number: format!("R-{}", n),
        name: "Ada Lovelace".to_string(),
        email: format!("ada{}@example.edu", n),
        dob: NaiveDate::from_ymd_opt(2001, 12, 10),
        wallet_address: wallet.map(str::to_string),
    };
    store.insert_user(&user).await.unwrap()
}

/// A user holding an identity token, as if the mint had succeeded.
pub async fn seed_identified_user(store: &MemoryStore, wallet: Option<&str>) -> User {
    let user = seed_user(store, wallet).await;
    let entry = LedgerEntry {
        user_id: user.user_id,
        kind: TxKind::IdentityMint,
        amount: None,
        tx_hash: "0xseed".to_string(),
    };
    store
        .set_user_identity(user.user_id, Some("100"), &entry)
        .await
        .unwrap()
}

/// [`MemoryStore`] whose named write methods fail with a database error.
pub struct FlakyStore {
    inner: MemoryStore,
    failing: Mutex<HashSet<&'static str>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: Mutex::new(HashSet::new()),
        }
    }

    /// Seed through the inner store, which never fails.
    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    fn check(&self, method: &'static str) -> StoreResult<()> {
        if self.failing.lock().unwrap().contains(method) {
            return Err(StoreError::Database(format!("{} lost the connection", method)));
        }
        Ok(())
    }
}

pub fn portal_with_flaky_store(ledger: Arc<ScriptedLedger>) -> (Portal, Arc<FlakyStore>) {
    let store = Arc::new(FlakyStore::new());
    let portal = Portal::new(store.clone(), Some(ledger), Arc::new(PortalConfig::default()));
    (portal, store)
}

#[async_trait]
impl PortalStore for FlakyStore {
    async fn ping(&self) -> StoreResult<()> {
        self.inner.ping().await
    }

    async fn insert_user(&self, user: &NewUser) -> StoreResult<User> {
        self.inner.insert_user(user).await
    }

    async fn find_user(&self, user_id: i32) -> StoreResult<Option<User>> {
        self.inner.find_user(user_id).await
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.inner.find_user_by_email(email).await
    }

    async fn set_user_identity(
        &self,
        user_id: i32,
        token_id: Option<&str>,
        entry: &LedgerEntry,
    ) -> StoreResult<User> {
        self.check("set_user_identity")?;
        self.inner.set_user_identity(user_id, token_id, entry).await
    }

    async fn delete_user(&self, user_id: i32) -> StoreResult<()> {
        self.inner.delete_user(user_id).await
    }

    async fn insert_faculty(&self, faculty: &NewFaculty) -> StoreResult<Faculty> {
        self.inner.insert_faculty(faculty).await
    }

    async fn find_faculty(&self, faculty_id: i32) -> StoreResult<Option<Faculty>> {
        self.inner.find_faculty(faculty_id).await
    }

    async fn find_faculty_by_email(&self, email: &str) -> StoreResult<Option<Faculty>> {
        self.inner.find_faculty_by_email(email).await
    }

    async fn set_faculty_identity(
        &self,
        faculty_id: i32,
        token_id: Option<&str>,
        tx_hash: &str,
    ) -> StoreResult<Faculty> {
        self.inner.set_faculty_identity(faculty_id, token_id, tx_hash).await
    }

    async fn delete_faculty(&self, faculty_id: i32) -> StoreResult<()> {
        self.inner.delete_faculty(faculty_id).await
    }

    async fn insert_course(&self, course: &NewCourse) -> StoreResult<Course> {
        self.inner.insert_course(course).await
    }

    async fn find_course(&self, course_id: i32) -> StoreResult<Option<Course>> {
        self.inner.find_course(course_id).await
    }

    async fn list_courses(&self) -> StoreResult<Vec<Course>> {
        self.inner.list_courses().await
    }

    async fn find_registration(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Registration>> {
        self.inner.find_registration(user_id, course_id).await
    }

    async fn insert_registration(
        &self,
        user_id: i32,
        course_id: i32,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Registration> {
        self.check("insert_registration")?;
        self.inner.insert_registration(user_id, course_id, entry).await
    }

    async fn list_registered_courses(&self, user_id: i32) -> StoreResult<Vec<RegisteredCourse>> {
        self.inner.list_registered_courses(user_id).await
    }

    async fn set_grade(&self, registration_id: i32, grade: i16) -> StoreResult<Registration> {
        self.inner.set_grade(registration_id, grade).await
    }

    async fn find_certificate(
        &self,
        user_id: i32,
        course_id: i32,
    ) -> StoreResult<Option<Certificate>> {
        self.inner.find_certificate(user_id, course_id).await
    }

    async fn list_certificates(&self, user_id: i32) -> StoreResult<Vec<Certificate>> {
        self.inner.list_certificates(user_id).await
    }

    async fn insert_certificate(
        &self,
        certificate: &NewCertificate,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Certificate> {
        self.check("insert_certificate")?;
        self.inner.insert_certificate(certificate, entry).await
    }

    async fn list_transactions(&self, user_id: i32) -> StoreResult<Vec<LedgerTransaction>> {
        self.inner.list_transactions(user_id).await
    }

    async fn insert_semester(
        &self,
        semester: &NewSemester,
        fee_amount: &str,
    ) -> StoreResult<Semester> {
        self.inner.insert_semester(semester, fee_amount).await
    }

    async fn find_semester(&self, semester_id: i32) -> StoreResult<Option<Semester>> {
        self.inner.find_semester(semester_id).await
    }

    async fn list_semesters(&self) -> StoreResult<Vec<Semester>> {
        self.inner.list_semesters().await
    }

    async fn find_fee_payment(
        &self,
        user_id: i32,
        semester_id: i32,
    ) -> StoreResult<Option<FeePayment>> {
        self.inner.find_fee_payment(user_id, semester_id).await
    }

    async fn insert_fee_payment(
        &self,
        payment: &NewFeePayment,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<FeePayment> {
        self.check("insert_fee_payment")?;
        self.inner.insert_fee_payment(payment, entry).await
    }

    async fn insert_room(&self, room: &NewRoom) -> StoreResult<Room> {
        self.inner.insert_room(room).await
    }

    async fn find_room(&self, room_id: i32) -> StoreResult<Option<Room>> {
        self.inner.find_room(room_id).await
    }

    async fn list_rooms(&self) -> StoreResult<Vec<Room>> {
        self.inner.list_rooms().await
    }

    async fn insert_event(&self, event: &NewEvent) -> StoreResult<Event> {
        self.inner.insert_event(event).await
    }

    async fn find_event(&self, event_id: i32) -> StoreResult<Option<Event>> {
        self.inner.find_event(event_id).await
    }

    async fn list_events(&self) -> StoreResult<Vec<Event>> {
        self.inner.list_events().await
    }

    async fn count_overlapping_bookings(
        &self,
        room_id: i32,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
    ) -> StoreResult<i64> {
        self.inner
            .count_overlapping_bookings(room_id, starts_at, ends_at)
            .await
    }

    async fn count_event_bookings(&self, event_id: i32) -> StoreResult<i64> {
        self.inner.count_event_bookings(event_id).await
    }

    async fn find_event_booking(
        &self,
        user_id: i32,
        event_id: i32,
    ) -> StoreResult<Option<Booking>> {
        self.inner.find_event_booking(user_id, event_id).await
    }

    async fn find_booking(&self, booking_id: i32) -> StoreResult<Option<Booking>> {
        self.inner.find_booking(booking_id).await
    }

    async fn insert_booking(&self, booking: &NewBooking) -> StoreResult<Booking> {
        self.inner.insert_booking(booking).await
    }

    async fn set_booking_receipt(
        &self,
        booking_id: i32,
        token_uri: &str,
        entry: Option<&LedgerEntry>,
    ) -> StoreResult<Booking> {
        self.check("set_booking_receipt")?;
        self.inner.set_booking_receipt(booking_id, token_uri, entry).await
    }

    async fn delete_booking(&self, booking_id: i32) -> StoreResult<()> {
        self.inner.delete_booking(booking_id).await
    }

    async fn list_room_bookings(&self, room_id: i32) -> StoreResult<Vec<Booking>> {
        self.inner.list_room_bookings(room_id).await
    }
}

/// Run `operation` on a fresh runtime with a Prometheus recorder scoped to
/// this thread, returning its output and the rendered metrics.
pub fn with_recorded_metrics<T>(operation: impl std::future::Future<Output = T>) -> (T, String) {
    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    let output = metrics::with_local_recorder(&recorder, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(operation)
    });
    (output, handle.render())
}
