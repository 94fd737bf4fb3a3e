//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::{Address, U256};
use async_trait::async_trait;
use campus_ledger::blockchain::types::{BlockchainError, BlockchainResult, ChainReceipt};
use campus_ledger::blockchain::{LedgerInfo, NftLedger};
use campus_ledger::config::{PortalConfig, StoreBackend};
use campus_ledger::db::MemoryStore;
use campus_ledger::{HttpServer, Portal, Shutdown};
use portal_sdk::PortalClient;
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const ADMIN_KEY: &str = "integration-admin-key";
pub const WALLET: &str = "0x00000000000000000000000000000000000000c1";

/// Ledger double: mints sequential token ids and fails the methods it is told to.
#[derive(Default)]
pub struct MockLedger {
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
    minted: AtomicU64,
    delay: Option<Duration>,
    stalled: Mutex<HashMap<&'static str, Duration>>,
    offline: AtomicBool,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call sleeps first, widening race windows.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn fail(&self, method: &'static str) {
        self.failing.lock().unwrap().insert(method);
    }

    pub fn recover(&self, method: &'static str) {
        self.failing.lock().unwrap().remove(method);
    }

    /// Only `method` sleeps, for `delay`, before it is broadcast.
    pub fn stall(&self, method: &'static str, delay: Duration) {
        self.stalled.lock().unwrap().insert(method, delay);
    }

    /// Every node unreachable: calls fail before anything is broadcast.
    pub fn go_offline(&self) {
        self.offline.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    async fn call(&self, method: &'static str, detail: String) -> BlockchainResult<ChainReceipt> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BlockchainError::NotAvailable(
                "All RPC providers failed: gas_price".to_string(),
            ));
        }
        let stall = self.stalled.lock().unwrap().get(method).copied();
        if let Some(delay) = stall.or(self.delay) {
            tokio::time::sleep(delay).await;
        }
        self.calls.lock().unwrap().push(format!("{} {}", method, detail));
        if self.failing.lock().unwrap().contains(method) {
            return Err(BlockchainError::Reverted(format!("{} reverted", method)));
        }
        let id = self.minted.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ChainReceipt {
            tx_hash: format!("0x{:064x}", id),
            block_number: Some(id),
            token_id: Some(id.to_string()),
        })
    }
}

#[async_trait]
impl NftLedger for MockLedger {
    async fn mint_identity(&self, email: &str, token_uri: &str) -> BlockchainResult<ChainReceipt> {
        self.call("mint_identity", format!("{} {}", email, token_uri)).await
    }

    async fn register_course(
        &self,
        student: Address,
        course_id: u64,
    ) -> BlockchainResult<ChainReceipt> {
        self.call("register_course", format!("{} {}", student, course_id)).await
    }

    async fn issue_certificate(
        &self,
        student: Address,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        self.call("issue_certificate", format!("{} {}", student, token_uri)).await
    }

    async fn pay_fees(&self, token_uri: &str, value: U256) -> BlockchainResult<ChainReceipt> {
        self.call("pay_fees", format!("{} {}", token_uri, value)).await
    }

    async fn book_room(
        &self,
        user: Address,
        room_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        self.call("book_room", format!("{} {} {}", user, room_id, token_uri)).await
    }

    async fn join_event(
        &self,
        user: Address,
        event_id: u64,
        token_uri: &str,
    ) -> BlockchainResult<ChainReceipt> {
        self.call("join_event", format!("{} {} {}", user, event_id, token_uri)).await
    }

    async fn is_healthy(&self) -> bool {
        true
    }

    fn info(&self) -> LedgerInfo {
        LedgerInfo {
            sender: WALLET.to_string(),
            chain_id: 1337,
            contracts: vec![("identity".to_string(), WALLET.to_string())],
        }
    }
}

pub struct TestPortal {
    pub client: PortalClient,
    pub admin: PortalClient,
    pub base_url: String,
    pub shutdown: Shutdown,
}

impl Drop for TestPortal {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start the real server on an ephemeral port over an in-memory store.
pub async fn start_portal(ledger: Option<Arc<MockLedger>>) -> TestPortal {
    start_portal_with(ledger, |_| {}).await
}

/// As [`start_portal`], with config adjusted before the server starts.
pub async fn start_portal_with(
    ledger: Option<Arc<MockLedger>>,
    configure: impl FnOnce(&mut PortalConfig),
) -> TestPortal {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let base_url = format!("http://{}", addr);

    let mut config = PortalConfig::default();
    config.database.backend = StoreBackend::Memory;
    config.listener.public_url = base_url.clone();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.to_string();
    configure(&mut config);

    let ledger = ledger.map(|l| l as Arc<dyn NftLedger>);
    let portal = Portal::new(Arc::new(MemoryStore::new()), ledger, Arc::new(config));

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = HttpServer::new(portal).run(listener, server_shutdown).await;
    });

    TestPortal {
        client: PortalClient::new(&base_url),
        admin: PortalClient::new(&base_url).with_admin_key(ADMIN_KEY),
        base_url,
        shutdown,
    }
}

pub fn id(value: &Value, key: &str) -> i64 {
    value[key]
        .as_i64()
        .unwrap_or_else(|| panic!("missing {} in {}", key, value))
}

pub async fn register_student(portal: &TestPortal, email: &str) -> Value {
    portal
        .client
        .register_user(&portal_sdk::NewUser {
            roll_number: format!("R-{}", email.len()),
            name: "Test Student".to_string(),
            email: email.to_string(),
            dob: Some("2002-03-04".to_string()),
            wallet_address: Some(WALLET.to_string()),
        })
        .await
        .unwrap()
}

pub async fn create_course(portal: &TestPortal, end_date: &str) -> Value {
    portal
        .admin
        .admin_create(
            "courses",
            &json!({ "course_name": "Operating Systems", "end_date": end_date }),
        )
        .await
        .unwrap()
}

pub async fn create_current_semester(portal: &TestPortal, fee: &str) -> Value {
    let today = chrono::Utc::now().date_naive();
    portal
        .admin
        .admin_create(
            "semesters",
            &json!({
                "name": "Current",
                "start_date": (today - chrono::Duration::days(10)).to_string(),
                "end_date": (today + chrono::Duration::days(80)).to_string(),
                "fee_amount": fee,
            }),
        )
        .await
        .unwrap()
}

pub fn days_from_today(days: i64) -> String {
    (chrono::Utc::now().date_naive() + chrono::Duration::days(days)).to_string()
}
