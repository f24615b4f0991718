//! Shared test fixtures: manual clock, scripted ids, fully wired service.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use aigraph::mem::{MemIdentity, MemImmutableLog, MemVault, MemVertexStore};
use aigraph::{Clock, IdSource, RandomIdSource, ServiceConfig, VertexId, VertexService};

/// Epochs used across the scenario tests.
pub const FIRST: u64 = 1_724_327_716_271;
pub const SECOND: u64 = 1_724_327_816_272;
pub const THIRD: u64 = 1_724_327_916_273;

pub const TEST_USER: &str = "did:test:user";
pub const TEST_NODE: &str = "did:test:node";

/// Clock the tests move by hand.
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(now: u64) -> Self {
        Self {
            now: AtomicU64::new(now),
        }
    }

    pub fn set(&self, now: u64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Id source that hands out queued ids first, then random ones.
pub struct ScriptedIds {
    queue: Mutex<VecDeque<VertexId>>,
}

impl ScriptedIds {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue an id whose 32 bytes are all `fill`.
    pub fn push(&self, fill: u8) {
        self.queue
            .lock()
            .unwrap()
            .push_back(VertexId::from_bytes([fill; 32]));
    }
}

impl IdSource for ScriptedIds {
    fn next_vertex_id(&self) -> VertexId {
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| RandomIdSource.next_vertex_id())
    }
}

pub struct Harness {
    pub service: VertexService,
    pub vault: Arc<MemVault>,
    pub identity: Arc<MemIdentity>,
    pub immutable: Arc<MemImmutableLog>,
    pub store: Arc<MemVertexStore>,
    pub clock: Arc<ManualClock>,
    pub ids: Arc<ScriptedIds>,
}

pub fn harness() -> Harness {
    harness_with(ServiceConfig::default())
}

pub fn harness_with(config: ServiceConfig) -> Harness {
    init_tracing();
    let vault = Arc::new(MemVault::new());
    let identity = Arc::new(MemIdentity::new());
    let immutable = Arc::new(MemImmutableLog::new());
    let store = Arc::new(MemVertexStore::new());
    let clock = Arc::new(ManualClock::new(FIRST));
    let ids = Arc::new(ScriptedIds::new());
    let service = VertexService::new(
        store.clone(),
        vault.clone(),
        identity.clone(),
        immutable.clone(),
        config,
    )
    .with_clock(clock.clone())
    .with_id_source(ids.clone());
    Harness {
        service,
        vault,
        identity,
        immutable,
        store,
        clock,
        ids,
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
