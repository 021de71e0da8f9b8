use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ledger::{Amount, EDU_SCALE};
use crate::transaction::{TransactionRecord, TxStatus};
use crate::wallet::mock_address;

/// Probability that a lookup reports not-found even for a valid hash.
pub const DEFAULT_MISS_RATE: f64 = 0.10;

const SUBMIT_DELAY_MS: u64 = 1_500;
const LOOKUP_DELAY_MS: u64 = 800;

/// Receipt returned by the simulated settlement network.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SettlementReceipt {
    pub block_number: u64,
    pub confirmations: u32,
    pub transaction_hash: String,
}

/// Transaction shape returned by a resolver lookup.
///
/// The simulator synthesizes a plausible record instead of indexing
/// history, so these fields do not correspond to any stored record.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTransaction {
    pub hash: String,
    pub block_number: u64,
    pub timestamp_ms: u64,
    pub from: String,
    pub to: String,
    pub value: Amount,
    pub gas: u64,
    pub gas_price: u64,
    pub status: TxStatus,
}

/// Simulated settlement network.
///
/// Submissions always succeed after a fixed artificial delay; lookups miss
/// with a configurable probability to exercise the caller's failure path.
/// There are no retries and no timeout distinct from the delay itself.
pub struct NetworkSimulator {
    rng: StdRng,
    miss_rate: f64,
    submit_delay: Duration,
    lookup_delay: Duration,
}

impl NetworkSimulator {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic simulator for reproducible runs.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            miss_rate: DEFAULT_MISS_RATE,
            submit_delay: Duration::from_millis(SUBMIT_DELAY_MS),
            lookup_delay: Duration::from_millis(LOOKUP_DELAY_MS),
        }
    }

    /// Override the not-found probability (clamped to `0.0..=1.0`).
    pub fn with_miss_rate(mut self, miss_rate: f64) -> Self {
        self.miss_rate = miss_rate.clamp(0.0, 1.0);
        self
    }

    /// Drop both artificial delays.
    pub fn without_delays(mut self) -> Self {
        self.submit_delay = Duration::ZERO;
        self.lookup_delay = Duration::ZERO;
        self
    }

    /// Simulate settlement of a record.
    ///
    /// Always succeeds in this mock: the block number is a random positive
    /// integer and the confirmation count is fixed at 1.
    pub fn submit(&mut self, record: &TransactionRecord) -> SettlementReceipt {
        pause(self.submit_delay);
        SettlementReceipt {
            block_number: self.rng.gen_range(1..=1_000_000),
            confirmations: 1,
            transaction_hash: record.hash.clone(),
        }
    }

    /// Simulate a network lookup for `hash`.
    ///
    /// `None` is a normal, expected outcome: with the configured miss
    /// probability the lookup reports not-found even for a valid hash.
    pub fn resolve(&mut self, hash: &str, now_ms: u64) -> Option<ResolvedTransaction> {
        pause(self.lookup_delay);
        if self.rng.gen::<f64>() < self.miss_rate {
            return None;
        }
        Some(ResolvedTransaction {
            hash: hash.to_string(),
            block_number: self.rng.gen_range(1..=1_000_000),
            timestamp_ms: now_ms.saturating_sub(self.rng.gen_range(0..10_000_000)),
            from: mock_address(&mut self.rng),
            to: mock_address(&mut self.rng),
            value: self.rng.gen_range(1..=10 * EDU_SCALE),
            gas: self.rng.gen_range(21_000..100_000),
            gas_price: self.rng.gen_range(1..=100),
            status: TxStatus::Confirmed,
        })
    }
}

impl Default for NetworkSimulator {
    fn default() -> Self {
        Self::new()
    }
}

fn pause(delay: Duration) {
    if !delay.is_zero() {
        thread::sleep(delay);
    }
}
