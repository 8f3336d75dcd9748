use log::{debug, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{Admission, Block, Ledger};
use crate::error::{LedgerError, Result};
use crate::wallet::Wallet;

/// Per-miner tally returned by [`Miner::run`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MinerStats {
    pub sealed: usize,
    pub accepted: usize,
    pub discarded: usize,
}

/// Repeatedly builds the next block from the ledger tip and submits it.
///
/// Miners do not coordinate: several may seal the same sequence id and
/// only the first submission counts.
pub struct Miner {
    wallet: Arc<Wallet>,
    ledger: Arc<Ledger>,
    target_length: usize,
}

impl Miner {
    pub fn new(wallet: Arc<Wallet>, ledger: Arc<Ledger>, target_length: usize) -> Self {
        Self {
            wallet,
            ledger,
            target_length,
        }
    }

    pub fn name(&self) -> &str {
        self.wallet.name()
    }

    /// Seal one candidate on top of the current tip and submit it.
    pub fn mine_once(&self, stop: &AtomicBool) -> Result<Admission> {
        let t = self.ledger.mining_template();
        debug!(
            "MINER {} - sealing #{} at difficulty {} with {} messages",
            self.name(),
            t.tip_id + 1,
            t.difficulty,
            t.pending.len()
        );
        let block = Block::seal_until(
            t.tip_id + 1,
            t.last_digest,
            self.name(),
            t.difficulty,
            t.pending,
            stop,
        )?;
        Ok(self.ledger.submit_block(block))
    }

    /// Mine until the chain reaches the target length or `stop` is raised.
    pub fn run(&self, stop: &AtomicBool) -> MinerStats {
        let mut stats = MinerStats::default();
        while self.ledger.len() < self.target_length && !stop.load(Ordering::Relaxed) {
            match self.mine_once(stop) {
                Ok(Admission::Accepted { sequence_id, .. }) => {
                    stats.sealed += 1;
                    stats.accepted += 1;
                    info!("MINER {} - block #{} accepted", self.name(), sequence_id);
                }
                Ok(Admission::Duplicate) => {
                    stats.sealed += 1;
                    stats.discarded += 1;
                }
                Err(LedgerError::Cancelled) => break,
                Err(e) => {
                    // A bad message stays in the pool; every retry would fail alike.
                    warn!("MINER {} - stopping: {}", self.name(), e);
                    break;
                }
            }
        }
        stats
    }
}
