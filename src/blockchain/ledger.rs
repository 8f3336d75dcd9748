use log::{debug, info};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use super::Block;
use crate::accounts::RewardSink;
use crate::config::Config;
use crate::message::SignedMessage;

/// Outcome of [`Ledger::submit_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Accepted { sequence_id: u64, difficulty: u32 },
    /// Another block already holds this sequence id; nothing changed.
    Duplicate,
}

/// Everything a miner needs to build the next block, read under one lock.
#[derive(Debug, Clone)]
pub struct MiningTemplate {
    pub tip_id: u64,
    pub last_digest: String,
    pub difficulty: u32,
    pub pending: Vec<Arc<SignedMessage>>,
}

#[derive(Debug)]
struct LedgerState {
    chain: Vec<Block>,
    seen_ids: HashSet<u64>,
    pending: Vec<Arc<SignedMessage>>,
    difficulty: u32,
}

/// Shared in-memory chain with its pending message pool.
///
/// All mutable state sits behind one mutex so that appending a block,
/// retargeting the difficulty and draining the pool happen as one step.
/// Proof-of-work never runs under this lock.
pub struct Ledger {
    state: Mutex<LedgerState>,
    rewards: Arc<dyn RewardSink>,
    block_reward: u64,
    initial_difficulty: u32,
    fast_block_secs: u64,
    slow_block_secs: u64,
}

impl Ledger {
    /// Start an empty chain. Rewards for accepted blocks go to `rewards`.
    pub fn new(config: &Config, rewards: Arc<dyn RewardSink>) -> Self {
        Self {
            state: Mutex::new(LedgerState {
                chain: Vec::new(),
                seen_ids: HashSet::new(),
                pending: Vec::new(),
                difficulty: config.initial_difficulty,
            }),
            rewards,
            block_reward: config.block_reward,
            initial_difficulty: config.initial_difficulty,
            fast_block_secs: config.fast_block_secs,
            slow_block_secs: config.slow_block_secs,
        }
    }

    /// Append `candidate` unless its sequence id is already taken.
    ///
    /// On acceptance the difficulty is retargeted from the block's
    /// generation time, the miner is rewarded and every included message
    /// leaves the pending pool.
    pub fn submit_block(&self, mut candidate: Block) -> Admission {
        let mut st = self.state.lock().expect("mutex poisoned");

        if st.seen_ids.contains(&candidate.sequence_id) {
            debug!(
                "LEDGER - block #{} by {} discarded: id already taken",
                candidate.sequence_id, candidate.miner
            );
            return Admission::Duplicate;
        }

        candidate.difficulty_delta = self.adjust_difficulty(&mut st, candidate.generation_secs);
        let sequence_id = candidate.sequence_id;
        let included: HashSet<u64> = candidate.payload.iter().map(|m| m.id).collect();
        let miner = candidate.miner.clone();

        st.seen_ids.insert(sequence_id);
        st.chain.push(candidate);

        self.rewards.credit(&miner, self.block_reward);

        let before = st.pending.len();
        st.pending.retain(|m| !included.contains(&m.id));
        debug!(
            "LEDGER - pending pool drained: {} -> {} (removed {})",
            before,
            st.pending.len(),
            before - st.pending.len()
        );

        info!(
            "LEDGER - accepted block #{} from {} (difficulty now {}, height {})",
            sequence_id,
            miner,
            st.difficulty,
            st.chain.len()
        );
        Admission::Accepted {
            sequence_id,
            difficulty: st.difficulty,
        }
    }

    /// Retarget from one block's generation time and return the delta
    /// annotation for that block.
    fn adjust_difficulty(&self, st: &mut LedgerState, generation_secs: u64) -> i64 {
        let before = st.difficulty;
        let (difficulty, delta) = retarget(
            before,
            generation_secs,
            self.fast_block_secs,
            self.slow_block_secs,
        );
        st.difficulty = difficulty;
        if difficulty > before {
            info!("LEDGER - difficulty raised to {}", difficulty);
        } else if difficulty < before {
            info!("LEDGER - difficulty lowered to {}", difficulty);
        }
        delta
    }

    /// Queue a message if its id is greater than the last queued one.
    /// Returns whether it was queued.
    pub fn submit_message(&self, message: Arc<SignedMessage>) -> bool {
        let mut st = self.state.lock().expect("mutex poisoned");
        if let Some(last) = st.pending.last() {
            if message.id <= last.id {
                debug!(
                    "LEDGER - message #{} dropped: not after #{}",
                    message.id, last.id
                );
                return false;
            }
        }
        debug!("LEDGER - message #{} queued from {}", message.id, message.signer);
        st.pending.push(message);
        true
    }

    /// Sequence id of the last block, 0 for an empty chain.
    pub fn current_tip_id(&self) -> u64 {
        let st = self.state.lock().expect("mutex poisoned");
        tip_id(&st)
    }

    /// Digest of the last block, `"0"` for an empty chain.
    pub fn last_digest(&self) -> String {
        let st = self.state.lock().expect("mutex poisoned");
        last_digest(&st)
    }

    pub fn current_difficulty(&self) -> u32 {
        self.state.lock().expect("mutex poisoned").difficulty
    }

    /// Copy of the pending pool.
    pub fn snapshot_of_pending(&self) -> Vec<Arc<SignedMessage>> {
        self.state.lock().expect("mutex poisoned").pending.clone()
    }

    pub fn mining_template(&self) -> MiningTemplate {
        let st = self.state.lock().expect("mutex poisoned");
        MiningTemplate {
            tip_id: tip_id(&st),
            last_digest: last_digest(&st),
            difficulty: st.difficulty,
            pending: st.pending.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("mutex poisoned").chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn seen_ids_len(&self) -> usize {
        self.state.lock().expect("mutex poisoned").seen_ids.len()
    }

    /// Copy of the accepted chain.
    pub fn blocks(&self) -> Vec<Block> {
        self.state.lock().expect("mutex poisoned").chain.clone()
    }

    pub fn block_reward(&self) -> u64 {
        self.block_reward
    }

    /// Replay the chain: linkage, unique ids, digests, signatures, the
    /// difficulty each block had to meet when it was accepted and its
    /// delta annotation.
    pub fn is_valid_chain(&self) -> bool {
        let st = self.state.lock().expect("mutex poisoned");
        let mut difficulty = self.initial_difficulty;
        let mut previous = String::from("0");
        let mut ids = HashSet::new();
        let mut included = HashSet::new();

        for block in &st.chain {
            if block.previous_digest != previous || !ids.insert(block.sequence_id) {
                return false;
            }
            if !matches!(block.is_valid(difficulty), Ok(true)) {
                return false;
            }
            if block.payload.iter().any(|m| !included.insert(m.id)) {
                return false;
            }
            let (next, delta) = retarget(
                difficulty,
                block.generation_secs,
                self.fast_block_secs,
                self.slow_block_secs,
            );
            if block.difficulty_delta != delta {
                return false;
            }
            difficulty = next;
            previous = block.digest.clone();
        }

        ids == st.seen_ids && difficulty == st.difficulty
    }
}

/// New difficulty and delta annotation after a block sealed in
/// `generation_secs`. Fast blocks add one, slow blocks remove one, and the
/// difficulty never drops below zero. The annotation is the new value,
/// negated when it went down.
fn retarget(difficulty: u32, generation_secs: u64, fast_secs: u64, slow_secs: u64) -> (u32, i64) {
    if generation_secs <= fast_secs {
        let next = difficulty.saturating_add(1);
        (next, i64::from(next))
    } else if generation_secs >= slow_secs && difficulty > 0 {
        let next = difficulty - 1;
        (next, -i64::from(next))
    } else {
        (difficulty, 0)
    }
}

fn tip_id(st: &LedgerState) -> u64 {
    st.chain.last().map(|b| b.sequence_id).unwrap_or(0)
}

fn last_digest(st: &LedgerState) -> String {
    st.chain
        .last()
        .map(|b| b.digest.clone())
        .unwrap_or_else(|| String::from("0"))
}
