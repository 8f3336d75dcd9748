use std::collections::HashMap;
use std::sync::Mutex;

/// Receives miner rewards when the ledger accepts a block.
pub trait RewardSink: Send + Sync {
    fn credit(&self, identity: &str, amount: u64);
}

/// Balance book keyed by identity name.
#[derive(Debug, Default)]
pub struct Accounts {
    balances: Mutex<HashMap<String, u64>>,
}

impl Accounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an account with `starting_balance`. Reopening keeps the
    /// existing balance.
    pub fn open(&self, identity: &str, starting_balance: u64) {
        let mut balances = self.balances.lock().expect("mutex poisoned");
        balances
            .entry(identity.to_string())
            .or_insert(starting_balance);
    }

    pub fn balance(&self, identity: &str) -> u64 {
        let balances = self.balances.lock().expect("mutex poisoned");
        balances.get(identity).copied().unwrap_or(0)
    }

    /// Move `amount` from `from` to `to` if `from` can cover it.
    pub fn transfer(&self, from: &str, to: &str, amount: u64) -> bool {
        let mut balances = self.balances.lock().expect("mutex poisoned");
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return false;
        }
        balances.insert(from.to_string(), available - amount);
        let dest = balances.entry(to.to_string()).or_insert(0);
        *dest = dest.saturating_add(amount);
        true
    }

    /// Sum of all balances.
    #[cfg(test)]
    pub fn total_supply(&self) -> u128 {
        let balances = self.balances.lock().expect("mutex poisoned");
        balances.values().map(|v| *v as u128).sum()
    }
}

impl RewardSink for Accounts {
    fn credit(&self, identity: &str, amount: u64) {
        let mut balances = self.balances.lock().expect("mutex poisoned");
        let entry = balances.entry(identity.to_string()).or_insert(0);
        *entry = entry.saturating_add(amount);
    }
}
