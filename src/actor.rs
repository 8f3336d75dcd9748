use log::debug;
use std::sync::Arc;

use crate::accounts::Accounts;
use crate::blockchain::Ledger;
use crate::error::Result;
use crate::message::SignedMessage;
use crate::wallet::Wallet;

/// A participant that can pay others. Every successful payment is
/// announced to the ledger as a signed message.
pub struct Actor {
    wallet: Arc<Wallet>,
    accounts: Arc<Accounts>,
    ledger: Arc<Ledger>,
}

impl Actor {
    /// Create an actor and open its account with `starting_balance`.
    pub fn new(
        wallet: Arc<Wallet>,
        accounts: Arc<Accounts>,
        ledger: Arc<Ledger>,
        starting_balance: u64,
    ) -> Self {
        accounts.open(wallet.name(), starting_balance);
        Self {
            wallet,
            accounts,
            ledger,
        }
    }

    pub fn name(&self) -> &str {
        self.wallet.name()
    }

    pub fn wallet(&self) -> Arc<Wallet> {
        Arc::clone(&self.wallet)
    }

    pub fn balance(&self) -> u64 {
        self.accounts.balance(self.name())
    }

    /// Pay `amount` to `to`. Returns `Ok(false)` when the balance is too
    /// low; nothing is transferred or announced in that case.
    pub fn send_coins(&self, to: &Actor, amount: u64) -> Result<bool> {
        if !self.accounts.transfer(self.name(), to.name(), amount) {
            debug!(
                "ACTOR {} - cannot send {} VC (balance {})",
                self.name(),
                amount,
                self.balance()
            );
            return Ok(false);
        }
        let text = format!("{} sent {} VC to {}", self.name(), amount, to.name());
        let message = SignedMessage::new(&self.wallet, text)?;
        self.ledger.submit_message(Arc::new(message));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::Actor;
    use crate::accounts::Accounts;
    use crate::blockchain::Ledger;
    use crate::config::Config;
    use crate::wallet::Wallet;
    use std::sync::Arc;

    fn pair() -> (Actor, Actor, Arc<Ledger>) {
        let accounts = Arc::new(Accounts::new());
        let ledger = Arc::new(Ledger::new(&Config::default(), accounts.clone()));
        let a = Actor::new(
            Arc::new(Wallet::generate("sender")),
            accounts.clone(),
            ledger.clone(),
            100,
        );
        let b = Actor::new(
            Arc::new(Wallet::generate("receiver")),
            accounts,
            ledger.clone(),
            100,
        );
        (a, b, ledger)
    }

    #[test]
    fn payment_moves_coins_and_queues_signed_message() {
        let (a, b, ledger) = pair();
        assert!(a.send_coins(&b, 50).unwrap());
        assert_eq!(a.balance(), 50);
        assert_eq!(b.balance(), 150);

        let pending = ledger.snapshot_of_pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].text, "sender sent 50 VC to receiver");
        assert_eq!(pending[0].signer, "sender");
        assert!(pending[0].verify().unwrap());
    }

    #[test]
    fn unaffordable_payment_is_skipped() {
        let (a, b, ledger) = pair();
        assert!(!a.send_coins(&b, 101).unwrap());
        assert_eq!(a.balance(), 100);
        assert!(ledger.snapshot_of_pending().is_empty());
    }
}
