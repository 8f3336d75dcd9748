use chrono::Utc;
use rand::RngCore;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::hasher::{has_leading_zeros, sha256_hex};
use crate::error::{LedgerError, Result};
use crate::message::SignedMessage;

/// A sealed block. Only `difficulty_delta` changes after sealing, once,
/// when the ledger accepts the block.
#[derive(Debug, Clone, Serialize)]
pub struct Block {
    pub sequence_id: u64,
    pub timestamp: i64, // Unix millis (UTC), taken when sealing starts
    pub previous_digest: String,
    pub nonce: u64,
    pub miner: String,
    pub payload: Vec<Arc<SignedMessage>>,
    pub digest: String,
    /// Whole seconds spent sealing.
    pub generation_secs: u64,
    /// New difficulty if it went up, its negation if it went down, 0 otherwise.
    pub difficulty_delta: i64,
}

impl Block {
    /// Run the proof-of-work search until a digest with `difficulty`
    /// leading zeros is found.
    #[cfg(test)]
    pub fn seal(
        sequence_id: u64,
        previous_digest: String,
        miner: &str,
        difficulty: u32,
        payload: Vec<Arc<SignedMessage>>,
    ) -> Result<Self> {
        let never = AtomicBool::new(false);
        Self::seal_until(sequence_id, previous_digest, miner, difficulty, payload, &never)
    }

    /// Run the proof-of-work search until a digest with `difficulty`
    /// leading zeros is found, or give up with `LedgerError::Cancelled` as
    /// soon as `stop` is raised.
    ///
    /// The payload is verified once up front: a block carrying a bad
    /// signature can never become valid, whatever the nonce.
    pub fn seal_until(
        sequence_id: u64,
        previous_digest: String,
        miner: &str,
        difficulty: u32,
        payload: Vec<Arc<SignedMessage>>,
        stop: &AtomicBool,
    ) -> Result<Self> {
        let started = Instant::now();
        verify_payload(&payload)?;

        let mut block = Self {
            sequence_id,
            timestamp: Utc::now().timestamp_millis(),
            previous_digest,
            nonce: 0,
            miner: miner.to_string(),
            payload,
            digest: String::new(),
            generation_secs: 0,
            difficulty_delta: 0,
        };

        let mut rng = rand::thread_rng();
        loop {
            if stop.load(Ordering::Relaxed) {
                return Err(LedgerError::Cancelled);
            }
            block.nonce = rng.next_u64();
            block.digest = block.compute_digest();
            if block.meets_difficulty(difficulty) {
                break;
            }
        }

        block.generation_secs = started.elapsed().as_secs();
        Ok(block)
    }

    /// Preimage of the digest: every field except the digest itself and the
    /// annotations added after sealing, as a JSON array.
    pub fn canonical_string(&self) -> String {
        serde_json::to_string(&(
            self.sequence_id,
            self.timestamp,
            self.nonce,
            &self.previous_digest,
            &self.miner,
            &self.payload,
        ))
        .expect("serialize block preimage")
    }

    pub fn compute_digest(&self) -> String {
        sha256_hex(self.canonical_string().as_bytes())
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        has_leading_zeros(&self.digest, difficulty)
    }

    /// Digest integrity, proof-of-work and payload signatures.
    /// Does not look at chain linkage.
    pub fn is_valid(&self, difficulty: u32) -> Result<bool> {
        if self.digest != self.compute_digest() || !self.meets_difficulty(difficulty) {
            return Ok(false);
        }
        for m in &self.payload {
            if !m.verify()? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Human-readable form of `difficulty_delta`.
    pub fn change_description(&self) -> String {
        match self.difficulty_delta {
            0 => "N stays the same".to_string(),
            d if d < 0 => format!("N was decreased to {}", -d),
            d => format!("N was increased to {d}"),
        }
    }
}

fn verify_payload(payload: &[Arc<SignedMessage>]) -> Result<()> {
    for m in payload {
        if !m.verify()? {
            return Err(LedgerError::InvalidPayload(m.id));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Block;
    use crate::error::LedgerError;
    use crate::message::SignedMessage;
    use crate::wallet::Wallet;
    use std::sync::Arc;
    use std::sync::atomic::AtomicBool;

    fn signed(wallet: &Wallet, id: u64, text: &str) -> Arc<SignedMessage> {
        Arc::new(SignedMessage::with_id(id, wallet, text).unwrap())
    }

    #[test]
    fn difficulty_zero_seals_on_first_candidate() {
        let b = Block::seal(1, "0".into(), "miner1", 0, Vec::new()).unwrap();
        assert_eq!(b.sequence_id, 1);
        assert_eq!(b.previous_digest, "0");
        assert_eq!(b.generation_secs, 0);
        assert_eq!(b.digest, b.compute_digest());
        assert!(b.is_valid(0).unwrap());
    }

    #[test]
    fn sealing_produces_leading_zeros() {
        let w = Wallet::generate("sender");
        let payload = vec![signed(&w, 1, "sender sent 5 VC to receiver")];
        let b = Block::seal(2, "prev".into(), "miner1", 2, payload).unwrap();
        assert!(b.digest.starts_with("00"));
        assert!(b.is_valid(2).unwrap());
    }

    #[test]
    fn invalid_when_mutated() {
        let w = Wallet::generate("sender");
        let mut b = Block::seal(2, "prev".into(), "miner1", 1, vec![signed(&w, 1, "a")]).unwrap();
        let old = b.digest.clone();

        b.payload.push(signed(&w, 2, "b"));

        assert_ne!(old, b.compute_digest());
        assert!(!b.is_valid(1).unwrap());
    }

    #[test]
    fn distinct_payloads_give_distinct_digests() {
        let msg = |id: u64, signer: &str, key: &str, text: &str, sig: &str| {
            Arc::new(SignedMessage {
                id,
                signer: signer.into(),
                public_key: key.into(),
                text: text.into(),
                signature: sig.into(),
            })
        };
        let mut a = Block::seal(5, "prev".into(), "miner1", 0, Vec::new()).unwrap();
        let mut b = a.clone();
        a.payload = vec![msg(1, "a", "p", "t", "s"), msg(2, "b", "q", "u", "v")];
        b.payload = vec![msg(1, "a", "p", "t|s;2|b|q|u", "v")];
        assert_ne!(a.compute_digest(), b.compute_digest());
    }

    #[test]
    fn annotations_do_not_affect_digest() {
        let mut b = Block::seal(1, "0".into(), "miner1", 1, Vec::new()).unwrap();
        b.generation_secs = 42;
        b.difficulty_delta = -3;
        assert!(b.is_valid(1).unwrap());
    }

    #[test]
    fn tampered_payload_fails_fast() {
        let w = Wallet::generate("sender");
        let mut m = SignedMessage::with_id(3, &w, "sender sent 5 VC to receiver").unwrap();
        m.text = "sender sent 50 VC to receiver".into();

        // High difficulty: this would effectively never finish if the
        // payload check sat inside the nonce loop.
        let err = Block::seal(1, "0".into(), "miner1", 64, vec![Arc::new(m)]).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidPayload(3)));
    }

    #[test]
    fn garbled_signature_is_a_crypto_error() {
        let w = Wallet::generate("sender");
        let mut m = SignedMessage::with_id(4, &w, "x").unwrap();
        m.signature = "not-hex".into();
        let err = Block::seal(1, "0".into(), "miner1", 0, vec![Arc::new(m)]).unwrap_err();
        assert!(matches!(err, LedgerError::Crypto(_)));
    }

    #[test]
    fn raised_stop_flag_cancels_search() {
        let stop = AtomicBool::new(true);
        let err = Block::seal_until(1, "0".into(), "miner1", 64, Vec::new(), &stop).unwrap_err();
        assert!(matches!(err, LedgerError::Cancelled));
    }

    #[test]
    fn change_description_follows_delta() {
        let mut b = Block::seal(1, "0".into(), "m", 0, Vec::new()).unwrap();
        assert_eq!(b.change_description(), "N stays the same");
        b.difficulty_delta = 2;
        assert_eq!(b.change_description(), "N was increased to 2");
        b.difficulty_delta = -1;
        assert_eq!(b.change_description(), "N was decreased to 1");
    }
}
