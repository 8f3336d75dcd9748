use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::wallet::{Wallet, verify_signature_hex};

static NEXT_MESSAGE_ID: AtomicU64 = AtomicU64::new(1);

/// A text record signed by its sender. Never mutated after signing; the
/// pending pool and every block that includes it share it through `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedMessage {
    /// Process-wide monotonic id.
    pub id: u64,
    pub signer: String,
    /// Hex compressed public key of the signer.
    pub public_key: String,
    pub text: String,
    /// Hex-encoded DER ECDSA signature over `signing_payload()`.
    pub signature: String,
}

impl SignedMessage {
    /// Sign `text` as `wallet` under the next process-wide message id.
    pub fn new(wallet: &Wallet, text: impl Into<String>) -> Result<Self> {
        let id = NEXT_MESSAGE_ID.fetch_add(1, Ordering::Relaxed);
        Self::with_id(id, wallet, text)
    }

    /// Sign `text` under an explicit id.
    pub fn with_id(id: u64, wallet: &Wallet, text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        let signature = wallet.sign(&signing_payload(&text, id))?;
        Ok(Self {
            id,
            signer: wallet.name().to_string(),
            public_key: wallet.public_key_hex(),
            text,
            signature,
        })
    }

    /// Bytes covered by the signature.
    pub fn signing_payload(&self) -> Vec<u8> {
        signing_payload(&self.text, self.id)
    }

    /// Check the signature against the claimed signer's key.
    pub fn verify(&self) -> Result<bool> {
        verify_signature_hex(&self.public_key, &self.signature, &self.signing_payload())
    }
}

fn signing_payload(text: &str, id: u64) -> Vec<u8> {
    format!("{text}\nId: {id}").into_bytes()
}
