use rand::rngs::OsRng;
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey, ecdsa::Signature};
use sha2::{Digest, Sha256};

use crate::error::{LedgerError, Result};

/// A named signing identity backed by a secp256k1 keypair.
#[derive(Debug)]
pub struct Wallet {
    name: String,
    secret: SecretKey,
    public: PublicKey,
}

impl Wallet {
    /// Generate a fresh keypair for `name` from the OS RNG.
    pub fn generate(name: impl Into<String>) -> Self {
        let secp = Secp256k1::signing_only();
        let (secret, public) = secp.generate_keypair(&mut OsRng);
        Self {
            name: name.into(),
            secret,
            public,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hex of the compressed public key (33 bytes).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public.serialize())
    }

    /// Sign SHA-256(`payload`) and return the hex DER signature.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        let secp = Secp256k1::signing_only();
        let msg = Message::from_digest_slice(&digest32(payload))
            .map_err(|e| LedgerError::Crypto(format!("invalid message digest: {e}")))?;
        let sig = secp.sign_ecdsa(&msg, &self.secret);
        Ok(hex::encode(sig.serialize_der()))
    }
}

/// Verify a hex DER signature over SHA-256(`payload`) against a hex pubkey.
///
/// `Ok(false)` means the signature is well formed but does not match;
/// malformed keys or signatures are errors.
pub fn verify_signature_hex(pubkey_hex: &str, sig_hex: &str, payload: &[u8]) -> Result<bool> {
    let secp = Secp256k1::verification_only();

    let sig_bytes = hex::decode(sig_hex)
        .map_err(|e| LedgerError::Crypto(format!("invalid signature hex: {e}")))?;
    let sig = Signature::from_der(&sig_bytes)
        .map_err(|e| LedgerError::Crypto(format!("invalid DER signature: {e}")))?;

    let pk_bytes = hex::decode(pubkey_hex)
        .map_err(|e| LedgerError::Crypto(format!("invalid pubkey hex: {e}")))?;
    let pk = PublicKey::from_slice(&pk_bytes)
        .map_err(|e| LedgerError::Crypto(format!("invalid pubkey bytes: {e}")))?;

    let msg = Message::from_digest_slice(&digest32(payload))
        .map_err(|e| LedgerError::Crypto(format!("invalid message digest: {e}")))?;
    Ok(secp.verify_ecdsa(&msg, &sig, &pk).is_ok())
}

fn digest32(payload: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::{Wallet, verify_signature_hex};

    #[test]
    fn signature_verifies_for_signer_only() {
        let alice = Wallet::generate("alice");
        let bob = Wallet::generate("bob");
        let sig = alice.sign(b"hello").unwrap();

        assert!(verify_signature_hex(&alice.public_key_hex(), &sig, b"hello").unwrap());
        assert!(!verify_signature_hex(&alice.public_key_hex(), &sig, b"hellO").unwrap());
        assert!(!verify_signature_hex(&bob.public_key_hex(), &sig, b"hello").unwrap());
    }

    #[test]
    fn malformed_inputs_are_errors() {
        let alice = Wallet::generate("alice");
        assert!(verify_signature_hex(&alice.public_key_hex(), "zz", b"x").is_err());
        assert!(verify_signature_hex(&alice.public_key_hex(), "00", b"x").is_err());
        assert!(verify_signature_hex("02abcd", &alice.sign(b"x").unwrap(), b"x").is_err());
    }

    #[test]
    fn uppercase_pubkey_hex_is_accepted() {
        let alice = Wallet::generate("alice");
        let sig = alice.sign(b"x").unwrap();
        let upper = alice.public_key_hex().to_uppercase();
        assert!(verify_signature_hex(&upper, &sig, b"x").unwrap());
    }
}
