use crate::error::{EngineError, Result};
use argon2::Argon2;
use blake3::Hasher;
use chacha20poly1305::{
    Key, XChaCha20Poly1305, XNonce,
    aead::{Aead, KeyInit},
};

pub const SALT_LEN: usize = 32;
pub const TOKEN_LEN: usize = 32;

/// Optional per-entry transform pair plus a password-verification token.
/// Implementations must never persist the plaintext password in any form;
/// the token is one-way derived and only proves knowledge of the password.
pub trait EntryCipher: Send + Sync {
    fn encrypt(&self, plaintext: &[u8], password: &str, entry_index: u64) -> Result<Vec<u8>>;
    fn decrypt(&self, ciphertext: &[u8], password: &str, entry_index: u64) -> Result<Vec<u8>>;
    fn verifier(&self, password: &str) -> Result<[u8; TOKEN_LEN]>;
    fn check(&self, token: &[u8; TOKEN_LEN], password: &str) -> bool;
}

/// XChaCha20-Poly1305 with an Argon2id key derived from password + salt.
/// The salt is generated once per archive and stored in the superblock.
pub struct ChaChaCipher {
    salt: [u8; SALT_LEN],
}

impl ChaChaCipher {
    pub fn new(salt: [u8; SALT_LEN]) -> Self {
        Self { salt }
    }

    pub fn with_random_salt() -> Result<Self> {
        let mut salt = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt)
            .map_err(|e| EngineError::Format(format!("rng failure: {e}")))?;
        Ok(Self::new(salt))
    }

    pub fn salt(&self) -> [u8; SALT_LEN] {
        self.salt
    }

    fn derive_key(&self, password: &str) -> Result<[u8; 32]> {
        let mut key = [0u8; 32];
        Argon2::default()
            .hash_password_into(password.as_bytes(), &self.salt, &mut key)
            .map_err(|e| EngineError::Format(format!("key derivation failed: {e}")))?;
        Ok(key)
    }

    /// Nonce derivation: XChaCha requires a 24-byte nonce.
    /// nonce = blake3(salt || entry_index).take(24)
    fn nonce(&self, entry_index: u64) -> XNonce {
        let mut h = Hasher::new();
        h.update(&self.salt);
        h.update(&entry_index.to_le_bytes());
        let out = h.finalize();
        XNonce::from_slice(&out.as_bytes()[..24]).to_owned()
    }
}

impl EntryCipher for ChaChaCipher {
    fn encrypt(&self, plaintext: &[u8], password: &str, entry_index: u64) -> Result<Vec<u8>> {
        let key = self.derive_key(password)?;
        let aead = XChaCha20Poly1305::new(Key::from_slice(&key));
        aead.encrypt(&self.nonce(entry_index), plaintext)
            .map_err(|_| EngineError::Format("entry encryption failed".into()))
    }

    /// Callers are expected to run `check` first; an AEAD failure after a
    /// matching verifier means the payload itself is corrupt or tampered.
    fn decrypt(&self, ciphertext: &[u8], password: &str, entry_index: u64) -> Result<Vec<u8>> {
        let key = self.derive_key(password)?;
        let aead = XChaCha20Poly1305::new(Key::from_slice(&key));
        aead.decrypt(&self.nonce(entry_index), ciphertext)
            .map_err(|_| EngineError::Format("entry decryption failed (corrupt or tampered)".into()))
    }

    fn verifier(&self, password: &str) -> Result<[u8; TOKEN_LEN]> {
        let key = self.derive_key(password)?;
        Ok(*blake3::keyed_hash(&key, b"zipack password verifier").as_bytes())
    }

    fn check(&self, token: &[u8; TOKEN_LEN], password: &str) -> bool {
        match self.verifier(password) {
            Ok(derived) => derived == *token,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> ChaChaCipher {
        ChaChaCipher::new([7u8; SALT_LEN])
    }

    #[test]
    fn roundtrip_with_correct_password() {
        let c = cipher();
        let sealed = c.encrypt(b"payload bytes", "secret", 3).unwrap();
        assert_ne!(&sealed[..], b"payload bytes");
        let opened = c.decrypt(&sealed, "secret", 3).unwrap();
        assert_eq!(opened, b"payload bytes");
    }

    #[test]
    fn wrong_password_fails_decrypt() {
        let c = cipher();
        let sealed = c.encrypt(b"payload", "secret", 0).unwrap();
        assert!(c.decrypt(&sealed, "wrong", 0).is_err());
    }

    #[test]
    fn nonce_varies_per_entry() {
        let c = cipher();
        let a = c.encrypt(b"same", "secret", 0).unwrap();
        let b = c.encrypt(b"same", "secret", 1).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn verifier_token_checks_password() {
        let c = cipher();
        let token = c.verifier("secret").unwrap();
        assert!(c.check(&token, "secret"));
        assert!(!c.check(&token, "Secret"));
        assert!(!c.check(&token, ""));
    }

    #[test]
    fn token_does_not_leak_password() {
        let c = cipher();
        let token = c.verifier("hunter2").unwrap();
        let needle = b"hunter2";
        assert!(!token.windows(needle.len()).any(|w| w == needle));
    }
}
