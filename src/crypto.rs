//! Card-number protection: the keyed codec for numbers at rest and the
//! secure generator for new numbers.

use crate::error::{LedgerError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes128Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::rngs::OsRng;
use rand::{Rng, RngCore};

pub const CARD_NUMBER_LENGTH: usize = 16;

const SECRET_LENGTH: usize = 16;
const NONCE_LENGTH: usize = 12;

/// Reversible keyed transform for card numbers.
///
/// AES-128-GCM with a random nonce per encryption; the nonce is prepended to
/// the sealed bytes and the whole blob base64-encoded for storage. The secret
/// must be exactly 16 bytes, checked at construction so a misconfigured key
/// can never reach a call site.
pub struct NumberCipher {
    cipher: Aes128Gcm,
}

impl std::fmt::Debug for NumberCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NumberCipher").finish_non_exhaustive()
    }
}

impl NumberCipher {
    pub fn new(secret: &str) -> Result<Self> {
        if secret.len() != SECRET_LENGTH {
            return Err(LedgerError::Crypto(format!(
                "secret must be exactly {SECRET_LENGTH} bytes, got {}",
                secret.len()
            )));
        }
        let cipher = Aes128Gcm::new_from_slice(secret.as_bytes())
            .map_err(|_| LedgerError::Crypto("failed to initialize cipher".into()))?;
        Ok(Self { cipher })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LENGTH];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from(nonce_bytes);

        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| LedgerError::Crypto("encryption failed".into()))?;

        let mut blob = nonce_bytes.to_vec();
        blob.extend_from_slice(&sealed);
        Ok(BASE64.encode(blob))
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String> {
        let blob = BASE64
            .decode(ciphertext)
            .map_err(|_| LedgerError::Crypto("ciphertext is not valid base64".into()))?;
        if blob.len() < NONCE_LENGTH {
            return Err(LedgerError::Crypto("ciphertext too short".into()));
        }

        let (nonce_bytes, sealed) = blob.split_at(NONCE_LENGTH);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), sealed)
            .map_err(|_| LedgerError::Crypto("decryption failed".into()))?;

        String::from_utf8(plain)
            .map_err(|_| LedgerError::Crypto("decrypted payload is not valid UTF-8".into()))
    }
}

/// A candidate 16-digit card number from the OS CSPRNG.
///
/// No uniqueness guarantee here; the store's unique-ciphertext constraint
/// catches collisions.
pub fn random_card_number() -> String {
    let mut rng = OsRng;
    (0..CARD_NUMBER_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}
