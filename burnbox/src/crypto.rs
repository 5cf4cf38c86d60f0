// Copyright 2026 burnbox Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! AES-256-GCM sealing of secret payloads.
//!
//! A sealed message is laid out as `[nonce | ciphertext | tag]`, with a fresh random 12-byte nonce per message.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use burnbox_common::error::{Error, ErrorKind};
use sha2::{Digest, Sha256};

/// Cipher key length in bytes.
pub const KEY_LEN: usize = 32;
/// Nonce length in bytes.
pub const NONCE_LEN: usize = 12;

/// Cipher failures.
#[derive(Debug, thiserror::Error)]
pub enum CipherError {
    /// The key is not [`KEY_LEN`] bytes long.
    #[error("key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidKey(usize),
    /// The input is too short to hold a nonce.
    #[error("malformed ciphertext")]
    Malformed,
    /// The ciphertext does not authenticate under the key.
    #[error("decryption failed")]
    Open,
    /// Encryption failed.
    #[error("encryption failed")]
    Seal,
}

impl From<CipherError> for Error {
    fn from(e: CipherError) -> Self {
        Error::new(ErrorKind::Crypto, e.to_string()).with_source(e)
    }
}

/// Derive a cipher key from an access key string.
pub fn expand_key(key: &str) -> [u8; KEY_LEN] {
    Sha256::digest(key.as_bytes()).into()
}

/// Encrypt `plaintext` under `key` with a random nonce.
pub fn seal(key: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey(key.len()))?;
    let nonce: [u8; NONCE_LEN] = rand::random();
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CipherError::Seal)?;

    let mut sealed = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&nonce);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Decrypt a message produced by [`seal`].
pub fn open(key: &[u8], sealed: &[u8]) -> Result<Vec<u8>, CipherError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CipherError::InvalidKey(key.len()))?;
    if sealed.len() < NONCE_LEN {
        return Err(CipherError::Malformed);
    }
    let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CipherError::Open)
}
