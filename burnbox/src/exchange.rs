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

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use burnbox_common::error::{Error, ErrorKind, Result};
use burnbox_memory::{Stats, Store};
use serde::{Deserialize, Serialize};

use crate::{crypto, payload::SecretPayload};

/// Random bytes behind an id or an access key.
pub const TOKEN_BYTES: usize = 12;

/// Generate a random url-safe token of [`TOKEN_BYTES`] random bytes.
pub fn token() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; TOKEN_BYTES]>())
}

/// What the creator of a secret hands to its recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// The store id of the sealed secret.
    pub id: String,
    /// The access key. Never stored.
    pub key: String,
}

/// Seals payloads into a [`Store`] and opens them on redemption.
///
/// The store only ever sees ciphertext. The access key travels with the ticket and is never kept.
#[derive(Debug, Clone)]
pub struct Exchange {
    store: Store,
}

impl Exchange {
    /// Create an exchange over `store`.
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The underlying store.
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Seal and save `payload`, returning the ticket to redeem it.
    ///
    /// Store errors surface unchanged. An id collision is not retried.
    pub fn create(&self, payload: &SecretPayload) -> Result<Ticket> {
        let plaintext = serde_json::to_vec(payload)
            .map_err(|e| Error::new(ErrorKind::Parse, "failed to encode payload").with_source(e))?;

        let id = token();
        let key = token();
        let sealed = crypto::seal(&crypto::expand_key(&key), &plaintext)?;
        self.store.save(id.clone(), sealed)?;

        tracing::debug!("[exchange]: created secret, file: {}", payload.is_file);
        Ok(Ticket { id, key })
    }

    /// Redeem the secret of `id` and open it with `key`.
    ///
    /// The secret is burned as soon as it is fetched, so a wrong key loses it for good.
    pub fn retrieve(&self, id: &str, key: &str) -> Result<SecretPayload> {
        let id = id.trim();
        let key = key.trim();
        if id.is_empty() || key.is_empty() {
            return Err(Error::new(ErrorKind::Parse, "id and key are required"));
        }

        let sealed = self.store.get(id)?;
        let plaintext = crypto::open(&crypto::expand_key(key), &sealed).inspect_err(|e| {
            tracing::debug!("[exchange]: secret burned but not opened: {e}");
        })?;

        Ok(SecretPayload::from_plaintext(&plaintext))
    }

    /// Snapshot of the store counters.
    pub fn stats(&self) -> Stats {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use burnbox_memory::StoreBuilder;
    use itertools::Itertools;

    use super::*;

    fn exchange(limit: usize) -> Exchange {
        Exchange::new(StoreBuilder::new(limit).build().unwrap())
    }

    #[test]
    fn test_token_shape() {
        let tokens = (0..64).map(|_| token()).collect_vec();
        for t in &tokens {
            assert_eq!(t.len(), 16);
            assert!(t.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }
        assert_eq!(tokens.iter().unique().count(), tokens.len());
    }

    #[test_log::test(tokio::test)]
    async fn test_create_retrieve() {
        let exchange = exchange(1 << 20);
        let ticket = exchange.create(&SecretPayload::text("the launch code")).unwrap();

        let padded_id = format!("  {}\n", ticket.id);
        let payload = exchange.retrieve(&padded_id, &ticket.key).unwrap();
        assert_eq!(payload, SecretPayload::text("the launch code"));

        let err = exchange.retrieve(&ticket.id, &ticket.key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Burned);

        let stats = exchange.stats();
        assert_eq!((stats.created, stats.retrieved, stats.used), (1, 1, 0));
    }

    #[test_log::test(tokio::test)]
    async fn test_wrong_key_burns() {
        let exchange = exchange(1 << 20);
        let ticket = exchange
            .create(&SecretPayload::file("k.pem", "application/x-pem-file", b"-----BEGIN".to_vec()))
            .unwrap();

        let err = exchange.retrieve(&ticket.id, "not-the-key").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Crypto);

        let err = exchange.retrieve(&ticket.id, &ticket.key).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Burned);
    }

    #[test_log::test(tokio::test)]
    async fn test_required_fields() {
        let exchange = exchange(1 << 20);
        for (id, key) in [("", "key"), ("id", ""), ("  ", " ")] {
            assert_eq!(exchange.retrieve(id, key).unwrap_err().kind(), ErrorKind::Parse);
        }
        assert_eq!(
            exchange.retrieve("unknown", "key").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test_log::test(tokio::test)]
    async fn test_too_large_surfaces() {
        let exchange = exchange(64);
        let err = exchange.create(&SecretPayload::text("x".repeat(64))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TooLarge);
        assert_eq!(exchange.stats().created, 0);
    }
}
