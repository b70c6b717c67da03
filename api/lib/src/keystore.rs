// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The opaque key-handle service consumed by the adapter.
//!
//! The adapter resolves a key at the start of every call and holds the
//! resolution (an `Arc`) only for that call's duration; dropping it is the
//! release. The advisory in-use flag is the only cross-call key state: a
//! segmented operation sets it at setup and clears it at finish or abort,
//! and the in-memory store refuses to destroy a key while it is set. It is
//! a flag, not a lock; serializing concurrent use of one key across
//! operations remains the caller's job.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use crate::error::PsaError;
use crate::error::PsaResult;
use crate::types::KeyAttributes;
use crate::types::KeyId;

/// A resolved key: attributes plus material.
pub struct KeyEntry {
    attributes: KeyAttributes,
    material: Zeroizing<Vec<u8>>,
}

impl KeyEntry {
    /// The key's attribute bundle.
    pub fn attributes(&self) -> &KeyAttributes {
        &self.attributes
    }

    /// Raw key material, delivered inline to the engine for one exchange.
    pub(crate) fn material(&self) -> &[u8] {
        &self.material
    }
}

/// Key resolution and the advisory in-use flag.
pub trait KeyStore: Send + Sync {
    /// Resolves a key id. Failure to resolve is [`PsaError::InvalidHandle`].
    fn get(&self, key: KeyId) -> PsaResult<Arc<KeyEntry>>;

    /// Sets or clears the advisory in-use flag.
    fn set_in_use(&self, key: KeyId, in_use: bool) -> PsaResult<()>;
}

struct MemInner {
    entries: HashMap<u32, (Arc<KeyEntry>, bool)>,
    next_id: u32,
}

/// In-memory [`KeyStore`].
pub struct MemKeyStore {
    inner: RwLock<MemInner>,
}

impl MemKeyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemInner {
                entries: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Imports key material, returning the id it resolves under.
    ///
    /// The material length must match the attribute bit size.
    pub fn import(&self, attributes: KeyAttributes, material: &[u8]) -> PsaResult<KeyId> {
        if material.is_empty() || material.len() * 8 != attributes.bits {
            return Err(PsaError::InvalidArgument);
        }
        let mut inner = self.inner.write();
        let id = KeyId(inner.next_id);
        inner.next_id = inner.next_id.wrapping_add(1).max(1);
        let entry = Arc::new(KeyEntry {
            attributes,
            material: Zeroizing::new(material.to_vec()),
        });
        inner.entries.insert(id.0, (entry, false));
        Ok(id)
    }

    /// Destroys a key. Refused while the advisory in-use flag is set, so a
    /// running segmented operation cannot lose its key mid-stream.
    pub fn destroy(&self, key: KeyId) -> PsaResult<()> {
        let mut inner = self.inner.write();
        match inner.entries.get(&key.0) {
            None => Err(PsaError::InvalidHandle),
            Some((_, true)) => Err(PsaError::NotPermitted),
            Some((_, false)) => {
                inner.entries.remove(&key.0);
                Ok(())
            }
        }
    }

    /// Whether the advisory in-use flag is currently set.
    pub fn is_in_use(&self, key: KeyId) -> bool {
        self.inner
            .read()
            .entries
            .get(&key.0)
            .map(|(_, in_use)| *in_use)
            .unwrap_or(false)
    }
}

impl Default for MemKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStore for MemKeyStore {
    fn get(&self, key: KeyId) -> PsaResult<Arc<KeyEntry>> {
        self.inner
            .read()
            .entries
            .get(&key.0)
            .map(|(entry, _)| Arc::clone(entry))
            .ok_or(PsaError::InvalidHandle)
    }

    fn set_in_use(&self, key: KeyId, in_use: bool) -> PsaResult<()> {
        let mut inner = self.inner.write();
        match inner.entries.get_mut(&key.0) {
            Some((_, flag)) => {
                *flag = in_use;
                Ok(())
            }
            None => Err(PsaError::InvalidHandle),
        }
    }
}
