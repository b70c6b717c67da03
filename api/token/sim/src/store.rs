// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The simulated asset store.

use psahsm_token::result_code;
use psahsm_token::AssetId;
use psahsm_token::AssetPolicy;

use crate::crypto::HashState;
use crate::crypto::MacState;

/// Upper bound on live slots, so the distinguished "store full" result code
/// is reachable from tests.
pub(crate) const MAX_ASSETS: usize = 64;

/// Largest slot the store will allocate, in bytes. Sized for the widest
/// intermediate state (the SHA-3 permutation state).
pub(crate) const MAX_ASSET_SIZE: usize = 200;

/// Content of one slot.
///
/// A real engine stores opaque words; the simulation stores whichever typed
/// state the slot currently plays the role of. Loading plaintext over a
/// running state resets it, matching the engine's "load replaces content"
/// rule.
#[derive(Clone)]
pub(crate) enum AssetData {
    /// Allocated but never loaded.
    Empty,
    /// Plain bytes: IV, counter block, loaded key material.
    Bytes(Vec<u8>),
    /// Running MAC state of a segmented MAC operation.
    Mac(MacState),
    /// Running digest state of a segmented hash operation.
    Hash(HashState),
}

/// One allocated slot.
#[derive(Clone)]
pub(crate) struct Asset {
    pub policy: AssetPolicy,
    pub size: usize,
    pub data: AssetData,
}

/// Id-allocating table of slots.
pub(crate) struct AssetStore {
    slots: Vec<(AssetId, Asset)>,
    next_id: u32,
}

impl AssetStore {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1,
        }
    }

    /// Allocates a slot; returns the new id or a negative result code.
    pub fn create(&mut self, policy: AssetPolicy, size: usize) -> Result<AssetId, i32> {
        if size == 0 || size > MAX_ASSET_SIZE {
            return Err(result_code::INVALID_PARAMETER);
        }
        if self.slots.len() >= MAX_ASSETS {
            return Err(result_code::ASSET_FULL);
        }
        let id = AssetId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1).max(1);
        self.slots.push((
            id,
            Asset {
                policy,
                size,
                data: AssetData::Empty,
            },
        ));
        Ok(id)
    }

    /// Deletes a slot, scrubbing its content.
    pub fn delete(&mut self, id: AssetId) -> Result<(), i32> {
        let idx = self
            .slots
            .iter()
            .position(|(slot_id, _)| *slot_id == id)
            .ok_or(result_code::INVALID_ASSET)?;
        self.slots.swap_remove(idx);
        Ok(())
    }

    /// Replaces a slot's content with plain bytes.
    pub fn load(&mut self, id: AssetId, data: &[u8]) -> Result<(), i32> {
        let asset = self.get_mut(id)?;
        if data.is_empty() || data.len() > asset.size {
            return Err(result_code::INVALID_PARAMETER);
        }
        asset.data = AssetData::Bytes(data.to_vec());
        Ok(())
    }

    pub fn get(&self, id: AssetId) -> Result<&Asset, i32> {
        self.slots
            .iter()
            .find(|(slot_id, _)| *slot_id == id)
            .map(|(_, asset)| asset)
            .ok_or(result_code::INVALID_ASSET)
    }

    pub fn get_mut(&mut self, id: AssetId) -> Result<&mut Asset, i32> {
        self.slots
            .iter_mut()
            .find(|(slot_id, _)| *slot_id == id)
            .map(|(_, asset)| asset)
            .ok_or(result_code::INVALID_ASSET)
    }

    /// Number of live slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }
}
