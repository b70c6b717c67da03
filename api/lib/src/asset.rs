// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Client side of the engine's asset store.
//!
//! A temp asset is the only engine resource the adapter ever owns, and the
//! leak rule is absolute: every path that allocates one reaches a free,
//! error paths included. One-shot operations hold theirs in a [`TempAsset`]
//! guard so the free rides every return; segmented operations store
//! `Option<AssetId>` in their context and free at finish or abort, `None`
//! playing the part of the invalid-id sentinel that makes cleanup
//! unconditionally safe.

use psahsm_token::result_code;
use psahsm_token::AssetId;
use psahsm_token::AssetPolicy;
use psahsm_token::TokenCmd;
use psahsm_token::TokenRslt;

use crate::adapter::PsaAdapter;
use crate::error::PsaError;
use crate::error::PsaResult;

impl PsaAdapter {
    /// Allocates an asset slot bound to `policy`.
    pub(crate) fn asset_alloc(&self, policy: AssetPolicy, size: usize) -> PsaResult<AssetId> {
        if size == 0 {
            return Err(PsaError::InvalidArgument);
        }
        let rslt = self.exchange(&TokenCmd::AssetCreate { policy, size })?;
        match rslt {
            TokenRslt::AssetCreate { result, asset_id } => {
                if result == result_code::ASSET_FULL {
                    tracing::warn!(size, "asset store full");
                    Err(PsaError::AssetStoreFull)
                } else if result < 0 || !asset_id.is_valid() {
                    tracing::warn!(result, "asset create failed");
                    Err(PsaError::CorruptionDetected)
                } else {
                    Ok(asset_id)
                }
            }
            _ => Err(PsaError::CorruptionDetected),
        }
    }

    /// Loads plaintext content (an IV or counter block) into a slot.
    pub(crate) fn asset_load_plaintext(&self, asset_id: AssetId, data: &[u8]) -> PsaResult<()> {
        if !asset_id.is_valid() || data.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let rslt = self.exchange(&TokenCmd::AssetLoad {
            asset_id,
            data: data.to_vec(),
        })?;
        if rslt.is_err() {
            tracing::warn!(result = rslt.result(), "asset load failed");
            return Err(PsaError::CorruptionDetected);
        }
        Ok(())
    }

    /// Deletes a slot. Callers on cleanup paths ignore the outcome; there
    /// is nothing left to do about a slot that will not die.
    pub(crate) fn asset_free(&self, asset_id: AssetId) -> PsaResult<()> {
        let rslt = self.exchange(&TokenCmd::AssetDelete { asset_id })?;
        if rslt.is_err() {
            tracing::warn!(result = rslt.result(), "asset delete failed");
            return Err(PsaError::CorruptionDetected);
        }
        Ok(())
    }
}

/// Scope guard for a one-shot operation's temp asset: frees the slot when
/// dropped, on success and failure alike.
pub(crate) struct TempAsset<'a> {
    adapter: &'a PsaAdapter,
    id: AssetId,
}

impl<'a> TempAsset<'a> {
    pub(crate) fn alloc(
        adapter: &'a PsaAdapter,
        policy: AssetPolicy,
        size: usize,
    ) -> PsaResult<Self> {
        let id = adapter.asset_alloc(policy, size)?;
        Ok(Self { adapter, id })
    }

    pub(crate) fn id(&self) -> AssetId {
        self.id
    }
}

impl Drop for TempAsset<'_> {
    fn drop(&mut self) {
        let _ = self.adapter.asset_free(self.id);
    }
}
