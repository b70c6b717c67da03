// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! MAC operations: one-shot and segmented, HMAC and cipher-based.
//!
//! Segmented state is `INIT -> SETUP -> UPDATE -> (finish | abort)`. The
//! first exchange that actually carries data runs init-to-continue and
//! every later one continue-to-continue; `finish` runs continue-to-final,
//! or init-to-final when no update ever reached the engine (which makes
//! "sign nothing but the key" a legal degenerate case). The running
//! total-length counter only ever counts bytes the engine has seen;
//! `finish` adds the still-buffered leftover and, for SHA-3, reduces the
//! sum modulo the sponge rate.

use psahsm_token::AssetId;
use psahsm_token::AssetPolicy;
use psahsm_token::ChainMode;
use psahsm_token::MacAlgo;
use psahsm_token::MacCmd;
use psahsm_token::TokenCmd;
use psahsm_token::TokenRslt;
use zeroize::Zeroize;

use crate::adapter::PsaAdapter;
use crate::chunk;
use crate::error::PsaError;
use crate::error::PsaResult;
use crate::policy;
use crate::types::KeyId;
use crate::types::KeyUsage;
use crate::types::MacAlg;

/// Widest MAC accumulation unit: the SHA3-224 sponge rate.
const MAX_MAC_BLOCK: usize = 144;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum MacState {
    Init,
    Setup,
    Update,
}

/// Caller-owned context of a segmented MAC operation.
pub struct MacOperation {
    state: MacState,
    key: Option<KeyId>,
    hw_algo: MacAlgo,
    verify: bool,
    block_size: usize,
    temp_asset: Option<AssetId>,
    leftover: [u8; MAX_MAC_BLOCK],
    leftover_nbytes: usize,
    total_length: u64,
    update_done: bool,
}

impl MacOperation {
    /// A fresh context in the `INIT` state.
    pub fn new() -> Self {
        Self {
            state: MacState::Init,
            key: None,
            hw_algo: MacAlgo::HmacSha256,
            verify: false,
            block_size: 0,
            temp_asset: None,
            leftover: [0u8; MAX_MAC_BLOCK],
            leftover_nbytes: 0,
            total_length: 0,
            update_done: false,
        }
    }

    fn reset(&mut self) {
        self.leftover.zeroize();
        *self = Self::new();
    }
}

impl Default for MacOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl PsaAdapter {
    /// One-shot MAC generation; returns the digest length written.
    pub fn mac_compute(
        &self,
        key: KeyId,
        alg: MacAlg,
        input: &[u8],
        mac: &mut [u8],
    ) -> PsaResult<usize> {
        let entry = self.keys.get(key)?;
        if !entry.attributes().usage.contains(KeyUsage::SIGN_MESSAGE) {
            return Err(PsaError::NotPermitted);
        }
        if input.is_empty() || mac.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let params = policy::mac_params(alg, entry.attributes().key_type)
            .ok_or(PsaError::NotSupported)?;
        let mac_nbytes = policy::mac_size(params.hw_algo, false);
        if mac.len() < mac_nbytes {
            return Err(PsaError::BufferTooSmall);
        }

        let total_length = policy::final_total_length(
            params.hw_algo.is_sha3(),
            params.block_size,
            input.len() as u64,
        );
        let cmd = TokenCmd::Mac(MacCmd {
            algorithm: params.hw_algo,
            mode: ChainMode::Init2Final,
            verify: false,
            key: entry.material().to_vec(),
            temp_asset: AssetId::INVALID,
            total_length,
            mac: Vec::new(),
            data: input.to_vec(),
        });
        match self.exchange(&cmd)? {
            TokenRslt::Mac { result, mac: field } if result >= 0 => {
                mac[..mac_nbytes].copy_from_slice(&field[..mac_nbytes]);
                Ok(mac_nbytes)
            }
            rslt => {
                tracing::warn!(result = rslt.result(), "mac compute failed");
                Err(PsaError::CorruptionDetected)
            }
        }
    }

    /// One-shot MAC verification. The engine performs the comparison; a
    /// mismatch is [`PsaError::InvalidSignature`]. The presented MAC must
    /// be exactly the algorithm's digest length.
    pub fn mac_verify(
        &self,
        key: KeyId,
        alg: MacAlg,
        input: &[u8],
        mac: &[u8],
    ) -> PsaResult<()> {
        let entry = self.keys.get(key)?;
        if !entry.attributes().usage.contains(KeyUsage::VERIFY_MESSAGE) {
            return Err(PsaError::NotPermitted);
        }
        if input.is_empty() || mac.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let params = policy::mac_params(alg, entry.attributes().key_type)
            .ok_or(PsaError::NotSupported)?;
        if mac.len() != policy::mac_size(params.hw_algo, false) {
            return Err(PsaError::InvalidArgument);
        }

        let total_length = policy::final_total_length(
            params.hw_algo.is_sha3(),
            params.block_size,
            input.len() as u64,
        );
        let cmd = TokenCmd::Mac(MacCmd {
            algorithm: params.hw_algo,
            mode: ChainMode::Init2Final,
            verify: true,
            key: entry.material().to_vec(),
            temp_asset: AssetId::INVALID,
            total_length,
            mac: mac.to_vec(),
            data: input.to_vec(),
        });
        let rslt = self.exchange(&cmd)?;
        if rslt.result() < 0 {
            tracing::warn!(result = rslt.result(), "mac verify failed");
            return Err(PsaError::InvalidSignature);
        }
        Ok(())
    }

    /// Begins a segmented MAC generation.
    pub fn mac_sign_setup(
        &self,
        operation: &mut MacOperation,
        key: KeyId,
        alg: MacAlg,
    ) -> PsaResult<()> {
        self.mac_setup(operation, key, alg, false)
    }

    /// Begins a segmented MAC verification.
    pub fn mac_verify_setup(
        &self,
        operation: &mut MacOperation,
        key: KeyId,
        alg: MacAlg,
    ) -> PsaResult<()> {
        self.mac_setup(operation, key, alg, true)
    }

    fn mac_setup(
        &self,
        operation: &mut MacOperation,
        key: KeyId,
        alg: MacAlg,
        verify: bool,
    ) -> PsaResult<()> {
        let entry = self.keys.get(key)?;
        let required = if verify {
            KeyUsage::VERIFY_MESSAGE
        } else {
            KeyUsage::SIGN_MESSAGE
        };
        if !entry.attributes().usage.contains(required) {
            return Err(PsaError::NotPermitted);
        }
        if operation.state != MacState::Init {
            return Err(PsaError::BadState);
        }
        let params = policy::mac_params(alg, entry.attributes().key_type)
            .ok_or(PsaError::NotSupported)?;

        operation.key = Some(key);
        operation.hw_algo = params.hw_algo;
        operation.verify = verify;
        operation.block_size = params.block_size;

        // A running MAC state is inherently mutable: strip the
        // non-modifiable bit and force the temporary one.
        let state_nbytes = policy::mac_size(params.hw_algo, true);
        let asset_policy = (policy::mac_asset_policy(params.hw_algo, verify)
            & !AssetPolicy::NON_MODIFIABLE)
            | AssetPolicy::SYM_TEMP;
        match self.asset_alloc(self.qualify_policy(asset_policy), state_nbytes) {
            Ok(asset_id) => operation.temp_asset = Some(asset_id),
            Err(err) => {
                operation.key = None;
                return Err(err);
            }
        }

        operation.state = MacState::Setup;
        let _ = self.keys.set_in_use(key, true);
        Ok(())
    }

    /// Feeds message bytes into the operation.
    ///
    /// The running total counts only bytes actually exchanged; buffered
    /// leftover is counted by `finish` once it is flushed.
    pub fn mac_update(&self, operation: &mut MacOperation, input: &[u8]) -> PsaResult<()> {
        if input.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state == MacState::Init || operation.block_size == 0 {
            return Err(PsaError::BadState);
        }
        let key = operation.key.ok_or(PsaError::InvalidHandle)?;
        let entry = self.keys.get(key)?;

        operation.state = MacState::Update;

        let block_size = operation.block_size;
        let leftover = operation.leftover_nbytes;
        let plan = chunk::plan(leftover, input.len(), block_size);
        if plan.bytes_to_process == 0 {
            operation.leftover[leftover..leftover + input.len()].copy_from_slice(input);
            operation.leftover_nbytes += input.len();
            return Ok(());
        }

        let mut remaining = plan.bytes_to_process;
        let mut input = input;

        if leftover != 0 {
            let take = block_size - leftover;
            operation.leftover[leftover..block_size].copy_from_slice(&input[..take]);
            let block = operation.leftover[..block_size].to_vec();
            self.mac_data_exchange(operation, entry.material(), &block)?;
            operation.total_length += block_size as u64;
            operation.update_done = true;
            remaining -= block_size;
            input = &input[take..];
        }

        while remaining != 0 {
            let size = remaining.min(chunk::max_chunk(block_size));
            self.mac_data_exchange(operation, entry.material(), &input[..size])?;
            operation.total_length += size as u64;
            operation.update_done = true;
            remaining -= size;
            input = &input[size..];
        }

        operation.leftover_nbytes = plan.new_leftover;
        operation.leftover[..plan.new_leftover].copy_from_slice(&input[..plan.new_leftover]);
        Ok(())
    }

    /// Final exchange of a segmented generation; writes the digest and
    /// returns its length.
    pub fn mac_sign_finish(
        &self,
        operation: &mut MacOperation,
        mac: &mut [u8],
    ) -> PsaResult<usize> {
        if mac.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state == MacState::Init {
            return Err(PsaError::BadState);
        }
        let key = operation.key.ok_or(PsaError::InvalidHandle)?;
        let entry = self.keys.get(key)?;

        let mac_nbytes = policy::mac_size(operation.hw_algo, false);
        if mac.len() < mac_nbytes {
            return Err(PsaError::BufferTooSmall);
        }

        let cmd = self.mac_final_cmd(operation, entry.material(), Vec::new());
        match self.exchange(&cmd)? {
            TokenRslt::Mac { result, mac: field } if result >= 0 => {
                mac[..mac_nbytes].copy_from_slice(&field[..mac_nbytes]);
                self.mac_teardown(operation, key);
                Ok(mac_nbytes)
            }
            rslt => {
                tracing::warn!(result = rslt.result(), "mac sign finish failed");
                Err(PsaError::CorruptionDetected)
            }
        }
    }

    /// Final exchange of a segmented verification. The engine compares;
    /// any engine-reported failure here surfaces as
    /// [`PsaError::CorruptionDetected`], unlike the one-shot path.
    pub fn mac_verify_finish(&self, operation: &mut MacOperation, mac: &[u8]) -> PsaResult<()> {
        if mac.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state == MacState::Init {
            return Err(PsaError::BadState);
        }
        let key = operation.key.ok_or(PsaError::InvalidHandle)?;
        let entry = self.keys.get(key)?;

        if mac.len() != policy::mac_size(operation.hw_algo, false) {
            return Err(PsaError::InvalidArgument);
        }

        let cmd = self.mac_final_cmd(operation, entry.material(), mac.to_vec());
        let rslt = self.exchange(&cmd)?;
        if rslt.result() < 0 {
            tracing::warn!(result = rslt.result(), "mac verify finish failed");
            return Err(PsaError::CorruptionDetected);
        }
        self.mac_teardown(operation, key);
        Ok(())
    }

    /// Unconditional teardown; safe in any state and idempotent.
    pub fn mac_abort(&self, operation: &mut MacOperation) -> PsaResult<()> {
        if let Some(asset_id) = operation.temp_asset.take() {
            let _ = self.asset_free(asset_id);
        }
        if let Some(key) = operation.key.take() {
            let _ = self.keys.set_in_use(key, false);
        }
        operation.reset();
        Ok(())
    }

    fn mac_data_exchange(
        &self,
        operation: &MacOperation,
        key_material: &[u8],
        data: &[u8],
    ) -> PsaResult<()> {
        let cmd = TokenCmd::Mac(MacCmd {
            algorithm: operation.hw_algo,
            mode: if operation.update_done {
                ChainMode::Cont2Cont
            } else {
                ChainMode::Init2Cont
            },
            verify: operation.verify,
            key: key_material.to_vec(),
            temp_asset: operation.temp_asset.unwrap_or(AssetId::INVALID),
            total_length: 0,
            mac: Vec::new(),
            data: data.to_vec(),
        });
        let rslt = self.exchange(&cmd)?;
        if rslt.result() < 0 {
            tracing::warn!(result = rslt.result(), "mac update failed");
            return Err(PsaError::CorruptionDetected);
        }
        Ok(())
    }

    fn mac_final_cmd(
        &self,
        operation: &MacOperation,
        key_material: &[u8],
        mac: Vec<u8>,
    ) -> TokenCmd {
        let total = operation.total_length + operation.leftover_nbytes as u64;
        let total_length = policy::final_total_length(
            operation.hw_algo.is_sha3(),
            operation.block_size,
            total,
        );
        TokenCmd::Mac(MacCmd {
            algorithm: operation.hw_algo,
            mode: if operation.update_done {
                ChainMode::Cont2Final
            } else {
                ChainMode::Init2Final
            },
            verify: operation.verify,
            key: key_material.to_vec(),
            temp_asset: if operation.update_done {
                operation.temp_asset.unwrap_or(AssetId::INVALID)
            } else {
                AssetId::INVALID
            },
            total_length,
            mac,
            data: operation.leftover[..operation.leftover_nbytes].to_vec(),
        })
    }

    fn mac_teardown(&self, operation: &mut MacOperation, key: KeyId) {
        let _ = self.keys.set_in_use(key, false);
        if let Some(asset_id) = operation.temp_asset.take() {
            let _ = self.asset_free(asset_id);
        }
        operation.reset();
    }
}
