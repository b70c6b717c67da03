// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Symmetric cipher operations: one-shot and segmented.
//!
//! A segmented operation walks `INIT -> SETUP -> IV_LOADED -> UPDATE` and
//! ends at `finish` or `abort`; ECB skips the IV step and goes to `UPDATE`
//! straight from `SETUP`. Update calls accumulate input in the context's
//! leftover buffer and hand the engine whole blocks only, always holding at
//! least one block back for `finish` (see [`crate::chunk`]).

use psahsm_token::AssetId;
use psahsm_token::CipherAlgo;
use psahsm_token::CipherCmd;
use psahsm_token::CipherMode;
use psahsm_token::TokenCmd;
use psahsm_token::TokenRslt;
use psahsm_token::TOKEN_IV_SIZE;
use zeroize::Zeroize;

use crate::adapter::PsaAdapter;
use crate::asset::TempAsset;
use crate::chunk;
use crate::error::PsaError;
use crate::error::PsaResult;
use crate::policy;
use crate::types::CipherAlg;
use crate::types::KeyId;
use crate::types::KeyUsage;

const MAX_CIPHER_BLOCK: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum CipherState {
    Init,
    Setup,
    IvLoaded,
    Update,
}

/// Caller-owned context of a segmented cipher operation.
///
/// Pass it by mutable reference to each call; call order is enforced by the
/// state tag. Not internally synchronized.
pub struct CipherOperation {
    state: CipherState,
    key: Option<KeyId>,
    hw_algo: CipherAlgo,
    mode: CipherMode,
    encrypt: bool,
    block_size: usize,
    iv_size: usize,
    temp_asset: Option<AssetId>,
    leftover: [u8; MAX_CIPHER_BLOCK],
    leftover_nbytes: usize,
}

impl CipherOperation {
    /// A fresh context in the `INIT` state.
    pub fn new() -> Self {
        Self {
            state: CipherState::Init,
            key: None,
            hw_algo: CipherAlgo::Aes,
            mode: CipherMode::Ecb,
            encrypt: false,
            block_size: 0,
            iv_size: 0,
            temp_asset: None,
            leftover: [0u8; MAX_CIPHER_BLOCK],
            leftover_nbytes: 0,
        }
    }

    fn reset(&mut self) {
        self.leftover.zeroize();
        *self = Self::new();
    }
}

impl Default for CipherOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl PsaAdapter {
    /// One-shot encryption. The produced output is the generated IV (empty
    /// for ECB, the inline tweak field for XTS) followed by the ciphertext;
    /// the returned length counts both.
    pub fn cipher_encrypt(
        &self,
        key: KeyId,
        alg: CipherAlg,
        input: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let entry = self.keys.get(key)?;
        if !entry.attributes().usage.contains(KeyUsage::ENCRYPT) {
            return Err(PsaError::NotPermitted);
        }
        if input.is_empty() || output.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let params = policy::cipher_params(entry.attributes().key_type, alg)
            .ok_or(PsaError::NotSupported)?;
        if input.len() % params.block_size != 0
            && matches!(alg, CipherAlg::Ecb | CipherAlg::Cbc)
        {
            return Err(PsaError::InvalidPadding);
        }
        if output.len() < input.len() + params.iv_size {
            return Err(PsaError::BufferTooSmall);
        }

        let asset_policy = self.qualify_policy(policy::cipher_asset_policy(&params, true));
        let mut iv = [0u8; TOKEN_IV_SIZE];
        let temp = if !asset_policy.is_empty() {
            let temp = TempAsset::alloc(self, asset_policy, params.iv_size)?;
            self.entropy.fill(&mut iv[..params.iv_size])?;
            self.asset_load_plaintext(temp.id(), &iv[..params.iv_size])?;
            Some(temp)
        } else {
            None
        };

        let data = self.one_shot_exchange(
            &params,
            true,
            entry.material(),
            temp.as_ref().map(TempAsset::id),
            // XTS carries its tweak inline; generated fresh it is all zero.
            if params.mode == CipherMode::Xts { iv } else { [0u8; TOKEN_IV_SIZE] },
            input,
        )?;
        if data.len() != input.len() {
            return Err(PsaError::CorruptionDetected);
        }
        output[..params.iv_size].copy_from_slice(&iv[..params.iv_size]);
        output[params.iv_size..params.iv_size + data.len()].copy_from_slice(&data);
        Ok(input.len() + params.iv_size)
    }

    /// One-shot decryption; the IV is read back from the input prefix.
    pub fn cipher_decrypt(
        &self,
        key: KeyId,
        alg: CipherAlg,
        input: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        let entry = self.keys.get(key)?;
        if !entry.attributes().usage.contains(KeyUsage::DECRYPT) {
            return Err(PsaError::NotPermitted);
        }
        if input.is_empty() || output.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let params = policy::cipher_params(entry.attributes().key_type, alg)
            .ok_or(PsaError::NotSupported)?;
        if input.len() < params.iv_size {
            return Err(PsaError::InvalidArgument);
        }
        let payload_len = input.len() - params.iv_size;
        if payload_len % params.block_size != 0
            && matches!(alg, CipherAlg::Ecb | CipherAlg::Cbc)
        {
            return Err(PsaError::InvalidPadding);
        }
        if output.len() < payload_len {
            return Err(PsaError::BufferTooSmall);
        }

        let asset_policy = self.qualify_policy(policy::cipher_asset_policy(&params, false));
        let temp = if !asset_policy.is_empty() {
            let temp = TempAsset::alloc(self, asset_policy, params.iv_size)?;
            self.asset_load_plaintext(temp.id(), &input[..params.iv_size])?;
            Some(temp)
        } else {
            None
        };

        let mut iv = [0u8; TOKEN_IV_SIZE];
        if params.mode == CipherMode::Xts {
            iv.copy_from_slice(&input[..TOKEN_IV_SIZE]);
        }
        let data = self.one_shot_exchange(
            &params,
            false,
            entry.material(),
            temp.as_ref().map(TempAsset::id),
            iv,
            &input[params.iv_size..],
        )?;
        if data.len() != payload_len {
            return Err(PsaError::CorruptionDetected);
        }
        output[..payload_len].copy_from_slice(&data);
        Ok(payload_len)
    }

    fn one_shot_exchange(
        &self,
        params: &policy::CipherParams,
        encrypt: bool,
        key_material: &[u8],
        temp_asset: Option<AssetId>,
        iv: [u8; TOKEN_IV_SIZE],
        data: &[u8],
    ) -> PsaResult<Vec<u8>> {
        let cmd = TokenCmd::Cipher(CipherCmd {
            algorithm: params.hw_algo,
            mode: params.mode,
            encrypt,
            key: key_material.to_vec(),
            temp_asset: temp_asset.unwrap_or(AssetId::INVALID),
            iv,
            data: data.to_vec(),
        });
        match self.exchange(&cmd)? {
            TokenRslt::Cipher { result, data } if result >= 0 => Ok(data),
            rslt => {
                tracing::warn!(result = rslt.result(), "cipher exchange failed");
                Err(PsaError::CorruptionDetected)
            }
        }
    }

    /// Begins a segmented encryption. Allocates the operation's temp asset
    /// for modes that chain state through one (CBC, CTR); no exchange
    /// carries data yet.
    pub fn cipher_encrypt_setup(
        &self,
        operation: &mut CipherOperation,
        key: KeyId,
        alg: CipherAlg,
    ) -> PsaResult<()> {
        self.cipher_setup(operation, key, alg, true)
    }

    /// Begins a segmented decryption.
    pub fn cipher_decrypt_setup(
        &self,
        operation: &mut CipherOperation,
        key: KeyId,
        alg: CipherAlg,
    ) -> PsaResult<()> {
        self.cipher_setup(operation, key, alg, false)
    }

    fn cipher_setup(
        &self,
        operation: &mut CipherOperation,
        key: KeyId,
        alg: CipherAlg,
        encrypt: bool,
    ) -> PsaResult<()> {
        let entry = self.keys.get(key)?;
        let required = if encrypt {
            KeyUsage::ENCRYPT
        } else {
            KeyUsage::DECRYPT
        };
        if !entry.attributes().usage.contains(required) {
            return Err(PsaError::NotPermitted);
        }
        if operation.state != CipherState::Init {
            return Err(PsaError::BadState);
        }
        let params = policy::cipher_params(entry.attributes().key_type, alg)
            .ok_or(PsaError::NotSupported)?;

        operation.key = Some(key);
        operation.hw_algo = params.hw_algo;
        operation.mode = params.mode;
        operation.encrypt = encrypt;
        operation.block_size = params.block_size;
        operation.iv_size = params.iv_size;

        let asset_policy = self.qualify_policy(policy::cipher_asset_policy(&params, encrypt));
        if !asset_policy.is_empty() {
            match self.asset_alloc(asset_policy, params.iv_size) {
                Ok(asset_id) => operation.temp_asset = Some(asset_id),
                Err(err) => {
                    operation.key = None;
                    return Err(err);
                }
            }
        } else {
            operation.temp_asset = None;
        }

        operation.state = CipherState::Setup;
        let _ = self.keys.set_in_use(key, true);
        Ok(())
    }

    /// Generates a random IV, loads it into the operation's temp asset, and
    /// returns it to the caller. Only valid in `SETUP`, and only for modes
    /// that take an IV at all.
    pub fn cipher_generate_iv(
        &self,
        operation: &mut CipherOperation,
        iv: &mut [u8],
    ) -> PsaResult<usize> {
        if iv.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if iv.len() < operation.iv_size {
            return Err(PsaError::BufferTooSmall);
        }
        if operation.state != CipherState::Setup || operation.mode == CipherMode::Ecb {
            return Err(PsaError::BadState);
        }
        // XTS reaches SETUP without an asset; there is nowhere to load an IV.
        let asset_id = operation.temp_asset.ok_or(PsaError::InvalidArgument)?;

        let iv_size = operation.iv_size;
        self.entropy.fill(&mut iv[..iv_size])?;
        self.asset_load_plaintext(asset_id, &iv[..iv_size])?;
        operation.state = CipherState::IvLoaded;
        Ok(iv_size)
    }

    /// Loads a caller-supplied IV instead of generating one.
    pub fn cipher_set_iv(&self, operation: &mut CipherOperation, iv: &[u8]) -> PsaResult<()> {
        if iv.is_empty() || iv.len() > TOKEN_IV_SIZE {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state != CipherState::Setup || operation.mode == CipherMode::Ecb {
            return Err(PsaError::BadState);
        }
        let asset_id = operation.temp_asset.ok_or(PsaError::InvalidArgument)?;

        self.asset_load_plaintext(asset_id, iv)?;
        operation.state = CipherState::IvLoaded;
        Ok(())
    }

    /// Feeds input through the operation, returning the bytes written to
    /// `output` (zero when everything was absorbed into the leftover
    /// buffer). A failed exchange leaves the context usable only for
    /// `abort`.
    pub fn cipher_update(
        &self,
        operation: &mut CipherOperation,
        input: &[u8],
        output: &mut [u8],
    ) -> PsaResult<usize> {
        if input.is_empty() || output.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state == CipherState::Init || operation.block_size == 0 {
            return Err(PsaError::BadState);
        }
        // Only ECB may skip the IV step.
        if operation.state == CipherState::Setup && operation.mode != CipherMode::Ecb {
            return Err(PsaError::BadState);
        }
        let key = operation.key.ok_or(PsaError::InvalidHandle)?;
        let entry = self.keys.get(key)?;

        operation.state = CipherState::Update;

        let block_size = operation.block_size;
        let leftover = operation.leftover_nbytes;
        let plan = chunk::plan(leftover, input.len(), block_size);
        if plan.bytes_to_process == 0 {
            operation.leftover[leftover..leftover + input.len()].copy_from_slice(input);
            operation.leftover_nbytes += input.len();
            return Ok(0);
        }
        if output.len() < plan.bytes_to_process {
            return Err(PsaError::BufferTooSmall);
        }

        let mut remaining = plan.bytes_to_process;
        let mut written = 0usize;
        let mut input = input;

        // A pending leftover is topped up to exactly one block first.
        if leftover != 0 {
            let take = block_size - leftover;
            operation.leftover[leftover..block_size].copy_from_slice(&input[..take]);
            let block = operation.leftover[..block_size].to_vec();
            self.segmented_exchange(operation, entry.material(), &block, &mut output[..block_size])?;
            written += block_size;
            remaining -= block_size;
            input = &input[take..];
        }

        while remaining != 0 {
            let size = remaining.min(chunk::max_chunk(block_size));
            self.segmented_exchange(
                operation,
                entry.material(),
                &input[..size],
                &mut output[written..written + size],
            )?;
            written += size;
            remaining -= size;
            input = &input[size..];
        }

        operation.leftover_nbytes = plan.new_leftover;
        operation.leftover[..plan.new_leftover].copy_from_slice(&input[..plan.new_leftover]);
        Ok(written)
    }

    /// Flushes the held-back leftover as the final exchange and tears the
    /// operation down.
    pub fn cipher_finish(
        &self,
        operation: &mut CipherOperation,
        output: &mut [u8],
    ) -> PsaResult<usize> {
        if output.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state != CipherState::Update {
            return Err(PsaError::BadState);
        }
        let key = operation.key.ok_or(PsaError::InvalidHandle)?;
        let entry = self.keys.get(key)?;

        if operation.leftover_nbytes % operation.block_size != 0
            && matches!(operation.mode, CipherMode::Ecb | CipherMode::Cbc)
        {
            return Err(PsaError::InvalidPadding);
        }
        if output.len() < operation.block_size {
            return Err(PsaError::BufferTooSmall);
        }

        let nbytes = operation.leftover_nbytes;
        let block = operation.leftover[..nbytes].to_vec();
        self.segmented_exchange(operation, entry.material(), &block, &mut output[..nbytes])?;

        let _ = self.keys.set_in_use(key, false);
        if let Some(asset_id) = operation.temp_asset.take() {
            let _ = self.asset_free(asset_id);
        }
        operation.reset();
        Ok(nbytes)
    }

    /// Unconditional teardown: frees the temp asset (if any), clears the
    /// key-in-use flag, and zeroes the context. Safe to call in any state,
    /// including on a context that was never set up or was just aborted.
    pub fn cipher_abort(&self, operation: &mut CipherOperation) -> PsaResult<()> {
        if let Some(asset_id) = operation.temp_asset.take() {
            let _ = self.asset_free(asset_id);
        }
        if let Some(key) = operation.key.take() {
            let _ = self.keys.set_in_use(key, false);
        }
        operation.reset();
        Ok(())
    }

    fn segmented_exchange(
        &self,
        operation: &CipherOperation,
        key_material: &[u8],
        data: &[u8],
        output: &mut [u8],
    ) -> PsaResult<()> {
        let cmd = TokenCmd::Cipher(CipherCmd {
            algorithm: operation.hw_algo,
            mode: operation.mode,
            encrypt: operation.encrypt,
            key: key_material.to_vec(),
            temp_asset: operation.temp_asset.unwrap_or(AssetId::INVALID),
            iv: [0u8; TOKEN_IV_SIZE],
            data: data.to_vec(),
        });
        match self.exchange(&cmd)? {
            TokenRslt::Cipher { result, data } if result >= 0 => {
                if data.len() != output.len() {
                    return Err(PsaError::CorruptionDetected);
                }
                output.copy_from_slice(&data);
                Ok(())
            }
            rslt => {
                tracing::warn!(result = rslt.result(), "cipher exchange failed");
                Err(PsaError::CorruptionDetected)
            }
        }
    }
}
