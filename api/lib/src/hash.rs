// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Hash operations: one-shot and segmented digesting.
//!
//! Built on the same machinery as the MAC adapter, minus the key: the
//! leftover accumulator, the chaining-mode progression, the temp asset
//! sized to the algorithm's intermediate state, and the SHA-3 total-length
//! reduction all behave identically. One-shot hashing does not chunk; an
//! input too large for a single exchange is refused outright.

use psahsm_token::AssetId;
use psahsm_token::ChainMode;
use psahsm_token::HashAlgo;
use psahsm_token::HashCmd;
use psahsm_token::TokenCmd;
use psahsm_token::TokenRslt;
use zeroize::Zeroize;

use crate::adapter::PsaAdapter;
use crate::chunk;
use crate::error::PsaError;
use crate::error::PsaResult;
use crate::policy;
use crate::types::HashAlg;

/// Widest hash accumulation unit: the SHA3-224 sponge rate.
const MAX_HASH_BLOCK: usize = 144;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum HashState {
    Init,
    Setup,
    Update,
}

/// Caller-owned context of a segmented hash operation.
pub struct HashOperation {
    state: HashState,
    alg: HashAlg,
    hw_algo: HashAlgo,
    block_size: usize,
    temp_asset: Option<AssetId>,
    leftover: [u8; MAX_HASH_BLOCK],
    leftover_nbytes: usize,
    total_length: u64,
    update_done: bool,
}

impl HashOperation {
    /// A fresh context in the `INIT` state.
    pub fn new() -> Self {
        Self {
            state: HashState::Init,
            alg: HashAlg::Sha256,
            hw_algo: HashAlgo::Sha256,
            block_size: 0,
            temp_asset: None,
            leftover: [0u8; MAX_HASH_BLOCK],
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

impl Default for HashOperation {
    fn default() -> Self {
        Self::new()
    }
}

impl PsaAdapter {
    /// One-shot digest; returns the digest length written.
    pub fn hash_compute(
        &self,
        alg: HashAlg,
        input: &[u8],
        hash: &mut [u8],
    ) -> PsaResult<usize> {
        if input.is_empty() || hash.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let digest_nbytes = policy::digest_size(alg, false);
        if hash.len() < digest_nbytes {
            return Err(PsaError::BufferTooSmall);
        }
        let block_size = policy::hash_block_size(alg);
        // One-shot hashing is a single exchange; no chunking.
        if input.len() > chunk::max_chunk(block_size) {
            return Err(PsaError::NotSupported);
        }

        let total_length =
            policy::final_total_length(alg.is_sha3(), block_size, input.len() as u64);
        let cmd = TokenCmd::Hash(HashCmd {
            algorithm: policy::hash_algo(alg),
            mode: ChainMode::Init2Final,
            temp_asset: AssetId::INVALID,
            total_length,
            data: input.to_vec(),
        });
        match self.exchange(&cmd)? {
            TokenRslt::Hash { result, digest } if result >= 0 => {
                hash[..digest_nbytes].copy_from_slice(&digest[..digest_nbytes]);
                Ok(digest_nbytes)
            }
            rslt => {
                tracing::warn!(result = rslt.result(), "hash compute failed");
                Err(PsaError::CorruptionDetected)
            }
        }
    }

    /// One-shot digest-and-compare; a mismatch over the presented bytes is
    /// [`PsaError::InvalidSignature`].
    pub fn hash_compare(&self, alg: HashAlg, input: &[u8], hash: &[u8]) -> PsaResult<()> {
        if hash.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let mut digest = [0u8; 64];
        let digest_nbytes = self.hash_compute(alg, input, &mut digest)?;
        if hash.len() > digest_nbytes || hash[..] != digest[..hash.len()] {
            return Err(PsaError::InvalidSignature);
        }
        Ok(())
    }

    /// Begins a segmented digest, allocating the intermediate-state asset.
    pub fn hash_setup(&self, operation: &mut HashOperation, alg: HashAlg) -> PsaResult<()> {
        if operation.state != HashState::Init {
            return Err(PsaError::BadState);
        }

        let state_nbytes = policy::digest_size(alg, true);
        let asset_policy = self.qualify_policy(policy::hash_asset_policy(alg));
        let asset_id = self.asset_alloc(asset_policy, state_nbytes)?;

        operation.alg = alg;
        operation.hw_algo = policy::hash_algo(alg);
        operation.block_size = policy::hash_block_size(alg);
        operation.temp_asset = Some(asset_id);
        operation.state = HashState::Setup;
        Ok(())
    }

    /// Feeds message bytes into the digest.
    pub fn hash_update(&self, operation: &mut HashOperation, input: &[u8]) -> PsaResult<()> {
        if input.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state == HashState::Init || operation.block_size == 0 {
            return Err(PsaError::BadState);
        }

        operation.state = HashState::Update;

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
            self.hash_data_exchange(operation, &block)?;
            operation.total_length += block_size as u64;
            operation.update_done = true;
            remaining -= block_size;
            input = &input[take..];
        }

        while remaining != 0 {
            let size = remaining.min(chunk::max_chunk(block_size));
            self.hash_data_exchange(operation, &input[..size])?;
            operation.total_length += size as u64;
            operation.update_done = true;
            remaining -= size;
            input = &input[size..];
        }

        operation.leftover_nbytes = plan.new_leftover;
        operation.leftover[..plan.new_leftover].copy_from_slice(&input[..plan.new_leftover]);
        Ok(())
    }

    /// Flushes the leftover as the final exchange and writes the digest.
    /// Requires at least one preceding `update`.
    pub fn hash_finish(&self, operation: &mut HashOperation, hash: &mut [u8]) -> PsaResult<usize> {
        if hash.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        if operation.state != HashState::Update || operation.block_size == 0 {
            return Err(PsaError::BadState);
        }

        let digest_nbytes = policy::digest_size(operation.alg, false);
        if hash.len() < digest_nbytes {
            return Err(PsaError::BufferTooSmall);
        }

        let total = operation.total_length + operation.leftover_nbytes as u64;
        let total_length = policy::final_total_length(
            operation.alg.is_sha3(),
            operation.block_size,
            total,
        );
        let cmd = TokenCmd::Hash(HashCmd {
            algorithm: operation.hw_algo,
            mode: if operation.update_done {
                ChainMode::Cont2Final
            } else {
                ChainMode::Init2Final
            },
            temp_asset: if operation.update_done {
                operation.temp_asset.unwrap_or(AssetId::INVALID)
            } else {
                AssetId::INVALID
            },
            total_length,
            data: operation.leftover[..operation.leftover_nbytes].to_vec(),
        });
        match self.exchange(&cmd)? {
            TokenRslt::Hash { result, digest } if result >= 0 => {
                hash[..digest_nbytes].copy_from_slice(&digest[..digest_nbytes]);
                if let Some(asset_id) = operation.temp_asset.take() {
                    let _ = self.asset_free(asset_id);
                }
                operation.reset();
                Ok(digest_nbytes)
            }
            rslt => {
                tracing::warn!(result = rslt.result(), "hash finish failed");
                Err(PsaError::CorruptionDetected)
            }
        }
    }

    /// Finishes the digest and compares it against the presented bytes.
    pub fn hash_verify(&self, operation: &mut HashOperation, hash: &[u8]) -> PsaResult<()> {
        if hash.is_empty() {
            return Err(PsaError::InvalidArgument);
        }
        let mut digest = [0u8; 64];
        let digest_nbytes = self.hash_finish(operation, &mut digest)?;
        if hash.len() > digest_nbytes || hash[..] != digest[..hash.len()] {
            return Err(PsaError::InvalidSignature);
        }
        Ok(())
    }

    /// Unconditional teardown; safe in any state and idempotent.
    pub fn hash_abort(&self, operation: &mut HashOperation) -> PsaResult<()> {
        if let Some(asset_id) = operation.temp_asset.take() {
            let _ = self.asset_free(asset_id);
        }
        operation.reset();
        Ok(())
    }

    fn hash_data_exchange(&self, operation: &HashOperation, data: &[u8]) -> PsaResult<()> {
        let cmd = TokenCmd::Hash(HashCmd {
            algorithm: operation.hw_algo,
            mode: if operation.update_done {
                ChainMode::Cont2Cont
            } else {
                ChainMode::Init2Cont
            },
            temp_asset: operation.temp_asset.unwrap_or(AssetId::INVALID),
            total_length: 0,
            data: data.to_vec(),
        });
        let rslt = self.exchange(&cmd)?;
        if rslt.result() < 0 {
            tracing::warn!(result = rslt.result(), "hash update failed");
            return Err(PsaError::CorruptionDetected);
        }
        Ok(())
    }
}
