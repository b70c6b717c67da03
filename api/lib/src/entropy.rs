// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The random source behind IV generation.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::PsaError;
use crate::error::PsaResult;

/// Source of random bytes for generated IVs.
///
/// Injectable so tests can pin IVs and reproduce exact ciphertexts.
pub trait Entropy: Send + Sync {
    /// Fills `buf` with random bytes.
    fn fill(&self, buf: &mut [u8]) -> PsaResult<()>;
}

/// Operating-system entropy.
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> PsaResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|_| PsaError::InsufficientEntropy)
    }
}
