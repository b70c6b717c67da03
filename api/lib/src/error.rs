// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use psahsm_token::TransportError;
use thiserror::Error;

/// Adapter error taxonomy.
///
/// Every adapter entry point returns exactly one of these; no call fails
/// partially. A segmented operation that reports an error is left usable
/// only for `abort`.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum PsaError {
    /// Null-equivalent or malformed argument: empty buffer, length that
    /// cannot be split into IV and payload, unsupported IV length.
    #[error("invalid argument")]
    InvalidArgument,

    /// The key's usage policy does not allow the requested direction.
    #[error("not permitted")]
    NotPermitted,

    /// Well-formed but unsupported algorithm / key-type combination.
    #[error("not supported")]
    NotSupported,

    /// Destination buffer is smaller than the produced output.
    #[error("buffer too small")]
    BufferTooSmall,

    /// Input not block-aligned for a mode that requires alignment.
    #[error("invalid padding")]
    InvalidPadding,

    /// Operation called out of sequence for its state machine.
    #[error("bad state")]
    BadState,

    /// Key id does not resolve, or an operation's stored key is stale.
    #[error("invalid key handle")]
    InvalidHandle,

    /// MAC or digest comparison failed.
    #[error("invalid signature")]
    InvalidSignature,

    /// The engine reported a failure it does not further qualify.
    #[error("corruption detected")]
    CorruptionDetected,

    /// The engine's asset store has no free slot.
    #[error("asset store full")]
    AssetStoreFull,

    /// The token exchange itself failed; no result token was produced.
    #[error("hardware failure: {0}")]
    HardwareFailure(#[from] TransportError),

    /// The random source could not produce bytes.
    #[error("insufficient entropy")]
    InsufficientEntropy,
}

/// Result alias used across the adapter.
pub type PsaResult<T> = Result<T, PsaError>;
