// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! PSA-style symmetric-crypto adapter over an HSM token engine.
//!
//! The engine is a black box driven through fixed-layout command/result
//! tokens (see `psahsm-token`). This crate implements the PSA operation
//! surface on top of that seam: one-shot and segmented cipher, MAC, and
//! hash operations, with the partial-block buffering, temporary-asset
//! lifecycle, and state-machine enforcement the segmented protocol
//! requires. Collaborators (transport, key store, entropy) are injected;
//! `psahsm-sim` provides a software engine and `psahsm-mock` a recording
//! transport for tests.
//!
//! The adapter is single-threaded per operation context: contexts are
//! caller-owned values passed by mutable reference, and nothing in here
//! synchronizes concurrent use of one context or one key.

mod adapter;
mod asset;
mod chunk;
mod cipher;
mod entropy;
mod error;
mod hash;
mod keystore;
mod mac;
mod policy;
mod types;

pub use adapter::PsaAdapter;
pub use cipher::CipherOperation;
pub use entropy::Entropy;
pub use entropy::OsEntropy;
pub use error::PsaError;
pub use error::PsaResult;
pub use hash::HashOperation;
pub use keystore::KeyEntry;
pub use keystore::KeyStore;
pub use keystore::MemKeyStore;
pub use mac::MacOperation;
pub use types::CipherAlg;
pub use types::HashAlg;
pub use types::KeyAttributes;
pub use types::KeyId;
pub use types::KeyType;
pub use types::KeyUsage;
pub use types::MacAlg;
