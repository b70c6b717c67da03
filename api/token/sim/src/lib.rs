// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Deterministic software implementation of the HSM token engine.
//!
//! This crate exists for development and testing: it implements the
//! [`psahsm_token::TokenExchange`] seam with real cryptography and a real
//! asset store, so adapter behavior (round-trips, segmented chaining,
//! length bookkeeping, resource cleanup) can be exercised end to end
//! without hardware.

mod crypto;
mod engine;
mod store;

pub use engine::SimEngine;
