// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(missing_docs)]

//! Command/result token protocol for the HSM crypto engine.
//!
//! The engine is a black box driven through fixed-layout request/response
//! tokens. This crate owns the protocol vocabulary shared by the adapter,
//! the software engine, and the mock transport: opcodes, algorithm codes,
//! chaining modes, the asset policy mask, the token structures themselves,
//! and the [`TokenExchange`] seam they travel through.

mod cmd;
mod policy;
mod transport;

pub use cmd::*;
pub use policy::*;
pub use transport::*;
