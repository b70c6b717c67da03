// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The synchronous token exchange seam.

use thiserror::Error;

use crate::TokenCmd;
use crate::TokenRslt;

/// Transport-level exchange failure.
///
/// Distinct from an engine-level failure: a transport error means the result
/// token was never populated, while an engine failure arrives as a negative
/// result code inside an otherwise successful exchange.
#[derive(Clone, Error, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// The engine mailbox did not accept the command token.
    #[error("engine mailbox unavailable")]
    MailboxUnavailable,

    /// The engine did not produce a result token.
    #[error("no result token from engine")]
    NoResult,

    /// The result token did not match the submitted command.
    #[error("result token mismatch")]
    ResultMismatch,
}

/// A synchronous command/result exchange with the crypto engine.
///
/// One call submits one command token and blocks until the matching result
/// token is available. Implementations must be usable from multiple
/// operations interleaved on one engine: all cross-exchange state belongs in
/// asset slots referenced by the commands, never in the transport.
pub trait TokenExchange: Send + Sync {
    /// Submits `cmd` and blocks for its result token.
    fn exchange(&self, cmd: &TokenCmd) -> Result<TokenRslt, TransportError>;
}
