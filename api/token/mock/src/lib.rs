// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Mock token transport for development and testing.
//!
//! [`MockTransport`] bypasses any real engine: it records every command
//! token it is handed and answers from a script of queued results, falling
//! back to a canned success when the script is empty. Tests use the recorded
//! commands to assert on protocol fields (chaining modes, total-length
//! values, chunk sizes, asset references) and use the script to drive the
//! adapter down transport-failure and engine-failure paths.

use std::collections::VecDeque;

use parking_lot::Mutex;
use psahsm_token::result_code;
use psahsm_token::AssetId;
use psahsm_token::ChainMode;
use psahsm_token::TokenCmd;
use psahsm_token::TokenExchange;
use psahsm_token::TokenRslt;
use psahsm_token::TransportError;
use psahsm_token::TOKEN_DIGEST_MAX;
use psahsm_token::TOKEN_MAC_MAX;

/// A recording, scriptable [`TokenExchange`] implementation.
pub struct MockTransport {
    commands: Mutex<Vec<TokenCmd>>,
    script: Mutex<VecDeque<Result<TokenRslt, TransportError>>>,
    next_asset_id: Mutex<u32>,
}

impl MockTransport {
    /// A transport with an empty recording and an empty script.
    pub fn new() -> Self {
        Self {
            commands: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            next_asset_id: Mutex::new(1),
        }
    }

    /// Queues the outcome for an upcoming exchange. Queued outcomes are
    /// consumed in order, before any canned fallback.
    pub fn push_result(&self, outcome: Result<TokenRslt, TransportError>) {
        self.script.lock().push_back(outcome);
    }

    /// All commands recorded so far, oldest first.
    pub fn commands(&self) -> Vec<TokenCmd> {
        self.commands.lock().clone()
    }

    /// Number of exchanges performed.
    pub fn command_count(&self) -> usize {
        self.commands.lock().len()
    }

    /// Drops the recording, keeping any unconsumed script.
    pub fn clear_commands(&self) {
        self.commands.lock().clear();
    }

    /// The canned success result matching a command's expected shape.
    fn canned(&self, cmd: &TokenCmd) -> TokenRslt {
        match cmd {
            TokenCmd::Cipher(c) => TokenRslt::Cipher {
                result: result_code::SUCCESS,
                data: vec![0u8; c.data.len()],
            },
            TokenCmd::Mac(c) => {
                if !c.verify && matches!(c.mode, ChainMode::Init2Final | ChainMode::Cont2Final) {
                    TokenRslt::Mac {
                        result: result_code::SUCCESS,
                        mac: [0u8; TOKEN_MAC_MAX],
                    }
                } else {
                    TokenRslt::Generic {
                        result: result_code::SUCCESS,
                    }
                }
            }
            TokenCmd::Hash(c) => {
                if matches!(c.mode, ChainMode::Init2Final | ChainMode::Cont2Final) {
                    TokenRslt::Hash {
                        result: result_code::SUCCESS,
                        digest: [0u8; TOKEN_DIGEST_MAX],
                    }
                } else {
                    TokenRslt::Generic {
                        result: result_code::SUCCESS,
                    }
                }
            }
            TokenCmd::AssetCreate { .. } => {
                let mut next = self.next_asset_id.lock();
                let asset_id = AssetId(*next);
                *next += 1;
                TokenRslt::AssetCreate {
                    result: result_code::SUCCESS,
                    asset_id,
                }
            }
            TokenCmd::AssetLoad { .. } | TokenCmd::AssetDelete { .. } => TokenRslt::Generic {
                result: result_code::SUCCESS,
            },
        }
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenExchange for MockTransport {
    fn exchange(&self, cmd: &TokenCmd) -> Result<TokenRslt, TransportError> {
        self.commands.lock().push(cmd.clone());
        if let Some(outcome) = self.script.lock().pop_front() {
            return outcome;
        }
        Ok(self.canned(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_replays_in_order() {
        let mock = MockTransport::new();
        mock.push_result(Ok(TokenRslt::Generic { result: -1 }));

        let cmd = TokenCmd::AssetDelete {
            asset_id: AssetId(7),
        };
        let first = mock.exchange(&cmd).unwrap();
        assert_eq!(first.result(), -1);

        // Script drained; canned success takes over.
        let second = mock.exchange(&cmd).unwrap();
        assert_eq!(second.result(), result_code::SUCCESS);

        assert_eq!(mock.command_count(), 2);
        assert!(matches!(
            mock.commands()[0],
            TokenCmd::AssetDelete { asset_id: AssetId(7) }
        ));
    }

    #[test]
    fn canned_asset_ids_are_distinct() {
        let mock = MockTransport::new();
        let cmd = TokenCmd::AssetCreate {
            policy: psahsm_token::AssetPolicy::SYM_TEMP,
            size: 16,
        };
        let a = mock.exchange(&cmd).unwrap();
        let b = mock.exchange(&cmd).unwrap();
        match (a, b) {
            (
                TokenRslt::AssetCreate { asset_id: a, .. },
                TokenRslt::AssetCreate { asset_id: b, .. },
            ) => assert_ne!(a, b),
            other => panic!("unexpected results {:?}", other),
        }
    }

    #[test]
    fn transport_errors_are_scriptable() {
        let mock = MockTransport::new();
        mock.push_result(Err(TransportError::NoResult));
        let cmd = TokenCmd::AssetDelete {
            asset_id: AssetId(1),
        };
        assert_eq!(mock.exchange(&cmd).unwrap_err(), TransportError::NoResult);
    }
}
