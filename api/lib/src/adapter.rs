// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The adapter itself: collaborators wired together by injection.

use std::sync::Arc;

use psahsm_token::AssetPolicy;
use psahsm_token::TokenCmd;
use psahsm_token::TokenExchange;
use psahsm_token::TokenRslt;

use crate::entropy::Entropy;
use crate::entropy::OsEntropy;
use crate::error::PsaResult;
use crate::keystore::KeyStore;

/// PSA-style symmetric-crypto adapter over a token-exchange engine.
///
/// One instance drives one engine. The adapter itself holds no per-call
/// state; segmented operations keep theirs in caller-owned operation
/// contexts, and everything that must survive an exchange lives in engine
/// asset slots. Calls against a single operation context must be
/// serialized by the caller; the context is not internally synchronized.
pub struct PsaAdapter {
    pub(crate) transport: Arc<dyn TokenExchange>,
    pub(crate) keys: Arc<dyn KeyStore>,
    pub(crate) entropy: Box<dyn Entropy>,
    secure_access: bool,
}

impl PsaAdapter {
    /// An adapter with OS entropy and non-secure asset sourcing.
    pub fn new(transport: Arc<dyn TokenExchange>, keys: Arc<dyn KeyStore>) -> Self {
        Self {
            transport,
            keys,
            entropy: Box::new(OsEntropy),
            secure_access: false,
        }
    }

    /// Replaces the random source (tests pin IVs this way).
    pub fn with_entropy(mut self, entropy: Box<dyn Entropy>) -> Self {
        self.entropy = entropy;
        self
    }

    /// Marks this adapter as running from the secure world, which drops the
    /// non-secure-source bit from every asset policy it computes.
    pub fn with_secure_access(mut self, secure_access: bool) -> Self {
        self.secure_access = secure_access;
        self
    }

    /// Applies the source qualifier to a computed asset policy. The empty
    /// policy stays empty: it means "no temp asset", not "an asset with no
    /// rights".
    pub(crate) fn qualify_policy(&self, policy: AssetPolicy) -> AssetPolicy {
        if policy.is_empty() || self.secure_access {
            policy
        } else {
            policy | AssetPolicy::SOURCE_NON_SECURE
        }
    }

    /// One synchronous exchange. Transport failure maps to
    /// [`crate::PsaError::HardwareFailure`]; interpreting the embedded
    /// result code stays with the caller, whose mapping is operation
    /// specific.
    pub(crate) fn exchange(&self, cmd: &TokenCmd) -> PsaResult<TokenRslt> {
        Ok(self.transport.exchange(cmd)?)
    }
}
