// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The simulated token engine.
//!
//! One [`SimEngine`] stands in for the hardware crypto engine: it accepts
//! command tokens, runs real cryptography, and keeps every piece of
//! cross-exchange state in its asset store, the way the hardware keeps it in
//! asset slots. Engine-level failures surface as negative result codes in
//! the result token; the transport itself never fails here.

use parking_lot::Mutex;
use psahsm_token::result_code;
use psahsm_token::AssetId;
use psahsm_token::ChainMode;
use psahsm_token::CipherCmd;
use psahsm_token::CipherMode;
use psahsm_token::HashCmd;
use psahsm_token::MacCmd;
use psahsm_token::TokenCmd;
use psahsm_token::TokenExchange;
use psahsm_token::TokenRslt;
use psahsm_token::TransportError;
use psahsm_token::MAX_DMA_SIZE;
use psahsm_token::TOKEN_DIGEST_MAX;
use psahsm_token::TOKEN_MAC_MAX;

use crate::crypto::cipher;
use crate::crypto::cipher::BlockCore;
use crate::crypto::hash;
use crate::crypto::mac;
use crate::crypto::HashState;
use crate::crypto::MacState;
use crate::store::AssetData;
use crate::store::AssetStore;

/// Software rendition of the token engine.
pub struct SimEngine {
    store: Mutex<AssetStore>,
}

impl SimEngine {
    /// An engine with an empty asset store.
    pub fn new() -> Self {
        Self {
            store: Mutex::new(AssetStore::new()),
        }
    }

    /// Number of live asset slots; zero after every operation has cleaned up.
    pub fn live_assets(&self) -> usize {
        self.store.lock().len()
    }
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenExchange for SimEngine {
    fn exchange(&self, cmd: &TokenCmd) -> Result<TokenRslt, TransportError> {
        let (op, sub) = cmd.codes();
        tracing::debug!(opcode = ?op, subcode = ?sub, "engine exchange");

        let mut store = self.store.lock();
        let rslt = match cmd {
            TokenCmd::AssetCreate { policy, size } => match store.create(*policy, *size) {
                Ok(asset_id) => TokenRslt::AssetCreate {
                    result: result_code::SUCCESS,
                    asset_id,
                },
                Err(result) => TokenRslt::AssetCreate {
                    result,
                    asset_id: AssetId::INVALID,
                },
            },
            TokenCmd::AssetLoad { asset_id, data } => generic(store.load(*asset_id, data)),
            TokenCmd::AssetDelete { asset_id } => generic(store.delete(*asset_id)),
            TokenCmd::Cipher(c) => exec_cipher(&mut store, c).unwrap_or_else(fail),
            TokenCmd::Mac(c) => exec_mac(&mut store, c).unwrap_or_else(fail),
            TokenCmd::Hash(c) => exec_hash(&mut store, c).unwrap_or_else(fail),
        };
        if rslt.is_err() {
            tracing::debug!(result = rslt.result(), "engine reports failure");
        }
        Ok(rslt)
    }
}

fn generic(outcome: Result<(), i32>) -> TokenRslt {
    TokenRslt::Generic {
        result: match outcome {
            Ok(()) => result_code::SUCCESS,
            Err(code) => code,
        },
    }
}

fn fail(code: i32) -> TokenRslt {
    TokenRslt::Generic { result: code }
}

/// Reads a chaining block (IV / counter) out of an asset slot.
fn chain_block(store: &AssetStore, asset_id: AssetId, len: usize) -> Result<Vec<u8>, i32> {
    match &store.get(asset_id)?.data {
        AssetData::Bytes(bytes) if bytes.len() == len => Ok(bytes.clone()),
        _ => Err(result_code::INVALID_PARAMETER),
    }
}

fn exec_cipher(store: &mut AssetStore, cmd: &CipherCmd) -> Result<TokenRslt, i32> {
    if cmd.data.is_empty() || cmd.data.len() > MAX_DMA_SIZE {
        return Err(result_code::INVALID_LENGTH);
    }

    let data = match cmd.mode {
        CipherMode::Xts => {
            cipher::xts(cmd.algorithm, cmd.encrypt, &cmd.key, &cmd.iv, &cmd.data)?
        }
        CipherMode::Ecb => {
            let core = BlockCore::new(cmd.algorithm, &cmd.key)?;
            cipher::ecb(&core, cmd.encrypt, &cmd.data)?
        }
        CipherMode::Cbc => {
            let core = BlockCore::new(cmd.algorithm, &cmd.key)?;
            let mut chain = chain_block(store, cmd.temp_asset, core.block_size())?;
            let out = cipher::cbc(&core, cmd.encrypt, &mut chain, &cmd.data)?;
            store.get_mut(cmd.temp_asset)?.data = AssetData::Bytes(chain);
            out
        }
        CipherMode::Ctr => {
            let core = BlockCore::new(cmd.algorithm, &cmd.key)?;
            let mut counter = chain_block(store, cmd.temp_asset, core.block_size())?;
            let out = cipher::ctr32(&core, &mut counter, &cmd.data)?;
            store.get_mut(cmd.temp_asset)?.data = AssetData::Bytes(counter);
            out
        }
    };

    Ok(TokenRslt::Cipher {
        result: result_code::SUCCESS,
        data,
    })
}

fn exec_mac(store: &mut AssetStore, cmd: &MacCmd) -> Result<TokenRslt, i32> {
    if cmd.data.len() > MAX_DMA_SIZE {
        return Err(result_code::INVALID_LENGTH);
    }
    let block = mac::block_len(cmd.algorithm);

    match cmd.mode {
        ChainMode::Init2Final => {
            let mut state = MacState::init(cmd.algorithm, &cmd.key)?;
            state.absorb(&cmd.data)?;
            finish_mac(cmd, state)
        }
        ChainMode::Init2Cont => {
            check_cont_alignment(&cmd.data, block)?;
            let mut state = MacState::init(cmd.algorithm, &cmd.key)?;
            state.absorb(&cmd.data)?;
            let asset = store.get_mut(cmd.temp_asset)?;
            if asset.size != mac::state_len(cmd.algorithm) {
                return Err(result_code::INVALID_PARAMETER);
            }
            asset.data = AssetData::Mac(state);
            Ok(TokenRslt::Generic {
                result: result_code::SUCCESS,
            })
        }
        ChainMode::Cont2Cont => {
            check_cont_alignment(&cmd.data, block)?;
            let asset = store.get_mut(cmd.temp_asset)?;
            match &mut asset.data {
                AssetData::Mac(state) => {
                    state.absorb(&cmd.data)?;
                    Ok(TokenRslt::Generic {
                        result: result_code::SUCCESS,
                    })
                }
                _ => Err(result_code::INVALID_PARAMETER),
            }
        }
        ChainMode::Cont2Final => {
            let mut state = match &store.get(cmd.temp_asset)?.data {
                AssetData::Mac(state) => state.clone(),
                _ => return Err(result_code::INVALID_PARAMETER),
            };
            state.absorb(&cmd.data)?;
            finish_mac(cmd, state)
        }
    }
}

/// Continuation exchanges must carry a whole number of blocks; the engine
/// cannot buffer a partial block for a later exchange.
fn check_cont_alignment(data: &[u8], block: usize) -> Result<(), i32> {
    if data.is_empty() || data.len() % block != 0 {
        Err(result_code::INVALID_LENGTH)
    } else {
        Ok(())
    }
}

fn finish_mac(cmd: &MacCmd, state: MacState) -> Result<TokenRslt, i32> {
    if mac::expected_total(cmd.algorithm, state.absorbed()) != cmd.total_length {
        return Err(result_code::INVALID_LENGTH);
    }

    let digest = state.finalize();
    let digest_len = mac::digest_len(cmd.algorithm);
    if cmd.verify {
        if cmd.mac.len() != digest_len || cmd.mac[..] != digest[..digest_len] {
            return Ok(TokenRslt::Generic {
                result: result_code::VERIFY_MISMATCH,
            });
        }
        Ok(TokenRslt::Generic {
            result: result_code::SUCCESS,
        })
    } else {
        let mut field = [0u8; TOKEN_MAC_MAX];
        field[..digest.len()].copy_from_slice(&digest);
        Ok(TokenRslt::Mac {
            result: result_code::SUCCESS,
            mac: field,
        })
    }
}

fn exec_hash(store: &mut AssetStore, cmd: &HashCmd) -> Result<TokenRslt, i32> {
    if cmd.data.len() > MAX_DMA_SIZE {
        return Err(result_code::INVALID_LENGTH);
    }
    let block = hash::block_len(cmd.algorithm);

    match cmd.mode {
        ChainMode::Init2Final => {
            let mut state = HashState::init(cmd.algorithm);
            state.absorb(&cmd.data);
            finish_hash(cmd, state)
        }
        ChainMode::Init2Cont => {
            check_cont_alignment(&cmd.data, block)?;
            let mut state = HashState::init(cmd.algorithm);
            state.absorb(&cmd.data);
            let asset = store.get_mut(cmd.temp_asset)?;
            if asset.size != hash::state_len(cmd.algorithm) {
                return Err(result_code::INVALID_PARAMETER);
            }
            asset.data = AssetData::Hash(state);
            Ok(TokenRslt::Generic {
                result: result_code::SUCCESS,
            })
        }
        ChainMode::Cont2Cont => {
            check_cont_alignment(&cmd.data, block)?;
            let asset = store.get_mut(cmd.temp_asset)?;
            match &mut asset.data {
                AssetData::Hash(state) => {
                    state.absorb(&cmd.data);
                    Ok(TokenRslt::Generic {
                        result: result_code::SUCCESS,
                    })
                }
                _ => Err(result_code::INVALID_PARAMETER),
            }
        }
        ChainMode::Cont2Final => {
            let mut state = match &store.get(cmd.temp_asset)?.data {
                AssetData::Hash(state) => state.clone(),
                _ => return Err(result_code::INVALID_PARAMETER),
            };
            state.absorb(&cmd.data);
            finish_hash(cmd, state)
        }
    }
}

fn finish_hash(cmd: &HashCmd, state: HashState) -> Result<TokenRslt, i32> {
    if hash::expected_total(cmd.algorithm, state.absorbed()) != cmd.total_length {
        return Err(result_code::INVALID_LENGTH);
    }

    let digest = state.finalize();
    let mut field = [0u8; TOKEN_DIGEST_MAX];
    field[..digest.len()].copy_from_slice(&digest);
    Ok(TokenRslt::Hash {
        result: result_code::SUCCESS,
        digest: field,
    })
}
