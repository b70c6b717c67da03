// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! MAC execution for the simulated engine.
//!
//! A segmented MAC lives in an asset slot as a running [`MacState`]; the
//! engine never holds MAC state of its own between exchanges. Final
//! exchanges cross-check the command's total-length field against the bytes
//! actually absorbed, which is what makes the adapter's length bookkeeping
//! (including the SHA-3 rate reduction) an observable contract rather than
//! dead reckoning.

use cmac::Cmac;
use hmac::Hmac;
use hmac::Mac;
use psahsm_token::result_code;
use psahsm_token::CipherAlgo;
use psahsm_token::MacAlgo;
use sha1::Sha1;
use sha2::Sha224;
use sha2::Sha256;
use sha2::Sha384;
use sha2::Sha512;
use sha3::Sha3_224;
use sha3::Sha3_256;
use sha3::Sha3_384;
use sha3::Sha3_512;

use crate::crypto::cipher::BlockCore;

/// Running CBC-MAC state: last chaining block plus the key to continue with.
#[derive(Clone)]
pub(crate) struct CbcMacCore {
    key: Vec<u8>,
    chain: [u8; 16],
}

#[derive(Clone)]
enum MacKind {
    HmacSha1(Hmac<Sha1>),
    HmacSha224(Hmac<Sha224>),
    HmacSha256(Hmac<Sha256>),
    HmacSha384(Hmac<Sha384>),
    HmacSha512(Hmac<Sha512>),
    HmacSha3_224(Hmac<Sha3_224>),
    HmacSha3_256(Hmac<Sha3_256>),
    HmacSha3_384(Hmac<Sha3_384>),
    HmacSha3_512(Hmac<Sha3_512>),
    Cmac128(Cmac<aes::Aes128>),
    Cmac192(Cmac<aes::Aes192>),
    Cmac256(Cmac<aes::Aes256>),
    CbcMac(CbcMacCore),
}

/// A running MAC computation, stored in an asset slot between exchanges.
#[derive(Clone)]
pub(crate) struct MacState {
    kind: MacKind,
    absorbed: u64,
}

/// Hash block length (SHA-3: sponge rate) per MAC algorithm; the unit of
/// continuation-exchange alignment.
pub(crate) fn block_len(algorithm: MacAlgo) -> usize {
    match algorithm {
        MacAlgo::HmacSha1 | MacAlgo::HmacSha224 | MacAlgo::HmacSha256 => 64,
        MacAlgo::HmacSha384 | MacAlgo::HmacSha512 => 128,
        MacAlgo::HmacSha3_224 => 144,
        MacAlgo::HmacSha3_256 => 136,
        MacAlgo::HmacSha3_384 => 104,
        MacAlgo::HmacSha3_512 => 72,
        MacAlgo::AesCmac | MacAlgo::AesCbcMac | MacAlgo::AriaCmac | MacAlgo::AriaCbcMac => 16,
    }
}

/// Intermediate state footprint the engine expects the MAC asset to have.
pub(crate) fn state_len(algorithm: MacAlgo) -> usize {
    match algorithm {
        MacAlgo::HmacSha1 => 20,
        MacAlgo::HmacSha224 | MacAlgo::HmacSha256 => 32,
        MacAlgo::HmacSha384 | MacAlgo::HmacSha512 => 64,
        MacAlgo::HmacSha3_224
        | MacAlgo::HmacSha3_256
        | MacAlgo::HmacSha3_384
        | MacAlgo::HmacSha3_512 => 200,
        MacAlgo::AesCmac | MacAlgo::AesCbcMac | MacAlgo::AriaCmac | MacAlgo::AriaCbcMac => 16,
    }
}

/// Output digest length per MAC algorithm.
pub(crate) fn digest_len(algorithm: MacAlgo) -> usize {
    match algorithm {
        MacAlgo::HmacSha1 => 20,
        MacAlgo::HmacSha224 | MacAlgo::HmacSha3_224 => 28,
        MacAlgo::HmacSha256 | MacAlgo::HmacSha3_256 => 32,
        MacAlgo::HmacSha384 | MacAlgo::HmacSha3_384 => 48,
        MacAlgo::HmacSha512 | MacAlgo::HmacSha3_512 => 64,
        MacAlgo::AesCmac | MacAlgo::AesCbcMac | MacAlgo::AriaCmac | MacAlgo::AriaCbcMac => 16,
    }
}

fn bad_key<E>(_: E) -> i32 {
    result_code::INVALID_PARAMETER
}

impl MacState {
    /// Keys a fresh MAC state from the command's inline key.
    ///
    /// ARIA MACs are mapped by the adapter but not provisioned in this
    /// engine build.
    pub(crate) fn init(algorithm: MacAlgo, key: &[u8]) -> Result<Self, i32> {
        let kind = match algorithm {
            MacAlgo::HmacSha1 => {
                MacKind::HmacSha1(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha224 => {
                MacKind::HmacSha224(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha256 => {
                MacKind::HmacSha256(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha384 => {
                MacKind::HmacSha384(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha512 => {
                MacKind::HmacSha512(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha3_224 => {
                MacKind::HmacSha3_224(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha3_256 => {
                MacKind::HmacSha3_256(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha3_384 => {
                MacKind::HmacSha3_384(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::HmacSha3_512 => {
                MacKind::HmacSha3_512(Hmac::new_from_slice(key).map_err(bad_key)?)
            }
            MacAlgo::AesCmac => match key.len() {
                16 => MacKind::Cmac128(Cmac::new_from_slice(key).map_err(bad_key)?),
                24 => MacKind::Cmac192(Cmac::new_from_slice(key).map_err(bad_key)?),
                32 => MacKind::Cmac256(Cmac::new_from_slice(key).map_err(bad_key)?),
                _ => return Err(result_code::INVALID_PARAMETER),
            },
            MacAlgo::AesCbcMac => {
                // Validates the key length up front so absorb cannot fail.
                let _ = BlockCore::new(CipherAlgo::Aes, key)?;
                MacKind::CbcMac(CbcMacCore {
                    key: key.to_vec(),
                    chain: [0u8; 16],
                })
            }
            MacAlgo::AriaCmac | MacAlgo::AriaCbcMac => {
                return Err(result_code::INVALID_ALGORITHM);
            }
        };
        Ok(Self { kind, absorbed: 0 })
    }

    /// Absorbs payload bytes into the running state.
    ///
    /// CBC-MAC absorbs whole blocks and zero-pads a trailing partial block,
    /// which only final exchanges may carry.
    pub(crate) fn absorb(&mut self, data: &[u8]) -> Result<(), i32> {
        self.absorbed += data.len() as u64;
        match &mut self.kind {
            MacKind::HmacSha1(m) => m.update(data),
            MacKind::HmacSha224(m) => m.update(data),
            MacKind::HmacSha256(m) => m.update(data),
            MacKind::HmacSha384(m) => m.update(data),
            MacKind::HmacSha512(m) => m.update(data),
            MacKind::HmacSha3_224(m) => m.update(data),
            MacKind::HmacSha3_256(m) => m.update(data),
            MacKind::HmacSha3_384(m) => m.update(data),
            MacKind::HmacSha3_512(m) => m.update(data),
            MacKind::Cmac128(m) => m.update(data),
            MacKind::Cmac192(m) => m.update(data),
            MacKind::Cmac256(m) => m.update(data),
            MacKind::CbcMac(core) => {
                let cipher = BlockCore::new(CipherAlgo::Aes, &core.key)?;
                for chunk in data.chunks(16) {
                    let mut block = [0u8; 16];
                    block[..chunk.len()].copy_from_slice(chunk);
                    for (c, b) in core.chain.iter_mut().zip(block.iter()) {
                        *c ^= *b;
                    }
                    cipher.encrypt_block(&mut core.chain);
                }
            }
        }
        Ok(())
    }

    /// Bytes absorbed so far across all exchanges of this operation.
    pub(crate) fn absorbed(&self) -> u64 {
        self.absorbed
    }

    /// Consumes the state and produces the full-width digest.
    pub(crate) fn finalize(self) -> Vec<u8> {
        match self.kind {
            MacKind::HmacSha1(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha224(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha256(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha384(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha512(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha3_224(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha3_256(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha3_384(m) => m.finalize().into_bytes().to_vec(),
            MacKind::HmacSha3_512(m) => m.finalize().into_bytes().to_vec(),
            MacKind::Cmac128(m) => m.finalize().into_bytes().to_vec(),
            MacKind::Cmac192(m) => m.finalize().into_bytes().to_vec(),
            MacKind::Cmac256(m) => m.finalize().into_bytes().to_vec(),
            MacKind::CbcMac(core) => core.chain.to_vec(),
        }
    }
}

/// The total-length value a well-behaved caller puts in a final exchange:
/// the true message length, except for SHA-3 MACs where it is reduced
/// modulo the sponge rate (full rate when the remainder is zero).
pub(crate) fn expected_total(algorithm: MacAlgo, absorbed: u64) -> u64 {
    if algorithm.is_sha3() {
        let rate = block_len(algorithm) as u64;
        match absorbed % rate {
            0 => rate,
            r => r,
        }
    } else {
        absorbed
    }
}
