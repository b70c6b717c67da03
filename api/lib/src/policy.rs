// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Pure mapping tables: API algorithm + key type to engine algorithm codes,
//! block/IV/digest/state geometry, and asset-policy masks.
//!
//! Everything here is a total function over its enum inputs; "the engine
//! has no code for this combination" is an explicit `None`, never a zero
//! sentinel.

use psahsm_token::AssetPolicy;
use psahsm_token::CipherAlgo;
use psahsm_token::CipherMode;
use psahsm_token::HashAlgo;
use psahsm_token::MacAlgo;

use crate::types::CipherAlg;
use crate::types::HashAlg;
use crate::types::KeyType;
use crate::types::MacAlg;

/// Resolved cipher geometry for one (key type, algorithm) pairing.
pub(crate) struct CipherParams {
    pub hw_algo: CipherAlgo,
    pub mode: CipherMode,
    pub block_size: usize,
    pub iv_size: usize,
}

/// Maps a cipher request onto the engine, or `None` where the pairing is
/// unsupported (CTR and XTS never run on 3DES; XTS is AES only).
pub(crate) fn cipher_params(key_type: KeyType, alg: CipherAlg) -> Option<CipherParams> {
    let hw_algo = match (alg, key_type) {
        (CipherAlg::Ctr, KeyType::Aes) => CipherAlgo::Aes,
        (CipherAlg::Ctr, KeyType::Aria) => CipherAlgo::Aria,
        (CipherAlg::Xts, KeyType::Aes) => CipherAlgo::Aes,
        (CipherAlg::Ecb | CipherAlg::Cbc, KeyType::Aes) => CipherAlgo::Aes,
        (CipherAlg::Ecb | CipherAlg::Cbc, KeyType::Aria) => CipherAlgo::Aria,
        (CipherAlg::Ecb | CipherAlg::Cbc, KeyType::Des) => CipherAlgo::Tdes,
        _ => return None,
    };
    let mode = match alg {
        CipherAlg::Ecb => CipherMode::Ecb,
        CipherAlg::Cbc => CipherMode::Cbc,
        CipherAlg::Ctr => CipherMode::Ctr,
        CipherAlg::Xts => CipherMode::Xts,
    };
    let block_size = match hw_algo {
        CipherAlgo::Tdes => 8,
        _ => 16,
    };
    let iv_size = match alg {
        CipherAlg::Ecb => 0,
        _ => block_size,
    };
    Some(CipherParams {
        hw_algo,
        mode,
        block_size,
        iv_size,
    })
}

fn cipher_algo_flag(hw_algo: CipherAlgo) -> AssetPolicy {
    match hw_algo {
        CipherAlgo::Aes => AssetPolicy::ALGO_AES,
        CipherAlgo::Tdes => AssetPolicy::ALGO_TDES,
        CipherAlgo::Aria => AssetPolicy::ALGO_ARIA,
    }
}

/// Asset policy for a cipher operation's chained-state slot.
///
/// ECB has no chained state and XTS carries its tweak inline, so both map
/// to the empty policy, which the adapters read as "no temp asset".
pub(crate) fn cipher_asset_policy(params: &CipherParams, encrypt: bool) -> AssetPolicy {
    let mode_flag = match params.mode {
        CipherMode::Cbc => AssetPolicy::MODE_CBC,
        CipherMode::Ctr => AssetPolicy::MODE_CTR,
        CipherMode::Ecb | CipherMode::Xts => return AssetPolicy::empty(),
    };
    let dir = if encrypt {
        AssetPolicy::DIR_ENCRYPT
    } else {
        AssetPolicy::DIR_DECRYPT
    };
    AssetPolicy::SYM_TEMP
        | AssetPolicy::CIPHER_BULK
        | dir
        | mode_flag
        | cipher_algo_flag(params.hw_algo)
}

/// Resolved MAC parameters for one (algorithm, key type) pairing.
pub(crate) struct MacParams {
    pub hw_algo: MacAlgo,
    /// Leftover-accumulation unit: the hash block length (SHA-3: rate) for
    /// HMAC, the maximum cipher block size for cipher MACs.
    pub block_size: usize,
}

/// Maps a MAC request onto the engine.
pub(crate) fn mac_params(alg: MacAlg, key_type: KeyType) -> Option<MacParams> {
    let hw_algo = match alg {
        MacAlg::Hmac(hash) => match hash {
            HashAlg::Sha1 => MacAlgo::HmacSha1,
            HashAlg::Sha224 => MacAlgo::HmacSha224,
            HashAlg::Sha256 => MacAlgo::HmacSha256,
            HashAlg::Sha384 => MacAlgo::HmacSha384,
            HashAlg::Sha512 => MacAlgo::HmacSha512,
            HashAlg::Sha3_224 => MacAlgo::HmacSha3_224,
            HashAlg::Sha3_256 => MacAlgo::HmacSha3_256,
            HashAlg::Sha3_384 => MacAlgo::HmacSha3_384,
            HashAlg::Sha3_512 => MacAlgo::HmacSha3_512,
        },
        MacAlg::Cmac => match key_type {
            KeyType::Aria => MacAlgo::AriaCmac,
            _ => MacAlgo::AesCmac,
        },
        MacAlg::CbcMac => match key_type {
            KeyType::Aria => MacAlgo::AriaCbcMac,
            _ => MacAlgo::AesCbcMac,
        },
    };
    let block_size = match alg {
        MacAlg::Hmac(hash) => hash_block_size(hash),
        MacAlg::Cmac | MacAlg::CbcMac => 16,
    };
    Some(MacParams {
        hw_algo,
        block_size,
    })
}

/// MAC byte width: the digest the caller receives, or (`for_update`) the
/// intermediate state the engine parks in the temp asset between exchanges.
///
/// SHA-224 and SHA-384 share compression state with their wider parents, so
/// their update width is the parent's; SHA-3 parks the whole 1600-bit
/// permutation state regardless of digest width.
pub(crate) fn mac_size(hw_algo: MacAlgo, for_update: bool) -> usize {
    match hw_algo {
        MacAlgo::HmacSha1 => 20,
        MacAlgo::HmacSha224 => {
            if for_update {
                32
            } else {
                28
            }
        }
        MacAlgo::HmacSha256 => 32,
        MacAlgo::HmacSha384 => {
            if for_update {
                64
            } else {
                48
            }
        }
        MacAlgo::HmacSha512 => 64,
        MacAlgo::HmacSha3_224 => {
            if for_update {
                200
            } else {
                28
            }
        }
        MacAlgo::HmacSha3_256 => {
            if for_update {
                200
            } else {
                32
            }
        }
        MacAlgo::HmacSha3_384 => {
            if for_update {
                200
            } else {
                48
            }
        }
        MacAlgo::HmacSha3_512 => {
            if for_update {
                200
            } else {
                64
            }
        }
        MacAlgo::AesCmac | MacAlgo::AesCbcMac | MacAlgo::AriaCmac | MacAlgo::AriaCbcMac => 16,
    }
}

fn mac_hash_flag(hw_algo: MacAlgo) -> AssetPolicy {
    match hw_algo {
        MacAlgo::HmacSha1 => AssetPolicy::HASH_SHA1,
        MacAlgo::HmacSha224 => AssetPolicy::HASH_SHA224,
        MacAlgo::HmacSha256 => AssetPolicy::HASH_SHA256,
        MacAlgo::HmacSha384 => AssetPolicy::HASH_SHA384,
        MacAlgo::HmacSha512 => AssetPolicy::HASH_SHA512,
        MacAlgo::HmacSha3_224 => AssetPolicy::HASH_SHA3_224,
        MacAlgo::HmacSha3_256 => AssetPolicy::HASH_SHA3_256,
        MacAlgo::HmacSha3_384 => AssetPolicy::HASH_SHA3_384,
        MacAlgo::HmacSha3_512 => AssetPolicy::HASH_SHA3_512,
        _ => AssetPolicy::empty(),
    }
}

/// Asset policy for a running MAC state.
pub(crate) fn mac_asset_policy(hw_algo: MacAlgo, verify: bool) -> AssetPolicy {
    let dir = if verify {
        AssetPolicy::DIR_DECRYPT
    } else {
        AssetPolicy::DIR_ENCRYPT
    };
    let class = match hw_algo {
        MacAlgo::AesCmac | MacAlgo::AriaCmac => {
            AssetPolicy::MAC_CIPHER | AssetPolicy::MODE_CMAC
        }
        MacAlgo::AesCbcMac | MacAlgo::AriaCbcMac => {
            AssetPolicy::MAC_CIPHER | AssetPolicy::MODE_CBCMAC
        }
        _ => AssetPolicy::MAC_HASH | mac_hash_flag(hw_algo),
    };
    let algo = match hw_algo {
        MacAlgo::AesCmac | MacAlgo::AesCbcMac => AssetPolicy::ALGO_AES,
        MacAlgo::AriaCmac | MacAlgo::AriaCbcMac => AssetPolicy::ALGO_ARIA,
        _ => AssetPolicy::empty(),
    };
    dir | class | algo
}

/// Maps an API hash algorithm onto the engine code.
pub(crate) fn hash_algo(alg: HashAlg) -> HashAlgo {
    match alg {
        HashAlg::Sha1 => HashAlgo::Sha1,
        HashAlg::Sha224 => HashAlgo::Sha224,
        HashAlg::Sha256 => HashAlgo::Sha256,
        HashAlg::Sha384 => HashAlgo::Sha384,
        HashAlg::Sha512 => HashAlgo::Sha512,
        HashAlg::Sha3_224 => HashAlgo::Sha3_224,
        HashAlg::Sha3_256 => HashAlgo::Sha3_256,
        HashAlg::Sha3_384 => HashAlgo::Sha3_384,
        HashAlg::Sha3_512 => HashAlgo::Sha3_512,
    }
}

/// Hash block length; for SHA-3 the sponge rate.
pub(crate) fn hash_block_size(alg: HashAlg) -> usize {
    match alg {
        HashAlg::Sha1 | HashAlg::Sha224 | HashAlg::Sha256 => 64,
        HashAlg::Sha384 | HashAlg::Sha512 => 128,
        HashAlg::Sha3_224 => 144,
        HashAlg::Sha3_256 => 136,
        HashAlg::Sha3_384 => 104,
        HashAlg::Sha3_512 => 72,
    }
}

/// Digest width, or (`intermediate`) the parked-state width used to size
/// the temp asset of a segmented hash.
pub(crate) fn digest_size(alg: HashAlg, intermediate: bool) -> usize {
    if intermediate {
        return match alg {
            HashAlg::Sha1 => 20,
            HashAlg::Sha224 | HashAlg::Sha256 => 32,
            HashAlg::Sha384 | HashAlg::Sha512 => 64,
            _ => 200,
        };
    }
    match alg {
        HashAlg::Sha1 => 20,
        HashAlg::Sha224 | HashAlg::Sha3_224 => 28,
        HashAlg::Sha256 | HashAlg::Sha3_256 => 32,
        HashAlg::Sha384 | HashAlg::Sha3_384 => 48,
        HashAlg::Sha512 | HashAlg::Sha3_512 => 64,
    }
}

fn hash_flag(alg: HashAlg) -> AssetPolicy {
    match alg {
        HashAlg::Sha1 => AssetPolicy::HASH_SHA1,
        HashAlg::Sha224 => AssetPolicy::HASH_SHA224,
        HashAlg::Sha256 => AssetPolicy::HASH_SHA256,
        HashAlg::Sha384 => AssetPolicy::HASH_SHA384,
        HashAlg::Sha512 => AssetPolicy::HASH_SHA512,
        HashAlg::Sha3_224 => AssetPolicy::HASH_SHA3_224,
        HashAlg::Sha3_256 => AssetPolicy::HASH_SHA3_256,
        HashAlg::Sha3_384 => AssetPolicy::HASH_SHA3_384,
        HashAlg::Sha3_512 => AssetPolicy::HASH_SHA3_512,
    }
}

/// Asset policy for a running hash state.
pub(crate) fn hash_asset_policy(alg: HashAlg) -> AssetPolicy {
    AssetPolicy::SYM_TEMP | AssetPolicy::HASH_STATE | AssetPolicy::DIR_ENCRYPT | hash_flag(alg)
}

/// Total-length field value for a final exchange.
///
/// SHA-3 engines take the length reduced modulo the sponge rate, with an
/// exact multiple reported as the full rate; everything else takes the true
/// message length.
pub(crate) fn final_total_length(is_sha3: bool, block_size: usize, total: u64) -> u64 {
    if !is_sha3 {
        return total;
    }
    let rate = block_size as u64;
    match total % rate {
        0 => rate,
        r => r,
    }
}
