// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Block cipher execution for the simulated engine.
//!
//! Chained modes (CBC, CTR) read their chaining block from an asset slot and
//! write the advanced block back after the exchange, exactly as the hardware
//! does: a multi-exchange operation works because the slot carries the state,
//! not because the engine remembers anything.

use aes::Aes128;
use aes::Aes192;
use aes::Aes256;
use cipher::generic_array::GenericArray;
use cipher::BlockDecrypt;
use cipher::BlockEncrypt;
use cipher::KeyInit;
use des::TdesEde3;
use psahsm_token::result_code;
use psahsm_token::CipherAlgo;

/// One block cipher core keyed for the exchange.
pub(crate) enum BlockCore {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
    Tdes(TdesEde3),
}

impl BlockCore {
    /// Builds a core from the command's algorithm selector and inline key.
    ///
    /// ARIA is mapped by the adapter but not provisioned in this engine
    /// build, so it reports the same code real parts use for an absent
    /// algorithm.
    pub(crate) fn new(algorithm: CipherAlgo, key: &[u8]) -> Result<Self, i32> {
        match algorithm {
            CipherAlgo::Aes => match key.len() {
                16 => Ok(BlockCore::Aes128(Aes128::new(GenericArray::from_slice(key)))),
                24 => Ok(BlockCore::Aes192(Aes192::new(GenericArray::from_slice(key)))),
                32 => Ok(BlockCore::Aes256(Aes256::new(GenericArray::from_slice(key)))),
                _ => Err(result_code::INVALID_PARAMETER),
            },
            CipherAlgo::Tdes => match key.len() {
                24 => Ok(BlockCore::Tdes(TdesEde3::new(GenericArray::from_slice(key)))),
                _ => Err(result_code::INVALID_PARAMETER),
            },
            CipherAlgo::Aria => Err(result_code::INVALID_ALGORITHM),
        }
    }

    pub(crate) fn block_size(&self) -> usize {
        match self {
            BlockCore::Tdes(_) => 8,
            _ => 16,
        }
    }

    pub(crate) fn encrypt_block(&self, block: &mut [u8]) {
        match self {
            BlockCore::Aes128(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            BlockCore::Aes192(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            BlockCore::Aes256(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
            BlockCore::Tdes(c) => c.encrypt_block(GenericArray::from_mut_slice(block)),
        }
    }

    pub(crate) fn decrypt_block(&self, block: &mut [u8]) {
        match self {
            BlockCore::Aes128(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            BlockCore::Aes192(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            BlockCore::Aes256(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
            BlockCore::Tdes(c) => c.decrypt_block(GenericArray::from_mut_slice(block)),
        }
    }
}

fn xor_in_place(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d ^= *s;
    }
}

/// ECB over block-aligned data.
pub(crate) fn ecb(core: &BlockCore, encrypt: bool, data: &[u8]) -> Result<Vec<u8>, i32> {
    let block = core.block_size();
    if data.is_empty() || data.len() % block != 0 {
        return Err(result_code::INVALID_LENGTH);
    }
    let mut out = data.to_vec();
    for chunk in out.chunks_mut(block) {
        if encrypt {
            core.encrypt_block(chunk);
        } else {
            core.decrypt_block(chunk);
        }
    }
    Ok(out)
}

/// CBC over block-aligned data.
///
/// `chain` holds the IV on entry and the next chaining block on return:
/// the last ciphertext block either way (produced when encrypting, consumed
/// when decrypting).
pub(crate) fn cbc(
    core: &BlockCore,
    encrypt: bool,
    chain: &mut [u8],
    data: &[u8],
) -> Result<Vec<u8>, i32> {
    let block = core.block_size();
    if data.is_empty() || data.len() % block != 0 || chain.len() != block {
        return Err(result_code::INVALID_LENGTH);
    }
    let mut out = data.to_vec();
    if encrypt {
        for chunk in out.chunks_mut(block) {
            xor_in_place(chunk, chain);
            core.encrypt_block(chunk);
            chain.copy_from_slice(chunk);
        }
    } else {
        for (chunk, ct) in out.chunks_mut(block).zip(data.chunks(block)) {
            core.decrypt_block(chunk);
            xor_in_place(chunk, chain);
            chain.copy_from_slice(ct);
        }
    }
    Ok(out)
}

/// CTR with a 32-bit big-endian block counter in the low word.
///
/// Accepts any data length; the counter block advances by the number of
/// keystream blocks consumed, including a trailing partial block.
pub(crate) fn ctr32(core: &BlockCore, counter: &mut [u8], data: &[u8]) -> Result<Vec<u8>, i32> {
    let block = core.block_size();
    if data.is_empty() || counter.len() != block {
        return Err(result_code::INVALID_LENGTH);
    }
    let mut out = data.to_vec();
    for chunk in out.chunks_mut(block) {
        let mut keystream = counter.to_vec();
        core.encrypt_block(&mut keystream);
        xor_in_place(chunk, &keystream);
        increment_counter32(counter);
    }
    Ok(out)
}

/// Wrapping increment of the trailing 32-bit big-endian counter word.
fn increment_counter32(counter: &mut [u8]) {
    let at = counter.len() - 4;
    let word = u32::from_be_bytes([counter[at], counter[at + 1], counter[at + 2], counter[at + 3]]);
    counter[at..].copy_from_slice(&word.wrapping_add(1).to_be_bytes());
}

/// XTS over block-aligned data, tweak carried inline in the command.
///
/// The double-length key splits into the data key and the tweak key. This
/// engine build does not implement ciphertext stealing, so the payload must
/// be a whole number of blocks.
pub(crate) fn xts(
    algorithm: CipherAlgo,
    encrypt: bool,
    key: &[u8],
    tweak_in: &[u8; 16],
    data: &[u8],
) -> Result<Vec<u8>, i32> {
    if algorithm != CipherAlgo::Aes {
        return Err(result_code::INVALID_ALGORITHM);
    }
    if key.len() != 32 && key.len() != 64 {
        return Err(result_code::INVALID_PARAMETER);
    }
    let half = key.len() / 2;
    let data_core = BlockCore::new(algorithm, &key[..half])?;
    let tweak_core = BlockCore::new(algorithm, &key[half..])?;
    if data.is_empty() || data.len() % 16 != 0 {
        return Err(result_code::INVALID_LENGTH);
    }

    let mut tweak = *tweak_in;
    tweak_core.encrypt_block(&mut tweak);

    let mut out = data.to_vec();
    for chunk in out.chunks_mut(16) {
        xor_in_place(chunk, &tweak);
        if encrypt {
            data_core.encrypt_block(chunk);
        } else {
            data_core.decrypt_block(chunk);
        }
        xor_in_place(chunk, &tweak);
        gf_double(&mut tweak);
    }
    Ok(out)
}

/// Multiply the tweak by alpha in GF(2^128), little-endian per IEEE 1619.
fn gf_double(tweak: &mut [u8; 16]) {
    let mut carry = 0u8;
    for byte in tweak.iter_mut() {
        let next_carry = *byte >> 7;
        *byte = (*byte << 1) | carry;
        carry = next_carry;
    }
    if carry != 0 {
        tweak[0] ^= 0x87;
    }
}
