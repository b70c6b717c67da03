// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Digest execution for the simulated engine.
//!
//! Mirrors the MAC side: a segmented hash lives in an asset slot as a
//! running [`HashState`], and final exchanges cross-check the command's
//! total-length field (SHA-3 rate reduction included) against the bytes
//! actually absorbed.

use psahsm_token::result_code;
use psahsm_token::HashAlgo;
use sha1::Digest;
use sha1::Sha1;
use sha2::Sha224;
use sha2::Sha256;
use sha2::Sha384;
use sha2::Sha512;
use sha3::Sha3_224;
use sha3::Sha3_256;
use sha3::Sha3_384;
use sha3::Sha3_512;

#[derive(Clone)]
enum HashKind {
    Sha1(Sha1),
    Sha224(Sha224),
    Sha256(Sha256),
    Sha384(Sha384),
    Sha512(Sha512),
    Sha3_224(Sha3_224),
    Sha3_256(Sha3_256),
    Sha3_384(Sha3_384),
    Sha3_512(Sha3_512),
}

/// A running digest computation, stored in an asset slot between exchanges.
#[derive(Clone)]
pub(crate) struct HashState {
    kind: HashKind,
    absorbed: u64,
}

/// Hash block length (SHA-3: sponge rate); the unit of continuation
/// alignment and of the SHA-3 total-length reduction.
pub(crate) fn block_len(algorithm: HashAlgo) -> usize {
    match algorithm {
        HashAlgo::Sha1 | HashAlgo::Sha224 | HashAlgo::Sha256 => 64,
        HashAlgo::Sha384 | HashAlgo::Sha512 => 128,
        HashAlgo::Sha3_224 => 144,
        HashAlgo::Sha3_256 => 136,
        HashAlgo::Sha3_384 => 104,
        HashAlgo::Sha3_512 => 72,
    }
}

/// Intermediate state footprint the engine expects the hash asset to have.
///
/// SHA-224/384 carry the parent algorithm's wider compression state; SHA-3
/// carries the whole 1600-bit permutation state.
pub(crate) fn state_len(algorithm: HashAlgo) -> usize {
    match algorithm {
        HashAlgo::Sha1 => 20,
        HashAlgo::Sha224 | HashAlgo::Sha256 => 32,
        HashAlgo::Sha384 | HashAlgo::Sha512 => 64,
        HashAlgo::Sha3_224 | HashAlgo::Sha3_256 | HashAlgo::Sha3_384 | HashAlgo::Sha3_512 => 200,
    }
}

/// Output digest length.
pub(crate) fn digest_len(algorithm: HashAlgo) -> usize {
    match algorithm {
        HashAlgo::Sha1 => 20,
        HashAlgo::Sha224 | HashAlgo::Sha3_224 => 28,
        HashAlgo::Sha256 | HashAlgo::Sha3_256 => 32,
        HashAlgo::Sha384 | HashAlgo::Sha3_384 => 48,
        HashAlgo::Sha512 | HashAlgo::Sha3_512 => 64,
    }
}

impl HashState {
    pub(crate) fn init(algorithm: HashAlgo) -> Self {
        let kind = match algorithm {
            HashAlgo::Sha1 => HashKind::Sha1(Sha1::new()),
            HashAlgo::Sha224 => HashKind::Sha224(Sha224::new()),
            HashAlgo::Sha256 => HashKind::Sha256(Sha256::new()),
            HashAlgo::Sha384 => HashKind::Sha384(Sha384::new()),
            HashAlgo::Sha512 => HashKind::Sha512(Sha512::new()),
            HashAlgo::Sha3_224 => HashKind::Sha3_224(Sha3_224::new()),
            HashAlgo::Sha3_256 => HashKind::Sha3_256(Sha3_256::new()),
            HashAlgo::Sha3_384 => HashKind::Sha3_384(Sha3_384::new()),
            HashAlgo::Sha3_512 => HashKind::Sha3_512(Sha3_512::new()),
        };
        Self { kind, absorbed: 0 }
    }

    pub(crate) fn absorb(&mut self, data: &[u8]) {
        self.absorbed += data.len() as u64;
        match &mut self.kind {
            HashKind::Sha1(d) => d.update(data),
            HashKind::Sha224(d) => d.update(data),
            HashKind::Sha256(d) => d.update(data),
            HashKind::Sha384(d) => d.update(data),
            HashKind::Sha512(d) => d.update(data),
            HashKind::Sha3_224(d) => d.update(data),
            HashKind::Sha3_256(d) => d.update(data),
            HashKind::Sha3_384(d) => d.update(data),
            HashKind::Sha3_512(d) => d.update(data),
        }
    }

    pub(crate) fn absorbed(&self) -> u64 {
        self.absorbed
    }

    pub(crate) fn finalize(self) -> Vec<u8> {
        match self.kind {
            HashKind::Sha1(d) => d.finalize().to_vec(),
            HashKind::Sha224(d) => d.finalize().to_vec(),
            HashKind::Sha256(d) => d.finalize().to_vec(),
            HashKind::Sha384(d) => d.finalize().to_vec(),
            HashKind::Sha512(d) => d.finalize().to_vec(),
            HashKind::Sha3_224(d) => d.finalize().to_vec(),
            HashKind::Sha3_256(d) => d.finalize().to_vec(),
            HashKind::Sha3_384(d) => d.finalize().to_vec(),
            HashKind::Sha3_512(d) => d.finalize().to_vec(),
        }
    }
}

/// Final-exchange total-length value: true length, or SHA-3 rate-reduced.
pub(crate) fn expected_total(algorithm: HashAlgo, absorbed: u64) -> u64 {
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
