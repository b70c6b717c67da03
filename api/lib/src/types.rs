// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Key attributes and algorithm identifiers of the adapter API surface.

use bitflags::bitflags;

/// Opaque key identifier resolved through the key store.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(pub u32);

/// Key type. Determines which engine algorithms a key can drive and the
/// cipher block geometry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyType {
    /// AES-128/192/256; XTS keys carry both halves back to back.
    Aes,
    /// ARIA-128/192/256.
    Aria,
    /// Triple-DES (three-key EDE).
    Des,
    /// HMAC key of any length.
    Hmac,
}

bitflags! {
    /// Key usage policy bits checked at every adapter entry point.
    pub struct KeyUsage: u32 {
        /// Cipher encryption.
        const ENCRYPT        = 1 << 0;
        /// Cipher decryption.
        const DECRYPT        = 1 << 1;
        /// MAC generation.
        const SIGN_MESSAGE   = 1 << 2;
        /// MAC verification.
        const VERIFY_MESSAGE = 1 << 3;
    }
}

/// Attribute bundle carried by every key entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct KeyAttributes {
    /// Key type.
    pub key_type: KeyType,
    /// Key size in bits.
    pub bits: usize,
    /// Usage policy.
    pub usage: KeyUsage,
}

/// Symmetric cipher algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CipherAlg {
    /// Electronic codebook, no padding, no IV.
    Ecb,
    /// Cipher block chaining, no padding.
    Cbc,
    /// Counter mode (32-bit counter).
    Ctr,
    /// XEX tweaked-codebook; tweak travels inline in the command token.
    Xts,
}

/// Hash algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HashAlg {
    /// SHA-1.
    Sha1,
    /// SHA-224.
    Sha224,
    /// SHA-256.
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
    /// SHA3-224.
    Sha3_224,
    /// SHA3-256.
    Sha3_256,
    /// SHA3-384.
    Sha3_384,
    /// SHA3-512.
    Sha3_512,
}

impl HashAlg {
    /// Whether this is a SHA-3 sponge algorithm.
    ///
    /// SHA-3 operations carry a rate-reduced total message length in final
    /// exchanges; see the length accounting in the MAC and hash adapters.
    pub fn is_sha3(self) -> bool {
        matches!(
            self,
            HashAlg::Sha3_224 | HashAlg::Sha3_256 | HashAlg::Sha3_384 | HashAlg::Sha3_512
        )
    }
}

/// MAC algorithm.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MacAlg {
    /// HMAC over the given hash.
    Hmac(HashAlg),
    /// Cipher-based MAC (NIST SP 800-38B) over the key's block cipher.
    Cmac,
    /// Raw CBC-MAC over the key's block cipher.
    CbcMac,
}
