// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Asset identifiers and the asset use policy mask.

use bitflags::bitflags;

/// Opaque identifier of an engine-resident asset slot.
///
/// Assets hold key material, IVs, counter blocks, or running MAC/hash state.
/// The all-zero id is the `INVALID` sentinel: it never names a real slot, so
/// "free if not invalid" cleanup is safe to run unconditionally.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct AssetId(pub u32);

impl AssetId {
    /// The sentinel id that names no slot.
    pub const INVALID: AssetId = AssetId(0);

    /// Whether this id names a real slot.
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

bitflags! {
    /// Use policy an asset is bound to at creation.
    ///
    /// The engine refuses to use an asset outside its policy, so the policy
    /// computed at allocation time is part of an operation's observable
    /// protocol behavior.
    pub struct AssetPolicy: u64 {
        /// Temporary asset; scrubbed when deleted, never persisted.
        const SYM_TEMP          = 1 << 0;
        /// Usable as bulk-cipher chained state (IV / counter block).
        const CIPHER_BULK       = 1 << 1;
        /// Usable as running hash-MAC intermediate state.
        const MAC_HASH          = 1 << 2;
        /// Usable as running cipher-MAC intermediate state.
        const MAC_CIPHER        = 1 << 3;
        /// Usable as running hash intermediate state.
        const HASH_STATE        = 1 << 6;
        /// Encrypt / generate direction.
        const DIR_ENCRYPT       = 1 << 4;
        /// Decrypt / verify direction.
        const DIR_DECRYPT       = 1 << 5;
        /// AES engine.
        const ALGO_AES          = 1 << 8;
        /// Triple-DES engine.
        const ALGO_TDES         = 1 << 9;
        /// ARIA engine.
        const ALGO_ARIA         = 1 << 10;
        /// CBC chaining.
        const MODE_CBC          = 1 << 16;
        /// CTR chaining.
        const MODE_CTR          = 1 << 17;
        /// CMAC construction.
        const MODE_CMAC         = 1 << 18;
        /// CBC-MAC construction.
        const MODE_CBCMAC       = 1 << 19;
        /// SHA-1 engine.
        const HASH_SHA1         = 1 << 24;
        /// SHA-224 engine.
        const HASH_SHA224       = 1 << 25;
        /// SHA-256 engine.
        const HASH_SHA256       = 1 << 26;
        /// SHA-384 engine.
        const HASH_SHA384       = 1 << 27;
        /// SHA-512 engine.
        const HASH_SHA512       = 1 << 28;
        /// SHA3-224 engine.
        const HASH_SHA3_224     = 1 << 29;
        /// SHA3-256 engine.
        const HASH_SHA3_256     = 1 << 30;
        /// SHA3-384 engine.
        const HASH_SHA3_384     = 1 << 31;
        /// SHA3-512 engine.
        const HASH_SHA3_512     = 1 << 32;
        /// Content may not be modified after load.
        const NON_MODIFIABLE    = 1 << 40;
        /// Asset is accessible from the non-secure world.
        const SOURCE_NON_SECURE = 1 << 41;
    }
}
