// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Token command and result structures.
//!
//! One command token and one result token travel per exchange. The engine
//! never retains a command between exchanges; every piece of state that must
//! survive a call lives in an asset slot referenced by id.

use crate::AssetId;
use crate::AssetPolicy;

/// Maximum number of payload bytes one exchange may carry.
///
/// The engine's DMA length field is 21 bits wide. Segmented operations must
/// split anything larger into consecutive exchanges, capping each chunk at
/// `MAX_DMA_SIZE - (block_size - 1)`.
pub const MAX_DMA_SIZE: usize = 0x001F_FFFF;

/// Size of the fixed MAC field in MAC command/result tokens.
pub const TOKEN_MAC_MAX: usize = 64;

/// Size of the fixed digest field in hash result tokens.
pub const TOKEN_DIGEST_MAX: usize = 64;

/// Size of the inline IV field in cipher command tokens.
pub const TOKEN_IV_SIZE: usize = 16;

/// Engine result codes embedded in result tokens.
///
/// Zero and positive values are success; negative values are engine-level
/// failures. Two negatives are distinguished because callers react to them
/// specifically; everything else is an undifferentiated internal failure.
pub mod result_code {
    /// Operation completed.
    pub const SUCCESS: i32 = 0;
    /// Command token malformed or references an unusable asset.
    pub const INVALID_PARAMETER: i32 = -2;
    /// Referenced asset id does not exist.
    pub const INVALID_ASSET: i32 = -3;
    /// Algorithm or mode not provisioned in this engine build.
    pub const INVALID_ALGORITHM: i32 = -4;
    /// Payload length violates the algorithm's alignment rules.
    pub const INVALID_LENGTH: i32 = -5;
    /// Asset store has no free slot of the requested size.
    pub const ASSET_FULL: i32 = -6;
    /// MAC or digest comparison failed.
    pub const VERIFY_MISMATCH: i32 = -7;
}

/// Token opcode. Selects the engine service a command is addressed to.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum OpCode {
    /// Bulk symmetric encryption/decryption.
    Encryption = 0x01,
    /// Message digesting.
    Hash = 0x02,
    /// MAC generation and verification.
    Mac = 0x03,
    /// Asset store management.
    AssetManagement = 0x07,
}

/// Token sub-code. Qualifies the operation within an opcode.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum SubCode {
    /// Default sub-code for services with a single operation.
    NotUsed = 0x00,
    /// MAC generation (`OpCode::Mac`).
    MacGenerate = 0x01,
    /// MAC verification (`OpCode::Mac`).
    MacVerify = 0x02,
    /// Asset slot creation (`OpCode::AssetManagement`).
    AssetCreate = 0x03,
    /// Asset content load (`OpCode::AssetManagement`).
    AssetLoad = 0x04,
    /// Asset slot deletion (`OpCode::AssetManagement`).
    AssetDelete = 0x05,
}

/// Block cipher selector for cipher commands.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum CipherAlgo {
    /// AES-128/192/256 by key length.
    Aes = 0,
    /// Triple-DES (EDE, three-key).
    Tdes = 2,
    /// ARIA-128/192/256 by key length.
    Aria = 9,
}

/// Cipher chaining mode for cipher commands.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum CipherMode {
    /// Electronic codebook; no chaining state.
    Ecb = 0,
    /// Cipher block chaining; IV in a temp asset.
    Cbc = 1,
    /// 32-bit counter mode; counter block in a temp asset.
    Ctr = 2,
    /// XEX tweaked-codebook with ciphertext stealing; tweak inline in the
    /// command, never in an asset.
    Xts = 7,
}

/// MAC algorithm selector for MAC commands.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum MacAlgo {
    /// HMAC over SHA-1.
    HmacSha1 = 1,
    /// HMAC over SHA-224.
    HmacSha224 = 2,
    /// HMAC over SHA-256.
    HmacSha256 = 3,
    /// HMAC over SHA-384.
    HmacSha384 = 4,
    /// HMAC over SHA-512.
    HmacSha512 = 5,
    /// HMAC over SHA3-224.
    HmacSha3_224 = 6,
    /// HMAC over SHA3-256.
    HmacSha3_256 = 7,
    /// HMAC over SHA3-384.
    HmacSha3_384 = 8,
    /// HMAC over SHA3-512.
    HmacSha3_512 = 9,
    /// AES-CMAC.
    AesCmac = 10,
    /// AES CBC-MAC.
    AesCbcMac = 11,
    /// ARIA-CMAC.
    AriaCmac = 12,
    /// ARIA CBC-MAC.
    AriaCbcMac = 13,
}

impl MacAlgo {
    /// Whether this MAC runs over a SHA-3 sponge.
    ///
    /// SHA-3 MACs carry a rate-reduced total message length in final
    /// exchanges; see the adapter's length accounting.
    pub fn is_sha3(self) -> bool {
        matches!(
            self,
            MacAlgo::HmacSha3_224
                | MacAlgo::HmacSha3_256
                | MacAlgo::HmacSha3_384
                | MacAlgo::HmacSha3_512
        )
    }

    /// Whether this is a cipher-based MAC (CMAC / CBC-MAC).
    pub fn is_cipher_mac(self) -> bool {
        matches!(
            self,
            MacAlgo::AesCmac | MacAlgo::AesCbcMac | MacAlgo::AriaCmac | MacAlgo::AriaCbcMac
        )
    }
}

/// Hash algorithm selector for hash commands.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum HashAlgo {
    /// SHA-1.
    Sha1 = 1,
    /// SHA-224.
    Sha224 = 2,
    /// SHA-256.
    Sha256 = 3,
    /// SHA-384.
    Sha384 = 4,
    /// SHA-512.
    Sha512 = 5,
    /// SHA3-224.
    Sha3_224 = 6,
    /// SHA3-256.
    Sha3_256 = 7,
    /// SHA3-384.
    Sha3_384 = 8,
    /// SHA3-512.
    Sha3_512 = 9,
}

impl HashAlgo {
    /// Whether this is a SHA-3 sponge algorithm.
    pub fn is_sha3(self) -> bool {
        matches!(
            self,
            HashAlgo::Sha3_224 | HashAlgo::Sha3_256 | HashAlgo::Sha3_384 | HashAlgo::Sha3_512
        )
    }
}

/// Chaining position of a hash/MAC exchange within a segmented operation.
///
/// The engine keeps no state of its own between exchanges; `*Cont*` modes
/// read and write the running state through the command's temp asset id.
#[repr(u32)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, strum_macros::FromRepr)]
pub enum ChainMode {
    /// Whole message in this one exchange.
    Init2Final = 0,
    /// First data of a segmented operation; initializes the temp asset.
    Init2Cont = 1,
    /// Last data of a segmented operation; consumes the temp asset state.
    Cont2Final = 2,
    /// Intermediate data; reads and rewrites the temp asset state.
    Cont2Cont = 3,
}

/// Cipher service command.
#[derive(Debug, Clone)]
pub struct CipherCmd {
    /// Block cipher to run.
    pub algorithm: CipherAlgo,
    /// Chaining mode.
    pub mode: CipherMode,
    /// True for encryption, false for decryption.
    pub encrypt: bool,
    /// Key material, delivered inline in the token.
    pub key: Vec<u8>,
    /// Asset holding the IV / counter block, or [`AssetId::INVALID`] for
    /// modes that carry no chained state (ECB, XTS).
    pub temp_asset: AssetId,
    /// Inline IV field. Only consulted for XTS.
    pub iv: [u8; TOKEN_IV_SIZE],
    /// Payload. Must not exceed [`MAX_DMA_SIZE`].
    pub data: Vec<u8>,
}

/// MAC service command.
#[derive(Debug, Clone)]
pub struct MacCmd {
    /// MAC algorithm to run.
    pub algorithm: MacAlgo,
    /// Chaining position of this exchange.
    pub mode: ChainMode,
    /// True to verify against [`MacCmd::mac`], false to generate.
    pub verify: bool,
    /// Key material, delivered inline in the token.
    pub key: Vec<u8>,
    /// Asset holding the running MAC state for `*Cont*` modes, or
    /// [`AssetId::INVALID`] for init-to-final.
    pub temp_asset: AssetId,
    /// Total message length in bytes, only meaningful in final modes.
    ///
    /// For SHA-3 based MACs this is not the true message length but the
    /// length reduced modulo the sponge rate (full rate when the remainder
    /// is zero).
    pub total_length: u64,
    /// Expected MAC for verification; empty when generating.
    pub mac: Vec<u8>,
    /// Payload. Must not exceed [`MAX_DMA_SIZE`] per exchange.
    pub data: Vec<u8>,
}

/// Hash service command.
#[derive(Debug, Clone)]
pub struct HashCmd {
    /// Hash algorithm to run.
    pub algorithm: HashAlgo,
    /// Chaining position of this exchange.
    pub mode: ChainMode,
    /// Asset holding the intermediate digest state for `*Cont*` modes.
    pub temp_asset: AssetId,
    /// Total message length in bytes; SHA-3 reduction as in [`MacCmd`].
    pub total_length: u64,
    /// Payload.
    pub data: Vec<u8>,
}

/// A command token submitted to the engine.
#[derive(Debug, Clone)]
pub enum TokenCmd {
    /// Bulk cipher exchange.
    Cipher(CipherCmd),
    /// MAC exchange.
    Mac(MacCmd),
    /// Hash exchange.
    Hash(HashCmd),
    /// Allocate an asset slot with the given policy and byte size.
    AssetCreate {
        /// Use policy the slot is bound to for its lifetime.
        policy: AssetPolicy,
        /// Slot size in bytes.
        size: usize,
    },
    /// Load plaintext content into an allocated slot.
    AssetLoad {
        /// Target slot.
        asset_id: AssetId,
        /// Content; must fit the slot.
        data: Vec<u8>,
    },
    /// Delete a slot and scrub its content.
    AssetDelete {
        /// Slot to delete.
        asset_id: AssetId,
    },
}

impl TokenCmd {
    /// Opcode and sub-code this command is addressed with.
    pub fn codes(&self) -> (OpCode, SubCode) {
        match self {
            TokenCmd::Cipher(_) => (OpCode::Encryption, SubCode::NotUsed),
            TokenCmd::Mac(cmd) if cmd.verify => (OpCode::Mac, SubCode::MacVerify),
            TokenCmd::Mac(_) => (OpCode::Mac, SubCode::MacGenerate),
            TokenCmd::Hash(_) => (OpCode::Hash, SubCode::NotUsed),
            TokenCmd::AssetCreate { .. } => (OpCode::AssetManagement, SubCode::AssetCreate),
            TokenCmd::AssetLoad { .. } => (OpCode::AssetManagement, SubCode::AssetLoad),
            TokenCmd::AssetDelete { .. } => (OpCode::AssetManagement, SubCode::AssetDelete),
        }
    }
}

/// A result token returned by the engine.
///
/// Every variant carries the engine result code; negative codes signal an
/// engine-level failure and render any other payload meaningless.
#[derive(Debug, Clone)]
pub enum TokenRslt {
    /// Result with no output payload.
    Generic {
        /// Engine result code.
        result: i32,
    },
    /// Cipher output.
    Cipher {
        /// Engine result code.
        result: i32,
        /// Transformed payload, same length as the command payload.
        data: Vec<u8>,
    },
    /// MAC generation output.
    Mac {
        /// Engine result code.
        result: i32,
        /// Generated MAC, left-aligned in the fixed field.
        mac: [u8; TOKEN_MAC_MAX],
    },
    /// Hash output.
    Hash {
        /// Engine result code.
        result: i32,
        /// Digest, left-aligned in the fixed field.
        digest: [u8; TOKEN_DIGEST_MAX],
    },
    /// Asset creation output.
    AssetCreate {
        /// Engine result code.
        result: i32,
        /// Id of the created slot when `result` is non-negative.
        asset_id: AssetId,
    },
}

impl TokenRslt {
    /// The embedded engine result code.
    pub fn result(&self) -> i32 {
        match *self {
            TokenRslt::Generic { result } => result,
            TokenRslt::Cipher { result, .. } => result,
            TokenRslt::Mac { result, .. } => result,
            TokenRslt::Hash { result, .. } => result,
            TokenRslt::AssetCreate { result, .. } => result,
        }
    }

    /// Whether the engine reported failure.
    pub fn is_err(&self) -> bool {
        self.result() < 0
    }
}
