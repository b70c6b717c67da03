// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Shared fixtures for the adapter integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use psahsm_api::Entropy;
use psahsm_api::KeyAttributes;
use psahsm_api::KeyId;
use psahsm_api::KeyType;
use psahsm_api::KeyUsage;
use psahsm_api::MemKeyStore;
use psahsm_api::PsaAdapter;
use psahsm_api::PsaResult;
use psahsm_mock::MockTransport;
use psahsm_sim::SimEngine;

/// Initializes `tracing` output for tests. Safe to call from every test.
pub fn init() {
    static ONCE: std::sync::Once = std::sync::Once::new();
    ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_test_writer()
            .with_max_level(tracing::level_filters::LevelFilter::DEBUG)
            .init();
    });
}

/// Entropy source that fills every buffer with one byte, so generated IVs
/// are predictable in assertions.
pub struct FixedEntropy(pub u8);

impl Entropy for FixedEntropy {
    fn fill(&self, buf: &mut [u8]) -> PsaResult<()> {
        buf.fill(self.0);
        Ok(())
    }
}

/// Adapter wired to the software engine.
pub fn sim_adapter() -> (Arc<SimEngine>, Arc<MemKeyStore>, PsaAdapter) {
    init();
    let engine = Arc::new(SimEngine::new());
    let keys = Arc::new(MemKeyStore::new());
    let adapter = PsaAdapter::new(engine.clone(), keys.clone());
    (engine, keys, adapter)
}

/// Adapter wired to the software engine with a pinned-IV entropy source.
pub fn sim_adapter_with_entropy(byte: u8) -> (Arc<SimEngine>, Arc<MemKeyStore>, PsaAdapter) {
    init();
    let engine = Arc::new(SimEngine::new());
    let keys = Arc::new(MemKeyStore::new());
    let adapter = PsaAdapter::new(engine.clone(), keys.clone())
        .with_entropy(Box::new(FixedEntropy(byte)));
    (engine, keys, adapter)
}

/// Adapter wired to the recording mock transport.
pub fn mock_adapter() -> (Arc<MockTransport>, Arc<MemKeyStore>, PsaAdapter) {
    init();
    let mock = Arc::new(MockTransport::new());
    let keys = Arc::new(MemKeyStore::new());
    let adapter = PsaAdapter::new(mock.clone(), keys.clone())
        .with_entropy(Box::new(FixedEntropy(0xA5)));
    (mock, keys, adapter)
}

/// Imports a key with the given type, material, and usage.
pub fn import_key(
    keys: &MemKeyStore,
    key_type: KeyType,
    material: &[u8],
    usage: KeyUsage,
) -> KeyId {
    let result = keys.import(
        KeyAttributes {
            key_type,
            bits: material.len() * 8,
            usage,
        },
        material,
    );
    assert!(result.is_ok(), "result {:?}", result);
    result.unwrap()
}

/// AES key with cipher usage in both directions.
pub fn import_aes_cipher_key(keys: &MemKeyStore, material: &[u8]) -> KeyId {
    import_key(
        keys,
        KeyType::Aes,
        material,
        KeyUsage::ENCRYPT | KeyUsage::DECRYPT,
    )
}

/// Key with MAC usage in both directions.
pub fn import_mac_key(keys: &MemKeyStore, key_type: KeyType, material: &[u8]) -> KeyId {
    import_key(
        keys,
        key_type,
        material,
        KeyUsage::SIGN_MESSAGE | KeyUsage::VERIFY_MESSAGE,
    )
}

/// Deterministic patterned test data.
pub fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 + 3) as u8).collect()
}
