// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

mod common;

use psahsm_api::*;

use crate::common::*;

#[test]
fn hmac_sha256_compute_verify_and_reject() {
    let (engine, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x0B; 32]);
    let message = pattern(64);

    let mut mac = [0u8; 32];
    let result = adapter.mac_compute(key, MacAlg::Hmac(HashAlg::Sha256), &message, &mut mac);
    assert!(result.is_ok(), "result {:?}", result);
    assert_eq!(result.unwrap(), 32);

    let result = adapter.mac_verify(key, MacAlg::Hmac(HashAlg::Sha256), &message, &mac);
    assert!(result.is_ok(), "result {:?}", result);

    // Any single corrupted bit must be rejected.
    let mut bad_mac = mac;
    bad_mac[31] ^= 0x01;
    assert_eq!(
        adapter
            .mac_verify(key, MacAlg::Hmac(HashAlg::Sha256), &message, &bad_mac)
            .unwrap_err(),
        PsaError::InvalidSignature
    );

    let mut bad_message = message.clone();
    *bad_message.last_mut().unwrap() ^= 0x01;
    assert_eq!(
        adapter
            .mac_verify(key, MacAlg::Hmac(HashAlg::Sha256), &bad_message, &mac)
            .unwrap_err(),
        PsaError::InvalidSignature
    );

    assert_eq!(engine.live_assets(), 0);
}

#[test]
fn hmac_sha256_known_answer() {
    // RFC 4231 test case 2.
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, b"Jefe");

    let mut mac = [0u8; 32];
    adapter
        .mac_compute(
            key,
            MacAlg::Hmac(HashAlg::Sha256),
            b"what do ya want for nothing?",
            &mut mac,
        )
        .unwrap();
    assert_eq!(
        mac.to_vec(),
        hex::decode("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843")
            .unwrap()
    );
}

#[test]
fn mac_compute_is_deterministic() {
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x42; 20]);
    let message = pattern(100);

    let mut first = [0u8; 48];
    let mut second = [0u8; 48];
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha384), &message, &mut first)
        .unwrap();
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha384), &message, &mut second)
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn aes_cmac_compute_and_verify() {
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Aes, &[0x6F; 16]);
    let message = pattern(50);

    let mut mac = [0u8; 16];
    assert_eq!(
        adapter
            .mac_compute(key, MacAlg::Cmac, &message, &mut mac)
            .unwrap(),
        16
    );
    adapter.mac_verify(key, MacAlg::Cmac, &message, &mac).unwrap();
}

#[test]
fn segmented_sign_equals_one_shot() {
    let (engine, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x17; 64]);
    let message = pattern(300);

    let mut one_shot = [0u8; 32];
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha256), &message, &mut one_shot)
        .unwrap();

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    // Splits chosen to exercise buffering, block-straddling, and bulk.
    for chunk in [&message[..10], &message[10..64], &message[64..200], &message[200..]] {
        adapter.mac_update(&mut operation, chunk).unwrap();
    }
    let mut mac = [0u8; 32];
    assert_eq!(adapter.mac_sign_finish(&mut operation, &mut mac).unwrap(), 32);
    assert_eq!(mac, one_shot);
    assert_eq!(engine.live_assets(), 0);
    assert!(!keys.is_in_use(key));
}

#[test]
fn segmented_verify_accepts_and_rejects() {
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x23; 32]);
    let message = pattern(150);

    let mut mac = [0u8; 64];
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha512), &message, &mut mac)
        .unwrap();

    let mut operation = MacOperation::new();
    adapter
        .mac_verify_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha512))
        .unwrap();
    adapter.mac_update(&mut operation, &message[..128]).unwrap();
    adapter.mac_update(&mut operation, &message[128..]).unwrap();
    adapter.mac_verify_finish(&mut operation, &mac).unwrap();

    // The segmented verify path reports an engine-side mismatch as
    // corruption, unlike the one-shot path.
    let mut bad_mac = mac;
    bad_mac[0] ^= 0x80;
    let mut operation = MacOperation::new();
    adapter
        .mac_verify_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha512))
        .unwrap();
    adapter.mac_update(&mut operation, &message).unwrap();
    assert_eq!(
        adapter
            .mac_verify_finish(&mut operation, &bad_mac)
            .unwrap_err(),
        PsaError::CorruptionDetected
    );
    adapter.mac_abort(&mut operation).unwrap();
}

#[test]
fn finish_straight_from_setup_signs_the_empty_message() {
    let (engine, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x31; 32]);

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    let mut empty_mac = [0u8; 32];
    assert_eq!(
        adapter
            .mac_sign_finish(&mut operation, &mut empty_mac)
            .unwrap(),
        32
    );
    assert_eq!(engine.live_assets(), 0);

    // HMAC over the empty message, via the one-shot of a zero-length
    // update path: setup, buffer-only update, finish.
    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    adapter.mac_update(&mut operation, &pattern(5)).unwrap();
    let mut short_mac = [0u8; 32];
    adapter
        .mac_sign_finish(&mut operation, &mut short_mac)
        .unwrap();
    assert_ne!(short_mac, empty_mac);
}

#[test]
fn sha3_hmac_segmented_equals_one_shot() {
    // SHA3-384 has a 104-byte rate; cross it several times so the reduced
    // total-length bookkeeping is exercised against the engine's own count.
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x59; 48]);
    let message = pattern(312);

    let mut one_shot = [0u8; 48];
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha3_384), &message, &mut one_shot)
        .unwrap();

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha3_384))
        .unwrap();
    adapter.mac_update(&mut operation, &message[..100]).unwrap();
    adapter.mac_update(&mut operation, &message[100..104]).unwrap();
    adapter.mac_update(&mut operation, &message[104..]).unwrap();
    let mut mac = [0u8; 48];
    adapter.mac_sign_finish(&mut operation, &mut mac).unwrap();
    assert_eq!(mac, one_shot);
}

#[test]
fn mac_state_machine_and_sizing_errors() {
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x61; 32]);

    let mut operation = MacOperation::new();
    assert_eq!(
        adapter
            .mac_update(&mut operation, &pattern(16))
            .unwrap_err(),
        PsaError::BadState
    );
    let mut mac = [0u8; 32];
    assert_eq!(
        adapter
            .mac_sign_finish(&mut operation, &mut mac)
            .unwrap_err(),
        PsaError::BadState
    );

    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    assert_eq!(
        adapter
            .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
            .unwrap_err(),
        PsaError::BadState
    );

    let mut small = [0u8; 31];
    assert_eq!(
        adapter
            .mac_sign_finish(&mut operation, &mut small)
            .unwrap_err(),
        PsaError::BufferTooSmall
    );
    adapter.mac_abort(&mut operation).unwrap();

    // Verification requires exactly the digest length, one-shot and
    // segmented alike.
    let message = pattern(40);
    let mut mac = [0u8; 32];
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha256), &message, &mut mac)
        .unwrap();
    assert_eq!(
        adapter
            .mac_verify(key, MacAlg::Hmac(HashAlg::Sha256), &message, &mac[..16])
            .unwrap_err(),
        PsaError::InvalidArgument
    );

    let mut operation = MacOperation::new();
    adapter
        .mac_verify_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    adapter.mac_update(&mut operation, &message).unwrap();
    assert_eq!(
        adapter
            .mac_verify_finish(&mut operation, &mac[..16])
            .unwrap_err(),
        PsaError::InvalidArgument
    );
    adapter.mac_abort(&mut operation).unwrap();

    // Sign-only and verify-only usage are distinct capabilities.
    let sign_only = import_key(&keys, KeyType::Hmac, &[0x62; 32], KeyUsage::SIGN_MESSAGE);
    assert_eq!(
        adapter
            .mac_verify(sign_only, MacAlg::Hmac(HashAlg::Sha256), &message, &mac)
            .unwrap_err(),
        PsaError::NotPermitted
    );
}

#[test]
fn mac_abort_is_idempotent() {
    let (engine, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Aes, &[0x6A; 16]);

    let mut operation = MacOperation::new();
    adapter.mac_abort(&mut operation).unwrap();

    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Cmac)
        .unwrap();
    assert_eq!(engine.live_assets(), 1);
    adapter.mac_abort(&mut operation).unwrap();
    adapter.mac_abort(&mut operation).unwrap();
    assert_eq!(engine.live_assets(), 0);
    assert!(!keys.is_in_use(key));
}

#[test]
fn cbcmac_segmented_equals_one_shot() {
    let (_, keys, adapter) = sim_adapter();
    let key = import_mac_key(&keys, KeyType::Aes, &[0x3E; 16]);
    let message = pattern(64);

    let mut one_shot = [0u8; 16];
    adapter
        .mac_compute(key, MacAlg::CbcMac, &message, &mut one_shot)
        .unwrap();

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::CbcMac)
        .unwrap();
    adapter.mac_update(&mut operation, &message[..24]).unwrap();
    adapter.mac_update(&mut operation, &message[24..]).unwrap();
    let mut mac = [0u8; 16];
    adapter.mac_sign_finish(&mut operation, &mut mac).unwrap();
    assert_eq!(mac, one_shot);
}
