// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Protocol-field assertions against the recording mock transport: what the
//! adapter actually puts in its command tokens.

mod common;

use psahsm_api::*;
use psahsm_token::result_code;
use psahsm_token::AssetPolicy;
use psahsm_token::ChainMode;
use psahsm_token::CipherMode;
use psahsm_token::TokenCmd;
use psahsm_token::TokenRslt;
use psahsm_token::TransportError;
use psahsm_token::MAX_DMA_SIZE;

use crate::common::*;

fn mac_cmds(cmds: &[TokenCmd]) -> Vec<&psahsm_token::MacCmd> {
    cmds.iter()
        .filter_map(|cmd| match cmd {
            TokenCmd::Mac(mac) => Some(mac),
            _ => None,
        })
        .collect()
}

fn cipher_cmds(cmds: &[TokenCmd]) -> Vec<&psahsm_token::CipherCmd> {
    cmds.iter()
        .filter_map(|cmd| match cmd {
            TokenCmd::Cipher(cipher) => Some(cipher),
            _ => None,
        })
        .collect()
}

#[test]
fn sha3_one_shot_total_length_is_rate_reduced() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x11; 32]);

    // 272 = 2 * 136 (the SHA3-256 rate): an exact multiple reports the
    // full rate, not zero.
    let mut mac = [0u8; 32];
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha3_256), &pattern(272), &mut mac)
        .unwrap();
    // 300 % 136 = 28.
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha3_256), &pattern(300), &mut mac)
        .unwrap();
    // A non-SHA-3 MAC reports the true length.
    adapter
        .mac_compute(key, MacAlg::Hmac(HashAlg::Sha256), &pattern(300), &mut mac)
        .unwrap();

    let cmds = mock.commands();
    let macs = mac_cmds(&cmds);
    assert_eq!(macs.len(), 3);
    assert_eq!(macs[0].total_length, 136);
    assert_eq!(macs[1].total_length, 28);
    assert_eq!(macs[2].total_length, 300);
    for cmd in macs {
        assert_eq!(cmd.mode, ChainMode::Init2Final);
        assert!(!cmd.temp_asset.is_valid());
    }
}

#[test]
fn sha3_finish_total_length_is_rate_reduced() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x12; 32]);

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha3_256))
        .unwrap();
    adapter.mac_update(&mut operation, &pattern(272)).unwrap();
    let mut mac = [0u8; 32];
    adapter.mac_sign_finish(&mut operation, &mut mac).unwrap();

    let cmds = mock.commands();
    let macs = mac_cmds(&cmds);
    // One continuation (136 bytes; the other 136 were held back), one final.
    assert_eq!(macs.len(), 2);
    assert_eq!(macs[0].mode, ChainMode::Init2Cont);
    assert_eq!(macs[0].data.len(), 136);
    assert_eq!(macs[0].total_length, 0);
    assert_eq!(macs[1].mode, ChainMode::Cont2Final);
    assert_eq!(macs[1].data.len(), 136);
    // True total is 272; the engine is told the reduced value.
    assert_eq!(macs[1].total_length, 136);
}

#[test]
fn mac_chaining_modes_progress_and_share_one_asset() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x13; 32]);

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    adapter.mac_update(&mut operation, &pattern(128)).unwrap();
    adapter.mac_update(&mut operation, &pattern(128)).unwrap();
    let mut mac = [0u8; 32];
    adapter.mac_sign_finish(&mut operation, &mut mac).unwrap();

    let cmds = mock.commands();

    // Setup allocates the running-state asset with the MAC-hash policy and
    // the hash's intermediate-state size.
    let asset_id = match &cmds[0] {
        TokenCmd::AssetCreate { policy, size } => {
            assert_eq!(*size, 32);
            assert!(policy.contains(
                AssetPolicy::SYM_TEMP
                    | AssetPolicy::MAC_HASH
                    | AssetPolicy::HASH_SHA256
                    | AssetPolicy::DIR_ENCRYPT
                    | AssetPolicy::SOURCE_NON_SECURE
            ));
            assert!(!policy.contains(AssetPolicy::NON_MODIFIABLE));
            // Canned ids start at 1; the setup allocation got the first.
            psahsm_token::AssetId(1)
        }
        other => panic!("unexpected command {:?}", other),
    };

    // 128 + 128 over a 64-byte block: 64 exchanged, then 64 + 64 (the
    // straddled leftover first), with 64 held back for the final.
    let macs = mac_cmds(&cmds);
    assert_eq!(macs.len(), 4);
    assert_eq!(macs[0].mode, ChainMode::Init2Cont);
    assert_eq!(macs[1].mode, ChainMode::Cont2Cont);
    assert_eq!(macs[2].mode, ChainMode::Cont2Cont);
    assert_eq!(macs[3].mode, ChainMode::Cont2Final);
    for cmd in &macs {
        assert_eq!(cmd.temp_asset, asset_id);
        assert!(!cmd.verify);
        assert_eq!(cmd.data.len(), 64);
    }

    // Finish deletes the asset it allocated.
    assert!(matches!(
        cmds.last(),
        Some(TokenCmd::AssetDelete { asset_id: id }) if *id == asset_id
    ));
}

#[test]
fn update_caps_exchanges_at_the_dma_limit() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_aes_cipher_key(&keys, &[0x14; 16]);

    let mut operation = CipherOperation::new();
    adapter
        .cipher_encrypt_setup(&mut operation, key, CipherAlg::Cbc)
        .unwrap();
    adapter.cipher_set_iv(&mut operation, &[0x15; 16]).unwrap();

    // Two full DMA windows plus one held-back block.
    let window = MAX_DMA_SIZE - 15;
    let input = vec![0x5Au8; 2 * window + 16];
    let mut output = vec![0u8; 2 * window];
    let written = adapter
        .cipher_update(&mut operation, &input, &mut output)
        .unwrap();
    assert_eq!(written, 2 * window);

    let cmds = mock.commands();
    let ciphers = cipher_cmds(&cmds);
    assert_eq!(ciphers.len(), 2);
    for cmd in &ciphers {
        assert_eq!(cmd.data.len(), window);
        assert!(cmd.data.len() <= MAX_DMA_SIZE);
        assert_eq!(cmd.data.len() % 16, 0);
        assert_eq!(cmd.mode, CipherMode::Cbc);
    }

    adapter.cipher_abort(&mut operation).unwrap();
}

#[test]
fn one_shot_encrypt_asset_lifecycle_is_visible() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_aes_cipher_key(&keys, &[0x16; 16]);

    let mut out = [0u8; 48];
    adapter
        .cipher_encrypt(key, CipherAlg::Cbc, &pattern(32), &mut out)
        .unwrap();

    let cmds = mock.commands();
    assert_eq!(cmds.len(), 4);
    assert!(matches!(cmds[0], TokenCmd::AssetCreate { size: 16, .. }));
    // The generated IV (pinned to 0xA5) is loaded plaintext into the asset.
    match &cmds[1] {
        TokenCmd::AssetLoad { data, .. } => assert_eq!(data.as_slice(), &[0xA5; 16]),
        other => panic!("unexpected command {:?}", other),
    }
    match &cmds[2] {
        TokenCmd::Cipher(cipher) => {
            assert!(cipher.encrypt);
            assert_eq!(cipher.data.len(), 32);
            assert_eq!(cipher.key.as_slice(), &[0x16; 16]);
        }
        other => panic!("unexpected command {:?}", other),
    }
    assert!(matches!(cmds[3], TokenCmd::AssetDelete { .. }));
}

#[test]
fn failed_exchange_still_frees_the_one_shot_asset() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_aes_cipher_key(&keys, &[0x17; 16]);

    // AssetCreate and AssetLoad succeed canned; the cipher exchange fails.
    mock.push_result(Ok(TokenRslt::AssetCreate {
        result: result_code::SUCCESS,
        asset_id: psahsm_token::AssetId(7),
    }));
    mock.push_result(Ok(TokenRslt::Generic {
        result: result_code::SUCCESS,
    }));
    mock.push_result(Ok(TokenRslt::Generic {
        result: result_code::INVALID_PARAMETER,
    }));

    let mut out = [0u8; 48];
    assert_eq!(
        adapter
            .cipher_encrypt(key, CipherAlg::Cbc, &pattern(32), &mut out)
            .unwrap_err(),
        PsaError::CorruptionDetected
    );

    // The temp asset is still deleted on the failure path.
    let cmds = mock.commands();
    assert!(matches!(
        cmds.last(),
        Some(TokenCmd::AssetDelete { asset_id: psahsm_token::AssetId(7) })
    ));
}

#[test]
fn negative_results_and_transport_failures_map_distinctly() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_aes_cipher_key(&keys, &[0x18; 16]);

    let mut operation = CipherOperation::new();
    adapter
        .cipher_encrypt_setup(&mut operation, key, CipherAlg::Ecb)
        .unwrap();

    // Engine-level failure: negative embedded result.
    mock.push_result(Ok(TokenRslt::Generic {
        result: result_code::INVALID_LENGTH,
    }));
    let mut buf = [0u8; 64];
    assert_eq!(
        adapter
            .cipher_update(&mut operation, &pattern(32), &mut buf)
            .unwrap_err(),
        PsaError::CorruptionDetected
    );
    adapter.cipher_abort(&mut operation).unwrap();

    // Transport-level failure: no result token at all.
    adapter
        .cipher_encrypt_setup(&mut operation, key, CipherAlg::Ecb)
        .unwrap();
    mock.push_result(Err(TransportError::NoResult));
    assert_eq!(
        adapter
            .cipher_update(&mut operation, &pattern(32), &mut buf)
            .unwrap_err(),
        PsaError::HardwareFailure(TransportError::NoResult)
    );
    adapter.cipher_abort(&mut operation).unwrap();
}

#[test]
fn setup_asset_exhaustion_surfaces_as_store_full() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x19; 32]);

    mock.push_result(Ok(TokenRslt::AssetCreate {
        result: result_code::ASSET_FULL,
        asset_id: psahsm_token::AssetId::INVALID,
    }));

    let mut operation = MacOperation::new();
    assert_eq!(
        adapter
            .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
            .unwrap_err(),
        PsaError::AssetStoreFull
    );
    // Setup failed before anything was acquired: no delete, key not in use,
    // context still INIT.
    assert!(!keys.is_in_use(key));
    assert!(!mock
        .commands()
        .iter()
        .any(|cmd| matches!(cmd, TokenCmd::AssetDelete { .. })));
    assert_eq!(
        adapter
            .mac_update(&mut operation, &pattern(8))
            .unwrap_err(),
        PsaError::BadState
    );
}

#[test]
fn secure_access_drops_the_non_secure_source_bit() {
    init();
    let mock = std::sync::Arc::new(psahsm_mock::MockTransport::new());
    let keys = std::sync::Arc::new(MemKeyStore::new());
    let adapter = PsaAdapter::new(mock.clone(), keys.clone())
        .with_entropy(Box::new(FixedEntropy(0x01)))
        .with_secure_access(true);
    let key = import_aes_cipher_key(&keys, &[0x20; 16]);

    let mut out = [0u8; 48];
    adapter
        .cipher_encrypt(key, CipherAlg::Cbc, &pattern(32), &mut out)
        .unwrap();

    match &mock.commands()[0] {
        TokenCmd::AssetCreate { policy, .. } => {
            assert!(!policy.contains(AssetPolicy::SOURCE_NON_SECURE));
            assert!(policy.contains(AssetPolicy::SYM_TEMP | AssetPolicy::CIPHER_BULK));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn xts_decrypt_carries_the_tweak_inline() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_aes_cipher_key(&keys, &[0x1A; 32]);

    let mut input = vec![0xC3u8; 16];
    input.extend_from_slice(&pattern(32));
    let mut out = [0u8; 32];
    adapter
        .cipher_decrypt(key, CipherAlg::Xts, &input, &mut out)
        .unwrap();

    let cmds = mock.commands();
    // No asset traffic at all for XTS.
    assert_eq!(cmds.len(), 1);
    match &cmds[0] {
        TokenCmd::Cipher(cipher) => {
            assert_eq!(cipher.mode, CipherMode::Xts);
            assert_eq!(cipher.iv, [0xC3; 16]);
            assert!(!cipher.temp_asset.is_valid());
            assert_eq!(cipher.data.len(), 32);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn degenerate_finish_runs_init_to_final_without_the_asset() {
    let (mock, keys, adapter) = mock_adapter();
    let key = import_mac_key(&keys, KeyType::Hmac, &[0x1B; 32]);

    let mut operation = MacOperation::new();
    adapter
        .mac_sign_setup(&mut operation, key, MacAlg::Hmac(HashAlg::Sha256))
        .unwrap();
    let mut mac = [0u8; 32];
    adapter.mac_sign_finish(&mut operation, &mut mac).unwrap();

    let cmds = mock.commands();
    let macs = mac_cmds(&cmds);
    assert_eq!(macs.len(), 1);
    assert_eq!(macs[0].mode, ChainMode::Init2Final);
    // The asset exists but an init-to-final exchange must not reference it.
    assert!(!macs[0].temp_asset.is_valid());
    assert!(macs[0].data.is_empty());
    assert_eq!(macs[0].total_length, 0);
    // It is still freed afterwards.
    assert!(matches!(cmds.last(), Some(TokenCmd::AssetDelete { .. })));
}
