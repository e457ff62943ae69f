//! Server notifications: phase/P-bit agreement, MAC requirements and the
//! one-notification-per-run rule.

mod common;

use common::*;
use eap_simaka::{
    AppType, Attribute, EapCode, EapMethodKind, EapResult, EapSimAkaConfig, EapSimAkaSession,
    KeyMaterial, ProcessError, Subtype, TypeData, aka_master_key_input, at, codes, umts_challenge,
};
use hex_literal::hex;

const RAND: [u8; 16] = hex!("D1D2D3D4D5D6D7D8D9DADBDCDDDEDFE0");
const AUTN: [u8; 16] = hex!("E1E2E3E4E5E6E7E8E9EAEBECEDEEEFF0");
const RES: [u8; 8] = hex!("1122334455667788");
const CK: [u8; 16] = hex!("000102030405060708090A0B0C0D0E0F");
const IK: [u8; 16] = hex!("101112131415161718191A1B1C1D1E1F");

fn aka_session() -> EapSimAkaSession<FakeSim> {
    let mut response = vec![0xDB, 8];
    response.extend_from_slice(&RES);
    response.push(16);
    response.extend_from_slice(&CK);
    response.push(16);
    response.extend_from_slice(&IK);
    let sim = FakeSim::new().with_response(umts_challenge(&RAND, &AUTN), response);
    EapSimAkaSession::new(
        EapMethodKind::Aka,
        EapSimAkaConfig {
            identity: IDENTITY.to_vec(),
            app_type: AppType::Usim,
        },
        sim,
        test_logger(),
    )
}

/// Run the challenge round so that keys exist, returning the key set.
fn authenticated_session() -> (EapSimAkaSession<FakeSim>, KeyMaterial) {
    let mut session = aka_session();
    let keys = KeyMaterial::derive(&aka_master_key_input(IDENTITY, &IK, &CK));
    let mut challenge = TypeData::new(
        Subtype::AkaChallenge,
        vec![Attribute::RandAka(RAND), Attribute::Autn(AUTN), zeroed_mac()],
    );
    let mac = compute_mac(
        &keys.k_aut,
        EapCode::Request,
        1,
        EapMethodKind::Aka,
        &challenge,
        &[],
    );
    set_mac(&mut challenge, mac);
    let result = session.process(&request(1, EapMethodKind::Aka, &challenge));
    assert!(result.packet().is_some());
    (session, keys)
}

fn notification_request(identifier: u8, code: u16) -> Vec<u8> {
    let type_data = TypeData::new(Subtype::Notification, vec![Attribute::Notification(code)]);
    request(identifier, EapMethodKind::Aka, &type_data)
}

#[test]
fn pre_challenge_failure_is_acknowledged() {
    let mut session = aka_session();
    let result = session.process(&notification_request(
        1,
        codes::GENERAL_FAILURE_PRE_CHALLENGE,
    ));
    let response = decode_response(EapMethodKind::Aka, &result);
    assert_eq!(response.subtype, Subtype::Notification);
    assert!(response.attributes.is_empty());
}

#[test]
fn second_notification_is_an_error() {
    let mut session = aka_session();
    session.process(&notification_request(1, codes::GENERAL_FAILURE_PRE_CHALLENGE));
    assert!(matches!(
        session.process(&notification_request(2, codes::TEMPORARILY_DENIED)),
        EapResult::Error(ProcessError::InvalidRequest(_))
    ));
}

#[test]
fn pre_challenge_requires_the_p_bit() {
    let mut session = aka_session();
    // TEMPORARILY_DENIED has the P bit clear, so it cannot arrive before
    // the challenge.
    let result = session.process(&notification_request(1, codes::TEMPORARILY_DENIED));
    assert_eq!(
        client_error_code(EapMethodKind::Aka, &result),
        codes::ERROR_UNABLE_TO_PROCESS
    );

    // Not terminal: the identity round still runs.
    let identity_request = TypeData::new(Subtype::AkaIdentity, vec![Attribute::AnyIdReq]);
    let result = session.process(&request(2, EapMethodKind::Aka, &identity_request));
    assert_eq!(
        decode_response(EapMethodKind::Aka, &result).subtype,
        Subtype::AkaIdentity
    );
}

#[test]
fn missing_notification_code_is_rejected() {
    let mut session = aka_session();
    let type_data = TypeData::new(Subtype::Notification, vec![]);
    let result = session.process(&request(1, EapMethodKind::Aka, &type_data));
    assert_eq!(
        client_error_code(EapMethodKind::Aka, &result),
        codes::ERROR_UNABLE_TO_PROCESS
    );
}

#[test]
fn post_challenge_success_notification_is_mac_protected() {
    let (mut session, keys) = authenticated_session();

    let mut type_data = TypeData::new(
        Subtype::Notification,
        vec![Attribute::Notification(codes::SUCCESS), zeroed_mac()],
    );
    let mac = compute_mac(
        &keys.k_aut,
        EapCode::Request,
        2,
        EapMethodKind::Aka,
        &type_data,
        &[],
    );
    set_mac(&mut type_data, mac);

    let result = session.process(&request(2, EapMethodKind::Aka, &type_data));
    let response = decode_response(EapMethodKind::Aka, &result);
    assert_eq!(response.subtype, Subtype::Notification);
    let Some(Attribute::Mac { mac, .. }) = response.attribute(at::MAC) else {
        panic!("notification response without AT_MAC");
    };
    assert_eq!(
        *mac,
        compute_mac(
            &keys.k_aut,
            EapCode::Response,
            2,
            EapMethodKind::Aka,
            &response,
            &[],
        )
    );

    // The notification leaves the method awaiting the EAP-Success.
    assert!(matches!(
        session.process(&eap_success(3)),
        EapResult::Success { .. }
    ));
}

#[test]
fn post_challenge_notification_without_mac_is_rejected() {
    let (mut session, _keys) = authenticated_session();
    let result = session.process(&notification_request(2, codes::SUCCESS));
    assert_eq!(
        client_error_code(EapMethodKind::Aka, &result),
        codes::ERROR_UNABLE_TO_PROCESS
    );
}

#[test]
fn post_challenge_notification_with_p_bit_is_rejected() {
    let (mut session, keys) = authenticated_session();
    let mut type_data = TypeData::new(
        Subtype::Notification,
        vec![
            Attribute::Notification(codes::GENERAL_FAILURE_PRE_CHALLENGE),
            zeroed_mac(),
        ],
    );
    let mac = compute_mac(
        &keys.k_aut,
        EapCode::Request,
        2,
        EapMethodKind::Aka,
        &type_data,
        &[],
    );
    set_mac(&mut type_data, mac);
    let result = session.process(&request(2, EapMethodKind::Aka, &type_data));
    assert_eq!(
        client_error_code(EapMethodKind::Aka, &result),
        codes::ERROR_UNABLE_TO_PROCESS
    );
}
