//! Shared fixtures: a scripted UICC and packet-building helpers.
#![allow(dead_code)]

use std::collections::HashMap;

use eap_simaka::{
    AppType, Attribute, AuthType, EapCode, EapMessage, EapMethodKind, EapResult, SimAuthenticator,
    Subtype, TypeData, at, encode_attributes,
};
use simaka_crypto::{aes_128_cbc_encrypt, hmac_sha1_128};
use slog::{Drain, Logger, o};

pub const IDENTITY: &[u8] = b"test@android.net";

pub fn test_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_envlogger::new(drain);
    let drain = slog_async::Async::new(drain).build().fuse();
    Logger::root(drain, o!())
}

/// A UICC scripted with canned challenge -> response mappings.  An unknown
/// challenge gets no response, like a card rejecting it.
pub struct FakeSim {
    responses: HashMap<Vec<u8>, Vec<u8>>,
}

impl FakeSim {
    pub fn new() -> Self {
        FakeSim {
            responses: HashMap::new(),
        }
    }

    pub fn with_response(mut self, challenge: Vec<u8>, response: Vec<u8>) -> Self {
        self.responses.insert(challenge, response);
        self
    }
}

impl SimAuthenticator for FakeSim {
    fn authenticate(
        &self,
        _app_type: AppType,
        _auth_type: AuthType,
        challenge: &[u8],
    ) -> Option<Vec<u8>> {
        self.responses.get(challenge).cloned()
    }
}

pub fn request(identifier: u8, method: EapMethodKind, type_data: &TypeData) -> Vec<u8> {
    EapMessage {
        code: EapCode::Request,
        identifier,
        method_type: Some(method.type_byte()),
        type_data: type_data.encode(),
    }
    .encode()
}

pub fn eap_success(identifier: u8) -> Vec<u8> {
    vec![3, identifier, 0, 4]
}

pub fn eap_failure(identifier: u8) -> Vec<u8> {
    vec![4, identifier, 0, 4]
}

pub fn decode_response(method: EapMethodKind, result: &EapResult) -> TypeData {
    let packet = result
        .packet()
        .unwrap_or_else(|| panic!("expected a response, got {result:?}"));
    let message = EapMessage::decode(packet).unwrap();
    assert_eq!(message.code, EapCode::Response);
    assert_eq!(message.method_type, Some(method.type_byte()));
    TypeData::decode(method, &message.type_data).unwrap()
}

/// The AT_MAC value for a packet: HMAC-SHA1-128 over the encoded message
/// with the MAC value zeroed, concatenated with `extra`.
pub fn compute_mac(
    k_aut: &[u8; 16],
    code: EapCode,
    identifier: u8,
    method: EapMethodKind,
    type_data: &TypeData,
    extra: &[u8],
) -> [u8; 16] {
    let zeroed = TypeData::new(
        type_data.subtype,
        type_data
            .attributes
            .iter()
            .map(|attribute| match attribute {
                Attribute::Mac { reserved, .. } => Attribute::Mac {
                    reserved: *reserved,
                    mac: [0; 16],
                },
                other => other.clone(),
            })
            .collect(),
    );
    let mut input = EapMessage {
        code,
        identifier,
        method_type: Some(method.type_byte()),
        type_data: zeroed.encode(),
    }
    .encode();
    input.extend_from_slice(extra);
    hmac_sha1_128(k_aut, &input)
}

pub fn zeroed_mac() -> Attribute {
    Attribute::Mac {
        reserved: [0; 2],
        mac: [0; 16],
    }
}

pub fn set_mac(type_data: &mut TypeData, mac: [u8; 16]) {
    for attribute in &mut type_data.attributes {
        if let Attribute::Mac { mac: slot, .. } = attribute {
            *slot = mac;
        }
    }
}

/// AT_IV plus AT_ENCR_DATA holding `inner`, AT_PADDING-aligned and
/// encrypted under `k_encr`.
pub fn encrypted_attributes(k_encr: &[u8; 16], iv: [u8; 16], inner: &[Attribute]) -> Vec<Attribute> {
    let mut plaintext = encode_attributes(inner);
    let padding = plaintext.len().next_multiple_of(16) - plaintext.len();
    if padding > 0 {
        plaintext.extend(encode_attributes(&[Attribute::Padding(padding)]));
    }
    let ciphertext = aes_128_cbc_encrypt(k_encr, &iv, &plaintext).unwrap();
    vec![Attribute::Iv(iv), Attribute::EncrData(ciphertext)]
}

pub fn client_error_code(method: EapMethodKind, result: &EapResult) -> u16 {
    let response = decode_response(method, result);
    assert_eq!(response.subtype, Subtype::ClientError);
    let Some(Attribute::ClientErrorCode(code)) = response.attribute(at::CLIENT_ERROR_CODE) else {
        panic!("client error without AT_CLIENT_ERROR_CODE");
    };
    *code
}
