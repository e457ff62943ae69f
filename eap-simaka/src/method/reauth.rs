//! Fast re-authentication: AT_ENCR_DATA handling and the re-authentication
//! request path.

use super::{EapSimAkaSession, MethodState, codes};
use crate::errors::ProcessError;
use crate::keys::KeyMaterial;
use crate::message::{
    Attribute, EapMethodKind, Subtype, TypeData, at, decode_attributes, encode_attributes,
};
use crate::result::EapResult;
use crate::sim::SimAuthenticator;
use simaka_crypto::{AES_BLOCK_SIZE, aes_128_cbc_decrypt, aes_128_cbc_encrypt, secure_random_16};
use slog::{info, warn};

/// Assemble the encrypted part of a re-authentication (or post-reauth
/// notification) response: AT_COUNTER, optionally AT_COUNTER_TOO_SMALL,
/// padded to the AES block size with AT_PADDING, encrypted under `k_encr`
/// with the given fresh IV.  Returns exactly [AT_IV, AT_ENCR_DATA].
pub(super) fn build_reauth_response(
    counter: u16,
    counter_too_small: bool,
    k_encr: &[u8; 16],
    iv: [u8; 16],
) -> Vec<Attribute> {
    let mut inner = vec![Attribute::Counter(counter)];
    if counter_too_small {
        inner.push(Attribute::CounterTooSmall);
    }
    let mut plaintext = encode_attributes(&inner);
    let padding = plaintext.len().next_multiple_of(AES_BLOCK_SIZE) - plaintext.len();
    if padding > 0 {
        Attribute::Padding(padding).encode(&mut plaintext);
    }

    let ciphertext =
        aes_128_cbc_encrypt(k_encr, &iv, &plaintext).expect("padded to the block size");
    vec![Attribute::Iv(iv), Attribute::EncrData(ciphertext)]
}

/// Locate AT_IV and AT_ENCR_DATA in `type_data`, decrypt with `k_encr` and
/// decode the plaintext as a nested attribute list.
pub(super) fn retrieve_secured_attributes(
    method: EapMethodKind,
    k_encr: &[u8; 16],
    type_data: &TypeData,
) -> Result<Vec<Attribute>, ProcessError> {
    let Some(Attribute::Iv(iv)) = type_data.attribute(at::IV) else {
        return Err(ProcessError::InvalidRequest(
            "secured attributes without AT_IV".to_string(),
        ));
    };
    let Some(Attribute::EncrData(ciphertext)) = type_data.attribute(at::ENCR_DATA) else {
        return Err(ProcessError::InvalidRequest(
            "secured attributes without AT_ENCR_DATA".to_string(),
        ));
    };
    let plaintext = aes_128_cbc_decrypt(k_encr, iv, ciphertext).map_err(|e| {
        ProcessError::InvalidRequest(format!("undecryptable AT_ENCR_DATA: {e}"))
    })?;
    Ok(decode_attributes(method, &plaintext)?)
}

fn find_counter(attributes: &[Attribute]) -> Option<u16> {
    attributes.iter().find_map(|a| match a {
        Attribute::Counter(counter) => Some(*counter),
        _ => None,
    })
}

impl<S: SimAuthenticator> EapSimAkaSession<S> {
    pub(super) fn handle_reauthentication(
        &mut self,
        identifier: u8,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if !matches!(self.state, MethodState::Created | MethodState::Started) {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }
        let Some(context) = self.reauth.clone() else {
            warn!(self.logger, "re-authentication without a stored context");
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        };

        // The request is protected with the keys of the preceding full
        // authentication; make them current before any MAC work.
        if self.keys.is_none() {
            self.keys = Some(KeyMaterial {
                k_encr: context.k_encr,
                k_aut: context.k_aut,
                msk: [0; 64],
                emsk: [0; 64],
                mk: context.mk,
            });
        }

        if !self.is_valid_mac(identifier, type_data, &[])? {
            warn!(self.logger, "re-authentication MAC invalid");
            self.keys = None;
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        let secured =
            match retrieve_secured_attributes(self.method, &context.k_encr, type_data) {
                Ok(secured) => secured,
                Err(e) => {
                    warn!(self.logger, "re-authentication secured attributes: {e}");
                    return Ok(self.build_client_error(
                        identifier,
                        codes::ERROR_UNABLE_TO_PROCESS,
                        true,
                    ));
                }
            };

        let Some(counter) = find_counter(&secured) else {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        };
        let Some(Attribute::NonceS(nonce_s)) = secured
            .iter()
            .find(|a| a.attribute_type() == at::NONCE_S)
        else {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        };

        // The counter must advance beyond anything already used with this
        // context; a replayed or stale counter is rejected outright.
        if counter <= context.counter {
            warn!(
                self.logger,
                "re-authentication counter {counter} not above {}", context.counter
            );
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        let keys =
            KeyMaterial::derive_reauth(&context.reauth_identity, counter, nonce_s, &context.mk);
        self.in_reauth = true;
        self.reauth_counter = counter;
        self.next_reauth_id = secured.iter().find_map(|a| match a {
            Attribute::NextReauthId(id) => Some(id.clone()),
            _ => None,
        });
        self.identity = context.reauth_identity.clone();
        self.keys = Some(keys);

        info!(
            self.logger,
            "re-authentication accepted at counter {counter}"
        );
        self.state = MethodState::AwaitingResult;

        let k_encr = self.keys.as_ref().expect("just set").k_encr;
        let attributes = build_reauth_response(counter, false, &k_encr, secure_random_16());
        let nonce_s = *nonce_s;
        // The response MAC additionally covers NONCE_S.
        self.build_response_with_mac(identifier, Subtype::Reauthentication, &nonce_s, attributes)
    }
}
