//! Server notification handling (RFC 4186 section 6 / RFC 4187 section 6).

use super::reauth::{build_reauth_response, retrieve_secured_attributes};
use super::{EapSimAkaSession, codes};
use crate::errors::ProcessError;
use crate::message::{Attribute, Subtype, TypeData, at};
use crate::result::EapResult;
use crate::sim::SimAuthenticator;
use simaka_crypto::secure_random_16;
use slog::warn;

impl<S: SimAuthenticator> EapSimAkaSession<S> {
    /// Handle a Notification request.  At most one notification is honored
    /// per method run; the P bit must agree with the phase and with AT_MAC
    /// presence.  The method state is never advanced by a notification.
    pub(super) fn handle_notification(
        &mut self,
        identifier: u8,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if self.has_received_notification {
            // A second notification is a misbehaving or malicious peer,
            // not something to answer on the wire.
            return Err(ProcessError::InvalidRequest(
                "multiple notifications in one method run".to_string(),
            ));
        }
        self.has_received_notification = true;

        let Some(Attribute::Notification(code)) = type_data.attribute(at::NOTIFICATION) else {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, false));
        };
        let code = *code;
        let pre_challenge_bit = code & codes::P_BIT != 0;
        if code & codes::S_BIT == 0 {
            warn!(self.logger, "server notification failure code {code}");
        }

        // Before key derivation no MAC can exist; after it one must.
        if self.keys.is_none() {
            self.handle_pre_challenge(identifier, pre_challenge_bit, type_data)
        } else {
            self.handle_post_challenge(identifier, pre_challenge_bit, type_data)
        }
    }

    fn handle_pre_challenge(
        &mut self,
        identifier: u8,
        pre_challenge_bit: bool,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if !pre_challenge_bit || type_data.has_attribute(at::MAC) {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, false));
        }
        // Bare acknowledgment; the method state is unchanged.
        Ok(self.build_response(identifier, Subtype::Notification, vec![]))
    }

    fn handle_post_challenge(
        &mut self,
        identifier: u8,
        pre_challenge_bit: bool,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if pre_challenge_bit || !self.is_valid_mac(identifier, type_data, &[])? {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, false));
        }

        if self.in_reauth {
            // A post-reauthentication notification binds the current
            // counter inside AT_ENCR_DATA; echo it back the same way.
            let k_encr = self.keys.as_ref().expect("post-challenge has keys").k_encr;
            let secured = match retrieve_secured_attributes(self.method, &k_encr, type_data) {
                Ok(secured) => secured,
                Err(e) => {
                    warn!(self.logger, "notification secured attributes: {e}");
                    return Ok(self.build_client_error(
                        identifier,
                        codes::ERROR_UNABLE_TO_PROCESS,
                        false,
                    ));
                }
            };
            let counter = secured.iter().find_map(|a| match a {
                Attribute::Counter(counter) => Some(*counter),
                _ => None,
            });
            if counter != Some(self.reauth_counter) {
                warn!(
                    self.logger,
                    "notification counter {counter:?} does not match {}", self.reauth_counter
                );
                return Ok(self.build_client_error(
                    identifier,
                    codes::ERROR_UNABLE_TO_PROCESS,
                    false,
                ));
            }

            let attributes =
                build_reauth_response(self.reauth_counter, false, &k_encr, secure_random_16());
            self.build_response_with_mac(identifier, Subtype::Notification, &[], attributes)
        } else {
            self.build_response_with_mac(identifier, Subtype::Notification, &[], vec![])
        }
    }
}
