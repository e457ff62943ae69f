//! The EAP-SIM/AKA method state machine.

mod notification;
mod reauth;

use self::reauth::retrieve_secured_attributes;
use crate::errors::ProcessError;
use crate::keys::{KEY_LEN, KeyMaterial, MASTER_KEY_LEN, aka_master_key_input, sim_master_key_input};
use crate::message::{
    Attribute, EapCode, EapMessage, EapMethodKind, Subtype, TypeData, at,
};
use crate::result::EapResult;
use crate::sim::{
    AkaAuthResult, AppType, AuthType, SimAuthenticator, gsm_challenge, parse_aka_response,
    parse_gsm_response, umts_challenge,
};
use simaka_crypto::{hmac_sha1_128, secure_random_16};
use slog::{Logger, debug, info, warn};

/// AT_NOTIFICATION status bits and codes (RFC 4186, 10.19).
pub mod codes {
    /// S bit: set means success, clear means failure.
    pub const S_BIT: u16 = 0x8000;
    /// P bit: set means the notification precedes authentication and
    /// carries no MAC.
    pub const P_BIT: u16 = 0x4000;

    pub const SUCCESS: u16 = 32768;
    pub const GENERAL_FAILURE_PRE_CHALLENGE: u16 = 16384;
    pub const GENERAL_FAILURE_POST_CHALLENGE: u16 = 0;
    pub const TEMPORARILY_DENIED: u16 = 1026;
    pub const NOT_SUBSCRIBED: u16 = 1031;

    /// AT_CLIENT_ERROR_CODE values (RFC 4186, 10.20).
    pub const ERROR_UNABLE_TO_PROCESS: u16 = 0;
    pub const ERROR_UNSUPPORTED_VERSION: u16 = 1;
    pub const ERROR_INSUFFICIENT_CHALLENGES: u16 = 2;
    pub const ERROR_RANDS_NOT_FRESH: u16 = 3;
}

/// EAP-SIM protocol version 1, the only one defined by RFC 4186.
const EAP_SIM_VERSION: u16 = 1;

/// Method-level configuration supplied by the EAP framework.
pub struct EapSimAkaConfig {
    /// The EAP identity for this session, e.g. `b"test@android.net"`.
    pub identity: Vec<u8>,
    /// Which UICC application holds the credentials.
    pub app_type: AppType,
}

/// State carried over from an earlier successful full authentication that
/// enables the fast re-authentication entry path.
#[derive(Clone)]
pub struct ReauthContext {
    /// The fast re-authentication identity handed out by the server.
    pub reauth_identity: Vec<u8>,
    /// Highest re-authentication counter already used with this context.
    pub counter: u16,
    /// Master key from the full authentication.
    pub mk: [u8; MASTER_KEY_LEN],
    pub k_encr: [u8; KEY_LEN],
    pub k_aut: [u8; KEY_LEN],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MethodState {
    Created,
    /// Identity/start negotiation done, awaiting a challenge.
    Started,
    /// Challenge or re-authentication answered, awaiting EAP-Success,
    /// EAP-Failure or a post-challenge notification.
    AwaitingResult,
    Succeeded,
    Failed,
}

/// One EAP-SIM or EAP-AKA authentication attempt.  Feed it inbound EAP
/// packets with [`EapSimAkaSession::process`]; each call yields exactly one
/// [`EapResult`].
pub struct EapSimAkaSession<S: SimAuthenticator> {
    method: EapMethodKind,
    app_type: AppType,
    sim: S,
    logger: Logger,

    state: MethodState,
    /// Identity used in master key derivation; starts as the EAP identity
    /// and tracks what was last sent in AT_IDENTITY.
    identity: Vec<u8>,
    keys: Option<KeyMaterial>,
    has_received_notification: bool,

    // SIM version/nonce negotiation, populated by the Start round.
    nonce_mt: Option<[u8; 16]>,
    version_list: Option<Vec<u16>>,
    selected_version: Option<u16>,

    // Fast re-authentication.
    reauth: Option<ReauthContext>,
    in_reauth: bool,
    reauth_counter: u16,
    next_reauth_id: Option<Vec<u8>>,
}

impl<S: SimAuthenticator> EapSimAkaSession<S> {
    pub fn new(method: EapMethodKind, config: EapSimAkaConfig, sim: S, logger: Logger) -> Self {
        EapSimAkaSession {
            method,
            app_type: config.app_type,
            sim,
            logger,
            state: MethodState::Created,
            identity: config.identity,
            keys: None,
            has_received_notification: false,
            nonce_mt: None,
            version_list: None,
            selected_version: None,
            reauth: None,
            in_reauth: false,
            reauth_counter: 0,
            next_reauth_id: None,
        }
    }

    /// Arm the fast re-authentication path with state from a previous
    /// successful full authentication.
    pub fn with_reauth_context(mut self, context: ReauthContext) -> Self {
        self.reauth = Some(context);
        self
    }

    /// Re-authentication state to persist for the next session, available
    /// once this run has succeeded and the server supplied a next
    /// re-authentication identity.
    pub fn export_reauth_context(&self) -> Option<ReauthContext> {
        if self.state != MethodState::Succeeded {
            return None;
        }
        let keys = self.keys.as_ref()?;
        let reauth_identity = self.next_reauth_id.clone()?;
        Some(ReauthContext {
            reauth_identity,
            counter: self.reauth_counter,
            mk: keys.mk,
            k_encr: keys.k_encr,
            k_aut: keys.k_aut,
        })
    }

    /// Process one inbound EAP packet and produce exactly one result.
    pub fn process(&mut self, packet: &[u8]) -> EapResult {
        match self.process_inner(packet) {
            Ok(result) => result,
            Err(e) => {
                warn!(self.logger, "EAP-SIM/AKA method error: {e}");
                EapResult::Error(e)
            }
        }
    }

    fn process_inner(&mut self, packet: &[u8]) -> Result<EapResult, ProcessError> {
        let message = EapMessage::decode(packet)?;

        match (self.state, message.code) {
            (MethodState::Failed, EapCode::Failure) => return Ok(EapResult::Failure),
            (MethodState::Succeeded | MethodState::Failed, _) => {
                return Err(ProcessError::InvalidRequest(format!(
                    "message in terminal state {:?}",
                    self.state
                )));
            }
            _ => {}
        }

        match message.code {
            EapCode::Success => self.handle_eap_success(),
            EapCode::Failure => {
                info!(self.logger, "EAP-Failure received");
                self.state = MethodState::Failed;
                Ok(EapResult::Failure)
            }
            EapCode::Response => Err(ProcessError::InvalidRequest(
                "peer received an EAP Response".to_string(),
            )),
            EapCode::Request => self.handle_request(&message),
        }
    }

    fn handle_eap_success(&mut self) -> Result<EapResult, ProcessError> {
        if self.state != MethodState::AwaitingResult {
            return Err(ProcessError::InvalidRequest(
                "EAP-Success before the challenge completed".to_string(),
            ));
        }
        let keys = self
            .keys
            .as_ref()
            .ok_or(ProcessError::KeyStateViolation("success without keys"))?;
        info!(self.logger, "EAP-SIM/AKA method succeeded");
        self.state = MethodState::Succeeded;
        Ok(EapResult::Success {
            msk: keys.msk.to_vec(),
            emsk: keys.emsk.to_vec(),
        })
    }

    fn handle_request(&mut self, message: &EapMessage) -> Result<EapResult, ProcessError> {
        if message.method_type != Some(self.method.type_byte()) {
            return Err(ProcessError::InvalidRequest(format!(
                "method type {:?} routed to {:?} session",
                message.method_type, self.method
            )));
        }

        let type_data = match TypeData::decode(self.method, &message.type_data) {
            Ok(type_data) => type_data,
            Err(e) => {
                // The RFC lets us answer undecodable requests on the wire.
                warn!(self.logger, "undecodable request: {e}");
                return Ok(self.build_client_error(
                    message.identifier,
                    codes::ERROR_UNABLE_TO_PROCESS,
                    false,
                ));
            }
        };
        debug!(
            self.logger,
            ">> {:?} request, {} attributes",
            type_data.subtype,
            type_data.attributes.len()
        );

        match type_data.subtype {
            Subtype::Notification => self.handle_notification(message.identifier, &type_data),
            Subtype::SimStart => self.handle_sim_start(message.identifier, &type_data),
            Subtype::SimChallenge => self.handle_sim_challenge(message.identifier, &type_data),
            Subtype::AkaIdentity => self.handle_aka_identity(message.identifier, &type_data),
            Subtype::AkaChallenge => self.handle_aka_challenge(message.identifier, &type_data),
            Subtype::Reauthentication => {
                self.handle_reauthentication(message.identifier, &type_data)
            }
            Subtype::ClientError
            | Subtype::AkaAuthenticationReject
            | Subtype::AkaSynchronizationFailure => {
                // Peer-to-server subtypes must not arrive in a request.
                warn!(
                    self.logger,
                    "request carried peer-only subtype {:?}", type_data.subtype
                );
                Ok(self.build_client_error(
                    message.identifier,
                    codes::ERROR_UNABLE_TO_PROCESS,
                    true,
                ))
            }
        }
    }

    fn handle_sim_start(
        &mut self,
        identifier: u8,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if !matches!(self.state, MethodState::Created | MethodState::Started) {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        let Some(Attribute::VersionList(versions)) = type_data.attribute(at::VERSION_LIST) else {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        };
        if !versions.contains(&EAP_SIM_VERSION) {
            warn!(self.logger, "no common EAP-SIM version in {versions:?}");
            return Ok(self.build_client_error(
                identifier,
                codes::ERROR_UNSUPPORTED_VERSION,
                true,
            ));
        }

        // NONCE_MT is generated once per method run even if the server sends
        // several Start rounds.
        let nonce_mt = *self.nonce_mt.get_or_insert_with(secure_random_16);
        debug!(self.logger, "NONCE_MT {}", hex::encode(nonce_mt));
        self.version_list = Some(versions.clone());
        self.selected_version = Some(EAP_SIM_VERSION);

        let mut attributes = vec![
            Attribute::NonceMt(nonce_mt),
            Attribute::SelectedVersion(EAP_SIM_VERSION),
        ];
        if requests_identity(type_data) {
            attributes.push(Attribute::Identity(self.identity.clone()));
        }

        self.state = MethodState::Started;
        Ok(self.build_response(identifier, Subtype::SimStart, attributes))
    }

    fn handle_sim_challenge(
        &mut self,
        identifier: u8,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if self.state != MethodState::Started {
            // A challenge without the Start round leaves us with no
            // NONCE_MT or version state to derive keys from.
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        let Some(Attribute::RandSim(rands)) = type_data.attribute(at::RAND) else {
            return Ok(self.build_client_error(
                identifier,
                codes::ERROR_INSUFFICIENT_CHALLENGES,
                true,
            ));
        };
        let rands = rands.clone();
        if rands.len() < 2 || rands.len() > 3 {
            warn!(self.logger, "challenge carried {} RANDs", rands.len());
            return Ok(self.build_client_error(
                identifier,
                codes::ERROR_INSUFFICIENT_CHALLENGES,
                true,
            ));
        }
        if has_duplicates(&rands) {
            return Ok(self.build_client_error(identifier, codes::ERROR_RANDS_NOT_FRESH, true));
        }

        let mut kcs = Vec::with_capacity(rands.len());
        let mut sres_all = Vec::with_capacity(rands.len() * 4);
        for rand in &rands {
            let response = self
                .sim
                .authenticate(self.app_type, AuthType::EapSim, &gsm_challenge(rand))
                .ok_or_else(|| {
                    ProcessError::AuthenticationFailure(
                        "SIM returned no GSM authentication response".to_string(),
                    )
                })?;
            let (sres, kc) = parse_gsm_response(&response)?;
            sres_all.extend_from_slice(&sres);
            kcs.push(kc);
        }

        let nonce_mt = self.nonce_mt.expect("Started implies NONCE_MT");
        let version_list = self.version_list.clone().expect("Started implies versions");
        let selected = self.selected_version.expect("Started implies version");
        let mk_input =
            sim_master_key_input(&self.identity, &kcs, &nonce_mt, &version_list, selected);
        self.keys = Some(KeyMaterial::derive(&mk_input));

        // The challenge MAC covers the request plus NONCE_MT.
        if !self.is_valid_mac(identifier, type_data, &nonce_mt)? {
            warn!(self.logger, "challenge MAC invalid");
            self.keys = None;
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        if let Err(e) = self.store_next_reauth_id(type_data) {
            warn!(self.logger, "challenge secured attributes: {e}");
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        info!(self.logger, "SIM challenge verified, keys derived");
        self.state = MethodState::AwaitingResult;
        // The response MAC covers the response plus the concatenated SRES
        // values.
        self.build_response_with_mac(identifier, Subtype::SimChallenge, &sres_all, vec![])
    }

    fn handle_aka_identity(
        &mut self,
        identifier: u8,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if !matches!(self.state, MethodState::Created | MethodState::Started) {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }
        if !requests_identity(type_data) {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }
        let attributes = vec![Attribute::Identity(self.identity.clone())];
        self.state = MethodState::Started;
        Ok(self.build_response(identifier, Subtype::AkaIdentity, attributes))
    }

    fn handle_aka_challenge(
        &mut self,
        identifier: u8,
        type_data: &TypeData,
    ) -> Result<EapResult, ProcessError> {
        if !matches!(self.state, MethodState::Created | MethodState::Started) {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        }

        let (Some(Attribute::RandAka(rand)), Some(Attribute::Autn(autn))) =
            (type_data.attribute(at::RAND), type_data.attribute(at::AUTN))
        else {
            return Ok(self.build_client_error(identifier, codes::ERROR_UNABLE_TO_PROCESS, true));
        };
        let (rand, autn) = (*rand, *autn);

        let response = self
            .sim
            .authenticate(
                self.app_type,
                AuthType::EapAka,
                &umts_challenge(&rand, &autn),
            )
            .ok_or_else(|| {
                ProcessError::AuthenticationFailure(
                    "USIM returned no AKA authentication response".to_string(),
                )
            })?;

        match parse_aka_response(&response)? {
            AkaAuthResult::SynchronizationFailure { auts } => {
                // Not fatal: answer with AUTS and await a fresh challenge.
                info!(self.logger, "USIM reported synchronization failure");
                Ok(self.build_response(
                    identifier,
                    Subtype::AkaSynchronizationFailure,
                    vec![Attribute::Auts(auts)],
                ))
            }
            AkaAuthResult::Success { res, ck, ik } => {
                let mk_input = aka_master_key_input(&self.identity, &ik, &ck);
                self.keys = Some(KeyMaterial::derive(&mk_input));

                if !self.is_valid_mac(identifier, type_data, &[])? {
                    warn!(self.logger, "challenge MAC invalid");
                    self.keys = None;
                    return Ok(self.build_client_error(
                        identifier,
                        codes::ERROR_UNABLE_TO_PROCESS,
                        true,
                    ));
                }

                if let Err(e) = self.store_next_reauth_id(type_data) {
                    warn!(self.logger, "challenge secured attributes: {e}");
                    return Ok(self.build_client_error(
                        identifier,
                        codes::ERROR_UNABLE_TO_PROCESS,
                        true,
                    ));
                }

                info!(self.logger, "AKA challenge verified, keys derived");
                self.state = MethodState::AwaitingResult;
                self.build_response_with_mac(
                    identifier,
                    Subtype::AkaChallenge,
                    &[],
                    vec![Attribute::Res(res)],
                )
            }
        }
    }

    /// Servers may grant the next fast re-authentication identity inside
    /// AT_ENCR_DATA on the challenge itself.  Called only after the
    /// challenge MAC has been validated, so keys exist.
    fn store_next_reauth_id(&mut self, type_data: &TypeData) -> Result<(), ProcessError> {
        if !type_data.has_attribute(at::ENCR_DATA) {
            return Ok(());
        }
        let k_encr = self.keys.as_ref().expect("challenge validated").k_encr;
        let secured = retrieve_secured_attributes(self.method, &k_encr, type_data)?;
        if let Some(id) = secured.iter().find_map(|a| match a {
            Attribute::NextReauthId(id) => Some(id.clone()),
            _ => None,
        }) {
            info!(self.logger, "granted a fast re-authentication identity");
            self.next_reauth_id = Some(id);
        }
        Ok(())
    }

    // MAC engine.

    /// Compute the AT_MAC value for a packet: HMAC-SHA1-128 over the full
    /// EAP message with the MAC value zeroed, concatenated with `extra`.
    fn get_mac(
        &self,
        code: EapCode,
        identifier: u8,
        type_data: &TypeData,
        extra: &[u8],
    ) -> Result<[u8; 16], ProcessError> {
        let keys = self.keys.as_ref().ok_or(ProcessError::KeyStateViolation(
            "MAC requested before key derivation",
        ))?;
        let mut input = EapMessage {
            code,
            identifier,
            method_type: Some(self.method.type_byte()),
            type_data: type_data.encode_with_zeroed_mac(),
        }
        .encode();
        input.extend_from_slice(extra);
        Ok(hmac_sha1_128(&keys.k_aut, &input))
    }

    /// Recompute and compare the request's AT_MAC.  A missing or mismatching
    /// MAC is `false`, never an error: MAC failure is answered on the wire.
    fn is_valid_mac(
        &self,
        identifier: u8,
        type_data: &TypeData,
        extra: &[u8],
    ) -> Result<bool, ProcessError> {
        let Some(Attribute::Mac { mac, .. }) = type_data.attribute(at::MAC) else {
            return Ok(false);
        };
        let computed = self.get_mac(EapCode::Request, identifier, type_data, extra)?;
        Ok(computed == *mac)
    }

    // Response builders.

    fn build_response(
        &self,
        identifier: u8,
        subtype: Subtype,
        attributes: Vec<Attribute>,
    ) -> EapResult {
        debug!(self.logger, "<< {subtype:?} response");
        let type_data = TypeData::new(subtype, attributes);
        EapResult::Response(EapMessage::response(identifier, self.method, &type_data))
    }

    /// Build a response carrying AT_MAC: the MAC is computed over the
    /// response with a zeroed MAC slot, then written into that slot.
    fn build_response_with_mac(
        &self,
        identifier: u8,
        subtype: Subtype,
        extra: &[u8],
        mut attributes: Vec<Attribute>,
    ) -> Result<EapResult, ProcessError> {
        attributes.push(Attribute::Mac {
            reserved: [0; 2],
            mac: [0; 16],
        });
        let mut type_data = TypeData::new(subtype, attributes);
        let mac = self.get_mac(EapCode::Response, identifier, &type_data, extra)?;
        for attribute in &mut type_data.attributes {
            if let Attribute::Mac { mac: slot, .. } = attribute {
                *slot = mac;
            }
        }
        debug!(self.logger, "<< {subtype:?} response with MAC");
        Ok(EapResult::Response(EapMessage::response(
            identifier,
            self.method,
            &type_data,
        )))
    }

    fn build_client_error(&mut self, identifier: u8, code: u16, fatal: bool) -> EapResult {
        if fatal {
            self.state = MethodState::Failed;
        }
        warn!(self.logger, "<< client error {code} (fatal: {fatal})");
        self.build_response(
            identifier,
            Subtype::ClientError,
            vec![Attribute::ClientErrorCode(code)],
        )
    }
}

fn requests_identity(type_data: &TypeData) -> bool {
    type_data.has_attribute(at::PERMANENT_ID_REQ)
        || type_data.has_attribute(at::ANY_ID_REQ)
        || type_data.has_attribute(at::FULLAUTH_ID_REQ)
}

fn has_duplicates(rands: &[[u8; 16]]) -> bool {
    rands
        .iter()
        .enumerate()
        .any(|(i, rand)| rands[..i].contains(rand))
}
