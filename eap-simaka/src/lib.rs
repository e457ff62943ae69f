//! eap-simaka - peer-side EAP-SIM (RFC 4186) and EAP-AKA (RFC 4187) method
//! state machine.
//!
//! The library decodes attribute-encoded EAP requests, drives the
//! challenge/response and fast re-authentication exchanges against a SIM/USIM
//! authentication capability supplied by the caller, derives the session keys
//! and produces encoded EAP responses.  Outer EAP transport and the SIM/USIM
//! algorithms themselves are out of scope.

mod errors;
mod keys;
mod message;
mod method;
mod result;
mod sim;

pub use errors::ProcessError;
pub use keys::{
    KEY_LEN, KeyMaterial, MASTER_KEY_LEN, SESSION_KEY_LEN, aka_master_key_input,
    sim_master_key_input,
};
pub use message::{
    Attribute, DecodeError, EapCode, EapMessage, EapMethodKind, Subtype, TypeData, at,
    decode_attributes, encode_attributes,
};
pub use method::{EapSimAkaConfig, EapSimAkaSession, ReauthContext, codes};
pub use result::EapResult;
pub use sim::{AkaAuthResult, AppType, AuthType, SimAuthenticator, gsm_challenge, umts_challenge};
