//! EAP message framing and the EAP-SIM/AKA attribute codec.

mod attribute;
mod type_data;

pub use attribute::{Attribute, at};
pub use type_data::{Subtype, TypeData, decode_attributes, encode_attributes};

use thiserror::Error;

/// EAP header length: code, identifier, 2-byte length.
pub const EAP_HEADER_LEN: usize = 4;

/// Errors from decoding an EAP packet or its SIM/AKA type-data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("packet truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("unknown EAP code {0}")]
    BadCode(u8),

    #[error("EAP length field {declared} does not match packet length {actual}")]
    BadLength { declared: u16, actual: usize },

    #[error("unexpected EAP method type {0}")]
    BadMethodType(u8),

    #[error("subtype {subtype} is not valid for {method:?}")]
    BadSubtype { subtype: u8, method: EapMethodKind },

    #[error("attribute {attribute_type} has malformed length {length_bytes}")]
    MalformedAttribute {
        attribute_type: u8,
        length_bytes: usize,
    },

    #[error("attribute {attribute_type} has malformed value")]
    MalformedValue { attribute_type: u8 },

    #[error("unrecognized non-skippable attribute {0}")]
    UnsupportedNonSkippable(u8),
}

/// EAP packet code, RFC 3748 section 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EapCode {
    Request = 1,
    Response = 2,
    Success = 3,
    Failure = 4,
}

impl EapCode {
    fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            1 => Ok(EapCode::Request),
            2 => Ok(EapCode::Response),
            3 => Ok(EapCode::Success),
            4 => Ok(EapCode::Failure),
            other => Err(DecodeError::BadCode(other)),
        }
    }
}

/// Which EAP method a session speaks.  Fixed at construction; decides the
/// method type byte, the valid subtype set and the master key recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EapMethodKind {
    Sim,
    Aka,
}

impl EapMethodKind {
    /// IANA EAP method type byte: 18 for EAP-SIM, 23 for EAP-AKA.
    pub fn type_byte(self) -> u8 {
        match self {
            EapMethodKind::Sim => 18,
            EapMethodKind::Aka => 23,
        }
    }
}

/// One parsed EAP packet.  `method_type` and `type_data` are present for
/// Request/Response; Success/Failure carry neither.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EapMessage {
    pub code: EapCode,
    pub identifier: u8,
    pub method_type: Option<u8>,
    pub type_data: Vec<u8>,
}

impl EapMessage {
    pub fn decode(packet: &[u8]) -> Result<Self, DecodeError> {
        if packet.len() < EAP_HEADER_LEN {
            return Err(DecodeError::Truncated {
                needed: EAP_HEADER_LEN,
                remaining: packet.len(),
            });
        }
        let code = EapCode::from_u8(packet[0])?;
        let identifier = packet[1];
        let declared = u16::from_be_bytes([packet[2], packet[3]]);
        if declared as usize != packet.len() {
            return Err(DecodeError::BadLength {
                declared,
                actual: packet.len(),
            });
        }

        let (method_type, type_data) = match code {
            EapCode::Success | EapCode::Failure => (None, vec![]),
            EapCode::Request | EapCode::Response => {
                if packet.len() < EAP_HEADER_LEN + 1 {
                    return Err(DecodeError::Truncated {
                        needed: EAP_HEADER_LEN + 1,
                        remaining: packet.len(),
                    });
                }
                (Some(packet[4]), packet[5..].to_vec())
            }
        };

        Ok(EapMessage {
            code,
            identifier,
            method_type,
            type_data,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let length = EAP_HEADER_LEN
            + self.method_type.map_or(0, |_| 1 + self.type_data.len());
        let mut packet = Vec::with_capacity(length);
        packet.push(self.code as u8);
        packet.push(self.identifier);
        packet.extend_from_slice(&(length as u16).to_be_bytes());
        if let Some(method_type) = self.method_type {
            packet.push(method_type);
            packet.extend_from_slice(&self.type_data);
        }
        packet
    }

    /// Assemble an EAP Response packet echoing `identifier`.
    pub fn response(identifier: u8, method: EapMethodKind, type_data: &TypeData) -> Vec<u8> {
        EapMessage {
            code: EapCode::Response,
            identifier,
            method_type: Some(method.type_byte()),
            type_data: type_data.encode(),
        }
        .encode()
    }
}
