use super::{Attribute, DecodeError, EapMethodKind};

/// EAP-SIM/AKA subtype, the first byte of the method type-data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtype {
    AkaChallenge,
    AkaAuthenticationReject,
    AkaSynchronizationFailure,
    AkaIdentity,
    SimStart,
    SimChallenge,
    Notification,
    Reauthentication,
    ClientError,
}

impl Subtype {
    pub fn to_u8(self) -> u8 {
        match self {
            Subtype::AkaChallenge => 1,
            Subtype::AkaAuthenticationReject => 2,
            Subtype::AkaSynchronizationFailure => 4,
            Subtype::AkaIdentity => 5,
            Subtype::SimStart => 10,
            Subtype::SimChallenge => 11,
            Subtype::Notification => 12,
            Subtype::Reauthentication => 13,
            Subtype::ClientError => 14,
        }
    }

    pub fn from_u8(method: EapMethodKind, subtype: u8) -> Result<Self, DecodeError> {
        match (method, subtype) {
            (EapMethodKind::Aka, 1) => Ok(Subtype::AkaChallenge),
            (EapMethodKind::Aka, 2) => Ok(Subtype::AkaAuthenticationReject),
            (EapMethodKind::Aka, 4) => Ok(Subtype::AkaSynchronizationFailure),
            (EapMethodKind::Aka, 5) => Ok(Subtype::AkaIdentity),
            (EapMethodKind::Sim, 10) => Ok(Subtype::SimStart),
            (EapMethodKind::Sim, 11) => Ok(Subtype::SimChallenge),
            (_, 12) => Ok(Subtype::Notification),
            (_, 13) => Ok(Subtype::Reauthentication),
            (_, 14) => Ok(Subtype::ClientError),
            (method, subtype) => Err(DecodeError::BadSubtype { subtype, method }),
        }
    }
}

/// Decoded method type-data: subtype plus the attribute list in wire order.
/// Wire order matters for MAC reproducibility; presence is looked up by tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeData {
    pub subtype: Subtype,
    pub attributes: Vec<Attribute>,
}

impl TypeData {
    pub fn new(subtype: Subtype, attributes: Vec<Attribute>) -> Self {
        TypeData {
            subtype,
            attributes,
        }
    }

    /// Decode type-data bytes: subtype, two reserved bytes, attribute list.
    pub fn decode(method: EapMethodKind, bytes: &[u8]) -> Result<Self, DecodeError> {
        if bytes.len() < 3 {
            return Err(DecodeError::Truncated {
                needed: 3,
                remaining: bytes.len(),
            });
        }
        let subtype = Subtype::from_u8(method, bytes[0])?;
        let attributes = decode_attributes(method, &bytes[3..])?;
        Ok(TypeData {
            subtype,
            attributes,
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut out = vec![self.subtype.to_u8(), 0, 0];
        for attribute in &self.attributes {
            attribute.encode(&mut out);
        }
        out
    }

    /// First attribute with the given type tag, if present.
    pub fn attribute(&self, attribute_type: u8) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.attribute_type() == attribute_type)
    }

    pub fn has_attribute(&self, attribute_type: u8) -> bool {
        self.attribute(attribute_type).is_some()
    }

    /// Canonical MAC input form: identical encoding except that the AT_MAC
    /// value bytes are zero.  The reserved bytes are kept as received.
    pub(crate) fn encode_with_zeroed_mac(&self) -> Vec<u8> {
        let canonical = TypeData {
            subtype: self.subtype,
            attributes: self
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
        };
        canonical.encode()
    }
}

/// Decode a bare attribute list (also used for decrypted AT_ENCR_DATA
/// contents, which nest an attribute list without a subtype header).
pub fn decode_attributes(
    method: EapMethodKind,
    mut bytes: &[u8],
) -> Result<Vec<Attribute>, DecodeError> {
    let mut attributes = vec![];
    while !bytes.is_empty() {
        let (attribute, consumed) = Attribute::decode_one(method, bytes)?;
        attributes.push(attribute);
        bytes = &bytes[consumed..];
    }
    Ok(attributes)
}

/// Encode a bare attribute list.
pub fn encode_attributes(attributes: &[Attribute]) -> Vec<u8> {
    let mut out = vec![];
    for attribute in attributes {
        attribute.encode(&mut out);
    }
    out
}
