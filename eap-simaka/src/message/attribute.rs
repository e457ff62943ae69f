use super::{DecodeError, EapMethodKind};

/// Attribute type tags, RFC 4186 section 11 / RFC 4187 section 11.
/// Tags below 128 are non-skippable; 128 and above may be ignored when
/// unrecognized.
pub mod at {
    pub const RAND: u8 = 1;
    pub const AUTN: u8 = 2;
    pub const RES: u8 = 3;
    pub const AUTS: u8 = 4;
    pub const PADDING: u8 = 6;
    pub const NONCE_MT: u8 = 7;
    pub const PERMANENT_ID_REQ: u8 = 10;
    pub const MAC: u8 = 11;
    pub const NOTIFICATION: u8 = 12;
    pub const ANY_ID_REQ: u8 = 13;
    pub const IDENTITY: u8 = 14;
    pub const VERSION_LIST: u8 = 15;
    pub const SELECTED_VERSION: u8 = 16;
    pub const FULLAUTH_ID_REQ: u8 = 17;
    pub const COUNTER: u8 = 19;
    pub const COUNTER_TOO_SMALL: u8 = 20;
    pub const NONCE_S: u8 = 21;
    pub const CLIENT_ERROR_CODE: u8 = 22;
    pub const IV: u8 = 129;
    pub const ENCR_DATA: u8 = 130;
    pub const NEXT_PSEUDONYM: u8 = 132;
    pub const NEXT_REAUTH_ID: u8 = 133;
    pub const CHECKCODE: u8 = 134;
    pub const RESULT_IND: u8 = 135;

    pub const SKIPPABLE_RANGE_START: u8 = 128;
}

/// One EAP-SIM/AKA attribute.  A closed set so that subtype handlers match
/// exhaustively; unrecognized skippable attributes are carried verbatim in
/// `Unsupported`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
    /// AT_RAND for EAP-SIM: two or three GSM RANDs (codec accepts any count,
    /// the state machine enforces the protocol minimum).
    RandSim(Vec<[u8; 16]>),
    /// AT_RAND for EAP-AKA: a single UMTS RAND.
    RandAka([u8; 16]),
    Autn([u8; 16]),
    Res(Vec<u8>),
    Auts([u8; 14]),
    /// AT_PADDING; total attribute length in bytes (4, 8 or 12), value all
    /// zero.
    Padding(usize),
    NonceMt([u8; 16]),
    NonceS([u8; 16]),
    PermanentIdReq,
    AnyIdReq,
    FullauthIdReq,
    /// AT_MAC.  The two reserved bytes are preserved as received so that
    /// re-encoding reproduces the exact MAC input; the 16-byte value is
    /// zeroed during canonicalization only.
    Mac { reserved: [u8; 2], mac: [u8; 16] },
    Notification(u16),
    Identity(Vec<u8>),
    VersionList(Vec<u16>),
    SelectedVersion(u16),
    Counter(u16),
    CounterTooSmall,
    ClientErrorCode(u16),
    Iv([u8; 16]),
    EncrData(Vec<u8>),
    NextPseudonym(Vec<u8>),
    NextReauthId(Vec<u8>),
    Checkcode(Vec<u8>),
    Unsupported { attribute_type: u8, value: Vec<u8> },
}

impl Attribute {
    pub fn attribute_type(&self) -> u8 {
        match self {
            Attribute::RandSim(_) | Attribute::RandAka(_) => at::RAND,
            Attribute::Autn(_) => at::AUTN,
            Attribute::Res(_) => at::RES,
            Attribute::Auts(_) => at::AUTS,
            Attribute::Padding(_) => at::PADDING,
            Attribute::NonceMt(_) => at::NONCE_MT,
            Attribute::NonceS(_) => at::NONCE_S,
            Attribute::PermanentIdReq => at::PERMANENT_ID_REQ,
            Attribute::AnyIdReq => at::ANY_ID_REQ,
            Attribute::FullauthIdReq => at::FULLAUTH_ID_REQ,
            Attribute::Mac { .. } => at::MAC,
            Attribute::Notification(_) => at::NOTIFICATION,
            Attribute::Identity(_) => at::IDENTITY,
            Attribute::VersionList(_) => at::VERSION_LIST,
            Attribute::SelectedVersion(_) => at::SELECTED_VERSION,
            Attribute::Counter(_) => at::COUNTER,
            Attribute::CounterTooSmall => at::COUNTER_TOO_SMALL,
            Attribute::ClientErrorCode(_) => at::CLIENT_ERROR_CODE,
            Attribute::Iv(_) => at::IV,
            Attribute::EncrData(_) => at::ENCR_DATA,
            Attribute::NextPseudonym(_) => at::NEXT_PSEUDONYM,
            Attribute::NextReauthId(_) => at::NEXT_REAUTH_ID,
            Attribute::Checkcode(_) => at::CHECKCODE,
            Attribute::Unsupported { attribute_type, .. } => *attribute_type,
        }
    }

    /// Decode one attribute from the front of `buf`, returning it and the
    /// number of bytes consumed.
    pub(super) fn decode_one(
        method: EapMethodKind,
        buf: &[u8],
    ) -> Result<(Attribute, usize), DecodeError> {
        if buf.len() < 2 {
            return Err(DecodeError::Truncated {
                needed: 2,
                remaining: buf.len(),
            });
        }
        let attribute_type = buf[0];
        let length_bytes = buf[1] as usize * 4;
        if length_bytes == 0 || length_bytes > buf.len() {
            return Err(DecodeError::MalformedAttribute {
                attribute_type,
                length_bytes,
            });
        }
        // Value bytes after the two-byte header.
        let value = &buf[2..length_bytes];

        let malformed = || DecodeError::MalformedAttribute {
            attribute_type,
            length_bytes,
        };
        let bad_value = || DecodeError::MalformedValue { attribute_type };

        let attribute = match attribute_type {
            at::RAND => match method {
                EapMethodKind::Sim => {
                    let rands = value.get(2..).ok_or_else(malformed)?;
                    if rands.is_empty() || !rands.len().is_multiple_of(16) {
                        return Err(malformed());
                    }
                    Attribute::RandSim(
                        rands
                            .chunks_exact(16)
                            .map(|c| c.try_into().expect("Can't fail"))
                            .collect(),
                    )
                }
                EapMethodKind::Aka => Attribute::RandAka(fixed_16(value).ok_or_else(malformed)?),
            },
            at::AUTN => Attribute::Autn(fixed_16(value).ok_or_else(malformed)?),
            at::RES => {
                let bits = u16::from_be_bytes(value.get(..2).ok_or_else(malformed)?.try_into().expect("Can't fail"));
                if !bits.is_multiple_of(8) {
                    return Err(bad_value());
                }
                let res_len = bits as usize / 8;
                let res = value.get(2..2 + res_len).ok_or_else(malformed)?;
                Attribute::Res(res.to_vec())
            }
            at::AUTS => {
                let auts: [u8; 14] = value.try_into().map_err(|_| malformed())?;
                Attribute::Auts(auts)
            }
            at::PADDING => {
                if length_bytes > 12 || value.iter().any(|b| *b != 0) {
                    return Err(bad_value());
                }
                Attribute::Padding(length_bytes)
            }
            at::NONCE_MT => Attribute::NonceMt(fixed_16(value).ok_or_else(malformed)?),
            at::NONCE_S => Attribute::NonceS(fixed_16(value).ok_or_else(malformed)?),
            at::PERMANENT_ID_REQ => Attribute::PermanentIdReq,
            at::ANY_ID_REQ => Attribute::AnyIdReq,
            at::FULLAUTH_ID_REQ => Attribute::FullauthIdReq,
            at::MAC => {
                if value.len() != 18 {
                    return Err(malformed());
                }
                Attribute::Mac {
                    reserved: value[..2].try_into().expect("Can't fail"),
                    mac: value[2..].try_into().expect("Can't fail"),
                }
            }
            at::NOTIFICATION => Attribute::Notification(word_value(value).ok_or_else(malformed)?),
            at::IDENTITY => Attribute::Identity(length_prefixed(value).ok_or_else(bad_value)?),
            at::VERSION_LIST => {
                let versions = length_prefixed(value).ok_or_else(bad_value)?;
                if !versions.len().is_multiple_of(2) {
                    return Err(bad_value());
                }
                Attribute::VersionList(
                    versions
                        .chunks_exact(2)
                        .map(|c| u16::from_be_bytes([c[0], c[1]]))
                        .collect(),
                )
            }
            at::SELECTED_VERSION => {
                Attribute::SelectedVersion(word_value(value).ok_or_else(malformed)?)
            }
            at::COUNTER => Attribute::Counter(word_value(value).ok_or_else(malformed)?),
            at::COUNTER_TOO_SMALL => Attribute::CounterTooSmall,
            at::CLIENT_ERROR_CODE => {
                Attribute::ClientErrorCode(word_value(value).ok_or_else(malformed)?)
            }
            at::IV => Attribute::Iv(fixed_16(value).ok_or_else(malformed)?),
            at::ENCR_DATA => {
                let ciphertext = value.get(2..).ok_or_else(malformed)?;
                if ciphertext.is_empty() || !ciphertext.len().is_multiple_of(16) {
                    return Err(bad_value());
                }
                Attribute::EncrData(ciphertext.to_vec())
            }
            at::NEXT_PSEUDONYM => {
                Attribute::NextPseudonym(length_prefixed(value).ok_or_else(bad_value)?)
            }
            at::NEXT_REAUTH_ID => {
                Attribute::NextReauthId(length_prefixed(value).ok_or_else(bad_value)?)
            }
            at::CHECKCODE => Attribute::Checkcode(value.get(2..).ok_or_else(malformed)?.to_vec()),
            t if t >= at::SKIPPABLE_RANGE_START => Attribute::Unsupported {
                attribute_type: t,
                value: value.to_vec(),
            },
            t => return Err(DecodeError::UnsupportedNonSkippable(t)),
        };

        Ok((attribute, length_bytes))
    }

    pub(crate) fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Attribute::RandSim(rands) => {
                header(out, at::RAND, 4 + 16 * rands.len());
                out.extend_from_slice(&[0, 0]);
                for rand in rands {
                    out.extend_from_slice(rand);
                }
            }
            Attribute::RandAka(rand) => reserved_16(out, at::RAND, rand),
            Attribute::Autn(autn) => reserved_16(out, at::AUTN, autn),
            Attribute::Res(res) => {
                let padded = res.len().next_multiple_of(4);
                header(out, at::RES, 4 + padded);
                out.extend_from_slice(&((res.len() as u16 * 8).to_be_bytes()));
                out.extend_from_slice(res);
                out.resize(out.len() + padded - res.len(), 0);
            }
            Attribute::Auts(auts) => {
                header(out, at::AUTS, 16);
                out.extend_from_slice(auts);
            }
            Attribute::Padding(length_bytes) => {
                header(out, at::PADDING, *length_bytes);
                out.resize(out.len() + length_bytes - 2, 0);
            }
            Attribute::NonceMt(nonce) => reserved_16(out, at::NONCE_MT, nonce),
            Attribute::NonceS(nonce) => reserved_16(out, at::NONCE_S, nonce),
            Attribute::PermanentIdReq => empty(out, at::PERMANENT_ID_REQ),
            Attribute::AnyIdReq => empty(out, at::ANY_ID_REQ),
            Attribute::FullauthIdReq => empty(out, at::FULLAUTH_ID_REQ),
            Attribute::Mac { reserved, mac } => {
                header(out, at::MAC, 20);
                out.extend_from_slice(reserved);
                out.extend_from_slice(mac);
            }
            Attribute::Notification(code) => word(out, at::NOTIFICATION, *code),
            Attribute::Identity(identity) => prefixed(out, at::IDENTITY, identity),
            Attribute::VersionList(versions) => {
                let actual = versions.len() * 2;
                let padded = actual.next_multiple_of(4);
                header(out, at::VERSION_LIST, 4 + padded);
                out.extend_from_slice(&(actual as u16).to_be_bytes());
                for version in versions {
                    out.extend_from_slice(&version.to_be_bytes());
                }
                out.resize(out.len() + padded - actual, 0);
            }
            Attribute::SelectedVersion(version) => word(out, at::SELECTED_VERSION, *version),
            Attribute::Counter(counter) => word(out, at::COUNTER, *counter),
            Attribute::CounterTooSmall => empty(out, at::COUNTER_TOO_SMALL),
            Attribute::ClientErrorCode(code) => word(out, at::CLIENT_ERROR_CODE, *code),
            Attribute::Iv(iv) => reserved_16(out, at::IV, iv),
            Attribute::EncrData(ciphertext) => {
                header(out, at::ENCR_DATA, 4 + ciphertext.len());
                out.extend_from_slice(&[0, 0]);
                out.extend_from_slice(ciphertext);
            }
            Attribute::NextPseudonym(id) => prefixed(out, at::NEXT_PSEUDONYM, id),
            Attribute::NextReauthId(id) => prefixed(out, at::NEXT_REAUTH_ID, id),
            Attribute::Checkcode(value) => {
                header(out, at::CHECKCODE, 4 + value.len());
                out.extend_from_slice(&[0, 0]);
                out.extend_from_slice(value);
            }
            Attribute::Unsupported {
                attribute_type,
                value,
            } => {
                header(out, *attribute_type, 2 + value.len());
                out.extend_from_slice(value);
            }
        }
    }
}

fn header(out: &mut Vec<u8>, attribute_type: u8, length_bytes: usize) {
    debug_assert!(length_bytes.is_multiple_of(4));
    out.push(attribute_type);
    out.push((length_bytes / 4) as u8);
}

fn reserved_16(out: &mut Vec<u8>, attribute_type: u8, value: &[u8; 16]) {
    header(out, attribute_type, 20);
    out.extend_from_slice(&[0, 0]);
    out.extend_from_slice(value);
}

fn empty(out: &mut Vec<u8>, attribute_type: u8) {
    header(out, attribute_type, 4);
    out.extend_from_slice(&[0, 0]);
}

fn word(out: &mut Vec<u8>, attribute_type: u8, value: u16) {
    header(out, attribute_type, 4);
    out.extend_from_slice(&value.to_be_bytes());
}

/// Actual-length-prefixed value zero-padded to a word boundary (AT_IDENTITY,
/// AT_NEXT_PSEUDONYM, AT_NEXT_REAUTH_ID).
fn prefixed(out: &mut Vec<u8>, attribute_type: u8, value: &[u8]) {
    let padded = value.len().next_multiple_of(4);
    header(out, attribute_type, 4 + padded);
    out.extend_from_slice(&(value.len() as u16).to_be_bytes());
    out.extend_from_slice(value);
    out.resize(out.len() + padded - value.len(), 0);
}

fn fixed_16(value: &[u8]) -> Option<[u8; 16]> {
    value.get(2..)?.try_into().ok()
}

fn word_value(value: &[u8]) -> Option<u16> {
    let bytes: [u8; 2] = value.try_into().ok()?;
    Some(u16::from_be_bytes(bytes))
}

fn length_prefixed(value: &[u8]) -> Option<Vec<u8>> {
    let actual = u16::from_be_bytes(value.get(..2)?.try_into().ok()?) as usize;
    Some(value.get(2..2 + actual)?.to_vec())
}
