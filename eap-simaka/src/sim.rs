//! SIM/USIM authentication capability and the UICC challenge/response wire
//! formats (3GPP TS 31.102, 7.1.2).

use crate::errors::ProcessError;

/// UICC application the credentials live on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppType {
    Sim,
    Usim,
}

/// Authentication context requested from the card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    /// GSM context: RAND in, SRES and Kc out.
    EapSim,
    /// UMTS AKA context: RAND and AUTN in, RES/CK/IK or AUTS out.
    EapAka,
}

/// The SIM/USIM authentication capability.  Implementations typically wrap
/// an IPC call into a telephony service; base64 or APDU framing belongs in
/// that adapter, not here.  `None` means the card rejected the challenge or
/// the service failed - a hard authentication failure.
pub trait SimAuthenticator {
    fn authenticate(&self, app_type: AppType, auth_type: AuthType, challenge: &[u8])
    -> Option<Vec<u8>>;
}

/// Outcome of a UMTS AKA computation on the card.
#[derive(Debug, PartialEq, Eq)]
pub enum AkaAuthResult {
    Success {
        res: Vec<u8>,
        ck: Vec<u8>,
        ik: Vec<u8>,
    },
    /// The card's sequence number diverged from the network's; AUTS lets the
    /// peer request resynchronization.
    SynchronizationFailure { auts: [u8; 14] },
}

const AKA_SUCCESS_TAG: u8 = 0xDB;
const AKA_SYNC_FAILURE_TAG: u8 = 0xDC;

/// Length-prefixed GSM challenge: |RAND| RAND.
pub fn gsm_challenge(rand: &[u8; 16]) -> Vec<u8> {
    let mut challenge = Vec::with_capacity(17);
    challenge.push(16);
    challenge.extend_from_slice(rand);
    challenge
}

/// Length-prefixed UMTS challenge: |RAND| RAND |AUTN| AUTN.
pub fn umts_challenge(rand: &[u8; 16], autn: &[u8; 16]) -> Vec<u8> {
    let mut challenge = Vec::with_capacity(34);
    challenge.push(16);
    challenge.extend_from_slice(rand);
    challenge.push(16);
    challenge.extend_from_slice(autn);
    challenge
}

/// Parse a GSM authentication response: |SRES| SRES |Kc| Kc, with SRES
/// always 4 bytes and Kc always 8.
pub fn parse_gsm_response(response: &[u8]) -> Result<([u8; 4], [u8; 8]), ProcessError> {
    let mut fields = FieldReader::new(response);
    let sres = fields.take("SRES")?;
    let kc = fields.take("Kc")?;
    fields.finish()?;

    let sres: [u8; 4] = sres
        .try_into()
        .map_err(|_| bad_response("SRES length is not 4"))?;
    let kc: [u8; 8] = kc
        .try_into()
        .map_err(|_| bad_response("Kc length is not 8"))?;
    Ok((sres, kc))
}

/// Parse a UMTS AKA authentication response: tag 0xDB followed by
/// |RES| RES |CK| CK |IK| IK, or tag 0xDC followed by |AUTS| AUTS.
pub fn parse_aka_response(response: &[u8]) -> Result<AkaAuthResult, ProcessError> {
    let (tag, rest) = response
        .split_first()
        .ok_or_else(|| bad_response("empty AKA response"))?;
    let mut fields = FieldReader::new(rest);
    match *tag {
        AKA_SUCCESS_TAG => {
            let res = fields.take("RES")?.to_vec();
            let ck = fields.take("CK")?.to_vec();
            let ik = fields.take("IK")?.to_vec();
            fields.finish()?;
            Ok(AkaAuthResult::Success { res, ck, ik })
        }
        AKA_SYNC_FAILURE_TAG => {
            let auts: [u8; 14] = fields
                .take("AUTS")?
                .try_into()
                .map_err(|_| bad_response("AUTS length is not 14"))?;
            fields.finish()?;
            Ok(AkaAuthResult::SynchronizationFailure { auts })
        }
        _ => Err(bad_response("unknown AKA response tag")),
    }
}

fn bad_response(reason: &str) -> ProcessError {
    ProcessError::AuthenticationFailure(format!("malformed SIM/USIM response: {reason}"))
}

/// Reader for the card's length-prefixed response fields.
struct FieldReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        FieldReader { bytes }
    }

    fn take(&mut self, name: &str) -> Result<&'a [u8], ProcessError> {
        let (len, rest) = self
            .bytes
            .split_first()
            .ok_or_else(|| bad_response(&format!("missing {name} length")))?;
        if rest.len() < *len as usize {
            return Err(bad_response(&format!("truncated {name}")));
        }
        let (field, rest) = rest.split_at(*len as usize);
        self.bytes = rest;
        Ok(field)
    }

    fn finish(&self) -> Result<(), ProcessError> {
        if self.bytes.is_empty() {
            Ok(())
        } else {
            Err(bad_response("trailing bytes"))
        }
    }
}
