use crate::errors::ProcessError;

/// Outcome of processing one inbound EAP message.  Every inbound message
/// yields exactly one of these - the method never stays silent.
#[derive(Debug)]
pub enum EapResult {
    /// An encoded EAP response packet to hand to the transport.
    Response(Vec<u8>),

    /// The method completed successfully; MSK and EMSK are released to the
    /// framework.  K_encr and K_aut stay method-internal.
    Success { msk: Vec<u8>, emsk: Vec<u8> },

    /// The method terminated without authenticating.
    Failure,

    /// A condition the protocol does not let us answer on the wire.
    Error(ProcessError),
}

impl EapResult {
    /// The response packet, if this result carries one.  Test helper shape;
    /// also convenient for transports that only forward packets.
    pub fn packet(&self) -> Option<&[u8]> {
        match self {
            EapResult::Response(packet) => Some(packet),
            _ => None,
        }
    }
}
