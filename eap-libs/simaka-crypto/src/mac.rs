use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// HMAC-SHA1-128: HMAC-SHA1 keyed with K_aut, truncated to its first 16
/// bytes.  This is the AT_MAC value for both EAP-SIM (RFC 4186, 10.14) and
/// EAP-AKA (RFC 4187, 10.15).
pub fn hmac_sha1_128(k_aut: &[u8; 16], message: &[u8]) -> [u8; 16] {
    let mut mac = HmacSha1::new_from_slice(k_aut).expect("Can't fail");
    mac.update(message);
    let digest = mac.finalize().into_bytes();
    digest[..16].try_into().expect("Can't fail")
}
