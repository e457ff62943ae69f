use sha1::{Digest, Sha1};
use simaka_crypto::fips186_2_prf;

pub const KEY_LEN: usize = 16;
pub const SESSION_KEY_LEN: usize = 64;
pub const MASTER_KEY_LEN: usize = 20;

const PRF_OUTPUT_LEN: usize = 2 * KEY_LEN + 2 * SESSION_KEY_LEN;

/// Derived key material for one authentication attempt.  Produced once by
/// key derivation and owned by the session; K_encr and K_aut never leave the
/// method, MSK/EMSK are released to the framework on success.  Buffers are
/// zeroed on drop.
pub struct KeyMaterial {
    pub k_encr: [u8; KEY_LEN],
    pub k_aut: [u8; KEY_LEN],
    pub msk: [u8; SESSION_KEY_LEN],
    pub emsk: [u8; SESSION_KEY_LEN],
    /// Master key, retained for fast re-authentication derivation.
    pub mk: [u8; MASTER_KEY_LEN],
}

impl KeyMaterial {
    /// Expand a master-key input into the full key set: MK = SHA-1(input),
    /// then FIPS 186-2 PRF output sliced into K_encr | K_aut | MSK | EMSK
    /// (RFC 4186/4187 section 7).
    pub fn derive(mk_input: &[u8]) -> KeyMaterial {
        let mk: [u8; MASTER_KEY_LEN] = Sha1::digest(mk_input).into();
        Self::expand(mk)
    }

    /// Fast re-authentication derivation: XKEY' = SHA-1(reauth identity |
    /// counter | NONCE_S | MK), expanded the same way.  No SIM/USIM call.
    pub fn derive_reauth(
        reauth_identity: &[u8],
        counter: u16,
        nonce_s: &[u8; 16],
        mk: &[u8; MASTER_KEY_LEN],
    ) -> KeyMaterial {
        let mut input =
            Vec::with_capacity(reauth_identity.len() + 2 + nonce_s.len() + MASTER_KEY_LEN);
        input.extend_from_slice(reauth_identity);
        input.extend_from_slice(&counter.to_be_bytes());
        input.extend_from_slice(nonce_s);
        input.extend_from_slice(mk);
        Self::derive(&input)
    }

    fn expand(mk: [u8; MASTER_KEY_LEN]) -> KeyMaterial {
        let stream = fips186_2_prf(&mk, PRF_OUTPUT_LEN);
        let mut keys = KeyMaterial {
            k_encr: [0; KEY_LEN],
            k_aut: [0; KEY_LEN],
            msk: [0; SESSION_KEY_LEN],
            emsk: [0; SESSION_KEY_LEN],
            mk,
        };
        keys.k_encr.copy_from_slice(&stream[..16]);
        keys.k_aut.copy_from_slice(&stream[16..32]);
        keys.msk.copy_from_slice(&stream[32..96]);
        keys.emsk.copy_from_slice(&stream[96..160]);
        keys
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.k_encr.fill(0);
        self.k_aut.fill(0);
        self.msk.fill(0);
        self.emsk.fill(0);
        self.mk.fill(0);
    }
}

/// Master-key input for EAP-SIM full authentication (RFC 4186, 7):
/// identity | n*Kc | NONCE_MT | version list | selected version.
pub fn sim_master_key_input(
    identity: &[u8],
    kcs: &[[u8; 8]],
    nonce_mt: &[u8; 16],
    version_list: &[u16],
    selected_version: u16,
) -> Vec<u8> {
    let mut input = Vec::with_capacity(identity.len() + 8 * kcs.len() + 16 + 2 * version_list.len() + 2);
    input.extend_from_slice(identity);
    for kc in kcs {
        input.extend_from_slice(kc);
    }
    input.extend_from_slice(nonce_mt);
    for version in version_list {
        input.extend_from_slice(&version.to_be_bytes());
    }
    input.extend_from_slice(&selected_version.to_be_bytes());
    input
}

/// Master-key input for EAP-AKA full authentication (RFC 4187, 7):
/// identity | IK | CK.
pub fn aka_master_key_input(identity: &[u8], ik: &[u8], ck: &[u8]) -> Vec<u8> {
    let mut input = Vec::with_capacity(identity.len() + ik.len() + ck.len());
    input.extend_from_slice(identity);
    input.extend_from_slice(ik);
    input.extend_from_slice(ck);
    input
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const IDENTITY: &[u8] = b"test@android.net";
    const KC_1: [u8; 8] = hex!("0102030405060708");
    const KC_2: [u8; 8] = hex!("1112131415161718");
    const NONCE_MT: [u8; 16] = hex!("0123456789ABCDEFFEDCBA9876543210");

    #[test]
    fn sim_master_key_input_is_canonical_concatenation() {
        let input = sim_master_key_input(IDENTITY, &[KC_1, KC_2], &NONCE_MT, &[1], 1);
        let mut expected = IDENTITY.to_vec();
        expected.extend_from_slice(&KC_1);
        expected.extend_from_slice(&KC_2);
        expected.extend_from_slice(&NONCE_MT);
        expected.extend_from_slice(&hex!("0001 0001"));
        assert_eq!(input, expected);

        // MK is the SHA-1 of exactly that concatenation.
        let keys = KeyMaterial::derive(&input);
        let expected_mk: [u8; 20] = Sha1::digest(&expected).into();
        assert_eq!(keys.mk, expected_mk);
    }

    #[test]
    fn derivation_is_deterministic() {
        let input = aka_master_key_input(IDENTITY, &[0xAAu8; 16], &[0xBBu8; 16]);
        let a = KeyMaterial::derive(&input);
        let b = KeyMaterial::derive(&input);
        assert_eq!(a.k_encr, b.k_encr);
        assert_eq!(a.k_aut, b.k_aut);
        assert_eq!(a.msk, b.msk);
        assert_eq!(a.emsk, b.emsk);
    }

    #[test]
    fn key_slices_are_disjoint_prf_output() {
        let keys = KeyMaterial::derive(b"input");
        let stream = fips186_2_prf(&keys.mk, PRF_OUTPUT_LEN);
        assert_eq!(keys.k_encr, stream[..16]);
        assert_eq!(keys.k_aut, stream[16..32]);
        assert_eq!(keys.msk, stream[32..96]);
        assert_eq!(keys.emsk, stream[96..160]);
    }

    #[test]
    fn reauth_derivation_binds_counter() {
        let mk = hex!("F21AB6D0AA1103269C0760F94B28C957745EF8D8");
        let nonce_s = [0x5Au8; 16];
        let a = KeyMaterial::derive_reauth(IDENTITY, 10, &nonce_s, &mk);
        let b = KeyMaterial::derive_reauth(IDENTITY, 11, &nonce_s, &mk);
        assert_ne!(a.msk, b.msk);
        assert_ne!(a.emsk, b.emsk);
    }
}
