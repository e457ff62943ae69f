use sha1::compress;
use sha1::digest::consts::U64;
use sha1::digest::generic_array::GenericArray;

type Block = GenericArray<u8, U64>;

// FIPS 186-2, Appendix 3.1, SHA-1 initial hash values.
const SHA1_INITIAL_STATE: [u32; 5] = [
    0x6745_2301,
    0xEFCD_AB89,
    0x98BA_DCFE,
    0x1032_5476,
    0xC3D2_E1F0,
];

/// FIPS 186-2 general-purpose pseudo-random function, profiled for EAP-SIM and
/// EAP-AKA key expansion by RFC 4186 Appendix B / RFC 4187 Appendix A.
///
/// The x_j values are produced with XSEED_j = 0, so XVAL is always the current
/// XKEY.  Each round yields 40 bytes (two invocations of the G function); the
/// concatenated output is truncated to `output_len`.
pub fn fips186_2_prf(xkey: &[u8; 20], output_len: usize) -> Vec<u8> {
    let mut xkey = *xkey;
    let mut output = Vec::with_capacity(output_len.next_multiple_of(40));
    while output.len() < output_len {
        for _ in 0..2 {
            let w = g(&xkey);
            output.extend_from_slice(&w);
            // XKEY = (1 + XKEY + w_i) mod 2^b
            add_mod_2_160(&mut xkey, &w);
        }
    }
    output.truncate(output_len);
    output
}

/// The FIPS 186-2 G function: the SHA-1 compression function applied to the
/// 160-bit input zero-padded to a single 512-bit block, without the
/// Merkle-Damgard length padding of full SHA-1.
fn g(xval: &[u8; 20]) -> [u8; 20] {
    let mut block = Block::default();
    block[..20].copy_from_slice(xval);

    let mut state = SHA1_INITIAL_STATE;
    compress(&mut state, core::slice::from_ref(&block));

    let mut out = [0u8; 20];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// xkey = (1 + xkey + w) mod 2^160, big-endian byte arithmetic.
fn add_mod_2_160(xkey: &mut [u8; 20], w: &[u8; 20]) {
    let mut carry = 1u16;
    for (x, w) in xkey.iter_mut().rev().zip(w.iter().rev()) {
        let sum = *x as u16 + *w as u16 + carry;
        *x = sum as u8;
        carry = sum >> 8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const XKEY: [u8; 20] = hex!("E7 42 99 5A 41 34 C3 79 34 FE 50 EC 20 9E 62 B9 31 48 88 99");

    #[test]
    fn expands_known_master_key() {
        // Known-answer vector: the first 32 bytes of the expansion are the
        // two 16-byte keys derived from this master key.
        let mk = hex!("F21AB6D0AA1103269C0760F94B28C957745EF8D8");
        let out = fips186_2_prf(&mk, 160);
        assert_eq!(out[..16], hex!("1C2B848ADA2B9485C52517D1A92BF4AB"));
        assert_eq!(out[16..32], hex!("C9500EC59DC62C7D7F5E9E445FA1A3C4"));
    }

    #[test]
    fn deterministic_and_sized() {
        let a = fips186_2_prf(&XKEY, 160);
        let b = fips186_2_prf(&XKEY, 160);
        assert_eq!(a.len(), 160);
        assert_eq!(a, b);
    }

    #[test]
    fn prefix_property() {
        // A shorter expansion is a prefix of a longer one from the same key.
        let short = fips186_2_prf(&XKEY, 32);
        let long = fips186_2_prf(&XKEY, 160);
        assert_eq!(short, long[..32]);
    }

    #[test]
    fn different_keys_diverge() {
        let mut other = XKEY;
        other[0] ^= 0x01;
        assert_ne!(fips186_2_prf(&XKEY, 40), fips186_2_prf(&other, 40));
    }

    #[test]
    fn g_is_not_plain_sha1() {
        // G omits the length padding, so it must differ from SHA-1 of the
        // same 20 bytes.
        use sha1::{Digest, Sha1};
        let plain: [u8; 20] = Sha1::digest(XKEY).into();
        assert_ne!(g(&XKEY), plain);
    }

    #[test]
    fn rounds_are_chained() {
        // Consecutive 20-byte output blocks must differ: the XKEY update
        // feeds each w_i back into the next round.
        let out = fips186_2_prf(&XKEY, 160);
        for pair in out.chunks_exact(20).collect::<Vec<_>>().windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
    }
}
