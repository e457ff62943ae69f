//! simaka-crypto - cryptographic primitives for EAP-SIM and EAP-AKA (RFC 4186/4187)

mod encr;
mod mac;
mod prf;

pub use encr::{CipherError, aes_128_cbc_decrypt, aes_128_cbc_encrypt, secure_random_16};
pub use mac::hmac_sha1_128;
pub use prf::fips186_2_prf;

pub const AES_BLOCK_SIZE: usize = 16;
