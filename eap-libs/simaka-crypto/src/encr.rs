use aes::Aes128;
use aes::cipher::block_padding::NoPadding;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand_core::RngCore;
use thiserror::Error;

use crate::AES_BLOCK_SIZE;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("data length {0} is not a multiple of the AES block size")]
    UnalignedData(usize),
}

/// AES-128-CBC encryption of an AT_ENCR_DATA plaintext (RFC 4186, 10.12).
/// The caller pads the plaintext to a block multiple with AT_PADDING.
pub fn aes_128_cbc_encrypt(
    k_encr: &[u8; 16],
    iv: &[u8; 16],
    plaintext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    if !plaintext.len().is_multiple_of(AES_BLOCK_SIZE) {
        return Err(CipherError::UnalignedData(plaintext.len()));
    }
    let ciphertext = Aes128CbcEnc::new(k_encr.into(), iv.into())
        .encrypt_padded_vec_mut::<NoPadding>(plaintext);
    Ok(ciphertext)
}

/// AES-128-CBC decryption, the exact inverse of [`aes_128_cbc_encrypt`].
pub fn aes_128_cbc_decrypt(
    k_encr: &[u8; 16],
    iv: &[u8; 16],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CipherError> {
    if !ciphertext.len().is_multiple_of(AES_BLOCK_SIZE) {
        return Err(CipherError::UnalignedData(ciphertext.len()));
    }
    let plaintext = Aes128CbcDec::new(k_encr.into(), iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| CipherError::UnalignedData(ciphertext.len()))?;
    Ok(plaintext)
}

/// 16 bytes from the OS-seeded CSPRNG, used for AT_IV and NONCE_MT.
pub fn secure_random_16() -> [u8; 16] {
    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}
