//! Cryptographic primitives for the CZDB format

use aes::{
    cipher::{Key, KeyInit},
    Aes128, Aes192, Aes256,
};
use cipher::{block_padding::Pkcs7, BlockDecryptMut};

use super::error::{CzdbError, Result};

/// AES block width; ECB ciphertexts must be a positive multiple of this.
const BLOCK_SIZE: usize = 16;

/// Decrypt an AES-ECB ciphertext and strip its PKCS#7 padding.
///
/// The key width selects the cipher: 16 bytes for AES-128, 24 for AES-192,
/// 32 for AES-256. Each 16-byte block is decrypted independently; the last
/// plaintext byte names the pad count (1..=16) and every pad byte is
/// verified during unpadding.
pub(crate) fn ecb_decrypt(ciphertext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.is_empty() || ciphertext.len() % BLOCK_SIZE != 0 {
        return Err(CzdbError::InvalidDatabase(format!(
            "ECB ciphertext length {} is not a positive multiple of {}",
            ciphertext.len(),
            BLOCK_SIZE
        )));
    }

    let mut buf = ciphertext.to_vec();
    let plaintext_len = {
        let plaintext = match key.len() {
            16 => Aes128::new(Key::<Aes128>::from_slice(key)).decrypt_padded_mut::<Pkcs7>(&mut buf),
            24 => Aes192::new(Key::<Aes192>::from_slice(key)).decrypt_padded_mut::<Pkcs7>(&mut buf),
            32 => Aes256::new(Key::<Aes256>::from_slice(key)).decrypt_padded_mut::<Pkcs7>(&mut buf),
            width => {
                return Err(CzdbError::InvalidKey(format!(
                    "unsupported key length {} (expected 16, 24 or 32 bytes)",
                    width
                )))
            }
        }
        .map_err(|_| CzdbError::InvalidDatabase("malformed block padding".to_string()))?;
        plaintext.len()
    };
    buf.truncate(plaintext_len);
    Ok(buf)
}

/// XOR `data` against a repeating pad; output length equals input length.
///
/// The geo dictionary is obfuscated with the raw key string bytes used as
/// the pad.
pub(crate) fn xor_decrypt(data: &[u8], pad: &[u8]) -> Vec<u8> {
    if pad.is_empty() {
        return data.to_vec();
    }
    data.iter()
        .enumerate()
        .map(|(i, &byte)| byte ^ pad[i % pad.len()])
        .collect()
}
