//! AES primitives for PDF encryption.
//!
//! Content ciphering uses CBC with PKCS#7 padding and an explicit IV; the
//! AES-256 revisions additionally wrap the file encryption key in CBC with a
//! zero IV and no padding (OE/UE entries) and seal the permission block in
//! ECB (Perms entry).

use crate::error::{PdfError, Result};
use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit, KeyIvInit};
use rand::Rng;

type Aes128CbcEnc = cbc::Encryptor<aes::Aes128>;
type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;
type Aes256CbcEnc = cbc::Encryptor<aes::Aes256>;
type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;
type Aes256EcbEnc = ecb::Encryptor<aes::Aes256>;
type Aes256EcbDec = ecb::Decryptor<aes::Aes256>;

pub const AES_BLOCK_SIZE: usize = 16;

/// Generate a random IV for CBC content encryption.
pub fn generate_iv() -> [u8; AES_BLOCK_SIZE] {
    let mut iv = [0u8; AES_BLOCK_SIZE];
    rand::thread_rng().fill(&mut iv[..]);
    iv
}

fn check_key(key: &[u8]) -> Result<()> {
    match key.len() {
        16 | 32 => Ok(()),
        n => Err(PdfError::CryptoFailure(format!(
            "AES key must be 16 or 32 bytes, got {n}"
        ))),
    }
}

/// Encrypt with AES-CBC and PKCS#7 padding. The key selects AES-128 or
/// AES-256. The IV is not prepended here; the caller owns IV placement.
pub fn cbc_encrypt(key: &[u8], iv: &[u8; AES_BLOCK_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    // Always pad, even when the input is block-aligned.
    let pad_len = AES_BLOCK_SIZE - data.len() % AES_BLOCK_SIZE;
    let mut buf = vec![0u8; data.len() + pad_len];
    buf[..data.len()].copy_from_slice(data);

    let ciphertext = match key.len() {
        16 => Aes128CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len()),
        _ => Aes256CbcEnc::new(key.into(), iv.into())
            .encrypt_padded_mut::<Pkcs7>(&mut buf, data.len()),
    }
    .map_err(|e| PdfError::CryptoFailure(format!("AES-CBC pad error: {e}")))?;

    Ok(ciphertext.to_vec())
}

/// Decrypt AES-CBC data and strip PKCS#7 padding.
pub fn cbc_decrypt(key: &[u8], iv: &[u8; AES_BLOCK_SIZE], data: &[u8]) -> Result<Vec<u8>> {
    check_key(key)?;

    if data.is_empty() {
        return Ok(Vec::new());
    }
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(PdfError::CryptoFailure(format!(
            "AES-CBC ciphertext length {} is not block aligned",
            data.len()
        )));
    }

    let mut buf = data.to_vec();
    let plaintext = match key.len() {
        16 => Aes128CbcDec::new(key.into(), iv.into()).decrypt_padded_mut::<Pkcs7>(&mut buf),
        _ => Aes256CbcDec::new(key.into(), iv.into()).decrypt_padded_mut::<Pkcs7>(&mut buf),
    }
    .map_err(|e| PdfError::CryptoFailure(format!("AES-CBC unpad error: {e}")))?;

    Ok(plaintext.to_vec())
}

/// AES-128-CBC with no padding over block-aligned input: the round cipher of
/// the revision 6 password hash.
pub fn cbc_encrypt_unpadded(
    key: &[u8; 16],
    iv: &[u8; AES_BLOCK_SIZE],
    data: &[u8],
) -> Result<Vec<u8>> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(PdfError::CryptoFailure(
            "unpadded CBC input is not block aligned".to_string(),
        ));
    }

    let mut buf = data.to_vec();
    let mut encryptor = Aes128CbcEnc::new(key.into(), iv.into());

    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        encryptor.encrypt_block_mut(block.into());
    }

    Ok(buf)
}

/// AES-256-CBC with a zero IV and no padding: the key-wrapping mode of the
/// OE and UE entries. Input length must be a multiple of the block size.
pub fn aes256_wrap(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(PdfError::CryptoFailure(
            "key wrap input is not block aligned".to_string(),
        ));
    }

    let iv = [0u8; AES_BLOCK_SIZE];
    let mut buf = data.to_vec();
    let mut encryptor = Aes256CbcEnc::new(key.into(), (&iv).into());

    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        encryptor.encrypt_block_mut(block.into());
    }

    Ok(buf)
}

/// Inverse of [`aes256_wrap`].
pub fn aes256_unwrap(key: &[u8; 32], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(PdfError::CryptoFailure(
            "key wrap input is not block aligned".to_string(),
        ));
    }

    let iv = [0u8; AES_BLOCK_SIZE];
    let mut buf = data.to_vec();
    let mut decryptor = Aes256CbcDec::new(key.into(), (&iv).into());

    for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
        decryptor.decrypt_block_mut(block.into());
    }

    Ok(buf)
}

/// AES-256-ECB over a single block: the Perms entry mode.
pub fn aes256_ecb_encrypt(key: &[u8; 32], block: &mut [u8; AES_BLOCK_SIZE]) {
    let mut encryptor = Aes256EcbEnc::new(key.into());
    encryptor.encrypt_block_mut(block.into());
}

/// Inverse of [`aes256_ecb_encrypt`].
pub fn aes256_ecb_decrypt(key: &[u8; 32], block: &mut [u8; AES_BLOCK_SIZE]) {
    let mut decryptor = Aes256EcbDec::new(key.into());
    decryptor.decrypt_block_mut(block.into());
}
