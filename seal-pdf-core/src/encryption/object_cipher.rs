//! Per-object key derivation and symmetric ciphering of object payloads.

use crate::encryption::aes;
use crate::encryption::rc4::Rc4;
use crate::encryption::standard_security::EncryptionKey;
use crate::error::{PdfError, Result};
use crate::objects::ObjectId;

/// Symmetric algorithm applied to string and stream payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CipherAlgorithm {
    Rc4,
    Aes128,
    Aes256,
}

/// Ciphers individual objects with keys derived from the file encryption
/// key and the object identifier. The object key exists only for the
/// duration of one call; nothing is cached across objects.
pub struct ObjectCipher<'a> {
    file_key: &'a EncryptionKey,
    algorithm: CipherAlgorithm,
}

impl CipherAlgorithm {
    /// The symmetric algorithm a handler revision prescribes.
    pub fn for_revision(revision: crate::encryption::SecurityHandlerRevision) -> Self {
        use crate::encryption::SecurityHandlerRevision::*;
        match revision {
            R2 | R3 | R4Rc4 => CipherAlgorithm::Rc4,
            R4Aes128 => CipherAlgorithm::Aes128,
            R5 | R6 => CipherAlgorithm::Aes256,
        }
    }
}

impl<'a> ObjectCipher<'a> {
    pub fn new(file_key: &'a EncryptionKey, algorithm: CipherAlgorithm) -> Self {
        Self {
            file_key,
            algorithm,
        }
    }

    pub fn algorithm(&self) -> CipherAlgorithm {
        self.algorithm
    }

    /// Derive the key for one object.
    ///
    /// RC4 and AES-128: MD5 over the file key, the low 3 bytes of the object
    /// number, the low 2 bytes of the generation, and (AES only) the fixed
    /// `sAlT` suffix; truncated to min(n + 5, 16) bytes. AES-256 uses the
    /// file key unchanged.
    pub fn derive_object_key(&self, id: ObjectId) -> Vec<u8> {
        if self.algorithm == CipherAlgorithm::Aes256 {
            return self.file_key.as_bytes().to_vec();
        }

        let mut context = md5::Context::new();
        context.consume(self.file_key.as_bytes());
        context.consume(&id.number().to_le_bytes()[..3]);
        context.consume(&id.generation().to_le_bytes()[..2]);
        if self.algorithm == CipherAlgorithm::Aes128 {
            context.consume(b"sAlT");
        }

        let digest = context.finalize();
        let key_len = (self.file_key.len() + 5).min(16);
        digest.0[..key_len].to_vec()
    }

    /// Encrypt one payload. AES output is the random IV followed by the
    /// CBC ciphertext.
    pub fn encrypt(&self, id: ObjectId, plaintext: &[u8]) -> Result<Vec<u8>> {
        let object_key = self.derive_object_key(id);

        match self.algorithm {
            CipherAlgorithm::Rc4 => Ok(Rc4::new(&object_key).process(plaintext)),
            CipherAlgorithm::Aes128 | CipherAlgorithm::Aes256 => {
                let iv = aes::generate_iv();
                let ciphertext = aes::cbc_encrypt(&object_key, &iv, plaintext)?;

                let mut out = Vec::with_capacity(iv.len() + ciphertext.len());
                out.extend_from_slice(&iv);
                out.extend_from_slice(&ciphertext);
                Ok(out)
            }
        }
    }

    /// Decrypt one payload. For AES the IV is read from the first 16 bytes.
    pub fn decrypt(&self, id: ObjectId, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let object_key = self.derive_object_key(id);

        match self.algorithm {
            CipherAlgorithm::Rc4 => Ok(Rc4::new(&object_key).process(ciphertext)),
            CipherAlgorithm::Aes128 | CipherAlgorithm::Aes256 => {
                if ciphertext.is_empty() {
                    return Ok(Vec::new());
                }
                if ciphertext.len() < aes::AES_BLOCK_SIZE {
                    return Err(PdfError::UnsupportedObject(
                        id,
                        "AES payload shorter than its IV".to_string(),
                    ));
                }

                let iv: [u8; 16] = ciphertext[..16]
                    .try_into()
                    .map_err(|_| PdfError::CryptoFailure("IV slice length".to_string()))?;
                aes::cbc_decrypt(&object_key, &iv, &ciphertext[16..])
            }
        }
    }
}
