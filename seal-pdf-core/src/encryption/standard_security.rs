//! Standard security handler key derivation according to ISO 32000.
//!
//! Two independent pipelines live here. Revisions 2-4 derive everything from
//! an MD5/RC4 pipeline over padded passwords (Algorithms 2-7). Revisions 5-6
//! use a salted SHA-2 hash over UTF-8 passwords and wrap a random file key in
//! AES-256 (Algorithms 2.A, 2.B, 8-10, 13). The byte layouts share nothing,
//! so the paths are kept separate rather than parameterized.

use crate::encryption::aes;
use crate::encryption::rc4::Rc4;
use crate::encryption::Permissions;
use crate::error::{PdfError, Result};
use rand::Rng;
use sha2::{Digest, Sha256, Sha384, Sha512};
use std::fmt;

/// Padding used in password processing (revisions 2-4)
pub const PASSWORD_PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// User password
#[derive(Debug, Clone, Default)]
pub struct UserPassword(pub String);

/// Owner password
#[derive(Debug, Clone, Default)]
pub struct OwnerPassword(pub String);

/// File encryption key.
///
/// Owned by one encryption run; the bytes are wiped when the value is
/// dropped so secret material does not linger in freed memory.
pub struct EncryptionKey {
    key: Vec<u8>,
}

impl EncryptionKey {
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.key
    }

    pub fn len(&self) -> usize {
        self.key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_empty()
    }
}

impl Drop for EncryptionKey {
    fn drop(&mut self) {
        for byte in self.key.iter_mut() {
            *byte = 0;
        }
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKey({} bytes)", self.key.len())
    }
}

/// Security handler revision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityHandlerRevision {
    /// Revision 2 (RC4 40-bit)
    R2,
    /// Revision 3 (RC4, 40-128 bit)
    R3,
    /// Revision 4 with the V2 crypt filter (RC4)
    R4Rc4,
    /// Revision 4 with the AESV2 crypt filter (AES-128)
    R4Aes128,
    /// Revision 5 (AES-256)
    R5,
    /// Revision 6 (AES-256, hardened hash)
    R6,
}

impl SecurityHandlerRevision {
    /// The R number stored in the encryption dictionary.
    pub fn revision_number(&self) -> u32 {
        match self {
            Self::R2 => 2,
            Self::R3 => 3,
            Self::R4Rc4 | Self::R4Aes128 => 4,
            Self::R5 => 5,
            Self::R6 => 6,
        }
    }

    /// The V number stored in the encryption dictionary.
    pub fn version_number(&self) -> u32 {
        match self {
            Self::R2 => 1,
            Self::R3 => 2,
            Self::R4Rc4 | Self::R4Aes128 => 4,
            Self::R5 | Self::R6 => 5,
        }
    }

    pub fn is_aes256(&self) -> bool {
        matches!(self, Self::R5 | Self::R6)
    }

    /// Check a key length in bits against the revision's allowed set.
    pub fn validate_key_length(&self, bits: u16) -> Result<()> {
        let ok = match self {
            Self::R2 => bits == 40,
            Self::R3 | Self::R4Rc4 => bits % 8 == 0 && (40..=128).contains(&bits),
            // The AESV2 crypt filter keys AES-128; nothing shorter fits.
            Self::R4Aes128 => bits == 128,
            Self::R5 | Self::R6 => bits == 256,
        };

        if ok {
            Ok(())
        } else {
            Err(PdfError::InvalidPolicy(format!(
                "key length {bits} is not valid for revision {}",
                self.revision_number()
            )))
        }
    }
}

/// Standard security handler: stateless per call, one instance per run.
pub struct StandardSecurityHandler {
    revision: SecurityHandlerRevision,
    /// Key length in bytes
    key_length: usize,
    encrypt_metadata: bool,
}

impl StandardSecurityHandler {
    pub fn new(
        revision: SecurityHandlerRevision,
        key_length_bits: u16,
        encrypt_metadata: bool,
    ) -> Result<Self> {
        revision.validate_key_length(key_length_bits)?;
        Ok(Self {
            revision,
            key_length: key_length_bits as usize / 8,
            encrypt_metadata,
        })
    }

    /// Create handler for RC4 40-bit encryption
    pub fn rc4_40bit() -> Self {
        Self {
            revision: SecurityHandlerRevision::R2,
            key_length: 5,
            encrypt_metadata: true,
        }
    }

    /// Create handler for RC4 128-bit encryption
    pub fn rc4_128bit() -> Self {
        Self {
            revision: SecurityHandlerRevision::R3,
            key_length: 16,
            encrypt_metadata: true,
        }
    }

    /// Create handler for AES-128 encryption (Revision 4)
    pub fn aes_128bit() -> Self {
        Self {
            revision: SecurityHandlerRevision::R4Aes128,
            key_length: 16,
            encrypt_metadata: true,
        }
    }

    /// Create handler for AES-256 encryption (Revision 6)
    pub fn aes_256bit() -> Self {
        Self {
            revision: SecurityHandlerRevision::R6,
            key_length: 32,
            encrypt_metadata: true,
        }
    }

    pub fn revision(&self) -> SecurityHandlerRevision {
        self.revision
    }

    /// Key length in bytes
    pub fn key_length(&self) -> usize {
        self.key_length
    }

    pub fn encrypt_metadata(&self) -> bool {
        self.encrypt_metadata
    }

    /// Pad or truncate a password to 32 bytes
    fn pad_password(password: &[u8]) -> [u8; 32] {
        let mut padded = [0u8; 32];
        let len = password.len().min(32);

        padded[..len].copy_from_slice(&password[..len]);
        padded[len..].copy_from_slice(&PASSWORD_PADDING[..32 - len]);

        padded
    }

    fn uses_md5_pipeline(&self) -> bool {
        !self.revision.is_aes256()
    }

    // ---- Revisions 2-4 ----------------------------------------------------

    /// Compute the O entry (Algorithm 3).
    ///
    /// An empty owner password falls back to the user password before
    /// padding, as the algorithm prescribes.
    pub fn compute_owner_hash(
        &self,
        owner_password: &OwnerPassword,
        user_password: &UserPassword,
    ) -> Result<Vec<u8>> {
        if !self.uses_md5_pipeline() {
            return Err(PdfError::CryptoFailure(
                "Algorithm 3 only applies to revisions 2-4".to_string(),
            ));
        }

        let owner_bytes = if owner_password.0.is_empty() {
            user_password.0.as_bytes()
        } else {
            owner_password.0.as_bytes()
        };
        let owner_pad = Self::pad_password(owner_bytes);
        let user_pad = Self::pad_password(user_password.0.as_bytes());

        let mut hash = md5::compute(owner_pad).0.to_vec();

        // Revision 3+: 50 further rounds over the full digest
        if self.revision != SecurityHandlerRevision::R2 {
            for _ in 0..50 {
                hash = md5::compute(&hash).0.to_vec();
            }
        }

        let rc4_key = &hash[..self.key_length];
        let mut result = Rc4::new(rc4_key).process(&user_pad);

        // Revision 3+: 19 passes with the key XORed by the round index
        if self.revision != SecurityHandlerRevision::R2 {
            for i in 1..=19u8 {
                let iter_key: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
                result = Rc4::new(&iter_key).process(&result);
            }
        }

        Ok(result)
    }

    /// Compute the file encryption key (Algorithm 2).
    pub fn compute_encryption_key(
        &self,
        user_password: &UserPassword,
        owner_hash: &[u8],
        permissions: Permissions,
        file_id: &[u8],
    ) -> Result<EncryptionKey> {
        if !self.uses_md5_pipeline() {
            return Err(PdfError::CryptoFailure(
                "Algorithm 2 only applies to revisions 2-4; the AES-256 file key is random"
                    .to_string(),
            ));
        }

        let padded = Self::pad_password(user_password.0.as_bytes());

        let mut context = md5::Context::new();
        context.consume(padded);
        context.consume(owner_hash);
        // The signed permission integer, low-order byte first
        context.consume(permissions.to_le_bytes());
        context.consume(file_id);

        // Revision 4 with unencrypted metadata appends 0xFFFFFFFF
        if self.revision.revision_number() == 4 && !self.encrypt_metadata {
            context.consume([0xFF, 0xFF, 0xFF, 0xFF]);
        }

        let mut hash = context.finalize().0.to_vec();

        // Revision 3+: 50 rounds over the first key-length bytes
        if self.revision != SecurityHandlerRevision::R2 {
            for _ in 0..50 {
                hash = md5::compute(&hash[..self.key_length]).0.to_vec();
            }
        }

        hash.truncate(self.key_length);
        Ok(EncryptionKey::new(hash))
    }

    /// Compute the U entry (Algorithm 4 for R2, Algorithm 5 for R3/R4).
    pub fn compute_user_hash(
        &self,
        user_password: &UserPassword,
        owner_hash: &[u8],
        permissions: Permissions,
        file_id: &[u8],
    ) -> Result<Vec<u8>> {
        let key = self.compute_encryption_key(user_password, owner_hash, permissions, file_id)?;

        match self.revision {
            SecurityHandlerRevision::R2 => Ok(Rc4::new(key.as_bytes()).process(&PASSWORD_PADDING)),
            SecurityHandlerRevision::R3
            | SecurityHandlerRevision::R4Rc4
            | SecurityHandlerRevision::R4Aes128 => {
                let mut context = md5::Context::new();
                context.consume(PASSWORD_PADDING);
                context.consume(file_id);
                let hash = context.finalize();

                let mut result = Rc4::new(key.as_bytes()).process(&hash.0);

                for i in 1..=19u8 {
                    let iter_key: Vec<u8> = key.as_bytes().iter().map(|b| b ^ i).collect();
                    result = Rc4::new(&iter_key).process(&result);
                }

                // The tail 16 bytes are arbitrary per the format; zero keeps
                // the derivation deterministic. Readers compare 16 bytes.
                result.resize(32, 0);
                Ok(result)
            }
            _ => Err(PdfError::CryptoFailure(
                "Algorithms 4/5 only apply to revisions 2-4".to_string(),
            )),
        }
    }

    /// Authenticate a user password against the stored U entry (Algorithm 6).
    pub fn authenticate_user_password(
        &self,
        password: &UserPassword,
        user_hash: &[u8],
        owner_hash: &[u8],
        permissions: Permissions,
        file_id: &[u8],
    ) -> Result<bool> {
        let computed = self.compute_user_hash(password, owner_hash, permissions, file_id)?;

        let compare_len = match self.revision {
            SecurityHandlerRevision::R2 => 32,
            _ => 16,
        };

        Ok(user_hash.len() >= compare_len && computed[..compare_len] == user_hash[..compare_len])
    }

    /// Decrypt the O entry back to the user password it encodes (the first
    /// steps of Algorithm 7). The result is only meaningful when the owner
    /// password is correct; callers verify it with Algorithm 6.
    pub fn recover_user_password(
        &self,
        owner_password: &OwnerPassword,
        owner_hash: &[u8],
    ) -> Result<UserPassword> {
        if !self.uses_md5_pipeline() {
            return Err(PdfError::CryptoFailure(
                "Algorithm 7 only applies to revisions 2-4".to_string(),
            ));
        }

        let padded = Self::pad_password(owner_password.0.as_bytes());
        let mut hash = md5::compute(padded).0.to_vec();

        if self.revision != SecurityHandlerRevision::R2 {
            for _ in 0..50 {
                hash = md5::compute(&hash).0.to_vec();
            }
        }

        let rc4_key = &hash[..self.key_length];
        let mut recovered = owner_hash.to_vec();

        if self.revision != SecurityHandlerRevision::R2 {
            for i in (1..=19u8).rev() {
                let iter_key: Vec<u8> = rc4_key.iter().map(|b| b ^ i).collect();
                recovered = Rc4::new(&iter_key).process(&recovered);
            }
        }
        recovered = Rc4::new(rc4_key).process(&recovered);

        // `recovered` purports to be the padded user password; strip the pad.
        let mut end = recovered.len();
        for n in 0..=recovered.len().min(32) {
            if recovered[n..] == PASSWORD_PADDING[..32 - n] {
                end = n;
                break;
            }
        }

        Ok(UserPassword(
            String::from_utf8_lossy(&recovered[..end]).to_string(),
        ))
    }

    /// Authenticate an owner password against the stored O entry
    /// (Algorithm 7): decrypt O back to the user password, then run
    /// Algorithm 6 on the result.
    pub fn authenticate_owner_password(
        &self,
        password: &OwnerPassword,
        owner_hash: &[u8],
        user_hash: &[u8],
        permissions: Permissions,
        file_id: &[u8],
    ) -> Result<bool> {
        let user = self.recover_user_password(password, owner_hash)?;
        self.authenticate_user_password(&user, user_hash, owner_hash, permissions, file_id)
    }

    // ---- Revisions 5-6 ----------------------------------------------------

    /// Generate the random 32-byte file encryption key used by AES-256
    /// revisions; it is wrapped by the UE/OE entries, never derived from a
    /// password.
    pub fn generate_aes256_file_key() -> EncryptionKey {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill(&mut key[..]);
        EncryptionKey::new(key)
    }

    fn aes256_password_bytes(password: &str) -> &[u8] {
        let bytes = password.as_bytes();
        // UTF-8 representation truncated to 127 bytes
        &bytes[..bytes.len().min(127)]
    }

    /// The Algorithm 2.B hash. R5 is a single SHA-256; R6 runs the
    /// AES-CBC/SHA-2 round schedule until the stop condition holds.
    fn compute_hash_2b(
        &self,
        password: &[u8],
        salt: &[u8],
        user_key: Option<&[u8]>,
    ) -> Result<Vec<u8>> {
        let mut hasher = Sha256::new();
        hasher.update(password);
        hasher.update(salt);
        if let Some(user_key) = user_key {
            hasher.update(user_key);
        }
        let mut k = hasher.finalize().to_vec();

        if self.revision == SecurityHandlerRevision::R5 {
            return Ok(k);
        }

        let mut round: u32 = 0;
        loop {
            round += 1;

            // K1 = 64 repetitions of (password || K || user key)
            let mut k1 = Vec::with_capacity(64 * (password.len() + k.len() + 48));
            for _ in 0..64 {
                k1.extend_from_slice(password);
                k1.extend_from_slice(&k);
                if let Some(user_key) = user_key {
                    k1.extend_from_slice(user_key);
                }
            }

            // E = AES-128-CBC(K[0..16], iv = K[16..32], K1); K1 is a multiple
            // of 64 bytes so no padding is involved.
            let key: [u8; 16] = k[..16]
                .try_into()
                .map_err(|_| PdfError::CryptoFailure("hash state too short".to_string()))?;
            let iv: [u8; 16] = k[16..32]
                .try_into()
                .map_err(|_| PdfError::CryptoFailure("hash state too short".to_string()))?;
            let e = aes::cbc_encrypt_unpadded(&key, &iv, &k1)?;

            k = match e[..16].iter().map(|v| *v as u32).sum::<u32>() % 3 {
                0 => Sha256::digest(&e).to_vec(),
                1 => Sha384::digest(&e).to_vec(),
                _ => Sha512::digest(&e).to_vec(),
            };

            if round >= 64 && u32::from(*e.last().unwrap_or(&0)) <= round - 32 {
                break;
            }
        }

        k.truncate(32);
        Ok(k)
    }

    /// Compute the U and UE entries (Algorithm 8).
    pub fn compute_user_entries_aes256(
        &self,
        user_password: &UserPassword,
        file_key: &EncryptionKey,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        let password = Self::aes256_password_bytes(&user_password.0);

        let mut user_value = [0u8; 48];
        rand::thread_rng().fill(&mut user_value[32..]);

        let validation_salt = user_value[32..40].to_vec();
        let key_salt = user_value[40..48].to_vec();

        let hashed = self.compute_hash_2b(password, &validation_salt, None)?;
        user_value[..32].copy_from_slice(&hashed);

        // Intermediate key wraps the file key with a zero IV and no padding.
        let intermediate = self.compute_hash_2b(password, &key_salt, None)?;
        let wrap_key: [u8; 32] = intermediate
            .as_slice()
            .try_into()
            .map_err(|_| PdfError::CryptoFailure("intermediate key is not 32 bytes".to_string()))?;
        let user_encrypted = aes::aes256_wrap(&wrap_key, file_key.as_bytes())?;

        Ok((user_value.to_vec(), user_encrypted))
    }

    /// Compute the O and OE entries (Algorithm 9). Requires the 48-byte U
    /// value from Algorithm 8.
    pub fn compute_owner_entries_aes256(
        &self,
        owner_password: &OwnerPassword,
        user_value: &[u8],
        file_key: &EncryptionKey,
    ) -> Result<(Vec<u8>, Vec<u8>)> {
        if user_value.len() != 48 {
            return Err(PdfError::CryptoFailure(format!(
                "U entry must be 48 bytes, got {}",
                user_value.len()
            )));
        }

        let password = Self::aes256_password_bytes(&owner_password.0);

        let mut owner_value = [0u8; 48];
        rand::thread_rng().fill(&mut owner_value[32..]);

        let validation_salt = owner_value[32..40].to_vec();
        let key_salt = owner_value[40..48].to_vec();

        let hashed = self.compute_hash_2b(password, &validation_salt, Some(user_value))?;
        owner_value[..32].copy_from_slice(&hashed);

        let intermediate = self.compute_hash_2b(password, &key_salt, Some(user_value))?;
        let wrap_key: [u8; 32] = intermediate
            .as_slice()
            .try_into()
            .map_err(|_| PdfError::CryptoFailure("intermediate key is not 32 bytes".to_string()))?;
        let owner_encrypted = aes::aes256_wrap(&wrap_key, file_key.as_bytes())?;

        Ok((owner_value.to_vec(), owner_encrypted))
    }

    /// Compute the Perms entry (Algorithm 10).
    pub fn compute_perms_aes256(
        &self,
        permissions: Permissions,
        file_key: &EncryptionKey,
    ) -> Result<Vec<u8>> {
        let mut block = [0u8; 16];

        // Permissions as a 64-bit value, low-order byte first; the upper
        // 4 bytes are all ones for a 32-bit P.
        block[..4].copy_from_slice(&permissions.to_le_bytes());
        block[4..8].copy_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);
        block[8] = if self.encrypt_metadata { b'T' } else { b'F' };
        block[9..12].copy_from_slice(b"adb");
        rand::thread_rng().fill(&mut block[12..16]);

        let key: [u8; 32] = file_key
            .as_bytes()
            .try_into()
            .map_err(|_| PdfError::CryptoFailure("AES-256 file key must be 32 bytes".to_string()))?;
        aes::aes256_ecb_encrypt(&key, &mut block);

        Ok(block.to_vec())
    }

    /// Recover the file encryption key from a password (Algorithm 2.A).
    ///
    /// The password is tried as the owner secret first, then as the user
    /// password, mirroring how readers authenticate.
    pub fn recover_aes256_file_key(
        &self,
        password: &str,
        user_value: &[u8],
        user_encrypted: &[u8],
        owner_value: &[u8],
        owner_encrypted: &[u8],
    ) -> Result<EncryptionKey> {
        if user_value.len() != 48 || owner_value.len() != 48 {
            return Err(PdfError::CryptoFailure(
                "U and O entries must be 48 bytes for AES-256 revisions".to_string(),
            ));
        }
        if user_encrypted.len() != 32 || owner_encrypted.len() != 32 {
            return Err(PdfError::CryptoFailure(
                "UE and OE entries must be 32 bytes".to_string(),
            ));
        }

        let password = Self::aes256_password_bytes(password);

        // Owner check: hash(password || owner validation salt || U)
        let hashed = self.compute_hash_2b(password, &owner_value[32..40], Some(user_value))?;
        if hashed == owner_value[..32] {
            let intermediate =
                self.compute_hash_2b(password, &owner_value[40..48], Some(user_value))?;
            let wrap_key: [u8; 32] = intermediate.as_slice().try_into().map_err(|_| {
                PdfError::CryptoFailure("intermediate key is not 32 bytes".to_string())
            })?;
            return Ok(EncryptionKey::new(aes::aes256_unwrap(
                &wrap_key,
                owner_encrypted,
            )?));
        }

        // User check: hash(password || user validation salt)
        let hashed = self.compute_hash_2b(password, &user_value[32..40], None)?;
        if hashed == user_value[..32] {
            let intermediate = self.compute_hash_2b(password, &user_value[40..48], None)?;
            let wrap_key: [u8; 32] = intermediate.as_slice().try_into().map_err(|_| {
                PdfError::CryptoFailure("intermediate key is not 32 bytes".to_string())
            })?;
            return Ok(EncryptionKey::new(aes::aes256_unwrap(
                &wrap_key,
                user_encrypted,
            )?));
        }

        Err(PdfError::IncorrectPassword)
    }

    /// Validate a Perms entry against the expected permissions
    /// (Algorithm 13).
    pub fn validate_perms_aes256(
        &self,
        perms_entry: &[u8],
        permissions: Permissions,
        file_key: &EncryptionKey,
    ) -> Result<bool> {
        let mut block: [u8; 16] = perms_entry
            .try_into()
            .map_err(|_| PdfError::CryptoFailure("Perms entry must be 16 bytes".to_string()))?;

        let key: [u8; 32] = file_key
            .as_bytes()
            .try_into()
            .map_err(|_| PdfError::CryptoFailure("AES-256 file key must be 32 bytes".to_string()))?;
        aes::aes256_ecb_decrypt(&key, &mut block);

        Ok(&block[9..12] == b"adb"
            && block[..4] == permissions.to_le_bytes()
            && block[8] == if self.encrypt_metadata { b'T' } else { b'F' })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn print_only() -> Permissions {
        let mut perm = Permissions::new();
        perm.set_print(true);
        perm
    }

    #[test]
    fn test_pad_password() {
        let padded = StandardSecurityHandler::pad_password(b"test");
        assert_eq!(padded.len(), 32);
        assert_eq!(&padded[..4], b"test");
        assert_eq!(&padded[4..], &PASSWORD_PADDING[..28]);
    }

    #[test]
    fn test_pad_password_empty_is_full_padding() {
        let padded = StandardSecurityHandler::pad_password(b"");
        assert_eq!(padded, PASSWORD_PADDING);
    }

    #[test]
    fn test_pad_password_truncates_long() {
        let long = vec![b'x'; 40];
        let padded = StandardSecurityHandler::pad_password(&long);
        assert_eq!(&padded[..], &long[..32]);
    }

    #[test]
    fn test_key_length_validation() {
        use SecurityHandlerRevision::*;

        assert!(R2.validate_key_length(40).is_ok());
        assert!(R2.validate_key_length(128).is_err());
        assert!(R3.validate_key_length(40).is_ok());
        assert!(R3.validate_key_length(56).is_ok());
        assert!(R3.validate_key_length(128).is_ok());
        assert!(R3.validate_key_length(44).is_err());
        assert!(R3.validate_key_length(136).is_err());
        assert!(R4Rc4.validate_key_length(40).is_ok());
        assert!(R4Rc4.validate_key_length(128).is_ok());
        assert!(R4Aes128.validate_key_length(128).is_ok());
        assert!(R4Aes128.validate_key_length(40).is_err());
        assert!(R5.validate_key_length(256).is_ok());
        assert!(R5.validate_key_length(128).is_err());
        assert!(R6.validate_key_length(256).is_ok());
    }

    #[test]
    fn test_version_revision_numbers() {
        use SecurityHandlerRevision::*;
        assert_eq!((R2.version_number(), R2.revision_number()), (1, 2));
        assert_eq!((R3.version_number(), R3.revision_number()), (2, 3));
        assert_eq!((R4Rc4.version_number(), R4Rc4.revision_number()), (4, 4));
        assert_eq!((R4Aes128.version_number(), R4Aes128.revision_number()), (4, 4));
        assert_eq!((R5.version_number(), R5.revision_number()), (5, 5));
        assert_eq!((R6.version_number(), R6.revision_number()), (5, 6));
    }

    #[test]
    fn test_owner_hash_is_deterministic_and_32_bytes() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let owner = OwnerPassword("owner123".to_string());
        let user = UserPassword(String::new());

        let a = handler.compute_owner_hash(&owner, &user).unwrap();
        let b = handler.compute_owner_hash(&owner, &user).unwrap();
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_owner_password_falls_back_to_user() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let user = UserPassword("secret".to_string());

        let with_empty_owner = handler
            .compute_owner_hash(&OwnerPassword(String::new()), &user)
            .unwrap();
        let with_user_as_owner = handler
            .compute_owner_hash(&OwnerPassword("secret".to_string()), &user)
            .unwrap();
        assert_eq!(with_empty_owner, with_user_as_owner);
    }

    #[test]
    fn test_file_key_length_tracks_revision() {
        let owner_hash = vec![0u8; 32];
        let user = UserPassword("user".to_string());
        let id = [0u8; 16];

        let key40 = StandardSecurityHandler::rc4_40bit()
            .compute_encryption_key(&user, &owner_hash, Permissions::new(), &id)
            .unwrap();
        assert_eq!(key40.len(), 5);

        let key128 = StandardSecurityHandler::rc4_128bit()
            .compute_encryption_key(&user, &owner_hash, Permissions::new(), &id)
            .unwrap();
        assert_eq!(key128.len(), 16);
    }

    #[test]
    fn test_permissions_and_id_affect_key() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let user = UserPassword::default();
        let owner_hash = vec![0xAB; 32];

        let base = handler
            .compute_encryption_key(&user, &owner_hash, print_only(), &[0u8; 16])
            .unwrap();

        let other_perms = handler
            .compute_encryption_key(&user, &owner_hash, Permissions::all(), &[0u8; 16])
            .unwrap();
        assert_ne!(base.as_bytes(), other_perms.as_bytes());

        let other_id = handler
            .compute_encryption_key(&user, &owner_hash, print_only(), &[1u8; 16])
            .unwrap();
        assert_ne!(base.as_bytes(), other_id.as_bytes());
    }

    // Regression vector: computed once with an independent implementation of
    // Algorithms 2, 3, and 5 and pinned verbatim.
    #[test]
    fn test_r3_128_pinned_vector() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let user = UserPassword(String::new());
        let owner = OwnerPassword("owner123".to_string());
        let perms = print_only();
        let file_id: Vec<u8> = (0u8..16).collect();

        assert_eq!(perms.as_p(), -3900);

        let o = handler.compute_owner_hash(&owner, &user).unwrap();
        assert_eq!(
            hex::encode(&o),
            "3579de908f71f3958370af350f7239155038530b5b7210c88b7b416d9572485a"
        );

        let key = handler
            .compute_encryption_key(&user, &o, perms, &file_id)
            .unwrap();
        assert_eq!(hex::encode(key.as_bytes()), "719fcdc0508e814fe17f8beb4e00c9f2");

        let u = handler.compute_user_hash(&user, &o, perms, &file_id).unwrap();
        assert_eq!(
            hex::encode(&u),
            "db72f99765515ff403dd0b8765ed855800000000000000000000000000000000"
        );
    }

    #[test]
    fn test_authenticate_passwords_r3() {
        let handler = StandardSecurityHandler::rc4_128bit();
        let user = UserPassword("alice".to_string());
        let owner = OwnerPassword("bob".to_string());
        let perms = print_only();
        let file_id = [7u8; 16];

        let o = handler.compute_owner_hash(&owner, &user).unwrap();
        let u = handler.compute_user_hash(&user, &o, perms, &file_id).unwrap();

        assert!(handler
            .authenticate_user_password(&user, &u, &o, perms, &file_id)
            .unwrap());
        assert!(handler
            .authenticate_owner_password(&owner, &o, &u, perms, &file_id)
            .unwrap());

        // Swapped passwords must not authenticate: this is what forbids
        // permission escalation without the owner secret.
        assert!(!handler
            .authenticate_user_password(&UserPassword("bob".to_string()), &u, &o, perms, &file_id)
            .unwrap());
        assert!(!handler
            .authenticate_owner_password(
                &OwnerPassword("alice".to_string()),
                &o,
                &u,
                perms,
                &file_id
            )
            .unwrap());
    }

    #[test]
    fn test_authenticate_passwords_r2() {
        let handler = StandardSecurityHandler::rc4_40bit();
        let user = UserPassword("user".to_string());
        let owner = OwnerPassword("owner".to_string());
        let perms = Permissions::all();
        let file_id = [1u8; 16];

        let o = handler.compute_owner_hash(&owner, &user).unwrap();
        let u = handler.compute_user_hash(&user, &o, perms, &file_id).unwrap();

        assert!(handler
            .authenticate_user_password(&user, &u, &o, perms, &file_id)
            .unwrap());
        assert!(handler
            .authenticate_owner_password(&owner, &o, &u, perms, &file_id)
            .unwrap());
        assert!(!handler
            .authenticate_owner_password(&OwnerPassword("user".to_string()), &o, &u, perms, &file_id)
            .unwrap());
    }

    #[test]
    fn test_aes256_entries_and_key_recovery() {
        for handler in [
            StandardSecurityHandler::new(SecurityHandlerRevision::R5, 256, true).unwrap(),
            StandardSecurityHandler::aes_256bit(),
        ] {
            let user = UserPassword("reader".to_string());
            let owner = OwnerPassword("editor".to_string());

            let file_key = StandardSecurityHandler::generate_aes256_file_key();
            assert_eq!(file_key.len(), 32);

            let (u, ue) = handler.compute_user_entries_aes256(&user, &file_key).unwrap();
            assert_eq!(u.len(), 48);
            assert_eq!(ue.len(), 32);

            let (o, oe) = handler
                .compute_owner_entries_aes256(&owner, &u, &file_key)
                .unwrap();
            assert_eq!(o.len(), 48);
            assert_eq!(oe.len(), 32);

            // Both passwords recover the same file key.
            let via_owner = handler
                .recover_aes256_file_key("editor", &u, &ue, &o, &oe)
                .unwrap();
            assert_eq!(via_owner.as_bytes(), file_key.as_bytes());

            let via_user = handler
                .recover_aes256_file_key("reader", &u, &ue, &o, &oe)
                .unwrap();
            assert_eq!(via_user.as_bytes(), file_key.as_bytes());

            // A wrong password recovers nothing.
            assert!(matches!(
                handler.recover_aes256_file_key("intruder", &u, &ue, &o, &oe),
                Err(PdfError::IncorrectPassword)
            ));
        }
    }

    #[test]
    fn test_aes256_perms_entry() {
        let handler = StandardSecurityHandler::aes_256bit();
        let perms = print_only();
        let file_key = StandardSecurityHandler::generate_aes256_file_key();

        let entry = handler.compute_perms_aes256(perms, &file_key).unwrap();
        assert_eq!(entry.len(), 16);

        assert!(handler.validate_perms_aes256(&entry, perms, &file_key).unwrap());
        assert!(!handler
            .validate_perms_aes256(&entry, Permissions::all(), &file_key)
            .unwrap());
    }

    #[test]
    fn test_md5_pipeline_rejected_for_aes256() {
        let handler = StandardSecurityHandler::aes_256bit();
        let user = UserPassword::default();
        let owner = OwnerPassword("x".to_string());

        assert!(handler.compute_owner_hash(&owner, &user).is_err());
        assert!(handler
            .compute_encryption_key(&user, &[0u8; 32], Permissions::new(), &[0u8; 16])
            .is_err());
    }

    #[test]
    fn test_debug_does_not_leak_key_bytes() {
        let key = EncryptionKey::new(vec![0xAB; 16]);
        let rendered = format!("{key:?}");
        assert_eq!(rendered, "EncryptionKey(16 bytes)");
        assert!(!rendered.contains("171"));
    }
}
