//! Document-level encryption runs.
//!
//! The session walks every indirect object, ciphers string and stream
//! payloads, and attaches the encryption dictionary to the trailer. All
//! ciphertext is staged before a single byte of the caller's document is
//! touched: a failing run leaves the input exactly as it was.

use crate::document::Document;
use crate::encryption::{
    CipherAlgorithm, EncryptionDictionary, EncryptionKey, ObjectCipher, OwnerPassword,
    Permissions, SecurityHandlerRevision, StandardSecurityHandler, UserPassword,
};
use crate::error::{PdfError, Result};
use crate::objects::{Object, ObjectId};
use rand::Rng;
use tracing::debug;

/// Everything one encryption run needs. Built once from user input and
/// passed by value; the session never mutates it.
#[derive(Debug, Clone)]
pub struct EncryptionPolicy {
    pub user_password: UserPassword,
    pub owner_password: OwnerPassword,
    pub permissions: Permissions,
    pub revision: SecurityHandlerRevision,
    pub key_length_bits: u16,
    pub encrypt_metadata: bool,
}

impl EncryptionPolicy {
    pub fn new(
        user_password: impl Into<String>,
        owner_password: impl Into<String>,
        permissions: Permissions,
        revision: SecurityHandlerRevision,
        key_length_bits: u16,
    ) -> Self {
        Self {
            user_password: UserPassword(user_password.into()),
            owner_password: OwnerPassword(owner_password.into()),
            permissions,
            revision,
            key_length_bits,
            encrypt_metadata: true,
        }
    }

    /// RC4 128-bit (revision 3), the most widely readable configuration.
    pub fn rc4_128(
        user_password: impl Into<String>,
        owner_password: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        Self::new(
            user_password,
            owner_password,
            permissions,
            SecurityHandlerRevision::R3,
            128,
        )
    }

    /// AES-128 under a revision 4 crypt filter.
    pub fn aes_128(
        user_password: impl Into<String>,
        owner_password: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        Self::new(
            user_password,
            owner_password,
            permissions,
            SecurityHandlerRevision::R4Aes128,
            128,
        )
    }

    /// AES-256 (revision 6).
    pub fn aes_256(
        user_password: impl Into<String>,
        owner_password: impl Into<String>,
        permissions: Permissions,
    ) -> Self {
        Self::new(
            user_password,
            owner_password,
            permissions,
            SecurityHandlerRevision::R6,
            256,
        )
    }

    pub fn validate(&self) -> Result<()> {
        self.revision.validate_key_length(self.key_length_bits)
    }
}

/// Session lifecycle. Any failure moves to `Aborted` before the caller's
/// document has been mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Init,
    Validated,
    KeyDerived,
    ObjectsEncrypted,
    Finalized,
    Aborted,
}

pub struct EncryptionSession {
    policy: EncryptionPolicy,
    state: SessionState,
}

impl EncryptionSession {
    pub fn new(policy: EncryptionPolicy) -> Self {
        Self {
            policy,
            state: SessionState::Init,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Encrypt the document in place per the session policy.
    pub fn encrypt(&mut self, document: &mut Document) -> Result<()> {
        match self.run(document) {
            Ok(()) => {
                self.state = SessionState::Finalized;
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Aborted;
                Err(err)
            }
        }
    }

    fn run(&mut self, document: &mut Document) -> Result<()> {
        self.policy.validate()?;
        if document.is_encrypted() {
            return Err(PdfError::InvalidPolicy(
                "the document is already encrypted".to_string(),
            ));
        }
        self.state = SessionState::Validated;

        // Reuse the document identity when present; generate one otherwise.
        // Nothing is written back until commit.
        let (file_id, generated_id) = match document.file_id() {
            Some(id) => (id.to_vec(), None),
            None => {
                let mut id = vec![0u8; 16];
                rand::thread_rng().fill(&mut id[..]);
                (id.clone(), Some(id))
            }
        };

        let handler = StandardSecurityHandler::new(
            self.policy.revision,
            self.policy.key_length_bits,
            self.policy.encrypt_metadata,
        )?;

        let (file_key, enc_dict) = self.derive_entries(&handler, &file_id)?;
        self.state = SessionState::KeyDerived;
        debug!(
            revision = handler.revision().revision_number(),
            key_bytes = file_key.len(),
            "file encryption key derived"
        );

        let algorithm = CipherAlgorithm::for_revision(self.policy.revision);
        let staged = transform_objects(
            document,
            &file_key,
            algorithm,
            self.policy.encrypt_metadata,
            Direction::Encrypt,
            None,
        )?;
        self.state = SessionState::ObjectsEncrypted;
        debug!(objects = staged.len(), "object payloads ciphered");

        // Commit: from here on every step is infallible.
        for (id, object) in staged {
            document.set_object(id, object);
        }
        if let Some(id) = generated_id {
            let mut second = vec![0u8; 16];
            rand::thread_rng().fill(&mut second[..]);
            document.set_file_id(id, second);
        }
        let enc_id = document.add_object(Object::Dictionary(enc_dict.to_dict()));
        document.trailer_mut().set("Encrypt", Object::Reference(enc_id));

        Ok(())
    }

    fn derive_entries(
        &self,
        handler: &StandardSecurityHandler,
        file_id: &[u8],
    ) -> Result<(EncryptionKey, EncryptionDictionary)> {
        let policy = &self.policy;

        if policy.revision.is_aes256() {
            let file_key = StandardSecurityHandler::generate_aes256_file_key();
            let (u, ue) = handler.compute_user_entries_aes256(&policy.user_password, &file_key)?;
            let (o, oe) =
                handler.compute_owner_entries_aes256(&policy.owner_password, &u, &file_key)?;
            let perms = handler.compute_perms_aes256(policy.permissions, &file_key)?;

            let dict = EncryptionDictionary::new(
                policy.revision,
                policy.key_length_bits as u32,
                o,
                u,
                policy.permissions,
                policy.encrypt_metadata,
            )
            .with_aes256_entries(oe, ue, perms);

            Ok((file_key, dict))
        } else {
            let o = handler.compute_owner_hash(&policy.owner_password, &policy.user_password)?;
            let file_key = handler.compute_encryption_key(
                &policy.user_password,
                &o,
                policy.permissions,
                file_id,
            )?;
            let u =
                handler.compute_user_hash(&policy.user_password, &o, policy.permissions, file_id)?;

            let dict = EncryptionDictionary::new(
                policy.revision,
                policy.key_length_bits as u32,
                o,
                u,
                policy.permissions,
                policy.encrypt_metadata,
            );

            Ok((file_key, dict))
        }
    }
}

/// Decrypt a document with either of its passwords, stripping the
/// encryption dictionary. Returns the permissions the document carried.
pub fn decrypt_document(document: &mut Document, password: &str) -> Result<Permissions> {
    let enc = EncryptionDictionary::from_dict(
        document.encryption_dict().ok_or(PdfError::NotEncrypted)?,
    )?;
    let revision = enc.revision()?;
    let handler = StandardSecurityHandler::new(revision, enc.length as u16, enc.encrypt_metadata)?;
    let file_id = document.file_id().unwrap_or_default().to_vec();

    let file_key = if revision.is_aes256() {
        let ue = enc.ue.as_deref().ok_or_else(|| {
            PdfError::InvalidPolicy("AES-256 dictionary is missing /UE".to_string())
        })?;
        let oe = enc.oe.as_deref().ok_or_else(|| {
            PdfError::InvalidPolicy("AES-256 dictionary is missing /OE".to_string())
        })?;

        let key = handler.recover_aes256_file_key(password, &enc.u, ue, &enc.o, oe)?;
        if let Some(perms_entry) = enc.perms.as_deref() {
            if !handler.validate_perms_aes256(perms_entry, enc.p, &key)? {
                return Err(PdfError::IncorrectPassword);
            }
        }
        key
    } else {
        let user = UserPassword(password.to_string());
        if handler.authenticate_user_password(&user, &enc.u, &enc.o, enc.p, &file_id)? {
            handler.compute_encryption_key(&user, &enc.o, enc.p, &file_id)?
        } else {
            let owner = OwnerPassword(password.to_string());
            let recovered = handler.recover_user_password(&owner, &enc.o)?;
            if !handler.authenticate_user_password(&recovered, &enc.u, &enc.o, enc.p, &file_id)? {
                return Err(PdfError::IncorrectPassword);
            }
            handler.compute_encryption_key(&recovered, &enc.o, enc.p, &file_id)?
        }
    };

    let enc_ref = document.trailer().get("Encrypt").and_then(Object::as_reference);
    let staged = transform_objects(
        document,
        &file_key,
        CipherAlgorithm::for_revision(revision),
        enc.encrypt_metadata,
        Direction::Decrypt,
        enc_ref,
    )?;

    for (id, object) in staged {
        document.set_object(id, object);
    }
    if let Some(id) = enc_ref {
        document.remove_object(id);
    }
    document.trailer_mut().remove("Encrypt");

    Ok(enc.p)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

/// Cipher every eligible object and return the transformed copies.
///
/// The work is a parallel map: once the file key exists each object is
/// independent, so objects are chunked across a scoped worker pool. The key
/// is the only shared state and it is read-only.
fn transform_objects(
    document: &Document,
    file_key: &EncryptionKey,
    algorithm: CipherAlgorithm,
    encrypt_metadata: bool,
    direction: Direction,
    skip: Option<ObjectId>,
) -> Result<Vec<(ObjectId, Object)>> {
    let entries: Vec<(ObjectId, &Object)> = document
        .objects()
        .filter(|(id, _)| Some(**id) != skip)
        .map(|(id, object)| (*id, object))
        .collect();

    if entries.is_empty() {
        return Ok(Vec::new());
    }

    let workers = num_cpus::get().min(8).max(1).min(entries.len());
    let chunk_size = entries.len().div_ceil(workers);

    std::thread::scope(|scope| {
        let mut handles = Vec::with_capacity(workers);

        for chunk in entries.chunks(chunk_size) {
            handles.push(scope.spawn(move || -> Result<Vec<(ObjectId, Object)>> {
                let cipher = ObjectCipher::new(file_key, algorithm);
                let mut out = Vec::new();

                for (id, object) in chunk {
                    if let Some(transformed) =
                        transform_object(&cipher, *id, object, encrypt_metadata, direction)?
                    {
                        out.push((*id, transformed));
                    }
                }

                Ok(out)
            }));
        }

        let mut staged = Vec::new();
        for handle in handles {
            let chunk_result = handle
                .join()
                .map_err(|_| PdfError::CryptoFailure("cipher worker panicked".to_string()))?;
            staged.extend(chunk_result?);
        }

        Ok(staged)
    })
}

/// Cipher one object, returning the transformed copy, or `None` when the
/// object is exempt or carries no string/stream payload.
fn transform_object(
    cipher: &ObjectCipher,
    id: ObjectId,
    object: &Object,
    encrypt_metadata: bool,
    direction: Direction,
) -> Result<Option<Object>> {
    // Exemption bookkeeping lives here, not in the cipher: cross-reference
    // streams are never encrypted, and Metadata streams follow the
    // EncryptMetadata flag.
    if matches!(object, Object::Stream(_, _)) {
        match object.type_name() {
            Some("XRef") => return Ok(None),
            Some("Metadata") if !encrypt_metadata => return Ok(None),
            _ => {}
        }
    }

    let mut copy = object.clone();
    let changed = transform_in_place(&mut copy, cipher, id, direction)?;
    Ok(changed.then_some(copy))
}

fn transform_in_place(
    object: &mut Object,
    cipher: &ObjectCipher,
    id: ObjectId,
    direction: Direction,
) -> Result<bool> {
    match object {
        Object::String(bytes) => {
            *bytes = apply(cipher, id, bytes, direction)?;
            Ok(true)
        }
        Object::Stream(dict, data) => {
            for (_, value) in dict.entries_mut() {
                transform_in_place(value, cipher, id, direction)?;
            }
            *data = apply(cipher, id, data, direction)?;
            // Keep stream metadata consistent with the new payload length.
            dict.set("Length", data.len() as i64);
            Ok(true)
        }
        Object::Array(items) => {
            let mut changed = false;
            for item in items {
                changed |= transform_in_place(item, cipher, id, direction)?;
            }
            Ok(changed)
        }
        Object::Dictionary(dict) => {
            let mut changed = false;
            for (_, value) in dict.entries_mut() {
                changed |= transform_in_place(value, cipher, id, direction)?;
            }
            Ok(changed)
        }
        // Numbers, names, booleans, references stay as they are.
        _ => Ok(false),
    }
}

fn apply(
    cipher: &ObjectCipher,
    id: ObjectId,
    data: &[u8],
    direction: Direction,
) -> Result<Vec<u8>> {
    match direction {
        Direction::Encrypt => cipher.encrypt(id, data),
        Direction::Decrypt => cipher.decrypt(id, data),
    }
}
