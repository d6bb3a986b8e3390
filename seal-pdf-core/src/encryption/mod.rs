//! PDF encryption support according to ISO 32000 Chapter 7.6.
//!
//! Standard security handler revisions 2-6: RC4 (40-128 bit), AES-128 with
//! V4 crypt filters, and AES-256. Key derivation, per-object ciphering, the
//! encryption dictionary, and the document-level session live here.

mod aes;
mod encryption_dict;
mod object_cipher;
mod permissions;
mod rc4;
mod session;
mod standard_security;

pub use aes::generate_iv;
pub use encryption_dict::{CryptFilterMethod, EncryptionDictionary};
pub use object_cipher::{CipherAlgorithm, ObjectCipher};
pub use permissions::{PermissionFlags, Permissions};
pub use rc4::{rc4_decrypt, rc4_encrypt, Rc4};
pub use session::{
    decrypt_document, EncryptionPolicy, EncryptionSession, SessionState,
};
pub use standard_security::{
    EncryptionKey, OwnerPassword, SecurityHandlerRevision, StandardSecurityHandler, UserPassword,
    PASSWORD_PADDING,
};
