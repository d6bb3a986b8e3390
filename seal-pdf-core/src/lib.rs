//! # seal-pdf
//!
//! Restrict usage permissions on PDF documents by re-encrypting them with
//! the standard security handler. The document opens without a password but
//! enforces owner-controlled permission bits; changing them back requires
//! the owner secret.
//!
//! Supported configurations: RC4 40/128-bit (revisions 2 and 3), AES-128
//! under V4 crypt filters (revision 4), and AES-256 (revisions 5 and 6).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use seal_pdf::{Document, EncryptionPolicy, EncryptionSession, Permissions, Result};
//!
//! # fn main() -> Result<()> {
//! let mut document = Document::load("report.pdf")?;
//!
//! let mut permissions = Permissions::new();
//! permissions.set_print(true).set_print_high_quality(true);
//!
//! let policy = EncryptionPolicy::rc4_128("", "owner-secret", permissions);
//! EncryptionSession::new(policy).encrypt(&mut document)?;
//!
//! document.save("report-restricted.pdf")?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`encryption`] - permission encoding, key derivation, object ciphering,
//!   and the encryption session
//! - [`document`] - the flat in-memory object store
//! - [`reader`] / [`writer`] - lenient loading and conformant serialization

pub mod document;
pub mod encryption;
pub mod error;
pub mod objects;
pub mod reader;
pub mod writer;

pub use document::Document;
pub use encryption::{
    decrypt_document, CipherAlgorithm, EncryptionDictionary, EncryptionKey, EncryptionPolicy,
    EncryptionSession, ObjectCipher, OwnerPassword, PermissionFlags, Permissions,
    SecurityHandlerRevision, SessionState, StandardSecurityHandler, UserPassword,
};
pub use error::{PdfError, Result};
pub use objects::{Dictionary, Object, ObjectId};
