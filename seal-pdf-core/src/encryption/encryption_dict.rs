//! The persisted encryption dictionary.

use crate::encryption::{Permissions, SecurityHandlerRevision};
use crate::error::{PdfError, Result};
use crate::objects::{Dictionary, Object};

/// Crypt filter method names used by V4/V5 dictionaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptFilterMethod {
    /// RC4
    V2,
    /// AES-128
    AESV2,
    /// AES-256
    AESV3,
}

impl CryptFilterMethod {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            CryptFilterMethod::V2 => "V2",
            CryptFilterMethod::AESV2 => "AESV2",
            CryptFilterMethod::AESV3 => "AESV3",
        }
    }
}

/// PDF encryption dictionary for the standard security handler.
#[derive(Debug, Clone)]
pub struct EncryptionDictionary {
    /// Always "Standard" here; other handlers are out of scope.
    pub filter: String,
    pub v: u32,
    pub r: u32,
    /// Key length in bits
    pub length: u32,
    /// Crypt filter for V4/V5 dictionaries, applied to both streams and
    /// strings as StdCF.
    pub crypt_filter: Option<CryptFilterMethod>,
    /// Owner validation entry (32 bytes through R4, 48 bytes for R5/R6)
    pub o: Vec<u8>,
    /// User validation entry (32 bytes through R4, 48 bytes for R5/R6)
    pub u: Vec<u8>,
    pub p: Permissions,
    pub encrypt_metadata: bool,
    /// Owner-encrypted file key (R5/R6)
    pub oe: Option<Vec<u8>>,
    /// User-encrypted file key (R5/R6)
    pub ue: Option<Vec<u8>>,
    /// Sealed permission block (R5/R6)
    pub perms: Option<Vec<u8>>,
}

impl EncryptionDictionary {
    /// Assemble the dictionary for a revision with the already-computed
    /// validation entries.
    pub fn new(
        revision: SecurityHandlerRevision,
        key_length_bits: u32,
        o: Vec<u8>,
        u: Vec<u8>,
        p: Permissions,
        encrypt_metadata: bool,
    ) -> Self {
        let crypt_filter = match revision {
            SecurityHandlerRevision::R4Rc4 => Some(CryptFilterMethod::V2),
            SecurityHandlerRevision::R4Aes128 => Some(CryptFilterMethod::AESV2),
            SecurityHandlerRevision::R5 | SecurityHandlerRevision::R6 => {
                Some(CryptFilterMethod::AESV3)
            }
            _ => None,
        };

        Self {
            filter: "Standard".to_string(),
            v: revision.version_number(),
            r: revision.revision_number(),
            length: key_length_bits,
            crypt_filter,
            o,
            u,
            p,
            encrypt_metadata,
            oe: None,
            ue: None,
            perms: None,
        }
    }

    /// Attach the AES-256 key wrap entries (OE, UE, Perms).
    pub fn with_aes256_entries(mut self, oe: Vec<u8>, ue: Vec<u8>, perms: Vec<u8>) -> Self {
        self.oe = Some(oe);
        self.ue = Some(ue);
        self.perms = Some(perms);
        self
    }

    /// Convert to a PDF dictionary, every field in the syntax conformant
    /// readers expect.
    pub fn to_dict(&self) -> Dictionary {
        let mut dict = Dictionary::new();

        dict.set("Filter", Object::name(self.filter.clone()));
        dict.set("V", self.v as i64);
        dict.set("R", self.r as i64);
        dict.set("Length", self.length as i64);
        dict.set("O", Object::String(self.o.clone()));
        dict.set("U", Object::String(self.u.clone()));
        dict.set("P", self.p.as_p() as i64);

        if !self.encrypt_metadata && self.v >= 4 {
            dict.set("EncryptMetadata", false);
        }

        if let Some(method) = self.crypt_filter {
            let mut std_cf = Dictionary::new();
            std_cf.set("CFM", Object::name(method.pdf_name()));
            std_cf.set("AuthEvent", Object::name("DocOpen"));
            std_cf.set("Length", (self.length / 8) as i64);

            let mut cf = Dictionary::new();
            cf.set("StdCF", Object::Dictionary(std_cf));

            dict.set("CF", Object::Dictionary(cf));
            dict.set("StmF", Object::name("StdCF"));
            dict.set("StrF", Object::name("StdCF"));
        }

        if let Some(ref oe) = self.oe {
            dict.set("OE", Object::String(oe.clone()));
        }
        if let Some(ref ue) = self.ue {
            dict.set("UE", Object::String(ue.clone()));
        }
        if let Some(ref perms) = self.perms {
            dict.set("Perms", Object::String(perms.clone()));
        }

        dict
    }

    /// Map the stored V/R pair (and crypt filter, for V4) back to a handler
    /// revision.
    pub fn revision(&self) -> Result<SecurityHandlerRevision> {
        match (self.v, self.r) {
            (1, 2) => Ok(SecurityHandlerRevision::R2),
            (2, 3) => Ok(SecurityHandlerRevision::R3),
            (4, 4) => match self.crypt_filter {
                Some(CryptFilterMethod::AESV2) => Ok(SecurityHandlerRevision::R4Aes128),
                Some(CryptFilterMethod::V2) | None => Ok(SecurityHandlerRevision::R4Rc4),
                Some(other) => Err(PdfError::InvalidPolicy(format!(
                    "crypt filter {} is not valid for V4",
                    other.pdf_name()
                ))),
            },
            (5, 5) => Ok(SecurityHandlerRevision::R5),
            (5, 6) => Ok(SecurityHandlerRevision::R6),
            (v, r) => Err(PdfError::InvalidPolicy(format!(
                "unsupported V/R combination {v}/{r}"
            ))),
        }
    }

    /// Read back a dictionary, for diagnostics and decryption.
    pub fn from_dict(dict: &Dictionary) -> Result<Self> {
        let filter = dict
            .get_name("Filter")
            .ok_or_else(|| PdfError::InvalidPolicy("missing /Filter".to_string()))?;
        if filter != "Standard" {
            return Err(PdfError::InvalidPolicy(format!(
                "unsupported security handler {filter}"
            )));
        }

        let v = dict
            .get_integer("V")
            .ok_or_else(|| PdfError::InvalidPolicy("missing /V".to_string()))? as u32;
        let r = dict
            .get_integer("R")
            .ok_or_else(|| PdfError::InvalidPolicy("missing /R".to_string()))? as u32;
        let p = dict
            .get_integer("P")
            .ok_or_else(|| PdfError::InvalidPolicy("missing /P".to_string()))? as i32;
        let o = dict
            .get_string_bytes("O")
            .ok_or_else(|| PdfError::InvalidPolicy("missing /O".to_string()))?
            .to_vec();
        let u = dict
            .get_string_bytes("U")
            .ok_or_else(|| PdfError::InvalidPolicy("missing /U".to_string()))?
            .to_vec();

        // Length is optional; V4 and V5 dictionaries imply their key size.
        let default_length = match v {
            4 => 128,
            5 => 256,
            _ => 40,
        };
        let length = dict.get_integer("Length").unwrap_or(default_length) as u32;
        let encrypt_metadata = dict
            .get("EncryptMetadata")
            .and_then(Object::as_bool)
            .unwrap_or(true);

        let crypt_filter = dict
            .get_dict("CF")
            .and_then(|cf| cf.get_dict("StdCF"))
            .and_then(|std_cf| std_cf.get_name("CFM"))
            .and_then(|name| match name {
                "V2" => Some(CryptFilterMethod::V2),
                "AESV2" => Some(CryptFilterMethod::AESV2),
                "AESV3" => Some(CryptFilterMethod::AESV3),
                _ => None,
            });

        Ok(Self {
            filter: filter.to_string(),
            v,
            r,
            length,
            crypt_filter,
            o,
            u,
            p: Permissions::from_p(p),
            encrypt_metadata,
            oe: dict.get_string_bytes("OE").map(<[u8]>::to_vec),
            ue: dict.get_string_bytes("UE").map(<[u8]>::to_vec),
            perms: dict.get_string_bytes("Perms").map(<[u8]>::to_vec),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc4_128_dictionary() {
        let enc = EncryptionDictionary::new(
            SecurityHandlerRevision::R3,
            128,
            vec![0u8; 32],
            vec![1u8; 32],
            Permissions::new(),
            true,
        );

        assert_eq!(enc.filter, "Standard");
        assert_eq!((enc.v, enc.r, enc.length), (2, 3, 128));
        assert!(enc.crypt_filter.is_none());

        let dict = enc.to_dict();
        assert_eq!(dict.get_name("Filter"), Some("Standard"));
        assert_eq!(dict.get_integer("V"), Some(2));
        assert_eq!(dict.get_integer("R"), Some(3));
        assert_eq!(dict.get_integer("Length"), Some(128));
        assert_eq!(dict.get_integer("P"), Some(-3904));
        assert!(dict.get("CF").is_none());
    }

    #[test]
    fn test_aes128_dictionary_carries_crypt_filters() {
        let enc = EncryptionDictionary::new(
            SecurityHandlerRevision::R4Aes128,
            128,
            vec![0u8; 32],
            vec![1u8; 32],
            Permissions::all(),
            true,
        );

        let dict = enc.to_dict();
        assert_eq!((enc.v, enc.r), (4, 4));
        assert_eq!(dict.get_name("StmF"), Some("StdCF"));
        assert_eq!(dict.get_name("StrF"), Some("StdCF"));

        let std_cf = dict.get_dict("CF").and_then(|cf| cf.get_dict("StdCF")).unwrap();
        assert_eq!(std_cf.get_name("CFM"), Some("AESV2"));
        assert_eq!(std_cf.get_integer("Length"), Some(16));
    }

    #[test]
    fn test_aes256_dictionary_entries() {
        let enc = EncryptionDictionary::new(
            SecurityHandlerRevision::R6,
            256,
            vec![0u8; 48],
            vec![1u8; 48],
            Permissions::new(),
            true,
        )
        .with_aes256_entries(vec![2u8; 32], vec![3u8; 32], vec![4u8; 16]);

        let dict = enc.to_dict();
        assert_eq!((enc.v, enc.r), (5, 6));
        assert_eq!(dict.get_string_bytes("OE"), Some(&[2u8; 32][..]));
        assert_eq!(dict.get_string_bytes("UE"), Some(&[3u8; 32][..]));
        assert_eq!(dict.get_string_bytes("Perms"), Some(&[4u8; 16][..]));

        let std_cf = dict.get_dict("CF").and_then(|cf| cf.get_dict("StdCF")).unwrap();
        assert_eq!(std_cf.get_name("CFM"), Some("AESV3"));
    }

    #[test]
    fn test_roundtrip_through_dict() {
        let mut p = Permissions::new();
        p.set_print(true).set_print_high_quality(true);

        let enc = EncryptionDictionary::new(
            SecurityHandlerRevision::R4Rc4,
            128,
            vec![9u8; 32],
            vec![8u8; 32],
            p,
            true,
        );

        let parsed = EncryptionDictionary::from_dict(&enc.to_dict()).unwrap();
        assert_eq!(parsed.v, enc.v);
        assert_eq!(parsed.r, enc.r);
        assert_eq!(parsed.length, enc.length);
        assert_eq!(parsed.o, enc.o);
        assert_eq!(parsed.u, enc.u);
        assert_eq!(parsed.p.bits(), enc.p.bits());
        assert_eq!(parsed.crypt_filter, Some(CryptFilterMethod::V2));
    }

    #[test]
    fn test_from_dict_rejects_other_handlers() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::name("Adobe.PubSec"));
        dict.set("V", 4i64);

        assert!(matches!(
            EncryptionDictionary::from_dict(&dict),
            Err(PdfError::InvalidPolicy(_))
        ));
    }
}
