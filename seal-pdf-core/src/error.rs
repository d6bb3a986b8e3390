use crate::objects::ObjectId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid encryption policy: {0}")]
    InvalidPolicy(String),

    #[error("object {0} cannot be transformed: {1}")]
    UnsupportedObject(ObjectId, String),

    #[error("cryptographic invariant violated: {0}")]
    CryptoFailure(String),

    #[error("parse error at offset {offset}: {message}")]
    Parse { offset: usize, message: String },

    #[error("the document has no encryption dictionary")]
    NotEncrypted,

    #[error("the supplied password is incorrect")]
    IncorrectPassword,
}

pub type Result<T> = std::result::Result<T, PdfError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::ObjectId;

    #[test]
    fn test_error_display() {
        let err = PdfError::InvalidPolicy("key length 64 not allowed for R5".to_string());
        assert_eq!(
            err.to_string(),
            "invalid encryption policy: key length 64 not allowed for R5"
        );

        let err = PdfError::UnsupportedObject(ObjectId::new(7, 0), "unknown filter".to_string());
        assert_eq!(err.to_string(), "object 7 0 R cannot be transformed: unknown filter");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: PdfError = io_err.into();
        assert!(matches!(err, PdfError::Io(_)));
    }

    #[test]
    fn test_parse_error_display() {
        let err = PdfError::Parse {
            offset: 42,
            message: "expected dictionary".to_string(),
        };
        assert_eq!(err.to_string(), "parse error at offset 42: expected dictionary");
    }
}
