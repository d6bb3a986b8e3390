//! End-to-end tests for the encryption engine through the public API.

use pretty_assertions::assert_eq;
use seal_pdf::{
    decrypt_document, CipherAlgorithm, Dictionary, Document, EncryptionDictionary,
    EncryptionPolicy, EncryptionSession, Object, ObjectCipher, ObjectId, PdfError, Permissions,
    SecurityHandlerRevision, SessionState, StandardSecurityHandler, UserPassword,
};

fn print_only() -> Permissions {
    let mut permissions = Permissions::new();
    permissions.set_print(true);
    permissions
}

/// Three objects: a string, a 50-byte stream of zeros, an empty string.
fn three_object_document() -> Document {
    let mut doc = Document::new();
    doc.add_object(Object::string("Hello"));

    let mut stream_dict = Dictionary::new();
    stream_dict.set("Length", 50i64);
    doc.add_object(Object::Stream(stream_dict, vec![0u8; 50]));

    doc.add_object(Object::string(""));
    doc
}

#[test]
fn end_to_end_three_object_scenario() {
    let mut doc = three_object_document();

    let policy = EncryptionPolicy::rc4_128("", "secret", print_only());
    let mut session = EncryptionSession::new(policy);
    session.encrypt(&mut doc).unwrap();
    assert_eq!(session.state(), SessionState::Finalized);

    let enc = doc.encryption_dict().expect("encryption dictionary present");
    assert_eq!(enc.get_name("Filter"), Some("Standard"));
    assert_eq!(enc.get_integer("V"), Some(2));
    assert_eq!(enc.get_integer("R"), Some(3));
    assert_eq!(enc.get_integer("Length"), Some(128));

    let o = enc.get_string_bytes("O").expect("O entry");
    let u = enc.get_string_bytes("U").expect("U entry");
    assert_eq!(o.len(), 32);
    assert_eq!(u.len(), 32);
    assert!(o.iter().any(|&b| b != 0));
    assert!(u.iter().any(|&b| b != 0));

    // P equals the encoder's value for {print}.
    assert_eq!(enc.get_integer("P"), Some(print_only().as_p() as i64));

    // Re-derive the file key from the stored entries and decrypt object 1.
    let handler = StandardSecurityHandler::rc4_128bit();
    let file_id = doc.file_id().expect("generated identifier").to_vec();
    let key = handler
        .compute_encryption_key(
            &UserPassword(String::new()),
            o,
            Permissions::from_p(enc.get_integer("P").unwrap() as i32),
            &file_id,
        )
        .unwrap();

    let cipher = ObjectCipher::new(&key, CipherAlgorithm::Rc4);
    let ciphertext = doc
        .get_object(ObjectId::new(1, 0))
        .and_then(Object::as_string_bytes)
        .unwrap();
    assert_eq!(cipher.decrypt(ObjectId::new(1, 0), ciphertext).unwrap(), b"Hello");
}

#[test]
fn failure_before_any_mutation() {
    let mut doc = three_object_document();

    let mut before = Vec::new();
    doc.save_to(&mut before).unwrap();

    let policy = EncryptionPolicy::new(
        "",
        "secret",
        print_only(),
        SecurityHandlerRevision::R5,
        128,
    );
    let mut session = EncryptionSession::new(policy);
    let err = session.encrypt(&mut doc).unwrap_err();

    assert!(matches!(err, PdfError::InvalidPolicy(_)));
    assert_eq!(session.state(), SessionState::Aborted);

    // The document serializes byte-identically to before the call.
    let mut after = Vec::new();
    doc.save_to(&mut after).unwrap();
    assert_eq!(before, after);
}

#[test]
fn file_roundtrip_rc4() {
    let dir = tempfile::tempdir().unwrap();
    let encrypted_path = dir.path().join("restricted.pdf");

    let mut doc = three_object_document();
    doc.trailer_mut()
        .set("Root", Object::Reference(ObjectId::new(1, 0)));

    let mut session =
        EncryptionSession::new(EncryptionPolicy::rc4_128("", "hunter2", print_only()));
    session.encrypt(&mut doc).unwrap();
    doc.save(&encrypted_path).unwrap();

    // A fresh load sees ciphertext, not the plaintext.
    let mut reloaded = Document::load(&encrypted_path).unwrap();
    assert!(reloaded.is_encrypted());
    assert_ne!(
        reloaded
            .get_object(ObjectId::new(1, 0))
            .and_then(Object::as_string_bytes),
        Some(&b"Hello"[..])
    );

    // Decrypting with the owner password restores every payload.
    let permissions = decrypt_document(&mut reloaded, "hunter2").unwrap();
    assert!(permissions.can_print());
    assert!(!permissions.can_modify_contents());

    assert_eq!(
        reloaded
            .get_object(ObjectId::new(1, 0))
            .and_then(Object::as_string_bytes),
        Some(&b"Hello"[..])
    );
    if let Some(Object::Stream(_, data)) = reloaded.get_object(ObjectId::new(2, 0)) {
        assert_eq!(data.as_slice(), &[0u8; 50][..]);
    } else {
        panic!("stream object missing after decryption");
    }
    assert_eq!(
        reloaded
            .get_object(ObjectId::new(3, 0))
            .and_then(Object::as_string_bytes),
        Some(&b""[..])
    );
}

#[test]
fn file_roundtrip_aes256() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("aes.pdf");

    let mut doc = three_object_document();
    let mut session =
        EncryptionSession::new(EncryptionPolicy::aes_256("open", "admin", Permissions::all()));
    session.encrypt(&mut doc).unwrap();
    doc.save(&path).unwrap();

    let mut reloaded = Document::load(&path).unwrap();
    let enc = EncryptionDictionary::from_dict(reloaded.encryption_dict().unwrap()).unwrap();
    assert_eq!(enc.revision().unwrap(), SecurityHandlerRevision::R6);
    assert_eq!(enc.o.len(), 48);
    assert_eq!(enc.u.len(), 48);
    assert_eq!(enc.oe.as_ref().map(Vec::len), Some(32));
    assert_eq!(enc.ue.as_ref().map(Vec::len), Some(32));
    assert_eq!(enc.perms.as_ref().map(Vec::len), Some(16));

    decrypt_document(&mut reloaded, "open").unwrap();
    assert_eq!(
        reloaded
            .get_object(ObjectId::new(1, 0))
            .and_then(Object::as_string_bytes),
        Some(&b"Hello"[..])
    );
}

#[test]
fn permission_bits_survive_the_write_path() {
    for mask in [0u8, 1, 3, 0x55, 0xAA, 0xFF] {
        let mut permissions = Permissions::new();
        permissions
            .set_print(mask & 1 != 0)
            .set_modify_contents(mask & 2 != 0)
            .set_copy(mask & 4 != 0)
            .set_modify_annotations(mask & 8 != 0)
            .set_fill_forms(mask & 16 != 0)
            .set_accessibility(mask & 32 != 0)
            .set_assemble(mask & 64 != 0)
            .set_print_high_quality(mask & 128 != 0);

        let mut doc = three_object_document();
        let mut session = EncryptionSession::new(EncryptionPolicy::rc4_128(
            "",
            "secret",
            permissions,
        ));
        session.encrypt(&mut doc).unwrap();

        let stored = doc.encryption_dict().unwrap().get_integer("P").unwrap() as i32;
        let decoded = Permissions::from_p(stored);
        assert_eq!(decoded.bits(), permissions.bits(), "mask {mask:#04x}");
    }
}

#[test]
fn larger_document_parallel_map() {
    // Enough objects to spread across every worker.
    let mut doc = Document::new();
    for i in 0..200u32 {
        doc.add_object(Object::string(format!("payload number {i}")));
    }

    let mut session =
        EncryptionSession::new(EncryptionPolicy::rc4_128("", "secret", print_only()));
    session.encrypt(&mut doc).unwrap();

    decrypt_document(&mut doc, "secret").unwrap();
    for i in 0..200u32 {
        assert_eq!(
            doc.get_object(ObjectId::new(i + 1, 0))
                .and_then(Object::as_string_bytes),
            Some(format!("payload number {i}").as_bytes())
        );
    }
}
