//! In-memory PDF document model.
//!
//! A flat store of indirect objects plus the trailer dictionary. The model
//! deliberately does not interpret the object graph (page trees, fonts,
//! content streams); it exposes exactly what the encryption engine needs:
//! objects by (number, generation), string/stream payload access, and trailer
//! read/write access.

use crate::error::Result;
use crate::objects::{Dictionary, Object, ObjectId};
use crate::reader;
use crate::writer;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Document {
    objects: BTreeMap<ObjectId, Object>,
    trailer: Dictionary,
    /// PDF version from the header, e.g. "1.7".
    version: Option<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document from a file on disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::load_from(&bytes)
    }

    /// Parse a document from raw bytes.
    pub fn load_from(bytes: &[u8]) -> Result<Self> {
        reader::parse_document(bytes)
    }

    /// Serialize the document to a file on disk.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = std::io::BufWriter::new(file);
        self.save_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Serialize the document to an arbitrary writer.
    pub fn save_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer::write_document(self, writer)
    }

    pub fn version(&self) -> &str {
        self.version.as_deref().unwrap_or("1.7")
    }

    pub fn set_version(&mut self, version: impl Into<String>) {
        self.version = Some(version.into());
    }

    pub fn set_object(&mut self, id: ObjectId, object: Object) {
        self.objects.insert(id, object);
    }

    /// Insert an object under a freshly allocated object number.
    pub fn add_object(&mut self, object: Object) -> ObjectId {
        let id = ObjectId::new(self.max_object_number() + 1, 0);
        self.objects.insert(id, object);
        id
    }

    pub fn get_object(&self, id: ObjectId) -> Option<&Object> {
        self.objects.get(&id)
    }

    pub fn get_object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(&id)
    }

    pub fn remove_object(&mut self, id: ObjectId) -> Option<Object> {
        self.objects.remove(&id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter()
    }

    pub fn objects_mut(&mut self) -> impl Iterator<Item = (&ObjectId, &mut Object)> {
        self.objects.iter_mut()
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn max_object_number(&self) -> u32 {
        self.objects.keys().map(|id| id.number()).max().unwrap_or(0)
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.contains_key("Encrypt")
    }

    /// The encryption dictionary, resolving an indirect `/Encrypt` reference.
    pub fn encryption_dict(&self) -> Option<&Dictionary> {
        match self.trailer.get("Encrypt")? {
            Object::Dictionary(dict) => Some(dict),
            Object::Reference(id) => self.get_object(*id).and_then(Object::as_dict),
            _ => None,
        }
    }

    /// First element of the `/ID` array in the trailer, if present.
    pub fn file_id(&self) -> Option<&[u8]> {
        self.trailer
            .get("ID")
            .and_then(Object::as_array)
            .and_then(|arr| arr.first())
            .and_then(Object::as_string_bytes)
    }

    /// Write both elements of the `/ID` array.
    pub fn set_file_id(&mut self, first: Vec<u8>, second: Vec<u8>) {
        self.trailer.set(
            "ID",
            Object::Array(vec![Object::String(first), Object::String(second)]),
        );
    }
}
