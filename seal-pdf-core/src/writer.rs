//! Low-level PDF writing: header, body, cross-reference table, trailer.

use crate::document::Document;
use crate::error::Result;
use crate::objects::{Object, ObjectId};
use std::collections::HashMap;
use std::io::Write;

/// Serialize a document. Offsets in the cross-reference table are computed
/// while the body is written.
pub fn write_document<W: Write>(document: &Document, writer: &mut W) -> Result<()> {
    let mut pdf = PdfWriter::new(writer);

    pdf.write_header(document.version())?;

    for (id, object) in document.objects() {
        pdf.write_object(*id, object)?;
    }

    let xref_position = pdf.position();
    pdf.write_xref()?;
    pdf.write_trailer(document, xref_position)?;

    Ok(())
}

struct PdfWriter<'a, W: Write> {
    writer: &'a mut W,
    xref_positions: HashMap<ObjectId, u64>,
    current_position: u64,
}

impl<'a, W: Write> PdfWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        Self {
            writer,
            xref_positions: HashMap::new(),
            current_position: 0,
        }
    }

    fn position(&self) -> u64 {
        self.current_position
    }

    fn write_header(&mut self, version: &str) -> Result<()> {
        self.write_bytes(format!("%PDF-{version}\n").as_bytes())?;
        // Binary comment marking the file as non-ASCII
        self.write_bytes(&[b'%', 0xE2, 0xE3, 0xCF, 0xD3, b'\n'])?;
        Ok(())
    }

    fn write_object(&mut self, id: ObjectId, object: &Object) -> Result<()> {
        self.xref_positions.insert(id, self.current_position);

        let header = format!("{} {} obj\n", id.number(), id.generation());
        self.write_bytes(header.as_bytes())?;

        self.write_object_value(object)?;

        self.write_bytes(b"\nendobj\n")?;
        Ok(())
    }

    fn write_object_value(&mut self, object: &Object) -> Result<()> {
        match object {
            Object::Null => self.write_bytes(b"null")?,
            Object::Boolean(b) => self.write_bytes(if *b { b"true" } else { b"false" })?,
            Object::Integer(i) => self.write_bytes(i.to_string().as_bytes())?,
            Object::Real(f) => self.write_bytes(
                format!("{f:.6}")
                    .trim_end_matches('0')
                    .trim_end_matches('.')
                    .as_bytes(),
            )?,
            Object::String(bytes) => self.write_string(bytes)?,
            Object::Name(n) => {
                self.write_bytes(b"/")?;
                self.write_bytes(n.as_bytes())?;
            }
            Object::Array(arr) => {
                self.write_bytes(b"[")?;
                for (i, obj) in arr.iter().enumerate() {
                    if i > 0 {
                        self.write_bytes(b" ")?;
                    }
                    self.write_object_value(obj)?;
                }
                self.write_bytes(b"]")?;
            }
            Object::Dictionary(dict) => {
                self.write_bytes(b"<<")?;
                for (key, value) in dict.entries() {
                    self.write_bytes(b"\n/")?;
                    self.write_bytes(key.as_bytes())?;
                    self.write_bytes(b" ")?;
                    self.write_object_value(value)?;
                }
                self.write_bytes(b"\n>>")?;
            }
            Object::Stream(dict, data) => {
                self.write_object_value(&Object::Dictionary(dict.clone()))?;
                self.write_bytes(b"\nstream\n")?;
                self.write_bytes(data)?;
                self.write_bytes(b"\nendstream")?;
            }
            Object::Reference(id) => {
                let ref_str = format!("{} {} R", id.number(), id.generation());
                self.write_bytes(ref_str.as_bytes())?;
            }
        }
        Ok(())
    }

    /// Printable strings are written literally; anything binary (which
    /// includes every ciphered payload) goes out as a hex string.
    fn write_string(&mut self, bytes: &[u8]) -> Result<()> {
        let printable = bytes
            .iter()
            .all(|&b| (0x20..0x7F).contains(&b) && !matches!(b, b'(' | b')' | b'\\'));

        if printable {
            self.write_bytes(b"(")?;
            self.write_bytes(bytes)?;
            self.write_bytes(b")")?;
        } else {
            self.write_bytes(b"<")?;
            let mut hex = String::with_capacity(bytes.len() * 2);
            for byte in bytes {
                hex.push_str(&format!("{byte:02X}"));
            }
            self.write_bytes(hex.as_bytes())?;
            self.write_bytes(b">")?;
        }
        Ok(())
    }

    fn write_xref(&mut self) -> Result<()> {
        self.write_bytes(b"xref\n")?;

        let max_obj_num = self
            .xref_positions
            .keys()
            .map(|id| id.number())
            .max()
            .unwrap_or(0);

        // One subsection covering 0..=max; gaps become free entries.
        self.write_bytes(format!("0 {}\n", max_obj_num + 1).as_bytes())?;
        self.write_bytes(b"0000000000 65535 f \n")?;

        for obj_num in 1..=max_obj_num {
            let entry = self
                .xref_positions
                .iter()
                .find(|(id, _)| id.number() == obj_num);
            match entry {
                Some((id, position)) => {
                    let line = format!("{:010} {:05} n \n", position, id.generation());
                    self.write_bytes(line.as_bytes())?;
                }
                None => self.write_bytes(b"0000000000 00000 f \n")?,
            }
        }

        Ok(())
    }

    fn write_trailer(&mut self, document: &Document, xref_position: u64) -> Result<()> {
        let mut trailer = document.trailer().clone();
        trailer.set("Size", (document.max_object_number() + 1) as i64);
        // A full body is written, so incremental-update bookkeeping is stale.
        trailer.remove("Prev");
        trailer.remove("XRefStm");

        self.write_bytes(b"trailer\n")?;
        self.write_object_value(&Object::Dictionary(trailer))?;
        self.write_bytes(b"\nstartxref\n")?;
        self.write_bytes(xref_position.to_string().as_bytes())?;
        self.write_bytes(b"\n%%EOF\n")?;

        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.current_position += data.len() as u64;
        Ok(())
    }
}
