//! Content-based file type detection.
//!
//! [`MagicSession`] describes a file from its leading bytes, never from its
//! name, using the same vocabulary as `file(1)`: `"JPEG image data, JFIF
//! standard 1.01"`, `"ASCII text"`, `"data"` and so on. Callers match these
//! descriptions by prefix.

use crate::error::SnifferError;
use content_inspector::ContentType;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Number of leading bytes inspected per file.
const HEADER_LEN: u64 = 4096;

/// Something that can describe the content of a file.
pub trait TypeSniffer: Send + Sync {
    fn classify(&self, path: &Path) -> Result<String, SnifferError>;
}

type Detail = fn(&[u8]) -> Option<String>;

struct Signature {
    /// Every `(offset, bytes)` pair must match.
    parts: &'static [(usize, &'static [u8])],
    label: &'static str,
    detail: Option<Detail>,
}

impl Signature {
    fn matches(&self, header: &[u8]) -> bool {
        self.parts
            .iter()
            .all(|(offset, magic)| header.get(*offset..offset + magic.len()) == Some(*magic))
    }

    fn describe(&self, header: &[u8]) -> String {
        match self.detail.and_then(|detail| detail(header)) {
            Some(extra) => format!("{}, {}", self.label, extra),
            None => self.label.to_string(),
        }
    }
}

const SIGNATURES: &[Signature] = &[
    Signature {
        parts: &[(0, &[0xFF, 0xD8, 0xFF])],
        label: "JPEG image data",
        detail: Some(jpeg_detail),
    },
    Signature {
        parts: &[(0, b"\x89PNG\r\n\x1a\n")],
        label: "PNG image data",
        detail: Some(png_detail),
    },
    Signature {
        parts: &[(0, b"GIF8")],
        label: "GIF image data",
        detail: Some(gif_detail),
    },
    Signature {
        parts: &[(0, b"II*\0")],
        label: "TIFF image data, little-endian",
        detail: None,
    },
    Signature {
        parts: &[(0, b"MM\0*")],
        label: "TIFF image data, big-endian",
        detail: None,
    },
    Signature {
        parts: &[(0, b"RIFF"), (8, b"WEBP")],
        label: "RIFF (little-endian) data, Web/P image",
        detail: None,
    },
    Signature {
        parts: &[(4, b"ftyp")],
        label: "ISO Media",
        detail: Some(iso_media_detail),
    },
    Signature {
        parts: &[(0, b"%PDF-")],
        label: "PDF document",
        detail: Some(pdf_detail),
    },
    Signature {
        parts: &[(0, b"PK\x03\x04")],
        label: "Zip archive data",
        detail: None,
    },
    Signature {
        parts: &[(0, &[0x1F, 0x8B])],
        label: "gzip compressed data",
        detail: None,
    },
];

fn jpeg_detail(header: &[u8]) -> Option<String> {
    // The first segment after SOI starts at offset 2; its identifier at 6.
    if header.get(6..11) == Some(&b"JFIF\0"[..]) {
        let major = header.get(11)?;
        let minor = header.get(12)?;
        return Some(format!("JFIF standard {}.{:02}", major, minor));
    }
    if header.get(6..12) == Some(&b"Exif\0\0"[..]) {
        return Some("Exif standard".to_string());
    }
    None
}

fn png_detail(header: &[u8]) -> Option<String> {
    if header.get(12..16) != Some(&b"IHDR"[..]) {
        return None;
    }
    let width = u32::from_be_bytes(header.get(16..20)?.try_into().ok()?);
    let height = u32::from_be_bytes(header.get(20..24)?.try_into().ok()?);
    Some(format!("{} x {}", width, height))
}

fn gif_detail(header: &[u8]) -> Option<String> {
    let version = std::str::from_utf8(header.get(3..6)?).ok()?;
    Some(format!("version {}", version))
}

fn iso_media_detail(header: &[u8]) -> Option<String> {
    let brand = header.get(8..12)?;
    let kind = match brand {
        b"heic" | b"heix" | b"mif1" | b"msf1" => "HEIF Image",
        b"avif" => "AVIF Image",
        b"qt  " => "Apple QuickTime movie",
        b"M4A " => "Apple iTunes ALAC/AAC-LC (.M4A) Audio",
        _ => return Some(format!("brand {}", String::from_utf8_lossy(brand).trim_end())),
    };
    Some(kind.to_string())
}

fn pdf_detail(header: &[u8]) -> Option<String> {
    let version = std::str::from_utf8(header.get(5..8)?).ok()?;
    Some(format!("version {}", version))
}

fn describe_text(header: &[u8]) -> &'static str {
    match content_inspector::inspect(header) {
        ContentType::UTF_8 if header.is_ascii() => "ASCII text",
        ContentType::UTF_8 if is_utf8_prefix(header) => "UTF-8 Unicode text",
        ContentType::UTF_8 => "ISO-8859 text",
        ContentType::UTF_8_BOM => "UTF-8 Unicode (with BOM) text",
        ContentType::UTF_16LE => "Little-endian UTF-16 Unicode text",
        ContentType::UTF_16BE => "Big-endian UTF-16 Unicode text",
        ContentType::UTF_32LE => "Little-endian UTF-32 Unicode text",
        ContentType::UTF_32BE => "Big-endian UTF-32 Unicode text",
        ContentType::BINARY => "data",
    }
}

/// Valid UTF-8, allowing a character cut off by the end of the header.
fn is_utf8_prefix(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    }
}

/// A type-detection session.
///
/// The session must be [`load`](MagicSession::load)ed before use and is
/// released when dropped. It is read-only once loaded, so one session can be
/// shared between threads.
pub struct MagicSession {
    database: Option<&'static [Signature]>,
}

impl MagicSession {
    pub fn open() -> Self {
        debug!("opening magic session");
        Self { database: None }
    }

    /// Loads the signature database. Loading twice is harmless.
    pub fn load(&mut self) -> Result<(), SnifferError> {
        self.database = Some(SIGNATURES);
        debug!("magic database loaded with {} signatures", SIGNATURES.len());
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.database.is_some()
    }

    /// Describes a buffer holding the start of a file.
    pub fn describe(&self, header: &[u8]) -> Result<String, SnifferError> {
        let database = self.database.ok_or(SnifferError::NotLoaded)?;
        if header.is_empty() {
            return Ok("empty".to_string());
        }
        let description = database
            .iter()
            .find(|signature| signature.matches(header))
            .map(|signature| signature.describe(header))
            .unwrap_or_else(|| describe_text(header).to_string());
        Ok(description)
    }

    /// Releases the session. Dropping it has the same effect.
    pub fn close(self) {}
}

impl Drop for MagicSession {
    fn drop(&mut self) {
        debug!("closing magic session");
    }
}

impl TypeSniffer for MagicSession {
    fn classify(&self, path: &Path) -> Result<String, SnifferError> {
        if !self.is_loaded() {
            return Err(SnifferError::NotLoaded);
        }
        let file = File::open(path).map_err(|e| SnifferError::io(path, e))?;
        let mut header = Vec::with_capacity(HEADER_LEN as usize);
        file.take(HEADER_LEN)
            .read_to_end(&mut header)
            .map_err(|e| SnifferError::io(path, e))?;
        self.describe(&header)
    }
}
