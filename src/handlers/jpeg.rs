//! JPEG metadata.
//!
//! Dimensions come from `imagesize`. Everything else is read from the marker
//! segments that precede the first scan: the JFIF version from APP0, the
//! coding process from the first SOF marker, and camera details from an Exif
//! APP1 block.

use super::ContentHandler;
use crate::record::{FILE_TYPE, Record};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::debug;

pub const WIDTH: &str = "width";
pub const HEIGHT: &str = "height";
pub const ENCODING: &str = "encoding";
pub const JFIF_VERSION: &str = "jfif version";
pub const CAMERA_MAKE: &str = "camera make";
pub const CAMERA_MODEL: &str = "camera model";
pub const ORIENTATION: &str = "orientation";
pub const CAPTURE_TIME: &str = "capture time";

const TAG_MAKE: u16 = 0x010F;
const TAG_MODEL: u16 = 0x0110;
const TAG_ORIENTATION: u16 = 0x0112;
const TAG_DATE_TIME: u16 = 0x0132;
const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_DATE_TIME_ORIGINAL: u16 = 0x9003;

const TYPE_ASCII: u16 = 2;
const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_IFD: u16 = 13;

/// Handler for files sniffed as `JPEG...`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JpegHandler;

impl ContentHandler for JpegHandler {
    fn extract(&self, path: &Path) -> Record {
        debug!("Processing JPEG file: {}", path.display());
        let mut record = Record::new().with(FILE_TYPE, "JPEG");
        match imagesize::size(path) {
            Ok(size) => {
                record.insert(WIDTH, size.width);
                record.insert(HEIGHT, size.height);
            }
            Err(e) => debug!("no dimensions for {}: {}", path.display(), e),
        }
        let mut segments = Segments::default();
        let scanned = File::open(path)
            .and_then(|file| scan_segments(&mut BufReader::new(file), &mut segments));
        if let Err(e) = scanned {
            debug!("stopped reading segments of {}: {}", path.display(), e);
        }
        segments.fill(&mut record);
        record
    }
}

#[derive(Debug, Default)]
struct Segments {
    jfif_version: Option<(u8, u8)>,
    encoding: Option<&'static str>,
    exif: Option<ExifTags>,
}

impl Segments {
    fn fill(self, record: &mut Record) {
        if let Some((major, minor)) = self.jfif_version {
            record.insert(JFIF_VERSION, format!("{}.{:02}", major, minor));
        }
        if let Some(encoding) = self.encoding {
            record.insert(ENCODING, encoding);
        }
        let Some(exif) = self.exif else {
            return;
        };
        if let Some(make) = exif.make {
            record.insert(CAMERA_MAKE, make);
        }
        if let Some(model) = exif.model {
            record.insert(CAMERA_MODEL, model);
        }
        if let Some(orientation) = exif.orientation {
            record.insert(ORIENTATION, u64::from(orientation));
        }
        if let Some(time) = exif.date_time_original.or(exif.date_time) {
            record.insert(CAPTURE_TIME, time);
        }
    }
}

fn invalid(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.to_string())
}

/// Reads marker segments up to the first scan, filling `segments` as it goes
/// so a truncated file still yields whatever preceded the damage.
fn scan_segments<R: Read>(reader: &mut R, segments: &mut Segments) -> io::Result<()> {
    let mut soi = [0u8; 2];
    reader.read_exact(&mut soi)?;
    if soi != [0xFF, 0xD8] {
        return Err(invalid("missing SOI marker"));
    }
    loop {
        let marker = next_marker(reader)?;
        match marker {
            // EOI, SOS
            0xD9 | 0xDA => return Ok(()),
            // TEM, RSTn: no length field
            0x01 | 0xD0..=0xD7 => continue,
            _ => {}
        }
        let mut length = [0u8; 2];
        reader.read_exact(&mut length)?;
        let length = usize::from(u16::from_be_bytes(length));
        if length < 2 {
            return Err(invalid("segment length below 2"));
        }
        let mut payload = vec![0u8; length - 2];
        reader.read_exact(&mut payload)?;
        match marker {
            0xE0 if payload.len() >= 7 && payload.starts_with(b"JFIF\0") => {
                segments.jfif_version = Some((payload[5], payload[6]));
            }
            0xE1 if segments.exif.is_none() && payload.starts_with(b"Exif\0\0") => {
                segments.exif = parse_exif(&payload[6..]);
            }
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                segments.encoding.get_or_insert(coding_process(marker));
            }
            _ => {}
        }
    }
}

fn next_marker<R: Read>(reader: &mut R) -> io::Result<u8> {
    let mut byte = [0u8; 1];
    reader.read_exact(&mut byte)?;
    if byte[0] != 0xFF {
        return Err(invalid("expected a marker"));
    }
    // Any number of 0xFF fill bytes may precede the marker code.
    loop {
        reader.read_exact(&mut byte)?;
        if byte[0] != 0xFF {
            return Ok(byte[0]);
        }
    }
}

fn coding_process(marker: u8) -> &'static str {
    match marker {
        0xC0 => "baseline",
        0xC1 | 0xC9 => "extended sequential",
        0xC2 | 0xCA => "progressive",
        0xC3 | 0xCB => "lossless",
        _ => "hierarchical",
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ExifTags {
    make: Option<String>,
    model: Option<String>,
    orientation: Option<u16>,
    date_time: Option<String>,
    date_time_original: Option<String>,
}

struct IfdEntry {
    tag: u16,
    kind: u16,
    count: u32,
    /// Position of the 4-byte value/offset field.
    field: usize,
}

/// A TIFF structure as embedded in an Exif block. Offsets are relative to its start.
struct Tiff<'a> {
    data: &'a [u8],
    big_endian: bool,
}

impl<'a> Tiff<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let big_endian = match data.get(0..2)? {
            b"II" => false,
            b"MM" => true,
            _ => return None,
        };
        let tiff = Self { data, big_endian };
        (tiff.u16(2)? == 42).then_some(tiff)
    }

    fn u16(&self, offset: usize) -> Option<u16> {
        let bytes: [u8; 2] = self.data.get(offset..offset.checked_add(2)?)?.try_into().ok()?;
        Some(if self.big_endian {
            u16::from_be_bytes(bytes)
        } else {
            u16::from_le_bytes(bytes)
        })
    }

    fn u32(&self, offset: usize) -> Option<u32> {
        let bytes: [u8; 4] = self.data.get(offset..offset.checked_add(4)?)?.try_into().ok()?;
        Some(if self.big_endian {
            u32::from_be_bytes(bytes)
        } else {
            u32::from_le_bytes(bytes)
        })
    }

    fn ifd(&self, offset: usize) -> Vec<IfdEntry> {
        let Some(count) = self.u16(offset) else {
            return Vec::new();
        };
        (0..usize::from(count))
            .map_while(|i| {
                let at = offset + 2 + i * 12;
                Some(IfdEntry {
                    tag: self.u16(at)?,
                    kind: self.u16(at + 2)?,
                    count: self.u32(at + 4)?,
                    field: at + 8,
                })
            })
            .collect()
    }

    fn ascii(&self, entry: &IfdEntry) -> Option<String> {
        if entry.kind != TYPE_ASCII {
            return None;
        }
        let len = entry.count as usize;
        let start = if len <= 4 {
            entry.field
        } else {
            self.u32(entry.field)? as usize
        };
        let bytes = self.data.get(start..start.checked_add(len)?)?;
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches('\0').trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn short(&self, entry: &IfdEntry) -> Option<u16> {
        (entry.kind == TYPE_SHORT).then(|| self.u16(entry.field)).flatten()
    }

    fn offset(&self, entry: &IfdEntry) -> Option<usize> {
        matches!(entry.kind, TYPE_LONG | TYPE_IFD)
            .then(|| self.u32(entry.field))
            .flatten()
            .map(|n| n as usize)
    }
}

fn parse_exif(data: &[u8]) -> Option<ExifTags> {
    let tiff = Tiff::new(data)?;
    let ifd0 = tiff.u32(4)? as usize;
    let mut tags = ExifTags::default();
    for entry in tiff.ifd(ifd0) {
        match entry.tag {
            TAG_MAKE => tags.make = tiff.ascii(&entry),
            TAG_MODEL => tags.model = tiff.ascii(&entry),
            TAG_ORIENTATION => tags.orientation = tiff.short(&entry),
            TAG_DATE_TIME => tags.date_time = tiff.ascii(&entry),
            TAG_EXIF_IFD => {
                let Some(sub) = tiff.offset(&entry) else {
                    continue;
                };
                for inner in tiff.ifd(sub) {
                    if inner.tag == TAG_DATE_TIME_ORIGINAL {
                        tags.date_time_original = tiff.ascii(&inner);
                    }
                }
            }
            _ => {}
        }
    }
    Some(tags)
}
