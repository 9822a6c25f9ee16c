use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use serde::{Serialize, Serializer};

use crate::archive_reader::ArchiveReader;
use crate::entry_kind::{classify, image_mime_type, ContentKind};
use crate::error::{BrowserError, BrowserResult};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];
const UTF32_LE_BOM: [u8; 4] = [0xFF, 0xFE, 0x00, 0x00];
const UTF32_BE_BOM: [u8; 4] = [0x00, 0x00, 0xFE, 0xFF];

/// What a selected entry looks like once read.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ContentPayload {
    Text {
        text: String,
    },
    /// Binary entry without a viewer: only its name and size are reported.
    OpaqueBinary {
        name: String,
        size: u64,
    },
    /// Raw image bytes; decoding them for display is up to the host.
    Image {
        name: String,
        #[serde(serialize_with = "serialize_base64")]
        bytes: Vec<u8>,
    },
}

impl ContentPayload {
    /// Text shown in a plain code view for this payload.
    pub fn display_text(&self) -> String {
        match self {
            ContentPayload::Text { text } => text.clone(),
            ContentPayload::OpaqueBinary { name, size } => binary_placeholder(name, *size),
            ContentPayload::Image { name, bytes } => {
                format!("[{name}] Image ({} bytes)", bytes.len())
            }
        }
    }

    /// `data:` URL for image payloads, usable directly by a web view.
    pub fn image_data_url(&self) -> Option<String> {
        match self {
            ContentPayload::Image { name, bytes } => Some(format!(
                "data:{};base64,{}",
                image_mime_type(name),
                general_purpose::STANDARD.encode(bytes)
            )),
            _ => None,
        }
    }
}

fn serialize_base64<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&general_purpose::STANDARD.encode(bytes))
}

pub fn binary_placeholder(name: &str, size: u64) -> String {
    format!("[{name}] Binary file ({size} bytes)")
}

/// Reads one entry and shapes it by its classified kind. Every failure is
/// returned as a [`BrowserError`]; malformed archives never panic.
pub fn read_entry_content(archive_path: &Path, entry_path: &str) -> BrowserResult<ContentPayload> {
    let kind = classify(entry_path);
    if kind == ContentKind::Directory {
        return Err(BrowserError::read(entry_path, "entry is a directory"));
    }

    let mut reader = ArchiveReader::open(archive_path)?;
    match kind {
        ContentKind::Text => {
            let bytes = reader.read_entry(entry_path)?;
            Ok(ContentPayload::Text {
                text: decode_text(&bytes),
            })
        }
        ContentKind::Image => Ok(ContentPayload::Image {
            name: entry_path.to_string(),
            bytes: reader.read_entry(entry_path)?,
        }),
        _ => Ok(ContentPayload::OpaqueBinary {
            name: entry_path.to_string(),
            size: reader.entry_size(entry_path)?,
        }),
    }
}

/// Decodes text honouring UTF-8/16/32 byte-order marks, falling back to
/// UTF-8. Invalid sequences become U+FFFD instead of failing.
pub fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&UTF8_BOM) {
        return String::from_utf8_lossy(rest).into_owned();
    }
    if let Some(rest) = bytes.strip_prefix(&UTF32_LE_BOM) {
        return decode_utf32(rest, u32::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF32_BE_BOM) {
        return decode_utf32(rest, u32::from_be_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8_lossy(bytes).into_owned()
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> String {
    let chunks = bytes.chunks_exact(2);
    let trailing = !chunks.remainder().is_empty();
    let units = chunks.map(|pair| to_unit([pair[0], pair[1]]));
    let mut text: String = char::decode_utf16(units)
        .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect();
    if trailing {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

fn decode_utf32(bytes: &[u8], to_scalar: fn([u8; 4]) -> u32) -> String {
    let chunks = bytes.chunks_exact(4);
    let trailing = !chunks.remainder().is_empty();
    let mut text: String = chunks
        .map(|quad| {
            char::from_u32(to_scalar([quad[0], quad[1], quad[2], quad[3]]))
                .unwrap_or(char::REPLACEMENT_CHARACTER)
        })
        .collect();
    if trailing {
        text.push(char::REPLACEMENT_CHARACTER);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{write_jar, JarFixture};

    #[test]
    fn decode_text_strips_utf8_bom() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhello"), "hello");
        assert_eq!(decode_text("plain é".as_bytes()), "plain é");
    }

    #[test]
    fn decode_text_handles_utf16_boms() {
        let le = [0xFF, 0xFE, b'h', 0x00, b'i', 0x00];
        let be = [0xFE, 0xFF, 0x00, b'h', 0x00, b'i'];
        assert_eq!(decode_text(&le), "hi");
        assert_eq!(decode_text(&be), "hi");
    }

    #[test]
    fn decode_text_handles_utf32_le_before_utf16_le() {
        let le32 = [0xFF, 0xFE, 0x00, 0x00, b'A', 0x00, 0x00, 0x00];
        assert_eq!(decode_text(&le32), "A");
        let be32 = [0x00, 0x00, 0xFE, 0xFF, 0x00, 0x00, 0x00, b'B'];
        assert_eq!(decode_text(&be32), "B");
    }

    #[test]
    fn decode_text_replaces_invalid_sequences() {
        assert_eq!(decode_text(b"ok\xFFok"), "ok\u{FFFD}ok");
        let odd_utf16 = [0xFF, 0xFE, b'a', 0x00, b'b'];
        assert_eq!(decode_text(&odd_utf16), "a\u{FFFD}");
        let lone_surrogate = [0xFF, 0xFE, 0x00, 0xD8];
        assert_eq!(decode_text(&lone_surrogate), "\u{FFFD}");
    }

    #[test]
    fn read_entry_content_shapes_payload_by_kind() {
        let fixture = JarFixture::new("content-kinds");
        let jar = write_jar(
            &fixture.path("app.jar"),
            &[
                ("META-INF/MANIFEST.MF", Some(b"Manifest-Version: 1.0\n".as_slice())),
                ("com/app/Main.class", Some(b"\xCA\xFE\xBA\xBE\x00\x00".as_slice())),
                ("icons/logo.PNG", Some(b"\x89PNG".as_slice())),
                ("lib/inner.jar", Some(b"PK".as_slice())),
            ],
        );

        assert_eq!(
            read_entry_content(&jar, "META-INF/MANIFEST.MF").expect("text"),
            ContentPayload::Text {
                text: "Manifest-Version: 1.0\n".to_string()
            }
        );

        let class = read_entry_content(&jar, "com/app/Main.class").expect("class");
        assert_eq!(
            class,
            ContentPayload::OpaqueBinary {
                name: "com/app/Main.class".to_string(),
                size: 6
            }
        );
        assert_eq!(
            class.display_text(),
            "[com/app/Main.class] Binary file (6 bytes)"
        );

        let image = read_entry_content(&jar, "icons/logo.PNG").expect("image");
        assert_eq!(
            image.image_data_url().as_deref(),
            Some("data:image/png;base64,iVBORw==")
        );

        assert!(matches!(
            read_entry_content(&jar, "lib/inner.jar").expect("jar"),
            ContentPayload::OpaqueBinary { size: 2, .. }
        ));
    }

    #[test]
    fn read_entry_content_reports_typed_failures() {
        let fixture = JarFixture::new("content-errors");
        let jar = write_jar(&fixture.path("app.jar"), &[("a.txt", Some(b"a".as_slice()))]);

        assert!(matches!(
            read_entry_content(&jar, "missing.txt"),
            Err(BrowserError::EntryNotFound(_))
        ));
        assert!(matches!(
            read_entry_content(&fixture.path("nope.jar"), "a.txt"),
            Err(BrowserError::ArchiveUnreadable { .. })
        ));
        assert!(matches!(
            read_entry_content(&jar, "dir/"),
            Err(BrowserError::ReadError { .. })
        ));
    }

    #[test]
    fn image_payload_serializes_bytes_as_base64() {
        let payload = ContentPayload::Image {
            name: "a.gif".to_string(),
            bytes: b"GIF".to_vec(),
        };
        let json = serde_json::to_value(&payload).expect("serialize");
        assert_eq!(json["type"], "image");
        assert_eq!(json["bytes"], "R0lG");
    }
}
