use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

use crate::error::Result;

/// File reader: decodes a whole entry into text, BOM-aware with encoding detection.
#[derive(Clone, Default)]
pub struct FileReader;

impl FileReader {
    pub fn new() -> Self {
        Self
    }

    pub fn read_text(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(decode(&bytes))
    }
}

fn decode(bytes: &[u8]) -> String {
    let (encoding, bom_len) = detect_from_prefix(bytes);
    let body = &bytes[bom_len..];
    if encoding == encoding_rs::UTF_8 {
        if let Ok(s) = std::str::from_utf8(body) {
            return s.to_string();
        }
    }
    let (cow, _) = encoding.decode_without_bom_handling(body);
    cow.into_owned()
}

fn detect_from_prefix(prefix: &[u8]) -> (&'static Encoding, usize) {
    if prefix.starts_with(&[0xEF, 0xBB, 0xBF]) {
        return (encoding_rs::UTF_8, 3);
    }
    if prefix.starts_with(&[0xFF, 0xFE]) {
        return (encoding_rs::UTF_16LE, 2);
    }
    if prefix.starts_with(&[0xFE, 0xFF]) {
        return (encoding_rs::UTF_16BE, 2);
    }
    if std::str::from_utf8(prefix).is_ok() {
        return (encoding_rs::UTF_8, 0);
    }

    let mut detector = EncodingDetector::new();
    detector.feed(prefix, true);
    (detector.guess(None, true), 0)
}
