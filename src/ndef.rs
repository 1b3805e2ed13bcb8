// src/ndef.rs
use std::str;

use thiserror::Error;

use crate::types::URI_RECORD_TYPE;

// NFC Forum URI Record Type Definition, identifier codes 0x00..=0x23
pub const URI_PREFIXES: [&str; 36] = [
    "",
    "http://www.",
    "https://www.",
    "http://",
    "https://",
    "tel:",
    "mailto:",
    "ftp://anonymous:anonymous@",
    "ftp://ftp.",
    "ftps://",
    "sftp://",
    "smb://",
    "nfs://",
    "ftp://",
    "dav://",
    "news:",
    "telnet://",
    "imap:",
    "rtsp://",
    "urn:",
    "pop:",
    "sip:",
    "sips:",
    "tftp:",
    "btspp://",
    "btl2cap://",
    "btgoep://",
    "tcpobex://",
    "irdaobex://",
    "file://",
    "urn:epc:id:",
    "urn:epc:tag:",
    "urn:epc:pat:",
    "urn:epc:raw:",
    "urn:epc:",
    "urn:nfc:",
];

/// Why a buffer did not yield a URI. Only used for logging; callers of
/// [`decode_ndef_uri`] see every variant as `None`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UriRecordError {
    #[error("no URI record type byte in buffer")]
    MissingMarker,

    #[error("URI record type byte at offset 0 has no length byte before it")]
    MissingLength,

    #[error("no URI identifier code after record type at offset {0}")]
    MissingPrefixCode(usize),

    #[error("URI body {start}..{end} overruns buffer of {available} bytes")]
    Truncated {
        start: usize,
        end: usize,
        available: usize,
    },

    #[error("URI body is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] str::Utf8Error),
}

/// Scheme prefix for a URI identifier code. Unknown codes get no prefix.
pub fn uri_prefix(code: u8) -> &'static str {
    URI_PREFIXES.get(code as usize).copied().unwrap_or("")
}

/// Decodes the URI record in a raw tag dump.
///
/// Expects the fixed short-record layout `[.., payload_len, 'U', code, body..]`
/// where `payload_len` counts the identifier code plus the body. The record
/// is located by the first `'U'` byte in the buffer, so a stray 0x55 earlier
/// in the dump (e.g. inside the capability container) is mistaken for the
/// type field.
pub fn decode_ndef_uri(buffer: &[u8]) -> Option<String> {
    parse_uri_record(buffer).ok()
}

pub fn parse_uri_record(buffer: &[u8]) -> Result<String, UriRecordError> {
    // 1. Find the record type
    let marker = buffer
        .iter()
        .position(|&b| b == URI_RECORD_TYPE)
        .ok_or(UriRecordError::MissingMarker)?;

    // 2. Payload length sits right before the type field
    let payload_len = marker
        .checked_sub(1)
        .map(|i| buffer[i] as usize)
        .ok_or(UriRecordError::MissingLength)?;

    // 3. First payload byte is the identifier code
    let prefix_code = *buffer
        .get(marker + 1)
        .ok_or(UriRecordError::MissingPrefixCode(marker))?;

    // 4. Body runs to the end of the payload; a payload shorter than 2 bytes
    // has no body at all
    let start = marker + 2;
    let end = marker + 1 + payload_len;
    let body = if end <= start {
        &[][..]
    } else {
        buffer.get(start..end).ok_or(UriRecordError::Truncated {
            start,
            end,
            available: buffer.len(),
        })?
    };

    let prefix = uri_prefix(prefix_code);
    let body = str::from_utf8(body)?;

    let mut uri = String::with_capacity(prefix.len() + body.len());
    uri.push_str(prefix);
    uri.push_str(body);
    Ok(uri)
}
