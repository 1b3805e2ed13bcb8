// src/types.rs

// Events sent FROM the reader thread TO the webhook dispatcher
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TagEvent {
    ReaderStatus { connected: bool },
    TagRead { uid: String, uri: String },
    NoUriRecord { uid: String },
    TagReadError { uid: String, error: String },
    TagRemoved,
}

pub const URI_RECORD_TYPE: u8 = b'U'; // NFC Forum Well Known Type "U"
pub const TERMINATOR_TLV: u8 = 0xFE;

pub const NTAG_PAGE_SIZE: u8 = 4;
pub const NTAG_FIRST_USER_PAGE: u8 = 4;
pub const NTAG_READ_END_PAGE: u8 = 36; // 32 pages, 128 bytes

pub const SW_SUCCESS: [u8; 2] = [0x90, 0x00];
