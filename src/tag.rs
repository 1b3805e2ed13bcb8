// src/tag.rs
use std::ops::Range;

use pcsc::Card;
use thiserror::Error;

use crate::apdu::{self, ApduError};
use crate::types::{NTAG_PAGE_SIZE, TERMINATOR_TLV};

#[derive(Debug, Error)]
pub enum TagError {
    #[error("no data could be read from the tag: {0}")]
    Unreadable(ApduError),

    #[error("no data could be read from the tag")]
    Empty,
}

/// Anything that hands out NTAG memory one page at a time.
pub trait PageSource {
    fn read_page(&self, page: u8) -> Result<Vec<u8>, ApduError>;
}

impl PageSource for Card {
    fn read_page(&self, page: u8) -> Result<Vec<u8>, ApduError> {
        apdu::read_binary(self, page, NTAG_PAGE_SIZE)
    }
}

// NTAG21x user memory is read page by page; reading past the end of a smaller
// tag fails, so the first failed or empty read ends the dump.
pub fn read_user_memory<S: PageSource + ?Sized>(
    source: &S,
    pages: Range<u8>,
) -> Result<Vec<u8>, TagError> {
    let mut full_data = Vec::new();
    let mut first_error = None;

    for page in pages {
        match source.read_page(page) {
            Ok(data) if !data.is_empty() => full_data.extend_from_slice(&data),
            Ok(_) => break,
            Err(e) => {
                log::debug!("Page {} read failed: {}", page, e);
                first_error = Some(e);
                break;
            }
        }
    }

    if full_data.is_empty() {
        return Err(first_error.map_or(TagError::Empty, TagError::Unreadable));
    }

    Ok(full_data)
}

/// Cuts the dump at the first Terminator TLV.
pub fn truncate_at_terminator(buffer: &[u8]) -> &[u8] {
    match buffer.iter().position(|&b| b == TERMINATOR_TLV) {
        Some(end) => &buffer[..end],
        None => buffer,
    }
}
