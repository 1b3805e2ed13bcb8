// src/apdu.rs
use pcsc::Card;
use thiserror::Error;

use crate::types::SW_SUCCESS;

#[derive(Debug, Error, PartialEq)]
pub enum ApduError {
    #[error("transmit error: {0}")]
    Transmit(#[from] pcsc::Error),

    #[error("reader returned status {sw1:02X} {sw2:02X}")]
    Status { sw1: u8, sw2: u8 },

    #[error("response too short for a status word ({0} bytes)")]
    ShortResponse(usize),
}

// Get UID of the tag in the field
// PC/SC pseudo-APDU: FF CA 00 00 00
pub fn get_uid(card: &Card) -> Result<Vec<u8>, ApduError> {
    transmit(card, &[0xFF, 0xCA, 0x00, 0x00, 0x00])
}

pub fn read_binary(card: &Card, block: u8, length: u8) -> Result<Vec<u8>, ApduError> {
    // Read: FF B0 00 Block Len
    transmit(card, &[0xFF, 0xB0, 0x00, block, length])
}

fn transmit(card: &Card, apdu: &[u8]) -> Result<Vec<u8>, ApduError> {
    let mut recv_buffer = [0u8; 256];
    let resp = card.transmit(apdu, &mut recv_buffer)?;
    strip_status(resp).map(<[u8]>::to_vec)
}

/// Splits the trailing status word off a response, keeping the data only on 90 00.
pub fn strip_status(resp: &[u8]) -> Result<&[u8], ApduError> {
    let Some((data, sw)) = resp.split_last_chunk::<2>() else {
        return Err(ApduError::ShortResponse(resp.len()));
    };
    if *sw == SW_SUCCESS {
        Ok(data)
    } else {
        Err(ApduError::Status {
            sw1: sw[0],
            sw2: sw[1],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_keeps_data() {
        assert_eq!(
            strip_status(&[0x03, 0x11, 0xD1, 0x01, 0x90, 0x00]),
            Ok(&[0x03, 0x11, 0xD1, 0x01][..])
        );
        assert_eq!(strip_status(&[0x90, 0x00]), Ok(&[][..]));
    }

    #[test]
    fn error_status_is_reported() {
        assert_eq!(
            strip_status(&[0x63, 0x00]),
            Err(ApduError::Status {
                sw1: 0x63,
                sw2: 0x00
            })
        );
        assert_eq!(
            ApduError::Status {
                sw1: 0x6A,
                sw2: 0x82
            }
            .to_string(),
            "reader returned status 6A 82"
        );
    }

    #[test]
    fn short_response() {
        assert_eq!(strip_status(&[0x90]), Err(ApduError::ShortResponse(1)));
        assert_eq!(strip_status(&[]), Err(ApduError::ShortResponse(0)));
    }
}
