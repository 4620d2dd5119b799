//! Adafruit manufacturer-specific advertisement data.
//!
//! Layout: two bytes of company identifier (`0x0822`, little endian) followed
//! by zero or more fields encoded as `[len][field_type: u16 LE][value]`, where
//! `len` counts the field type and the value. Field `0x0001` carries the USB
//! product identifier of the board.

use std::fmt::{self, Display};

use super::error::PeripheralError;

pub const ADAFRUIT_MANUFACTURER_ID: [u8; 2] = [0x22, 0x08];

const FIELD_BOARD_PID: u16 = 0x0001;

/// Boards the simulation knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardModel {
    CircuitPlaygroundBluefruit,
    ClueNrf52840,
}

impl BoardModel {
    pub const ALL: [BoardModel; 2] =
        [BoardModel::CircuitPlaygroundBluefruit, BoardModel::ClueNrf52840];

    pub fn product_id(&self) -> u16 {
        match self {
            BoardModel::CircuitPlaygroundBluefruit => 0x8045,
            BoardModel::ClueNrf52840 => 0x8072,
        }
    }

    pub fn from_product_id(pid: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.product_id() == pid)
    }

    pub fn neopixel_count(&self) -> usize {
        match self {
            BoardModel::CircuitPlaygroundBluefruit => 10,
            BoardModel::ClueNrf52840 => 1,
        }
    }

    /// Short name used on the command line and in configuration.
    pub fn short_name(&self) -> &'static str {
        match self {
            BoardModel::CircuitPlaygroundBluefruit => "cpb",
            BoardModel::ClueNrf52840 => "clue",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.short_name().eq_ignore_ascii_case(name))
    }
}

impl Display for BoardModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardModel::CircuitPlaygroundBluefruit => write!(f, "Circuit Playground Bluefruit"),
            BoardModel::ClueNrf52840 => write!(f, "CLUE nRF52840"),
        }
    }
}

pub fn is_manufacturer_adafruit(data: &[u8]) -> bool {
    data.starts_with(&ADAFRUIT_MANUFACTURER_ID)
}

/// Decoded Adafruit manufacturer data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdafruitManufacturerData {
    /// Raw product identifier, kept even when the board is unknown.
    pub product_id: Option<u16>,
}

impl AdafruitManufacturerData {
    pub fn for_board(model: BoardModel) -> Self {
        Self { product_id: Some(model.product_id()) }
    }

    pub fn board_model(&self) -> Option<BoardModel> {
        self.product_id.and_then(BoardModel::from_product_id)
    }

    /// Parses manufacturer data, company identifier included.
    ///
    /// Unknown field types are skipped. A field that runs past the end of the
    /// buffer is an error.
    pub fn parse(data: &[u8]) -> Result<Self, PeripheralError> {
        if !is_manufacturer_adafruit(data) {
            return Err(PeripheralError::NotManufacturerAdafruit);
        }

        let mut decoded = Self::default();
        let mut offset = ADAFRUIT_MANUFACTURER_ID.len();
        while offset < data.len() {
            let len = data[offset] as usize;
            let end = offset + 1 + len;
            if len < 2 || end > data.len() {
                return Err(PeripheralError::InvalidManufacturerData(offset));
            }
            let field_type = u16::from_le_bytes([data[offset + 1], data[offset + 2]]);
            let value = &data[offset + 3..end];
            if field_type == FIELD_BOARD_PID {
                let pid: [u8; 2] =
                    value.try_into().map_err(|_| PeripheralError::InvalidManufacturerData(offset))?;
                decoded.product_id = Some(u16::from_le_bytes(pid));
            }
            offset = end;
        }
        Ok(decoded)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = ADAFRUIT_MANUFACTURER_ID.to_vec();
        if let Some(pid) = self.product_id {
            bytes.push(4);
            bytes.extend_from_slice(&FIELD_BOARD_PID.to_le_bytes());
            bytes.extend_from_slice(&pid.to_le_bytes());
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CPB_ADVERTISEMENT: [u8; 7] = [0x22, 0x08, 0x04, 0x01, 0x00, 0x45, 0x80];

    #[test]
    fn manufacturer_parse_cpb_advertisement() {
        let data = AdafruitManufacturerData::parse(&CPB_ADVERTISEMENT).unwrap();
        assert_eq!(data.product_id, Some(0x8045));
        assert_eq!(data.board_model(), Some(BoardModel::CircuitPlaygroundBluefruit));
    }

    #[test]
    fn manufacturer_encode_matches_advertisement() {
        let bytes =
            AdafruitManufacturerData::for_board(BoardModel::CircuitPlaygroundBluefruit).to_bytes();
        assert_eq!(bytes, CPB_ADVERTISEMENT);

        let clue = AdafruitManufacturerData::for_board(BoardModel::ClueNrf52840).to_bytes();
        assert_eq!(
            AdafruitManufacturerData::parse(&clue).unwrap().board_model(),
            Some(BoardModel::ClueNrf52840)
        );
    }

    #[test]
    fn manufacturer_rejects_other_company() {
        assert!(!is_manufacturer_adafruit(&[0x4c, 0x00, 0x02]));
        assert!(!is_manufacturer_adafruit(&[0x22]));
        assert_eq!(
            AdafruitManufacturerData::parse(&[0x4c, 0x00]),
            Err(PeripheralError::NotManufacturerAdafruit)
        );
    }

    #[test]
    fn manufacturer_truncated_field() {
        assert_eq!(
            AdafruitManufacturerData::parse(&[0x22, 0x08, 0x04, 0x01, 0x00, 0x45]),
            Err(PeripheralError::InvalidManufacturerData(2))
        );
    }

    #[test]
    fn manufacturer_unknown_fields_are_skipped() {
        let data = [0x22, 0x08, 0x03, 0x09, 0x00, 0xff, 0x04, 0x01, 0x00, 0x72, 0x80];
        let decoded = AdafruitManufacturerData::parse(&data).unwrap();
        assert_eq!(decoded.board_model(), Some(BoardModel::ClueNrf52840));
    }

    #[test]
    fn manufacturer_unknown_board() {
        let data = [0x22, 0x08, 0x04, 0x01, 0x00, 0x00, 0x90];
        let decoded = AdafruitManufacturerData::parse(&data).unwrap();
        assert_eq!(decoded.product_id, Some(0x9000));
        assert_eq!(decoded.board_model(), None);
    }

    #[test]
    fn board_model_lookups() {
        assert_eq!(BoardModel::from_short_name("CLUE"), Some(BoardModel::ClueNrf52840));
        assert_eq!(
            BoardModel::from_short_name("cpb"),
            Some(BoardModel::CircuitPlaygroundBluefruit)
        );
        assert_eq!(BoardModel::from_short_name("feather"), None);
        assert_eq!(BoardModel::CircuitPlaygroundBluefruit.neopixel_count(), 10);
        assert_eq!(BoardModel::ClueNrf52840.neopixel_count(), 1);
    }
}
