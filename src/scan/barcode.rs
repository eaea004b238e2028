//! Barcode format checks.

use serde::Serialize;
use std::fmt;

use crate::errors::ScanError;

/// Accepted code lengths.
pub const VALID_LENGTHS: [usize; 4] = [8, 12, 13, 14];

/// Symbology implied by the code length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Symbology {
    Ean8,
    UpcA,
    Ean13,
    Gtin14,
}

impl Symbology {
    fn from_len(len: usize) -> Option<Self> {
        match len {
            8 => Some(Self::Ean8),
            12 => Some(Self::UpcA),
            13 => Some(Self::Ean13),
            14 => Some(Self::Gtin14),
            _ => None,
        }
    }
}

/// A scanned code that passed [`validate_barcode`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Barcode {
    digits: String,
    symbology: Symbology,
}

impl Barcode {
    /// Trims the raw scan and checks it is all digits with an accepted length.
    pub fn parse(raw: &str) -> Result<Self, ScanError> {
        let digits = raw.trim();
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ScanError::InvalidFormat {
                raw: raw.to_string(),
            });
        }

        let symbology = Symbology::from_len(digits.len()).ok_or_else(|| ScanError::InvalidFormat {
            raw: raw.to_string(),
        })?;

        Ok(Self {
            digits: digits.to_string(),
            symbology,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.digits
    }

    pub fn symbology(&self) -> Symbology {
        self.symbology
    }

    /// GS1 mod-10 check digit test. Informational only; acceptance never
    /// depends on it.
    pub fn has_valid_check_digit(&self) -> bool {
        let bytes = self.digits.as_bytes();
        let (body, check) = bytes.split_at(bytes.len() - 1);
        let sum: u32 = body
            .iter()
            .rev()
            .enumerate()
            .map(|(i, b)| {
                let d = u32::from(b - b'0');
                if i % 2 == 0 {
                    d * 3
                } else {
                    d
                }
            })
            .sum();
        (10 - sum % 10) % 10 == u32::from(check[0] - b'0')
    }

    pub fn into_string(self) -> String {
        self.digits
    }
}

impl fmt::Display for Barcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.digits)
    }
}

/// Returns true when `raw` is an acceptable barcode.
pub fn validate_barcode(raw: &str) -> bool {
    Barcode::parse(raw).is_ok()
}
