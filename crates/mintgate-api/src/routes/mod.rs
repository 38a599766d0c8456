//! Route handlers, one module per flow.

pub mod audit;
pub mod checkin;
pub mod claims;
pub mod orders;
pub mod payments;
pub mod purchases;

use crate::error::AppError;

/// Decode a hex field, tolerating an optional `0x` prefix.
pub(crate) fn decode_hex(field: &str, raw: &str) -> Result<Vec<u8>, AppError> {
    let digits = raw.strip_prefix("0x").unwrap_or(raw);
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(AppError::MissingFields(format!(
            "{field} must be an even-length hex string"
        )));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| AppError::MissingFields(format!("{field} must be hex")))
        })
        .collect()
}

/// Decode a hex field into a fixed-size array.
pub(crate) fn decode_hex_array<const N: usize>(
    field: &str,
    raw: &str,
) -> Result<[u8; N], AppError> {
    let bytes = decode_hex(field, raw)?;
    bytes.try_into().map_err(|_| {
        AppError::MissingFields(format!("{field} must be {N} bytes of hex"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decoding_accepts_prefixed_and_bare() {
        assert_eq!(decode_hex("k", "0xdead").unwrap(), vec![0xde, 0xad]);
        assert_eq!(decode_hex("k", "dead").unwrap(), vec![0xde, 0xad]);
        assert!(decode_hex("k", "xyz").is_err());
        assert!(decode_hex("k", "abc").is_err());
    }

    #[test]
    fn fixed_size_decoding_enforces_length() {
        let ok: [u8; 2] = decode_hex_array("k", "beef").unwrap();
        assert_eq!(ok, [0xbe, 0xef]);
        assert!(decode_hex_array::<4>("k", "beef").is_err());
    }
}
