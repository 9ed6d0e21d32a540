//! Compact number encoding
//!
//! The two high bits of the first byte select the width:
//!
//! ```text
//! 00xxxxxx                      values < 0x40
//! 01xxxxxx xxxxxxxx             values < 0x4000
//! 10xxxxxx xxxxxxxx x16         values < 0x4000_0000
//! 11000000 x32                  everything else
//! ```

/// Appends the compact form of `value` to `buf`.
pub fn encode(value: u32, buf: &mut Vec<u8>) {
    if value < 0x40 {
        buf.push(value as u8);
    } else if value < 0x4000 {
        buf.push(0x40 | (value >> 8) as u8);
        buf.push(value as u8);
    } else if value < 0x4000_0000 {
        buf.extend_from_slice(&(value | 0x8000_0000).to_be_bytes());
    } else {
        buf.push(0xC0);
        buf.extend_from_slice(&value.to_be_bytes());
    }
}

/// Total encoded width, given the first byte.
pub fn width(first: u8) -> usize {
    match first >> 6 {
        0 => 1,
        1 => 2,
        2 => 4,
        _ => 5,
    }
}

/// Decodes a number from the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` if `bytes`
/// is too short.
pub fn decode(bytes: &[u8]) -> Option<(u32, usize)> {
    let first = *bytes.first()?;
    let len = width(first);
    if bytes.len() < len {
        return None;
    }
    let value = match len {
        1 => first as u32,
        2 => ((first as u32 & 0x3F) << 8) | bytes[1] as u32,
        4 => u32::from_be_bytes([first & 0x3F, bytes[1], bytes[2], bytes[3]]),
        _ => u32::from_be_bytes([bytes[1], bytes[2], bytes[3], bytes[4]]),
    };
    Some((value, len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(value: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        encode(value, &mut buf);
        buf
    }

    #[test]
    fn test_widths_at_boundaries() {
        assert_eq!(encoded(0), vec![0x00]);
        assert_eq!(encoded(0x3F), vec![0x3F]);
        assert_eq!(encoded(0x40), vec![0x40, 0x40]);
        assert_eq!(encoded(0x3FFF).len(), 2);
        assert_eq!(encoded(0x4000).len(), 4);
        assert_eq!(encoded(0x3FFF_FFFF).len(), 4);
        assert_eq!(encoded(0x4000_0000).len(), 5);
        assert_eq!(encoded(u32::MAX), vec![0xC0, 0xFF, 0xFF, 0xFF, 0xFF]);
    }

    #[test]
    fn test_decode_boundaries() {
        for value in [0, 0x3F, 0x40, 0x3FFF, 0x4000, 0x3FFF_FFFF, 0x4000_0000, u32::MAX] {
            let bytes = encoded(value);
            assert_eq!(decode(&bytes), Some((value, bytes.len())));
        }
    }

    #[test]
    fn test_decode_truncated() {
        assert_eq!(decode(&[]), None);
        assert_eq!(decode(&[0x41]), None);
        assert_eq!(decode(&[0xC0, 0x00, 0x00]), None);
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        assert_eq!(decode(&[0x05, 0xAA, 0xBB]), Some((5, 1)));
    }
}
