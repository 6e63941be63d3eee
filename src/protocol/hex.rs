use btoi::{btou_radix, ParseIntegerError};
use num_traits::{CheckedAdd, CheckedMul, FromPrimitive, Zero};

/// Strict hex parse of an entire buffer.
#[inline]
pub fn decode_hex<I>(buf: &[u8]) -> Result<I, ParseIntegerError>
where
    I: FromPrimitive + Zero + CheckedAdd + CheckedMul,
{
    btou_radix(buf, 16)
}

/// Strict decimal parse of an entire buffer (`Z`/`z` type and kind fields).
#[inline]
pub fn decode_dec<I>(buf: &[u8]) -> Result<I, ParseIntegerError>
where
    I: FromPrimitive + Zero + CheckedAdd + CheckedMul,
{
    btou_radix(buf, 10)
}

fn ascii2byte(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Permissive hex parse: accumulates leading hex digits and stops at the
/// first byte that isn't one. An empty prefix parses as zero.
///
/// This is the parse used for packet arguments, matching what debuggers
/// actually send (e.g. an `m` length with a stray trailing delimiter).
pub fn parse_hex(buf: &[u8]) -> u32 {
    let mut value: u32 = 0;
    for &b in buf {
        match ascii2byte(b) {
            Some(v) => value = (value << 4) | u32::from(v),
            None => break,
        }
    }
    value
}

pub enum DecodeHexBufError {
    NotAscii,
    NotEvenLen,
}

/// Decode a hex string into a byte slice _in place_.
pub fn decode_hex_buf(buf: &mut [u8]) -> Result<&mut [u8], DecodeHexBufError> {
    use DecodeHexBufError::*;

    if buf.len() % 2 != 0 {
        return Err(NotEvenLen);
    }

    let decoded_len = buf.len() / 2;
    for i in 0..decoded_len {
        let b = ascii2byte(buf[i * 2]).ok_or(NotAscii)? << 4
            | ascii2byte(buf[i * 2 + 1]).ok_or(NotAscii)?;
        buf[i] = b;
    }

    Ok(&mut buf[..decoded_len])
}

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

/// Eight lowercase hex digits, zero-padded, most-significant first.
pub fn encode_hex8(value: u32) -> [u8; 8] {
    let mut out = [0; 8];
    for (i, b) in out.iter_mut().enumerate() {
        *b = HEX_DIGITS[((value >> (28 - i * 4)) & 0xf) as usize];
    }
    out
}

/// Eight hex digits of the value's big-endian byte order.
///
/// Register payloads use this form so the wire bytes line up with the
/// little-endian guest's `target.xml` ordering.
pub fn encode_be_hex8(value: u32) -> [u8; 8] {
    encode_hex8(value.swap_bytes())
}

/// Sum of byte values, mod 256.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |a, x| a.wrapping_add(*x))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_byte_sum_mod_256() {
        assert_eq!(checksum(b""), 0);
        assert_eq!(checksum(b"OK"), 0x9a);
        assert_eq!(checksum(b"S05"), 0xb8);

        let all: Vec<u8> = (0..=255).collect();
        let expected = all.iter().map(|&b| b as u32).sum::<u32>() % 256;
        assert_eq!(checksum(&all) as u32, expected);
    }

    #[test]
    fn hex8_round_trip() {
        for &v in &[0, 1, 0xff, 0x1234_5678, 0xdead_beef, u32::MAX] {
            assert_eq!(parse_hex(&encode_hex8(v)), v);
        }
        // dense sweep over a few bit patterns
        for i in 0..=16 {
            let v = 0x0101_0101u32.wrapping_mul(i);
            assert_eq!(parse_hex(&encode_hex8(v)), v);
        }
    }

    #[test]
    fn be_hex8_is_byteswapped_hex8() {
        for &v in &[0, 0x12345678, 0xa1b2c3d4, u32::MAX] {
            assert_eq!(encode_be_hex8(v), encode_hex8(v.swap_bytes()));
        }
        assert_eq!(&encode_be_hex8(0x12345678), b"78563412");
    }

    #[test]
    fn parse_hex_is_permissive() {
        assert_eq!(parse_hex(b"2a"), 0x2a);
        assert_eq!(parse_hex(b"10,4"), 0x10);
        assert_eq!(parse_hex(b""), 0);
        assert_eq!(parse_hex(b"-1"), 0);
        assert_eq!(parse_hex(b"DEADbeef"), 0xdeadbeef);
    }

    #[test]
    fn strict_parses_reject_trailing_garbage() {
        assert_eq!(decode_hex::<u32>(b"2a").ok(), Some(0x2a));
        assert_eq!(decode_hex::<u32>(b"10,4").ok(), None);
        assert_eq!(decode_dec::<u32>(b"2").ok(), Some(2));
        assert_eq!(decode_dec::<u32>(b"0x2").ok(), None);
    }

    #[test]
    fn decode_hex_buf_pairs() {
        let mut buf = *b"0a1bff";
        let decoded = decode_hex_buf(&mut buf).map_err(drop).unwrap();
        assert_eq!(decoded, &[0x0a, 0x1b, 0xff]);

        let mut odd = *b"abc";
        assert!(decode_hex_buf(&mut odd).is_err());
    }
}
