//! Script-number encoding.
//!
//! Script numbers are little-endian, sign-magnitude byte strings with the
//! sign carried in the top bit of the last byte, minimally encoded (no
//! redundant trailing zero bytes).

use num_bigint::{BigInt, Sign};
use num_traits::Zero;

/// Encode an integer as a minimally-encoded script number.
///
/// Zero encodes as the empty byte string.
pub fn encode_num(n: &BigInt) -> Vec<u8> {
    if n.is_zero() {
        return Vec::new();
    }
    let (sign, mut bytes) = n.to_bytes_le();
    // to_bytes_le yields the minimal magnitude, never empty for non-zero n
    let negative = sign == Sign::Minus;
    if bytes.last().map_or(false, |b| b & 0x80 != 0) {
        bytes.push(if negative { 0x80 } else { 0x00 });
    } else if negative {
        let last = bytes.last_mut().expect("non-zero magnitude");
        *last |= 0x80;
    }
    bytes
}

/// Decode a script number. Non-minimal encodings are accepted.
pub fn decode_num(bytes: &[u8]) -> BigInt {
    if bytes.is_empty() {
        return BigInt::zero();
    }
    let mut magnitude = bytes.to_vec();
    let last = magnitude.last_mut().expect("non-empty");
    let negative = *last & 0x80 != 0;
    *last &= 0x7f;
    let n = BigInt::from_bytes_le(Sign::Plus, &magnitude);
    if negative {
        -n
    } else {
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(n: i64, expected: &[u8]) {
        let big = BigInt::from(n);
        assert_eq!(encode_num(&big), expected);
        assert_eq!(decode_num(expected), big);
    }

    #[test]
    fn small_values() {
        check(0, &[]);
        check(1, &[0x01]);
        check(-1, &[0x81]);
        check(127, &[0x7f]);
        check(128, &[0x80, 0x00]);
        check(-128, &[0x80, 0x80]);
        check(255, &[0xff, 0x00]);
        check(256, &[0x00, 0x01]);
        check(-255, &[0xff, 0x80]);
    }

    #[test]
    fn large_values_roundtrip() {
        let q = BigInt::parse_bytes(
            b"1a0111ea397fe69a4b1ba7b6434bacd764774b84f38512bf6730d2a0f6b0f6241eabfffeb153ffffb9feffffffffaaab",
            16,
        )
        .unwrap();
        assert_eq!(decode_num(&encode_num(&q)), q);
        assert_eq!(decode_num(&encode_num(&-&q)), -q);
    }

    #[test]
    fn sign_bit_padding() {
        // magnitudes with the top bit set need a padding byte
        let n = BigInt::from(0x8000_u32);
        let bytes = encode_num(&n);
        assert_eq!(bytes, vec![0x00, 0x80, 0x00]);
        assert_eq!(decode_num(&bytes), n);
    }
}
