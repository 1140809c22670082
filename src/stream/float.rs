//! Historical floating-point encodings.
//!
//! Two formats appear in the containers: an 8-byte double whose mantissa is
//! accumulated as a fraction byte by byte (bit-compatible with an IEEE
//! double, but decoded with the writer's tolerance for near-zero and
//! near-NaN mantissas) and the 10-byte x87 extended format written by old
//! Macintosh and DOS builds, sometimes unnormalized for date values.

use super::ByteStream;
use libm::ldexp;

/// Tolerance used to accept "almost zero" and "almost all ones" mantissas.
const MANTISSA_EPSILON: f64 = 1e-5;

/// A decoded legacy floating-point value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegacyFloat {
    pub value: f64,
    /// Set for the reserved not-a-number bit pattern
    pub not_a_number: bool,
    /// Set when the 10-byte value had its integer bit cleared
    pub unnormalized: bool,
}

impl LegacyFloat {
    fn number(value: f64) -> Self {
        Self {
            value,
            not_a_number: false,
            unnormalized: false,
        }
    }

    fn nan() -> Self {
        Self {
            value: f64::NAN,
            not_a_number: true,
            unnormalized: false,
        }
    }
}

/// Decode the 8-byte format, bytes in most-significant-first order.
fn decode_float8(bytes: [u8; 8]) -> Option<LegacyFloat> {
    let mut exp = ((bytes[0] as i32) << 4) | (bytes[1] as i32 >> 4);
    let mut mantissa = (bytes[1] & 0x0F) as f64 / 16.0;
    let mut factor = 1.0 / 16.0 / 256.0;
    for &b in &bytes[2..] {
        mantissa += b as f64 * factor;
        factor /= 256.0;
    }
    let negative = exp & 0x800 != 0;
    exp &= 0x7FF;

    match exp {
        0 => (mantissa <= MANTISSA_EPSILON || mantissa >= 1.0 - MANTISSA_EPSILON)
            .then(|| LegacyFloat::number(0.0)),
        0x7FF => (mantissa >= 1.0 - MANTISSA_EPSILON).then(LegacyFloat::nan),
        _ => {
            let value = ldexp(1.0 + mantissa, exp - 0x3FF);
            Some(LegacyFloat::number(if negative { -value } else { value }))
        }
    }
}

impl ByteStream {
    fn take_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        if self.remaining() < N as u64 {
            return None;
        }
        let mut out = [0u8; N];
        for b in &mut out {
            *b = self.read_unsigned(1) as u8;
        }
        Some(out)
    }

    /// Read an 8-byte legacy double.
    ///
    /// Layout: sign bit and the high 7 exponent bits, then the low exponent
    /// nibble with the top mantissa nibble, then 6 mantissa bytes. The 8
    /// bytes are always consumed when available, even if the pattern is not
    /// decodable; `None` without moving when fewer are left.
    pub fn read_legacy_float8(&mut self) -> Option<LegacyFloat> {
        self.take_array::<8>().and_then(decode_float8)
    }

    /// Read an 8-byte legacy double stored least significant byte first.
    pub fn read_legacy_float8_reversed(&mut self) -> Option<LegacyFloat> {
        let mut bytes = self.take_array::<8>()?;
        bytes.reverse();
        decode_float8(bytes)
    }

    /// Read a 10-byte extended double in the current byte order.
    ///
    /// Layout: u16 sign and exponent (bias 0x3FFF), u32 high mantissa word
    /// carrying the explicit integer bit, u32 low mantissa word.
    pub fn read_legacy_float10(&mut self) -> Option<LegacyFloat> {
        if self.remaining() < 10 {
            return None;
        }
        let word = self.read_u16();
        let hi = self.read_u32();
        let lo = self.read_u32();

        let negative = word & 0x8000 != 0;
        let biased = (word & 0x7FFF) as i32;
        let mut unnormalized = false;

        if hi & 0x8000_0000 == 0 {
            if lo == 0 {
                if biased == 0 && hi == 0 {
                    return Some(LegacyFloat::number(0.0));
                }
                if biased == 0x7FFF && hi & 0x00FF_FFFF == 0 {
                    return Some(LegacyFloat::nan());
                }
                return None;
            }
            unnormalized = true;
        } else if biased == 0x7FFF {
            if hi & 0x7FFF_FFFF == 0 && lo == 0 {
                let value = if negative { f64::NEG_INFINITY } else { f64::INFINITY };
                return Some(LegacyFloat::number(value));
            }
            return Some(LegacyFloat::nan());
        }

        let exp = biased - 0x3FFF;
        let value = ldexp(hi as f64, exp - 31) + ldexp(lo as f64, exp - 63);
        Some(LegacyFloat {
            value: if negative { -value } else { value },
            not_a_number: false,
            unnormalized,
        })
    }
}
