//! Bit-addressed reads and writes over a byte buffer.
//!
//! Bit `i` of the view lives in byte `i / 8`, bit `i % 8` (LSB first), and a field of `width`
//! bits takes its least significant bit from the lowest bit index. With
//! [`Endianness::Big`] the byte index is mirrored (`len - 1 - i / 8`); the bit order inside
//! each byte is unchanged. Fields may span byte boundaries.

use crate::codec::{CodecError, Endianness, View};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitView {
    bytes: Vec<u8>,
    endianness: Endianness,
}

/// Low `n` bits set (`n <= 8`).
fn low_mask(n: u32) -> u8 {
    if n >= 8 {
        0xff
    } else {
        (1u8 << n) - 1
    }
}

impl BitView {
    pub fn new(bytes: Vec<u8>, endianness: Endianness) -> Self {
        BitView { bytes, endianness }
    }

    pub fn zeroed(len: usize, endianness: Endianness) -> Self {
        BitView::new(vec![0u8; len], endianness)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    /// Map a global bit index to `(byte offset, bit offset within that byte)`.
    pub fn position(&self, bit: usize) -> (usize, u32) {
        let byte = bit / 8;
        let byte = match self.endianness {
            Endianness::Little => byte,
            Endianness::Big => self.bytes.len().wrapping_sub(1).wrapping_sub(byte),
        };
        (byte, (bit % 8) as u32)
    }

    fn check_range(&self, bit: usize, width: u32) -> Result<(), CodecError> {
        let len = self.bit_len();
        let in_range = width <= 64
            && bit
                .checked_add(width as usize)
                .is_some_and(|end| end <= len);
        if in_range {
            Ok(())
        } else {
            Err(CodecError::BitRange { bit, width, len })
        }
    }

    /// Read `width` bits (at most 64) starting at `bit`.
    pub fn read(&self, bit: usize, width: u32) -> Result<u64, CodecError> {
        self.check_range(bit, width)?;
        let mut out = 0u64;
        let mut done = 0u32;
        while done < width {
            let (byte, offset) = self.position(bit + done as usize);
            let take = (8 - offset).min(width - done);
            let chunk = (self.bytes[byte] >> offset) & low_mask(take);
            out |= u64::from(chunk) << done;
            done += take;
        }
        Ok(out)
    }

    /// Write the low `width` bits of `value` at `bit`, preserving every bit outside the range.
    pub fn write(&mut self, bit: usize, width: u32, value: u64) -> Result<(), CodecError> {
        self.check_range(bit, width)?;
        let mut done = 0u32;
        while done < width {
            let (byte, offset) = self.position(bit + done as usize);
            let take = (8 - offset).min(width - done);
            let mask = low_mask(take);
            let chunk = ((value >> done) as u8) & mask;
            let dest = &mut self.bytes[byte];
            *dest = (*dest & !(mask << offset)) | (chunk << offset);
            done += take;
        }
        Ok(())
    }
}

impl View for BitView {
    type Owned = BitView;

    /// `len` is in bits; the buffer is rounded up to whole bytes.
    fn allocate(len: usize) -> BitView {
        BitView::zeroed(len.div_ceil(8), Endianness::Little)
    }

    fn view_mut(owned: &mut BitView) -> &mut BitView {
        owned
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn read_two_bit_fields() {
        let view = BitView::new(vec![15, 255, 31 + 64], Endianness::Little);
        let expected = [3, 3, 0, 0, 3, 3, 3, 3, 3, 3, 1, 1];
        for (i, want) in expected.iter().enumerate() {
            assert_eq!(view.read(i * 2, 2).expect("read"), *want, "field at bit {}", i * 2);
        }
        assert_eq!(view.read(0, 3).expect("read"), 7);
        assert_eq!(view.read(3, 15).expect("read"), 32737);
        assert_eq!(view.read(18, 6).expect("read"), 23);
    }

    #[test]
    fn write_across_byte_boundaries() {
        let mut view = BitView::zeroed(3, Endianness::Little);
        view.write(3, 15, 32737).expect("write");
        assert_eq!(view.bytes(), &[8, 255, 3]);
        view.write(0, 3, 7).expect("write");
        assert_eq!(view.bytes(), &[15, 255, 3]);
        view.write(18, 6, 23).expect("write");
        assert_eq!(view.bytes(), &[15, 255, 95]);
    }

    #[test]
    fn write_preserves_neighbouring_bits() {
        let mut view = BitView::new(vec![0xff, 0xff], Endianness::Little);
        view.write(4, 8, 0).expect("write");
        assert_eq!(view.bytes(), &[0x0f, 0xf0]);
    }

    #[test]
    fn big_endian_mirrors_bytes_not_bits() {
        let view = BitView::new(vec![0x00, 0x05], Endianness::Big);
        assert_eq!(view.position(0), (1, 0));
        assert_eq!(view.position(9), (0, 1));
        assert_eq!(view.read(0, 3).expect("read"), 5);
    }

    #[test]
    fn out_of_range_is_an_error() {
        let mut view = BitView::zeroed(2, Endianness::Little);
        assert!(matches!(view.read(10, 7), Err(CodecError::BitRange { bit: 10, width: 7, len: 16 })));
        assert!(view.write(16, 1, 1).is_err());
        assert!(view.read(0, 65).is_err());
        assert!(view.read(9, 7).is_ok());
    }

    #[test]
    fn full_width_field() {
        let mut view = BitView::zeroed(9, Endianness::Little);
        view.write(4, 64, u64::MAX - 1).expect("write");
        assert_eq!(view.read(4, 64).expect("read"), u64::MAX - 1);
        assert_eq!(view.read(0, 4).expect("read"), 0);
        assert_eq!(view.read(68, 4).expect("read"), 0);
    }

    proptest! {
        #[test]
        fn write_then_read_returns_the_field(start in 0usize..40, width in 1u32..=24, value: u64) {
            let mut view = BitView::zeroed(8, Endianness::Little);
            view.write(start, width, value).expect("write");
            let mask = (1u64 << width) - 1;
            prop_assert_eq!(view.read(start, width).expect("read"), value & mask);
            if start > 0 {
                prop_assert_eq!(view.read(0, start.min(64) as u32).expect("read"), 0);
            }
            let end = start + width as usize;
            prop_assert_eq!(view.read(end, (64 - end) as u32).expect("read"), 0);
        }
    }
}
