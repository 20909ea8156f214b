//! Leaf accessors: fixed-width numbers over byte views, bit fields over [`BitView`], and the
//! [`pack`] framing that reads a run of bytes as a bit view.

use crate::bitview::BitView;
use crate::codec::{check_bounds, Accessor, CodecError, Endianness, Writer};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use std::marker::PhantomData;

/// A number type with a fixed width in bytes.
pub trait Primitive: Copy + 'static {
    const SIZE: usize;

    fn get(buf: &[u8], endianness: Endianness) -> Self;

    fn put(self, buf: &mut [u8], endianness: Endianness);

    fn zero() -> Self;
}

impl Primitive for u8 {
    const SIZE: usize = 1;

    fn get(buf: &[u8], _: Endianness) -> Self {
        buf[0]
    }

    fn put(self, buf: &mut [u8], _: Endianness) {
        buf[0] = self;
    }

    fn zero() -> Self {
        0
    }
}

impl Primitive for i8 {
    const SIZE: usize = 1;

    fn get(buf: &[u8], _: Endianness) -> Self {
        buf[0] as i8
    }

    fn put(self, buf: &mut [u8], _: Endianness) {
        buf[0] = self as u8;
    }

    fn zero() -> Self {
        0
    }
}

macro_rules! primitive {
    ($ty:ty, $size:expr, $read:ident, $write:ident, $zero:expr) => {
        impl Primitive for $ty {
            const SIZE: usize = $size;

            fn get(buf: &[u8], endianness: Endianness) -> Self {
                match endianness {
                    Endianness::Big => BigEndian::$read(buf),
                    Endianness::Little => LittleEndian::$read(buf),
                }
            }

            fn put(self, buf: &mut [u8], endianness: Endianness) {
                match endianness {
                    Endianness::Big => BigEndian::$write(buf, self),
                    Endianness::Little => LittleEndian::$write(buf, self),
                }
            }

            fn zero() -> Self {
                $zero
            }
        }
    };
}

primitive!(u16, 2, read_u16, write_u16, 0);
primitive!(u32, 4, read_u32, write_u32, 0);
primitive!(u64, 8, read_u64, write_u64, 0);
primitive!(i16, 2, read_i16, write_i16, 0);
primitive!(i32, 4, read_i32, write_i32, 0);
primitive!(i64, 8, read_i64, write_i64, 0);
primitive!(f32, 4, read_f32, write_f32, 0.0);
primitive!(f64, 8, read_f64, write_f64, 0.0);

/// Fixed-width number at a byte offset.
#[derive(Debug, Clone, Copy)]
pub struct Numeric<T> {
    endianness: Endianness,
    _ty: PhantomData<T>,
}

impl<T: Primitive> Numeric<T> {
    pub fn new(endianness: Endianness) -> Self {
        Numeric {
            endianness,
            _ty: PhantomData,
        }
    }
}

impl<T: Primitive> Accessor for Numeric<T> {
    type View = [u8];
    type State = T;

    fn read(&self, cursor: usize, view: &[u8]) -> Result<(T, usize), CodecError> {
        check_bounds(cursor, T::SIZE, view.len())?;
        let end = cursor + T::SIZE;
        Ok((T::get(&view[cursor..end], self.endianness), end))
    }

    fn write(&self, cursor: usize, state: T) -> Result<(usize, Writer<[u8]>), CodecError> {
        let endianness = self.endianness;
        let end = cursor + T::SIZE;
        let writer: Writer<[u8]> = Box::new(move |view: &mut [u8]| {
            check_bounds(cursor, T::SIZE, view.len())?;
            state.put(&mut view[cursor..end], endianness);
            Ok(())
        });
        Ok((end, writer))
    }

    fn example(&self) -> T {
        T::zero()
    }
}

pub fn uint8() -> Numeric<u8> {
    Numeric::new(Endianness::Little)
}

pub fn int8() -> Numeric<i8> {
    Numeric::new(Endianness::Little)
}

pub fn uint16(endianness: Endianness) -> Numeric<u16> {
    Numeric::new(endianness)
}

pub fn int16(endianness: Endianness) -> Numeric<i16> {
    Numeric::new(endianness)
}

pub fn uint32(endianness: Endianness) -> Numeric<u32> {
    Numeric::new(endianness)
}

pub fn int32(endianness: Endianness) -> Numeric<i32> {
    Numeric::new(endianness)
}

pub fn float32(endianness: Endianness) -> Numeric<f32> {
    Numeric::new(endianness)
}

pub fn float64(endianness: Endianness) -> Numeric<f64> {
    Numeric::new(endianness)
}

/// `N` raw bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ByteArray<const N: usize>;

pub fn byte_array<const N: usize>() -> ByteArray<N> {
    ByteArray
}

impl<const N: usize> Accessor for ByteArray<N> {
    type View = [u8];
    type State = [u8; N];

    fn read(&self, cursor: usize, view: &[u8]) -> Result<([u8; N], usize), CodecError> {
        check_bounds(cursor, N, view.len())?;
        let mut out = [0u8; N];
        out.copy_from_slice(&view[cursor..cursor + N]);
        Ok((out, cursor + N))
    }

    fn write(&self, cursor: usize, state: [u8; N]) -> Result<(usize, Writer<[u8]>), CodecError> {
        let writer: Writer<[u8]> = Box::new(move |view: &mut [u8]| {
            check_bounds(cursor, N, view.len())?;
            view[cursor..cursor + N].copy_from_slice(&state);
            Ok(())
        });
        Ok((cursor + N, writer))
    }

    fn example(&self) -> [u8; N] {
        [0u8; N]
    }
}

/// Unsigned bit field of `width` bits at a bit cursor.
#[derive(Debug, Clone, Copy)]
pub struct Unpack {
    width: u32,
}

pub fn unpack(width: u32) -> Unpack {
    Unpack { width }
}

impl Accessor for Unpack {
    type View = BitView;
    type State = u64;

    fn read(&self, cursor: usize, view: &BitView) -> Result<(u64, usize), CodecError> {
        let value = view.read(cursor, self.width)?;
        Ok((value, cursor + self.width as usize))
    }

    fn write(&self, cursor: usize, state: u64) -> Result<(usize, Writer<BitView>), CodecError> {
        let width = self.width;
        if width < 64 && state >> width != 0 {
            return Err(CodecError::ValueOutOfRange(format!(
                "{} does not fit in {} bits",
                state, width
            )));
        }
        let writer: Writer<BitView> =
            Box::new(move |view: &mut BitView| view.write(cursor, width, state));
        Ok((cursor + width as usize, writer))
    }

    fn example(&self) -> u64 {
        0
    }
}

/// One unsigned value stored as a `low`-bit primary field followed by a `high`-bit
/// overflow field.
pub fn split_field(low: u32, high: u32) -> impl Accessor<View = BitView, State = u64> {
    (unpack(low), unpack(high)).map(
        move |(lo, hi): (u64, u64)| lo | (hi << low),
        move |v: u64| (v & ((1u64 << low) - 1), v >> low),
    )
}

/// `bytes` bytes at a byte cursor, read as a [`BitView`] that `inner` must consume exactly.
pub struct Pack<A> {
    bytes: usize,
    endianness: Endianness,
    inner: A,
}

pub fn pack<A>(bytes: usize, endianness: Endianness, inner: A) -> Pack<A>
where
    A: Accessor<View = BitView>,
{
    Pack {
        bytes,
        endianness,
        inner,
    }
}

impl<A: Accessor<View = BitView>> Pack<A> {
    fn check_width(&self, bits: usize) -> Result<(), CodecError> {
        if bits != self.bytes * 8 {
            return Err(CodecError::LengthMismatch(format!(
                "packed fields cover {} bits of a {}-byte record",
                bits, self.bytes
            )));
        }
        Ok(())
    }
}

impl<A: Accessor<View = BitView>> Accessor for Pack<A> {
    type View = [u8];
    type State = A::State;

    fn read(&self, cursor: usize, view: &[u8]) -> Result<(A::State, usize), CodecError> {
        check_bounds(cursor, self.bytes, view.len())?;
        let end = cursor + self.bytes;
        let bits = BitView::new(view[cursor..end].to_vec(), self.endianness);
        let (state, consumed) = self.inner.read(0, &bits)?;
        self.check_width(consumed)?;
        Ok((state, end))
    }

    fn write(&self, cursor: usize, state: A::State) -> Result<(usize, Writer<[u8]>), CodecError> {
        let (consumed, inner) = self.inner.write(0, state)?;
        self.check_width(consumed)?;
        let (bytes, endianness) = (self.bytes, self.endianness);
        let writer: Writer<[u8]> = Box::new(move |view: &mut [u8]| {
            check_bounds(cursor, bytes, view.len())?;
            let mut bits = BitView::zeroed(bytes, endianness);
            inner(&mut bits)?;
            view[cursor..cursor + bytes].copy_from_slice(bits.bytes());
            Ok(())
        });
        Ok((cursor + bytes, writer))
    }

    fn example(&self) -> A::State {
        self.inner.example()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn i32_is_twos_complement() {
        let le = int32(Endianness::Little);
        let be = int32(Endianness::Big);
        assert_eq!(le.encode(-2).expect("encode"), vec![0xfe, 0xff, 0xff, 0xff]);
        assert_eq!(be.encode(-2).expect("encode"), vec![0xff, 0xff, 0xff, 0xfe]);
        assert_eq!(le.decode(&[0x00, 0x00, 0x00, 0x80]).expect("decode"), i32::MIN);
        assert!(matches!(le.decode(&[1, 2, 3]), Err(CodecError::UnexpectedEof { .. })));
    }

    #[test]
    fn u16_respects_endianness() {
        let le = uint16(Endianness::Little);
        let be = uint16(Endianness::Big);
        assert_eq!(le.decode(&[0x34, 0x12]).expect("decode"), 0x1234);
        assert_eq!(be.decode(&[0x12, 0x34]).expect("decode"), 0x1234);
        assert_eq!(be.encode(0xBEEF).expect("encode"), vec![0xBE, 0xEF]);
    }

    #[test]
    fn magic_is_little_endian_u32() {
        let bytes = [206, 250, 206, 209];
        assert_eq!(uint32(Endianness::Little).decode(&bytes).expect("decode"), 3520002766);
    }

    #[test]
    fn signed_and_float_values() {
        assert_eq!(int8().decode(&[0xff]).expect("decode"), -1);
        assert_eq!(int16(Endianness::Little).decode(&[0xfe, 0xff]).expect("decode"), -2);
        let bytes = float32(Endianness::Little).encode(1.5).expect("encode");
        assert_eq!(float32(Endianness::Little).decode(&bytes).expect("decode"), 1.5);
        let bytes = float64(Endianness::Big).encode(-0.25).expect("encode");
        assert_eq!(bytes.len(), 8);
        assert_eq!(float64(Endianness::Big).decode(&bytes).expect("decode"), -0.25);
    }

    #[test]
    fn read_past_end_is_eof() {
        let err = uint32(Endianness::Little).read(2, &[0, 0, 0, 0, 0]).unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { offset: 2, wanted: 4, len: 5 }));
        // Exactly filling the buffer is fine.
        assert!(uint32(Endianness::Little).read(1, &[0, 0, 0, 0, 0]).is_ok());
    }

    #[test]
    fn unpack_rejects_values_wider_than_the_field() {
        assert!(matches!(unpack(3).write(0, 8), Err(CodecError::ValueOutOfRange(_))));
        assert!(unpack(3).write(0, 7).is_ok());
    }

    #[test]
    fn split_field_joins_overflow_bits() {
        let acc = pack(3, Endianness::Little, (split_field(16, 2), unpack(6)));
        let bytes = acc.encode((70000, 0)).expect("encode");
        assert_eq!(bytes, vec![0x70, 0x11, 0x01]);
        assert_eq!(acc.decode(&bytes).expect("decode"), (70000, 0));
    }

    #[test]
    fn pack_requires_exact_bit_budget() {
        let short = pack(1, Endianness::Little, unpack(7));
        assert!(matches!(short.decode(&[0]), Err(CodecError::LengthMismatch(_))));
        assert!(matches!(short.encode(1), Err(CodecError::LengthMismatch(_))));
    }

    #[test]
    fn byte_array_round_trip() {
        let acc = byte_array::<3>();
        assert_eq!(acc.encode([1, 2, 3]).expect("encode"), vec![1, 2, 3]);
        assert!(acc.decode(&[1, 2]).is_err());
    }
}
