//! Combinator tests over byte and bit views: dependent shapes, lifted constants, fixed arrays.

use slabcodec::codec::{array, lift, with_default, with_padding, Accessor, BoxedAccessor};
use slabcodec::numeric::{float32, int16, pack, uint16, uint8, unpack};
use slabcodec::{BitView, CodecError, Endianness};
use std::sync::Arc;

const LE: Endianness = Endianness::Little;

/// A tagged value: tag 1 is an i16, tag 2 a pair of bytes.
fn tagged() -> Result<impl Accessor<View = [u8], State = (u8, Vec<i32>)>, CodecError> {
    with_default(uint8(), 1).then(
        |tag: &u8| -> Result<BoxedAccessor<[u8], (u8, Vec<i32>)>, CodecError> {
            match *tag {
                1 => Ok((lift(1u8), int16(LE))
                    .map(
                        |(t, v): (u8, i16)| (t, vec![v as i32]),
                        |(t, v): (u8, Vec<i32>)| (t, v.first().copied().unwrap_or(0) as i16),
                    )
                    .boxed()),
                2 => Ok((lift(2u8), uint8().repeat(lift(2usize)))
                    .map(
                        |(t, v): (u8, Vec<u8>)| (t, v.into_iter().map(i32::from).collect()),
                        |(t, v): (u8, Vec<i32>)| (t, v.into_iter().map(|b| b as u8).collect()),
                    )
                    .boxed()),
                other => Err(CodecError::LengthMismatch(format!("unknown tag {}", other))),
            }
        },
        |state: &(u8, Vec<i32>)| state.0,
    )
}

#[test]
fn test_then_selects_shape_from_dependency() -> anyhow::Result<()> {
    let acc = tagged()?;
    assert_eq!(acc.decode(&[1, 0xfe, 0xff])?, (1, vec![-2]));
    assert_eq!(acc.decode(&[2, 7, 9])?, (2, vec![7, 9]));
    assert!(acc.decode(&[3, 0]).is_err());
    Ok(())
}

#[test]
fn test_then_writes_dependency_first() -> anyhow::Result<()> {
    let acc = tagged()?;
    assert_eq!(acc.encode((1, vec![-2]))?, vec![1, 0xfe, 0xff]);
    assert_eq!(acc.encode((2, vec![7, 9]))?, vec![2, 7, 9]);
    // Shape disagreeing with the dependency is caught by the lifted count.
    assert!(matches!(
        acc.encode((2, vec![7])),
        Err(CodecError::LiftMismatch { .. })
    ));
    Ok(())
}

#[test]
fn test_then_example_comes_from_dependency_example() -> anyhow::Result<()> {
    assert_eq!(tagged()?.example(), (1, vec![0]));
    // A dependency example without a continuation fails construction.
    let failing = uint8().then(
        |n: &u8| match *n {
            0 => Err(CodecError::LengthMismatch("no shape for 0".to_string())),
            _ => Ok(uint8()),
        },
        |_: &u8| 1u8,
    );
    assert!(failing.is_err());
    let acc = with_default(uint8(), 1).then(
        |n: &u8| Ok(uint8().repeat(lift(*n as usize))),
        |v: &Vec<u8>| v.len() as u8,
    )?;
    assert_eq!(acc.example(), Vec::<u8>::new());
    Ok(())
}

#[test]
fn test_lift_rejects_other_values() {
    let acc = (lift::<[u8], _>("fixed".to_string()), uint8());
    assert!(acc.encode(("fixed".to_string(), 4)).is_ok());
    match acc.encode(("other".to_string(), 4)) {
        Err(CodecError::LiftMismatch { expected, found }) => {
            assert_eq!(expected, "\"fixed\"");
            assert_eq!(found, "\"other\"");
        }
        other => panic!("expected lift mismatch, got {:?}", other),
    }
}

#[test]
fn test_array_requires_matching_length() -> anyhow::Result<()> {
    let acc = array(vec![uint16(LE), uint16(LE), uint16(LE)]);
    let bytes = acc.encode(vec![1, 2, 3])?;
    assert_eq!(bytes, vec![1, 0, 2, 0, 3, 0]);
    assert_eq!(acc.decode(&bytes)?, vec![1, 2, 3]);
    assert!(matches!(acc.encode(vec![1, 2]), Err(CodecError::LengthMismatch(_))));
    Ok(())
}

#[test]
fn test_record_as_mapped_tuple() -> anyhow::Result<()> {
    #[derive(Debug, Clone, PartialEq)]
    struct Sample {
        id: u8,
        level: f32,
    }
    let acc = (uint8(), float32(LE)).map(
        |(id, level): (u8, f32)| Sample { id, level },
        |s: Sample| (s.id, s.level),
    );
    let value = Sample { id: 9, level: 0.5 };
    let bytes = acc.encode(value.clone())?;
    assert_eq!(bytes.len(), 5);
    assert_eq!(acc.decode(&bytes)?, value);
    Ok(())
}

#[test]
fn test_shared_accessors() -> anyhow::Result<()> {
    let shared = Arc::new(uint16(Endianness::Big));
    let pair = (shared.clone(), shared);
    assert_eq!(pair.encode((1, 2))?, vec![0, 1, 0, 2]);
    let boxed: BoxedAccessor<[u8], u8> = uint8().boxed();
    assert_eq!(boxed.decode(&[5])?, 5);
    Ok(())
}

#[test]
fn test_padding_is_dropped_and_restored() -> anyhow::Result<()> {
    let acc = with_padding(uint8(), with_default(uint8(), 0xee));
    assert_eq!(acc.decode(&[3, 0x11])?, 3);
    assert_eq!(acc.encode(3)?, vec![3, 0xee]);
    Ok(())
}

#[test]
fn test_bit_accessors_directly_over_bitview() -> anyhow::Result<()> {
    let fields = (unpack(3), unpack(15), unpack(6));
    let view = BitView::new(vec![15, 255, 95], LE);
    assert_eq!(fields.decode(&view)?, (7, 32737, 23));
    let bits = fields.encode((7, 32737, 23))?;
    assert_eq!(bits.bytes(), &[15, 255, 95]);

    let packed = pack(3, LE, fields);
    assert_eq!(packed.encode((7, 32737, 23))?, vec![15, 255, 95]);
    Ok(())
}
