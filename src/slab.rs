//! Slab binary format (version 2).
//!
//! ```text
//! u32 magic | u16 version
//! u16 group count | u16 pad
//! group count × { uuid: 16 bytes | u16 placement count | u16 pad }
//! for each group, count × 8-byte record:
//!     x:16+2 | y:16+2 | z:16+2 | rot:5+3 | pad:2   (bits, LSB first)
//! u16 pad
//! ```
//!
//! All multi-byte integers are little-endian. Positions are fixed point (hundredths), rotation
//! is a multiple of 15 degrees.

use crate::bitview::BitView;
use crate::codec::{array, lift, with_default, with_padding, Accessor, CodecError, Endianness};
use crate::envelope::{compress, decompress};
use crate::numeric::{pack, split_field, uint16, uint32, unpack};
use crate::uuid::uuid;
use serde::{Deserialize, Serialize};

pub const MAGIC: u32 = 3520002766;

/// The only body layout understood.
pub const VERSION: u16 = 2;

/// Positions are stored in hundredths.
const POSITION_SCALE: f64 = 100.0;

/// Largest stored position value plus one (16 primary + 2 overflow bits).
const POSITION_LIMIT: f64 = (1u64 << 18) as f64;

const ROTATION_STEP: f64 = 15.0;

const ROTATION_STEPS: f64 = 32.0;

const LE: Endianness = Endianness::Little;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub magic: u32,
    pub version: u16,
}

/// One placed copy of an asset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Degrees.
    pub rot: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetLayout {
    pub id: String,
    pub positions: Vec<Placement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slab {
    pub version: u16,
    pub assets: Vec<AssetLayout>,
}

impl Slab {
    pub fn new(assets: Vec<AssetLayout>) -> Self {
        Slab {
            version: VERSION,
            assets,
        }
    }

    pub fn placement_count(&self) -> usize {
        self.assets.iter().map(|a| a.positions.len()).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct AssetHeader {
    id: String,
    count: usize,
}

/// Stored grid value for a position component.
pub fn position_to_fixed(value: f64) -> Result<u64, CodecError> {
    let scaled = (value * POSITION_SCALE).round();
    if !(0.0..POSITION_LIMIT).contains(&scaled) {
        return Err(CodecError::ValueOutOfRange(format!(
            "position {} outside 0..{}",
            value,
            POSITION_LIMIT / POSITION_SCALE
        )));
    }
    Ok(scaled as u64)
}

pub fn fixed_to_position(stored: u64) -> f64 {
    stored as f64 / POSITION_SCALE
}

/// Rotation step for `degrees`, truncating toward zero.
pub fn rotation_to_step(degrees: f64) -> Result<u64, CodecError> {
    let step = (degrees / ROTATION_STEP).floor();
    if !(0.0..ROTATION_STEPS).contains(&step) {
        return Err(CodecError::ValueOutOfRange(format!(
            "rotation {} outside 0..{}",
            degrees,
            ROTATION_STEPS * ROTATION_STEP
        )));
    }
    Ok(step as u64)
}

fn position_component() -> impl Accessor<View = BitView, State = f64> {
    split_field(16, 2).try_map(fixed_to_position, position_to_fixed)
}

fn rotation() -> impl Accessor<View = BitView, State = f64> {
    with_padding(unpack(5), unpack(3))
        .try_map(|step: u64| step as f64 * ROTATION_STEP, rotation_to_step)
}

/// One 8-byte placement record.
pub fn placement_record() -> impl Accessor<View = [u8], State = Placement> {
    let fields = (
        position_component(),
        position_component(),
        position_component(),
        rotation(),
    );
    let record = with_padding(fields, unpack(2)).map(
        |(x, y, z, rot): (f64, f64, f64, f64)| Placement { x, y, z, rot },
        |p: Placement| (p.x, p.y, p.z, p.rot),
    );
    pack(8, LE, record)
}

/// `u16` count followed by a `u16` pad.
fn padded_count() -> impl Accessor<View = [u8], State = usize> {
    with_padding(uint16(LE), uint16(LE)).try_map(
        |n: u16| n as usize,
        |n: usize| {
            u16::try_from(n).map_err(|_| {
                CodecError::ValueOutOfRange(format!("count {} does not fit in u16", n))
            })
        },
    )
}

fn asset_headers() -> impl Accessor<View = [u8], State = Vec<AssetHeader>> {
    (uuid(), padded_count())
        .map(
            |(id, count): (String, usize)| AssetHeader { id, count },
            |h: AssetHeader| (h.id, h.count),
        )
        .repeat(padded_count())
}

/// Placements of one group, shaped by its header.
fn asset_positions(id: String, count: usize) -> impl Accessor<View = [u8], State = AssetLayout> {
    (lift(id), placement_record().repeat(lift(count))).map(
        |(id, positions): (String, Vec<Placement>)| AssetLayout { id, positions },
        |a: AssetLayout| (a.id, a.positions),
    )
}

fn v2_assets() -> Result<impl Accessor<View = [u8], State = Vec<AssetLayout>>, CodecError> {
    let body = asset_headers().then(
        |headers: &Vec<AssetHeader>| {
            let groups = headers
                .iter()
                .map(|h| asset_positions(h.id.clone(), h.count))
                .collect();
            Ok(array(groups))
        },
        |assets: &Vec<AssetLayout>| {
            assets
                .iter()
                .map(|a| AssetHeader {
                    id: a.id.clone(),
                    count: a.positions.len(),
                })
                .collect()
        },
    )?;
    Ok(with_padding(body, uint16(LE)))
}

pub fn header() -> impl Accessor<View = [u8], State = Header> {
    let fields = (uint32(LE), uint16(LE)).map(
        |(magic, version): (u32, u16)| Header { magic, version },
        |h: Header| (h.magic, h.version),
    );
    with_default(
        fields,
        Header {
            magic: MAGIC,
            version: VERSION,
        },
    )
}

/// Whole slab: header, then the body selected by its version.
pub fn slab() -> Result<impl Accessor<View = [u8], State = Slab>, CodecError> {
    header().then(
        |h: &Header| {
            if h.magic != MAGIC {
                return Err(CodecError::BadMagic {
                    found: h.magic,
                    expected: MAGIC,
                });
            }
            if h.version != VERSION {
                return Err(CodecError::UnsupportedVersion(h.version));
            }
            let version = h.version;
            Ok(v2_assets()?.map(
                move |assets: Vec<AssetLayout>| Slab { version, assets },
                |s: Slab| s.assets,
            ))
        },
        |s: &Slab| Header {
            magic: MAGIC,
            version: s.version,
        },
    )
}

/// Decode a whole buffer; bytes left after the slab are an error.
pub fn decode_slab(bytes: &[u8]) -> Result<Slab, CodecError> {
    slab()?.decode_exact(bytes, bytes.len())
}

pub fn encode_slab(slab_value: &Slab) -> Result<Vec<u8>, CodecError> {
    slab()?.encode(slab_value.clone())
}

/// Text envelope to slab. Envelope failures surface as [`CodecError::Decompress`], everything
/// past it as [`CodecError::Slab`].
#[tracing::instrument(skip(text), fields(len = text.len()))]
pub fn parse_slab(text: &str) -> Result<Slab, CodecError> {
    let bytes = decompress(text)?;
    let parsed = decode_slab(&bytes).map_err(|e| CodecError::Slab(Box::new(e)))?;
    tracing::debug!(
        groups = parsed.assets.len(),
        placements = parsed.placement_count(),
        "parsed slab"
    );
    Ok(parsed)
}

#[tracing::instrument(skip(slab_value), fields(groups = slab_value.assets.len()))]
pub fn slab_to_text(slab_value: &Slab) -> Result<String, CodecError> {
    let bytes = encode_slab(slab_value)?;
    tracing::debug!(bytes = bytes.len(), "encoded slab");
    compress(&bytes)
}
