//! # slabcodec: bidirectional accessors for slab layouts and JSON schemas
//!
//! One combinator core ([`codec::Accessor`]) drives three kinds of view:
//!
//! - **Bytes** (`[u8]`): fixed-width numbers, raw byte runs, UUIDs
//! - **Bits** ([`BitView`]): LSB-first bit fields packed into byte records
//! - **JSON spines** (`[SpineToken]`): JSON flattened to tokens, read through schema
//!   accessors that keep mismatches as data instead of failing
//!
//! Every accessor both reads and writes, so a decoder is also its own encoder.
//!
//! ## Slab format (version 2)
//!
//! ```text
//! u32 magic (3520002766) | u16 version
//! u16 groups | u16 pad | groups × { uuid[16] | u16 count | u16 pad }
//! per group, count × 8-byte record { x:18 | y:18 | z:18 | rot:5+3 | pad:2 }
//! u16 pad
//! ```
//!
//! Slabs travel as text: gzip, then base64 ([`envelope`]).
//!
//! ## Usage
//!
//! ```no_run
//! use slabcodec::{parse_slab, slab_to_text};
//!
//! # fn main() -> Result<(), slabcodec::CodecError> {
//! let slab = parse_slab("H4sIAAAAAAAACzv369xFJgZGBgaGTP7a4tpWeY8ps15smcwtuAYkhgAA/snG1ygAAAA=")?;
//! assert_eq!(slab.assets.len(), 1);
//! let text = slab_to_text(&slab)?;
//! assert_eq!(parse_slab(&text)?, slab);
//! # Ok(())
//! # }
//! ```
//!
//! See `tests/slab.rs` and `tests/schema.rs` for fuller examples.

pub mod bitview;
pub mod codec;
pub mod dump;
pub mod envelope;
pub mod numeric;
pub mod schema;
pub mod slab;
pub mod spine;
pub mod uuid;

pub use bitview::BitView;
pub use codec::{Accessor, CodecError, Endianness, Writer};
pub use envelope::{compress, decompress, Envelope};
pub use schema::{
    field, fill_out, json_array, json_boolean, json_dict, json_null, json_number, json_obj,
    json_string, json_tuple, json_undefined, json_value, unwrap, Json, JsonError, JsonErrorKind,
    JsonPath, JsonResult,
};
pub use slab::{
    decode_slab, encode_slab, parse_slab, slab, slab_to_text, AssetLayout, Placement, Slab,
    MAGIC,
};
pub use spine::{
    json_any, json_raw, parse_spine, spine_from_value, value_from_spine, Spine, SpineToken,
};
