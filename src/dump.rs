//! Format decoded values for display (error messages, slab dump text).

use crate::codec::CodecError;
use crate::schema::{JsonError, JsonErrorKind};
use crate::slab::{AssetLayout, Placement, Slab};
use crate::spine::{value_from_spine, SpineToken};

/// Compact JSON for a token subtree, or its leading token type when it is not a whole subtree.
pub fn format_tokens(tokens: &[SpineToken]) -> String {
    match value_from_spine(tokens) {
        Ok(value) => value.to_string(),
        Err(_) => tokens
            .first()
            .map(|t| format!("<{}>", t.type_name()))
            .unwrap_or_else(|| "<empty>".to_string()),
    }
}

/// One-line message for a schema error.
pub fn describe_error(error: &JsonError, expected: &str) -> String {
    match &error.kind {
        JsonErrorKind::InvalidType => {
            let found = error.found.first().map_or("nothing", SpineToken::type_name);
            format!(
                "expected {}, found {} {}",
                expected,
                found,
                format_tokens(&error.found)
            )
        }
        JsonErrorKind::MissingKey(key) => format!("missing key {:?}", key),
        JsonErrorKind::ExtraKey(key) => {
            format!("unexpected key {:?}: {}", key, format_tokens(&error.found))
        }
    }
}

/// Placement as `(x, y, z) @ rot°`.
pub fn format_placement(p: &Placement) -> String {
    format!("({:.2}, {:.2}, {:.2}) @ {}°", p.x, p.y, p.z, p.rot)
}

fn asset_to_dump(asset: &AssetLayout, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let mut lines = vec![format!("{}{} [{}]", pad, asset.id, asset.positions.len())];
    for (i, p) in asset.positions.iter().enumerate() {
        lines.push(format!("{}  [{}] {}", pad, i, format_placement(p)));
    }
    lines.join("\n")
}

/// Multi-line dump: one line per asset group followed by its placements.
pub fn slab_to_dump(slab: &Slab) -> String {
    let mut lines = vec![slab_summary_line(slab)];
    for asset in &slab.assets {
        lines.push(asset_to_dump(asset, 1));
    }
    lines.join("\n")
}

/// First line of [`slab_to_dump`].
pub fn slab_summary_line(slab: &Slab) -> String {
    format!(
        "slab v{}: {} asset groups, {} placements",
        slab.version,
        slab.assets.len(),
        slab.placement_count()
    )
}

pub fn slab_to_json(slab: &Slab) -> Result<String, CodecError> {
    Ok(serde_json::to_string_pretty(slab)?)
}
