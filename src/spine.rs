//! JSON spine: a JSON value flattened into a linear token sequence.
//!
//! A container token is followed by its children, each child being a complete subtree:
//! `Array(n)` by `n` element subtrees, `Dict(keys)` by one value subtree per key, in key order.
//! `{"a": [1, true]}` is `[Dict(["a"]), Array(2), Number(1.0), Boolean(true)]`.

use crate::codec::{check_bounds, Accessor, CodecError, View, Writer};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum SpineToken {
    String(String),
    Number(f64),
    Boolean(bool),
    Array(usize),
    Dict(Vec<String>),
    Null,
    Undefined,
}

pub type Spine = Vec<SpineToken>;

impl SpineToken {
    /// Number of child subtrees that follow this token.
    pub fn children(&self) -> usize {
        match self {
            SpineToken::Array(n) => *n,
            SpineToken::Dict(keys) => keys.len(),
            _ => 0,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            SpineToken::String(_) => "string",
            SpineToken::Number(_) => "number",
            SpineToken::Boolean(_) => "boolean",
            SpineToken::Array(_) => "array",
            SpineToken::Dict(_) => "dict",
            SpineToken::Null => "null",
            SpineToken::Undefined => "undefined",
        }
    }
}

impl View for [SpineToken] {
    type Owned = Spine;

    fn allocate(len: usize) -> Spine {
        vec![SpineToken::Undefined; len]
    }

    fn view_mut(owned: &mut Spine) -> &mut [SpineToken] {
        owned.as_mut_slice()
    }
}

/// Token at `cursor`, or EOF.
pub fn token_at(spine: &[SpineToken], cursor: usize) -> Result<&SpineToken, CodecError> {
    spine.get(cursor).ok_or(CodecError::UnexpectedEof {
        offset: cursor,
        wanted: 1,
        len: spine.len(),
    })
}

/// Index one past the subtree starting at `cursor`.
///
/// A container announcing more children than tokens remain is EOF.
pub fn subtree_end(spine: &[SpineToken], cursor: usize) -> Result<usize, CodecError> {
    let mut at = cursor;
    let mut pending = 1usize;
    while pending > 0 {
        let children = token_at(spine, at)?.children();
        at += 1;
        let needed = (pending - 1).saturating_add(children);
        if needed > spine.len() - at {
            return Err(CodecError::UnexpectedEof {
                offset: at,
                wanted: needed,
                len: spine.len(),
            });
        }
        pending = needed;
    }
    Ok(at)
}

/// Writer that copies `tokens` in at `cursor`.
pub fn place_tokens(cursor: usize, tokens: Spine) -> Writer<[SpineToken]> {
    Box::new(move |view: &mut [SpineToken]| {
        check_bounds(cursor, tokens.len(), view.len())?;
        for (slot, token) in view[cursor..].iter_mut().zip(tokens) {
            *slot = token;
        }
        Ok(())
    })
}

/// Deepest container nesting rebuilt into a [`Value`], matching `serde_json`'s parser.
pub const MAX_DEPTH: usize = 128;

/// JSON number for `n`; non-finite values become `null`.
pub fn number_value(n: f64) -> Value {
    // JSON has one number type; integral values come back as integers.
    if n.fract() == 0.0 && n.abs() < 9007199254740992.0 {
        return Value::from(n as i64);
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn value_at(
    spine: &[SpineToken],
    cursor: usize,
    depth: usize,
) -> Result<(Option<Value>, usize), CodecError> {
    let token = token_at(spine, cursor)?;
    if token.children() > 0 && depth >= MAX_DEPTH {
        return Err(CodecError::DepthLimit {
            offset: cursor,
            limit: MAX_DEPTH,
        });
    }
    let mut at = cursor + 1;
    let value = match token {
        SpineToken::String(s) => Value::String(s.clone()),
        SpineToken::Number(n) => number_value(*n),
        SpineToken::Boolean(b) => Value::Bool(*b),
        SpineToken::Null => Value::Null,
        SpineToken::Undefined => return Ok((None, at)),
        SpineToken::Array(n) => {
            let mut items = Vec::with_capacity((*n).min(spine.len() - at));
            for _ in 0..*n {
                let (item, next) = value_at(spine, at, depth + 1)?;
                items.push(item.unwrap_or(Value::Null));
                at = next;
            }
            Value::Array(items)
        }
        SpineToken::Dict(keys) => {
            let mut map = Map::new();
            for key in keys {
                let (item, next) = value_at(spine, at, depth + 1)?;
                if let Some(item) = item {
                    map.insert(key.clone(), item);
                }
                at = next;
            }
            Value::Object(map)
        }
    };
    Ok((Some(value), at))
}

fn push_value(value: &Value, out: &mut Spine) {
    // Pre-order walk; children are pushed reversed so they pop in order.
    let mut pending = vec![value];
    while let Some(value) = pending.pop() {
        match value {
            Value::Null => out.push(SpineToken::Null),
            Value::Bool(b) => out.push(SpineToken::Boolean(*b)),
            Value::Number(n) => out.push(n.as_f64().map_or(SpineToken::Null, SpineToken::Number)),
            Value::String(s) => out.push(SpineToken::String(s.clone())),
            Value::Array(items) => {
                out.push(SpineToken::Array(items.len()));
                pending.extend(items.iter().rev());
            }
            Value::Object(map) => {
                out.push(SpineToken::Dict(map.keys().cloned().collect()));
                pending.extend(map.values().rev());
            }
        }
    }
}

pub fn spine_from_value(value: &Value) -> Spine {
    let mut out = Vec::new();
    push_value(value, &mut out);
    out
}

/// Rebuild JSON from a spine holding exactly one subtree.
pub fn value_from_spine(spine: &[SpineToken]) -> Result<Value, CodecError> {
    json_any().decode_exact(spine, spine.len())
}

/// Parse JSON text straight to a spine.
pub fn parse_spine(text: &str) -> Result<Spine, CodecError> {
    let value: Value = serde_json::from_str(text)?;
    Ok(spine_from_value(&value))
}

/// Any JSON value. `Undefined` is dropped from dicts and reads as `null` elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonAny;

pub fn json_any() -> JsonAny {
    JsonAny
}

impl Accessor for JsonAny {
    type View = [SpineToken];
    type State = Value;

    fn read(&self, cursor: usize, view: &[SpineToken]) -> Result<(Value, usize), CodecError> {
        let (value, end) = value_at(view, cursor, 0)?;
        Ok((value.unwrap_or(Value::Null), end))
    }

    fn write(
        &self,
        cursor: usize,
        state: Value,
    ) -> Result<(usize, Writer<[SpineToken]>), CodecError> {
        let tokens = spine_from_value(&state);
        Ok((cursor + tokens.len(), place_tokens(cursor, tokens)))
    }

    fn example(&self) -> Value {
        Value::Null
    }
}

/// The raw token subtree at the cursor.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRaw;

pub fn json_raw() -> JsonRaw {
    JsonRaw
}

impl Accessor for JsonRaw {
    type View = [SpineToken];
    type State = Spine;

    fn read(&self, cursor: usize, view: &[SpineToken]) -> Result<(Spine, usize), CodecError> {
        let end = subtree_end(view, cursor)?;
        Ok((view[cursor..end].to_vec(), end))
    }

    fn write(
        &self,
        cursor: usize,
        state: Spine,
    ) -> Result<(usize, Writer<[SpineToken]>), CodecError> {
        Ok((cursor + state.len(), place_tokens(cursor, state)))
    }

    fn example(&self) -> Spine {
        vec![SpineToken::Undefined]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use SpineToken::{Array, Boolean, Dict, Null, Number, Undefined};

    #[test]
    fn flattens_in_key_order() {
        let spine = spine_from_value(&json!({"a": [1, true], "b": null}));
        assert_eq!(
            spine,
            vec![
                Dict(vec!["a".into(), "b".into()]),
                Array(2),
                Number(1.0),
                Boolean(true),
                Null
            ]
        );
    }

    #[test]
    fn subtree_end_skips_nested_containers() {
        let spine = parse_spine(r#"[{"x": [1, 2]}, "s"]"#).expect("parse");
        assert_eq!(subtree_end(&spine, 0).expect("end"), spine.len());
        assert_eq!(subtree_end(&spine, 1).expect("end"), 5);
        assert_eq!(subtree_end(&spine, 5).expect("end"), 6);
    }

    #[test]
    fn truncated_containers_are_eof() {
        let spine = vec![Array(3), Number(1.0)];
        assert!(matches!(subtree_end(&spine, 0), Err(CodecError::UnexpectedEof { .. })));
        let huge = vec![Array(usize::MAX), Null];
        assert!(matches!(subtree_end(&huge, 0), Err(CodecError::UnexpectedEof { .. })));
        assert!(json_any().decode(&spine).is_err());
        assert!(subtree_end(&[], 0).is_err());
    }

    #[test]
    fn undefined_is_absent() {
        let spine = vec![
            Dict(vec!["a".into(), "b".into()]),
            Undefined,
            Array(2),
            Undefined,
            Number(2.5),
        ];
        assert_eq!(value_from_spine(&spine).expect("decode"), json!({"b": [null, 2.5]}));
        assert_eq!(value_from_spine(&[Undefined]).expect("decode"), Value::Null);
    }

    #[test]
    fn non_finite_numbers_read_as_null() {
        let spine = vec![Array(2), Number(f64::NAN), Number(f64::INFINITY)];
        assert_eq!(value_from_spine(&spine).expect("decode"), json!([null, null]));
    }

    #[test]
    fn json_any_round_trips_text() {
        let value = json!({"version": [12, "asdf"], "elements": [[], [{}, {"vv": {"a": "asdf", "b": null}}]]});
        let spine = json_any().encode(value.clone()).expect("encode");
        assert_eq!(spine, parse_spine(&value.to_string()).expect("parse"));
        assert_eq!(json_any().decode_exact(&spine, spine.len()).expect("decode"), value);
    }

    #[test]
    fn json_raw_copies_one_subtree() {
        let spine = parse_spine(r#"[[1, 2], 3]"#).expect("parse");
        let (raw, end) = json_raw().read(1, &spine).expect("read");
        assert_eq!(raw, vec![Array(2), Number(1.0), Number(2.0)]);
        assert_eq!(end, 4);
        assert_eq!(json_raw().encode(raw.clone()).expect("encode"), raw);
    }

    #[test]
    fn deep_nesting_is_an_error_not_an_overflow() {
        let mut deep = vec![Array(1); 10_000];
        deep.push(Null);
        assert!(matches!(
            json_any().decode(&deep),
            Err(CodecError::DepthLimit { limit: MAX_DEPTH, .. })
        ));
        assert!(value_from_spine(&deep).is_err());
        // Skipping a subtree does not build values.
        assert_eq!(subtree_end(&deep, 0).expect("end"), deep.len());

        let mut limit = vec![Array(1); MAX_DEPTH];
        limit.push(Null);
        let value = value_from_spine(&limit).expect("decode");
        assert_eq!(spine_from_value(&value), limit);
    }

    #[test]
    fn flattening_deep_values_is_iterative() {
        let mut value = Value::Null;
        for _ in 0..10_000 {
            value = Value::Array(vec![value]);
        }
        let spine = spine_from_value(&value);
        assert_eq!(spine.len(), 10_001);
        assert_eq!(spine[9_999], Array(1));
        assert_eq!(spine[10_000], Null);
        // Unwind by hand; the derived drop of a deep `Value` recurses.
        while let Value::Array(mut items) = value {
            value = items.pop().unwrap_or(Value::Null);
        }
    }

    #[test]
    fn bad_text_is_a_json_error() {
        assert!(matches!(parse_spine("{"), Err(CodecError::Json(_))));
    }
}
