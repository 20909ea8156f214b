//! Schema accessors over a JSON spine.
//!
//! Every schema accessor is a [`Json<N>`] whose state is a [`JsonResult`]: a subtree that does
//! not match the schema is kept as a [`JsonError`] carrying the offending tokens, so decoding
//! never loses data and encoding writes the original tokens back. Truncated or otherwise
//! malformed spines are still hard [`CodecError`]s.
//!
//! ```text
//! json_obj((
//!     field("version", json_tuple((json_number(), json_string()))),
//!     field("elements", json_array(json_string())),
//! ))
//! ```

use crate::codec::{Accessor, CodecError, Writer};
use crate::dump::describe_error;
use crate::spine::{
    json_any, number_value, place_tokens, spine_from_value, subtree_end, token_at,
    value_from_spine, Spine, SpineToken,
};
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum JsonErrorKind {
    InvalidType,
    MissingKey(String),
    ExtraKey(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonError {
    /// Tokens found in place of the expected value (for a missing key, the encoded example).
    pub found: Spine,
    pub kind: JsonErrorKind,
}

pub type JsonResult<T> = Result<T, JsonError>;

impl JsonError {
    pub fn invalid_type(found: Spine) -> Self {
        JsonError {
            found,
            kind: JsonErrorKind::InvalidType,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self.kind, JsonErrorKind::MissingKey(_))
    }
}

/// Location inside a JSON document, displayed as `$.elements[1].vv`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath {
    segments: Vec<PathSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PathSegment {
    Key(String),
    Index(usize),
}

impl JsonPath {
    pub fn root() -> Self {
        JsonPath::default()
    }

    pub fn key(&self, key: &str) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Key(key.to_string()));
        next
    }

    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.segments.push(PathSegment::Index(index));
        next
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.segments {
            match segment {
                PathSegment::Key(k) => write!(f, ".{}", k)?,
                PathSegment::Index(i) => write!(f, "[{}]", i)?,
            }
        }
        Ok(())
    }
}

/// Shape-specific half of a schema accessor. [`Json`] adds the error handling shared by all
/// shapes.
pub trait JsonNode {
    type Output: 'static;

    /// Name used in type mismatch messages.
    fn expected(&self) -> &'static str;

    /// Read the subtree at `cursor`, returning the cursor after it even on a type mismatch.
    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<Self::Output>, usize), CodecError>;

    fn write_node(&self, value: Self::Output) -> Result<Spine, CodecError>;

    fn example_value(&self) -> Self::Output;

    fn fill_out_value(&self, value: &Self::Output, path: &JsonPath) -> Result<Value, CodecError>;
}

/// Schema accessor over a JSON spine.
#[derive(Debug, Clone)]
pub struct Json<N>(pub N);

impl<N: JsonNode> Accessor for Json<N> {
    type View = [SpineToken];
    type State = JsonResult<N::Output>;

    fn read(
        &self,
        cursor: usize,
        view: &[SpineToken],
    ) -> Result<(Self::State, usize), CodecError> {
        self.0.read_node(cursor, view)
    }

    fn write(
        &self,
        cursor: usize,
        state: Self::State,
    ) -> Result<(usize, Writer<[SpineToken]>), CodecError> {
        let tokens = self.tokens(state)?;
        Ok((cursor + tokens.len(), place_tokens(cursor, tokens)))
    }

    fn example(&self) -> Self::State {
        Ok(self.0.example_value())
    }
}

impl<N: JsonNode> Json<N> {
    /// Tokens for `state`; an error writes back what was found.
    pub fn tokens(&self, state: JsonResult<N::Output>) -> Result<Spine, CodecError> {
        match state {
            Ok(value) => self.0.write_node(value),
            Err(error) => Ok(error.found),
        }
    }

    /// Error for an absent key or tuple slot.
    pub fn missing(&self, key: &str) -> JsonError {
        let found = self
            .tokens(Ok(self.0.example_value()))
            .unwrap_or_else(|_| vec![SpineToken::Undefined]);
        JsonError {
            found,
            kind: JsonErrorKind::MissingKey(key.to_string()),
        }
    }

    /// Plain JSON for `state`. `None` means absent (a missing key).
    pub fn fill_out(&self, state: &JsonResult<N::Output>) -> Result<Option<Value>, CodecError> {
        self.fill_out_at(state, &JsonPath::root())
    }

    pub fn fill_out_at(
        &self,
        state: &JsonResult<N::Output>,
        path: &JsonPath,
    ) -> Result<Option<Value>, CodecError> {
        match state {
            Ok(value) => self.0.fill_out_value(value, path).map(Some),
            Err(error) => fill_out_error(error, self.0.expected(), path),
        }
    }
}

fn fill_out_error(
    error: &JsonError,
    expected: &str,
    path: &JsonPath,
) -> Result<Option<Value>, CodecError> {
    match &error.kind {
        JsonErrorKind::MissingKey(_) => Ok(None),
        JsonErrorKind::ExtraKey(_) => value_from_spine(&error.found).map(Some),
        JsonErrorKind::InvalidType => Err(CodecError::Schema {
            path: path.to_string(),
            message: describe_error(error, expected),
        }),
    }
}

/// Plain JSON for a decoded schema value; see [`Json::fill_out`].
pub fn fill_out<N: JsonNode>(
    accessor: &Json<N>,
    state: &JsonResult<N::Output>,
) -> Result<Option<Value>, CodecError> {
    accessor.fill_out(state)
}

/// The value of `result`, or a [`CodecError::Schema`] describing the error.
pub fn unwrap<T>(result: JsonResult<T>) -> Result<T, CodecError> {
    result.map_err(|error| CodecError::Schema {
        path: JsonPath::root().to_string(),
        message: describe_error(&error, "value"),
    })
}

fn mismatch<T>(
    spine: &[SpineToken],
    cursor: usize,
) -> Result<(JsonResult<T>, usize), CodecError> {
    let end = subtree_end(spine, cursor)?;
    Ok((Err(JsonError::invalid_type(spine[cursor..end].to_vec())), end))
}

/// Leaf node matching a single token.
pub struct Scalar<T> {
    name: &'static str,
    extract: fn(&SpineToken) -> Option<T>,
    token: fn(T) -> SpineToken,
    example: fn() -> T,
    json: fn(&T) -> Value,
}

impl<T: 'static> JsonNode for Scalar<T> {
    type Output = T;

    fn expected(&self) -> &'static str {
        self.name
    }

    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<T>, usize), CodecError> {
        match (self.extract)(token_at(spine, cursor)?) {
            Some(value) => Ok((Ok(value), cursor + 1)),
            None => mismatch(spine, cursor),
        }
    }

    fn write_node(&self, value: T) -> Result<Spine, CodecError> {
        Ok(vec![(self.token)(value)])
    }

    fn example_value(&self) -> T {
        (self.example)()
    }

    fn fill_out_value(&self, value: &T, _path: &JsonPath) -> Result<Value, CodecError> {
        Ok((self.json)(value))
    }
}

pub fn json_string() -> Json<Scalar<String>> {
    Json(Scalar {
        name: "string",
        extract: |t| match t {
            SpineToken::String(s) => Some(s.clone()),
            _ => None,
        },
        token: SpineToken::String,
        example: String::new,
        json: |s| Value::String(s.clone()),
    })
}

pub fn json_number() -> Json<Scalar<f64>> {
    Json(Scalar {
        name: "number",
        extract: |t| match t {
            SpineToken::Number(n) => Some(*n),
            _ => None,
        },
        token: SpineToken::Number,
        example: || 0.0,
        json: |n| number_value(*n),
    })
}

pub fn json_boolean() -> Json<Scalar<bool>> {
    Json(Scalar {
        name: "boolean",
        extract: |t| match t {
            SpineToken::Boolean(b) => Some(*b),
            _ => None,
        },
        token: SpineToken::Boolean,
        example: || false,
        json: |b| Value::Bool(*b),
    })
}

pub fn json_null() -> Json<Scalar<()>> {
    Json(Scalar {
        name: "null",
        extract: |t| matches!(t, SpineToken::Null).then_some(()),
        token: |()| SpineToken::Null,
        example: || (),
        json: |()| Value::Null,
    })
}

/// Only an `Undefined` token.
///
/// As an object field this always reads as [`JsonErrorKind::MissingKey`], since a declared key
/// holding `Undefined` counts as absent.
pub fn json_undefined() -> Json<Scalar<()>> {
    Json(Scalar {
        name: "undefined",
        extract: |t| matches!(t, SpineToken::Undefined).then_some(()),
        token: |()| SpineToken::Undefined,
        example: || (),
        json: |()| Value::Null,
    })
}

/// Accepts any subtree.
pub struct AnyNode;

pub fn json_value() -> Json<AnyNode> {
    Json(AnyNode)
}

impl JsonNode for AnyNode {
    type Output = Value;

    fn expected(&self) -> &'static str {
        "value"
    }

    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<Value>, usize), CodecError> {
        let (value, end) = json_any().read(cursor, spine)?;
        Ok((Ok(value), end))
    }

    fn write_node(&self, value: Value) -> Result<Spine, CodecError> {
        Ok(spine_from_value(&value))
    }

    fn example_value(&self) -> Value {
        Value::Null
    }

    fn fill_out_value(&self, value: &Value, _path: &JsonPath) -> Result<Value, CodecError> {
        Ok(value.clone())
    }
}

/// Homogeneous array.
pub struct ArrayNode<N> {
    item: Json<N>,
}

pub fn json_array<N: JsonNode>(item: Json<N>) -> Json<ArrayNode<N>> {
    Json(ArrayNode { item })
}

impl<N: JsonNode> JsonNode for ArrayNode<N> {
    type Output = Vec<JsonResult<N::Output>>;

    fn expected(&self) -> &'static str {
        "array"
    }

    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<Self::Output>, usize), CodecError> {
        let n = match token_at(spine, cursor)? {
            SpineToken::Array(n) => *n,
            _ => return mismatch(spine, cursor),
        };
        let mut at = cursor + 1;
        let mut items = Vec::with_capacity(n.min(spine.len() - at));
        for _ in 0..n {
            let (item, next) = self.item.read(at, spine)?;
            items.push(item);
            at = next;
        }
        Ok((Ok(items), at))
    }

    fn write_node(&self, value: Self::Output) -> Result<Spine, CodecError> {
        let mut out = vec![SpineToken::Array(value.len())];
        for item in value {
            out.extend(self.item.tokens(item)?);
        }
        Ok(out)
    }

    fn example_value(&self) -> Self::Output {
        Vec::new()
    }

    fn fill_out_value(&self, value: &Self::Output, path: &JsonPath) -> Result<Value, CodecError> {
        let mut out = Vec::with_capacity(value.len());
        for (i, item) in value.iter().enumerate() {
            let filled = self.item.fill_out_at(item, &path.index(i))?;
            out.push(filled.unwrap_or(Value::Null));
        }
        Ok(Value::Array(out))
    }
}

/// Dict with arbitrary keys and homogeneous values.
pub struct DictNode<N> {
    item: Json<N>,
}

pub fn json_dict<N: JsonNode>(item: Json<N>) -> Json<DictNode<N>> {
    Json(DictNode { item })
}

impl<N: JsonNode> JsonNode for DictNode<N> {
    type Output = Vec<(String, JsonResult<N::Output>)>;

    fn expected(&self) -> &'static str {
        "dict"
    }

    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<Self::Output>, usize), CodecError> {
        let keys = match token_at(spine, cursor)? {
            SpineToken::Dict(keys) => keys,
            _ => return mismatch(spine, cursor),
        };
        let mut at = cursor + 1;
        let mut entries = Vec::with_capacity(keys.len());
        for key in keys {
            let (item, next) = self.item.read(at, spine)?;
            entries.push((key.clone(), item));
            at = next;
        }
        Ok((Ok(entries), at))
    }

    fn write_node(&self, value: Self::Output) -> Result<Spine, CodecError> {
        let keys = value.iter().map(|(k, _)| k.clone()).collect();
        let mut out = vec![SpineToken::Dict(keys)];
        for (_, item) in value {
            out.extend(self.item.tokens(item)?);
        }
        Ok(out)
    }

    fn example_value(&self) -> Self::Output {
        Vec::new()
    }

    fn fill_out_value(&self, value: &Self::Output, path: &JsonPath) -> Result<Value, CodecError> {
        let mut map = Map::new();
        for (key, item) in value {
            if let Some(filled) = self.item.fill_out_at(item, &path.key(key))? {
                map.insert(key.clone(), filled);
            }
        }
        Ok(Value::Object(map))
    }
}

/// A dict entry located in the spine.
pub struct Entry {
    pub key: String,
    pub start: usize,
    pub end: usize,
}

/// Entries of one dict with the first position of each key.
pub struct Entries {
    list: Vec<Entry>,
    first: HashMap<String, usize>,
}

impl Entries {
    fn locate(
        keys: &[String],
        spine: &[SpineToken],
        cursor: usize,
    ) -> Result<(Self, usize), CodecError> {
        let mut at = cursor;
        let mut list = Vec::with_capacity(keys.len());
        let mut first = HashMap::with_capacity(keys.len());
        for (i, key) in keys.iter().enumerate() {
            let end = subtree_end(spine, at)?;
            first.entry(key.clone()).or_insert(i);
            list.push(Entry {
                key: key.clone(),
                start: at,
                end,
            });
            at = end;
        }
        Ok((Entries { list, first }, at))
    }

    /// First entry named `key`.
    pub fn get(&self, key: &str) -> Option<&Entry> {
        self.first.get(key).map(|&i| &self.list[i])
    }

    pub fn is_first(&self, index: usize) -> bool {
        self.list
            .get(index)
            .and_then(|e| self.first.get(&e.key))
            .is_some_and(|&i| i == index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entry> {
        self.list.iter()
    }
}

/// Declared object field.
pub struct Field<N> {
    key: String,
    node: Json<N>,
}

pub fn field<N: JsonNode>(key: &str, node: Json<N>) -> Field<N> {
    Field {
        key: key.to_string(),
        node,
    }
}

impl<N: JsonNode> Field<N> {
    pub fn key(&self) -> &str {
        &self.key
    }

    fn read_from(
        &self,
        entries: &Entries,
        spine: &[SpineToken],
    ) -> Result<JsonResult<N::Output>, CodecError> {
        match entries.get(&self.key) {
            Some(entry) if spine.get(entry.start) != Some(&SpineToken::Undefined) => {
                Ok(self.node.read(entry.start, spine)?.0)
            }
            _ => Ok(Err(self.node.missing(&self.key))),
        }
    }

    fn write_into(
        &self,
        value: JsonResult<N::Output>,
        keys: &mut Vec<String>,
        body: &mut Spine,
    ) -> Result<(), CodecError> {
        if matches!(&value, Err(e) if e.is_missing()) {
            return Ok(());
        }
        keys.push(self.key.clone());
        body.extend(self.node.tokens(value)?);
        Ok(())
    }

    fn fill_out_into(
        &self,
        value: &JsonResult<N::Output>,
        path: &JsonPath,
        map: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        if let Some(filled) = self.node.fill_out_at(value, &path.key(&self.key))? {
            map.insert(self.key.clone(), filled);
        }
        Ok(())
    }
}

/// Tuple of [`Field`]s describing an object.
pub trait Fields {
    type Values: 'static;

    fn keys(&self) -> Vec<&str>;

    fn read_fields(
        &self,
        entries: &Entries,
        spine: &[SpineToken],
    ) -> Result<Self::Values, CodecError>;

    fn write_fields(
        &self,
        values: Self::Values,
        keys: &mut Vec<String>,
        body: &mut Spine,
    ) -> Result<(), CodecError>;

    fn example_values(&self) -> Self::Values;

    fn fill_out_fields(
        &self,
        values: &Self::Values,
        path: &JsonPath,
        map: &mut Map<String, Value>,
    ) -> Result<(), CodecError>;
}

impl Fields for () {
    type Values = ();

    fn keys(&self) -> Vec<&str> {
        Vec::new()
    }

    fn read_fields(&self, _: &Entries, _: &[SpineToken]) -> Result<(), CodecError> {
        Ok(())
    }

    fn write_fields(&self, _: (), _: &mut Vec<String>, _: &mut Spine) -> Result<(), CodecError> {
        Ok(())
    }

    fn example_values(&self) {}

    fn fill_out_fields(
        &self,
        _: &(),
        _: &JsonPath,
        _: &mut Map<String, Value>,
    ) -> Result<(), CodecError> {
        Ok(())
    }
}

macro_rules! fields_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: JsonNode),+> Fields for ($(Field<$name>,)+) {
            type Values = ($(JsonResult<$name::Output>,)+);

            fn keys(&self) -> Vec<&str> {
                vec![$(self.$idx.key()),+]
            }

            fn read_fields(
                &self,
                entries: &Entries,
                spine: &[SpineToken],
            ) -> Result<Self::Values, CodecError> {
                Ok(($(self.$idx.read_from(entries, spine)?,)+))
            }

            fn write_fields(
                &self,
                values: Self::Values,
                keys: &mut Vec<String>,
                body: &mut Spine,
            ) -> Result<(), CodecError> {
                $(self.$idx.write_into(values.$idx, keys, body)?;)+
                Ok(())
            }

            fn example_values(&self) -> Self::Values {
                ($(Ok(self.$idx.node.0.example_value()),)+)
            }

            fn fill_out_fields(
                &self,
                values: &Self::Values,
                path: &JsonPath,
                map: &mut Map<String, Value>,
            ) -> Result<(), CodecError> {
                $(self.$idx.fill_out_into(&values.$idx, path, map)?;)+
                Ok(())
            }
        }
    };
}

fields_tuple!(A 0);
fields_tuple!(A 0, B 1);
fields_tuple!(A 0, B 1, C 2);
fields_tuple!(A 0, B 1, C 2, D 3);
fields_tuple!(A 0, B 1, C 2, D 3, E 4);
fields_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);
fields_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6);
fields_tuple!(A 0, B 1, C 2, D 3, E 4, F 5, G 6, H 7);

/// Decoded object: declared fields in declaration order, then undeclared keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Obj<S> {
    pub fields: S,
    /// [`JsonErrorKind::ExtraKey`] errors in input order.
    pub extra: Vec<JsonError>,
}

pub struct ObjNode<F> {
    fields: F,
}

pub fn json_obj<F: Fields>(fields: F) -> Json<ObjNode<F>> {
    Json(ObjNode { fields })
}

impl<F: Fields> JsonNode for ObjNode<F> {
    type Output = Obj<F::Values>;

    fn expected(&self) -> &'static str {
        "object"
    }

    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<Self::Output>, usize), CodecError> {
        let keys = match token_at(spine, cursor)? {
            SpineToken::Dict(keys) => keys,
            _ => return mismatch(spine, cursor),
        };
        let (entries, end) = Entries::locate(keys, spine, cursor + 1)?;
        let fields = self.fields.read_fields(&entries, spine)?;
        let declared: HashSet<&str> = self.fields.keys().into_iter().collect();
        let mut extra = Vec::new();
        for (i, entry) in entries.iter().enumerate() {
            let first = entries.is_first(i);
            let absent = spine.get(entry.start) == Some(&SpineToken::Undefined);
            if (first && declared.contains(&entry.key.as_str())) || absent {
                continue;
            }
            extra.push(JsonError {
                found: spine[entry.start..entry.end].to_vec(),
                kind: JsonErrorKind::ExtraKey(entry.key.clone()),
            });
        }
        Ok((Ok(Obj { fields, extra }), end))
    }

    fn write_node(&self, value: Self::Output) -> Result<Spine, CodecError> {
        let mut keys = Vec::new();
        let mut body = Vec::new();
        self.fields.write_fields(value.fields, &mut keys, &mut body)?;
        for error in value.extra {
            match error.kind {
                JsonErrorKind::ExtraKey(key) => {
                    keys.push(key);
                    body.extend(error.found);
                }
                JsonErrorKind::MissingKey(_) => {}
                JsonErrorKind::InvalidType => {
                    return Err(CodecError::Schema {
                        path: JsonPath::root().to_string(),
                        message: "extra entry without a key".to_string(),
                    })
                }
            }
        }
        let mut out = vec![SpineToken::Dict(keys)];
        out.extend(body);
        Ok(out)
    }

    fn example_value(&self) -> Self::Output {
        Obj {
            fields: self.fields.example_values(),
            extra: Vec::new(),
        }
    }

    fn fill_out_value(&self, value: &Self::Output, path: &JsonPath) -> Result<Value, CodecError> {
        let mut map = Map::new();
        self.fields.fill_out_fields(&value.fields, path, &mut map)?;
        for error in &value.extra {
            if let JsonErrorKind::ExtraKey(key) = &error.kind {
                if let Some(filled) = fill_out_error(error, "value", &path.key(key))? {
                    map.insert(key.clone(), filled);
                }
            }
        }
        Ok(Value::Object(map))
    }
}

/// Tuple of [`Json`] accessors describing a fixed-length array.
pub trait Items {
    type Values: 'static;

    const ARITY: usize;

    fn read_items(
        &self,
        starts: &[usize],
        spine: &[SpineToken],
    ) -> Result<Self::Values, CodecError>;

    /// Tokens per slot; `None` for a missing slot.
    fn write_items(&self, values: Self::Values) -> Result<Vec<Option<Spine>>, CodecError>;

    fn example_values(&self) -> Self::Values;

    fn fill_out_items(
        &self,
        values: &Self::Values,
        path: &JsonPath,
    ) -> Result<Vec<Option<Value>>, CodecError>;
}

fn slot_tokens<N: JsonNode>(
    item: &Json<N>,
    value: JsonResult<N::Output>,
) -> Result<Option<Spine>, CodecError> {
    match value {
        Err(e) if e.is_missing() => Ok(None),
        value => item.tokens(value).map(Some),
    }
}

macro_rules! items_tuple {
    ($($name:ident $idx:tt),+) => {
        impl<$($name: JsonNode),+> Items for ($(Json<$name>,)+) {
            type Values = ($(JsonResult<$name::Output>,)+);

            const ARITY: usize = [$($idx),+].len();

            fn read_items(
                &self,
                starts: &[usize],
                spine: &[SpineToken],
            ) -> Result<Self::Values, CodecError> {
                Ok(($(
                    match starts.get($idx) {
                        Some(&start) => self.$idx.read(start, spine)?.0,
                        None => Err(self.$idx.missing(stringify!($idx))),
                    },
                )+))
            }

            fn write_items(&self, values: Self::Values) -> Result<Vec<Option<Spine>>, CodecError> {
                Ok(vec![$(slot_tokens(&self.$idx, values.$idx)?),+])
            }

            fn example_values(&self) -> Self::Values {
                ($(self.$idx.example(),)+)
            }

            fn fill_out_items(
                &self,
                values: &Self::Values,
                path: &JsonPath,
            ) -> Result<Vec<Option<Value>>, CodecError> {
                Ok(vec![$(self.$idx.fill_out_at(&values.$idx, &path.index($idx))?),+])
            }
        }
    };
}

items_tuple!(A 0);
items_tuple!(A 0, B 1);
items_tuple!(A 0, B 1, C 2);
items_tuple!(A 0, B 1, C 2, D 3);
items_tuple!(A 0, B 1, C 2, D 3, E 4);
items_tuple!(A 0, B 1, C 2, D 3, E 4, F 5);

/// Decoded fixed-length array: one result per slot, then surplus elements.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuple<S> {
    pub items: S,
    /// [`JsonErrorKind::ExtraKey`] errors keyed by element index.
    pub extra: Vec<JsonError>,
}

pub struct TupleNode<I> {
    items: I,
}

pub fn json_tuple<I: Items>(items: I) -> Json<TupleNode<I>> {
    Json(TupleNode { items })
}

/// Drop trailing absent slots; absent slots before a present one become `fill`.
fn trim_slots<T>(slots: Vec<Option<T>>, fill: impl Fn() -> T) -> Vec<T> {
    let len = slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    slots.into_iter().take(len).map(|s| s.unwrap_or_else(&fill)).collect()
}

impl<I: Items> JsonNode for TupleNode<I> {
    type Output = Tuple<I::Values>;

    fn expected(&self) -> &'static str {
        "tuple"
    }

    fn read_node(
        &self,
        cursor: usize,
        spine: &[SpineToken],
    ) -> Result<(JsonResult<Self::Output>, usize), CodecError> {
        let n = match token_at(spine, cursor)? {
            SpineToken::Array(n) => *n,
            _ => return mismatch(spine, cursor),
        };
        let mut at = cursor + 1;
        let mut starts = Vec::with_capacity(n.min(spine.len() - at));
        for _ in 0..n {
            starts.push(at);
            at = subtree_end(spine, at)?;
        }
        let items = self.items.read_items(&starts, spine)?;
        let mut extra = Vec::new();
        for (i, &start) in starts.iter().enumerate().skip(I::ARITY) {
            let end = subtree_end(spine, start)?;
            extra.push(JsonError {
                found: spine[start..end].to_vec(),
                kind: JsonErrorKind::ExtraKey(i.to_string()),
            });
        }
        Ok((Ok(Tuple { items, extra }), at))
    }

    fn write_node(&self, value: Self::Output) -> Result<Spine, CodecError> {
        let mut slots = self.items.write_items(value.items)?;
        slots.extend(value.extra.into_iter().map(|e| Some(e.found)));
        let slots = trim_slots(slots, || vec![SpineToken::Undefined]);
        let mut out = vec![SpineToken::Array(slots.len())];
        out.extend(slots.into_iter().flatten());
        Ok(out)
    }

    fn example_value(&self) -> Self::Output {
        Tuple {
            items: self.items.example_values(),
            extra: Vec::new(),
        }
    }

    fn fill_out_value(&self, value: &Self::Output, path: &JsonPath) -> Result<Value, CodecError> {
        let mut slots = self.items.fill_out_items(&value.items, path)?;
        for (i, error) in value.extra.iter().enumerate() {
            let index = I::ARITY + i;
            slots.push(fill_out_error(error, "value", &path.index(index))?);
        }
        Ok(Value::Array(trim_slots(slots, || Value::Null)))
    }
}
