//! Bidirectional accessors: read a state from a view at a cursor, write it back.
//!
//! An [`Accessor`] pairs a `read` with a `write` over the same view type. `write` does not
//! touch any buffer: it returns the cursor the state would end at together with a deferred
//! [`Writer`]. [`Accessor::encode`] runs `write` once as a dry run to learn the exact size,
//! allocates the destination view, then commits the writers. The same combinator tree drives
//! byte buffers (`[u8]`), bit views ([`BitView`](crate::bitview::BitView)) and JSON spines
//! (`[SpineToken]`).
//!
//! ## Combinators
//!
//! | Combinator | State | Width |
//! |------------|-------|-------|
//! | [`Accessor::map`] / [`Accessor::try_map`] | transformed | inner |
//! | [`Accessor::then`] | chosen by the value read first | dependency + continuation |
//! | [`Accessor::repeat`] | `Vec<S>` | count + items |
//! | tuples `(A, B, ..)` | `(A::State, B::State, ..)` | sum |
//! | [`array`] | `Vec<S>`, one accessor per slot | sum |
//! | [`lift`] | constant | zero |
//! | [`with_padding`] | inner, padding dropped | inner + padding |
//! | [`with_default`] | inner, custom example | inner |
//!
//! Named records are tuples mapped into a struct; field order is the declaration order and is
//! not recorded in binary views.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Byte order for multi-byte fields and for bit views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endianness {
    Big,
    #[default]
    Little,
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unexpected EOF: wanted {wanted} at offset {offset}, view holds {len}")]
    UnexpectedEof { offset: usize, wanted: usize, len: usize },
    #[error("Nesting deeper than {limit} at offset {offset}")]
    DepthLimit { offset: usize, limit: usize },
    #[error("Bit range {bit}..{bit}+{width} outside view of {len} bits")]
    BitRange { bit: usize, width: u32, len: usize },
    #[error("Invalid slab, magic header value was {found}, expected {expected}")]
    BadMagic { found: u32, expected: u32 },
    #[error("Invalid slab, unknown version {0}")]
    UnsupportedVersion(u16),
    #[error("Unpacked data remains: cursor {consumed}, expected {expected}")]
    TrailingData { consumed: usize, expected: usize },
    #[error("Length/count mismatch: {0}")]
    LengthMismatch(String),
    #[error("Lifted constant mismatch: expected {expected}, got {found}")]
    LiftMismatch { expected: String, found: String },
    #[error("Value out of range: {0}")]
    ValueOutOfRange(String),
    #[error("Invalid UUID: {0}")]
    InvalidUuid(String),
    #[error("Could not decompress: {0}")]
    Decompress(String),
    #[error("Could not decode slab: {0}")]
    Slab(#[source] Box<CodecError>),
    #[error("Schema error at {path}: {message}")]
    Schema { path: String, message: String },
}

/// Deferred commit of a planned write.
pub type Writer<V> = Box<dyn FnOnce(&mut V) -> Result<(), CodecError>>;

/// A view that [`Accessor::encode`] can allocate at an exact size.
pub trait View: 'static {
    type Owned;

    /// Allocate an owned view holding `len` cursor units.
    fn allocate(len: usize) -> Self::Owned;

    fn view_mut(owned: &mut Self::Owned) -> &mut Self;
}

impl View for [u8] {
    type Owned = Vec<u8>;

    fn allocate(len: usize) -> Vec<u8> {
        vec![0u8; len]
    }

    fn view_mut(owned: &mut Vec<u8>) -> &mut [u8] {
        owned.as_mut_slice()
    }
}

/// Fail with [`CodecError::UnexpectedEof`] unless `offset + wanted <= len`.
pub fn check_bounds(offset: usize, wanted: usize, len: usize) -> Result<(), CodecError> {
    match offset.checked_add(wanted) {
        Some(end) if end <= len => Ok(()),
        _ => Err(CodecError::UnexpectedEof { offset, wanted, len }),
    }
}

/// Writer that does nothing (zero-width accessors).
pub fn noop_writer<V: ?Sized + 'static>() -> Writer<V> {
    Box::new(|_| Ok(()))
}

/// Run writers in order.
pub fn chain_writers<V: ?Sized + 'static>(writers: Vec<Writer<V>>) -> Writer<V> {
    Box::new(move |view: &mut V| {
        for w in writers {
            w(view)?;
        }
        Ok(())
    })
}

/// Bidirectional read/write/describe unit over [`Accessor::View`].
pub trait Accessor {
    type View: ?Sized + 'static;
    type State: 'static;

    /// Read a state at `cursor`; returns the state and the cursor after it.
    fn read(&self, cursor: usize, view: &Self::View) -> Result<(Self::State, usize), CodecError>;

    /// Plan writing `state` at `cursor`; returns the end cursor and the deferred writer.
    fn write(
        &self,
        cursor: usize,
        state: Self::State,
    ) -> Result<(usize, Writer<Self::View>), CodecError>;

    /// Default/example value describing the expected shape.
    fn example(&self) -> Self::State;

    /// Read from the start of `view`, ignoring what follows.
    fn decode(&self, view: &Self::View) -> Result<Self::State, CodecError> {
        Ok(self.read(0, view)?.0)
    }

    /// Read from the start of `view` and require the cursor to land on `expected_len`.
    fn decode_exact(
        &self,
        view: &Self::View,
        expected_len: usize,
    ) -> Result<Self::State, CodecError> {
        let (state, consumed) = self.read(0, view)?;
        if consumed != expected_len {
            return Err(CodecError::TrailingData {
                consumed,
                expected: expected_len,
            });
        }
        Ok(state)
    }

    /// Size the output with a dry-run write, allocate it once, then commit.
    fn encode(&self, state: Self::State) -> Result<<Self::View as View>::Owned, CodecError>
    where
        Self::View: View,
    {
        let (len, writer) = self.write(0, state)?;
        let mut owned = <Self::View as View>::allocate(len);
        writer(<Self::View as View>::view_mut(&mut owned))?;
        Ok(owned)
    }

    fn map<R, F, G>(self, forward: F, backward: G) -> Map<Self, F, G, R>
    where
        Self: Sized,
        F: Fn(Self::State) -> R,
        G: Fn(R) -> Self::State,
    {
        Map {
            inner: self,
            forward,
            backward,
            _out: PhantomData,
        }
    }

    /// Like [`map`](Accessor::map), with a backward direction that may reject a value.
    fn try_map<R, F, G>(self, forward: F, backward: G) -> TryMap<Self, F, G, R>
    where
        Self: Sized,
        F: Fn(Self::State) -> R,
        G: Fn(R) -> Result<Self::State, CodecError>,
    {
        TryMap {
            inner: self,
            forward,
            backward,
            _out: PhantomData,
        }
    }

    /// Sequence a continuation whose shape depends on the value read by `self`.
    ///
    /// On write, `backward` recovers the dependency from the produced value; it is written
    /// first and handed to `forward` to rebuild the same continuation. The example is
    /// computed here, so a `forward` that rejects the dependency's example fails construction.
    fn then<B, F, G>(
        self,
        forward: F,
        backward: G,
    ) -> Result<Then<Self, F, G, B, B::State>, CodecError>
    where
        Self: Sized,
        B: Accessor<View = Self::View>,
        B::State: Clone,
        F: Fn(&Self::State) -> Result<B, CodecError>,
        G: Fn(&B::State) -> Self::State,
    {
        let example = forward(&self.example())?.example();
        Ok(Then {
            inner: self,
            forward,
            backward,
            example,
            _next: PhantomData,
        })
    }

    /// Length-prefixed sequence: the count is read (and written) through `count`.
    fn repeat<C>(self, count: C) -> Repeat<Self, C>
    where
        Self: Sized,
        C: Accessor<View = Self::View, State = usize>,
    {
        Repeat { item: self, count }
    }

    fn boxed(self) -> BoxedAccessor<Self::View, Self::State>
    where
        Self: Sized + 'static,
    {
        Box::new(self)
    }
}

pub type BoxedAccessor<V, S> = Box<dyn Accessor<View = V, State = S>>;

impl<A: Accessor + ?Sized> Accessor for Box<A> {
    type View = A::View;
    type State = A::State;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(A::State, usize), CodecError> {
        (**self).read(cursor, view)
    }

    fn write(
        &self,
        cursor: usize,
        state: A::State,
    ) -> Result<(usize, Writer<A::View>), CodecError> {
        (**self).write(cursor, state)
    }

    fn example(&self) -> A::State {
        (**self).example()
    }
}

impl<A: Accessor + ?Sized> Accessor for Arc<A> {
    type View = A::View;
    type State = A::State;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(A::State, usize), CodecError> {
        (**self).read(cursor, view)
    }

    fn write(
        &self,
        cursor: usize,
        state: A::State,
    ) -> Result<(usize, Writer<A::View>), CodecError> {
        (**self).write(cursor, state)
    }

    fn example(&self) -> A::State {
        (**self).example()
    }
}

pub struct Map<A, F, G, R> {
    inner: A,
    forward: F,
    backward: G,
    _out: PhantomData<fn() -> R>,
}

impl<A, F, G, R> Accessor for Map<A, F, G, R>
where
    A: Accessor,
    F: Fn(A::State) -> R,
    G: Fn(R) -> A::State,
    R: 'static,
{
    type View = A::View;
    type State = R;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(R, usize), CodecError> {
        let (state, cursor) = self.inner.read(cursor, view)?;
        Ok(((self.forward)(state), cursor))
    }

    fn write(&self, cursor: usize, state: R) -> Result<(usize, Writer<A::View>), CodecError> {
        self.inner.write(cursor, (self.backward)(state))
    }

    fn example(&self) -> R {
        (self.forward)(self.inner.example())
    }
}

pub struct TryMap<A, F, G, R> {
    inner: A,
    forward: F,
    backward: G,
    _out: PhantomData<fn() -> R>,
}

impl<A, F, G, R> Accessor for TryMap<A, F, G, R>
where
    A: Accessor,
    F: Fn(A::State) -> R,
    G: Fn(R) -> Result<A::State, CodecError>,
    R: 'static,
{
    type View = A::View;
    type State = R;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(R, usize), CodecError> {
        let (state, cursor) = self.inner.read(cursor, view)?;
        Ok(((self.forward)(state), cursor))
    }

    fn write(&self, cursor: usize, state: R) -> Result<(usize, Writer<A::View>), CodecError> {
        self.inner.write(cursor, (self.backward)(state)?)
    }

    fn example(&self) -> R {
        (self.forward)(self.inner.example())
    }
}

pub struct Then<A, F, G, B, R> {
    inner: A,
    forward: F,
    backward: G,
    example: R,
    _next: PhantomData<fn() -> B>,
}

impl<A, F, G, B, R> Accessor for Then<A, F, G, B, R>
where
    A: Accessor,
    B: Accessor<View = A::View, State = R>,
    R: Clone + 'static,
    F: Fn(&A::State) -> Result<B, CodecError>,
    G: Fn(&R) -> A::State,
{
    type View = A::View;
    type State = R;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(R, usize), CodecError> {
        let (dependency, cursor) = self.inner.read(cursor, view)?;
        (self.forward)(&dependency)?.read(cursor, view)
    }

    fn write(&self, cursor: usize, state: R) -> Result<(usize, Writer<A::View>), CodecError> {
        let dependency = (self.backward)(&state);
        let next = (self.forward)(&dependency)?;
        let (cursor, head) = self.inner.write(cursor, dependency)?;
        let (cursor, tail) = next.write(cursor, state)?;
        Ok((cursor, chain_writers(vec![head, tail])))
    }

    fn example(&self) -> R {
        self.example.clone()
    }
}

pub struct Repeat<A, C> {
    item: A,
    count: C,
}

impl<A, C> Accessor for Repeat<A, C>
where
    A: Accessor,
    C: Accessor<View = A::View, State = usize>,
{
    type View = A::View;
    type State = Vec<A::State>;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(Self::State, usize), CodecError> {
        let (n, mut cursor) = self.count.read(cursor, view)?;
        // A corrupt count must not drive a huge allocation before the first EOF.
        let mut items = Vec::with_capacity(n.min(1024));
        for _ in 0..n {
            let (item, next) = self.item.read(cursor, view)?;
            items.push(item);
            cursor = next;
        }
        Ok((items, cursor))
    }

    fn write(
        &self,
        cursor: usize,
        state: Self::State,
    ) -> Result<(usize, Writer<A::View>), CodecError> {
        let (mut cursor, head) = self.count.write(cursor, state.len())?;
        let mut writers = Vec::with_capacity(state.len() + 1);
        writers.push(head);
        for item in state {
            let (next, w) = self.item.write(cursor, item)?;
            writers.push(w);
            cursor = next;
        }
        Ok((cursor, chain_writers(writers)))
    }

    fn example(&self) -> Self::State {
        Vec::new()
    }
}

macro_rules! tuple_accessor {
    ($first:ident 0 $(, $name:ident $idx:tt)*) => {
        impl<$first: Accessor, $($name: Accessor<View = $first::View>),*> Accessor for ($first, $($name,)*) {
            type View = $first::View;
            type State = ($first::State, $($name::State,)*);

            fn read(&self, cursor: usize, view: &Self::View) -> Result<(Self::State, usize), CodecError> {
                #[allow(unused_mut)]
                let (head, mut cursor) = self.0.read(cursor, view)?;
                let state = (head, $({
                    let (s, next) = self.$idx.read(cursor, view)?;
                    cursor = next;
                    s
                },)*);
                Ok((state, cursor))
            }

            fn write(
                &self,
                cursor: usize,
                state: Self::State,
            ) -> Result<(usize, Writer<Self::View>), CodecError> {
                let (cursor, head) = self.0.write(cursor, state.0)?;
                #[allow(unused_mut)]
                let mut cursor = cursor;
                #[allow(unused_mut)]
                let mut writers: Vec<Writer<Self::View>> = vec![head];
                $(
                    let (next, w) = self.$idx.write(cursor, state.$idx)?;
                    cursor = next;
                    writers.push(w);
                )*
                Ok((cursor, chain_writers(writers)))
            }

            fn example(&self) -> Self::State {
                (self.0.example(), $(self.$idx.example(),)*)
            }
        }
    };
}

tuple_accessor!(A 0);
tuple_accessor!(A 0, B 1);
tuple_accessor!(A 0, B 1, C 2);
tuple_accessor!(A 0, B 1, C 2, D 3);
tuple_accessor!(A 0, B 1, C 2, D 3, E 4);
tuple_accessor!(A 0, B 1, C 2, D 3, E 4, F 5);

/// Fixed list of accessors read in order, one state per accessor.
pub struct Array<A> {
    items: Vec<A>,
}

pub fn array<A: Accessor>(items: Vec<A>) -> Array<A> {
    Array { items }
}

impl<A: Accessor> Accessor for Array<A> {
    type View = A::View;
    type State = Vec<A::State>;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(Self::State, usize), CodecError> {
        let mut cursor = cursor;
        let mut out = Vec::with_capacity(self.items.len());
        for item in &self.items {
            let (s, next) = item.read(cursor, view)?;
            out.push(s);
            cursor = next;
        }
        Ok((out, cursor))
    }

    fn write(
        &self,
        cursor: usize,
        state: Self::State,
    ) -> Result<(usize, Writer<A::View>), CodecError> {
        if state.len() != self.items.len() {
            return Err(CodecError::LengthMismatch(format!(
                "array of {} accessors given {} values",
                self.items.len(),
                state.len()
            )));
        }
        let mut cursor = cursor;
        let mut writers = Vec::with_capacity(state.len());
        for (item, s) in self.items.iter().zip(state) {
            let (next, w) = item.write(cursor, s)?;
            writers.push(w);
            cursor = next;
        }
        Ok((cursor, chain_writers(writers)))
    }

    fn example(&self) -> Self::State {
        self.items.iter().map(Accessor::example).collect()
    }
}

/// Zero-width constant. Writing anything but the constant is a [`CodecError::LiftMismatch`].
pub struct Lift<T, V: ?Sized> {
    value: T,
    _view: PhantomData<fn() -> Box<V>>,
}

pub fn lift<V, T>(value: T) -> Lift<T, V>
where
    V: ?Sized + 'static,
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    Lift {
        value,
        _view: PhantomData,
    }
}

impl<T, V> Accessor for Lift<T, V>
where
    V: ?Sized + 'static,
    T: Clone + PartialEq + fmt::Debug + 'static,
{
    type View = V;
    type State = T;

    fn read(&self, cursor: usize, _view: &V) -> Result<(T, usize), CodecError> {
        Ok((self.value.clone(), cursor))
    }

    fn write(&self, cursor: usize, state: T) -> Result<(usize, Writer<V>), CodecError> {
        if state != self.value {
            return Err(CodecError::LiftMismatch {
                expected: format!("{:?}", self.value),
                found: format!("{:?}", state),
            });
        }
        Ok((cursor, noop_writer()))
    }

    fn example(&self) -> T {
        self.value.clone()
    }
}

/// `inner` followed by `padding`; the padding value is dropped on read and its example is
/// written back.
pub struct WithPadding<A, P> {
    inner: A,
    padding: P,
}

pub fn with_padding<A, P>(inner: A, padding: P) -> WithPadding<A, P>
where
    A: Accessor,
    P: Accessor<View = A::View>,
{
    WithPadding { inner, padding }
}

impl<A, P> Accessor for WithPadding<A, P>
where
    A: Accessor,
    P: Accessor<View = A::View>,
{
    type View = A::View;
    type State = A::State;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(A::State, usize), CodecError> {
        let (state, cursor) = self.inner.read(cursor, view)?;
        let (_, cursor) = self.padding.read(cursor, view)?;
        Ok((state, cursor))
    }

    fn write(
        &self,
        cursor: usize,
        state: A::State,
    ) -> Result<(usize, Writer<A::View>), CodecError> {
        let (cursor, head) = self.inner.write(cursor, state)?;
        let (cursor, tail) = self.padding.write(cursor, self.padding.example())?;
        Ok((cursor, chain_writers(vec![head, tail])))
    }

    fn example(&self) -> A::State {
        self.inner.example()
    }
}

/// Replace the example of `inner`.
pub struct WithDefault<A, S> {
    inner: A,
    example: S,
}

pub fn with_default<A>(inner: A, example: A::State) -> WithDefault<A, A::State>
where
    A: Accessor,
    A::State: Clone,
{
    WithDefault { inner, example }
}

impl<A, S> Accessor for WithDefault<A, S>
where
    A: Accessor<State = S>,
    S: Clone + 'static,
{
    type View = A::View;
    type State = S;

    fn read(&self, cursor: usize, view: &A::View) -> Result<(S, usize), CodecError> {
        self.inner.read(cursor, view)
    }

    fn write(&self, cursor: usize, state: S) -> Result<(usize, Writer<A::View>), CodecError> {
        self.inner.write(cursor, state)
    }

    fn example(&self) -> S {
        self.example.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One byte at the cursor, enough to exercise the combinators without `numeric`.
    struct Byte;

    impl Accessor for Byte {
        type View = [u8];
        type State = u8;

        fn read(&self, cursor: usize, view: &[u8]) -> Result<(u8, usize), CodecError> {
            check_bounds(cursor, 1, view.len())?;
            Ok((view[cursor], cursor + 1))
        }

        fn write(&self, cursor: usize, state: u8) -> Result<(usize, Writer<[u8]>), CodecError> {
            Ok((
                cursor + 1,
                Box::new(move |view: &mut [u8]| {
                    check_bounds(cursor, 1, view.len())?;
                    view[cursor] = state;
                    Ok(())
                }),
            ))
        }

        fn example(&self) -> u8 {
            0
        }
    }

    fn count() -> impl Accessor<View = [u8], State = usize> {
        Byte.map(|n| n as usize, |n: usize| n as u8)
    }

    #[test]
    fn encode_sizes_buffer_exactly() {
        let acc = (Byte, Byte, Byte);
        let out = acc.encode((1, 2, 3)).expect("encode");
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn repeat_writes_count_first() {
        let acc = Byte.repeat(count());
        let out = acc.encode(vec![7, 8]).expect("encode");
        assert_eq!(out, vec![2, 7, 8]);
        assert_eq!(acc.decode_exact(&out, 3).expect("decode"), vec![7, 8]);
    }

    #[test]
    fn decode_exact_rejects_trailing_bytes() {
        let err = Byte.decode_exact(&[1, 2], 2).unwrap_err();
        assert!(matches!(err, CodecError::TrailingData { consumed: 1, expected: 2 }));
    }

    #[test]
    fn check_bounds_detects_overflow() {
        assert!(check_bounds(usize::MAX, 2, 10).is_err());
        assert!(check_bounds(8, 2, 10).is_ok());
        assert!(check_bounds(9, 2, 10).is_err());
    }

    #[test]
    fn with_padding_writes_padding_example() {
        let acc = with_padding(Byte, with_default(Byte, 0xAAu8));
        assert_eq!(acc.encode(5).expect("encode"), vec![5, 0xAA]);
        assert_eq!(acc.decode(&[5, 0x11]).expect("decode"), 5);
    }
}
