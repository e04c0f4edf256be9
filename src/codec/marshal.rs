use super::{Decoder, Encoder};
use crate::constants::{LENGTH_HEADER_SIZE, PRESENCE_SIZE};
use std::collections::BTreeMap;

/// A value that knows how to write itself to an [`Encoder`].
///
/// Records implement this by marshaling each field in declaration order. That
/// order is part of the wire format: reordering fields breaks compatibility
/// with peers built against the old order.
pub trait Marshal {
    fn marshal(&self, enc: &mut Encoder);

    /// Exact number of bytes [`Marshal::marshal`] will write, when it can be
    /// known without encoding.
    ///
    /// Used only to pre-size buffers. `None` means "not predictable"; the
    /// encoder then grows on demand.
    fn size_hint(&self) -> Option<usize> {
        None
    }
}

/// The dual of [`Marshal`].
///
/// Implementations read their fields in the same order they were written and
/// never panic on short input: the decoder hands back zero values once it is
/// in the error state.
pub trait Unmarshal: Sized {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self;
}

impl<T: Marshal + ?Sized> Marshal for &T {
    fn marshal(&self, enc: &mut Encoder) {
        (**self).marshal(enc)
    }

    fn size_hint(&self) -> Option<usize> {
        (**self).size_hint()
    }
}

impl<T: Marshal + ?Sized> Marshal for Box<T> {
    fn marshal(&self, enc: &mut Encoder) {
        (**self).marshal(enc)
    }

    fn size_hint(&self) -> Option<usize> {
        (**self).size_hint()
    }
}

impl<T: Unmarshal> Unmarshal for Box<T> {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        Box::new(T::unmarshal(dec))
    }
}

macro_rules! impl_fixed_width {
    ($($ty:ident),* $(,)?) => {
        $(
            impl Marshal for $ty {
                #[inline]
                fn marshal(&self, enc: &mut Encoder) {
                    enc.$ty(*self)
                }

                #[inline]
                fn size_hint(&self) -> Option<usize> {
                    Some(std::mem::size_of::<$ty>())
                }
            }

            impl Unmarshal for $ty {
                #[inline]
                fn unmarshal(dec: &mut Decoder<'_>) -> Self {
                    dec.$ty()
                }
            }
        )*
    };
}

impl_fixed_width!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);

impl Marshal for str {
    fn marshal(&self, enc: &mut Encoder) {
        enc.string(self)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(LENGTH_HEADER_SIZE + self.len())
    }
}

impl Marshal for String {
    fn marshal(&self, enc: &mut Encoder) {
        enc.string(self)
    }

    fn size_hint(&self) -> Option<usize> {
        Some(LENGTH_HEADER_SIZE + self.len())
    }
}

impl Unmarshal for String {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        dec.string()
    }
}

/// An absent string is written with the nil length, not a presence byte.
impl Marshal for Option<String> {
    fn marshal(&self, enc: &mut Encoder) {
        enc.opt_string(self.as_deref())
    }

    fn size_hint(&self) -> Option<usize> {
        Some(LENGTH_HEADER_SIZE + self.as_ref().map_or(0, String::len))
    }
}

impl Unmarshal for Option<String> {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        dec.opt_string()
    }
}

fn sequence_size_hint<T: Marshal>(items: &[T]) -> Option<usize> {
    items
        .iter()
        .try_fold(LENGTH_HEADER_SIZE, |acc, item| Some(acc + item.size_hint()?))
}

impl<T: Marshal> Marshal for [T] {
    fn marshal(&self, enc: &mut Encoder) {
        enc.sequence(Some(self))
    }

    fn size_hint(&self) -> Option<usize> {
        sequence_size_hint(self)
    }
}

/// A present sequence. Decoding a nil sequence into a `Vec` yields an empty
/// vector; use `Option<Vec<T>>` where nil must be preserved.
impl<T: Marshal> Marshal for Vec<T> {
    fn marshal(&self, enc: &mut Encoder) {
        enc.sequence(Some(self.as_slice()))
    }

    fn size_hint(&self) -> Option<usize> {
        sequence_size_hint(self)
    }
}

impl<T: Unmarshal> Unmarshal for Vec<T> {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        dec.sequence().unwrap_or_default()
    }
}

/// A sequence that may be nil: `None` is written as length `-1`.
impl<T: Marshal> Marshal for Option<Vec<T>> {
    fn marshal(&self, enc: &mut Encoder) {
        enc.sequence(self.as_deref())
    }

    fn size_hint(&self) -> Option<usize> {
        match self {
            Some(items) => sequence_size_hint(items),
            None => Some(LENGTH_HEADER_SIZE),
        }
    }
}

impl<T: Unmarshal> Unmarshal for Option<Vec<T>> {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        dec.sequence()
    }
}

/// Maps are written as a length header followed by key/value pairs in key
/// order, which keeps their encoding deterministic.
impl<K: Marshal, V: Marshal> Marshal for BTreeMap<K, V> {
    fn marshal(&self, enc: &mut Encoder) {
        enc.len_header(self.len());
        for (k, v) in self {
            k.marshal(enc);
            v.marshal(enc);
        }
    }

    fn size_hint(&self) -> Option<usize> {
        self.iter().try_fold(LENGTH_HEADER_SIZE, |acc, (k, v)| {
            Some(acc + k.size_hint()? + v.size_hint()?)
        })
    }
}

impl<K: Unmarshal + Ord, V: Unmarshal> Unmarshal for BTreeMap<K, V> {
    fn unmarshal(dec: &mut Decoder<'_>) -> Self {
        let mut map = BTreeMap::new();
        let n = dec.count_header().unwrap_or(0);
        for _ in 0..n {
            if dec.error().is_some() {
                break;
            }
            let k = K::unmarshal(dec);
            let v = V::unmarshal(dec);
            map.insert(k, v);
        }
        map
    }
}

/// Presence-prefixed optional value, for optional record fields that are not
/// strings or sequences.
pub fn optional_size_hint<T: Marshal>(value: Option<&T>) -> Option<usize> {
    match value {
        Some(v) => Some(PRESENCE_SIZE + v.size_hint()?),
        None => Some(PRESENCE_SIZE),
    }
}

// Argument lists. The empty tuple is a method without arguments and encodes
// to zero bytes.
macro_rules! impl_tuple {
    ($($name:ident $var:ident),*) => {
        impl<$($name: Marshal),*> Marshal for ($($name,)*) {
            #[allow(unused_variables)]
            fn marshal(&self, enc: &mut Encoder) {
                let ($($var,)*) = self;
                $($var.marshal(enc);)*
            }

            fn size_hint(&self) -> Option<usize> {
                let ($($var,)*) = self;
                Some(0 $(+ $var.size_hint()?)*)
            }
        }

        impl<$($name: Unmarshal),*> Unmarshal for ($($name,)*) {
            #[allow(unused_variables)]
            fn unmarshal(dec: &mut Decoder<'_>) -> Self {
                ($($name::unmarshal(dec),)*)
            }
        }
    };
}

impl_tuple!();
impl_tuple!(A a);
impl_tuple!(A a, B b);
impl_tuple!(A a, B b, C c);
impl_tuple!(A a, B b, C c, D d);
impl_tuple!(A a, B b, C c, D d, E e);
impl_tuple!(A a, B b, C c, D d, E e, F f);
