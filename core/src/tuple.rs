//! Static value shapes for the typed façade over the node tree.
//!
//! Every typed `Input<T>` / `Output<T>` carries a tuple `T`: `()` for nodes
//! that produce nothing, `(A,)` for one value, `(A, B, ..)` for several.
//! `Concat` is the type-level side of a `Pair` node: `(A,)` and `(B, C)`
//! combine into `(A, B, C)`. The runtime side is `Params::concat`, which
//! lines up with this because both keep left-to-right element order.

use std::any::Any;

use crate::params::{downcast_value, AnyValue, Params};

/// A value shape that can cross into and out of `Params`.
pub trait Tuple: Sized + Send + 'static {
    const ARITY: usize;

    fn into_params(self) -> Params;

    /// # Panics
    /// If `params` does not hold exactly `ARITY` values of the right types.
    fn from_params(params: Params) -> Self;
}

/// Flattened tuple produced by `and`-ing a `Self` with a `U`.
pub trait Concat<U: Tuple>: Tuple {
    type Out: Tuple;
}

/// The uninhabited value of an endpoint that has no error output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Void {}

impl Tuple for Void {
    const ARITY: usize = 1;

    fn into_params(self) -> Params {
        match self {}
    }

    fn from_params(_: Params) -> Self {
        panic!("a void value can never be decoded")
    }
}

fn next_value<T: Any>(values: &mut impl Iterator<Item = AnyValue>) -> T {
    match values.next() {
        Some(value) => downcast_value(value),
        None => panic!("params hold fewer values than the tuple arity"),
    }
}

macro_rules! impl_tuple {
    ($arity:expr; $($t:ident),*) => {
        impl<$($t: Any + Send),*> Tuple for ($($t,)*) {
            const ARITY: usize = $arity;

            #[allow(non_snake_case)]
            fn into_params(self) -> Params {
                let ($($t,)*) = self;
                Params::from_values(vec![$(Box::new($t) as AnyValue),*])
            }

            #[allow(unused_mut, unused_variables)]
            fn from_params(params: Params) -> Self {
                let arity = params.arity();
                assert_eq!(arity, $arity, "params arity does not match the tuple arity");
                let mut values = params.into_values().into_iter();
                ($(next_value::<$t>(&mut values),)*)
            }
        }
    };
}

impl_tuple!(0;);
impl_tuple!(1; A1);
impl_tuple!(2; A1, A2);
impl_tuple!(3; A1, A2, A3);
impl_tuple!(4; A1, A2, A3, A4);
impl_tuple!(5; A1, A2, A3, A4, A5);
impl_tuple!(6; A1, A2, A3, A4, A5, A6);
impl_tuple!(7; A1, A2, A3, A4, A5, A6, A7);
impl_tuple!(8; A1, A2, A3, A4, A5, A6, A7, A8);

macro_rules! impl_concat {
    ([$($a:ident),*], [$($b:ident),*]) => {
        impl<$($a: Any + Send,)* $($b: Any + Send,)*> Concat<($($b,)*)> for ($($a,)*) {
            type Out = ($($a,)* $($b,)*);
        }
    };
}

impl_concat!([], []);
impl_concat!([], [B1]);
impl_concat!([], [B1, B2]);
impl_concat!([], [B1, B2, B3]);
impl_concat!([], [B1, B2, B3, B4]);
impl_concat!([], [B1, B2, B3, B4, B5]);
impl_concat!([], [B1, B2, B3, B4, B5, B6]);
impl_concat!([], [B1, B2, B3, B4, B5, B6, B7]);
impl_concat!([], [B1, B2, B3, B4, B5, B6, B7, B8]);
impl_concat!([A1], []);
impl_concat!([A1], [B1]);
impl_concat!([A1], [B1, B2]);
impl_concat!([A1], [B1, B2, B3]);
impl_concat!([A1], [B1, B2, B3, B4]);
impl_concat!([A1], [B1, B2, B3, B4, B5]);
impl_concat!([A1], [B1, B2, B3, B4, B5, B6]);
impl_concat!([A1], [B1, B2, B3, B4, B5, B6, B7]);
impl_concat!([A1, A2], []);
impl_concat!([A1, A2], [B1]);
impl_concat!([A1, A2], [B1, B2]);
impl_concat!([A1, A2], [B1, B2, B3]);
impl_concat!([A1, A2], [B1, B2, B3, B4]);
impl_concat!([A1, A2], [B1, B2, B3, B4, B5]);
impl_concat!([A1, A2], [B1, B2, B3, B4, B5, B6]);
impl_concat!([A1, A2, A3], []);
impl_concat!([A1, A2, A3], [B1]);
impl_concat!([A1, A2, A3], [B1, B2]);
impl_concat!([A1, A2, A3], [B1, B2, B3]);
impl_concat!([A1, A2, A3], [B1, B2, B3, B4]);
impl_concat!([A1, A2, A3], [B1, B2, B3, B4, B5]);
impl_concat!([A1, A2, A3, A4], []);
impl_concat!([A1, A2, A3, A4], [B1]);
impl_concat!([A1, A2, A3, A4], [B1, B2]);
impl_concat!([A1, A2, A3, A4], [B1, B2, B3]);
impl_concat!([A1, A2, A3, A4], [B1, B2, B3, B4]);
impl_concat!([A1, A2, A3, A4, A5], []);
impl_concat!([A1, A2, A3, A4, A5], [B1]);
impl_concat!([A1, A2, A3, A4, A5], [B1, B2]);
impl_concat!([A1, A2, A3, A4, A5], [B1, B2, B3]);
impl_concat!([A1, A2, A3, A4, A5, A6], []);
impl_concat!([A1, A2, A3, A4, A5, A6], [B1]);
impl_concat!([A1, A2, A3, A4, A5, A6], [B1, B2]);
impl_concat!([A1, A2, A3, A4, A5, A6, A7], []);
impl_concat!([A1, A2, A3, A4, A5, A6, A7], [B1]);
impl_concat!([A1, A2, A3, A4, A5, A6, A7, A8], []);

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip<T: Tuple>(value: T) -> T {
        T::from_params(value.into_params())
    }

    #[test]
    fn tuples_round_trip_through_params() {
        assert_eq!(round_trip(()), ());
        assert_eq!(round_trip((42_i64,)), (42,));
        assert_eq!(
            round_trip(("apple".to_string(), 10_i32, true)),
            ("apple".to_string(), 10, true)
        );
    }

    #[test]
    fn single_element_tuple_is_single_params() {
        assert!(matches!((1_u8,).into_params(), Params::Single(_)));
        assert!(matches!(().into_params(), Params::Tuple(ref v) if v.is_empty()));
    }

    #[test]
    fn concatenated_params_decode_as_concat_output() {
        fn concat<A: Concat<B>, B: Tuple>(a: A, b: B) -> A::Out {
            A::Out::from_params(Params::concat(a.into_params(), b.into_params()))
        }
        let out: (String, i32, bool) = concat(("a".to_string(),), (1_i32, true));
        assert_eq!(out, ("a".to_string(), 1, true));
        let out: (i32,) = concat((), (7_i32,));
        assert_eq!(out, (7,));
    }

    #[test]
    #[should_panic(expected = "arity")]
    fn wrong_arity_panics() {
        let _ = <(i32, i32)>::from_params(Params::single(1_i32));
    }
}
