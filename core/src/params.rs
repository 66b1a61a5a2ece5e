//! Runtime value container threaded through the node tree.
//!
//! # Design
//! Nodes are stored without their value types, so values travel between
//! them boxed as `dyn Any`. A node of arity 1 always holds `Single`; every
//! other arity (including 0) holds `Tuple`. `concat` and `split_at` are the
//! combine/split pair used by every `Pair` node and are exact inverses.
//!
//! Downcasting to the wrong type, or splitting at an arity the value does
//! not have, means the tree and the data driving it disagree. That is an
//! engine bug, so those paths panic instead of returning an error.

use std::any::{type_name, Any};
use std::fmt;

/// One type-erased value.
pub type AnyValue = Box<dyn Any + Send>;

pub enum Params {
    Single(AnyValue),
    Tuple(Vec<AnyValue>),
}

impl Params {
    /// The empty tuple, carried by leaves that produce no value.
    pub fn unit() -> Self {
        Params::Tuple(Vec::new())
    }

    pub fn single<T: Any + Send>(value: T) -> Self {
        Params::Single(Box::new(value))
    }

    /// Normalizes a list of values: one value becomes `Single`.
    pub fn from_values(mut values: Vec<AnyValue>) -> Self {
        if values.len() == 1 {
            if let Some(value) = values.pop() {
                return Params::Single(value);
            }
        }
        Params::Tuple(values)
    }

    pub fn into_values(self) -> Vec<AnyValue> {
        match self {
            Params::Single(value) => vec![value],
            Params::Tuple(values) => values,
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Params::Single(_) => 1,
            Params::Tuple(values) => values.len(),
        }
    }

    /// Combine: the left values followed by the right values.
    pub fn concat(left: Params, right: Params) -> Params {
        let mut values = left.into_values();
        values.extend(right.into_values());
        Params::from_values(values)
    }

    /// Split: the first `left_arity` values go left, the rest go right.
    ///
    /// # Panics
    /// If the value holds fewer than `left_arity` values.
    pub fn split_at(self, left_arity: usize) -> (Params, Params) {
        let mut values = self.into_values();
        assert!(
            values.len() >= left_arity,
            "cannot split {} values at {left_arity}",
            values.len()
        );
        let right = values.split_off(left_arity);
        (Params::from_values(values), Params::from_values(right))
    }

    /// Takes the value out of a `Single`.
    ///
    /// # Panics
    /// If this is not a `Single` holding a `T`.
    pub fn downcast<T: Any>(self) -> T {
        match self {
            Params::Single(value) => downcast_value(value),
            Params::Tuple(values) => panic!(
                "expected a single `{}`, found a tuple of {} values",
                type_name::<T>(),
                values.len()
            ),
        }
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        match self {
            Params::Single(value) => value.downcast_ref::<T>(),
            Params::Tuple(_) => None,
        }
    }
}

/// # Panics
/// If `value` does not hold a `T`.
pub(crate) fn downcast_value<T: Any>(value: AnyValue) -> T {
    match value.downcast::<T>() {
        Ok(value) => *value,
        Err(_) => panic!("params value is not a `{}`", type_name::<T>()),
    }
}

impl fmt::Debug for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Params::Single(_) => f.write_str("Params::Single(..)"),
            Params::Tuple(values) => write!(f, "Params::Tuple({} values)", values.len()),
        }
    }
}
