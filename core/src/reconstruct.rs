//! Rebuilds an input tree's value from its decoded basic values.
//!
//! The decoded values arrive in leaf order. Walking the tree in the same
//! order, each basic leaf takes the next value, pairs combine their
//! children and mapped nodes apply their decode mapping, which is the
//! only step that can still fail.

use crate::decode::DecodedValue;
use crate::error::{DecodeFailure, FailingInput, InputKind};
use crate::node::{InputNode, LeafPath};
use crate::params::Params;

/// # Panics
/// If `values` does not hold exactly one value per basic leaf of `node`,
/// in leaf order. Values produced by `decode_basic_inputs` for the same
/// node always do.
pub fn reconstruct(node: &InputNode, values: Vec<DecodedValue>) -> Result<Params, DecodeFailure> {
    let mut values = values.into_iter();
    let params = reconstruct_at(node, &LeafPath::root(), &mut values)?;
    assert!(
        values.next().is_none(),
        "more decoded values than basic inputs in {}",
        node.show()
    );
    Ok(params)
}

fn reconstruct_at<V>(node: &InputNode, path: &LeafPath, values: &mut V) -> Result<Params, DecodeFailure>
where
    V: Iterator<Item = DecodedValue>,
{
    match node {
        InputNode::Basic(basic) => {
            let Some(decoded) = values.next() else {
                panic!("no decoded value left for {} at {path}", basic.describe());
            };
            assert_eq!(&decoded.path, path, "decoded values out of leaf order");
            Ok(decoded.value)
        }
        InputNode::Pair(pair) => {
            let left = reconstruct_at(&pair.left, &path.left(), values)?;
            let right = reconstruct_at(&pair.right, &path.right(), values)?;
            Ok((pair.combine)(left, right))
        }
        InputNode::Mapped(mapped) => {
            let inner = reconstruct_at(&mapped.wrapped, &path.mapped(), values)?;
            (mapped.decode)(inner).map_err(|error| DecodeFailure {
                input: FailingInput {
                    kind: InputKind::Mapped,
                    path: path.clone(),
                    description: mapped.wrapped.show(),
                },
                error,
            })
        }
    }
}
