/*!
 * # Operation lists
 *
 * Every document serializes to, and every change is expressed as, an ordered
 * list of ops:
 *
 * - `insert` adds text, a run of atomic units (`"insert": 1` with a `frag`
 *   attribute), or a nested op list describing a structured unit (a table,
 *   its rows, their cells).
 * - `retain` keeps a count of units, optionally changing their attributes,
 *   or carries a nested op list that is applied inside the single
 *   structured unit it retains.
 * - `delete` removes a count of units.
 *
 * A document is a list made only of inserts. Changes compose onto it
 * (`compose`/`apply_to`), invert against the state they were applied to
 * (`invert`), and are produced by comparing two documents (`diff`).
 *
 * ## Module Structure
 *
 * - **`op`**: `Op`, its payloads and the JSON wire shape
 * - **`iter`**: the splitting iterator the algebra walks with
 * - **`algebra`**: compose, invert, slice, apply
 * - **`diff`**: document comparison
 * - **`registry`**: type-tag to constructor tables for blocks and fragments
 * - **`reader`**: op list to block tree
 */

use serde::{Deserialize, Serialize};

pub mod algebra;
pub mod diff;
pub mod iter;
pub mod op;
pub mod reader;
pub mod registry;

pub use op::*;
pub use reader::read_blocks;
pub use registry::*;

use crate::models::attributes::Attributes;

/// Errors from parsing or applying operation lists
#[derive(Debug, thiserror::Error)]
pub enum DeltaError {
    #[error("malformed operation: {0}")]
    Malformed(String),
    #[error("expected a document made only of inserts")]
    NotADocument,
    #[error("change spans {change} units but the document only has {document}")]
    LengthMismatch { change: usize, document: usize },
    #[error("invalid operation list JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// An ordered, normalized list of ops
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Op>", into = "Vec<Op>")]
pub struct Delta {
    ops: Vec<Op>,
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ops(ops: impl IntoIterator<Item = Op>) -> Self {
        let mut delta = Delta::new();
        for op in ops {
            delta.push(op);
        }
        delta
    }

    pub fn from_json(json: &str) -> Result<Self, DeltaError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, DeltaError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Op> {
        self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Sum of all op lengths
    pub fn length(&self) -> usize {
        self.ops.iter().map(Op::len).sum()
    }

    /// Units a change consumes from the document it applies to
    pub fn base_length(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| !op.is_insert())
            .map(Op::len)
            .sum()
    }

    /// True when every op is an insert
    pub fn is_document(&self) -> bool {
        self.ops.iter().all(Op::is_insert)
    }

    pub fn insert(mut self, text: impl Into<String>, attributes: Option<Attributes>) -> Self {
        self.push(Op::Insert {
            value: InsertValue::Text(text.into()),
            attributes,
        });
        self
    }

    pub fn insert_count(mut self, count: usize, attributes: Option<Attributes>) -> Self {
        self.push(Op::Insert {
            value: InsertValue::Count(count),
            attributes,
        });
        self
    }

    pub fn insert_nested(mut self, nested: Delta, attributes: Option<Attributes>) -> Self {
        self.push(Op::Insert {
            value: InsertValue::Nested(nested),
            attributes,
        });
        self
    }

    pub fn retain(mut self, count: usize, attributes: Option<Attributes>) -> Self {
        self.push(Op::Retain {
            value: RetainValue::Count(count),
            attributes,
        });
        self
    }

    pub fn retain_nested(mut self, nested: Delta, attributes: Option<Attributes>) -> Self {
        self.push(Op::Retain {
            value: RetainValue::Nested(nested),
            attributes,
        });
        self
    }

    pub fn delete(mut self, count: usize) -> Self {
        self.push(Op::Delete(count));
        self
    }

    /// Append an op, merging with its neighbour where possible.
    ///
    /// Inserts are placed before a trailing delete so equal changes have one
    /// canonical form.
    pub fn push(&mut self, op: Op) {
        let op = match op {
            Op::Insert { value, attributes } => Op::Insert {
                value,
                attributes: attributes.and_then(Attributes::into_option),
            },
            Op::Retain { value, attributes } => Op::Retain {
                value,
                attributes: attributes.and_then(Attributes::into_option),
            },
            delete => delete,
        };
        if op.is_empty() {
            return;
        }

        if let Some(Op::Delete(count)) = self.ops.last_mut()
            && let Op::Delete(extra) = op
        {
            *count += extra;
            return;
        }

        let mut index = self.ops.len();
        if op.is_insert() && matches!(self.ops.last(), Some(Op::Delete(_))) {
            index -= 1;
        }
        if index > 0 && try_merge(&mut self.ops[index - 1], &op) {
            return;
        }
        self.ops.insert(index, op);
    }

    /// Drop a trailing retain that changes nothing
    pub fn chop(mut self) -> Self {
        if self.ops.last().is_some_and(Op::is_plain_retain) {
            self.ops.pop();
        }
        self
    }

    pub fn concat(mut self, other: Delta) -> Self {
        for op in other.ops {
            self.push(op);
        }
        self
    }
}

fn try_merge(prev: &mut Op, op: &Op) -> bool {
    match (prev, op) {
        (
            Op::Insert {
                value: InsertValue::Text(text),
                attributes: prev_attrs,
            },
            Op::Insert {
                value: InsertValue::Text(more),
                attributes: attrs,
            },
        ) if *prev_attrs == *attrs => {
            text.push_str(more);
            true
        }
        (
            Op::Insert {
                value: InsertValue::Count(count),
                attributes: prev_attrs,
            },
            Op::Insert {
                value: InsertValue::Count(more),
                attributes: attrs,
            },
        )
        | (
            Op::Retain {
                value: RetainValue::Count(count),
                attributes: prev_attrs,
            },
            Op::Retain {
                value: RetainValue::Count(more),
                attributes: attrs,
            },
        ) if *prev_attrs == *attrs => {
            *count += more;
            true
        }
        _ => false,
    }
}

impl From<Vec<Op>> for Delta {
    fn from(ops: Vec<Op>) -> Self {
        Delta::from_ops(ops)
    }
}

impl From<Delta> for Vec<Op> {
    fn from(delta: Delta) -> Self {
        delta.ops
    }
}
