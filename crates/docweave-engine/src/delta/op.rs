use serde::{Deserialize, Serialize};

use crate::delta::{Delta, DeltaError};
use crate::models::attributes::Attributes;

/// Payload of an insert
#[derive(Debug, Clone, PartialEq)]
pub enum InsertValue {
    Text(String),
    /// A run of atomic units (embeds, paragraph ends)
    Count(usize),
    /// A structured unit (table, row, cell) described by its own ops
    Nested(Delta),
}

/// Payload of a retain
#[derive(Debug, Clone, PartialEq)]
pub enum RetainValue {
    Count(usize),
    /// A change applied inside the single structured unit being retained
    Nested(Delta),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Insert,
    Retain,
    Delete,
}

/// One entry of an operation list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "WireOp", into = "WireOp")]
pub enum Op {
    Insert {
        value: InsertValue,
        attributes: Option<Attributes>,
    },
    Retain {
        value: RetainValue,
        attributes: Option<Attributes>,
    },
    Delete(usize),
}

impl Op {
    pub fn kind(&self) -> OpKind {
        match self {
            Op::Insert { .. } => OpKind::Insert,
            Op::Retain { .. } => OpKind::Retain,
            Op::Delete(_) => OpKind::Delete,
        }
    }

    /// Length in document units
    pub fn len(&self) -> usize {
        match self {
            Op::Insert { value, .. } => match value {
                InsertValue::Text(text) => text.chars().count(),
                InsertValue::Count(count) => *count,
                InsertValue::Nested(_) => 1,
            },
            Op::Retain { value, .. } => match value {
                RetainValue::Count(count) => *count,
                RetainValue::Nested(_) => 1,
            },
            Op::Delete(count) => *count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn attributes(&self) -> Option<&Attributes> {
        match self {
            Op::Insert { attributes, .. } | Op::Retain { attributes, .. } => attributes.as_ref(),
            Op::Delete(_) => None,
        }
    }

    pub fn is_insert(&self) -> bool {
        matches!(self, Op::Insert { .. })
    }

    /// A retain that changes nothing
    pub fn is_plain_retain(&self) -> bool {
        matches!(
            self,
            Op::Retain {
                value: RetainValue::Count(_),
                attributes: None,
            }
        )
    }

    /// `len` units starting `from` units into this op
    pub(crate) fn slice(&self, from: usize, len: usize) -> Op {
        match self {
            Op::Insert { value, attributes } => {
                let value = match value {
                    InsertValue::Text(text) => {
                        InsertValue::Text(text.chars().skip(from).take(len).collect())
                    }
                    InsertValue::Count(_) => InsertValue::Count(len),
                    InsertValue::Nested(nested) => InsertValue::Nested(nested.clone()),
                };
                Op::Insert {
                    value,
                    attributes: attributes.clone(),
                }
            }
            Op::Retain { value, attributes } => {
                let value = match value {
                    RetainValue::Count(_) => RetainValue::Count(len),
                    RetainValue::Nested(nested) => RetainValue::Nested(nested.clone()),
                };
                Op::Retain {
                    value,
                    attributes: attributes.clone(),
                }
            }
            Op::Delete(_) => Op::Delete(len),
        }
    }
}

/// JSON shape of an op: exactly one of `insert`, `retain`, `delete`
#[derive(Serialize, Deserialize)]
struct WireOp {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    retain: Option<WireValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delete: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    attributes: Option<Attributes>,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Text(String),
    Count(usize),
    Nested(Delta),
}

impl TryFrom<WireOp> for Op {
    type Error = DeltaError;

    fn try_from(wire: WireOp) -> Result<Self, Self::Error> {
        let attributes = wire.attributes.and_then(Attributes::into_option);
        match (wire.insert, wire.retain, wire.delete) {
            (Some(value), None, None) => Ok(Op::Insert {
                value: match value {
                    WireValue::Text(text) => InsertValue::Text(text),
                    WireValue::Count(count) => InsertValue::Count(count),
                    WireValue::Nested(nested) => InsertValue::Nested(nested),
                },
                attributes,
            }),
            (None, Some(value), None) => Ok(Op::Retain {
                value: match value {
                    WireValue::Count(count) => RetainValue::Count(count),
                    WireValue::Nested(nested) => RetainValue::Nested(nested),
                    WireValue::Text(_) => {
                        return Err(DeltaError::Malformed(
                            "retain must be a count or a nested op list".to_string(),
                        ));
                    }
                },
                attributes,
            }),
            (None, None, Some(count)) => Ok(Op::Delete(count)),
            _ => Err(DeltaError::Malformed(
                "op must have exactly one of insert, retain or delete".to_string(),
            )),
        }
    }
}

impl From<Op> for WireOp {
    fn from(op: Op) -> Self {
        match op {
            Op::Insert { value, attributes } => WireOp {
                insert: Some(match value {
                    InsertValue::Text(text) => WireValue::Text(text),
                    InsertValue::Count(count) => WireValue::Count(count),
                    InsertValue::Nested(nested) => WireValue::Nested(nested),
                }),
                retain: None,
                delete: None,
                attributes,
            },
            Op::Retain { value, attributes } => WireOp {
                insert: None,
                retain: Some(match value {
                    RetainValue::Count(count) => WireValue::Count(count),
                    RetainValue::Nested(nested) => WireValue::Nested(nested),
                }),
                delete: None,
                attributes,
            },
            Op::Delete(count) => WireOp {
                insert: None,
                retain: None,
                delete: Some(count),
                attributes: None,
            },
        }
    }
}
