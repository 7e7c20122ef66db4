use crate::delta::iter::OpIter;
use crate::delta::{Delta, DeltaError, InsertValue, Op, OpKind, RetainValue};
use crate::models::attributes::Attributes;

impl Delta {
    /// The single change equivalent to applying `self` then `other`.
    ///
    /// Composing a change onto a document yields the changed document.
    /// Nested retains compose into the nested insert or retain they land on.
    pub fn compose(&self, other: &Delta) -> Delta {
        let mut this = OpIter::new(self.ops());
        let mut that = OpIter::new(other.ops());
        let mut out = Delta::new();

        while this.has_next() || that.has_next() {
            if that.peek_kind() == OpKind::Insert {
                out.push(that.next_op());
                continue;
            }
            if this.peek_kind() == OpKind::Delete {
                out.push(this.next_op());
                continue;
            }

            let length = this.peek_length().min(that.peek_length());
            let this_op = this.next(length);
            let that_op = that.next(length);
            match (this_op, that_op) {
                (
                    Op::Retain {
                        value: this_value,
                        attributes: this_attrs,
                    },
                    Op::Retain {
                        value: that_value,
                        attributes: that_attrs,
                    },
                ) => {
                    let value = match (this_value, that_value) {
                        (RetainValue::Nested(a), RetainValue::Nested(b)) => {
                            RetainValue::Nested(a.compose(&b))
                        }
                        (RetainValue::Nested(a), RetainValue::Count(_)) => RetainValue::Nested(a),
                        (RetainValue::Count(_), value) => value,
                    };
                    out.push(Op::Retain {
                        value,
                        attributes: Attributes::compose(
                            this_attrs.as_ref(),
                            that_attrs.as_ref(),
                            true,
                        ),
                    });
                }
                (
                    Op::Insert {
                        value: this_value,
                        attributes: this_attrs,
                    },
                    Op::Retain {
                        value: that_value,
                        attributes: that_attrs,
                    },
                ) => {
                    let value = match (this_value, that_value) {
                        (InsertValue::Nested(a), RetainValue::Nested(b)) => {
                            InsertValue::Nested(a.compose(&b))
                        }
                        (value, _) => value,
                    };
                    out.push(Op::Insert {
                        value,
                        attributes: Attributes::compose(
                            this_attrs.as_ref(),
                            that_attrs.as_ref(),
                            false,
                        ),
                    });
                }
                (Op::Retain { .. }, Op::Delete(count)) => out.push(Op::Delete(count)),
                // An insert deleted by the later change cancels out
                _ => {}
            }
        }
        out.chop()
    }

    /// The change that undoes `self` when `self` was applied to `base`
    pub fn invert(&self, base: &Delta) -> Delta {
        let mut inverted = Delta::new();
        let mut base_index = 0;
        for op in self.ops() {
            match op {
                Op::Insert { .. } => inverted.push(Op::Delete(op.len())),
                Op::Retain {
                    value: RetainValue::Count(count),
                    attributes: None,
                } => {
                    inverted.push(Op::Retain {
                        value: RetainValue::Count(*count),
                        attributes: None,
                    });
                    base_index += count;
                }
                _ => {
                    let length = op.len();
                    let slice = base.slice(base_index, base_index + length);
                    for base_op in slice.into_ops() {
                        match op {
                            Op::Delete(_) => inverted.push(base_op),
                            Op::Retain { value, attributes } => {
                                let value = match (value, &base_op) {
                                    (
                                        RetainValue::Nested(change),
                                        Op::Insert {
                                            value: InsertValue::Nested(nested_base),
                                            ..
                                        },
                                    ) => RetainValue::Nested(change.invert(nested_base)),
                                    _ => RetainValue::Count(base_op.len()),
                                };
                                inverted.push(Op::Retain {
                                    value,
                                    attributes: Attributes::invert(
                                        attributes.as_ref(),
                                        base_op.attributes(),
                                    ),
                                });
                            }
                            Op::Insert { .. } => {}
                        }
                    }
                    base_index += length;
                }
            }
        }
        inverted.chop()
    }

    /// Units `start..end` of this op list
    pub fn slice(&self, start: usize, end: usize) -> Delta {
        let mut out = Delta::new();
        let mut iter = OpIter::new(self.ops());
        let mut index = 0;
        while index < end && iter.has_next() {
            let op = if index < start {
                iter.next(start - index)
            } else {
                let op = iter.next(end - index);
                out.push(op.clone());
                op
            };
            index += op.len();
        }
        out
    }

    /// Apply this change to a document, checking it fits
    pub fn apply_to(&self, document: &Delta) -> Result<Delta, DeltaError> {
        if !document.is_document() {
            return Err(DeltaError::NotADocument);
        }
        let change = self.base_length();
        let available = document.length();
        if change > available {
            return Err(DeltaError::LengthMismatch {
                change,
                document: available,
            });
        }
        Ok(document.compose(self))
    }
}
