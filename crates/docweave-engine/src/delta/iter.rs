use crate::delta::{Op, OpKind, RetainValue};

/// Walks an op slice handing out pieces of a requested length.
///
/// Past the end it behaves like an endless plain retain, which is what the
/// compose loop expects from a shorter operand.
pub(crate) struct OpIter<'a> {
    ops: &'a [Op],
    index: usize,
    offset: usize,
}

impl<'a> OpIter<'a> {
    pub(crate) fn new(ops: &'a [Op]) -> Self {
        Self {
            ops,
            index: 0,
            offset: 0,
        }
    }

    pub(crate) fn has_next(&self) -> bool {
        self.index < self.ops.len()
    }

    pub(crate) fn peek_length(&self) -> usize {
        self.ops
            .get(self.index)
            .map_or(usize::MAX, |op| op.len() - self.offset)
    }

    pub(crate) fn peek_kind(&self) -> OpKind {
        self.ops.get(self.index).map_or(OpKind::Retain, Op::kind)
    }

    pub(crate) fn next(&mut self, length: usize) -> Op {
        let Some(op) = self.ops.get(self.index) else {
            return Op::Retain {
                value: RetainValue::Count(length),
                attributes: None,
            };
        };
        let offset = self.offset;
        let remaining = op.len() - offset;
        let take = if length >= remaining {
            self.index += 1;
            self.offset = 0;
            remaining
        } else {
            self.offset += length;
            length
        };
        if offset == 0 && take == op.len() {
            op.clone()
        } else {
            op.slice(offset, take)
        }
    }

    /// The rest of the current op
    pub(crate) fn next_op(&mut self) -> Op {
        self.next(usize::MAX)
    }
}
