use std::fmt;

use serde::{Deserialize, Serialize};

use crate::delta::{Delta, Op, RetainValue};

/// A hierarchical position in a document.
///
/// `index` is an offset within the current container; `inner` descends into
/// the structured unit at that offset (a table, then a row, then a cell, then
/// the cell's own document). A missing `inner` at any level addresses the
/// boundary before the unit at `index`.
///
/// The derived ordering compares `index` first, sorts `inner = None` before
/// any `inner = Some`, and otherwise recurses.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DocPos {
    pub index: usize,
    #[serde(default)]
    pub inner: Option<Box<DocPos>>,
}

impl DocPos {
    pub const fn new(index: usize) -> Self {
        Self { index, inner: None }
    }

    pub fn nested(index: usize, inner: DocPos) -> Self {
        Self {
            index,
            inner: Some(Box::new(inner)),
        }
    }

    /// Build a position from outermost to innermost index
    pub fn path(indices: &[usize]) -> Self {
        let mut pos: Option<DocPos> = None;
        for &index in indices.iter().rev() {
            pos = Some(match pos {
                Some(inner) => DocPos::nested(index, inner),
                None => DocPos::new(index),
            });
        }
        pos.unwrap_or_default()
    }

    /// `pos` expressed relative to a container starting at `base`
    pub fn relative(base: usize, pos: &DocPos) -> DocPos {
        if pos.index < base {
            return DocPos::new(0);
        }
        DocPos {
            index: pos.index - base,
            inner: pos.inner.clone(),
        }
    }

    /// Inverse of [`DocPos::relative`]
    pub fn offset_by(&self, base: usize) -> DocPos {
        DocPos {
            index: self.index + base,
            inner: self.inner.clone(),
        }
    }

    pub fn inner(&self) -> Option<&DocPos> {
        self.inner.as_deref()
    }

    /// Shift the outermost index
    pub fn move_right(&self, delta: usize) -> DocPos {
        DocPos {
            index: self.index + delta,
            inner: self.inner.clone(),
        }
    }

    /// Shift the deepest index, saturating at zero
    pub fn move_innermost(&self, delta: isize) -> DocPos {
        match &self.inner {
            Some(inner) => DocPos::nested(self.index, inner.move_innermost(delta)),
            None => DocPos::new(self.index.saturating_add_signed(delta)),
        }
    }

    pub fn innermost_index(&self) -> usize {
        match &self.inner {
            Some(inner) => inner.innermost_index(),
            None => self.index,
        }
    }

    pub fn depth(&self) -> usize {
        1 + self.inner.as_ref().map_or(0, |inner| inner.depth())
    }

    /// Map this position through a change expressed in old coordinates.
    ///
    /// Inserts at or before the position push it right; a delete covering it
    /// clamps to the delete start and drops `inner`; a nested retain at the
    /// position's own index is applied to `inner`.
    pub fn transform(&self, delta: &Delta) -> DocPos {
        let mut offset = 0usize;
        let mut shift = 0isize;
        let mut inner = self.inner.clone();

        for op in delta.ops() {
            match op {
                Op::Insert { .. } => {
                    if offset > self.index {
                        break;
                    }
                    shift += op.len() as isize;
                }
                Op::Retain { value, .. } => {
                    let len = op.len();
                    if offset + len > self.index {
                        if let RetainValue::Nested(nested) = value
                            && offset == self.index
                        {
                            inner = inner.map(|pos| Box::new(pos.transform(nested)));
                        }
                        break;
                    }
                    offset += len;
                }
                Op::Delete(count) => {
                    if offset + count > self.index {
                        shift -= (self.index - offset) as isize;
                        inner = None;
                        break;
                    }
                    shift -= *count as isize;
                    offset += count;
                }
            }
        }

        DocPos {
            index: self.index.saturating_add_signed(shift),
            inner,
        }
    }
}

impl fmt::Display for DocPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)?;
        if let Some(inner) = &self.inner {
            write!(f, "/{inner}")?;
        }
        Ok(())
    }
}

impl From<usize> for DocPos {
    fn from(index: usize) -> Self {
        DocPos::new(index)
    }
}
