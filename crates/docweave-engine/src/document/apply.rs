use crate::blocks::OpSource;
use crate::delta::{Delta, DeltaError, Registry, read_blocks};
use crate::document::Document;

impl Document {
    /// Apply a change expressed as ops to the document in place.
    ///
    /// Only the blocks the change reaches are re-read: the span runs from
    /// the block holding the first changed unit to the block after the last
    /// one, so a deleted block terminator can pull the next block in.
    pub fn apply_delta(&mut self, change: &Delta, registry: &Registry) -> Result<(), DeltaError> {
        let length = self.length();
        let base = change.base_length();
        if base > length {
            return Err(DeltaError::LengthMismatch {
                change: base,
                document: length,
            });
        }
        let (lead, rest) = match change.ops().split_first() {
            Some((first, rest)) if first.is_plain_retain() => (first.len(), rest),
            _ => (0, change.ops()),
        };
        if rest.is_empty() {
            return Ok(());
        }

        let first = self.block_index_at(lead);
        let last = self
            .block_index_at(base.saturating_sub(1))
            .max(first)
            .saturating_add(1)
            .min(self.blocks.len() - 1);
        let span_start = self.blocks[first].start();
        let span = self.blocks[first..=last]
            .iter()
            .fold(Delta::new(), |ops, block| ops.concat(block.to_ops()));

        let mut local = Delta::new().retain(lead - span_start, None);
        for op in rest {
            local.push(op.clone());
        }
        let replaced = local.apply_to(&span)?;
        let blocks = read_blocks(&replaced, registry);
        log::debug!(
            "applied change to blocks {first}..={last}, now {} block(s)",
            blocks.len()
        );
        self.blocks.splice(first..=last, blocks);
        self.ensure_block();
        self.recompute_starts();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Exportable;
    use crate::models::attributes::Attributes;
    use crate::tests::fixtures::{document_with_table, paragraphs};
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::default()
    }

    #[test]
    fn test_apply_insert_in_middle_block() {
        let mut document = paragraphs(&["one", "two", "three"]);
        let change = Delta::new().retain(5, None).insert("X", None);
        document.apply_delta(&change, &registry()).unwrap();
        assert_eq!(document.to_text(None), "one\ntXwo\nthree\n");
        assert_eq!(document.blocks().len(), 3);
    }

    #[test]
    fn test_apply_matches_composing_the_ops() {
        let mut document = document_with_table();
        let change = Delta::new()
            .retain(2, None)
            .retain(3, Some(Attributes::new().with("bold", true)))
            .retain(4, None)
            .insert("!", None)
            .delete(2);
        let expected = document.to_ops().compose(&change);
        document.apply_delta(&change, &registry()).unwrap();
        assert_eq!(document.to_ops(), expected);
    }

    #[test]
    fn test_deleting_block_terminator_joins_next_block() {
        let mut document = paragraphs(&["one", "two"]);
        let change = Delta::new().retain(3, None).delete(1);
        document.apply_delta(&change, &registry()).unwrap();
        assert_eq!(document.to_text(None), "onetwo\n");
        assert_eq!(document.blocks().len(), 1);
    }

    #[test]
    fn test_apply_rejects_overlong_change() {
        let mut document = paragraphs(&["one"]);
        let change = Delta::new().retain(10, None).insert("x", None);
        assert!(matches!(
            document.apply_delta(&change, &registry()),
            Err(DeltaError::LengthMismatch {
                change: 10,
                document: 4
            })
        ));
        assert_eq!(document.to_text(None), "one\n");
    }

    #[test]
    fn test_delete_everything_leaves_a_block() {
        let mut document = paragraphs(&["one", "two"]);
        document
            .apply_delta(&Delta::new().delete(8), &registry())
            .unwrap();
        assert!(document.is_blank());
    }
}
