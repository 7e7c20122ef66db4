use crate::blocks::{Block, BlockKind, Table};
use crate::delta::{BlockSource, Delta, InsertValue, Op, Registry};
use crate::layout::LayoutFrame;
use crate::models::attributes::{Attributes, keys};
use crate::models::fragment::{Fragment, TEXT_TAG};

/// Build blocks from an insert-only op list.
///
/// A `paraEnd` unit closes the current frame; a unit carrying `block` closes
/// the current block group. Units and blocks with unknown tags are logged
/// and skipped. Content after the last block tag becomes a content block.
pub fn read_blocks(delta: &Delta, registry: &Registry) -> Vec<Block> {
    let mut reader = BlockReader::new(registry);
    for op in delta.ops() {
        reader.read_op(op);
    }
    reader.finish()
}

struct BlockReader<'r> {
    registry: &'r Registry,
    blocks: Vec<Block>,
    frames: Vec<LayoutFrame>,
    fragments: Vec<Fragment>,
}

impl<'r> BlockReader<'r> {
    fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            blocks: Vec::new(),
            frames: Vec::new(),
            fragments: Vec::new(),
        }
    }

    fn read_op(&mut self, op: &Op) {
        let Op::Insert { value, attributes } = op else {
            log::warn!("skipping {:?} op while reading a document", op.kind());
            return;
        };
        let attributes = attributes.clone().unwrap_or_default();
        match value {
            InsertValue::Nested(nested) => self.read_nested(nested, attributes),
            InsertValue::Text(_) => self.read_unit(value, attributes),
            InsertValue::Count(count) => {
                for _ in 0..*count {
                    self.read_unit(&InsertValue::Count(1), attributes.clone());
                }
            }
        }
    }

    fn read_nested(&mut self, nested: &Delta, mut attributes: Attributes) {
        self.close_group(None);
        let tag = match attributes.remove(keys::BLOCK) {
            Some(value) => value.as_str().unwrap_or_default().to_string(),
            None => Table::TAG.to_string(),
        };
        let Some(entry) = self.registry.block(&tag) else {
            log::warn!("skipping nested unit with unknown block type {tag:?}");
            return;
        };
        match (entry.ctor)(BlockSource::Nested(nested), attributes, self.registry) {
            Some(block) => self.blocks.push(block),
            None => log::warn!("skipping malformed {tag:?} block"),
        }
    }

    fn read_unit(&mut self, value: &InsertValue, mut attributes: Attributes) {
        let block_tag = attributes
            .remove(keys::BLOCK)
            .and_then(|tag| tag.as_str().map(str::to_string));
        let block_attributes = match &block_tag {
            Some(tag) => {
                let owned = self
                    .registry
                    .block(tag)
                    .map(|entry| entry.owned_keys)
                    .unwrap_or_default();
                attributes.split_off_keys(owned)
            }
            None => Attributes::new(),
        };

        let frag_tag = match (attributes.remove(keys::FRAG), value) {
            (Some(tag), _) => tag.as_str().map(str::to_string),
            (None, InsertValue::Text(_)) => Some(TEXT_TAG.to_string()),
            (None, _) => None,
        };
        match frag_tag {
            Some(tag) => match self.registry.fragment(&tag) {
                Some(ctor) => match ctor(value, attributes) {
                    Some(fragment) => self.push_fragment(fragment),
                    None => log::warn!("skipping malformed {tag:?} unit"),
                },
                None => log::warn!("skipping unit with unknown fragment type {tag:?}"),
            },
            None => log::warn!("skipping atomic unit without a fragment type"),
        }

        if let Some(tag) = block_tag {
            self.close_group(Some((tag, block_attributes)));
        }
    }

    fn push_fragment(&mut self, fragment: Fragment) {
        let closes_frame = fragment.is_para_end();
        self.fragments.push(fragment);
        if closes_frame {
            self.frames
                .push(LayoutFrame::new(std::mem::take(&mut self.fragments)));
        }
    }

    /// Turn pending frames into a block. Without a tag the group becomes a
    /// content block.
    fn close_group(&mut self, tag: Option<(String, Attributes)>) {
        if !self.fragments.is_empty() {
            let mut frame = LayoutFrame::new(std::mem::take(&mut self.fragments));
            frame.terminate();
            self.frames.push(frame);
        }
        if self.frames.is_empty() {
            return;
        }
        let frames = std::mem::take(&mut self.frames);
        let (tag, attributes) =
            tag.unwrap_or_else(|| (BlockKind::Content.tag().to_string(), Attributes::new()));
        let Some(entry) = self.registry.block(&tag) else {
            log::warn!("skipping block with unknown type {tag:?}");
            return;
        };
        match (entry.ctor)(BlockSource::Frames(frames), attributes, self.registry) {
            Some(block) => self.blocks.push(block),
            None => log::warn!("skipping {tag:?} block built from paragraphs"),
        }
    }

    fn finish(mut self) -> Vec<Block> {
        self.close_group(None);
        self.blocks
    }
}
