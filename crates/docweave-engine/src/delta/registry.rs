use std::collections::HashMap;

use crate::blocks::{Block, BlockKind, FrameBlock, Table};
use crate::delta::{Delta, InsertValue};
use crate::layout::LayoutFrame;
use crate::models::attributes::{Attributes, keys};
use crate::models::fragment::{DATE_TAG, Fragment, IMAGE_TAG, PARA_END_TAG, TEXT_TAG};

/// Builds one fragment from a single-unit insert and its attributes
/// (discriminators already removed)
pub type FragmentCtor = fn(&InsertValue, Attributes) -> Option<Fragment>;

/// Builds a block from its collected content and the block-owned attributes
pub type BlockCtor = fn(BlockSource<'_>, Attributes, &Registry) -> Option<Block>;

/// What the reader collected for a block group
#[derive(Debug)]
pub enum BlockSource<'a> {
    Frames(Vec<LayoutFrame>),
    Nested(&'a Delta),
}

#[derive(Debug, Clone, Copy)]
pub struct BlockEntry {
    pub ctor: BlockCtor,
    /// Attribute keys stored on the block rather than its last fragment
    pub owned_keys: &'static [&'static str],
}

/// Type tag to constructor tables used while reading operation lists.
///
/// Build one at startup and pass it to the readers. [`Registry::default`]
/// knows every fragment and block type the engine ships; hosts may register
/// more or replace entries.
#[derive(Debug, Clone)]
pub struct Registry {
    fragments: HashMap<String, FragmentCtor>,
    blocks: HashMap<String, BlockEntry>,
}

impl Registry {
    /// A registry that knows no types
    pub fn empty() -> Self {
        Self {
            fragments: HashMap::new(),
            blocks: HashMap::new(),
        }
    }

    pub fn register_fragment(&mut self, tag: impl Into<String>, ctor: FragmentCtor) -> &mut Self {
        self.fragments.insert(tag.into(), ctor);
        self
    }

    pub fn register_block(&mut self, tag: impl Into<String>, entry: BlockEntry) -> &mut Self {
        self.blocks.insert(tag.into(), entry);
        self
    }

    pub fn fragment(&self, tag: &str) -> Option<FragmentCtor> {
        self.fragments.get(tag).copied()
    }

    pub fn block(&self, tag: &str) -> Option<&BlockEntry> {
        self.blocks.get(tag)
    }
}

impl Default for Registry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_fragment(TEXT_TAG, read_text)
            .register_fragment(IMAGE_TAG, read_image)
            .register_fragment(DATE_TAG, read_date)
            .register_fragment(PARA_END_TAG, read_para_end);
        for kind in [BlockKind::Content, BlockKind::Quote, BlockKind::Code] {
            registry.register_block(
                kind.tag(),
                BlockEntry {
                    ctor: match kind {
                        BlockKind::Content => read_content,
                        BlockKind::Quote => read_quote,
                        BlockKind::Code => read_code,
                    },
                    owned_keys: kind.owned_keys(),
                },
            );
        }
        registry.register_block(
            Table::TAG,
            BlockEntry {
                ctor: read_table,
                owned_keys: &[keys::COL_WIDTHS],
            },
        );
        registry
    }
}

fn read_text(value: &InsertValue, attributes: Attributes) -> Option<Fragment> {
    match value {
        InsertValue::Text(text) => Some(Fragment::text(text.clone(), attributes)),
        _ => None,
    }
}

fn read_image(value: &InsertValue, mut attributes: Attributes) -> Option<Fragment> {
    if !matches!(value, InsertValue::Count(_)) {
        return None;
    }
    let mut media = attributes.split_off_keys(&[keys::SRC, keys::WIDTH, keys::HEIGHT]);
    let src = media.remove(keys::SRC)?.as_str()?.to_string();
    Some(Fragment::image(
        src,
        media.get_f32(keys::WIDTH).unwrap_or(0.0),
        media.get_f32(keys::HEIGHT).unwrap_or(0.0),
        attributes,
    ))
}

fn read_date(value: &InsertValue, mut attributes: Attributes) -> Option<Fragment> {
    if !matches!(value, InsertValue::Count(_)) {
        return None;
    }
    let literal = attributes.remove(keys::TEXT)?.as_str()?.to_string();
    Some(Fragment::date(literal, attributes))
}

fn read_para_end(value: &InsertValue, attributes: Attributes) -> Option<Fragment> {
    matches!(value, InsertValue::Count(_)).then(|| Fragment::para_end(attributes))
}

fn frame_block(kind: BlockKind, source: BlockSource<'_>, attributes: Attributes) -> Option<Block> {
    match source {
        BlockSource::Frames(frames) => Some(Block::Frames(FrameBlock::new(kind, frames, attributes))),
        BlockSource::Nested(_) => None,
    }
}

fn read_content(source: BlockSource<'_>, attributes: Attributes, _: &Registry) -> Option<Block> {
    frame_block(BlockKind::Content, source, attributes)
}

fn read_quote(source: BlockSource<'_>, attributes: Attributes, _: &Registry) -> Option<Block> {
    frame_block(BlockKind::Quote, source, attributes)
}

fn read_code(source: BlockSource<'_>, attributes: Attributes, _: &Registry) -> Option<Block> {
    frame_block(BlockKind::Code, source, attributes)
}

fn read_table(source: BlockSource<'_>, attributes: Attributes, registry: &Registry) -> Option<Block> {
    match source {
        BlockSource::Nested(rows) => Table::from_ops(rows, attributes, registry).map(Block::Table),
        BlockSource::Frames(_) => None,
    }
}
