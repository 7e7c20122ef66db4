//! Find text in a document, including inside table cells.
//!
//! Matching runs paragraph by paragraph over the one-char-per-unit text of
//! each frame, so a match never crosses a paragraph end and embeds only
//! match the object replacement char.

use regex::{Regex, RegexBuilder};

use crate::blocks::{Block, Selectable};
use crate::document::Document;
use crate::models::doc_pos::DocPos;
use crate::render::SearchHighlight;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_insensitive: bool,
    /// Treat the query as a regular expression instead of literal text
    pub regex: bool,
}

/// One match, as document positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchMatch {
    pub start: DocPos,
    pub end: DocPos,
}

/// Every non-empty match of `query`, in document order
pub fn find_all(
    document: &Document,
    query: &str,
    options: SearchOptions,
) -> Result<Vec<SearchMatch>, SearchError> {
    if query.is_empty() {
        return Ok(Vec::new());
    }
    let pattern = if options.regex {
        query.to_string()
    } else {
        regex::escape(query)
    };
    let matcher = RegexBuilder::new(&pattern)
        .case_insensitive(options.case_insensitive)
        .build()?;
    let mut matches = Vec::new();
    collect(document, &matcher, &mut matches);
    log::debug!("search for {query:?} found {} match(es)", matches.len());
    Ok(matches)
}

fn collect(document: &Document, matcher: &Regex, out: &mut Vec<SearchMatch>) {
    for block in document.blocks() {
        match block {
            Block::Frames(frames) => {
                for (index, frame) in frames.frames().iter().enumerate() {
                    let base = block.start() + frames.frame_start(index);
                    let text = frame.text();
                    let body = text.strip_suffix('\n').unwrap_or(&text);
                    for found in matcher.find_iter(body) {
                        if found.start() == found.end() {
                            continue;
                        }
                        let start = body[..found.start()].chars().count();
                        let len = found.as_str().chars().count();
                        out.push(SearchMatch {
                            start: DocPos::new(base + start),
                            end: DocPos::new(base + start + len),
                        });
                    }
                }
            }
            Block::Table(table) => {
                for (row_index, row) in table.rows().iter().enumerate() {
                    for (cell_index, cell) in row.cells().iter().enumerate() {
                        let mut inner = Vec::new();
                        collect(&cell.document, matcher, &mut inner);
                        let wrap = |pos: DocPos| {
                            DocPos::nested(
                                table.start,
                                DocPos::nested(row_index, DocPos::nested(cell_index, pos)),
                            )
                        };
                        out.extend(inner.into_iter().map(|found| SearchMatch {
                            start: wrap(found.start),
                            end: wrap(found.end),
                        }));
                    }
                }
            }
        }
    }
}

/// Rectangles for each match, ready for `draw_search_highlights`. The
/// document must have been laid out.
pub fn highlight_rects(document: &Document, matches: &[SearchMatch]) -> Vec<SearchHighlight> {
    matches
        .iter()
        .map(|found| SearchHighlight {
            rects: document.get_selection_rectangles(&found.start, &found.end, None),
        })
        .collect()
}
