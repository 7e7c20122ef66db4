// Helpers shared by the integration tests. Each test binary only uses some
// of them, so dead code analysis has to be silenced per item.
use docweave_engine::{Block, Delta, Document, OpSource, Registry};

/// `Hello **world**`, a quote, a 2x2 table of `a b / c d`, then `tail`.
///
/// Offsets: the first paragraph covers 0..12, the quote 12..19, the table
/// is the single unit at 19 and `tail` covers 20..25.
#[allow(dead_code)]
pub const MIXED_DOCUMENT: &str = r#"[
  {"insert": "Hello "},
  {"insert": "world", "attributes": {"bold": true}},
  {"insert": 1, "attributes": {"frag": "paraEnd", "block": "content"}},
  {"insert": "quoted"},
  {"insert": 1, "attributes": {"frag": "paraEnd", "block": "quote"}},
  {"insert": [
    {"insert": [
      {"insert": [{"insert": "a"}, {"insert": 1, "attributes": {"frag": "paraEnd", "block": "content"}}]},
      {"insert": [{"insert": "b"}, {"insert": 1, "attributes": {"frag": "paraEnd", "block": "content"}}]}
    ]},
    {"insert": [
      {"insert": [{"insert": "c"}, {"insert": 1, "attributes": {"frag": "paraEnd", "block": "content"}}]},
      {"insert": [{"insert": "d"}, {"insert": 1, "attributes": {"frag": "paraEnd", "block": "content"}}]}
    ]}
  ], "attributes": {"block": "table"}},
  {"insert": "tail"},
  {"insert": 1, "attributes": {"frag": "paraEnd", "block": "content"}}
]"#;

#[allow(dead_code)]
pub fn mixed_ops() -> Delta {
    Delta::from_json(MIXED_DOCUMENT).unwrap()
}

#[allow(dead_code)]
pub fn mixed_document() -> Document {
    Document::from_ops(&mixed_ops(), &Registry::default())
}

/// Walk the tree and check that every container's length is the sum of its
/// children, that block starts chain without gaps, and that every paragraph
/// is terminated and free of empty text. `path` prefixes failure messages.
#[allow(dead_code)]
pub fn assert_lengths_consistent(document: &Document, path: &str) {
    assert!(!document.blocks().is_empty(), "{path}: document without blocks");
    let mut offset = 0;
    for (index, block) in document.blocks().iter().enumerate() {
        let at = format!("{path}/block {index}");
        assert_eq!(block.start(), offset, "{at}: start does not follow the previous block");
        match block {
            Block::Frames(frames) => {
                let mut frame_total = 0;
                for (frame_index, frame) in frames.frames().iter().enumerate() {
                    let fragment_total: usize = frame.fragments().iter().map(|fragment| fragment.length()).sum();
                    assert!(
                        frame.fragments().iter().all(|fragment| fragment.length() > 0),
                        "{at}/frame {frame_index}: empty fragment"
                    );
                    assert_eq!(frame.length(), fragment_total, "{at}/frame {frame_index}");
                    assert!(frame.is_terminated(), "{at}/frame {frame_index}: missing paragraph end");
                    frame_total += frame.length();
                }
                assert_eq!(block.length(), frame_total, "{at}");
            }
            Block::Table(table) => {
                assert_eq!(block.length(), 1, "{at}: a table is one unit");
                assert!(!table.rows().is_empty(), "{at}: table without rows");
                for (row_index, row) in table.rows().iter().enumerate() {
                    for (cell_index, cell) in row.cells().iter().enumerate() {
                        assert_lengths_consistent(&cell.document, &format!("{at}/cell {row_index},{cell_index}"));
                    }
                }
            }
        }
        offset += block.length();
    }
    assert_eq!(document.length(), offset, "{path}: document length");
    assert_eq!(document.to_ops().length(), offset, "{path}: operation list length");
}
