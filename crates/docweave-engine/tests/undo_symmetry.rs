use docweave_engine::{Attributes, BlockKind, Cmd, ContentController, DocPos, OpSource, Registry};
use pretty_assertions::assert_eq;
use rstest::rstest;

mod common;
use common::{assert_lengths_consistent, mixed_document};

#[rstest]
#[case::insert_text(Cmd::InsertText {
    at: DocPos::new(5),
    text: ", there\nnew line".to_string(),
    attributes: None,
})]
#[case::delete_across_blocks(Cmd::DeleteRange {
    start: DocPos::new(3),
    end: DocPos::new(15),
})]
#[case::delete_into_table(Cmd::DeleteRange {
    start: DocPos::new(14),
    end: DocPos::path(&[19, 0, 1, 1]),
})]
#[case::format(Cmd::Format {
    start: DocPos::new(2),
    end: DocPos::new(14),
    attributes: Attributes::new().with("italic", true),
})]
#[case::format_paragraph(Cmd::FormatParagraph {
    start: DocPos::new(0),
    end: DocPos::new(13),
    attributes: Attributes::new().with("align", "center"),
})]
#[case::indent(Cmd::Indent {
    start: DocPos::new(0),
    end: DocPos::new(0),
})]
#[case::convert(Cmd::ConvertBlock {
    start: DocPos::new(1),
    end: DocPos::new(1),
    kind: BlockKind::Code,
})]
#[case::insert_table(Cmd::InsertTable {
    at: DocPos::new(22),
    rows: 2,
    cols: 3,
})]
#[case::insert_row(Cmd::InsertRow {
    at: DocPos::path(&[19, 0, 0, 0]),
    below: true,
})]
#[case::delete_column(Cmd::DeleteColumn {
    at: DocPos::path(&[19, 1, 1, 0]),
})]
#[case::merge(Cmd::MergeCells {
    start: DocPos::path(&[19, 0, 0, 0]),
    end: DocPos::path(&[19, 1, 0, 1]),
})]
#[case::edit_inside_cell(Cmd::InsertText {
    at: DocPos::path(&[19, 1, 1, 1]),
    text: "!".to_string(),
    attributes: None,
})]
fn test_change_then_inverse_restores_document(#[case] cmd: Cmd) {
    let document = mixed_document();
    let initial = document.to_ops();
    let mut controller = ContentController::new(document, Registry::default());

    let patch = controller.apply(cmd).unwrap();
    assert!(!patch.is_noop());
    assert_lengths_consistent(controller.document(), "after apply");
    let changed = controller.document().to_ops();
    assert_eq!(initial.compose(&patch.diff), changed);

    let undo = controller.undo().unwrap();
    assert_lengths_consistent(controller.document(), "after undo");
    assert_eq!(controller.document().to_ops(), initial);
    assert_eq!(initial.compose(&patch.diff).compose(&undo.diff), initial);

    controller.redo().unwrap();
    assert_lengths_consistent(controller.document(), "after redo");
    assert_eq!(controller.document().to_ops(), changed);
}

#[test]
fn test_edit_sequence_keeps_lengths_consistent() {
    let mut controller = ContentController::new(mixed_document(), Registry::default());
    let commands = vec![
        Cmd::InsertText {
            at: DocPos::new(0),
            text: "> ".to_string(),
            attributes: None,
        },
        Cmd::InsertRow {
            at: DocPos::path(&[21, 1, 0, 0]),
            below: false,
        },
        Cmd::InsertText {
            at: DocPos::path(&[21, 0, 1, 1]),
            text: "e\nf".to_string(),
            attributes: None,
        },
        Cmd::MergeCells {
            start: DocPos::path(&[21, 0, 0, 0]),
            end: DocPos::path(&[21, 1, 0, 0]),
        },
        Cmd::DeleteRange {
            start: DocPos::path(&[21, 0, 1, 0]),
            end: DocPos::path(&[21, 0, 1, 2]),
        },
        Cmd::DeleteRange {
            start: DocPos::new(10),
            end: DocPos::new(16),
        },
    ];
    for cmd in commands {
        let name = cmd.name();
        controller.apply(cmd).unwrap();
        assert_lengths_consistent(controller.document(), name);
        let ops = controller.document().to_ops();
        assert_eq!(ops.length(), controller.document().length());
        assert_eq!(controller.state(), &ops);
    }
    while controller.undo().is_some() {
        assert_lengths_consistent(controller.document(), "undo");
    }
    assert_eq!(controller.document().to_ops(), mixed_document().to_ops());
}
