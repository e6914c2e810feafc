//! End-to-end scenarios for the markdown compiler, table-driven the way the
//! teacher's own `md_extensions.rs` drives its extension tests: one
//! `#[test_case]` row per documented input/output pair.

use test_case::test_case;

use seabird_discord_backend::block::Block;
use seabird_discord_backend::markdown::parse;

fn text(s: &str) -> Block {
    Block::Text(s.to_string())
}

#[test_case("hello world", Block::Text("hello world".into()); "plain_text")]
#[test_case("*hello world*", Block::Italic(vec![text("hello world")]); "italic")]
#[test_case("[hello](world)", Block::Link { destination: "world".into(), label: vec![text("hello")] }; "link")]
#[test_case("`hello world`", Block::InlineCode("hello world".into()); "inline_code")]
#[test_case("~~hello world~~", Block::Strikethrough(vec![text("hello world")]); "strikethrough")]
#[test_case("||hello world||", Block::Spoiler(vec![text("hello world")]); "spoiler")]
fn single_construct_scenarios(input: &str, expected: Block) {
    let (block, _) = parse(input).unwrap();
    assert_eq!(block, expected);
}

#[test]
fn underline_surrounded_by_text_collapses_to_a_container() {
    let (block, _) = parse("start __hello world__ end").unwrap();
    assert_eq!(
        block,
        Block::Container(vec![
            text("start "),
            Block::Underline(vec![text("hello world")]),
            text(" end"),
        ])
    );
}

#[test]
fn list_drops_item_wrapping_and_marker_kind() {
    let (block, _) = parse("* hello\n* world").unwrap();
    assert_eq!(block, Block::List(vec![text("hello"), text("world")]));
}

#[test]
fn fenced_code_strips_trailing_newline_but_keeps_language_and_body() {
    let (block, _) = parse("```python\nprint('hello world')\n```").unwrap();
    assert_eq!(block, Block::FencedCode { language: "python".into(), body: "print('hello world')".into() });
}

#[test]
fn heading_level_four_is_not_a_heading() {
    let (block, _) = parse("# 1\n## 2\n### 3\n#### 4").unwrap();
    assert_eq!(
        block,
        Block::Container(vec![
            Block::Heading { level: 1, children: vec![text("1")] },
            Block::Heading { level: 2, children: vec![text("2")] },
            Block::Heading { level: 3, children: vec![text("3")] },
            text("#### 4"),
        ])
    );
}

#[test]
fn tilde_run_edge_cases_decompose_the_way_spec_scenario_eleven_requires() {
    let (block, _) = parse("~a~ ~hello~ ~~~world~~~ ~~~~~asdf~~~~~").unwrap();
    let strike = |s: &str| Block::Strikethrough(vec![text(s)]);
    assert_eq!(
        block,
        Block::Container(vec![
            text("~a~ ~hello~ "),
            strike("~world"),
            text("~ "),
            strike("~"),
            text("asdf"),
            strike("~"),
        ])
    );
}

#[test]
fn star_run_decomposition_nests_bold_inside_italic() {
    let (block, _) = parse("*a* *hello* ***world*** *****asdf*****").unwrap();
    let italic = |b: Block| Block::Italic(vec![b]);
    let bold = |b: Block| Block::Bold(vec![b]);
    assert_eq!(
        block,
        Block::Container(vec![
            italic(text("a")),
            text(" "),
            italic(text("hello")),
            text(" "),
            italic(bold(text("world"))),
            text(" "),
            italic(bold(bold(text("asdf")))),
        ])
    );
}

#[test]
fn lone_underscore_nests_inside_strikethrough_alongside_bold_and_spoiler() {
    let (block, _) = parse("~~strike **bold** _italic__under___~~ in ||spoiled **bold**||").unwrap();
    let Block::Container(top) = &block else { panic!("expected a top-level container, got {block:?}") };
    let Block::Strikethrough(strike_children) = &top[0] else { panic!("expected leading strikethrough") };
    assert!(strike_children.iter().any(|b| matches!(b, Block::Bold(_))));
    let nested_italic = strike_children
        .iter()
        .find_map(|b| match b {
            Block::Italic(children) => Some(children),
            _ => None,
        })
        .expect("expected a nested italic inside the strikethrough");
    assert_eq!(nested_italic[0], text("italic"));
    assert!(matches!(&nested_italic[1], Block::Underline(u) if u[0] == text("under")));
    assert!(matches!(top.last(), Some(Block::Spoiler(_))));
}

#[test]
fn action_hook_reports_the_flag_without_stripping_underscores() {
    let (block, is_action) = parse("_waves_").unwrap();
    assert!(is_action);
    assert_eq!(block, Block::Italic(vec![text("waves")]));
}
