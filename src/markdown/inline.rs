//! Inline scanning and delimiter resolution (C2, spec §4.1).
//!
//! The scan is two-phase, following the same shape as a CommonMark emphasis
//! pass: a single left-to-right walk tokenizes the line and opportunistically
//! builds already-resolved leaf nodes (code spans, links, autolinks), while
//! leaving delimiter runs (`*`, `_`, `__`, `~~`, `||`) as markers on a flat
//! item list. A second pass resolves those markers into nested nodes. The
//! delimiter stacks are explicit, local state threaded through the scan,
//! never ambient/global, so the algorithm is safe to call recursively for
//! link labels.
//!
//! Underscore is the one character with double duty: a clean run of exactly
//! two outranks everything else and always becomes an `Underline`, while a
//! single, unpaired underscore falls through to plain italic emphasis (the
//! same level-1 wrapping a lone `*` produces). That's the rule §4.1 means by
//! "Underline must outrank emphasis": the 2-run check always runs first, so
//! `__x__` can never be mistaken for two italic markers.

use super::ast::{MultiCharBase, Node};

/// One entry in the flat item list produced by the scan phase.
enum Item {
    Text(String),
    /// An already-fully-resolved node (code span, link, autolink, or a
    /// linkified bare URL). Never participates in delimiter matching.
    Node(Node),
    /// A candidate `__`, `~~`, or `||` delimiter: both an opener and a
    /// closer, matched as a simple same-character/length pair.
    CustomDelimiter(MultiCharBase),
    /// A run of `n` consecutive `*` characters.
    StarRun(u8),
    /// A single underscore that didn't form a clean 2-run: an italic-level
    /// emphasis delimiter, resolved the same way a lone `*` is.
    UnderscoreMark,
}

/// Parses a single logical span of inline content (already joined across
/// soft line breaks by the block parser) into a list of lowered-ready AST
/// nodes.
pub fn parse_inline(text: &str) -> Vec<Node> {
    let items = scan(text);
    resolve(items)
}

/// Phase 1: tokenize `text` into a flat list of [`Item`]s, in priority order
/// (code span, link, autolink, custom delimiters, emphasis, URL
/// linkification) as spec §4.1 lists them.
fn scan(text: &str) -> Vec<Item> {
    let bytes = text.as_bytes();
    let len = bytes.len();
    let mut pos = 0usize;
    let mut items = Vec::new();
    let mut text_buf = String::new();
    // The byte offset one past the end of the most recently pushed custom
    // delimiter, keyed by its base character. Used only for the
    // adjacent-run reject rule (prevents `~~~~` reading as two empty
    // strikethroughs, and `____` as two empty underlines).
    let mut last_custom_delim: Option<(u8, usize)> = None;

    macro_rules! flush_text {
        () => {
            if !text_buf.is_empty() {
                items.push(Item::Text(std::mem::take(&mut text_buf)));
            }
        };
    }

    while pos < len {
        let c = bytes[pos];
        match c {
            b'`' => {
                if let Some((content, next)) = scan_code_span(text, pos) {
                    flush_text!();
                    items.push(Item::Node(Node::CodeSpan(content)));
                    pos = next;
                } else {
                    text_buf.push('`');
                    pos += 1;
                }
            }
            b'[' => {
                if let Some((destination, label, next)) = scan_link(text, pos) {
                    flush_text!();
                    items.push(Item::Node(Node::Link {
                        destination,
                        children: parse_inline(&label),
                    }));
                    pos = next;
                } else {
                    text_buf.push('[');
                    pos += 1;
                }
            }
            b'<' => {
                if let Some((url, next)) = scan_autolink(text, pos) {
                    flush_text!();
                    items.push(Item::Node(Node::AutoLink { url: url.clone(), label: url }));
                    pos = next;
                } else {
                    text_buf.push('<');
                    pos += 1;
                }
            }
            b'~' | b'|' => {
                if let Some(next) = scan_two_run(bytes, pos, c) {
                    if last_custom_delim == Some((c, pos)) {
                        text_buf.push(c as char);
                        pos += 1;
                    } else {
                        flush_text!();
                        items.push(Item::CustomDelimiter(base_char(c)));
                        last_custom_delim = Some((c, next));
                        pos = next;
                    }
                } else {
                    text_buf.push(c as char);
                    pos += 1;
                }
            }
            b'_' => {
                if let Some(next) = scan_two_run(bytes, pos, c) {
                    if last_custom_delim == Some((c, pos)) {
                        flush_text!();
                        items.push(Item::UnderscoreMark);
                        pos += 1;
                    } else {
                        flush_text!();
                        items.push(Item::CustomDelimiter(base_char(c)));
                        last_custom_delim = Some((c, next));
                        pos = next;
                    }
                } else {
                    flush_text!();
                    items.push(Item::UnderscoreMark);
                    pos += 1;
                }
            }
            b'*' => {
                let run_start = pos;
                while pos < len && bytes[pos] == b'*' {
                    pos += 1;
                }
                flush_text!();
                items.push(Item::StarRun((pos - run_start) as u8));
            }
            b'h' => {
                if let Some((url, next)) = scan_bare_url(text, pos) {
                    flush_text!();
                    items.push(Item::Node(Node::Link {
                        destination: url.clone(),
                        children: vec![Node::Text(url)],
                    }));
                    pos = next;
                } else {
                    text_buf.push('h');
                    pos += 1;
                }
            }
            _ => {
                // Advance by one full UTF-8 char, not one byte.
                let ch = text[pos..].chars().next().expect("pos is a char boundary");
                text_buf.push(ch);
                pos += ch.len_utf8();
            }
        }
    }
    flush_text!();
    items
}

fn base_char(c: u8) -> MultiCharBase {
    match c {
        b'_' => MultiCharBase::Underscore,
        b'|' => MultiCharBase::Pipe,
        b'~' => MultiCharBase::Tilde,
        _ => unreachable!("base_char only called for _, ~, |"),
    }
}

fn raw_custom_delim(base: MultiCharBase) -> &'static str {
    match base {
        MultiCharBase::Underscore => "__",
        MultiCharBase::Pipe => "||",
        MultiCharBase::Tilde => "~~",
    }
}

/// Returns the byte offset just past a 2-character run of `c` starting at
/// `pos`, or `None` if fewer than 2 copies of `c` are there.
fn scan_two_run(bytes: &[u8], pos: usize, c: u8) -> Option<usize> {
    if pos + 2 <= bytes.len() && bytes[pos + 1] == c {
        Some(pos + 2)
    } else {
        None
    }
}

/// Code spans consume verbatim text up to the next backtick on the same
/// line; an internal trailing newline is replaced with a space to keep
/// single-line rendering intact. No nesting, no escaping.
fn scan_code_span(text: &str, start: usize) -> Option<(String, usize)> {
    let rest = &text[start + 1..];
    let close = rest.find('`')?;
    let content = &rest[..close];
    let content = if let Some(stripped) = content.strip_suffix('\n') {
        format!("{stripped} ")
    } else {
        content.replace('\n', " ")
    };
    Some((content, start + 1 + close + 1))
}

/// `[label](url)`, with `label` scanned recursively for nested inline
/// content and `url` taken verbatim.
fn scan_link(text: &str, start: usize) -> Option<(String, String, usize)> {
    let rest = &text[start..];
    let label_close = rest.find(']')?;
    if !rest[label_close + 1..].starts_with('(') {
        return None;
    }
    let label = rest[1..label_close].to_string();
    let url_start = label_close + 2;
    let url_close_rel = rest[url_start..].find(')')?;
    let url = rest[url_start..url_start + url_close_rel].to_string();
    Some((url, label, start + url_start + url_close_rel + 1))
}

/// `<http://example.com>` / `<user@example.com>`: no whitespace allowed
/// between the angle brackets.
fn scan_autolink(text: &str, start: usize) -> Option<(String, usize)> {
    let rest = &text[start + 1..];
    let close = rest.find('>')?;
    let candidate = &rest[..close];
    if candidate.is_empty() || candidate.contains(char::is_whitespace) {
        return None;
    }
    if looks_like_url(candidate) || looks_like_email(candidate) {
        Some((candidate.to_string(), start + 1 + close + 1))
    } else {
        None
    }
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

fn looks_like_email(s: &str) -> bool {
    matches!((s.find('@'), s.find(char::is_whitespace)), (Some(at), None) if at > 0 && at < s.len() - 1)
}

/// A bare `http(s)://…` token, stopped at whitespace or a handful of
/// trailing punctuation characters that are probably not part of the URL.
fn scan_bare_url(text: &str, start: usize) -> Option<(String, usize)> {
    let rest = &text[start..];
    if !looks_like_url(rest) {
        return None;
    }
    let end = rest.find(|c: char| c.is_whitespace()).unwrap_or(rest.len());
    let mut url = &rest[..end];
    while let Some(last) = url.chars().last() {
        if matches!(last, '.' | ',' | ')' | '>' | '!' | '?') {
            url = &url[..url.len() - last.len_utf8()];
        } else {
            break;
        }
    }
    if url.len() <= "https://".len() {
        return None;
    }
    Some((url.to_string(), start + url.len()))
}

/// Phase 2: resolve delimiter markers into nested nodes.
///
/// Custom delimiters (`__`, `~~`, `||`) match the nearest unmatched run of
/// the same character, LIFO, per spec §4.1's "share character and length"
/// rule. Star runs and lone underscores match similarly, decomposing
/// asymmetric or long star runs into nested italic/bold per the standard
/// CommonMark rule (underscore never needs decomposition: a clean double
/// is always captured earlier as a custom delimiter, so only singles ever
/// reach this stack).
fn resolve(items: Vec<Item>) -> Vec<Node> {
    let n = items.len();
    let mut custom_pair_of: Vec<Option<usize>> = vec![None; n];
    let mut star_pair_of: Vec<Option<usize>> = vec![None; n];
    let mut underscore_pair_of: Vec<Option<usize>> = vec![None; n];
    let mut custom_stacks: [Vec<usize>; 3] = [Vec::new(), Vec::new(), Vec::new()];
    let mut star_stack: Vec<usize> = Vec::new();
    let mut underscore_stack: Vec<usize> = Vec::new();

    for (i, item) in items.iter().enumerate() {
        match item {
            Item::CustomDelimiter(base) => {
                let stack = &mut custom_stacks[custom_stack_index(*base)];
                if let Some(opener) = stack.pop() {
                    custom_pair_of[opener] = Some(i);
                    custom_pair_of[i] = Some(opener);
                } else {
                    stack.push(i);
                }
            }
            Item::StarRun(_) => {
                if let Some(opener) = star_stack.pop() {
                    star_pair_of[opener] = Some(i);
                    star_pair_of[i] = Some(opener);
                } else {
                    star_stack.push(i);
                }
            }
            Item::UnderscoreMark => {
                if let Some(opener) = underscore_stack.pop() {
                    underscore_pair_of[opener] = Some(i);
                    underscore_pair_of[i] = Some(opener);
                } else {
                    underscore_stack.push(i);
                }
            }
            _ => {}
        }
    }

    build_range(&items, 0, n, &custom_pair_of, &star_pair_of, &underscore_pair_of)
}

fn custom_stack_index(base: MultiCharBase) -> usize {
    match base {
        MultiCharBase::Underscore => 0,
        MultiCharBase::Pipe => 1,
        MultiCharBase::Tilde => 2,
    }
}

/// A pair is only usable at this nesting level if both ends fall inside
/// `[start, end)`: a pair whose partner lies outside the current range
/// would otherwise cross a sibling boundary, which the simple per-character
/// LIFO matching above doesn't guard against for pathological input. When
/// that happens, the delimiter is just treated as unmatched (literal) at
/// this level instead of panicking or producing overlapping trees.
fn pair_in_range(pair_of: &[Option<usize>], i: usize, start: usize, end: usize) -> Option<usize> {
    pair_of[i].filter(|&p| p > i && p < end && i >= start)
}

fn build_range(
    items: &[Item],
    start: usize,
    end: usize,
    custom_pair_of: &[Option<usize>],
    star_pair_of: &[Option<usize>],
    underscore_pair_of: &[Option<usize>],
) -> Vec<Node> {
    let mut out = Vec::new();
    let mut i = start;
    while i < end {
        match &items[i] {
            Item::Text(s) => {
                out.push(Node::Text(s.clone()));
                i += 1;
            }
            Item::Node(node) => {
                out.push(node.clone());
                i += 1;
            }
            Item::CustomDelimiter(base) => {
                if let Some(close) = pair_in_range(custom_pair_of, i, start, end) {
                    let children = build_range(items, i + 1, close, custom_pair_of, star_pair_of, underscore_pair_of);
                    out.push(Node::MultiCharDelimiter { base: *base, children });
                    i = close + 1;
                } else if custom_pair_of[i].is_none() {
                    out.push(Node::Text(raw_custom_delim(*base).to_string()));
                    i += 1;
                } else {
                    i += 1;
                }
            }
            Item::StarRun(len) => {
                if let Some(close) = pair_in_range(star_pair_of, i, start, end) {
                    let close_len = match &items[close] {
                        Item::StarRun(l) => *l,
                        _ => unreachable!("star_pair_of only points at StarRun items"),
                    };
                    let matched = (*len).min(close_len);
                    if *len > matched {
                        out.push(Node::Text("*".repeat((*len - matched) as usize)));
                    }
                    let children = build_range(items, i + 1, close, custom_pair_of, star_pair_of, underscore_pair_of);
                    out.push(wrap_emphasis(matched, children));
                    if close_len > matched {
                        out.push(Node::Text("*".repeat((close_len - matched) as usize)));
                    }
                    i = close + 1;
                } else if star_pair_of[i].is_none() {
                    out.push(Node::Text("*".repeat(*len as usize)));
                    i += 1;
                } else {
                    i += 1;
                }
            }
            Item::UnderscoreMark => {
                if let Some(close) = pair_in_range(underscore_pair_of, i, start, end) {
                    let children = build_range(items, i + 1, close, custom_pair_of, star_pair_of, underscore_pair_of);
                    out.push(Node::Emphasis { level: 1, children });
                    i = close + 1;
                } else if underscore_pair_of[i].is_none() {
                    out.push(Node::Text("_".to_string()));
                    i += 1;
                } else {
                    i += 1;
                }
            }
        }
    }
    merge_adjacent_text(out)
}

/// Decomposes an `n`-long run of matched `*` delimiters into nested
/// emphasis nodes: an odd run peels off one outer italic, then pairs off
/// the rest as nested bold, innermost-first, matching CommonMark's
/// behavior for runs like `***x***` (italic wrapping bold) and `*****x*****`
/// (italic wrapping bold wrapping bold).
fn wrap_emphasis(n: u8, children: Vec<Node>) -> Node {
    if n == 1 {
        return Node::Emphasis { level: 1, children };
    }
    if n % 2 == 1 {
        let inner = wrap_bold_chain(n - 1, children);
        Node::Emphasis { level: 1, children: vec![inner] }
    } else {
        wrap_bold_chain(n, children)
    }
}

fn wrap_bold_chain(mut n: u8, children: Vec<Node>) -> Node {
    let mut cur = Node::Emphasis { level: 2, children };
    n -= 2;
    while n > 0 {
        cur = Node::Emphasis { level: 2, children: vec![cur] };
        n -= 2;
    }
    cur
}

fn merge_adjacent_text(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    for node in nodes {
        match (out.last_mut(), &node) {
            (Some(Node::Text(prev)), Node::Text(next)) => prev.push_str(next),
            _ => out.push(node),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Vec<Node> {
        parse_inline(s)
    }

    #[test]
    fn plain_text() {
        assert_eq!(parse("hello world"), vec![Node::Text("hello world".into())]);
    }

    #[test]
    fn italic() {
        assert_eq!(
            parse("*hello world*"),
            vec![Node::Emphasis { level: 1, children: vec![Node::Text("hello world".into())] }]
        );
    }

    #[test]
    fn link() {
        assert_eq!(
            parse("[hello](world)"),
            vec![Node::Link { destination: "world".into(), children: vec![Node::Text("hello".into())] }]
        );
    }

    #[test]
    fn inline_code() {
        assert_eq!(parse("`hello world`"), vec![Node::CodeSpan("hello world".into())]);
    }

    #[test]
    fn strikethrough() {
        assert_eq!(
            parse("~~hello world~~"),
            vec![Node::MultiCharDelimiter {
                base: MultiCharBase::Tilde,
                children: vec![Node::Text("hello world".into())]
            }]
        );
    }

    #[test]
    fn spoiler() {
        assert_eq!(
            parse("||hello world||"),
            vec![Node::MultiCharDelimiter {
                base: MultiCharBase::Pipe,
                children: vec![Node::Text("hello world".into())]
            }]
        );
    }

    #[test]
    fn underline_with_surrounding_text() {
        assert_eq!(
            parse("start __hello world__ end"),
            vec![
                Node::Text("start ".into()),
                Node::MultiCharDelimiter {
                    base: MultiCharBase::Underscore,
                    children: vec![Node::Text("hello world".into())]
                },
                Node::Text(" end".into()),
            ]
        );
    }

    #[test]
    fn strikethrough_run_edge_cases() {
        let got = parse("~a~ ~hello~ ~~~world~~~ ~~~~~asdf~~~~~");
        let strike = |s: &str| Node::MultiCharDelimiter {
            base: MultiCharBase::Tilde,
            children: vec![Node::Text(s.into())],
        };
        assert_eq!(
            got,
            vec![
                Node::Text("~a~ ~hello~ ".into()),
                strike("~world"),
                Node::Text("~ ".into()),
                strike("~"),
                Node::Text("asdf".into()),
                strike("~"),
            ]
        );
    }

    #[test]
    fn emphasis_run_decomposition() {
        let got = parse("*a* *hello* ***world*** *****asdf*****");
        let italic = |c| Node::Emphasis { level: 1, children: vec![c] };
        let bold = |c| Node::Emphasis { level: 2, children: vec![c] };
        assert_eq!(
            got,
            vec![
                italic(Node::Text("a".into())),
                Node::Text(" ".into()),
                italic(Node::Text("hello".into())),
                Node::Text(" ".into()),
                italic(bold(Node::Text("world".into()))),
                Node::Text(" ".into()),
                italic(bold(bold(Node::Text("asdf".into())))),
            ]
        );
    }

    #[test]
    fn bare_url_is_linkified() {
        assert_eq!(
            parse("see https://example.com/x for more"),
            vec![
                Node::Text("see ".into()),
                Node::Link {
                    destination: "https://example.com/x".into(),
                    children: vec![Node::Text("https://example.com/x".into())]
                },
                Node::Text(" for more".into()),
            ]
        );
    }

    #[test]
    fn autolink() {
        assert_eq!(
            parse("<https://example.com>"),
            vec![Node::AutoLink { url: "https://example.com".into(), label: "https://example.com".into() }]
        );
    }

    #[test]
    fn lone_underscore_is_italic_double_is_underline() {
        let got = parse("_italic__under___");
        assert_eq!(
            got,
            vec![Node::Emphasis {
                level: 1,
                children: vec![
                    Node::Text("italic".into()),
                    Node::MultiCharDelimiter {
                        base: MultiCharBase::Underscore,
                        children: vec![Node::Text("under".into())]
                    }
                ]
            }]
        );
    }

    #[test]
    fn nested_strikethrough_bold_underline_spoiler() {
        let got = parse("~~strike **bold** _italic__under___~~ in ||spoiled **bold**||");
        assert!(matches!(&got[0], Node::MultiCharDelimiter { base: MultiCharBase::Tilde, .. }));
        if let Node::MultiCharDelimiter { children, .. } = &got[0] {
            // strike, bold, the underscore nest, in that order
            assert!(children.iter().any(|n| matches!(n, Node::Emphasis { level: 2, .. })));
            assert!(children.iter().any(|n| matches!(n, Node::Emphasis { level: 1, .. })));
        }
        assert!(matches!(got.last(), Some(Node::MultiCharDelimiter { base: MultiCharBase::Pipe, .. })));
    }
}
