//! Block-level parsing (C2, spec §4.1 block constructs).
//!
//! Works directly on `&str` lines rather than through a separate lexer pass:
//! each line is classified by the handful of leading markers the dialect
//! recognizes, in the priority order spec §4.1 lists (list, fenced code,
//! ATX heading, blockquote, paragraph). Indented code blocks, setext
//! headings, thematic breaks, and raw HTML are not recognized constructs.
//! A line that would trigger one of those in full CommonMark just falls
//! through to the paragraph case.

use super::ast::Node;
use super::inline::parse_inline;

/// Parses the full message body into a `Document` node.
pub fn parse_document(text: &str) -> Node {
    let lines: Vec<&str> = text.split('\n').collect();
    Node::Document(parse_lines(&lines))
}

fn parse_lines(lines: &[&str]) -> Vec<Node> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i];

        if line.trim().is_empty() {
            i += 1;
            continue;
        }

        if let Some(language) = fence_open(line) {
            let mut body_lines = Vec::new();
            let mut j = i + 1;
            while j < lines.len() && !is_fence_close(lines[j]) {
                body_lines.push(lines[j]);
                j += 1;
            }
            out.push(Node::FencedCode { language, body: body_lines.join("\n") });
            i = if j < lines.len() { j + 1 } else { j };
            continue;
        }

        if list_item_content(line).is_some() {
            let mut items = Vec::new();
            let mut j = i;
            while j < lines.len() {
                match list_item_content(lines[j]) {
                    Some(content) => {
                        items.push(Node::ListItem(parse_inline(content)));
                        j += 1;
                    }
                    None => break,
                }
            }
            out.push(Node::List(items));
            i = j;
            continue;
        }

        if let Some((level, content)) = atx_heading(line) {
            out.push(Node::Heading { level, children: parse_inline(content) });
            i += 1;
            continue;
        }

        if is_blockquote_line(line) {
            let mut body_lines = Vec::new();
            let mut j = i;
            while j < lines.len() && is_blockquote_line(lines[j]) {
                body_lines.push(strip_blockquote_marker(lines[j]));
                j += 1;
            }
            out.push(Node::Blockquote(parse_lines(&body_lines)));
            i = j;
            continue;
        }

        let mut para_lines = Vec::new();
        let mut j = i;
        while j < lines.len() {
            let l = lines[j];
            if l.trim().is_empty()
                || fence_open(l).is_some()
                || list_item_content(l).is_some()
                || atx_heading(l).is_some()
                || is_blockquote_line(l)
            {
                break;
            }
            para_lines.push(l);
            j += 1;
        }
        let joined = para_lines.join(" ");
        out.push(Node::Paragraph(parse_inline(&joined)));
        i = j;
    }
    out
}

/// ` ```lang`: returns the (possibly empty) language tag.
fn fence_open(line: &str) -> Option<String> {
    line.strip_prefix("```").map(|rest| rest.trim().to_string())
}

fn is_fence_close(line: &str) -> bool {
    line.trim() == "```"
}

/// `* item` / `- item` / `1. item`: returns the content after the marker.
fn list_item_content(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("* ").or_else(|| line.strip_prefix("- ")) {
        return Some(rest);
    }
    let digits_end = line.find(|c: char| !c.is_ascii_digit()).unwrap_or(0);
    if digits_end > 0 {
        let rest = &line[digits_end..];
        if let Some(content) = rest.strip_prefix(". ") {
            return Some(content);
        }
    }
    None
}

/// `#`, `##`, or `###` followed by a space or end of line. Longer runs are
/// not headings. Levels 4-6 fall through to the paragraph case.
fn atx_heading(line: &str) -> Option<(u8, &str)> {
    let hashes = line.find(|c| c != '#').unwrap_or(line.len());
    if !(1..=3).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if rest.is_empty() {
        return Some((hashes as u8, rest));
    }
    let content = rest.strip_prefix(' ')?;
    Some((hashes as u8, content))
}

fn is_blockquote_line(line: &str) -> bool {
    line.starts_with("> ") || line == ">"
}

fn strip_blockquote_marker(line: &str) -> &str {
    line.strip_prefix("> ").or_else(|| line.strip_prefix('>')).unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_level_clamped_to_three() {
        let doc = parse_document("# 1\n## 2\n### 3\n#### 4");
        let Node::Document(children) = doc else { panic!("expected document") };
        assert_eq!(children.len(), 4);
        assert!(matches!(children[0], Node::Heading { level: 1, .. }));
        assert!(matches!(children[3], Node::Paragraph(_)));
    }

    #[test]
    fn fenced_code_strips_no_language_and_keeps_body() {
        let doc = parse_document("```python\nprint('hello world')\n```");
        let Node::Document(children) = doc else { panic!("expected document") };
        assert_eq!(
            children,
            vec![Node::FencedCode { language: "python".into(), body: "print('hello world')".into() }]
        );
    }

    #[test]
    fn list_items_one_per_line() {
        let doc = parse_document("* hello\n* world");
        let Node::Document(children) = doc else { panic!("expected document") };
        assert_eq!(children.len(), 1);
        assert!(matches!(&children[0], Node::List(items) if items.len() == 2));
    }

    #[test]
    fn blockquote_strips_marker_and_recurses() {
        let doc = parse_document("> # heading\n> text");
        let Node::Document(children) = doc else { panic!("expected document") };
        let Node::Blockquote(inner) = &children[0] else { panic!("expected blockquote") };
        assert!(matches!(inner[0], Node::Heading { level: 1, .. }));
    }
}
