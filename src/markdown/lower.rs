//! AST → Block lowering (C3, spec §4.2).
//!
//! A structural post-order recursion over the AST. The only interesting
//! rule is the canonical collapse: `maybe_container` is applied at every
//! group-emitting site (`Document`, `Paragraph`, `TextBlock`, `ListItem`),
//! so a `Container` in the output tree never has exactly one child.

use crate::block::Block;
use crate::error::ParseError;

use super::ast::{MultiCharBase, Node};

/// Lowers a single AST node into a `Block`, or reports the node kind if
/// lowering doesn't know how to handle it, which would be a parser bug,
/// since the parser is only supposed to ever produce the kinds this
/// function matches.
pub fn lower(node: &Node) -> Result<Block, ParseError> {
    let block = match node {
        Node::Document(children) | Node::Paragraph(children) | Node::TextBlock(children) | Node::ListItem(children) => {
            Block::maybe_container(lower_all(children)?)
        }
        Node::Text(s) => Block::Text(s.clone()),
        Node::CodeSpan(s) => Block::InlineCode(s.clone()),
        Node::FencedCode { language, body } => {
            Block::FencedCode { language: language.clone(), body: body.clone() }
        }
        Node::Blockquote(children) => Block::Blockquote(lower_all(children)?),
        Node::Link { destination, children } => {
            Block::Link { destination: destination.clone(), label: lower_all(children)? }
        }
        Node::AutoLink { url, label } => Block::Link { destination: url.clone(), label: vec![Block::Text(label.clone())] },
        Node::List(children) => Block::List(lower_all(children)?),
        Node::Heading { level, children } => Block::Heading { level: *level, children: lower_all(children)? },
        Node::Emphasis { level, children } => {
            let children = lower_all(children)?;
            if *level == 2 {
                Block::Bold(children)
            } else {
                Block::Italic(children)
            }
        }
        Node::MultiCharDelimiter { base, children } => {
            let children = lower_all(children)?;
            match base {
                MultiCharBase::Tilde => Block::Strikethrough(children),
                MultiCharBase::Pipe => Block::Spoiler(children),
                MultiCharBase::Underscore => Block::Underline(children),
            }
        }
    };
    Ok(block)
}

fn lower_all(nodes: &[Node]) -> Result<Vec<Block>, ParseError> {
    nodes.iter().map(lower).collect()
}
