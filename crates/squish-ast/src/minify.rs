//! One-shot rewrites applied before the search starts.

use crate::mutation::is_reserved;
use crate::node::Node;
use crate::parser::parse;
use crate::visit::{for_each_identifier_mut, for_each_label_mut, rewrite};
use squish_core::Result;
use std::collections::HashMap;

/// Short name number `num`, counting from 1: `z`, `y`, ..., `a`, `zz`, `yz`, ...
pub fn short_name(mut num: usize) -> String {
    let mut name = String::new();
    while num > 0 {
        let offset = ((num - 1) % 26) as u8;
        name.push((b'z' - offset) as char);
        num -= 1;
        num /= 26;
    }
    name
}

/// Assigns short names in order of first appearance
#[derive(Default)]
struct Renamer {
    names: HashMap<String, String>,
}

impl Renamer {
    fn rename(&mut self, name: &mut String) {
        if is_reserved(name) {
            return;
        }
        let next = self.names.len() + 1;
        let short = self
            .names
            .entry(name.clone())
            .or_insert_with(|| short_name(next));
        *name = short.clone();
    }
}

/// Renames every identifier and label to a short base-26 name. Reserved
/// globals keep their names.
pub fn minify(root: &Node) -> Node {
    let mut root = root.clone();
    let mut names = Renamer::default();
    for_each_identifier_mut(&mut root, &mut |id| names.rename(id));
    let mut labels = Renamer::default();
    for_each_label_mut(&mut root, &mut |name| labels.rename(name));
    root
}

/// Turns `load'...'` calls with a literal string back into function nodes so
/// that their bodies take part in the search.
///
/// Strings that are not UTF-8 or do not parse as Lua are left alone.
pub fn loads_to_funcs(root: &Node) -> Result<Node> {
    let mut root = root.clone();
    rewrite(&mut root, &mut |node| {
        let Node::Call { func, args } = node else {
            return Ok(());
        };
        let source = match (func.as_ref(), args.as_slice()) {
            (Node::Name(callee), [Node::Str(source)]) if callee == "load" => source,
            _ => return Ok(()),
        };
        let Ok(source) = std::str::from_utf8(source) else {
            return Ok(());
        };
        let body = match parse(source) {
            Ok(Node::Block(body)) => body,
            Ok(_) => return Ok(()),
            Err(err) => {
                tracing::debug!(%err, "keeping load call with unparsable string");
                return Ok(());
            }
        };
        if let Node::Block(body) = loads_to_funcs(&Node::Block(body))? {
            *node = Node::Func {
                params: Vec::new(),
                vararg: false,
                body,
                oneline: true,
            };
        }
        Ok(())
    })?;
    Ok(root)
}
