//! Generic traversal over syntax trees.
//!
//! Every node exposes its children as one flattened list: nested blocks
//! contribute their statements directly. A [`NodePath`] is the sequence of
//! child indices from the root to a node.

use crate::node::Node;
use squish_core::Result;

pub type NodePath = Vec<u32>;

/// Direct children of `node`, in source order
pub fn children(node: &Node) -> Vec<&Node> {
    let mut out: Vec<&Node> = Vec::new();
    match node {
        Node::Block(block) | Node::Do(block) => out.extend(block.stats.iter()),
        Node::Return(exps) => out.extend(exps.iter()),
        Node::Assign { targets, values } => {
            out.extend(targets.iter());
            out.extend(values.iter());
        }
        Node::While { cond, body } => {
            out.push(cond);
            out.extend(body.stats.iter());
        }
        Node::Repeat { body, cond } => {
            out.extend(body.stats.iter());
            out.push(cond);
        }
        Node::ForRange {
            start,
            stop,
            step,
            body,
            ..
        } => {
            out.push(start);
            out.push(stop);
            if let Some(step) = step {
                out.push(step);
            }
            out.extend(body.stats.iter());
        }
        Node::ForIn { exps, body, .. } => {
            out.extend(exps.iter());
            out.extend(body.stats.iter());
        }
        Node::Local { values, .. } => out.extend(values.iter()),
        Node::LocalFunction { body, .. } | Node::Func { body, .. } => {
            out.extend(body.stats.iter())
        }
        Node::If { cond, then, orelse } => {
            out.push(cond);
            out.extend(then.stats.iter());
            if let Some(orelse) = orelse {
                out.extend(orelse.stats.iter());
            }
        }
        Node::Perm { stats, .. } => out.extend(stats.iter()),
        Node::Hint { body, .. } => out.extend(body.stats.iter()),
        Node::Index { obj, key } => {
            out.push(obj);
            out.push(key);
        }
        Node::Call { func, args } => {
            out.push(func);
            out.extend(args.iter());
        }
        Node::MethodCall { obj, args, .. } => {
            out.push(obj);
            out.extend(args.iter());
        }
        Node::Table(fields) => out.extend(fields.iter()),
        Node::Field { key, value } => {
            if let Some(key) = key {
                out.push(key);
            }
            out.push(value);
        }
        Node::BinOp { left, right, .. } => {
            out.push(left);
            out.push(right);
        }
        Node::UnOp { operand, .. } => out.push(operand),
        Node::Alt(alts) => out.extend(alts.iter()),
        Node::Name(_)
        | Node::Label(_)
        | Node::Goto(_)
        | Node::Break
        | Node::Nil
        | Node::Ellipsis
        | Node::Boolean(_)
        | Node::Str(_)
        | Node::Numeral { .. } => {}
    }
    out
}

/// Mutable counterpart of [`children`], with identical indexing
pub fn children_mut(node: &mut Node) -> Vec<&mut Node> {
    let mut out: Vec<&mut Node> = Vec::new();
    match node {
        Node::Block(block) | Node::Do(block) => out.extend(block.stats.iter_mut()),
        Node::Return(exps) => out.extend(exps.iter_mut()),
        Node::Assign { targets, values } => {
            out.extend(targets.iter_mut());
            out.extend(values.iter_mut());
        }
        Node::While { cond, body } => {
            out.push(cond);
            out.extend(body.stats.iter_mut());
        }
        Node::Repeat { body, cond } => {
            out.extend(body.stats.iter_mut());
            out.push(cond);
        }
        Node::ForRange {
            start,
            stop,
            step,
            body,
            ..
        } => {
            out.push(start);
            out.push(stop);
            if let Some(step) = step {
                out.push(step);
            }
            out.extend(body.stats.iter_mut());
        }
        Node::ForIn { exps, body, .. } => {
            out.extend(exps.iter_mut());
            out.extend(body.stats.iter_mut());
        }
        Node::Local { values, .. } => out.extend(values.iter_mut()),
        Node::LocalFunction { body, .. } | Node::Func { body, .. } => {
            out.extend(body.stats.iter_mut())
        }
        Node::If { cond, then, orelse } => {
            out.push(cond);
            out.extend(then.stats.iter_mut());
            if let Some(orelse) = orelse {
                out.extend(orelse.stats.iter_mut());
            }
        }
        Node::Perm { stats, .. } => out.extend(stats.iter_mut()),
        Node::Hint { body, .. } => out.extend(body.stats.iter_mut()),
        Node::Index { obj, key } => {
            out.push(obj);
            out.push(key);
        }
        Node::Call { func, args } => {
            out.push(func);
            out.extend(args.iter_mut());
        }
        Node::MethodCall { obj, args, .. } => {
            out.push(obj);
            out.extend(args.iter_mut());
        }
        Node::Table(fields) => out.extend(fields.iter_mut()),
        Node::Field { key, value } => {
            if let Some(key) = key {
                out.push(key);
            }
            out.push(value);
        }
        Node::BinOp { left, right, .. } => {
            out.push(left);
            out.push(right);
        }
        Node::UnOp { operand, .. } => out.push(operand),
        Node::Alt(alts) => out.extend(alts.iter_mut()),
        Node::Name(_)
        | Node::Label(_)
        | Node::Goto(_)
        | Node::Break
        | Node::Nil
        | Node::Ellipsis
        | Node::Boolean(_)
        | Node::Str(_)
        | Node::Numeral { .. } => {}
    }
    out
}

/// Node at `path` below `root`
pub fn node_at<'a>(root: &'a Node, path: &[u32]) -> Option<&'a Node> {
    let mut node = root;
    for &index in path {
        node = children(node).into_iter().nth(index as usize)?;
    }
    Some(node)
}

pub fn node_at_mut<'a>(root: &'a mut Node, path: &[u32]) -> Option<&'a mut Node> {
    let mut node = root;
    for &index in path {
        node = children_mut(node).into_iter().nth(index as usize)?;
    }
    Some(node)
}

/// Calls `f` on every node in pre-order together with its path.
pub fn walk<F>(root: &Node, f: &mut F)
where
    F: FnMut(&Node, &[u32]),
{
    let mut path = Vec::new();
    walk_inner(root, &mut path, f);
}

fn walk_inner<F>(node: &Node, path: &mut Vec<u32>, f: &mut F)
where
    F: FnMut(&Node, &[u32]),
{
    f(node, path);
    for (index, child) in children(node).into_iter().enumerate() {
        path.push(index as u32);
        walk_inner(child, path, f);
        path.pop();
    }
}

/// Rewrites the tree bottom-up: children first, then the node itself.
pub fn rewrite<F>(node: &mut Node, f: &mut F) -> Result<()>
where
    F: FnMut(&mut Node) -> Result<()>,
{
    for child in children_mut(node) {
        rewrite(child, f)?;
    }
    f(node)
}

/// Calls `f` on every variable identifier: name references as well as the
/// names bound by locals, loops and function parameters.
pub fn for_each_identifier_mut<F>(node: &mut Node, f: &mut F)
where
    F: FnMut(&mut String),
{
    match node {
        Node::Name(id) => f(id),
        Node::ForRange { var, .. } => f(var),
        Node::ForIn { names, .. } | Node::Local { names, .. } => names.iter_mut().for_each(&mut *f),
        Node::LocalFunction { name, params, .. } => {
            f(name);
            params.iter_mut().for_each(&mut *f);
        }
        Node::Func { params, .. } => params.iter_mut().for_each(&mut *f),
        _ => {}
    }
    for child in children_mut(node) {
        for_each_identifier_mut(child, f);
    }
}

/// Read-only counterpart of [`for_each_identifier_mut`]
pub fn for_each_identifier<F>(node: &Node, f: &mut F)
where
    F: FnMut(&str),
{
    match node {
        Node::Name(id) => f(id.as_str()),
        Node::ForRange { var, .. } => f(var.as_str()),
        Node::ForIn { names, .. } | Node::Local { names, .. } => {
            names.iter().for_each(|n| f(n.as_str()))
        }
        Node::LocalFunction { name, params, .. } => {
            f(name.as_str());
            params.iter().for_each(|n| f(n.as_str()));
        }
        Node::Func { params, .. } => params.iter().for_each(|n| f(n.as_str())),
        _ => {}
    }
    for child in children(node) {
        for_each_identifier(child, f);
    }
}

/// Calls `f` on every label definition and goto target.
pub fn for_each_label_mut<F>(node: &mut Node, f: &mut F)
where
    F: FnMut(&mut String),
{
    if let Node::Label(name) | Node::Goto(name) = node {
        f(name);
    }
    for child in children_mut(node) {
        for_each_label_mut(child, f);
    }
}

pub fn for_each_label<F>(node: &Node, f: &mut F)
where
    F: FnMut(&str),
{
    if let Node::Label(name) | Node::Goto(name) = node {
        f(name.as_str());
    }
    for child in children(node) {
        for_each_label(child, f);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Block;
    use crate::ops::BinaryOp;

    fn sample() -> Node {
        // for i=1,3 do x=i+1 end
        Node::chunk(vec![Node::ForRange {
            var: "i".into(),
            start: Box::new(Node::int(1)),
            stop: Box::new(Node::int(3)),
            step: None,
            body: Block::new(vec![Node::assign(
                vec![Node::name("x")],
                vec![Node::bin(Node::name("i"), BinaryOp::Add, Node::int(1))],
            )]),
        }])
    }

    #[test]
    fn test_node_at() {
        let root = sample();
        assert_eq!(node_at(&root, &[0, 0]), Some(&Node::int(1)));
        assert_eq!(node_at(&root, &[0, 2, 0]), Some(&Node::name("x")));
        assert_eq!(node_at(&root, &[0, 2, 1, 0]), Some(&Node::name("i")));
        assert_eq!(node_at(&root, &[0, 7]), None);
    }

    #[test]
    fn test_walk_paths_resolve() {
        let root = sample();
        let mut count = 0;
        walk(&root, &mut |node, path| {
            assert_eq!(node_at(&root, path), Some(node));
            count += 1;
        });
        assert_eq!(count, 9);
    }

    #[test]
    fn test_node_at_mut() {
        let mut root = sample();
        *node_at_mut(&mut root, &[0, 1]).unwrap() = Node::int(9);
        assert_eq!(node_at(&root, &[0, 1]), Some(&Node::int(9)));
    }

    #[test]
    fn test_identifiers_include_bindings() {
        let mut root = sample();
        let mut seen = Vec::new();
        for_each_identifier(&root, &mut |id| seen.push(id.to_string()));
        assert_eq!(seen, vec!["i", "x", "i"]);

        for_each_identifier_mut(&mut root, &mut |id| {
            if id == "i" {
                *id = "j".into();
            }
        });
        let mut seen = Vec::new();
        for_each_identifier(&root, &mut |id| seen.push(id.to_string()));
        assert_eq!(seen, vec!["j", "x", "j"]);
    }

    #[test]
    fn test_labels() {
        let mut root = Node::chunk(vec![Node::Label("top".into()), Node::Goto("top".into())]);
        for_each_label_mut(&mut root, &mut |name| name.make_ascii_uppercase());
        let mut seen = Vec::new();
        for_each_label(&root, &mut |name| seen.push(name.to_string()));
        assert_eq!(seen, vec!["TOP", "TOP"]);
    }

    #[test]
    fn test_rewrite_bottom_up() {
        let mut root = sample();
        let mut order = Vec::new();
        rewrite(&mut root, &mut |node| {
            if let Node::Numeral { value, .. } = node {
                order.push(value.whole);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(order, vec![1, 3, 1]);
    }
}
