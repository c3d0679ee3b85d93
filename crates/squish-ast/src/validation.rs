//! Well-formedness checks for syntax trees.

use crate::lexer::is_identifier;
use crate::node::Node;
use crate::visit::{children, walk};
use squish_core::{Error, Result};

/// Validate that a tree can be rendered and parsed back
pub fn validate_tree(root: &Node) -> Result<()> {
    if !matches!(root, Node::Block(_) | Node::Hint { .. }) {
        return Err(Error::InvalidState("root must be a block".to_string()));
    }
    if let Node::Hint { body, .. } = root {
        for stat in &body.stats {
            check_no_hint(stat)?;
        }
    } else {
        for child in children(root) {
            check_no_hint(child)?;
        }
    }

    let mut result = Ok(());
    walk(root, &mut |node, path| {
        if result.is_ok() {
            result = validate_node(node).map_err(|e| match e {
                Error::InvalidState(msg) => Error::InvalidState(format!("{msg} at {path:?}")),
                other => other,
            });
        }
    });
    result
}

fn check_no_hint(node: &Node) -> Result<()> {
    let mut found = false;
    walk(node, &mut |n, _| found |= matches!(n, Node::Hint { .. }));
    if found {
        return Err(Error::InvalidState(
            "rendering hints are only allowed at the root".to_string(),
        ));
    }
    Ok(())
}

fn check_identifier(name: &str) -> Result<()> {
    if !is_identifier(name) {
        return Err(Error::InvalidState(format!("invalid identifier '{name}'")));
    }
    Ok(())
}

fn validate_node(node: &Node) -> Result<()> {
    match node {
        Node::Name(name) | Node::Label(name) | Node::Goto(name) => check_identifier(name),
        Node::ForRange { var, .. } => check_identifier(var),
        Node::ForIn { names, exps, .. } => {
            if names.is_empty() || exps.is_empty() {
                return Err(Error::InvalidState("generic for needs names and values".into()));
            }
            names.iter().try_for_each(|n| check_identifier(n))
        }
        Node::Local { names, .. } => {
            if names.is_empty() {
                return Err(Error::InvalidState("local without names".into()));
            }
            names.iter().try_for_each(|n| check_identifier(n))
        }
        Node::LocalFunction { name, params, .. } => {
            check_identifier(name)?;
            params.iter().try_for_each(|n| check_identifier(n))
        }
        Node::Func { params, .. } => params.iter().try_for_each(|n| check_identifier(n)),
        Node::MethodCall { method, .. } => check_identifier(method),
        Node::Assign { targets, values } => {
            if targets.is_empty() || values.is_empty() {
                return Err(Error::InvalidState(format!(
                    "assignment of {} values to {} targets",
                    values.len(),
                    targets.len()
                )));
            }
            if let Some(target) = targets
                .iter()
                .find(|t| !matches!(t, Node::Name(_) | Node::Index { .. }))
            {
                return Err(Error::InvalidState(format!(
                    "cannot assign to {target:?}"
                )));
            }
            Ok(())
        }
        Node::Alt(alts) if alts.is_empty() => {
            Err(Error::InvalidState("alternative without options".into()))
        }
        Node::Table(fields) => {
            if fields.iter().all(|f| matches!(f, Node::Field { .. })) {
                Ok(())
            } else {
                Err(Error::InvalidState("table entry is not a field".into()))
            }
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Block;
    use crate::parser::parse;

    #[test]
    fn test_parsed_programs_are_valid() {
        for src in [
            "x=1",
            "local a,b=1 for i=1,2 do a=a+i end",
            "function t:m(x) return self end",
            "::l:: goto l",
            "b=(c+d)--|(d+c)",
        ] {
            assert!(validate_tree(&parse(src).unwrap()).is_ok(), "{src}");
        }
    }

    #[test]
    fn test_hint_only_at_root() {
        let inner = Node::hint(Block::new(vec![Node::Break]));
        assert!(validate_tree(&Node::hint(Block::new(vec![Node::Break]))).is_ok());
        assert!(validate_tree(&Node::chunk(vec![inner.clone()])).is_err());
        assert!(validate_tree(&Node::hint(Block::new(vec![Node::Do(Block::new(vec![inner]))])))
            .is_err());
    }

    #[test]
    fn test_rejects_malformed_nodes() {
        let bad_name = Node::chunk(vec![Node::assign(vec![Node::name("1x")], vec![Node::int(1)])]);
        assert!(validate_tree(&bad_name).is_err());

        let keyword = Node::chunk(vec![Node::assign(vec![Node::name("end")], vec![Node::int(1)])]);
        assert!(validate_tree(&keyword).is_err());

        let no_values = Node::chunk(vec![Node::assign(vec![Node::name("x")], vec![])]);
        assert!(validate_tree(&no_values).is_err());

        let call_target = Node::chunk(vec![Node::assign(
            vec![Node::call(Node::name("f"), vec![])],
            vec![Node::int(1)],
        )]);
        assert!(validate_tree(&call_target).is_err());

        let empty_alt = Node::chunk(vec![Node::assign(vec![Node::name("x")], vec![Node::Alt(vec![])])]);
        let err = validate_tree(&empty_alt).unwrap_err();
        assert!(err.to_string().contains("[0, 1]"));

        assert!(validate_tree(&Node::int(1)).is_err());
    }
}
