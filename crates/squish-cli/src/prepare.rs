//! Turning source text into the initial search state.

use squish_ast::{loads_to_funcs, minify, parse, validate_tree, Node, State};
use squish_core::{Error, Result};

/// Parses `source`, unpacks `load'...'` strings, shortens names and wraps
/// the chunk in a rendering hint.
pub fn prepare(source: &str) -> Result<State> {
    let root = parse(source)?;
    let root = minify(&loads_to_funcs(&root)?);
    let Node::Block(body) = root else {
        return Err(Error::InvalidState("parsed source is not a chunk".to_string()));
    };
    let root = Node::hint(body);
    validate_tree(&root)?;
    Ok(State::new(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use squish_ast::{render, RenderOptions};

    #[test]
    fn test_prepare_minifies() {
        let state = prepare("local speed = 1\nfunction TIC()\n  speed = speed + 1\nend").unwrap();
        assert!(matches!(state.root, Node::Hint { .. }));
        assert_eq!(
            render(&state.root, RenderOptions::compact()),
            "local z=1TIC=load'z=z+1'"
        );
    }

    #[test]
    fn test_loads_join_the_search() {
        let state = prepare("f=load'return 1+2'").unwrap();
        let Node::Hint { body, .. } = &state.root else {
            panic!("expected a hint");
        };
        let Node::Assign { values, .. } = &body.stats[0] else {
            panic!("expected an assignment");
        };
        assert!(matches!(values[0], Node::Func { .. }));
    }

    #[test]
    fn test_syntax_errors_surface() {
        assert!(matches!(prepare("x = = 1"), Err(Error::Parse { .. })));
    }
}
