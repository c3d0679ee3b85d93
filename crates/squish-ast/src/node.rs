//! Syntax tree of a Lua program.

use crate::numeral::Numeral;
use crate::ops::{BinaryOp, UnaryOp, ALT_PRECEDENCE, UNARY_PRECEDENCE};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The node a synthesized node replaced, if any.
///
/// Ignored by structural equality: two trees that render the same compare
/// equal whatever their history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Origin(pub Option<Arc<Node>>);

impl Origin {
    pub fn none() -> Self {
        Origin(None)
    }

    pub fn of(node: Node) -> Self {
        Origin(Some(Arc::new(node)))
    }

    pub fn get(&self) -> Option<&Node> {
        self.0.as_deref()
    }

    pub fn is_some(&self) -> bool {
        self.0.is_some()
    }
}

impl PartialEq for Origin {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

/// List of statements
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stats: Vec<Node>,
}

impl Block {
    pub fn new(stats: Vec<Node>) -> Self {
        Self { stats }
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn len(&self) -> usize {
        self.stats.len()
    }
}

impl From<Vec<Node>> for Block {
    fn from(stats: Vec<Node>) -> Self {
        Self { stats }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Chunk or nested block used as a statement list
    Block(Block),
    Name(String),
    Label(String),
    Goto(String),
    Break,
    Nil,
    Ellipsis,
    Boolean(bool),
    /// Raw bytes; Lua strings need not be UTF-8
    Str(Vec<u8>),
    Numeral {
        value: Numeral,
        origin: Origin,
    },
    Return(Vec<Node>),
    Do(Block),
    Assign {
        targets: Vec<Node>,
        values: Vec<Node>,
    },
    While {
        cond: Box<Node>,
        body: Block,
    },
    Repeat {
        body: Block,
        cond: Box<Node>,
    },
    ForRange {
        var: String,
        start: Box<Node>,
        stop: Box<Node>,
        step: Option<Box<Node>>,
        body: Block,
    },
    ForIn {
        names: Vec<String>,
        exps: Vec<Node>,
        body: Block,
    },
    Local {
        names: Vec<String>,
        values: Vec<Node>,
    },
    LocalFunction {
        name: String,
        params: Vec<String>,
        vararg: bool,
        body: Block,
    },
    /// Function expression. `oneline` selects the compact `load'...'`
    /// rendering when the function takes no named parameters.
    Func {
        params: Vec<String>,
        vararg: bool,
        body: Block,
        oneline: bool,
    },
    If {
        cond: Box<Node>,
        then: Block,
        orelse: Option<Block>,
    },
    /// Statements that may be freely reordered
    Perm {
        stats: Vec<Node>,
        allow_reorder: bool,
    },
    /// Rendering hints; only valid at the root
    Hint {
        body: Block,
        no_hex: bool,
        double_quotes: bool,
    },
    Index {
        obj: Box<Node>,
        key: Box<Node>,
    },
    Call {
        func: Box<Node>,
        args: Vec<Node>,
    },
    MethodCall {
        obj: Box<Node>,
        method: String,
        args: Vec<Node>,
    },
    /// Table constructor; every entry is a `Field`
    Table(Vec<Node>),
    Field {
        key: Option<Box<Node>>,
        value: Box<Node>,
    },
    BinOp {
        left: Box<Node>,
        op: BinaryOp,
        right: Box<Node>,
    },
    UnOp {
        op: UnaryOp,
        operand: Box<Node>,
    },
    /// Equivalent expressions; the first one is active
    Alt(Vec<Node>),
}

impl Node {
    pub fn name(id: impl Into<String>) -> Self {
        Node::Name(id.into())
    }

    pub fn str(value: impl Into<Vec<u8>>) -> Self {
        Node::Str(value.into())
    }

    pub fn numeral(value: Numeral) -> Self {
        Node::Numeral {
            value,
            origin: Origin::none(),
        }
    }

    pub fn int(value: u64) -> Self {
        Self::numeral(Numeral::integer(value))
    }

    pub fn bin(left: Node, op: BinaryOp, right: Node) -> Self {
        Node::BinOp {
            left: Box::new(left),
            op,
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Node) -> Self {
        Node::UnOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn assign(targets: Vec<Node>, values: Vec<Node>) -> Self {
        Node::Assign { targets, values }
    }

    pub fn call(func: Node, args: Vec<Node>) -> Self {
        Node::Call {
            func: Box::new(func),
            args,
        }
    }

    pub fn index(obj: Node, key: Node) -> Self {
        Node::Index {
            obj: Box::new(obj),
            key: Box::new(key),
        }
    }

    pub fn chunk(stats: Vec<Node>) -> Self {
        Node::Block(Block::new(stats))
    }

    /// Wraps a chunk in the default rendering hints.
    pub fn hint(body: Block) -> Self {
        Node::Hint {
            body,
            no_hex: true,
            double_quotes: false,
        }
    }

    /// Binding strength when printed; lower binds tighter and 0 never needs
    /// parentheses.
    pub fn precedence(&self) -> u8 {
        match self {
            Node::BinOp { op, .. } => op.precedence(),
            Node::UnOp { .. } => UNARY_PRECEDENCE,
            Node::Alt(alts) => alts
                .first()
                .map(Node::precedence)
                .unwrap_or(ALT_PRECEDENCE),
            _ => 0,
        }
    }

    pub fn as_numeral(&self) -> Option<&Numeral> {
        match self {
            Node::Numeral { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Whether this is the numeral literal `n` written plainly
    pub fn is_int(&self, n: u64) -> bool {
        matches!(self.as_numeral(), Some(num) if *num == Numeral::integer(n))
    }

    /// Whether this node may directly precede `.`, `[`, `:` or call arguments
    /// without parentheses.
    pub fn is_prefix_exp(&self) -> bool {
        matches!(
            self,
            Node::Name(_) | Node::Index { .. } | Node::Call { .. } | Node::MethodCall { .. }
        )
    }

    /// Statements of the root chunk, looking through a root `Hint`
    pub fn root_stats(&self) -> &[Node] {
        match self {
            Node::Block(block) | Node::Hint { body: block, .. } => &block.stats,
            _ => std::slice::from_ref(self),
        }
    }

    /// Node this one replaced, for synthesized nodes
    pub fn origin(&self) -> Option<&Node> {
        match self {
            Node::Numeral { origin, .. } => origin.get(),
            _ => None,
        }
    }

    pub fn clear_origin(&mut self) {
        if let Node::Numeral { origin, .. } = self {
            origin.0 = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_ignores_origin() {
        let plain = Node::int(3);
        let folded = Node::Numeral {
            value: Numeral::integer(3),
            origin: Origin::of(Node::bin(Node::int(1), BinaryOp::Add, Node::int(2))),
        };
        assert_eq!(plain, folded);
        assert!(folded.origin().is_some());
        assert!(plain.origin().is_none());
    }

    #[test]
    fn test_precedence() {
        let sum = Node::bin(Node::name("a"), BinaryOp::Add, Node::name("b"));
        assert_eq!(sum.precedence(), 4);
        assert_eq!(Node::unary(UnaryOp::Neg, Node::name("a")).precedence(), 2);
        assert_eq!(Node::Alt(vec![sum.clone(), Node::name("c")]).precedence(), 4);
        assert_eq!(Node::name("a").precedence(), 0);
    }

    #[test]
    fn test_clear_origin() {
        let mut node = Node::Numeral {
            value: Numeral::integer(3),
            origin: Origin::of(Node::Nil),
        };
        node.clear_origin();
        assert!(node.origin().is_none());
    }

    #[test]
    fn test_root_stats() {
        let root = Node::hint(Block::new(vec![Node::Break]));
        assert_eq!(root.root_stats(), &[Node::Break]);
        assert!(Node::int(1).is_int(1));
        assert!(!Node::numeral(Numeral::hex_integer(1)).is_int(1));
    }
}
