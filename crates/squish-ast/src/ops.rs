//! Operators and their precedence.

use crate::numeral::MAX_EXACT_INTEGER;
use serde::{Deserialize, Serialize};

/// Precedence of alternatives; binds tightest
pub const ALT_PRECEDENCE: u8 = 1;
/// Precedence of unary operators, shared with `^`
pub const UNARY_PRECEDENCE: u8 = 2;

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Pow,
    Mul,
    Div,
    IDiv,
    Mod,
    Add,
    Sub,
    Concat,
    Shl,
    Shr,
    BAnd,
    BXor,
    BOr,
    Lt,
    Gt,
    Le,
    Ge,
    Ne,
    Eq,
    And,
    Or,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 21] = [
        BinaryOp::Pow,
        BinaryOp::Mul,
        BinaryOp::Div,
        BinaryOp::IDiv,
        BinaryOp::Mod,
        BinaryOp::Add,
        BinaryOp::Sub,
        BinaryOp::Concat,
        BinaryOp::Shl,
        BinaryOp::Shr,
        BinaryOp::BAnd,
        BinaryOp::BXor,
        BinaryOp::BOr,
        BinaryOp::Lt,
        BinaryOp::Gt,
        BinaryOp::Le,
        BinaryOp::Ge,
        BinaryOp::Ne,
        BinaryOp::Eq,
        BinaryOp::And,
        BinaryOp::Or,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Pow => "^",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::IDiv => "//",
            BinaryOp::Mod => "%",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Concat => "..",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BAnd => "&",
            BinaryOp::BXor => "~",
            BinaryOp::BOr => "|",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Ne => "~=",
            BinaryOp::Eq => "==",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|op| op.symbol() == symbol)
    }

    /// Lower binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Pow => 2,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::IDiv | BinaryOp::Mod => 3,
            BinaryOp::Add | BinaryOp::Sub => 4,
            BinaryOp::Concat => 5,
            BinaryOp::Shl | BinaryOp::Shr => 6,
            BinaryOp::BAnd => 7,
            BinaryOp::BXor => 8,
            BinaryOp::BOr => 9,
            BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge
            | BinaryOp::Ne
            | BinaryOp::Eq => 10,
            BinaryOp::And => 11,
            BinaryOp::Or => 12,
        }
    }

    pub fn is_right_assoc(&self) -> bool {
        matches!(self, BinaryOp::Pow | BinaryOp::Concat)
    }

    /// Operator giving the same result with swapped operands, for comparisons
    pub fn mirrored(&self) -> Option<Self> {
        match self {
            BinaryOp::Lt => Some(BinaryOp::Gt),
            BinaryOp::Gt => Some(BinaryOp::Lt),
            BinaryOp::Le => Some(BinaryOp::Ge),
            BinaryOp::Ge => Some(BinaryOp::Le),
            BinaryOp::Ne => Some(BinaryOp::Ne),
            BinaryOp::Eq => Some(BinaryOp::Eq),
            _ => None,
        }
    }

    /// Whether `self` and `other` can trade places in a left-leaning chain
    /// such as `a+b-c`
    pub fn same_family(&self, other: BinaryOp) -> bool {
        match self {
            BinaryOp::Add | BinaryOp::Sub => matches!(other, BinaryOp::Add | BinaryOp::Sub),
            BinaryOp::Mul | BinaryOp::Div => matches!(other, BinaryOp::Mul | BinaryOp::Div),
            BinaryOp::BAnd | BinaryOp::BOr | BinaryOp::BXor => *self == other,
            _ => false,
        }
    }

    /// Operators whose chains can be re-associated
    pub fn is_reassociable(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add
                | BinaryOp::Sub
                | BinaryOp::Mul
                | BinaryOp::Div
                | BinaryOp::BAnd
                | BinaryOp::BOr
                | BinaryOp::BXor
        )
    }

    pub fn is_commutative(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Mul | BinaryOp::BAnd | BinaryOp::BOr | BinaryOp::BXor
        )
    }

    /// Evaluates the operator on two constants with Lua float semantics.
    ///
    /// Returns `None` for operators that cannot be folded and for bitwise
    /// operators on non-integral operands.
    pub fn fold(&self, l: f64, r: f64) -> Option<f64> {
        let integral = |v: f64| v.fract() == 0.0 && v >= 0.0 && v <= MAX_EXACT_INTEGER;
        let value = match self {
            BinaryOp::Add => l + r,
            BinaryOp::Sub => l - r,
            BinaryOp::Mul => l * r,
            BinaryOp::Div => l / r,
            BinaryOp::IDiv => (l / r).floor(),
            BinaryOp::Mod => l - (l / r).floor() * r,
            BinaryOp::Pow => l.powf(r),
            BinaryOp::BAnd if integral(l) && integral(r) => ((l as u64) & (r as u64)) as f64,
            BinaryOp::BOr if integral(l) && integral(r) => ((l as u64) | (r as u64)) as f64,
            BinaryOp::BXor if integral(l) && integral(r) => ((l as u64) ^ (r as u64)) as f64,
            _ => return None,
        };
        Some(value)
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Len,
    Neg,
    BNot,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Not => "not",
            UnaryOp::Len => "#",
            UnaryOp::Neg => "-",
            UnaryOp::BNot => "~",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "not" => Some(UnaryOp::Not),
            "#" => Some(UnaryOp::Len),
            "-" => Some(UnaryOp::Neg),
            "~" => Some(UnaryOp::BNot),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_round_trip() {
        for op in BinaryOp::ALL {
            assert_eq!(BinaryOp::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(BinaryOp::from_symbol("=>"), None);
        assert_eq!(UnaryOp::from_symbol("#"), Some(UnaryOp::Len));
    }

    #[test]
    fn test_precedence_order() {
        assert!(BinaryOp::Pow.precedence() < BinaryOp::Mul.precedence());
        assert!(BinaryOp::Mul.precedence() < BinaryOp::Add.precedence());
        assert!(BinaryOp::BAnd.precedence() < BinaryOp::BXor.precedence());
        assert!(BinaryOp::Eq.precedence() < BinaryOp::And.precedence());
        assert_eq!(BinaryOp::Pow.precedence(), UNARY_PRECEDENCE);
    }

    #[test]
    fn test_mirrored() {
        assert_eq!(BinaryOp::Lt.mirrored(), Some(BinaryOp::Gt));
        assert_eq!(BinaryOp::Ge.mirrored(), Some(BinaryOp::Le));
        assert_eq!(BinaryOp::Eq.mirrored(), Some(BinaryOp::Eq));
        assert_eq!(BinaryOp::Add.mirrored(), None);
    }

    #[test]
    fn test_families() {
        assert!(BinaryOp::Add.same_family(BinaryOp::Sub));
        assert!(BinaryOp::Div.same_family(BinaryOp::Mul));
        assert!(!BinaryOp::Add.same_family(BinaryOp::Mul));
        assert!(BinaryOp::BXor.same_family(BinaryOp::BXor));
        assert!(!BinaryOp::BAnd.same_family(BinaryOp::BOr));
        assert!(!BinaryOp::Sub.is_commutative());
    }

    #[test]
    fn test_fold() {
        assert_eq!(BinaryOp::Add.fold(1.0, 2.0), Some(3.0));
        assert_eq!(BinaryOp::IDiv.fold(7.0, 2.0), Some(3.0));
        assert_eq!(BinaryOp::Mod.fold(-1.0, 3.0), Some(2.0));
        assert_eq!(BinaryOp::Pow.fold(2.0, 10.0), Some(1024.0));
        assert_eq!(BinaryOp::BXor.fold(6.0, 3.0), Some(5.0));
        assert_eq!(BinaryOp::BAnd.fold(0.5, 3.0), None);
        assert_eq!(BinaryOp::Concat.fold(1.0, 2.0), None);
    }
}
