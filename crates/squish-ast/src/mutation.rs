//! Mutation catalogue for Lua syntax trees.
//!
//! Every mutation preserves the meaning of the program by construction. A
//! [`Mutator`] enumerates the mutations applicable to a state, picks one
//! uniformly and applies it to a private clone.

use crate::node::{Node, Origin};
use crate::numeral::Numeral;
use crate::ops::BinaryOp;
use crate::state::State;
use crate::visit::{
    for_each_identifier, for_each_identifier_mut, for_each_label, for_each_label_mut, node_at_mut,
    walk, NodePath,
};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use squish_core::{Error, Result};
use std::collections::BTreeSet;

/// Globals of Lua and the TIC-80 API. Never renamed.
pub const RESERVED: &[&str] = &[
    "_G", "BDR", "SCN", "BOOT", "TIC", "OVR", "MENU", "_VERSION", "assert", "btn", "btnp",
    "circ", "circb", "clip", "cls", "collectgarbage", "coroutine", "debug", "dofile", "elli",
    "ellib", "error", "exit", "fget", "font", "fset", "getmetatable", "ipairs", "key", "keyp",
    "line", "load", "loadfile", "map", "math", "memcpy", "memset", "mget", "mouse", "mset",
    "music", "next", "package", "pairs", "pcall", "peek", "peek1", "peek2", "peek4", "pix",
    "pmem", "poke", "poke1", "poke2", "poke4", "print", "rawequal", "rawget", "rawlen",
    "rawset", "rect", "rectb", "require", "reset", "select", "self", "setmetatable", "sfx",
    "spr", "str", "string", "sync", "table", "textri", "time", "tonumber", "tostring", "trace",
    "tri", "trib", "tstamp", "ttri", "type", "vbank", "xpcall",
];

pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
}

/// Single-letter names offered as swap partners
fn candidate_names() -> impl Iterator<Item = String> {
    ('a'..='z').map(String::from)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Offer swaps of the data sections
    pub reorder_sections: bool,
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self {
            reorder_sections: true,
        }
    }
}

/// One applicable mutation. Paths address nodes as in [`crate::visit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// `a<b` to `b>a`
    FlipComparison { path: NodePath },
    /// Swaps operator and right operand between the top of a chain and the
    /// node `depth` steps down its left spine
    Reassociate { path: NodePath, depth: u32 },
    /// Swaps the top right operand with the left operand of the node
    /// `depth` steps down the left spine
    CommuteInnermost { path: NodePath, depth: u32 },
    SquareToPower { path: NodePath },
    PowerToSquare { path: NodePath },
    FoldConstant { path: NodePath, value: Numeral },
    /// Makes alternative `index` the active one
    RotateAlternative { path: NodePath, index: usize },
    SwapStatements { path: NodePath, i: usize, j: usize },
    ToggleRendering { path: NodePath },
    ToggleStep { path: NodePath },
    ToggleQuotes { path: NodePath },
    ToggleHex { path: NodePath },
    /// Restores the node a synthesized node replaced
    Revert { path: NodePath },
    SwapNames { a: String, b: String },
    SwapLabels { a: String, b: String },
    SwapSections { i: usize, j: usize },
}

pub struct Mutator {
    config: MutationConfig,
}

impl Mutator {
    pub fn new(config: MutationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MutationConfig {
        &self.config
    }

    /// Every mutation currently applicable to `state`, in a stable order:
    /// tree mutations in pre-order, then names, labels and sections.
    pub fn catalogue(&self, state: &State) -> Vec<Mutation> {
        let mut mutations = Vec::new();
        walk(&state.root, &mut |node, path| {
            node_mutations(node, path, &mut mutations)
        });

        let mut names = BTreeSet::new();
        for_each_identifier(&state.root, &mut |id| {
            if !is_reserved(id) {
                names.insert(id.to_string());
            }
        });
        for a in &names {
            for b in candidate_names().filter(|b| b != a) {
                mutations.push(Mutation::SwapNames { a: a.clone(), b });
            }
        }

        let mut labels = BTreeSet::new();
        for_each_label(&state.root, &mut |name| {
            labels.insert(name.to_string());
        });
        for a in &labels {
            for b in candidate_names().filter(|b| b != a) {
                mutations.push(Mutation::SwapLabels { a: a.clone(), b });
            }
        }

        if self.config.reorder_sections {
            if let Some(sections) = &state.sections {
                for i in 0..sections.len() {
                    for j in i + 1..sections.len() {
                        mutations.push(Mutation::SwapSections { i, j });
                    }
                }
            }
        }
        mutations
    }

    /// Applies `mutation` to `state` in place.
    pub fn apply(&self, state: &mut State, mutation: &Mutation) -> Result<()> {
        match mutation {
            Mutation::SwapNames { a, b } => {
                for_each_identifier_mut(&mut state.root, &mut |id| swap_name(id, a, b));
                Ok(())
            }
            Mutation::SwapLabels { a, b } => {
                for_each_label_mut(&mut state.root, &mut |name| swap_name(name, a, b));
                Ok(())
            }
            Mutation::SwapSections { i, j } => {
                let sections = state
                    .sections
                    .as_mut()
                    .filter(|s| *i < s.len() && *j < s.len())
                    .ok_or_else(|| Error::InvalidState(format!("no sections {i} and {j}")))?;
                sections.swap(*i, *j);
                Ok(())
            }
            _ => apply_at(&mut state.root, mutation),
        }
    }

    /// Clones `state` and applies one uniformly chosen mutation to the
    /// clone. A state without applicable mutations comes back unchanged.
    pub fn mutate(&self, state: &State, rng: &mut ChaCha8Rng) -> Result<State> {
        let mut next = state.clone();
        let mutations = self.catalogue(&next);
        if mutations.is_empty() {
            return Ok(next);
        }
        let mutation = &mutations[rng.gen_range(0..mutations.len())];
        tracing::trace!(?mutation, choices = mutations.len(), "applying mutation");
        self.apply(&mut next, mutation)?;
        Ok(next)
    }
}

impl Default for Mutator {
    fn default() -> Self {
        Self::new(MutationConfig::default())
    }
}

fn swap_name(name: &mut String, a: &str, b: &str) {
    if name == a {
        *name = b.to_string();
    } else if name == b {
        *name = a.to_string();
    }
}

fn node_mutations(node: &Node, path: &[u32], out: &mut Vec<Mutation>) {
    let path = path.to_vec();
    match node {
        Node::BinOp { left, op, right } => {
            if op.mirrored().is_some() {
                out.push(Mutation::FlipComparison { path: path.clone() });
            }
            if op.is_reassociable() {
                let mut spine = left.as_ref();
                let mut depth = 0;
                while let Node::BinOp {
                    left: next,
                    op: spine_op,
                    ..
                } = spine
                {
                    if !op.same_family(*spine_op) {
                        break;
                    }
                    depth += 1;
                    out.push(Mutation::Reassociate {
                        path: path.clone(),
                        depth,
                    });
                    spine = next.as_ref();
                }
                if op.is_commutative() {
                    out.push(Mutation::CommuteInnermost {
                        path: path.clone(),
                        depth,
                    });
                }
            }
            if *op == BinaryOp::Mul && left == right {
                out.push(Mutation::SquareToPower { path: path.clone() });
            }
            if *op == BinaryOp::Pow && right.is_int(2) {
                out.push(Mutation::PowerToSquare { path: path.clone() });
            }
            if let (Some(l), Some(r)) = (left.as_numeral(), right.as_numeral()) {
                if let Some(value) = op.fold(l.value(), r.value()).and_then(Numeral::from_exact) {
                    out.push(Mutation::FoldConstant {
                        path: path.clone(),
                        value,
                    });
                }
            }
        }
        Node::Alt(alts) => {
            for index in 1..alts.len() {
                out.push(Mutation::RotateAlternative {
                    path: path.clone(),
                    index,
                });
            }
        }
        Node::Perm {
            stats,
            allow_reorder: true,
        } => {
            for i in 0..stats.len() {
                for j in i + 1..stats.len() {
                    out.push(Mutation::SwapStatements {
                        path: path.clone(),
                        i,
                        j,
                    });
                }
            }
        }
        Node::Func { params, .. } if params.is_empty() => {
            out.push(Mutation::ToggleRendering { path: path.clone() });
        }
        Node::ForRange { step, .. } if step.as_deref().map_or(true, |s| s.is_int(1)) => {
            out.push(Mutation::ToggleStep { path: path.clone() });
        }
        Node::Hint { .. } => {
            out.push(Mutation::ToggleQuotes { path: path.clone() });
            out.push(Mutation::ToggleHex { path: path.clone() });
        }
        _ => {}
    }
    if node.origin().is_some() && !path.is_empty() {
        out.push(Mutation::Revert { path });
    }
}

/// Follows `steps` left children down a chain of binary operators.
fn left_spine_mut(mut node: &mut Node, steps: u32) -> Option<&mut Node> {
    for _ in 0..steps {
        node = match node {
            Node::BinOp { left, .. } => &mut **left,
            _ => return None,
        };
    }
    Some(node)
}

fn mismatch(mutation: &Mutation) -> Error {
    Error::InvalidState(format!("mutation does not apply: {mutation:?}"))
}

fn apply_at(root: &mut Node, mutation: &Mutation) -> Result<()> {
    let path = match mutation {
        Mutation::FlipComparison { path }
        | Mutation::Reassociate { path, .. }
        | Mutation::CommuteInnermost { path, .. }
        | Mutation::SquareToPower { path }
        | Mutation::PowerToSquare { path }
        | Mutation::FoldConstant { path, .. }
        | Mutation::RotateAlternative { path, .. }
        | Mutation::SwapStatements { path, .. }
        | Mutation::ToggleRendering { path }
        | Mutation::ToggleStep { path }
        | Mutation::ToggleQuotes { path }
        | Mutation::ToggleHex { path }
        | Mutation::Revert { path } => path,
        Mutation::SwapNames { .. } | Mutation::SwapLabels { .. } | Mutation::SwapSections { .. } => {
            return Err(mismatch(mutation))
        }
    };
    let node = node_at_mut(root, path).ok_or_else(|| mismatch(mutation))?;

    match (mutation, node) {
        (Mutation::FlipComparison { .. }, Node::BinOp { left, op, right }) => {
            *op = op.mirrored().ok_or_else(|| mismatch(mutation))?;
            std::mem::swap(left, right);
        }
        (Mutation::Reassociate { depth, .. }, Node::BinOp { left, op, right }) => {
            let spine = depth
                .checked_sub(1)
                .and_then(|steps| left_spine_mut(left, steps))
                .ok_or_else(|| mismatch(mutation))?;
            let Node::BinOp {
                op: spine_op,
                right: spine_right,
                ..
            } = spine
            else {
                return Err(mismatch(mutation));
            };
            std::mem::swap(op, spine_op);
            std::mem::swap(right, spine_right);
        }
        (Mutation::CommuteInnermost { depth, .. }, Node::BinOp { left, right, .. }) => {
            let innermost = left_spine_mut(left, *depth).ok_or_else(|| mismatch(mutation))?;
            std::mem::swap(innermost, &mut **right);
        }
        (Mutation::SquareToPower { .. }, Node::BinOp { op, right, .. }) => {
            *op = BinaryOp::Pow;
            **right = Node::int(2);
        }
        (Mutation::PowerToSquare { .. }, Node::BinOp { left, op, right }) => {
            *op = BinaryOp::Mul;
            *right = left.clone();
        }
        (Mutation::FoldConstant { value, .. }, node @ Node::BinOp { .. }) => {
            let replaced = std::mem::replace(node, Node::Nil);
            *node = Node::Numeral {
                value: value.clone(),
                origin: Origin::of(replaced),
            };
        }
        (Mutation::RotateAlternative { index, .. }, Node::Alt(alts)) if *index < alts.len() => {
            alts.swap(0, *index);
        }
        (Mutation::SwapStatements { i, j, .. }, Node::Perm { stats, .. })
            if *i < stats.len() && *j < stats.len() =>
        {
            stats.swap(*i, *j);
        }
        (Mutation::ToggleRendering { .. }, Node::Func { oneline, .. }) => {
            *oneline = !*oneline;
        }
        (Mutation::ToggleStep { .. }, Node::ForRange { step, .. }) => {
            *step = match step {
                Some(_) => None,
                None => Some(Box::new(Node::int(1))),
            };
        }
        (Mutation::ToggleQuotes { .. }, Node::Hint { double_quotes, .. }) => {
            *double_quotes = !*double_quotes;
        }
        (Mutation::ToggleHex { .. }, Node::Hint { no_hex, .. }) => {
            *no_hex = !*no_hex;
        }
        (Mutation::Revert { .. }, node) => {
            let mut original = node.origin().cloned().ok_or_else(|| mismatch(mutation))?;
            original.clear_origin();
            *node = original;
        }
        _ => return Err(mismatch(mutation)),
    }
    Ok(())
}
