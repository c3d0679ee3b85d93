//! Lua syntax trees for size optimization.
//!
//! This crate holds the program representation the search works on:
//! - Parsing and rendering: source text in, minimal source text out
//! - Mutations: meaning-preserving edits enumerated per state
//! - Snapshots: versioned encoding for moving states between threads

pub mod lexer;
pub mod minify;
pub mod mutation;
pub mod node;
pub mod numeral;
pub mod ops;
pub mod parser;
pub mod printer;
pub mod state;
pub mod validation;
pub mod visit;

pub use minify::{loads_to_funcs, minify};
pub use mutation::{Mutation, MutationConfig, Mutator};
pub use node::{Block, Node, Origin};
pub use numeral::Numeral;
pub use ops::{BinaryOp, UnaryOp};
pub use parser::parse;
pub use printer::{render, RenderOptions};
pub use state::{Section, State};
pub use validation::validate_tree;
