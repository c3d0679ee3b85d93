//! Renders syntax trees back to Lua source.
//!
//! Compact output inserts whitespace only where two tokens would otherwise
//! merge. Pretty output indents blocks and keeps the magic comments so that
//! it parses back into the same tree.

use crate::lexer::{is_identifier, is_keyword};
use crate::node::{Block, Node};
use crate::numeral::Numeral;
use crate::ops::UNARY_PRECEDENCE;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Indented multi-line output for reading
    pub pretty: bool,
    /// Never turn parameterless functions into `load'...'`
    pub no_load: bool,
}

impl RenderOptions {
    pub fn compact() -> Self {
        Self::default()
    }

    pub fn pretty() -> Self {
        Self {
            pretty: true,
            no_load: false,
        }
    }

    pub fn with_no_load(mut self, no_load: bool) -> Self {
        self.no_load = no_load;
        self
    }
}

/// Renders `node` as Lua source.
pub fn render(node: &Node, options: RenderOptions) -> String {
    let mut printer = Printer::new(options);
    printer.node(node);
    printer.out
}

/// Last token written, for deciding where whitespace is needed
#[derive(Debug, Clone, Copy)]
enum Prev {
    Start,
    Text { first: char, last: char },
    Numeral,
}

fn is_word_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters that would continue a numeral
fn is_numeral_char(c: char) -> bool {
    c.is_ascii_hexdigit() || matches!(c, 'x' | 'X' | 'p' | 'P' | '.')
}

struct Printer {
    out: String,
    prev: Prev,
    /// Whitespace was written after `prev`
    spaced: bool,
    /// Last word token, when the last token was a word
    last_word_is_keyword: bool,
    indent: usize,
    double_quotes: bool,
    no_hex: bool,
    pretty: bool,
    no_load: bool,
}

impl Printer {
    fn new(options: RenderOptions) -> Self {
        Self {
            out: String::new(),
            prev: Prev::Start,
            spaced: false,
            last_word_is_keyword: false,
            indent: 0,
            double_quotes: false,
            no_hex: false,
            pretty: options.pretty,
            no_load: options.no_load,
        }
    }

    fn token(&mut self, token: &str) {
        let (first, last) = match (token.chars().next(), token.chars().last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return,
        };
        if !self.spaced {
            let space = match self.prev {
                Prev::Start => false,
                Prev::Text {
                    first: prev_first,
                    last: prev_last,
                } => {
                    (is_word_start(prev_first) && is_word_char(first))
                        || (prev_last == '-' && first == '-')
                        || (prev_last == '.' && first == '.')
                }
                Prev::Numeral => is_numeral_char(first),
            };
            if space {
                self.out.push(' ');
            }
        }
        self.out.push_str(token);
        self.prev = Prev::Text { first, last };
        self.last_word_is_keyword = is_word_start(first) && is_keyword(token);
        self.spaced = false;
    }

    fn numeral(&mut self, numeral: &Numeral) {
        let text = numeral.to_string();
        if !self.spaced {
            let space = match self.prev {
                Prev::Start | Prev::Numeral => false,
                Prev::Text { first, last } => {
                    (is_word_start(first) && !text.starts_with('.'))
                        || (last == '.' && text.starts_with('.'))
                }
            };
            if space {
                self.out.push(' ');
            }
        }
        self.out.push_str(&text);
        self.prev = Prev::Numeral;
        self.spaced = false;
    }

    fn newline(&mut self) {
        if self.pretty {
            self.out.push('\n');
            self.spaced = true;
        }
    }

    fn indentation(&mut self) {
        if self.pretty {
            for _ in 0..self.indent {
                self.out.push_str("  ");
            }
            self.spaced = true;
        }
    }

    /// Whether the output ends in something a following `(` would call
    fn ends_prefix_exp(&self) -> bool {
        match self.prev {
            Prev::Text { first, last } => {
                (is_word_start(first) && !self.last_word_is_keyword)
                    || matches!(last, ')' | ']' | '}' | '\'' | '"')
            }
            _ => false,
        }
    }

    fn quoted(&self, value: &[u8]) -> String {
        let quote = if self.double_quotes { '"' } else { '\'' };
        let units = string_units(value);
        let mut out = String::with_capacity(value.len() + 2);
        out.push(quote);
        for (i, unit) in units.iter().enumerate() {
            // a short decimal escape would swallow a following digit
            let pad = matches!(units.get(i + 1), Some(StrUnit::Char(n)) if n.is_ascii_digit());
            match *unit {
                StrUnit::Char('\n') => out.push_str("\\n"),
                StrUnit::Char('\t') => out.push_str("\\t"),
                StrUnit::Char('\r') => out.push_str("\\r"),
                StrUnit::Char('\x0c') => out.push_str("\\f"),
                StrUnit::Char('\\') => out.push_str("\\\\"),
                StrUnit::Char(c) if c == quote => {
                    out.push('\\');
                    out.push(c);
                }
                StrUnit::Char(c) if (c as u32) < 0x20 || c == '\x7f' => {
                    push_decimal_escape(&mut out, c as u8, pad)
                }
                StrUnit::Char(c) => out.push(c),
                StrUnit::Byte(byte) => push_decimal_escape(&mut out, byte, pad),
            }
        }
        out.push(quote);
        out
    }

    fn string(&mut self, value: &[u8]) {
        let quoted = self.quoted(value);
        self.token(&quoted);
    }

    fn list(&mut self, nodes: &[Node]) {
        for (i, node) in nodes.iter().enumerate() {
            if i > 0 {
                self.token(",");
            }
            self.node(node);
        }
    }

    fn names(&mut self, names: &[String]) {
        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.token(",");
            }
            self.token(name);
        }
    }

    fn statements(&mut self, stats: &[Node]) {
        for (i, stat) in stats.iter().enumerate() {
            if self.pretty && i > 0 {
                self.indentation();
            }
            self.statement(stat);
            if self.pretty && i + 1 < stats.len() {
                self.newline();
            }
        }
    }

    fn statement(&mut self, stat: &Node) {
        if starts_with_paren(stat) && self.ends_prefix_exp() {
            self.token(";");
        }
        self.node(stat);
    }

    fn block(&mut self, block: &Block) {
        for stat in &block.stats {
            self.indentation();
            self.statement(stat);
            self.newline();
        }
    }

    /// `keyword`, newline, indented block, indentation
    fn nested(&mut self, block: &Block) {
        self.newline();
        self.indent += 1;
        self.block(block);
        self.indent -= 1;
        self.indentation();
    }

    fn func(&mut self, params: &[String], vararg: bool, body: &Block) {
        self.token("(");
        self.names(params);
        if vararg {
            if !params.is_empty() {
                self.token(",");
            }
            self.token("...");
        }
        self.token(")");
        self.nested(body);
        self.token("end");
    }

    fn prefix(&mut self, node: &Node) {
        let parens = !node.is_prefix_exp();
        if parens {
            self.token("(");
        }
        self.node(node);
        if parens {
            self.token(")");
        }
    }

    fn call_args(&mut self, args: &[Node]) {
        match args {
            [arg @ (Node::Str(_) | Node::Table(_))] => self.node(arg),
            _ => {
                self.token("(");
                self.list(args);
                self.token(")");
            }
        }
    }

    fn operand(&mut self, node: &Node, parens: bool) {
        if parens {
            self.token("(");
        }
        self.node(node);
        if parens {
            self.token(")");
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Block(block) => self.block(block),
            Node::Name(id) => self.token(id),
            Node::Label(name) => {
                self.token("::");
                self.token(name);
                self.token("::");
            }
            Node::Goto(target) => {
                self.token("goto");
                self.token(target);
            }
            Node::Break => self.token("break"),
            Node::Nil => self.token("nil"),
            Node::Ellipsis => self.token("..."),
            Node::Boolean(value) => self.token(if *value { "true" } else { "false" }),
            Node::Str(value) => self.string(value),
            Node::Numeral { value, .. } => {
                if self.no_hex && value.hex {
                    if let Some(decimal) = value.to_decimal() {
                        return self.numeral(&decimal);
                    }
                }
                self.numeral(value)
            }
            Node::Return(exps) => {
                self.token("return");
                self.list(exps);
            }
            Node::Do(body) => {
                self.token("do");
                self.nested(body);
                self.token("end");
            }
            Node::Assign { targets, values } => {
                self.list(targets);
                self.token("=");
                self.list(values);
            }
            Node::While { cond, body } => {
                self.token("while");
                self.node(cond);
                self.token("do");
                self.nested(body);
                self.token("end");
            }
            Node::Repeat { body, cond } => {
                self.token("repeat");
                self.nested(body);
                self.token("until");
                self.node(cond);
            }
            Node::ForRange {
                var,
                start,
                stop,
                step,
                body,
            } => {
                self.token("for");
                self.token(var);
                self.token("=");
                self.node(start);
                self.token(",");
                self.node(stop);
                if let Some(step) = step {
                    self.token(",");
                    self.node(step);
                }
                self.token("do");
                self.nested(body);
                self.token("end");
            }
            Node::ForIn { names, exps, body } => {
                self.token("for");
                self.names(names);
                self.token("in");
                self.list(exps);
                self.token("do");
                self.nested(body);
                self.token("end");
            }
            Node::Local { names, values } => {
                self.token("local");
                self.names(names);
                if !values.is_empty() {
                    self.token("=");
                    self.list(values);
                }
            }
            Node::LocalFunction {
                name,
                params,
                vararg,
                body,
            } => {
                self.token("local");
                self.token("function");
                self.token(name);
                self.func(params, *vararg, body);
            }
            Node::Func {
                params,
                vararg,
                body,
                oneline,
            } => {
                if params.is_empty() && *oneline && !self.pretty && !self.no_load {
                    let mut inner = Printer::new(RenderOptions {
                        pretty: false,
                        no_load: self.no_load,
                    });
                    inner.double_quotes = !self.double_quotes;
                    inner.no_hex = self.no_hex;
                    inner.block(body);
                    self.token("load");
                    self.string(inner.out.as_bytes());
                } else {
                    self.token("function");
                    self.func(params, *vararg, body);
                }
            }
            Node::If { .. } => self.if_chain(node),
            Node::Perm {
                stats,
                allow_reorder,
            } => {
                if self.pretty {
                    self.token(if *allow_reorder { "--{" } else { "--{!" });
                    self.newline();
                    self.indentation();
                }
                self.statements(stats);
                if self.pretty {
                    self.newline();
                    self.indentation();
                    self.token("--}");
                }
            }
            Node::Hint {
                body,
                no_hex,
                double_quotes,
            } => {
                let saved = (self.no_hex, self.double_quotes);
                self.no_hex = *no_hex;
                self.double_quotes = *double_quotes;
                self.block(body);
                (self.no_hex, self.double_quotes) = saved;
            }
            Node::Index { obj, key } => {
                self.prefix(obj);
                match identifier_key(key) {
                    Some(name) => {
                        self.token(".");
                        self.token(name);
                    }
                    None => {
                        self.token("[");
                        self.node(key);
                        self.token("]");
                    }
                }
            }
            Node::Call { func, args } => {
                self.prefix(func);
                self.call_args(args);
            }
            Node::MethodCall { obj, method, args } => {
                self.prefix(obj);
                self.token(":");
                self.token(method);
                self.call_args(args);
            }
            Node::Table(fields) => {
                self.token("{");
                self.list(fields);
                self.token("}");
            }
            Node::Field { key, value } => {
                if let Some(key) = key.as_deref() {
                    match identifier_key(key) {
                        Some(name) => self.token(name),
                        None => {
                            self.token("[");
                            self.node(key);
                            self.token("]");
                        }
                    }
                    self.token("=");
                }
                self.node(value);
            }
            Node::BinOp { left, op, right } => {
                let precedence = op.precedence();
                let (left_parens, right_parens) = if op.is_right_assoc() {
                    (
                        left.precedence() >= precedence,
                        right.precedence() > precedence,
                    )
                } else {
                    (
                        left.precedence() > precedence,
                        right.precedence() >= precedence,
                    )
                };
                self.operand(left, left_parens);
                self.token(op.symbol());
                self.operand(right, right_parens);
            }
            Node::UnOp { op, operand } => {
                self.token(op.symbol());
                self.operand(operand, operand.precedence() > UNARY_PRECEDENCE);
            }
            Node::Alt(alts) => {
                if !self.pretty {
                    if let Some(first) = alts.first() {
                        self.node(first);
                    }
                    return;
                }
                for (i, alt) in alts.iter().enumerate() {
                    if i > 0 {
                        self.token("--|");
                    }
                    self.operand(alt, alt.precedence() > 0);
                }
                // the rest of the line is a comment to plain Lua
                self.newline();
                self.indentation();
            }
        }
    }

    fn if_chain(&mut self, node: &Node) {
        let Node::If { cond, then, orelse } = node else {
            return;
        };
        self.token("if");
        self.node(cond);
        self.token("then");
        self.nested(then);
        let mut orelse = orelse.as_ref();
        while let Some(block) = orelse {
            match block.stats.as_slice() {
                [Node::If {
                    cond,
                    then,
                    orelse: inner,
                }] => {
                    self.token("elseif");
                    self.node(cond);
                    self.token("then");
                    self.nested(then);
                    orelse = inner.as_ref();
                }
                _ => {
                    self.token("else");
                    self.nested(block);
                    orelse = None;
                }
            }
        }
        self.token("end");
    }
}

/// A piece of a string literal: a UTF-8 character or a byte outside one
#[derive(Debug, Clone, Copy)]
enum StrUnit {
    Char(char),
    Byte(u8),
}

fn string_units(mut bytes: &[u8]) -> Vec<StrUnit> {
    let mut units = Vec::with_capacity(bytes.len());
    while !bytes.is_empty() {
        let (valid, stray) = match std::str::from_utf8(bytes) {
            Ok(valid) => (valid, 0),
            Err(err) => {
                let end = err.valid_up_to();
                let valid = std::str::from_utf8(&bytes[..end]).unwrap_or_default();
                (valid, err.error_len().unwrap_or(bytes.len() - end))
            }
        };
        units.extend(valid.chars().map(StrUnit::Char));
        let end = valid.len() + stray;
        units.extend(bytes[valid.len()..end].iter().copied().map(StrUnit::Byte));
        bytes = &bytes[end..];
    }
    units
}

fn push_decimal_escape(out: &mut String, byte: u8, pad: bool) {
    if pad {
        out.push_str(&format!("\\{byte:03}"));
    } else {
        out.push_str(&format!("\\{byte}"));
    }
}

/// `key` as a bare name, when it can be written as one
fn identifier_key(key: &Node) -> Option<&str> {
    match key {
        Node::Str(bytes) => std::str::from_utf8(bytes)
            .ok()
            .filter(|name| is_identifier(name)),
        _ => None,
    }
}

/// Whether the rendered statement begins with `(`
fn starts_with_paren(node: &Node) -> bool {
    match node {
        Node::Assign { targets, .. } => targets.first().map_or(false, starts_with_paren),
        Node::Call { func: inner, .. }
        | Node::Index { obj: inner, .. }
        | Node::MethodCall { obj: inner, .. } => !inner.is_prefix_exp() || starts_with_paren(inner),
        _ => false,
    }
}
