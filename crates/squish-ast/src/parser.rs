//! Recursive descent parser for Lua 5.3 with optimizer magic comments.
//!
//! Besides plain Lua the parser understands:
//! - `--{` ... `--}`: statements that may be reordered (`--{!` forbids it)
//! - `a--|b`: equivalent alternatives, the first one active

use crate::lexer::{tokenize, Spanned, Token};
use crate::node::{Block, Node};
use crate::ops::{BinaryOp, UnaryOp};
use squish_core::{Error, Result};

const MAX_NESTING_DEPTH: u32 = 200;

/// Priority of unary operators; operands bind at least this tightly
const UNARY_PRIORITY: u8 = 12;

/// Left and right binding priority of a binary operator
fn priority(op: BinaryOp) -> (u8, u8) {
    match op {
        BinaryOp::Or => (1, 1),
        BinaryOp::And => (2, 2),
        BinaryOp::Lt
        | BinaryOp::Gt
        | BinaryOp::Le
        | BinaryOp::Ge
        | BinaryOp::Ne
        | BinaryOp::Eq => (3, 3),
        BinaryOp::BOr => (4, 4),
        BinaryOp::BXor => (5, 5),
        BinaryOp::BAnd => (6, 6),
        BinaryOp::Shl | BinaryOp::Shr => (7, 7),
        BinaryOp::Concat => (9, 8),
        BinaryOp::Add | BinaryOp::Sub => (10, 10),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::IDiv | BinaryOp::Mod => (11, 11),
        BinaryOp::Pow => (14, 13),
    }
}

/// Parses a complete chunk into a `Node::Block`.
pub fn parse(source: &str) -> Result<Node> {
    let tokens = tokenize(source)?;
    let mut parser = Parser::new(tokens);
    let block = parser.block()?;
    if !parser.at_eof() {
        return Err(parser.unexpected("statement"));
    }
    Ok(Node::Block(block))
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: u32,
}

impl Parser {
    fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos].token
    }

    fn peek_next(&self) -> &Token {
        let index = (self.pos + 1).min(self.tokens.len() - 1);
        &self.tokens[index].token
    }

    fn line(&self) -> usize {
        self.tokens[self.pos].line
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.pos].token.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    fn at_sym(&self, sym: &str) -> bool {
        matches!(self.peek(), Token::Symbol(s) if *s == sym)
    }

    fn at_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Keyword(k) if *k == kw)
    }

    fn eat_sym(&mut self, sym: &str) -> bool {
        if self.at_sym(sym) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: &str) -> bool {
        if self.at_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_sym(&mut self, sym: &str) -> Result<()> {
        if self.eat_sym(sym) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{sym}'")))
        }
    }

    fn expect_kw(&mut self, kw: &str) -> Result<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("'{kw}'")))
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        if let Token::Name(name) = self.peek() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("name"))
        }
    }

    fn unexpected(&self, expected: &str) -> Error {
        Error::parse(
            self.line(),
            format!("expected {expected}, found {}", self.peek().describe()),
        )
    }

    fn enter_nesting(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(Error::parse(
                self.line(),
                format!("nesting depth exceeded (maximum {MAX_NESTING_DEPTH} levels)"),
            ));
        }
        Ok(())
    }

    fn exit_nesting(&mut self) {
        self.depth -= 1;
    }

    // --- Statements ---

    fn block_follows(&self) -> bool {
        match self.peek() {
            Token::Eof | Token::PermEnd => true,
            Token::Keyword(kw) => matches!(*kw, "end" | "else" | "elseif" | "until"),
            _ => false,
        }
    }

    fn block(&mut self) -> Result<Block> {
        self.enter_nesting()?;
        let mut stats = Vec::new();
        while !self.block_follows() {
            if self.at_kw("return") {
                stats.push(self.return_stat()?);
                break;
            }
            if let Some(stat) = self.statement()? {
                stats.push(stat);
            }
        }
        self.exit_nesting();
        Ok(Block::new(stats))
    }

    fn return_stat(&mut self) -> Result<Node> {
        self.expect_kw("return")?;
        let exps = if self.block_follows() || self.at_sym(";") {
            Vec::new()
        } else {
            self.exp_list()?
        };
        self.eat_sym(";");
        Ok(Node::Return(exps))
    }

    fn statement(&mut self) -> Result<Option<Node>> {
        let stat = match self.peek().clone() {
            Token::Symbol(";") => {
                self.advance();
                return Ok(None);
            }
            Token::Symbol("::") => {
                self.advance();
                let name = self.expect_name()?;
                self.expect_sym("::")?;
                Node::Label(name)
            }
            Token::PermStart { allow_reorder } => {
                self.advance();
                self.enter_nesting()?;
                let mut stats = Vec::new();
                while !matches!(self.peek(), Token::PermEnd) {
                    if self.at_eof() {
                        return Err(self.unexpected("'--}'"));
                    }
                    if let Some(stat) = self.statement()? {
                        stats.push(stat);
                    }
                }
                self.advance();
                self.exit_nesting();
                Node::Perm {
                    stats,
                    allow_reorder,
                }
            }
            Token::Keyword("break") => {
                self.advance();
                Node::Break
            }
            Token::Keyword("goto") => {
                self.advance();
                Node::Goto(self.expect_name()?)
            }
            Token::Keyword("do") => {
                self.advance();
                let body = self.block()?;
                self.expect_kw("end")?;
                Node::Do(body)
            }
            Token::Keyword("while") => {
                self.advance();
                let cond = self.expr()?;
                self.expect_kw("do")?;
                let body = self.block()?;
                self.expect_kw("end")?;
                Node::While {
                    cond: Box::new(cond),
                    body,
                }
            }
            Token::Keyword("repeat") => {
                self.advance();
                let body = self.block()?;
                self.expect_kw("until")?;
                let cond = self.expr()?;
                Node::Repeat {
                    body,
                    cond: Box::new(cond),
                }
            }
            Token::Keyword("if") => self.if_stat()?,
            Token::Keyword("for") => self.for_stat()?,
            Token::Keyword("function") => self.function_stat()?,
            Token::Keyword("local") => {
                self.advance();
                if self.eat_kw("function") {
                    let name = self.expect_name()?;
                    let (params, vararg, body) = self.func_body()?;
                    Node::LocalFunction {
                        name,
                        params,
                        vararg,
                        body,
                    }
                } else {
                    let mut names = vec![self.expect_name()?];
                    while self.eat_sym(",") {
                        names.push(self.expect_name()?);
                    }
                    let values = if self.eat_sym("=") {
                        self.exp_list()?
                    } else {
                        Vec::new()
                    };
                    Node::Local { names, values }
                }
            }
            _ => self.expr_stat()?,
        };
        Ok(Some(stat))
    }

    fn if_stat(&mut self) -> Result<Node> {
        self.expect_kw("if")?;
        let cond = self.expr()?;
        self.expect_kw("then")?;
        let then = self.block()?;
        let mut arms = vec![(cond, then)];
        let mut orelse = None;
        loop {
            if self.eat_kw("elseif") {
                let cond = self.expr()?;
                self.expect_kw("then")?;
                arms.push((cond, self.block()?));
            } else if self.eat_kw("else") {
                orelse = Some(self.block()?);
                self.expect_kw("end")?;
                break;
            } else {
                self.expect_kw("end")?;
                break;
            }
        }
        // elseif chains become nested ifs in the else branch
        let mut node = None;
        while let Some((cond, then)) = arms.pop() {
            let current = Node::If {
                cond: Box::new(cond),
                then,
                orelse: match node.take() {
                    Some(inner) => Some(Block::new(vec![inner])),
                    None => orelse.take(),
                },
            };
            node = Some(current);
        }
        node.ok_or_else(|| self.unexpected("'if'"))
    }

    fn for_stat(&mut self) -> Result<Node> {
        self.expect_kw("for")?;
        let first = self.expect_name()?;
        if self.eat_sym("=") {
            let start = self.expr()?;
            self.expect_sym(",")?;
            let stop = self.expr()?;
            let step = if self.eat_sym(",") {
                Some(Box::new(self.expr()?))
            } else {
                None
            };
            self.expect_kw("do")?;
            let body = self.block()?;
            self.expect_kw("end")?;
            return Ok(Node::ForRange {
                var: first,
                start: Box::new(start),
                stop: Box::new(stop),
                step,
                body,
            });
        }
        let mut names = vec![first];
        while self.eat_sym(",") {
            names.push(self.expect_name()?);
        }
        self.expect_kw("in")?;
        let exps = self.exp_list()?;
        self.expect_kw("do")?;
        let body = self.block()?;
        self.expect_kw("end")?;
        Ok(Node::ForIn { names, exps, body })
    }

    /// `function a.b:c() end` becomes `a.b.c=function(self) end`
    fn function_stat(&mut self) -> Result<Node> {
        self.expect_kw("function")?;
        let mut target = Node::Name(self.expect_name()?);
        while self.eat_sym(".") {
            target = Node::index(target, Node::str(self.expect_name()?));
        }
        let method = if self.eat_sym(":") {
            target = Node::index(target, Node::str(self.expect_name()?));
            true
        } else {
            false
        };
        let (mut params, vararg, body) = self.func_body()?;
        if method {
            params.insert(0, "self".to_string());
        }
        Ok(Node::assign(
            vec![target],
            vec![Node::Func {
                params,
                vararg,
                body,
                oneline: true,
            }],
        ))
    }

    fn expr_stat(&mut self) -> Result<Node> {
        let line = self.line();
        let first = self.suffixed_exp()?;
        if self.at_sym("=") || self.at_sym(",") {
            let mut targets = vec![first];
            while self.eat_sym(",") {
                targets.push(self.suffixed_exp()?);
            }
            self.expect_sym("=")?;
            let values = self.exp_list()?;
            if let Some(bad) = targets
                .iter()
                .find(|t| !matches!(t, Node::Name(_) | Node::Index { .. }))
            {
                return Err(Error::parse(
                    line,
                    format!("cannot assign to {}", describe_node(bad)),
                ));
            }
            return Ok(Node::Assign { targets, values });
        }
        match first {
            Node::Call { .. } | Node::MethodCall { .. } => Ok(first),
            other => Err(Error::parse(
                line,
                format!("syntax error: {} is not a statement", describe_node(&other)),
            )),
        }
    }

    // --- Expressions ---

    fn exp_list(&mut self) -> Result<Vec<Node>> {
        let mut exps = vec![self.expr()?];
        while self.eat_sym(",") {
            exps.push(self.expr()?);
        }
        Ok(exps)
    }

    fn expr(&mut self) -> Result<Node> {
        self.sub_expr(0)
    }

    fn peek_binary_op(&self) -> Option<BinaryOp> {
        match self.peek() {
            Token::Symbol(sym) => BinaryOp::from_symbol(sym),
            Token::Keyword("and") => Some(BinaryOp::And),
            Token::Keyword("or") => Some(BinaryOp::Or),
            _ => None,
        }
    }

    fn peek_unary_op(&self) -> Option<UnaryOp> {
        match self.peek() {
            Token::Symbol(sym) => UnaryOp::from_symbol(sym),
            Token::Keyword("not") => Some(UnaryOp::Not),
            _ => None,
        }
    }

    /// Precedence climbing: parses operators binding tighter than `limit`.
    fn sub_expr(&mut self, limit: u8) -> Result<Node> {
        self.enter_nesting()?;
        let mut left = if let Some(op) = self.peek_unary_op() {
            self.advance();
            let operand = self.sub_expr(UNARY_PRIORITY)?;
            Node::unary(op, operand)
        } else {
            self.alt_exp()?
        };
        while let Some(op) = self.peek_binary_op() {
            let (left_priority, right_priority) = priority(op);
            if left_priority <= limit {
                break;
            }
            self.advance();
            let right = self.sub_expr(right_priority)?;
            left = Node::bin(left, op, right);
        }
        self.exit_nesting();
        Ok(left)
    }

    /// `simpleexp {--| simpleexp}`
    fn alt_exp(&mut self) -> Result<Node> {
        let first = self.simple_exp()?;
        if !matches!(self.peek(), Token::AltSep) {
            return Ok(first);
        }
        let mut alts = vec![first];
        while matches!(self.peek(), Token::AltSep) {
            self.advance();
            alts.push(self.simple_exp()?);
        }
        Ok(Node::Alt(alts))
    }

    fn simple_exp(&mut self) -> Result<Node> {
        let node = match self.peek().clone() {
            Token::Number(value) => {
                self.advance();
                Node::numeral(value)
            }
            Token::Str(value) => {
                self.advance();
                Node::Str(value)
            }
            Token::Keyword("nil") => {
                self.advance();
                Node::Nil
            }
            Token::Keyword("true") => {
                self.advance();
                Node::Boolean(true)
            }
            Token::Keyword("false") => {
                self.advance();
                Node::Boolean(false)
            }
            Token::Symbol("...") => {
                self.advance();
                Node::Ellipsis
            }
            Token::Symbol("{") => self.table()?,
            Token::Keyword("function") => {
                self.advance();
                let (params, vararg, body) = self.func_body()?;
                Node::Func {
                    params,
                    vararg,
                    body,
                    oneline: true,
                }
            }
            _ => self.suffixed_exp()?,
        };
        Ok(node)
    }

    fn primary_exp(&mut self) -> Result<Node> {
        match self.peek().clone() {
            Token::Name(name) => {
                self.advance();
                Ok(Node::Name(name))
            }
            Token::Symbol("(") => {
                self.advance();
                let inner = self.expr()?;
                self.expect_sym(")")?;
                Ok(inner)
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn suffixed_exp(&mut self) -> Result<Node> {
        let mut node = self.primary_exp()?;
        loop {
            node = match self.peek() {
                Token::Symbol(".") => {
                    self.advance();
                    Node::index(node, Node::str(self.expect_name()?))
                }
                Token::Symbol("[") => {
                    self.advance();
                    let key = self.expr()?;
                    self.expect_sym("]")?;
                    Node::index(node, key)
                }
                Token::Symbol(":") => {
                    self.advance();
                    let method = self.expect_name()?;
                    let args = self.call_args()?;
                    Node::MethodCall {
                        obj: Box::new(node),
                        method,
                        args,
                    }
                }
                Token::Symbol("(") | Token::Symbol("{") | Token::Str(_) => {
                    let args = self.call_args()?;
                    Node::call(node, args)
                }
                _ => return Ok(node),
            };
        }
    }

    fn call_args(&mut self) -> Result<Vec<Node>> {
        match self.peek().clone() {
            Token::Str(value) => {
                self.advance();
                Ok(vec![Node::Str(value)])
            }
            Token::Symbol("{") => Ok(vec![self.table()?]),
            Token::Symbol("(") => {
                self.advance();
                if self.eat_sym(")") {
                    return Ok(Vec::new());
                }
                let args = self.exp_list()?;
                self.expect_sym(")")?;
                Ok(args)
            }
            _ => Err(self.unexpected("function arguments")),
        }
    }

    /// `(parlist) block end`, returning named parameters and whether `...`
    /// was declared
    fn func_body(&mut self) -> Result<(Vec<String>, bool, Block)> {
        self.expect_sym("(")?;
        let mut params = Vec::new();
        let mut vararg = false;
        if !self.at_sym(")") {
            loop {
                if self.eat_sym("...") {
                    vararg = true;
                    break;
                }
                params.push(self.expect_name()?);
                if !self.eat_sym(",") {
                    break;
                }
            }
        }
        self.expect_sym(")")?;
        let body = self.block()?;
        self.expect_kw("end")?;
        Ok((params, vararg, body))
    }

    fn table(&mut self) -> Result<Node> {
        self.expect_sym("{")?;
        let mut fields = Vec::new();
        while !self.at_sym("}") {
            let field = if self.at_sym("[") {
                self.advance();
                let key = self.expr()?;
                self.expect_sym("]")?;
                self.expect_sym("=")?;
                let value = self.expr()?;
                Node::Field {
                    key: Some(Box::new(key)),
                    value: Box::new(value),
                }
            } else if matches!(self.peek(), Token::Name(_))
                && matches!(self.peek_next(), Token::Symbol("="))
            {
                let key = self.expect_name()?;
                self.advance();
                let value = self.expr()?;
                Node::Field {
                    key: Some(Box::new(Node::str(key))),
                    value: Box::new(value),
                }
            } else {
                Node::Field {
                    key: None,
                    value: Box::new(self.expr()?),
                }
            };
            fields.push(field);
            if !self.eat_sym(",") && !self.eat_sym(";") {
                break;
            }
        }
        self.expect_sym("}")?;
        Ok(Node::Table(fields))
    }
}

fn describe_node(node: &Node) -> &'static str {
    match node {
        Node::Call { .. } | Node::MethodCall { .. } => "a function call",
        Node::Name(_) => "a name",
        Node::Index { .. } => "an index expression",
        _ => "an expression",
    }
}
