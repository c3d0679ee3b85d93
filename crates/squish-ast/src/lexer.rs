//! Tokenizer for Lua source with optimizer magic comments.

use crate::numeral::Numeral;
use squish_core::{Error, Result};

pub const KEYWORDS: [&str; 22] = [
    "and", "break", "do", "else", "elseif", "end", "false", "for", "function", "goto", "if", "in",
    "local", "nil", "not", "or", "repeat", "return", "then", "true", "until", "while",
];

/// Multi-character symbols first so the longest match wins
const SYMBOLS: [&str; 33] = [
    "...", "..", "::", "<<", ">>", "//", "==", "~=", "<=", ">=", "+", "-", "*", "/", "%", "^",
    "#", "&", "~", "|", "<", ">", "=", "(", ")", "{", "}", "[", "]", ";", ":", ",", ".",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Name(String),
    Keyword(&'static str),
    Str(Vec<u8>),
    Number(Numeral),
    Symbol(&'static str),
    /// `--{`, or `--{!` when reordering is forbidden
    PermStart { allow_reorder: bool },
    /// `--}`
    PermEnd,
    /// `--|`
    AltSep,
    Eof,
}

impl Token {
    pub fn describe(&self) -> String {
        match self {
            Token::Name(name) => format!("name '{name}'"),
            Token::Keyword(kw) => format!("'{kw}'"),
            Token::Str(_) => "string".to_string(),
            Token::Number(n) => format!("number '{n}'"),
            Token::Symbol(sym) => format!("'{sym}'"),
            Token::PermStart { .. } => "'--{'".to_string(),
            Token::PermEnd => "'--}'".to_string(),
            Token::AltSep => "'--|'".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Whether `word` can be written as a bare identifier
pub fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !is_keyword(word)
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            src: source.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    /// Tokenizes the whole input. The last token is always `Eof`.
    pub fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia()?;
            let line = self.line;
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(Spanned { token, line });
            if done {
                return Ok(tokens);
            }
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn starts_with(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s.as_bytes())
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.line, message)
    }

    /// Skips whitespace and ordinary comments, stopping at magic comments.
    fn skip_trivia(&mut self) -> Result<()> {
        loop {
            match self.peek() {
                Some(c) if c.is_ascii_whitespace() => {
                    self.bump();
                }
                Some(b'-') if self.starts_with("--") => {
                    if self.starts_with("--{") || self.starts_with("--}") || self.starts_with("--|")
                    {
                        return Ok(());
                    }
                    self.pos += 2;
                    if let Some(level) = self.long_bracket_level() {
                        self.read_long_bracket(level)?;
                    } else {
                        while let Some(c) = self.peek() {
                            if c == b'\n' {
                                break;
                            }
                            self.pos += 1;
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Level of a long bracket `[==[` starting at the cursor
    fn long_bracket_level(&self) -> Option<usize> {
        if self.peek() != Some(b'[') {
            return None;
        }
        let mut level = 0;
        while self.peek_at(1 + level) == Some(b'=') {
            level += 1;
        }
        (self.peek_at(1 + level) == Some(b'[')).then_some(level)
    }

    fn read_long_bracket(&mut self, level: usize) -> Result<Vec<u8>> {
        let start_line = self.line;
        self.pos += level + 2;
        // a newline right after the opening bracket is not part of the string
        if self.peek() == Some(b'\r') {
            self.bump();
        }
        if self.peek() == Some(b'\n') {
            self.bump();
        }
        let close = format!("]{}]", "=".repeat(level));
        let begin = self.pos;
        while self.pos < self.src.len() {
            if self.starts_with(&close) {
                let content = self.src[begin..self.pos].to_vec();
                self.pos += close.len();
                return Ok(content);
            }
            self.bump();
        }
        Err(Error::parse(start_line, "unfinished long string or comment"))
    }

    fn next_token(&mut self) -> Result<Token> {
        let c = match self.peek() {
            None => return Ok(Token::Eof),
            Some(c) => c,
        };

        if self.starts_with("--{!") {
            self.pos += 4;
            return Ok(Token::PermStart {
                allow_reorder: false,
            });
        }
        if self.starts_with("--{") {
            self.pos += 3;
            return Ok(Token::PermStart {
                allow_reorder: true,
            });
        }
        if self.starts_with("--}") {
            self.pos += 3;
            return Ok(Token::PermEnd);
        }
        if self.starts_with("--|") {
            self.pos += 3;
            return Ok(Token::AltSep);
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            let begin = self.pos;
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
                self.pos += 1;
            }
            let word = String::from_utf8_lossy(&self.src[begin..self.pos]).into_owned();
            return Ok(match KEYWORDS.iter().copied().find(|kw| *kw == word) {
                Some(kw) => Token::Keyword(kw),
                None => Token::Name(word),
            });
        }

        if c.is_ascii_digit() || (c == b'.' && matches!(self.peek_at(1), Some(d) if d.is_ascii_digit()))
        {
            return self.read_number().map(Token::Number);
        }

        if c == b'"' || c == b'\'' {
            return self.read_string(c).map(Token::Str);
        }

        if c == b'[' {
            if let Some(level) = self.long_bracket_level() {
                return self.read_long_bracket(level).map(Token::Str);
            }
        }

        for sym in SYMBOLS {
            if self.starts_with(sym) {
                self.pos += sym.len();
                return Ok(Token::Symbol(sym));
            }
        }

        Err(self.error(format!("unexpected character '{}'", c as char)))
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> String {
        let begin = self.pos;
        while matches!(self.peek(), Some(c) if pred(c)) {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.src[begin..self.pos]).into_owned()
    }

    fn read_exponent(&mut self, markers: [u8; 2]) -> Result<i32> {
        if !matches!(self.peek(), Some(c) if c == markers[0] || c == markers[1]) {
            return Ok(0);
        }
        self.pos += 1;
        let negative = match self.peek() {
            Some(b'-') => {
                self.pos += 1;
                true
            }
            Some(b'+') => {
                self.pos += 1;
                false
            }
            _ => false,
        };
        let digits = self.take_while(|c| c.is_ascii_digit());
        let value: i32 = digits
            .parse()
            .map_err(|_| self.error("malformed number exponent"))?;
        Ok(if negative { -value } else { value })
    }

    fn read_number(&mut self) -> Result<Numeral> {
        let hex = self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x') | Some(b'X'));
        let numeral = if hex {
            self.pos += 2;
            let whole = self.take_while(|c| c.is_ascii_hexdigit());
            let fraction = if self.peek() == Some(b'.') {
                self.pos += 1;
                self.take_while(|c| c.is_ascii_hexdigit())
            } else {
                String::new()
            };
            if whole.is_empty() && fraction.is_empty() {
                return Err(self.error("malformed hexadecimal number"));
            }
            let whole = if whole.is_empty() {
                0
            } else {
                u64::from_str_radix(&whole, 16).map_err(|_| self.error("hexadecimal number too large"))?
            };
            let exponent = self.read_exponent([b'p', b'P'])?;
            Numeral::new(whole, fraction, exponent, true)
        } else {
            let whole = self.take_while(|c| c.is_ascii_digit());
            let fraction = if self.peek() == Some(b'.') && self.peek_at(1) != Some(b'.') {
                self.pos += 1;
                self.take_while(|c| c.is_ascii_digit())
            } else {
                String::new()
            };
            let whole = if whole.is_empty() {
                0
            } else {
                whole
                    .parse::<u64>()
                    .map_err(|_| self.error("number too large"))?
            };
            let exponent = self.read_exponent([b'e', b'E'])?;
            Numeral::new(whole, fraction, exponent, false)
        };
        // like Lua, only hex digits and dots make a numeral malformed: `1or` is `1 or`
        if matches!(self.peek(), Some(c) if c.is_ascii_hexdigit() || c == b'.') {
            return Err(self.error("malformed number"));
        }
        Ok(numeral)
    }

    /// Reads a quoted string. Escapes may produce bytes that are not UTF-8.
    fn read_string(&mut self, quote: u8) -> Result<Vec<u8>> {
        let start_line = self.line;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let c = match self.peek() {
                None | Some(b'\n') => return Err(Error::parse(start_line, "unfinished string")),
                Some(c) => c,
            };
            self.pos += 1;
            if c == quote {
                break;
            }
            if c != b'\\' {
                out.push(c);
                continue;
            }
            let escaped = self.bump().ok_or_else(|| self.error("unfinished string"))?;
            match escaped {
                b'a' => out.push(0x07),
                b'b' => out.push(0x08),
                b'f' => out.push(0x0c),
                b'n' => out.push(b'\n'),
                b'r' => out.push(b'\r'),
                b't' => out.push(b'\t'),
                b'v' => out.push(0x0b),
                b'\\' | b'"' | b'\'' => out.push(escaped),
                b'\n' => out.push(b'\n'),
                b'z' => {
                    while matches!(self.peek(), Some(c) if c.is_ascii_whitespace()) {
                        self.bump();
                    }
                }
                b'x' => {
                    let digits: String = (0..2)
                        .filter_map(|i| self.peek_at(i))
                        .take_while(|c| c.is_ascii_hexdigit())
                        .map(char::from)
                        .collect();
                    let value = u8::from_str_radix(&digits, 16)
                        .map_err(|_| self.error("hexadecimal digit expected"))?;
                    self.pos += digits.len();
                    out.push(value);
                }
                b'u' => {
                    if self.peek() != Some(b'{') {
                        return Err(self.error("missing '{' in \\u{xxxx}"));
                    }
                    self.pos += 1;
                    let digits = self.take_while(|c| c.is_ascii_hexdigit());
                    if self.peek() != Some(b'}') {
                        return Err(self.error("missing '}' in \\u{xxxx}"));
                    }
                    self.pos += 1;
                    let ch = u32::from_str_radix(&digits, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("UTF-8 value too large"))?;
                    let mut buf = [0u8; 4];
                    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
                d if d.is_ascii_digit() => {
                    let mut value = (d - b'0') as u32;
                    for _ in 0..2 {
                        match self.peek() {
                            Some(c) if c.is_ascii_digit() => {
                                value = value * 10 + (c - b'0') as u32;
                                self.pos += 1;
                            }
                            _ => break,
                        }
                    }
                    let byte = u8::try_from(value).map_err(|_| self.error("decimal escape too large"))?;
                    out.push(byte);
                }
                other => {
                    return Err(self.error(format!("invalid escape sequence '\\{}'", other as char)))
                }
            }
        }
        Ok(out)
    }
}

/// Tokenizes `source`.
pub fn tokenize(source: &str) -> Result<Vec<Spanned>> {
    Lexer::new(source).tokenize()
}
