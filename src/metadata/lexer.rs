use crate::error::Error;
use derive_more::Display;

#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display)]
pub enum Keyword {
    #[display(fmt = "align")]
    Align,
    #[display(fmt = "callsite")]
    Callsite,
    #[display(fmt = "clock")]
    Clock,
    #[display(fmt = "enum")]
    Enum,
    #[display(fmt = "env")]
    Env,
    #[display(fmt = "event")]
    Event,
    #[display(fmt = "floating_point")]
    FloatingPoint,
    #[display(fmt = "integer")]
    Integer,
    #[display(fmt = "long")]
    Long,
    #[display(fmt = "short")]
    Short,
    #[display(fmt = "signed")]
    Signed,
    #[display(fmt = "stream")]
    Stream,
    #[display(fmt = "string")]
    String,
    #[display(fmt = "struct")]
    Struct,
    #[display(fmt = "trace")]
    Trace,
    #[display(fmt = "typealias")]
    Typealias,
    #[display(fmt = "unsigned")]
    Unsigned,
    #[display(fmt = "variant")]
    Variant,
    #[display(fmt = "void")]
    Void,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("align", Keyword::Align),
    ("callsite", Keyword::Callsite),
    ("clock", Keyword::Clock),
    ("enum", Keyword::Enum),
    ("env", Keyword::Env),
    ("event", Keyword::Event),
    ("floating_point", Keyword::FloatingPoint),
    ("integer", Keyword::Integer),
    ("long", Keyword::Long),
    ("short", Keyword::Short),
    ("signed", Keyword::Signed),
    ("stream", Keyword::Stream),
    ("string", Keyword::String),
    ("struct", Keyword::Struct),
    ("trace", Keyword::Trace),
    ("typealias", Keyword::Typealias),
    ("unsigned", Keyword::Unsigned),
    ("variant", Keyword::Variant),
    ("void", Keyword::Void),
];

/// C keywords that are reserved by TSDL but have no meaning in it
const UNSUPPORTED_KEYWORDS: &[&str] = &[
    "const",
    "char",
    "double",
    "float",
    "int",
    "typedef",
    "_Bool",
    "_Complex",
    "_Imaginary",
];

#[derive(Clone, Eq, PartialEq, Debug, Display)]
pub enum Token {
    #[display(fmt = "keyword '{}'", _0)]
    Keyword(Keyword),
    #[display(fmt = "identifier '{}'", _0)]
    Ident(String),
    #[display(fmt = "integer {}", _0)]
    Integer(u64),
    #[display(fmt = "string \"{}\"", _0)]
    Str(String),
    #[display(fmt = "'{{'")]
    LBrace,
    #[display(fmt = "'}}'")]
    RBrace,
    #[display(fmt = "'('")]
    LParen,
    #[display(fmt = "')'")]
    RParen,
    #[display(fmt = "'['")]
    LBracket,
    #[display(fmt = "']'")]
    RBracket,
    #[display(fmt = "';'")]
    Semicolon,
    #[display(fmt = "':'")]
    Colon,
    #[display(fmt = "':='")]
    TypeAssign,
    #[display(fmt = "'='")]
    Assign,
    #[display(fmt = "'<'")]
    Lt,
    #[display(fmt = "'>'")]
    Gt,
    #[display(fmt = "','")]
    Comma,
    #[display(fmt = "'.'")]
    Dot,
    #[display(fmt = "'...'")]
    Ellipsis,
    #[display(fmt = "'-'")]
    Minus,
    #[display(fmt = "end of metadata")]
    Eof,
}

impl Token {
    /// Identifiers and keywords both work as names in dotted paths and
    /// attribute keys (`event.header`, `align = 8`)
    pub fn word(&self) -> Option<String> {
        match self {
            Token::Ident(s) => Some(s.clone()),
            Token::Keyword(k) => Some(k.to_string()),
            _ => None,
        }
    }
}

/// Produces tokens from TSDL text on demand
#[derive(Debug)]
pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            src: text.as_bytes(),
            pos: 0,
            line: 1,
        }
    }

    /// Line of the most recently returned token
    pub fn line(&self) -> usize {
        self.line
    }

    fn peek_byte(&self, ahead: usize) -> Option<u8> {
        self.src.get(self.pos + ahead).copied()
    }

    fn syntax(&self, msg: impl Into<String>) -> Error {
        Error::Syntax {
            line: self.line,
            msg: msg.into(),
        }
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), Error> {
        loop {
            match self.peek_byte(0) {
                Some(b'\n') => {
                    self.line += 1;
                    self.pos += 1;
                }
                Some(b) if b.is_ascii_whitespace() => self.pos += 1,
                Some(b'/') if self.peek_byte(1) == Some(b'*') => {
                    let start_line = self.line;
                    self.pos += 2;
                    loop {
                        match self.peek_byte(0) {
                            Some(b'*') if self.peek_byte(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            Some(b) => {
                                if b == b'\n' {
                                    self.line += 1;
                                }
                                self.pos += 1;
                            }
                            None => {
                                return Err(Error::Syntax {
                                    line: start_line,
                                    msg: "unterminated comment".to_owned(),
                                })
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, Error> {
        self.skip_whitespace_and_comments()?;
        let b = match self.peek_byte(0) {
            Some(b) => b,
            None => return Ok(Token::Eof),
        };
        if b.is_ascii_alphabetic() || b == b'_' {
            return self.word();
        }
        if b.is_ascii_digit() {
            return self.integer();
        }
        if b == b'"' {
            return self.string();
        }
        self.pos += 1;
        let tok = match b {
            b'{' => Token::LBrace,
            b'}' => Token::RBrace,
            b'(' => Token::LParen,
            b')' => Token::RParen,
            b'[' => Token::LBracket,
            b']' => Token::RBracket,
            b';' => Token::Semicolon,
            b',' => Token::Comma,
            b'<' => Token::Lt,
            b'>' => Token::Gt,
            b'=' => Token::Assign,
            b'-' => Token::Minus,
            b':' if self.peek_byte(0) == Some(b'=') => {
                self.pos += 1;
                Token::TypeAssign
            }
            b':' => Token::Colon,
            b'.' if self.peek_byte(0) == Some(b'.') && self.peek_byte(1) == Some(b'.') => {
                self.pos += 2;
                Token::Ellipsis
            }
            b'.' => Token::Dot,
            other => {
                return Err(self.syntax(format!(
                    "unexpected character '{}'",
                    char::from(other).escape_default()
                )))
            }
        };
        Ok(tok)
    }

    fn word(&mut self) -> Result<Token, Error> {
        let start = self.pos;
        while matches!(self.peek_byte(0), Some(b) if b.is_ascii_alphanumeric() || b == b'_') {
            self.pos += 1;
        }
        // Only ASCII bytes were consumed
        let w = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if UNSUPPORTED_KEYWORDS.contains(&w.as_str()) {
            return Err(Error::UnsupportedKeyword {
                line: self.line,
                keyword: w,
            });
        }
        Ok(KEYWORDS
            .iter()
            .find(|(k, _)| *k == w)
            .map(|(_, kw)| Token::Keyword(*kw))
            .unwrap_or(Token::Ident(w)))
    }

    fn integer(&mut self) -> Result<Token, Error> {
        let start = self.pos;
        let radix = if self.peek_byte(0) == Some(b'0')
            && matches!(self.peek_byte(1), Some(b'x') | Some(b'X'))
        {
            self.pos += 2;
            16
        } else if self.peek_byte(0) == Some(b'0')
            && matches!(self.peek_byte(1), Some(b) if b.is_ascii_digit())
        {
            self.pos += 1;
            8
        } else {
            10
        };
        let digits_start = self.pos;
        while matches!(self.peek_byte(0), Some(b) if b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits = String::from_utf8_lossy(&self.src[digits_start..self.pos]).into_owned();
        // Integer suffixes carry no meaning here
        while matches!(self.peek_byte(0), Some(b'u' | b'U' | b'l' | b'L')) {
            self.pos += 1;
        }
        let literal = || String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        if digits.is_empty() {
            return Err(self.syntax(format!("invalid integer literal '{}'", literal())));
        }
        u64::from_str_radix(&digits, radix)
            .map(Token::Integer)
            .map_err(|_| self.syntax(format!("invalid integer literal '{}'", literal())))
    }

    fn string(&mut self) -> Result<Token, Error> {
        let start_line = self.line;
        self.pos += 1;
        let start = self.pos;
        loop {
            match self.peek_byte(0) {
                Some(b'"') => break,
                Some(b) => {
                    if b == b'\n' {
                        self.line += 1;
                    }
                    self.pos += 1;
                }
                None => {
                    return Err(Error::Syntax {
                        line: start_line,
                        msg: "unterminated string literal".to_owned(),
                    })
                }
            }
        }
        let s = String::from_utf8_lossy(&self.src[start..self.pos]).into_owned();
        self.pos += 1;
        Ok(Token::Str(s))
    }
}
