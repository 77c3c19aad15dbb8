//! Lexer (tokenizer) for the C subset
//!
//! Converts raw source text into [`Token`]s consumed by the parser. The lexer
//! is lazy: it implements [`Iterator`] and produces one token per call,
//! ending with a single [`TokenKind::Eof`]. [`Lexer::reset`] rewinds it to the
//! start of the input.
//!
//! `#include` and other preprocessor directives are skipped rather than
//! parsed, matching the interpreter's no-preprocessor policy.

use super::ast::SourceLocation;
use std::fmt;
use thiserror::Error;

/// All token kinds produced by the lexer, with their literal payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    IntLiteral(i32),
    CharLiteral(i8),
    StringLiteral(Vec<u8>),

    // Identifiers
    Ident(String),

    // Keywords
    Int,
    Char,
    Void,
    Const,
    If,
    Else,
    While,
    For,
    Return,
    Break,
    Continue,

    // Arithmetic
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %

    // Comparison
    EqEq,  // ==
    NotEq, // !=
    Lt,    // <
    Le,    // <=
    Gt,    // >
    Ge,    // >=

    // Logical
    AndAnd, // &&
    OrOr,   // ||
    Bang,   // !

    // Address-of
    Amp, // &

    // Assignment
    Eq,        // =
    PlusEq,    // +=
    MinusEq,   // -=
    StarEq,    // *=
    SlashEq,   // /=
    PercentEq, // %=

    // Increment/Decrement
    PlusPlus,   // ++
    MinusMinus, // --

    // Punctuation
    LParen,    // (
    RParen,    // )
    LBrace,    // {
    RBrace,    // }
    LBracket,  // [
    RBracket,  // ]
    Semicolon, // ;
    Comma,     // ,

    // End of input
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::IntLiteral(n) => write!(f, "int literal {}", n),
            TokenKind::CharLiteral(c) => {
                let byte = *c as u8;
                if byte.is_ascii_graphic() || byte == b' ' {
                    write!(f, "char literal '{}'", byte as char)
                } else {
                    write!(f, "char literal '\\x{:02x}'", byte)
                }
            }
            TokenKind::StringLiteral(s) => {
                write!(f, "string literal \"{}\"", String::from_utf8_lossy(s).escape_debug())
            }
            TokenKind::Ident(s) => write!(f, "identifier '{}'", s),
            TokenKind::Int => write!(f, "'int'"),
            TokenKind::Char => write!(f, "'char'"),
            TokenKind::Void => write!(f, "'void'"),
            TokenKind::Const => write!(f, "'const'"),
            TokenKind::If => write!(f, "'if'"),
            TokenKind::Else => write!(f, "'else'"),
            TokenKind::While => write!(f, "'while'"),
            TokenKind::For => write!(f, "'for'"),
            TokenKind::Return => write!(f, "'return'"),
            TokenKind::Break => write!(f, "'break'"),
            TokenKind::Continue => write!(f, "'continue'"),
            TokenKind::Plus => write!(f, "'+'"),
            TokenKind::Minus => write!(f, "'-'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Slash => write!(f, "'/'"),
            TokenKind::Percent => write!(f, "'%'"),
            TokenKind::EqEq => write!(f, "'=='"),
            TokenKind::NotEq => write!(f, "'!='"),
            TokenKind::Lt => write!(f, "'<'"),
            TokenKind::Le => write!(f, "'<='"),
            TokenKind::Gt => write!(f, "'>'"),
            TokenKind::Ge => write!(f, "'>='"),
            TokenKind::AndAnd => write!(f, "'&&'"),
            TokenKind::OrOr => write!(f, "'||'"),
            TokenKind::Bang => write!(f, "'!'"),
            TokenKind::Amp => write!(f, "'&'"),
            TokenKind::Eq => write!(f, "'='"),
            TokenKind::PlusEq => write!(f, "'+='"),
            TokenKind::MinusEq => write!(f, "'-='"),
            TokenKind::StarEq => write!(f, "'*='"),
            TokenKind::SlashEq => write!(f, "'/='"),
            TokenKind::PercentEq => write!(f, "'%='"),
            TokenKind::PlusPlus => write!(f, "'++'"),
            TokenKind::MinusMinus => write!(f, "'--'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::Semicolon => write!(f, "';'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}

/// A token together with the place it starts in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.kind.fmt(f)
    }
}

/// Lexer error type
#[derive(Debug, Clone, Error)]
#[error("Lexer error at {location}: {message}")]
pub struct LexError {
    pub message: String,
    pub location: SourceLocation,
}

impl LexError {
    fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Lexer for C source code
pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl Lexer {
    /// Create a new lexer for the given source string.
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    /// Rewind to the beginning of the input.
    pub fn reset(&mut self) {
        self.position = 0;
        self.line = 1;
        self.column = 1;
        self.finished = false;
    }

    /// Tokenize the entire input, ending with `Eof`
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        self.collect()
    }

    /// Produce the next token, skipping whitespace, comments and
    /// preprocessor lines. Returns `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace_and_comments()?;
            if self.peek() == Some('#') {
                self.skip_preprocessor_directive();
                continue;
            }
            break;
        }

        let loc = self.current_location();
        let Some(ch) = self.advance() else {
            return Ok(Token::new(TokenKind::Eof, loc));
        };

        let kind = match ch {
            '"' => self.string_literal(loc)?,
            '\'' => self.char_literal(loc)?,
            '0'..='9' => self.number_literal(ch, loc)?,
            'a'..='z' | 'A'..='Z' | '_' => self.identifier_or_keyword(ch),

            '+' => self.pick(&[('+', TokenKind::PlusPlus), ('=', TokenKind::PlusEq)], TokenKind::Plus),
            '-' => self.pick(
                &[('-', TokenKind::MinusMinus), ('=', TokenKind::MinusEq)],
                TokenKind::Minus,
            ),
            '*' => self.pick(&[('=', TokenKind::StarEq)], TokenKind::Star),
            '/' => self.pick(&[('=', TokenKind::SlashEq)], TokenKind::Slash),
            '%' => self.pick(&[('=', TokenKind::PercentEq)], TokenKind::Percent),
            '=' => self.pick(&[('=', TokenKind::EqEq)], TokenKind::Eq),
            '!' => self.pick(&[('=', TokenKind::NotEq)], TokenKind::Bang),
            '<' => self.pick(&[('=', TokenKind::Le)], TokenKind::Lt),
            '>' => self.pick(&[('=', TokenKind::Ge)], TokenKind::Gt),
            '&' => self.pick(&[('&', TokenKind::AndAnd)], TokenKind::Amp),
            '|' => {
                if self.peek() == Some('|') {
                    self.advance();
                    TokenKind::OrOr
                } else {
                    return Err(LexError::new("Unexpected character: '|'", loc));
                }
            }
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,

            _ => {
                return Err(LexError::new(
                    format!("Unexpected character: '{}'", ch),
                    loc,
                ))
            }
        };

        Ok(Token::new(kind, loc))
    }

    /// Choose a two-character operator when the next character matches,
    /// otherwise fall back to the single-character one.
    fn pick(&mut self, pairs: &[(char, TokenKind)], single: TokenKind) -> TokenKind {
        for (next, kind) in pairs {
            if self.peek() == Some(*next) {
                self.advance();
                return kind.clone();
            }
        }
        single
    }

    /// Parse string literal; the opening quote is already consumed
    fn string_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let mut bytes = Vec::new();

        while let Some(ch) = self.peek() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(TokenKind::StringLiteral(bytes));
                }
                '\n' => break,
                '\\' => {
                    self.advance();
                    bytes.push(self.escape_sequence()?);
                }
                _ => {
                    self.advance();
                    let mut utf8 = [0u8; 4];
                    bytes.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                }
            }
        }

        Err(LexError::new("Unterminated string literal", loc))
    }

    /// Parse character literal; the opening quote is already consumed
    fn char_literal(&mut self, loc: SourceLocation) -> Result<TokenKind, LexError> {
        let value = match self.advance() {
            None | Some('\n') => {
                return Err(LexError::new("Unterminated character literal", loc))
            }
            Some('\'') => return Err(LexError::new("Empty character literal", loc)),
            Some('\\') => self.escape_sequence()?,
            Some(ch) if ch.is_ascii() => ch as u8,
            Some(ch) => {
                return Err(LexError::new(
                    format!("Character '{}' does not fit in a char", ch),
                    loc,
                ))
            }
        };

        if self.advance() != Some('\'') {
            return Err(LexError::new("Unterminated character literal", loc));
        }

        Ok(TokenKind::CharLiteral(value as i8))
    }

    /// Decode the character after a backslash
    fn escape_sequence(&mut self) -> Result<u8, LexError> {
        let loc = self.current_location();
        let escaped = self
            .advance()
            .ok_or_else(|| LexError::new("Unexpected end of file in escape sequence", loc))?;

        match escaped {
            'n' => Ok(b'\n'),
            't' => Ok(b'\t'),
            'r' => Ok(b'\r'),
            '0' => Ok(0),
            '\\' => Ok(b'\\'),
            '\'' => Ok(b'\''),
            '"' => Ok(b'"'),
            _ => Err(LexError::new(
                format!("Unknown escape sequence: \\{}", escaped),
                loc,
            )),
        }
    }

    /// Parse numeric literal (decimal integers only)
    fn number_literal(
        &mut self,
        first_digit: char,
        loc: SourceLocation,
    ) -> Result<TokenKind, LexError> {
        let mut num_str = String::from(first_digit);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            return Err(LexError::new(
                format!("Invalid integer literal: {}{}", num_str, self.peek().unwrap_or_default()),
                loc,
            ));
        }

        num_str
            .parse::<i32>()
            .map(TokenKind::IntLiteral)
            .map_err(|_| LexError::new(format!("Integer literal out of range: {}", num_str), loc))
    }

    /// Parse identifier or keyword
    fn identifier_or_keyword(&mut self, first_char: char) -> TokenKind {
        let mut ident = String::from(first_char);

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.as_str() {
            "int" => TokenKind::Int,
            "char" => TokenKind::Char,
            "void" => TokenKind::Void,
            "const" => TokenKind::Const,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "while" => TokenKind::While,
            "for" => TokenKind::For,
            "return" => TokenKind::Return,
            "break" => TokenKind::Break,
            "continue" => TokenKind::Continue,
            _ => TokenKind::Ident(ident),
        }
    }

    /// Skip whitespace and comments
    fn skip_whitespace_and_comments(&mut self) -> Result<(), LexError> {
        loop {
            match self.peek() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => {
                    self.advance();
                }
                Some('/') if self.peek_ahead(1) == Some('/') => self.skip_line_comment(),
                Some('/') if self.peek_ahead(1) == Some('*') => self.skip_block_comment()?,
                _ => break,
            }
        }
        Ok(())
    }

    /// Skip single-line comment (// ...)
    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.advance() {
            if ch == '\n' {
                break;
            }
        }
    }

    /// Skip multi-line comment (/* ... */)
    fn skip_block_comment(&mut self) -> Result<(), LexError> {
        let start_loc = self.current_location();
        self.advance(); // '/'
        self.advance(); // '*'

        while !self.is_at_end() {
            if self.peek() == Some('*') && self.peek_ahead(1) == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }

        Err(LexError::new("Unterminated block comment", start_loc))
    }

    /// Skip preprocessor directive (#include, etc.) up to end of line
    fn skip_preprocessor_directive(&mut self) {
        self.skip_line_comment();
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_ahead(&self, n: usize) -> Option<char> {
        self.input.get(self.position + n).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += 1;

        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }

        Some(ch)
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_location(&self) -> SourceLocation {
        SourceLocation::new(self.line, self.column)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        if matches!(&result, Err(_) | Ok(Token { kind: TokenKind::Eof, .. })) {
            self.finished = true;
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_tokens() {
        let tokens = kinds("int main() { return 0; }");

        assert_eq!(
            tokens,
            vec![
                TokenKind::Int,
                TokenKind::Ident("main".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::Return,
                TokenKind::IntLiteral(0),
                TokenKind::Semicolon,
                TokenKind::RBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        let tokens = kinds("++ -- += -= *= /= %= == != <= >= && || ! & < >");

        assert_eq!(
            tokens,
            vec![
                TokenKind::PlusPlus,
                TokenKind::MinusMinus,
                TokenKind::PlusEq,
                TokenKind::MinusEq,
                TokenKind::StarEq,
                TokenKind::SlashEq,
                TokenKind::PercentEq,
                TokenKind::EqEq,
                TokenKind::NotEq,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::AndAnd,
                TokenKind::OrOr,
                TokenKind::Bang,
                TokenKind::Amp,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments() {
        let tokens = kinds("int x; // comment\nint y; /* block\ncomment */ int z;");

        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[1], TokenKind::Ident("x".to_string()));
        assert_eq!(tokens[4], TokenKind::Ident("y".to_string()));
        assert_eq!(tokens[7], TokenKind::Ident("z".to_string()));
    }

    #[test]
    fn test_string_literal_with_embedded_nuls() {
        let tokens = kinds(r#""ab\0\0\n""#);
        assert_eq!(
            tokens[0],
            TokenKind::StringLiteral(vec![b'a', b'b', 0, 0, b'\n'])
        );
    }

    #[test]
    fn test_char_literals() {
        let tokens = kinds(r"'a' '\0' '\n' '\''");
        assert_eq!(tokens[0], TokenKind::CharLiteral(b'a' as i8));
        assert_eq!(tokens[1], TokenKind::CharLiteral(0));
        assert_eq!(tokens[2], TokenKind::CharLiteral(b'\n' as i8));
        assert_eq!(tokens[3], TokenKind::CharLiteral(b'\'' as i8));
    }

    #[test]
    fn test_preprocessor_skip() {
        let tokens = kinds("#include <stdio.h>\nint x;");
        assert_eq!(tokens[0], TokenKind::Int);
        assert_eq!(tokens[1], TokenKind::Ident("x".to_string()));
    }

    #[test]
    fn test_locations() {
        let tokens = Lexer::new("int\n  x;").tokenize().unwrap();
        assert_eq!(tokens[0].location, SourceLocation::new(1, 1));
        assert_eq!(tokens[1].location, SourceLocation::new(2, 3));
        assert_eq!(tokens[2].location, SourceLocation::new(2, 4));
    }

    #[test]
    fn test_lazy_iteration_and_reset() {
        let mut lexer = Lexer::new("a b");
        let first = lexer.next().unwrap().unwrap();
        assert_eq!(first.kind, TokenKind::Ident("a".to_string()));

        lexer.reset();
        let all: Vec<_> = lexer.by_ref().map(|t| t.unwrap().kind).collect();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2], TokenKind::Eof);
        assert!(lexer.next().is_none());
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::new("int x = \"abc").tokenize().unwrap_err();
        assert!(err.message.contains("Unterminated string"));
        assert_eq!(err.location, SourceLocation::new(1, 9));
    }

    #[test]
    fn test_invalid_escape() {
        let err = Lexer::new(r#""\q""#).tokenize().unwrap_err();
        assert!(err.message.contains("Unknown escape"));
    }

    #[test]
    fn test_unrecognized_character() {
        let err = Lexer::new("int x = 1 @ 2;").tokenize().unwrap_err();
        assert!(err.message.contains("'@'"));
        assert_eq!(err.location, SourceLocation::new(1, 11));
    }

    #[test]
    fn test_unterminated_char() {
        assert!(Lexer::new("'a").tokenize().is_err());
        assert!(Lexer::new("''").tokenize().is_err());
    }
}
