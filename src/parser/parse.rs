//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct and core parsing infrastructure,
//! including the error type, helper methods, and the main parse entry point.
//!
//! # Parser Architecture
//!
//! The Parser uses a recursive descent approach with the following organization:
//! - This module: Parser struct, helper methods, and coordination
//! - `declarations`: function definitions, parameters, types and local declarations
//! - `statements`: blocks, `if`, `while`, `for`, `return`, `break`, `continue`
//! - `expressions`: one method per precedence level
//!
//! Parser methods are split across multiple files using `impl Parser` blocks,
//! allowing each module to extend the Parser with related functionality while
//! maintaining access to the shared parser state.

use crate::parser::ast::*;
use crate::parser::lexer::{LexError, Lexer, Token, TokenKind};
use rustc_hash::FxHashSet;
use thiserror::Error;

/// Deepest nesting of statements, expressions and type constructors the
/// parser accepts. Operator chains count one level per operator.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Parser error type
#[derive(Debug, Clone, Error)]
#[error("Parse error at {location}: {message}")]
pub struct ParseError {
    pub message: String,
    pub location: SourceLocation,
}

impl ParseError {
    pub(crate) fn new(message: impl Into<String>, location: SourceLocation) -> Self {
        Self {
            message: message.into(),
            location,
        }
    }
}

/// Recursive descent parser for the C subset
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) position: usize,
    /// Number of enclosing loops; `break` and `continue` need at least one
    pub(crate) loop_depth: usize,
    /// Names of functions defined so far, for duplicate detection
    pub(crate) defined: FxHashSet<String>,
    /// Current nesting depth, bounded by [`MAX_NESTING_DEPTH`]
    pub(crate) depth: usize,
}

impl Parser {
    pub fn new(source: &str) -> Result<Self, LexError> {
        let tokens = Lexer::new(source).tokenize()?;
        Ok(Self {
            tokens,
            position: 0,
            loop_depth: 0,
            defined: FxHashSet::default(),
            depth: 0,
        })
    }

    /// Parse the entire program (a sequence of function definitions)
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::new();

        while !self.is_at_end() {
            let decl = self.parse_function_definition()?;
            program.nodes.push(decl);
        }

        Ok(program)
    }

    // ===== Helper methods =====

    /// Run `parse` one nesting level deeper
    pub(crate) fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.descend()?;
        let result = parse(self);
        self.ascend(1);
        result
    }

    /// Enter one nesting level. A failed parse is abandoned, so levels
    /// entered before an error are not given back.
    pub(crate) fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::new(
                format!("Nesting is deeper than {} levels", MAX_NESTING_DEPTH),
                self.current_location(),
            ));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn ascend(&mut self, levels: usize) {
        self.depth = self.depth.saturating_sub(levels);
    }

    pub(crate) fn is_type_keyword(&self) -> bool {
        Self::is_type_start(self.peek_kind())
    }

    pub(crate) fn is_type_start(kind: &TokenKind) -> bool {
        matches!(
            kind,
            TokenKind::Int | TokenKind::Char | TokenKind::Void | TokenKind::Const
        )
    }

    pub(crate) fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.position += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    pub(crate) fn peek(&self) -> &Token {
        // The token vector always ends with Eof and `advance` never moves past it
        &self.tokens[self.position.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<&TokenKind> {
        self.tokens.get(self.position + n).map(|t| &t.kind)
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.position.saturating_sub(1)]
    }

    pub(crate) fn previous_location(&self) -> SourceLocation {
        self.previous().location
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.peek().location
    }

    pub(crate) fn unexpected(&self, message: &str) -> ParseError {
        ParseError::new(
            format!("{}, found {}", message, self.peek()),
            self.current_location(),
        )
    }

    pub(crate) fn expect_token(&mut self, kind: &TokenKind, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected(message))
        }
    }

    pub(crate) fn expect_lparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LParen, &format!("Expected '(' {ctx}"))
    }

    pub(crate) fn expect_rparen(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RParen, &format!("Expected ')' {ctx}"))
    }

    pub(crate) fn expect_lbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::LBrace, &format!("Expected '{{' {ctx}"))
    }

    pub(crate) fn expect_rbrace(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::RBrace, &format!("Expected '}}' {ctx}"))
    }

    pub(crate) fn expect_semicolon(&mut self, ctx: &str) -> Result<(), ParseError> {
        self.expect_token(&TokenKind::Semicolon, &format!("Expected ';' {ctx}"))
    }

    pub(crate) fn expect_identifier(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Ident(name) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected("Expected identifier"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(source: &str) -> Program {
        Parser::new(source).unwrap().parse_program().unwrap()
    }

    fn parse_err(source: &str) -> ParseError {
        Parser::new(source).unwrap().parse_program().unwrap_err()
    }

    #[test]
    fn test_parse_simple_function() {
        let program = parse_ok("int main() { return 0; }");

        assert_eq!(program.nodes.len(), 1);
        match &program.nodes[0] {
            AstNode::FunctionDef {
                name,
                params,
                return_type,
                body,
                ..
            } => {
                assert_eq!(name, "main");
                assert_eq!(params.len(), 0);
                assert_eq!(*return_type, Type::Int);
                assert_eq!(body.len(), 1);
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_parse_expression() {
        let program = parse_ok("int main() { int x = 1 + 2 * 3; }");
        assert_eq!(program.nodes.len(), 1);
    }

    #[test]
    fn test_parse_if_statement() {
        let program = parse_ok("int main() { int x = 1; if (x > 0) return 1; else return 0; }");
        assert_eq!(program.nodes.len(), 1);
    }

    #[test]
    fn test_program_function_lookup() {
        let program = parse_ok("void f() {} int main() { f(); return 0; }");
        assert!(program.function("f").is_some());
        assert!(program.function("main").is_some());
        assert!(program.function("g").is_none());
    }

    #[test]
    fn test_duplicate_function_rejected() {
        let err = parse_err("int f() { return 1; } int f() { return 2; }");
        assert!(err.message.contains("defined more than once"));
        assert_eq!(err.location.line, 1);
    }

    #[test]
    fn test_break_outside_loop_rejected() {
        let err = parse_err("int main() { break; }");
        assert!(err.message.contains("outside of a loop"));

        let err = parse_err("int main() { if (1) { continue; } return 0; }");
        assert!(err.message.contains("outside of a loop"));
    }

    #[test]
    fn test_missing_semicolon_reports_position() {
        let err = parse_err("int main() {\n  int x = 1\n  return x;\n}");
        assert!(err.message.contains("Expected ';'"));
        assert_eq!(err.location, SourceLocation::new(3, 3));
    }

    #[test]
    fn test_lex_error_surfaces_from_new() {
        assert!(Parser::new("int main() { return 1 $ 2; }").is_err());
    }

    #[test]
    fn test_deep_nesting_rejected() {
        let parens = format!("int main() {{ return {}1{}; }}", "(".repeat(200_000), ")".repeat(200_000));
        let blocks = format!("int main() {{ {}{} }}", "{".repeat(100_000), "}".repeat(100_000));
        let negations = format!("int main() {{ return {}1; }}", "!".repeat(100_000));
        let chain = format!("int main() {{ return 1{}; }}", " + 1".repeat(100_000));
        let indexes = format!("int main() {{ int a[1]; return a{}; }}", "[0]".repeat(100_000));

        for source in [parens, blocks, negations, chain, indexes] {
            let err = parse_err(&source);
            assert!(err.message.contains("Nesting is deeper than"), "{}", err.message);
        }
    }

    #[test]
    fn test_moderate_nesting_accepted() {
        let parens = format!("int main() {{ return {}1{}; }}", "(".repeat(100), ")".repeat(100));
        let blocks = format!("int main() {{ {}{} return 0; }}", "{".repeat(100), "}".repeat(100));
        let chain = format!("int main() {{ return 1{}; }}", " + 1".repeat(200));

        for source in [parens, blocks, chain] {
            assert_eq!(parse_ok(&source).nodes.len(), 1);
        }

        // The depth is given back after each statement
        let many = format!("int main() {{ {} return 0; }}", "x = ((((1)))) + 2;".repeat(1_000));
        let many = many.replace("int main() {", "int main() { int x;");
        assert_eq!(parse_ok(&many).nodes.len(), 1);
    }
}
