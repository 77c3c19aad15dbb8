//! Statement parsing implementation
//!
//! This module handles parsing of all statement types of the subset:
//!
//! - Variable declarations: `int x = 42;`
//! - Control flow: `if`, `while`, `for`
//! - Jump statements: `return`, `break`, `continue`
//! - Compound statements: `{ ... }`
//! - Expression statements: function calls, assignments
//!
//! # Grammar
//!
//! ```text
//! statement ::= var_decl | if_stmt | while_stmt | for_stmt
//!             | return_stmt | break_stmt | continue_stmt
//!             | block | expr_stmt
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse block statements (inside braces, excluding the braces themselves)
    pub(crate) fn parse_block_statements(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut statements = Vec::new();

        while !self.check(&TokenKind::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        Ok(statements)
    }

    /// Parse a statement
    pub(crate) fn parse_statement(&mut self) -> Result<AstNode, ParseError> {
        self.nested(Self::statement)
    }

    fn statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.match_token(&TokenKind::Return) {
            return self.parse_return_statement();
        }

        if self.match_token(&TokenKind::If) {
            return self.parse_if_statement();
        }

        if self.match_token(&TokenKind::While) {
            return self.parse_while_statement();
        }

        if self.match_token(&TokenKind::For) {
            return self.parse_for_statement();
        }

        if self.match_token(&TokenKind::Break) {
            self.require_loop("break", loc)?;
            self.expect_semicolon("after 'break'")?;
            return Ok(AstNode::Break { location: loc });
        }

        if self.match_token(&TokenKind::Continue) {
            self.require_loop("continue", loc)?;
            self.expect_semicolon("after 'continue'")?;
            return Ok(AstNode::Continue { location: loc });
        }

        // Empty statement
        if self.match_token(&TokenKind::Semicolon) {
            return Ok(AstNode::Block {
                statements: Vec::new(),
                location: loc,
            });
        }

        if self.match_token(&TokenKind::LBrace) {
            let statements = self.parse_block_statements()?;
            self.expect_rbrace("after block")?;
            return Ok(AstNode::Block {
                statements,
                location: loc,
            });
        }

        if self.is_type_keyword() {
            return self.parse_variable_declaration();
        }

        let expr = self.parse_expression()?;
        self.expect_semicolon("after expression")?;
        Ok(AstNode::ExpressionStatement {
            expr: Box::new(expr),
            location: loc,
        })
    }

    fn require_loop(&self, keyword: &str, loc: SourceLocation) -> Result<(), ParseError> {
        if self.loop_depth == 0 {
            Err(ParseError::new(
                format!("'{}' statement outside of a loop", keyword),
                loc,
            ))
        } else {
            Ok(())
        }
    }

    /// Parse return statement
    fn parse_return_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        let expr = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };

        self.expect_semicolon("after return")?;

        Ok(AstNode::Return {
            expr,
            location: loc,
        })
    }

    /// Parse if statement
    fn parse_if_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'if'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after if condition")?;

        let then_branch = Box::new(self.parse_statement()?);

        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(AstNode::If {
            condition,
            then_branch,
            else_branch,
            location: loc,
        })
    }

    /// Parse while statement
    fn parse_while_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'while'")?;
        let condition = Box::new(self.parse_expression()?);
        self.expect_rparen("after while condition")?;

        let body = Box::new(self.parse_loop_body()?);

        Ok(AstNode::While {
            condition,
            body,
            location: loc,
        })
    }

    /// Parse for statement
    fn parse_for_statement(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.previous_location();

        self.expect_lparen("after 'for'")?;

        // Init (optional); a declaration consumes its own semicolon
        let init = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.is_type_keyword() {
            Some(Box::new(self.parse_variable_declaration()?))
        } else {
            let expr = self.parse_expression()?;
            self.expect_semicolon("after for init")?;
            Some(Box::new(expr))
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_semicolon("after for condition")?;

        let increment = if self.check(&TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect_rparen("after for clauses")?;

        let body = Box::new(self.parse_loop_body()?);

        Ok(AstNode::For {
            init,
            condition,
            increment,
            body,
            location: loc,
        })
    }

    fn parse_loop_body(&mut self) -> Result<AstNode, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_statement();
        self.loop_depth -= 1;
        body
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn body_of(source: &str) -> Vec<AstNode> {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        match program.nodes.into_iter().next() {
            Some(AstNode::FunctionDef { body, .. }) => body,
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_for_with_declaration() {
        let body = body_of("int main() { for (int i = 0; i < 3; i += 1) { } return 0; }");
        match &body[0] {
            AstNode::For {
                init,
                condition,
                increment,
                ..
            } => {
                assert!(matches!(init.as_deref(), Some(AstNode::VarDecl { .. })));
                assert!(condition.is_some());
                assert!(matches!(
                    increment.as_deref(),
                    Some(AstNode::CompoundAssignment { op: BinOp::Add, .. })
                ));
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_for_with_empty_clauses() {
        let body = body_of("int main() { for (;;) { break; } return 0; }");
        match &body[0] {
            AstNode::For {
                init,
                condition,
                increment,
                ..
            } => {
                assert!(init.is_none());
                assert!(condition.is_none());
                assert!(increment.is_none());
            }
            other => panic!("Expected for loop, got {:?}", other),
        }
    }

    #[test]
    fn test_dangling_else_binds_inner() {
        let body = body_of("int main() { if (1) if (0) return 1; else return 2; return 3; }");
        match &body[0] {
            AstNode::If {
                then_branch,
                else_branch,
                ..
            } => {
                assert!(else_branch.is_none());
                assert!(matches!(
                    then_branch.as_ref(),
                    AstNode::If {
                        else_branch: Some(_),
                        ..
                    }
                ));
            }
            other => panic!("Expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_break_inside_nested_block_of_loop() {
        let body = body_of("int main() { while (1) { if (1) { break; } continue; } return 0; }");
        assert!(matches!(body[0], AstNode::While { .. }));
    }

    #[test]
    fn test_unclosed_block() {
        let err = Parser::new("int main() { if (1) { return 0; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("Expected '}'"));
    }
}
