//! Expression parsing implementation
//!
//! One method per precedence level, lowest first:
//!
//! ```text
//! assignment      = || && == != < <= > >= + - * / % unary postfix primary
//! ```
//!
//! - Assignment (`=`, `+=`, `-=`, `*=`, `/=`, `%=`) is right associative and
//!   requires an lvalue on its left.
//! - Unary prefix: `-`, `+`, `!`, `&`, `*`, `++`, `--`
//! - Postfix: call, `[]`, `++`, `--`
//! - Primary: literals, identifiers, `( expr )`, `{ ... }` array literals and
//!   parenthesised declarations such as `(int x = 0)`.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser};

impl Parser {
    /// Parse expression (top-level entry point)
    pub(crate) fn parse_expression(&mut self) -> Result<AstNode, ParseError> {
        self.parse_assignment()
    }

    /// Parse assignment (right-associative)
    fn parse_assignment(&mut self) -> Result<AstNode, ParseError> {
        self.nested(Self::assignment)
    }

    fn assignment(&mut self) -> Result<AstNode, ParseError> {
        let expr = self.parse_logical_or()?;

        let loc = self.current_location();
        let compound_op = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            _ => return Ok(expr),
        };
        self.advance();

        if !expr.is_lvalue() {
            return Err(ParseError::new(
                "Left side of assignment is not assignable",
                expr.location(),
            ));
        }

        let rhs = Box::new(self.parse_assignment()?);
        let lhs = Box::new(expr);

        Ok(match compound_op {
            None => AstNode::Assignment {
                lhs,
                rhs,
                location: loc,
            },
            Some(op) => AstNode::CompoundAssignment {
                lhs,
                op,
                rhs,
                location: loc,
            },
        })
    }

    /// Parse logical OR (||)
    fn parse_logical_or(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_logical_and()?;
        let mut levels = 0;

        while self.match_token(&TokenKind::OrOr) {
            let loc = self.previous_location();
            self.descend()?;
            levels += 1;
            let right = Box::new(self.parse_logical_and()?);
            left = AstNode::BinaryOp {
                op: BinOp::Or,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        self.ascend(levels);
        Ok(left)
    }

    /// Parse logical AND (&&)
    fn parse_logical_and(&mut self) -> Result<AstNode, ParseError> {
        let mut left = self.parse_equality()?;
        let mut levels = 0;

        while self.match_token(&TokenKind::AndAnd) {
            let loc = self.previous_location();
            self.descend()?;
            levels += 1;
            let right = Box::new(self.parse_equality()?);
            left = AstNode::BinaryOp {
                op: BinOp::And,
                left: Box::new(left),
                right,
                location: loc,
            };
        }

        self.ascend(levels);
        Ok(left)
    }

    /// Parse equality (== !=)
    fn parse_equality(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::EqEq, BinOp::Eq), (TokenKind::NotEq, BinOp::Ne)],
            Self::parse_relational,
        )
    }

    /// Parse relational (< <= > >=)
    fn parse_relational(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            &[
                (TokenKind::Lt, BinOp::Lt),
                (TokenKind::Le, BinOp::Le),
                (TokenKind::Gt, BinOp::Gt),
                (TokenKind::Ge, BinOp::Ge),
            ],
            Self::parse_additive,
        )
    }

    /// Parse additive (+ -)
    fn parse_additive(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            &[(TokenKind::Plus, BinOp::Add), (TokenKind::Minus, BinOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    /// Parse multiplicative (* / %)
    fn parse_multiplicative(&mut self) -> Result<AstNode, ParseError> {
        self.parse_binary_level(
            &[
                (TokenKind::Star, BinOp::Mul),
                (TokenKind::Slash, BinOp::Div),
                (TokenKind::Percent, BinOp::Mod),
            ],
            Self::parse_unary,
        )
    }

    /// Left-associative loop shared by the binary precedence levels
    fn parse_binary_level(
        &mut self,
        operators: &[(TokenKind, BinOp)],
        next: fn(&mut Self) -> Result<AstNode, ParseError>,
    ) -> Result<AstNode, ParseError> {
        let mut left = next(self)?;
        let mut levels = 0;

        'outer: loop {
            let loc = self.current_location();
            for (kind, op) in operators {
                if self.match_token(kind) {
                    self.descend()?;
                    levels += 1;
                    let right = Box::new(next(self)?);
                    left = AstNode::BinaryOp {
                        op: *op,
                        left: Box::new(left),
                        right,
                        location: loc,
                    };
                    continue 'outer;
                }
            }
            break;
        }

        self.ascend(levels);
        Ok(left)
    }

    /// Parse unary (! - + & * ++ --)
    fn parse_unary(&mut self) -> Result<AstNode, ParseError> {
        self.nested(Self::unary)
    }

    fn unary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        if self.match_token(&TokenKind::Bang) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(AstNode::UnaryOp {
                op: UnOp::Not,
                operand,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Minus) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(AstNode::UnaryOp {
                op: UnOp::Neg,
                operand,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Plus) {
            // Unary plus: just return the operand
            return self.parse_unary();
        }

        if self.match_token(&TokenKind::Amp) {
            let operand = self.parse_unary()?;
            if !operand.is_lvalue() {
                return Err(ParseError::new(
                    "Cannot take the address of this expression",
                    operand.location(),
                ));
            }
            return Ok(AstNode::AddressOf {
                operand: Box::new(operand),
                location: loc,
            });
        }

        if self.match_token(&TokenKind::Star) {
            let operand = Box::new(self.parse_unary()?);
            return Ok(AstNode::Deref {
                operand,
                location: loc,
            });
        }

        if self.match_token(&TokenKind::PlusPlus) {
            let operand = self.parse_unary()?;
            return self.increment(UnOp::PreInc, operand, loc);
        }

        if self.match_token(&TokenKind::MinusMinus) {
            let operand = self.parse_unary()?;
            return self.increment(UnOp::PreDec, operand, loc);
        }

        self.parse_postfix()
    }

    fn increment(
        &self,
        op: UnOp,
        operand: AstNode,
        loc: SourceLocation,
    ) -> Result<AstNode, ParseError> {
        if !operand.is_lvalue() {
            let symbol = match op {
                UnOp::PreInc | UnOp::PostInc => "++",
                _ => "--",
            };
            return Err(ParseError::new(
                format!("Operand of '{}' is not assignable", symbol),
                operand.location(),
            ));
        }
        Ok(AstNode::UnaryOp {
            op,
            operand: Box::new(operand),
            location: loc,
        })
    }

    /// Parse postfix (() [] ++ --)
    fn parse_postfix(&mut self) -> Result<AstNode, ParseError> {
        let mut expr = self.parse_primary()?;
        let mut levels = 0;

        loop {
            let loc = self.current_location();
            if matches!(
                self.peek_kind(),
                TokenKind::PlusPlus | TokenKind::MinusMinus | TokenKind::LBracket | TokenKind::LParen
            ) {
                self.descend()?;
                levels += 1;
            }

            if self.match_token(&TokenKind::PlusPlus) {
                expr = self.increment(UnOp::PostInc, expr, loc)?;
            } else if self.match_token(&TokenKind::MinusMinus) {
                expr = self.increment(UnOp::PostDec, expr, loc)?;
            } else if self.match_token(&TokenKind::LBracket) {
                let index = Box::new(self.parse_expression()?);
                self.expect_token(&TokenKind::RBracket, "Expected ']' after array index")?;
                expr = AstNode::ArrayAccess {
                    array: Box::new(expr),
                    index,
                    location: loc,
                };
            } else if self.check(&TokenKind::LParen) {
                let AstNode::Variable(name, name_loc) = expr else {
                    return Err(ParseError::new("Function call must be on identifier", loc));
                };
                self.advance();
                let args = self.parse_argument_list()?;
                self.expect_rparen("after function arguments")?;

                expr = AstNode::FunctionCall {
                    name,
                    args,
                    location: name_loc,
                };
            } else {
                break;
            }
        }

        self.ascend(levels);
        Ok(expr)
    }

    /// Parse argument list: (expr, expr, ...)
    fn parse_argument_list(&mut self) -> Result<Vec<AstNode>, ParseError> {
        let mut args = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(args)
    }

    /// Parse array literal body after the opening brace: { expr, expr, ... }
    fn parse_array_literal(&mut self, loc: SourceLocation) -> Result<AstNode, ParseError> {
        let mut elements = Vec::new();

        while !self.check(&TokenKind::RBrace) {
            elements.push(self.parse_expression()?);

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_rbrace("after array literal")?;

        if elements.is_empty() {
            return Err(ParseError::new("Array literal cannot be empty", loc));
        }

        Ok(AstNode::ArrayLiteral {
            elements,
            location: loc,
        })
    }

    /// Parse primary (literals, variables, parenthesized expressions)
    fn parse_primary(&mut self) -> Result<AstNode, ParseError> {
        let loc = self.current_location();

        let literal = match self.peek_kind() {
            TokenKind::IntLiteral(n) => Some(AstNode::IntLiteral(*n, loc)),
            TokenKind::CharLiteral(c) => Some(AstNode::CharLiteral(*c, loc)),
            TokenKind::StringLiteral(s) => Some(AstNode::StringLiteral(s.clone(), loc)),
            TokenKind::Ident(name) => Some(AstNode::Variable(name.clone(), loc)),
            _ => None,
        };
        if let Some(node) = literal {
            self.advance();
            return Ok(node);
        }

        if self.match_token(&TokenKind::LBrace) {
            return self.parse_array_literal(loc);
        }

        if self.match_token(&TokenKind::LParen) {
            // A declaration used as a value: `(int x = 0)`
            if self.is_type_keyword() {
                let decl = self.parse_declarator()?;
                if !matches!(decl, AstNode::VarDecl { init: Some(_), .. }) {
                    return Err(ParseError::new(
                        "Declaration in expression position requires an initializer",
                        decl.location(),
                    ));
                }
                self.expect_rparen("after declaration")?;
                return Ok(decl);
            }

            let expr = self.parse_expression()?;
            self.expect_rparen("after expression")?;
            return Ok(expr);
        }

        Err(self.unexpected("Expected expression"))
    }
}
