//! Declaration parsing implementation
//!
//! This module handles parsing of declarations in C programs:
//!
//! - Function definitions: `type name(params) { ... }`
//! - Function parameters, with `T name[]` decaying to `T *name`
//! - Type parsing: `const`, base types and pointers
//! - Local variable declarations, including array dimensions after the name
//!
//! # Grammar
//!
//! ```text
//! function_def ::= type identifier "(" params ")" "{" statements "}"
//! params       ::= ε | "void" | param ("," param)*
//! type         ::= "const"? base_type "*"*
//! declarator   ::= type identifier ("[" integer? "]")* ("=" expression)?
//! ```
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use crate::parser::ast::*;
use crate::parser::lexer::TokenKind;
use crate::parser::parse::{ParseError, Parser, MAX_NESTING_DEPTH};

impl Parser {
    /// Parse function definition: type name(params) { body }
    pub(crate) fn parse_function_definition(&mut self) -> Result<AstNode, ParseError> {
        let (return_type, _) = self.parse_type()?;
        let name = self.expect_identifier()?;
        let loc = self.previous_location();

        if !self.defined.insert(name.clone()) {
            return Err(ParseError::new(
                format!("Function '{}' is defined more than once", name),
                loc,
            ));
        }

        self.expect_lparen("after function name")?;
        let params = self.parse_parameter_list()?;
        self.expect_rparen("after parameters")?;

        self.expect_lbrace("before function body")?;
        let body = self.parse_block_statements()?;
        self.expect_rbrace("after function body")?;

        Ok(AstNode::FunctionDef {
            name,
            params,
            body,
            return_type,
            location: loc,
        })
    }

    /// Parse parameter list: (type name, type name, ...)
    pub(crate) fn parse_parameter_list(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();

        if self.check(&TokenKind::RParen) {
            return Ok(params);
        }

        // (void) means no parameters
        if self.check(&TokenKind::Void) && self.peek_ahead(1) == Some(&TokenKind::RParen) {
            self.advance();
            return Ok(params);
        }

        loop {
            let loc = self.current_location();
            let (base, is_const) = self.parse_type()?;
            let name = self.expect_identifier()?;
            let dims = self.parse_array_dims()?;

            let param_type = match dims.split_first() {
                // An array parameter is a pointer to its element type
                Some((_, inner)) => Self::apply_dims(base, inner, loc)?.with_pointer(),
                None => base,
            };

            if param_type == Type::Void {
                return Err(ParseError::new(
                    format!("Parameter '{}' cannot have type void", name),
                    loc,
                ));
            }

            params.push(Param {
                name,
                param_type,
                is_const,
            });

            if !self.match_token(&TokenKind::Comma) {
                break;
            }
        }

        Ok(params)
    }

    /// Parse type: [const] base_type [*]*
    ///
    /// Returns the type and whether the declared name itself is read-only.
    /// `const` in front of a pointer type qualifies the pointee, which is not
    /// tracked, so only non-pointer declarations become read-only bindings.
    pub(crate) fn parse_type(&mut self) -> Result<(Type, bool), ParseError> {
        let has_const = self.match_token(&TokenKind::Const);

        let mut ty = if self.match_token(&TokenKind::Int) {
            Type::Int
        } else if self.match_token(&TokenKind::Char) {
            Type::Char
        } else if self.match_token(&TokenKind::Void) {
            Type::Void
        } else {
            return Err(self.unexpected("Expected type"));
        };

        let mut levels = 0;
        while self.match_token(&TokenKind::Star) {
            levels += 1;
            if levels > MAX_NESTING_DEPTH {
                return Err(ParseError::new(
                    "Too many levels of pointer indirection",
                    self.previous_location(),
                ));
            }
            ty = ty.with_pointer();
        }

        let is_const = has_const && !ty.is_pointer();
        Ok((ty, is_const))
    }

    /// Parse `[N]` / `[]` suffixes after a declarator name
    fn parse_array_dims(&mut self) -> Result<Vec<Option<usize>>, ParseError> {
        let mut dims = Vec::new();

        while self.match_token(&TokenKind::LBracket) {
            if dims.len() == MAX_NESTING_DEPTH {
                return Err(ParseError::new(
                    "Too many array dimensions",
                    self.previous_location(),
                ));
            }
            if self.match_token(&TokenKind::RBracket) {
                dims.push(None);
                continue;
            }

            let loc = self.current_location();
            let size = match self.peek_kind() {
                TokenKind::IntLiteral(n) if *n > 0 => *n as usize,
                TokenKind::IntLiteral(_) => {
                    return Err(ParseError::new("Array size must be positive", loc))
                }
                _ => {
                    return Err(ParseError::new(
                        "Array size must be a constant integer",
                        loc,
                    ))
                }
            };
            self.advance();
            self.expect_token(&TokenKind::RBracket, "Expected ']' after array size")?;
            dims.push(Some(size));
        }

        Ok(dims)
    }

    /// Wrap `base` in array types for the given dimensions, outermost first.
    /// Every dimension must be sized.
    fn apply_dims(
        base: Type,
        dims: &[Option<usize>],
        loc: SourceLocation,
    ) -> Result<Type, ParseError> {
        dims.iter().rev().try_fold(base, |ty, dim| match dim {
            Some(n) => Self::array_of(ty, *n, loc),
            None => Err(ParseError::new(
                "Only the first array dimension may be omitted",
                loc,
            )),
        })
    }

    /// `elem[count]`, provided the whole array stays addressable
    fn array_of(elem: Type, count: usize, loc: SourceLocation) -> Result<Type, ParseError> {
        let array = elem.with_array(count);
        match array.checked_size() {
            Some(size) if size <= MAX_OBJECT_SIZE => Ok(array),
            _ => Err(ParseError::new(
                format!("Array type {} is too large", array),
                loc,
            )),
        }
    }

    /// Parse variable declaration: type name[[size]]* [= init];
    pub(crate) fn parse_variable_declaration(&mut self) -> Result<AstNode, ParseError> {
        let decl = self.parse_declarator()?;
        self.expect_semicolon("after variable declaration")?;
        Ok(decl)
    }

    /// Parse a declaration without its terminating semicolon.
    ///
    /// Shared by declaration statements, `for` initialisers and declarations
    /// in expression position.
    pub(crate) fn parse_declarator(&mut self) -> Result<AstNode, ParseError> {
        let (base, is_const) = self.parse_type()?;
        let name = self.expect_identifier()?;
        let loc = self.previous_location();
        let dims = self.parse_array_dims()?;

        let init = if self.match_token(&TokenKind::Eq) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };

        let var_type = match dims.split_first() {
            None => base,
            Some((outer, inner)) => {
                let elem = Self::apply_dims(base, inner, loc)?;
                let count = match outer {
                    Some(n) => *n,
                    None => Self::inferred_length(&elem, init.as_deref(), loc)?,
                };
                Self::array_of(elem, count, loc)?
            }
        };

        if var_type == Type::Void {
            return Err(ParseError::new(
                format!("Variable '{}' cannot have type void", name),
                loc,
            ));
        }

        Ok(AstNode::VarDecl {
            name,
            var_type,
            is_const,
            init,
            location: loc,
        })
    }

    /// Element count of an unsized array, taken from its initializer
    fn inferred_length(
        elem: &Type,
        init: Option<&AstNode>,
        loc: SourceLocation,
    ) -> Result<usize, ParseError> {
        let count = match init {
            Some(AstNode::StringLiteral(bytes, _)) if *elem == Type::Char => bytes.len() + 1,
            Some(AstNode::ArrayLiteral { elements, .. }) => {
                if elements
                    .iter()
                    .all(|e| matches!(e, AstNode::ArrayLiteral { .. }))
                {
                    elements.len()
                } else {
                    let per_element = Self::scalar_count(elem);
                    let leaves = Self::leaf_count(elements);
                    leaves.div_ceil(per_element)
                }
            }
            _ => {
                return Err(ParseError::new(
                    "Array size cannot be inferred without an initializer list",
                    loc,
                ))
            }
        };

        if count == 0 {
            return Err(ParseError::new("Array size must be positive", loc));
        }
        Ok(count)
    }

    fn scalar_count(ty: &Type) -> usize {
        match ty {
            Type::Array(inner, n) => n.saturating_mul(Self::scalar_count(inner)),
            _ => 1,
        }
    }

    fn leaf_count(elements: &[AstNode]) -> usize {
        elements
            .iter()
            .map(|e| match e {
                AstNode::ArrayLiteral { elements, .. } => Self::leaf_count(elements),
                _ => 1,
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::ast::*;
    use crate::parser::parse::Parser;

    fn first_function(source: &str) -> AstNode {
        let mut program = Parser::new(source).unwrap().parse_program().unwrap();
        program.nodes.remove(0)
    }

    fn body_of(source: &str) -> Vec<AstNode> {
        match first_function(source) {
            AstNode::FunctionDef { body, .. } => body,
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_array_params_decay() {
        match first_function("int main(int argc, char *argv[]) { return 0; }") {
            AstNode::FunctionDef { params, .. } => {
                assert_eq!(params.len(), 2);
                assert_eq!(params[0].param_type, Type::Int);
                assert_eq!(params[1].param_type, Type::Char.with_pointer().with_pointer());
            }
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_void_parameter_list() {
        match first_function("int f(void) { return 1; }") {
            AstNode::FunctionDef { params, .. } => assert!(params.is_empty()),
            _ => panic!("Expected function definition"),
        }
    }

    #[test]
    fn test_unsized_arrays_take_initializer_size() {
        let body = body_of("int main() { char s[] = \"abc\"; int a[] = {1, 2, 3}; int m[][2] = {1, 2, 3}; }");

        let types: Vec<Type> = body
            .iter()
            .map(|node| match node {
                AstNode::VarDecl { var_type, .. } => var_type.clone(),
                _ => panic!("Expected declaration"),
            })
            .collect();

        assert_eq!(types[0], Type::Char.with_array(4));
        assert_eq!(types[1], Type::Int.with_array(3));
        assert_eq!(types[2], Type::Int.with_array(2).with_array(2));
    }

    #[test]
    fn test_multidimensional_array() {
        let body = body_of("int main() { int grid[2][3]; }");
        match &body[0] {
            AstNode::VarDecl { var_type, .. } => {
                assert_eq!(*var_type, Type::Int.with_array(3).with_array(2));
                assert_eq!(var_type.size(), 24);
            }
            _ => panic!("Expected declaration"),
        }
    }

    #[test]
    fn test_const_applies_to_scalars_only() {
        let body = body_of("int main() { const int x = 1; const char *s = \"hi\"; }");
        match (&body[0], &body[1]) {
            (
                AstNode::VarDecl { is_const: a, .. },
                AstNode::VarDecl { is_const: b, .. },
            ) => {
                assert!(*a);
                assert!(!*b);
            }
            _ => panic!("Expected declarations"),
        }
    }

    #[test]
    fn test_rejects_bad_array_sizes() {
        for source in [
            "int main() { int a[0]; }",
            "int main() { int a[]; }",
            "int main() { int n = 2; int a[n]; }",
            "int main() { int a[2][]; }",
            "int main() { int a[2147483647][2147483647][2147483647]; }",
            "int main() { int a[536870912]; }",
            "int main() { char a[65536][32768]; }",
            "int f(int rows[][2147483647][2]) { return 0; }",
        ] {
            assert!(
                Parser::new(source).unwrap().parse_program().is_err(),
                "should reject: {source}"
            );
        }
    }

    #[test]
    fn test_largest_object_is_accepted() {
        let source = "int main() { char a[2147483647]; int b[536870911]; char *p[268435455]; }";
        let sizes: Vec<usize> = body_of(source)
            .iter()
            .map(|stmt| match stmt {
                AstNode::VarDecl { var_type, .. } => var_type.size(),
                other => panic!("expected a declaration, got {:?}", other),
            })
            .collect();
        assert_eq!(sizes, vec![2147483647, 2147483644, 2147483640]);
    }

    #[test]
    fn test_rejects_runaway_type_nesting() {
        let stars = format!("int main() {{ int {}p; return 0; }}", "*".repeat(100_000));
        let err = Parser::new(&stars).unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("indirection"), "{}", err.message);

        let dims = format!("int main() {{ int a{}; return 0; }}", "[1]".repeat(100_000));
        let err = Parser::new(&dims).unwrap().parse_program().unwrap_err();
        assert!(err.message.contains("dimensions"), "{}", err.message);
    }

    #[test]
    fn test_rejects_void_variable() {
        let err = Parser::new("int main() { void x; }")
            .unwrap()
            .parse_program()
            .unwrap_err();
        assert!(err.message.contains("void"));
    }
}
