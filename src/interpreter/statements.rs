//! Statement execution
//!
//! Statements never leave values on the operand stack. Each one is expanded
//! into tasks: a block opens a scope and schedules its `PopScope`, loops
//! bracket their body with `ContinueTarget` / `LoopEnd` markers, and
//! `break` / `continue` unwind the task stack to the nearest marker, closing
//! any scopes they pass.

use crate::interpreter::engine::{Interpreter, Task};
use crate::interpreter::errors::RuntimeError;
use crate::parser::ast::*;
use std::io::Write;

impl<'p, W: Write> Interpreter<'p, W> {
    pub(crate) fn exec_statement(&mut self, node: &'p AstNode) -> Result<(), RuntimeError> {
        self.current_location = node.location();
        self.count_step()?;

        match node {
            AstNode::VarDecl { .. } => self.schedule_declaration(node, false),

            AstNode::Block { statements, .. } => {
                self.frame_mut()?.push_scope();
                self.tasks.push(Task::PopScope);
                for stmt in statements.iter().rev() {
                    self.tasks.push(Task::Exec(stmt));
                }
                Ok(())
            }

            AstNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.tasks.push(Task::Branch {
                    then_branch,
                    else_branch: else_branch.as_deref(),
                });
                self.tasks.push(Task::Eval(condition));
                Ok(())
            }

            AstNode::While {
                condition, body, ..
            } => {
                self.tasks.push(Task::LoopEnd);
                self.tasks.push(Task::WhileCheck { condition, body });
                self.tasks.push(Task::Eval(condition));
                Ok(())
            }

            AstNode::For { init, .. } => {
                // The init clause gets its own scope around the whole loop
                self.frame_mut()?.push_scope();
                self.tasks.push(Task::PopScope);
                self.tasks.push(Task::LoopEnd);
                self.tasks.push(Task::ForCond(node));
                if let Some(init) = init {
                    self.tasks.push(Task::Exec(init));
                }
                Ok(())
            }

            AstNode::Return { expr, location } => {
                self.tasks.push(Task::Return {
                    has_value: expr.is_some(),
                    location: *location,
                });
                if let Some(expr) = expr {
                    self.tasks.push(Task::Eval(expr));
                }
                Ok(())
            }

            AstNode::Break { .. } => self.unwind_loop(|task| matches!(task, Task::LoopEnd)),
            AstNode::Continue { .. } => {
                self.unwind_loop(|task| matches!(task, Task::ContinueTarget))
            }

            AstNode::ExpressionStatement { expr, .. } => {
                self.tasks.push(Task::Discard);
                self.tasks.push(Task::Eval(expr));
                Ok(())
            }

            AstNode::FunctionDef { name, location, .. } => Err(RuntimeError::internal(
                format!("nested definition of '{}'", name),
                *location,
            )),

            // Expression used as a statement, e.g. a `for` init clause
            expr => {
                self.tasks.push(Task::Discard);
                self.tasks.push(Task::Eval(expr));
                Ok(())
            }
        }
    }

    fn count_step(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;
        match self.config.max_steps {
            Some(limit) if self.steps > limit => Err(RuntimeError::StepLimitExceeded {
                limit,
                location: self.current_location,
            }),
            _ => Ok(()),
        }
    }

    /// Drop pending tasks up to and including the first one matching
    /// `is_target`, closing every scope on the way
    fn unwind_loop(&mut self, is_target: fn(&Task<'p>) -> bool) -> Result<(), RuntimeError> {
        loop {
            match self.tasks.pop() {
                Some(Task::PopScope) => {
                    let frame = self.stack.current_mut().ok_or_else(|| {
                        RuntimeError::internal("no active call", self.current_location)
                    })?;
                    frame.pop_scope(&mut self.memory);
                }
                Some(task) if is_target(&task) => return Ok(()),
                Some(Task::Epilogue) | None => {
                    return Err(RuntimeError::internal(
                        "loop control outside of a loop",
                        self.current_location,
                    ))
                }
                Some(_) => {}
            }
        }
    }

    pub(crate) fn branch(
        &mut self,
        then_branch: &'p AstNode,
        else_branch: Option<&'p AstNode>,
    ) -> Result<(), RuntimeError> {
        let condition = self.pop_value()?;
        if condition.is_truthy() {
            self.tasks.push(Task::Exec(then_branch));
        } else if let Some(else_branch) = else_branch {
            self.tasks.push(Task::Exec(else_branch));
        }
        Ok(())
    }

    pub(crate) fn while_check(
        &mut self,
        condition: &'p AstNode,
        body: &'p AstNode,
    ) -> Result<(), RuntimeError> {
        if self.pop_value()?.is_truthy() {
            self.tasks.push(Task::WhileCheck { condition, body });
            self.tasks.push(Task::Eval(condition));
            self.tasks.push(Task::ContinueTarget);
            self.tasks.push(Task::Exec(body));
        }
        Ok(())
    }

    pub(crate) fn for_condition(&mut self, node: &'p AstNode) -> Result<(), RuntimeError> {
        let AstNode::For { condition, .. } = node else {
            return Err(RuntimeError::internal("expected a for loop", node.location()));
        };

        match condition {
            Some(condition) => {
                self.tasks.push(Task::ForCheck(node));
                self.tasks.push(Task::Eval(condition));
                Ok(())
            }
            None => self.for_iteration(node),
        }
    }

    pub(crate) fn for_check(&mut self, node: &'p AstNode) -> Result<(), RuntimeError> {
        if self.pop_value()?.is_truthy() {
            self.for_iteration(node)?;
        }
        Ok(())
    }

    fn for_iteration(&mut self, node: &'p AstNode) -> Result<(), RuntimeError> {
        let AstNode::For { body, .. } = node else {
            return Err(RuntimeError::internal("expected a for loop", node.location()));
        };

        self.tasks.push(Task::ForNext(node));
        self.tasks.push(Task::ContinueTarget);
        self.tasks.push(Task::Exec(body));
        Ok(())
    }

    pub(crate) fn for_next(&mut self, node: &'p AstNode) -> Result<(), RuntimeError> {
        let AstNode::For { increment, .. } = node else {
            return Err(RuntimeError::internal("expected a for loop", node.location()));
        };

        self.tasks.push(Task::ForCond(node));
        if let Some(increment) = increment {
            self.tasks.push(Task::Discard);
            self.tasks.push(Task::Eval(increment));
        }
        Ok(())
    }

    /// Schedule a declaration: evaluate its initializer, then `Declare`.
    ///
    /// Array literals are evaluated leaf by leaf; a string initializing a
    /// `char` array is copied directly and needs no evaluation.
    pub(crate) fn schedule_declaration(
        &mut self,
        decl: &'p AstNode,
        as_expr: bool,
    ) -> Result<(), RuntimeError> {
        let AstNode::VarDecl { var_type, init, .. } = decl else {
            return Err(RuntimeError::internal("expected a declaration", decl.location()));
        };

        self.tasks.push(Task::Declare { decl, as_expr });

        match (var_type, init.as_deref()) {
            (_, None) => {}
            (Type::Array(..), Some(AstNode::StringLiteral(..))) => {}
            (Type::Array(..) | Type::Pointer(_), Some(literal @ AstNode::ArrayLiteral { .. })) => {
                for leaf in Self::literal_leaves(literal).into_iter().rev() {
                    self.tasks.push(Task::Eval(leaf));
                }
            }
            (_, Some(expr)) => self.tasks.push(Task::Eval(expr)),
        }
        Ok(())
    }

    /// Scalar elements of a (possibly nested) array literal, in order
    pub(crate) fn literal_leaves(node: &'p AstNode) -> Vec<&'p AstNode> {
        let mut leaves = Vec::new();
        let mut pending = vec![node];

        while let Some(node) = pending.pop() {
            match node {
                AstNode::ArrayLiteral { elements, .. } => pending.extend(elements.iter().rev()),
                leaf => leaves.push(leaf),
            }
        }
        leaves
    }
}
