//! Execution engine
//!
//! The interpreter never recurses on the host stack. Pending work lives on an
//! explicit continuation stack of [`Task`]s and intermediate results on an
//! operand stack of [`Value`]s. Evaluating a node pushes the tasks that finish
//! it (in reverse order) followed by the tasks for its children, so children
//! run first and leave their values for the parent to pop.
//!
//! A call records the heights of both stacks in its [`ActivationRecord`];
//! returning truncates them back, which also discards whatever was left of
//! the callee's body.
//!
//! Statement and expression dispatch live in `statements` and `expressions`,
//! operator semantics in `ops`, and the `print` intrinsic in `builtins`.

use crate::config::EngineConfig;
use crate::interpreter::constants::{ENTRY_POINT, MAIN_MAX_PARAMS};
use crate::interpreter::errors::RuntimeError;
use crate::memory::buffer::{Memory, Owner};
use crate::memory::stack::{ActivationRecord, Binding, CallStack};
use crate::memory::value::{BufferId, Pointer, Value};
use crate::parser::ast::*;
use rustc_hash::FxHashMap;
use std::io::Write;
use tracing::{debug, trace};

/// Whether a place is computed for reading or for writing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Access {
    Read,
    Write,
}

/// A function definition, borrowed from the program
#[derive(Debug, Clone, Copy)]
pub(crate) struct Function<'p> {
    pub name: &'p str,
    pub params: &'p [Param],
    pub body: &'p [AstNode],
    pub return_type: &'p Type,
    pub location: SourceLocation,
}

/// Target of a call, resolved before its arguments are evaluated
#[derive(Debug, Clone, Copy)]
pub(crate) enum Callee<'p> {
    User(Function<'p>),
    Print,
}

/// One unit of pending work on the continuation stack
#[derive(Debug, Clone)]
pub(crate) enum Task<'p> {
    /// Execute a statement
    Exec(&'p AstNode),
    /// Evaluate an expression, pushing its value
    Eval(&'p AstNode),
    /// Evaluate an lvalue, pushing a pointer to it
    Place(&'p AstNode, Access),
    /// Drop the top value
    Discard,
    /// Close the innermost block scope
    PopScope,

    Binary {
        op: BinOp,
        location: SourceLocation,
    },
    /// The left operand of `&&` / `||` is on the stack
    LogicalRhs {
        op: BinOp,
        right: &'p AstNode,
    },
    /// Normalise the top value to 0 or 1
    ToBool,
    Unary {
        op: UnOp,
        location: SourceLocation,
    },
    IncDec {
        op: UnOp,
        location: SourceLocation,
    },
    /// Replace a place on the stack with the value stored there
    Load {
        location: SourceLocation,
    },
    /// Check that the top value is a pointer
    CheckPointer {
        location: SourceLocation,
    },
    /// Base and index are on the stack
    Index {
        location: SourceLocation,
    },
    Assign {
        location: SourceLocation,
    },
    CompoundAssign {
        op: BinOp,
        location: SourceLocation,
    },
    /// `count` element values are on the stack
    BuildArray {
        count: usize,
        location: SourceLocation,
    },
    /// The initializer values (if any) are on the stack
    Declare {
        decl: &'p AstNode,
        as_expr: bool,
    },
    /// `argc` argument values are on the stack
    Call {
        callee: Callee<'p>,
        argc: usize,
        location: SourceLocation,
    },

    Branch {
        then_branch: &'p AstNode,
        else_branch: Option<&'p AstNode>,
    },
    WhileCheck {
        condition: &'p AstNode,
        body: &'p AstNode,
    },
    ForCond(&'p AstNode),
    ForCheck(&'p AstNode),
    ForNext(&'p AstNode),
    /// Where `continue` resumes a loop
    ContinueTarget,
    /// Where `break` leaves a loop
    LoopEnd,
    Return {
        has_value: bool,
        location: SourceLocation,
    },
    /// End of a function body reached without `return`
    Epilogue,
}

/// The interpreter that executes a parsed program
pub struct Interpreter<'p, W: Write> {
    pub(crate) functions: FxHashMap<&'p str, Function<'p>>,
    pub(crate) memory: Memory,
    pub(crate) stack: CallStack,
    pub(crate) tasks: Vec<Task<'p>>,
    pub(crate) values: Vec<Value>,
    pub(crate) sink: W,
    pub(crate) config: EngineConfig,
    /// Statements executed so far
    pub(crate) steps: u64,
    /// Location of the statement being executed
    pub(crate) current_location: SourceLocation,
    exit_code: Option<i32>,
}

impl<'p, W: Write> Interpreter<'p, W> {
    /// Create an interpreter for `program` writing program output to `sink`
    pub fn new(program: &'p Program, sink: W, config: EngineConfig) -> Self {
        let mut functions = FxHashMap::default();

        for node in &program.nodes {
            if let AstNode::FunctionDef {
                name,
                params,
                body,
                return_type,
                location,
            } = node
            {
                functions.insert(
                    name.as_str(),
                    Function {
                        name: name.as_str(),
                        params,
                        body,
                        return_type,
                        location: *location,
                    },
                );
            }
        }

        Interpreter {
            functions,
            memory: Memory::new(),
            stack: CallStack::new(),
            tasks: Vec::new(),
            values: Vec::new(),
            sink,
            config,
            steps: 0,
            current_location: SourceLocation::new(1, 1),
            exit_code: None,
        }
    }

    /// Run `main` with the given process arguments (`argv[0]` first) and
    /// return its exit value.
    pub fn run<S: AsRef<[u8]>>(&mut self, args: &[S]) -> Result<i32, RuntimeError> {
        self.reset();

        let main = self
            .functions
            .get(ENTRY_POINT)
            .copied()
            .ok_or(RuntimeError::MissingMain)?;

        if main.params.len() > MAIN_MAX_PARAMS {
            return Err(RuntimeError::ArityMismatch {
                function: ENTRY_POINT.to_string(),
                expected: MAIN_MAX_PARAMS,
                got: main.params.len(),
                location: main.location,
            });
        }

        let mut main_args = self.bind_arguments(args, main.location)?;
        main_args.truncate(main.params.len());

        debug!(args = args.len(), "starting main");
        self.enter_function(main, main_args, None)?;

        while let Some(task) = self.tasks.pop() {
            self.step(task)?;
        }

        let code = self.exit_code.take().unwrap_or(0);
        debug!(exit_code = code, steps = self.steps, "program finished");
        Ok(code)
    }

    /// Number of statements executed by the last run
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// The buffer arena, for inspection after a run
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn sink(&self) -> &W {
        &self.sink
    }

    pub fn into_sink(self) -> W {
        self.sink
    }

    fn reset(&mut self) {
        self.memory = Memory::new();
        self.stack = CallStack::new();
        self.tasks.clear();
        self.values.clear();
        self.steps = 0;
        self.exit_code = None;
    }

    /// Materialise `argv`: one buffer per argument holding its bytes and a
    /// terminating NUL, plus a pointer table ending in a null entry.
    fn bind_arguments<S: AsRef<[u8]>>(
        &mut self,
        args: &[S],
        location: SourceLocation,
    ) -> Result<Vec<Value>, RuntimeError> {
        let mem_err = |e| RuntimeError::from_memory(e, location);
        let slot_type = Type::Char.with_pointer();

        let table = self
            .memory
            .allocate((args.len() + 1) * POINTER_SIZE, Owner::Argument)
            .map_err(mem_err)?;

        for (i, arg) in args.iter().enumerate() {
            let mut bytes = arg.as_ref().to_vec();
            bytes.push(0);
            let id = self
                .memory
                .allocate_with(bytes, Owner::Argument)
                .map_err(mem_err)?;

            let slot = Pointer::new(table, (i * POINTER_SIZE) as i64, slot_type.clone());
            self.memory
                .store(&slot, &Value::Pointer(Pointer::new(id, 0, Type::Char)))
                .map_err(mem_err)?;
        }

        let argc = i32::try_from(args.len())
            .map_err(|_| RuntimeError::internal("too many program arguments", location))?;

        Ok(vec![
            Value::Int(argc),
            Value::Pointer(Pointer::new(table, 0, slot_type)),
        ])
    }

    /// Dispatch one task
    fn step(&mut self, task: Task<'p>) -> Result<(), RuntimeError> {
        match task {
            Task::Exec(node) => self.exec_statement(node),
            Task::Eval(node) => self.eval_expression(node),
            Task::Place(node, access) => self.eval_place(node, access),
            Task::Discard => self.pop_value().map(|_| ()),
            Task::PopScope => {
                let location = self.current_location;
                let frame = self
                    .stack
                    .current_mut()
                    .ok_or_else(|| RuntimeError::internal("no active call", location))?;
                frame.pop_scope(&mut self.memory);
                Ok(())
            }

            Task::Binary { op, location } => {
                let right = self.pop_value()?;
                let left = self.pop_value()?;
                let result = Self::binary_op(op, &left, &right, location)?;
                self.values.push(result);
                Ok(())
            }
            Task::LogicalRhs { op, right } => self.logical_rhs(op, right),
            Task::ToBool => {
                let value = self.pop_value()?;
                self.values.push(Value::Int(value.is_truthy() as i32));
                Ok(())
            }
            Task::Unary { op, location } => {
                let operand = self.pop_value()?;
                let result = Self::unary_op(op, &operand, location)?;
                self.values.push(result);
                Ok(())
            }
            Task::IncDec { op, location } => self.inc_dec(op, location),
            Task::Load { location } => self.load_place(location),
            Task::CheckPointer { location } => self.check_pointer(location),
            Task::Index { location } => self.index(location),
            Task::Assign { location } => self.assign(location),
            Task::CompoundAssign { op, location } => self.compound_assign(op, location),
            Task::BuildArray { count, location } => self.build_array(count, location),
            Task::Declare { decl, as_expr } => self.declare(decl, as_expr),
            Task::Call {
                callee,
                argc,
                location,
            } => self.call(callee, argc, location),

            Task::Branch {
                then_branch,
                else_branch,
            } => self.branch(then_branch, else_branch),
            Task::WhileCheck { condition, body } => self.while_check(condition, body),
            Task::ForCond(node) => self.for_condition(node),
            Task::ForCheck(node) => self.for_check(node),
            Task::ForNext(node) => self.for_next(node),
            Task::ContinueTarget | Task::LoopEnd => Ok(()),
            Task::Return {
                has_value,
                location,
            } => {
                let value = if has_value {
                    Some(self.pop_value()?)
                } else {
                    None
                };
                self.finish_call(value, location)
            }
            Task::Epilogue => self.finish_call(None, self.current_location),
        }
    }

    /// Push an activation record for `function` and schedule its body
    pub(crate) fn enter_function(
        &mut self,
        function: Function<'p>,
        args: Vec<Value>,
        call_site: Option<SourceLocation>,
    ) -> Result<(), RuntimeError> {
        let location = call_site.unwrap_or(function.location);

        if self.stack.depth() >= self.config.max_call_depth {
            return Err(RuntimeError::StackOverflow {
                limit: self.config.max_call_depth,
                location,
            });
        }

        let mut frame = ActivationRecord::new(
            function.name,
            function.return_type.clone(),
            call_site,
            self.tasks.len(),
            self.values.len(),
        );

        for (param, arg) in function.params.iter().zip(args) {
            let buffer = self
                .memory
                .allocate(param.param_type.size(), Owner::Local)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            let binding = Binding {
                buffer,
                var_type: param.param_type.clone(),
                is_const: param.is_const,
            };
            // Pointers are copied by value, so the callee aliases the caller's buffers
            self.memory
                .store(&binding.place(), &arg)
                .map_err(|e| RuntimeError::from_memory(e, location))?;
            frame.declare(param.name.as_str(), binding);
        }

        trace!(function = function.name, depth = self.stack.depth() + 1, "call");
        self.stack.push(frame);

        self.tasks.push(Task::Epilogue);
        for stmt in function.body.iter().rev() {
            self.tasks.push(Task::Exec(stmt));
        }
        Ok(())
    }

    /// Pop the current activation, discard its pending work and deliver the
    /// return value to the caller
    pub(crate) fn finish_call(
        &mut self,
        value: Option<Value>,
        location: SourceLocation,
    ) -> Result<(), RuntimeError> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| RuntimeError::internal("return outside of a call", location))?;

        self.tasks.truncate(frame.task_base);
        self.values.truncate(frame.value_base);

        let result = match (&frame.return_type, value) {
            (Type::Void, _) | (_, None) => Value::Int(0),
            (ty, Some(v)) => v
                .convert_to(ty)
                .map_err(|e| RuntimeError::from_memory(e, location))?,
        };

        trace!(function = %frame.function, depth = self.stack.depth(), "return");
        frame.release(&mut self.memory);

        if self.stack.is_empty() {
            let code = result.as_int().ok_or_else(|| RuntimeError::TypeMismatch {
                expected: "int exit value".to_string(),
                got: result.type_name(),
                location,
            })?;
            self.exit_code = Some(code);
        } else {
            self.values.push(result);
        }
        Ok(())
    }

    pub(crate) fn pop_value(&mut self) -> Result<Value, RuntimeError> {
        self.values.pop().ok_or_else(|| {
            RuntimeError::internal("operand stack underflow", self.current_location)
        })
    }

    /// Pop the top `count` values, in the order they were pushed
    pub(crate) fn pop_values(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        if self.values.len() < count {
            return Err(RuntimeError::internal(
                "operand stack underflow",
                self.current_location,
            ));
        }
        Ok(self.values.split_off(self.values.len() - count))
    }

    pub(crate) fn frame_mut(&mut self) -> Result<&mut ActivationRecord, RuntimeError> {
        let location = self.current_location;
        self.stack
            .current_mut()
            .ok_or_else(|| RuntimeError::internal("no active call", location))
    }

    /// Storage of `len` bytes for the literal at `site` in the running call.
    /// Later evaluations of the same literal reuse it; callers rewrite the
    /// contents every time.
    pub(crate) fn literal_storage(&mut self, site: SourceLocation, len: usize) -> Result<BufferId, RuntimeError> {
        if let Some(id) = self.frame_mut()?.literal(site) {
            if matches!(self.memory.get(id), Ok(buffer) if buffer.len() == len) {
                return Ok(id);
            }
        }
        let id = self
            .memory
            .allocate(len, Owner::Literal)
            .map_err(|e| RuntimeError::from_memory(e, site))?;
        self.frame_mut()?.adopt_literal(site, id);
        Ok(id)
    }

    pub(crate) fn lookup(&self, name: &str, location: SourceLocation) -> Result<&Binding, RuntimeError> {
        self.stack
            .current()
            .and_then(|frame| frame.lookup(name))
            .ok_or_else(|| RuntimeError::UndefinedSymbol {
                kind: "variable",
                name: name.to_string(),
                location,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::Parser;

    fn run_with(source: &str, args: &[&str], config: EngineConfig) -> (Result<i32, RuntimeError>, String) {
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interpreter = Interpreter::new(&program, Vec::new(), config);
        let result = interpreter.run(args);
        let output = String::from_utf8(interpreter.into_sink()).unwrap();
        (result, output)
    }

    fn run(source: &str) -> (Result<i32, RuntimeError>, String) {
        run_with(source, &["prog"], EngineConfig::default())
    }

    #[test]
    fn test_exit_code() {
        let (result, _) = run("int main() { return 40 + 2; }");
        assert_eq!(result, Ok(42));
    }

    #[test]
    fn test_fall_through_and_void_main() {
        assert_eq!(run("int main() { int x = 3; }").0, Ok(0));
        assert_eq!(run("void main() { return; }").0, Ok(0));
    }

    #[test]
    fn test_missing_main() {
        let (result, _) = run("int helper() { return 1; }");
        assert_eq!(result, Err(RuntimeError::MissingMain));
    }

    #[test]
    fn test_main_with_too_many_params() {
        let (result, _) = run("int main(int a, int b, int c) { return 0; }");
        assert!(matches!(result, Err(RuntimeError::ArityMismatch { got: 3, .. })));
    }

    #[test]
    fn test_argc_and_argv() {
        let source = r#"
            int main(int argc, char **argv) {
                if (argv[argc] != 0) { return -1; }
                return argc * 100 + argv[1][0];
            }
        "#;
        let (result, _) = run_with(source, &["prog", "A"], EngineConfig::default());
        assert_eq!(result, Ok(265));
    }

    #[test]
    fn test_argv_strings_are_nul_terminated_and_exact() {
        let source = r#"
            int main(int argc, char **argv) {
                char *s = argv[1];
                if (s[2] != '\0') { return 1; }
                return s[3];
            }
        "#;
        let (result, _) = run_with(source, &["prog", "ab"], EngineConfig::default());
        assert!(matches!(result, Err(RuntimeError::BoundsError { .. })));
    }

    #[test]
    fn test_deep_recursion_does_not_use_host_stack() {
        let source = r#"
            int depth(int n) {
                if (n == 0) { return 0; }
                return 1 + depth(n - 1);
            }
            int main() { return depth(5000); }
        "#;
        assert_eq!(run(source).0, Ok(5000));
    }

    #[test]
    fn test_call_depth_ceiling() {
        let source = r#"
            int forever(int n) { return forever(n + 1); }
            int main() { return forever(0); }
        "#;
        let config = EngineConfig::default().with_max_call_depth(100);
        let (result, _) = run_with(source, &["prog"], config);
        assert!(matches!(
            result,
            Err(RuntimeError::StackOverflow { limit: 100, .. })
        ));
    }

    #[test]
    fn test_step_ceiling() {
        let source = "int main() { while (1) { } return 0; }";
        let config = EngineConfig::default().with_max_steps(Some(50));
        let (result, _) = run_with(source, &["prog"], config);
        assert!(matches!(
            result,
            Err(RuntimeError::StepLimitExceeded { limit: 50, .. })
        ));
    }

    #[test]
    fn test_buffers_released_after_calls() {
        let source = r#"
            int f(int n) { char *s = "scratch"; int local[4]; return n; }
            int main() {
                int total = 0;
                for (int i = 0; i < 10; i++) { total += f(i); }
                return total;
            }
        "#;
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interpreter = Interpreter::new(&program, Vec::new(), EngineConfig::default());
        assert_eq!(interpreter.run(&["prog"]), Ok(45));
        // Only the argv table and argv[0] survive main
        assert_eq!(interpreter.memory().live_buffers(), 2);
    }

    #[test]
    fn test_literals_in_loops_reuse_their_buffers() {
        let source = r#"
            int main() {
                int *table;
                while (1) {
                    print("", 0);
                    table = {1, 2, 3};
                }
                return 0;
            }
        "#;
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let live_after = |steps: u64| {
            let config = EngineConfig::default().with_max_steps(Some(steps));
            let mut interpreter = Interpreter::new(&program, Vec::new(), config);
            assert!(interpreter.run(&["prog"]).is_err());
            interpreter.memory().live_buffers()
        };

        // argv, argv[0], `table`, and one buffer per literal
        assert_eq!(live_after(100), 5);
        assert_eq!(live_after(20_000), 5);
    }

    #[test]
    fn test_recursive_calls_get_their_own_literals() {
        let source = r#"
            int depth(int n, char *outer) {
                char *s = "a";
                if (s == outer) return -1;
                if (n == 0) return 0;
                s[0] = 'b';
                int below = depth(n - 1, s);
                if (below < 0 || s[0] != 'b') return -1;
                return below + 1;
            }
            int main() { char none[1]; return depth(5, none); }
        "#;
        assert_eq!(run(source).0, Ok(5));
    }

    #[test]
    fn test_rerun_is_deterministic() {
        let source = r#"
            int main(int argc, char **argv) {
                print(argv[0], 4);
                return argc;
            }
        "#;
        let program = Parser::new(source).unwrap().parse_program().unwrap();
        let mut interpreter = Interpreter::new(&program, Vec::new(), EngineConfig::default());
        assert_eq!(interpreter.run(&["prog"]), Ok(1));
        assert_eq!(interpreter.run(&["prog"]), Ok(1));
        assert_eq!(interpreter.sink().as_slice(), b"progprog");
    }
}
