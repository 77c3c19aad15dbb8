// AST (Abstract Syntax Tree) definitions for the C subset

use std::fmt;

/// Source location information for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Size of a stored pointer in bytes (buffer id + offset)
pub const POINTER_SIZE: usize = 8;

/// Largest object a declaration may create; offsets into it fit a stored pointer
pub const MAX_OBJECT_SIZE: usize = i32::MAX as usize;

/// Types supported by the interpreter
///
/// `Void` only appears as a function return type or as the pointee of an
/// untyped pointer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Int,
    Char,
    Void,
    Pointer(Box<Type>),
    Array(Box<Type>, usize),
}

impl Type {
    pub fn with_pointer(self) -> Self {
        Type::Pointer(Box::new(self))
    }

    pub fn with_array(self, size: usize) -> Self {
        Type::Array(Box::new(self), size)
    }

    /// Size of a value of this type in bytes.
    ///
    /// Saturates for arrays too large for the host; the parser only admits
    /// types whose [`checked_size`](Self::checked_size) is within
    /// [`MAX_OBJECT_SIZE`].
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Size in bytes, or `None` if it overflows `usize`
    pub fn checked_size(&self) -> Option<usize> {
        match self {
            Type::Int => Some(4),
            Type::Char => Some(1),
            Type::Void => Some(0),
            Type::Pointer(_) => Some(POINTER_SIZE),
            Type::Array(elem, n) => elem.checked_size()?.checked_mul(*n),
        }
    }

    /// Stride used for pointer arithmetic over this pointee.
    ///
    /// `void *` arithmetic moves in single bytes.
    pub fn stride(&self) -> usize {
        match self {
            Type::Void => 1,
            other => other.size(),
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(..))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    /// Element type of an array, or the pointee of a pointer
    pub fn element(&self) -> Option<&Type> {
        match self {
            Type::Array(elem, _) | Type::Pointer(elem) => Some(elem),
            _ => None,
        }
    }

    /// Array-to-pointer decay; other types are returned unchanged
    pub fn decayed(&self) -> Type {
        match self {
            Type::Array(elem, _) => Type::Pointer(elem.clone()),
            other => other.clone(),
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Char => write!(f, "char"),
            Type::Void => write!(f, "void"),
            Type::Pointer(inner) => write!(f, "{}*", inner),
            Type::Array(elem, n) => write!(f, "{}[{}]", elem, n),
        }
    }
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Logical (short-circuit)
    And,
    Or,
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        };
        f.write_str(symbol)
    }
}

/// Unary operators that do not take an address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,     // -x
    Not,     // !x
    PreInc,  // ++x
    PreDec,  // --x
    PostInc, // x++
    PostDec, // x--
}

impl UnOp {
    /// Whether the operator writes back to its operand
    pub fn is_increment(self) -> bool {
        matches!(
            self,
            UnOp::PreInc | UnOp::PreDec | UnOp::PostInc | UnOp::PostDec
        )
    }
}

/// Function parameter
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub param_type: Type,
    pub is_const: bool,
}

/// AST nodes representing statements and expressions.
///
/// Statements and expressions share one node type: a `VarDecl` may sit in
/// expression position (`if ((int x = 0) == 0)`) and evaluates to the
/// value it stored.
#[derive(Debug, Clone)]
pub enum AstNode {
    // Top-level declarations
    FunctionDef {
        name: String,
        params: Vec<Param>,
        body: Vec<AstNode>,
        return_type: Type,
        location: SourceLocation,
    },

    // Statements
    VarDecl {
        name: String,
        var_type: Type,
        is_const: bool,
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    If {
        condition: Box<AstNode>,
        then_branch: Box<AstNode>,
        else_branch: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    While {
        condition: Box<AstNode>,
        body: Box<AstNode>,
        location: SourceLocation,
    },
    For {
        init: Option<Box<AstNode>>,
        condition: Option<Box<AstNode>>,
        increment: Option<Box<AstNode>>,
        body: Box<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    Break {
        location: SourceLocation,
    },
    Continue {
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },

    // Expressions
    IntLiteral(i32, SourceLocation),
    CharLiteral(i8, SourceLocation),
    StringLiteral(Vec<u8>, SourceLocation),
    ArrayLiteral {
        elements: Vec<AstNode>,
        location: SourceLocation,
    },
    Variable(String, SourceLocation),
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    UnaryOp {
        op: UnOp,
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    Deref {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    AddressOf {
        operand: Box<AstNode>,
        location: SourceLocation,
    },
    Assignment {
        lhs: Box<AstNode>,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    CompoundAssignment {
        lhs: Box<AstNode>,
        op: BinOp,
        rhs: Box<AstNode>,
        location: SourceLocation,
    },
    FunctionCall {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    ArrayAccess {
        array: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> SourceLocation {
        match self {
            AstNode::FunctionDef { location, .. }
            | AstNode::VarDecl { location, .. }
            | AstNode::Block { location, .. }
            | AstNode::If { location, .. }
            | AstNode::While { location, .. }
            | AstNode::For { location, .. }
            | AstNode::Return { location, .. }
            | AstNode::Break { location }
            | AstNode::Continue { location }
            | AstNode::ExpressionStatement { location, .. }
            | AstNode::ArrayLiteral { location, .. }
            | AstNode::BinaryOp { location, .. }
            | AstNode::UnaryOp { location, .. }
            | AstNode::Deref { location, .. }
            | AstNode::AddressOf { location, .. }
            | AstNode::Assignment { location, .. }
            | AstNode::CompoundAssignment { location, .. }
            | AstNode::FunctionCall { location, .. }
            | AstNode::ArrayAccess { location, .. } => *location,
            AstNode::IntLiteral(_, loc)
            | AstNode::CharLiteral(_, loc)
            | AstNode::StringLiteral(_, loc)
            | AstNode::Variable(_, loc) => *loc,
        }
    }

    /// Whether this node can be the target of an assignment
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self,
            AstNode::Variable(..) | AstNode::Deref { .. } | AstNode::ArrayAccess { .. }
        )
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub nodes: Vec<AstNode>, // FunctionDef nodes, in source order
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Look up a function definition by name
    pub fn function(&self, wanted: &str) -> Option<&AstNode> {
        self.nodes
            .iter()
            .find(|node| matches!(node, AstNode::FunctionDef { name, .. } if name == wanted))
    }
}
