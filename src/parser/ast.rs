// AST (Abstract Syntax Tree) definitions for MPL programs

use serde::{Deserialize, Serialize};

/// Source location information for error reporting
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl SourceLocation {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
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
}

impl BinOp {
    pub fn symbol(&self) -> &'static str {
        match self {
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
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }
}

/// Grid primitives that have their own statement form (`set(x, y);`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridCommand {
    Set,
    Toggle,
    Clear,
    Step,
}

impl GridCommand {
    /// Case-insensitive lookup used by the statement parser.
    pub fn from_ident(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "set" => Some(GridCommand::Set),
            "toggle" => Some(GridCommand::Toggle),
            "clear" => Some(GridCommand::Clear),
            "step" => Some(GridCommand::Step),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GridCommand::Set => "set",
            GridCommand::Toggle => "toggle",
            GridCommand::Clear => "clear",
            GridCommand::Step => "step",
        }
    }

    /// Number of coordinate arguments the command takes.
    pub fn arity(&self) -> usize {
        match self {
            GridCommand::Set | GridCommand::Toggle => 2,
            GridCommand::Clear | GridCommand::Step => 0,
        }
    }
}

/// Which flavour of `for` loop was written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForEachKind {
    /// `for (var v of xs)` iterates values
    Of,
    /// `for (var k in xs)` iterates indices or keys
    In,
}

/// AST nodes representing statements and expressions
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    // Declarations
    VarDecl {
        name: String,
        init: Option<Box<AstNode>>,
        location: SourceLocation,
    },
    FunctionDecl {
        name: String,
        params: Vec<String>,
        body: Vec<AstNode>,
        location: SourceLocation,
    },
    RuleDecl {
        name: String,
        body: Vec<AstNode>,
        location: SourceLocation,
    },

    // Statements
    Assignment {
        name: String,
        value: Box<AstNode>,
        location: SourceLocation,
    },
    Return {
        expr: Option<Box<AstNode>>,
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
        update: Option<Box<AstNode>>,
        body: Box<AstNode>,
        location: SourceLocation,
    },
    ForEach {
        kind: ForEachKind,
        variable: String,
        iterable: Box<AstNode>,
        body: Box<AstNode>,
        location: SourceLocation,
    },
    Block {
        statements: Vec<AstNode>,
        location: SourceLocation,
    },
    GridStatement {
        command: GridCommand,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    ExpressionStatement {
        expr: Box<AstNode>,
        location: SourceLocation,
    },

    // Expressions
    NumberLiteral(f64, SourceLocation),
    StringLiteral(String, SourceLocation),
    Variable(String, SourceLocation),
    BinaryOp {
        op: BinOp,
        left: Box<AstNode>,
        right: Box<AstNode>,
        location: SourceLocation,
    },
    Call {
        name: String,
        args: Vec<AstNode>,
        location: SourceLocation,
    },
    Parenthesized {
        expr: Box<AstNode>,
        location: SourceLocation,
    },
    ArrayLiteral {
        elements: Vec<AstNode>,
        location: SourceLocation,
    },
    Index {
        target: Box<AstNode>,
        index: Box<AstNode>,
        location: SourceLocation,
    },
    ObjectLiteral {
        entries: Vec<(String, AstNode)>,
        location: SourceLocation,
    },
    PropertyAccess {
        object: Box<AstNode>,
        property: String,
        location: SourceLocation,
    },
}

impl AstNode {
    /// Get the source location of this node
    pub fn location(&self) -> &SourceLocation {
        match self {
            AstNode::VarDecl { location, .. } => location,
            AstNode::FunctionDecl { location, .. } => location,
            AstNode::RuleDecl { location, .. } => location,
            AstNode::Assignment { location, .. } => location,
            AstNode::Return { location, .. } => location,
            AstNode::If { location, .. } => location,
            AstNode::While { location, .. } => location,
            AstNode::For { location, .. } => location,
            AstNode::ForEach { location, .. } => location,
            AstNode::Block { location, .. } => location,
            AstNode::GridStatement { location, .. } => location,
            AstNode::ExpressionStatement { location, .. } => location,
            AstNode::NumberLiteral(_, loc) => loc,
            AstNode::StringLiteral(_, loc) => loc,
            AstNode::Variable(_, loc) => loc,
            AstNode::BinaryOp { location, .. } => location,
            AstNode::Call { location, .. } => location,
            AstNode::Parenthesized { location, .. } => location,
            AstNode::ArrayLiteral { location, .. } => location,
            AstNode::Index { location, .. } => location,
            AstNode::ObjectLiteral { location, .. } => location,
            AstNode::PropertyAccess { location, .. } => location,
        }
    }

    /// Dotted name of a property chain over identifiers (`math.sqrt`),
    /// or the plain name of a variable.
    pub fn qualified_name(&self) -> Option<String> {
        match self {
            AstNode::Variable(name, _) => Some(name.clone()),
            AstNode::PropertyAccess {
                object, property, ..
            } => object
                .qualified_name()
                .map(|prefix| format!("{prefix}.{property}")),
            _ => None,
        }
    }
}

/// Top-level program structure
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub statements: Vec<AstNode>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    /// Names of every top-level `function` declaration.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().filter_map(|node| match node {
            AstNode::FunctionDecl { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }

    /// Names of every top-level `rule` declaration.
    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.statements.iter().filter_map(|node| match node {
            AstNode::RuleDecl { name, .. } => Some(name.as_str()),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qualified_name_of_property_chain() {
        let loc = SourceLocation::new(1, 1);
        let node = AstNode::PropertyAccess {
            object: Box::new(AstNode::Variable("math".to_string(), loc)),
            property: "sqrt".to_string(),
            location: loc,
        };
        assert_eq!(node.qualified_name().as_deref(), Some("math.sqrt"));
    }

    #[test]
    fn test_qualified_name_rejects_literals() {
        let loc = SourceLocation::new(1, 1);
        let node = AstNode::PropertyAccess {
            object: Box::new(AstNode::NumberLiteral(1.0, loc)),
            property: "x".to_string(),
            location: loc,
        };
        assert_eq!(node.qualified_name(), None);
    }

    #[test]
    fn test_grid_command_lookup_is_case_insensitive() {
        assert_eq!(GridCommand::from_ident("SET"), Some(GridCommand::Set));
        assert_eq!(GridCommand::from_ident("Step"), Some(GridCommand::Step));
        assert_eq!(GridCommand::from_ident("print"), None);
    }
}
