//! Lua syntax tree
//!
//! Nodes carry a kind, a byte range and their children labelled by field
//! name. Lists are stored as repeated entries under the same label.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Chunk,
    LocalStatement,
    AssignmentStatement,
    CallStatement,
    CallExpression,
    FunctionDeclaration,
    LocalFunction,
    FunctionExpression,
    Identifier,
    /// Member name after `.` or `:`, or a table key written as a name
    Property,
    MemberExpression,
    IndexExpression,
    ParenthesizedExpression,
    StringLiteral,
    NumericLiteral,
    BooleanLiteral,
    NilLiteral,
    VarargLiteral,
    TableConstructorExpression,
    TableKey,
    TableKeyString,
    TableValue,
    BinaryExpression,
    LogicalExpression,
    UnaryExpression,
    IfStatement,
    IfClause,
    ElseifClause,
    ElseClause,
    WhileStatement,
    DoStatement,
    RepeatStatement,
    ForNumericStatement,
    ForGenericStatement,
    ReturnStatement,
    BreakStatement,
    GotoStatement,
    LabelStatement,
}

impl Kind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Chunk => "Chunk",
            Kind::LocalStatement => "LocalStatement",
            Kind::AssignmentStatement => "AssignmentStatement",
            Kind::CallStatement => "CallStatement",
            Kind::CallExpression => "CallExpression",
            Kind::FunctionDeclaration => "FunctionDeclaration",
            Kind::LocalFunction => "LocalFunction",
            Kind::FunctionExpression => "FunctionExpression",
            Kind::Identifier => "Identifier",
            Kind::Property => "Property",
            Kind::MemberExpression => "MemberExpression",
            Kind::IndexExpression => "IndexExpression",
            Kind::ParenthesizedExpression => "ParenthesizedExpression",
            Kind::StringLiteral => "StringLiteral",
            Kind::NumericLiteral => "NumericLiteral",
            Kind::BooleanLiteral => "BooleanLiteral",
            Kind::NilLiteral => "NilLiteral",
            Kind::VarargLiteral => "VarargLiteral",
            Kind::TableConstructorExpression => "TableConstructorExpression",
            Kind::TableKey => "TableKey",
            Kind::TableKeyString => "TableKeyString",
            Kind::TableValue => "TableValue",
            Kind::BinaryExpression => "BinaryExpression",
            Kind::LogicalExpression => "LogicalExpression",
            Kind::UnaryExpression => "UnaryExpression",
            Kind::IfStatement => "IfStatement",
            Kind::IfClause => "IfClause",
            Kind::ElseifClause => "ElseifClause",
            Kind::ElseClause => "ElseClause",
            Kind::WhileStatement => "WhileStatement",
            Kind::DoStatement => "DoStatement",
            Kind::RepeatStatement => "RepeatStatement",
            Kind::ForNumericStatement => "ForNumericStatement",
            Kind::ForGenericStatement => "ForGenericStatement",
            Kind::ReturnStatement => "ReturnStatement",
            Kind::BreakStatement => "BreakStatement",
            Kind::GotoStatement => "GotoStatement",
            Kind::LabelStatement => "LabelStatement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub kind: Kind,
    pub start: usize,
    pub end: usize,
    pub children: Vec<(&'static str, Node)>,
}

impl Node {
    pub fn new(kind: Kind, start: usize, end: usize) -> Self {
        Self {
            kind,
            start,
            end,
            children: Vec::new(),
        }
    }

    pub fn with(mut self, field: &'static str, child: Node) -> Self {
        self.children.push((field, child));
        self
    }

    pub fn with_all(mut self, field: &'static str, children: Vec<Node>) -> Self {
        self.children.extend(children.into_iter().map(|c| (field, c)));
        self
    }

    pub fn with_opt(self, field: &'static str, child: Option<Node>) -> Self {
        match child {
            Some(child) => self.with(field, child),
            None => self,
        }
    }

    pub fn field(&self, field: &str) -> Option<&Node> {
        self.children.iter().find(|(f, _)| *f == field).map(|(_, c)| c)
    }
}
