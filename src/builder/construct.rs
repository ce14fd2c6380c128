//! Language-neutral classification of syntax nodes
//!
//! Each language implements [`LanguageRules::classify`], turning one of its
//! nodes into a [`Construct`]. The walker only ever sees constructs, so scope
//! tracking and dependency recording are written once for every grammar.

use crate::adapter::SyntaxRef;
use crate::scope::NamePath;
use crate::symbol::ItemKind;

/// What a node means to the tree builder.
#[derive(Debug)]
pub enum Construct<'t> {
    /// Function, method, lambda or closure
    Function(FunctionSpec<'t>),
    /// Class or struct with a member list
    Class(ClassSpec<'t>),
    /// Named definition without a scope of its own (typedef, macro, prototype)
    Declaration(DeclarationSpec<'t>),
    /// Declaration of new names in the current scope (`local x = ...`)
    Local(LocalSpec<'t>),
    /// Assignment to existing names or member paths
    Assign(AssignSpec<'t>),
    Call(CallSpec<'t>),
    /// Read of a plain identifier
    Identifier(String),
    /// Read of a member path such as `M.value`
    Member(NamePath),
    /// Loop, conditional or explicit block
    Block(BlockSpec<'t>),
    Import(Vec<ImportBinding>),
    /// Visit only these children
    Walk(Vec<SyntaxRef<'t>>),
    /// Ignore the node and everything below it
    Skip,
    /// Visit every child
    Other,
}

#[derive(Debug)]
pub struct FunctionSpec<'t> {
    /// `None` for anonymous functions
    pub name: Option<NamePath>,
    /// Bind the name in the current scope rather than resolving it
    pub local: bool,
    pub kind: ItemKind,
    pub params: Vec<ParamSpec<'t>>,
    pub body: Vec<SyntaxRef<'t>>,
    /// Where the body begins; the text before it is the signature
    pub body_start: Option<usize>,
    /// `self` in `function M:f()` bound to the table the method lives in
    pub receiver: Option<(&'static str, NamePath)>,
    /// Decorators, return types and the like, read in the enclosing scope
    pub extras: Vec<SyntaxRef<'t>>,
}

impl<'t> FunctionSpec<'t> {
    pub fn anonymous(kind: ItemKind) -> Self {
        Self {
            name: None,
            local: false,
            kind,
            params: Vec::new(),
            body: Vec::new(),
            body_start: None,
            receiver: None,
            extras: Vec::new(),
        }
    }

    pub fn named(name: NamePath, local: bool, kind: ItemKind) -> Self {
        Self {
            name: Some(name),
            local,
            ..Self::anonymous(kind)
        }
    }
}

#[derive(Debug)]
pub struct ParamSpec<'t> {
    pub name: String,
    pub default: Option<SyntaxRef<'t>>,
}

impl<'t> ParamSpec<'t> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }
}

#[derive(Debug)]
pub struct ClassSpec<'t> {
    pub name: String,
    pub bases: Vec<SyntaxRef<'t>>,
    pub members: Vec<ClassMember<'t>>,
}

#[derive(Debug)]
pub enum ClassMember<'t> {
    /// Node classifies as a [`Construct::Function`]
    Method { name: String, node: SyntaxRef<'t> },
    Field {
        name: String,
        node: SyntaxRef<'t>,
        value: Option<SyntaxRef<'t>>,
    },
    /// Bodiless method declaration
    Prototype { name: String, node: SyntaxRef<'t> },
    Other(SyntaxRef<'t>),
}

#[derive(Debug)]
pub struct DeclarationSpec<'t> {
    pub name: NamePath,
    pub kind: ItemKind,
    /// Only registers the `-declare` entry
    pub prototype: bool,
    pub exprs: Vec<SyntaxRef<'t>>,
}

#[derive(Debug)]
pub struct LocalSpec<'t> {
    pub targets: Vec<String>,
    pub values: Vec<SyntaxRef<'t>>,
}

#[derive(Debug)]
pub struct AssignSpec<'t> {
    pub targets: Vec<NamePath>,
    pub values: Vec<SyntaxRef<'t>>,
    /// Targets that are not plain paths (`t[k]`), read for their sub-expressions
    pub others: Vec<SyntaxRef<'t>>,
}

#[derive(Debug)]
pub struct CallSpec<'t> {
    pub callee: Option<NamePath>,
    /// Callee expression when it is not a plain path
    pub callee_node: Option<SyntaxRef<'t>>,
    pub args: Vec<SyntaxRef<'t>>,
}

#[derive(Debug)]
pub struct BlockSpec<'t> {
    /// Opens a new lexical scope
    pub scoped: bool,
    /// Loop variables bound before the body
    pub bindings: Vec<String>,
    /// Expressions feeding the bindings (iterables, bounds)
    pub header: Vec<SyntaxRef<'t>>,
    pub body: Vec<SyntaxRef<'t>>,
}

impl<'t> BlockSpec<'t> {
    pub fn scope(body: Vec<SyntaxRef<'t>>) -> Self {
        Self {
            scoped: true,
            bindings: Vec::new(),
            header: Vec::new(),
            body,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBinding {
    pub name: String,
    pub target: ImportTarget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportTarget {
    /// `from m import x as name` binds `name` to `global>x`
    Symbol(String),
    /// `import m` binds `m` so that `m.f` resolves to `global>f`
    Module,
}

/// Per-language node classification.
pub trait LanguageRules: Send + Sync {
    fn classify<'t>(&self, node: SyntaxRef<'t>, source: &str) -> Construct<'t>;

    /// Separator between a class name and its members.
    fn member_separator(&self) -> &'static str {
        "."
    }

    /// Name of the implicit receiver inside methods.
    fn receiver(&self) -> Option<&'static str> {
        None
    }

    /// Whether bare method names inside a class body refer to members.
    fn implicit_members(&self) -> bool {
        false
    }

    /// Whether a function declared in a body is visible to the whole body,
    /// including code before the declaration.
    fn hoists_functions(&self) -> bool {
        false
    }
}
