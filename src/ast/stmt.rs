//! Statement tree (section 3.5).

use crate::ast::expr::Expr;
use crate::ast::qualifiers::{BlockModifier, FnModifier, MemQual};
use crate::ast::type_annotation::TypeAnnotation;
use crate::lexer::Span;

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionParam {
    pub name: String,
    pub type_annotation: TypeAnnotation,
    pub mem_qual: MemQual,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Function {
    pub name: String,
    pub params: Vec<FunctionParam>,
    pub return_type: TypeAnnotation,
    pub modifier: FnModifier,
    pub body: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub declared_type: Option<TypeAnnotation>,
    pub initializer: Option<Expr>,
    pub mem_qual: MemQual,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub modifier: BlockModifier,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct If {
    pub condition: Expr,
    pub then_branch: Block,
    pub else_branch: Option<Box<ElseBranch>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ElseBranch {
    Block(Block),
    If(If),
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct While {
    pub condition: Expr,
    pub body: Block,
    pub is_shared: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct For {
    pub init: Option<Box<Statement>>,
    pub condition: Option<Expr>,
    pub step: Option<Expr>,
    pub body: Block,
    pub is_shared: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ForEach {
    pub binding: String,
    pub iterable: Expr,
    pub body: Block,
    pub is_shared: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Import {
    pub path: String,
    pub namespace: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Statement {
    Expression(Expr),
    VarDecl(VarDecl),
    Function(Function),
    Return(Option<Expr>, Span),
    Block(Block),
    If(If),
    While(While),
    For(For),
    ForEach(ForEach),
    Break(Span),
    Continue(Span),
    Import(Import),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Expression(e) => e.span(),
            Statement::VarDecl(v) => v.span.clone(),
            Statement::Function(f) => f.span.clone(),
            Statement::Return(_, s) => s.clone(),
            Statement::Block(b) => b.span.clone(),
            Statement::If(i) => i.span.clone(),
            Statement::While(w) => w.span.clone(),
            Statement::For(f) => f.span.clone(),
            Statement::ForEach(f) => f.span.clone(),
            Statement::Break(s) => s.clone(),
            Statement::Continue(s) => s.clone(),
            Statement::Import(i) => i.span.clone(),
        }
    }

    /// Is this statement, syntactically, a terminator: one that
    /// unconditionally transfers control out of its enclosing block
    /// (section 4.I rule 1, Glossary "Terminator statement")?
    ///
    /// Per the preserved reference behavior (section 9 Open Question b),
    /// an `if` is a terminator only when it HAS an else branch and both
    /// branches terminate; an `if` without an `else` is conservatively
    /// never a terminator, even if its `then` branch always returns.
    pub fn is_terminator(&self) -> bool {
        match self {
            Statement::Return(..) | Statement::Break(_) | Statement::Continue(_) => true,
            Statement::If(If {
                then_branch,
                else_branch: Some(else_branch),
                ..
            }) => {
                block_terminates(then_branch)
                    && match else_branch.as_ref() {
                        ElseBranch::Block(b) => block_terminates(b),
                        ElseBranch::If(i) => Statement::If(i.clone()).is_terminator(),
                    }
            }
            _ => false,
        }
    }
}

/// A block "terminates" if its first terminator statement is reachable,
/// i.e. some statement in it (before any earlier terminator) is itself a
/// terminator (section 4.I rule 1).
pub fn block_terminates(block: &Block) -> bool {
    block.statements.iter().any(Statement::is_terminator)
}
