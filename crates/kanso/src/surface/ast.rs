use serde::Serialize;

use crate::diagnostics::Span;
use crate::operators::Fixity;
use crate::syntax::{FloatLiteral, IntegerLiteral, Sort};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Name {
    pub text: String,
    pub span: Span,
}

impl Name {
    pub fn is_qualified(&self) -> bool {
        self.text.contains('.') && self.text != "."
    }

    pub fn last_segment(&self) -> &str {
        self.text.rsplit('.').next().unwrap_or(&self.text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Hiding {
    Visible,
    Hidden,
    Instance,
}

/// `@expr` annotations in front of declarations and binders.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub expr: Expr,
    pub span: Span,
}

/// A binder group: `x`, `(x y : A)`, `{x}`, `{{i : C}}`, optionally with a leading `.`
/// or `..` relevance marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub hiding: Hiding,
    pub relevance: Option<String>,
    pub attributes: Vec<Attribute>,
    pub names: Vec<Name>,
    /// Per-name markers inside brackets (`{.x y : A}`), by position in `names`. Empty when
    /// no name carries one.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub name_relevance: Vec<Option<String>>,
    pub ty: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum QuoteForm {
    Quote,
    QuoteTerm,
    QuoteContext,
    Unquote,
}

impl QuoteForm {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "quote" => Some(Self::Quote),
            "quoteTerm" => Some(Self::QuoteTerm),
            "quoteContext" => Some(Self::QuoteContext),
            "unquote" => Some(Self::Unquote),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Quote => "quote",
            Self::QuoteTerm => "quoteTerm",
            Self::QuoteContext => "quoteContext",
            Self::Unquote => "unquote",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Ident {
        name: Name,
    },
    Wildcard {
        span: Span,
    },
    Integer {
        value: IntegerLiteral,
        text: String,
        span: Span,
    },
    Float {
        value: FloatLiteral,
        span: Span,
    },
    String {
        text: String,
        span: Span,
    },
    Universe {
        sort: Sort,
        level: Option<u32>,
        text: String,
        span: Span,
    },
    Quote {
        form: QuoteForm,
        span: Span,
    },
    Ellipsis {
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
    /// `{e}` or `{{e}}`.
    Braces {
        hiding: Hiding,
        inner: Box<Expr>,
        span: Span,
    },
    NamedArg {
        hiding: Hiding,
        name: Name,
        value: Box<Expr>,
        span: Span,
    },
    /// `()`, `{}` or `{{}}`.
    Absurd {
        hiding: Hiding,
        span: Span,
    },
    Idiom {
        inner: Box<Expr>,
        span: Span,
    },
    Dot {
        inner: Box<Expr>,
        span: Span,
    },
    AsPattern {
        name: Name,
        pattern: Box<Expr>,
        span: Span,
    },
    Record {
        base: Option<Box<Expr>>,
        fields: Vec<FieldAssignment>,
        span: Span,
    },
    App {
        func: Box<Expr>,
        arg: Box<Expr>,
        span: Span,
    },
    /// An application run regrouped around declared operators. `operator` is the
    /// normalised operator name (`_+_`, `¬_`).
    OpApp {
        op: Name,
        operator: String,
        operands: Vec<Expr>,
        span: Span,
    },
    Guarded {
        guards: Vec<Expr>,
        body: Box<Expr>,
        span: Span,
    },
    Fun {
        domain: Box<Expr>,
        codomain: Box<Expr>,
        span: Span,
    },
    Pi {
        forall: bool,
        bindings: Vec<Binding>,
        body: Box<Expr>,
        span: Span,
    },
    Lambda {
        bindings: Vec<Binding>,
        body: Box<Expr>,
        span: Span,
    },
    ExtendedLambda {
        where_form: bool,
        clauses: Vec<LambdaClause>,
        span: Span,
    },
    AbsurdLambda {
        hiding: Hiding,
        span: Span,
    },
    Let {
        decls: Vec<Decl>,
        body: Option<Box<Expr>>,
        span: Span,
    },
    Do {
        stmts: Vec<DoStmt>,
        span: Span,
    },
    QuoteGoal {
        name: Name,
        body: Box<Expr>,
        span: Span,
    },
    Tactic {
        body: Box<Expr>,
        alternatives: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { name } => name.span,
            Expr::Wildcard { span }
            | Expr::Integer { span, .. }
            | Expr::Float { span, .. }
            | Expr::String { span, .. }
            | Expr::Universe { span, .. }
            | Expr::Quote { span, .. }
            | Expr::Ellipsis { span }
            | Expr::Paren { span, .. }
            | Expr::Braces { span, .. }
            | Expr::NamedArg { span, .. }
            | Expr::Absurd { span, .. }
            | Expr::Idiom { span, .. }
            | Expr::Dot { span, .. }
            | Expr::AsPattern { span, .. }
            | Expr::Record { span, .. }
            | Expr::App { span, .. }
            | Expr::OpApp { span, .. }
            | Expr::Guarded { span, .. }
            | Expr::Fun { span, .. }
            | Expr::Pi { span, .. }
            | Expr::Lambda { span, .. }
            | Expr::ExtendedLambda { span, .. }
            | Expr::AbsurdLambda { span, .. }
            | Expr::Let { span, .. }
            | Expr::Do { span, .. }
            | Expr::QuoteGoal { span, .. }
            | Expr::Tactic { span, .. } => *span,
        }
    }

    /// Head identifier of an application spine, looking through `OpApp` to its operator.
    pub fn head_name(&self) -> Option<String> {
        match self {
            Expr::Ident { name } => Some(name.text.clone()),
            Expr::App { func, .. } => func.head_name(),
            Expr::OpApp { operator, .. } => Some(operator.clone()),
            Expr::Guarded { guards, body, .. } => {
                guards.first().map_or_else(|| body.head_name(), Expr::head_name)
            }
            Expr::Ellipsis { .. } => Some("...".to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldAssignment {
    pub name: Name,
    pub value: Expr,
    pub span: Span,
}

/// One clause of `λ { p → e ; ... }` or `λ where`. Absurd clauses have no body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LambdaClause {
    pub lhs: Expr,
    pub body: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DoStmt {
    Bind {
        pattern: Expr,
        value: Expr,
        span: Span,
    },
    Expr {
        expr: Expr,
        span: Span,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeSig {
    pub attributes: Vec<Attribute>,
    pub names: Vec<Name>,
    pub ty: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhereBlock {
    pub module: Option<Name>,
    pub decls: Vec<Decl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clause {
    pub attributes: Vec<Attribute>,
    pub lhs: Expr,
    pub rewrite: Vec<Expr>,
    pub with_exprs: Vec<Expr>,
    pub rhs: Option<Expr>,
    pub where_block: Option<WhereBlock>,
    pub span: Span,
}

/// A type signature grouped with the clauses that define the same name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Function {
    pub name: String,
    pub signature: Option<TypeSig>,
    pub clauses: Vec<Clause>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Data,
    Codata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataDecl {
    pub keyword: DataKind,
    pub name: Name,
    pub params: Vec<Binding>,
    pub ty: Option<Expr>,
    /// `None` for a signature-only declaration without `where`.
    pub constructors: Option<Vec<Decl>>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DirectiveForm {
    Constructor,
    Inductive,
    Coinductive,
    EtaEquality,
    NoEtaEquality,
}

impl DirectiveForm {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "constructor" => Some(Self::Constructor),
            "inductive" => Some(Self::Inductive),
            "coinductive" => Some(Self::Coinductive),
            "eta-equality" => Some(Self::EtaEquality),
            "no-eta-equality" => Some(Self::NoEtaEquality),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Constructor => "constructor",
            Self::Inductive => "inductive",
            Self::Coinductive => "coinductive",
            Self::EtaEquality => "eta-equality",
            Self::NoEtaEquality => "no-eta-equality",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDirective {
    pub form: DirectiveForm,
    /// Constructor name, for `constructor` directives.
    pub name: Option<Name>,
    /// `instance` block wrapping the constructor directive.
    pub instance: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordDecl {
    pub name: Name,
    pub params: Vec<Binding>,
    pub ty: Option<Expr>,
    pub directives: Vec<RecordDirective>,
    /// `None` for a signature-only declaration without `where`.
    pub body: Option<Vec<Decl>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleDecl {
    pub name: Name,
    pub params: Vec<Binding>,
    pub body: Vec<Decl>,
    /// The body continues at the header's own column.
    pub flush: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleApplication {
    pub module: Name,
    pub args: Vec<Expr>,
    /// `M {{...}}`
    pub instance_ellipsis: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleMacro {
    pub open: bool,
    pub name: Name,
    pub params: Vec<Binding>,
    pub application: ModuleApplication,
    pub directives: Vec<ImportDirective>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportName {
    pub module: bool,
    pub name: Name,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Renaming {
    pub from: ImportName,
    pub to: Name,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "directive", rename_all = "snake_case")]
pub enum ImportDirective {
    Public { span: Span },
    Using { names: Vec<ImportName>, span: Span },
    Hiding { names: Vec<ImportName>, span: Span },
    Renaming { renamings: Vec<Renaming>, span: Span },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportDecl {
    pub open: bool,
    pub import: bool,
    pub module: Name,
    pub args: Vec<Expr>,
    pub alias: Option<Name>,
    pub directives: Vec<ImportDirective>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pragma {
    pub text: String,
    pub catchall: bool,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKeyword {
    Mutual,
    Abstract,
    Private,
    Instance,
    Macro,
    Postulate,
}

impl BlockKeyword {
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "mutual" => Some(Self::Mutual),
            "abstract" => Some(Self::Abstract),
            "private" => Some(Self::Private),
            "instance" => Some(Self::Instance),
            "macro" => Some(Self::Macro),
            "postulate" => Some(Self::Postulate),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Mutual => "mutual",
            Self::Abstract => "abstract",
            Self::Private => "private",
            Self::Instance => "instance",
            Self::Macro => "macro",
            Self::Postulate => "postulate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockDecl {
    pub keyword: BlockKeyword,
    pub decls: Vec<Decl>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKeyword {
    Primitive,
    /// `variable` (generalised variables).
    Variable,
    Field,
}

impl SignatureKeyword {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Primitive => "primitive",
            Self::Variable => "variable",
            Self::Field => "field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignatureBlock {
    pub keyword: SignatureKeyword,
    pub sigs: Vec<TypeSig>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfixDecl {
    pub fixity: Fixity,
    pub precedence: u32,
    pub names: Vec<Name>,
    pub span: Span,
}

/// A hole in a `syntax` declaration: `x`, `(λ y → x)`, `{x}`, `{{x}}` or `{l = x}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoleName {
    pub hiding: Hiding,
    pub label: Option<Name>,
    pub binder: Option<Name>,
    pub name: Name,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxDecl {
    pub name: Name,
    pub holes: Vec<HoleName>,
    pub notation: Vec<Name>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternSynonym {
    pub name: Name,
    pub params: Vec<Binding>,
    pub rhs: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnquoteForm {
    #[serde(rename = "unquoteDecl")]
    Decl,
    #[serde(rename = "unquoteDef")]
    Def,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnquoteDecl {
    pub form: UnquoteForm,
    pub names: Vec<Name>,
    pub expr: Expr,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDecl {
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    TypeSignature(TypeSig),
    Clause(Clause),
    Function(Function),
    Data(DataDecl),
    Record(RecordDecl),
    Directive(RecordDirective),
    Module(ModuleDecl),
    ModuleMacro(ModuleMacro),
    Import(ImportDecl),
    Pragma(Pragma),
    Block(BlockDecl),
    Signatures(SignatureBlock),
    Infix(InfixDecl),
    Syntax(SyntaxDecl),
    PatternSynonym(PatternSynonym),
    Unquote(UnquoteDecl),
    Error(ErrorDecl),
}

impl Decl {
    pub fn span(&self) -> Span {
        match self {
            Decl::TypeSignature(d) => d.span,
            Decl::Clause(d) => d.span,
            Decl::Function(d) => d.span,
            Decl::Data(d) => d.span,
            Decl::Record(d) => d.span,
            Decl::Directive(d) => d.span,
            Decl::Module(d) => d.span,
            Decl::ModuleMacro(d) => d.span,
            Decl::Import(d) => d.span,
            Decl::Pragma(d) => d.span,
            Decl::Block(d) => d.span,
            Decl::Signatures(d) => d.span,
            Decl::Infix(d) => d.span,
            Decl::Syntax(d) => d.span,
            Decl::PatternSynonym(d) => d.span,
            Decl::Unquote(d) => d.span,
            Decl::Error(d) => d.span,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Decl::Error(_))
    }
}
