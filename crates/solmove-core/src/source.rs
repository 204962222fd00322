//! Source-side AST. This is the shape the front end hands to the IR builder: declarations of a
//! Solidity compilation unit and a typed expression/statement tree. It is serde-serializable so
//! a pre-parsed unit can be fed in as JSON.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub contracts: Vec<SourceContract>,
    /// File-level `constant` declarations.
    #[serde(default)]
    pub constants: Vec<StateVarDecl>,
    #[serde(default)]
    pub structs: Vec<StructDecl>,
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
    #[serde(default)]
    pub errors: Vec<ErrorDecl>,
}

impl SourceUnit {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn contract(&self, name: &str) -> Option<&SourceContract> {
        self.contracts.iter().find(|c| c.name == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractKind {
    Contract,
    Library,
    Interface,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseSpec {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceContract {
    pub name: String,
    pub kind: ContractKind,
    #[serde(default)]
    pub is_abstract: bool,
    #[serde(default)]
    pub bases: Vec<BaseSpec>,
    #[serde(default)]
    pub state_vars: Vec<StateVarDecl>,
    #[serde(default)]
    pub functions: Vec<FunctionDecl>,
    #[serde(default)]
    pub modifiers: Vec<ModifierDecl>,
    #[serde(default)]
    pub events: Vec<EventDecl>,
    #[serde(default)]
    pub errors: Vec<ErrorDecl>,
    #[serde(default)]
    pub structs: Vec<StructDecl>,
    #[serde(default)]
    pub enums: Vec<EnumDecl>,
    #[serde(default)]
    pub using_for: Vec<UsingFor>,
    /// Set by the front end when the declaration did not parse cleanly.
    #[serde(default)]
    pub parse_error: Option<String>,
    #[serde(default)]
    pub line: usize,
}

impl SourceContract {
    pub fn new(name: impl Into<String>, kind: ContractKind) -> Self {
        Self {
            name: name.into(),
            kind,
            is_abstract: false,
            bases: Vec::new(),
            state_vars: Vec::new(),
            functions: Vec::new(),
            modifiers: Vec::new(),
            events: Vec::new(),
            errors: Vec::new(),
            structs: Vec::new(),
            enums: Vec::new(),
            using_for: Vec::new(),
            parse_error: None,
            line: 0,
        }
    }

    pub fn constructor(&self) -> Option<&FunctionDecl> {
        self.functions
            .iter()
            .find(|f| f.kind == FunctionKind::Constructor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceType {
    /// `uint256`, `address`, `bool`, `string`, `bytes32`, ...
    Elementary(String),
    Array(Box<SourceType>, Option<u64>),
    Mapping(Box<SourceType>, Box<SourceType>),
    /// Struct, enum, contract or interface name, possibly qualified (`Lib.Struct`).
    UserDefined(String),
}

impl SourceType {
    pub fn elementary(name: &str) -> Self {
        SourceType::Elementary(name.to_string())
    }

    pub fn mapping(key: SourceType, value: SourceType) -> Self {
        SourceType::Mapping(Box::new(key), Box::new(value))
    }

    pub fn array(element: SourceType, length: Option<u64>) -> Self {
        SourceType::Array(Box::new(element), length)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self, SourceType::Mapping(_, _))
    }

    pub fn name(&self) -> String {
        match self {
            SourceType::Elementary(n) | SourceType::UserDefined(n) => n.clone(),
            SourceType::Array(inner, Some(len)) => format!("{}[{}]", inner.name(), len),
            SourceType::Array(inner, None) => format!("{}[]", inner.name()),
            SourceType::Mapping(k, v) => format!("mapping({} => {})", k.name(), v.name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    Public,
    External,
    Internal,
    Private,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mutability {
    Pure,
    View,
    Payable,
    NonPayable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateVarDecl {
    pub name: String,
    pub ty: SourceType,
    pub visibility: Visibility,
    #[serde(default)]
    pub constant: bool,
    #[serde(default)]
    pub immutable: bool,
    #[serde(default)]
    pub value: Option<Expr>,
    #[serde(default)]
    pub line: usize,
}

impl StateVarDecl {
    pub fn new(name: &str, ty: SourceType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            visibility: Visibility::Internal,
            constant: false,
            immutable: false,
            value: None,
            line: 0,
        }
    }

    pub fn public(mut self) -> Self {
        self.visibility = Visibility::Public;
        self
    }

    pub fn with_value(mut self, value: Expr) -> Self {
        self.value = Some(value);
        self
    }

    pub fn constant(mut self) -> Self {
        self.constant = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Option<String>,
    pub ty: SourceType,
}

impl Param {
    pub fn new(name: &str, ty: SourceType) -> Self {
        Self {
            name: Some(name.to_string()),
            ty,
        }
    }

    pub fn unnamed(ty: SourceType) -> Self {
        Self { name: None, ty }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FunctionKind {
    Function,
    Constructor,
    Fallback,
    Receive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierInvocation {
    pub name: String,
    #[serde(default)]
    pub args: Vec<Expr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub mutability: Mutability,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub returns: Vec<Param>,
    #[serde(default)]
    pub modifiers: Vec<ModifierInvocation>,
    /// `None` for declarations without a body (interfaces, abstract functions).
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub line: usize,
}

impl FunctionDecl {
    pub fn new(name: &str, visibility: Visibility, mutability: Mutability) -> Self {
        Self {
            name: name.to_string(),
            kind: FunctionKind::Function,
            visibility,
            mutability,
            params: Vec::new(),
            returns: Vec::new(),
            modifiers: Vec::new(),
            body: Some(Vec::new()),
            is_virtual: false,
            line: 0,
        }
    }

    pub fn constructor() -> Self {
        Self {
            kind: FunctionKind::Constructor,
            ..Self::new("constructor", Visibility::Public, Mutability::NonPayable)
        }
    }

    pub fn param(mut self, name: &str, ty: SourceType) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    pub fn returns(mut self, ty: SourceType) -> Self {
        self.returns.push(Param::unnamed(ty));
        self
    }

    pub fn modifier(mut self, name: &str, args: Vec<Expr>) -> Self {
        self.modifiers.push(ModifierInvocation {
            name: name.to_string(),
            args,
        });
        self
    }

    pub fn body(mut self, body: Vec<Stmt>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn is_view(&self) -> bool {
        matches!(self.mutability, Mutability::View | Mutability::Pure)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModifierDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
    #[serde(default)]
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventParam {
    pub name: Option<String>,
    pub ty: SourceType,
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDecl {
    pub name: String,
    pub params: Vec<EventParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDecl {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Param>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsingFor {
    pub library: String,
    /// `None` for `using L for *`.
    pub target: Option<SourceType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Some(match symbol {
            "+" => BinaryOp::Add,
            "-" => BinaryOp::Sub,
            "*" => BinaryOp::Mul,
            "/" => BinaryOp::Div,
            "%" => BinaryOp::Mod,
            "**" => BinaryOp::Pow,
            "<<" => BinaryOp::Shl,
            ">>" => BinaryOp::Shr,
            "&" => BinaryOp::BitAnd,
            "|" => BinaryOp::BitOr,
            "^" => BinaryOp::BitXor,
            "&&" => BinaryOp::And,
            "||" => BinaryOp::Or,
            "==" => BinaryOp::Eq,
            "!=" => BinaryOp::Ne,
            "<" => BinaryOp::Lt,
            "<=" => BinaryOp::Le,
            ">" => BinaryOp::Gt,
            ">=" => BinaryOp::Ge,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Pow => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn is_shift(&self) -> bool {
        matches!(self, BinaryOp::Shl | BinaryOp::Shr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Delete,
}

impl UnaryOp {
    pub fn is_update(&self) -> bool {
        matches!(
            self,
            UnaryOp::PreInc | UnaryOp::PreDec | UnaryOp::PostInc | UnaryOp::PostDec
        )
    }

    pub fn is_increment(&self) -> bool {
        matches!(self, UnaryOp::PreInc | UnaryOp::PostInc)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// Raw numeric literal text, including an optional unit (`1 ether`, `0xff`, `1e18`).
    Number(String),
    Bool(bool),
    Str(String),
    HexStr(String),
    Ident(String),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `target = value` or compound `target op= value`.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        /// `{value: x, gas: y}` call options.
        #[serde(default)]
        options: Vec<(String, Expr)>,
        /// `f({a: x, b: y})` named arguments, in source order.
        #[serde(default)]
        named: Vec<(String, Expr)>,
    },
    Member {
        object: Box<Expr>,
        member: String,
    },
    Index {
        base: Box<Expr>,
        index: Option<Box<Expr>>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Tuple(Vec<Option<Expr>>),
    /// Elementary type used as an expression, mostly as a conversion callee (`uint128(x)`).
    ElementaryType(SourceType),
    /// `type(T)`
    TypeInfo(SourceType),
    /// `new T`
    New(SourceType),
    InlineArray(Vec<Expr>),
    /// An expression form the front end has no model for (slices, inline function types, ...).
    Unsupported {
        construct: String,
        text: String,
    },
}

impl Expr {
    pub fn ident(name: &str) -> Self {
        Expr::Ident(name.to_string())
    }

    pub fn num(text: &str) -> Self {
        Expr::Number(text.to_string())
    }

    pub fn str(text: &str) -> Self {
        Expr::Str(text.to_string())
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: None,
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn compound(op: BinaryOp, target: Expr, value: Expr) -> Self {
        Expr::Assign {
            op: Some(op),
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn call(callee: Expr, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(callee),
            args,
            options: Vec::new(),
            named: Vec::new(),
        }
    }

    pub fn call_named(name: &str, args: Vec<Expr>) -> Self {
        Expr::call(Expr::ident(name), args)
    }

    pub fn member(object: Expr, member: &str) -> Self {
        Expr::Member {
            object: Box::new(object),
            member: member.to_string(),
        }
    }

    pub fn index(base: Expr, index: Expr) -> Self {
        Expr::Index {
            base: Box::new(base),
            index: Some(Box::new(index)),
        }
    }

    pub fn msg_sender() -> Self {
        Expr::member(Expr::ident("msg"), "sender")
    }

    /// `true` for `msg.sender` and `_msgSender()`.
    pub fn is_msg_sender(&self) -> bool {
        match self {
            Expr::Member { object, member } => {
                member == "sender" && matches!(object.as_ref(), Expr::Ident(o) if o == "msg")
            }
            Expr::Call { callee, args, .. } => {
                args.is_empty() && matches!(callee.as_ref(), Expr::Ident(n) if n == "_msgSender")
            }
            _ => false,
        }
    }

    /// Innermost identifier a storage access is rooted at: `a` for `a[k].f[i]`.
    pub fn root_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            Expr::Index { base, .. } => base.root_ident(),
            Expr::Member { object, .. } => object.root_ident(),
            _ => None,
        }
    }

    /// Pre-order walk over this expression and every sub-expression.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk(f);
                rhs.walk(f);
            }
            Expr::Unary { operand, .. } => operand.walk(f),
            Expr::Assign { target, value, .. } => {
                target.walk(f);
                value.walk(f);
            }
            Expr::Call {
                callee,
                args,
                options,
                named,
            } => {
                callee.walk(f);
                args.iter().for_each(|a| a.walk(f));
                options.iter().for_each(|(_, v)| v.walk(f));
                named.iter().for_each(|(_, v)| v.walk(f));
            }
            Expr::Member { object, .. } => object.walk(f),
            Expr::Index { base, index } => {
                base.walk(f);
                if let Some(index) = index {
                    index.walk(f);
                }
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.walk(f);
                otherwise.walk(f);
            }
            Expr::Tuple(items) => items.iter().flatten().for_each(|e| e.walk(f)),
            Expr::InlineArray(items) => items.iter().for_each(|e| e.walk(f)),
            _ => {}
        }
    }

    /// Post-order walk with mutable access; `f` sees children before their parent.
    pub fn walk_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        match self {
            Expr::Binary { lhs, rhs, .. } => {
                lhs.walk_mut(f);
                rhs.walk_mut(f);
            }
            Expr::Unary { operand, .. } => operand.walk_mut(f),
            Expr::Assign { target, value, .. } => {
                target.walk_mut(f);
                value.walk_mut(f);
            }
            Expr::Call {
                callee,
                args,
                options,
                named,
            } => {
                callee.walk_mut(f);
                args.iter_mut().for_each(|a| a.walk_mut(f));
                options.iter_mut().for_each(|(_, v)| v.walk_mut(f));
                named.iter_mut().for_each(|(_, v)| v.walk_mut(f));
            }
            Expr::Member { object, .. } => object.walk_mut(f),
            Expr::Index { base, index } => {
                base.walk_mut(f);
                if let Some(index) = index {
                    index.walk_mut(f);
                }
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                cond.walk_mut(f);
                then.walk_mut(f);
                otherwise.walk_mut(f);
            }
            Expr::Tuple(items) => items.iter_mut().flatten().for_each(|e| e.walk_mut(f)),
            Expr::InlineArray(items) => items.iter_mut().for_each(|e| e.walk_mut(f)),
            _ => {}
        }
        f(self);
    }

    pub fn any(&self, pred: &dyn Fn(&Expr) -> bool) -> bool {
        let mut found = false;
        self.walk(&mut |e| {
            if pred(e) {
                found = true;
            }
        });
        found
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalDecl {
    pub name: String,
    pub ty: Option<SourceType>,
    /// Declared with the `storage` location: the local aliases state instead of copying it.
    #[serde(default)]
    pub storage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Block(Vec<Stmt>),
    Unchecked(Vec<Stmt>),
    Expr(Expr),
    /// `T a = v;` or `(T a, , T b) = v;` (holes are `None`).
    VarDecl {
        decls: Vec<Option<LocalDecl>>,
        value: Option<Expr>,
    },
    If {
        cond: Expr,
        then: Box<Stmt>,
        otherwise: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
    },
    Return(Option<Expr>),
    Emit {
        event: String,
        args: Vec<Expr>,
    },
    /// `revert()`, `revert("msg")` or `revert CustomError(args)`.
    Revert {
        error: Option<String>,
        args: Vec<Expr>,
    },
    Break,
    Continue,
    /// The `_;` marker inside a modifier body.
    Placeholder,
    Assembly(String),
    /// Anything else the front end recognised but has no model for (`try`, ...).
    Unsupported {
        construct: String,
        text: String,
    },
}

impl Stmt {
    pub fn expr(e: Expr) -> Self {
        Stmt::Expr(e)
    }

    pub fn let_(name: &str, ty: Option<SourceType>, value: Expr) -> Self {
        Stmt::VarDecl {
            decls: vec![Some(LocalDecl {
                name: name.to_string(),
                ty,
                storage: false,
            })],
            value: Some(value),
        }
    }

    pub fn require(cond: Expr, message: &str) -> Self {
        Stmt::Expr(Expr::call_named("require", vec![cond, Expr::str(message)]))
    }

    pub fn ret(value: Expr) -> Self {
        Stmt::Return(Some(value))
    }

    pub fn if_(cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Self {
        Stmt::If {
            cond,
            then: Box::new(Stmt::Block(then)),
            otherwise: otherwise.map(|o| Box::new(Stmt::Block(o))),
        }
    }

    /// Visits every expression directly owned by this statement or by nested statements.
    pub fn walk_exprs<'a>(&'a self, f: &mut dyn FnMut(&'a Expr)) {
        match self {
            Stmt::Block(stmts) | Stmt::Unchecked(stmts) => {
                stmts.iter().for_each(|s| s.walk_exprs(f))
            }
            Stmt::Expr(e) => f(e),
            Stmt::VarDecl { value, .. } => {
                if let Some(v) = value {
                    f(v);
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                f(cond);
                then.walk_exprs(f);
                if let Some(o) = otherwise {
                    o.walk_exprs(f);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                f(cond);
                body.walk_exprs(f);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(i) = init {
                    i.walk_exprs(f);
                }
                if let Some(c) = cond {
                    f(c);
                }
                if let Some(u) = update {
                    f(u);
                }
                body.walk_exprs(f);
            }
            Stmt::Return(Some(e)) => f(e),
            Stmt::Emit { args, .. } | Stmt::Revert { args, .. } => args.iter().for_each(|a| f(a)),
            _ => {}
        }
    }

    /// Mutable counterpart of [`Stmt::walk_exprs`]; every owned expression is walked post-order.
    pub fn walk_exprs_mut(&mut self, f: &mut dyn FnMut(&mut Expr)) {
        match self {
            Stmt::Block(stmts) | Stmt::Unchecked(stmts) => {
                stmts.iter_mut().for_each(|s| s.walk_exprs_mut(f))
            }
            Stmt::Expr(e) => e.walk_mut(f),
            Stmt::VarDecl { value, .. } => {
                if let Some(v) = value {
                    v.walk_mut(f);
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.walk_mut(f);
                then.walk_exprs_mut(f);
                if let Some(o) = otherwise {
                    o.walk_exprs_mut(f);
                }
            }
            Stmt::While { cond, body } | Stmt::DoWhile { body, cond } => {
                cond.walk_mut(f);
                body.walk_exprs_mut(f);
            }
            Stmt::For {
                init,
                cond,
                update,
                body,
            } => {
                if let Some(i) = init {
                    i.walk_exprs_mut(f);
                }
                if let Some(c) = cond {
                    c.walk_mut(f);
                }
                if let Some(u) = update {
                    u.walk_mut(f);
                }
                body.walk_exprs_mut(f);
            }
            Stmt::Return(Some(e)) => e.walk_mut(f),
            Stmt::Emit { args, .. } | Stmt::Revert { args, .. } => {
                args.iter_mut().for_each(|a| a.walk_mut(f))
            }
            _ => {}
        }
    }

    /// Visits this statement and every nested statement, pre-order.
    pub fn walk<'a>(&'a self, f: &mut dyn FnMut(&'a Stmt)) {
        f(self);
        match self {
            Stmt::Block(stmts) | Stmt::Unchecked(stmts) => stmts.iter().for_each(|s| s.walk(f)),
            Stmt::If {
                then, otherwise, ..
            } => {
                then.walk(f);
                if let Some(o) = otherwise {
                    o.walk(f);
                }
            }
            Stmt::While { body, .. } | Stmt::DoWhile { body, .. } => body.walk(f),
            Stmt::For { init, body, .. } => {
                if let Some(i) = init {
                    i.walk(f);
                }
                body.walk(f);
            }
            _ => {}
        }
    }

    pub fn count_placeholders(stmts: &[Stmt]) -> usize {
        let mut count = 0;
        for stmt in stmts {
            stmt.walk(&mut |s| {
                if matches!(s, Stmt::Placeholder) {
                    count += 1;
                }
            });
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_msg_sender_detection() {
        assert!(Expr::msg_sender().is_msg_sender());
        assert!(Expr::call_named("_msgSender", vec![]).is_msg_sender());
        assert!(!Expr::member(Expr::ident("msg"), "value").is_msg_sender());
    }

    #[test]
    fn test_root_ident() {
        let access = Expr::member(
            Expr::index(Expr::ident("users"), Expr::msg_sender()),
            "balance",
        );
        assert_eq!(access.root_ident(), Some("users"));
    }

    #[test]
    fn test_placeholder_count_sees_nested_blocks() {
        let body = vec![
            Stmt::require(Expr::Bool(true), "x"),
            Stmt::if_(Expr::Bool(true), vec![Stmt::Placeholder], None),
        ];
        assert_eq!(Stmt::count_placeholders(&body), 1);
    }

    #[test]
    fn test_json_roundtrip_of_contract() {
        let mut contract = SourceContract::new("Counter", ContractKind::Contract);
        contract
            .state_vars
            .push(StateVarDecl::new("count", SourceType::elementary("uint256")));
        let json = serde_json::to_string(&contract).unwrap();
        let back: SourceContract = serde_json::from_str(&json).unwrap();
        assert_eq!(back, contract);
    }
}
