//! Flattened contract IR. One [`IRContract`] per source contract or library, with inheritance
//! already linearized and merged. Nothing downstream of the IR builder mutates these values.

use crate::source::{
    ContractKind, Expr, FunctionKind, ModifierInvocation, Mutability, Stmt, UsingFor, Visibility,
};
use crate::types::MoveType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IRTypeKind {
    Primitive { width: u16, signed: bool },
    Bool,
    Address,
    String,
    /// `bytes` when `fixed` is `None`, `bytesN` otherwise.
    Bytes { fixed: Option<u16> },
    Array {
        element: Box<IRType>,
        length: Option<u64>,
    },
    Mapping {
        key: Box<IRType>,
        value: Box<IRType>,
    },
    Struct(String),
    Enum(String),
    Contract(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IRType {
    pub source_name: String,
    pub target: MoveType,
    pub kind: IRTypeKind,
}

impl IRType {
    pub fn new(source_name: impl Into<String>, target: MoveType, kind: IRTypeKind) -> Self {
        Self {
            source_name: source_name.into(),
            target,
            kind,
        }
    }

    pub fn uint(width: u16) -> Self {
        Self::new(
            format!("uint{}", width),
            MoveType::Uint(width),
            IRTypeKind::Primitive {
                width,
                signed: false,
            },
        )
    }

    pub fn address() -> Self {
        Self::new("address", MoveType::Address, IRTypeKind::Address)
    }

    pub fn bool() -> Self {
        Self::new("bool", MoveType::Bool, IRTypeKind::Bool)
    }

    pub fn is_mapping(&self) -> bool {
        matches!(self.kind, IRTypeKind::Mapping { .. })
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, IRTypeKind::Array { .. })
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self.kind, IRTypeKind::Primitive { .. })
    }

    pub fn width(&self) -> Option<u16> {
        match self.kind {
            IRTypeKind::Primitive { width, .. } => Some(width),
            _ => None,
        }
    }

    pub fn mapping_key(&self) -> Option<&IRType> {
        match &self.kind {
            IRTypeKind::Mapping { key, .. } => Some(key),
            _ => None,
        }
    }

    pub fn mapping_value(&self) -> Option<&IRType> {
        match &self.kind {
            IRTypeKind::Mapping { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn array_element(&self) -> Option<&IRType> {
        match &self.kind {
            IRTypeKind::Array { element, .. } => Some(element),
            _ => None,
        }
    }

    /// Number of mapping levels: 0 for non-mappings, 2 for `mapping(a => mapping(b => c))`.
    pub fn mapping_depth(&self) -> usize {
        match &self.kind {
            IRTypeKind::Mapping { value, .. } => 1 + value.mapping_depth(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRParam {
    pub name: String,
    pub ty: IRType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRReturn {
    pub name: Option<String>,
    pub ty: IRType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRStateVariable {
    pub name: String,
    pub ty: IRType,
    pub visibility: Visibility,
    pub constant: bool,
    pub immutable: bool,
    pub initializer: Option<Expr>,
    /// Contract that declared the variable.
    pub origin: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRFunction {
    pub name: String,
    /// Unique within the contract; overloads are disambiguated as `name_<arity>`.
    pub ident: String,
    pub kind: FunctionKind,
    pub visibility: Visibility,
    pub mutability: Mutability,
    pub params: Vec<IRParam>,
    pub returns: Vec<IRReturn>,
    pub modifiers: Vec<ModifierInvocation>,
    pub body: Vec<Stmt>,
    pub has_body: bool,
    pub origin: String,
    pub is_virtual: bool,
    /// Generated by the builder (public getters, preserved `super` targets).
    pub synthetic: bool,
    pub line: usize,
}

impl IRFunction {
    pub fn is_view(&self) -> bool {
        matches!(self.mutability, Mutability::View | Mutability::Pure)
    }

    pub fn is_externally_callable(&self) -> bool {
        matches!(self.visibility, Visibility::Public | Visibility::External)
    }

    pub fn is_initializer(&self) -> bool {
        self.kind == FunctionKind::Constructor
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRModifier {
    pub name: String,
    pub params: Vec<IRParam>,
    pub body: Vec<Stmt>,
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IREvent {
    pub name: String,
    pub fields: Vec<IRParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRError {
    pub name: String,
    pub params: Vec<IRParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRStruct {
    pub name: String,
    pub fields: Vec<IRParam>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IREnum {
    pub name: String,
    pub variants: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRConstant {
    pub name: String,
    pub ty: IRType,
    pub value: Expr,
    pub origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IRContract {
    pub name: String,
    pub kind: ContractKind,
    pub is_abstract: bool,
    /// Linearized ancestors, closest first.
    pub bases: Vec<String>,
    pub state_vars: Vec<IRStateVariable>,
    pub functions: Vec<IRFunction>,
    pub modifiers: Vec<IRModifier>,
    pub events: Vec<IREvent>,
    pub errors: Vec<IRError>,
    pub structs: Vec<IRStruct>,
    pub enums: Vec<IREnum>,
    pub constants: Vec<IRConstant>,
    /// Constructors of the whole hierarchy concatenated base-to-derived.
    pub initializer: Option<IRFunction>,
    pub using_for: Vec<UsingFor>,
    pub source_file: String,
}

impl IRContract {
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
            constants: Vec::new(),
            initializer: None,
            using_for: Vec::new(),
            source_file: String::new(),
        }
    }

    pub fn is_library(&self) -> bool {
        self.kind == ContractKind::Library
    }

    pub fn state_var(&self, name: &str) -> Option<&IRStateVariable> {
        self.state_vars.iter().find(|v| v.name == name)
    }

    pub fn function(&self, ident: &str) -> Option<&IRFunction> {
        self.functions.iter().find(|f| f.ident == ident)
    }

    pub fn functions_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a IRFunction> {
        self.functions.iter().filter(move |f| f.name == name)
    }

    /// Resolves a call by name and argument count to a function identifier.
    pub fn resolve_call(&self, name: &str, arity: usize) -> Option<&IRFunction> {
        let mut candidates = self.functions.iter().filter(|f| f.name == name);
        let first = candidates.next()?;
        if first.arity() == arity {
            return Some(first);
        }
        candidates
            .find(|f| f.arity() == arity)
            .or(Some(first))
    }

    pub fn modifier(&self, name: &str) -> Option<&IRModifier> {
        self.modifiers.iter().find(|m| m.name == name)
    }

    pub fn event(&self, name: &str) -> Option<&IREvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn constant(&self, name: &str) -> Option<&IRConstant> {
        self.constants.iter().find(|c| c.name == name)
    }

    pub fn struct_def(&self, name: &str) -> Option<&IRStruct> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&IREnum> {
        self.enums.iter().find(|e| e.name == name)
    }

    /// Every function body including the initializer, in declaration order.
    pub fn all_functions(&self) -> impl Iterator<Item = &IRFunction> {
        self.initializer.iter().chain(self.functions.iter())
    }
}
