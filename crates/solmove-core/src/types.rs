use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer widths available on the target, in ascending order. Signed and unsigned share the
/// same table.
pub const INTEGER_WIDTHS: [u16; 6] = [8, 16, 32, 64, 128, 256];

/// Smallest target width that can hold `bits` without truncation.
pub fn nearest_width(bits: u16) -> Option<u16> {
    INTEGER_WIDTHS.iter().copied().find(|w| *w >= bits)
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MoveType {
    Bool,
    Address,
    Signer,
    Uint(u16),
    Int(u16),
    Vector(Box<MoveType>),
    /// `std::string::String`
    String,
    /// `aptos_std::table::Table<K, V>`
    Table(Box<MoveType>, Box<MoveType>),
    /// `aptos_framework::aggregator_v2::Aggregator<T>`
    Aggregator(Box<MoveType>),
    Struct {
        module: Option<String>,
        name: String,
        type_args: Vec<MoveType>,
    },
    Ref {
        mutable: bool,
        inner: Box<MoveType>,
    },
    Tuple(Vec<MoveType>),
    Unit,
}

impl MoveType {
    pub fn u8() -> Self {
        MoveType::Uint(8)
    }

    pub fn u64() -> Self {
        MoveType::Uint(64)
    }

    pub fn u128() -> Self {
        MoveType::Uint(128)
    }

    pub fn u256() -> Self {
        MoveType::Uint(256)
    }

    pub fn bytes() -> Self {
        MoveType::Vector(Box::new(MoveType::u8()))
    }

    pub fn local_struct(name: impl Into<String>) -> Self {
        MoveType::Struct {
            module: None,
            name: name.into(),
            type_args: Vec::new(),
        }
    }

    pub fn reference(inner: MoveType, mutable: bool) -> Self {
        MoveType::Ref {
            mutable,
            inner: Box::new(inner),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, MoveType::Uint(_) | MoveType::Int(_))
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, MoveType::Int(_))
    }

    pub fn integer_width(&self) -> Option<u16> {
        match self {
            MoveType::Uint(w) | MoveType::Int(w) => Some(*w),
            _ => None,
        }
    }

    /// Strips any number of reference layers.
    pub fn dereferenced(&self) -> &MoveType {
        match self {
            MoveType::Ref { inner, .. } => inner.dereferenced(),
            other => other,
        }
    }

    pub fn has_copy(&self) -> bool {
        match self {
            MoveType::Table(_, _) | MoveType::Aggregator(_) | MoveType::Signer => false,
            MoveType::Vector(inner) => inner.has_copy(),
            MoveType::Tuple(items) => items.iter().all(|t| t.has_copy()),
            _ => true,
        }
    }

    /// Qualified `(module, member)` references this type needs imported.
    pub fn module_refs(&self) -> Vec<(String, String)> {
        let mut refs = Vec::new();
        self.collect_module_refs(&mut refs);
        refs
    }

    fn collect_module_refs(&self, refs: &mut Vec<(String, String)>) {
        match self {
            MoveType::String => refs.push(("string".to_string(), "String".to_string())),
            MoveType::Table(k, v) => {
                refs.push(("table".to_string(), "Table".to_string()));
                k.collect_module_refs(refs);
                v.collect_module_refs(refs);
            }
            MoveType::Aggregator(inner) => {
                refs.push(("aggregator_v2".to_string(), "Aggregator".to_string()));
                inner.collect_module_refs(refs);
            }
            MoveType::Vector(inner) => inner.collect_module_refs(refs),
            MoveType::Ref { inner, .. } => inner.collect_module_refs(refs),
            MoveType::Tuple(items) => items.iter().for_each(|t| t.collect_module_refs(refs)),
            MoveType::Struct {
                module, name, type_args, ..
            } => {
                if let Some(module) = module {
                    refs.push((module.clone(), name.clone()));
                }
                type_args.iter().for_each(|t| t.collect_module_refs(refs));
            }
            _ => {}
        }
    }
}

impl fmt::Display for MoveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MoveType::Bool => write!(f, "bool"),
            MoveType::Address => write!(f, "address"),
            MoveType::Signer => write!(f, "signer"),
            MoveType::Uint(bits) => write!(f, "u{}", bits),
            MoveType::Int(bits) => write!(f, "i{}", bits),
            MoveType::Vector(inner) => write!(f, "vector<{}>", inner),
            MoveType::String => write!(f, "String"),
            MoveType::Table(k, v) => write!(f, "Table<{}, {}>", k, v),
            MoveType::Aggregator(inner) => write!(f, "Aggregator<{}>", inner),
            MoveType::Struct {
                name, type_args, ..
            } => {
                if type_args.is_empty() {
                    write!(f, "{}", name)
                } else {
                    let args = type_args
                        .iter()
                        .map(|t| t.to_string())
                        .collect::<Vec<_>>()
                        .join(", ");
                    write!(f, "{}<{}>", name, args)
                }
            }
            MoveType::Ref { mutable, inner } => {
                if *mutable {
                    write!(f, "&mut {}", inner)
                } else {
                    write!(f, "&{}", inner)
                }
            }
            MoveType::Tuple(items) => {
                let items = items
                    .iter()
                    .map(|t| t.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "({})", items)
            }
            MoveType::Unit => write!(f, "()"),
        }
    }
}
