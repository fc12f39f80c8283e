//! Type declarations.
//!
//! Three kinds of user types exist: primitives with a declared base kind,
//! unions of other types, and records of named, typed fields.
//! The predefined types `number` and `symbol` are not declared; they are
//! always present in the derived [TypeEnv](crate::analysis::typing::TypeEnv).

use serde::{Deserialize, Serialize};

use crate::reports::SrcLocation;

/// The base kind of a primitive type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Number,
    Symbol,
}

/// A field of a record type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub loc: SrcLocation,
}

/// A user type declaration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDecl {
    Primitive {
        name: String,
        kind: PrimitiveKind,
        #[serde(default)]
        loc: SrcLocation,
    },
    Union {
        name: String,
        members: Vec<String>,
        #[serde(default)]
        loc: SrcLocation,
    },
    Record {
        name: String,
        fields: Vec<RecordField>,
        #[serde(default)]
        loc: SrcLocation,
    },
}

impl TypeDecl {
    pub fn name(&self) -> &str {
        match self {
            TypeDecl::Primitive { name, .. }
            | TypeDecl::Union { name, .. }
            | TypeDecl::Record { name, .. } => name,
        }
    }

    pub fn loc(&self) -> &SrcLocation {
        match self {
            TypeDecl::Primitive { loc, .. }
            | TypeDecl::Union { loc, .. }
            | TypeDecl::Record { loc, .. } => loc,
        }
    }
}

impl std::fmt::Display for TypeDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeDecl::Primitive { name, kind, .. } => match kind {
                PrimitiveKind::Number => write!(f, ".number_type {name}"),
                PrimitiveKind::Symbol => write!(f, ".symbol_type {name}"),
            },
            TypeDecl::Union { name, members, .. } => {
                write!(f, ".type {name} = {}", members.join(" | "))
            }
            TypeDecl::Record { name, fields, .. } => {
                write!(f, ".type {name} = [")?;
                for (index, field) in fields.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.type_name)?;
                }
                write!(f, "]")
            }
        }
    }
}
