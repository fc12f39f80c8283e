/*!
Relation declarations.

A relation is named, has a fixed arity of typed attributes, a set of
qualifier flags, the I/O directives attached to it, and owns the keys of the
clauses defining it.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{ClauseKey, RelationName};
use crate::reports::SrcLocation;

/// A typed attribute of a relation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub type_name: String,
    #[serde(default)]
    pub loc: SrcLocation,
}

impl Attribute {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Attribute {
            name: name.into(),
            type_name: type_name.into(),
            loc: SrcLocation::default(),
        }
    }
}

/// Qualifier flags of a relation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationFlags {
    /// Facts are read from an external source.
    pub input: bool,

    /// The computed tuples are written out.
    pub output: bool,

    /// The size of the computed relation is printed.
    pub printsize: bool,

    /// Facts originate from the data store rather than the source text.
    pub data: bool,

    /// The relation is expanded at its call sites.
    pub inline: bool,

    /// Storage hint: b-tree representation.
    pub btree: bool,

    /// Storage hint: brie representation.
    pub brie: bool,

    /// Storage hint: equivalence relation representation.
    pub eqrel: bool,

    /// Storage hint: hash set representation.
    pub hashset: bool,
}

impl RelationFlags {
    /// True when the relation's contents are demanded: written out or sized.
    pub fn computed(&self) -> bool {
        self.output || self.printsize
    }
}

/// The direction of an I/O directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum IoKind {
    Input,
    Output,
}

/// An I/O directive: a direction plus arbitrary `key=value` pairs which are
/// opaque to the middle end and forwarded to the backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoDirective {
    pub kind: IoKind,
    pub relation: RelationName,
    #[serde(default)]
    pub map: BTreeMap<String, String>,
    #[serde(default)]
    pub loc: SrcLocation,
}

impl IoDirective {
    pub fn new(kind: IoKind, relation: impl Into<RelationName>) -> Self {
        IoDirective {
            kind,
            relation: relation.into(),
            map: BTreeMap::default(),
            loc: SrcLocation::default(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.map.insert(key.into(), value.into());
        self
    }
}

/// A declared relation.
#[derive(Clone, Debug)]
pub struct Relation {
    pub name: RelationName,
    pub attributes: Vec<Attribute>,
    pub flags: RelationFlags,
    pub io: Vec<IoDirective>,
    pub loc: SrcLocation,

    /// Keys of the clauses defining the relation, owned by the program.
    pub(super) clauses: Vec<ClauseKey>,
}

impl Relation {
    pub fn new(name: impl Into<RelationName>) -> Self {
        Relation {
            name: name.into(),
            attributes: Vec::default(),
            flags: RelationFlags::default(),
            io: Vec::default(),
            loc: SrcLocation::default(),
            clauses: Vec::default(),
        }
    }

    /// Appends an attribute; chainable for programmatic construction.
    pub fn attribute(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.attributes.push(Attribute::new(name, type_name));
        self
    }

    pub fn input(mut self) -> Self {
        self.flags.input = true;
        self
    }

    pub fn output(mut self) -> Self {
        self.flags.output = true;
        self
    }

    pub fn printsize(mut self) -> Self {
        self.flags.printsize = true;
        self
    }

    pub fn inline(mut self) -> Self {
        self.flags.inline = true;
        self
    }

    pub fn eqrel(mut self) -> Self {
        self.flags.eqrel = true;
        self
    }

    pub fn arity(&self) -> usize {
        self.attributes.len()
    }

    /// Keys of the clauses defining the relation, in definition order.
    pub fn clause_keys(&self) -> &[ClauseKey] {
        &self.clauses
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, ".decl {}(", self.name)?;
        for (index, attribute) in self.attributes.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", attribute.name, attribute.type_name)?;
        }
        write!(f, ")")?;
        let RelationFlags {
            input,
            output,
            printsize,
            data,
            inline,
            btree,
            brie,
            eqrel,
            hashset,
        } = self.flags;
        for (set, word) in [
            (input, "input"),
            (output, "output"),
            (printsize, "printsize"),
            (data, "data"),
            (inline, "inline"),
            (btree, "btree"),
            (brie, "brie"),
            (eqrel, "eqrel"),
            (hashset, "hashset"),
        ] {
            if set {
                write!(f, " {word}")?;
            }
        }
        Ok(())
    }
}
