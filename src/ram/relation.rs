/*!
Machine-level relation records.

A [RamRelation] carries everything the backend needs to create, fill and
store a relation: the flattened name, attribute names and type qualifiers, a
symbol mask marking the attributes holding interned symbols, the storage
flags, and the resolved I/O directive sets.

Temporary relations --- the delta and new versions used by semi-naive
evaluation --- are marked `temp` and prefixed `@`.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A resolved set of I/O directives: `key=value` pairs with defaults applied.
pub type IoSpec = BTreeMap<String, String>;

/// A relation of the machine.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RamRelation {
    /// The flattened name; qualified source names join segments with `-`,
    /// temporaries carry an `@` prefix.
    pub name: String,

    pub arity: usize,

    #[serde(default)]
    pub attribute_names: Vec<String>,

    /// One qualifier per attribute: `n:<type>`, `s:<type>` or `r:<type>`.
    #[serde(default)]
    pub attribute_types: Vec<String>,

    /// True at positions holding interned symbols.
    #[serde(default)]
    pub symbol_mask: Vec<bool>,

    #[serde(default)]
    pub input: bool,
    #[serde(default)]
    pub computed: bool,
    #[serde(default)]
    pub output: bool,
    #[serde(default)]
    pub printsize: bool,
    #[serde(default)]
    pub data: bool,

    #[serde(default)]
    pub btree: bool,
    #[serde(default)]
    pub brie: bool,
    #[serde(default)]
    pub eqrel: bool,
    #[serde(default)]
    pub hashset: bool,

    /// Marks delta and new temporaries of the semi-naive loop.
    #[serde(default)]
    pub temp: bool,

    #[serde(default)]
    pub input_directives: IoSpec,

    #[serde(default)]
    pub output_directives: Vec<IoSpec>,
}

impl RamRelation {
    /// A bare relation, for temporaries and synthesized helpers.
    pub fn bare(name: impl Into<String>, arity: usize, temp: bool) -> Self {
        let mut name = name.into();
        if temp {
            name.insert(0, '@');
        }
        RamRelation {
            name,
            arity,
            temp,
            ..RamRelation::default()
        }
    }

    /// The attribute name at the given position, when known.
    pub fn attribute(&self, index: usize) -> Option<String> {
        self.attribute_names.get(index).cloned()
    }
}

impl std::fmt::Display for RamRelation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
