/*!
The program database.

The program is the sole owner of all types, relations and clauses.
Clauses are stored in a slot map and referenced by [ClauseKey]; each
relation holds the keys of its defining clauses.
Clauses and I/O directives arriving from the frontend that name a relation
not (yet) declared are kept aside as orphans for the semantic checker to
report.

Iteration over clauses is deterministic: relations in name order, clauses in
definition order within each relation.
*/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::ast::{
    Attribute, Clause, IoDirective, Relation, RelationFlags, RelationName, TypeDecl,
};
use crate::reports::SrcLocation;
use crate::types::err::{self};

slotmap::new_key_type! {
    /// The key of a clause in the program's clause store.
    pub struct ClauseKey;
}

/// A `.pragma key value` directive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pragma {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub loc: SrcLocation,
}

/// A Datalog program.
#[derive(Clone, Debug, Default)]
pub struct Program {
    types: Vec<TypeDecl>,
    relations: BTreeMap<RelationName, Relation>,
    clauses: SlotMap<ClauseKey, Clause>,

    /// Clauses whose head names no declared relation.
    orphan_clauses: Vec<Clause>,

    /// Directives naming no declared relation.
    orphan_directives: Vec<IoDirective>,

    pub pragmas: Vec<Pragma>,
}

impl Program {
    pub fn new() -> Self {
        Program::default()
    }

    // -- types --

    pub fn add_type(&mut self, decl: TypeDecl) -> Result<(), err::BuildError> {
        if self.types.iter().any(|t| t.name() == decl.name()) {
            return Err(err::BuildError::DuplicateType(decl.name().to_string()));
        }
        self.types.push(decl);
        Ok(())
    }

    pub fn types(&self) -> &[TypeDecl] {
        &self.types
    }

    pub fn get_type(&self, name: &str) -> Option<&TypeDecl> {
        self.types.iter().find(|t| t.name() == name)
    }

    // -- relations --

    pub fn add_relation(&mut self, relation: Relation) -> Result<(), err::BuildError> {
        if self.relations.contains_key(&relation.name) {
            return Err(err::BuildError::DuplicateRelation(relation.name.clone()));
        }
        self.relations.insert(relation.name.clone(), relation);
        Ok(())
    }

    pub fn relation(&self, name: &RelationName) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relation_mut(&mut self, name: &RelationName) -> Option<&mut Relation> {
        self.relations.get_mut(name)
    }

    pub fn relations(&self) -> impl Iterator<Item = &Relation> {
        self.relations.values()
    }

    pub fn relation_names(&self) -> Vec<RelationName> {
        self.relations.keys().cloned().collect()
    }

    /// Removes a relation together with its clauses.
    pub fn remove_relation(&mut self, name: &RelationName) {
        if let Some(relation) = self.relations.remove(name) {
            for key in relation.clauses {
                self.clauses.remove(key);
            }
        }
    }

    // -- clauses --

    /// Adds a clause, binding it to the relation its head names.
    ///
    /// Clauses naming no declared relation are kept as orphans and reported
    /// by the semantic checker.
    pub fn add_clause(&mut self, clause: Clause) -> Option<ClauseKey> {
        let name = clause.head.name.clone();
        match self.relations.get_mut(&name) {
            Some(relation) => {
                let key = self.clauses.insert(clause);
                relation.clauses.push(key);
                Some(key)
            }
            None => {
                self.orphan_clauses.push(clause);
                None
            }
        }
    }

    pub fn clause(&self, key: ClauseKey) -> &Clause {
        &self.clauses[key]
    }

    pub fn clause_mut(&mut self, key: ClauseKey) -> &mut Clause {
        &mut self.clauses[key]
    }

    /// Removes a clause, unlinking it from whichever relation holds it.
    pub fn remove_clause(&mut self, key: ClauseKey) -> Option<Clause> {
        let clause = self.clauses.remove(key)?;
        for relation in self.relations.values_mut() {
            relation.clauses.retain(|&held| held != key);
        }
        Some(clause)
    }

    /// Replaces the clause stored under the given key.
    pub fn replace_clause(&mut self, key: ClauseKey, clause: Clause) {
        self.clauses[key] = clause;
    }

    /// The keys of the clauses of the named relation, in definition order.
    pub fn clauses_of(&self, name: &RelationName) -> Vec<ClauseKey> {
        match self.relations.get(name) {
            Some(relation) => relation.clauses.clone(),
            None => Vec::default(),
        }
    }

    /// All clause keys: relations in name order, clauses in definition order.
    pub fn clause_keys(&self) -> Vec<ClauseKey> {
        let mut keys = Vec::with_capacity(self.clauses.len());
        for relation in self.relations.values() {
            keys.extend_from_slice(&relation.clauses);
        }
        keys
    }

    pub fn clause_count(&self) -> usize {
        self.clauses.len()
    }

    pub fn orphan_clauses(&self) -> &[Clause] {
        &self.orphan_clauses
    }

    // -- directives --

    /// Adds an I/O directive, binding it to the relation it names.
    pub fn add_directive(&mut self, directive: IoDirective) {
        match self.relations.get_mut(&directive.relation) {
            Some(relation) => relation.io.push(directive),
            None => self.orphan_directives.push(directive),
        }
    }

    pub fn orphan_directives(&self) -> &[IoDirective] {
        &self.orphan_directives
    }
}

// Structural equality over the surface form, independent of clause keys.
impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        if self.types != other.types || self.pragmas != other.pragmas {
            return false;
        }
        if self.relations.len() != other.relations.len() {
            return false;
        }
        for (name, relation) in &self.relations {
            let Some(counterpart) = other.relations.get(name) else {
                return false;
            };
            if relation.attributes != counterpart.attributes
                || relation.flags != counterpart.flags
                || relation.io != counterpart.io
            {
                return false;
            }
            let ours: Vec<&Clause> = relation.clauses.iter().map(|&k| &self.clauses[k]).collect();
            let theirs: Vec<&Clause> = counterpart
                .clauses
                .iter()
                .map(|&k| &other.clauses[k])
                .collect();
            if ours != theirs {
                return false;
            }
        }
        self.orphan_clauses == other.orphan_clauses
    }
}

impl Eq for Program {}

impl std::fmt::Display for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for decl in &self.types {
            writeln!(f, "{decl}")?;
        }
        for relation in self.relations.values() {
            writeln!(f, "{relation}")?;
            for &key in &relation.clauses {
                writeln!(f, "{}", self.clauses[key])?;
            }
        }
        for clause in &self.orphan_clauses {
            writeln!(f, "{clause}")?;
        }
        for pragma in &self.pragmas {
            writeln!(f, ".pragma {} \"{}\"", pragma.key, pragma.value)?;
        }
        Ok(())
    }
}

// -- serde --
//
// The wire form embeds clauses in their relations; keys are rebuilt on read.

#[derive(Serialize, Deserialize)]
struct RelationData {
    name: RelationName,
    #[serde(default)]
    attributes: Vec<Attribute>,
    #[serde(default)]
    flags: RelationFlags,
    #[serde(default)]
    io: Vec<IoDirective>,
    #[serde(default)]
    clauses: Vec<Clause>,
    #[serde(default)]
    loc: SrcLocation,
}

#[derive(Serialize, Deserialize)]
struct ProgramData {
    #[serde(default)]
    types: Vec<TypeDecl>,
    #[serde(default)]
    relations: Vec<RelationData>,
    #[serde(default)]
    clauses: Vec<Clause>,
    #[serde(default)]
    directives: Vec<IoDirective>,
    #[serde(default)]
    pragmas: Vec<Pragma>,
}

impl Serialize for Program {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let relations = self
            .relations
            .values()
            .map(|relation| RelationData {
                name: relation.name.clone(),
                attributes: relation.attributes.clone(),
                flags: relation.flags,
                io: relation.io.clone(),
                clauses: relation
                    .clauses
                    .iter()
                    .map(|&key| self.clauses[key].clone())
                    .collect(),
                loc: relation.loc.clone(),
            })
            .collect();
        ProgramData {
            types: self.types.clone(),
            relations,
            clauses: self.orphan_clauses.clone(),
            directives: self.orphan_directives.clone(),
            pragmas: self.pragmas.clone(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Program {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = ProgramData::deserialize(deserializer)?;
        let mut program = Program::new();
        program.types = data.types;
        program.pragmas = data.pragmas;
        let mut pending_clauses = Vec::default();
        for relation_data in data.relations {
            let relation = Relation {
                name: relation_data.name,
                attributes: relation_data.attributes,
                flags: relation_data.flags,
                io: Vec::default(),
                loc: relation_data.loc,
                clauses: Vec::default(),
            };
            let io = relation_data.io;
            let name = relation.name.clone();
            // tolerate duplicate declarations in the wire form
            let _ = program.add_relation(relation);
            for directive in io {
                let mut directive = directive;
                directive.relation = name.clone();
                program.add_directive(directive);
            }
            pending_clauses.extend(relation_data.clauses);
        }
        for clause in pending_clauses {
            program.add_clause(clause);
        }
        for clause in data.clauses {
            program.add_clause(clause);
        }
        for directive in data.directives {
            program.add_directive(directive);
        }
        Ok(program)
    }
}
