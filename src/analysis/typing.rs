/*!
The type environment and per-clause type analysis.

# The environment

The environment is derived from the program's type declarations.
`number` and `symbol` are predefined.
Every type has a kind --- number, symbol or record --- and the subtype
relation is generated by reflexivity, transitive union membership, and every
non-record type lying below the builtin of its kind.

# The lattice

A [TypeSet] is either the set of all types (the bottom of the lattice,
carrying no information) or a finite set of named types.
The meet intersects along the subtype relation --- the pairwise greatest
common subtypes --- and narrows toward a specific set; the join widens to the
least common supertypes and is used for the upper bounds contributed by
negated atoms.

# The per-clause analysis

Constraint variables are argument occurrences, with all occurrences of a
named variable unified. Seeded constraints follow the declaration sites:
attribute types bound positive atom arguments from above and negated atom
arguments from below (applied once, so negation participates loosely in
joins); constants, counters and aggregators lie below their builtin kinds;
functor signatures constrain results and operands; record initializers are
linked component-wise with their field types in both directions; equality
constraints link both sides. Solved by Kleene iteration to a fixpoint.
*/

use std::collections::{BTreeMap, BTreeSet};

use crate::ast::{Argument, Clause, Literal, PrimitiveKind, Program, TypeDecl};

/// The builtin number type.
pub const NUMBER: &str = "number";

/// The builtin symbol type.
pub const SYMBOL: &str = "symbol";

/// The kind of a type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeKind {
    Number,
    Symbol,
    Record,
}

#[derive(Clone, Debug)]
enum Entry {
    Primitive(TypeKind),
    Union(Vec<String>),
    Record(Vec<(String, String)>),
}

/// The type environment of a program.
#[derive(Clone, Debug)]
pub struct TypeEnv {
    entries: BTreeMap<String, Entry>,
}

impl TypeEnv {
    /// Derives the environment from the program's type declarations.
    ///
    /// Construction is two-phase --- create all names, then link members and
    /// fields --- so declarations may reference each other in any order.
    /// Unresolvable references are dropped here and reported by the checker.
    pub fn build(program: &Program) -> Self {
        let mut entries = BTreeMap::default();
        entries.insert(NUMBER.to_string(), Entry::Primitive(TypeKind::Number));
        entries.insert(SYMBOL.to_string(), Entry::Primitive(TypeKind::Symbol));

        for decl in program.types() {
            if entries.contains_key(decl.name()) {
                continue;
            }
            let entry = match decl {
                TypeDecl::Primitive { kind, .. } => Entry::Primitive(match kind {
                    PrimitiveKind::Number => TypeKind::Number,
                    PrimitiveKind::Symbol => TypeKind::Symbol,
                }),
                TypeDecl::Union { .. } => Entry::Union(Vec::default()),
                TypeDecl::Record { .. } => Entry::Record(Vec::default()),
            };
            entries.insert(decl.name().to_string(), entry);
        }

        let known: BTreeSet<String> = entries.keys().cloned().collect();
        for decl in program.types() {
            match decl {
                TypeDecl::Union { name, members, .. } => {
                    let linked: Vec<String> = members
                        .iter()
                        .filter(|member| known.contains(*member))
                        .cloned()
                        .collect();
                    if let Some(Entry::Union(stored)) = entries.get_mut(name) {
                        *stored = linked;
                    }
                }
                TypeDecl::Record { name, fields, .. } => {
                    let linked: Vec<(String, String)> = fields
                        .iter()
                        .filter(|field| known.contains(&field.type_name))
                        .map(|field| (field.name.clone(), field.type_name.clone()))
                        .collect();
                    if let Some(Entry::Record(stored)) = entries.get_mut(name) {
                        *stored = linked;
                    }
                }
                TypeDecl::Primitive { .. } => {}
            }
        }

        TypeEnv { entries }
    }

    pub fn is_type(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// The kind of the named type, unions resolving through their members.
    pub fn kind_of(&self, name: &str) -> Option<TypeKind> {
        self.kind_of_guarded(name, &mut BTreeSet::default())
    }

    fn kind_of_guarded(&self, name: &str, visiting: &mut BTreeSet<String>) -> Option<TypeKind> {
        if !visiting.insert(name.to_string()) {
            return None;
        }
        match self.entries.get(name)? {
            Entry::Primitive(kind) => Some(*kind),
            Entry::Record(_) => Some(TypeKind::Record),
            Entry::Union(members) => members
                .iter()
                .find_map(|member| self.kind_of_guarded(member, visiting)),
        }
    }

    /// The fields of the named record type.
    pub fn record_fields(&self, name: &str) -> Option<&[(String, String)]> {
        match self.entries.get(name)? {
            Entry::Record(fields) => Some(fields),
            _ => None,
        }
    }

    /// Whether `sub` is a subtype of `sup`.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        if sub == sup {
            return true;
        }
        match sup {
            NUMBER => return self.kind_of(sub) == Some(TypeKind::Number),
            SYMBOL => return self.kind_of(sub) == Some(TypeKind::Symbol),
            _ => {}
        }
        self.union_contains(sup, sub, &mut BTreeSet::default())
    }

    fn union_contains(&self, sup: &str, sub: &str, visiting: &mut BTreeSet<String>) -> bool {
        if !visiting.insert(sup.to_string()) {
            return false;
        }
        match self.entries.get(sup) {
            Some(Entry::Union(members)) => members
                .iter()
                .any(|member| member == sub || self.union_contains(member, sub, visiting)),
            _ => false,
        }
    }

    // The named type together with everything transitively below it via
    // union membership.
    fn descendants(&self, name: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::default();
        let mut stack = vec![name.to_string()];
        while let Some(current) = stack.pop() {
            if !result.insert(current.clone()) {
                continue;
            }
            if let Some(Entry::Union(members)) = self.entries.get(&current) {
                stack.extend(members.iter().cloned());
            }
        }
        result
    }

    /// The greatest common subtypes of a pair of types.
    pub fn greatest_common_subtypes(&self, a: &str, b: &str) -> BTreeSet<String> {
        if self.is_subtype(a, b) {
            return BTreeSet::from([a.to_string()]);
        }
        if self.is_subtype(b, a) {
            return BTreeSet::from([b.to_string()]);
        }
        let common: BTreeSet<String> = self
            .descendants(a)
            .intersection(&self.descendants(b))
            .cloned()
            .collect();
        // keep only maximal elements
        common
            .iter()
            .filter(|t| {
                !common
                    .iter()
                    .any(|other| *t != other && self.is_subtype(t, other))
            })
            .cloned()
            .collect()
    }

    /// The least common supertypes of a pair of types.
    pub fn least_common_supertypes(&self, a: &str, b: &str) -> BTreeSet<String> {
        if self.is_subtype(a, b) {
            return BTreeSet::from([b.to_string()]);
        }
        if self.is_subtype(b, a) {
            return BTreeSet::from([a.to_string()]);
        }
        match (self.kind_of(a), self.kind_of(b)) {
            (Some(TypeKind::Number), Some(TypeKind::Number)) => {
                BTreeSet::from([NUMBER.to_string()])
            }
            (Some(TypeKind::Symbol), Some(TypeKind::Symbol)) => {
                BTreeSet::from([SYMBOL.to_string()])
            }
            _ => BTreeSet::default(),
        }
    }

    /// The meet of two type sets.
    pub fn meet(&self, a: &TypeSet, b: &TypeSet) -> TypeSet {
        match (a, b) {
            (TypeSet::All, other) | (other, TypeSet::All) => other.clone(),
            (TypeSet::Of(left), TypeSet::Of(right)) => {
                let mut result = BTreeSet::default();
                for l in left {
                    for r in right {
                        result.extend(self.greatest_common_subtypes(l, r));
                    }
                }
                TypeSet::Of(result)
            }
        }
    }

    /// The meet of a type set with a single type.
    pub fn meet_type(&self, a: &TypeSet, ty: &str) -> TypeSet {
        match a {
            TypeSet::All => TypeSet::single(ty),
            TypeSet::Of(members) => {
                let mut result = BTreeSet::default();
                for member in members {
                    result.extend(self.greatest_common_subtypes(member, ty));
                }
                TypeSet::Of(result)
            }
        }
    }

    /// The join of a type set with a single type.
    pub fn join_type(&self, a: &TypeSet, ty: &str) -> TypeSet {
        match a {
            TypeSet::All => TypeSet::single(ty),
            TypeSet::Of(members) => {
                let mut result = BTreeSet::default();
                for member in members {
                    result.extend(self.least_common_supertypes(member, ty));
                }
                TypeSet::Of(result)
            }
        }
    }

    /// True when the set is resolved and entirely of the given kind.
    pub fn set_has_kind(&self, set: &TypeSet, kind: TypeKind) -> bool {
        match set {
            TypeSet::All => false,
            TypeSet::Of(members) => {
                !members.is_empty()
                    && members.iter().all(|member| self.kind_of(member) == Some(kind))
            }
        }
    }
}

/// A set in the type lattice: everything, or a finite set of named types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeSet {
    /// The set of all types; the bottom of the lattice.
    All,
    Of(BTreeSet<String>),
}

impl TypeSet {
    pub fn single(name: &str) -> Self {
        TypeSet::Of(BTreeSet::from([name.to_string()]))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, TypeSet::All)
    }

    /// An empty solution: no type works for the argument.
    pub fn is_empty(&self) -> bool {
        matches!(self, TypeSet::Of(members) if members.is_empty())
    }

    pub fn contains(&self, name: &str) -> bool {
        match self {
            TypeSet::All => true,
            TypeSet::Of(members) => members.contains(name),
        }
    }
}

impl std::fmt::Display for TypeSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeSet::All => write!(f, "{{*}}"),
            TypeSet::Of(members) => {
                write!(f, "{{")?;
                for (index, member) in members.iter().enumerate() {
                    if index > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{member}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

// -- the per-clause constraint system --

enum Rule {
    /// values[sub] := meet(values[sub], values[sup])
    SubVar { sub: usize, sup: usize },
    /// values[slot] := meet(values[slot], {ty})
    SubType { slot: usize, ty: String },
    /// values[slot] := join(values[slot], {ty}), applied once
    SupTypeOnce { slot: usize, ty: String },
    /// component link between a record and one of its elements
    Component { elem: usize, rec: usize, index: usize },
}

struct Builder<'a> {
    env: &'a TypeEnv,
    program: &'a Program,
    var_slots: BTreeMap<String, usize>,
    slot_count: usize,
    occurrence_slots: Vec<usize>,
    rules: Vec<Rule>,
}

impl<'a> Builder<'a> {
    fn fresh_slot(&mut self) -> usize {
        let slot = self.slot_count;
        self.slot_count += 1;
        slot
    }

    fn variable_slot(&mut self, name: &str) -> usize {
        match self.var_slots.get(name) {
            Some(&slot) => slot,
            None => {
                let slot = self.fresh_slot();
                self.var_slots.insert(name.to_string(), slot);
                slot
            }
        }
    }

    fn index_argument(&mut self, arg: &Argument) -> usize {
        let slot = match arg {
            Argument::Variable { name, .. } => self.variable_slot(name),
            _ => self.fresh_slot(),
        };
        self.occurrence_slots.push(slot);

        match arg {
            Argument::Number { .. } | Argument::Counter { .. } => self.rules.push(Rule::SubType {
                slot,
                ty: NUMBER.to_string(),
            }),
            Argument::Text { .. } => self.rules.push(Rule::SubType {
                slot,
                ty: SYMBOL.to_string(),
            }),
            Argument::Unary { op, arg, .. } => {
                self.rules.push(Rule::SubType {
                    slot,
                    ty: kind_name(op.yields_number()),
                });
                let operand = self.index_argument(arg);
                self.rules.push(Rule::SubType {
                    slot: operand,
                    ty: kind_name(op.accepts_number()),
                });
            }
            Argument::Binary { op, lhs, rhs, .. } => {
                self.rules.push(Rule::SubType {
                    slot,
                    ty: kind_name(op.yields_number()),
                });
                let lhs = self.index_argument(lhs);
                self.rules.push(Rule::SubType {
                    slot: lhs,
                    ty: kind_name(op.accepts_number(0)),
                });
                let rhs = self.index_argument(rhs);
                self.rules.push(Rule::SubType {
                    slot: rhs,
                    ty: kind_name(op.accepts_number(1)),
                });
            }
            Argument::Ternary {
                op,
                first,
                second,
                third,
                ..
            } => {
                self.rules.push(Rule::SubType {
                    slot,
                    ty: kind_name(op.yields_number()),
                });
                for (index, operand) in [first, second, third].into_iter().enumerate() {
                    let operand = self.index_argument(operand);
                    self.rules.push(Rule::SubType {
                        slot: operand,
                        ty: kind_name(op.accepts_number(index)),
                    });
                }
            }
            Argument::Record { args, .. } => {
                for (index, arg) in args.iter().enumerate() {
                    let elem = self.index_argument(arg);
                    self.rules.push(Rule::Component {
                        elem,
                        rec: slot,
                        index,
                    });
                }
            }
            Argument::Aggregate { target, body, .. } => {
                self.rules.push(Rule::SubType {
                    slot,
                    ty: NUMBER.to_string(),
                });
                if let Some(target) = target {
                    let target = self.index_argument(target);
                    self.rules.push(Rule::SubType {
                        slot: target,
                        ty: NUMBER.to_string(),
                    });
                }
                for literal in body {
                    self.index_literal(literal);
                }
            }
            _ => {}
        }
        slot
    }

    fn index_atom(&mut self, atom: &crate::ast::Atom, negated: bool) {
        let attributes = self
            .program
            .relation(&atom.name)
            .map(|relation| relation.attributes.clone());
        for (index, arg) in atom.args.iter().enumerate() {
            let slot = self.index_argument(arg);
            let Some(attributes) = &attributes else {
                continue;
            };
            if attributes.len() != atom.args.len() {
                continue;
            }
            let ty = &attributes[index].type_name;
            if self.env.is_type(ty) {
                if negated {
                    self.rules.push(Rule::SupTypeOnce {
                        slot,
                        ty: ty.clone(),
                    });
                } else {
                    self.rules.push(Rule::SubType {
                        slot,
                        ty: ty.clone(),
                    });
                }
            }
        }
    }

    fn index_literal(&mut self, literal: &Literal) {
        match literal {
            Literal::Atom(atom) => self.index_atom(atom, false),
            Literal::Negation { atom, .. } => self.index_atom(atom, true),
            Literal::Constraint { lhs, rhs, .. } => {
                let lhs = self.index_argument(lhs);
                let rhs = self.index_argument(rhs);
                self.rules.push(Rule::SubVar { sub: lhs, sup: rhs });
                self.rules.push(Rule::SubVar { sub: rhs, sup: lhs });
            }
            Literal::Bool { .. } => {}
        }
    }
}

fn kind_name(number: bool) -> String {
    if number { NUMBER.to_string() } else { SYMBOL.to_string() }
}

/// The solved types of a clause, per argument occurrence.
#[derive(Clone, Debug)]
pub struct TypeSolution {
    per_occurrence: Vec<TypeSet>,
}

impl TypeSolution {
    pub fn occurrence(&self, index: usize) -> &TypeSet {
        &self.per_occurrence[index]
    }

    pub fn occurrences(&self) -> &[TypeSet] {
        &self.per_occurrence
    }
}

/// Runs the analysis on the given clause.
pub fn analyse_types(env: &TypeEnv, clause: &Clause, program: &Program) -> TypeSolution {
    let mut builder = Builder {
        env,
        program,
        var_slots: BTreeMap::default(),
        slot_count: 0,
        occurrence_slots: Vec::default(),
        rules: Vec::default(),
    };

    builder.index_atom(&clause.head, false);
    for literal in &clause.body {
        builder.index_literal(literal);
    }

    let mut values = vec![TypeSet::All; builder.slot_count];
    let mut fired = vec![false; builder.rules.len()];

    let mut changed = true;
    while changed {
        changed = false;
        for (index, rule) in builder.rules.iter().enumerate() {
            match rule {
                Rule::SubVar { sub, sup } => {
                    let updated = env.meet(&values[*sub], &values[*sup]);
                    if updated != values[*sub] {
                        values[*sub] = updated;
                        changed = true;
                    }
                }
                Rule::SubType { slot, ty } => {
                    let updated = env.meet_type(&values[*slot], ty);
                    if updated != values[*slot] {
                        values[*slot] = updated;
                        changed = true;
                    }
                }
                Rule::SupTypeOnce { slot, ty } => {
                    if fired[index] {
                        continue;
                    }
                    fired[index] = true;
                    let updated = env.join_type(&values[*slot], ty);
                    if updated != values[*slot] {
                        values[*slot] = updated;
                        changed = true;
                    }
                }
                Rule::Component { elem, rec, index } => {
                    // until the record variable is constrained, nothing is known
                    let TypeSet::Of(candidates) = values[*rec].clone() else {
                        continue;
                    };
                    let mut elem_types = BTreeSet::default();
                    let mut rec_types = BTreeSet::default();
                    for candidate in &candidates {
                        let Some(fields) = env.record_fields(candidate) else {
                            continue;
                        };
                        let Some((_, field_type)) = fields.get(*index) else {
                            continue;
                        };
                        rec_types.insert(candidate.clone());
                        elem_types.insert(field_type.clone());
                    }
                    let narrowed_elem = env.meet(&values[*elem], &TypeSet::Of(elem_types));
                    let narrowed_rec = TypeSet::Of(rec_types);
                    if narrowed_rec != values[*rec] {
                        values[*rec] = narrowed_rec;
                        changed = true;
                    }
                    if narrowed_elem != values[*elem] {
                        values[*elem] = narrowed_elem;
                        changed = true;
                    }
                }
            }
        }
    }

    TypeSolution {
        per_occurrence: builder
            .occurrence_slots
            .iter()
            .map(|&slot| values[slot].clone())
            .collect(),
    }
}
