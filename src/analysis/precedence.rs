/*!
The precedence graph and everything scheduled on top of it.

Vertices are relations. An edge `b → a` exists when some clause defining `a`
mentions `b` in its body --- positively, negated, or within an aggregator ---
so edges point in dataflow direction, from producer to consumer.

On top of the graph:

- [RecursiveClauses] --- a clause is recursive iff its head relation is
  reachable from one of its body relations through the defining clauses of
  the program.
- [SccGraph] --- Tarjan's strongly connected components, with per-SCC
  relation sets, successor/predecessor SCC sets, and recursivity.
- [topological_order] --- a forward order of the SCC DAG, tie-broken by a
  cost heuristic minimizing the summed live ranges between an SCC and its
  predecessors.
- [relation_schedule] --- one step per SCC in order, carrying the relations
  computed there and the relations whose last use ends there.
- [redundant_relations] --- relations from which no output is reachable.
*/

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use crate::ast::visit::{body_mentions, MentionKind};
use crate::ast::{ClauseKey, Program, RelationName};

/// The precedence graph of a program.
pub struct PrecedenceGraph {
    graph: DiGraph<RelationName, MentionKind>,
    nodes: BTreeMap<RelationName, NodeIndex>,
}

impl PrecedenceGraph {
    pub fn build(program: &Program) -> Self {
        let mut graph = DiGraph::default();
        let mut nodes = BTreeMap::default();
        for name in program.relation_names() {
            let index = graph.add_node(name.clone());
            nodes.insert(name, index);
        }
        for key in program.clause_keys() {
            let clause = program.clause(key);
            let Some(&head) = nodes.get(&clause.head.name) else {
                continue;
            };
            for (name, kind, _) in body_mentions(clause) {
                if let Some(&body) = nodes.get(name) {
                    graph.add_edge(body, head, kind);
                }
            }
        }
        PrecedenceGraph { graph, nodes }
    }

    pub fn graph(&self) -> &DiGraph<RelationName, MentionKind> {
        &self.graph
    }

    pub fn node(&self, name: &RelationName) -> Option<NodeIndex> {
        self.nodes.get(name).copied()
    }

    /// The relations mentioned by the defining clauses of `name`.
    pub fn dependencies(&self, name: &RelationName) -> BTreeSet<RelationName> {
        self.neighbour_names(name, Direction::Incoming)
    }

    /// The relations whose defining clauses mention `name`.
    pub fn dependents(&self, name: &RelationName) -> BTreeSet<RelationName> {
        self.neighbour_names(name, Direction::Outgoing)
    }

    fn neighbour_names(&self, name: &RelationName, direction: Direction) -> BTreeSet<RelationName> {
        match self.nodes.get(name) {
            Some(&node) => self
                .graph
                .neighbors_directed(node, direction)
                .map(|n| self.graph[n].clone())
                .collect(),
            None => BTreeSet::default(),
        }
    }
}

/// The clauses of a program whose evaluation is recursive.
pub struct RecursiveClauses {
    recursive: BTreeSet<ClauseKey>,
}

impl RecursiveClauses {
    pub fn compute(program: &Program) -> Self {
        let mut recursive = BTreeSet::default();
        for key in program.clause_keys() {
            if Self::is_recursive(program, key) {
                recursive.insert(key);
            }
        }
        RecursiveClauses { recursive }
    }

    pub fn recursive(&self, key: ClauseKey) -> bool {
        self.recursive.contains(&key)
    }

    // The head relation must be derivable from a body relation through the
    // clauses of the program.
    fn is_recursive(program: &Program, key: ClauseKey) -> bool {
        let clause = program.clause(key);
        let head = &clause.head.name;

        let mut worklist: Vec<RelationName> = body_mentions(clause)
            .into_iter()
            .map(|(name, _, _)| name.clone())
            .collect();
        let mut seen = BTreeSet::default();

        while let Some(current) = worklist.pop() {
            if &current == head {
                return true;
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            for defining in program.clauses_of(&current) {
                for (name, _, _) in body_mentions(program.clause(defining)) {
                    worklist.push(name.clone());
                }
            }
        }
        false
    }
}

/// A strongly connected component of the precedence graph.
#[derive(Clone, Debug)]
pub struct Scc {
    pub relations: Vec<RelationName>,
    pub successors: BTreeSet<usize>,
    pub predecessors: BTreeSet<usize>,
    pub recursive: bool,
}

/// The SCC graph of a program.
pub struct SccGraph {
    sccs: Vec<Scc>,
    membership: BTreeMap<RelationName, usize>,
}

impl SccGraph {
    pub fn build(precedence: &PrecedenceGraph) -> Self {
        let graph = precedence.graph();
        let components = tarjan_scc(graph);

        let mut membership_by_node: BTreeMap<NodeIndex, usize> = BTreeMap::default();
        let mut sccs: Vec<Scc> = Vec::with_capacity(components.len());
        for (index, component) in components.iter().enumerate() {
            let mut relations: Vec<RelationName> =
                component.iter().map(|&n| graph[n].clone()).collect();
            relations.sort();
            for &node in component {
                membership_by_node.insert(node, index);
            }
            let recursive = component.len() > 1
                || component
                    .iter()
                    .any(|&n| graph.edges_connecting(n, n).next().is_some());
            sccs.push(Scc {
                relations,
                successors: BTreeSet::default(),
                predecessors: BTreeSet::default(),
                recursive,
            });
        }

        for edge in graph.edge_references() {
            let source = membership_by_node[&edge.source()];
            let target = membership_by_node[&edge.target()];
            if source != target {
                sccs[source].successors.insert(target);
                sccs[target].predecessors.insert(source);
            }
        }

        let membership = membership_by_node
            .into_iter()
            .map(|(node, scc)| (graph[node].clone(), scc))
            .collect();

        SccGraph { sccs, membership }
    }

    pub fn len(&self) -> usize {
        self.sccs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sccs.is_empty()
    }

    pub fn scc(&self, index: usize) -> &Scc {
        &self.sccs[index]
    }

    pub fn scc_of(&self, name: &RelationName) -> Option<usize> {
        self.membership.get(name).copied()
    }

    pub fn same_scc(&self, a: &RelationName, b: &RelationName) -> bool {
        match (self.scc_of(a), self.scc_of(b)) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        }
    }

    pub fn is_recursive(&self, name: &RelationName) -> bool {
        self.scc_of(name)
            .map(|index| self.sccs[index].recursive)
            .unwrap_or(false)
    }

    /// The edge kinds occurring inside the given SCC.
    pub fn internal_edge_kinds(
        &self,
        precedence: &PrecedenceGraph,
        index: usize,
    ) -> Vec<(RelationName, RelationName, MentionKind)> {
        let mut kinds = Vec::default();
        for edge in precedence.graph().edge_references() {
            let source = &precedence.graph()[edge.source()];
            let target = &precedence.graph()[edge.target()];
            if self.scc_of(source) == Some(index) && self.scc_of(target) == Some(index) {
                kinds.push((source.clone(), target.clone(), *edge.weight()));
            }
        }
        kinds
    }
}

/// A forward topological order of the SCC DAG.
///
/// Among the SCCs ready at each step, the one extending the live ranges of
/// its predecessors the least is placed next; ties break on index, keeping
/// the order deterministic.
pub fn topological_order(sccs: &SccGraph) -> Vec<usize> {
    let count = sccs.len();
    let mut placed: Vec<Option<usize>> = vec![None; count];
    let mut order = Vec::with_capacity(count);

    while order.len() < count {
        let position = order.len();
        let mut best: Option<(usize, usize)> = None;
        for candidate in 0..count {
            if placed[candidate].is_some() {
                continue;
            }
            let scc = sccs.scc(candidate);
            if !scc.predecessors.iter().all(|&p| placed[p].is_some()) {
                continue;
            }
            let cost: usize = scc
                .predecessors
                .iter()
                .map(|&p| position - placed[p].expect("predecessors are placed"))
                .sum();
            match best {
                Some((_, best_cost)) if best_cost <= cost => {}
                _ => best = Some((candidate, cost)),
            }
        }
        let (chosen, _) = best.expect("the SCC graph is acyclic");
        placed[chosen] = Some(position);
        order.push(chosen);
    }
    order
}

/// One step of the relation schedule.
#[derive(Clone, Debug)]
pub struct ScheduleStep {
    /// The relations computed in this step.
    pub computed: Vec<RelationName>,

    /// The relations whose last use ends here.
    pub expired: Vec<RelationName>,

    pub recursive: bool,
}

/// The relation schedule: one step per SCC in topological order.
pub fn relation_schedule(
    program: &Program,
    precedence: &PrecedenceGraph,
    sccs: &SccGraph,
    order: &[usize],
) -> Vec<ScheduleStep> {
    let mut position = vec![0usize; sccs.len()];
    for (step, &scc) in order.iter().enumerate() {
        position[scc] = step;
    }

    let mut steps: Vec<ScheduleStep> = order
        .iter()
        .map(|&scc| ScheduleStep {
            computed: sccs.scc(scc).relations.clone(),
            expired: Vec::default(),
            recursive: sccs.scc(scc).recursive,
        })
        .collect();

    for name in program.relation_names() {
        let Some(own) = sccs.scc_of(&name) else {
            continue;
        };
        let relation = program.relation(&name).expect("name comes from the program");
        if relation.flags.computed() {
            // outputs survive the whole run
            continue;
        }
        let mut last_use = position[own];
        for dependent in precedence.dependents(&name) {
            if let Some(scc) = sccs.scc_of(&dependent) {
                last_use = last_use.max(position[scc]);
            }
        }
        steps[last_use].expired.push(name);
    }

    for step in steps.iter_mut() {
        step.expired.sort();
    }
    steps
}

/// Relations which do not contribute to any output or printed size.
pub fn redundant_relations(
    program: &Program,
    precedence: &PrecedenceGraph,
) -> BTreeSet<RelationName> {
    let mut keep = BTreeSet::default();
    let mut worklist: Vec<RelationName> = program
        .relations()
        .filter(|relation| relation.flags.computed())
        .map(|relation| relation.name.clone())
        .collect();

    while let Some(current) = worklist.pop() {
        if !keep.insert(current.clone()) {
            continue;
        }
        worklist.extend(precedence.dependencies(&current));
    }

    program
        .relation_names()
        .into_iter()
        .filter(|name| !keep.contains(name))
        .collect()
}
