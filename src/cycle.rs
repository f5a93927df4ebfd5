//! Detection of reference cycles between message types.
//!
//! Elm records are strict and cannot contain themselves without an explicit
//! indirection, so any field whose type lies in the same strongly-connected
//! component of the message reference graph as its owner is lowered through a
//! boxed wrapper (or, for oneof members, through the variant constructor) and
//! a lazy decoder.

use std::collections::{BTreeSet, HashMap};

use prost_types::field_descriptor_proto::Type;

use crate::index::DescriptorIndex;

/// Result of running Tarjan's algorithm over the message reference graph of
/// the whole descriptor closure.
#[derive(Debug)]
pub(crate) struct BoxingAnalysis {
    component: HashMap<String, usize>,
}

impl BoxingAnalysis {
    pub(crate) fn run(index: &DescriptorIndex) -> Self {
        let mut nodes = Vec::new();
        let mut ids = HashMap::new();
        for entry in index.entries() {
            if entry.message().is_some() {
                ids.insert(entry.fqn.clone(), nodes.len());
                nodes.push(entry.fqn.clone());
            }
        }

        let mut edges = vec![Vec::new(); nodes.len()];
        for (id, fqn) in nodes.iter().enumerate() {
            let message = index
                .get(fqn)
                .and_then(|entry| entry.message())
                .expect("nodes are message entries");
            for field in &message.field {
                if !matches!(field.r#type(), Type::Message | Type::Group) {
                    continue;
                }
                // Unresolved references are reported during lowering.
                if let Some(target) = index.resolve(fqn, field.type_name()) {
                    if let Some(&target_id) = ids.get(&target.fqn) {
                        edges[id].push(target_id);
                    }
                }
            }
        }

        let components = Tarjan::new(&edges).run();

        let component = nodes
            .into_iter()
            .enumerate()
            .map(|(id, fqn)| (fqn, components[id]))
            .collect();
        BoxingAnalysis { component }
    }

    /// Whether a field of message `owner` referencing message `target` needs
    /// an indirection. Only meaningful for actual reference edges; mutual
    /// reachability is exact, so recursion through a message outside the
    /// cycle never triggers boxing.
    pub(crate) fn is_boxed(&self, owner: &str, target: &str) -> bool {
        match (self.component.get(owner), self.component.get(target)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// The messages that need a boxed wrapper declaration: targets of at
    /// least one cyclic reference outside a oneof. Oneof members get their
    /// indirection from the variant constructor instead.
    pub(crate) fn wrapper_targets(&self, index: &DescriptorIndex) -> BTreeSet<String> {
        let mut targets = BTreeSet::new();
        for entry in index.entries() {
            let message = match entry.message() {
                Some(message) => message,
                None => continue,
            };
            for field in &message.field {
                if !matches!(field.r#type(), Type::Message | Type::Group) {
                    continue;
                }
                if field.oneof_index.is_some() && !field.proto3_optional() {
                    continue;
                }
                if let Some(target) = index.resolve(&entry.fqn, field.type_name()) {
                    if target.message().is_some() && self.is_boxed(&entry.fqn, &target.fqn) {
                        targets.insert(target.fqn.clone());
                    }
                }
            }
        }
        targets
    }
}

struct Tarjan<'a> {
    edges: &'a [Vec<usize>],
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    component: Vec<usize>,
    component_count: usize,
}

impl<'a> Tarjan<'a> {
    fn new(edges: &'a [Vec<usize>]) -> Self {
        let len = edges.len();
        Tarjan {
            edges,
            index: vec![None; len],
            lowlink: vec![0; len],
            on_stack: vec![false; len],
            stack: Vec::new(),
            next_index: 0,
            component: vec![0; len],
            component_count: 0,
        }
    }

    fn run(mut self) -> Vec<usize> {
        for node in 0..self.edges.len() {
            if self.index[node].is_none() {
                self.connect(node);
            }
        }
        self.component
    }

    fn connect(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        let edges = self.edges;
        for &next in &edges[node] {
            if self.index[next].is_none() {
                self.connect(next);
                self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
            } else if self.on_stack[next] {
                self.lowlink[node] = self.lowlink[node].min(self.index[next].unwrap());
            }
        }

        if Some(self.lowlink[node]) == self.index[node] {
            loop {
                let member = self.stack.pop().expect("node is on the stack");
                self.on_stack[member] = false;
                self.component[member] = self.component_count;
                if member == node {
                    break;
                }
            }
            self.component_count += 1;
        }
    }
}
