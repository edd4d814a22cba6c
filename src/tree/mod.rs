//! The group tree.
//!
//! All nodes live in one arena owned by the [`Tree`] and are addressed by
//! [`NodeId`]. Children know their parent by id, which is only ever used to
//! read: to inherit metadata and to collect hook chains.

use std::cell::{Ref, RefCell};

use crate::{
    body::CaseFn,
    hook::HookSet,
    metadata::Metadata,
    outcome::ExecutionResult,
};

mod display_name;
pub use display_name::{base_name, disambiguate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub(crate) const fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug)]
pub struct Group {
    parent: Option<NodeId>,
    metadata: Metadata,
    children: Vec<NodeId>,
    pub(crate) hooks: HookSet,
    display_name: String,
}

impl Group {
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Child groups and cases, in definition order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn hooks(&self) -> &HookSet {
        &self.hooks
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }
}

pub struct Case {
    parent: NodeId,
    metadata: Metadata,
    pub(crate) body: Option<CaseFn>,
    pub(crate) result: RefCell<ExecutionResult>,
}

impl Case {
    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn result(&self) -> Ref<'_, ExecutionResult> {
        self.result.borrow()
    }
}

impl std::fmt::Debug for Case {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Case")
            .field("parent", &self.parent)
            .field("metadata", &self.metadata)
            .field("has_body", &self.has_body())
            .field("result", &self.result)
            .finish()
    }
}

#[derive(Debug)]
pub enum Node {
    Group(Group),
    Case(Case),
}

impl Node {
    pub fn metadata(&self) -> &Metadata {
        match self {
            Node::Group(group) => &group.metadata,
            Node::Case(case) => &case.metadata,
        }
    }

    pub fn parent(&self) -> Option<NodeId> {
        match self {
            Node::Group(group) => group.parent,
            Node::Case(case) => Some(case.parent),
        }
    }

    pub fn is_group(&self) -> bool {
        matches!(self, Node::Group(_))
    }
}

#[derive(Debug, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top level groups, in definition order.
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0)
    }

    pub fn group(&self, id: NodeId) -> Option<&Group> {
        match self.node(id)? {
            Node::Group(group) => Some(group),
            Node::Case(_) => None,
        }
    }

    pub(crate) fn group_mut(&mut self, id: NodeId) -> Option<&mut Group> {
        match self.nodes.get_mut(id.0)? {
            Node::Group(group) => Some(group),
            Node::Case(_) => None,
        }
    }

    pub fn case(&self, id: NodeId) -> Option<&Case> {
        match self.node(id)? {
            Node::Case(case) => Some(case),
            Node::Group(_) => None,
        }
    }

    pub fn metadata(&self, id: NodeId) -> Option<&Metadata> {
        self.node(id).map(Node::metadata)
    }

    pub(crate) fn metadata_mut(&mut self, id: NodeId) -> Option<&mut Metadata> {
        match self.nodes.get_mut(id.0)? {
            Node::Group(group) => Some(&mut group.metadata),
            Node::Case(case) => Some(&mut case.metadata),
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parent()
    }

    /// Children of a group, empty for cases and unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.group(id).map(Group::children).unwrap_or_default()
    }

    /// The cases directly inside a group.
    pub fn cases(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.case(*child).is_some())
    }

    /// The groups directly inside a group.
    pub fn child_groups(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.group(*child).is_some())
    }

    /// The group itself followed by all groups below it, depth first.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if self.group(next).is_none() {
                continue;
            }
            found.push(next);
            stack.extend(self.child_groups(next).collect::<Vec<_>>().into_iter().rev());
        }
        found
    }

    /// All cases below a group: its own first, then those of each child group.
    pub fn descendant_cases(&self, id: NodeId) -> Vec<NodeId> {
        let mut found: Vec<NodeId> = self.cases(id).collect();
        for child in self.child_groups(id) {
            found.extend(self.descendant_cases(child));
        }
        found
    }

    /// Every case in the tree, top level group by top level group.
    pub fn all_cases(&self) -> Vec<NodeId> {
        self.roots
            .iter()
            .flat_map(|root| self.descendant_cases(*root))
            .collect()
    }

    /// The groups from the top level down to `id` (a case's lineage ends at
    /// its group).
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut lineage = Vec::new();
        let mut current = match self.node(id) {
            Some(Node::Group(_)) => Some(id),
            Some(Node::Case(case)) => Some(case.parent),
            None => None,
        };
        while let Some(group) = current {
            lineage.push(group);
            current = self.parent(group);
        }
        lineage.reverse();
        lineage
    }

    pub fn top_level(&self, id: NodeId) -> Option<NodeId> {
        self.lineage(id).first().copied()
    }

    pub fn top_level_description(&self, id: NodeId) -> Option<&str> {
        self.metadata(self.top_level(id)?).map(Metadata::description)
    }

    /// Display names from the top level down, joined by `::`.
    pub fn display_path(&self, id: NodeId) -> String {
        self.lineage(id)
            .into_iter()
            .filter_map(|group| self.group(group).map(Group::display_name))
            .collect::<Vec<_>>()
            .join("::")
    }

    /// The `scoped_id` the next child of `parent` gets.
    pub(crate) fn next_scoped_id(&self, parent: Option<NodeId>) -> String {
        match parent {
            None => (self.roots.len() + 1).to_string(),
            Some(parent) => {
                let prefix = self
                    .metadata(parent)
                    .map(Metadata::scoped_id)
                    .unwrap_or_default();
                format!("{prefix}:{}", self.children(parent).len() + 1)
            }
        }
    }

    pub(crate) fn add_group(&mut self, parent: Option<NodeId>, metadata: Metadata) -> NodeId {
        let siblings: Vec<&str> = match parent {
            None => self.roots.iter(),
            Some(parent) => self.children(parent).iter(),
        }
        .filter_map(|sibling| self.group(*sibling).map(Group::display_name))
        .collect();
        let display_name = disambiguate(base_name(metadata.description()), |name| {
            siblings.contains(&name)
        });

        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::Group(Group {
            parent,
            metadata,
            children: Vec::new(),
            hooks: HookSet::new(),
            display_name,
        }));
        match parent.and_then(|parent| self.group_mut(parent)) {
            Some(parent) => parent.children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    pub(crate) fn add_case(
        &mut self,
        parent: NodeId,
        metadata: Metadata,
        body: Option<CaseFn>,
    ) -> NodeId {
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(Node::Case(Case {
            parent,
            metadata,
            body,
            result: RefCell::new(ExecutionResult::default()),
        }));
        if let Some(group) = self.group_mut(parent) {
            group.children.push(id);
        }
        id
    }
}
