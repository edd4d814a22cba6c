//! Shared groups.
//!
//! A shared group is a named, reusable block of definitions. Including it
//! evaluates the block against a target group: either inside a new nested
//! group ([`it_behaves_like`](crate::GroupBuilder::it_behaves_like)) or
//! directly into the target ([`include_examples`](crate::GroupBuilder::include_examples)).
//!
//! Definitions made on the [`World`](crate::World) are visible everywhere.
//! Definitions made inside a group are visible to that group and everything
//! below it, and shadow global ones with the same name.
//!
//! Each inclusion site evaluates the block once. Including the same name
//! again from the same site into the same group reuses the first result.

use std::{
    collections::HashMap,
    fmt::Debug,
    rc::Rc,
};

use crate::{
    error::DefinitionError,
    metadata::{CallSite, Tag, Value},
    tree::NodeId,
    world::GroupBuilder,
};

pub type SharedBody = Rc<dyn Fn(&mut GroupBuilder<'_>, &SharedArgs) -> Result<(), DefinitionError>>;

/// The arguments an inclusion passes, bound to the definition's parameter
/// names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SharedArgs {
    names: Vec<Tag>,
    values: Vec<Value>,
}

impl SharedArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        let index = self.names.iter().position(|n| n == name)?;
        self.values.get(index)
    }

    pub fn positional(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A registered shared group.
pub struct SharedGroup {
    name: Tag,
    params: Vec<Tag>,
    body: SharedBody,
    site: CallSite,
}

impl SharedGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Tag] {
        &self.params
    }

    pub fn site(&self) -> &CallSite {
        &self.site
    }

    /// Bind `args` to the parameter names, the counts have to match.
    pub(crate) fn bind(&self, args: Vec<Value>) -> Result<SharedArgs, DefinitionError> {
        if args.len() != self.params.len() {
            return Err(DefinitionError::SharedGroupArity {
                name: self.name.clone(),
                expected: self.params.len(),
                got: args.len(),
            });
        }
        Ok(SharedArgs {
            names: self.params.clone(),
            values: args,
        })
    }

    pub(crate) fn body(&self) -> SharedBody {
        Rc::clone(&self.body)
    }
}

impl Debug for SharedGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedGroup")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("site", &self.site)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum InclusionMode {
    Nested,
    Merged,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InclusionSite {
    pub target: NodeId,
    pub name: Tag,
    pub site: CallSite,
    pub mode: InclusionMode,
}

/// Shared group definitions plus the memo of evaluated inclusions.
#[derive(Debug, Default)]
pub struct SharedGroups {
    definitions: HashMap<(Option<NodeId>, Tag), Rc<SharedGroup>>,
    included: HashMap<InclusionSite, NodeId>,
}

impl SharedGroups {
    pub(crate) fn define(
        &mut self,
        scope: Option<NodeId>,
        name: Tag,
        params: Vec<Tag>,
        body: SharedBody,
        site: CallSite,
    ) -> Result<(), DefinitionError> {
        let key = (scope, name.clone());
        if self.definitions.contains_key(&key) {
            return Err(DefinitionError::DuplicateSharedGroup { name });
        }
        log::trace!(target: "kispec", "defined shared group {name:?} at {site}");
        self.definitions.insert(
            key,
            Rc::new(SharedGroup {
                name,
                params,
                body,
                site,
            }),
        );
        Ok(())
    }

    /// Find `name` walking from the innermost scope in `lineage` outwards,
    /// then in the global scope.
    pub(crate) fn lookup(
        &self,
        lineage: &[NodeId],
        name: &str,
    ) -> Result<Rc<SharedGroup>, DefinitionError> {
        lineage
            .iter()
            .rev()
            .map(|group| Some(*group))
            .chain([None])
            .find_map(|scope| self.definitions.get(&(scope, Tag::from(name.to_string()))))
            .cloned()
            .ok_or_else(|| DefinitionError::SharedGroupNotFound {
                name: name.to_string().into(),
            })
    }

    pub fn is_defined_globally(&self, name: &str) -> bool {
        self.definitions
            .contains_key(&(None, Tag::from(name.to_string())))
    }

    pub(crate) fn cached(&self, site: &InclusionSite) -> Option<NodeId> {
        self.included.get(site).copied()
    }

    pub(crate) fn remember(&mut self, site: InclusionSite, group: NodeId) {
        self.included.insert(site, group);
    }
}
