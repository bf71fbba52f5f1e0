// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Tree synthesis from the flat program catalog.
//!
//! A new authority starts from the catalog of programs for its kind, every
//! grant off. Programs reference their parent by id; siblings are ordered by
//! `sort_order`, then id.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TreeError;
use crate::model::{NodeId, PermissionNode, PermissionTree};

/// One entry of the program catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramNode {
	pub id: NodeId,
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub parent_id: Option<NodeId>,
	#[serde(default)]
	pub sort_order: i32,
}

impl ProgramNode {
	pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			parent_id: None,
			sort_order: 0,
		}
	}

	pub fn with_parent(mut self, parent: impl Into<NodeId>) -> Self {
		self.parent_id = Some(parent.into());
		self
	}

	pub fn with_sort_order(mut self, sort_order: i32) -> Self {
		self.sort_order = sort_order;
		self
	}
}

/// Builds an all-false permission tree from a flat catalog.
///
/// Rejects duplicate ids, references to missing parents, and parent cycles.
pub fn build_tree(programs: &[ProgramNode]) -> Result<PermissionTree, TreeError> {
	let mut ids = HashSet::with_capacity(programs.len());
	for program in programs {
		if !ids.insert(program.id) {
			return Err(TreeError::DuplicateNode(program.id));
		}
	}

	let mut children_of: HashMap<Option<NodeId>, Vec<&ProgramNode>> = HashMap::new();
	for program in programs {
		if let Some(parent) = program.parent_id {
			if !ids.contains(&parent) {
				return Err(TreeError::UnknownParent {
					node: program.id,
					parent,
				});
			}
		}
		children_of.entry(program.parent_id).or_default().push(program);
	}
	for siblings in children_of.values_mut() {
		siblings.sort_by_key(|p| (p.sort_order, p.id));
	}

	let mut placed = HashSet::with_capacity(programs.len());
	let roots = build_level(None, &children_of, &mut placed);

	// Every parent exists, so anything unreachable from a root sits on a cycle.
	if let Some(orphan) = programs.iter().find(|p| !placed.contains(&p.id)) {
		return Err(TreeError::CatalogCycle(orphan.id));
	}

	debug!(programs = programs.len(), roots = roots.len(), "built tree from catalog");

	Ok(PermissionTree::new(roots))
}

fn build_level(
	parent: Option<NodeId>,
	children_of: &HashMap<Option<NodeId>, Vec<&ProgramNode>>,
	placed: &mut HashSet<NodeId>,
) -> Vec<PermissionNode> {
	let Some(programs) = children_of.get(&parent) else {
		return Vec::new();
	};

	programs
		.iter()
		.map(|program| {
			placed.insert(program.id);
			let children = build_level(Some(program.id), children_of, placed);
			PermissionNode::new(program.id, program.name.clone()).with_children(children)
		})
		.collect()
}
