// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Permission tree entities.
//!
//! A [`PermissionTree`] is an ordered forest of [`PermissionNode`]s, one node per
//! governed program. Only the three `can_*` flags are persisted; the ceiling is
//! recomputed every session from the acting user's own grants and never leaves
//! the process.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TreeError;

/// Identifier of a governed program. Unique within a tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(i64);

impl NodeId {
	pub const fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn as_i64(&self) -> i64 {
		self.0
	}
}

impl From<i64> for NodeId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

impl fmt::Display for NodeId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for NodeId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.parse().map(Self)
	}
}

/// Identifier of an authority (a named permission grant).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorityId(i64);

impl AuthorityId {
	pub const fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn as_i64(&self) -> i64 {
		self.0
	}
}

impl From<i64> for AuthorityId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

impl fmt::Display for AuthorityId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for AuthorityId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.parse().map(Self)
	}
}

/// Ownership scope of an authority, e.g. head office or a franchise.
///
/// Bulk copy is only offered between authorities sharing a scope.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerScope(String);

impl OwnerScope {
	pub fn new(scope: impl Into<String>) -> Self {
		Self(scope.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for OwnerScope {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Program catalog selector used when synthesizing a fresh tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramKind(String);

impl ProgramKind {
	pub fn new(kind: impl Into<String>) -> Self {
		Self(kind.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for ProgramKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// One of the three permission flags carried by every node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionField {
	Read,
	CreateDelete,
	Update,
}

impl PermissionField {
	pub const ALL: [PermissionField; 3] = [
		PermissionField::Read,
		PermissionField::CreateDelete,
		PermissionField::Update,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			PermissionField::Read => "read",
			PermissionField::CreateDelete => "create_delete",
			PermissionField::Update => "update",
		}
	}
}

impl fmt::Display for PermissionField {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for PermissionField {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized: String = s
			.chars()
			.filter(|c| *c != '-' && *c != '_')
			.collect::<String>()
			.to_lowercase();
		match normalized.as_str() {
			"read" | "canread" => Ok(PermissionField::Read),
			"createdelete" | "cancreatedelete" | "cd" => Ok(PermissionField::CreateDelete),
			"update" | "canupdate" => Ok(PermissionField::Update),
			_ => Err(format!("invalid permission field: {s}")),
		}
	}
}

/// The read / create-or-delete / update triple.
///
/// Used both for the persisted grant of a node and for its session ceiling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionFlags {
	pub can_read: bool,
	pub can_create_delete: bool,
	pub can_update: bool,
}

impl PermissionFlags {
	pub const NONE: PermissionFlags = PermissionFlags {
		can_read: false,
		can_create_delete: false,
		can_update: false,
	};

	pub const ALL: PermissionFlags = PermissionFlags {
		can_read: true,
		can_create_delete: true,
		can_update: true,
	};

	pub fn new(can_read: bool, can_create_delete: bool, can_update: bool) -> Self {
		Self {
			can_read,
			can_create_delete,
			can_update,
		}
	}

	pub fn get(&self, field: PermissionField) -> bool {
		match field {
			PermissionField::Read => self.can_read,
			PermissionField::CreateDelete => self.can_create_delete,
			PermissionField::Update => self.can_update,
		}
	}

	/// Sets `field` and restores the read-implication on this triple.
	///
	/// Clearing read clears the other two; granting create/delete or update
	/// grants read.
	pub fn set(&mut self, field: PermissionField, value: bool) {
		match field {
			PermissionField::Read => {
				self.can_read = value;
				if !value {
					self.can_create_delete = false;
					self.can_update = false;
				}
			}
			PermissionField::CreateDelete => {
				self.can_create_delete = value;
				if value {
					self.can_read = true;
				}
			}
			PermissionField::Update => {
				self.can_update = value;
				if value {
					self.can_read = true;
				}
			}
		}
	}

	/// Returns true if create/delete and update both imply read.
	pub fn is_consistent(&self) -> bool {
		self.can_read || (!self.can_create_delete && !self.can_update)
	}

	/// The grants present in both triples.
	///
	/// Create/delete and update are dropped when read does not survive, so the
	/// result is consistent even when an input is not.
	pub fn clamp_to(self, ceiling: PermissionFlags) -> PermissionFlags {
		let can_read = self.can_read && ceiling.can_read;
		PermissionFlags {
			can_read,
			can_create_delete: can_read && self.can_create_delete && ceiling.can_create_delete,
			can_update: can_read && self.can_update && ceiling.can_update,
		}
	}
}

/// A governed program and its grant, owning its children.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionNode {
	pub id: NodeId,
	pub name: String,
	#[serde(flatten)]
	pub flags: PermissionFlags,
	/// Session-only upper bound derived from the acting user's grants.
	#[serde(skip)]
	pub ceiling: PermissionFlags,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub children: Vec<PermissionNode>,
}

impl PermissionNode {
	/// Creates a leaf with no grant and no ceiling.
	pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			flags: PermissionFlags::NONE,
			ceiling: PermissionFlags::NONE,
			children: Vec::new(),
		}
	}

	pub fn with_flags(mut self, flags: PermissionFlags) -> Self {
		self.flags = flags;
		self
	}

	pub fn with_ceiling(mut self, ceiling: PermissionFlags) -> Self {
		self.ceiling = ceiling;
		self
	}

	pub fn with_children(mut self, children: Vec<PermissionNode>) -> Self {
		self.children = children;
		self
	}

	pub fn is_leaf(&self) -> bool {
		self.children.is_empty()
	}

	/// Pre-order iterator over this node and its descendants.
	pub fn iter(&self) -> Iter<'_> {
		Iter { stack: vec![self] }
	}

	fn find(&self, id: NodeId) -> Option<&PermissionNode> {
		if self.id == id {
			return Some(self);
		}
		self.children.iter().find_map(|child| child.find(id))
	}

	fn find_mut(&mut self, id: NodeId) -> Option<&mut PermissionNode> {
		if self.id == id {
			return Some(self);
		}
		self
			.children
			.iter_mut()
			.find_map(|child| child.find_mut(id))
	}
}

/// An ordered forest of permission nodes, exchanged with the remote store as a
/// plain JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionTree {
	roots: Vec<PermissionNode>,
}

impl PermissionTree {
	pub fn new(roots: Vec<PermissionNode>) -> Self {
		Self { roots }
	}

	pub fn empty() -> Self {
		Self::default()
	}

	pub fn roots(&self) -> &[PermissionNode] {
		&self.roots
	}

	pub fn into_roots(self) -> Vec<PermissionNode> {
		self.roots
	}

	pub fn is_empty(&self) -> bool {
		self.roots.is_empty()
	}

	/// Total number of nodes at every depth.
	pub fn len(&self) -> usize {
		self.iter().count()
	}

	/// Pre-order iterator over every node.
	pub fn iter(&self) -> Iter<'_> {
		Iter {
			stack: self.roots.iter().rev().collect(),
		}
	}

	pub fn find(&self, id: NodeId) -> Option<&PermissionNode> {
		self.roots.iter().find_map(|root| root.find(id))
	}

	pub fn find_mut(&mut self, id: NodeId) -> Option<&mut PermissionNode> {
		self.roots.iter_mut().find_map(|root| root.find_mut(id))
	}

	pub fn contains(&self, id: NodeId) -> bool {
		self.find(id).is_some()
	}

	/// Applies `f` to every node, parents before children.
	pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut PermissionNode)) {
		fn walk(node: &mut PermissionNode, f: &mut impl FnMut(&mut PermissionNode)) {
			f(node);
			for child in &mut node.children {
				walk(child, f);
			}
		}

		for root in &mut self.roots {
			walk(root, &mut f);
		}
	}

	/// Replaces the subtree rooted at `subtree.id` in place.
	///
	/// Returns false, leaving the tree untouched, if no node has that id.
	pub fn replace_subtree(&mut self, subtree: PermissionNode) -> bool {
		match self.find_mut(subtree.id) {
			Some(slot) => {
				*slot = subtree;
				true
			}
			None => false,
		}
	}

	/// Resets every ceiling to "nothing allowed".
	pub fn clear_ceilings(&mut self) {
		self.for_each_mut(|node| node.ceiling = PermissionFlags::NONE);
	}

	/// Checks that every id occurs once.
	pub fn validate(&self) -> Result<(), TreeError> {
		let mut seen = HashSet::new();
		for node in self.iter() {
			if !seen.insert(node.id) {
				return Err(TreeError::DuplicateNode(node.id));
			}
		}
		Ok(())
	}
}

impl From<Vec<PermissionNode>> for PermissionTree {
	fn from(roots: Vec<PermissionNode>) -> Self {
		Self::new(roots)
	}
}

/// Pre-order iterator over permission nodes.
pub struct Iter<'a> {
	stack: Vec<&'a PermissionNode>,
}

impl<'a> Iterator for Iter<'a> {
	type Item = &'a PermissionNode;

	fn next(&mut self) -> Option<Self::Item> {
		let node = self.stack.pop()?;
		self.stack.extend(node.children.iter().rev());
		Some(node)
	}
}
