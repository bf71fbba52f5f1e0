// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use thiserror::Error;

use crate::model::{NodeId, PermissionField};

/// Structural problems with a permission tree or program catalog.
///
/// Trees are expected to be well formed by construction, so these are
/// reported rather than repaired.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
	#[error("node {0} appears more than once in the tree")]
	DuplicateNode(NodeId),

	#[error("program {node} references unknown parent {parent}")]
	UnknownParent { node: NodeId, parent: NodeId },

	#[error("program {0} is part of a parent cycle")]
	CatalogCycle(NodeId),
}

/// A requested grant exceeds what the acting user may assign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot grant {field} on node {node_id}: exceeds the acting user's ceiling")]
pub struct CeilingExceeded {
	pub node_id: NodeId,
	pub field: PermissionField,
}

pub type Result<T> = std::result::Result<T, TreeError>;
