// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Highlight filter over permission flags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::model::{NodeId, PermissionField, PermissionNode, PermissionTree};

/// Which granted flag, if any, the presentation layer is highlighting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionFilter {
	#[default]
	None,
	Read,
	CreateDelete,
	Update,
}

impl PermissionFilter {
	pub fn field(&self) -> Option<PermissionField> {
		match self {
			PermissionFilter::None => None,
			PermissionFilter::Read => Some(PermissionField::Read),
			PermissionFilter::CreateDelete => Some(PermissionField::CreateDelete),
			PermissionFilter::Update => Some(PermissionField::Update),
		}
	}

	/// True when the node holds the filtered grant. `None` matches nothing.
	pub fn matches(&self, node: &PermissionNode) -> bool {
		self
			.field()
			.map(|field| node.flags.get(field))
			.unwrap_or(false)
	}

	/// Ids of all matching nodes in pre-order.
	pub fn matching_ids(&self, tree: &PermissionTree) -> Vec<NodeId> {
		tree
			.iter()
			.filter(|node| self.matches(node))
			.map(|node| node.id)
			.collect()
	}
}

impl From<PermissionField> for PermissionFilter {
	fn from(field: PermissionField) -> Self {
		match field {
			PermissionField::Read => PermissionFilter::Read,
			PermissionField::CreateDelete => PermissionFilter::CreateDelete,
			PermissionField::Update => PermissionFilter::Update,
		}
	}
}

impl fmt::Display for PermissionFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.field() {
			Some(field) => write!(f, "{field}"),
			None => f.write_str("none"),
		}
	}
}

impl FromStr for PermissionFilter {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.eq_ignore_ascii_case("none") || s.is_empty() {
			return Ok(PermissionFilter::None);
		}
		s.parse::<PermissionField>()
			.map(PermissionFilter::from)
			.map_err(|_| format!("invalid permission filter: {s}"))
	}
}
