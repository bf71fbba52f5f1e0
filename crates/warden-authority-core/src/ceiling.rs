// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Ceiling resolution.
//!
//! The ceiling of a node is the most this session's user may grant on it. An
//! unrestricted actor (a super-admin) may grant anything; any other actor is
//! bounded by the flags of the same node in their own authority tree, and may
//! grant nothing on programs absent from it.

use std::collections::HashMap;

use tracing::debug;

use crate::error::CeilingExceeded;
use crate::model::{NodeId, PermissionField, PermissionFlags, PermissionNode, PermissionTree};

/// What the acting user is allowed to hand out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActorScope {
	Unrestricted,
	Bounded(PermissionTree),
}

impl ActorScope {
	/// Interprets the actor's own tree, where an empty tree has historically
	/// meant "super-admin".
	pub fn from_own_tree(tree: PermissionTree) -> Self {
		if tree.is_empty() {
			ActorScope::Unrestricted
		} else {
			ActorScope::Bounded(tree)
		}
	}

	pub fn is_unrestricted(&self) -> bool {
		matches!(self, ActorScope::Unrestricted)
	}

	/// The ceiling for a single node.
	pub fn ceiling_for(&self, id: NodeId) -> PermissionFlags {
		match self {
			ActorScope::Unrestricted => PermissionFlags::ALL,
			ActorScope::Bounded(own) => own
				.find(id)
				.map(|node| node.flags)
				.unwrap_or(PermissionFlags::NONE),
		}
	}
}

/// Writes the actor's ceiling onto every node of `target`.
pub fn resolve_ceilings(actor: &ActorScope, target: &mut PermissionTree) {
	match actor {
		ActorScope::Unrestricted => {
			target.for_each_mut(|node| node.ceiling = PermissionFlags::ALL);
		}
		ActorScope::Bounded(own) => {
			let grants: HashMap<NodeId, PermissionFlags> =
				own.iter().map(|node| (node.id, node.flags)).collect();
			target.for_each_mut(|node| {
				node.ceiling = grants
					.get(&node.id)
					.copied()
					.unwrap_or(PermissionFlags::NONE);
			});
		}
	}

	debug!(
		unrestricted = actor.is_unrestricted(),
		nodes = target.len(),
		"resolved permission ceilings"
	);
}

/// Returns a copy of `target` with the actor's ceilings applied.
pub fn with_ceilings(actor: &ActorScope, target: &PermissionTree) -> PermissionTree {
	let mut resolved = target.clone();
	resolve_ceilings(actor, &mut resolved);
	resolved
}

/// Lowers every grant in `target` to its resolved ceiling.
///
/// Returns the number of nodes that lost a grant.
pub fn clamp_to_ceilings(target: &mut PermissionTree) -> usize {
	let mut clamped = 0;
	target.for_each_mut(|node| {
		let flags = node.flags.clamp_to(node.ceiling);
		if flags != node.flags {
			node.flags = flags;
			clamped += 1;
		}
	});
	clamped
}

/// Checks a requested change against the node's ceiling.
///
/// Revoking is always allowed. Granting create/delete or update also grants
/// read, so the read ceiling must allow it too.
pub fn check_ceiling(
	node: &PermissionNode,
	field: PermissionField,
	value: bool,
) -> Result<(), CeilingExceeded> {
	if !value {
		return Ok(());
	}

	if !node.ceiling.get(field) {
		return Err(CeilingExceeded {
			node_id: node.id,
			field,
		});
	}

	if field != PermissionField::Read && !node.ceiling.can_read {
		return Err(CeilingExceeded {
			node_id: node.id,
			field: PermissionField::Read,
		});
	}

	Ok(())
}
