// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Cascade engine.
//!
//! A toggle sets one field on one node and on every descendant of that node,
//! restoring the read-implication on each touched node as it goes. Ancestors
//! and siblings are never modified.
//!
//! The input tree is left untouched. The whole forest is cloned once per
//! toggle and the clone is edited in place.

use tracing::{debug, trace};

use crate::error::TreeError;
use crate::model::{NodeId, PermissionField, PermissionFlags, PermissionNode, PermissionTree};

/// Result of applying a toggle to a tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CascadeOutcome {
	tree: PermissionTree,
	target: Option<NodeId>,
}

impl CascadeOutcome {
	pub fn tree(&self) -> &PermissionTree {
		&self.tree
	}

	pub fn into_tree(self) -> PermissionTree {
		self.tree
	}

	/// The toggled node as it looks after the cascade, or `None` when the
	/// requested id was not in the tree.
	pub fn target(&self) -> Option<&PermissionNode> {
		self.target.and_then(|id| self.tree.find(id))
	}

	pub fn target_flags(&self) -> Option<PermissionFlags> {
		self.target().map(|node| node.flags)
	}

	/// True when the toggle matched nothing and the tree is unchanged.
	pub fn is_noop(&self) -> bool {
		self.target.is_none()
	}
}

/// Applies `field = value` to `node_id` and its whole subtree.
///
/// An unknown `node_id` yields the tree unchanged with no target. A tree with
/// duplicate ids is rejected.
pub fn apply_toggle(
	tree: &PermissionTree,
	node_id: NodeId,
	field: PermissionField,
	value: bool,
) -> Result<CascadeOutcome, TreeError> {
	tree.validate()?;

	let mut next = tree.clone();
	let Some(target) = next.find_mut(node_id) else {
		debug!(node_id = %node_id, field = %field, "toggle target not in tree");
		return Ok(CascadeOutcome {
			tree: next,
			target: None,
		});
	};

	let touched = cascade(target, field, value);

	debug!(
		node_id = %node_id,
		field = %field,
		value = value,
		touched = touched,
		"applied permission cascade"
	);

	Ok(CascadeOutcome {
		tree: next,
		target: Some(node_id),
	})
}

fn cascade(node: &mut PermissionNode, field: PermissionField, value: bool) -> usize {
	node.flags.set(field, value);
	trace!(node_id = %node.id, flags = ?node.flags, "cascaded into node");

	1 + node
		.children
		.iter_mut()
		.map(|child| cascade(child, field, value))
		.sum::<usize>()
}

#[cfg(test)]
mod tests {
	use std::collections::{HashMap, HashSet};

	use super::*;
	use proptest::prelude::*;

	fn flags(r: bool, cd: bool, up: bool) -> PermissionFlags {
		PermissionFlags::new(r, cd, up)
	}

	#[test]
	fn read_revocation_cascades_to_children() {
		let tree = PermissionTree::new(vec![PermissionNode::new(1, "A")
			.with_flags(flags(true, true, false))
			.with_children(vec![
				PermissionNode::new(2, "B").with_flags(flags(true, false, false))
			])]);

		let outcome = apply_toggle(&tree, NodeId::new(1), PermissionField::Read, false).unwrap();

		let expected = PermissionTree::new(vec![PermissionNode::new(1, "A")
			.with_flags(flags(false, false, false))
			.with_children(vec![
				PermissionNode::new(2, "B").with_flags(flags(false, false, false))
			])]);
		assert_eq!(outcome.tree(), &expected);
		assert_eq!(outcome.target_flags(), Some(PermissionFlags::NONE));
	}

	#[test]
	fn grant_on_child_leaves_parent_alone() {
		let tree = PermissionTree::new(vec![PermissionNode::new(1, "A")
			.with_children(vec![PermissionNode::new(2, "B"), PermissionNode::new(3, "C")])]);

		let outcome = apply_toggle(&tree, NodeId::new(2), PermissionField::Update, true).unwrap();

		let tree = outcome.tree();
		assert_eq!(tree.find(NodeId::new(1)).unwrap().flags, PermissionFlags::NONE);
		assert_eq!(
			tree.find(NodeId::new(2)).unwrap().flags,
			flags(true, false, true)
		);
		assert_eq!(tree.find(NodeId::new(3)).unwrap().flags, PermissionFlags::NONE);
	}

	#[test]
	fn unknown_target_is_noop() {
		let tree = PermissionTree::new(vec![PermissionNode::new(1, "A")]);
		let outcome = apply_toggle(&tree, NodeId::new(9), PermissionField::Read, true).unwrap();
		assert!(outcome.is_noop());
		assert!(outcome.target().is_none());
		assert_eq!(outcome.tree(), &tree);
	}

	#[test]
	fn duplicate_ids_fail_loudly() {
		let tree = PermissionTree::new(vec![PermissionNode::new(1, "A"), PermissionNode::new(1, "B")]);
		assert_eq!(
			apply_toggle(&tree, NodeId::new(1), PermissionField::Read, true),
			Err(TreeError::DuplicateNode(NodeId::new(1)))
		);
	}

	#[test]
	fn ceilings_survive_cascade() {
		let tree = PermissionTree::new(vec![PermissionNode::new(1, "A")
			.with_ceiling(PermissionFlags::ALL)
			.with_children(vec![
				PermissionNode::new(2, "B").with_ceiling(flags(true, false, false))
			])]);

		let outcome = apply_toggle(&tree, NodeId::new(1), PermissionField::Read, true).unwrap();
		assert_eq!(
			outcome.tree().find(NodeId::new(2)).unwrap().ceiling,
			flags(true, false, false)
		);
	}

	fn arb_flags() -> impl Strategy<Value = PermissionFlags> {
		(any::<bool>(), any::<bool>(), any::<bool>())
			.prop_map(|(r, cd, up)| PermissionFlags::new(r || cd || up, cd, up))
	}

	fn arb_node() -> impl Strategy<Value = PermissionNode> {
		let leaf = arb_flags().prop_map(|f| PermissionNode::new(0, "program").with_flags(f));
		leaf.prop_recursive(4, 40, 4, |inner| {
			(arb_flags(), prop::collection::vec(inner, 0..4)).prop_map(|(f, children)| {
				PermissionNode::new(0, "program")
					.with_flags(f)
					.with_children(children)
			})
		})
	}

	fn arb_tree() -> impl Strategy<Value = PermissionTree> {
		prop::collection::vec(arb_node(), 1..4).prop_map(|roots| {
			let mut tree = PermissionTree::new(roots);
			let mut next = 1;
			tree.for_each_mut(|node| {
				node.id = NodeId::new(next);
				next += 1;
			});
			tree
		})
	}

	fn arb_field() -> impl Strategy<Value = PermissionField> {
		prop_oneof![
			Just(PermissionField::Read),
			Just(PermissionField::CreateDelete),
			Just(PermissionField::Update),
		]
	}

	/// Picks an existing node id from a positional seed.
	fn pick(tree: &PermissionTree, seed: usize) -> NodeId {
		let ids: Vec<NodeId> = tree.iter().map(|n| n.id).collect();
		ids[seed % ids.len()]
	}

	fn subtree_ids(tree: &PermissionTree, id: NodeId) -> HashSet<NodeId> {
		tree.find(id)
			.map(|node| node.iter().map(|n| n.id).collect())
			.unwrap_or_default()
	}

	proptest! {
		/// Every node satisfies the read-implication after any toggle.
		#[test]
		fn toggle_preserves_read_implication(
			tree in arb_tree(),
			seed in 0usize..64,
			field in arb_field(),
			value: bool,
		) {
			let id = pick(&tree, seed);
			let outcome = apply_toggle(&tree, id, field, value).unwrap();
			for node in outcome.tree().iter() {
				prop_assert!(node.flags.is_consistent(), "node {} inconsistent: {:?}", node.id, node.flags);
			}
		}

		/// The field reaches the whole subtree and nothing outside it moves.
		#[test]
		fn toggle_propagates_downward_only(
			tree in arb_tree(),
			seed in 0usize..64,
			field in arb_field(),
			value: bool,
		) {
			let id = pick(&tree, seed);
			let affected = subtree_ids(&tree, id);
			let before: HashMap<NodeId, PermissionFlags> =
				tree.iter().map(|n| (n.id, n.flags)).collect();

			let outcome = apply_toggle(&tree, id, field, value).unwrap();

			for node in outcome.tree().iter() {
				if affected.contains(&node.id) {
					prop_assert_eq!(node.flags.get(field), value);
				} else {
					prop_assert_eq!(node.flags, before[&node.id]);
				}
			}
		}

		/// Revoking read clears every flag in the subtree.
		#[test]
		fn read_revocation_clears_subtree(tree in arb_tree(), seed in 0usize..64) {
			let id = pick(&tree, seed);
			let outcome = apply_toggle(&tree, id, PermissionField::Read, false).unwrap();
			let target = outcome.target().unwrap();
			for node in target.iter() {
				prop_assert_eq!(node.flags, PermissionFlags::NONE);
			}
		}

		/// Repeating a toggle changes nothing further.
		#[test]
		fn toggle_is_idempotent(
			tree in arb_tree(),
			seed in 0usize..64,
			field in arb_field(),
			value: bool,
		) {
			let id = pick(&tree, seed);
			let once = apply_toggle(&tree, id, field, value).unwrap();
			let twice = apply_toggle(once.tree(), id, field, value).unwrap();
			prop_assert_eq!(once.tree(), twice.tree());
		}

		/// Shape, names and ids never change.
		#[test]
		fn toggle_keeps_shape(
			tree in arb_tree(),
			seed in 0usize..64,
			field in arb_field(),
			value: bool,
		) {
			let id = pick(&tree, seed);
			let outcome = apply_toggle(&tree, id, field, value).unwrap();
			let before: Vec<NodeId> = tree.iter().map(|n| n.id).collect();
			let after: Vec<NodeId> = outcome.tree().iter().map(|n| n.id).collect();
			prop_assert_eq!(before, after);
		}
	}
}
