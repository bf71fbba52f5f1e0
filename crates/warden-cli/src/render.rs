// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Plain-text rendering of permission trees.

use warden_authority_core::{
	AuthoritySummary, PermissionFilter, PermissionFlags, PermissionNode, PermissionTree,
};

fn triple(flags: PermissionFlags) -> String {
	[
		(flags.can_read, 'R'),
		(flags.can_create_delete, 'C'),
		(flags.can_update, 'U'),
	]
	.iter()
	.map(|(on, c)| if *on { *c } else { '-' })
	.collect()
}

/// One line per node: highlight marker, grant, ceiling, id and name.
///
/// ```text
/// * [RC-] <RCU>     1 Stores
///   [R--] <RCU>     2   Store list
/// ```
pub fn render_tree(tree: &PermissionTree, highlight: PermissionFilter) -> String {
	fn walk(out: &mut String, node: &PermissionNode, depth: usize, highlight: PermissionFilter) {
		let marker = if highlight.matches(node) { '*' } else { ' ' };
		out.push_str(&format!(
			"{marker} [{}] <{}> {:>5} {}{}\n",
			triple(node.flags),
			triple(node.ceiling),
			node.id.as_i64(),
			"  ".repeat(depth),
			node.name
		));
		for child in &node.children {
			walk(out, child, depth + 1, highlight);
		}
	}

	let mut out = String::new();
	for root in tree.roots() {
		walk(&mut out, root, 0, highlight);
	}
	out
}

pub fn render_candidates(candidates: &[AuthoritySummary]) -> String {
	if candidates.is_empty() {
		return "no authorities share this owner scope\n".to_string();
	}

	candidates
		.iter()
		.map(|summary| {
			format!(
				"{:>5} {} ({})\n",
				summary.id.as_i64(),
				summary.name,
				summary.owner_scope
			)
		})
		.collect()
}
