// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Request sequencing for overlapping node updates.
//!
//! Every dispatched update takes the next number from one counter. When a
//! response comes back, only the newest request may touch shared state; which
//! requests count as "newest" depends on the [`SequencingPolicy`].

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_authority_core::NodeId;

/// How a response decides whether it is still authoritative.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequencingPolicy {
	/// Only the most recent request across the whole tree applies. A toggle
	/// on one node silences late responses for every other node.
	#[default]
	Global,
	/// The most recent request per node applies, and it reconciles or rolls
	/// back only that node's subtree.
	PerNode,
}

impl SequencingPolicy {
	pub fn as_str(&self) -> &'static str {
		match self {
			SequencingPolicy::Global => "global",
			SequencingPolicy::PerNode => "per_node",
		}
	}
}

impl fmt::Display for SequencingPolicy {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SequencingPolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().replace('-', "_").as_str() {
			"global" => Ok(SequencingPolicy::Global),
			"per_node" | "node" => Ok(SequencingPolicy::PerNode),
			_ => Err(format!("invalid sequencing policy: {s}")),
		}
	}
}

#[derive(Debug, Default)]
pub struct RequestSequencer {
	policy: SequencingPolicy,
	counter: u64,
	latest_by_node: HashMap<NodeId, u64>,
	/// Requests numbered at or below this are superseded regardless of policy.
	barrier: u64,
}

impl RequestSequencer {
	pub fn new(policy: SequencingPolicy) -> Self {
		Self {
			policy,
			..Default::default()
		}
	}

	pub fn policy(&self) -> SequencingPolicy {
		self.policy
	}

	/// Allocates the next sequence number for a request on `node_id`.
	pub fn issue(&mut self, node_id: NodeId) -> u64 {
		self.counter += 1;
		self.latest_by_node.insert(node_id, self.counter);
		self.counter
	}

	/// The most recently issued sequence number, 0 before any request.
	pub fn latest(&self) -> u64 {
		self.counter
	}

	pub fn is_latest(&self, node_id: NodeId, seq: u64) -> bool {
		if seq <= self.barrier {
			return false;
		}
		match self.policy {
			SequencingPolicy::Global => seq == self.counter,
			SequencingPolicy::PerNode => self.latest_by_node.get(&node_id) == Some(&seq),
		}
	}

	/// Marks every request issued so far as superseded.
	pub fn supersede_all(&mut self) {
		self.barrier = self.counter;
	}
}
