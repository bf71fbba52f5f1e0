// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Lifecycle of a single toggle.
//!
//! ```text
//! Optimistic --(newest, ok)----> Confirmed
//!            --(newest, error)-> RolledBack
//!            --(superseded)----> Superseded
//! ```

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleState {
	/// Committed locally, remote answer pending.
	Optimistic,
	/// The store's tree replaced the local one.
	Confirmed,
	/// The store refused and the pre-toggle snapshot was restored.
	RolledBack,
	/// A newer request owns the outcome; the answer was ignored.
	Superseded,
}

impl ToggleState {
	/// Transition taken when the remote answer arrives. Settled states are final.
	pub fn settle(self, is_latest: bool, succeeded: bool) -> ToggleState {
		match self {
			ToggleState::Optimistic => match (is_latest, succeeded) {
				(false, _) => ToggleState::Superseded,
				(true, true) => ToggleState::Confirmed,
				(true, false) => ToggleState::RolledBack,
			},
			settled => settled,
		}
	}
}

/// What a toggle ended up doing, for toggles that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
	/// The target was not in the tree; nothing changed.
	NoOp,
	/// Draft authority: the change is local until the draft is saved.
	Draft,
	/// The store confirmed and its tree was applied.
	Confirmed { seq: u64 },
	/// A newer request superseded this one; its answer was dropped.
	Superseded { seq: u64 },
}
