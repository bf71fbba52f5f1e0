// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Wholesale replacement of the working tree from another authority.

use tracing::{info, instrument, warn};
use warden_authority_core::{clamp_to_ceilings, resolve_ceilings, AuthorityId, PermissionTree};

use crate::controller::SyncController;
use crate::error::EditorError;

impl SyncController {
	/// Replaces the working tree with `source` in one step.
	///
	/// Ceilings carried by `source` are dropped and resolved again for this
	/// session's actor, and grants above them are lowered to the ceiling. Nothing
	/// is sent to the store. Toggles still waiting on the store are superseded,
	/// so their answers cannot overwrite the copy.
	pub fn apply_bulk_copy(&self, mut source: PermissionTree) -> Result<(), EditorError> {
		source.validate()?;
		source.clear_ceilings();
		resolve_ceilings(&self.actor, &mut source);
		let clamped = clamp_to_ceilings(&mut source);

		let mut state = self.state.lock();
		state.sequencer.supersede_all();
		state.tree = source;

		info!(
			authority_id = ?state.mode.authority_id(),
			superseded_through = state.sequencer.latest(),
			clamped = clamped,
			"applied bulk copy"
		);
		Ok(())
	}

	/// Fetches `authority_id` and copies its tree.
	///
	/// The local tree is untouched when the fetch fails.
	#[instrument(skip(self), fields(authority_id = %authority_id))]
	pub async fn copy_from(&self, authority_id: AuthorityId) -> Result<(), EditorError> {
		let detail = match self.store.fetch_authority_detail(authority_id).await {
			Ok(detail) => detail,
			Err(source) => {
				warn!(error = %source, "copy source unavailable");
				return Err(EditorError::CopySourceUnavailable {
					authority_id,
					source,
				});
			}
		};

		self.apply_bulk_copy(detail.tree)
	}
}
