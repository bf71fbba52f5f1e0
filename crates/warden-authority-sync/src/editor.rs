// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Editing sessions for a single authority.
//!
//! A session either opens a saved authority, in which case every toggle is
//! persisted as it happens, or drafts a new one from the program catalog and
//! submits the whole tree once on save.

use std::sync::Arc;

use tracing::{debug, info, instrument};
use warden_authority_core::{
	build_tree, ActorScope, AuthorityFilter, AuthorityId, AuthoritySummary, NewAuthority, NodeId,
	OwnerScope, PermissionField, PermissionTree, ProgramKind,
};

use crate::controller::{EditMode, SyncController, ToggleHandle};
use crate::error::EditorError;
use crate::sequence::SequencingPolicy;
use crate::store::AuthorityStore;

pub struct AuthorityEditor {
	store: Arc<dyn AuthorityStore>,
	controller: SyncController,
	owner_scope: OwnerScope,
	name: Option<String>,
}

impl AuthorityEditor {
	/// Loads the acting user's own grants.
	///
	/// `None`, or an authority with an empty tree, yields an unrestricted actor.
	pub async fn resolve_actor(
		store: &dyn AuthorityStore,
		actor_authority: Option<AuthorityId>,
	) -> Result<ActorScope, EditorError> {
		let Some(authority_id) = actor_authority else {
			return Ok(ActorScope::Unrestricted);
		};

		let detail = store.fetch_authority_detail(authority_id).await?;
		detail.tree.validate()?;
		debug!(
			authority_id = %authority_id,
			nodes = detail.tree.len(),
			"resolved actor authority"
		);
		Ok(ActorScope::from_own_tree(detail.tree))
	}

	/// Opens a saved authority for incremental editing.
	#[instrument(skip(store, actor), fields(authority_id = %authority_id))]
	pub async fn open(
		store: Arc<dyn AuthorityStore>,
		actor: ActorScope,
		authority_id: AuthorityId,
		policy: SequencingPolicy,
	) -> Result<Self, EditorError> {
		let detail = store.fetch_authority_detail(authority_id).await?;
		detail.tree.validate()?;

		info!(
			name = %detail.name,
			owner_scope = %detail.owner_scope,
			nodes = detail.tree.len(),
			"opened authority"
		);

		let controller = SyncController::new(
			Arc::clone(&store),
			actor,
			EditMode::Persisted { authority_id },
			detail.tree,
			policy,
		);

		Ok(Self {
			store,
			controller,
			owner_scope: detail.owner_scope,
			name: Some(detail.name),
		})
	}

	/// Starts a draft authority with every flag cleared, laid out from the
	/// program catalog for `kind`.
	#[instrument(skip(store, actor), fields(kind = %kind, owner_scope = %owner_scope))]
	pub async fn create(
		store: Arc<dyn AuthorityStore>,
		actor: ActorScope,
		kind: ProgramKind,
		owner_scope: OwnerScope,
		policy: SequencingPolicy,
	) -> Result<Self, EditorError> {
		let programs = store.fetch_program_catalog(&kind).await?;
		let tree = build_tree(&programs)?;

		debug!(programs = programs.len(), "built draft tree from catalog");

		let controller =
			SyncController::new(Arc::clone(&store), actor, EditMode::Draft { kind }, tree, policy);

		Ok(Self {
			store,
			controller,
			owner_scope,
			name: None,
		})
	}

	pub fn controller(&self) -> &SyncController {
		&self.controller
	}

	pub fn owner_scope(&self) -> &OwnerScope {
		&self.owner_scope
	}

	pub fn name(&self) -> Option<&str> {
		self.name.as_deref()
	}

	pub fn authority_id(&self) -> Option<AuthorityId> {
		self.controller.mode().authority_id()
	}

	pub fn snapshot(&self) -> PermissionTree {
		self.controller.snapshot()
	}

	pub fn toggle(
		&self,
		node_id: NodeId,
		field: PermissionField,
		value: bool,
	) -> Result<ToggleHandle, EditorError> {
		self.controller.toggle(node_id, field, value)
	}

	pub async fn copy_from(&self, authority_id: AuthorityId) -> Result<(), EditorError> {
		self.controller.copy_from(authority_id).await
	}

	/// Authorities this one may copy from: same owner scope, excluding itself.
	pub async fn copy_candidates(&self) -> Result<Vec<AuthoritySummary>, EditorError> {
		let filter = AuthorityFilter::owner_scope(self.owner_scope.clone());
		let own_id = self.authority_id();

		let candidates: Vec<AuthoritySummary> = self
			.store
			.fetch_authority_list(&filter)
			.await?
			.into_iter()
			.filter(|summary| filter.accepts(summary) && Some(summary.id) != own_id)
			.collect();

		debug!(
			owner_scope = %self.owner_scope,
			count = candidates.len(),
			"listed copy candidates"
		);
		Ok(candidates)
	}

	/// Submits a draft in one request and switches the session to incremental
	/// editing of the saved authority.
	#[instrument(skip(self, name), fields(owner_scope = %self.owner_scope))]
	pub async fn save_draft(
		&mut self,
		name: impl Into<String>,
	) -> Result<AuthoritySummary, EditorError> {
		let kind = match self.controller.mode() {
			EditMode::Draft { kind } => kind,
			EditMode::Persisted { authority_id } => {
				return Err(EditorError::AlreadyPersisted(authority_id))
			}
		};

		let name = name.into();
		let authority = NewAuthority {
			name: name.clone(),
			owner_scope: self.owner_scope.clone(),
			kind,
			tree: self.controller.snapshot(),
		};

		let summary = self.store.create_authority(&authority).await?;
		self.controller.mark_persisted(summary.id);
		self.name = Some(name);

		info!(authority_id = %summary.id, name = %summary.name, "created authority");
		Ok(summary)
	}
}

impl std::fmt::Debug for AuthorityEditor {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("AuthorityEditor")
			.field("mode", &self.controller.mode())
			.field("owner_scope", &self.owner_scope)
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}
