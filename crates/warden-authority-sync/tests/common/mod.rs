// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-memory authority store with scripted failures and held responses.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use warden_authority_core::{
	apply_toggle, AuthorityDetail, AuthorityFilter, AuthorityId, AuthoritySummary, NewAuthority,
	NodeId, OwnerScope, PermissionField, PermissionFlags, PermissionNode, PermissionTree,
	ProgramKind, ProgramNode, UpdateNodeResponse,
};
use warden_authority_sync::{AuthorityStore, AuthoritySyncError};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
	FetchDetail(AuthorityId),
	Update {
		authority_id: AuthorityId,
		node_id: NodeId,
		flags: PermissionFlags,
	},
	List(AuthorityFilter),
	Catalog(ProgramKind),
	Create(String),
}

#[derive(Default)]
struct Inner {
	authorities: HashMap<AuthorityId, AuthorityDetail>,
	catalogs: HashMap<ProgramKind, Vec<ProgramNode>>,
	failures: HashMap<NodeId, VecDeque<AuthoritySyncError>>,
	holds: HashMap<NodeId, Arc<Notify>>,
	calls: Vec<Call>,
	created: Vec<NewAuthority>,
	next_id: i64,
}

#[derive(Default)]
pub struct ScriptedStore {
	inner: Mutex<Inner>,
	updates: Notify,
}

impl ScriptedStore {
	pub fn new() -> Self {
		Self {
			inner: Mutex::new(Inner {
				next_id: 1000,
				..Default::default()
			}),
			updates: Notify::new(),
		}
	}

	pub fn with_authority(self, detail: AuthorityDetail) -> Self {
		self.inner.lock().authorities.insert(detail.id, detail);
		self
	}

	pub fn with_catalog(self, kind: &str, programs: Vec<ProgramNode>) -> Self {
		self
			.inner
			.lock()
			.catalogs
			.insert(ProgramKind::new(kind), programs);
		self
	}

	/// The next update of `node_id` is refused with `error` and not applied.
	pub fn fail_next(&self, node_id: NodeId, error: AuthoritySyncError) {
		self
			.inner
			.lock()
			.failures
			.entry(node_id)
			.or_default()
			.push_back(error);
	}

	/// Holds update answers for `node_id` until [`ScriptedStore::release`].
	pub fn hold(&self, node_id: NodeId) {
		self
			.inner
			.lock()
			.holds
			.insert(node_id, Arc::new(Notify::new()));
	}

	/// Lets one held answer for `node_id` through.
	pub fn release(&self, node_id: NodeId) {
		if let Some(gate) = self.inner.lock().holds.get(&node_id) {
			gate.notify_one();
		}
	}

	/// Replaces the server's tree out of band.
	pub fn set_tree(&self, authority_id: AuthorityId, tree: PermissionTree) {
		if let Some(detail) = self.inner.lock().authorities.get_mut(&authority_id) {
			detail.tree = tree;
		}
	}

	pub fn server_tree(&self, authority_id: AuthorityId) -> Option<PermissionTree> {
		self
			.inner
			.lock()
			.authorities
			.get(&authority_id)
			.map(|d| d.tree.clone())
	}

	pub fn calls(&self) -> Vec<Call> {
		self.inner.lock().calls.clone()
	}

	pub fn updated_nodes(&self) -> Vec<NodeId> {
		self
			.inner
			.lock()
			.calls
			.iter()
			.filter_map(|call| match call {
				Call::Update { node_id, .. } => Some(*node_id),
				_ => None,
			})
			.collect()
	}

	pub fn created(&self) -> Vec<NewAuthority> {
		self.inner.lock().created.clone()
	}

	/// Waits until at least `count` update requests have reached the store.
	pub async fn wait_for_updates(&self, count: usize) {
		loop {
			let notified = self.updates.notified();
			if self.updated_nodes().len() >= count {
				return;
			}
			notified.await;
		}
	}
}

/// Applies `flags` to `node_id` the way the server does: each changed field
/// cascades to the subtree.
pub fn server_apply(tree: &PermissionTree, node_id: NodeId, flags: PermissionFlags) -> PermissionTree {
	let mut tree = tree.clone();
	for field in PermissionField::ALL {
		let Some(node) = tree.find(node_id) else {
			break;
		};
		let wanted = flags.get(field);
		if node.flags.get(field) != wanted {
			tree = apply_toggle(&tree, node_id, field, wanted)
				.expect("server tree is well formed")
				.into_tree();
		}
	}
	tree
}

#[async_trait]
impl AuthorityStore for ScriptedStore {
	async fn fetch_authority_detail(
		&self,
		authority_id: AuthorityId,
	) -> Result<AuthorityDetail, AuthoritySyncError> {
		let mut inner = self.inner.lock();
		inner.calls.push(Call::FetchDetail(authority_id));
		inner
			.authorities
			.get(&authority_id)
			.cloned()
			.ok_or_else(|| AuthoritySyncError::NotFound(format!("authority {authority_id}")))
	}

	async fn update_node_permission(
		&self,
		authority_id: AuthorityId,
		node_id: NodeId,
		flags: PermissionFlags,
	) -> Result<UpdateNodeResponse, AuthoritySyncError> {
		let (failure, gate) = {
			let mut inner = self.inner.lock();
			inner.calls.push(Call::Update {
				authority_id,
				node_id,
				flags,
			});

			let failure = inner
				.failures
				.get_mut(&node_id)
				.and_then(|queue| queue.pop_front());
			let gate = inner.holds.get(&node_id).cloned();

			let Some(detail) = inner.authorities.get_mut(&authority_id) else {
				return Err(AuthoritySyncError::NotFound(format!("authority {authority_id}")));
			};
			if failure.is_none() {
				detail.tree = server_apply(&detail.tree, node_id, flags);
			}
			(failure, gate)
		};
		self.updates.notify_waiters();

		if let Some(gate) = gate {
			gate.notified().await;
		}

		match failure {
			Some(error) => Err(error),
			None => {
				let tree = self
					.server_tree(authority_id)
					.ok_or_else(|| AuthoritySyncError::NotFound(format!("authority {authority_id}")))?;
				Ok(UpdateNodeResponse { tree })
			}
		}
	}

	async fn fetch_authority_list(
		&self,
		filter: &AuthorityFilter,
	) -> Result<Vec<AuthoritySummary>, AuthoritySyncError> {
		let mut inner = self.inner.lock();
		inner.calls.push(Call::List(filter.clone()));
		let mut summaries: Vec<AuthoritySummary> = inner
			.authorities
			.values()
			.map(AuthoritySummary::from)
			.filter(|summary| filter.accepts(summary))
			.collect();
		summaries.sort_by_key(|s| s.id);
		Ok(summaries)
	}

	async fn fetch_program_catalog(
		&self,
		kind: &ProgramKind,
	) -> Result<Vec<ProgramNode>, AuthoritySyncError> {
		let mut inner = self.inner.lock();
		inner.calls.push(Call::Catalog(kind.clone()));
		inner
			.catalogs
			.get(kind)
			.cloned()
			.ok_or_else(|| AuthoritySyncError::NotFound(format!("catalog {kind}")))
	}

	async fn create_authority(
		&self,
		authority: &NewAuthority,
	) -> Result<AuthoritySummary, AuthoritySyncError> {
		let mut inner = self.inner.lock();
		inner.calls.push(Call::Create(authority.name.clone()));
		inner.next_id += 1;
		let detail = AuthorityDetail {
			id: AuthorityId::new(inner.next_id),
			name: authority.name.clone(),
			owner_scope: authority.owner_scope.clone(),
			tree: authority.tree.clone(),
		};
		inner.created.push(authority.clone());
		let summary = AuthoritySummary::from(&detail);
		inner.authorities.insert(detail.id, detail);
		Ok(summary)
	}
}

pub fn flags(read: bool, create_delete: bool, update: bool) -> PermissionFlags {
	PermissionFlags::new(read, create_delete, update)
}

pub fn detail(id: i64, name: &str, scope: &str, tree: PermissionTree) -> AuthorityDetail {
	AuthorityDetail {
		id: AuthorityId::new(id),
		name: name.to_string(),
		owner_scope: OwnerScope::new(scope),
		tree,
	}
}

/// `Stores(1) -> [List(2), Edit(3)]`, `Payroll(10) -> [Run(11)]`.
pub fn sample_tree() -> PermissionTree {
	PermissionTree::new(vec![
		PermissionNode::new(1, "Stores")
			.with_flags(flags(true, true, false))
			.with_children(vec![
				PermissionNode::new(2, "Store list").with_flags(flags(true, false, false)),
				PermissionNode::new(3, "Store edit").with_flags(flags(true, true, false)),
			]),
		PermissionNode::new(10, "Payroll")
			.with_flags(flags(true, false, false))
			.with_children(vec![
				PermissionNode::new(11, "Payroll run").with_flags(flags(true, false, false))
			]),
	])
}

/// Flags of every node in pre-order, ignoring ceilings.
pub fn flag_map(tree: &PermissionTree) -> Vec<(NodeId, PermissionFlags)> {
	tree.iter().map(|n| (n.id, n.flags)).collect()
}
