// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Optimistic synchronization of one authority's permission tree.
//!
//! [`SyncController::toggle`] applies the cascade and commits the result
//! before it returns, so the presentation layer sees every change in the order
//! it was issued. For a saved authority it also dispatches the node update on
//! the tokio runtime and returns a [`ToggleHandle`] for the answer. Requests
//! reach the store in sequence order. Each answer either reconciles with the
//! store's tree, rolls back to the pre-toggle snapshot, or is dropped because a
//! newer request has taken over.

use std::collections::HashMap;
use std::future::IntoFuture;
use std::sync::Arc;
use std::task::Poll;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use warden_authority_core::{
	apply_toggle, check_ceiling, resolve_ceilings, ActorScope, AuthorityId, NodeId,
	PermissionField, PermissionFilter, PermissionTree, ProgramKind, UpdateNodeResponse,
};

use crate::error::{AuthoritySyncError, EditorError};
use crate::sequence::{RequestSequencer, SequencingPolicy};
use crate::state::{ToggleOutcome, ToggleState};
use crate::store::AuthorityStore;

/// Whether the tree is a local draft or mirrors a saved authority.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EditMode {
	/// Not yet saved; changes stay local until the draft is submitted.
	Draft { kind: ProgramKind },
	/// Saved; every toggle is persisted as it happens.
	Persisted { authority_id: AuthorityId },
}

impl EditMode {
	pub fn authority_id(&self) -> Option<AuthorityId> {
		match self {
			EditMode::Draft { .. } => None,
			EditMode::Persisted { authority_id } => Some(*authority_id),
		}
	}

	pub fn is_draft(&self) -> bool {
		matches!(self, EditMode::Draft { .. })
	}
}

pub(crate) struct ControllerState {
	pub(crate) tree: PermissionTree,
	pub(crate) mode: EditMode,
	pub(crate) sequencer: RequestSequencer,
	/// Outstanding requests per node.
	in_flight: HashMap<NodeId, usize>,
}

/// Hands the store to requests one at a time, in sequence order.
///
/// A request holds the turn only until its first poll of the store call.
struct DispatchLane {
	next: Mutex<u64>,
	turn: Notify,
}

impl DispatchLane {
	fn new() -> Self {
		Self {
			next: Mutex::new(1),
			turn: Notify::new(),
		}
	}

	async fn wait_turn(&self, seq: u64) {
		loop {
			let notified = self.turn.notified();
			if *self.next.lock() >= seq {
				return;
			}
			notified.await;
		}
	}

	fn advance(&self, seq: u64) {
		{
			let mut next = self.next.lock();
			*next = (*next).max(seq + 1);
		}
		self.turn.notify_waiters();
	}
}

/// Releases one in-flight count for a node, at settle time or on drop.
struct InFlight {
	state: Arc<Mutex<ControllerState>>,
	node_id: NodeId,
	released: bool,
}

impl InFlight {
	fn release(mut self, state: &mut ControllerState) {
		release(&mut state.in_flight, self.node_id);
		self.released = true;
	}
}

impl Drop for InFlight {
	fn drop(&mut self) {
		if !self.released {
			release(&mut self.state.lock().in_flight, self.node_id);
		}
	}
}

/// Sole writer of an authority's working tree.
pub struct SyncController {
	pub(crate) store: Arc<dyn AuthorityStore>,
	pub(crate) actor: Arc<ActorScope>,
	pub(crate) state: Arc<Mutex<ControllerState>>,
	lane: Arc<DispatchLane>,
}

impl SyncController {
	/// Wraps `tree`, resolving its ceilings for `actor`.
	pub fn new(
		store: Arc<dyn AuthorityStore>,
		actor: ActorScope,
		mode: EditMode,
		mut tree: PermissionTree,
		policy: SequencingPolicy,
	) -> Self {
		resolve_ceilings(&actor, &mut tree);

		Self {
			store,
			actor: Arc::new(actor),
			state: Arc::new(Mutex::new(ControllerState {
				tree,
				mode,
				sequencer: RequestSequencer::new(policy),
				in_flight: HashMap::new(),
			})),
			lane: Arc::new(DispatchLane::new()),
		}
	}

	/// The current working tree.
	pub fn snapshot(&self) -> PermissionTree {
		self.state.lock().tree.clone()
	}

	pub fn mode(&self) -> EditMode {
		self.state.lock().mode.clone()
	}

	pub fn actor(&self) -> &ActorScope {
		&self.actor
	}

	pub fn policy(&self) -> SequencingPolicy {
		self.state.lock().sequencer.policy()
	}

	/// The most recently issued request number, 0 before any request.
	pub fn latest_seq(&self) -> u64 {
		self.state.lock().sequencer.latest()
	}

	/// True while an update for `node_id` is outstanding.
	pub fn is_in_flight(&self, node_id: NodeId) -> bool {
		self.state.lock().in_flight.contains_key(&node_id)
	}

	pub fn in_flight_nodes(&self) -> Vec<NodeId> {
		let mut nodes: Vec<NodeId> = self.state.lock().in_flight.keys().copied().collect();
		nodes.sort();
		nodes
	}

	/// Ids of nodes matching the highlight filter in the current tree.
	pub fn highlighted(&self, filter: PermissionFilter) -> Vec<NodeId> {
		filter.matching_ids(&self.state.lock().tree)
	}

	/// Sets `field` to `value` on `node_id` and its subtree.
	///
	/// The change is committed locally before this returns. A grant above the
	/// actor's ceiling is rejected with the tree untouched. An unknown node
	/// resolves to [`ToggleOutcome::NoOp`].
	///
	/// For a saved authority the update is spawned onto the current tokio
	/// runtime before this returns, so this must be called from within one. The
	/// toggle settles whether or not the handle is awaited.
	pub fn toggle(
		&self,
		node_id: NodeId,
		field: PermissionField,
		value: bool,
	) -> Result<ToggleHandle, EditorError> {
		let mut state = self.state.lock();

		let outcome = apply_toggle(&state.tree, node_id, field, value)?;
		let (Some(target), Some(flags)) = (state.tree.find(node_id), outcome.target_flags()) else {
			return Ok(ToggleHandle::ready(Ok(ToggleOutcome::NoOp)));
		};

		if let Err(exceeded) = check_ceiling(target, field, value) {
			warn!(
				node_id = %node_id,
				field = %field,
				"rejected grant above ceiling"
			);
			return Err(exceeded.into());
		}

		let snapshot = std::mem::replace(&mut state.tree, outcome.into_tree());

		let authority_id = match &state.mode {
			EditMode::Draft { .. } => {
				debug!(node_id = %node_id, field = %field, value = value, "updated draft tree");
				return Ok(ToggleHandle::ready(Ok(ToggleOutcome::Draft)));
			}
			EditMode::Persisted { authority_id } => *authority_id,
		};

		let seq = state.sequencer.issue(node_id);
		*state.in_flight.entry(node_id).or_insert(0) += 1;
		drop(state);

		debug!(
			authority_id = %authority_id,
			node_id = %node_id,
			field = %field,
			value = value,
			seq = seq,
			"committed optimistic toggle"
		);

		let guard = InFlight {
			state: Arc::clone(&self.state),
			node_id,
			released: false,
		};
		let store = Arc::clone(&self.store);
		let actor = Arc::clone(&self.actor);
		let lane = Arc::clone(&self.lane);

		let task = tokio::spawn(async move {
			let mut request = store.update_node_permission(authority_id, node_id, flags);

			lane.wait_turn(seq).await;
			let first = futures::poll!(&mut request);
			lane.advance(seq);

			let result = match first {
				Poll::Ready(result) => result,
				Poll::Pending => request.await,
			};
			settle(guard, &actor, seq, snapshot, result)
		});

		Ok(ToggleHandle {
			seq: Some(seq),
			inner: HandleInner::Dispatched(task),
		})
	}

	pub(crate) fn mark_persisted(&self, authority_id: AuthorityId) {
		self.state.lock().mode = EditMode::Persisted { authority_id };
	}
}

fn settle(
	guard: InFlight,
	actor: &ActorScope,
	seq: u64,
	snapshot: PermissionTree,
	result: Result<UpdateNodeResponse, AuthoritySyncError>,
) -> Result<ToggleOutcome, EditorError> {
	let node_id = guard.node_id;
	let shared = Arc::clone(&guard.state);
	let mut state = shared.lock();
	guard.release(&mut state);

	let is_latest = state.sequencer.is_latest(node_id, seq);
	let policy = state.sequencer.policy();

	match (ToggleState::Optimistic.settle(is_latest, result.is_ok()), result) {
		(ToggleState::Confirmed, Ok(response)) => {
			let mut tree = response.tree;
			// The store accepted the change, so the optimistic tree stands.
			if let Err(source) = tree.validate() {
				warn!(
					node_id = %node_id,
					seq = seq,
					error = %source,
					"store returned a malformed tree, keeping local state"
				);
				return Err(EditorError::MalformedResponse { node_id, source });
			}
			resolve_ceilings(actor, &mut tree);

			match policy {
				SequencingPolicy::Global => state.tree = tree,
				SequencingPolicy::PerNode => match tree.find(node_id) {
					Some(subtree) => {
						state.tree.replace_subtree(subtree.clone());
					}
					None => warn!(
						node_id = %node_id,
						seq = seq,
						"store response is missing the updated node, keeping local state"
					),
				},
			}

			info!(node_id = %node_id, seq = seq, "permission update confirmed");
			Ok(ToggleOutcome::Confirmed { seq })
		}
		(ToggleState::RolledBack, Err(source)) => {
			match policy {
				SequencingPolicy::Global => state.tree = snapshot,
				SequencingPolicy::PerNode => {
					if let Some(previous) = snapshot.find(node_id) {
						state.tree.replace_subtree(previous.clone());
					}
				}
			}

			warn!(
				node_id = %node_id,
				seq = seq,
				error = %source,
				"permission update failed, rolled back"
			);
			Err(EditorError::RemoteRejected { node_id, source })
		}
		(settled, result) => {
			let latest = state.sequencer.latest();
			match result {
				Ok(_) => debug!(
					node_id = %node_id,
					seq = seq,
					latest = latest,
					state = ?settled,
					"discarding superseded response"
				),
				Err(e) => warn!(
					node_id = %node_id,
					seq = seq,
					latest = latest,
					error = %e,
					"ignoring failure of superseded request"
				),
			}
			Ok(ToggleOutcome::Superseded { seq })
		}
	}
}

fn release(in_flight: &mut HashMap<NodeId, usize>, node_id: NodeId) {
	if let Some(count) = in_flight.get_mut(&node_id) {
		*count -= 1;
		if *count == 0 {
			in_flight.remove(&node_id);
		}
	}
}

enum HandleInner {
	Ready(Result<ToggleOutcome, EditorError>),
	Dispatched(JoinHandle<Result<ToggleOutcome, EditorError>>),
}

/// Remote half of a toggle.
///
/// The update is already on its way when the handle is returned. Dropping the
/// handle detaches from the answer; the toggle still settles.
pub struct ToggleHandle {
	seq: Option<u64>,
	inner: HandleInner,
}

impl ToggleHandle {
	fn ready(result: Result<ToggleOutcome, EditorError>) -> Self {
		Self {
			seq: None,
			inner: HandleInner::Ready(result),
		}
	}

	/// Sequence number of the dispatched request, if one was issued.
	pub fn seq(&self) -> Option<u64> {
		self.seq
	}

	/// True if an update was sent to the store for this toggle.
	pub fn is_dispatched(&self) -> bool {
		matches!(self.inner, HandleInner::Dispatched(_))
	}
}

impl IntoFuture for ToggleHandle {
	type Output = Result<ToggleOutcome, EditorError>;
	type IntoFuture = BoxFuture<'static, Self::Output>;

	fn into_future(self) -> Self::IntoFuture {
		match self.inner {
			HandleInner::Ready(result) => Box::pin(std::future::ready(result)),
			HandleInner::Dispatched(task) => Box::pin(async move { task.await? }),
		}
	}
}

impl std::fmt::Debug for ToggleHandle {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ToggleHandle")
			.field("seq", &self.seq)
			.field("dispatched", &self.is_dispatched())
			.finish()
	}
}
