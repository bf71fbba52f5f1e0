// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use warden_authority_core::{
	AuthorityDetail, AuthorityFilter, AuthorityId, AuthoritySummary, NewAuthority, NodeId,
	PermissionFlags, ProgramKind, ProgramNode, UpdateNodeResponse,
};

use crate::error::AuthoritySyncError;

/// The remote store that owns authorities and their permission trees.
#[async_trait]
pub trait AuthorityStore: Send + Sync {
	async fn fetch_authority_detail(
		&self,
		authority_id: AuthorityId,
	) -> Result<AuthorityDetail, AuthoritySyncError>;

	/// Applies `flags` to one node and returns the store's resulting tree.
	async fn update_node_permission(
		&self,
		authority_id: AuthorityId,
		node_id: NodeId,
		flags: PermissionFlags,
	) -> Result<UpdateNodeResponse, AuthoritySyncError>;

	async fn fetch_authority_list(
		&self,
		filter: &AuthorityFilter,
	) -> Result<Vec<AuthoritySummary>, AuthoritySyncError>;

	/// Flat program catalog used to lay out a new authority.
	async fn fetch_program_catalog(
		&self,
		kind: &ProgramKind,
	) -> Result<Vec<ProgramNode>, AuthoritySyncError>;

	/// Persists a draft authority in one request.
	async fn create_authority(
		&self,
		authority: &NewAuthority,
	) -> Result<AuthoritySummary, AuthoritySyncError>;
}
