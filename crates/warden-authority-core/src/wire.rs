// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Payloads exchanged with the authority store.

use serde::{Deserialize, Serialize};

use crate::model::{AuthorityId, OwnerScope, PermissionTree, ProgramKind};

/// An authority as returned when opened for editing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityDetail {
	pub id: AuthorityId,
	pub name: String,
	pub owner_scope: OwnerScope,
	pub tree: PermissionTree,
}

/// List entry for an authority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritySummary {
	pub id: AuthorityId,
	pub name: String,
	pub owner_scope: OwnerScope,
}

impl From<&AuthorityDetail> for AuthoritySummary {
	fn from(detail: &AuthorityDetail) -> Self {
		Self {
			id: detail.id,
			name: detail.name.clone(),
			owner_scope: detail.owner_scope.clone(),
		}
	}
}

/// Filter for listing authorities.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityFilter {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub owner_scope: Option<OwnerScope>,
}

impl AuthorityFilter {
	pub fn owner_scope(scope: OwnerScope) -> Self {
		Self {
			owner_scope: Some(scope),
		}
	}

	pub fn accepts(&self, summary: &AuthoritySummary) -> bool {
		self
			.owner_scope
			.as_ref()
			.map(|scope| scope == &summary.owner_scope)
			.unwrap_or(true)
	}
}

/// The store's authoritative tree after applying a node update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateNodeResponse {
	pub tree: PermissionTree,
}

/// A draft authority submitted in full on save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAuthority {
	pub name: String,
	pub owner_scope: OwnerScope,
	pub kind: ProgramKind,
	pub tree: PermissionTree,
}
