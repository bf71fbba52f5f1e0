// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Core types for Warden authority permissions.
//!
//! An authority grants read, create/delete and update rights over a tree of
//! programs. This crate holds the pure parts of editing such a tree:
//!
//! - [`PermissionTree`] / [`PermissionNode`]: the tree and its flags
//! - [`ActorScope`] and [`resolve_ceilings`]: what the acting user may grant
//! - [`apply_toggle`]: the cascade rules for a single-field change
//! - [`PermissionFilter`]: highlight predicate for the presentation layer
//! - [`build_tree`]: synthesis of a blank tree from the program catalog
//!
//! Synchronization with the remote store lives in `warden-authority-sync`.
//!
//! # Example
//!
//! ```
//! use warden_authority_core::{
//!     apply_toggle, with_ceilings, ActorScope, NodeId, PermissionField, PermissionNode,
//!     PermissionTree,
//! };
//!
//! let tree = PermissionTree::new(vec![
//!     PermissionNode::new(1, "Stores").with_children(vec![PermissionNode::new(2, "Store list")]),
//! ]);
//! let tree = with_ceilings(&ActorScope::Unrestricted, &tree);
//!
//! let outcome = apply_toggle(&tree, NodeId::new(1), PermissionField::Update, true).unwrap();
//! let child = outcome.tree().find(NodeId::new(2)).unwrap();
//! assert!(child.flags.can_update && child.flags.can_read);
//! ```

pub mod cascade;
pub mod catalog;
pub mod ceiling;
pub mod error;
pub mod filter;
pub mod model;
pub mod wire;

pub use cascade::{apply_toggle, CascadeOutcome};
pub use catalog::{build_tree, ProgramNode};
pub use ceiling::{
	check_ceiling, clamp_to_ceilings, resolve_ceilings, with_ceilings, ActorScope,
};
pub use error::{CeilingExceeded, Result, TreeError};
pub use filter::PermissionFilter;
pub use model::{
	AuthorityId, NodeId, OwnerScope, PermissionField, PermissionFlags, PermissionNode,
	PermissionTree, ProgramKind,
};
pub use wire::{AuthorityDetail, AuthorityFilter, AuthoritySummary, NewAuthority, UpdateNodeResponse};
