// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Keeps a Warden authority's permission tree in step with the remote store.
//!
//! This crate provides:
//! - [`SyncController`]: optimistic local commits, sequenced remote updates,
//!   rollback of the newest failed request and bulk copy
//! - [`AuthorityEditor`]: create and edit sessions built on the controller
//! - [`AuthorityClient`]: the HTTP [`AuthorityStore`]
//! - Layered configuration ([`load_config`])
//!
//! # Usage
//!
//! ```ignore
//! let config = warden_authority_sync::load_config(None)?;
//! let store: Arc<dyn AuthorityStore> = Arc::new(AuthorityClient::from_config(&config)?);
//! let actor = AuthorityEditor::resolve_actor(store.as_ref(), config.actor_authority_id).await?;
//! let editor = AuthorityEditor::open(store, actor, AuthorityId::new(7), config.sequencing).await?;
//!
//! editor.toggle(NodeId::new(3), PermissionField::Update, true)?.await?;
//! ```

pub mod client;
pub mod config;
pub mod controller;
mod copy;
pub mod editor;
pub mod error;
pub mod sequence;
pub mod state;
pub mod store;

pub use client::AuthorityClient;
pub use config::{
	default_config_path, load_config, load_from_sources, ConfigSource, DefaultsSource, EnvSource,
	Precedence, SyncConfig, SyncConfigLayer, TomlSource,
};
pub use controller::{EditMode, SyncController, ToggleHandle};
pub use editor::AuthorityEditor;
pub use error::{AuthoritySyncError, ConfigError, EditorError};
pub use sequence::{RequestSequencer, SequencingPolicy};
pub use state::{ToggleOutcome, ToggleState};
pub use store::AuthorityStore;
