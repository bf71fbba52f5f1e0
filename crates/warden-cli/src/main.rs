// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! `warden`: inspect and edit authority permission trees from the terminal.

mod render;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use warden_authority_core::{
	AuthorityId, NodeId, OwnerScope, PermissionField, PermissionFilter, ProgramKind,
};
use warden_authority_sync::{
	load_config, AuthorityClient, AuthorityEditor, AuthorityStore, SyncConfig, ToggleOutcome,
};

use crate::render::{render_candidates, render_tree};

#[derive(Debug, Parser)]
#[command(name = "warden", version, about = "Edit Warden authority permissions")]
struct Cli {
	/// Config file (defaults to $XDG_CONFIG_HOME/warden/authority.toml)
	#[arg(long, global = true)]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
	/// Print an authority's permission tree
	Show {
		authority: AuthorityId,
		/// Mark nodes holding this grant
		#[arg(long, default_value = "none")]
		highlight: PermissionFilter,
	},
	/// Set one permission on a node and its subtree
	Toggle {
		authority: AuthorityId,
		node: NodeId,
		/// read, create-delete or update
		field: PermissionField,
		#[arg(value_enum)]
		state: Switch,
	},
	/// Preview copying another authority's grants onto this one
	Copy {
		authority: AuthorityId,
		#[arg(long)]
		from: AuthorityId,
	},
	/// List authorities this one may copy from
	Candidates { authority: AuthorityId },
	/// Create an authority from the program catalog
	Create {
		#[arg(long)]
		name: String,
		#[arg(long)]
		kind: String,
		#[arg(long)]
		owner_scope: String,
		/// Start from this authority's grants instead of an empty tree
		#[arg(long)]
		copy_from: Option<AuthorityId>,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Switch {
	On,
	Off,
}

impl From<Switch> for bool {
	fn from(switch: Switch) -> Self {
		matches!(switch, Switch::On)
	}
}

fn init_tracing(level: &str) {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| level.to_string().into()),
		)
		.with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
		.init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();

	let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
	init_tracing(&config.log_level);
	debug!(config = ?config, "configuration resolved");

	let store: Arc<dyn AuthorityStore> =
		Arc::new(AuthorityClient::from_config(&config).context("failed to build HTTP client")?);

	run(cli.command, store, &config).await
}

async fn run(
	command: Command,
	store: Arc<dyn AuthorityStore>,
	config: &SyncConfig,
) -> anyhow::Result<()> {
	let actor = AuthorityEditor::resolve_actor(store.as_ref(), config.actor_authority_id)
		.await
		.context("failed to load the acting user's authority")?;

	match command {
		Command::Show {
			authority,
			highlight,
		} => {
			let editor = AuthorityEditor::open(store, actor, authority, config.sequencing).await?;
			println!(
				"{} ({}): {}",
				editor.name().unwrap_or_default(),
				editor.owner_scope(),
				authority
			);
			print!("{}", render_tree(&editor.snapshot(), highlight));
		}
		Command::Toggle {
			authority,
			node,
			field,
			state,
		} => {
			let editor = AuthorityEditor::open(store, actor, authority, config.sequencing).await?;
			let outcome = editor.toggle(node, field, state.into())?.await?;
			match outcome {
				ToggleOutcome::NoOp => anyhow::bail!("node {node} is not part of authority {authority}"),
				outcome => info!(outcome = ?outcome, "toggle settled"),
			}
			print!(
				"{}",
				render_tree(&editor.snapshot(), PermissionFilter::from(field))
			);
		}
		Command::Copy { authority, from } => {
			let editor = AuthorityEditor::open(store, actor, authority, config.sequencing).await?;
			editor.copy_from(from).await?;
			println!("preview of {authority} with grants copied from {from} (not saved):");
			print!("{}", render_tree(&editor.snapshot(), PermissionFilter::None));
		}
		Command::Candidates { authority } => {
			let editor = AuthorityEditor::open(store, actor, authority, config.sequencing).await?;
			print!("{}", render_candidates(&editor.copy_candidates().await?));
		}
		Command::Create {
			name,
			kind,
			owner_scope,
			copy_from,
		} => {
			let mut editor = AuthorityEditor::create(
				store,
				actor,
				ProgramKind::new(kind),
				OwnerScope::new(owner_scope),
				config.sequencing,
			)
			.await?;
			if let Some(source) = copy_from {
				editor.copy_from(source).await?;
			}
			let summary = editor.save_draft(name).await?;
			println!("created authority {} ({})", summary.id, summary.name);
			print!("{}", render_tree(&editor.snapshot(), PermissionFilter::None));
		}
	}

	Ok(())
}
