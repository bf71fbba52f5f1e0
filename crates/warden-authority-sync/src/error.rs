// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;
use warden_authority_core::{AuthorityId, CeilingExceeded, NodeId, TreeError};
use warden_common_http::RetryableError;

/// Failures talking to the authority store.
#[derive(Debug, Error)]
pub enum AuthoritySyncError {
	#[error("network error: {0}")]
	Network(#[from] reqwest::Error),

	#[error("server error: {status} - {message}")]
	Server { status: StatusCode, message: String },

	#[error("request rejected: {status} - {message}")]
	Rejected { status: StatusCode, message: String },

	#[error("not found: {0}")]
	NotFound(String),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("not authorized to perform this request")]
	Unauthorized,

	#[error("invalid URL: {0}")]
	InvalidUrl(String),

	#[error("request timeout")]
	Timeout,

	#[error("store unavailable: {0}")]
	Unavailable(String),
}

impl RetryableError for AuthoritySyncError {
	fn is_retryable(&self) -> bool {
		match self {
			Self::Network(e) => e.is_retryable(),
			Self::Server { status, .. } => matches!(
				*status,
				StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
			),
			Self::Rejected { status, .. } => *status == StatusCode::TOO_MANY_REQUESTS,
			Self::Timeout => true,
			Self::Unavailable(_) => true,
			Self::NotFound(_) | Self::Conflict(_) | Self::Unauthorized | Self::InvalidUrl(_) => false,
		}
	}
}

/// Failures surfaced to whoever drives an editing session.
#[derive(Debug, Error)]
pub enum EditorError {
	#[error(transparent)]
	CeilingExceeded(#[from] CeilingExceeded),

	#[error("malformed permission tree: {0}")]
	Tree(#[from] TreeError),

	#[error("updating node {node_id} failed; local changes were rolled back")]
	RemoteRejected {
		node_id: NodeId,
		#[source]
		source: AuthoritySyncError,
	},

	#[error("could not load authority {authority_id} to copy from")]
	CopySourceUnavailable {
		authority_id: AuthorityId,
		#[source]
		source: AuthoritySyncError,
	},

	#[error("authority {0} is already saved")]
	AlreadyPersisted(AuthorityId),

	#[error("store accepted the update of node {node_id} but returned a malformed tree")]
	MalformedResponse {
		node_id: NodeId,
		#[source]
		source: TreeError,
	},

	#[error("toggle task stopped before settling: {0}")]
	TaskFailed(#[from] tokio::task::JoinError),

	#[error(transparent)]
	Sync(#[from] AuthoritySyncError),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to read {path}: {source}")]
	FileRead {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("TOML parse error in {path}: {source}")]
	TomlParse {
		path: PathBuf,
		#[source]
		source: toml::de::Error,
	},

	#[error("missing required setting: {0}")]
	MissingField(String),

	#[error("invalid value for {key}: {message}")]
	InvalidValue { key: String, message: String },
}
