// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! HTTP implementation of [`AuthorityStore`].
//!
//! Reads are retried with backoff. Node updates and authority creation are
//! sent exactly once; the controller owns what happens after a failure.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, error, info, instrument};
use url::Url;
use warden_authority_core::{
	AuthorityDetail, AuthorityFilter, AuthorityId, AuthoritySummary, NewAuthority, NodeId,
	PermissionFlags, ProgramKind, ProgramNode, UpdateNodeResponse,
};
use warden_common_http::RetryConfig;

use crate::config::SyncConfig;
use crate::error::AuthoritySyncError;
use crate::store::AuthorityStore;

pub struct AuthorityClient {
	base_url: Url,
	http: reqwest::Client,
	retry_config: RetryConfig,
	auth_token: Option<String>,
}

impl AuthorityClient {
	pub fn new(base_url: &str, http: reqwest::Client) -> Result<Self, AuthoritySyncError> {
		let base_url =
			Url::parse(base_url).map_err(|e| AuthoritySyncError::InvalidUrl(e.to_string()))?;

		Ok(Self {
			base_url: with_trailing_slash(base_url),
			http,
			retry_config: RetryConfig::default(),
			auth_token: None,
		})
	}

	/// Builds a client with the configured timeout, token and read retries.
	pub fn from_config(config: &SyncConfig) -> Result<Self, AuthoritySyncError> {
		let http = warden_common_http::new_client_with_timeout(config.request_timeout)?;
		let mut client = Self::new(config.base_url.as_str(), http)?.with_retry_config(RetryConfig {
			max_attempts: config.max_read_attempts,
			..RetryConfig::default()
		});
		if let Some(token) = &config.auth_token {
			client = client.with_auth_token(token.clone());
		}
		Ok(client)
	}

	pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
		self.auth_token = Some(token.into());
		self
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
		if let Some(token) = &self.auth_token {
			req.bearer_auth(token)
		} else {
			req
		}
	}

	fn url(&self, path: &str) -> Result<Url, AuthoritySyncError> {
		self
			.base_url
			.join(path)
			.map_err(|e| AuthoritySyncError::InvalidUrl(e.to_string()))
	}

	/// GET with retries on transient failures.
	async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AuthoritySyncError> {
		let response = warden_common_http::retry(&self.retry_config, || async {
			let req = self.http.get(url.clone());
			let response = self.apply_auth(req).send().await.map_err(transport)?;
			check_status(response).await
		})
		.await?;

		response.json().await.map_err(AuthoritySyncError::Network)
	}
}

#[async_trait]
impl AuthorityStore for AuthorityClient {
	#[instrument(skip(self), fields(authority_id = %authority_id))]
	async fn fetch_authority_detail(
		&self,
		authority_id: AuthorityId,
	) -> Result<AuthorityDetail, AuthoritySyncError> {
		let url = self.url(&format!("authorities/{authority_id}"))?;
		debug!(url = %url, "fetching authority");

		let detail: AuthorityDetail = self.get_json(url).await?;
		debug!(nodes = detail.tree.len(), "fetched authority");
		Ok(detail)
	}

	#[instrument(skip(self, flags), fields(authority_id = %authority_id, node_id = %node_id))]
	async fn update_node_permission(
		&self,
		authority_id: AuthorityId,
		node_id: NodeId,
		flags: PermissionFlags,
	) -> Result<UpdateNodeResponse, AuthoritySyncError> {
		let url = self.url(&format!("authorities/{authority_id}/nodes/{node_id}"))?;
		debug!(
			url = %url,
			can_read = flags.can_read,
			can_create_delete = flags.can_create_delete,
			can_update = flags.can_update,
			"updating node permission"
		);

		let req = self.http.put(url).json(&flags);
		let response = self.apply_auth(req).send().await.map_err(|e| {
			error!(error = %e, "node update request failed");
			transport(e)
		})?;
		let response = check_status(response).await?;

		response.json().await.map_err(AuthoritySyncError::Network)
	}

	#[instrument(skip(self))]
	async fn fetch_authority_list(
		&self,
		filter: &AuthorityFilter,
	) -> Result<Vec<AuthoritySummary>, AuthoritySyncError> {
		let mut url = self.url("authorities")?;
		if let Some(scope) = &filter.owner_scope {
			url.query_pairs_mut().append_pair("owner_scope", scope.as_str());
		}

		let summaries: Vec<AuthoritySummary> = self.get_json(url).await?;
		debug!(count = summaries.len(), "listed authorities");
		Ok(summaries)
	}

	#[instrument(skip(self), fields(kind = %kind))]
	async fn fetch_program_catalog(
		&self,
		kind: &ProgramKind,
	) -> Result<Vec<ProgramNode>, AuthoritySyncError> {
		let mut url = self.url("programs")?;
		url.query_pairs_mut().append_pair("kind", kind.as_str());

		let programs: Vec<ProgramNode> = self.get_json(url).await?;
		debug!(count = programs.len(), "fetched program catalog");
		Ok(programs)
	}

	#[instrument(skip(self, authority), fields(name = %authority.name))]
	async fn create_authority(
		&self,
		authority: &NewAuthority,
	) -> Result<AuthoritySummary, AuthoritySyncError> {
		let url = self.url("authorities")?;

		let req = self.http.post(url).json(authority);
		let response = self.apply_auth(req).send().await.map_err(|e| {
			error!(error = %e, "create authority request failed");
			transport(e)
		})?;
		let response = check_status(response).await?;

		let summary: AuthoritySummary = response.json().await.map_err(AuthoritySyncError::Network)?;
		info!(authority_id = %summary.id, "authority created on server");
		Ok(summary)
	}
}

fn with_trailing_slash(mut url: Url) -> Url {
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());
		url.set_path(&path);
	}
	url
}

fn transport(e: reqwest::Error) -> AuthoritySyncError {
	if e.is_timeout() {
		AuthoritySyncError::Timeout
	} else {
		AuthoritySyncError::Network(e)
	}
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, AuthoritySyncError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let message = response.text().await.unwrap_or_default();
	Err(match status {
		StatusCode::NOT_FOUND => AuthoritySyncError::NotFound(message),
		StatusCode::CONFLICT => AuthoritySyncError::Conflict(message),
		StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AuthoritySyncError::Unauthorized,
		status if status.is_server_error() => AuthoritySyncError::Server { status, message },
		status => AuthoritySyncError::Rejected { status, message },
	})
}
