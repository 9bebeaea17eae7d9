// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::constants::*;
use crate::Credential;
use appsign_core::time::{now, parse_rfc3339, DateTime};
use appsign_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::CONTENT_LENGTH;
use http::{Method, StatusCode};
use log::debug;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;

/// 21600s (6h) is recommended by AWS.
const TOKEN_TTL_SECONDS: i64 = 21600;

/// ImdsCredentialProvider loads credential from the EC2 instance metadata
/// service using IMDSv2 session tokens.
///
/// Set `AWS_EC2_METADATA_DISABLED=true` to turn it off, or
/// `AWS_EC2_METADATA_SERVICE_ENDPOINT` to point it at another endpoint.
#[derive(Debug, Clone, Default)]
pub struct ImdsCredentialProvider {
    endpoint: Option<String>,
    token: Arc<Mutex<Option<(String, DateTime)>>>,
}

impl ImdsCredentialProvider {
    /// Create a new `ImdsCredentialProvider` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the endpoint for the metadata service.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn endpoint(&self, ctx: &Context) -> String {
        self.endpoint
            .clone()
            .or_else(|| {
                ctx.env_var(AWS_EC2_METADATA_SERVICE_ENDPOINT)
                    .filter(|v| !v.is_empty())
            })
            .unwrap_or_else(|| EC2_METADATA_ENDPOINT.to_string())
            .trim_end_matches('/')
            .to_string()
    }

    async fn load_token(&self, ctx: &Context, endpoint: &str) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some((token, expires_in)) = cached.as_ref() {
            if *expires_in > now() {
                return Ok(token.clone());
            }
        }

        let url = format!("{endpoint}/latest/api/token");
        let req = http::Request::builder()
            .method(Method::PUT)
            .uri(&url)
            .header(CONTENT_LENGTH, "0")
            .header(X_AWS_EC2_METADATA_TOKEN_TTL_SECONDS, TOKEN_TTL_SECONDS)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build metadata token request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        let token = self.fetch(ctx, req, "fetch_token").await?;
        // Refresh 10 minutes before the token actually expires.
        let expires_in = now() + chrono::TimeDelta::seconds(TOKEN_TTL_SECONDS - 600);
        *cached = Some((token.clone(), expires_in));

        Ok(token)
    }

    async fn get(&self, ctx: &Context, url: &str, token: &str, operation: &str) -> Result<String> {
        let req = http::Request::builder()
            .method(Method::GET)
            .uri(url)
            .header(X_AWS_EC2_METADATA_TOKEN, token)
            .body(Bytes::new())
            .map_err(|e| {
                Error::request_invalid("failed to build metadata request")
                    .with_source(e)
                    .with_context(format!("url: {url}"))
            })?;

        self.fetch(ctx, req, operation).await
    }

    async fn fetch(&self, ctx: &Context, req: http::Request<Bytes>, operation: &str) -> Result<String> {
        let resp = ctx.http_send_as_string(req).await.map_err(|e| {
            Error::transport("failed to reach instance metadata service")
                .with_source(e)
                .with_context(format!("operation: {operation}"))
                .with_context("hint: check if running on EC2 instance")
        })?;

        if resp.status() != StatusCode::OK {
            return Err(
                Error::unexpected("instance metadata service returned an error")
                    .with_context(format!("operation: {operation}"))
                    .with_context(format!("status: {}", resp.status())),
            );
        }
        Ok(resp.into_body())
    }
}

#[async_trait]
impl ProvideCredential for ImdsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        if ctx
            .env_var(AWS_EC2_METADATA_DISABLED)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
        {
            debug!("instance metadata service is disabled by env");
            return Ok(None);
        }

        let endpoint = self.endpoint(ctx);
        let token = self.load_token(ctx, &endpoint).await?;

        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/");
        let roles = self.get(ctx, &url, &token, "list_roles").await?;
        let Some(role) = roles.lines().map(str::trim).find(|v| !v.is_empty()) else {
            return Err(Error::credential_unavailable(
                "no IAM role attached to EC2 instance",
            ));
        };

        let url = format!("{endpoint}/latest/meta-data/iam/security-credentials/{role}");
        let content = self.get(ctx, &url, &token, "fetch_credentials").await?;
        let resp: InstanceCredentials = serde_json::from_str(&content).map_err(|e| {
            Error::unexpected("failed to parse instance credentials")
                .with_source(e)
                .with_context(format!("role: {role}"))
        })?;

        if resp.code != "Success" {
            return Err(Error::credential_unavailable(format!(
                "instance metadata service returned [{}] {}",
                resp.code, resp.message
            ))
            .with_context(format!("role: {role}")));
        }

        debug!("loaded credential of role {role} from instance metadata service");
        Ok(Some(Credential {
            access_key_id: resp.access_key_id,
            secret_access_key: resp.secret_access_key,
            session_token: Some(resp.token),
            expires_in: Some(parse_rfc3339(&resp.expiration)?),
        }))
    }
}

#[derive(Default, Debug, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
struct InstanceCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: String,
    expiration: String,

    code: String,
    message: String,
}
