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
use appsign_core::time::parse_rfc3339;
use appsign_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;
use bytes::Bytes;
use http::header::AUTHORIZATION;
use http::{Method, StatusCode};
use log::debug;
use serde::Deserialize;

/// EcsCredentialProvider loads credential from the container credentials endpoint.
///
/// It is only active when `AWS_CONTAINER_CREDENTIALS_RELATIVE_URI` or
/// `AWS_CONTAINER_CREDENTIALS_FULL_URI` is set. A relative uri is resolved
/// against `http://169.254.170.2` and takes priority over a full uri.
/// `AWS_CONTAINER_AUTHORIZATION_TOKEN` is sent as the `authorization` header
/// when present.
///
/// References:
/// - [IAM roles for tasks](https://docs.aws.amazon.com/AmazonECS/latest/developerguide/task-iam-roles.html)
#[derive(Debug, Default, Clone)]
pub struct EcsCredentialProvider;

impl EcsCredentialProvider {
    /// Create a new `EcsCredentialProvider` instance.
    pub fn new() -> Self {
        Self
    }

    fn endpoint(ctx: &Context) -> Option<String> {
        let non_empty = |k: &str| ctx.env_var(k).filter(|v| !v.is_empty());

        non_empty(AWS_CONTAINER_CREDENTIALS_RELATIVE_URI)
            .map(|relative| format!("{ECS_CONTAINER_ENDPOINT}{relative}"))
            .or_else(|| non_empty(AWS_CONTAINER_CREDENTIALS_FULL_URI))
    }
}

#[async_trait]
impl ProvideCredential for EcsCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let Some(url) = Self::endpoint(ctx) else {
            return Ok(None);
        };

        let mut req = http::Request::builder().method(Method::GET).uri(&url);
        if let Some(token) = ctx.env_var(AWS_CONTAINER_AUTHORIZATION_TOKEN) {
            req = req.header(AUTHORIZATION, token);
        }
        let req = req.body(Bytes::new()).map_err(|e| {
            Error::request_invalid("failed to build container credentials request")
                .with_source(e)
                .with_context(format!("url: {url}"))
        })?;

        let resp = ctx.http_send_as_string(req).await?;
        if resp.status() != StatusCode::OK {
            return Err(
                Error::unexpected("container credentials endpoint returned an error")
                    .with_context(format!("status: {}", resp.status()))
                    .with_context(format!("url: {url}")),
            );
        }

        let cred: ContainerCredentials = serde_json::from_str(resp.body()).map_err(|e| {
            Error::unexpected("failed to parse container credentials").with_source(e)
        })?;
        let expires_in = cred.expiration.as_deref().map(parse_rfc3339).transpose()?;

        debug!("loaded credential from container endpoint {url}");
        Ok(Some(Credential {
            access_key_id: cred.access_key_id,
            secret_access_key: cred.secret_access_key,
            session_token: cred.token,
            expires_in,
        }))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ContainerCredentials {
    access_key_id: String,
    secret_access_key: String,
    token: Option<String>,
    expiration: Option<String>,
}
