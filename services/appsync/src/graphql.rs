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

//! GraphQL request and response envelopes.

use crate::Client;
use appsign_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A GraphQL operation as sent in the POST body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlRequest<V = serde_json::Value> {
    /// Query or mutation document.
    pub query: String,
    /// Variables referenced by the document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<V>,
    /// Operation to run when the document holds more than one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphqlRequest {
    /// Create a request without variables.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            variables: None,
            operation_name: None,
        }
    }
}

impl<V> GraphqlRequest<V> {
    /// Attach variables to the request.
    pub fn with_variables<W>(self, variables: W) -> GraphqlRequest<W> {
        GraphqlRequest {
            query: self.query,
            variables: Some(variables),
            operation_name: self.operation_name,
        }
    }

    /// Select the operation to run.
    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }
}

/// The response envelope returned by AppSync.
///
/// A 200 response may still carry `errors`, either alone or next to partial
/// `data`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GraphqlResponse<T> {
    /// Result of the operation.
    pub data: Option<T>,
    /// Errors reported by the resolver.
    #[serde(default)]
    pub errors: Vec<GraphqlError>,
}

/// One entry of the `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlError {
    /// Human readable description.
    pub message: String,
    /// AppSync error type such as `Unauthorized`.
    #[serde(default)]
    pub error_type: Option<String>,
    /// Path of the field that failed.
    #[serde(default)]
    pub path: Vec<serde_json::Value>,
}

impl Client {
    /// Serialize `req`, send it and decode the response envelope.
    pub async fn execute<V, T>(&self, req: &GraphqlRequest<V>) -> Result<GraphqlResponse<T>>
    where
        V: Serialize,
        T: DeserializeOwned,
    {
        let body = serde_json::to_vec(req)
            .map_err(|e| Error::request_invalid("failed to serialize graphql request").with_source(e))?;
        let resp = self.send(body).await?;

        serde_json::from_slice(&resp)
            .map_err(|e| Error::unexpected("failed to parse graphql response").with_source(e))
    }
}
