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
use appsign_core::{Context, Error, Result, TransportConfig};
use http::uri::Scheme;
use http::Uri;
use log::debug;
use std::collections::HashMap;

/// Config for the AppSync client.
///
/// Build it explicitly with [`Config::new`], or read it from the environment
/// once at startup with [`Config::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `endpoint` will be loaded from:
    ///
    /// - env value: [`APPSYNC_GRAPHQL_ENDPOINT`]
    /// - the only env value named `API_<NAME>_GRAPHQLAPIENDPOINTOUTPUT`
    pub endpoint: String,
    /// `region` will be loaded from the first of:
    ///
    /// - env value: [`APPSYNC_REGION`]
    /// - env value: [`REGION`]
    /// - env value: [`AWS_REGION`]
    /// - env value: [`AWS_DEFAULT_REGION`]
    pub region: String,
    /// `api_id` will be loaded from:
    ///
    /// - env value: [`APPSYNC_GRAPHQL_API_ID`]
    /// - the only env value named `API_<NAME>_GRAPHQLAPIIDOUTPUT`
    pub api_id: Option<String>,
    /// Connection pool and timeout settings.
    pub transport: TransportConfig,
}

impl Config {
    /// Create a config for the given endpoint and region.
    pub fn new(endpoint: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: region.into(),
            api_id: None,
            transport: TransportConfig::default(),
        }
    }

    /// Set the GraphQL API id.
    pub fn with_api_id(mut self, api_id: impl Into<String>) -> Self {
        self.api_id = Some(api_id.into());
        self
    }

    /// Set the transport settings.
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Load config from env.
    pub fn from_env(ctx: &Context) -> Result<Self> {
        let envs = ctx.env_vars();

        let endpoint = match non_empty(&envs, APPSYNC_GRAPHQL_ENDPOINT) {
            Some(v) => Some(v),
            None => amplify_output(&envs, AMPLIFY_ENDPOINT_SUFFIX)?,
        }
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            Error::config_invalid("graphql endpoint is not configured")
                .with_context(format!("env: {APPSYNC_GRAPHQL_ENDPOINT}"))
        })?;

        let region = [APPSYNC_REGION, REGION, AWS_REGION, AWS_DEFAULT_REGION]
            .iter()
            .filter_map(|k| envs.get(*k))
            .find(|v| !v.trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                Error::config_invalid("region is not configured").with_context(format!(
                    "env: {APPSYNC_REGION}, {REGION}, {AWS_REGION} or {AWS_DEFAULT_REGION}"
                ))
            })?;

        let api_id = match non_empty(&envs, APPSYNC_GRAPHQL_API_ID) {
            Some(v) => Some(v),
            None => amplify_output(&envs, AMPLIFY_API_ID_SUFFIX)?,
        };

        debug!("loaded config from env: endpoint={endpoint}, region={region}, api_id={api_id:?}");

        Ok(Self {
            endpoint,
            region,
            api_id,
            transport: TransportConfig::default(),
        })
    }

    /// Check the config and return the parsed endpoint.
    pub fn validate(&self) -> Result<Uri> {
        if self.region.trim().is_empty() {
            return Err(Error::config_invalid("region must not be empty"));
        }

        let uri: Uri = self.endpoint.parse().map_err(|e| {
            Error::config_invalid("graphql endpoint is not a valid url")
                .with_source(e)
                .with_context(format!("endpoint: {}", self.endpoint))
        })?;

        match uri.scheme() {
            Some(s) if *s == Scheme::HTTPS || *s == Scheme::HTTP => {}
            _ => {
                return Err(
                    Error::config_invalid("graphql endpoint must be an http(s) url")
                        .with_context(format!("endpoint: {}", self.endpoint)),
                )
            }
        }
        if uri.authority().is_none() {
            return Err(Error::config_invalid("graphql endpoint has no host")
                .with_context(format!("endpoint: {}", self.endpoint)));
        }

        Ok(uri)
    }
}

fn non_empty(envs: &HashMap<String, String>, key: &str) -> Option<String> {
    envs.get(key).filter(|v| !v.trim().is_empty()).cloned()
}

/// Find the single Amplify output variable with the given suffix.
fn amplify_output(envs: &HashMap<String, String>, suffix: &str) -> Result<Option<String>> {
    let mut matches: Vec<(&String, &String)> = envs
        .iter()
        .filter(|(k, _)| k.starts_with(AMPLIFY_API_PREFIX) && k.ends_with(suffix))
        .collect();
    matches.sort();

    match matches.as_slice() {
        [] => Ok(None),
        [(_, v)] => Ok(Some((*v).clone())),
        many => Err(
            Error::config_invalid("multiple amplify graphql apis are configured").with_context(
                format!(
                    "candidates: {}",
                    many.iter()
                        .map(|(k, _)| k.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ),
            ),
        ),
    }
}
