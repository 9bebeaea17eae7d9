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

//! AWS AppSync support with convenience APIs

pub use appsign_appsync::*;

#[cfg(feature = "default-context")]
use crate::default_context;
#[cfg(feature = "default-context")]
use appsign_core::{Context, OsEnv, Result};

/// Build a client for `config` with the default context and credential chain.
///
/// The pooled transport is built from `config.transport` and shared by
/// credential resolution and GraphQL requests.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> appsign::Result<()> {
/// use appsign::appsync::{connect, Config};
///
/// let client = connect(Config::new(
///     "https://example.appsync-api.us-east-1.amazonaws.com/graphql",
///     "us-east-1",
/// ))
/// .await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "default-context")]
pub async fn connect(config: Config) -> Result<Client> {
    let ctx = default_context(&config.transport)?;
    Client::builder(config).with_context(ctx).build().await
}

/// Like [`connect`], but the config is read from the process environment.
#[cfg(feature = "default-context")]
pub async fn connect_from_env() -> Result<Client> {
    let config = Config::from_env(&Context::new().with_env(OsEnv))?;
    connect(config).await
}
