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

//! Send SigV4-signed GraphQL requests to AWS AppSync.
//!
//! ```no_run
//! # async fn example() -> appsign::Result<()> {
//! // Reads APPSYNC_GRAPHQL_ENDPOINT and the region from env, then resolves
//! // credentials through the default chain.
//! let client = appsign::appsync::connect_from_env().await?;
//!
//! let body = client.send(r#"{"query":"{ ping }"}"#).await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub use appsign_core::*;

#[cfg(feature = "default-context")]
mod context;
#[cfg(feature = "default-context")]
pub use context::default_context;

pub mod appsync;
