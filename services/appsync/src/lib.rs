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

//! AWS AppSync client with SigV4 signing.
//!
//! ```no_run
//! use appsign_appsync::{Client, Config, StaticCredentialProvider};
//!
//! # async fn example() -> appsign_core::Result<()> {
//! let config = Config::new(
//!     "https://example.appsync-api.us-east-1.amazonaws.com/graphql",
//!     "us-east-1",
//! );
//! let client = Client::builder(config)
//!     .with_credential_provider(StaticCredentialProvider::new("ak", "sk"))
//!     .build()
//!     .await?;
//!
//! let body = client.send(r#"{"query":"{ ping }"}"#).await?;
//! # Ok(())
//! # }
//! ```

mod client;
pub use client::{Client, ClientBuilder};

mod config;
pub use config::Config;

mod constants;
pub use constants::APPSYNC_SERVICE;

mod credential;
pub use credential::Credential;

mod graphql;
pub use graphql::{GraphqlError, GraphqlRequest, GraphqlResponse};

mod provide_credential;
pub use provide_credential::*;

mod sign_request;
pub use sign_request::RequestSigner;
