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

mod default;
pub use default::DefaultCredentialProvider;

mod ecs;
pub use ecs::EcsCredentialProvider;

mod env;
pub use env::EnvCredentialProvider;

mod imds;
pub use imds::ImdsCredentialProvider;

mod profile;
pub use profile::ProfileCredentialProvider;

mod r#static;
pub use r#static::StaticCredentialProvider;

use crate::Credential;
use appsign_core::{Context, Error, ProvideCredential, Result, SigningCredential};
use log::debug;

/// Resolve a usable credential for `region` from `provider`.
///
/// - A blank region is a configuration error.
/// - A provider that finds nothing, fails, or yields an expired credential
///   makes the credential unavailable.
pub async fn resolve(
    ctx: &Context,
    provider: &dyn ProvideCredential<Credential = Credential>,
    region: &str,
) -> Result<Credential> {
    if region.trim().is_empty() {
        return Err(Error::config_invalid(
            "region is required to resolve credentials",
        ));
    }

    let cred = provider
        .provide_credential(ctx)
        .await
        .map_err(|e| {
            Error::credential_unavailable("failed to resolve credential")
                .with_source(e)
                .with_context(format!("region: {region}"))
        })?
        .ok_or_else(|| {
            Error::credential_unavailable("no credential source yielded a credential")
                .with_context(format!("region: {region}"))
                .with_context("hint: configure env, shared profile, container or instance credentials")
        })?;

    if !cred.is_valid() {
        return Err(
            Error::credential_unavailable("resolved credential is expired or incomplete")
                .with_context(format!("expires_in: {:?}", cred.expires_in)),
        );
    }

    debug!("resolved credential for region {region}: {cred:?}");
    Ok(cred)
}
