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
use appsign_core::{Context, Error, ProvideCredential, Result};
use async_trait::async_trait;
use ini::Ini;
use log::debug;

/// Which shared file a profile is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SharedFile {
    Credentials,
    Config,
}

impl SharedFile {
    fn env_key(self) -> &'static str {
        match self {
            SharedFile::Credentials => AWS_SHARED_CREDENTIALS_FILE,
            SharedFile::Config => AWS_CONFIG_FILE,
        }
    }

    fn default_path(self) -> &'static str {
        match self {
            SharedFile::Credentials => "~/.aws/credentials",
            SharedFile::Config => "~/.aws/config",
        }
    }

    /// The config file prefixes every non-default section with `profile `.
    fn section(self, profile: &str) -> String {
        match (self, profile) {
            (SharedFile::Config, p) if p != "default" => format!("profile {p}"),
            (_, p) => p.to_string(),
        }
    }
}

/// ProfileCredentialProvider loads AWS credentials from the shared files.
///
/// - `~/.aws/credentials` (or `AWS_SHARED_CREDENTIALS_FILE`)
/// - `~/.aws/config` (or `AWS_CONFIG_FILE`)
///
/// The profile set via `with_profile()` wins over `AWS_PROFILE`, which wins
/// over `default`.
#[derive(Debug, Default, Clone)]
pub struct ProfileCredentialProvider {
    profile: Option<String>,
    config_file: Option<String>,
    credentials_file: Option<String>,
}

impl ProfileCredentialProvider {
    /// Create a new ProfileCredentialProvider with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the profile name to use.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the path to the config file.
    pub fn with_config_file(mut self, path: impl Into<String>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Set the path to the credentials file.
    pub fn with_credentials_file(mut self, path: impl Into<String>) -> Self {
        self.credentials_file = Some(path.into());
        self
    }

    fn path(&self, ctx: &Context, file: SharedFile) -> String {
        let explicit = match file {
            SharedFile::Credentials => self.credentials_file.clone(),
            SharedFile::Config => self.config_file.clone(),
        };
        explicit
            .or_else(|| ctx.env_var(file.env_key()).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| file.default_path().to_string())
    }

    async fn load(
        &self,
        ctx: &Context,
        file: SharedFile,
        profile: &str,
    ) -> Result<Option<Credential>> {
        let path = self.path(ctx, file);
        let Some(path) = ctx.expand_home_dir(&path) else {
            debug!("home dir is unknown, skip shared file {path}");
            return Ok(None);
        };

        let content = match ctx.file_read_as_string(&path).await {
            Ok(content) => content,
            Err(err) => {
                debug!("failed to read shared file {path}: {err}");
                return Ok(None);
            }
        };

        let conf = Ini::load_from_str(&content).map_err(|e| {
            Error::config_invalid("failed to parse shared aws file")
                .with_source(e)
                .with_context(format!("path: {path}"))
        })?;

        let section = file.section(profile);
        let Some(props) = conf.section(Some(section.as_str())) else {
            debug!("section [{section}] not found in {path}");
            return Ok(None);
        };

        match (
            props.get("aws_access_key_id"),
            props.get("aws_secret_access_key"),
        ) {
            (Some(ak), Some(sk)) => {
                debug!("loaded credential of profile {profile} from {path}");
                Ok(Some(Credential {
                    access_key_id: ak.to_string(),
                    secret_access_key: sk.to_string(),
                    session_token: props.get("aws_session_token").map(|s| s.to_string()),
                    expires_in: None,
                }))
            }
            _ => Ok(None),
        }
    }
}

#[async_trait]
impl ProvideCredential for ProfileCredentialProvider {
    type Credential = Credential;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        let profile = self
            .profile
            .clone()
            .or_else(|| ctx.env_var(AWS_PROFILE).filter(|v| !v.is_empty()))
            .unwrap_or_else(|| "default".to_string());

        if let Some(cred) = self.load(ctx, SharedFile::Credentials, &profile).await? {
            return Ok(Some(cred));
        }
        self.load(ctx, SharedFile::Config, &profile).await
    }
}
