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

use crate::{Context, ProvideCredential, Result};
use async_trait::async_trait;
use log::{debug, warn};
use std::fmt::{self, Debug};

/// A chain of credential providers that will be tried in order.
///
/// The first provider that returns a credential wins. Providers that return
/// an error are logged and skipped.
pub struct ProvideCredentialChain<C> {
    providers: Vec<Box<dyn ProvideCredential<Credential = C>>>,
}

impl<C: Send + Sync + Unpin + 'static> ProvideCredentialChain<C> {
    /// Create a new empty credential provider chain.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Add a credential provider to the chain.
    pub fn push(mut self, provider: impl ProvideCredential<Credential = C>) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    /// Add a credential provider to the front of the chain.
    pub fn push_front(mut self, provider: impl ProvideCredential<Credential = C>) -> Self {
        self.providers.insert(0, Box::new(provider));
        self
    }

    /// Number of providers in this chain.
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether this chain has no providers.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<C: Send + Sync + Unpin + 'static> Default for ProvideCredentialChain<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Debug for ProvideCredentialChain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProvideCredentialChain")
            .field("providers", &self.providers)
            .finish()
    }
}

#[async_trait]
impl<C: Send + Sync + Unpin + 'static> ProvideCredential for ProvideCredentialChain<C> {
    type Credential = C;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        for provider in &self.providers {
            debug!("trying credential provider: {provider:?}");

            match provider.provide_credential(ctx).await {
                Ok(Some(cred)) => {
                    debug!("loaded credential from provider: {provider:?}");
                    return Ok(Some(cred));
                }
                Ok(None) => {
                    debug!("no credential found in provider: {provider:?}");
                }
                Err(e) => {
                    warn!("failed to load credential from provider {provider:?}: {e}");
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Debug)]
    struct MockSuccessProvider(&'static str);

    #[async_trait]
    impl ProvideCredential for MockSuccessProvider {
        type Credential = String;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Ok(Some(self.0.to_string()))
        }
    }

    #[derive(Debug)]
    struct MockFailProvider;

    #[async_trait]
    impl ProvideCredential for MockFailProvider {
        type Credential = String;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Err(Error::unexpected("mock provider failed"))
        }
    }

    #[derive(Debug)]
    struct MockEmptyProvider;

    #[async_trait]
    impl ProvideCredential for MockEmptyProvider {
        type Credential = String;

        async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_chain_returns_first_success() {
        let _ = env_logger::builder().is_test(true).try_init();

        let chain = ProvideCredentialChain::new()
            .push(MockFailProvider)
            .push(MockEmptyProvider)
            .push(MockSuccessProvider("first"))
            .push(MockSuccessProvider("second"));
        assert_eq!(chain.len(), 4);

        let cred = chain.provide_credential(&Context::new()).await.unwrap();
        assert_eq!(cred.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_chain_push_front() {
        let chain = ProvideCredentialChain::new()
            .push(MockSuccessProvider("back"))
            .push_front(MockSuccessProvider("front"));

        let cred = chain.provide_credential(&Context::new()).await.unwrap();
        assert_eq!(cred.as_deref(), Some("front"));
    }

    #[tokio::test]
    async fn test_chain_returns_none_when_all_miss() {
        let _ = env_logger::builder().is_test(true).try_init();

        let chain = ProvideCredentialChain::new()
            .push(MockFailProvider)
            .push(MockEmptyProvider);

        let cred = chain.provide_credential(&Context::new()).await.unwrap();
        assert!(cred.is_none());

        let empty = ProvideCredentialChain::<String>::default();
        assert!(empty.is_empty());
        assert!(empty
            .provide_credential(&Context::new())
            .await
            .unwrap()
            .is_none());
    }
}
