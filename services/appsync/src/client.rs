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
use crate::provide_credential::{resolve, DefaultCredentialProvider};
use crate::{Config, Credential, RequestSigner};
use appsign_core::{Context, Error, ErrorKind, HttpSend, ProvideCredential, Result, SigningCredential};
use bytes::Bytes;
use http::header::CONTENT_TYPE;
use http::{Request, Uri};
use log::{debug, warn};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// Bytes of a failed response body written to the debug log.
const MAX_LOGGED_BODY: usize = 512;

/// Builder for [`Client`].
#[derive(Debug)]
pub struct ClientBuilder {
    config: Config,
    ctx: Context,
    http: Option<Arc<dyn HttpSend>>,
    provider: Option<Arc<dyn ProvideCredential<Credential = Credential>>>,
}

impl ClientBuilder {
    /// Use the given context for credential resolution.
    ///
    /// Requests are sent through the context's http client unless
    /// [`ClientBuilder::with_http_send`] is set.
    pub fn with_context(mut self, ctx: Context) -> Self {
        self.ctx = ctx;
        self
    }

    /// Send GraphQL requests through this transport.
    pub fn with_http_send(mut self, http: impl HttpSend) -> Self {
        self.http = Some(Arc::new(http));
        self
    }

    /// Resolve credentials from this provider instead of the default chain.
    pub fn with_credential_provider(
        mut self,
        provider: impl ProvideCredential<Credential = Credential>,
    ) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    /// Validate the config, resolve credentials once and build the client.
    pub async fn build(self) -> Result<Client> {
        let uri = self.config.validate()?;
        let http = self.http.unwrap_or_else(|| self.ctx.http());
        let provider = self
            .provider
            .unwrap_or_else(|| Arc::new(DefaultCredentialProvider::new()));

        let credential = resolve(&self.ctx, provider.as_ref(), &self.config.region).await?;
        debug!(
            "appsync client is ready: endpoint={uri}, region={}",
            self.config.region
        );

        Ok(Client {
            inner: Arc::new(ClientInner {
                signer: RequestSigner::new(&self.config.region),
                credential: RwLock::new(credential),
                uri,
                ctx: self.ctx,
                config: self.config,
                http,
                provider,
            }),
        })
    }
}

/// Client that sends SigV4-signed GraphQL requests to one AppSync endpoint.
///
/// Cloning is cheap and clones share the transport and the credential, so a
/// client can be used from many tasks at once.
#[derive(Debug, Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    ctx: Context,
    config: Config,
    uri: Uri,
    signer: RequestSigner,
    http: Arc<dyn HttpSend>,
    provider: Arc<dyn ProvideCredential<Credential = Credential>>,
    credential: RwLock<Credential>,
}

impl Client {
    /// Start building a client for the given config.
    pub fn builder(config: Config) -> ClientBuilder {
        ClientBuilder {
            config,
            ctx: Context::new(),
            http: None,
            provider: None,
        }
    }

    /// Config this client was built with.
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Parsed GraphQL endpoint.
    pub fn endpoint(&self) -> &Uri {
        &self.inner.uri
    }

    /// Sign `body`, POST it to the endpoint and return the response body.
    ///
    /// Statuses in `[200, 300)` return the body bytes untouched. Any other
    /// status fails with [`ErrorKind::HttpStatus`]. The whole call is bounded
    /// by `config.transport.timeout`.
    pub async fn send(&self, body: impl Into<Bytes>) -> Result<Bytes> {
        let timeout = self.inner.config.transport.timeout;

        tokio::time::timeout(timeout, self.send_once(body.into()))
            .await
            .map_err(|_| {
                Error::transport("graphql request timed out")
                    .with_context(format!("timeout: {timeout:?}"))
                    .with_context(format!("endpoint: {}", self.inner.uri))
            })?
    }

    /// Like [`Client::send`], but the body is read from `reader` first.
    pub async fn send_reader<R>(&self, mut reader: R) -> Result<Bytes>
    where
        R: AsyncRead + Unpin,
    {
        let mut body = Vec::new();
        reader
            .read_to_end(&mut body)
            .await
            .map_err(|e| Error::body_read("failed to read request body").with_source(e))?;

        self.send(body).await
    }

    /// Like [`Client::send`], but returns as soon as `token` is cancelled.
    ///
    /// The in-flight request is dropped, which releases its connection.
    pub async fn send_with_cancel(
        &self,
        body: impl Into<Bytes>,
        token: &CancellationToken,
    ) -> Result<Bytes> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::transport("graphql request cancelled")
                .with_context(format!("endpoint: {}", self.inner.uri))),
            res = self.send(body) => res,
        }
    }

    async fn send_once(&self, body: Bytes) -> Result<Bytes> {
        let cred = self.credential().await?;

        let (mut parts, body) = Request::post(self.inner.uri.clone())
            .header(CONTENT_TYPE, CONTENT_TYPE_JSON)
            .body(body)?
            .into_parts();
        self.inner.signer.sign(&mut parts, &body, &cred)?;
        let req = Request::from_parts(parts, body);

        let resp = self.inner.http.http_send(req).await.map_err(|e| {
            if e.kind() == ErrorKind::Transport {
                e
            } else {
                Error::transport("failed to send graphql request").with_source(e)
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.body();
            debug!(
                "graphql request failed with {status}, body prefix: {}",
                String::from_utf8_lossy(&body[..body.len().min(MAX_LOGGED_BODY)])
            );
            return Err(Error::http_status(status)
                .with_context(format!("endpoint: {}", self.inner.uri)));
        }

        Ok(resp.into_body())
    }

    /// Current credential, re-resolved once it is about to expire.
    async fn credential(&self) -> Result<Credential> {
        {
            let cred = self.inner.credential.read().await;
            if cred.is_valid() {
                return Ok(cred.clone());
            }
        }

        let mut cred = self.inner.credential.write().await;
        // Another send may have refreshed it while we waited for the lock.
        if cred.is_valid() {
            return Ok(cred.clone());
        }

        warn!("credential is about to expire, resolving a new one");
        let fresh = resolve(
            &self.inner.ctx,
            self.inner.provider.as_ref(),
            &self.inner.config.region,
        )
        .await?;
        *cred = fresh.clone();

        Ok(fresh)
    }
}
