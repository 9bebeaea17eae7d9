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

//! Reqwest-based HTTP transport for appsign.
//!
//! `ReqwestHttpSend` implements `HttpSend` on top of a pooled `reqwest::Client`.
//! One instance is meant to be shared by every call of a client: the pool is
//! safe for concurrent use and requests are not serialized.
//!
//! ## Example
//!
//! ```no_run
//! use appsign_core::{Context, TransportConfig};
//! use appsign_http_send_reqwest::ReqwestHttpSend;
//!
//! # fn example() -> appsign_core::Result<()> {
//! let http = ReqwestHttpSend::with_config(&TransportConfig::default())?;
//! let ctx = Context::new().with_http_send(http);
//! # Ok(())
//! # }
//! ```

use appsign_core::{Error, HttpSend, Result, TransportConfig};
use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::BodyExt;
use log::debug;
use reqwest::{Client, Request};
use std::sync::Arc;
use tokio::sync::Semaphore;

/// HttpSend implementation backed by a pooled `reqwest::Client`.
///
/// At most `max_connections_per_host` requests are in flight at once.
#[derive(Debug, Clone)]
pub struct ReqwestHttpSend {
    client: Client,
    permits: Arc<Semaphore>,
}

impl Default for ReqwestHttpSend {
    fn default() -> Self {
        Self::new(Client::default())
    }
}

impl ReqwestHttpSend {
    /// Create a new ReqwestHttpSend with a reqwest::Client.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(
                TransportConfig::default().max_connections_per_host,
            )),
        }
    }

    /// Build a pooled client from the given transport settings.
    ///
    /// reqwest bounds the TLS handshake with the connect deadline, so the larger
    /// of the two is used. `response_header_timeout` bounds every read from the
    /// connection.
    pub fn with_config(cfg: &TransportConfig) -> Result<Self> {
        if cfg.max_connections_per_host == 0 {
            return Err(Error::config_invalid(
                "max_connections_per_host must be greater than zero",
            ));
        }

        let mut builder = Client::builder()
            .use_rustls_tls()
            .connect_timeout(cfg.connect_timeout.max(cfg.tls_handshake_timeout))
            .read_timeout(cfg.response_header_timeout)
            .timeout(cfg.timeout)
            .tcp_keepalive(cfg.tcp_keepalive)
            .pool_idle_timeout(cfg.pool_idle_timeout)
            .pool_max_idle_per_host(cfg.pool_max_idle_per_host);

        builder = if cfg.http2_preferred {
            builder
                .http2_keep_alive_interval(cfg.tcp_keepalive)
                .http2_keep_alive_while_idle(true)
        } else {
            builder.http1_only()
        };

        let client = builder
            .build()
            .map_err(|e| Error::config_invalid("failed to build http client").with_source(e))?;
        debug!("built pooled http client: {cfg:?}");

        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(
                cfg.max_connections_per_host.min(Semaphore::MAX_PERMITS),
            )),
        })
    }
}

#[async_trait]
impl HttpSend for ReqwestHttpSend {
    async fn http_send(&self, req: http::Request<Bytes>) -> Result<http::Response<Bytes>> {
        let req = Request::try_from(req)
            .map_err(|e| Error::request_invalid("failed to convert request").with_source(e))?;
        // Held until the body is fully read.
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| Error::unexpected("connection limiter is closed").with_source(e))?;
        let resp: http::Response<_> = self
            .client
            .execute(req)
            .await
            .map_err(transport_error)?
            .into();

        let (parts, body) = resp.into_parts();
        let bs = BodyExt::collect(body)
            .await
            .map(|buf| buf.to_bytes())
            .map_err(transport_error)?;
        Ok(http::Response::from_parts(parts, bs))
    }
}

fn transport_error(err: reqwest::Error) -> Error {
    let message = if err.is_timeout() {
        "http request timed out"
    } else if err.is_connect() {
        "failed to connect to endpoint"
    } else if err.is_body() || err.is_decode() {
        "failed to read response body"
    } else {
        "failed to send http request"
    };

    Error::transport(message).with_source(err)
}
