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

use std::time::Duration;

/// Connection pool and timeout settings for an [`HttpSend`](crate::HttpSend)
/// implementation.
///
/// Defaults:
///
/// | setting | value |
/// |---|---|
/// | `connect_timeout` | 10s |
/// | `tcp_keepalive` | 90s |
/// | `pool_idle_timeout` | 90s |
/// | `tls_handshake_timeout` | 10s |
/// | `response_header_timeout` | 10s |
/// | `timeout` | 10s |
/// | `pool_max_idle_per_host` | 10 |
/// | `max_connections_per_host` | 100 |
/// | `http2_preferred` | true |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Deadline for establishing a TCP connection.
    pub connect_timeout: Duration,
    /// Interval of TCP keep-alive probes on pooled connections.
    pub tcp_keepalive: Duration,
    /// How long an idle connection stays in the pool.
    pub pool_idle_timeout: Duration,
    /// Deadline for the TLS handshake.
    pub tls_handshake_timeout: Duration,
    /// Deadline between the request being written and the response headers arriving.
    pub response_header_timeout: Duration,
    /// Overall deadline of one call, from dispatch to the last body byte.
    pub timeout: Duration,
    /// Maximum idle connections kept per host.
    pub pool_max_idle_per_host: usize,
    /// Maximum requests in flight to one host.
    pub max_connections_per_host: usize,
    /// Negotiate HTTP/2 via ALPN when the server offers it.
    pub http2_preferred: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            tcp_keepalive: Duration::from_secs(90),
            pool_idle_timeout: Duration::from_secs(90),
            tls_handshake_timeout: Duration::from_secs(10),
            response_header_timeout: Duration::from_secs(10),
            timeout: Duration::from_secs(10),
            pool_max_idle_per_host: 10,
            max_connections_per_host: 100,
            http2_preferred: true,
        }
    }
}

impl TransportConfig {
    /// Set the overall per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect deadline.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the deadline for reads from the connection, response headers included.
    pub fn with_response_header_timeout(mut self, timeout: Duration) -> Self {
        self.response_header_timeout = timeout;
        self
    }

    /// Set the maximum requests in flight to one host.
    pub fn with_max_connections_per_host(mut self, max: usize) -> Self {
        self.max_connections_per_host = max;
        self
    }

    /// Set the maximum idle connections kept per host.
    pub fn with_pool_max_idle_per_host(mut self, max: usize) -> Self {
        self.pool_max_idle_per_host = max;
        self
    }
}
