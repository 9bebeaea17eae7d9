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

use appsign_core::{Context, OsEnv, Result, TransportConfig};
use appsign_file_read_tokio::TokioFileRead;
use appsign_http_send_reqwest::ReqwestHttpSend;

/// Create a context backed by tokio file reads, a pooled reqwest client
/// built from `transport` and the process environment.
pub fn default_context(transport: &TransportConfig) -> Result<Context> {
    Ok(Context::new()
        .with_file_read(TokioFileRead)
        .with_http_send(ReqwestHttpSend::with_config(transport)?)
        .with_env(OsEnv))
}
