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
use appsign_core::hash::{hex_hmac_sha256, hex_sha256, hmac_sha256};
use appsign_core::time::{format_date, format_iso8601, now, DateTime};
use appsign_core::{Result, SigningRequest};
use http::request::Parts;
use http::{header, HeaderValue};
use log::debug;
use percent_encoding::utf8_percent_encode;
use std::fmt::Write;

/// RequestSigner signs AppSync requests with AWS Signature Version 4.
///
/// The signature travels in the `authorization` header. The payload hash is
/// only part of the canonical request, no `x-amz-content-sha256` header is
/// added.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    service: String,
    region: String,

    time: Option<DateTime>,
}

impl RequestSigner {
    /// Create a new signer for AppSync in the given region.
    pub fn new(region: &str) -> Self {
        Self {
            service: APPSYNC_SERVICE.to_string(),
            region: region.to_string(),

            time: None,
        }
    }

    /// Specify the signing time.
    ///
    /// # Note
    ///
    /// We should always take current time to sign requests.
    /// Only use this function for testing.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Sign the request in place.
    ///
    /// `host`, `x-amz-date`, `x-amz-security-token` (when the credential
    /// carries a session token) and `authorization` are set on `parts`.
    pub fn sign(&self, parts: &mut Parts, body: &[u8], cred: &Credential) -> Result<()> {
        let now = self.time.unwrap_or_else(now);
        let mut signed_req = SigningRequest::build(parts)?;

        canonicalize_header(&mut signed_req, cred, now)?;
        canonicalize_query(&mut signed_req);

        // build canonical request and string to sign.
        let creq = canonical_request_string(&signed_req, &hex_sha256(body))?;
        let encoded_req = hex_sha256(creq.as_bytes());

        // Scope: "20220313/<region>/appsync/aws4_request"
        let scope = format!(
            "{}/{}/{}/aws4_request",
            format_date(now),
            self.region,
            self.service
        );
        debug!("calculated scope: {scope}");

        // StringToSign:
        //
        // AWS4-HMAC-SHA256
        // 20220313T072004Z
        // 20220313/<region>/appsync/aws4_request
        // <hashed_canonical_request>
        let string_to_sign = {
            let mut f = String::new();
            writeln!(f, "{SIGNING_ALGORITHM}")?;
            writeln!(f, "{}", format_iso8601(now))?;
            writeln!(f, "{scope}")?;
            write!(f, "{encoded_req}")?;
            f
        };
        debug!("calculated string to sign: {string_to_sign}");

        let signing_key =
            generate_signing_key(&cred.secret_access_key, now, &self.region, &self.service);
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let mut authorization = HeaderValue::from_str(&format!(
            "{SIGNING_ALGORITHM} Credential={}/{}, SignedHeaders={}, Signature={}",
            cred.access_key_id,
            scope,
            signed_req.header_name_to_vec_sorted().join(";"),
            signature
        ))?;
        authorization.set_sensitive(true);
        signed_req
            .headers
            .insert(header::AUTHORIZATION, authorization);

        signed_req.apply(parts)
    }
}

fn canonical_request_string(req: &SigningRequest, payload_hash: &str) -> Result<String> {
    // 256 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(256);

    writeln!(f, "{}", req.method)?;
    // Non-S3 services encode the already escaped path a second time.
    writeln!(f, "{}", utf8_percent_encode(&req.path, &AWS_URI_ENCODE_SET))?;
    writeln!(
        f,
        "{}",
        req.query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&")
    )?;

    let signed_headers = req.header_name_to_vec_sorted();
    for name in signed_headers.iter() {
        let values = req
            .headers
            .get_all(*name)
            .iter()
            .map(|v| v.to_str())
            .collect::<std::result::Result<Vec<_>, _>>()?;
        writeln!(f, "{name}:{}", values.join(","))?;
    }
    writeln!(f)?;
    writeln!(f, "{}", signed_headers.join(";"))?;
    write!(f, "{payload_hash}")?;

    Ok(f)
}

fn canonicalize_header(req: &mut SigningRequest, cred: &Credential, now: DateTime) -> Result<()> {
    // An authorization header from an earlier attempt must not be signed.
    req.headers.remove(header::AUTHORIZATION);

    // Header values need to be normalized according to Step 4 of https://docs.aws.amazon.com/general/latest/gr/sigv4-create-canonical-request.html
    for (_, value) in req.headers.iter_mut() {
        SigningRequest::header_value_normalize(value)?;
    }

    if req.headers.get(header::HOST).is_none() {
        let host = HeaderValue::from_str(req.authority.as_str())?;
        req.headers.insert(header::HOST, host);
    }

    req.headers
        .insert(X_AMZ_DATE, HeaderValue::try_from(format_iso8601(now))?);

    match &cred.session_token {
        Some(token) => {
            let mut value = HeaderValue::from_str(token)?;
            // Set token value sensitive to avoid leaking.
            value.set_sensitive(true);
            req.headers.insert(X_AMZ_SECURITY_TOKEN, value);
        }
        None => {
            req.headers.remove(X_AMZ_SECURITY_TOKEN);
        }
    }

    Ok(())
}

fn canonicalize_query(req: &mut SigningRequest) {
    if req.query.is_empty() {
        return;
    }

    // Sort by param name
    req.query.sort();

    req.query = req
        .query
        .iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> Vec<u8> {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(sign_date.as_slice(), region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(sign_region.as_slice(), service.as_bytes());
    // Sign request
    hmac_sha256(sign_service.as_slice(), "aws4_request".as_bytes())
}
