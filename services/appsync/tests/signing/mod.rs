use super::*;
use appsign_appsync::{Credential, RequestSigner};
use aws_credential_types::Credentials;
use aws_sigv4::http_request::{SignableBody, SignableRequest, SigningSettings};
use aws_sigv4::sign::v4;
use chrono::{NaiveDateTime, TimeZone, Utc};
use http::header::{AUTHORIZATION, CONTENT_TYPE, HOST};
use pretty_assertions::assert_eq;
use std::time::SystemTime;
use test_case::test_case;

/// Re-sign the transmitted request with aws-sigv4 and compare signatures.
///
/// aws-sigv4 hashes the body it is given, so a match also proves the bytes on
/// the wire are the bytes that were signed.
pub fn verify_signature(req: &RecordedRequest, cred: &Credential) -> anyhow::Result<()> {
    let date = req.headers["x-amz-date"].to_str()?;
    let time = NaiveDateTime::parse_from_str(date, "%Y%m%dT%H%M%SZ")?.and_utc();

    let id = Credentials::new(
        &cred.access_key_id,
        &cred.secret_access_key,
        cred.session_token.clone(),
        None,
        "hardcoded-credentials",
    )
    .into();
    let sp = v4::SigningParams::builder()
        .identity(&id)
        .region("us-east-1")
        .name("appsync")
        .time(SystemTime::from(time))
        .settings(SigningSettings::default())
        .build()?;

    let names = [CONTENT_TYPE, HOST];
    let headers = names
        .iter()
        .filter_map(|name| {
            req.headers
                .get(name)
                .map(|v| (name.as_str(), v.to_str().unwrap()))
        })
        .collect::<Vec<_>>();
    let output = aws_sigv4::http_request::sign(
        SignableRequest::new(
            req.method.as_str(),
            req.uri.to_string(),
            headers.into_iter(),
            SignableBody::Bytes(&req.body),
        )?,
        &sp.into(),
    )?;
    let (_, expected) = output.into_parts();

    let authorization = req.headers[AUTHORIZATION].to_str()?;
    let actual = authorization
        .rsplit("Signature=")
        .next()
        .unwrap_or_default();
    assert_eq!(expected, actual, "signature of {:?} mismatch", req.body);
    Ok(())
}

#[test_case(r#"{"query":"{ ping }"}"#; "simple query")]
#[test_case(r#"{"query":"mutation { put(v: \"日本語\") { id } }"}"#; "utf8 body")]
#[test_case(""; "empty body")]
#[tokio::test]
async fn test_transmitted_request_is_signed(body: &'static str) -> anyhow::Result<()> {
    let http = MockHttpSend::new(StatusCode::OK, "{}");
    let client = test_client(&http).await;

    client.send(body).await?;

    let req = &http.requests()[0];
    assert_eq!(req.body.as_ref(), body.as_bytes());
    verify_signature(
        req,
        &Credential {
            access_key_id: ACCESS_KEY_ID.to_string(),
            secret_access_key: SECRET_ACCESS_KEY.to_string(),
            session_token: None,
            expires_in: None,
        },
    )
}

#[tokio::test]
async fn test_transmitted_request_with_session_token() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let http = MockHttpSend::new(StatusCode::OK, "{}");
    let client = Client::builder(test_config())
        .with_http_send(http.clone())
        .with_credential_provider(
            StaticCredentialProvider::new(ACCESS_KEY_ID, SECRET_ACCESS_KEY)
                .with_session_token("session-token"),
        )
        .build()
        .await?;

    client.send(r#"{"query":"{ ping }"}"#).await?;

    let req = &http.requests()[0];
    assert_eq!(req.headers["x-amz-security-token"], "session-token");
    assert!(req.headers[AUTHORIZATION]
        .to_str()?
        .contains("SignedHeaders=content-type;host;x-amz-date;x-amz-security-token,"));
    verify_signature(
        req,
        &Credential {
            access_key_id: ACCESS_KEY_ID.to_string(),
            secret_access_key: SECRET_ACCESS_KEY.to_string(),
            session_token: Some("session-token".to_string()),
            expires_in: None,
        },
    )
}

#[test]
fn test_signature_is_stable_for_fixed_time() -> anyhow::Result<()> {
    let time = Utc.with_ymd_and_hms(2015, 8, 30, 12, 36, 0).unwrap();
    let signer = RequestSigner::new("us-east-1").with_time(time);
    let cred = Credential {
        access_key_id: ACCESS_KEY_ID.to_string(),
        secret_access_key: SECRET_ACCESS_KEY.to_string(),
        session_token: None,
        expires_in: None,
    };

    let sign = || -> anyhow::Result<String> {
        let (mut parts, body) = http::Request::post(ENDPOINT)
            .header(CONTENT_TYPE, "application/json")
            .body(r#"{"query":"{ ping }"}"#)?
            .into_parts();
        signer.sign(&mut parts, body.as_bytes(), &cred)?;
        Ok(parts.headers[AUTHORIZATION].to_str()?.to_string())
    };

    let first = sign()?;
    assert_eq!(first, sign()?);
    assert!(first.starts_with(
        "AWS4-HMAC-SHA256 Credential=AKIDEXAMPLE/20150830/us-east-1/appsync/aws4_request, "
    ));
    Ok(())
}
