use super::*;
use appsign_appsync::{Credential, GraphqlRequest, GraphqlResponse};
use appsign_core::{ErrorKind, ProvideCredential};
use async_trait::async_trait;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use pretty_assertions::assert_eq;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::CancellationToken;

const PING: &str = r#"{"query":"{ ping }"}"#;
const PONG: &str = r#"{"data":{"ping":"pong"}}"#;

#[tokio::test]
async fn test_send_returns_body() -> anyhow::Result<()> {
    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let client = test_client(&http).await;

    let body = client.send(PING).await?;
    assert_eq!(body.as_ref(), PONG.as_bytes());

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    let req = &requests[0];
    assert_eq!(req.method, Method::POST);
    assert_eq!(req.uri.to_string(), ENDPOINT);
    assert_eq!(req.headers[CONTENT_TYPE], "application/json");
    assert_eq!(req.body.as_ref(), PING.as_bytes());

    let authorization = req.headers[AUTHORIZATION].to_str()?;
    let date = req.headers["x-amz-date"].to_str()?;
    assert!(authorization.starts_with(&format!(
        "AWS4-HMAC-SHA256 Credential={ACCESS_KEY_ID}/{}/us-east-1/appsync/aws4_request, ",
        &date[..8]
    )));
    assert!(req.headers.get("x-amz-security-token").is_none());
    Ok(())
}

#[tokio::test]
async fn test_send_accepts_any_2xx() -> anyhow::Result<()> {
    for status in [StatusCode::CREATED, StatusCode::NO_CONTENT, StatusCode::IM_USED] {
        let http = MockHttpSend::new(status, PONG);
        let body = test_client(&http).await.send(PING).await?;
        assert_eq!(body.as_ref(), PONG.as_bytes(), "{status}");
    }
    Ok(())
}

#[tokio::test]
async fn test_send_http_status_error() {
    let http = MockHttpSend::new(
        StatusCode::FORBIDDEN,
        r#"{"errors":[{"errorType":"UnauthorizedException","message":"denied"}]}"#,
    );
    let client = test_client(&http).await;

    let err = client.send(PING).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert_eq!(err.reason(), Some("Forbidden"));

    for status in [
        StatusCode::MULTIPLE_CHOICES,
        StatusCode::BAD_REQUEST,
        StatusCode::INTERNAL_SERVER_ERROR,
    ] {
        let http = MockHttpSend::new(status, "");
        let err = test_client(&http).await.send(PING).await.unwrap_err();
        assert_eq!(err.status(), Some(status));
    }
}

#[tokio::test]
async fn test_send_reader() -> anyhow::Result<()> {
    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let client = test_client(&http).await;

    let body = client.send_reader(PING.as_bytes()).await?;
    assert_eq!(body.as_ref(), PONG.as_bytes());
    assert_eq!(http.requests()[0].body.as_ref(), PING.as_bytes());
    Ok(())
}

struct BrokenReader;

impl AsyncRead for BrokenReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _: &mut TaskContext<'_>,
        _: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")))
    }
}

#[tokio::test]
async fn test_send_reader_failure() {
    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let client = test_client(&http).await;

    let err = client.send_reader(BrokenReader).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BodyRead);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_send_with_cancel() {
    let http = MockHttpSend::hanging();
    let client = test_client(&http).await;

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = client.send_with_cancel(PING, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_send_with_cancel_already_cancelled() {
    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let client = test_client(&http).await;

    let token = CancellationToken::new();
    token.cancel();

    let err = client.send_with_cancel(PING, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_send_timeout() {
    let _ = env_logger::builder().is_test(true).try_init();

    let http = MockHttpSend::hanging();
    let config = test_config().with_transport(
        appsign_core::TransportConfig::default().with_timeout(Duration::from_millis(200)),
    );
    let client = Client::builder(config)
        .with_http_send(http.clone())
        .with_credential_provider(StaticCredentialProvider::new(
            ACCESS_KEY_ID,
            SECRET_ACCESS_KEY,
        ))
        .build()
        .await
        .unwrap();

    let started = Instant::now();
    let err = client.send(PING).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_concurrent_sends() -> anyhow::Result<()> {
    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let client = test_client(&http).await;

    let mut tasks = Vec::new();
    for i in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            client
                .send(format!(r#"{{"query":"{{ item(id: {i}) {{ id }} }}"}}"#))
                .await
        }));
    }
    for task in tasks {
        assert_eq!(task.await??.as_ref(), PONG.as_bytes());
    }

    let requests = http.requests();
    assert_eq!(requests.len(), 16);
    for req in &requests {
        crate::signing::verify_signature(req, &static_credential())?;
    }
    Ok(())
}

#[tokio::test]
async fn test_build_without_credentials() {
    let _ = env_logger::builder().is_test(true).try_init();

    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let err = Client::builder(test_config())
        .with_http_send(http.clone())
        .build()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::CredentialUnavailable);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_build_with_invalid_config() {
    for config in [
        Config::new("", "us-east-1"),
        Config::new(ENDPOINT, ""),
        Config::new("example.com/graphql", "us-east-1"),
    ] {
        let err = Client::builder(config.clone())
            .with_credential_provider(StaticCredentialProvider::new(
                ACCESS_KEY_ID,
                SECRET_ACCESS_KEY,
            ))
            .build()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid, "{config:?}");
    }
}

/// Hands out a short lived credential first and a long lived one after.
#[derive(Debug, Default)]
struct RotatingProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ProvideCredential for RotatingProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now();

        let cred = match call {
            // Just outside of the two minutes refresh window.
            0 => Credential {
                access_key_id: "AKIDFIRST".to_string(),
                secret_access_key: SECRET_ACCESS_KEY.to_string(),
                session_token: Some("first-token".to_string()),
                expires_in: Some(now + chrono::TimeDelta::seconds(121)),
            },
            _ => Credential {
                access_key_id: "AKIDSECOND".to_string(),
                secret_access_key: SECRET_ACCESS_KEY.to_string(),
                session_token: Some("second-token".to_string()),
                expires_in: Some(now + chrono::TimeDelta::hours(1)),
            },
        };
        Ok(Some(cred))
    }
}

#[tokio::test]
async fn test_send_refreshes_expiring_credential() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let provider = RotatingProvider::default();
    let calls = provider.calls.clone();

    let client = Client::builder(test_config())
        .with_http_send(http.clone())
        .with_credential_provider(provider)
        .build()
        .await?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // Let the first credential enter the refresh window.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    client.send(PING).await?;
    client.send(PING).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    for req in http.requests() {
        assert!(req.headers[AUTHORIZATION]
            .to_str()?
            .contains("Credential=AKIDSECOND/"));
        assert_eq!(req.headers["x-amz-security-token"], "second-token");
    }
    Ok(())
}

#[tokio::test]
async fn test_concurrent_sends_refresh_credential_once() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let provider = RotatingProvider::default();
    let calls = provider.calls.clone();

    let client = Client::builder(test_config())
        .with_http_send(http.clone())
        .with_credential_provider(provider)
        .build()
        .await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move { client.send(PING).await }));
    }
    for task in tasks {
        task.await??;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    let requests = http.requests();
    assert_eq!(requests.len(), 16);
    for req in requests {
        assert_eq!(req.headers["x-amz-security-token"], "second-token");
    }
    Ok(())
}

/// Short lived credential first, then one failure, then a long lived one.
#[derive(Debug, Default)]
struct FlakyProvider {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl ProvideCredential for FlakyProvider {
    type Credential = Credential;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let now = chrono::Utc::now();

        match call {
            0 => Ok(Some(Credential {
                access_key_id: "AKIDFIRST".to_string(),
                secret_access_key: SECRET_ACCESS_KEY.to_string(),
                session_token: None,
                expires_in: Some(now + chrono::TimeDelta::seconds(121)),
            })),
            1 => Err(appsign_core::Error::unexpected("metadata service unreachable")),
            _ => Ok(Some(Credential {
                access_key_id: "AKIDSECOND".to_string(),
                secret_access_key: SECRET_ACCESS_KEY.to_string(),
                session_token: None,
                expires_in: Some(now + chrono::TimeDelta::hours(1)),
            })),
        }
    }
}

#[tokio::test]
async fn test_send_failed_refresh_is_retried() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let provider = FlakyProvider::default();
    let calls = provider.calls.clone();

    let client = Client::builder(test_config())
        .with_http_send(http.clone())
        .with_credential_provider(provider)
        .build()
        .await?;

    tokio::time::sleep(Duration::from_millis(1500)).await;

    let err = client.send(PING).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CredentialUnavailable);
    assert!(http.requests().is_empty());

    client.send(PING).await?;
    assert_eq!(calls.load(Ordering::SeqCst), 3);

    let requests = http.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers[AUTHORIZATION]
        .to_str()?
        .contains("Credential=AKIDSECOND/"));
    Ok(())
}

#[tokio::test]
async fn test_execute() -> anyhow::Result<()> {
    let http = MockHttpSend::new(StatusCode::OK, PONG);
    let client = test_client(&http).await;

    let resp: GraphqlResponse<serde_json::Value> =
        client.execute(&GraphqlRequest::new("{ ping }")).await?;
    assert_eq!(resp.data, Some(serde_json::json!({"ping": "pong"})));
    assert!(resp.errors.is_empty());
    assert_eq!(http.requests()[0].body.as_ref(), PING.as_bytes());
    Ok(())
}

#[tokio::test]
async fn test_execute_invalid_response() {
    let http = MockHttpSend::new(StatusCode::OK, "<html>gateway</html>");
    let client = test_client(&http).await;

    let err = client
        .execute::<_, serde_json::Value>(&GraphqlRequest::new("{ ping }"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unexpected);
}

fn static_credential() -> Credential {
    Credential {
        access_key_id: ACCESS_KEY_ID.to_string(),
        secret_access_key: SECRET_ACCESS_KEY.to_string(),
        session_token: None,
        expires_in: None,
    }
}
