use super::*;
use appsign_appsync::{DefaultCredentialProvider, ProfileCredentialProvider};
use appsign_core::StaticEnv;
use http::header::AUTHORIZATION;
use std::collections::HashMap;
use std::fs;
use tempfile::tempdir;

fn context_with_env(envs: &[(&str, &str)]) -> Context {
    Context::new()
        .with_file_read(TokioFileRead)
        .with_env(StaticEnv {
            home_dir: None,
            envs: envs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        })
}

fn authorization(req: &RecordedRequest) -> String {
    req.headers[AUTHORIZATION].to_str().unwrap().to_string()
}

#[tokio::test]
async fn test_client_with_env_credential() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let ctx = context_with_env(&[
        ("AWS_ACCESS_KEY_ID", "AKIDFROMENV"),
        ("AWS_SECRET_ACCESS_KEY", SECRET_ACCESS_KEY),
        ("AWS_SESSION_TOKEN", "env-session-token"),
    ]);
    let http = MockHttpSend::new(StatusCode::OK, "{}");

    let client = Client::builder(test_config())
        .with_context(ctx)
        .with_http_send(http.clone())
        .build()
        .await?;
    client.send(r#"{"query":"{ ping }"}"#).await?;

    let req = &http.requests()[0];
    assert!(authorization(req).contains("Credential=AKIDFROMENV/"));
    assert_eq!(req.headers["x-amz-security-token"], "env-session-token");
    Ok(())
}

#[tokio::test]
async fn test_client_with_profile_credential() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    let dir = tempdir()?;
    let path = dir.path().join("credentials");
    fs::write(
        &path,
        "[default]\naws_access_key_id = AKIDDEFAULT\naws_secret_access_key = DEFAULTSECRET\n\n\
         [appsync]\naws_access_key_id = AKIDAPPSYNC\naws_secret_access_key = APPSYNCSECRET\n",
    )?;
    let path = path.to_string_lossy().to_string();

    let ctx = context_with_env(&[
        ("AWS_SHARED_CREDENTIALS_FILE", path.as_str()),
        ("AWS_PROFILE", "appsync"),
    ]);
    let http = MockHttpSend::new(StatusCode::OK, "{}");

    let client = Client::builder(test_config())
        .with_context(ctx.clone())
        .with_http_send(http.clone())
        .build()
        .await?;
    client.send(r#"{"query":"{ ping }"}"#).await?;
    assert!(authorization(&http.requests()[0]).contains("Credential=AKIDAPPSYNC/"));

    // An explicit profile wins over AWS_PROFILE.
    let http = MockHttpSend::new(StatusCode::OK, "{}");
    let client = Client::builder(test_config())
        .with_context(ctx)
        .with_http_send(http.clone())
        .with_credential_provider(ProfileCredentialProvider::new().with_profile("default"))
        .build()
        .await?;
    client.send(r#"{"query":"{ ping }"}"#).await?;
    assert!(authorization(&http.requests()[0]).contains("Credential=AKIDDEFAULT/"));
    Ok(())
}

#[tokio::test]
async fn test_client_with_container_credential() -> anyhow::Result<()> {
    let _ = env_logger::builder().is_test(true).try_init();

    // Credentials come from the context transport, GraphQL goes to its own.
    let metadata = MockHttpSend::new(
        StatusCode::OK,
        r#"{"AccessKeyId":"AKIDCONTAINER","SecretAccessKey":"CONTAINERSECRET","Token":"container-token","Expiration":"2099-01-01T00:00:00Z"}"#,
    );
    let ctx = context_with_env(&[("AWS_CONTAINER_CREDENTIALS_RELATIVE_URI", "/v2/credentials/1")])
        .with_http_send(metadata.clone());
    let http = MockHttpSend::new(StatusCode::OK, "{}");

    let client = Client::builder(test_config())
        .with_context(ctx)
        .with_http_send(http.clone())
        .with_credential_provider(DefaultCredentialProvider::new())
        .build()
        .await?;
    client.send(r#"{"query":"{ ping }"}"#).await?;

    let metadata_requests = metadata.requests();
    assert_eq!(metadata_requests.len(), 1);
    assert_eq!(
        metadata_requests[0].uri.to_string(),
        "http://169.254.170.2/v2/credentials/1"
    );

    let req = &http.requests()[0];
    assert!(authorization(req).contains("Credential=AKIDCONTAINER/"));
    assert_eq!(req.headers["x-amz-security-token"], "container-token");
    Ok(())
}
