use appsign_core::{
    Context, ProvideCredential, ProvideCredentialChain, Result, SigningCredential, StaticEnv,
};
use async_trait::async_trait;
use std::collections::HashMap;

/// A bearer token with no expiry.
#[derive(Clone, Debug)]
struct Token(String);

impl SigningCredential for Token {
    fn is_valid(&self) -> bool {
        !self.0.is_empty()
    }
}

/// Reads the token from `DEMO_TOKEN`.
#[derive(Debug)]
struct EnvTokenProvider;

#[async_trait]
impl ProvideCredential for EnvTokenProvider {
    type Credential = Token;

    async fn provide_credential(&self, ctx: &Context) -> Result<Option<Self::Credential>> {
        Ok(ctx.env_var("DEMO_TOKEN").map(Token))
    }
}

/// Always hands out the same token.
#[derive(Debug)]
struct FallbackProvider;

#[async_trait]
impl ProvideCredential for FallbackProvider {
    type Credential = Token;

    async fn provide_credential(&self, _: &Context) -> Result<Option<Self::Credential>> {
        Ok(Some(Token("fallback".to_string())))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let chain = ProvideCredentialChain::new()
        .push(EnvTokenProvider)
        .push(FallbackProvider);

    let ctx = Context::new().with_env(StaticEnv {
        home_dir: None,
        envs: HashMap::from([("DEMO_TOKEN".to_string(), "from-env".to_string())]),
    });
    println!("with env: {:?}", chain.provide_credential(&ctx).await?);
    println!("without env: {:?}", chain.provide_credential(&Context::new()).await?);

    Ok(())
}
