use anyhow::Result;
use appsign::appsync::{connect_from_env, GraphqlRequest, GraphqlResponse};
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    // APPSYNC_GRAPHQL_ENDPOINT and AWS_REGION must be set, credentials are
    // taken from the default chain.
    let client = connect_from_env().await?;

    let req = GraphqlRequest::new("query { __typename }");
    let resp: GraphqlResponse<serde_json::Value> = client.execute(&req).await?;

    for err in &resp.errors {
        info!("graphql error: {}", err.message);
    }
    println!("{}", serde_json::to_string_pretty(&resp.data)?);

    Ok(())
}
