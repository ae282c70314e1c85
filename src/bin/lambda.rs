use aws_config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{service_fn, Error as LambdaError, LambdaEvent};
use serde_json::{json, Value};

use harvester::{
    config::{HarvestConfig, ObjectKey},
    format::ExportFormat,
    harvester::ArxivHarvester,
    logging,
    storage::S3Storage,
    Error,
};

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    logging::init();
    let func = service_fn(func);
    lambda_runtime::run(func).await?;
    Ok(())
}

// when testing, lambda functions cannot accept LambdaEvent<()>
async fn func(_event: LambdaEvent<Value>) -> Result<Value, LambdaError> {
    let config = HarvestConfig::from_env()?;
    let region = get_env_string("REGION")?;
    let bucket = get_env_string("BUCKET")?;
    let key = ObjectKey::new(&config).raw_path(ExportFormat::Jsonl);

    let harvester = ArxivHarvester::from_config(config.clone())?;
    let papers = harvester.harvest().await?;

    let conf = aws_config::from_env()
        .region(Region::new(region))
        .load()
        .await;
    let storage = S3Storage::new(S3Client::new(&conf));
    storage
        .upload(&bucket, &key, &papers, ExportFormat::Jsonl, &config.fields.fields())
        .await?;

    Ok(json!({ "bucket": bucket, "key": key, "records": papers.len() }))
}

fn get_env_string(key: &str) -> Result<String, Error> {
    std::env::var(key).map_err(|_| Error::Env(format!("{} not found in env", key)))
}
