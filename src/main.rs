use lambda_http::{run, service_fn, tracing, Error};
mod config;
mod error;
mod handler;
mod publisher;
mod rows;
mod sns;
use config::Config;
use handler::function_handler;
use rows::init_thread_pool;
use sns::SnsPublisher;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;

    // Row parsing pool lives as long as the execution environment
    init_thread_pool(config.workers);

    let aws = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let publisher = SnsPublisher::new(aws_sdk_sns::Client::new(&aws), config.topic_arn.clone());

    run(service_fn(|event| function_handler(&publisher, &config, event))).await
}
