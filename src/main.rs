use anyhow::Context;
use enrollweb::configuration::get_configuration;
use enrollweb::startup::Application;
use enrollweb::telemetry::{get_subscriber, init_subscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("enrollweb".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let configuration = get_configuration().context("Failed to read configuration.")?;
    let application = Application::build(configuration).await?;
    tracing::info!(
        port = application.port(),
        "Server initialized and listening on port {}.",
        application.port()
    );

    application.run_until_stopped().await
}
