use bubble_drawing_service::{
    configuration::get_configuration,
    startup::Application,
    telemetry::{get_tracing_subscriber, init_tracing_subscriber},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracing_subscriber = get_tracing_subscriber(
        "bubble_drawing_service".into(),
        "info".into(),
        std::io::stdout,
    );
    init_tracing_subscriber(tracing_subscriber);

    // Panics if the configuration can't be read
    let configuration = get_configuration().expect("Failed to read configuration.");

    let application = Application::build(configuration, None).await?;
    application.run_until_stopped().await?;

    Ok(())
}
