use session_auth::configuration::get_configuration;
use session_auth::startup::Application;
use session_auth::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry("info");

    tracing::info!("Starting application");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Missing signing secrets abort here, never per request
    let application = match Application::build(configuration).await {
        Ok(app) => app,
        Err(e) => {
            tracing::error!("Failed to start application: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                "Startup error",
            ));
        }
    };

    tracing::info!(port = application.port(), "Server started successfully");
    application.run_until_stopped().await
}
