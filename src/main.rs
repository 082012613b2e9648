use log::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize the logger; `log` records are bridged into tracing.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        let _ = tracing_log::LogTracer::init();
    }

    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .ok();

    // Run the application
    if let Err(e) = sendgrid_mail::run().await {
        error!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
