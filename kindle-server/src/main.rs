mod http;

use http::{HttpModule, HttpServer};
use kindle_bootstrap::{Bootstrap, BootstrapError, Environment, PrometheusAgent};

fn main() -> Result<(), BootstrapError> {
    // a missing .env file is fine
    let _ = dotenvy::dotenv();
    let env = Environment::from_process();

    let bootstrap = Bootstrap::builder()
        .initialize_logging(true)
        .show_config(true)
        .modules(vec![Box::new(HttpModule)])
        .build();
    bootstrap.initialize()?;
    tracing::info!("bootstrap initialized");

    let provider = bootstrap.service_provider()?;
    let server = provider.get_required::<HttpServer>();
    let agent = PrometheusAgent::new();
    bootstrap.run(&env, &agent, &*server)
}
