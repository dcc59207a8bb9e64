use tracing::info;
use xslt_debug::{DebugAdapter, DebugSession};
use xslt_runtime::EngineRegistry;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("Starting xslt-dap adapter");
    // Engine backends link in at embed time through the registry; the stock
    // binary serves the protocol and reports unknown selectors per launch.
    let registry = EngineRegistry::new();
    let session = DebugSession::new(registry);
    let mut adapter = DebugAdapter::new(session);
    if let Err(err) = adapter.run_stdio() {
        eprintln!("xslt-dap error: {err}");
        std::process::exit(1);
    }
}
