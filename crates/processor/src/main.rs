mod cli;
mod config;
mod driver;
mod ingest;
mod metrics;
mod progress;
mod server;
mod store;


fn init_logging(json: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false);

    if json {
        builder.json().with_current_span(false).init();
    } else {
        builder.init();
    }
}


fn main() -> anyhow::Result<()> {
    let args = <cli::Cli as clap::Parser>::parse();

    init_logging(args.json_log);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(driver::run(&args))?;
    Ok(())
}
