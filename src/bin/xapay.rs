use std::fs::File;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use xapay::{
    bin_utils::{ReplayError, Service},
    config::HookConfig,
};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let filename = args
        .next()
        .context("Expected a file name as the first argument")?;
    let config = match args.next() {
        Some(operator) => HookConfig::new(
            operator
                .parse()
                .with_context(|| format!("Invalid operator account `{operator}`"))?,
        ),
        None => HookConfig::from_env().context("Expected an operator as the second argument")?,
    };
    let file = File::open(&filename).with_context(|| format!("Failed to open `{filename}`"))?;

    let service = Service {
        input: file,
        output: &mut std::io::stdout(),
        config,
        error_printer: Box::new(|line, err| match err {
            ReplayError::Rejected(outcome) => eprintln!("Line {line}: {outcome}"),
            err => eprintln!("Error at line {line}: {err}"),
        }),
    };
    service.run()
}
