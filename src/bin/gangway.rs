use clap::{command, Parser};
use futures::{stream::SelectAll, Stream};
use gangway::{
    config::HarnessConfig,
    harness::Harness,
    module::registry::ModuleRegistry,
    report::{ErrorReport, Report, ReportBus, ReportKind},
    Error,
};
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use tracing::{debug, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Capability bundle to load, overriding the configured one
    #[arg(short, long)]
    module: Option<String>,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

enum PrinterMessage {
    Report(Report),
    Error(ErrorReport),
}

async fn run(cli: &Cli) -> Result<(), Error> {
    // Load config
    let config: HarnessConfig = if cli.config.exists() {
        HarnessConfig::from_file(&cli.config)?
    } else {
        HarnessConfig::default()
    };

    info!("config loaded.");
    debug!("config: {:?}", config);

    let module_name = cli.module.clone().unwrap_or_else(|| config.module.clone());

    // Obtaining the capability bundle is fatal on failure.
    let registry = ModuleRegistry::new();
    let module = registry.load(&module_name)?;

    debug!("Module loaded: {}", module_name);

    let bus = Arc::new(ReportBus::new(config.report_buffer_size));
    let (report_rx, error_rx) = bus.subscribe();

    // Merge the report and error channels into a single printer loop.
    let report_stream = BroadcastStream::new(report_rx.receiver).map(|r| match r {
        Ok(report) => Ok(PrinterMessage::Report(report)),
        Err(_) => Err(()),
    });
    let error_stream = BroadcastStream::new(error_rx.receiver).map(|r| match r {
        Ok(error) => Ok(PrinterMessage::Error(error)),
        Err(_) => Err(()),
    });

    let mut streams: SelectAll<Pin<Box<dyn Stream<Item = Result<PrinterMessage, ()>> + Send>>> =
        SelectAll::new();
    streams.push(Box::pin(report_stream));
    streams.push(Box::pin(error_stream));

    let printer = tokio::spawn(async move {
        while let Some(Ok(message)) = streams.next().await {
            match message {
                PrinterMessage::Report(report) => {
                    println!("{}", report);
                    if report.kind == ReportKind::RunFinished {
                        break;
                    }
                }
                PrinterMessage::Error(error) => {
                    eprintln!("{}: {} ({})", error.severity, error.message, error.source);
                }
            }
        }
    });

    let harness = Harness::new(module, bus, config);
    let summary = harness.run().await?;

    printer
        .await
        .map_err(|e| Error::internal(format!("Printer task failed: {}", e)))?;

    println!(
        "Run complete: {} ticks, delay {}ms, deferred {}",
        summary.ticks,
        summary.delay_elapsed.as_millis(),
        summary.deferred_settlement
    );

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt().with_env_filter("debug").init();
    } else {
        tracing_subscriber::fmt().init();
    }

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
