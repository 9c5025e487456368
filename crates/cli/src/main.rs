use anyhow::Context;
use clap::{Parser, Subcommand};

use catalog_app::{seed, Catalog};
use catalog_kernel::settings::Settings;

/// Bookstore catalog service
#[derive(Parser, Debug)]
#[command(name = "catalog-cli")]
#[command(version)]
#[command(about = "Run and inspect the bookstore catalog service")]
struct Cli {
    /// Database URL, overriding the configured one (e.g. sqlite://catalog.db)
    #[arg(long, global = true, value_name = "URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Insert the demo categories and books
    Seed,

    /// Print category and book counts
    Stats {
        /// Books listed per category
        #[arg(long, default_value_t = 3)]
        preview: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load().context("failed to load catalog settings")?;
    if let Some(url) = cli.database_url {
        settings.database.url = url;
    }
    catalog_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                settings.server.port = port;
            }
            catalog_app::run(settings).await
        }
        Command::Seed => {
            let catalog = Catalog::open(settings).await?;
            let report = seed::seed(catalog.store().as_ref()).await;
            catalog.close().await;
            let report = report?;

            println!(
                "categories created: {}, reused: {}; books created: {}",
                report.categories_created, report.categories_reused, report.books_created
            );
            Ok(())
        }
        Command::Stats { preview } => {
            let catalog = Catalog::open(settings).await?;
            let stats = seed::stats(catalog.store().as_ref(), preview).await;
            catalog.close().await;

            print!("{}", stats?);
            Ok(())
        }
    }
}
