use anyhow::{Context, Result};
use clap::Parser;
use fern::colors::{Color, ColoredLevelConfig};

mod aggregate;
mod auth;
mod console;
mod datetime;
mod event;
mod export;
mod export_command;
mod google_calendar;
mod normalize;
mod table;

use auth::TokenStore;
use console::{ConsoleMarkdownList, ConsolePresenter};
use export_command::{ExportArgs, ExportCommand};
use google_calendar::GoogleCalendarClient;

/// Google Calendarのイベントから活動ごとの時間を集計するCLIアプリケーション。
///
/// # Examples
/// ```
/// $ cargo run -- -s 2023-10-01 -e 2023-11-01
/// $ cargo run -- -o data
/// ```
#[derive(Debug, Parser)]
#[clap(version, about)]
struct Args {
    #[clap(flatten)]
    export: ExportArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    setup_logger().context("Failed to initialize logger")?;

    let config_dir = auth::default_config_dir().context("Failed to resolve config directory")?;
    let token_store = TokenStore::new(&config_dir);
    let access_token = token_store
        .access_token()
        .await
        .context("Failed to prepare access token")?;

    let client = GoogleCalendarClient::new(access_token);
    let command = ExportCommand::new(&client);
    let totals = command.run(args.export).await?;

    let mut stdout = std::io::stdout();
    ConsoleMarkdownList::new(&mut stdout).show_totals(&totals)?;

    Ok(())
}

/// ロガーを初期化する。
fn setup_logger() -> Result<(), fern::InitError> {
    let colors = ColoredLevelConfig::new()
        .info(Color::Green)
        .warn(Color::Yellow)
        .error(Color::Red);

    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                colors.color(record.level()),
                message
            ))
        })
        .level(log::LevelFilter::Info)
        .chain(std::io::stderr())
        .apply()?;

    Ok(())
}
