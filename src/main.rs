use anyhow::Result;
use clap::{CommandFactory, Parser};
use owo_colors::OwoColorize;
use whisperq::app::{self, AppContext};
use whisperq::cli::{Cli, Commands};
use whisperq::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings_path = cli.config.clone().unwrap_or_else(Settings::default_path);
    let loaded = Settings::load_or_default(&settings_path).with_env_overrides();
    let settings = cli.apply_overrides(loaded.clone());
    if settings != loaded
        && let Err(e) = settings.save(&settings_path)
    {
        eprintln!("whisperq: failed to save settings: {e}");
    }

    match cli.command {
        Some(Commands::Live) => {
            let ctx = AppContext::production();
            if let Err(e) = app::run_live(&settings, &ctx).await {
                eprintln!("{} {e}", "error:".red());
                std::process::exit(1);
            }
        }
        Some(Commands::Completions { shell }) => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "whisperq",
                &mut std::io::stdout(),
            );
        }
        None => {
            if cli.files.is_empty() {
                Cli::command().print_help()?;
                return Ok(());
            }
            let ctx = AppContext::production();
            let summary = app::run_queue(cli.files, settings.job_options(), &ctx).await;
            if summary.failed > 0 {
                eprintln!(
                    "whisperq: {} of {} file(s) failed",
                    summary.failed,
                    summary.completed + summary.failed
                );
            }
        }
    }

    Ok(())
}
