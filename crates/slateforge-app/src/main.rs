// Slateforge entry point.
//
// Startup sequence:
// 1. Initialize tracing (stderr, so stdout carries only the report)
// 2. Load config (explicit path argument, else the default search path)
// 3. Load the player pool CSV
// 4. Optimize and simulate under the configured deadline
// 5. Print the JSON run report

use slateforge_app::config;
use slateforge_app::pool;
use slateforge_app::run;

use anyhow::Context;
use std::path::Path;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("slateforge starting up");

    // 2. Load config
    let config = match std::env::args_os().nth(1) {
        Some(path) => config::load_config_from(Path::new(&path)),
        None => config::load_config(),
    }
    .context("failed to load configuration")?;
    info!(
        "Config loaded: {} lineups, {} roster slots, ${} salary cap",
        config.lineups, config.rules.roster_size, config.rules.salary_cap
    );

    // 3. Load the player pool
    let players_path = Path::new(&config.data.players);
    let players = pool::load_players(players_path)
        .with_context(|| format!("failed to load player pool from {}", players_path.display()))?;
    info!("Loaded {} players", players.len());

    // 4. Optimize and simulate
    let report = run::run(&config, players).await.context("run failed")?;

    // 5. Emit the report
    let json = report
        .to_json_pretty()
        .context("failed to serialize run report")?;
    println!("{json}");

    info!(
        "slateforge finished: {} of {} lineups",
        report.produced, report.requested
    );
    Ok(())
}

/// Initialize tracing to stderr.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("slateforge=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
