use std::error::Error;

use chime::{listener, logging, server};
use chime_core::{ChimeConfigExt, SoundCatalogue, decompose};
use chime_types::ChimeConfig;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(version, about = "Announce received payment amounts out loud")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the announcement server
    Serve {
        /// Address to bind, e.g. 0.0.0.0:3000
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        sounds_dir: Option<String>,
    },
    /// Run a listener that plays announced amounts
    Listen {
        /// Base URL of the announcement server
        #[arg(long)]
        server_url: Option<String>,
        #[arg(long)]
        sounds_dir: Option<String>,
        /// Disable the WebSocket push channel
        #[arg(long)]
        no_push: bool,
        /// Disable the polling fallback
        #[arg(long)]
        no_poll: bool,
        /// Enable audio immediately instead of waiting for Enter
        #[arg(long)]
        unlock: bool,
    },
    /// Report required sound clips that are missing
    CheckSounds {
        #[arg(long)]
        sounds_dir: Option<String>,
        /// Check the listener's clip directory instead of the server's
        #[arg(long)]
        listener: bool,
    },
    /// Print the tokens spoken for an amount
    Decompose { amount: f64 },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, sounds_dir } => {
            let _guard = logging::init();
            let mut config = ChimeConfig::load();
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            if let Some(dir) = sounds_dir {
                config.server.sounds_dir = dir;
            }

            let catalogue =
                SoundCatalogue::new(&config.server.sounds_dir, &config.audio.extension);
            catalogue.validate();
            let state = server::ServerState::new(&config.server, catalogue);
            server::serve(&config.server.bind, state).await?;
        }
        Commands::Listen {
            server_url,
            sounds_dir,
            no_push,
            no_poll,
            unlock,
        } => {
            let _guard = logging::init();
            let mut config = ChimeConfig::load();
            if let Some(url) = server_url {
                config.listener.server_url = url;
            }
            if let Some(dir) = sounds_dir {
                config.audio.sounds_dir = dir;
            }
            config.listener.push_enabled &= !no_push;
            config.listener.poll_enabled &= !no_poll;
            config.listener.auto_unlock |= unlock;

            listener::run(config).await?;
        }
        Commands::CheckSounds {
            sounds_dir,
            listener,
        } => {
            logging::init_stderr();
            let config = ChimeConfig::load();
            let dir = check_sounds_dir(&config, sounds_dir, listener);
            let catalogue = SoundCatalogue::new(dir, &config.audio.extension);
            let report = catalogue.report();
            println!("{}: {}", catalogue.dir().display(), report.message);
            for file in &report.missing_files {
                println!("  missing: {file}");
            }
            if !report.success {
                std::process::exit(1);
            }
        }
        Commands::Decompose { amount } => {
            logging::init_stderr();
            let tokens = decompose(amount)?;
            let ids: Vec<String> = tokens.iter().map(|t| t.id()).collect();
            println!("{}", ids.join(" "));
        }
    }

    Ok(())
}

/// Clip directory for `check-sounds`: the one `serve` and `/api/check-sounds`
/// use unless `--listener` asks for the one `listen` plays from
fn check_sounds_dir(config: &ChimeConfig, override_dir: Option<String>, listener: bool) -> String {
    override_dir.unwrap_or_else(|| {
        if listener {
            config.audio.sounds_dir.clone()
        } else {
            config.server.sounds_dir.clone()
        }
    })
}
