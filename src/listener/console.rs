//! Interactive console for a listener session
//!
//! Pressing Enter (or `unlock`) is the user gesture that opens the audio gate.

use std::io::Write;

use chime_core::{Amount, ConnectionState, PlaybackHandle};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;

pub struct ConsoleContext {
    pub playback: PlaybackHandle,
    pub connection: Option<watch::Receiver<ConnectionState>>,
}

#[derive(Parser)]
#[command(about = "chime listener console", disable_version_flag = true)]
struct ConsoleLine {
    #[command(subcommand)]
    command: Option<ConsoleCommand>,
}

#[derive(Subcommand)]
enum ConsoleCommand {
    /// Initialize audio output and start playing queued amounts
    Unlock,
    /// Gate, playback and connection state
    Status,
    /// Recent activity
    Log,
    /// Stop the sequence currently playing
    Cancel,
    /// Announce an amount locally
    Say { amount: f64 },
    Quit,
}

fn prompt() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

/// Read commands from stdin until `quit` or end of input
pub async fn run(ctx: &ConsoleContext) -> std::io::Result<()> {
    println!("Press Enter to enable audio. Type 'help' for commands.");
    prompt()?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match respond(line.trim(), ctx).await {
            Ok(true) => break,
            Ok(false) => {}
            Err(err) => println!("{err}"),
        }
        prompt()?;
    }
    Ok(())
}

async fn respond(line: &str, ctx: &ConsoleContext) -> Result<bool, String> {
    if line.is_empty() {
        unlock(ctx).await;
        return Ok(false);
    }

    let mut args = shlex::split(line).ok_or("error: Invalid quoting")?;
    args.insert(0, "chime".to_string());
    let cli = ConsoleLine::try_parse_from(args).map_err(|e| e.to_string())?;

    match cli.command {
        Some(ConsoleCommand::Unlock) => unlock(ctx).await,
        Some(ConsoleCommand::Status) => status(ctx).await?,
        Some(ConsoleCommand::Log) => {
            let snapshot = ctx.playback.snapshot().await.map_err(|e| e.to_string())?;
            if snapshot.activity.is_empty() {
                println!("(no activity yet)");
            }
            for entry in snapshot.activity {
                println!("{entry}");
            }
        }
        Some(ConsoleCommand::Cancel) => {
            ctx.playback.cancel().await.map_err(|e| e.to_string())?;
        }
        Some(ConsoleCommand::Say { amount }) => {
            let amount = Amount::new(amount).map_err(|e| e.to_string())?;
            ctx.playback
                .announce(amount)
                .await
                .map_err(|e| e.to_string())?;
        }
        Some(ConsoleCommand::Quit) => {
            println!("quitting...");
            return Ok(true);
        }
        None => {}
    }
    Ok(false)
}

async fn unlock(ctx: &ConsoleContext) {
    match ctx.playback.unlock().await {
        Ok(()) => println!("Audio enabled"),
        Err(e) => println!("Could not enable audio: {e}"),
    }
}

async fn status(ctx: &ConsoleContext) -> Result<(), String> {
    let snapshot = ctx.playback.snapshot().await.map_err(|e| e.to_string())?;
    println!("audio gate:  {:?}", snapshot.gate);
    println!("playback:    {:?}", snapshot.state);
    println!("sequence:    {:?}", *ctx.playback.sequence_state().borrow());
    println!("pending:     {:?}", snapshot.pending);
    match &ctx.connection {
        Some(state) => println!("push:        {:?}", *state.borrow()),
        None => println!("push:        disabled"),
    }
    Ok(())
}
