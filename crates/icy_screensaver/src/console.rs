//! Line based control surface standing in for the settings form and the log window.

use std::{fmt, str::FromStr, sync::Arc};

use icy_covers::{CoverError, GridCoordinator, SourceMode};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::error::RecvError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Size(u32),
    Mode(SourceMode),
    Query(String),
    SetInterval(u64),
    ShowInterval,
    Reset,
    Area(u32, u32),
    Status,
    Log,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCommandError(String);

impl fmt::Display for ParseCommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (type 'help' for a list of commands)", self.0)
    }
}

impl std::error::Error for ParseCommandError {}

fn number<T: FromStr>(arg: Option<&str>, what: &str) -> Result<T, ParseCommandError> {
    let Some(arg) = arg else {
        return Err(ParseCommandError(format!("missing {what}")));
    };
    arg.parse().map_err(|_| ParseCommandError(format!("'{arg}' is not a valid {what}")))
}

impl FromStr for ConsoleCommand {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        let parsed = match command.to_ascii_lowercase().as_str() {
            "size" => ConsoleCommand::Size(number(args.next(), "grid size")?),
            "mode" => {
                let mode = args.next().ok_or_else(|| ParseCommandError("missing mode, use 'local' or 'remote'".to_string()))?;
                ConsoleCommand::Mode(mode.parse().map_err(|err: CoverError| ParseCommandError(err.to_string()))?)
            }
            // The query keeps its inner spacing, the catalog request strips it
            "query" => ConsoleCommand::Query(rest.to_string()),
            "interval" if rest.is_empty() => ConsoleCommand::ShowInterval,
            "interval" => ConsoleCommand::SetInterval(number(args.next(), "number of seconds")?),
            "reset" => ConsoleCommand::Reset,
            "area" => ConsoleCommand::Area(number(args.next(), "width")?, number(args.next(), "height")?),
            "status" => ConsoleCommand::Status,
            "log" => ConsoleCommand::Log,
            "help" | "?" => ConsoleCommand::Help,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            "" => return Err(ParseCommandError("empty command".to_string())),
            other => return Err(ParseCommandError(format!("unknown command '{other}'"))),
        };
        Ok(parsed)
    }
}

impl ConsoleCommand {
    /// Commands that may wait on a rebuild or on the supply. They run on their own task so
    /// input and the event echo keep flowing meanwhile.
    pub fn runs_in_background(&self) -> bool {
        matches!(
            self,
            ConsoleCommand::Size(_) | ConsoleCommand::Mode(_) | ConsoleCommand::Query(_) | ConsoleCommand::Reset | ConsoleCommand::Status
        )
    }
}

const HELP: &str = "\
size <n>          switch to an n x n grid
mode local|remote switch the image source
query <text>      set the catalog search term
interval [secs]   show or set the refresh interval
reset             rebuild the grid
area <w> <h>      resize the display area
status            show the grid state
log               show recent events
quit              leave

size, mode, query, reset and status run in the background; events keep printing meanwhile.";

/// Returns `false` once the console should close.
async fn dispatch(coordinator: &Arc<GridCoordinator>, command: ConsoleCommand) -> bool {
    match command {
        ConsoleCommand::Size(dimension) => {
            if let Err(err) = coordinator.set_grid_dimension(dimension).await {
                println!("{err}");
            }
        }
        ConsoleCommand::Mode(mode) => coordinator.set_source_mode(mode).await,
        ConsoleCommand::Query(query) => {
            coordinator.set_search_query(&query).await;
            println!("search query: '{query}'");
        }
        ConsoleCommand::SetInterval(seconds) => match coordinator.set_refresh_interval(seconds) {
            Ok(()) => println!("refresh interval: {seconds}s"),
            Err(err) => println!("{err}"),
        },
        ConsoleCommand::ShowInterval => println!("refresh interval: {}s", coordinator.refresh_interval()),
        ConsoleCommand::Reset => coordinator.force_rebuild().await,
        ConsoleCommand::Area(width, height) => coordinator.on_display_area_changed(width, height),
        ConsoleCommand::Status => {
            let state = coordinator.snapshot();
            println!(
                "{0}x{0} grid, {1}/{2} cells filled, {3}px cells, source {4}, every {5}s, generation {6}{7}",
                state.dimension,
                state.filled_count(),
                state.cell_count(),
                state.cell_edge(),
                state.mode,
                state.refresh_interval_secs,
                state.generation,
                if state.rebuild_in_progress { ", rebuilding" } else { "" }
            );
            if let Some(query) = coordinator.search_query().await {
                println!("search query: '{query}'");
            }
            println!("refresh timer {}", if coordinator.is_timer_running() { "running" } else { "stopped" });
        }
        ConsoleCommand::Log => {
            for entry in coordinator.events().history() {
                println!("{entry}");
            }
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => return false,
    }
    true
}

/// Read commands from stdin until `quit` or end of input, echoing events as they happen.
pub async fn run_console(coordinator: Arc<GridCoordinator>, echo_events: bool) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut events = coordinator.events().subscribe();

    println!("Type 'help' for a list of commands.");
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<ConsoleCommand>() {
                    Ok(command) if command.runs_in_background() => {
                        let coordinator = coordinator.clone();
                        tokio::spawn(async move {
                            dispatch(&coordinator, command).await;
                        });
                    }
                    Ok(command) => {
                        if !dispatch(&coordinator, command).await {
                            break;
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            event = events.recv() => match event {
                Ok(event) => {
                    if echo_events {
                        println!("> {event}");
                    }
                }
                Err(RecvError::Lagged(skipped)) => log::debug!("Console skipped {} events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    }
    Ok(())
}
