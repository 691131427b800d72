#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::cast_possible_truncation, clippy::struct_excessive_bools)]

mod console;
mod options;

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use flexi_logger::{Cleanup, Criterion, FileSpec, Logger, Naming};
use icy_covers::SourceMode;

pub use options::*;

#[derive(Parser, Debug)]
#[command(version, about = "Album cover wall screensaver", long_about = None)]
pub struct Args {
    /// Directory with the local album covers
    #[arg(long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Image source: local or remote
    #[arg(long, value_name = "MODE")]
    mode: Option<SourceMode>,

    /// Catalog search term
    #[arg(long)]
    query: Option<String>,

    /// Grid size (2-6)
    #[arg(long, value_name = "N")]
    size: Option<u32>,

    /// Seconds between cell replacements
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Display area width in pixels
    #[arg(long)]
    width: Option<u32>,

    /// Display area height in pixels
    #[arg(long)]
    height: Option<u32>,

    /// Don't echo events to the console
    #[arg(long, default_value_t = false)]
    quiet: bool,

    /// Don't write changed settings back on exit
    #[arg(long, default_value_t = false)]
    no_save: bool,
}

impl Args {
    fn apply(&self, options: &mut Options) {
        let covers = &mut options.covers;
        if let Some(dir) = &self.dir {
            covers.local.directory.clone_from(dir);
        }
        if let Some(mode) = self.mode {
            covers.grid.mode = mode;
        }
        if let Some(query) = &self.query {
            covers.remote.search_query.clone_from(query);
        }
        if let Some(size) = self.size {
            covers.grid.dimension = size;
        }
        if let Some(interval) = self.interval {
            covers.grid.refresh_interval_secs = interval;
        }
        if let Some(width) = self.width {
            covers.grid.display_area.0 = width;
        }
        if let Some(height) = self.height {
            covers.grid.display_area.1 = height;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _logger = if let Some(log_dir) = Options::get_log_dir() {
        let handle = Logger::try_with_env_or_str("info, reqwest=warn, hyper=warn")
            .context("invalid log specification")?
            .log_to_file(FileSpec::default().directory(&log_dir).basename("icy_screensaver").suffix("log").suppress_timestamp())
            .rotate(Criterion::Size(64 * 1024), Naming::Numbers, Cleanup::KeepLogFiles(3))
            .create_symlink(log_dir.join("icy_screensaver.log"))
            .duplicate_to_stderr(flexi_logger::Duplicate::Warn)
            .start()
            .context("failed to start logger")?;
        Some(handle)
    } else {
        eprintln!("Failed to create log file");
        None
    };

    log::info!("Starting icy_screensaver {}", env!("CARGO_PKG_VERSION"));

    let mut options = Options::load_options();
    args.apply(&mut options);

    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(async {
        let config = options.runtime_config();
        let coordinator = Arc::new(icy_covers::build_coordinator(&config).context("invalid settings")?);
        if !config.remote.has_credentials() {
            log::warn!("{} / {} not set, the remote source will stay empty", API_KEY_VAR, API_SECRET_VAR);
        }

        coordinator.force_rebuild().await;
        if options.auto_refresh {
            coordinator.start_timer();
        }

        let result = console::run_console(coordinator.clone(), !args.quiet).await;
        coordinator.stop_timer();

        if !args.no_save {
            options.update_from(&coordinator).await;
            options.store_options();
        }
        result
    })?;

    log::info!("Shutting down.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_options() {
        let args = Args::parse_from(["icy_screensaver", "--mode", "remote", "--size", "5", "--query", "Blue Note", "--width", "800"]);
        let mut options = Options::default();
        args.apply(&mut options);

        assert_eq!(options.covers.grid.mode, SourceMode::Remote);
        assert_eq!(options.covers.grid.dimension, 5);
        assert_eq!(options.covers.remote.search_query, "Blue Note");
        assert_eq!(options.covers.grid.display_area, (800, 1200));
        assert_eq!(options.covers.grid.refresh_interval_secs, 2);
    }

    #[test]
    fn test_bad_mode_flag_is_rejected() {
        assert!(Args::try_parse_from(["icy_screensaver", "--mode", "vinyl"]).is_err());
    }
}
