//! grit entrypoint: CLI parsing, logging, terminal bring-up, event loop.

use anyhow::{bail, Result};
use clap::Parser;
use core_actions::Editor;
use core_events::{Event, EVENT_CHANNEL_CAP};
use core_terminal::{CrosstermBackend, TerminalBackend};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// CLI arguments. Each file becomes an opened buffer; missing files become
/// new empty buffers with that name.
#[derive(Parser, Debug)]
#[command(name = "grit", version, about = "A modal, split-window terminal text editor")]
struct Args {
    /// Files to open at startup.
    pub files: Vec<std::path::PathBuf>,
    /// Configuration file path (overrides discovery of `grit.toml`).
    #[arg(long = "config")]
    pub config: Option<std::path::PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // File logging to grit.log (stdout belongs to the terminal UI).
    let log_dir = std::path::Path::new(".");
    let log_path = log_dir.join("grit.log");
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let file_appender = tracing_appender::rolling::never(log_dir, "grit.log");
    let (nb_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(nb_writer)
        .init();

    info!(target: "runtime", "startup");

    // Log panics before the terminal guard restores the screen.
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!(target: "runtime.panic", ?info, "panic");
        default_panic(info);
    }));

    let args = Args::parse();
    let config = match core_config::load_from(args.config.clone()) {
        Ok(c) => c,
        Err(e) => {
            warn!(target: "config", ?e, "config unreadable, using defaults");
            core_config::Config::default()
        }
    };

    let mut term = CrosstermBackend::new();
    let mut term = term.enter_guard()?;
    let (w, h) = term.size()?;

    let mut editor = Editor::new(config, &args.files);
    editor.resize(w as usize, h as usize);

    // The only concurrency boundary: a blocking input thread feeding a
    // bounded channel; this task is the single consumer and sole mutator.
    let (tx, mut rx) = mpsc::channel::<Event>(EVENT_CHANNEL_CAP);
    let _input_handle = core_input::spawn_input_thread(tx);

    let cursor = editor.draw();
    term.present(&editor.uibuf, cursor)?;

    'outer: loop {
        let Some(ev) = rx.recv().await else {
            bail!("terminal input channel closed");
        };
        if !editor.handle_event(&ev) {
            break 'outer;
        }
        // drain the burst before drawing once
        while let Ok(ev) = rx.try_recv() {
            if !editor.handle_event(&ev) {
                break 'outer;
            }
        }

        if editor.suspend_requested {
            editor.suspend_requested = false;
            term.suspend()?;
            let (w, h) = term.size()?;
            editor.resize(w as usize, h as usize);
        }

        let cursor = editor.draw();
        term.present(&editor.uibuf, cursor)?;
    }

    info!(target: "runtime", "clean exit");
    Ok(())
}
