use clap::Parser;
use log_tail::{
    DEFAULT_MAX_BUFFERED_LINES, DEFAULT_TAIL_WINDOW, TailBuffer, TailConfig, TailEngine,
    TailEvent,
};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

/// Follow a growing log file.
///
/// While running, type `pause`, `resume`, `status` or `quit` on stdin.
#[derive(Parser, Debug)]
#[command(name = "log-tail", version)]
struct Cli {
    /// File to follow
    file: PathBuf,

    /// Number of existing lines to show on start
    #[arg(short = 'n', long = "lines", default_value_t = DEFAULT_TAIL_WINDOW)]
    lines: usize,

    /// Fallback poll interval in milliseconds
    #[arg(long, default_value_t = 500)]
    poll_interval_ms: u64,

    /// Lines kept in memory for `status`
    #[arg(long, default_value_t = DEFAULT_MAX_BUFFERED_LINES)]
    max_lines: usize,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = TailConfig::default()
        .with_tail_window(cli.lines)
        .with_poll_interval(Duration::from_millis(cli.poll_interval_ms))
        .with_max_buffered_lines(cli.max_lines);

    let (engine, mut events) = match TailEngine::new(&cli.file, config) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("Error setting up tail: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = engine.start().await {
        eprintln!("Error starting tail: {}", e);
        process::exit(1);
    }

    let mut buffer = TailBuffer::new(engine.config().max_buffered_lines);
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(TailEvent::LinesAdded(lines)) => {
                    let mut out = std::io::stdout().lock();
                    for line in &lines {
                        let _ = writeln!(out, "{:>6}  {}", line.line_number(), line.content());
                    }
                    buffer.extend(lines);
                }
                Some(TailEvent::StateChanged(state)) => eprintln!("[{}]", state),
                Some(TailEvent::Error(e)) => eprintln!("[error] {}", e),
                None => break,
            },

            command = commands.next_line(), if stdin_open => match command {
                Ok(Some(command)) => match command.trim() {
                    "pause" | "p" => {
                        if !engine.pause() {
                            eprintln!("Not running ({})", engine.state());
                        }
                    }
                    "resume" | "r" => {
                        if !engine.resume() {
                            eprintln!("Not paused ({})", engine.state());
                        }
                    }
                    "status" | "s" => eprintln!(
                        "{}: {}, {} lines read, {} buffered, {} dropped",
                        engine.file_path().display(),
                        engine.state(),
                        engine.total_lines_read(),
                        buffer.len(),
                        buffer.dropped()
                    ),
                    "stop" | "quit" | "q" => break,
                    "" => {}
                    other => eprintln!("Unknown command: {}", other),
                },
                Ok(None) | Err(_) => stdin_open = false,
            },

            _ = tokio::signal::ctrl_c() => break,
        }
    }

    engine.shutdown().await;
}
