use log_tail::{TailBuffer, TailConfig, TailEngine, TailEvent};
use std::io::Write;
use std::time::Duration;
use tokio_stream::StreamExt;

/// Writes a few log lines, rotates the file and shows what the engine reports.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("demo.log");
    std::fs::write(&path, "boot: starting\nboot: config loaded\nboot: ready\n")?;

    let config = TailConfig::default()
        .with_tail_window(2)
        .with_poll_interval(Duration::from_millis(200));
    let (engine, mut events) = TailEngine::new(&path, config)?;
    engine.start().await?;

    let writer_path = path.clone();
    let writer = tokio::spawn(async move {
        for i in 1..=3 {
            tokio::time::sleep(Duration::from_millis(300)).await;
            append(&writer_path, &format!("request {} served\n", i));
        }
        tokio::time::sleep(Duration::from_millis(300)).await;
        // copytruncate-style rotation
        let _ = std::fs::write(&writer_path, "after rotation\n");
    });

    let mut buffer = TailBuffer::new(100);
    let deadline = tokio::time::sleep(Duration::from_secs(3));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            event = events.next() => match event {
                Some(TailEvent::LinesAdded(lines)) => {
                    println!("Batch with {} lines:", lines.len());
                    for line in &lines {
                        println!("  #{:<4} {}", line.line_number(), line.content());
                    }
                    buffer.extend(lines);
                }
                Some(TailEvent::StateChanged(state)) => println!("State -> {}", state),
                Some(TailEvent::Error(e)) => println!("Notice: {}", e),
                None => break,
            },
            _ = &mut deadline => break,
        }
    }

    writer.await?;
    engine.shutdown().await;
    println!(
        "Buffered {} lines, {} read in total",
        buffer.len(),
        engine.total_lines_read()
    );
    Ok(())
}

fn append(path: &std::path::Path, content: &str) {
    if let Ok(mut file) = std::fs::OpenOptions::new().append(true).open(path) {
        let _ = file.write_all(content.as_bytes());
    }
}
