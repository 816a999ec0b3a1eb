//! Download and merge example
//!
//! Fetches the video and audio streams of a URL in parallel and remuxes them
//! into one file, printing pipeline events as they arrive. Ctrl+C cancels the
//! run and removes any temp files.
//!
//! ```bash
//! cargo run --example merge_download -- <url> [output_dir]
//! ```

use media_merge_dl::{Config, Event, MediaPipeline, MediaRequest, run_until_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing (optional)
    // Uncomment if you add tracing-subscriber to your dependencies:
    // tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let url = args
        .next()
        .ok_or("usage: merge_download <url> [output_dir]")?;
    let output_dir = args.next().unwrap_or_else(|| "downloads".to_string());

    let config = Config {
        concurrency: media_merge_dl::config::ConcurrencyConfig { max_workers: 2 },
        ..Default::default()
    };
    let pipeline = MediaPipeline::new(config.clone())?;

    let mut events = pipeline.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::StageChanged { stage, .. } => println!("[stage] {}", stage),
                Event::StreamFetched {
                    stream, succeeded, ..
                } => println!(
                    "[fetch] {} stream {}",
                    stream,
                    if succeeded { "ok" } else { "failed" }
                ),
                Event::CleanupWarning { path, reason, .. } => {
                    println!("[cleanup] could not remove {}: {}", path.display(), reason)
                }
                Event::Completed { output_path, .. } => {
                    println!("[done] {}", output_path.display())
                }
                Event::Failed { code, error, .. } => println!("[failed] {}: {}", code, error),
            }
        }
    });

    let request = MediaRequest::new(url, output_dir, &config);
    let outcome = run_until_shutdown(&pipeline, request).await;

    match outcome.into_result() {
        Ok(path) => {
            println!("Saved to {}", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
