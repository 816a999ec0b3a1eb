use super::*;
use crate::muxer::MuxOutput;
use crate::types::StreamKind;
use async_trait::async_trait;
use std::time::Duration;

/// Extractor with a fixed title that writes a few bytes per stream
struct StubExtractor {
    title: Result<&'static str>,
    probe_delay: Duration,
}

impl StubExtractor {
    fn titled(title: &'static str) -> Self {
        Self {
            title: Ok(title),
            probe_delay: Duration::ZERO,
        }
    }
}

#[async_trait]
impl MediaExtractor for StubExtractor {
    async fn probe_metadata(&self, url: &str) -> Result<MediaMetadata> {
        tokio::time::sleep(self.probe_delay).await;
        match &self.title {
            Ok(title) => Ok(MediaMetadata::titled(*title)),
            Err(_) => Err(ProbeError::Unsupported {
                url: url.to_string(),
                reason: "Unsupported URL".to_string(),
            }
            .into()),
        }
    }

    async fn fetch_stream(&self, _url: &str, format: &str, destination: &Path) -> Result<()> {
        tokio::fs::write(destination, format.as_bytes()).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Muxer that writes a fixed payload
struct StubMuxer;

#[async_trait]
impl Muxer for StubMuxer {
    async fn merge_streams(&self, _video: &Path, _audio: &Path, output: &Path) -> Result<MuxOutput> {
        tokio::fs::write(output, b"merged").await?;
        Ok(MuxOutput::succeeded())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

fn pipeline(extractor: StubExtractor) -> MediaPipeline {
    MediaPipeline::with_backends(Config::default(), Arc::new(extractor), Arc::new(StubMuxer)).unwrap()
}

fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn stages(events: &[Event]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::StageChanged { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.concurrency.max_workers = 0;

    let result = MediaPipeline::with_backends(
        config,
        Arc::new(StubExtractor::titled("x")),
        Arc::new(StubMuxer),
    );

    match result {
        Err(Error::Config { key, .. }) => assert_eq!(key.as_deref(), Some("max_workers")),
        Err(other) => panic!("expected config error, got {:?}", other),
        Ok(_) => panic!("expected config error"),
    }
}

#[tokio::test]
async fn test_successful_run_walks_every_stage_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(StubExtractor::titled("Clip"));
    let mut rx = pipeline.subscribe();

    let outcome = pipeline
        .download("https://example.com/v", dir.path(), "bv", "ba", None)
        .await;

    assert!(outcome.succeeded, "run failed: {:?}", outcome.reason());
    assert_eq!(outcome.output_path, Some(dir.path().join("Clip.mp4")));

    let events = drain(&mut rx);
    assert_eq!(
        stages(&events),
        vec![
            Stage::ProbingMetadata,
            Stage::AllocatingSession,
            Stage::FetchingStreams,
            Stage::MergingStreams,
            Stage::CleaningUp,
            Stage::Succeeded,
        ]
    );

    let fetched: Vec<StreamKind> = events
        .iter()
        .filter_map(|e| match e {
            Event::StreamFetched {
                stream, succeeded, ..
            } => {
                assert!(succeeded);
                Some(*stream)
            }
            _ => None,
        })
        .collect();
    assert_eq!(fetched, vec![StreamKind::Video, StreamKind::Audio]);

    match events.last() {
        Some(Event::Completed {
            session_id,
            output_path,
        }) => {
            assert_eq!(Some(*session_id), outcome.session_id);
            assert_eq!(Some(output_path), outcome.output_path.as_ref());
        }
        other => panic!("expected Completed last, got {:?}", other),
    }
}

#[tokio::test]
async fn test_probe_failure_stops_before_session() {
    let dir = tempfile::tempdir().unwrap();
    let output_directory = dir.path().join("never-created");
    let pipeline = pipeline(StubExtractor {
        title: Err(Error::NotSupported(String::new())),
        probe_delay: Duration::ZERO,
    });
    let mut rx = pipeline.subscribe();

    let outcome = pipeline
        .download("https://example.com/v", &output_directory, "bv", "ba", None)
        .await;

    assert!(!outcome.succeeded);
    assert_eq!(outcome.code(), Some("source_unsupported"));
    assert!(outcome.session_id.is_none());
    assert!(!output_directory.exists());

    let events = drain(&mut rx);
    assert_eq!(stages(&events), vec![Stage::ProbingMetadata, Stage::Failed]);
    assert!(matches!(
        events.last(),
        Some(Event::Failed { session_id: None, code, .. }) if code == "source_unsupported"
    ));
}

#[tokio::test]
async fn test_unrunnable_extractor_is_a_probe_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output_directory = dir.path().join("never-created");
    let backends: [Arc<dyn MediaExtractor>; 2] = [
        Arc::new(CliExtractor::new(PathBuf::from("/nonexistent/yt-dlp"))),
        Arc::new(NoOpExtractor),
    ];

    for extractor in backends {
        let name = extractor.name();
        let pipeline =
            MediaPipeline::with_backends(Config::default(), extractor, Arc::new(StubMuxer)).unwrap();

        let outcome = pipeline
            .download("https://example.com/v", &output_directory, "bv", "ba", None)
            .await;

        assert!(
            matches!(
                outcome.failure,
                Some(Error::MetadataProbe(ProbeError::ExtractorUnavailable { .. }))
            ),
            "{}: {:?}",
            name,
            outcome.failure
        );
        assert_eq!(outcome.code(), Some("metadata_probe_failed"));
        assert!(outcome.reason().unwrap().starts_with("metadata probe failed"));
        assert!(outcome.session_id.is_none());
        assert!(!output_directory.exists());
    }
}

#[tokio::test]
async fn test_probe_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.timeouts.probe_timeout = Some(Duration::from_millis(20));
    let pipeline = MediaPipeline::with_backends(
        config,
        Arc::new(StubExtractor {
            title: Ok("slow"),
            probe_delay: Duration::from_secs(30),
        }),
        Arc::new(StubMuxer),
    )
    .unwrap();

    let outcome = pipeline
        .download("https://example.com/v", dir.path(), "bv", "ba", None)
        .await;

    assert_eq!(outcome.code(), Some("metadata_probe_failed"));
    assert!(outcome.reason().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_cancel_during_probe() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(StubExtractor {
        title: Ok("slow"),
        probe_delay: Duration::from_secs(30),
    });
    let cancel = CancellationToken::new();
    cancel.cancel();

    let request = MediaRequest::new("https://example.com/v", dir.path(), pipeline.config());
    let outcome = pipeline.run_with_cancel(request, cancel).await;

    assert_eq!(outcome.code(), Some("cancelled"));
    assert!(
        matches!(
            outcome.failure,
            Some(Error::Cancelled {
                stage: Stage::ProbingMetadata
            })
        )
    );
}

#[tokio::test]
async fn test_output_filename_override() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(StubExtractor::titled("Ignored Title"));

    let outcome = pipeline
        .download(
            "https://example.com/v",
            dir.path(),
            "bv",
            "ba",
            Some("my:final?name"),
        )
        .await;

    assert_eq!(
        outcome.into_result().unwrap(),
        dir.path().join("myfinalname.mp4")
    );

    let outcome = pipeline
        .download("https://example.com/v", dir.path(), "bv", "ba", Some("Episode 1.5"))
        .await;
    assert_eq!(
        outcome.into_result().unwrap(),
        dir.path().join("Episode 1.5.mp4")
    );
}

#[test]
fn test_missing_tools_fall_back_to_noop() {
    let tools = ToolsConfig {
        ytdlp_path: None,
        ffmpeg_path: None,
        search_path: false,
    };
    assert_eq!(discover_extractor(&tools).name(), "noop");
    assert_eq!(discover_muxer(&tools).name(), "noop");

    let tools = ToolsConfig {
        ytdlp_path: Some(PathBuf::from("/opt/yt-dlp")),
        ffmpeg_path: Some(PathBuf::from("/opt/ffmpeg")),
        search_path: false,
    };
    assert_eq!(discover_extractor(&tools).name(), "cli-yt-dlp");
    assert_eq!(discover_muxer(&tools).name(), "ffmpeg");
}
