//! Scriptable extractor and muxer doubles

use async_trait::async_trait;
use media_merge_dl::{Error, MediaExtractor, MediaMetadata, MuxOutput, Muxer, ProbeError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Bytes written for a working video format
pub const VIDEO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypmp42 video payload";
/// Bytes written for a working audio format
pub const AUDIO_BYTES: &[u8] = b"\x00\x00\x00\x18ftypM4A  audio payload";

/// What the fake extractor does for one format selector
#[derive(Clone, Debug)]
pub enum FetchBehavior {
    /// Write these bytes to the destination and succeed
    Write(Vec<u8>),
    /// Succeed without writing anything
    WriteNothing,
    /// Write a `.part` file next to the destination, then fail
    PartialThenFail,
    /// Fail with this message
    Fail(String),
    /// Write these bytes, then never return
    WriteThenStall(Vec<u8>),
    /// Write the `.ytdl` and `.part-FragN` sidecars of a fragmented
    /// download next to the destination, then fail
    FragmentsThenFail,
    /// Never return; when the fetch is dropped, write these bytes to the
    /// destination, like a tool finishing its final rename as it is killed
    LandOnAbort(Vec<u8>),
}

/// Writes `bytes` to `path` when dropped
struct LandOnDrop {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl Drop for LandOnDrop {
    fn drop(&mut self) {
        std::fs::write(&self.path, &self.bytes).ok();
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(suffix);
    PathBuf::from(os)
}

/// Extractor double driven by a per-format script
pub struct FakeExtractor {
    title: String,
    probe_failure: Option<String>,
    behaviors: HashMap<String, FetchBehavior>,
    fetch_delay: Duration,
    probe_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    destinations: Mutex<Vec<PathBuf>>,
}

impl FakeExtractor {
    /// Probe returns `title`; `bestvideo` and `bestaudio` formats work
    pub fn new(title: &str) -> Self {
        let mut behaviors = HashMap::new();
        behaviors.insert("bestvideo".to_string(), FetchBehavior::Write(VIDEO_BYTES.to_vec()));
        behaviors.insert("bestaudio".to_string(), FetchBehavior::Write(AUDIO_BYTES.to_vec()));
        Self {
            title: title.to_string(),
            probe_failure: None,
            behaviors,
            fetch_delay: Duration::ZERO,
            probe_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            destinations: Mutex::new(Vec::new()),
        }
    }

    /// Probe fails as an unsupported URL
    pub fn unsupported() -> Self {
        let mut extractor = Self::new("unused");
        extractor.probe_failure = Some("ERROR: Unsupported URL".to_string());
        extractor
    }

    /// Script the behavior of one format selector
    pub fn with_format(mut self, format: &str, behavior: FetchBehavior) -> Self {
        self.behaviors.insert(format.to_string(), behavior);
        self
    }

    /// Sleep this long inside every fetch, before doing anything else
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Number of probe calls so far
    pub fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    /// Number of fetch calls so far
    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Every destination a fetch was asked to write
    pub fn destinations(&self) -> Vec<PathBuf> {
        self.destinations.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaExtractor for FakeExtractor {
    async fn probe_metadata(&self, url: &str) -> Result<MediaMetadata> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match &self.probe_failure {
            Some(reason) => Err(ProbeError::Unsupported {
                url: url.to_string(),
                reason: reason.clone(),
            }
            .into()),
            None => Ok(MediaMetadata {
                title: self.title.clone(),
                id: Some("fake123".to_string()),
            }),
        }
    }

    async fn fetch_stream(&self, _url: &str, format: &str, destination: &Path) -> Result<()> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.destinations
            .lock()
            .unwrap()
            .push(destination.to_path_buf());

        tokio::time::sleep(self.fetch_delay).await;

        let behavior = self
            .behaviors
            .get(format)
            .cloned()
            .unwrap_or_else(|| FetchBehavior::Fail(format!("Requested format is not available: {}", format)));

        match behavior {
            FetchBehavior::Write(bytes) => {
                tokio::fs::write(destination, bytes).await?;
                Ok(())
            }
            FetchBehavior::WriteNothing => Ok(()),
            FetchBehavior::PartialThenFail => {
                tokio::fs::write(with_suffix(destination, ".part"), b"half a stream").await?;
                Err(Error::ExternalTool("ERROR: connection reset".to_string()))
            }
            FetchBehavior::FragmentsThenFail => {
                for suffix in [".ytdl", ".part-Frag1.part", ".part-Frag2"] {
                    tokio::fs::write(with_suffix(destination, suffix), b"fragment").await?;
                }
                Err(Error::ExternalTool(
                    "ERROR: fragment 3 not found, unable to continue".to_string(),
                ))
            }
            FetchBehavior::LandOnAbort(bytes) => {
                let _land = LandOnDrop {
                    path: destination.to_path_buf(),
                    bytes,
                };
                std::future::pending::<()>().await;
                Ok(())
            }
            FetchBehavior::Fail(message) => Err(Error::ExternalTool(message)),
            FetchBehavior::WriteThenStall(bytes) => {
                tokio::fs::write(destination, bytes).await?;
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}

/// What the fake muxer does
#[derive(Clone, Debug)]
pub enum MuxBehavior {
    /// Concatenate both inputs into the output and exit 0
    Concat,
    /// Exit with this code and stderr without writing output
    Fail {
        /// Exit code
        status: i32,
        /// Error output
        stderr: String,
    },
    /// Exit 0 without writing output
    NoOutput,
    /// Sleep, then concatenate
    Slow(Duration),
}

/// Muxer double
pub struct FakeMuxer {
    behavior: MuxBehavior,
    calls: AtomicUsize,
}

impl FakeMuxer {
    /// Muxer with the given behavior
    pub fn new(behavior: MuxBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of merge calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

async fn concat(video: &Path, audio: &Path, output: &Path) -> Result<()> {
    let mut bytes = tokio::fs::read(video).await?;
    bytes.extend(tokio::fs::read(audio).await?);
    tokio::fs::write(output, bytes).await?;
    Ok(())
}

#[async_trait]
impl Muxer for FakeMuxer {
    async fn merge_streams(&self, video: &Path, audio: &Path, output: &Path) -> Result<MuxOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            MuxBehavior::Concat => {
                concat(video, audio, output).await?;
                Ok(MuxOutput::succeeded())
            }
            MuxBehavior::Fail { status, stderr } => Ok(MuxOutput {
                success: false,
                status: Some(*status),
                stderr: stderr.clone(),
            }),
            MuxBehavior::NoOutput => Ok(MuxOutput::succeeded()),
            MuxBehavior::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                concat(video, audio, output).await?;
                Ok(MuxOutput::succeeded())
            }
        }
    }

    fn name(&self) -> &'static str {
        "fake"
    }
}
