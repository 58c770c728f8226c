//! Retrying HTTP downloads
//!
//! The local file name is the last path segment of the url. Transient
//! failures (timeouts, resets, HTTP errors) are retried with a linear
//! backoff of `attempt * backoff`. A failed download never leaves a partial
//! file at the final path.

use crate::error::{PpbtError, PpbtResult};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Size of the first read from the response body
const FIRST_CHUNK: usize = 300 * 1024;
/// Size of every following read
const CHUNK: usize = 10 * 1024;

/// Opens a byte stream for a url
pub trait Transport: Send + Sync {
    /// Start a transfer. Failures that may succeed on retry are reported as
    /// [`PpbtError::Transport`].
    fn open(&self, url: &str, timeout: Duration) -> PpbtResult<Box<dyn Read + Send>>;
}

/// Transport backed by `ureq`
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn open(&self, url: &str, timeout: Duration) -> PpbtResult<Box<dyn Read + Send>> {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();

        let response = agent.get(url).call().map_err(|e| PpbtError::Transport {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Box::new(response.into_body().into_reader()))
    }
}

/// Retry and timeout settings for a download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Total attempts (values below 1 are treated as 1)
    pub attempts: u32,
    /// Timeout applied to each attempt
    pub timeout: Duration,
    /// Backoff unit; attempt `n` sleeps `n * backoff` before retrying
    pub backoff: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            timeout: Duration::from_secs(60),
            backoff: Duration::from_secs(10),
        }
    }
}

/// Downloads urls into a directory
#[derive(Clone)]
pub struct Fetcher {
    transport: Arc<dyn Transport>,
    options: FetchOptions,
}

impl Fetcher {
    /// Fetcher using HTTP
    pub fn new(options: FetchOptions) -> Self {
        Self::with_transport(Arc::new(HttpTransport), options)
    }

    /// Fetcher using a custom transport
    pub fn with_transport(transport: Arc<dyn Transport>, options: FetchOptions) -> Self {
        Self { transport, options }
    }

    pub fn options(&self) -> FetchOptions {
        self.options
    }

    /// Where `url` is stored when downloaded into `dest`
    pub fn download_location(url: &str, dest: &Path) -> PpbtResult<PathBuf> {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let name = path.rsplit('/').next().unwrap_or("");
        if name.is_empty() || name == "." || name == ".." {
            return Err(PpbtError::InvalidUrl(url.to_string()));
        }
        Ok(dest.join(name))
    }

    /// Download `url` into `dest_dir`, returning the local path
    pub async fn fetch(&self, url: &str, dest_dir: &Path) -> PpbtResult<PathBuf> {
        let local = Self::download_location(url, dest_dir)?;
        let attempts = self.options.attempts.max(1);
        info!("Downloading {} -> {}", url, local.display());

        let mut attempt = 0;
        loop {
            attempt += 1;

            let transport = Arc::clone(&self.transport);
            let url_owned = url.to_string();
            let target = local.clone();
            let timeout = self.options.timeout;
            let result = tokio::task::spawn_blocking(move || {
                stream_to_file(transport.as_ref(), &url_owned, &target, timeout)
            })
            .await
            .map_err(|e| PpbtError::Internal(format!("download task failed: {}", e)))?;

            let err = match result {
                Ok(bytes) => {
                    debug!("Downloaded {} bytes from {}", bytes, url);
                    return Ok(local);
                }
                Err(e) => e,
            };

            remove_partial(&local);

            if !err.is_retryable() {
                warn!("Unable to download: {} {}", url, err);
                return Err(err);
            }
            if attempt >= attempts {
                warn!("Unable to download: {} {}", url, err);
                return Err(PpbtError::Fetch {
                    url: url.to_string(),
                    attempts: attempt,
                    reason: transport_reason(err),
                });
            }

            let delay = self.options.backoff * attempt;
            warn!(
                "Download attempt {}/{} of {} failed: {}; retrying in {:?}",
                attempt, attempts, url, err, delay
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn transport_reason(err: PpbtError) -> String {
    match err {
        PpbtError::Transport { reason, .. } => reason,
        other => other.to_string(),
    }
}

fn remove_partial(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed partial download {}", path.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {}", path.display(), e),
    }
}

/// Stream the body of `url` into `local` in bounded chunks
fn stream_to_file(
    transport: &dyn Transport,
    url: &str,
    local: &Path,
    timeout: Duration,
) -> PpbtResult<u64> {
    let mut body = transport.open(url, timeout)?;
    let mut out = File::create(local)
        .map_err(|e| PpbtError::io(format!("creating {}", local.display()), e))?;

    let read_error = |e: io::Error| PpbtError::Transport {
        url: url.to_string(),
        reason: e.to_string(),
    };

    let mut buf = vec![0u8; FIRST_CHUNK];
    let mut chunk = FIRST_CHUNK;
    let mut total = 0u64;
    loop {
        let n = match body.read(&mut buf[..chunk]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_error(e)),
        };
        out.write_all(&buf[..n])
            .map_err(|e| PpbtError::io(format!("writing {}", local.display()), e))?;
        total += n as u64;
        chunk = CHUNK;
    }

    out.sync_all()
        .map_err(|e| PpbtError::io(format!("flushing {}", local.display()), e))?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    const URL: &str = "https://example.com/releases/tool-1.0.tar.gz";

    /// Fails the first `failures` opens, then serves `payload`
    struct FlakyTransport {
        failures: u32,
        calls: AtomicU32,
        payload: Vec<u8>,
    }

    impl FlakyTransport {
        fn new(failures: u32, payload: &[u8]) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                payload: payload.to_vec(),
            }
        }
    }

    impl Transport for FlakyTransport {
        fn open(&self, url: &str, _timeout: Duration) -> PpbtResult<Box<dyn Read + Send>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures {
                return Err(PpbtError::Transport {
                    url: url.to_string(),
                    reason: "connection reset".to_string(),
                });
            }
            Ok(Box::new(Cursor::new(self.payload.clone())))
        }
    }

    /// Serves some bytes then breaks the connection
    struct BrokenStream;

    impl Read for BrokenStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            static SENT: AtomicU32 = AtomicU32::new(0);
            if SENT.fetch_add(1, Ordering::SeqCst) == 0 {
                let n = buf.len().min(16);
                buf[..n].fill(b'x');
                Ok(n)
            } else {
                Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            }
        }
    }

    struct TruncatingTransport;

    impl Transport for TruncatingTransport {
        fn open(&self, _url: &str, _timeout: Duration) -> PpbtResult<Box<dyn Read + Send>> {
            Ok(Box::new(BrokenStream))
        }
    }

    fn options(attempts: u32) -> FetchOptions {
        FetchOptions {
            attempts,
            timeout: Duration::from_secs(1),
            backoff: Duration::ZERO,
        }
    }

    fn file_count(dir: &Path) -> usize {
        fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn download_location_uses_last_segment() {
        let path = Fetcher::download_location(URL, Path::new("/dl")).unwrap();
        assert_eq!(path, PathBuf::from("/dl/tool-1.0.tar.gz"));

        let path =
            Fetcher::download_location("https://x.org/a/b.tar.xz?mirror=1", Path::new("/dl"))
                .unwrap();
        assert_eq!(path, PathBuf::from("/dl/b.tar.xz"));
    }

    #[test]
    fn download_location_rejects_directory_urls() {
        assert!(Fetcher::download_location("https://x.org/files/", Path::new("/dl")).is_err());
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(FlakyTransport::new(2, b"payload"));
        let fetcher = Fetcher::with_transport(transport.clone(), options(3));

        let local = fetcher.fetch(URL, temp.path()).await.unwrap();

        assert_eq!(fs::read(&local).unwrap(), b"payload");
        assert_eq!(file_count(temp.path()), 1);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_when_attempts_exhausted() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(FlakyTransport::new(3, b"payload"));
        let fetcher = Fetcher::with_transport(transport.clone(), options(3));

        let err = fetcher.fetch(URL, temp.path()).await.unwrap_err();

        assert!(matches!(err, PpbtError::Fetch { attempts: 3, .. }));
        assert_eq!(file_count(temp.path()), 0);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_attempts_still_tries_once() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(FlakyTransport::new(0, b"ok"));
        let fetcher = Fetcher::with_transport(transport, options(0));
        assert!(fetcher.fetch(URL, temp.path()).await.is_ok());
    }

    #[tokio::test]
    async fn partial_download_is_removed() {
        let temp = TempDir::new().unwrap();
        let fetcher = Fetcher::with_transport(Arc::new(TruncatingTransport), options(1));

        let err = fetcher.fetch(URL, temp.path()).await.unwrap_err();

        assert!(matches!(err, PpbtError::Fetch { .. }));
        assert!(!temp.path().join("tool-1.0.tar.gz").exists());
    }

    #[tokio::test]
    async fn large_payload_is_streamed_intact() {
        let temp = TempDir::new().unwrap();
        let payload: Vec<u8> = (0..(FIRST_CHUNK + 3 * CHUNK + 17))
            .map(|i| (i % 251) as u8)
            .collect();
        let fetcher =
            Fetcher::with_transport(Arc::new(FlakyTransport::new(0, &payload)), options(1));

        let local = fetcher.fetch(URL, temp.path()).await.unwrap();
        assert_eq!(fs::read(local).unwrap(), payload);
    }
}
