//! Component D: the bounded-buffer producer/consumer coordinator.
//!
//! Three cooperating tasks, exactly like the original pipeline: a feeder
//! that pushes URLs onto a bounded channel, a single downloader/extractor
//! worker that drains it and pushes results onto a second bounded channel,
//! and the caller's own loop, which consumes exactly as many results as
//! there were URLs and is the only place cleanup happens. Both channels are
//! bounded to `max_buffered`, so at most `max_buffered + 1` files exist on
//! disk at any moment — one in flight past the second channel, plus
//! whatever the worker is still extracting.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::extract;
use crate::fetch::Fetcher;
use crate::loader::Loader;
use crate::transform;

/// One URL to ingest, with the hospital location name it was discovered
/// under (carried through purely for logging).
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub url: String,
    pub location_name: Option<String>,
}

struct DownloadedFile {
    payload: PathBuf,
    cleanup: Vec<PathBuf>,
    work: WorkItem,
}

/// Coordinates fetch, extract, transform, and load for a batch of URLs.
pub struct Pipeline {
    fetcher: Fetcher,
    download_dir: PathBuf,
    max_buffered: usize,
    cancelled: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(fetcher: Fetcher, download_dir: PathBuf, max_buffered: usize) -> Self {
        Pipeline {
            fetcher,
            download_dir,
            max_buffered,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Stops feeding new URLs and lets in-flight work drain. SHOULD-level
    /// cancellation, checked at each queue operation rather than threaded
    /// through every await point.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Runs the full pipeline over `items`, returning the number of files
    /// that reached the load stage (successfully or not).
    pub async fn run(&self, items: Vec<WorkItem>, loader: Arc<dyn Loader>) -> usize {
        let total = items.len();
        if total == 0 {
            return 0;
        }

        let (url_tx, mut url_rx) = mpsc::channel::<WorkItem>(self.max_buffered);
        let (result_tx, mut result_rx) = mpsc::channel::<DownloadedFile>(self.max_buffered);

        let feeder_cancelled = Arc::clone(&self.cancelled);
        let feeder = tokio::spawn(async move {
            for item in items {
                if feeder_cancelled.load(Ordering::SeqCst) {
                    break;
                }
                if url_tx.send(item).await.is_err() {
                    break;
                }
            }
        });

        let fetcher = self.fetcher.clone();
        let download_dir = self.download_dir.clone();
        let worker_cancelled = Arc::clone(&self.cancelled);
        let worker = tokio::spawn(async move {
            while let Some(work) = url_rx.recv().await {
                if worker_cancelled.load(Ordering::SeqCst) {
                    break;
                }

                let downloaded_path = match fetcher.download(&work.url, &download_dir).await {
                    Ok(path) => path,
                    Err(e) => {
                        warn!(url = work.url, error = %e, "download failed, skipping");
                        continue;
                    }
                };

                match extract::unzip_if_needed(&downloaded_path) {
                    Ok(extracted) => {
                        let mut cleanup = extracted.cleanup;
                        cleanup.push(downloaded_path);
                        let entry = DownloadedFile {
                            payload: extracted.payload,
                            cleanup,
                            work: work.clone(),
                        };
                        if result_tx.send(entry).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(url = work.url, error = %e, "extract failed, skipping");
                        let _ = std::fs::remove_file(&downloaded_path);
                    }
                }
            }
        });

        let mut processed = 0;
        for _ in 0..total {
            let Some(downloaded) = result_rx.recv().await else {
                break;
            };
            processed += 1;

            match transform::transform(&downloaded.payload) {
                Ok(output) => match loader.load(&output).await {
                    Ok(()) => info!(url = downloaded.work.url, "processed"),
                    Err(e) => error!(url = downloaded.work.url, error = %e, "load failed"),
                },
                Err(e) => warn!(url = downloaded.work.url, error = %e, "transform failed, skipping"),
            }

            cleanup_paths(&downloaded.cleanup);
        }

        let _ = feeder.await;
        let _ = worker.await;
        processed
    }
}

fn cleanup_paths(paths: &[PathBuf]) {
    for path in paths {
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        if let Err(e) = result {
            warn!(path = %path.display(), error = %e, "cleanup failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoadError;
    use crate::transform::TransformOutput;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct FakeLoader {
        loaded: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Loader for FakeLoader {
        async fn load(&self, output: &TransformOutput) -> Result<(), LoadError> {
            self.loaded
                .lock()
                .unwrap()
                .push(output.hospital.name.clone().unwrap_or_default());
            Ok(())
        }
    }

    #[tokio::test]
    async fn processes_a_single_url_and_cleans_up_downloaded_files() {
        let mut server = mockito::Server::new_async().await;
        let csv_body = "\
hospital_name,license_number_OH\n\
Example Hospital,123456789\n\
setting,code|1,code|1|type\n\
Outpatient,99213,CPT\n";
        let mock = server
            .mock("GET", "/standard-charges.csv")
            .with_status(200)
            .with_body(csv_body)
            .create_async()
            .await;

        let download_dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new().unwrap();
        let pipeline = Pipeline::new(fetcher, download_dir.path().to_path_buf(), 2);
        let loader = Arc::new(FakeLoader { loaded: Mutex::new(Vec::new()) });

        let url = format!("{}/standard-charges.csv", server.url());
        let items = vec![WorkItem { url, location_name: Some("Example".to_string()) }];

        let processed = pipeline.run(items, loader.clone()).await;
        mock.assert_async().await;

        assert_eq!(processed, 1);
        assert_eq!(loader.loaded.lock().unwrap().as_slice(), ["Example Hospital".to_string()]);

        let remaining: Vec<_> = std::fs::read_dir(download_dir.path()).unwrap().collect();
        assert!(remaining.is_empty(), "downloaded file should have been cleaned up");
    }

    #[tokio::test]
    async fn skips_a_forbidden_url_without_failing_the_run() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/blocked.csv")
            .with_status(403)
            .create_async()
            .await;

        let download_dir = tempfile::tempdir().unwrap();
        let fetcher = Fetcher::new().unwrap();
        let pipeline = Pipeline::new(fetcher, download_dir.path().to_path_buf(), 2);
        let loader = Arc::new(FakeLoader { loaded: Mutex::new(Vec::new()) });

        let url = format!("{}/blocked.csv", server.url());
        let items = vec![WorkItem { url, location_name: None }];

        let processed = pipeline.run(items, loader.clone()).await;
        mock.assert_async().await;

        assert_eq!(processed, 0);
        assert!(loader.loaded.lock().unwrap().is_empty());
    }
}
