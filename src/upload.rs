//! Chunked batch upload of image files into a dataset.
//!
//! Large selections are split into fixed-size chunks and uploaded
//! strictly one request at a time, bounding peak memory and concurrent
//! load on the backend. A failed chunk is recorded and the pipeline
//! moves on; nothing is retried automatically.

use std::path::{Path, PathBuf};

use crate::api::ApiError;
use crate::model::BatchUploadResult;

/// Files per multipart request. Keeps each request under the backend's
/// size limit for typical weld imagery.
pub const CHUNK_SIZE: usize = 20;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "webp", "tif", "tiff"];

/// One chunk, one request. Implemented by the API client; tests supply
/// their own.
pub trait ChunkUploader {
    fn upload_chunk(&self, dataset_id: i64, files: &[PathBuf])
        -> Result<BatchUploadResult, ApiError>;
}

/// Progress reported to the UI while the worker runs.
#[derive(Clone, Debug, PartialEq)]
pub enum UploadEvent {
    Progress { uploaded: usize, total: usize },
    Done(UploadReport),
}

/// Final summary: how many of the requested files made it, plus every
/// per-file and per-chunk error encountered on the way.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UploadReport {
    pub uploaded: usize,
    pub total: usize,
    pub errors: Vec<String>,
}

impl UploadReport {
    pub fn summary(&self) -> String {
        if self.errors.is_empty() {
            format!("uploaded all {} images", self.uploaded)
        } else {
            format!(
                "uploaded {}/{} images, {} errors",
                self.uploaded,
                self.total,
                self.errors.len()
            )
        }
    }
}

pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|known| *known == ext)
        })
        .unwrap_or(false)
}

/// Drop everything that is not an image file. Folder selections often
/// carry sidecar files (.txt, .json, thumbnails) that the backend would
/// reject one by one.
pub fn filter_image_files(files: Vec<PathBuf>) -> Vec<PathBuf> {
    files.into_iter().filter(|p| is_image_file(p)).collect()
}

/// Run the whole pipeline: chunk, upload sequentially, aggregate.
///
/// `files` must already be filtered. Emits a `Progress` event after
/// every chunk and a final `Done` carrying the report that is also
/// returned. A chunk whose request fails contributes a single
/// chunk-level error and does not stop the remaining chunks.
pub fn run_batch_upload<U: ChunkUploader>(
    uploader: &U,
    dataset_id: i64,
    files: &[PathBuf],
    mut emit: impl FnMut(UploadEvent),
) -> UploadReport {
    let mut report = UploadReport {
        total: files.len(),
        ..UploadReport::default()
    };

    for (index, chunk) in files.chunks(CHUNK_SIZE).enumerate() {
        match uploader.upload_chunk(dataset_id, chunk) {
            Ok(result) => {
                report.uploaded += result.uploaded;
                report.errors.extend(result.errors);
                log::info!(
                    "chunk {}: {}/{} images uploaded",
                    index + 1,
                    report.uploaded,
                    report.total
                );
            }
            Err(err) => {
                log::warn!("chunk {} failed: {err}", index + 1);
                report.errors.push(format!("chunk {}: {err}", index + 1));
            }
        }
        emit(UploadEvent::Progress {
            uploaded: report.uploaded,
            total: report.total,
        });
    }

    emit(UploadEvent::Done(report.clone()));
    report
}
