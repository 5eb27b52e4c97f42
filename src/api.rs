//! REST client for the weld-inspection backend.
//!
//! Wraps the three collaborator services (annotation persistence, image
//! persistence, dataset taxonomy) behind plain blocking calls. The UI
//! never calls these directly; they run on worker threads and report
//! back over channels.

use crate::model::{
    Annotation, BatchUploadResult, Dataset, LabeledImage, NewAnnotation, Split,
};
use crate::upload::ChunkUploader;

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status code.
    #[error("server error ({status}): {body}")]
    Status {
        status: u16,
        /// Raw response body, kept for the operator-visible message.
        body: String,
    },

    /// A selected file could not be read for upload.
    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Blocking HTTP client for one backend instance.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl ApiClient {
    /// * `base_url` - e.g. `http://localhost:8000`, trailing slash optional.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::blocking::Client::new(),
            base_url,
        }
    }

    // ---- dataset taxonomy service ----

    pub fn get_dataset(&self, dataset_id: i64) -> Result<Dataset, ApiError> {
        let response = self
            .http
            .get(format!("{}/api/datasets/{}/", self.base_url, dataset_id))
            .send()?;
        parse_response(response)
    }

    // ---- image persistence service ----

    pub fn list_images(&self, dataset_id: i64) -> Result<Vec<LabeledImage>, ApiError> {
        let response = self
            .http
            .get(format!(
                "{}/api/labeled-images/?dataset={}",
                self.base_url, dataset_id
            ))
            .send()?;
        parse_response(response)
    }

    pub fn update_split(&self, image_id: i64, split: Split) -> Result<(), ApiError> {
        let response = self
            .http
            .patch(format!("{}/api/labeled-images/{}/", self.base_url, image_id))
            .json(&serde_json::json!({ "split": split }))
            .send()?;
        check_status(response)
    }

    pub fn delete_image(&self, image_id: i64) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!("{}/api/labeled-images/{}/", self.base_url, image_id))
            .send()?;
        check_status(response)
    }

    /// Fetch the raw bytes of an image for decoding. `image_url` may be
    /// absolute or server-relative.
    pub fn fetch_image_bytes(&self, image_url: &str) -> Result<Vec<u8>, ApiError> {
        let url = if image_url.starts_with("http") {
            image_url.to_string()
        } else {
            format!("{}{}", self.base_url, image_url)
        };
        let response = ensure_success(self.http.get(url).send()?)?;
        Ok(response.bytes()?.to_vec())
    }

    // ---- annotation persistence service ----

    pub fn list_annotations(&self, image_id: i64) -> Result<Vec<Annotation>, ApiError> {
        let response = self
            .http
            .get(format!(
                "{}/api/annotations/?image={}",
                self.base_url, image_id
            ))
            .send()?;
        parse_response(response)
    }

    pub fn create_annotation(&self, new: &NewAnnotation) -> Result<Annotation, ApiError> {
        let response = self
            .http
            .post(format!("{}/api/annotations/", self.base_url))
            .json(new)
            .send()?;
        parse_response(response)
    }

    pub fn delete_annotation(&self, annotation_id: i64) -> Result<(), ApiError> {
        let response = self
            .http
            .delete(format!(
                "{}/api/annotations/{}/",
                self.base_url, annotation_id
            ))
            .send()?;
        check_status(response)
    }
}

impl ChunkUploader for ApiClient {
    /// One multipart request carrying a whole chunk under the `images` field.
    fn upload_chunk(
        &self,
        dataset_id: i64,
        files: &[std::path::PathBuf],
    ) -> Result<BatchUploadResult, ApiError> {
        let mut form = reqwest::blocking::multipart::Form::new();
        for path in files {
            form = form.file("images", path)?;
        }
        let response = self
            .http
            .post(format!(
                "{}/api/datasets/{}/batch_upload/",
                self.base_url, dataset_id
            ))
            .multipart(form)
            .send()?;
        parse_response(response)
    }
}

/// Ensure the response has a success status, or convert it into an
/// [`ApiError::Status`] carrying the body text.
fn ensure_success(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::blocking::Response,
) -> Result<T, ApiError> {
    let response = ensure_success(response)?;
    Ok(response.json::<T>()?)
}

fn check_status(response: reqwest::blocking::Response) -> Result<(), ApiError> {
    ensure_success(response)?;
    Ok(())
}
