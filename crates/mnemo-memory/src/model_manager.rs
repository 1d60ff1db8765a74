// SPDX-FileCopyrightText: 2026 Mnemo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model file resolution and first-use download for ONNX models.
//!
//! Files live at `{data_dir}/models/{name}/model.onnx` and `tokenizer.json`.
//! Known models can be fetched from HuggingFace; downloads are written to a
//! `.part` file and renamed into place, so a failed fetch leaves nothing behind.

use std::path::{Path, PathBuf};

use mnemo_core::error::MnemoError;
use tokio::sync::Mutex;
use tracing::info;

/// What a known model is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Embedding,
    CrossEncoder,
}

/// A model with known download locations.
#[derive(Debug, Clone, Copy)]
pub struct ModelSpec {
    pub name: &'static str,
    pub kind: ModelKind,
    /// Output dimension for embedding models.
    pub dimensions: Option<usize>,
    pub model_url: &'static str,
    pub tokenizer_url: &'static str,
}

const KNOWN_MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: "all-MiniLM-L6-v2",
        kind: ModelKind::Embedding,
        dimensions: Some(384),
        model_url: "https://huggingface.co/onnx-community/all-MiniLM-L6-v2-ONNX/resolve/main/onnx/model_quantized.onnx",
        tokenizer_url: "https://huggingface.co/sentence-transformers/all-MiniLM-L6-v2/resolve/main/tokenizer.json",
    },
    ModelSpec {
        name: "all-mpnet-base-v2",
        kind: ModelKind::Embedding,
        dimensions: Some(768),
        model_url: "https://huggingface.co/sentence-transformers/all-mpnet-base-v2/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/sentence-transformers/all-mpnet-base-v2/resolve/main/tokenizer.json",
    },
    ModelSpec {
        name: "bge-small-en-v1.5",
        kind: ModelKind::Embedding,
        dimensions: Some(384),
        model_url: "https://huggingface.co/BAAI/bge-small-en-v1.5/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/BAAI/bge-small-en-v1.5/resolve/main/tokenizer.json",
    },
    ModelSpec {
        name: "bge-base-en-v1.5",
        kind: ModelKind::Embedding,
        dimensions: Some(768),
        model_url: "https://huggingface.co/BAAI/bge-base-en-v1.5/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/BAAI/bge-base-en-v1.5/resolve/main/tokenizer.json",
    },
    ModelSpec {
        name: "bge-large-en-v1.5",
        kind: ModelKind::Embedding,
        dimensions: Some(1024),
        model_url: "https://huggingface.co/BAAI/bge-large-en-v1.5/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/BAAI/bge-large-en-v1.5/resolve/main/tokenizer.json",
    },
    ModelSpec {
        name: "bge-reranker-base",
        kind: ModelKind::CrossEncoder,
        dimensions: None,
        model_url: "https://huggingface.co/Xenova/bge-reranker-base/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/Xenova/bge-reranker-base/resolve/main/tokenizer.json",
    },
    ModelSpec {
        name: "ms-marco-MiniLM-L-6-v2",
        kind: ModelKind::CrossEncoder,
        dimensions: None,
        model_url: "https://huggingface.co/cross-encoder/ms-marco-MiniLM-L-6-v2/resolve/main/onnx/model.onnx",
        tokenizer_url: "https://huggingface.co/cross-encoder/ms-marco-MiniLM-L-6-v2/resolve/main/tokenizer.json",
    },
];

/// Look up a known model by name.
pub fn known_model(name: &str) -> Option<&'static ModelSpec> {
    KNOWN_MODELS.iter().find(|spec| spec.name == name)
}

/// Output dimension of a known embedding model.
pub fn known_dimension(name: &str) -> Option<usize> {
    known_model(name).and_then(|spec| spec.dimensions)
}

/// Resolved on-disk locations of a model's files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub model_path: PathBuf,
    pub tokenizer_path: PathBuf,
}

/// Manages ONNX model download and path resolution.
pub struct ModelManager {
    data_dir: PathBuf,
    /// Serializes downloads so concurrent callers never fetch the same file twice.
    download_lock: Mutex<()>,
}

impl ModelManager {
    /// Creates a new ModelManager with the given data directory.
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            download_lock: Mutex::new(()),
        }
    }

    /// Returns the directory where a model's files are stored.
    pub fn model_dir(&self, name: &str) -> PathBuf {
        self.data_dir.join("models").join(name)
    }

    pub fn files(&self, name: &str) -> ModelFiles {
        let dir = self.model_dir(name);
        ModelFiles {
            model_path: dir.join("model.onnx"),
            tokenizer_path: dir.join("tokenizer.json"),
        }
    }

    /// Returns true if both model and tokenizer files exist.
    pub fn is_model_available(&self, name: &str) -> bool {
        let files = self.files(name);
        files.model_path.exists() && files.tokenizer_path.exists()
    }

    /// Resolves a model's files, downloading known models when `auto_download` is set.
    pub async fn ensure_model(
        &self,
        name: &str,
        auto_download: bool,
    ) -> Result<ModelFiles, MnemoError> {
        let files = self.files(name);
        if self.is_model_available(name) {
            return Ok(files);
        }

        if !auto_download {
            return Err(MnemoError::ModelUnavailable {
                model: name.to_string(),
                reason: format!(
                    "model files not found in {} and auto_download is disabled",
                    self.model_dir(name).display()
                ),
            });
        }

        let spec = known_model(name).ok_or_else(|| MnemoError::ModelUnavailable {
            model: name.to_string(),
            reason: "no download location known for this model".to_string(),
        })?;

        let _guard = self.download_lock.lock().await;
        // Another caller may have finished the download while we waited.
        if self.is_model_available(name) {
            return Ok(files);
        }

        info!(model = name, "model not found, downloading from HuggingFace");
        let model_dir = self.model_dir(name);
        tokio::fs::create_dir_all(&model_dir)
            .await
            .map_err(|e| MnemoError::Internal(format!("Failed to create model directory: {e}")))?;

        let downloads = [
            (&files.model_path, spec.model_url),
            (&files.tokenizer_path, spec.tokenizer_url),
        ];
        for (dest, url) in downloads {
            if dest.exists() {
                continue;
            }
            let size = download_file(url, dest).await.map_err(|e| {
                MnemoError::ModelUnavailable {
                    model: name.to_string(),
                    reason: e.to_string(),
                }
            })?;
            info!(model = name, file = %dest.display(), size, "downloaded model file");
        }

        info!(model = name, dir = %model_dir.display(), "model ready");
        Ok(files)
    }
}

/// Download `url` to `dest` through a sibling `.part` file.
async fn download_file(url: &str, dest: &Path) -> Result<usize, MnemoError> {
    let partial = dest.with_extension("part");
    let result = fetch_to(url, &partial).await;
    match result {
        Ok(size) => {
            tokio::fs::rename(&partial, dest).await.map_err(|e| {
                MnemoError::Internal(format!("Failed to move {} into place: {e}", dest.display()))
            })?;
            Ok(size)
        }
        Err(e) => {
            // Clean up partial download
            let _ = tokio::fs::remove_file(&partial).await;
            Err(e)
        }
    }
}

async fn fetch_to(url: &str, dest: &Path) -> Result<usize, MnemoError> {
    let response = reqwest::get(url)
        .await
        .map_err(|e| MnemoError::Internal(format!("Failed to download {url}: {e}")))?;

    if !response.status().is_success() {
        return Err(MnemoError::Internal(format!(
            "Download failed with status {}: {url}",
            response.status()
        )));
    }

    let bytes = response.bytes().await.map_err(|e| {
        MnemoError::Internal(format!("Failed to read response body from {url}: {e}"))
    })?;

    let size = bytes.len();
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|e| MnemoError::Internal(format!("Failed to write {}: {e}", dest.display())))?;

    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_paths_under_data_dir() {
        let mgr = ModelManager::new(PathBuf::from("/tmp/mnemo"));
        let files = mgr.files("all-MiniLM-L6-v2");
        assert_eq!(
            files.model_path,
            PathBuf::from("/tmp/mnemo/models/all-MiniLM-L6-v2/model.onnx")
        );
        assert_eq!(
            files.tokenizer_path,
            PathBuf::from("/tmp/mnemo/models/all-MiniLM-L6-v2/tokenizer.json")
        );
    }

    #[test]
    fn known_dimensions() {
        assert_eq!(known_dimension("all-MiniLM-L6-v2"), Some(384));
        assert_eq!(known_dimension("all-mpnet-base-v2"), Some(768));
        assert_eq!(known_dimension("bge-large-en-v1.5"), Some(1024));
        assert_eq!(known_dimension("bge-reranker-base"), None);
        assert_eq!(known_dimension("custom-model"), None);
    }

    #[test]
    fn cross_encoders_are_tagged() {
        assert_eq!(
            known_model("bge-reranker-base").map(|s| s.kind),
            Some(ModelKind::CrossEncoder)
        );
    }

    #[test]
    fn model_not_available_when_missing() {
        let mgr = ModelManager::new(PathBuf::from("/nonexistent/path"));
        assert!(!mgr.is_model_available("all-MiniLM-L6-v2"));
    }

    #[tokio::test]
    async fn ensure_without_download_reports_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path().to_path_buf());
        let err = mgr.ensure_model("all-MiniLM-L6-v2", false).await.unwrap_err();
        assert!(matches!(err, MnemoError::ModelUnavailable { .. }));
        assert!(!mgr.model_dir("all-MiniLM-L6-v2").exists());
    }

    #[tokio::test]
    async fn unknown_model_cannot_be_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path().to_path_buf());
        let err = mgr.ensure_model("my-private-model", true).await.unwrap_err();
        assert!(err.to_string().contains("no download location"));
    }

    #[tokio::test]
    async fn existing_files_resolve_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = ModelManager::new(dir.path().to_path_buf());
        let model_dir = mgr.model_dir("custom");
        std::fs::create_dir_all(&model_dir).unwrap();
        std::fs::write(model_dir.join("model.onnx"), b"stub").unwrap();
        std::fs::write(model_dir.join("tokenizer.json"), b"{}").unwrap();

        let files = mgr.ensure_model("custom", false).await.unwrap();
        assert_eq!(files, mgr.files("custom"));
    }
}
