//! Model artifact loader and archive handling

use crate::models::pipeline::{FittedPipeline, MODEL_FILE_NAME};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

/// Locates, unpacks and loads serialized pipelines
pub struct ModelLoader {
    file_name: String,
}

impl ModelLoader {
    /// Loader for the standard artifact name
    pub fn new() -> Self {
        Self {
            file_name: MODEL_FILE_NAME.to_string(),
        }
    }

    /// Path of the artifact inside a model directory
    pub fn artifact_path<P: AsRef<Path>>(&self, model_dir: P) -> PathBuf {
        model_dir.as_ref().join(&self.file_name)
    }

    /// Load the single pipeline artifact from a model directory.
    pub fn load_model<P: AsRef<Path>>(&self, model_dir: P) -> Result<FittedPipeline> {
        let path = self.artifact_path(model_dir);

        info!(path = %path.display(), "Loading pipeline artifact");

        let pipeline = FittedPipeline::load(&path)
            .with_context(|| format!("Failed to load model from {:?}", path))?;

        info!(
            features = pipeline.n_features(),
            iterations = pipeline.classifier.n_iter,
            "Model loaded successfully"
        );

        Ok(pipeline)
    }

    /// Extract a gzip-compressed tar archive into `dest`.
    pub fn unpack_archive<P: AsRef<Path>, Q: AsRef<Path>>(&self, archive: P, dest: Q) -> Result<()> {
        let archive = archive.as_ref();
        let dest = dest.as_ref();

        info!(archive = %archive.display(), dest = %dest.display(), "Extracting model archive");

        fs::create_dir_all(dest).with_context(|| format!("Failed to create {}", dest.display()))?;
        let file =
            File::open(archive).with_context(|| format!("Failed to open {}", archive.display()))?;
        tar::Archive::new(GzDecoder::new(file))
            .unpack(dest)
            .with_context(|| format!("Failed to extract {}", archive.display()))?;

        Ok(())
    }

    /// Unpack an archive and load the pipeline it contains.
    pub fn load_from_archive<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        archive: P,
        dest: Q,
    ) -> Result<FittedPipeline> {
        self.unpack_archive(archive, dest.as_ref())?;
        self.load_model(dest)
    }

    /// Package a model directory's artifact as `archive` (gzip tar, artifact at the root).
    pub fn pack_archive<P: AsRef<Path>, Q: AsRef<Path>>(&self, model_dir: P, archive: Q) -> Result<PathBuf> {
        let artifact = self.artifact_path(model_dir);
        let archive = archive.as_ref();

        if let Some(parent) = archive.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let file =
            File::create(archive).with_context(|| format!("Failed to create {}", archive.display()))?;
        let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
        builder
            .append_path_with_name(&artifact, &self.file_name)
            .with_context(|| format!("Failed to add {} to archive", artifact.display()))?;
        builder.into_inner()?.finish()?;

        info!(archive = %archive.display(), "Model archive written");
        Ok(archive.to_path_buf())
    }
}

impl Default for ModelLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::logistic::LogisticRegressionParams;
    use crate::types::dataset::Dataset;
    use ndarray::array;

    fn fitted() -> FittedPipeline {
        let dataset = Dataset::new(
            vec!["V1".to_string()],
            array![[-1.0], [-2.0], [1.0], [2.0]],
            array![0, 0, 1, 1],
        )
        .unwrap();
        FittedPipeline::fit(&dataset, &LogisticRegressionParams::default()).unwrap()
    }

    #[test]
    fn test_missing_artifact_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ModelLoader::new().load_model(dir.path()).is_err());
    }

    #[test]
    fn test_archive_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let model_dir = dir.path().join("model");
        let loader = ModelLoader::new();

        let pipeline = fitted();
        pipeline.save(loader.artifact_path(&model_dir)).unwrap();

        let archive = loader
            .pack_archive(&model_dir, dir.path().join("out").join("model.tar.gz"))
            .unwrap();

        let extract_dir = dir.path().join("extract");
        let loaded = loader.load_from_archive(&archive, &extract_dir).unwrap();

        assert!(extract_dir.join(MODEL_FILE_NAME).exists());
        assert_eq!(loaded.feature_names, pipeline.feature_names);
        let x = array![[-1.5], [1.5]];
        assert_eq!(loaded.predict(&x).unwrap(), pipeline.predict(&x).unwrap());
    }

    #[test]
    fn test_corrupt_archive_fails() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("model.tar.gz");
        std::fs::write(&archive, b"definitely not gzip").unwrap();

        let result = ModelLoader::new().unpack_archive(&archive, dir.path().join("extract"));
        assert!(result.is_err());
    }
}
