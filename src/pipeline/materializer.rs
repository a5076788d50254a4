use flate2::read::MultiGzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MaterializeError, PipelineError};
use crate::pipeline::fetcher::Fetcher;
use crate::pipeline::parser::MetadataRecord;

/// Fully decompresses a gzip stream held in memory, including every member
/// of a multi-member (concatenated or bgzip) file.
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>, MaterializeError> {
    let mut gz = MultiGzDecoder::new(bytes);
    let mut decompressed = Vec::new();
    gz.read_to_end(&mut decompressed)
        .map_err(MaterializeError::Decompress)?;
    Ok(decompressed)
}

/// Writes assets under `output_dir`, one subdirectory per subject.
#[derive(Debug, Clone)]
pub struct Materializer {
    output_dir: PathBuf,
    extension: String,
}

impl Materializer {
    pub fn new(output_dir: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        Materializer {
            output_dir: output_dir.into(),
            extension: extension.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `<output_dir>/s<subject>/sess<session>-<title>.<extension>`
    pub fn output_path(&self, record: &MetadataRecord) -> PathBuf {
        self.output_dir
            .join(format!("s{}", record.subject))
            .join(format!(
                "sess{}-{}.{}",
                record.session, record.title, self.extension
            ))
    }

    /// Downloads, decompresses and writes the record's asset, returning the
    /// written path. An existing file is overwritten; a failed write may
    /// leave a truncated file behind.
    pub async fn materialize(
        &self,
        fetcher: &Fetcher,
        record: &MetadataRecord,
    ) -> Result<PathBuf, PipelineError> {
        let file_path = self.output_path(record);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|source| MaterializeError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let compressed = fetcher.fetch_asset(&record.asset_url).await?;
        let decompressed = tokio::task::spawn_blocking(move || decompress(&compressed))
            .await
            .map_err(|err| MaterializeError::Join(err.to_string()))??;

        fs::write(&file_path, &decompressed)
            .await
            .map_err(|source| MaterializeError::Write {
                path: file_path.clone(),
                source,
            })?;

        tracing::debug!(
            id = record.id,
            bytes = decompressed.len(),
            "wrote {}",
            file_path.display()
        );
        Ok(file_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, routing::get};
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;
    use tokio::net::TcpListener;

    const NIFTI_STUB: &[u8] = b"\x5c\x01\x00\x00fake nifti header and voxels";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn record(asset_url: String) -> MetadataRecord {
        MetadataRecord {
            id: 40012,
            asset_url,
            subject: "03".into(),
            session: "02".into(),
            title: "emotion-task".into(),
        }
    }

    async fn start_asset_server() -> String {
        let app = Router::new()
            .route("/map.nii.gz", get(|| async { gzip(NIFTI_STUB) }))
            .route("/broken.nii.gz", get(|| async { b"not gzip at all".to_vec() }));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_decompress_matches_reference() {
        assert_eq!(decompress(&gzip(NIFTI_STUB)).unwrap(), NIFTI_STUB);
    }

    #[test]
    fn test_decompress_reads_every_member() {
        let mut concatenated = gzip(b"first member ");
        concatenated.extend(gzip(b"second member"));
        assert_eq!(
            decompress(&concatenated).unwrap(),
            b"first member second member"
        );
    }

    #[test]
    fn test_decompress_rejects_garbage() {
        assert!(matches!(
            decompress(b"plain bytes"),
            Err(MaterializeError::Decompress(_))
        ));
    }

    #[test]
    fn test_output_path_layout() {
        let materializer = Materializer::new("/data/nv", "nii");
        assert_eq!(
            materializer.output_path(&record("http://x/y.gz".into())),
            PathBuf::from("/data/nv/s03/sess02-emotion-task.nii")
        );
    }

    #[tokio::test]
    async fn test_materialize_writes_decompressed_asset() {
        let base = start_asset_server().await;
        let dir = tempfile::tempdir().unwrap();
        let materializer = Materializer::new(dir.path(), "nii");
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/{{id}}", base));

        let path = materializer
            .materialize(&fetcher, &record(format!("{}/map.nii.gz", base)))
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("s03").join("sess02-emotion-task.nii"));
        assert_eq!(std::fs::read(&path).unwrap(), NIFTI_STUB);
    }

    #[tokio::test]
    async fn test_materialize_overwrites_existing_file() {
        let base = start_asset_server().await;
        let dir = tempfile::tempdir().unwrap();
        let materializer = Materializer::new(dir.path(), "nii");
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/{{id}}", base));
        let rec = record(format!("{}/map.nii.gz", base));

        let stale = materializer.output_path(&rec);
        std::fs::create_dir_all(stale.parent().unwrap()).unwrap();
        std::fs::write(&stale, b"an older and much longer file body than the asset").unwrap();

        materializer.materialize(&fetcher, &rec).await.unwrap();
        assert_eq!(std::fs::read(&stale).unwrap(), NIFTI_STUB);
    }

    #[tokio::test]
    async fn test_materialize_bad_gzip_writes_nothing() {
        let base = start_asset_server().await;
        let dir = tempfile::tempdir().unwrap();
        let materializer = Materializer::new(dir.path(), "nii");
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/{{id}}", base));
        let rec = record(format!("{}/broken.nii.gz", base));

        let err = materializer.materialize(&fetcher, &rec).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Materialize(MaterializeError::Decompress(_))
        ));
        assert!(!materializer.output_path(&rec).exists());
    }

    #[tokio::test]
    async fn test_materialize_missing_asset_is_network_error() {
        let base = start_asset_server().await;
        let dir = tempfile::tempdir().unwrap();
        let materializer = Materializer::new(dir.path(), "nii");
        let fetcher = Fetcher::new(reqwest::Client::new(), format!("{}/{{id}}", base));

        let err = materializer
            .materialize(&fetcher, &record(format!("{}/gone.nii.gz", base)))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Network(_)));
    }
}
