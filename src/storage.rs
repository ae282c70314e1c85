use std::{fs::File, io::Write, path::Path};

use aws_sdk_s3::{error::DisplayErrorContext, primitives::ByteStream, Client as S3Client};

use crate::{
    error::{Error, Result},
    format::{ExportFormat, Formatter},
    model::{Field, Paper},
};

// Utils to store harvests on the local device.
pub struct LocalSaver;

impl LocalSaver {
    pub fn save(
        path: impl AsRef<Path>,
        papers: &[Paper],
        format: ExportFormat,
        fields: &[Field],
    ) -> Result<()> {
        let path = path.as_ref();
        let content = Formatter::render(papers, format, fields)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        tracing::info!(path = %path.display(), records = papers.len(), %format, "saved harvest");
        Ok(())
    }
}

// Utils to store harvests in AWS S3.
pub struct S3Storage {
    client: S3Client,
}

impl S3Storage {
    pub fn new(client: S3Client) -> Self {
        S3Storage { client }
    }

    pub async fn upload(
        &self,
        bucket: &str,
        key: &str,
        papers: &[Paper],
        format: ExportFormat,
        fields: &[Field],
    ) -> Result<()> {
        let content = Formatter::render(papers, format, fields)?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(format.content_type())
            .body(ByteStream::from(content.into_bytes()))
            .send()
            .await
            .map_err(|e| Error::S3(DisplayErrorContext(e).to_string()))?;
        tracing::info!(bucket, key, records = papers.len(), "uploaded harvest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_save_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let papers = vec![
            Paper {
                id: "a".to_string(),
                ..Paper::default()
            },
            Paper {
                id: "b".to_string(),
                ..Paper::default()
            },
        ];
        LocalSaver::save(&path, &papers, ExportFormat::Jsonl, &[Field::Id]).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\"id\":\"a\"}\n{\"id\":\"b\"}\n");
    }

    #[test]
    fn test_local_save_empty_csv_has_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        LocalSaver::save(&path, &[], ExportFormat::Csv, &[Field::Id, Field::Title]).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), ",id,title\n");
    }
}
