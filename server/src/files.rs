use futures_util::{StreamExt as _, TryStreamExt as _};
use std::{io, path::Path};

use actix_multipart::{Field, Multipart, MultipartError};
use tokio::{
    fs::{create_dir_all, remove_file, File},
    io::AsyncWriteExt,
};

/// Form field carrying the uploaded asset.
const FILE_FIELD: &str = "file";

/// What the multipart headers of an upload said about the file.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PartInfo {
    pub file_name: Option<String>,
    pub media_type: Option<String>,
}

impl PartInfo {
    fn of(field: &Field) -> Self {
        Self {
            file_name: field
                .content_disposition()
                .and_then(|cd| cd.get_filename())
                .map(str::to_string),
            media_type: field.content_type().map(|m| m.essence_str().to_string()),
        }
    }
}

fn form_error(e: MultipartError) -> io::Error {
    io::Error::other(e.to_string())
}

fn is_file_field(field: &Field) -> bool {
    field
        .content_disposition()
        .and_then(|cd| cd.get_name())
        .is_some_and(|name| name == FILE_FIELD)
}

/// Streams the `file` part of a multipart upload to `{dir}/{id}` and returns
/// the size written and what the part declared. Other parts are skipped.
/// The file is removed again on failure.
pub async fn save_upload(
    dir: &Path,
    id: &str,
    limit: u64,
    mut form: Multipart,
) -> io::Result<(u64, PartInfo)> {
    while let Some(mut field) = form.try_next().await.map_err(form_error)? {
        if !is_file_field(&field) {
            while field.try_next().await.map_err(form_error)?.is_some() {}
            continue;
        }
        let info = PartInfo::of(&field);
        create_dir_all(dir).await?;
        let path = dir.join(id);
        let mut file = File::create_new(&path).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = field.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    log::warn!("{id}: chunk read failed: {e}");
                    remove_file(&path).await?;
                    return Err(io::Error::other("Chunk read failed"));
                }
            };
            if written + chunk.len() as u64 > limit {
                remove_file(&path).await?;
                return Err(io::Error::other("Upload too large"));
            }
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        file.sync_all().await?;
        return Ok((written, info));
    }
    Err(io::Error::other("No file part in upload"))
}

#[cfg(test)]
mod tests {
    use actix_web::{
        error::PayloadError,
        http::header::{self, HeaderMap, HeaderValue},
        web::Bytes,
    };

    use super::*;

    const BODY: &str = "--X\r\nContent-Disposition: form-data; name=\"note\"\r\n\r\nhello\r\n--X\r\nContent-Disposition: form-data; name=\"file\"; filename=\"demo.mp4\"\r\nContent-Type: video/mp4\r\n\r\nDATA\r\n--X--\r\n";

    /// A form whose body arrives in pieces cut at `splits`.
    fn form(splits: &[usize]) -> Multipart {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=X"),
        );
        let mut chunks = Vec::new();
        let mut start = 0;
        for &end in splits.iter().chain([BODY.len()].iter()) {
            chunks.push(Ok::<_, PayloadError>(Bytes::copy_from_slice(&BODY.as_bytes()[start..end])));
            start = end;
        }
        Multipart::new(&headers, futures_util::stream::iter(chunks))
    }

    fn scratch() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("docflow-files-{}", uuidv7::create()))
    }

    #[actix_web::test]
    async fn stores_only_the_file_part() {
        let dir = scratch();
        let (size, info) = save_upload(&dir, "one", 1024, form(&[])).await.unwrap();
        assert_eq!(size, 4);
        assert_eq!(std::fs::read(dir.join("one")).unwrap(), b"DATA");
        assert_eq!(
            info,
            PartInfo {
                file_name: Some("demo.mp4".to_string()),
                media_type: Some("video/mp4".to_string()),
            }
        );
    }

    #[actix_web::test]
    async fn headers_split_across_chunks() {
        let dir = scratch();
        let cut = BODY.find("Content-Type").unwrap() + "Content-Ty".len();
        let (size, info) = save_upload(&dir, "two", 1024, form(&[7, cut, cut + 20]))
            .await
            .unwrap();
        assert_eq!(size, 4);
        assert_eq!(info.media_type.as_deref(), Some("video/mp4"));
        assert_eq!(std::fs::read(dir.join("two")).unwrap(), b"DATA");
    }

    #[actix_web::test]
    async fn oversized_upload_is_removed() {
        let dir = scratch();
        let err = save_upload(&dir, "big", 2, form(&[])).await.unwrap_err();
        assert_eq!(err.to_string(), "Upload too large");
        assert!(!dir.join("big").exists());
    }
}
