use super::{check_status, ManagedClient, ManagedError};

impl ManagedClient {
    /// Store an object in a bucket, replacing any existing object when `upsert` is set
    pub async fn upload_object(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), ManagedError> {
        let url = self.endpoint(&object_path(bucket, path))?;
        let request = self
            .http()?
            .post(url)
            .header("content-type", content_type)
            .header("x-upsert", if upsert { "true" } else { "false" })
            .body(bytes);
        check_status(self.with_service_key(request)?.send().await?).await?;
        Ok(())
    }

    /// Public URL of an object in a public bucket
    pub fn public_url(&self, bucket: &str, path: &str) -> Result<String, ManagedError> {
        self.endpoint(&format!("storage/v1/object/public/{}/{}", bucket, encode_path(path)))
    }
}

fn object_path(bucket: &str, path: &str) -> String {
    format!("storage/v1/object/{}/{}", bucket, encode_path(path))
}

fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| url::form_urlencoded::byte_serialize(segment.as_bytes()).collect::<String>().replace('+', "%20"))
        .collect::<Vec<_>>()
        .join("/")
}
