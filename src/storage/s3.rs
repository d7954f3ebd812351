use super::{ObjectStore, StoreError, WritePrecondition, WriteResult};
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

/// S3-backed [`ObjectStore`].
///
/// Not-found responses are mapped to the absent/`NotFound` side of the
/// contract; every other SDK error surfaces as a backend error. The
/// `DoesNotExist` precondition maps to `If-None-Match: *`, so a lost
/// create-only race comes back as `PreconditionFailed` rather than a
/// silent overwrite.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    pub async fn from_env() -> Self {
        let config = aws_config::load_from_env().await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn get(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                let service_err = err.into_service_error();
                if service_err.is_no_such_key() {
                    StoreError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    }
                } else {
                    StoreError::backend("GetObject", bucket, key, &service_err)
                }
            })?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::backend("GetObject", bucket, key, &err))?;

        Ok(body.into_bytes())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, StoreError> {
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let service_err = err.into_service_error();
                if service_err.is_not_found() {
                    Ok(false)
                } else {
                    Err(StoreError::backend("HeadObject", bucket, key, &service_err))
                }
            }
        }
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
        precondition: WritePrecondition,
    ) -> Result<WriteResult, StoreError> {
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body));

        if precondition == WritePrecondition::DoesNotExist {
            request = request.if_none_match("*");
        }

        match request.send().await {
            Ok(_) => Ok(WriteResult::Success),
            Err(err) => {
                let service_err = err.into_service_error();
                // S3 reports a failed If-None-Match as HTTP 412
                if service_err.meta().code() == Some("PreconditionFailed") {
                    Ok(WriteResult::PreconditionFailed)
                } else {
                    Err(StoreError::backend("PutObject", bucket, key, &service_err))
                }
            }
        }
    }
}
