//! Data proxy API: upload locations for artifacts.

use crate::client::AdminClient;
use crate::error::Result;
use crate::types::{CreateUploadLocationRequest, CreateUploadLocationResponse};

/// Data proxy API client.
pub struct DataProxyApi {
    client: AdminClient,
}

impl DataProxyApi {
    pub(crate) fn new(client: AdminClient) -> Self {
        Self { client }
    }

    /// Ask the service where to put an artifact.
    pub async fn create_upload_location(
        &self,
        request: &CreateUploadLocationRequest,
    ) -> Result<CreateUploadLocationResponse> {
        self.client
            .post("dataproxy/upload_location", request)
            .await
    }

    /// PUT artifact bytes to a signed URL returned by [`Self::create_upload_location`].
    pub async fn upload(&self, signed_url: &str, bytes: Vec<u8>) -> Result<()> {
        self.client.put_bytes(signed_url, bytes).await
    }
}
