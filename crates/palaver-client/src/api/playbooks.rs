//! Playbooks API.

use crate::client::PalaverClient;
use crate::error::Result;
use crate::stream::ResponseStream;
use crate::types::ExecutePlaybookRequest;

/// Playbooks API client.
pub struct PlaybooksApi {
    client: PalaverClient,
}

impl PlaybooksApi {
    pub(crate) fn new(client: PalaverClient) -> Self {
        Self { client }
    }

    /// Execute a playbook and stream its output.
    pub async fn execute_stream(
        &self,
        playbook_id: &str,
        request: ExecutePlaybookRequest,
    ) -> Result<ResponseStream> {
        let url = self
            .client
            .resource_url(&["playbooks", playbook_id, "execute"])?;
        self.client.post_stream(url, &request).await
    }
}
