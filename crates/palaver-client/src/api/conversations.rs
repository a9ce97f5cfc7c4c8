//! Conversations API.

use crate::client::PalaverClient;
use crate::error::Result;
use crate::stream::ResponseStream;
use crate::types::SendMessageRequest;

/// Conversations API client.
pub struct ConversationsApi {
    client: PalaverClient,
}

impl ConversationsApi {
    pub(crate) fn new(client: PalaverClient) -> Self {
        Self { client }
    }

    /// Send a message and stream the agent's response.
    pub async fn stream(
        &self,
        conversation_id: &str,
        request: SendMessageRequest,
    ) -> Result<ResponseStream> {
        let url = self
            .client
            .resource_url(&["conversations", conversation_id, "messages"])?;
        self.client.post_stream(url, &request).await
    }

    /// Send a message with just text (convenience method).
    pub async fn stream_message(
        &self,
        conversation_id: &str,
        content: impl Into<String>,
    ) -> Result<ResponseStream> {
        self.stream(conversation_id, SendMessageRequest::new(content))
            .await
    }
}
