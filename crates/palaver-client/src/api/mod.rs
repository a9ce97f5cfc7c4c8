//! API endpoint implementations.

mod conversations;
mod playbooks;

pub use conversations::ConversationsApi;
pub use playbooks::PlaybooksApi;
