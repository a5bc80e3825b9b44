//! Host-managed credential selection.
//!
//! Video rendering needs a billing-enabled key. Whether one is selected, and
//! the dialog used to pick one, belong to the host application.

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

use crate::genai_client::GeminiClient;

pub trait CredentialProvider: Send + Sync {
    fn has_valid_credential(&self) -> BoxFuture<'static, bool>;

    /// The service rejected the current credential. It must not be reported
    /// as valid again until a new one is selected.
    fn invalidate(&self);

    /// Open the selection flow; resolves once it has been closed.
    fn open_selector(&self) -> BoxFuture<'static, ()>;
}

/// Asks the user for a key. `None` means the user skipped.
pub type KeyPrompt = Arc<dyn Fn() -> BoxFuture<'static, Option<String>> + Send + Sync>;

/// Credential held by a [`GeminiClient`], valid while the client has a key.
///
/// A rejected key is removed from the client, so the credential stays
/// invalid until the prompt supplies a replacement.
#[derive(Clone)]
pub struct ClientCredential {
    client: GeminiClient,
    prompt: KeyPrompt,
}

impl ClientCredential {
    pub fn new(client: GeminiClient, prompt: KeyPrompt) -> Self {
        Self { client, prompt }
    }

    /// Never prompts; the configured key is the only one.
    pub fn fixed(client: GeminiClient) -> Self {
        Self::new(client, Arc::new(|| async { None }.boxed()))
    }
}

impl CredentialProvider for ClientCredential {
    fn has_valid_credential(&self) -> BoxFuture<'static, bool> {
        let valid = self.client.has_key();
        Box::pin(async move { valid })
    }

    fn invalidate(&self) {
        if self.client.has_key() {
            log::warn!("Discarding the API key rejected by the service");
        }
        self.client.clear_key();
    }

    fn open_selector(&self) -> BoxFuture<'static, ()> {
        let mut client = self.client.clone();
        let reply = (self.prompt)();
        Box::pin(async move {
            let key = reply.await.map(|k| k.trim().to_string()).filter(|k| !k.is_empty());
            match key {
                None => log::info!("Credential selection skipped"),
                Some(key) => match client.set_key(&key) {
                    Ok(()) => log::info!("API key updated"),
                    Err(e) => log::warn!("Rejected API key: {e}"),
                },
            }
        })
    }
}
