mod local;

use async_trait::async_trait;

use crate::error::Result;

pub use local::LocalImageStore;

/// Keeps uploaded images and hands back an opaque reference (a URL) to each.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// `file_name` is the client-supplied name; only its extension is kept.
    async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String>;
}
