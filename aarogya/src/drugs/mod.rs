mod openfda;

use async_trait::async_trait;

use crate::models::Record;

pub use openfda::OpenFdaClient;

/// Authoritative drug facts for a name read off a package.
///
/// Never fails: lookup problems come back as `{"error": <reason>}`, which
/// callers treat as a normal mapping.
#[async_trait]
pub trait DrugLookup: Send + Sync {
    async fn lookup(&self, drug_name: &str) -> Record;
}
