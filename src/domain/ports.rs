use crate::domain::table::Table;
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Location the storage writes to, used for reporting only.
    fn describe(&self, path: &str) -> String;
}

/// Raw API responses as returned by the transparency platform.
pub type RawResponses = Vec<serde_json::Value>;

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<RawResponses>;
    async fn transform(&self, data: RawResponses) -> Result<Vec<Table>>;
    async fn load(&self, tables: Vec<Table>) -> Result<String>;
}
