use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 追加寫入，用於逐批落地的 JSONL 紀錄
    fn append_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    type Item: Send;
    type Outcome: Send;

    async fn extract(&self) -> Result<Vec<Self::Item>>;
    async fn transform(&self, items: Vec<Self::Item>) -> Result<Self::Outcome>;
    async fn load(&self, outcome: Self::Outcome) -> Result<String>;
}
