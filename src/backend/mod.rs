pub mod client;
pub mod models;

use async_trait::async_trait;
use serde_json::Value;

pub use client::{BackendClient, BackendError};
pub use models::{ApiResponse, TransferRequest};

/// Submits off-chain transfers on behalf of settled interactions
#[async_trait]
pub trait TransferGateway: Send + Sync + 'static {
    async fn submit_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<ApiResponse<Value>, BackendError>;
}
