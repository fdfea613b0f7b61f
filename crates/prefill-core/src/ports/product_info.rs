//! ProductInfoService port - パッケージ情報の一括問い合わせ

use async_trait::async_trait;

use crate::domain::{PackageId, PackageProductInfo, PrefillError};

/// One `(package id, access token)` pair of a batched query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageRequest {
    pub package_id: PackageId,
    pub access_token: u64,
}

#[async_trait]
pub trait ProductInfoService: Send + Sync {
    /// All requests go out as one batch.
    async fn query_packages(
        &self,
        requests: &[PackageRequest],
    ) -> Result<Vec<PackageProductInfo>, PrefillError>;
}
