//! Ports - 外部コラボレータの抽象化レイヤー
//!
//! 各 trait はエンジンの外側にあるもの（セッションクライアント、メタデータ
//! サービス、キュー構築、転送実行、永続化）へのインターフェースです。
//! エンジンはこれらを `Arc<dyn ...>` で受け取り、実装の詳細を知りません。
//!
//! Implementations live in `impls` (in-memory, JSON-file, catalog backend)
//! or outside this workspace (the network client).

pub mod depot_queue;
pub mod endpoints;
pub mod executor;
pub mod metadata;
pub mod popular;
pub mod product_info;
pub mod session;
pub mod success_store;

pub use self::depot_queue::DepotQueueBuilder;
pub use self::endpoints::{EndpointDiscovery, EndpointPool};
pub use self::executor::DownloadExecutor;
pub use self::metadata::{AppMetadataService, LookupOptions};
pub use self::popular::PopularAppsSource;
pub use self::product_info::{PackageRequest, ProductInfoService};
pub use self::session::SessionClient;
pub use self::success_store::SuccessStateStore;
