//! App - アプリケーション層
//!
//! ports を組み合わせてプリフィルのロジックを実装します。
//!
//! # 主要コンポーネント
//! - **PrefillBuilder**: コラボレータのワイヤリングと起動時検証
//! - **EntitlementCache**: アカウントの権利スナップショット
//! - **TargetResolver / SelectionStore**: 対象アプリ集合の決定
//! - **AppPipeline**: アプリ単位の処理（両スケジューラ共通）
//! - **PrefillOrchestrator**: 本番実行（逐次）
//! - **BenchmarkCapture**: ワークロード収集（並行数制限付き）
//! - **SummaryAggregator**: 実行結果の集計

pub mod benchmark;
pub mod builder;
pub mod entitlement_cache;
pub mod orchestrator;
pub mod pipeline;
pub mod selection_store;
pub mod summary;
pub mod targets;

// 主要な型を再エクスポート
pub use self::benchmark::{BenchmarkCapture, BenchmarkReport};
pub use self::builder::{BuildError, PrefillApp, PrefillBuilder};
pub use self::entitlement_cache::EntitlementCache;
pub use self::orchestrator::{PrefillOrchestrator, RunReport};
pub use self::pipeline::{AppPipeline, PipelineMode, PipelineOutput, isolate};
pub use self::selection_store::SelectionStore;
pub use self::summary::{RunSummary, SummaryAggregator, format_bytes};
pub use self::targets::{TargetResolver, union_targets};
