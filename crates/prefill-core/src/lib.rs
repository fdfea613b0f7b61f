//! prefill-core
//!
//! Orchestration engine that warms a lancache by pulling an account's games
//! through it.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, entitlement, app_info, outcome, workload, errors）
//! - **config**: 設定（`prefill.toml`）と実行ごとのフラグ
//! - **ports**: 抽象化レイヤー（SessionClient, ProductInfoService, DepotQueueBuilder, など）
//! - **app**: アプリケーションロジック（builder, pipeline, orchestrator, benchmark, など）
//! - **impls**: 実装（success state, endpoint pool, JSON catalog）

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

#[cfg(test)]
mod testkit;

pub use app::{BenchmarkCapture, PrefillBuilder, PrefillOrchestrator, RunReport};
pub use config::{PrefillConfig, RunOptions, TargetOptions};
pub use domain::{AppId, ErrorKind, PrefillError};
