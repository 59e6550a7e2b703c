//! leasehold-core
//!
//! 高コストなリソース（HTTP クライアントなど）をキーごとに共有し、
//! 参照カウント付きで貸し出して、最後の返却時に作り直すかどうかを決める。
//!
//! # モジュール構成
//! - **domain**: ID, 状態, エラー
//! - **ports**: 抽象化レイヤー（Clock, IdGenerator, BuildStrategy, RenewPolicy, Disposable）
//! - **strategy**: 標準の BuildChain / RenewStrategy
//! - **renewable**: Resource + 作成時刻・エラー数・使用回数
//! - **lease**: Leasable（コア）, LeasingOffice（レジストリ）, Lease（スコープ付きハンドル）
//! - **config**: JSON からの RenewStrategy 設定
//! - **observability**: status views

pub mod config;
pub mod domain;
pub mod lease;
pub mod observability;
pub mod ports;
pub mod renewable;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{ConfigError, LeaseConfig, RenewConfig};
pub use domain::{BoxError, LeaseError, LeaseId, LeaseState, RenewOutcome, ResourceId};
pub use lease::{Lease, Leasable, LeasingOffice};
pub use observability::{KeyedStatus, LeasableStatus, OfficeSnapshot, ResourceStatus};
pub use ports::{BuildStrategy, Clock, Disposable, RenewPolicy, RenewalStats};
pub use renewable::Renewable;
pub use strategy::{BuildChain, RenewStrategy};
