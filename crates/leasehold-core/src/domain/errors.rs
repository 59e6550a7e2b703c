//! Errors - リース操作のエラー型
//!
//! Build/dispose の失敗は呼び出し側の型をそのまま `source` に保持します。
//! renew_and_acquire が更新できなかったケースはエラーではありません
//! （[`RenewOutcome::Stale`](crate::domain::RenewOutcome::Stale) を参照）。

use thiserror::Error;

use crate::domain::ids::ResourceId;

/// BuildStrategy / Disposable が返すエラー
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// LeaseError はリース操作のエラー
#[derive(Debug, Error)]
pub enum LeaseError {
    /// lease_count が 0 のときに release が呼ばれた（呼び出し側のバグ）
    #[error("release called with no outstanding lease")]
    NotLeased,

    /// BuildStrategy が失敗した。元のエラーは `source()` で取り出せる
    #[error("failed to build resource: {0}")]
    Build(#[source] BoxError),

    /// Resource の破棄に失敗した（内部状態はすでに Empty）
    #[error("failed to dispose resource {resource}: {source}")]
    Dispose {
        resource: ResourceId,
        #[source]
        source: BoxError,
    },

    /// LeasingOffice または Leasable はすでに shutdown 済み
    #[error("leasing office has been shut down")]
    Closed,

    /// shutdown 中に発生した dispose エラーの一覧
    #[error("{} resource(s) failed to dispose during teardown", .0.len())]
    Teardown(Vec<LeaseError>),
}

impl LeaseError {
    /// Build エラーの元になった呼び出し側のエラーを型付きで取り出す
    pub fn build_source<E: std::error::Error + 'static>(&self) -> Option<&E> {
        match self {
            LeaseError::Build(source) => source.downcast_ref::<E>(),
            _ => None,
        }
    }
}
