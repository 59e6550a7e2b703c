//! Lease - スコープ付きリースハンドル
//!
//! 作成時に acquire し、drop（または明示的な `release()`）で 1 回だけ release します。
//! 2 回目以降の release は何もしません。

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use crate::domain::{BoxError, LeaseError, LeaseId, RenewOutcome};
use crate::lease::leasable::Leasable;
use crate::ports::Disposable;
use crate::renewable::Renewable;

/// Lease はリース中の Resource への唯一の正規の入口
///
/// # 使用例
/// ```ignore
/// let leasable = office.get_or_create(endpoint, build, renew)?;
/// {
///     let lease = Lease::acquire(leasable)?;
///     let conn = lease.get().ok_or(LeaseError::Closed)?;
///     conn.send(request).await?;
/// } // ここで release
/// ```
///
/// Resource への参照を Lease のスコープの外に持ち出してはいけません。
pub struct Lease<T: Disposable> {
    id: LeaseId,
    leasable: Option<Arc<Leasable<T>>>,
    resource: Option<Arc<Renewable<T>>>,
    renewal: Option<RenewOutcome>,
}

impl<T: Disposable> Lease<T> {
    /// リースを取得する（必要なら Leasable が build する）
    pub fn acquire(leasable: Arc<Leasable<T>>) -> Result<Self, LeaseError> {
        let resource = leasable.acquire()?;
        Ok(Self::new(leasable, resource, None))
    }

    /// 誰もリースしていなければ `build` で Resource を作り直してから取得する
    ///
    /// リース中の保持者がいれば通常の acquire になります。リース数の確認と
    /// 作り直しの間に他のスレッドが割り込んだ場合は古い Resource が返り、
    /// `renewal()` が `Some(RenewOutcome::Stale)` になります。
    pub fn acquire_or_renew<F>(leasable: Arc<Leasable<T>>, build: F) -> Result<Self, LeaseError>
    where
        F: FnOnce() -> Result<T, BoxError>,
    {
        if leasable.lease_count() > 0 {
            return Self::acquire(leasable);
        }
        let (resource, outcome) = leasable.renew_and_acquire(build)?;
        Ok(Self::new(leasable, resource, Some(outcome)))
    }

    fn new(
        leasable: Arc<Leasable<T>>,
        resource: Arc<Renewable<T>>,
        renewal: Option<RenewOutcome>,
    ) -> Self {
        Self {
            id: leasable.next_lease_id(),
            leasable: Some(leasable),
            resource: Some(resource),
            renewal,
        }
    }

    pub fn id(&self) -> LeaseId {
        self.id
    }

    /// リース中の Resource（release 後は `None`）
    pub fn resource(&self) -> Option<&Arc<Renewable<T>>> {
        self.resource.as_ref()
    }

    /// リース中の Resource 本体
    ///
    /// release 後、または shutdown で Resource が破棄された後は `None` です。
    pub fn get(&self) -> Option<&T> {
        self.resource.as_deref().and_then(Renewable::get)
    }

    /// `acquire_or_renew` で作られた場合の更新結果
    pub fn renewal(&self) -> Option<RenewOutcome> {
        self.renewal
    }

    /// Resource を使った操作が失敗したことを記録する
    pub fn report_error(&self) -> Option<u32> {
        self.resource.as_deref().map(Renewable::report_error)
    }

    pub fn is_released(&self) -> bool {
        self.leasable.is_none()
    }

    /// リースを返却し、Leasable の新しいリース数を返す
    ///
    /// すでに返却済みなら何もせず `Ok(None)` を返します。
    pub fn release(&mut self) -> Result<Option<usize>, LeaseError> {
        let Some(leasable) = self.leasable.take() else {
            return Ok(None);
        };
        self.resource = None;
        leasable.release().map(Some)
    }
}

impl<T: Disposable> Drop for Lease<T> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(lease = %self.id, error = %e, "failed to release lease on drop");
        }
    }
}

impl<T: Disposable> fmt::Debug for Lease<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("id", &self.id)
            .field("resource", &self.resource.as_ref().map(|r| r.id()))
            .field("released", &self.is_released())
            .finish()
    }
}
