//! Leasable - キーごとの Resource とリース数を管理するコア
//!
//! # 状態遷移
//! - `Empty` → acquire → build → `Live(1)`
//! - `Live(n)` → acquire → `Live(n + 1)`（build しない）
//! - `Live(1)` → release → RenewPolicy を 1 回だけ評価
//!   - true: Resource をスロットから外して破棄 → `Empty`
//!   - false: Resource を保持 → `Idle`（次の acquire で再利用）
//! - shutdown → Resource を破棄 → `Closed(n)`（出ているリースの release だけ受け付ける）
//!
//! # ロック方針
//! - (resource, lease_count) は 1 つの Mutex でまとめて読み書きする
//! - build と renew 判定はロック内で行う（Empty → Live の build は 1 回だけ）
//! - Resource を使った IO はロックの外（リース保持者側）で行う
//! - release での破棄は Resource をスロットから外した後、ロックの外で行う

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use crate::domain::{BoxError, LeaseError, LeaseId, LeaseState, RenewOutcome};
use crate::observability::{LeasableStatus, ResourceStatus};
use crate::ports::{
    BuildStrategy, Clock, Disposable, IdGenerator, RenewPolicy, RenewalStats, SystemClock,
    UlidGenerator,
};
use crate::renewable::Renewable;

/// ロックで守られる (resource, lease_count) の組
struct Slot<T> {
    resource: Option<Arc<Renewable<T>>>,
    lease_count: usize,
    closed: bool,
}

/// Leasable は 1 つのキーに対応する Resource を参照カウント付きで貸し出す
///
/// # 使用例
/// ```ignore
/// let leasable = Arc::new(Leasable::new(build, RenewStrategy::new().with_error_limit(4)));
///
/// let conn = leasable.acquire()?;
/// conn.get().ok_or(LeaseError::Closed)?.send(request)?;
/// leasable.release()?;
/// ```
///
/// 通常は [`Lease`](crate::Lease) を使って release を自動化してください。
pub struct Leasable<T: Disposable> {
    build: Arc<dyn BuildStrategy<T>>,
    renew: Arc<dyn RenewPolicy>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    slot: Mutex<Slot<T>>,
}

impl<T: Disposable> Leasable<T> {
    /// SystemClock と ULID の ID で Leasable を作成
    pub fn new<B, R>(build: B, renew: R) -> Self
    where
        B: BuildStrategy<T> + 'static,
        R: RenewPolicy + 'static,
    {
        Self::from_parts(
            Arc::new(build),
            Arc::new(renew),
            Arc::new(SystemClock),
            Arc::new(UlidGenerator::new(SystemClock)),
        )
    }

    /// Resource の作成時刻と age に使う Clock を差し替える
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.ids = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        self.clock = clock;
        self
    }

    pub(crate) fn from_parts(
        build: Arc<dyn BuildStrategy<T>>,
        renew: Arc<dyn RenewPolicy>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            build,
            renew,
            clock,
            ids,
            slot: Mutex::new(Slot {
                resource: None,
                lease_count: 0,
                closed: false,
            }),
        }
    }

    // build が panic した場合はスロットは変更前のまま（Empty）。
    // renew 判定が panic した場合はリース数の減算だけが反映され、Resource は保持される（Idle）。
    // どちらも一貫した状態なので poison は無視する
    fn lock(&self) -> MutexGuard<'_, Slot<T>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wrap(&self, built: Result<T, BoxError>) -> Result<Arc<Renewable<T>>, LeaseError> {
        let inner = built.map_err(LeaseError::Build)?;
        let id = self.ids.generate_resource_id();
        debug!(resource = %id, "built resource");
        Ok(Arc::new(Renewable::new(id, inner, Arc::clone(&self.clock))))
    }

    fn retire(resource: &Renewable<T>) -> Result<(), LeaseError> {
        resource.dispose().map_err(|source| LeaseError::Dispose {
            resource: resource.id(),
            source,
        })
    }

    /// リースを 1 件取得する
    ///
    /// Resource がなければ BuildStrategy で作ります。build が失敗した場合は
    /// 何も保存せず（`Empty` のまま）エラーを返します。
    pub fn acquire(&self) -> Result<Arc<Renewable<T>>, LeaseError> {
        let mut slot = self.lock();
        if slot.closed {
            return Err(LeaseError::Closed);
        }

        let resource = match &slot.resource {
            Some(resource) => Arc::clone(resource),
            None => {
                let resource = self.wrap(self.build.build())?;
                slot.resource = Some(Arc::clone(&resource));
                resource
            }
        };
        slot.lease_count += 1;
        resource.record_usage();
        debug!(resource = %resource.id(), leases = slot.lease_count, "acquired lease");
        Ok(resource)
    }

    /// リースを 1 件返却し、新しいリース数を返す
    ///
    /// リース数が 0 になったときだけ RenewPolicy を評価します。
    /// 破棄に失敗した場合も、エラーを返す時点で Resource はすでにスロットから外れています。
    pub fn release(&self) -> Result<usize, LeaseError> {
        let retired = {
            let mut slot = self.lock();
            if slot.lease_count == 0 {
                error!("release called with no outstanding lease");
                return Err(LeaseError::NotLeased);
            }

            slot.lease_count -= 1;
            if slot.lease_count > 0 {
                return Ok(slot.lease_count);
            }

            let due = slot
                .resource
                .as_deref()
                .is_some_and(|resource| self.renew.shall_renew(resource));
            if due { slot.resource.take() } else { None }
        };

        match retired {
            Some(resource) => {
                debug!(resource = %resource.id(), "renew policy retired resource");
                Self::retire(&resource)?;
            }
            None => debug!("last lease released, resource kept"),
        }
        Ok(0)
    }

    /// Resource を作り直してからリースを取得する（ベストエフォート）
    ///
    /// ロック内でリース数を再確認し、0 なら既存の Resource を破棄して `build` で作り直します。
    /// 他のスレッドが先にリースを取っていた場合は作り直さず、既存の（古いかもしれない）
    /// Resource をそのまま貸し出して [`RenewOutcome::Stale`] を返します。
    pub fn renew_and_acquire<F>(
        &self,
        build: F,
    ) -> Result<(Arc<Renewable<T>>, RenewOutcome), LeaseError>
    where
        F: FnOnce() -> Result<T, BoxError>,
    {
        let mut slot = self.lock();
        if slot.closed {
            return Err(LeaseError::Closed);
        }

        if slot.lease_count > 0
            && let Some(resource) = slot.resource.clone()
        {
            slot.lease_count += 1;
            resource.record_usage();
            info!(
                resource = %resource.id(),
                leases = slot.lease_count,
                "renew_and_acquire could not renew; leased resource might be stale"
            );
            return Ok((resource, RenewOutcome::Stale));
        }

        if let Some(previous) = slot.resource.take() {
            debug!(resource = %previous.id(), "replacing resource");
            Self::retire(&previous)?;
        }

        let resource = self.wrap(build())?;
        slot.resource = Some(Arc::clone(&resource));
        slot.lease_count = 1;
        resource.record_usage();
        debug!(resource = %resource.id(), "renewed resource");
        Ok((resource, RenewOutcome::Renewed))
    }

    /// 管理者用: リース数に関係なく Resource を破棄し、以後の acquire を拒否する
    ///
    /// Resource を破棄した場合は `true` を返します。出ている Lease の release は
    /// その後もエラーにならず、リース数だけが減っていきます。
    pub fn shutdown(&self) -> Result<bool, LeaseError> {
        let (retired, outstanding) = {
            let mut slot = self.lock();
            slot.closed = true;
            (slot.resource.take(), slot.lease_count)
        };

        let Some(resource) = retired else {
            return Ok(false);
        };
        if outstanding > 0 {
            info!(resource = %resource.id(), leases = outstanding, "disposing leased resource on shutdown");
        }
        Self::retire(&resource)?;
        Ok(true)
    }

    pub fn lease_count(&self) -> usize {
        self.lock().lease_count
    }

    pub fn state(&self) -> LeaseState {
        let slot = self.lock();
        LeaseState::from_parts(slot.resource.is_some(), slot.lease_count, slot.closed)
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn status(&self) -> LeasableStatus {
        let slot = self.lock();
        LeasableStatus {
            state: LeaseState::from_parts(slot.resource.is_some(), slot.lease_count, slot.closed),
            lease_count: slot.lease_count,
            closed: slot.closed,
            resource: slot.resource.as_deref().map(|resource| ResourceStatus {
                id: resource.id(),
                age_ms: u64::try_from(resource.age().as_millis()).unwrap_or(u64::MAX),
                error_count: resource.error_count(),
                usage_count: resource.usage_count(),
            }),
        }
    }

    pub(crate) fn next_lease_id(&self) -> LeaseId {
        self.ids.generate_lease_id()
    }
}

impl<T: Disposable> fmt::Debug for Leasable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.lock();
        f.debug_struct("Leasable")
            .field(
                "state",
                &LeaseState::from_parts(slot.resource.is_some(), slot.lease_count, slot.closed),
            )
            .field("resource", &slot.resource.as_ref().map(|r| r.id()))
            .field("closed", &slot.closed)
            .finish()
    }
}
