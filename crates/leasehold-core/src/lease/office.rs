//! LeasingOffice - キー → Leasable のレジストリ
//!
//! # 設計
//! - キーごとに Leasable は 1 つだけ（最初の get_or_create で作られる）
//! - 読み取りは RwLock の read ロック、初回登録だけ write ロック + entry API
//! - 登録後の状態変更はすべて各 Leasable のロック内で行い、マップは触らない
//! - プロセス全体のシングルトンではなく、ホスト側が作って注入し、明示的に shutdown する

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::domain::LeaseError;
use crate::lease::leasable::Leasable;
use crate::observability::{KeyedStatus, OfficeSnapshot};
use crate::ports::{
    BuildStrategy, Clock, Disposable, IdGenerator, RenewPolicy, SystemClock, UlidGenerator,
};

struct OfficeState<K, T: Disposable> {
    leasables: HashMap<K, Arc<Leasable<T>>>,
    closed: bool,
}

/// LeasingOffice はキーごとの Leasable を管理する
///
/// # 使用例
/// ```ignore
/// let office: LeasingOffice<String, Connection> = LeasingOffice::new();
///
/// let leasable = office.get_or_create(
///     "https://example.com".to_string(),
///     move || Connection::open("https://example.com"),
///     RenewStrategy::new().with_age_limit(Duration::from_secs(65 * 60)),
/// )?;
/// let lease = Lease::acquire(leasable)?;
/// ```
pub struct LeasingOffice<K, T: Disposable> {
    state: RwLock<OfficeState<K, T>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<K, T> LeasingOffice<K, T>
where
    K: Eq + Hash + Clone + Send + Sync,
    T: Disposable,
{
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// 全 Leasable で共有する Clock を指定して作成
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(OfficeState {
                leasables: HashMap::new(),
                closed: false,
            }),
            ids: Arc::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, OfficeState<K, T>> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, OfficeState<K, T>> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// キーに対応する Leasable を返す。なければ作って登録する
    ///
    /// 同じキーで並行に呼ばれても、登録される Leasable は 1 つだけです。
    /// すでに登録済みの場合、渡された `build` / `renew` は使われずに捨てられます。
    pub fn get_or_create<B, R>(
        &self,
        key: K,
        build: B,
        renew: R,
    ) -> Result<Arc<Leasable<T>>, LeaseError>
    where
        B: BuildStrategy<T> + 'static,
        R: RenewPolicy + 'static,
    {
        {
            let state = self.read();
            if state.closed {
                return Err(LeaseError::Closed);
            }
            if let Some(leasable) = state.leasables.get(&key) {
                return Ok(Arc::clone(leasable));
            }
        }

        let mut state = self.write();
        if state.closed {
            return Err(LeaseError::Closed);
        }
        let registered = state.leasables.len();
        let leasable = state.leasables.entry(key).or_insert_with(|| {
            debug!(registered = registered + 1, "registered new leasable");
            Arc::new(Leasable::from_parts(
                Arc::new(build),
                Arc::new(renew),
                Arc::clone(&self.clock),
                Arc::clone(&self.ids),
            ))
        });
        Ok(Arc::clone(leasable))
    }

    pub fn get(&self, key: &K) -> Option<Arc<Leasable<T>>> {
        self.read().leasables.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read().leasables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().leasables.is_empty()
    }

    pub fn is_closed(&self) -> bool {
        self.read().closed
    }

    /// 管理者用: 全 Leasable の Resource をリース数に関係なく破棄する
    ///
    /// 以後の `get_or_create` は [`LeaseError::Closed`] になります。
    /// 破棄した Resource の数を返します。破棄に失敗したものがあれば、すべての
    /// Leasable を処理し終えてから [`LeaseError::Teardown`] にまとめて返します。
    pub fn shutdown(&self) -> Result<usize, LeaseError> {
        let drained: Vec<Arc<Leasable<T>>> = {
            let mut state = self.write();
            if state.closed {
                return Ok(0);
            }
            state.closed = true;
            state.leasables.drain().map(|(_, leasable)| leasable).collect()
        };

        let mut disposed = 0;
        let mut failures = Vec::new();
        for leasable in drained {
            match leasable.shutdown() {
                Ok(true) => disposed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(error = %e, "failed to dispose resource on shutdown");
                    failures.push(e);
                }
            }
        }

        info!(disposed, failed = failures.len(), "leasing office shut down");
        if failures.is_empty() {
            Ok(disposed)
        } else {
            Err(LeaseError::Teardown(failures))
        }
    }
}

impl<K, T> LeasingOffice<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Display,
    T: Disposable,
{
    /// 全キーの状態をキー順に並べたスナップショット
    pub fn snapshot(&self) -> OfficeSnapshot {
        let state = self.read();
        let mut entries: Vec<KeyedStatus> = state
            .leasables
            .iter()
            .map(|(key, leasable)| KeyedStatus {
                key: key.to_string(),
                status: leasable.status(),
            })
            .collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));

        OfficeSnapshot {
            closed: state.closed,
            total: entries.len(),
            entries,
        }
    }
}

impl<K, T> Default for LeasingOffice<K, T>
where
    K: Eq + Hash + Clone + Send + Sync,
    T: Disposable,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, T> fmt::Display for LeasingOffice<K, T>
where
    K: Eq + Hash + Clone + Send + Sync + fmt::Display,
    T: Disposable,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.snapshot();
        writeln!(f, "Total {} leasables", snapshot.total)?;
        for entry in &snapshot.entries {
            writeln!(f, "  {{{}, LeaseCount {}}}", entry.key, entry.status.lease_count)?;
        }
        Ok(())
    }
}
