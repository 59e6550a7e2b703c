//! Renewable - Resource とメタデータのペア
//!
//! Leasable がビルドした Resource は必ず `Renewable<T>` に包まれて貸し出されます。
//! 更新判定（[`RenewPolicy`](crate::ports::RenewPolicy)）はこのメタデータを見て行われます。
//!
//! # 使用例
//! ```ignore
//! let lease = Lease::acquire(leasable)?;
//! let conn = lease.get().ok_or(LeaseError::Closed)?;
//! if let Err(e) = call_remote(conn).await {
//!     // 次の release で error_count の述語が評価される
//!     lease.report_error();
//! }
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{BoxError, ResourceId};
use crate::ports::{Clock, Disposable, RenewalStats};

/// Renewable は Resource 本体と、更新判定に使うメタデータを保持
///
/// # フィールド
/// - `created_at`: 作成時刻（不変）
/// - `error_count`: `report_error()` のたびに +1
/// - `usage_count`: Leasable が acquire を成功させるたびに +1
///
/// カウンタは atomic なので、複数のリース保持者から同時に更新できます。
pub struct Renewable<T> {
    id: ResourceId,
    inner: T,
    created_at: DateTime<Utc>,
    clock: Arc<dyn Clock>,
    error_count: AtomicU32,
    usage_count: AtomicU64,
    disposed: AtomicBool,
}

impl<T: Disposable> Renewable<T> {
    /// 作成時刻を `clock` から取って包む
    pub fn new(id: ResourceId, inner: T, clock: Arc<dyn Clock>) -> Self {
        let created_at = clock.now();
        Self {
            id,
            inner,
            created_at,
            clock,
            error_count: AtomicU32::new(0),
            usage_count: AtomicU64::new(0),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Resource 本体（破棄済みなら `None`）
    ///
    /// shutdown で強制破棄された Resource は、リース保持者からも見えなくなります。
    pub fn get(&self) -> Option<&T> {
        (!self.is_disposed()).then_some(&self.inner)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// 呼び出し側の Resource 操作が失敗したことを記録し、新しい累計を返す
    pub fn report_error(&self) -> u32 {
        self.error_count.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    pub(crate) fn record_usage(&self) -> u64 {
        self.usage_count.fetch_add(1, Ordering::AcqRel).saturating_add(1)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Resource を破棄する
    ///
    /// 2 回目以降の呼び出しは何もせず `Ok(())` を返します。
    /// 破棄に失敗しても disposed フラグは立ったままです（再試行はしない）。
    pub fn dispose(&self) -> Result<(), BoxError> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        tracing::debug!(resource = %self.id, "disposing resource");
        self.inner.dispose()
    }
}

impl<T: Disposable> RenewalStats for Renewable<T> {
    fn age(&self) -> Duration {
        // clock skew で負になった場合は 0 扱い
        (self.clock.now() - self.created_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Acquire)
    }

    fn usage_count(&self) -> u64 {
        self.usage_count.load(Ordering::Acquire)
    }
}

impl<T: fmt::Debug> fmt::Debug for Renewable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renewable")
            .field("id", &self.id)
            .field("inner", &self.inner)
            .field("created_at", &self.created_at)
            .field("error_count", &self.error_count.load(Ordering::Relaxed))
            .field("usage_count", &self.usage_count.load(Ordering::Relaxed))
            .field("disposed", &self.disposed.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedClock;
    use crate::testing::TestConn;
    use chrono::{TimeDelta, TimeZone};
    use ulid::Ulid;

    fn fixture() -> (Arc<FixedClock>, Renewable<TestConn>) {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let clock = Arc::new(FixedClock::new(start));
        let renewable = Renewable::new(
            ResourceId::from_ulid(Ulid::new()),
            TestConn::new(1),
            clock.clone(),
        );
        (clock, renewable)
    }

    #[test]
    fn new_renewable_has_zero_counters() {
        let (_, renewable) = fixture();
        assert_eq!(renewable.error_count(), 0);
        assert_eq!(renewable.usage_count(), 0);
        assert_eq!(renewable.age(), Duration::ZERO);
        assert!(!renewable.is_disposed());
    }

    #[test]
    fn age_follows_the_clock() {
        let (clock, renewable) = fixture();
        clock.advance(TimeDelta::minutes(59) + TimeDelta::seconds(59));
        assert_eq!(renewable.age(), Duration::from_secs(59 * 60 + 59));
    }

    #[test]
    fn age_saturates_when_clock_goes_backwards() {
        let (clock, renewable) = fixture();
        clock.advance(TimeDelta::seconds(-30));
        assert_eq!(renewable.age(), Duration::ZERO);
    }

    #[test]
    fn report_error_increments() {
        let (_, renewable) = fixture();
        assert_eq!(renewable.report_error(), 1);
        assert_eq!(renewable.report_error(), 2);
        assert_eq!(renewable.error_count(), 2);
    }

    #[test]
    fn record_usage_increments() {
        let (_, renewable) = fixture();
        renewable.record_usage();
        assert_eq!(renewable.record_usage(), 2);
        assert_eq!(renewable.usage_count(), 2);
    }

    #[test]
    fn dispose_runs_once() {
        let (_, renewable) = fixture();
        renewable.dispose().unwrap();
        renewable.dispose().unwrap();
        assert!(renewable.is_disposed());
        assert_eq!(renewable.inner.disposals(), 1);
    }

    #[test]
    fn disposed_payload_is_no_longer_reachable() {
        let (_, renewable) = fixture();
        assert_eq!(renewable.get().map(|conn| conn.serial), Some(1));

        renewable.dispose().unwrap();
        assert!(renewable.get().is_none());
    }

    #[test]
    fn failed_dispose_is_not_retried() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let mut conn = TestConn::new(7);
        conn.fail_dispose = true;
        let renewable = Renewable::new(
            ResourceId::from_ulid(Ulid::new()),
            conn,
            Arc::new(FixedClock::new(start)),
        );

        assert!(renewable.dispose().is_err());
        assert!(renewable.dispose().is_ok());
        assert_eq!(renewable.inner.disposals(), 1);
        assert!(renewable.get().is_none());
    }
}
