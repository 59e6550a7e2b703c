//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use crate::domain::ids::{LeaseId, ResourceId};
use crate::ports::Clock;
use ulid::Ulid;

/// IdGenerator は Resource / Lease の ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（Leasable のロックの外からも呼ばれる）
pub trait IdGenerator: Send + Sync {
    /// ビルドされた Resource の ID を生成
    fn generate_resource_id(&self) -> ResourceId;

    /// スコープ付きリースの ID を生成
    fn generate_lease_id(&self) -> LeaseId;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// テスト時に FixedClock を使えば timestamp 部分が決定的になります。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_resource_id(&self) -> ResourceId {
        ResourceId::from(self.next_ulid())
    }

    fn generate_lease_id(&self) -> LeaseId {
        LeaseId::from(self.next_ulid())
    }
}
