//! RenewPolicy port - 更新判定の抽象化
//!
//! 最後のリースが返却されたとき、Leasable は RenewPolicy に
//! 「この Resource を捨てて次回作り直すべきか」を一度だけ問い合わせます。
//! 標準の述語合成は [`RenewStrategy`](crate::strategy::RenewStrategy) です。

use std::time::Duration;

/// RenewalStats は更新判定に使う Resource のメタデータ
pub trait RenewalStats {
    /// 作成からの経過時間
    fn age(&self) -> Duration;

    /// 報告されたエラーの累計
    fn error_count(&self) -> u32;

    /// 成功した acquire の累計
    fn usage_count(&self) -> u64;
}

/// RenewPolicy は Resource を更新すべきかを判定
///
/// Leasable のロック内で呼ばれるので、副作用のない軽い判定にしてください。
pub trait RenewPolicy: Send + Sync {
    fn shall_renew(&self, stats: &dyn RenewalStats) -> bool;
}

impl<F> RenewPolicy for F
where
    F: Fn(&dyn RenewalStats) -> bool + Send + Sync,
{
    fn shall_renew(&self, stats: &dyn RenewalStats) -> bool {
        self(stats)
    }
}
