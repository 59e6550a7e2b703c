//! Disposable port - Resource の破棄
//!
//! Leasable は Resource を `Arc` で貸し出すため、メモリの解放は最後の参照が
//! drop されたときに起きます。`dispose()` はそれとは別に、接続のクローズなど
//! 「もう使わない」ことを外部に伝える明示的な後始末です。

use crate::domain::BoxError;

/// Disposable は Leasable が管理できる Resource
///
/// # 契約
/// - Leasable（または shutdown）からのみ呼ばれる。リース保持者は呼ばない
/// - 1 個体につき最大 1 回だけ呼ばれる（[`Renewable`](crate::Renewable) が保証する）
pub trait Disposable: Send + Sync + 'static {
    fn dispose(&self) -> Result<(), BoxError>;
}
