//! BuildStrategy port - Resource 生成の抽象化
//!
//! クロージャ `Fn() -> Result<T, BoxError>` はそのまま BuildStrategy として使えます。
//! 設定ステップを順に適用したい場合は [`BuildChain`](crate::strategy::BuildChain) を使ってください。

use crate::domain::BoxError;

/// BuildStrategy は新しい Resource を 1 つ作る
///
/// # 契約
/// - 何度でも呼べる。呼ぶたびに独立した、すぐ使える Resource を返す
/// - 失敗した場合はエラーをそのまま返す（Leasable は何も保存しない）
/// - Leasable のロックを保持したまま呼ばれるので、同じ Leasable を再入してはいけない
pub trait BuildStrategy<T>: Send + Sync {
    fn build(&self) -> Result<T, BoxError>;
}

impl<T, F> BuildStrategy<T> for F
where
    F: Fn() -> Result<T, BoxError> + Send + Sync,
{
    fn build(&self) -> Result<T, BoxError> {
        self()
    }
}
