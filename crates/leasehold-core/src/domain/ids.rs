//! Domain identifiers (strongly-typed IDs).
//!
//! ULID ベースの ID を Phantom type パターンで型付けしています。
//! ビルドされた Resource ごとに `ResourceId`、スコープ付きリースごとに
//! `LeaseId` が振られ、ログやスナップショットで個体を区別するのに使います。
//!
//! ## ULID の特性
//! - **時刻でソート可能**: 生成順にソートできるので、どの Resource が新しいか分かる
//! - **分散生成可能**: ロックなしで複数スレッドから生成できる

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// Display で使うプレフィックス（"res-", "lease-"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn prefix() -> &'static str;
}

/// ジェネリック ID 型
///
/// `T` は PhantomData で、実行時にはメモリを消費しません。
///
/// # 例
/// ```ignore
/// let resource_id: ResourceId = Id::from(Ulid::new());
/// let lease_id: LeaseId = Id::from(Ulid::new());
/// // resource_id と lease_id は異なる型なので、混同できない
/// ```
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Id<T: IdMarker> {
    ulid: Ulid,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    /// ULID から Id を作成
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self {
            ulid,
            _marker: PhantomData,
        }
    }

    /// 内部の ULID を取得
    pub fn as_ulid(&self) -> Ulid {
        self.ulid
    }
}

impl<T: IdMarker> From<Ulid> for Id<T> {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", T::prefix(), self.ulid)
    }
}

// ========================================
// マーカー型の定義
// ========================================

/// Resource のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {}

impl IdMarker for Resource {
    fn prefix() -> &'static str {
        "res-"
    }
}

/// Lease のマーカー型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Lease {}

impl IdMarker for Lease {
    fn prefix() -> &'static str {
        "lease-"
    }
}

/// ビルドされた Resource 1 個体の ID
pub type ResourceId = Id<Resource>;

/// スコープ付きリース 1 件の ID
pub type LeaseId = Id<Lease>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_prefix() {
        let ulid = Ulid::new();
        let resource_id = ResourceId::from_ulid(ulid);
        let lease_id = LeaseId::from_ulid(ulid);

        assert_eq!(resource_id.to_string(), format!("res-{ulid}"));
        assert_eq!(lease_id.to_string(), format!("lease-{ulid}"));
    }

    #[test]
    fn ids_round_trip_through_ulid() {
        let ulid = Ulid::new();
        let id: ResourceId = Id::from(ulid);
        assert_eq!(id.as_ulid(), ulid);
    }

    #[test]
    fn ordering_follows_ulid_ordering() {
        let early = ResourceId::from_ulid(Ulid::from_parts(1_000, 0));
        let late = ResourceId::from_ulid(Ulid::from_parts(2_000, 0));
        assert!(early < late);
    }

    #[test]
    fn serializes_ulid_as_string_field() {
        let ulid = Ulid::new();
        let id = LeaseId::from_ulid(ulid);
        let json = serde_json::to_value(id).unwrap();
        assert_eq!(json, serde_json::json!({ "ulid": ulid.to_string() }));
    }
}
