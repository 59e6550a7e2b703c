//! Lease - リースの中核
//!
//! - **leasable**: キーごとの Resource + リース数（参照カウント）
//! - **office**: キー → Leasable のレジストリ
//! - **handle**: drop で自動 release するスコープ付きリース

pub mod handle;
pub mod leasable;
pub mod office;

pub use self::handle::Lease;
pub use self::leasable::Leasable;
pub use self::office::LeasingOffice;
