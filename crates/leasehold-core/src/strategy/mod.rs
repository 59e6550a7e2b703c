//! Strategy - 標準の BuildStrategy / RenewPolicy 実装
//!
//! - **RenewStrategy**: age / error / usage 述語の OR 合成
//! - **BuildChain**: factory + 設定ステップ

pub mod build;
pub mod renew;

pub use self::build::BuildChain;
pub use self::renew::RenewStrategy;
