//! Ports - 抽象化レイヤー
//!
//! Leasable が外部に依存する部分（Resource の生成・破棄、更新判定、時刻、ID）を
//! trait として定義します。具体的な Resource の使い方（リクエスト発行など）は
//! このクレートの範囲外です。

pub mod build_strategy;
pub mod clock;
pub mod disposable;
pub mod id_generator;
pub mod renew_policy;

pub use self::build_strategy::BuildStrategy;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::disposable::Disposable;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::renew_policy::{RenewPolicy, RenewalStats};
