//! 更新ポリシーの設定（JSON）
//!
//! ```json
//! { "renew": { "max_age_secs": 3900, "max_errors": 4 } }
//! ```
//!
//! 上限を何も指定しない場合は eager（最後の release のたびに作り直す）になります。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strategy::RenewStrategy;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// リース全体の設定
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeaseConfig {
    #[serde(default)]
    pub renew: RenewConfig,
}

/// RenewStrategy の組み立て方
///
/// 指定した上限のどれか 1 つを超えたら作り直します。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenewConfig {
    /// 作成からの経過秒数がこの値以上で作り直す
    #[serde(default)]
    pub max_age_secs: Option<u64>,

    /// 報告されたエラー数がこの値を超えたら作り直す
    #[serde(default)]
    pub max_errors: Option<u32>,

    /// acquire された回数がこの値を超えたら作り直す
    #[serde(default)]
    pub max_usage: Option<u64>,

    /// 最後の release のたびに必ず作り直す
    ///
    /// 省略時は上限が 1 つもなければ eager とみなします。
    #[serde(default)]
    pub eager: Option<bool>,
}

impl RenewConfig {
    fn has_limit(&self) -> bool {
        self.max_age_secs.is_some() || self.max_errors.is_some() || self.max_usage.is_some()
    }

    pub fn is_eager(&self) -> bool {
        self.eager.unwrap_or(!self.has_limit())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match (self.eager, self.has_limit()) {
            (Some(true), true) => Err(ConfigError::Invalid(
                "renew.eager cannot be combined with max_age_secs, max_errors or max_usage".into(),
            )),
            (Some(false), false) => Err(ConfigError::Invalid(
                "renew needs at least one limit unless eager is set".into(),
            )),
            _ => Ok(()),
        }
    }

    /// 設定から RenewStrategy を作る（eager なら述語なし）
    pub fn into_strategy(self) -> Result<RenewStrategy, ConfigError> {
        self.validate()?;

        let mut strategy = RenewStrategy::new();
        if let Some(secs) = self.max_age_secs {
            strategy = strategy.with_age_limit(Duration::from_secs(secs));
        }
        if let Some(max) = self.max_errors {
            strategy = strategy.with_error_limit(max);
        }
        if let Some(max) = self.max_usage {
            strategy = strategy.with_usage_limit(max);
        }
        Ok(strategy)
    }
}

impl LeaseConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.renew.validate()
    }

    pub fn renew_strategy(&self) -> Result<RenewStrategy, ConfigError> {
        self.renew.clone().into_strategy()
    }
}
