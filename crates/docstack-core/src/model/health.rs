//! ロードバランサーのヘルスチェック設定

use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};

/// タスクが正常かを判定する条件
///
/// `Default` はない。各環境がパスとコードを明示する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckPolicy {
    pub path: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub healthy_codes: Vec<u16>,
}

impl HealthCheckPolicy {
    pub fn new(
        path: impl Into<String>,
        interval_secs: u32,
        timeout_secs: u32,
        healthy_codes: Vec<u16>,
    ) -> Result<Self> {
        let policy = Self {
            path: path.into(),
            interval_secs,
            timeout_secs,
            healthy_codes,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// `"200,302"` 形式のマッチャー文字列をパース
    pub fn parse_codes(codes: &str) -> Result<Vec<u16>> {
        codes
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| {
                c.parse::<u16>()
                    .map_err(|_| StackError::InvalidConfig(format!("invalid HTTP code: {}", c)))
            })
            .collect()
    }

    /// ロードバランサー向けのマッチャー文字列
    pub fn matcher(&self) -> String {
        self.healthy_codes
            .iter()
            .map(u16::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(StackError::InvalidConfig(format!(
                "health check path must start with '/': {}",
                self.path
            )));
        }
        if self.healthy_codes.is_empty() {
            return Err(StackError::InvalidConfig(
                "health check needs at least one healthy code".to_string(),
            ));
        }
        if let Some(code) = self.healthy_codes.iter().find(|c| !(200..=499).contains(*c)) {
            return Err(StackError::InvalidConfig(format!(
                "healthy code out of range 200-499: {}",
                code
            )));
        }
        if !(5..=300).contains(&self.interval_secs) {
            return Err(StackError::InvalidConfig(format!(
                "health check interval must be 5-300 seconds: {}",
                self.interval_secs
            )));
        }
        if self.timeout_secs < 2 || self.timeout_secs >= self.interval_secs {
            return Err(StackError::InvalidConfig(format!(
                "health check timeout must be at least 2 seconds and shorter than the interval: {}",
                self.timeout_secs
            )));
        }
        Ok(())
    }
}
