//! デプロイプロファイル（エントリポイントで一度だけ選ぶ環境ごとの設定）

use super::environment::Environment;
use super::exposure::Exposure;
use super::health::HealthCheckPolicy;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tier {
    Production,
    NonProduction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentProfile {
    pub environment: Environment,
    pub tier: Tier,
    pub exposure: Exposure,
    /// アプリケーションコンテナの待ち受けポート（ターゲットグループも同じ）
    pub container_port: u16,
    pub health_check: HealthCheckPolicy,
    pub log_router: bool,
}

impl DeploymentProfile {
    pub fn is_production(&self) -> bool {
        self.tier == Tier::Production
    }
}
