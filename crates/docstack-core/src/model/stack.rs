//! スタック定義

use super::environment::Environment;
use super::exposure::Exposure;
use super::health::HealthCheckPolicy;
use super::profile::{DeploymentProfile, Tier};
use crate::error::{Result, StackError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PROJECT: &str = "BookStack";
pub const DEFAULT_REGION: &str = "us-east-2";
pub const DEFAULT_PRODUCTION: &str = "productionA";
pub const DEFAULT_LOG_ROUTER_IMAGE: &str = "amazon/aws-for-fluent-bit:latest";
pub const DEFAULT_SECRET_VERSION: u64 = 2;

/// 全環境で共有するデプロイ定義
///
/// KDL:
/// ```kdl
/// project "BookStack"
/// domain "docs.wmaug.org"
/// zone "wmaug.org"
/// image "lscr.io/linuxserver/bookstack:latest"
/// environment "devA" {
///     exposure "public"
///     container-port 80
///     health-check path="/login" interval=10 timeout=3 codes="200,302"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackDefinition {
    /// アプリケーション名（スタックIDとパラメータパスの接頭辞）
    pub project: String,

    /// 本番のホスト名（他の環境は接頭辞を付ける）
    pub domain: String,

    /// `domain` を含むホストゾーン
    pub zone: String,

    pub region: String,

    /// 本番として扱う環境識別子
    pub production: String,

    /// アプリケーションのコンテナイメージ
    pub image: String,

    pub log_router_image: String,

    /// DBパスワードのセキュアパラメータに必要なバージョン
    pub secret_version: u64,

    pub task: TaskSize,

    pub database: DatabaseSettings,

    pub environments: BTreeMap<String, EnvironmentSpec>,
}

/// Fargate タスクサイズ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSize {
    pub cpu: u32,
    pub memory_mib: u32,
}

impl Default for TaskSize {
    fn default() -> Self {
        Self {
            cpu: 256,
            memory_mib: 512,
        }
    }
}

/// マネージドDBのサイズ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    pub engine_version: String,
    pub instance_class: String,
    pub allocated_storage_gib: u32,
    pub backup_retention_days: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine_version: "8.0".to_string(),
            instance_class: "db.t4g.micro".to_string(),
            allocated_storage_gib: 20,
            backup_retention_days: 1,
        }
    }
}

/// スタック定義に書かれた環境ごとの設定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    pub exposure: Exposure,
    pub container_port: u16,
    pub health_check: HealthCheckPolicy,
    /// アプリケーションの横でログルーターのサイドカーを動かす
    pub log_router: bool,
}

impl StackDefinition {
    /// 宣言順の環境名
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(String::as_str).collect()
    }

    /// 環境のデプロイプロファイルを選ぶ
    ///
    /// 環境名と本番識別子を比較するのはここだけ。以降は [`Tier`] で分岐する。
    pub fn profile(&self, environment: &str) -> Result<DeploymentProfile> {
        let spec = self
            .environments
            .get(environment)
            .ok_or_else(|| StackError::EnvironmentNotFound(environment.to_string()))?;
        let environment = Environment::parse(environment)?;

        let tier = if environment.as_str() == self.production {
            Tier::Production
        } else {
            Tier::NonProduction
        };

        tracing::debug!(
            environment = %environment,
            tier = ?tier,
            exposure = spec.exposure.as_str(),
            "Selected deployment profile"
        );

        Ok(DeploymentProfile {
            environment,
            tier,
            exposure: spec.exposure.clone(),
            container_port: spec.container_port,
            health_check: spec.health_check.clone(),
            log_router: spec.log_router,
        })
    }
}
