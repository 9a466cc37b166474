use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub const STACK: &str = r#"
project "BookStack"
domain "docs.wmaug.org"
zone "wmaug.org"
image "lscr.io/linuxserver/bookstack:latest"

environment "devA" {
    exposure "public"
    container-port 80
    health-check path="/login" interval=10 timeout=3 codes="200,302"
}

environment "productionA" {
    exposure "restricted" cidr="203.0.113.10/32"
    container-port 80
    health-check path="/" codes="200"
}
"#;

pub struct TestProject {
    pub root: TempDir,
    /// 実際の `~/.config/docstack` を探索対象から外す
    pub config_home: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            config_home: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write_stack(&self, content: &str) {
        fs::write(self.root.path().join("docstack.kdl"), content).unwrap();
    }

    /// [`STACK`] の全環境を満たすコンテキスト（devA のパスワードは指定バージョン）
    pub fn write_context(&self, dev_secret_version: u64) {
        let subnets = |prefix: &str| {
            json!({
                "vpcId": format!("vpc-{}", prefix),
                "privateSubnetIds": [format!("subnet-{}-p1", prefix), format!("subnet-{}-p2", prefix)],
                "publicSubnetIds": [format!("subnet-{}-u1", prefix), format!("subnet-{}-u2", prefix)],
            })
        };
        let context = json!({
            "version": 1,
            "parameters": {
                "/all/awsAccountNumber": { "value": "123456789012" },
                "/all/aws/route53/wmaug.org/hostedZoneId": { "value": "Z0123456789" },
                "/devA/BookStack/DB_PASS": { "secure": true, "version": dev_secret_version },
                "/productionA/BookStack/DB_PASS": { "secure": true, "version": 2 },
            },
            "vpcs": {
                "devAVpc": subnets("dev"),
                "productionAVpc": subnets("prod"),
            }
        });
        fs::write(
            self.root.path().join("docstack.context.json"),
            serde_json::to_string_pretty(&context).unwrap(),
        )
        .unwrap();
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    /// 探索用の環境変数を消してプロジェクト内で実行するバイナリ
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::cargo_bin("docstack").unwrap();
        cmd.current_dir(self.path())
            .env_remove("DOCSTACK_CONFIG_PATH")
            .env_remove("DOCSTACK_CONTEXT_PATH")
            .env_remove("DOCSTACK_ENV")
            .env_remove("RUST_LOG")
            .env("XDG_CONFIG_HOME", self.config_home.path())
            .env("HOME", self.config_home.path())
            .env("NO_COLOR", "1");
        cmd
    }
}
