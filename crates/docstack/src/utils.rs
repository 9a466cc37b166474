use anyhow::Context;
use docstack_cloud::{ContextManager, LookupContext};
use docstack_config::{CONTEXT_PATH_ENV, ConfigError};
use docstack_core::{LoadedStack, StackDefinition, StackError};
use docstack_topology::{StackTopology, TopologyBuilder};
use std::path::{Path, PathBuf};

/// 使用中のスタック定義とルックアップの取得元
pub struct Workspace {
    pub stack: LoadedStack,
    context_override: Option<PathBuf>,
}

impl Workspace {
    pub fn load(config: Option<&Path>, context: Option<PathBuf>) -> anyhow::Result<Self> {
        let stack = match config {
            Some(path) => docstack_core::load_stack_from(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => docstack_core::load_stack()?,
        };
        Ok(Self {
            stack,
            context_override: context,
        })
    }

    pub fn definition(&self) -> &StackDefinition {
        &self.stack.definition
    }

    pub fn context_path(&self) -> anyhow::Result<PathBuf> {
        match &self.context_override {
            Some(path) => Ok(path.clone()),
            None => Ok(self.stack.context_path()?),
        }
    }

    pub fn lookups(&self) -> anyhow::Result<LookupContext> {
        let path = self.context_path()?;
        ContextManager::new(&path)
            .load()
            .with_context(|| format!("failed to load lookup context {}", path.display()))
    }

    /// スタック定義の隣にコンテキストファイルがあればルックアップを返す
    /// `--context` または `DOCSTACK_CONTEXT_PATH` で明示した場合は存在必須
    pub fn optional_lookups(&self) -> anyhow::Result<Option<LookupContext>> {
        let explicit =
            self.context_override.is_some() || std::env::var_os(CONTEXT_PATH_ENV).is_some();
        if !explicit {
            match self.stack.context_path() {
                Err(StackError::Discovery(ConfigError::ContextFileNotFound(path))) => {
                    tracing::debug!(path = %path.display(), "no lookup context next to stack definition");
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
                Ok(_) => {}
            }
        }
        self.lookups().map(Some)
    }

    /// 環境を決定（明示された名前、なければ唯一の宣言済み環境）
    pub fn environment(&self, env: Option<String>) -> anyhow::Result<String> {
        let definition = self.definition();
        if let Some(env) = env {
            return Ok(env);
        }
        match definition.environment_names().as_slice() {
            [only] => Ok(only.to_string()),
            names => Err(anyhow::anyhow!(
                "Specify an environment: docstack <command> <ENV> or DOCSTACK_ENV=<ENV>\nDeclared environments: {}",
                names.join(", ")
            )),
        }
    }

    pub fn build(&self, environment: &str, lookups: &LookupContext) -> anyhow::Result<StackTopology> {
        TopologyBuilder::new(self.definition())
            .build(environment, lookups)
            .with_context(|| format!("failed to build environment {}", environment))
    }
}
