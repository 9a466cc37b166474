//! スタック定義の読み込み
//!
//! `docstack-config` のファイル探索とパースを組み合わせる。

use crate::error::Result;
use crate::model::StackDefinition;
use crate::parser::parse_stack_file;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

/// パース済みのスタック定義と読み込み元のパス
#[derive(Debug, Clone)]
pub struct LoadedStack {
    pub path: PathBuf,
    pub definition: StackDefinition,
}

/// カレントディレクトリからスタック定義を探して読み込む
#[instrument]
pub fn load_stack() -> Result<LoadedStack> {
    let path = docstack_config::find_stack_file()?;
    load_stack_from(&path)
}

/// 指定パスからスタック定義を読み込む
#[instrument(skip(path), fields(path = %path.display()))]
pub fn load_stack_from(path: &Path) -> Result<LoadedStack> {
    let definition = parse_stack_file(path)?;
    info!(
        project = %definition.project,
        environments = definition.environments.len(),
        "Stack definition loaded"
    );
    Ok(LoadedStack {
        path: path.to_path_buf(),
        definition,
    })
}

impl LoadedStack {
    /// このスタック定義の隣にあるはずのルックアップコンテキスト
    pub fn context_path(&self) -> Result<PathBuf> {
        Ok(docstack_config::find_context_file(&self.path)?)
    }
}
