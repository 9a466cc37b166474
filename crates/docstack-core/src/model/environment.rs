//! 環境識別子

use crate::error::{Result, StackError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

const MAX_LEN: usize = 32;

// 導出名は論理IDやDB名に使われるため、英字始まりの英数字のみ
static ENVIRONMENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9]*$").expect("valid environment regex"));

/// 検証済みのデプロイ環境識別子（例: `devA`）
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Environment(String);

impl Environment {
    pub fn parse(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.len() > MAX_LEN || !ENVIRONMENT_PATTERN.is_match(&name) {
            return Err(StackError::InvalidEnvironment(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Environment {
    type Error = StackError;

    fn try_from(value: String) -> Result<Self> {
        Environment::parse(value)
    }
}

impl From<Environment> for String {
    fn from(value: Environment) -> Self {
        value.0
    }
}

impl AsRef<str> for Environment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
