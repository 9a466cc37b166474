pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};

/// スタック定義を直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "DOCSTACK_CONFIG_PATH";

/// ルックアップコンテキストを直接指定する環境変数
pub const CONTEXT_PATH_ENV: &str = "DOCSTACK_CONTEXT_PATH";

/// コンテキストファイル名（スタック定義と同じディレクトリ）
pub const CONTEXT_FILE: &str = "docstack.context.json";

const CANDIDATES: [&str; 4] = [
    "docstack.local.kdl",
    ".docstack.local.kdl",
    "docstack.kdl",
    ".docstack.kdl",
];

/// グローバル設定ディレクトリ (`~/.config/docstack`)
pub fn get_config_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("docstack"))
}

/// カレントディレクトリからスタック定義を探す
///
/// 探索順序:
/// 1. 環境変数 `DOCSTACK_CONFIG_PATH`
/// 2. カレントディレクトリ: docstack.local.kdl, .docstack.local.kdl, docstack.kdl, .docstack.kdl
/// 3. `./.docstack/` 内を同じ順序で
/// 4. `~/.config/docstack/docstack.kdl`
pub fn find_stack_file() -> Result<PathBuf> {
    let current_dir = std::env::current_dir()?;
    find_stack_file_from(&current_dir)
}

/// 開始ディレクトリを指定する [`find_stack_file`]
pub fn find_stack_file_from(dir: &Path) -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Stack definition from {}", CONFIG_PATH_ENV);
            return Ok(path);
        }
        tracing::warn!(path = %path.display(), "{} points at a missing file", CONFIG_PATH_ENV);
    }

    for filename in &CANDIDATES {
        let path = dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let stack_dir = dir.join(".docstack");
    if stack_dir.is_dir() {
        for filename in &CANDIDATES {
            let path = stack_dir.join(filename);
            if path.exists() {
                return Ok(path);
            }
        }
    }

    if let Ok(config_dir) = get_config_dir() {
        let global = config_dir.join("docstack.kdl");
        if global.exists() {
            return Ok(global);
        }
    }

    Err(ConfigError::StackFileNotFound)
}

/// スタック定義に対応するルックアップコンテキストを探す
///
/// `DOCSTACK_CONTEXT_PATH` を優先し、なければスタック定義と同じ
/// ディレクトリの `docstack.context.json`
pub fn find_context_file(stack_file: &Path) -> Result<PathBuf> {
    if let Ok(context_path) = std::env::var(CONTEXT_PATH_ENV) {
        let path = PathBuf::from(context_path);
        return if path.exists() {
            Ok(path)
        } else {
            Err(ConfigError::ContextFileNotFound(path))
        };
    }

    let dir = stack_file.parent().unwrap_or_else(|| Path::new("."));
    let path = dir.join(CONTEXT_FILE);
    if path.exists() {
        Ok(path)
    } else {
        Err(ConfigError::ContextFileNotFound(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    #[test]
    fn test_get_config_dir() {
        let config_dir = get_config_dir().unwrap();
        assert!(config_dir.ends_with("docstack"));
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("docstack.kdl"), "// test").unwrap();

        temp_env::with_var_unset(CONFIG_PATH_ENV, || {
            let found = find_stack_file_from(temp_dir.path()).unwrap();
            assert!(found.ends_with("docstack.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_local_file_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("docstack.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("docstack.local.kdl"), "// local").unwrap();

        temp_env::with_var_unset(CONFIG_PATH_ENV, || {
            let found = find_stack_file_from(temp_dir.path()).unwrap();
            assert!(found.ends_with("docstack.local.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_find_stack_file_in_hidden_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stack_dir = temp_dir.path().join(".docstack");
        fs::create_dir(&stack_dir).unwrap();
        fs::write(stack_dir.join("docstack.kdl"), "// nested").unwrap();

        temp_env::with_var_unset(CONFIG_PATH_ENV, || {
            let found = find_stack_file_from(temp_dir.path()).unwrap();
            assert!(found.ends_with(".docstack/docstack.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_env_var_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let custom = temp_dir.path().join("custom.kdl");
        fs::write(&custom, "// custom").unwrap();
        fs::write(temp_dir.path().join("docstack.kdl"), "// default").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(custom.as_os_str()), || {
            let found = find_stack_file_from(temp_dir.path()).unwrap();
            assert_eq!(found, custom);
        });
    }

    #[test]
    #[serial]
    fn test_context_next_to_stack_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stack = temp_dir.path().join("docstack.kdl");
        fs::write(&stack, "// stack").unwrap();

        temp_env::with_var_unset(CONTEXT_PATH_ENV, || {
            assert!(matches!(
                find_context_file(&stack),
                Err(ConfigError::ContextFileNotFound(_))
            ));

            fs::write(temp_dir.path().join(CONTEXT_FILE), "{}").unwrap();
            let found = find_context_file(&stack).unwrap();
            assert!(found.ends_with(CONTEXT_FILE));
        });
    }

    #[test]
    #[serial]
    fn test_context_env_var_must_exist() {
        let temp_dir = tempfile::tempdir().unwrap();
        let stack = temp_dir.path().join("docstack.kdl");
        let missing = temp_dir.path().join("missing.json");

        temp_env::with_var(CONTEXT_PATH_ENV, Some(missing.as_os_str()), || {
            assert!(find_context_file(&stack).is_err());
        });
    }
}
