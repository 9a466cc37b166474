//! docstack core
//!
//! スタック定義モデル、KDLパーサー、デプロイプロファイルの選択。

pub mod error;
pub mod loader;
pub mod model;
pub mod parser;

pub use error::{Result, StackError};
pub use loader::{LoadedStack, load_stack, load_stack_from};
pub use model::*;
pub use parser::{parse_stack_file, parse_stack_string};
