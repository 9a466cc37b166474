//! モデル定義

mod environment;
mod exposure;
mod health;
mod profile;
mod stack;

// 再エクスポート
pub use environment::*;
pub use exposure::*;
pub use health::*;
pub use profile::*;
pub use stack::*;
