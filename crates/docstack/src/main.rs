mod commands;
mod utils;

use clap::{Parser, Subcommand, ValueEnum};
use docstack_cloud::TemplateFormat;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "docstack")]
#[command(about = "セルフホスト BookStack のデプロイテンプレートを生成", long_about = None)]
struct Cli {
    /// スタック定義ファイル（探索をスキップ）
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// ルックアップコンテキスト（デフォルトはスタック定義の隣の docstack.context.json）
    #[arg(long, global = true)]
    context: Option<PathBuf>,

    /// 進捗ログを stderr に出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// デプロイテンプレートを出力
    Synth {
        /// 環境名 (devA, productionA, ...)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、DOCSTACK_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "DOCSTACK_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// 宣言済みの全環境を出力（ENV は無視）
        #[arg(long)]
        all: bool,
        /// テンプレート形式
        #[arg(short, long, value_enum, default_value = "json")]
        format: Format,
        /// stdout ではなくこのディレクトリにテンプレートを書き出す
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// 環境の作成順序（ウェーブ）を表示
    Plan {
        /// 環境名 (devA, productionA, ...)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、DOCSTACK_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "DOCSTACK_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// プランを JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 環境ごとに導出される名前を表示
    Names {
        /// 環境名 (devA, productionA, ...)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、DOCSTACK_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "DOCSTACK_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
        /// 名前を JSON で出力
        #[arg(long)]
        json: bool,
    },
    /// 環境に必要なルックアップがコンテキストにあるか確認
    Context {
        /// 環境名 (devA, productionA, ...)
        env: Option<String>,
        /// 環境名 (-e/--env フラグ、DOCSTACK_ENV 環境変数)
        #[arg(
            short = 'e',
            long = "env",
            env = "DOCSTACK_ENV",
            conflicts_with = "env",
            hide = true
        )]
        env_flag: Option<String>,
    },
    /// スタック定義を検証（コンテキストがあれば全環境もビルド）
    Validate,
    /// バージョン情報を表示
    Version,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

impl From<Format> for TemplateFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => TemplateFormat::Json,
            Format::Yaml => TemplateFormat::Yaml,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout はテンプレート用、ログは stderr へ
    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = cli.config;
    let context = cli.context;
    let load = || utils::Workspace::load(config.as_deref(), context.clone());

    match cli.command {
        Commands::Synth {
            env,
            env_flag,
            all,
            format,
            out,
        } => {
            commands::synth::handle(&load()?, env.or(env_flag), all, format.into(), out)?;
        }
        Commands::Plan {
            env,
            env_flag,
            json,
        } => {
            commands::plan::handle(&load()?, env.or(env_flag), json)?;
        }
        Commands::Names {
            env,
            env_flag,
            json,
        } => {
            commands::names::handle(&load()?, env.or(env_flag), json)?;
        }
        Commands::Context { env, env_flag } => {
            commands::context::handle(&load()?, env.or(env_flag))?;
        }
        Commands::Validate => {
            commands::validate::handle(&load()?)?;
        }
        Commands::Version => {
            println!("docstack {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
