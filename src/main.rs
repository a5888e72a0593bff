//! # subforge
//!
//! 把 sing-box 出站列表转换为 Clash / MiHomo 配置。
//!
//! ```bash
//! # 从文件读取，使用 balanced 预设
//! subforge --input sing-box.json --rules balanced > clash.yaml
//!
//! # 从 stdin 读取，指定分类与自定义规则
//! cat outbounds.json | subforge --rules "Ad Block,Telegram,Private" --custom-rules custom.json
//! ```

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;

use subforge_lib::catalog;
use subforge_lib::models::{parse_outbounds, ClashConfig, CustomRule, RuleSelection, RuleSpec};
use subforge_lib::{BuilderOptions, ClashConfigBuilder};

/// sing-box → Clash 配置转换工具
#[derive(Parser)]
#[command(name = "subforge")]
#[command(version)]
#[command(about = "Convert sing-box outbounds and rule selections into a Clash / MiHomo config")]
struct Cli {
    /// sing-box 配置或出站数组（JSON），缺省读取 stdin
    #[arg(long, short = 'i', value_name = "PATH")]
    input: Option<PathBuf>,

    /// 预设名称（minimal / balanced / comprehensive）或逗号分隔的分类列表
    #[arg(long, short = 'r', default_value = "minimal")]
    rules: String,

    /// 自定义规则（JSON 数组）
    #[arg(long, value_name = "PATH")]
    custom_rules: Option<PathBuf>,

    /// 基础模板（YAML），缺省使用内置模板
    #[arg(long, value_name = "PATH")]
    template: Option<PathBuf>,

    /// 生成参数文件（JSON），命令行参数优先
    #[arg(long, short = 'c', value_name = "PATH")]
    config: Option<PathBuf>,

    /// 显示语言
    #[arg(long)]
    lang: Option<String>,

    /// 规则集下载地址前缀
    #[arg(long, value_name = "URL")]
    ruleset_base_url: Option<String>,

    /// 输出文件，缺省写到 stdout
    #[arg(long, short = 'o', value_name = "PATH")]
    output: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let input = match &cli.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    let proxies = parse_outbounds(&input).context("Failed to parse outbounds")?;
    log::info!("Loaded {} outbounds", proxies.len());

    let custom_rules: Vec<CustomRule> = match &cli.custom_rules {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read custom rules {}", path.display()))?;
            serde_json::from_str(&content).context("Failed to parse custom rules")?
        }
        None => Vec::new(),
    };

    let mut options: BuilderOptions = match &cli.config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options {}", path.display()))?;
            serde_json::from_str(&content).context("Failed to parse options")?
        }
        None => BuilderOptions::default(),
    };
    if let Some(lang) = &cli.lang {
        options.lang = lang.clone();
    }
    if let Some(url) = &cli.ruleset_base_url {
        options.ruleset_base_url = url.clone();
    }

    let mut builder = ClashConfigBuilder::new(&options);
    if let Some(path) = &cli.template {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        let template = ClashConfig::from_template(&content).context("Failed to parse template")?;
        builder = builder.with_template(template);
    }

    let spec = RuleSpec {
        selection: parse_selection(&cli.rules),
        custom_rules,
    };
    let yaml = builder.build_yaml(&proxies, &spec)?;

    match &cli.output {
        Some(path) => {
            std::fs::write(path, yaml)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            log::info!("Config written to {}", path.display());
        }
        None => {
            std::io::stdout()
                .write_all(yaml.as_bytes())
                .context("Failed to write stdout")?;
        }
    }

    Ok(())
}

/// 预设名优先，否则按逗号拆分为分类列表
fn parse_selection(raw: &str) -> RuleSelection {
    let raw = raw.trim();
    if catalog::preset(raw).is_some() {
        return RuleSelection::Preset(raw.to_string());
    }
    RuleSelection::Categories(
        raw.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect(),
    )
}
