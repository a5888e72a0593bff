use thiserror::Error;

/// 配置生成过程中的错误
#[derive(Debug, Error)]
pub enum BuildError {
    /// 协议要求 TLS，但出站描述中缺少 tls 块
    #[error("malformed proxy descriptor '{tag}' ({kind}): missing TLS configuration")]
    MissingTls { tag: String, kind: &'static str },

    /// 已知协议的出站描述无法解析
    #[error("malformed proxy descriptor: {0}")]
    InvalidDescriptor(String),

    /// 规则定义不合法（空标识、非法字符等）
    #[error("invalid rule '{name}': {reason}")]
    InvalidRule { name: String, reason: String },

    #[error("unknown rule category: {0}")]
    UnknownCategory(String),

    #[error("unknown rule preset: {0}")]
    UnknownPreset(String),

    /// 本地化查找失败
    #[error("no translation for key '{key}'")]
    Localization { key: String },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BuildError>;
