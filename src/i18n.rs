use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::{BuildError, Result};

const OUTBOUND_PREFIX: &str = "outboundNames.";

/// 显示名称查找
pub trait Localizer {
    fn resolve(&self, key: &str) -> Result<String>;
}

/// 出站分类对应的本地化键
pub fn outbound_key(category: &str) -> String {
    format!("{}{}", OUTBOUND_PREFIX, category)
}

/// 解析出站分类的显示名称
pub fn outbound_name<L: Localizer + ?Sized>(localizer: &L, category: &str) -> Result<String> {
    localizer.resolve(&outbound_key(category))
}

static EN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("outboundNames.Node Select", "🚀 Node Select"),
        ("outboundNames.Auto Select", "⚡ Auto Select"),
        ("outboundNames.Fall Back", "🐟 Fall Back"),
        ("outboundNames.Ad Block", "🛑 Ad Block"),
        ("outboundNames.AI Services", "💬 AI Services"),
        ("outboundNames.Telegram", "📲 Telegram"),
        ("outboundNames.Streaming", "📺 Streaming"),
        ("outboundNames.Apple", "🍏 Apple"),
        ("outboundNames.Microsoft", "Ⓜ️ Microsoft"),
        ("outboundNames.Speedtest", "📶 Speedtest"),
        ("outboundNames.CDN", "☁️ CDN"),
        ("outboundNames.Download", "📥 Download"),
        ("outboundNames.Global", "🌐 Global"),
        ("outboundNames.Private", "🏠 Private"),
        ("outboundNames.Location:CN", "🔒 In-China"),
    ])
});

static ZH_CN: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("outboundNames.Node Select", "🚀 节点选择"),
        ("outboundNames.Auto Select", "⚡ 自动选择"),
        ("outboundNames.Fall Back", "🐟 漏网之鱼"),
        ("outboundNames.Ad Block", "🛑 广告拦截"),
        ("outboundNames.AI Services", "💬 AI 服务"),
        ("outboundNames.Telegram", "📲 电报消息"),
        ("outboundNames.Streaming", "📺 流媒体"),
        ("outboundNames.Apple", "🍏 苹果服务"),
        ("outboundNames.Microsoft", "Ⓜ️ 微软服务"),
        ("outboundNames.Speedtest", "📶 测速服务"),
        ("outboundNames.CDN", "☁️ CDN 加速"),
        ("outboundNames.Download", "📥 下载服务"),
        ("outboundNames.Global", "🌐 国外服务"),
        ("outboundNames.Private", "🏠 私有网络"),
        ("outboundNames.Location:CN", "🔒 国内服务"),
    ])
});

/// 内置翻译表
///
/// `outboundNames.*` 下找不到的键回落为分类名本身（用户自定义规则的名称就是这样显示的），
/// 其它命名空间的未知键返回错误。
#[derive(Debug, Clone, Copy)]
pub struct Translations {
    table: &'static Lazy<HashMap<&'static str, &'static str>>,
}

impl Translations {
    pub fn new(lang: &str) -> Self {
        let lang = lang.to_lowercase();
        let table = if lang.starts_with("zh") { &ZH_CN } else { &EN };
        Self { table }
    }
}

impl Default for Translations {
    fn default() -> Self {
        Self::new("zh-CN")
    }
}

impl Localizer for Translations {
    fn resolve(&self, key: &str) -> Result<String> {
        if let Some(text) = self.table.get(key) {
            return Ok((*text).to_string());
        }
        match key.strip_prefix(OUTBOUND_PREFIX) {
            Some(category) if !category.is_empty() => Ok(category.to_string()),
            _ => Err(BuildError::Localization {
                key: key.to_string(),
            }),
        }
    }
}
