//! 预置规则分类目录
//!
//! 规则集标识对应 ruleset.skk.moe 上的文件名，同一标识按类型分别展开为
//! `domainset/<id>.txt`、`non_ip/<id>.txt`、`ip/<id>.txt`。

use crate::error::{BuildError, Result};
use crate::models::{RuleEntry, RuleSelection, RuleSpec};

pub const NODE_SELECT: &str = "Node Select";
pub const AUTO_SELECT: &str = "Auto Select";
pub const FALL_BACK: &str = "Fall Back";

/// 分类最终路由到的动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Direct,
    Reject,
    /// 需要一个代理组
    Selectable,
}

/// 出站分类 → 动作
pub trait ActionResolver {
    fn action_of(&self, category: &str) -> Action;
}

/// 预置分类定义
#[derive(Debug)]
pub struct CategoryDef {
    pub name: &'static str,
    pub action: Action,
    pub site_rules: &'static [&'static str],
    pub non_ip_rules: &'static [&'static str],
    pub ip_rules: &'static [&'static str],
}

impl CategoryDef {
    pub fn to_entry(&self) -> RuleEntry {
        let owned = |ids: &[&str]| ids.iter().map(|id| id.to_string()).collect::<Vec<_>>();
        RuleEntry {
            name: self.name.to_string(),
            outbound: self.name.to_string(),
            site_rules: owned(self.site_rules),
            non_ip_rules: owned(self.non_ip_rules),
            ip_rules: owned(self.ip_rules),
            ..Default::default()
        }
    }
}

/// 按输出顺序排列的预置分类
pub static UNIFIED_RULES: &[CategoryDef] = &[
    CategoryDef {
        name: "Ad Block",
        action: Action::Reject,
        site_rules: &["reject"],
        non_ip_rules: &["reject"],
        ip_rules: &["reject"],
    },
    CategoryDef {
        name: "AI Services",
        action: Action::Selectable,
        site_rules: &[],
        non_ip_rules: &["ai"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Telegram",
        action: Action::Selectable,
        site_rules: &[],
        non_ip_rules: &["telegram"],
        ip_rules: &["telegram"],
    },
    CategoryDef {
        name: "Streaming",
        action: Action::Selectable,
        site_rules: &[],
        non_ip_rules: &["stream"],
        ip_rules: &["stream"],
    },
    CategoryDef {
        name: "Apple",
        action: Action::Selectable,
        site_rules: &["apple_cdn"],
        non_ip_rules: &["apple_services"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Microsoft",
        action: Action::Selectable,
        site_rules: &[],
        non_ip_rules: &["microsoft", "microsoft_cdn"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Speedtest",
        action: Action::Selectable,
        site_rules: &["speedtest"],
        non_ip_rules: &[],
        ip_rules: &[],
    },
    CategoryDef {
        name: "CDN",
        action: Action::Selectable,
        site_rules: &["cdn"],
        non_ip_rules: &["cdn"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Download",
        action: Action::Selectable,
        site_rules: &["download"],
        non_ip_rules: &["download"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Global",
        action: Action::Selectable,
        site_rules: &[],
        non_ip_rules: &["global"],
        ip_rules: &[],
    },
    CategoryDef {
        name: "Private",
        action: Action::Direct,
        site_rules: &[],
        non_ip_rules: &["lan"],
        ip_rules: &["lan"],
    },
    CategoryDef {
        name: "Location:CN",
        action: Action::Direct,
        site_rules: &[],
        non_ip_rules: &["domestic", "direct"],
        ip_rules: &["domestic", "china_ip"],
    },
];

const MINIMAL: &[&str] = &["Global", "Private", "Location:CN"];
const BALANCED: &[&str] = &[
    "Ad Block",
    "AI Services",
    "Telegram",
    "Streaming",
    "Global",
    "Private",
    "Location:CN",
];

/// 预设名称 → 分类列表
pub fn preset(name: &str) -> Option<Vec<&'static str>> {
    match name {
        "minimal" => Some(MINIMAL.to_vec()),
        "balanced" => Some(BALANCED.to_vec()),
        "comprehensive" => Some(UNIFIED_RULES.iter().map(|c| c.name).collect()),
        _ => None,
    }
}

/// 内置规则目录，同时充当默认的动作解析器
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleCatalog;

impl RuleCatalog {
    pub fn category(&self, name: &str) -> Option<&'static CategoryDef> {
        UNIFIED_RULES.iter().find(|c| c.name == name)
    }

    /// 解析选择，按目录顺序返回选中的分类。空选择等价于 minimal
    pub fn select(&self, selection: &RuleSelection) -> Result<Vec<&'static CategoryDef>> {
        let names: Vec<String> = match selection {
            RuleSelection::Preset(name) => preset(name)
                .ok_or_else(|| BuildError::UnknownPreset(name.clone()))?
                .into_iter()
                .map(String::from)
                .collect(),
            RuleSelection::Categories(names) if names.is_empty() => {
                MINIMAL.iter().map(|s| s.to_string()).collect()
            }
            RuleSelection::Categories(names) => names.clone(),
        };

        if let Some(unknown) = names.iter().find(|n| self.category(n).is_none()) {
            return Err(BuildError::UnknownCategory(unknown.clone()));
        }

        Ok(UNIFIED_RULES
            .iter()
            .filter(|c| names.iter().any(|n| n == c.name))
            .collect())
    }

    /// 展开为有序的逻辑规则：预置分类在前，自定义规则按列表顺序在后
    pub fn expand(&self, spec: &RuleSpec) -> Result<Vec<RuleEntry>> {
        let mut entries: Vec<RuleEntry> = self
            .select(&spec.selection)?
            .into_iter()
            .map(CategoryDef::to_entry)
            .collect();
        entries.extend(spec.custom_rules.iter().map(RuleEntry::from));
        Ok(entries)
    }
}

impl ActionResolver for RuleCatalog {
    fn action_of(&self, category: &str) -> Action {
        match category {
            "DIRECT" => Action::Direct,
            "REJECT" => Action::Reject,
            _ => self
                .category(category)
                .map_or(Action::Selectable, |c| c.action),
        }
    }
}
