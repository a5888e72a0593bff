use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::catalog::{Action, ActionResolver, FALL_BACK};
use crate::error::{BuildError, Result};
use crate::i18n::{outbound_name, Localizer};
use crate::models::{RuleEntry, RuleProvider};

/// 规则集标识最终会拼进 URL 和文件路径
static RULE_SET_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid rule-set id pattern"));

/// rule-provider 的生成参数
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub base_url: String,
    pub path_prefix: String,
    pub interval: u32,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: "https://ruleset.skk.moe/Clash".to_string(),
            path_prefix: "./ruleset".to_string(),
            interval: 43200,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleSetKind {
    Site,
    NonIp,
    Ip,
}

impl RuleSetKind {
    /// provider 名称后缀，同时也是远端目录名
    fn suffix(self) -> &'static str {
        match self {
            Self::Site => "domainset",
            Self::NonIp => "non_ip",
            Self::Ip => "ip",
        }
    }

    fn behavior(self) -> &'static str {
        match self {
            Self::Site => "domain",
            Self::NonIp | Self::Ip => "classical",
        }
    }

    fn provider(self, id: &str, settings: &ProviderSettings) -> RuleProvider {
        let base_url = settings.base_url.trim_end_matches('/');
        let path_prefix = settings.path_prefix.trim_end_matches('/');
        RuleProvider {
            provider_type: "http".to_string(),
            behavior: self.behavior().to_string(),
            format: Some("text".to_string()),
            url: Some(format!("{}/{}/{}.txt", base_url, self.suffix(), id)),
            path: Some(format!("{}/{}_{}.txt", path_prefix, id, self.suffix())),
            interval: Some(settings.interval),
        }
    }
}

/// 规则组装结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledRules {
    pub providers: BTreeMap<String, RuleProvider>,
    pub rules: Vec<String>,
}

/// 展开规则：生成 rule-providers 与有序规则列表，末尾追加 MATCH
pub fn assemble_rules(
    entries: &[RuleEntry],
    resolver: &dyn ActionResolver,
    localizer: &dyn Localizer,
    settings: &ProviderSettings,
) -> Result<AssembledRules> {
    let mut assembled = AssembledRules::default();

    for entry in entries {
        let action = action_text(&entry.outbound, resolver, localizer)?;

        for (kind, ids) in [
            (RuleSetKind::Site, &entry.site_rules),
            (RuleSetKind::NonIp, &entry.non_ip_rules),
            (RuleSetKind::Ip, &entry.ip_rules),
        ] {
            for id in rule_set_ids(&entry.name, ids)? {
                let provider_name = format!("{}_{}", id, kind.suffix());
                assembled
                    .rules
                    .push(format!("RULE-SET,{},{}", provider_name, action));
                assembled
                    .providers
                    .insert(provider_name, kind.provider(id, settings));
            }
        }

        for (matcher, values) in [
            ("DOMAIN-SUFFIX", &entry.domain_suffix),
            ("DOMAIN-KEYWORD", &entry.domain_keyword),
            ("IP-CIDR", &entry.ip_cidr),
        ] {
            for value in literals(&entry.name, values)? {
                assembled
                    .rules
                    .push(format!("{},{},{}", matcher, value, action));
            }
        }
    }

    assembled
        .rules
        .push(format!("MATCH,{}", outbound_name(localizer, FALL_BACK)?));

    Ok(assembled)
}

/// DIRECT / REJECT 直接写动作，其余写分类的显示名称
fn action_text(
    category: &str,
    resolver: &dyn ActionResolver,
    localizer: &dyn Localizer,
) -> Result<String> {
    Ok(match resolver.action_of(category) {
        Action::Reject => "REJECT".to_string(),
        Action::Direct => "DIRECT".to_string(),
        Action::Selectable => outbound_name(localizer, category)?,
    })
}

/// `[""]` 表示没有规则，其余空值或非法字符都视为错误
fn rule_set_ids<'a>(name: &str, ids: &'a [String]) -> Result<&'a [String]> {
    if is_empty_sentinel(ids) {
        return Ok(&ids[..0]);
    }
    if let Some(bad) = ids.iter().find(|id| !RULE_SET_ID.is_match(id)) {
        return Err(invalid(name, format!("invalid rule-set identifier '{}'", bad)));
    }
    Ok(ids)
}

fn literals<'a>(name: &str, values: &'a [String]) -> Result<&'a [String]> {
    if is_empty_sentinel(values) {
        return Ok(&values[..0]);
    }
    if let Some(bad) = values.iter().find(|v| v.is_empty() || v.contains(',')) {
        return Err(invalid(name, format!("invalid match value '{}'", bad)));
    }
    Ok(values)
}

fn is_empty_sentinel(values: &[String]) -> bool {
    values.len() == 1 && values[0].is_empty()
}

fn invalid(name: &str, reason: String) -> BuildError {
    BuildError::InvalidRule {
        name: name.to_string(),
        reason,
    }
}
