use serde::{Deserialize, Deserializer, Serialize};

/// 用户自定义规则
///
/// 列表字段既可以写成数组，也可以写成逗号分隔的字符串（前端表单就是这么提交的）。
/// 空字符串会被拆成 `[""]`，由规则组装阶段当作"没有规则"跳过。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomRule {
    pub name: String,

    #[serde(default, alias = "site_rules", deserialize_with = "string_or_list")]
    pub site: Vec<String>,

    #[serde(default, alias = "non_ip_rules", deserialize_with = "string_or_list")]
    pub non_ip: Vec<String>,

    #[serde(default, alias = "ip_rules", deserialize_with = "string_or_list")]
    pub ip: Vec<String>,

    #[serde(default, deserialize_with = "string_or_list")]
    pub domain_suffix: Vec<String>,

    #[serde(default, deserialize_with = "string_or_list")]
    pub domain_keyword: Vec<String>,

    #[serde(default, deserialize_with = "string_or_list")]
    pub ip_cidr: Vec<String>,

    /// 目标出站分类，缺省时为规则自身名称（会生成同名代理组）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound: Option<String>,
}

impl CustomRule {
    pub fn target(&self) -> &str {
        self.outbound.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrList {
    One(String),
    Many(Vec<String>),
}

fn string_or_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrList>::deserialize(deserializer)? {
        Some(StringOrList::One(s)) => s.split(',').map(|item| item.trim().to_string()).collect(),
        Some(StringOrList::Many(items)) => items
            .into_iter()
            .map(|item| item.trim().to_string())
            .collect(),
        None => Vec::new(),
    })
}

/// 预置规则的选择：预设名称或分类列表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSelection {
    Preset(String),
    Categories(Vec<String>),
}

impl Default for RuleSelection {
    fn default() -> Self {
        Self::Categories(Vec::new())
    }
}

/// 完整的规则定义：预置分类 + 自定义规则
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub selection: RuleSelection,

    #[serde(default)]
    pub custom_rules: Vec<CustomRule>,
}

/// 展开后的单条逻辑规则，对应一个出站分类
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleEntry {
    /// 用于错误信息的名称
    pub name: String,
    /// 出站分类
    pub outbound: String,
    pub site_rules: Vec<String>,
    pub non_ip_rules: Vec<String>,
    pub ip_rules: Vec<String>,
    pub domain_suffix: Vec<String>,
    pub domain_keyword: Vec<String>,
    pub ip_cidr: Vec<String>,
}

impl From<&CustomRule> for RuleEntry {
    fn from(rule: &CustomRule) -> Self {
        Self {
            name: rule.name.clone(),
            outbound: rule.target().to_string(),
            site_rules: rule.site.clone(),
            non_ip_rules: rule.non_ip.clone(),
            ip_rules: rule.ip.clone(),
            domain_suffix: rule.domain_suffix.clone(),
            domain_keyword: rule.domain_keyword.clone(),
            ip_cidr: rule.ip_cidr.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_rule_accepts_comma_string() {
        let rule: CustomRule = serde_json::from_str(
            r#"{ "name": "Work", "site": "github, gitlab", "ip": "", "domain_suffix": ["corp.example"] }"#,
        )
        .unwrap();

        assert_eq!(rule.site, vec!["github", "gitlab"]);
        assert_eq!(rule.ip, vec![""]);
        assert_eq!(rule.domain_suffix, vec!["corp.example"]);
        assert!(rule.non_ip.is_empty());
        assert_eq!(rule.target(), "Work");
    }

    #[test]
    fn test_custom_rule_explicit_outbound() {
        let rule: CustomRule = serde_json::from_str(
            r#"{ "name": "Ads", "ip_cidr": ["10.0.0.0/8"], "outbound": "REJECT" }"#,
        )
        .unwrap();

        assert_eq!(rule.target(), "REJECT");
        let entry = RuleEntry::from(&rule);
        assert_eq!(entry.name, "Ads");
        assert_eq!(entry.outbound, "REJECT");
        assert_eq!(entry.ip_cidr, vec!["10.0.0.0/8"]);
    }

    #[test]
    fn test_rule_selection_forms() {
        let preset: RuleSelection = serde_json::from_str(r#""balanced""#).unwrap();
        assert_eq!(preset, RuleSelection::Preset("balanced".to_string()));

        let list: RuleSelection = serde_json::from_str(r#"["Private", "Telegram"]"#).unwrap();
        assert_eq!(
            list,
            RuleSelection::Categories(vec!["Private".to_string(), "Telegram".to_string()])
        );
    }
}
