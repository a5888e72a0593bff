use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::{BTreeMap, HashSet};

use crate::error::Result;

/// Clash / MiHomo 配置文件结构
///
/// 全局设置（端口、DNS 等）作为不透明的有序映射保留，生成过程只会改动
/// proxies / proxy-groups / rule-providers / rules 四个扩展点。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClashConfig {
    #[serde(flatten)]
    pub settings: Mapping,

    #[serde(default, deserialize_with = "null_as_default")]
    pub proxies: Vec<ProxyEntry>,

    #[serde(rename = "proxy-groups", default, deserialize_with = "null_as_default")]
    pub proxy_groups: Vec<ProxyGroupConfig>,

    #[serde(rename = "rule-providers", default, deserialize_with = "null_as_default")]
    pub rule_providers: BTreeMap<String, RuleProvider>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<String>,
}

/// 模板中写成 `proxies:` 或 `proxies: ~` 时按空值处理
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn seq(items: &[&str]) -> Value {
    Value::Sequence(items.iter().map(|s| Value::from(*s)).collect())
}

fn default_dns() -> Mapping {
    let nameservers = ["https://120.53.53.53/dns-query", "https://223.5.5.5/dns-query"];

    let mut dns = Mapping::new();
    dns.insert("enable".into(), true.into());
    dns.insert("ipv6".into(), true.into());
    dns.insert("respect-rules".into(), true.into());
    dns.insert("enhanced-mode".into(), "fake-ip".into());
    dns.insert("nameserver".into(), seq(&nameservers));
    dns.insert("proxy-server-nameserver".into(), seq(&nameservers));
    dns
}

fn default_settings() -> Mapping {
    let mut settings = Mapping::new();
    settings.insert("port".into(), Value::from(7890_u16));
    settings.insert("socks-port".into(), Value::from(7891_u16));
    settings.insert("allow-lan".into(), false.into());
    settings.insert("mode".into(), "rule".into());
    settings.insert("log-level".into(), "info".into());
    settings.insert("dns".into(), Value::Mapping(default_dns()));
    settings
}

impl ClashConfig {
    /// 默认基础模板。每次调用都返回一份独立的新文档
    pub fn base() -> Self {
        Self {
            settings: default_settings(),
            proxies: Vec::new(),
            proxy_groups: Vec::new(),
            rule_providers: BTreeMap::new(),
            rules: Vec::new(),
        }
    }

    /// 从用户提供的 YAML 模板解析
    pub fn from_template(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn proxy_count(&self) -> usize {
        self.proxies.len()
    }

    pub fn group_count(&self) -> usize {
        self.proxy_groups.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.proxy_groups.iter().any(|g| g.name == name)
    }

    /// 所有可命名的代理节点名称（按出现顺序，去重）
    pub fn proxy_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.proxies
            .iter()
            .filter_map(|p| p.name())
            .filter(|name| seen.insert(*name))
            .map(|name| name.to_string())
            .collect()
    }

    /// 检查生成结果的一致性，返回警告列表
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        let mut proxy_names = HashSet::new();
        for proxy in &self.proxies {
            match proxy.name() {
                Some(name) => {
                    if !proxy_names.insert(name) {
                        warnings.push(format!("Duplicate proxy name: {}", name));
                    }
                }
                None => warnings.push("Proxy without a name".to_string()),
            }
        }

        let mut group_names = HashSet::new();
        for group in &self.proxy_groups {
            if !group_names.insert(group.name.as_str()) {
                warnings.push(format!("Duplicate group name: {}", group.name));
            }
        }

        let mut valid_targets: HashSet<&str> = HashSet::new();
        valid_targets.insert("DIRECT");
        valid_targets.insert("REJECT");
        valid_targets.extend(proxy_names.iter().copied());
        valid_targets.extend(self.proxy_groups.iter().map(|g| g.name.as_str()));

        for group in &self.proxy_groups {
            for proxy_name in &group.proxies {
                if !valid_targets.contains(proxy_name.as_str()) {
                    warnings.push(format!(
                        "Group '{}' references unknown proxy: {}",
                        group.name, proxy_name
                    ));
                }
            }
        }

        for rule in &self.rules {
            if let Some(rest) = rule.strip_prefix("RULE-SET,") {
                let provider_name = rest.split(',').next().unwrap_or_default();
                if !self.rule_providers.contains_key(provider_name) {
                    warnings.push(format!("Rule references unknown provider: {}", provider_name));
                }
            }
        }

        warnings
    }
}

/// proxies 中的一项：转换后的节点，或原样透传的对象
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProxyEntry {
    Mapped(ProxyConfig),
    Passthrough(serde_json::Value),
}

impl ProxyEntry {
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Mapped(p) => Some(&p.name),
            Self::Passthrough(v) => v.get("name").and_then(|n| n.as_str()),
        }
    }
}

/// 代理节点配置
///
/// 所有可选字段缺省时不输出。未知字段的模板节点会落到 [`ProxyEntry::Passthrough`]，
/// 避免解析模板时丢字段。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProxyConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub proxy_type: String,
    pub server: String,
    pub port: u16,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(rename = "alterId", skip_serializing_if = "Option::is_none")]
    pub alter_id: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub obfs: Option<String>,

    #[serde(rename = "obfs-password", skip_serializing_if = "Option::is_none")]
    pub obfs_password: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls: Option<bool>,

    #[serde(rename = "client-fingerprint", skip_serializing_if = "Option::is_none")]
    pub client_fingerprint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub servername: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub sni: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,

    #[serde(rename = "ws-opts", skip_serializing_if = "Option::is_none")]
    pub ws_opts: Option<WsOpts>,

    #[serde(rename = "reality-opts", skip_serializing_if = "Option::is_none")]
    pub reality_opts: Option<RealityOpts>,

    #[serde(rename = "grpc-opts", skip_serializing_if = "Option::is_none")]
    pub grpc_opts: Option<GrpcOpts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tfo: Option<bool>,

    #[serde(rename = "skip-cert-verify", skip_serializing_if = "Option::is_none")]
    pub skip_cert_verify: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub flow: Option<String>,

    #[serde(rename = "congestion-controller", skip_serializing_if = "Option::is_none")]
    pub congestion_controller: Option<String>,

    #[serde(rename = "disable-sni", skip_serializing_if = "Option::is_none")]
    pub disable_sni: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpn: Option<Vec<String>>,

    #[serde(rename = "udp-relay-mode", skip_serializing_if = "Option::is_none")]
    pub udp_relay_mode: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsOpts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealityOpts {
    #[serde(rename = "public-key", skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    #[serde(rename = "short-id", skip_serializing_if = "Option::is_none")]
    pub short_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrpcOpts {
    #[serde(rename = "grpc-service-name", skip_serializing_if = "Option::is_none")]
    pub grpc_service_name: Option<String>,
}

/// 代理组配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyGroupConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub group_type: String,
    pub proxies: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

impl ProxyGroupConfig {
    /// 手动选择组
    pub fn select(name: String, proxies: Vec<String>) -> Self {
        Self {
            name,
            group_type: "select".to_string(),
            proxies,
            url: None,
            interval: None,
        }
    }
}

/// 规则提供者配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleProvider {
    #[serde(rename = "type")]
    pub provider_type: String,

    /// behavior 是必需字段，默认为 "classical"
    #[serde(default = "default_behavior")]
    pub behavior: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval: Option<u32>,
}

fn default_behavior() -> String {
    "classical".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str) -> ProxyEntry {
        ProxyEntry::Mapped(ProxyConfig {
            name: name.to_string(),
            proxy_type: "ss".to_string(),
            server: "example.com".to_string(),
            port: 8388,
            ..Default::default()
        })
    }

    #[test]
    fn test_base_returns_independent_copies() {
        let mut first = ClashConfig::base();
        first.rules.push("MATCH,DIRECT".to_string());
        first.settings.insert("mode".into(), "global".into());

        let second = ClashConfig::base();
        assert!(second.rules.is_empty());
        assert_eq!(second.settings.get("mode"), Some(&Value::from("rule")));
    }

    #[test]
    fn test_parse_template_keeps_unknown_settings() {
        let yaml = r#"
mixed-port: 7893
external-controller: 127.0.0.1:9090
tun:
  enable: true
  stack: mixed
proxies: ~
proxy-groups: []
rules:
  - MATCH,DIRECT
"#;

        let config = ClashConfig::from_template(yaml).unwrap();
        assert!(config.proxies.is_empty());
        assert!(config.proxy_groups.is_empty());
        assert_eq!(config.rules, vec!["MATCH,DIRECT".to_string()]);
        assert_eq!(config.settings.get("mixed-port"), Some(&Value::from(7893_u16)));
        assert!(config.settings.get("tun").is_some_and(|v| v.is_mapping()));
        assert!(config.settings.get("proxies").is_none());

        let output = config.to_yaml().unwrap();
        assert!(output.contains("mixed-port: 7893"));
    }

    #[test]
    fn test_template_proxy_with_extra_fields_is_passthrough() {
        let yaml = r#"
proxies:
  - name: plain-ss
    type: ss
    server: example.com
    port: 8388
    cipher: aes-128-gcm
    password: secret
  - name: plugin-ss
    type: ss
    server: example.com
    port: 8388
    plugin: obfs
"#;

        let config = ClashConfig::from_template(yaml).unwrap();
        assert!(matches!(config.proxies[0], ProxyEntry::Mapped(_)));
        assert!(matches!(config.proxies[1], ProxyEntry::Passthrough(_)));
        assert_eq!(config.proxy_names(), vec!["plain-ss", "plugin-ss"]);
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let output = serde_yaml::to_string(&node("a")).unwrap();
        assert_eq!(output, "name: a\ntype: ss\nserver: example.com\nport: 8388\n");
    }

    #[test]
    fn test_validate_config() {
        let mut config = ClashConfig::base();
        config.proxies = vec![node("test"), node("test")];
        config.proxy_groups = vec![
            ProxyGroupConfig::select(
                "PROXY".to_string(),
                vec!["test".to_string(), "unknown".to_string(), "DIRECT".to_string()],
            ),
            ProxyGroupConfig::select("PROXY".to_string(), vec!["test".to_string()]),
        ];
        config.rules = vec![
            "RULE-SET,missing_ip,DIRECT".to_string(),
            "MATCH,PROXY".to_string(),
        ];

        let warnings = config.validate();
        assert_eq!(warnings.len(), 4);
        assert!(warnings[0].contains("Duplicate proxy name"));
        assert!(warnings[1].contains("Duplicate group name"));
        assert!(warnings[2].contains("unknown"));
        assert!(warnings[3].contains("missing_ip"));
    }
}
