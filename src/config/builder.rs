use serde::Deserialize;
use std::collections::HashSet;

use super::groups::assemble_groups;
use super::proxy::map_proxy;
use super::rules::{assemble_rules, ProviderSettings};
use crate::catalog::{ActionResolver, RuleCatalog};
use crate::error::Result;
use crate::i18n::{Localizer, Translations};
use crate::models::{ClashConfig, ProxyDescriptor, RuleSpec};

/// 生成参数
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderOptions {
    pub lang: String,
    pub ruleset_base_url: String,
    pub ruleset_path_prefix: String,
    pub provider_interval: u32,
}

impl Default for BuilderOptions {
    fn default() -> Self {
        let provider = ProviderSettings::default();
        Self {
            lang: "zh-CN".to_string(),
            ruleset_base_url: provider.base_url,
            ruleset_path_prefix: provider.path_prefix,
            provider_interval: provider.interval,
        }
    }
}

impl BuilderOptions {
    fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            base_url: self.ruleset_base_url.clone(),
            path_prefix: self.ruleset_path_prefix.clone(),
            interval: self.provider_interval,
        }
    }
}

/// Clash 配置生成器
///
/// 持有一份只读模板，每次 [`build`](Self::build) 都在模板的独立副本上合并
/// proxies / proxy-groups / rule-providers / rules。
pub struct ClashConfigBuilder<L = Translations, A = RuleCatalog> {
    template: ClashConfig,
    catalog: RuleCatalog,
    provider: ProviderSettings,
    localizer: L,
    resolver: A,
}

impl ClashConfigBuilder {
    /// 使用默认模板、内置翻译表和规则目录
    pub fn new(options: &BuilderOptions) -> Self {
        Self::with_parts(
            ClashConfig::base(),
            options,
            Translations::new(&options.lang),
            RuleCatalog,
        )
    }
}

impl<L: Localizer, A: ActionResolver> ClashConfigBuilder<L, A> {
    pub fn with_parts(
        template: ClashConfig,
        options: &BuilderOptions,
        localizer: L,
        resolver: A,
    ) -> Self {
        Self {
            template,
            catalog: RuleCatalog,
            provider: options.provider_settings(),
            localizer,
            resolver,
        }
    }

    /// 替换基础模板
    pub fn with_template(mut self, template: ClashConfig) -> Self {
        self.template = template;
        self
    }

    pub fn template(&self) -> &ClashConfig {
        &self.template
    }

    /// 生成完整配置
    pub fn build(&self, proxies: &[ProxyDescriptor], spec: &RuleSpec) -> Result<ClashConfig> {
        let mut config = self.template.clone();

        let mut seen_tags = HashSet::new();
        for descriptor in proxies {
            if let Some(tag) = descriptor.tag() {
                if !seen_tags.insert(tag) {
                    log::warn!("Duplicate proxy tag '{}', keeping the first one", tag);
                    continue;
                }
            }
            config.proxies.push(map_proxy(descriptor)?);
        }
        let proxy_names = config.proxy_names();

        let selected = self.catalog.select(&spec.selection)?;
        let outbounds: Vec<&str> = selected.iter().map(|c| c.name).collect();
        let custom_targets: Vec<&str> = spec.custom_rules.iter().map(|r| r.target()).collect();

        assemble_groups(
            &mut config.proxy_groups,
            &proxy_names,
            &outbounds,
            &custom_targets,
            &self.resolver,
            &self.localizer,
        )?;

        let entries = self.catalog.expand(spec)?;
        let assembled = assemble_rules(&entries, &self.resolver, &self.localizer, &self.provider)?;
        config.rule_providers = assembled.providers;
        config.rules = assembled.rules;

        for warning in config.validate() {
            log::warn!("{}", warning);
        }

        log::info!(
            "Built config with {} proxies, {} groups, {} rules, {} rule providers",
            config.proxy_count(),
            config.group_count(),
            config.rule_count(),
            config.rule_providers.len()
        );

        Ok(config)
    }

    /// 生成并序列化为 YAML
    pub fn build_yaml(&self, proxies: &[ProxyDescriptor], spec: &RuleSpec) -> Result<String> {
        self.build(proxies, spec)?.to_yaml()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Action, FALL_BACK, NODE_SELECT};
    use crate::error::BuildError;
    use crate::models::{CustomRule, ProxyEntry, RuleSelection};
    use serde_json::json;

    fn proxies() -> Vec<ProxyDescriptor> {
        [
            json!({
                "tag": "A", "type": "trojan", "server": "1.2.3.4", "server_port": 443,
                "password": "p", "security": "tls",
                "tls": { "enabled": true, "server_name": "a.com", "insecure": false }
            }),
            json!({
                "tag": "B", "type": "shadowsocks", "server": "5.6.7.8", "server_port": 8388,
                "method": "aes-128-gcm", "password": "p"
            }),
            json!({
                "tag": "C", "type": "wireguard", "server": "9.9.9.9", "server_port": 51820
            }),
        ]
        .into_iter()
        .map(|v| ProxyDescriptor::from_value(v).unwrap())
        .collect()
    }

    fn spec() -> RuleSpec {
        RuleSpec {
            selection: RuleSelection::Preset("balanced".to_string()),
            custom_rules: vec![
                CustomRule {
                    name: "Ads".to_string(),
                    ip_cidr: vec!["10.0.0.0/8".to_string()],
                    outbound: Some("REJECT".to_string()),
                    ..Default::default()
                },
                CustomRule {
                    name: "Work".to_string(),
                    site: vec![String::new()],
                    non_ip: vec!["global".to_string()],
                    domain_keyword: vec!["corp".to_string()],
                    ..Default::default()
                },
            ],
        }
    }

    fn builder() -> ClashConfigBuilder {
        ClashConfigBuilder::new(&BuilderOptions {
            lang: "en".to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_options_from_json() {
        let options: BuilderOptions =
            serde_json::from_str(r#"{ "lang": "en", "providerInterval": 600 }"#).unwrap();
        assert_eq!(options.lang, "en");
        assert_eq!(options.provider_interval, 600);
        assert_eq!(options.ruleset_path_prefix, "./ruleset");
        assert_eq!(options.ruleset_base_url, "https://ruleset.skk.moe/Clash");
    }

    #[test]
    fn test_build_full_config() {
        let config = builder().build(&proxies(), &spec()).unwrap();

        assert_eq!(config.proxy_count(), 3);
        assert!(matches!(config.proxies[2], ProxyEntry::Passthrough(_)));

        let first = config.proxy_groups.first().unwrap();
        let last = config.proxy_groups.last().unwrap();
        assert_eq!(first.name, "🚀 Node Select");
        assert_eq!(last.name, "🐟 Fall Back");
        // wireguard 透传对象没有 name 字段，不进入候选列表
        assert_eq!(first.proxies, vec!["DIRECT", "⚡ Auto Select", "A", "B"]);

        assert!(config.has_group("Work"));
        assert!(!config.has_group("Ads"));
        assert!(!config.has_group("🛑 Ad Block"));
        assert!(!config.has_group("🏠 Private"));

        assert!(config.rules.contains(&"IP-CIDR,10.0.0.0/8,REJECT".to_string()));
        assert!(config.rules.contains(&"RULE-SET,global_non_ip,Work".to_string()));
        assert!(config.rules.contains(&"RULE-SET,global_non_ip,🌐 Global".to_string()));
        assert_eq!(config.rules.last().unwrap(), "MATCH,🐟 Fall Back");
        assert_eq!(
            config.rules.iter().filter(|r| r.starts_with("MATCH,")).count(),
            1
        );

        // 自定义规则排在预置分类之后
        let ads = config.rules.iter().position(|r| r == "IP-CIDR,10.0.0.0/8,REJECT").unwrap();
        let china = config
            .rules
            .iter()
            .position(|r| r == "RULE-SET,china_ip_ip,DIRECT")
            .unwrap();
        assert!(china < ads);

        assert!(config.rule_providers.contains_key("global_non_ip"));
        // 只有未命名的透传节点会被报告
        assert_eq!(config.validate(), vec!["Proxy without a name".to_string()]);
    }

    #[test]
    fn test_builder_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ClashConfigBuilder>();
    }

    #[test]
    fn test_build_is_idempotent() {
        let builder = builder();
        let first = builder.build_yaml(&proxies(), &spec()).unwrap();
        let second = builder.build_yaml(&proxies(), &spec()).unwrap();
        assert_eq!(first, second);
        assert!(builder.template().proxies.is_empty());
        assert!(builder.template().rules.is_empty());
    }

    #[test]
    fn test_duplicate_tags_keep_first() {
        let mut input = proxies();
        input.push(
            ProxyDescriptor::from_value(json!({
                "tag": "A", "type": "shadowsocks", "server": "other", "server_port": 1,
                "method": "none", "password": ""
            }))
            .unwrap(),
        );

        let config = builder().build(&input, &RuleSpec::default()).unwrap();
        assert_eq!(config.proxy_count(), 3);
        match &config.proxies[0] {
            ProxyEntry::Mapped(p) => assert_eq!(p.server, "1.2.3.4"),
            other => panic!("unexpected entry: {:?}", other),
        }
    }

    #[test]
    fn test_template_settings_are_preserved() {
        let template = ClashConfig::from_template(
            r#"
mixed-port: 7897
mode: rule
proxies: []
proxy-groups: []
rule-providers:
  stale:
    type: http
    behavior: domain
rules:
  - MATCH,DIRECT
"#,
        )
        .unwrap();

        let config = builder()
            .with_template(template.clone())
            .build(&proxies(), &RuleSpec::default())
            .unwrap();

        assert_eq!(config.settings, template.settings);
        assert!(!config.rule_providers.contains_key("stale"));
        assert_ne!(config.rules, template.rules);
    }

    #[test]
    fn test_template_reserved_groups_are_not_duplicated() {
        let template = ClashConfig::from_template(
            r#"
mode: rule
proxy-groups:
  - name: 🐟 Fall Back
    type: select
    proxies: [DIRECT]
  - name: 🚀 Node Select
    type: select
    proxies: [DIRECT]
"#,
        )
        .unwrap();
        let spec = RuleSpec {
            selection: RuleSelection::Categories(vec!["Global".to_string()]),
            custom_rules: Vec::new(),
        };

        let config = builder()
            .with_template(template)
            .build(&proxies(), &spec)
            .unwrap();

        let names: Vec<&str> = config.proxy_groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["🚀 Node Select", "⚡ Auto Select", "🌐 Global", "🐟 Fall Back"]
        );
        assert!(config
            .validate()
            .iter()
            .all(|w| !w.starts_with("Duplicate group name")));
    }

    #[test]
    fn test_missing_tls_aborts_build() {
        let input = vec![ProxyDescriptor::from_value(json!({
            "tag": "T", "type": "tuic", "server": "t.com", "server_port": 443, "uuid": "u"
        }))
        .unwrap()];

        let err = builder().build(&input, &RuleSpec::default()).unwrap_err();
        assert!(matches!(err, BuildError::MissingTls { .. }));
        assert!(err.to_string().contains("missing TLS configuration"));
    }

    struct EverythingSelectable;

    impl ActionResolver for EverythingSelectable {
        fn action_of(&self, _category: &str) -> Action {
            Action::Selectable
        }
    }

    struct Keys;

    impl Localizer for Keys {
        fn resolve(&self, key: &str) -> Result<String> {
            Ok(format!("<{}>", key))
        }
    }

    #[test]
    fn test_injected_collaborators() {
        let builder = ClashConfigBuilder::with_parts(
            ClashConfig::base(),
            &BuilderOptions::default(),
            Keys,
            EverythingSelectable,
        );
        let spec = RuleSpec {
            selection: RuleSelection::Categories(vec!["Private".to_string()]),
            custom_rules: Vec::new(),
        };

        let config = builder.build(&proxies(), &spec).unwrap();
        assert_eq!(config.proxy_groups[0].name, format!("<outboundNames.{}>", NODE_SELECT));
        assert!(config.has_group("<outboundNames.Private>"));
        assert_eq!(
            config.rules,
            vec![
                "RULE-SET,lan_non_ip,<outboundNames.Private>".to_string(),
                "RULE-SET,lan_ip,<outboundNames.Private>".to_string(),
                format!("MATCH,<outboundNames.{}>", FALL_BACK),
            ]
        );
    }
}
