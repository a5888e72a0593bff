use crate::catalog::{Action, ActionResolver, AUTO_SELECT, FALL_BACK, NODE_SELECT};
use crate::error::Result;
use crate::i18n::{outbound_name, Localizer};
use crate::models::ProxyGroupConfig;

pub const HEALTH_CHECK_URL: &str = "http://www.v2ex.com/generate_204";
pub const HEALTH_CHECK_INTERVAL: u32 = 600;

/// 组装代理组
///
/// 最终顺序：节点选择、模板中已有的组、自动选择、各出站分类、自定义规则、漏网之鱼。
/// 解析为 DIRECT / REJECT 的分类不生成代理组。模板中与节点选择、自动选择、
/// 漏网之鱼同名的组会被生成的组取代。
pub fn assemble_groups(
    groups: &mut Vec<ProxyGroupConfig>,
    proxy_names: &[String],
    outbounds: &[&str],
    custom_targets: &[&str],
    resolver: &dyn ActionResolver,
    localizer: &dyn Localizer,
) -> Result<()> {
    let node_select = outbound_name(localizer, NODE_SELECT)?;
    let auto_select = outbound_name(localizer, AUTO_SELECT)?;
    let fall_back = outbound_name(localizer, FALL_BACK)?;

    groups.retain(|g| {
        let reserved = g.name == node_select || g.name == auto_select || g.name == fall_back;
        if reserved {
            log::warn!("Replacing template group '{}' with the generated one", g.name);
        }
        !reserved
    });

    groups.push(ProxyGroupConfig {
        name: auto_select.clone(),
        group_type: "url-test".to_string(),
        proxies: proxy_names.to_vec(),
        url: Some(HEALTH_CHECK_URL.to_string()),
        interval: Some(HEALTH_CHECK_INTERVAL),
    });

    let mut node_candidates = Vec::with_capacity(proxy_names.len() + 2);
    node_candidates.push("DIRECT".to_string());
    node_candidates.push(auto_select);
    node_candidates.extend_from_slice(proxy_names);
    groups.insert(0, ProxyGroupConfig::select(node_select.clone(), node_candidates));

    let selector_candidates = || {
        let mut candidates = Vec::with_capacity(proxy_names.len() + 1);
        candidates.push(node_select.clone());
        candidates.extend_from_slice(proxy_names);
        candidates
    };

    for category in outbounds.iter().chain(custom_targets) {
        if matches!(*category, NODE_SELECT | FALL_BACK) {
            continue;
        }
        if resolver.action_of(category) != Action::Selectable {
            continue;
        }
        let name = outbound_name(localizer, category)?;
        if groups.iter().any(|g| g.name == name) {
            continue;
        }
        groups.push(ProxyGroupConfig::select(name, selector_candidates()));
    }

    groups.push(ProxyGroupConfig::select(fall_back, selector_candidates()));

    Ok(())
}
