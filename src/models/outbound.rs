use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use crate::error::{BuildError, Result};

/// 转换器能识别的出站协议
pub const KNOWN_KINDS: &[&str] = &["shadowsocks", "vmess", "vless", "hysteria2", "trojan", "tuic"];

/// sing-box 中不是代理节点的出站类型，解析订阅时直接跳过
const NON_PROXY_KINDS: &[&str] = &["direct", "block", "dns", "selector", "urltest"];

/// 已知协议的出站描述
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Outbound {
    Shadowsocks(ShadowsocksOutbound),
    Vmess(VmessOutbound),
    Vless(VlessOutbound),
    Hysteria2(Hysteria2Outbound),
    Trojan(TrojanOutbound),
    Tuic(TuicOutbound),
}

impl Outbound {
    pub fn tag(&self) -> &str {
        match self {
            Self::Shadowsocks(o) => &o.tag,
            Self::Vmess(o) => &o.tag,
            Self::Vless(o) => &o.tag,
            Self::Hysteria2(o) => &o.tag,
            Self::Trojan(o) => &o.tag,
            Self::Tuic(o) => &o.tag,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Shadowsocks(_) => "shadowsocks",
            Self::Vmess(_) => "vmess",
            Self::Vless(_) => "vless",
            Self::Hysteria2(_) => "hysteria2",
            Self::Trojan(_) => "trojan",
            Self::Tuic(_) => "tuic",
        }
    }
}

/// 单个出站描述：已知协议或原样透传的未知协议
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyDescriptor {
    Known(Outbound),
    Other(serde_json::Value),
}

impl ProxyDescriptor {
    /// 从 JSON 值构造。已知协议解析失败时报错，不会退化为透传
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let kind = value.get("type").and_then(|v| v.as_str()).unwrap_or_default();
        if !KNOWN_KINDS.contains(&kind) {
            return Ok(Self::Other(value));
        }

        let kind = kind.to_string();
        let tag = value
            .get("tag")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();
        serde_json::from_value::<Outbound>(value)
            .map(Self::Known)
            .map_err(|e| BuildError::InvalidDescriptor(format!("{} '{}': {}", kind, tag, e)))
    }

    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Known(o) => Some(o.tag()),
            Self::Other(v) => v.get("tag").and_then(|t| t.as_str()),
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            Self::Known(o) => o.kind(),
            Self::Other(v) => v.get("type").and_then(|t| t.as_str()).unwrap_or("unknown"),
        }
    }
}

impl<'de> Deserialize<'de> for ProxyDescriptor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = serde_json::Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(D::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ShadowsocksOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub method: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VmessOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub uuid: String,
    #[serde(default)]
    pub alter_id: Option<u32>,
    #[serde(default)]
    pub security: Option<String>,
    #[serde(default)]
    pub tls: Option<OutboundTls>,
    #[serde(default)]
    pub transport: Option<Transport>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VlessOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub uuid: String,
    #[serde(default)]
    pub security: Option<String>,
    #[serde(default)]
    pub flow: Option<String>,
    #[serde(default)]
    pub tcp_fast_open: Option<bool>,
    #[serde(default)]
    pub tls: Option<OutboundTls>,
    #[serde(default)]
    pub transport: Option<Transport>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Hysteria2Outbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub obfs: Option<Obfs>,
    #[serde(default)]
    pub tls: Option<OutboundTls>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrojanOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub password: String,
    #[serde(default)]
    pub security: Option<String>,
    #[serde(default)]
    pub flow: Option<String>,
    #[serde(default)]
    pub tcp_fast_open: Option<bool>,
    #[serde(default)]
    pub tls: Option<OutboundTls>,
    #[serde(default)]
    pub transport: Option<Transport>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TuicOutbound {
    pub tag: String,
    pub server: String,
    pub server_port: u16,
    pub uuid: String,
    #[serde(default)]
    pub password: Option<String>,
    /// 旧版订阅里叫 congestion
    #[serde(default, alias = "congestion")]
    pub congestion_control: Option<String>,
    #[serde(default)]
    pub tls: Option<OutboundTls>,
}

/// 出站 TLS 配置
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OutboundTls {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub server_name: Option<String>,
    #[serde(default)]
    pub insecure: Option<bool>,
    #[serde(default)]
    pub alpn: Option<Vec<String>>,
    #[serde(default)]
    pub utls: Option<Utls>,
    #[serde(default)]
    pub reality: Option<Reality>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Utls {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub fingerprint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Reality {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub public_key: Option<String>,
    #[serde(default)]
    pub short_id: Option<String>,
}

/// V2Ray 传输层配置（ws / grpc / http ...）
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Transport {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub path: Option<String>,
    /// 值可能是字符串或字符串数组，原样保留
    #[serde(default)]
    pub headers: Option<BTreeMap<String, serde_json::Value>>,
    #[serde(default)]
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Obfs {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// 从 sing-box 配置（带 outbounds 字段）或出站数组中提取代理节点
pub fn parse_outbounds(content: &str) -> Result<Vec<ProxyDescriptor>> {
    let raw: serde_json::Value = serde_json::from_str(content)?;

    let items = match raw {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("outbounds") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(BuildError::InvalidDescriptor(
                    "expected an 'outbounds' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(BuildError::InvalidDescriptor(
                "expected a JSON object or array of outbounds".to_string(),
            ))
        }
    };

    let mut descriptors = Vec::with_capacity(items.len());
    for item in items {
        let kind = item.get("type").and_then(|v| v.as_str()).unwrap_or_default();
        if NON_PROXY_KINDS.contains(&kind) {
            log::debug!("Skipping non-proxy outbound of type '{}'", kind);
            continue;
        }
        descriptors.push(ProxyDescriptor::from_value(item)?);
    }

    Ok(descriptors)
}
