use crate::error::{BuildError, Result};
use crate::models::{
    GrpcOpts, Outbound, OutboundTls, ProxyConfig, ProxyDescriptor, ProxyEntry, RealityOpts,
    Transport, WsOpts,
};

/// 将单个 sing-box 出站转换为 Clash 节点
///
/// 未知协议原样返回；hysteria2 / tuic 缺少 TLS 配置时报错。
pub fn map_proxy(descriptor: &ProxyDescriptor) -> Result<ProxyEntry> {
    let outbound = match descriptor {
        ProxyDescriptor::Known(outbound) => outbound,
        ProxyDescriptor::Other(raw) => {
            log::debug!(
                "No mapping for proxy type '{}', passing through",
                descriptor.kind()
            );
            return Ok(ProxyEntry::Passthrough(raw.clone()));
        }
    };

    let proxy = match outbound {
        Outbound::Shadowsocks(o) => ProxyConfig {
            cipher: Some(o.method.clone()),
            password: Some(o.password.clone()),
            ..base(&o.tag, "ss", &o.server, o.server_port)
        },
        Outbound::Vmess(o) => {
            let tls = o.tls.as_ref();
            ProxyConfig {
                uuid: Some(o.uuid.clone()),
                alter_id: o.alter_id,
                cipher: o.security.clone(),
                tls: tls.map(|t| t.enabled),
                servername: tls.and_then(|t| t.server_name.clone()),
                network: network(o.transport.as_ref()),
                ws_opts: ws_opts(o.transport.as_ref()),
                ..base(&o.tag, "vmess", &o.server, o.server_port)
            }
        }
        Outbound::Vless(o) => {
            let tls = o.tls.as_ref();
            ProxyConfig {
                uuid: Some(o.uuid.clone()),
                cipher: o.security.clone(),
                tls: tls.map(|t| t.enabled),
                client_fingerprint: fingerprint(tls),
                servername: tls.and_then(|t| t.server_name.clone()),
                network: network(o.transport.as_ref()),
                ws_opts: ws_opts(o.transport.as_ref()),
                reality_opts: reality_opts(tls),
                grpc_opts: grpc_opts(o.transport.as_ref()),
                tfo: o.tcp_fast_open,
                skip_cert_verify: tls.and_then(|t| t.insecure),
                flow: o.flow.clone(),
                ..base(&o.tag, "vless", &o.server, o.server_port)
            }
        }
        Outbound::Hysteria2(o) => {
            let tls = require_tls(o.tls.as_ref(), &o.tag, "hysteria2")?;
            // obfs 与 obfs-password 同时出现或同时省略
            let obfs = o.obfs.as_ref().filter(|b| b.kind.is_some());
            ProxyConfig {
                password: o.password.clone(),
                auth: o.password.clone(),
                obfs: obfs.and_then(|b| b.kind.clone()),
                obfs_password: obfs.and_then(|b| b.password.clone()),
                skip_cert_verify: tls.insecure,
                ..base(&o.tag, "hysteria2", &o.server, o.server_port)
            }
        }
        Outbound::Trojan(o) => {
            let tls = o.tls.as_ref();
            ProxyConfig {
                password: Some(o.password.clone()),
                cipher: o.security.clone(),
                tls: tls.map(|t| t.enabled),
                client_fingerprint: fingerprint(tls),
                sni: tls.and_then(|t| t.server_name.clone()),
                network: network(o.transport.as_ref()),
                ws_opts: ws_opts(o.transport.as_ref()),
                reality_opts: reality_opts(tls),
                grpc_opts: grpc_opts(o.transport.as_ref()),
                tfo: o.tcp_fast_open,
                skip_cert_verify: tls.and_then(|t| t.insecure),
                flow: o.flow.clone(),
                ..base(&o.tag, "trojan", &o.server, o.server_port)
            }
        }
        Outbound::Tuic(o) => {
            let tls = require_tls(o.tls.as_ref(), &o.tag, "tuic")?;
            ProxyConfig {
                uuid: Some(o.uuid.clone()),
                password: o.password.clone(),
                congestion_controller: o.congestion_control.clone(),
                skip_cert_verify: tls.insecure,
                // MiHomo 的 tuic 需要显式关闭 SNI 选择，并固定 native 中继模式
                disable_sni: Some(true),
                alpn: tls.alpn.clone(),
                sni: tls.server_name.clone(),
                udp_relay_mode: Some("native".to_string()),
                ..base(&o.tag, "tuic", &o.server, o.server_port)
            }
        }
    };

    log::debug!("Mapped {} proxy '{}'", outbound.kind(), proxy.name);
    Ok(ProxyEntry::Mapped(proxy))
}

fn base(tag: &str, proxy_type: &str, server: &str, port: u16) -> ProxyConfig {
    ProxyConfig {
        name: tag.to_string(),
        proxy_type: proxy_type.to_string(),
        server: server.to_string(),
        port,
        ..Default::default()
    }
}

fn require_tls<'a>(
    tls: Option<&'a OutboundTls>,
    tag: &str,
    kind: &'static str,
) -> Result<&'a OutboundTls> {
    tls.ok_or_else(|| BuildError::MissingTls {
        tag: tag.to_string(),
        kind,
    })
}

fn network(transport: Option<&Transport>) -> Option<String> {
    transport.map(|t| t.kind.clone())
}

fn ws_opts(transport: Option<&Transport>) -> Option<WsOpts> {
    transport.filter(|t| t.kind == "ws").map(|t| WsOpts {
        path: t.path.clone(),
        headers: t.headers.clone(),
    })
}

fn grpc_opts(transport: Option<&Transport>) -> Option<GrpcOpts> {
    transport.filter(|t| t.kind == "grpc").map(|t| GrpcOpts {
        grpc_service_name: t.service_name.clone(),
    })
}

fn reality_opts(tls: Option<&OutboundTls>) -> Option<RealityOpts> {
    tls.and_then(|t| t.reality.as_ref())
        .filter(|r| r.enabled)
        .map(|r| RealityOpts {
            public_key: r.public_key.clone(),
            short_id: r.short_id.clone(),
        })
}

fn fingerprint(tls: Option<&OutboundTls>) -> Option<String> {
    tls.and_then(|t| t.utls.as_ref())
        .and_then(|u| u.fingerprint.clone())
}
