//! VMess codec
//!
//! VMess descriptors are usually Base64 encoded JSON:
//! `vmess://BASE64({"v":"2","ps":"name","add":"host","port":"443",...})`.
//! The URL form `vmess://uuid@host:port?params#remarks` is accepted on decode.

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use serde_json::json;
use tracing::trace;
use url::Url;

use crate::model::util::{
    default_network, default_vmess_security, option_u32_from_str_or_number,
    port_from_str_or_number,
};
use crate::model::{ConfigType, ProfileItem, ProtocolSettings, StreamSettings, VMessSettings};
use crate::parser::base64::{decode_base64, encode_base64};

use super::{
    ProtocolCodec, param, query_params, remarks_or_endpoint, stream_from_params, url_host_port,
};

// ============================================================================
// VMess Codec
// ============================================================================

/// Codec for VMess (vmess://) descriptors
pub struct VMessCodec;

/// VMess share JSON structure
#[derive(Deserialize, Debug)]
struct VMessJson {
    /// Remark/name
    #[serde(default)]
    ps: String,
    /// Server address
    #[serde(default)]
    add: String,
    /// Server port (can be string or number)
    #[serde(deserialize_with = "port_from_str_or_number")]
    port: u16,
    /// UUID
    #[serde(default)]
    id: String,
    /// Alter ID (can be string or number)
    #[serde(default, deserialize_with = "option_u32_from_str_or_number")]
    aid: Option<u32>,
    /// Cipher
    #[serde(default)]
    scy: Option<String>,
    /// Network type (tcp, ws, grpc, ...)
    #[serde(default)]
    net: Option<String>,
    /// Header type, or gRPC mode when `net` is grpc
    #[serde(default, rename = "type")]
    header_type: Option<String>,
    /// Host header
    #[serde(default)]
    host: Option<String>,
    /// Path, or gRPC service name when `net` is grpc
    #[serde(default)]
    path: Option<String>,
    /// TLS setting
    #[serde(default)]
    tls: Option<String>,
    #[serde(default)]
    sni: Option<String>,
    #[serde(default)]
    alpn: Option<String>,
    /// Fingerprint
    #[serde(default)]
    fp: Option<String>,
}

impl ProtocolCodec for VMessCodec {
    fn config_type(&self) -> ConfigType {
        ConfigType::VMess
    }

    fn scheme(&self) -> &str {
        "vmess"
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        let uri = uri.trim();
        trace!("Decoding VMess descriptor");

        let body = uri
            .strip_prefix("vmess://")
            .ok_or_else(|| anyhow!("Invalid VMess URI: missing vmess:// prefix"))?;

        if body.contains('@') {
            trace!("Decoding VMess URL form");
            return self.decode_url_form(uri);
        }

        let decoded = decode_base64(body)
            .and_then(|b| String::from_utf8(b).context("Invalid UTF-8"))
            .context("Failed to decode VMess URI")?;

        trace!("Decoded VMess JSON: {}", decoded);

        let json: VMessJson =
            serde_json::from_str(&decoded).context("Failed to parse VMess JSON")?;

        if json.add.is_empty() {
            bail!("VMess URI missing host");
        }
        if json.id.is_empty() {
            bail!("VMess URI missing UUID");
        }

        let stream = stream_from_json(&json);
        let remarks = if json.ps.is_empty() {
            remarks_or_endpoint(None, &json.add, json.port)
        } else {
            json.ps
        };

        Ok(ProfileItem::new(
            remarks,
            json.add,
            json.port,
            ProtocolSettings::VMess(VMessSettings {
                uuid: json.id,
                alter_id: json.aid.unwrap_or(0),
                security: json
                    .scy
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(default_vmess_security),
                stream,
            }),
        ))
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::VMess(vmess) = &profile.settings else {
            bail!(
                "VMess codec cannot encode {} profile",
                profile.config_type()
            );
        };
        let stream = &vmess.stream;

        let (header_type, path) = if stream.network == "grpc" {
            (stream.mode.clone(), stream.service_name.clone())
        } else {
            (stream.header_type.clone(), stream.path.clone())
        };

        let share = json!({
            "v": "2",
            "ps": profile.remarks,
            "add": profile.server,
            "port": profile.server_port.to_string(),
            "id": vmess.uuid,
            "aid": vmess.alter_id.to_string(),
            "scy": vmess.security,
            "net": stream.network,
            "type": header_type.unwrap_or_default(),
            "host": stream.host.clone().unwrap_or_default(),
            "path": path.unwrap_or_default(),
            "tls": stream.security.clone().unwrap_or_default(),
            "sni": stream.sni.clone().unwrap_or_default(),
            "alpn": stream.alpn.clone().unwrap_or_default(),
            "fp": stream.fingerprint.clone().unwrap_or_default(),
        });

        let text = serde_json::to_string(&share).context("Failed to serialize VMess JSON")?;
        Ok(encode_base64(&text))
    }
}

impl VMessCodec {
    /// Decodes `vmess://uuid@host:port?params#remarks`
    fn decode_url_form(&self, uri: &str) -> Result<ProfileItem> {
        let url = Url::parse(uri).map_err(|e| anyhow!("Failed to parse VMess URI: {}", e))?;

        let uuid = url.username().to_string();
        if uuid.is_empty() {
            bail!("VMess URI missing UUID");
        }

        let (server, server_port) = url_host_port(&url, "VMess")?;
        let params = query_params(&url);
        let remarks = remarks_or_endpoint(url.fragment(), &server, server_port);

        Ok(ProfileItem::new(
            remarks,
            server,
            server_port,
            ProtocolSettings::VMess(VMessSettings {
                uuid,
                alter_id: 0,
                security: param(&params, "encryption").unwrap_or_else(default_vmess_security),
                stream: stream_from_params(&params, None),
            }),
        ))
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

fn stream_from_json(json: &VMessJson) -> StreamSettings {
    let network = non_empty(&json.net).unwrap_or_else(default_network);
    let security = non_empty(&json.tls).filter(|t| t != "none");

    let (header_type, path, service_name, mode) = if network == "grpc" {
        (None, None, non_empty(&json.path), non_empty(&json.header_type))
    } else {
        (non_empty(&json.header_type), non_empty(&json.path), None, None)
    };

    StreamSettings {
        network,
        header_type,
        host: non_empty(&json.host),
        path,
        service_name,
        mode,
        security,
        sni: non_empty(&json.sni),
        alpn: non_empty(&json.alpn),
        fingerprint: non_empty(&json.fp),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    fn encode_vmess_json(json: &str) -> String {
        format!("vmess://{}", STANDARD.encode(json))
    }

    fn vmess_settings(profile: &ProfileItem) -> &VMessSettings {
        match &profile.settings {
            ProtocolSettings::VMess(v) => v,
            other => panic!("Expected VMess settings, got {other:?}"),
        }
    }

    #[test]
    fn test_vmess_basic() {
        let json =
            r#"{"v":"2","ps":"test-node","add":"example.com","port":443,"id":"uuid-here","aid":0}"#;
        let profile = VMessCodec.decode(&encode_vmess_json(json)).unwrap();

        assert_eq!(profile.remarks, "test-node");
        assert_eq!(profile.server, "example.com");
        assert_eq!(profile.server_port, 443);
        let vmess = vmess_settings(&profile);
        assert_eq!(vmess.uuid, "uuid-here");
        assert_eq!(vmess.alter_id, 0);
        assert_eq!(vmess.security, "auto");
        assert_eq!(vmess.stream.network, "tcp");
    }

    #[test]
    fn test_vmess_with_websocket() {
        let json = r#"{"v":"2","ps":"ws-node","add":"example.com","port":"443","id":"uuid","aid":"0","net":"ws","path":"/ws","host":"ws.example.com","tls":"tls","sni":"example.com"}"#;
        let profile = VMessCodec.decode(&encode_vmess_json(json)).unwrap();
        let stream = &vmess_settings(&profile).stream;

        assert_eq!(stream.network, "ws");
        assert_eq!(stream.path.as_deref(), Some("/ws"));
        assert_eq!(stream.host.as_deref(), Some("ws.example.com"));
        assert_eq!(stream.security.as_deref(), Some("tls"));
        assert_eq!(stream.sni.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_vmess_grpc_uses_path_as_service_name() {
        let json = r#"{"v":"2","ps":"grpc-node","add":"example.com","port":443,"id":"uuid","net":"grpc","path":"myservice","type":"multi","tls":"tls"}"#;
        let profile = VMessCodec.decode(&encode_vmess_json(json)).unwrap();
        let stream = &vmess_settings(&profile).stream;

        assert_eq!(stream.service_name.as_deref(), Some("myservice"));
        assert_eq!(stream.mode.as_deref(), Some("multi"));
        assert!(stream.path.is_none());
        assert!(stream.header_type.is_none());
    }

    #[test]
    fn test_vmess_no_name_uses_endpoint() {
        let json = r#"{"v":"2","ps":"","add":"example.com","port":443,"id":"uuid"}"#;
        let profile = VMessCodec.decode(&encode_vmess_json(json)).unwrap();
        assert_eq!(profile.remarks, "example.com:443");
    }

    #[test]
    fn test_vmess_tls_none_is_plaintext() {
        let json = r#"{"v":"2","ps":"a","add":"example.com","port":80,"id":"uuid","tls":"none"}"#;
        let profile = VMessCodec.decode(&encode_vmess_json(json)).unwrap();
        assert!(vmess_settings(&profile).stream.security.is_none());
    }

    #[test]
    fn test_vmess_url_form() {
        let uri = "vmess://uuid-1@example.com:443?encryption=aes-128-gcm&type=ws&path=%2Fws&security=tls#url%20node";
        let profile = VMessCodec.decode(uri).unwrap();
        assert_eq!(profile.remarks, "url node");
        let vmess = vmess_settings(&profile);
        assert_eq!(vmess.uuid, "uuid-1");
        assert_eq!(vmess.security, "aes-128-gcm");
        assert_eq!(vmess.stream.path.as_deref(), Some("/ws"));
    }

    #[test]
    fn test_vmess_invalid_uri() {
        assert!(VMessCodec.decode("vmess://").is_err());
        assert!(VMessCodec.decode("vmess://not-base64!#$").is_err());
        assert!(VMessCodec.decode("ss://wrong-scheme").is_err());
        let no_host = encode_vmess_json(r#"{"add":"","port":443,"id":"uuid"}"#);
        assert!(VMessCodec.decode(&no_host).is_err());
        let no_id = encode_vmess_json(r#"{"add":"example.com","port":443}"#);
        assert!(VMessCodec.decode(&no_id).is_err());
    }

    #[test]
    fn test_vmess_roundtrip() {
        let profile = ProfileItem::new(
            "香港 01",
            "hk.example.com",
            8443,
            ProtocolSettings::VMess(VMessSettings {
                uuid: "b831381d-6324-4d53-ad4f-8cda48b30811".to_string(),
                alter_id: 2,
                security: "aes-128-gcm".to_string(),
                stream: StreamSettings {
                    network: "ws".to_string(),
                    host: Some("cdn.example.com".to_string()),
                    path: Some("/ray".to_string()),
                    security: Some("tls".to_string()),
                    sni: Some("hk.example.com".to_string()),
                    alpn: Some("h2,http/1.1".to_string()),
                    fingerprint: Some("chrome".to_string()),
                    ..Default::default()
                },
            }),
        );
        let uri = format!("vmess://{}", VMessCodec.encode(&profile).unwrap());
        assert_eq!(VMessCodec.decode(&uri).unwrap(), profile);
    }

    #[test]
    fn test_vmess_grpc_roundtrip() {
        let profile = ProfileItem::new(
            "grpc",
            "example.com",
            443,
            ProtocolSettings::VMess(VMessSettings {
                uuid: "uuid".to_string(),
                alter_id: 0,
                security: "auto".to_string(),
                stream: StreamSettings {
                    network: "grpc".to_string(),
                    service_name: Some("svc".to_string()),
                    mode: Some("gun".to_string()),
                    security: Some("tls".to_string()),
                    ..Default::default()
                },
            }),
        );
        let uri = format!("vmess://{}", VMessCodec.encode(&profile).unwrap());
        assert_eq!(VMessCodec.decode(&uri).unwrap(), profile);
    }

    #[test]
    fn test_vmess_encode_rejects_other_protocol() {
        let profile = ProfileItem::new(
            "s",
            "example.com",
            1080,
            ProtocolSettings::Socks(Default::default()),
        );
        assert!(VMessCodec.encode(&profile).is_err());
    }
}
