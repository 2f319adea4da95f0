//! VLESS codec
//!
//! Format: vless://uuid@host:port?params#remarks

use anyhow::{Result, anyhow, bail};
use tracing::trace;
use url::Url;
use url::form_urlencoded::Serializer;

use crate::model::util::default_vless_encryption;
use crate::model::{ConfigType, ProfileItem, ProtocolSettings, VLessSettings};

use super::{
    ProtocolCodec, append_stream_params, build_link, param, percent_decode, query_params,
    remarks_or_endpoint, stream_from_params, url_host_port,
};

// ============================================================================
// VLESS Codec
// ============================================================================

/// Codec for VLESS (vless://) descriptors, including REALITY parameters
pub struct VLessCodec;

impl ProtocolCodec for VLessCodec {
    fn config_type(&self) -> ConfigType {
        ConfigType::VLess
    }

    fn scheme(&self) -> &str {
        "vless"
    }

    fn decode(&self, uri: &str) -> Result<ProfileItem> {
        trace!("Decoding VLESS descriptor");
        let url = Url::parse(uri).map_err(|e| anyhow!("Failed to parse VLESS URI: {}", e))?;

        let uuid = percent_decode(url.username());
        if uuid.is_empty() {
            bail!("VLESS URI missing UUID");
        }

        let (server, server_port) = url_host_port(&url, "VLESS")?;
        let params = query_params(&url);

        Ok(ProfileItem::new(
            remarks_or_endpoint(url.fragment(), &server, server_port),
            server,
            server_port,
            ProtocolSettings::VLess(VLessSettings {
                uuid,
                encryption: param(&params, "encryption").unwrap_or_else(default_vless_encryption),
                flow: param(&params, "flow"),
                stream: stream_from_params(&params, None),
            }),
        ))
    }

    fn encode(&self, profile: &ProfileItem) -> Result<String> {
        let ProtocolSettings::VLess(vless) = &profile.settings else {
            bail!("VLESS codec cannot encode {} profile", profile.config_type());
        };

        let mut query = Serializer::new(String::new());
        query.append_pair("encryption", &vless.encryption);
        if let Some(flow) = &vless.flow {
            query.append_pair("flow", flow);
        }
        append_stream_params(&mut query, &vless.stream, false);

        Ok(build_link(
            &urlencoding::encode(&vless.uuid),
            &profile.server,
            profile.server_port,
            &query.finish(),
            &profile.remarks,
        ))
    }
}
