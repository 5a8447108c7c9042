use anyhow::{Context as _, Result};
use std::path::Path;
use tera::{Context, Tera};

use crate::models::{DeviceType, SnmpConfig, UnsupportedDeviceType};

/// Ordered commands for one device, consumed by the CLI dispatcher
pub type RenderedCommandSet = Vec<String>;

/// What a device family needs once its templates have been applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Commands to push over a CLI session
    Commands(RenderedCommandSet),
    /// The family is configured through the controller's REST API instead
    Controller,
}

const IOS_TEMPLATE: &str = "\
snmp-server view ViewDefault iso included
snmp-server group {{ community }} v3 priv read ViewDefault
snmp-server user {{ username }} {{ community }} v3 auth {{ auth_protocol }} {{ auth_password }} priv {{ priv_protocol }} {{ priv_bits }} {{ priv_password }}";

const NXOS_TEMPLATE: &str = "\
snmp-server user {{ username }} network-admin v3 auth {{ auth_protocol }} {{ auth_password }} priv {{ priv_protocol }}-{{ priv_bits }} {{ priv_password }}";

// `set password` prompts for the key on the following line
const FXOS_TEMPLATE: &str = "\
scope monitoring
enable snmp
create snmp-user {{ username }}
set auth {{ auth_protocol }}
set {{ priv_protocol }}-{{ priv_bits }} yes
set password
{{ priv_password }}
commit-buffer";

const ASA_TEMPLATE: &str = "\
snmp-server group {{ community }} v3 priv read ViewDefault
snmp-server user {{ username }} {{ community }} v3 auth {{ auth_protocol }} {{ auth_password }} priv {{ priv_protocol }} {{ priv_bits }} {{ priv_password }}";

/// Template name for a CLI family; None for the controller-managed family
pub fn template_name(device_type: DeviceType) -> Option<&'static str> {
    match device_type {
        DeviceType::Ios => Some("ios"),
        DeviceType::Nxos => Some("nxos"),
        DeviceType::Fxos => Some("fxos"),
        DeviceType::Asa => Some("asa"),
        DeviceType::Aci => None,
    }
}

fn builtin_template(device_type: DeviceType) -> Option<&'static str> {
    match device_type {
        DeviceType::Ios => Some(IOS_TEMPLATE),
        DeviceType::Nxos => Some(NXOS_TEMPLATE),
        DeviceType::Fxos => Some(FXOS_TEMPLATE),
        DeviceType::Asa => Some(ASA_TEMPLATE),
        DeviceType::Aci => None,
    }
}

/// Renders SNMPv3 command sets, one tera template per CLI family
pub struct CommandRenderer {
    tera: Tera,
}

impl CommandRenderer {
    /// Renderer with the built-in template for every CLI family
    pub fn builtin() -> Result<Self> {
        let mut tera = Tera::default();
        for device_type in DeviceType::ALL {
            if let (Some(name), Some(content)) = (template_name(device_type), builtin_template(device_type)) {
                tera.add_raw_template(name, content)
                    .map_err(|e| anyhow::anyhow!("Invalid built-in template {}: {}", name, e))?;
            }
        }
        Ok(Self { tera })
    }

    /// Built-in templates, replaced by `<name>.tera` from `dir` where such a file exists
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut renderer = Self::builtin()?;
        for device_type in DeviceType::ALL {
            let Some(name) = template_name(device_type) else {
                continue;
            };
            let path = dir.join(format!("{}.tera", name));
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read template {}", path.display()))?;
            renderer
                .tera
                .add_raw_template(name, &content)
                .map_err(|e| anyhow::anyhow!("Invalid template {}: {}", path.display(), e))?;
            tracing::info!("Using {} template override from {}", device_type, path.display());
        }
        Ok(renderer)
    }

    /// Render the command set for a device family
    pub fn render(&self, device_type: DeviceType, config: &SnmpConfig) -> Result<RenderTarget> {
        let Some(name) = template_name(device_type) else {
            return Ok(RenderTarget::Controller);
        };

        let context = Context::from_serialize(config)
            .map_err(|e| anyhow::anyhow!("Failed to build template context: {}", e))?;
        let rendered = self
            .tera
            .render(name, &context)
            .map_err(|e| anyhow::anyhow!("Template rendering failed for {}: {}", device_type, e))?;

        Ok(RenderTarget::Commands(
            rendered.lines().map(|line| line.trim_end().to_string()).collect(),
        ))
    }

    /// Render straight from a raw DEVICE_TYPE tag. An unknown tag is an
    /// [`UnsupportedDeviceType`] error, which callers treat as recoverable.
    pub fn render_tag(&self, tag: &str, config: &SnmpConfig) -> Result<(DeviceType, RenderTarget)> {
        let device_type: DeviceType = tag.parse()?;
        Ok((device_type, self.render(device_type, config)?))
    }
}

/// True when a render failure only concerns the record's tag
pub fn is_unsupported_tag(err: &anyhow::Error) -> bool {
    err.is::<UnsupportedDeviceType>()
}
