use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use clap::ValueEnum;
use client_core::{controller::ControllerSettings, AddressExtraction, PositionalLayout};
use serde::Deserialize;
use shared::domain::ResourceAddress;
use url::Url;

pub const DEFAULT_CONFIG_FILE: &str = "gumball.toml";
pub const DEFAULT_GATEWAY_URL: &str = "https://stokenet.radixdlt.com";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum WalletKind {
    /// Push-based toolkit bridge.
    Toolkit,
    /// Pull-based legacy SDK bridge.
    Legacy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionKind {
    ByEntityType,
    Positional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub gateway_url: Option<String>,
    pub wallet_url: Option<String>,
    pub wallet_mode: WalletKind,
    pub xrd_resource: String,
    pub manifest_version: u32,
    pub extraction: ExtractionKind,
    pub price_field: String,
    pub manifest_dump_dir: Option<PathBuf>,
    pub dapp_definition: Option<String>,
    pub transaction_message: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gateway_url: Some(DEFAULT_GATEWAY_URL.into()),
            wallet_url: None,
            wallet_mode: WalletKind::Toolkit,
            xrd_resource: client_core::controller::DEFAULT_XRD_RESOURCE.into(),
            manifest_version: client_core::controller::DEFAULT_MANIFEST_VERSION,
            extraction: ExtractionKind::ByEntityType,
            price_field: "price".into(),
            manifest_dump_dir: None,
            dapp_definition: None,
            transaction_message: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    gateway_url: Option<String>,
    wallet_url: Option<String>,
    wallet_mode: Option<WalletKind>,
    xrd_resource: Option<String>,
    manifest_version: Option<u32>,
    extraction: Option<ExtractionKind>,
    price_field: Option<String>,
    manifest_dump_dir: Option<PathBuf>,
    dapp_definition: Option<String>,
    transaction_message: Option<String>,
}

/// Defaults, then the config file, then environment variables.
///
/// An explicit `config_path` must exist; the default `gumball.toml` is optional.
pub fn load_settings(config_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid config '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg: FileConfig = toml::from_str(raw)?;

    if let Some(v) = file_cfg.gateway_url {
        settings.gateway_url = non_empty(v);
    }
    if let Some(v) = file_cfg.wallet_url {
        settings.wallet_url = non_empty(v);
    }
    if let Some(v) = file_cfg.wallet_mode {
        settings.wallet_mode = v;
    }
    if let Some(v) = file_cfg.xrd_resource {
        settings.xrd_resource = v;
    }
    if let Some(v) = file_cfg.manifest_version {
        settings.manifest_version = v;
    }
    if let Some(v) = file_cfg.extraction {
        settings.extraction = v;
    }
    if let Some(v) = file_cfg.price_field {
        settings.price_field = v;
    }
    if let Some(v) = file_cfg.manifest_dump_dir {
        settings.manifest_dump_dir = Some(v);
    }
    if let Some(v) = file_cfg.dapp_definition {
        settings.dapp_definition = non_empty(v);
    }
    if let Some(v) = file_cfg.transaction_message {
        settings.transaction_message = non_empty(v);
    }
    Ok(())
}

fn apply_env(
    settings: &mut Settings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("GUMBALL_GATEWAY_URL") {
        settings.gateway_url = non_empty(v);
    }
    if let Some(v) = lookup("APP__GATEWAY_URL") {
        settings.gateway_url = non_empty(v);
    }

    if let Some(v) = lookup("GUMBALL_WALLET_URL") {
        settings.wallet_url = non_empty(v);
    }

    if let Some(v) = lookup("GUMBALL_WALLET_MODE") {
        settings.wallet_mode = match WalletKind::from_str(&v, true) {
            Ok(mode) => mode,
            Err(_) => bail!("GUMBALL_WALLET_MODE must be 'toolkit' or 'legacy', got '{v}'"),
        };
    }

    if let Some(v) = lookup("GUMBALL_XRD_RESOURCE") {
        settings.xrd_resource = v;
    }
    Ok(())
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("gateway_url", &self.gateway_url),
            ("wallet_url", &self.wallet_url),
        ] {
            if let Some(raw) = value {
                let parsed = Url::parse(raw).with_context(|| format!("{name} '{raw}' is not a url"))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    bail!("{name} '{raw}' must use http or https");
                }
            }
        }
        if self.xrd_resource.trim().is_empty() {
            bail!("xrd_resource must not be empty");
        }
        Ok(())
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            xrd_resource: ResourceAddress::new(self.xrd_resource.clone()),
            manifest_version: self.manifest_version,
            extraction: match self.extraction {
                ExtractionKind::ByEntityType => AddressExtraction::ByEntityType,
                ExtractionKind::Positional => {
                    AddressExtraction::Positional(PositionalLayout::default())
                }
            },
            manifest_dump_dir: self.manifest_dump_dir.clone(),
            transaction_message: self.transaction_message.clone(),
        }
    }
}
