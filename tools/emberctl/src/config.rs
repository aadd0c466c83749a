//! Optional `emberctl.toml` configuration.
//!
//! ```toml
//! [log]
//! level = "warn"
//!
//! [transfer-list]
//! alignment = 3
//! max-size = 0x10000
//!
//! [aml]
//! oem-id = "EMBER"
//! oem-table-id = "PATCHED"
//! oem-revision = 2
//! compliance = true
//! ```
//!
//! Every section and key is optional. Command-line flags win over the file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail, ensure};
use ember_acpi::SdtHeader;
use log::LevelFilter;
use serde::Deserialize;

/// Default file name looked up in the working directory.
pub const CONFIG_FILE: &str = "emberctl.toml";

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default, rename = "transfer-list")]
    pub transfer_list: TransferListConfig,
    #[serde(default)]
    pub aml: AmlConfig,
}

/// `[log]` section.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    pub level: Option<String>,
}

/// `[transfer-list]` section.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferListConfig {
    #[serde(default = "default_alignment")]
    pub alignment: u8,
    #[serde(default = "default_max_size", rename = "max-size")]
    pub max_size: usize,
}

impl Default for TransferListConfig {
    fn default() -> Self {
        Self {
            alignment: default_alignment(),
            max_size: default_max_size(),
        }
    }
}

fn default_alignment() -> u8 {
    ember_transfer_list::header::TRANSFER_LIST_DEFAULT_ALIGNMENT
}

fn default_max_size() -> usize {
    0x1_0000
}

/// `[aml]` section: header fields stamped on every table emberctl writes.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct AmlConfig {
    pub oem_id: Option<String>,
    pub oem_table_id: Option<String>,
    pub oem_revision: Option<u32>,
    pub creator_id: Option<String>,
    pub creator_revision: Option<u32>,
    /// Re-check every cached size before writing a table.
    #[serde(default)]
    pub compliance: bool,
}

impl Config {
    /// Loads `path`, or `emberctl.toml` from the working directory when it
    /// exists, or the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: PathBuf = match path {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&text).with_context(|| format!("in {}", path.display()))?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses and validates configuration text.
    pub fn parse(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.log_level()?;
        ensure!(
            config.transfer_list.alignment < 16,
            "transfer-list alignment {} is out of range",
            config.transfer_list.alignment
        );
        // Validates the identification strings.
        config.aml.apply(&mut SdtHeader {
            signature: *b"SSDT",
            length: 0,
            revision: 0,
            checksum: 0,
            oem_id: [0; 6],
            oem_table_id: [0; 8],
            oem_revision: 0,
            creator_id: 0,
            creator_revision: 0,
        })?;
        Ok(config)
    }

    /// The configured log level, if any.
    pub fn log_level(&self) -> Result<Option<LevelFilter>> {
        self.log
            .level
            .as_deref()
            .map(|level| {
                level
                    .parse()
                    .with_context(|| format!("unknown log level `{level}`"))
            })
            .transpose()
    }
}

impl AmlConfig {
    /// Overwrites the header fields that are configured.
    pub fn apply(&self, header: &mut SdtHeader) -> Result<()> {
        if let Some(id) = &self.oem_id {
            header.oem_id = pad(id, "oem-id")?;
        }
        if let Some(id) = &self.oem_table_id {
            header.oem_table_id = pad(id, "oem-table-id")?;
        }
        if let Some(rev) = self.oem_revision {
            header.oem_revision = rev;
        }
        if let Some(id) = &self.creator_id {
            header.creator_id = u32::from_le_bytes(pad(id, "creator-id")?);
        }
        if let Some(rev) = self.creator_revision {
            header.creator_revision = rev;
        }
        Ok(())
    }
}

/// Space-pads an ASCII identifier to its field width.
fn pad<const N: usize>(value: &str, key: &str) -> Result<[u8; N]> {
    if !value.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        bail!("{key} `{value}` must be printable ASCII");
    }
    if value.len() > N {
        bail!("{key} `{value}` is longer than {N} characters");
    }
    let mut out = [b' '; N];
    out[..value.len()].copy_from_slice(value.as_bytes());
    Ok(out)
}
