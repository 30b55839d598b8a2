//! Configuration for wm0
//!
//! Defaults are compiled in. An optional TOML file at
//! `~/.config/wm0/config.toml` overrides them; a default file is written on
//! first run if none exists.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use x11rb::protocol::xproto::ModMask;

use crate::error::WmError;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub bindings: BindingsConfig,
    pub colors: ColorConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(&config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&config_path)
            .context("Failed to read config file")?;

        let config = Self::from_toml(&content)
            .with_context(|| format!("Invalid config file {:?}", config_path))?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .context("Failed to parse config file")?;
        config.validate()?;
        Ok(config)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("wm0");

        Ok(config_dir.join("config.toml"))
    }

    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string)
            .context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }

    /// Reject settings the window manager cannot act on
    pub fn validate(&self) -> Result<(), WmError> {
        let b = &self.bindings;

        if parse_modifier(&b.modifier).is_none() {
            return Err(WmError::InvalidConfig(format!(
                "unknown modifier {:?}",
                b.modifier
            )));
        }

        let buttons = [b.move_button, b.resize_button, b.close_button];
        if let Some(bad) = buttons.iter().find(|&&button| !(1..=5).contains(&button)) {
            return Err(WmError::InvalidConfig(format!(
                "button {} is out of range 1..=5",
                bad
            )));
        }
        if b.move_button == b.resize_button
            || b.move_button == b.close_button
            || b.resize_button == b.close_button
        {
            return Err(WmError::InvalidConfig(
                "move, resize and close buttons must differ".into(),
            ));
        }

        for color in [&self.colors.active, &self.colors.inactive] {
            if parse_color(color).is_none() {
                return Err(WmError::InvalidConfig(format!(
                    "cannot parse color {:?}",
                    color
                )));
            }
        }

        Ok(())
    }
}

/// Mouse gesture bindings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BindingsConfig {
    /// Modifier held for gestures: Shift, Lock, Control, Mod1..Mod5 (Alt, Super)
    pub modifier: String,
    /// Button that drags a window (1 = left, 2 = middle, 3 = right)
    pub move_button: u8,
    /// Button that resizes a window
    pub resize_button: u8,
    /// Button that kills the window's client
    pub close_button: u8,
}

impl Default for BindingsConfig {
    fn default() -> Self {
        Self {
            modifier: "Mod1".to_string(),
            move_button: 1,
            resize_button: 3,
            close_button: 2,
        }
    }
}

/// Border colors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorConfig {
    /// Border of the focused window (#RRGGBB)
    pub active: String,
    /// Border of every other window
    pub inactive: String,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            active: "#0000FF".to_string(),
            inactive: "#202020".to_string(),
        }
    }
}

/// Resolve a modifier name to its mask
pub fn parse_modifier(name: &str) -> Option<ModMask> {
    let mask = match name.to_ascii_lowercase().as_str() {
        "shift" => ModMask::SHIFT,
        "lock" => ModMask::LOCK,
        "control" | "ctrl" => ModMask::CONTROL,
        "mod1" | "alt" => ModMask::M1,
        "mod2" => ModMask::M2,
        "mod3" => ModMask::M3,
        "mod4" | "super" => ModMask::M4,
        "mod5" => ModMask::M5,
        _ => return None,
    };
    Some(mask)
}

/// Parse `#RGB`, `#RRGGBB`, `#RRRGGGBBB` or `#RRRRGGGGBBBB` into 16-bit channels.
///
/// Shorter forms fill the high-order bits, as XParseColor does.
pub fn parse_color(spec: &str) -> Option<(u16, u16, u16)> {
    let hex = spec.strip_prefix('#')?;
    if hex.is_empty() || hex.len() % 3 != 0 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let digits = hex.len() / 3;
    if digits > 4 {
        return None;
    }

    let shift = 16 - 4 * digits as u32;
    let channel = |i: usize| -> Option<u16> {
        let value = u16::from_str_radix(&hex[i * digits..(i + 1) * digits], 16).ok()?;
        Some(value << shift)
    };

    Some((channel(0)?, channel(1)?, channel(2)?))
}
