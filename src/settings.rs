use crate::colors::parse_hex_color;
use crate::config::{DiscProportions, RecycleMode, TunnelConfig};
use crate::error::{Error, Result};
use image::Rgba;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub tunnel: TunnelSettings,
    #[serde(default)]
    pub run: RunSettings,
}

/// Optional overrides for the engine constants
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TunnelSettings {
    pub discs: Option<usize>,
    pub lines: Option<usize>,
    pub particles: Option<usize>,
    pub step: Option<f32>,
    pub line_width: Option<f32>,
    pub stroke_color: Option<String>,    // "#444"
    pub particle_color: Option<String>,  // alpha is ignored; each particle picks its own
    pub start: Option<DiscProportions>,
    pub end: Option<DiscProportions>,
    pub disc_stride: Option<usize>,
    pub clip_margin: Option<f32>,
    pub spawn_height: Option<f32>,
    pub recycle: Option<RecycleMode>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSettings {
    pub time: Option<f32>,
    pub supersample: Option<u32>,
    pub scheme: Option<u8>,
    pub background: Option<String>,
}

impl Settings {
    /// Load from the default path, falling back to defaults on any problem
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("{}; using defaults", e);
            Self::default()
        })
    }

    /// Load an explicit file; errors are reported to the caller
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("termhole")
            .join("config.toml")
    }

    /// Overlay file values onto `config`
    pub fn apply(&self, config: &mut TunnelConfig) -> Result<()> {
        let t = &self.tunnel;
        if let Some(v) = t.discs {
            config.total_discs = v;
        }
        if let Some(v) = t.lines {
            config.total_lines = v;
        }
        if let Some(v) = t.particles {
            config.total_particles = v;
        }
        if let Some(v) = t.step {
            config.progress_step = v;
        }
        if let Some(v) = t.line_width {
            config.line_width = v;
        }
        if let Some(s) = &t.stroke_color {
            config.stroke_color = parse_hex_color(s)?;
        }
        if let Some(s) = &t.particle_color {
            let Rgba([r, g, b, _]) = parse_hex_color(s)?;
            config.particle_rgb = [r, g, b];
        }
        if let Some(v) = t.start {
            config.start = v;
        }
        if let Some(v) = t.end {
            config.end = v;
        }
        if let Some(v) = t.disc_stride {
            config.disc_stride = v.max(1);
        }
        if let Some(v) = t.clip_margin {
            config.clip_margin = v;
        }
        if let Some(v) = t.spawn_height {
            config.spawn_height = v;
        }
        if let Some(v) = t.recycle {
            config.recycle = v;
        }
        Ok(())
    }

    pub fn background(&self) -> Result<Option<Rgba<u8>>> {
        self.run.background.as_deref().map(parse_hex_color).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_changes_nothing() {
        let settings = Settings::parse("").unwrap();
        let mut config = TunnelConfig::default();
        settings.apply(&mut config).unwrap();
        assert_eq!(config, TunnelConfig::default());
    }

    #[test]
    fn overrides_apply() {
        let settings = Settings::parse(
            r##"
            [tunnel]
            discs = 60
            stroke_color = "#808080"
            particle_color = "#ff8800"
            recycle = "keep-drift"
            start = { x = 0.5, y = 0.4, w = 0.8, h = 0.6 }

            [run]
            scheme = 3
            background = "#000"
            "##,
        )
        .unwrap();

        let mut config = TunnelConfig::default();
        settings.apply(&mut config).unwrap();
        assert_eq!(config.total_discs, 60);
        assert_eq!(config.stroke_color, Rgba([0x80, 0x80, 0x80, 0xff]));
        assert_eq!(config.particle_rgb, [0xff, 0x88, 0x00]);
        assert_eq!(config.recycle, RecycleMode::KeepDrift);
        assert_eq!(config.start.h, 0.6);
        assert_eq!(settings.run.scheme, Some(3));
        assert_eq!(settings.background().unwrap(), Some(Rgba([0, 0, 0, 255])));
    }

    #[test]
    fn bad_color_is_an_error() {
        let settings = Settings::parse("[tunnel]\nstroke_color = \"nope\"\n").unwrap();
        let mut config = TunnelConfig::default();
        assert!(matches!(settings.apply(&mut config), Err(Error::InvalidColor(_))));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Settings::parse("[tunnel]\ntotal_bananas = 3\n").is_err());
    }

    #[test]
    fn misspelled_table_is_rejected() {
        assert!(Settings::parse("[tunel]\ndiscs = 60\n").is_err());
        assert!(Settings::parse("[run]\nscheme = 2\n").is_ok());
    }
}
