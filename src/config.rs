//! Analysis configuration.
//!
//! The defaults reproduce the lab session settings; a JSON file or the
//! command line can override any of them.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::antenna::{DEFAULT_Z0, SPEED_OF_LIGHT};
use crate::error::{AnalysisError, AnalysisResult};

/// Image encoding for the generated plots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Svg,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Svg => "svg",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ImageFormat {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "svg" => Ok(ImageFormat::Svg),
            other => Err(AnalysisError::Config(format!("unknown image format {:?}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Directory holding one S2P file per angle. Its basename names the antenna.
    pub data_folder: PathBuf,
    /// Gain of the transmitting antenna, dB (linear when `linear_gain` is set)
    pub tx_gain_db: f64,
    /// Report receiver gain as a linear ratio instead of dBi
    pub linear_gain: bool,
    /// Separation between the antennas, meters
    pub antenna_distance: f64,
    pub output_dir: PathBuf,
    pub image_format: ImageFormat,
    pub reference_impedance: f64,
    pub speed_of_light: f64,
    /// Relative tolerance when comparing frequency sweeps across files
    pub sweep_tolerance: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            data_folder: PathBuf::from("./patch"),
            tx_gain_db: 4.25,
            linear_gain: false,
            antenna_distance: 1.4,
            output_dir: PathBuf::from("."),
            image_format: ImageFormat::Png,
            reference_impedance: DEFAULT_Z0,
            speed_of_light: SPEED_OF_LIGHT,
            sweep_tolerance: 1e-9,
        }
    }
}

impl AnalysisConfig {
    /// Reads a JSON configuration. Missing keys keep their defaults.
    pub fn from_json_file(path: &Path) -> AnalysisResult<Self> {
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| AnalysisError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Basename of the data folder, used in plot titles and file names.
    pub fn folder_label(&self) -> String {
        self.data_folder
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                _ => None,
            })
            .last()
            .unwrap_or_default()
    }

    pub fn broadside_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_broadside_sparams.{}",
            self.folder_label(),
            self.image_format.extension()
        ))
    }

    pub fn emissions_path(&self) -> PathBuf {
        self.output_dir.join(format!(
            "{}_emissions.{}",
            self.folder_label(),
            self.image_format.extension()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_lab_setup() {
        let config = AnalysisConfig::default();
        assert_eq!(config.tx_gain_db, 4.25);
        assert_eq!(config.antenna_distance, 1.4);
        assert!(!config.linear_gain);
        assert_eq!(config.folder_label(), "patch");
        assert_eq!(config.broadside_path(), PathBuf::from("./patch_broadside_sparams.png"));
        assert_eq!(config.emissions_path(), PathBuf::from("./patch_emissions.png"));
    }

    #[test]
    fn folder_label_ignores_trailing_separator() {
        let config = AnalysisConfig {
            data_folder: PathBuf::from("data/tl-link/"),
            ..Default::default()
        };
        assert_eq!(config.folder_label(), "tl-link");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{ "data_folder": "./tl-link", "tx_gain_db": 13.24, "image_format": "svg" }}"#
        )
        .unwrap();
        let config = AnalysisConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.data_folder, PathBuf::from("./tl-link"));
        assert_eq!(config.tx_gain_db, 13.24);
        assert_eq!(config.image_format, ImageFormat::Svg);
        assert_eq!(config.antenna_distance, 1.4);
        assert_eq!(config.emissions_path(), PathBuf::from("./tl-link_emissions.svg"));
    }

    #[test]
    fn malformed_json_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        assert!(matches!(
            AnalysisConfig::from_json_file(file.path()),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn image_format_parsing() {
        assert_eq!("PNG".parse::<ImageFormat>().unwrap(), ImageFormat::Png);
        assert!("gif".parse::<ImageFormat>().is_err());
    }
}
