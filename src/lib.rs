//! # imgascii - image to ASCII art
//!
//! `imgascii` turns images into plain-text character art using a fixed
//! 11-glyph palette (`@#$%?*+;:,.`, dark to light).
//!
//! ## Features
//!
//! - Convert a local image file to a `.txt` rendering
//! - Scrape every `<img>` on a web page, download and convert each one
//! - Fetch a generated face from a "random person" endpoint and convert it
//! - Presets for the output width, loaded from a JSON config file
//!
//! ## Example
//!
//! ```no_run
//! use imgascii::{AsciiConverter, ConversionOptions};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = AsciiConverter::new();
//! let options = ConversionOptions::default().with_columns(120);
//! let art = converter.convert_image(
//!     Path::new("input.png"),
//!     Path::new("output.txt"),
//!     &options,
//! )?;
//! println!("{}", art);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pipeline
//!
//! The stages are also exposed one by one:
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use imgascii::pipeline::{render, resize, to_ascii_chars, to_greyscale};
//! use imgascii::Palette;
//!
//! let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(4, 2, Luma([130])));
//! let resized = resize(&img, 2).unwrap();
//! let chars = to_ascii_chars(&to_greyscale(&resized), &Palette::CLASSIC);
//! assert_eq!(chars, vec!['*', '*']);
//! assert_eq!(render(&img, 2).unwrap().as_str(), "**\n");
//! ```

pub mod art;
pub mod error;
pub mod fetch;
pub mod palette;
pub mod pipeline;

pub use art::{layout, AsciiArt};
pub use error::ConvertError;
pub use fetch::{FetchError, Fetcher};
pub use palette::Palette;
pub use pipeline::{image_to_file, load_image, render, DEFAULT_COLUMNS};

use anyhow::{anyhow, Context, Result};
use image::DynamicImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Width preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub columns: u32,
}

fn default_preset_name() -> String {
    "default".to_string()
}

fn default_face_preset_name() -> String {
    "face".to_string()
}

fn default_random_face_url() -> String {
    fetch::RANDOM_FACE_URL.to_string()
}

fn default_user_agent() -> String {
    fetch::DEFAULT_USER_AGENT.to_string()
}

fn builtin_presets() -> HashMap<String, Preset> {
    [("default", DEFAULT_COLUMNS), ("face", 100), ("small", 100), ("large", 800)]
        .into_iter()
        .map(|(name, columns)| (name.to_string(), Preset { columns }))
        .collect()
}

/// Application configuration, read from `imgascii.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "builtin_presets")]
    pub presets: HashMap<String, Preset>,
    #[serde(default = "default_preset_name")]
    pub default_preset: String,
    /// Preset used for the random face flow
    #[serde(default = "default_face_preset_name")]
    pub face_preset: String,
    /// Where downloaded images land; see [`AppConfig::download_dir`]
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
    #[serde(default = "default_random_face_url")]
    pub random_face_url: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: builtin_presets(),
            default_preset: default_preset_name(),
            face_preset: default_face_preset_name(),
            download_dir: None,
            random_face_url: default_random_face_url(),
            user_agent: default_user_agent(),
        }
    }
}

impl AppConfig {
    /// Reads and validates a JSON config file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading config {}", path.display()))?;
        let cfg: AppConfig = serde_json::from_str(&text).with_context(|| format!("parsing config json {}", path.display()))?;
        cfg.validate().with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some((name, _)) = self.presets.iter().find(|(_, p)| p.columns == 0) {
            return Err(anyhow!("Preset '{}' has zero columns", name));
        }
        for name in [&self.default_preset, &self.face_preset] {
            if !self.presets.contains_key(name) {
                return Err(anyhow!("Missing preset '{}' in config", name));
            }
        }
        fetch::parse_url(&self.random_face_url).context("random_face_url")?;
        Ok(())
    }

    /// Configured download directory, else `<data dir>/imgascii/downloads`,
    /// else `./downloads`.
    pub fn download_dir(&self) -> PathBuf {
        if let Some(dir) = &self.download_dir {
            return dir.clone();
        }
        match dirs::data_dir() {
            Some(mut d) => {
                d.push("imgascii");
                d.push("downloads");
                d
            }
            None => PathBuf::from("downloads"),
        }
    }
}

/// Options for a single conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionOptions {
    /// Target width in characters (columns)
    pub columns: u32,
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self { columns: DEFAULT_COLUMNS }
    }
}

impl ConversionOptions {
    /// Create options with a specific width
    pub fn with_columns(mut self, columns: u32) -> Self {
        self.columns = columns;
        self
    }

    pub fn from_preset(preset: &Preset) -> Self {
        Self { columns: preset.columns }
    }
}

/// One image of a page conversion
#[derive(Debug)]
pub struct SiteImage {
    /// Position of the image on the page
    pub index: usize,
    pub url: reqwest::Url,
    /// `image<index>.txt` in the output directory
    pub output: PathBuf,
    pub outcome: Result<AsciiArt>,
}

/// Main converter struct for ASCII art generation
pub struct AsciiConverter {
    config: AppConfig,
}

impl AsciiConverter {
    /// Create a new converter with default configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a converter with custom configuration
    pub fn with_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from a file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: AppConfig::from_file(path)?,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Convert an image file to ASCII art and write it to `output`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use imgascii::{AsciiConverter, ConversionOptions};
    /// use std::path::Path;
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let converter = AsciiConverter::new();
    /// let options = ConversionOptions::default().with_columns(200);
    /// converter.convert_image(Path::new("image.png"), Path::new("output.txt"), &options)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn convert_image(&self, input: &Path, output: &Path, options: &ConversionOptions) -> Result<AsciiArt> {
        let img = load_image(input)?;
        let art = image_to_file(Some(&img), output, options.columns)
            .with_context(|| format!("converting {}", input.display()))?;
        Ok(art)
    }

    /// Convert an image file to an ASCII string (without writing to file)
    pub fn image_to_string(&self, input: &Path, options: &ConversionOptions) -> Result<String> {
        let img = load_image(input)?;
        Ok(render(&img, options.columns)?.into_string())
    }

    /// Renders several images in parallel; results keep the input order.
    pub fn render_batch(&self, images: &[DynamicImage], options: &ConversionOptions) -> Vec<std::result::Result<AsciiArt, ConvertError>> {
        images.par_iter().map(|img| render(img, options.columns)).collect()
    }

    /// Loads and converts several files in parallel, writing each result to
    /// the paired output path.
    pub fn convert_files(&self, jobs: &[(PathBuf, PathBuf)], options: &ConversionOptions) -> Vec<Result<AsciiArt>> {
        jobs.par_iter()
            .map(|(input, output)| self.convert_image(input, output, options))
            .collect()
    }

    /// Downloads and converts every image on a page, in page order.
    ///
    /// Image `N` is written to `out_dir/image<N>.txt`. Each image is
    /// converted right after its download, before the next one can reuse its
    /// file name. A failed download or conversion only affects its own index.
    pub fn convert_site(&self, fetcher: &Fetcher, page_url: &str, download_dir: &Path, out_dir: &Path, options: &ConversionOptions) -> Result<Vec<SiteImage>> {
        fs::create_dir_all(out_dir).with_context(|| format!("creating {}", out_dir.display()))?;
        let urls = fetcher.image_urls(page_url)?;

        let mut images = Vec::with_capacity(urls.len());
        for (index, url) in urls.into_iter().enumerate() {
            let output = out_dir.join(format!("image{}.txt", index));
            let outcome = fetcher
                .download(&url, download_dir)
                .with_context(|| format!("downloading {}", url))
                .and_then(|path| self.convert_image(&path, &output, options));
            if let Err(e) = &outcome {
                log::warn!("image {} ({}) failed: {:#}", index, url, e);
            }
            images.push(SiteImage { index, url, output, outcome });
        }
        Ok(images)
    }

    /// Get a preset by name
    pub fn get_preset(&self, name: &str) -> Option<&Preset> {
        self.config.presets.get(name)
    }

    /// Get conversion options from a preset name
    pub fn options_from_preset(&self, preset_name: &str) -> Result<ConversionOptions> {
        let preset = self
            .get_preset(preset_name)
            .ok_or_else(|| anyhow!("Preset '{}' not found", preset_name))?;
        Ok(ConversionOptions::from_preset(preset))
    }

    /// Options for the configured default preset
    pub fn default_options(&self) -> Result<ConversionOptions> {
        self.options_from_preset(&self.config.default_preset)
    }

    /// Options for the random face flow
    pub fn face_options(&self) -> Result<ConversionOptions> {
        self.options_from_preset(&self.config.face_preset)
    }
}

impl Default for AsciiConverter {
    fn default() -> Self {
        Self::new()
    }
}
