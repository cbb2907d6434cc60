use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, RwLock};

use crate::format::{FontFamily, TextFormat};
use crate::overlay::InteractionLimits;

pub const CURRENT_VERSION: u32 = 1;
const SETTINGS_FILENAME: &str = "config.yaml";
const APP_NAME: &str = "pdfstudio";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: u32,

    /// Zoom used for the on-screen preview
    #[serde(default = "default_render_zoom")]
    pub render_zoom: f32,

    /// Zoom used when a page is exported as an image
    #[serde(default = "default_export_zoom")]
    pub export_zoom: f32,

    /// Space kept free around the preview, in pixels
    #[serde(default = "default_preview_margin")]
    pub preview_margin: u32,

    #[serde(default = "default_min_widget_width")]
    pub min_widget_width: f64,

    #[serde(default = "default_min_widget_height")]
    pub min_widget_height: f64,

    #[serde(default = "default_resize_border")]
    pub resize_border: f64,

    #[serde(default)]
    pub default_font_family: FontFamily,

    #[serde(default = "default_font_size")]
    pub default_font_size: f32,

    #[serde(default = "default_color")]
    pub default_color: String,
}

fn default_version() -> u32 {
    CURRENT_VERSION
}

fn default_render_zoom() -> f32 {
    1.8
}

fn default_export_zoom() -> f32 {
    2.0
}

fn default_preview_margin() -> u32 {
    80
}

fn default_min_widget_width() -> f64 {
    30.0
}

fn default_min_widget_height() -> f64 {
    20.0
}

fn default_resize_border() -> f64 {
    10.0
}

fn default_font_size() -> f32 {
    12.0
}

fn default_color() -> String {
    "#000000".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            render_zoom: default_render_zoom(),
            export_zoom: default_export_zoom(),
            preview_margin: default_preview_margin(),
            min_widget_width: default_min_widget_width(),
            min_widget_height: default_min_widget_height(),
            resize_border: default_resize_border(),
            default_font_family: FontFamily::default(),
            default_font_size: default_font_size(),
            default_color: default_color(),
        }
    }
}

impl Settings {
    pub fn interaction_limits(&self) -> InteractionLimits {
        InteractionLimits {
            min_width: self.min_widget_width,
            min_height: self.min_widget_height,
            resize_border: self.resize_border,
        }
    }

    /// Editor format a fresh session starts with
    pub fn default_format(&self) -> TextFormat {
        TextFormat {
            family: self.default_font_family,
            size: self.default_font_size,
            color: self.default_color.clone(),
            ..TextFormat::default()
        }
    }
}

static SETTINGS: LazyLock<RwLock<Settings>> = LazyLock::new(|| RwLock::new(Settings::default()));

fn preferred_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|config| config.join(APP_NAME).join(SETTINGS_FILENAME))
}

pub fn load_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, using default settings");
        return;
    };
    if path.exists() {
        load_settings_from_path(&path);
    } else {
        info!("Settings file not found, creating with defaults at {path:?}");
        if let Ok(settings) = SETTINGS.read() {
            save_settings_to_file(&settings, &path);
        }
    }
}

/// Replace the global settings with the contents of `path`. A missing or
/// unreadable file leaves the current settings untouched.
pub fn load_settings_from_path(path: &Path) {
    match fs::read_to_string(path) {
        Ok(content) => match serde_yaml::from_str::<Settings>(&content) {
            Ok(mut settings) => {
                debug!("Loaded settings from {path:?}");

                if settings.version < CURRENT_VERSION {
                    migrate_settings(&mut settings);
                    save_settings_to_file(&settings, path);
                }

                if let Ok(mut global) = SETTINGS.write() {
                    *global = settings;
                }
            }
            Err(e) => {
                error!("Failed to parse settings file {path:?}: {e}");
            }
        },
        Err(e) => {
            error!("Failed to read settings file {path:?}: {e}");
        }
    }
}

fn migrate_settings(settings: &mut Settings) {
    info!(
        "Migrating settings from v{} to v{}",
        settings.version, CURRENT_VERSION
    );

    settings.version = CURRENT_VERSION;
}

pub fn save_settings() {
    let Some(path) = preferred_config_path() else {
        warn!("Could not determine config directory, cannot save settings");
        return;
    };

    if let Ok(settings) = SETTINGS.read() {
        save_settings_to_file(&settings, &path);
    }
}

fn save_settings_to_file(settings: &Settings, path: &Path) {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            if let Err(e) = fs::create_dir_all(parent) {
                error!("Failed to create config directory {parent:?}: {e}");
                return;
            }
        }
    }

    let content = match serde_yaml::to_string(settings) {
        Ok(body) => format!("{SETTINGS_HEADER}{body}"),
        Err(e) => {
            error!("Failed to serialize settings: {e}");
            return;
        }
    };

    match fs::write(path, content) {
        Ok(()) => debug!("Saved settings to {path:?}"),
        Err(e) => error!("Failed to save settings to {path:?}: {e}"),
    }
}

const SETTINGS_HEADER: &str = r#"# ============================================================================
# pdfstudio settings
# ============================================================================
# render_zoom      zoom of the on-screen preview (1.0 = 72 dpi)
# export_zoom      zoom used by page image export
# preview_margin   pixels kept free around the preview
# min_widget_*     smallest size of an editing box, in pixels
# resize_border    bottom-right grab area that resizes an editing box
# default_font_family: arial | times_new_roman | courier_new

"#;

// Public API for accessing/modifying settings

/// Snapshot of the current settings
pub fn current() -> Settings {
    SETTINGS.read().map(|s| s.clone()).unwrap_or_default()
}

pub fn get_render_zoom() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.render_zoom)
        .unwrap_or_else(|_| default_render_zoom())
}

pub fn get_export_zoom() -> f32 {
    SETTINGS
        .read()
        .map(|s| s.export_zoom)
        .unwrap_or_else(|_| default_export_zoom())
}

pub fn get_preview_margin() -> u32 {
    SETTINGS
        .read()
        .map(|s| s.preview_margin)
        .unwrap_or_else(|_| default_preview_margin())
}

pub fn get_interaction_limits() -> InteractionLimits {
    SETTINGS
        .read()
        .map(|s| s.interaction_limits())
        .unwrap_or_default()
}

pub fn get_default_format() -> TextFormat {
    SETTINGS
        .read()
        .map(|s| s.default_format())
        .unwrap_or_default()
}

/// Remember `format` as the starting format of future sessions
pub fn set_default_format(format: &TextFormat) {
    update_default_format(format);
    save_settings();
}

fn update_default_format(format: &TextFormat) {
    if let Ok(mut settings) = SETTINGS.write() {
        settings.default_font_family = format.family;
        settings.default_font_size = format.size;
        settings.default_color = format.color.clone();
    }
}
