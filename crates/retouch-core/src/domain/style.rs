//! Style configuration passed to the image worker.
//!
//! The global configuration is rendered into the task's `params` object; a
//! per-call `StyleOverrides` is merged on top key by key.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::errors::QueueError;
use super::ids::AssetRef;
use super::season::Season;

/// How the worker removes the manufacturer logo from the source photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LogoRemovalMethod {
    /// Classical inpainting; fast.
    #[default]
    #[serde(rename = "opencv")]
    Classical,
    /// Learned inpainting; slower, better background recovery.
    #[serde(rename = "lama")]
    Learned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonBackgrounds {
    pub summer: Option<AssetRef>,
    pub winter: Option<AssetRef>,
    pub all_season: Option<AssetRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonIcons {
    pub summer: Option<AssetRef>,
    pub winter: Option<AssetRef>,
    pub any: Option<AssetRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Fonts {
    pub bold: Option<AssetRef>,
    pub semibold: Option<AssetRef>,
    pub regular: Option<AssetRef>,
}

/// Hex colours used by the label layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Palette {
    pub white: String,
    pub black: String,
    pub cyan: String,
    pub light_bg: String,
    pub load_idx_bg: String,
    pub speed_idx_bg: String,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            white: "#FFFFFF".to_string(),
            black: "#222222".to_string(),
            cyan: "#23B2AA".to_string(),
            light_bg: "#F3F6F7".to_string(),
            load_idx_bg: "#30BBC2".to_string(),
            speed_idx_bg: "#357D9F".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub backgrounds: SeasonBackgrounds,
    pub icons: SeasonIcons,
    pub fonts: Fonts,
    pub colors: Palette,
    pub width: u32,
    pub height: u32,
    pub logo_removal_method: LogoRemovalMethod,
    pub debug_logging: bool,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            backgrounds: SeasonBackgrounds::default(),
            icons: SeasonIcons::default(),
            fonts: Fonts::default(),
            colors: Palette::default(),
            width: 620,
            height: 826,
            logo_removal_method: LogoRemovalMethod::default(),
            debug_logging: false,
        }
    }
}

/// Font paths after asset resolution, in the order bold, semibold, regular.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedFonts {
    pub bold: String,
    pub semibold: String,
    pub regular: String,
}

#[derive(Serialize)]
struct RenderedStyle<'a> {
    font_bold: &'a str,
    font_semibold: &'a str,
    font_regular: &'a str,
    color_white: &'a str,
    color_black: &'a str,
    color_cyan: &'a str,
    color_light_bg: &'a str,
    color_load_idx_bg: &'a str,
    color_speed_idx_bg: &'a str,
    width: u32,
    height: u32,
    logo_removal_method: LogoRemovalMethod,
    debug_logging: bool,
}

impl StyleConfig {
    /// Background and icon for a season.
    ///
    /// - summer: summer background + summer icon
    /// - winter: winter background + winter icon
    /// - all-season: all-season background + generic icon
    /// - unspecified: summer background + generic icon
    pub fn assets_for(&self, season: Season) -> Result<(&AssetRef, &AssetRef), QueueError> {
        let (background, background_name, icon, icon_name) = match season {
            Season::Summer => (
                &self.backgrounds.summer,
                "summer",
                &self.icons.summer,
                "summer",
            ),
            Season::Winter => (
                &self.backgrounds.winter,
                "winter",
                &self.icons.winter,
                "winter",
            ),
            Season::AllSeason => (
                &self.backgrounds.all_season,
                "all_season",
                &self.icons.any,
                "any",
            ),
            Season::Unspecified => (&self.backgrounds.summer, "summer", &self.icons.any, "any"),
        };
        let background = background.as_ref().ok_or_else(|| {
            QueueError::Validation(format!("style.backgrounds.{background_name} is not configured"))
        })?;
        let icon = icon.as_ref().ok_or_else(|| {
            QueueError::Validation(format!("style.icons.{icon_name} is not configured"))
        })?;
        Ok((background, icon))
    }

    /// Flatten into the worker's `params` object.
    pub fn render(&self, fonts: &ResolvedFonts) -> Map<String, Value> {
        let rendered = RenderedStyle {
            font_bold: &fonts.bold,
            font_semibold: &fonts.semibold,
            font_regular: &fonts.regular,
            color_white: &self.colors.white,
            color_black: &self.colors.black,
            color_cyan: &self.colors.cyan,
            color_light_bg: &self.colors.light_bg,
            color_load_idx_bg: &self.colors.load_idx_bg,
            color_speed_idx_bg: &self.colors.speed_idx_bg,
            width: self.width,
            height: self.height,
            logo_removal_method: self.logo_removal_method,
            debug_logging: self.debug_logging,
        };
        match serde_json::to_value(rendered) {
            Ok(Value::Object(map)) => map,
            // RenderedStyle はフィールドが固定の struct なので常に Object になる
            _ => Map::new(),
        }
    }
}

/// Per-call parameter overrides; a key present here replaces the global value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StyleOverrides(Map<String, Value>);

impl StyleOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn apply(&self, params: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            params.insert(key.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn configured() -> StyleConfig {
        StyleConfig {
            backgrounds: SeasonBackgrounds {
                summer: Some(AssetRef::new("bg/summer.png")),
                winter: Some(AssetRef::new("bg/winter.png")),
                all_season: Some(AssetRef::new("bg/all.png")),
            },
            icons: SeasonIcons {
                summer: Some(AssetRef::new("icons/sun.png")),
                winter: Some(AssetRef::new("icons/snow.png")),
                any: Some(AssetRef::new("icons/any.png")),
            },
            ..StyleConfig::default()
        }
    }

    #[rstest]
    #[case::summer(Season::Summer, "bg/summer.png", "icons/sun.png")]
    #[case::winter(Season::Winter, "bg/winter.png", "icons/snow.png")]
    #[case::all_season(Season::AllSeason, "bg/all.png", "icons/any.png")]
    #[case::unspecified(Season::Unspecified, "bg/summer.png", "icons/any.png")]
    fn selects_assets_by_season(
        #[case] season: Season,
        #[case] background: &str,
        #[case] icon: &str,
    ) {
        let style = configured();
        let (bg, ic) = style.assets_for(season).unwrap();
        assert_eq!(bg.as_str(), background);
        assert_eq!(ic.as_str(), icon);
    }

    #[test]
    fn missing_background_is_a_validation_error() {
        let style = StyleConfig::default();
        let err = style.assets_for(Season::Winter).unwrap_err();
        assert!(err.to_string().contains("backgrounds.winter"));
    }

    #[test]
    fn render_uses_defaults_and_wire_names() {
        let params = StyleConfig::default().render(&ResolvedFonts::default());
        assert_eq!(params["color_black"], "#222222");
        assert_eq!(params["width"], 620);
        assert_eq!(params["height"], 826);
        assert_eq!(params["logo_removal_method"], "opencv");
        assert_eq!(params["debug_logging"], false);
        assert_eq!(params["font_bold"], "");
    }

    #[test]
    fn overrides_win_over_global_values() {
        let mut params = StyleConfig::default().render(&ResolvedFonts::default());
        StyleOverrides::new()
            .with("width", 1000)
            .with("logo_removal_method", "lama")
            .with("extra", true)
            .apply(&mut params);
        assert_eq!(params["width"], 1000);
        assert_eq!(params["logo_removal_method"], "lama");
        assert_eq!(params["extra"], true);
        assert_eq!(params["height"], 826);
    }

    #[test]
    fn partial_config_falls_back_to_defaults() {
        let style: StyleConfig =
            serde_json::from_str(r##"{"width": 800, "colors": {"cyan": "#000000"}}"##).unwrap();
        assert_eq!(style.width, 800);
        assert_eq!(style.height, 826);
        assert_eq!(style.colors.cyan, "#000000");
        assert_eq!(style.colors.white, "#FFFFFF");
    }
}
