//! Physical page configuration

use crate::error::{PaginationError, Result};
use crate::layout::font::FontSpec;
use serde::{Deserialize, Deserializer, Serialize};

/// Screen resolution used to convert inches to pixels
pub const DPI: f32 = 96.0;

/// Points per inch
pub const POINTS_PER_INCH: f32 = 72.0;

/// Line height multiplier used for the chapter heading block
pub const TITLE_LINE_HEIGHT: f32 = 1.2;

/// Convert a point size to pixels at [`DPI`]
pub fn pt_to_px(pt: f32) -> f32 {
    pt * DPI / POINTS_PER_INCH
}

/// Convert inches to pixels at [`DPI`]
pub fn in_to_px(inches: f32) -> f32 {
    inches * DPI
}

/// Layout configuration for a paginated chapter.
///
/// Missing JSON fields take their default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationConfig {
    pub page_width_in: f32,
    pub page_height_in: f32,
    pub margin_top_in: f32,
    pub margin_bottom_in: f32,
    pub margin_left_in: f32,
    pub margin_right_in: f32,
    pub font_size_pt: f32,
    pub font_family: String,
    pub line_height_multiplier: f32,
    pub chapter_title: Option<String>,
    pub show_chapter_title: bool,
    pub chapter_title_font_size_pt: f32,
    pub chapter_title_padding_px: f32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        // Standard manuscript format: US Letter, 1" margins, 12pt double spaced
        Self {
            page_width_in: 8.5,
            page_height_in: 11.0,
            margin_top_in: 1.0,
            margin_bottom_in: 1.0,
            margin_left_in: 1.0,
            margin_right_in: 1.0,
            font_size_pt: 12.0,
            font_family: "Times New Roman".to_string(),
            line_height_multiplier: 2.0,
            chapter_title: None,
            show_chapter_title: false,
            chapter_title_font_size_pt: 24.0,
            chapter_title_padding_px: 32.0,
        }
    }
}

impl PaginationConfig {
    /// Check every invariant, reporting the first violation
    pub fn validate(&self) -> Result<()> {
        positive("pageWidthIn", self.page_width_in)?;
        positive("pageHeightIn", self.page_height_in)?;
        positive("marginTopIn", self.margin_top_in)?;
        positive("marginBottomIn", self.margin_bottom_in)?;
        positive("marginLeftIn", self.margin_left_in)?;
        positive("marginRightIn", self.margin_right_in)?;
        positive("fontSizePt", self.font_size_pt)?;
        positive("chapterTitleFontSizePt", self.chapter_title_font_size_pt)?;

        if !(self.line_height_multiplier.is_finite() && self.line_height_multiplier >= 1.0) {
            return Err(PaginationError::invalid(
                "lineHeightMultiplier",
                "must be at least 1.0",
            ));
        }
        if !(self.chapter_title_padding_px.is_finite() && self.chapter_title_padding_px >= 0.0) {
            return Err(PaginationError::invalid(
                "chapterTitlePaddingPx",
                "must not be negative",
            ));
        }
        if self.content_width_px() <= 0.0 {
            return Err(PaginationError::invalid(
                "marginLeftIn",
                "horizontal margins leave no content width",
            ));
        }
        if self.content_height_px() <= 0.0 {
            return Err(PaginationError::invalid(
                "marginTopIn",
                "vertical margins leave no content height",
            ));
        }
        Ok(())
    }

    /// Usable text width in pixels
    pub fn content_width_px(&self) -> f32 {
        in_to_px(self.page_width_in - self.margin_left_in - self.margin_right_in)
    }

    /// Usable text height in pixels
    pub fn content_height_px(&self) -> f32 {
        in_to_px(self.page_height_in - self.margin_top_in - self.margin_bottom_in)
    }

    /// Font used for body text
    pub fn body_font(&self) -> FontSpec {
        FontSpec::new(&self.font_family, pt_to_px(self.font_size_pt))
    }

    /// Font used for the chapter heading
    pub fn title_font(&self) -> FontSpec {
        FontSpec::new(&self.font_family, pt_to_px(self.chapter_title_font_size_pt))
    }

    /// The heading text, if one should be rendered on the first page
    pub fn shown_chapter_title(&self) -> Option<&str> {
        if !self.show_chapter_title {
            return None;
        }
        self.chapter_title
            .as_deref()
            .filter(|title| !title.trim().is_empty())
    }

    /// Apply a partial update, returning the merged config without validating it
    pub fn merged(&self, patch: &ConfigPatch) -> Self {
        let mut next = self.clone();
        macro_rules! merge {
            ($($field:ident),*) => {
                $(if let Some(value) = &patch.$field {
                    next.$field = value.clone();
                })*
            };
        }
        merge!(
            page_width_in,
            page_height_in,
            margin_top_in,
            margin_bottom_in,
            margin_left_in,
            margin_right_in,
            font_size_pt,
            font_family,
            line_height_multiplier,
            chapter_title,
            show_chapter_title,
            chapter_title_font_size_pt,
            chapter_title_padding_px
        );
        next
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PaginationError::invalid(field, "must be a positive number"))
    }
}

/// Partial config update; absent fields keep their current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigPatch {
    pub page_width_in: Option<f32>,
    pub page_height_in: Option<f32>,
    pub margin_top_in: Option<f32>,
    pub margin_bottom_in: Option<f32>,
    pub margin_left_in: Option<f32>,
    pub margin_right_in: Option<f32>,
    pub font_size_pt: Option<f32>,
    pub font_family: Option<String>,
    pub line_height_multiplier: Option<f32>,
    /// `Some(None)` clears the title; `null` in JSON does the same
    #[serde(deserialize_with = "present_or_null")]
    pub chapter_title: Option<Option<String>>,
    pub show_chapter_title: Option<bool>,
    pub chapter_title_font_size_pt: Option<f32>,
    pub chapter_title_padding_px: Option<f32>,
}

impl ConfigPatch {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn present_or_null<'de, D>(deserializer: D) -> std::result::Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_content_box() {
        let config = PaginationConfig::default();
        assert_eq!(config.content_width_px(), 624.0); // 6.5" * 96
        assert_eq!(config.content_height_px(), 864.0); // 9" * 96
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_dimensions() {
        let config = PaginationConfig {
            page_width_in: 0.0,
            ..Default::default()
        };
        assert_eq!(
            config.validate(),
            Err(PaginationError::invalid("pageWidthIn", "must be a positive number"))
        );

        let config = PaginationConfig {
            font_size_pt: -3.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PaginationConfig {
            margin_top_in: f32::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_small_line_height_and_empty_content_box() {
        let config = PaginationConfig {
            line_height_multiplier: 0.9,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = PaginationConfig {
            margin_left_in: 4.0,
            margin_right_in: 4.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_shown_chapter_title() {
        let mut config = PaginationConfig {
            chapter_title: Some("Chapter One".to_string()),
            ..Default::default()
        };
        assert_eq!(config.shown_chapter_title(), None);

        config.show_chapter_title = true;
        assert_eq!(config.shown_chapter_title(), Some("Chapter One"));

        config.chapter_title = Some("   ".to_string());
        assert_eq!(config.shown_chapter_title(), None);
    }

    #[test]
    fn test_partial_config_json_uses_defaults() {
        let config: PaginationConfig =
            serde_json::from_str(r#"{"pageWidthIn": 6, "showChapterTitle": true}"#).unwrap();
        assert_eq!(config.page_width_in, 6.0);
        assert!(config.show_chapter_title);
        assert_eq!(config.page_height_in, 11.0);
        assert_eq!(config.font_family, "Times New Roman");
    }

    #[test]
    fn test_patch_from_json() {
        let patch = ConfigPatch::from_json(r#"{"fontSizePt": 14, "chapterTitle": null}"#).unwrap();
        assert_eq!(patch.font_size_pt, Some(14.0));
        assert_eq!(patch.chapter_title, Some(None));
        assert_eq!(patch.page_width_in, None);

        let patch = ConfigPatch::from_json("{}").unwrap();
        assert!(patch.is_empty());
    }

    #[test]
    fn test_merged_keeps_absent_fields() {
        let config = PaginationConfig {
            chapter_title: Some("Prologue".to_string()),
            ..Default::default()
        };
        let patch = ConfigPatch {
            page_width_in: Some(6.0),
            ..Default::default()
        };
        let merged = config.merged(&patch);
        assert_eq!(merged.page_width_in, 6.0);
        assert_eq!(merged.chapter_title.as_deref(), Some("Prologue"));

        let clear = ConfigPatch {
            chapter_title: Some(None),
            ..Default::default()
        };
        assert_eq!(config.merged(&clear).chapter_title, None);
    }
}
