//! SVG Compositor - Avatar Markup and Data URIs
//!
//! CRITICAL: render always merges over the catalog default and normalizes.
//! A rendered avatar never shows a rule-breaking combination.

use base64::Engine as _;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::avatar::{AvatarConfig, TraitCategory};
use crate::catalog::TraitCatalog;
use crate::rules::{sanitize, Resolver};

pub const DEFAULT_RENDER_SIZE: u32 = 256;

const SVG_URI_PREFIX: &str = "data:image/svg+xml";
const INK: &str = "1a1a1a";
const FALLBACK_SKIN: &str = "f2d3b1";
const FALLBACK_HAIR_COLOR: &str = "0e0e0e";
const FALLBACK_CLOTHING: &str = "456dff";
const FALLBACK_BACKGROUND: &str = "ffffff";

/// Characters `encodeURIComponent` leaves alone.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No drawing for {category} = {value}")]
    MissingAsset { category: TraitCategory, value: String },

    #[error("Invalid color for {category}: {value}")]
    InvalidColor { category: TraitCategory, value: String },

    #[error("Render size must be positive, got {0}")]
    InvalidSize(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UriEncoding {
    #[default]
    Utf8,
    Base64,
}

impl fmt::Display for UriEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UriEncoding::Utf8 => f.write_str("utf8"),
            UriEncoding::Base64 => f.write_str("base64"),
        }
    }
}

impl FromStr for UriEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(UriEncoding::Utf8),
            "base64" => Ok(UriEncoding::Base64),
            other => Err(format!("unknown URI encoding: {}", other)),
        }
    }
}

/// Wrap SVG markup as a data URI.
pub fn data_uri(svg: &str, encoding: UriEncoding) -> String {
    match encoding {
        UriEncoding::Utf8 => format!(
            "{};utf8,{}",
            SVG_URI_PREFIX,
            utf8_percent_encode(svg, URI_COMPONENT)
        ),
        UriEncoding::Base64 => format!(
            "{};base64,{}",
            SVG_URI_PREFIX,
            base64::engine::general_purpose::STANDARD.encode(svg)
        ),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    size: u32,
    encoding: UriEncoding,
}

impl Compositor {
    pub fn new(size: u32, encoding: UriEncoding) -> Result<Self, RenderError> {
        if size == 0 {
            return Err(RenderError::InvalidSize(size));
        }
        Ok(Self { size, encoding })
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn encoding(&self) -> UriEncoding {
        self.encoding
    }

    /// Markup for `config` merged over the catalog default and normalized.
    /// Uncataloged traits fall back to the default like missing ones.
    pub fn render_svg(
        &self,
        catalog: &TraitCatalog,
        resolver: &Resolver,
        config: &AvatarConfig,
    ) -> Result<String, RenderError> {
        let merged = sanitize(catalog, config).merged_over(&catalog.default_config());
        self.compose(&resolver.normalize(catalog, &merged))
    }

    pub fn render(
        &self,
        catalog: &TraitCatalog,
        resolver: &Resolver,
        config: &AvatarConfig,
    ) -> Result<String, RenderError> {
        let svg = self.render_svg(catalog, resolver, config)?;
        Ok(data_uri(&svg, self.encoding))
    }

    /// Draw a finalized config as-is. Absent shape traits are skipped.
    pub fn compose(&self, config: &AvatarConfig) -> Result<String, RenderError> {
        let skin = color(config, TraitCategory::SkinTone, FALLBACK_SKIN)?;
        let hair_color = color(config, TraitCategory::HairColor, FALLBACK_HAIR_COLOR)?;
        let clothing = color(config, TraitCategory::ClothingColor, FALLBACK_CLOTHING)?;
        let background = color(config, TraitCategory::BackgroundColor, FALLBACK_BACKGROUND)?;

        let mut svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100" width="{0}" height="{0}">"#,
            self.size
        );

        if let Some(shape) = config.text(TraitCategory::BackgroundShape) {
            let inner = asset(TraitCategory::BackgroundShape, shape, background_shape(shape))?;
            svg.push_str(&group(&format!(r##"fill="#{}""##, background), inner));
        }

        svg.push_str(&format!(
            r##"<rect x="44" y="58" width="12" height="16" fill="#{}"/>"##,
            skin
        ));

        if let Some(body) = config.text(TraitCategory::Body) {
            let inner = asset(TraitCategory::Body, body, body_shape(body))?;
            svg.push_str(&group(&format!(r##"fill="#{}""##, clothing), inner));
        }

        svg.push_str(&format!(
            r##"<ellipse cx="50" cy="42" rx="20" ry="23" fill="#{}"/>"##,
            skin
        ));

        if let Some(hair) = config.text(TraitCategory::Hair) {
            let inner = asset(TraitCategory::Hair, hair, hair_shape(hair))?;
            svg.push_str(&group(&format!(r##"fill="#{}""##, hair_color), inner));
        }

        let face_style = format!(
            r##"fill="#{0}" stroke="#{0}" stroke-width="1.5" stroke-linecap="round""##,
            INK
        );
        if let Some(eyes) = config.text(TraitCategory::Eyes) {
            let mut inner = asset(TraitCategory::Eyes, eyes, eye_shape(eyes))?.to_string();
            if config.flag(TraitCategory::Lashes) == Some(true) {
                inner.push_str(LASHES);
            }
            svg.push_str(&group(&face_style, &inner));
        }

        if let Some(mouth) = config.text(TraitCategory::Mouth) {
            let inner = asset(TraitCategory::Mouth, mouth, mouth_shape(mouth))?;
            svg.push_str(&group(&face_style, inner));
        }

        if let Some(hat) = config.text(TraitCategory::Hat) {
            svg.push_str(asset(TraitCategory::Hat, hat, hat_shape(hat))?);
        }

        svg.push_str("</svg>");
        Ok(svg)
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self {
            size: DEFAULT_RENDER_SIZE,
            encoding: UriEncoding::Utf8,
        }
    }
}

/// Render with the default compositor.
pub fn render(catalog: &TraitCatalog, config: &AvatarConfig) -> Result<String, RenderError> {
    Compositor::default().render(catalog, &Resolver::new(), config)
}

fn group(attrs: &str, inner: &str) -> String {
    if inner.is_empty() {
        return String::new();
    }
    format!("<g {}>{}</g>", attrs, inner)
}

fn asset<'a>(
    category: TraitCategory,
    value: &str,
    shape: Option<&'a str>,
) -> Result<&'a str, RenderError> {
    shape.ok_or_else(|| RenderError::MissingAsset {
        category,
        value: value.to_string(),
    })
}

fn color<'a>(
    config: &'a AvatarConfig,
    category: TraitCategory,
    fallback: &'a str,
) -> Result<&'a str, RenderError> {
    let value = config.text(category).unwrap_or(fallback);
    let valid = matches!(value.len(), 3 | 6) && value.bytes().all(|b| b.is_ascii_hexdigit());
    if !valid {
        return Err(RenderError::InvalidColor {
            category,
            value: value.to_string(),
        });
    }
    Ok(value)
}

// --- Drawings (viewBox 0 0 100 100, head centered at 50,42) ---

const LASHES: &str =
    r#"<path d="M39 38 L37 36 M42 37 L42 34 M45 38 L47 36 M55 38 L53 36 M58 37 L58 34 M61 38 L63 36" fill="none"/>"#;

fn background_shape(shape: &str) -> Option<&'static str> {
    Some(match shape {
        "circle" => r#"<circle cx="50" cy="50" r="50"/>"#,
        "square" => r#"<rect width="100" height="100"/>"#,
        "squircle" => r#"<rect width="100" height="100" rx="24"/>"#,
        _ => return None,
    })
}

fn body_shape(body: &str) -> Option<&'static str> {
    Some(match body {
        "chest" => r#"<path d="M18 100 C18 80 32 72 50 72 C68 72 82 80 82 100 Z"/>"#,
        "breasts" => concat!(
            r#"<path d="M18 100 C18 80 32 72 50 72 C68 72 82 80 82 100 Z"/>"#,
            r##"<path d="M36 88 Q42 94 48 88 M52 88 Q58 94 64 88" fill="none" stroke="#000000" stroke-opacity="0.25" stroke-width="1.5"/>"##
        ),
        _ => return None,
    })
}

fn hair_shape(hair: &str) -> Option<&'static str> {
    Some(match hair {
        "pixie" => r#"<path d="M29 40 C28 22 40 15 52 16 C64 17 72 25 71 40 C66 30 58 26 46 27 C38 28 32 33 29 40 Z"/>"#,
        "long" => r#"<path d="M29 40 C28 20 40 14 50 14 C62 14 72 22 71 40 L74 78 L64 78 L66 42 C60 30 40 30 34 42 L36 78 L26 78 Z"/>"#,
        "bob" => r#"<path d="M28 42 C27 20 40 14 50 14 C62 14 73 20 72 42 L72 60 L64 60 L66 40 C58 30 42 30 34 40 L36 60 L28 60 Z"/>"#,
        "buzzcut" => r#"<path d="M31 36 C33 22 42 18 50 18 C58 18 67 22 69 36 C62 28 38 28 31 36 Z"/>"#,
        "curly" => concat!(
            r#"<circle cx="34" cy="28" r="8"/><circle cx="44" cy="21" r="8"/>"#,
            r#"<circle cx="56" cy="21" r="8"/><circle cx="66" cy="28" r="8"/>"#,
            r#"<circle cx="30" cy="38" r="6"/><circle cx="70" cy="38" r="6"/>"#
        ),
        "bun" => r#"<circle cx="50" cy="12" r="8"/><path d="M30 38 C30 22 40 17 50 17 C60 17 70 22 70 38 C62 28 38 28 30 38 Z"/>"#,
        "mohawk" => r#"<path d="M45 30 L47 8 L53 8 L55 30 Z"/>"#,
        "bald" => "",
        _ => return None,
    })
}

fn eye_shape(eyes: &str) -> Option<&'static str> {
    Some(match eyes {
        "open" => r#"<circle cx="42" cy="42" r="2.5"/><circle cx="58" cy="42" r="2.5"/>"#,
        "happy" => r#"<path d="M38 43 Q42 38 46 43 M54 43 Q58 38 62 43" fill="none"/>"#,
        "sleepy" => r#"<path d="M38 42 L46 42 M54 42 L62 42" fill="none"/>"#,
        "wink" => r#"<circle cx="42" cy="42" r="2.5"/><path d="M54 43 Q58 38 62 43" fill="none"/>"#,
        _ => return None,
    })
}

fn mouth_shape(mouth: &str) -> Option<&'static str> {
    Some(match mouth {
        "openSmile" => r##"<path d="M42 52 Q50 62 58 52 Z" fill="#ffffff"/>"##,
        "lips" => r##"<path d="M43 54 Q50 50 57 54 Q50 60 43 54 Z" fill="#c2455a" stroke="none"/>"##,
        "smile" => r#"<path d="M43 53 Q50 59 57 53" fill="none"/>"#,
        "smirk" => r#"<path d="M44 55 Q52 57 57 51" fill="none"/>"#,
        "surprised" => r#"<ellipse cx="50" cy="55" rx="3" ry="4"/>"#,
        _ => return None,
    })
}

fn hat_shape(hat: &str) -> Option<&'static str> {
    Some(match hat {
        "none" => "",
        "hijab" => r##"<path d="M26 44 C26 16 40 12 50 12 C60 12 74 16 74 44 L76 74 C66 80 34 80 24 74 Z M34 44 C34 58 42 64 50 64 C58 64 66 58 66 44 C66 32 58 26 50 26 C42 26 34 32 34 44 Z" fill-rule="evenodd" fill="#5b6c8f"/>"##,
        "beanie" => concat!(
            r##"<path d="M29 34 C29 16 40 10 50 10 C60 10 71 16 71 34 Z" fill="#e24553"/>"##,
            r##"<rect x="27" y="31" width="46" height="7" rx="3" fill="#b8323f"/>"##,
            r##"<circle cx="50" cy="9" r="4" fill="#e24553"/>"##
        ),
        "turban" => concat!(
            r##"<path d="M27 36 C25 14 40 8 50 8 C60 8 75 14 73 36 C64 28 36 28 27 36 Z" fill="#f3b63a"/>"##,
            r##"<path d="M38 14 Q50 26 62 14" fill="none" stroke="#c98f1f" stroke-width="2"/>"##
        ),
        "cap" => concat!(
            r##"<path d="M30 32 C30 16 40 12 50 12 C60 12 70 16 70 32 Z" fill="#456dff"/>"##,
            r##"<path d="M50 30 L82 30 Q82 35 76 35 L50 35 Z" fill="#2f4fd1"/>"##
        ),
        _ => return None,
    })
}
