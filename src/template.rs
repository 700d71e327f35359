//! Template configuration resolution.
//!
//! Stored templates are partial: any key the company never customised is
//! absent from the JSON text columns. Resolution deep-merges the stored
//! groups over the system defaults, key by key, so the renderer always
//! sees a fully-populated configuration.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::models::InvoiceTemplate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub accent: String,
    pub background: String,
    pub text: String,
    pub text_light: String,
    pub success: String,
    pub warning: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontConfig {
    pub heading: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutConfig {
    pub header_height: f64,
    pub footer_height: f64,
    pub border_radius: f64,
    pub card_padding: f64,
    pub margins: Margins,
}

/// Fully-populated rendering configuration. Construct via [`TemplateConfig::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    pub colors: ColorPalette,
    pub fonts: FontConfig,
    pub layout: LayoutConfig,
}

/// Partial counterpart of [`TemplateConfig`]: every key optional, as stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialTemplateConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<PartialColorPalette>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fonts: Option<PartialFontConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<PartialLayoutConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialColorPalette {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_light: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialFontConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PartialMargins {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialLayoutConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_padding: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margins: Option<PartialMargins>,
}

impl Default for TemplateConfig {
    /// System defaults applied for every key a stored template leaves out.
    fn default() -> Self {
        TemplateConfig {
            colors: ColorPalette {
                primary: "#1F2A44".into(),
                secondary: "#2F3640".into(),
                accent: "#D4AF37".into(),
                background: "#F9F6F1".into(),
                text: "#1F2A44".into(),
                text_light: "#2F3640".into(),
                success: "#D4AF37".into(),
                warning: "#D4AF37".into(),
                error: "#ef4444".into(),
            },
            fonts: FontConfig {
                heading: "Inter".into(),
                body: "Inter".into(),
            },
            layout: LayoutConfig {
                header_height: 50.0,
                footer_height: 30.0,
                border_radius: 8.0,
                card_padding: 12.0,
                margins: Margins {
                    top: 20.0,
                    right: 20.0,
                    bottom: 20.0,
                    left: 20.0,
                },
            },
        }
    }
}

impl TemplateConfig {
    /// Key-by-key merge of a partial configuration over the system defaults.
    pub fn resolve(partial: Option<&PartialTemplateConfig>) -> Self {
        let mut config = TemplateConfig::default();
        let Some(partial) = partial else {
            return config;
        };

        if let Some(colors) = &partial.colors {
            let c = &mut config.colors;
            merge(&mut c.primary, &colors.primary);
            merge(&mut c.secondary, &colors.secondary);
            merge(&mut c.accent, &colors.accent);
            merge(&mut c.background, &colors.background);
            merge(&mut c.text, &colors.text);
            merge(&mut c.text_light, &colors.text_light);
            merge(&mut c.success, &colors.success);
            merge(&mut c.warning, &colors.warning);
            merge(&mut c.error, &colors.error);
        }
        if let Some(fonts) = &partial.fonts {
            merge(&mut config.fonts.heading, &fonts.heading);
            merge(&mut config.fonts.body, &fonts.body);
        }
        if let Some(layout) = &partial.layout {
            let l = &mut config.layout;
            merge(&mut l.header_height, &layout.header_height);
            merge(&mut l.footer_height, &layout.footer_height);
            merge(&mut l.border_radius, &layout.border_radius);
            merge(&mut l.card_padding, &layout.card_padding);
            if let Some(margins) = &layout.margins {
                merge(&mut l.margins.top, &margins.top);
                merge(&mut l.margins.right, &margins.right);
                merge(&mut l.margins.bottom, &margins.bottom);
                merge(&mut l.margins.left, &margins.left);
            }
        }
        config
    }

    /// Decode a stored template row and resolve it against the defaults.
    /// `None` (no template at all) resolves to the full default config.
    pub fn from_template(template: Option<&InvoiceTemplate>) -> Self {
        let Some(template) = template else {
            return TemplateConfig::default();
        };
        let partial = PartialTemplateConfig {
            colors: decode_group(template.colors.as_deref(), "colors"),
            fonts: decode_group(template.fonts.as_deref(), "fonts"),
            layout: decode_group(template.layout.as_deref(), "layout"),
        };
        TemplateConfig::resolve(Some(&partial))
    }
}

fn merge<T: Clone>(target: &mut T, source: &Option<T>) {
    if let Some(value) = source {
        *target = value.clone();
    }
}

/// Decode one JSON-text config group. Earlier versions of the editor
/// sometimes double-encoded the JSON (a JSON string containing JSON), so a
/// string value is unwrapped once before deserializing. Undecodable text is
/// treated as absent rather than failing the render.
fn decode_group<T: for<'de> Deserialize<'de>>(raw: Option<&str>, group: &str) -> Option<T> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(group, error = %e, "ignoring undecodable template config group");
            return None;
        }
    };
    let value = match value {
        Value::String(inner) => match serde_json::from_str(&inner) {
            Ok(v) => v,
            Err(e) => {
                warn!(group, error = %e, "ignoring double-encoded template config group");
                return None;
            }
        },
        other => other,
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(group, error = %e, "template config group has unexpected shape");
            None
        }
    }
}

/// Serialize a partial group exactly once for storage. The storage boundary
/// always holds plain JSON text; [`decode_group`] tolerates the legacy
/// double-encoded form on read but it is never written back.
pub fn encode_group<T: Serialize>(group: &T) -> anyhow::Result<String> {
    Ok(serde_json::to_string(group)?)
}
