//! Brand injection: values, conditions, and the generated style block derived
//! from a [`BrandProfile`].

use serde::Serialize;
use tera::{escape_html, Tera};

use reportgen_core::config::{
    is_hex_color, BrandSettings, DEFAULT_ACCENT_COLOR, DEFAULT_PRIMARY_COLOR, DEFAULT_PRODUCT_NAME,
};
use reportgen_core::BrandProfile;

use crate::error::RenderError;
use crate::template::{Conditions, Values};

/// Where the generated `<style>` block goes. Bodies without it are left alone.
pub const STYLE_ANCHOR: &str = "<!-- brand-styles -->";

const STYLE_TEMPLATE_NAME: &str = "brand_styles.css";
const STYLE_TEMPLATE: &str = include_str!("templates/brand_styles.css.tera");

/// Placeholders every brand binding fills.
pub const BRAND_PLACEHOLDERS: &[&str] = &[
    "brand_name",
    "product_name",
    "primary_color",
    "accent_color",
    "text_on_primary",
    "logo_url",
    "footer_logo_url",
    "photo_url",
    "website_url",
    "website_label",
    "contact_html",
];

/// Conditions every brand binding sets.
pub const BRAND_CONDITIONS: &[&str] = &[
    "has_logo",
    "has_footer_logo",
    "has_photo",
    "has_website",
    "has_contact",
];

/// Product-level fallbacks for fields a profile leaves empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrandDefaults {
    pub product_name: String,
    pub primary_color: String,
    pub accent_color: String,
}

impl Default for BrandDefaults {
    fn default() -> Self {
        Self {
            product_name: DEFAULT_PRODUCT_NAME.to_string(),
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
            accent_color: DEFAULT_ACCENT_COLOR.to_string(),
        }
    }
}

impl From<&BrandSettings> for BrandDefaults {
    fn from(settings: &BrandSettings) -> Self {
        Self {
            product_name: settings.product_name.clone(),
            primary_color: settings.primary_color.clone(),
            accent_color: settings.accent_color.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Palette
// ---------------------------------------------------------------------------

/// Resolved colors for one profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Palette {
    pub primary: String,
    pub accent: String,
    pub on_primary: String,
}

impl Palette {
    /// Profile colors when they are valid hex, otherwise the defaults.
    pub fn resolve(profile: &BrandProfile, defaults: &BrandDefaults) -> Self {
        let primary = pick_color(profile.primary_color.as_deref(), &defaults.primary_color);
        let accent = pick_color(profile.accent_color.as_deref(), &defaults.accent_color);
        let on_primary = text_on(&primary).to_string();
        Self {
            primary,
            accent,
            on_primary,
        }
    }
}

fn pick_color(candidate: Option<&str>, fallback: &str) -> String {
    match candidate.map(str::trim) {
        Some(c) if is_hex_color(c) => c.to_lowercase(),
        _ => fallback.to_lowercase(),
    }
}

/// Dark or light text, whichever reads better on `background`.
fn text_on(background: &str) -> &'static str {
    match relative_luminance(background) {
        Some(l) if l > 0.45 => "#111111",
        _ => "#ffffff",
    }
}

fn relative_luminance(hex: &str) -> Option<f64> {
    let digits = hex.strip_prefix('#')?;
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |i: usize| -> Option<f64> {
        let v = u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok()? as f64 / 255.0;
        Some(if v <= 0.039_28 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        })
    };
    Some(0.2126 * channel(0)? + 0.7152 * channel(2)? + 0.0722 * channel(4)?)
}

// ---------------------------------------------------------------------------
// Bindings
// ---------------------------------------------------------------------------

/// Values and conditions for every brand placeholder. Text is HTML-escaped.
pub fn brand_bindings(profile: &BrandProfile, defaults: &BrandDefaults) -> (Values, Conditions) {
    let palette = Palette::resolve(profile, defaults);
    let name = present(profile.display_name.as_deref()).unwrap_or(defaults.product_name.as_str());
    let logo = present(profile.logo_url.as_deref());
    let footer_logo = present(profile.footer_logo_url.as_deref());
    let photo = present(profile.photo_url.as_deref());
    let website = present(profile.website_url.as_deref());
    let contact: Vec<String> = profile
        .contact_lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(escape_html)
        .collect();

    let mut values = Values::new();
    values
        .insert("brand_name", escape_html(name))
        .insert("product_name", escape_html(&defaults.product_name))
        .insert("primary_color", palette.primary)
        .insert("accent_color", palette.accent)
        .insert("text_on_primary", palette.on_primary)
        .insert("logo_url", escape_html(logo.unwrap_or_default()))
        .insert("footer_logo_url", escape_html(footer_logo.unwrap_or_default()))
        .insert("photo_url", escape_html(photo.unwrap_or_default()))
        .insert("website_url", escape_html(website.unwrap_or_default()))
        .insert("website_label", escape_html(&website_label(website.unwrap_or_default())))
        .insert("contact_html", contact.join("<br>"));

    let conditions = Conditions::new()
        .with("has_logo", logo.is_some())
        .with("has_footer_logo", footer_logo.is_some())
        .with("has_photo", photo.is_some())
        .with("has_website", website.is_some())
        .with("has_contact", !contact.is_empty());

    (values, conditions)
}

fn present(field: Option<&str>) -> Option<&str> {
    field.map(str::trim).filter(|s| !s.is_empty())
}

fn website_label(url: &str) -> String {
    let bare = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    bare.trim_end_matches('/').to_string()
}

// ---------------------------------------------------------------------------
// Style block
// ---------------------------------------------------------------------------

/// Tera template producing the `<style>` block for a [`Palette`].
#[derive(Debug, Clone)]
pub struct StyleSheet {
    tera: Tera,
}

impl StyleSheet {
    pub fn new() -> Result<Self, RenderError> {
        let mut tera = Tera::default();
        tera.add_raw_template(STYLE_TEMPLATE_NAME, STYLE_TEMPLATE)?;
        Ok(Self { tera })
    }

    pub fn render(&self, palette: &Palette) -> Result<String, RenderError> {
        let ctx = tera::Context::from_serialize(palette)?;
        Ok(self.tera.render(STYLE_TEMPLATE_NAME, &ctx)?)
    }
}

/// Replace the first [`STYLE_ANCHOR`] in `body` with `styles`.
pub fn splice_styles(body: &str, styles: &str) -> String {
    body.replacen(STYLE_ANCHOR, styles.trim_end(), 1)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> BrandProfile {
        BrandProfile {
            display_name: Some("Hill Country <Realty>".into()),
            primary_color: Some("#FFFFFF".into()),
            accent_color: Some("teal".into()),
            logo_url: Some("https://cdn.example.com/logo.png".into()),
            footer_logo_url: Some("   ".into()),
            photo_url: None,
            contact_lines: vec!["Dana Ortiz".into(), "".into(), "512-555-0100".into()],
            website_url: Some("https://hillcountry.example.com/".into()),
        }
    }

    #[test]
    fn bindings_cover_every_brand_name() {
        let (values, conditions) = brand_bindings(&profile(), &BrandDefaults::default());
        for name in BRAND_PLACEHOLDERS {
            assert!(values.get(name).is_some(), "missing value {name}");
        }
        for name in BRAND_CONDITIONS {
            assert!(conditions.get(name).is_some(), "missing condition {name}");
        }
    }

    #[test]
    fn bindings_escape_and_fall_back() {
        let (values, conditions) = brand_bindings(&profile(), &BrandDefaults::default());
        assert_eq!(values.get("brand_name"), Some("Hill Country &lt;Realty&gt;"));
        assert_eq!(values.get("primary_color"), Some("#ffffff"));
        assert_eq!(values.get("accent_color"), Some(DEFAULT_ACCENT_COLOR));
        assert_eq!(values.get("text_on_primary"), Some("#111111"));
        assert_eq!(values.get("contact_html"), Some("Dana Ortiz<br>512-555-0100"));
        assert_eq!(values.get("website_label"), Some("hillcountry.example.com"));
        assert_eq!(conditions.get("has_logo"), Some(true));
        assert_eq!(conditions.get("has_footer_logo"), Some(false));
        assert_eq!(conditions.get("has_photo"), Some(false));
        assert_eq!(conditions.get("has_contact"), Some(true));
    }

    #[test]
    fn bindings_escape_quotes_and_slashes() {
        let mut profile = profile();
        profile.display_name = Some(r#"Tom & Jo's "Best" Homes"#.into());
        profile.contact_lines = vec!["<b>Dana</b>".into()];
        let (values, _) = brand_bindings(&profile, &BrandDefaults::default());
        assert_eq!(
            values.get("brand_name"),
            Some("Tom &amp; Jo&#x27;s &quot;Best&quot; Homes")
        );
        assert_eq!(values.get("contact_html"), Some("&lt;b&gt;Dana&lt;&#x2F;b&gt;"));
        assert_eq!(
            values.get("logo_url"),
            Some("https:&#x2F;&#x2F;cdn.example.com&#x2F;logo.png")
        );
    }

    #[test]
    fn empty_profile_uses_product_defaults() {
        let defaults = BrandDefaults {
            product_name: "Acme Reports".into(),
            primary_color: "#000".into(),
            accent_color: "#abc".into(),
        };
        let (values, conditions) = brand_bindings(&BrandProfile::default(), &defaults);
        assert_eq!(values.get("brand_name"), Some("Acme Reports"));
        assert_eq!(values.get("primary_color"), Some("#000"));
        assert_eq!(values.get("text_on_primary"), Some("#ffffff"));
        assert!(BRAND_CONDITIONS
            .iter()
            .all(|name| conditions.get(name) == Some(false)));
    }

    #[test]
    fn style_block_carries_palette() {
        let sheet = StyleSheet::new().expect("stylesheet");
        let palette = Palette::resolve(&profile(), &BrandDefaults::default());
        let css = sheet.render(&palette).expect("render");
        assert!(css.contains("--brand-primary: #ffffff;"));
        assert!(css.contains(&format!("--brand-accent: {DEFAULT_ACCENT_COLOR};")));
        assert!(!css.contains("{{"));
    }

    #[test]
    fn splice_replaces_anchor_once_and_ignores_missing() {
        let body = format!("<head>{STYLE_ANCHOR}</head>");
        assert_eq!(splice_styles(&body, "<style></style>\n"), "<head><style></style></head>");
        assert_eq!(splice_styles("<p>plain</p>", "<style></style>"), "<p>plain</p>");
    }
}
