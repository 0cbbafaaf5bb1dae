//! Subcommands plus the request and output flags they share.

pub mod config;
pub mod generate;
pub mod render;
pub mod themes;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use reportgen_core::config::load_brand_profile;
use reportgen_core::{BrandProfile, DeliveryIntents, GenerationRequest, GeoScope, Settings};
use reportgen_renderer::{BrandDefaults, PageId, PageSelection, RenderedPage, Renderer, Theme};

use super::{AudienceArg, KindArg};

// ---------------------------------------------------------------------------
// Request flags
// ---------------------------------------------------------------------------

/// What to report on.
#[derive(Args, Debug)]
pub struct RequestArgs {
    /// Named market area, e.g. "Austin".
    #[arg(long, conflicts_with = "zip", required_unless_present = "zip")]
    pub area: Option<String>,

    /// Comma-separated 5-digit postal codes.
    #[arg(long, value_delimiter = ',')]
    pub zip: Vec<String>,

    /// Report kind: market_snapshot, new_listings, closed_sales, price_changes,
    /// open_houses, inventory.
    #[arg(long, short = 'k', default_value = "market_snapshot")]
    pub kind: KindArg,

    /// Lookback window in days.
    #[arg(long, default_value_t = 30)]
    pub lookback: u32,

    /// Audience preset, e.g. first_time_buyers or luxury.
    #[arg(long)]
    pub audience: Option<AudienceArg>,

    /// Delivery options: browse, document, social, email.
    #[arg(long, value_delimiter = ',', default_value = "browse")]
    pub deliver: Vec<String>,

    /// Email recipient; repeat for several. Requires `--deliver email`.
    #[arg(long = "email")]
    pub recipients: Vec<String>,
}

impl RequestArgs {
    pub fn build(&self) -> Result<GenerationRequest> {
        let scope = match &self.area {
            Some(area) => GeoScope::area(area.clone()),
            None => GeoScope::postal_codes(self.zip.iter().map(|z| z.trim().to_string())),
        };
        let mut request = GenerationRequest::new(self.kind.0, scope);
        request.lookback_days = self.lookback;
        request.audience = self.audience.map(|a| a.0);
        request.delivery = delivery_intents(&self.deliver)?;
        request.recipients = self.recipients.clone();
        request.normalize_recipients();
        request.validate().context("invalid report request")?;
        Ok(request)
    }
}

fn delivery_intents(options: &[String]) -> Result<DeliveryIntents> {
    let mut intents = DeliveryIntents::default();
    for option in options {
        match option.trim().to_ascii_lowercase().as_str() {
            "browse" => intents.browse = true,
            "document" | "pdf" => intents.document = true,
            "social" | "social_image" => intents.social_image = true,
            "email" => intents.email = true,
            "" => {}
            other => bail!("unknown delivery option '{other}'; expected browse, document, social, email"),
        }
    }
    Ok(intents)
}

// ---------------------------------------------------------------------------
// Output flags
// ---------------------------------------------------------------------------

/// How and where to render.
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Theme to render with (see `reportgen themes`).
    #[arg(long, short = 't', default_value = "classic")]
    pub theme: Theme,

    /// Comma-separated page slugs; required pages are always included.
    #[arg(long, value_delimiter = ',')]
    pub pages: Vec<PageId>,

    /// Directory the rendered pages are written to.
    #[arg(long, short = 'o', default_value = "report")]
    pub out: PathBuf,

    /// Brand profile YAML; overrides `brand.profile_path` in config.
    #[arg(long)]
    pub brand: Option<PathBuf>,

    /// Directory of `<theme>/<page>.html` template overrides.
    #[arg(long)]
    pub templates: Option<PathBuf>,
}

impl OutputArgs {
    pub fn selection(&self) -> PageSelection {
        if self.pages.is_empty() {
            PageSelection::All
        } else {
            PageSelection::Only(self.pages.clone())
        }
    }

    pub fn renderer(&self, settings: &Settings) -> Result<Renderer> {
        let defaults = BrandDefaults::from(&settings.brand);
        match &self.templates {
            Some(dir) => Renderer::with_overrides(dir, defaults)
                .with_context(|| format!("failed to load template overrides from '{}'", dir.display())),
            None => Renderer::new(defaults).context("failed to load built-in templates"),
        }
    }

    /// Local brand profile path, if one is configured.
    pub fn brand_path(&self, settings: &Settings) -> Option<PathBuf> {
        self.brand
            .clone()
            .or_else(|| settings.brand.profile_path.clone())
    }

    pub fn local_brand(&self, settings: &Settings) -> Result<BrandProfile> {
        match self.brand_path(settings) {
            Some(path) => load_brand_profile(&path)
                .with_context(|| format!("failed to load brand profile '{}'", path.display())),
            None => Ok(BrandProfile::default()),
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub fn load_settings() -> Result<Settings> {
    reportgen_core::config::load().context("failed to load ~/.reportgen/config.yaml")
}

/// Write each page atomically (`.tmp` sibling, then rename) and return the
/// final paths in page order.
pub fn write_pages(dir: &Path, pages: &[RenderedPage]) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create output directory '{}'", dir.display()))?;
    let mut written = Vec::with_capacity(pages.len());
    for page in pages {
        let path = dir.join(&page.file_name);
        let tmp = path.with_extension("html.tmp");
        fs::write(&tmp, &page.body)
            .with_context(|| format!("failed to write '{}'", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to move '{}' into place", path.display()))?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn delivery_options_are_case_insensitive() {
        let intents =
            delivery_intents(&["Browse".into(), "PDF".into(), "social".into()]).unwrap();
        assert!(intents.browse && intents.document && intents.social_image);
        assert!(!intents.email);
        assert!(delivery_intents(&["fax".into()]).is_err());
    }

    #[test]
    fn pages_are_written_in_order() {
        let dir = TempDir::new().unwrap();
        let pages = vec![
            RenderedPage {
                page: PageId::Cover,
                file_name: "01-cover.html".into(),
                body: "<p>cover</p>".into(),
            },
            RenderedPage {
                page: PageId::AgentContact,
                file_name: "02-agent_contact.html".into(),
                body: "<p>contact</p>".into(),
            },
        ];
        let out = dir.path().join("nested").join("report");
        let written = write_pages(&out, &pages).unwrap();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "<p>contact</p>");
        assert!(!out.join("01-cover.html.tmp").exists());
    }
}
