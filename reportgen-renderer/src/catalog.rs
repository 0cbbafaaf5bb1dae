//! Template catalog: themes, pages, and the embedded page templates.
//!
//! # Themes
//!
//! | Theme      | Family  | Pages                                              |
//! |------------|---------|----------------------------------------------------|
//! | `classic`  | full    | cover, summary, trends, inventory, area, contact   |
//! | `modern`   | full    | same six                                           |
//! | `luxe`     | full    | same six                                           |
//! | `compact`  | compact | cover, summary, contact                            |
//! | `postcard` | compact | cover, contact                                     |
//! | `social`   | compact | social tile                                        |
//!
//! Each page template is a theme layout with a shared page body spliced in at
//! `<!-- page-body -->`. Everything is baked in with `include_str!`; a
//! directory of `<theme>/<page>.html` files may override individual entries.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{io_err, RenderError};
use crate::template::Template;

/// Bumped whenever an embedded template changes shape.
pub const CATALOG_VERSION: &str = "3";

const PAGE_BODY_MARKER: &str = "<!-- page-body -->";

// ---------------------------------------------------------------------------
// Embedded templates
// ---------------------------------------------------------------------------

const LAYOUTS: &[(Theme, &str)] = &[
    (Theme::Classic, include_str!("templates/layouts/classic.html")),
    (Theme::Modern, include_str!("templates/layouts/modern.html")),
    (Theme::Luxe, include_str!("templates/layouts/luxe.html")),
    (Theme::Compact, include_str!("templates/layouts/compact.html")),
    (Theme::Postcard, include_str!("templates/layouts/postcard.html")),
    (Theme::Social, include_str!("templates/layouts/social.html")),
];

const PAGES: &[(PageId, &str)] = &[
    (PageId::Cover, include_str!("templates/pages/cover.html")),
    (PageId::MarketSummary, include_str!("templates/pages/market_summary.html")),
    (PageId::PriceTrends, include_str!("templates/pages/price_trends.html")),
    (PageId::Inventory, include_str!("templates/pages/inventory.html")),
    (PageId::Neighborhood, include_str!("templates/pages/neighborhood.html")),
    (PageId::AgentContact, include_str!("templates/pages/agent_contact.html")),
    (PageId::SocialTile, include_str!("templates/pages/social_tile.html")),
];

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PageId {
    Cover,
    MarketSummary,
    PriceTrends,
    Inventory,
    Neighborhood,
    AgentContact,
    SocialTile,
}

impl PageId {
    pub fn all() -> &'static [PageId] {
        &[
            PageId::Cover,
            PageId::MarketSummary,
            PageId::PriceTrends,
            PageId::Inventory,
            PageId::Neighborhood,
            PageId::AgentContact,
            PageId::SocialTile,
        ]
    }

    pub fn slug(&self) -> &'static str {
        match self {
            PageId::Cover => "cover",
            PageId::MarketSummary => "market_summary",
            PageId::PriceTrends => "price_trends",
            PageId::Inventory => "inventory",
            PageId::Neighborhood => "neighborhood",
            PageId::AgentContact => "agent_contact",
            PageId::SocialTile => "social_tile",
        }
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for PageId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PageId::all()
            .iter()
            .copied()
            .find(|p| p.slug() == s)
            .ok_or_else(|| format!("unknown page '{s}'"))
    }
}

/// One page slot in a theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSpec {
    pub id: PageId,
    pub required: bool,
}

const fn required(id: PageId) -> PageSpec {
    PageSpec { id, required: true }
}

const fn optional(id: PageId) -> PageSpec {
    PageSpec { id, required: false }
}

const FULL_PAGES: &[PageSpec] = &[
    required(PageId::Cover),
    required(PageId::MarketSummary),
    optional(PageId::PriceTrends),
    optional(PageId::Inventory),
    optional(PageId::Neighborhood),
    required(PageId::AgentContact),
];

const COMPACT_PAGES: &[PageSpec] = &[
    required(PageId::Cover),
    required(PageId::MarketSummary),
    optional(PageId::AgentContact),
];

const POSTCARD_PAGES: &[PageSpec] = &[required(PageId::Cover), required(PageId::AgentContact)];

const SOCIAL_PAGES: &[PageSpec] = &[required(PageId::SocialTile)];

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ThemeFamily {
    Full,
    Compact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Theme {
    #[default]
    Classic,
    Modern,
    Luxe,
    Compact,
    Postcard,
    Social,
}

impl Theme {
    pub fn all() -> &'static [Theme] {
        &[
            Theme::Classic,
            Theme::Modern,
            Theme::Luxe,
            Theme::Compact,
            Theme::Postcard,
            Theme::Social,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Classic => "classic",
            Theme::Modern => "modern",
            Theme::Luxe => "luxe",
            Theme::Compact => "compact",
            Theme::Postcard => "postcard",
            Theme::Social => "social",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Theme::Classic => "Serif letter-size report",
            Theme::Modern => "Sans-serif report with full-bleed color bands",
            Theme::Luxe => "Dark high-contrast report for premium listings",
            Theme::Compact => "Three-page summary",
            Theme::Postcard => "Two-sided 6x4 mailer",
            Theme::Social => "Single square image card",
        }
    }

    pub fn family(&self) -> ThemeFamily {
        match self {
            Theme::Classic | Theme::Modern | Theme::Luxe => ThemeFamily::Full,
            Theme::Compact | Theme::Postcard | Theme::Social => ThemeFamily::Compact,
        }
    }

    pub fn is_compact(&self) -> bool {
        self.family() == ThemeFamily::Compact
    }

    /// Page slots in print order.
    pub fn pages(&self) -> &'static [PageSpec] {
        match self {
            Theme::Classic | Theme::Modern | Theme::Luxe => FULL_PAGES,
            Theme::Compact => COMPACT_PAGES,
            Theme::Postcard => POSTCARD_PAGES,
            Theme::Social => SOCIAL_PAGES,
        }
    }

    /// Declared number of pages a complete artifact of this theme has.
    pub fn page_count(&self) -> usize {
        match self {
            Theme::Classic | Theme::Modern | Theme::Luxe => 6,
            Theme::Compact => 3,
            Theme::Postcard => 2,
            Theme::Social => 1,
        }
    }

    pub fn has_page(&self, page: PageId) -> bool {
        self.pages().iter().any(|p| p.id == page)
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Theme::all()
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| format!("unknown theme '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Page selection
// ---------------------------------------------------------------------------

/// Which pages a caller wants rendered.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PageSelection {
    /// The full page set, clamped to what the theme supports.
    #[default]
    All,
    Only(Vec<PageId>),
}

/// Resolve a selection against a theme, in the theme's page order.
///
/// `All` yields exactly the theme's declared page count. `Only` always keeps
/// required pages and silently drops pages the theme does not have.
pub fn select_pages(theme: Theme, selection: &PageSelection) -> Vec<PageId> {
    let pages = theme.pages().iter();
    match selection {
        PageSelection::All => pages.take(theme.page_count()).map(|p| p.id).collect(),
        PageSelection::Only(wanted) => pages
            .filter(|p| p.required || wanted.contains(&p.id))
            .map(|p| p.id)
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Key of one template in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateId {
    pub theme: Theme,
    pub page: PageId,
}

impl TemplateId {
    pub fn new(theme: Theme, page: PageId) -> Self {
        Self { theme, page }
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.theme, self.page)
    }
}

#[derive(Debug, Clone)]
struct Entry {
    source: String,
    template: Template,
}

/// Parsed `(theme × page)` templates.
#[derive(Debug, Clone)]
pub struct TemplateCatalog {
    entries: BTreeMap<TemplateId, Entry>,
    overridden: Vec<TemplateId>,
}

impl TemplateCatalog {
    /// Every embedded template, parsed.
    pub fn builtin() -> Result<Self, RenderError> {
        let mut entries = BTreeMap::new();
        for &(theme, layout) in LAYOUTS {
            for spec in theme.pages() {
                let id = TemplateId::new(theme, spec.id);
                let source = compose(layout, page_body(spec.id));
                entries.insert(id, parse_entry(id, source)?);
            }
        }
        Ok(Self {
            entries,
            overridden: Vec::new(),
        })
    }

    /// Embedded templates with overrides loaded from `dir`.
    ///
    /// Files are matched as `<theme>/<page>.html`; other extensions are
    /// ignored. A missing directory means no overrides.
    pub fn with_overrides(dir: &Path) -> Result<Self, RenderError> {
        let mut catalog = Self::builtin()?;
        if !dir.exists() {
            return Ok(catalog);
        }
        let mut files = Vec::new();
        collect_template_files(dir, &mut files)?;
        files.sort();
        for path in files {
            if path.extension().and_then(|s| s.to_str()) != Some("html") {
                continue;
            }
            let rel = path.strip_prefix(dir).unwrap_or(path.as_path());
            let id = override_id(rel)
                .filter(|id| catalog.entries.contains_key(id))
                .ok_or_else(|| RenderError::UnknownOverride { path: path.clone() })?;
            let source = std::fs::read_to_string(&path)
                .map_err(|e| io_err(&path, e))?
                .replace("\r\n", "\n");
            catalog.entries.insert(id, parse_entry(id, source)?);
            catalog.overridden.push(id);
        }
        Ok(catalog)
    }

    pub fn version(&self) -> &'static str {
        CATALOG_VERSION
    }

    pub fn get(&self, id: TemplateId) -> Option<&Template> {
        self.entries.get(&id).map(|e| &e.template)
    }

    /// Raw template text as stored.
    pub fn source(&self, id: TemplateId) -> Option<&str> {
        self.entries.get(&id).map(|e| e.source.as_str())
    }

    pub fn ids(&self) -> impl Iterator<Item = TemplateId> + '_ {
        self.entries.keys().copied()
    }

    /// Ids replaced by files from an override directory.
    pub fn overridden(&self) -> &[TemplateId] {
        &self.overridden
    }
}

fn page_body(page: PageId) -> &'static str {
    PAGES
        .iter()
        .find(|(id, _)| *id == page)
        .map_or("", |(_, body)| body)
}

fn compose(layout: &str, body: &str) -> String {
    layout.replacen(PAGE_BODY_MARKER, body.trim_end(), 1)
}

fn parse_entry(id: TemplateId, source: String) -> Result<Entry, RenderError> {
    let template = Template::parse(&source).map_err(|source| RenderError::Template {
        id: id.to_string(),
        source,
    })?;
    Ok(Entry { source, template })
}

fn override_id(rel: &Path) -> Option<TemplateId> {
    let mut parts = rel.iter().map(|p| p.to_str());
    let theme = parts.next()??.to_lowercase().parse().ok()?;
    let file = parts.next()??;
    if parts.next().is_some() {
        return None;
    }
    let page = file.strip_suffix(".html")?.to_lowercase().parse().ok()?;
    Some(TemplateId::new(theme, page))
}

fn collect_template_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), RenderError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let path = entry.path();
        let meta = entry.metadata().map_err(|e| io_err(&path, e))?;
        if meta.is_dir() {
            collect_template_files(&path, out)?;
        } else if meta.is_file() {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
