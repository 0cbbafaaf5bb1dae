//! [`Renderer`]: catalog lookup, brand injection, and whole-report rendering.
//!
//! Rendering is a pure function of its inputs. A `Renderer` holds only the
//! parsed catalog, brand defaults, and the style template, none of which
//! change after construction, so one instance can serve concurrent callers.

use std::path::Path;

use reportgen_core::BrandProfile;

use crate::brand::{brand_bindings, splice_styles, BrandDefaults, Palette, StyleSheet};
use crate::catalog::{select_pages, PageId, PageSelection, TemplateCatalog, TemplateId, Theme};
use crate::context::ReportContext;
use crate::error::RenderError;
use crate::template::{Conditions, Values};

/// One rendered page of a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    pub page: PageId,
    /// `01-cover.html`, `02-market_summary.html`, ...
    pub file_name: String,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct Renderer {
    catalog: TemplateCatalog,
    defaults: BrandDefaults,
    styles: StyleSheet,
}

impl Renderer {
    /// Renderer over the embedded catalog.
    pub fn new(defaults: BrandDefaults) -> Result<Self, RenderError> {
        Self::with_catalog(TemplateCatalog::builtin()?, defaults)
    }

    /// Renderer over the embedded catalog plus overrides from `dir`.
    pub fn with_overrides(dir: &Path, defaults: BrandDefaults) -> Result<Self, RenderError> {
        Self::with_catalog(TemplateCatalog::with_overrides(dir)?, defaults)
    }

    pub fn with_catalog(catalog: TemplateCatalog, defaults: BrandDefaults) -> Result<Self, RenderError> {
        Ok(Self {
            catalog,
            defaults,
            styles: StyleSheet::new()?,
        })
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn defaults(&self) -> &BrandDefaults {
        &self.defaults
    }

    /// Render one catalog template: resolve its blocks and substitute values.
    pub fn render(
        &self,
        id: TemplateId,
        values: &Values,
        conditions: &Conditions,
    ) -> Result<String, RenderError> {
        let template = self
            .catalog
            .get(id)
            .ok_or(RenderError::UnknownTemplate(id))?;
        template
            .render(values, conditions)
            .map_err(|source| RenderError::Template {
                id: id.to_string(),
                source,
            })
    }

    /// [`render`](Self::render) with brand values and conditions layered
    /// under the caller's, then the brand style block spliced in.
    pub fn render_branded(
        &self,
        id: TemplateId,
        brand: &BrandProfile,
        values: &Values,
        conditions: &Conditions,
    ) -> Result<String, RenderError> {
        let (mut all_values, mut all_conditions) = brand_bindings(brand, &self.defaults);
        all_values.extend(values);
        all_conditions.extend(conditions);

        let body = self.render(id, &all_values, &all_conditions)?;
        let styles = self.styles.render(&Palette::resolve(brand, &self.defaults))?;
        Ok(splice_styles(&body, &styles))
    }

    /// Render every selected page of `theme` for one report.
    pub fn render_report(
        &self,
        context: &ReportContext,
        brand: &BrandProfile,
        theme: Theme,
        selection: &PageSelection,
    ) -> Result<Vec<RenderedPage>, RenderError> {
        let pages = select_pages(theme, selection);
        let count = pages.len();
        pages
            .into_iter()
            .enumerate()
            .map(|(index, page)| self.render_numbered(context, brand, theme, page, index, count))
            .collect()
    }

    /// Render a single page of `theme`, numbered as it would be in the full
    /// report. Fails with `UnknownTemplate` when the theme has no such page.
    pub fn render_page(
        &self,
        context: &ReportContext,
        brand: &BrandProfile,
        theme: Theme,
        page: PageId,
    ) -> Result<RenderedPage, RenderError> {
        let pages = select_pages(theme, &PageSelection::All);
        let index = pages
            .iter()
            .position(|p| *p == page)
            .ok_or(RenderError::UnknownTemplate(TemplateId::new(theme, page)))?;
        self.render_numbered(context, brand, theme, page, index, pages.len())
    }

    fn render_numbered(
        &self,
        context: &ReportContext,
        brand: &BrandProfile,
        theme: Theme,
        page: PageId,
        index: usize,
        count: usize,
    ) -> Result<RenderedPage, RenderError> {
        let mut values = context.values().clone();
        values
            .insert("theme_name", theme.name())
            .insert("page_slug", page.slug())
            .insert("page_number", (index + 1).to_string())
            .insert("page_count", count.to_string());

        let body = self.render_branded(
            TemplateId::new(theme, page),
            brand,
            &values,
            context.conditions(),
        )?;
        Ok(RenderedPage {
            page,
            file_name: format!("{:02}-{}.html", index + 1, page.slug()),
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
