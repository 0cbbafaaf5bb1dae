//! # reportgen-renderer
//!
//! Brand-aware template rendering for market reports.
//!
//! Templates use a small placeholder / conditional language (see
//! [`template`]). Pages come from an embedded `(theme × page)` catalog, are
//! stamped with a [`BrandProfile`](reportgen_core::BrandProfile), and get a
//! generated style block spliced in at `<!-- brand-styles -->`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reportgen_core::{BrandProfile, GenerationRequest, GenerationResult};
//! use reportgen_renderer::{BrandDefaults, PageSelection, ReportContext, Renderer, Theme};
//!
//! fn render(request: &GenerationRequest, result: &GenerationResult, brand: &BrandProfile) {
//!     if let Ok(renderer) = Renderer::new(BrandDefaults::default()) {
//!         let ctx = ReportContext::new(request, result);
//!         if let Ok(pages) = renderer.render_report(&ctx, brand, Theme::Modern, &PageSelection::All) {
//!             for page in pages {
//!                 println!("{}: {} bytes", page.file_name, page.body.len());
//!             }
//!         }
//!     }
//! }
//! ```

pub mod brand;
pub mod catalog;
pub mod context;
pub mod engine;
pub mod error;
pub mod format;
pub mod template;

pub use brand::{brand_bindings, BrandDefaults, STYLE_ANCHOR};
pub use catalog::{
    select_pages, PageId, PageSelection, PageSpec, TemplateCatalog, TemplateId, Theme, ThemeFamily,
    CATALOG_VERSION,
};
pub use context::ReportContext;
pub use engine::{RenderedPage, Renderer};
pub use error::{RenderError, SyntaxErrorKind, TemplateError};
pub use template::{resolve_conditionals, substitute, Conditions, Template, Values};
