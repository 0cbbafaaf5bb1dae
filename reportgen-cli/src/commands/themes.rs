//! `reportgen themes`: the theme catalog.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use reportgen_renderer::{Theme, ThemeFamily, CATALOG_VERSION};

#[derive(Args, Debug)]
pub struct ThemesArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ThemeJson {
    name: &'static str,
    family: &'static str,
    description: &'static str,
    pages: Vec<PageJson>,
}

#[derive(Serialize)]
struct PageJson {
    slug: &'static str,
    required: bool,
}

#[derive(Tabled)]
struct ThemeRow {
    #[tabled(rename = "theme")]
    name: &'static str,
    #[tabled(rename = "family")]
    family: &'static str,
    #[tabled(rename = "pages")]
    pages: String,
    #[tabled(rename = "description")]
    description: &'static str,
}

impl ThemesArgs {
    pub fn run(self) -> Result<()> {
        if self.json {
            let themes: Vec<ThemeJson> = Theme::all().iter().map(|t| to_json(*t)).collect();
            println!("{}", serde_json::to_string_pretty(&themes)?);
            return Ok(());
        }

        let rows: Vec<ThemeRow> = Theme::all()
            .iter()
            .map(|t| ThemeRow {
                name: t.name(),
                family: family_name(t.family()),
                pages: page_list(*t),
                description: t.description(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("catalog v{CATALOG_VERSION}; * marks required pages");
        Ok(())
    }
}

fn family_name(family: ThemeFamily) -> &'static str {
    match family {
        ThemeFamily::Full => "full",
        ThemeFamily::Compact => "compact",
    }
}

fn page_list(theme: Theme) -> String {
    theme
        .pages()
        .iter()
        .take(theme.page_count())
        .map(|p| {
            if p.required {
                format!("{}*", p.id.slug())
            } else {
                p.id.slug().to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_json(theme: Theme) -> ThemeJson {
    ThemeJson {
        name: theme.name(),
        family: family_name(theme.family()),
        description: theme.description(),
        pages: theme
            .pages()
            .iter()
            .take(theme.page_count())
            .map(|p| PageJson {
                slug: p.id.slug(),
                required: p.required,
            })
            .collect(),
    }
}
