use regex::Regex;
use scraper::{Html, Selector};

use crate::error::ParseError;
use crate::pipeline::sanitize::sanitize_label;

const TITLE_PATTERN: &str =
    r"^NeuroVault: sub-(?P<subject>\d\d)_ses-(?P<session>\d\d)_(?P<title>.*)";

/// Bytes reserved for `sessNN-` and the extension when capping the label.
const LABEL_RESERVE: usize = 32;

/// What a metadata page says before the title is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    pub asset_url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub id: u64,
    pub asset_url: String,
    /// Two-digit subject code, as written in the title.
    pub subject: String,
    /// Two-digit session code, as written in the title.
    pub session: String,
    /// Path-safe label.
    pub title: String,
}

pub fn parse_page(html: &str, meta_name: &str) -> Result<PageMeta, ParseError> {
    let document = Html::parse_document(html);

    // Selector syntax can't be trusted with arbitrary names, so match by hand.
    let meta_selector = Selector::parse("meta").expect("static selector");
    let title_selector = Selector::parse("title").expect("static selector");

    let asset_url = document
        .select(&meta_selector)
        .find(|el| el.value().attr("name") == Some(meta_name))
        .and_then(|el| el.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ParseError::MissingAsset {
            name: meta_name.to_string(),
        })?;

    let title = document
        .select(&title_selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .ok_or(ParseError::MissingTitle)?;

    Ok(PageMeta { asset_url, title })
}

#[derive(Debug, Clone)]
pub struct TitlePattern {
    regex: Regex,
}

impl Default for TitlePattern {
    fn default() -> Self {
        TitlePattern {
            regex: Regex::new(TITLE_PATTERN).expect("title pattern compiles"),
        }
    }
}

impl TitlePattern {
    pub fn extract(&self, id: u64, page: PageMeta) -> Result<MetadataRecord, ParseError> {
        let caps = self
            .regex
            .captures(&page.title)
            .ok_or_else(|| ParseError::TitleMismatch {
                title: page.title.clone(),
            })?;

        let label = sanitize_label(&caps["title"], LABEL_RESERVE).ok_or_else(|| {
            ParseError::UnsafeTitle {
                title: page.title.clone(),
            }
        })?;

        Ok(MetadataRecord {
            id,
            asset_url: page.asset_url,
            subject: caps["subject"].to_string(),
            session: caps["session"].to_string(),
            title: label,
        })
    }
}
