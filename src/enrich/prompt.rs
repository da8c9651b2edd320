//! Prompt construction, response parsing and fallback values for enrichment.

use crate::model::{SourceDetails, TrendingItem};

pub const SUMMARY_MARKER: &str = "SUMMARY:";
pub const TRENDING_MARKER: &str = "TRENDING:";
pub const FALLBACK_REASON: &str = "Trending in the AI/ML community.";

const FALLBACK_SUMMARY_CHARS: usize = 100;
const MAX_CONTEXT_TOPICS: usize = 5;

/// Summary + trending rationale for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub summary: String,
    pub trending_reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("marker {0} missing")]
    MissingMarker(&'static str),
    #[error("marker {0} appears more than once")]
    DuplicateMarker(&'static str),
    #[error("field for {0} is empty")]
    EmptyField(&'static str),
}

/// Source-aware context lines for the prompt.
pub fn build_context(item: &TrendingItem) -> String {
    let mut lines: Vec<String> = Vec::new();
    match &item.details {
        SourceDetails::Repository {
            stars,
            stars_today,
            language,
            topics,
            ..
        } => {
            lines.push(format!(
                "GitHub repository with {} stars (+{} today)",
                with_thousands(*stars),
                stars_today
            ));
            if let Some(lang) = language {
                lines.push(format!("Language: {lang}"));
            }
            if !topics.is_empty() {
                let shown: Vec<&str> = topics
                    .iter()
                    .take(MAX_CONTEXT_TOPICS)
                    .map(String::as_str)
                    .collect();
                lines.push(format!("Topics: {}", shown.join(", ")));
            }
        }
        SourceDetails::Paper { upvotes } => {
            lines.push(format!("Research paper with {upvotes} upvotes"));
            if let Some(at) = item.published_at {
                lines.push(format!("Published: {}", at.format("%Y-%m-%d")));
            }
        }
        SourceDetails::Space { likes, sdk } => {
            lines.push(format!("Hugging Face Space with {likes} likes"));
            if let Some(sdk) = sdk {
                lines.push(format!("SDK: {sdk}"));
            }
        }
        SourceDetails::Collection { item_count } => {
            if *item_count > 0 {
                lines.push(format!("Curated GitHub collection of {item_count} items"));
            } else {
                lines.push("Curated GitHub collection".to_string());
            }
        }
    }
    lines.join("\n")
}

pub fn build_prompt(item: &TrendingItem) -> String {
    let context = build_context(item);
    format!(
        "You are analyzing trending AI/ML content. Generate:\n\
         \n\
         1. A single concise sentence (max 15 words) summarizing what this project/paper/space does\n\
         2. A brief explanation (2-3 sentences) of why it's trending and what makes it exciting or innovative\n\
         \n\
         Project: {name}\n\
         Description: {description}\n\
         Context: {context}\n\
         \n\
         Format your response as:\n\
         {SUMMARY_MARKER} [one sentence]\n\
         {TRENDING_MARKER} [2-3 sentences explaining why it's trending and what's new/exciting]",
        name = item.name,
        description = item.description,
    )
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Summary,
    Trending,
}

/// Strict two-field parser. Text after a marker accumulates over following
/// non-empty lines until the next marker; lines before the first marker are
/// ignored. Missing, repeated or empty fields are errors.
pub fn parse_response(text: &str) -> Result<Enrichment, ParseError> {
    let mut summary: Option<String> = None;
    let mut trending: Option<String> = None;
    let mut current: Option<Section> = None;

    for line in text.lines().map(str::trim) {
        if let Some(rest) = line.strip_prefix(SUMMARY_MARKER) {
            if summary.is_some() {
                return Err(ParseError::DuplicateMarker(SUMMARY_MARKER));
            }
            summary = Some(rest.trim().to_string());
            current = Some(Section::Summary);
        } else if let Some(rest) = line.strip_prefix(TRENDING_MARKER) {
            if trending.is_some() {
                return Err(ParseError::DuplicateMarker(TRENDING_MARKER));
            }
            trending = Some(rest.trim().to_string());
            current = Some(Section::Trending);
        } else if !line.is_empty() {
            let target = match current {
                Some(Section::Summary) => summary.as_mut(),
                Some(Section::Trending) => trending.as_mut(),
                None => None,
            };
            if let Some(buf) = target {
                if !buf.is_empty() {
                    buf.push(' ');
                }
                buf.push_str(line);
            }
        }
    }

    let summary = summary.ok_or(ParseError::MissingMarker(SUMMARY_MARKER))?;
    let trending = trending.ok_or(ParseError::MissingMarker(TRENDING_MARKER))?;
    if summary.is_empty() {
        return Err(ParseError::EmptyField(SUMMARY_MARKER));
    }
    if trending.is_empty() {
        return Err(ParseError::EmptyField(TRENDING_MARKER));
    }
    Ok(Enrichment {
        summary,
        trending_reason: trending,
    })
}

/// Deterministic values used whenever generation or parsing fails.
pub fn fallback(item: &TrendingItem) -> Enrichment {
    let desc = item.description.trim();
    let summary = if desc.is_empty() {
        item.name.clone()
    } else if desc.chars().count() > FALLBACK_SUMMARY_CHARS {
        let cut: String = desc.chars().take(FALLBACK_SUMMARY_CHARS).collect();
        format!("{cut}...")
    } else {
        desc.to_string()
    };
    Enrichment {
        summary,
        trending_reason: FALLBACK_REASON.to_string(),
    }
}

/// `12345` -> `"12,345"`.
pub fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
