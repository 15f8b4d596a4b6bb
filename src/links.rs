//! Source paths → public site links.
//!
//! Only files under a `src/content/<category>/` tree with a known category have
//! a public page; everything else is dropped from the formatted list.

use crate::models::RetrievedSource;

const CONTENT_MARKER: &str = "src/content/";
const CATEGORIES: &[&str] = &["posts", "projects", "experiences", "books", "recipes"];

/// Public URL for a content file, or an empty string when it has none.
///
/// `/site/src/content/posts/post-2025-06-23.mdx` → `<base>/posts/post-2025-06-23`
pub fn convert_source_to_url(source_path: &str, base_url: &str) -> String {
    let normalized = source_path.replace('\\', "/");
    let Some(pos) = normalized.find(CONTENT_MARKER) else {
        return String::new();
    };
    let relative = strip_markdown_ext(&normalized[pos + CONTENT_MARKER.len()..]);

    for category in CATEGORIES {
        if let Some(slug) = relative
            .strip_prefix(category)
            .and_then(|rest| rest.strip_prefix('/'))
        {
            if slug.is_empty() {
                return String::new();
            }
            return format!("{}/{}/{}", base_url.trim_end_matches('/'), category, slug);
        }
    }

    String::new()
}

/// Human-readable label for a content file.
pub fn display_name(source_path: &str) -> String {
    let normalized = source_path.replace('\\', "/");
    let filename = normalized.rsplit('/').next().unwrap_or(&normalized);
    let stem = strip_markdown_ext(filename);
    let lower = stem.to_lowercase();

    if stem.starts_with("post-") {
        "Blog Post".to_string()
    } else if lower.contains("manaburn") {
        "ManaBurn Experience".to_string()
    } else if lower.contains("myndsens") {
        "Myndsens Experience".to_string()
    } else if lower.contains("stealth") {
        "Stealth Startup Experience".to_string()
    } else if lower.contains("chatbot") {
        "AI Chatbot Project".to_string()
    } else {
        title_case(&stem.replace('-', " "))
    }
}

/// Markdown block of clickable source links, or `""` when none are linkable.
///
/// Sources are de-duplicated by path; the first occurrence keeps its place.
pub fn format_links(sources: &[RetrievedSource], base_url: &str) -> String {
    let mut seen: Vec<&str> = Vec::new();
    let mut entries = Vec::new();

    for source in sources {
        let path = source.source_path.as_str();
        if path.is_empty() || seen.contains(&path) {
            continue;
        }
        seen.push(path);

        let url = convert_source_to_url(path, base_url);
        if url.is_empty() {
            continue;
        }
        entries.push(format!(
            "• <a href=\"{}\" target=\"_blank\">{}</a>",
            url,
            display_name(path)
        ));
    }

    if entries.is_empty() {
        return String::new();
    }
    format!("\n\n**Sources:**\n{}", entries.join("\n"))
}

fn strip_markdown_ext(s: &str) -> &str {
    s.strip_suffix(".mdx")
        .or_else(|| s.strip_suffix(".md"))
        .unwrap_or(s)
}

/// Uppercase the first letter of each alphabetic run, lowercase the rest.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_alpha = false;
    for c in s.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}
