//! Text rendering utilities for container diagnostics.
//!
//! Resolution errors have to name components, interfaces and whole
//! construction chains. These helpers keep that output short and readable.

/// Renders a construction chain as a single line.
///
/// # Examples
/// ```
/// use compono_support::rendering::render_chain;
///
/// let chain = vec!["Shell", "Editor", "Workspace", "Shell"];
/// assert_eq!(render_chain(&chain), "Shell → Editor → Workspace → Shell");
/// ```
pub fn render_chain(chain: &[impl AsRef<str>]) -> String {
    chain
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(" → ")
}

/// Renders an indented bullet list, one item per line.
///
/// Every line is prefixed with `indent` spaces and a dash; an empty
/// slice renders as an empty string.
///
/// ```
/// use compono_support::rendering::render_bullets;
///
/// let rendered = render_bullets(&["FileLogger", "ConsoleLogger"], 2);
/// assert_eq!(rendered, "\n  - FileLogger\n  - ConsoleLogger");
/// ```
pub fn render_bullets(items: &[impl AsRef<str>], indent: usize) -> String {
    let pad = " ".repeat(indent);
    items
        .iter()
        .map(|item| format!("\n{pad}- {}", item.as_ref()))
        .collect()
}

/// Renders a parameter list the way a signature reads: `(A, B, C)`.
///
/// ```
/// use compono_support::rendering::render_signature;
///
/// assert_eq!(render_signature(&["Logger", "[Plugin]"]), "(Logger, [Plugin])");
///
/// let none: [&str; 0] = [];
/// assert_eq!(render_signature(&none), "()");
/// ```
pub fn render_signature(parameters: &[impl AsRef<str>]) -> String {
    let inner = parameters
        .iter()
        .map(|p| p.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    format!("({inner})")
}

/// Shortens a fully qualified type name for display.
///
/// ```
/// use compono_support::rendering::shorten_type_name;
///
/// let short = shorten_type_name("my_app::editor::document::Document");
/// assert_eq!(short, "Document");
///
/// let short = shorten_type_name("alloc::sync::Arc<dyn my_app::traits::Logger>");
/// assert_eq!(short, "Arc<dyn Logger>");
/// ```
pub fn shorten_type_name(full_name: &str) -> String {
    let mut result = String::with_capacity(full_name.len());
    let mut chars = full_name.chars().peekable();
    let mut segment = String::new();

    while let Some(ch) = chars.next() {
        match ch {
            ':' if chars.peek() == Some(&':') => {
                chars.next();
                segment.clear();
            }
            '<' | '>' | ',' | ' ' | '(' | ')' | '[' | ']' | '&' => {
                result.push_str(&segment);
                result.push(ch);
                segment.clear();
            }
            _ => segment.push(ch),
        }
    }

    result.push_str(&segment);
    result
}

/// Suggests registered names close to a requested one.
///
/// Matching is done on shortened, lower-cased names with any leading `dyn`
/// dropped: substring hits rank first, then names sharing a common prefix of
/// at least three characters. An exact match is never suggested back.
pub fn suggest_similar(requested: &str, available: &[&str], max_suggestions: usize) -> Vec<String> {
    let requested_short = comparable_name(requested);

    let mut scored: Vec<(&str, usize)> = available
        .iter()
        .filter_map(|&name| {
            let name_short = comparable_name(name);

            if name_short == requested_short {
                return None;
            }

            if name_short.contains(&requested_short) || requested_short.contains(&name_short) {
                return Some((name, 100));
            }

            let common = name_short
                .chars()
                .zip(requested_short.chars())
                .take_while(|(a, b)| a == b)
                .count();

            (common >= 3).then_some((name, common * 10))
        })
        .collect();

    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.dedup_by(|a, b| a.0 == b.0);
    scored
        .into_iter()
        .take(max_suggestions)
        .map(|(name, _)| shorten_type_name(name))
        .collect()
}

fn comparable_name(name: &str) -> String {
    let short = shorten_type_name(name);
    short.trim_start_matches("dyn ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_cycle_chain() {
        let chain = vec!["A", "B", "A"];
        assert_eq!(render_chain(&chain), "A → B → A");
    }

    #[test]
    fn render_empty_chain() {
        let chain: Vec<&str> = vec![];
        assert_eq!(render_chain(&chain), "");
    }

    #[test]
    fn bullets_respect_indent() {
        let rendered = render_bullets(&["x"], 4);
        assert_eq!(rendered, "\n    - x");
        let none: [&str; 0] = [];
        assert_eq!(render_bullets(&none, 4), "");
    }

    #[test]
    fn shorten_trait_object() {
        assert_eq!(shorten_type_name("dyn app::services::Logger"), "dyn Logger");
    }

    #[test]
    fn shorten_slices_and_references() {
        assert_eq!(
            shorten_type_name("&[alloc::sync::Arc<dyn app::Plugin>]"),
            "&[Arc<dyn Plugin>]"
        );
    }

    #[test]
    fn shorten_no_path() {
        assert_eq!(shorten_type_name("String"), "String");
    }

    #[test]
    fn suggest_close_interface_names() {
        let available = vec!["dyn app::Logger", "dyn app::LogSink", "dyn app::Database"];

        let suggestions = suggest_similar("dyn app::Loger", &available, 3);
        assert!(!suggestions.is_empty());
        assert!(suggestions.iter().any(|s| s == "dyn Logger"));
        assert!(!suggestions.iter().any(|s| s.contains("Database")));
    }

    #[test]
    fn suggest_skips_exact_match() {
        let available = vec!["dyn app::Logger"];
        assert!(suggest_similar("dyn other::Logger", &available, 3).is_empty());
    }

    #[test]
    fn suggest_no_match() {
        let available = vec!["app::Database"];
        assert!(suggest_similar("XyzAbcDef", &available, 3).is_empty());
    }
}
