use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde::{Deserialize, Serialize};

/// Title used when a document has no level-1 heading near its top
pub const UNKNOWN_TITLE: &str = "Unknown Document";

/// Number of leading lines inspected for a title heading
const TITLE_SCAN_LINES: usize = 10;

/// Number of characters kept in a preview
pub const PREVIEW_CHARS: usize = 200;

/// A fetched document with its rendered HTML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentView {
    pub id: String,
    pub category: String,
    pub content: String,
    pub html_content: String,
}

/// A C# code example from the project assets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleView {
    pub id: String,
    pub content: String,
}

/// Derive a title from the first `# ` heading within the first lines of a document
pub fn derive_title(content: &str) -> String {
    content
        .split('\n')
        .take(TITLE_SCAN_LINES)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

/// The first characters of a document, with an ellipsis when truncated
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((end, _)) => format!("{}...", &content[..end]),
        None => content.to_string(),
    }
}

/// Convert markdown to HTML.
///
/// Tables, footnotes, definition lists, strikethrough and task lists are
/// enabled. Code blocks are wrapped in a `codehilite` container and keep a
/// `language-*` class for client-side highlighting.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_DEFINITION_LIST
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(markdown, options).flat_map(|event| match event {
        Event::Start(Tag::CodeBlock(kind)) => vec![
            Event::Html(CowStr::Borrowed("<div class=\"codehilite\">")),
            Event::Start(Tag::CodeBlock(kind)),
        ],
        Event::End(TagEnd::CodeBlock) => vec![
            Event::End(TagEnd::CodeBlock),
            Event::Html(CowStr::Borrowed("</div>\n")),
        ],
        other => vec![other],
    });

    let mut html_output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut html_output, parser);
    html_output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_comes_from_first_level_one_heading() {
        assert_eq!(derive_title("# UGUI Title\nbody"), "UGUI Title");
        assert_eq!(derive_title("intro\n## Sub\n#   Spaced Title  \n"), "Spaced Title");
    }

    #[test]
    fn title_falls_back_to_placeholder() {
        assert_eq!(derive_title("no heading here"), UNKNOWN_TITLE);
        assert_eq!(derive_title("#NoSpace\n"), UNKNOWN_TITLE);

        // Heading on line 11 is out of reach
        let late = format!("{}# Late\n", "line\n".repeat(10));
        assert_eq!(derive_title(&late), UNKNOWN_TITLE);
    }

    #[test]
    fn preview_truncates_on_char_boundaries() {
        let short = "Canvas";
        assert_eq!(preview(short), "Canvas");

        let long = "画".repeat(PREVIEW_CHARS + 5);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert_eq!(p.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn render_supports_tables_and_code() {
        let html = render_markdown("| a | b |\n|---|---|\n| 1 | 2 |\n\n```csharp\nvar x = 1;\n```\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<div class=\"codehilite\">"));
        assert!(html.contains("language-csharp"));
    }
}
