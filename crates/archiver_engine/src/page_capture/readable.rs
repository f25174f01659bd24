use scraper::{ElementRef, Html, Selector};

const EXCERPT_CHARS: usize = 240;

/// Reader view of a captured page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadablePage {
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub markdown: String,
    pub word_count: u32,
}

/// Lightweight "readability-like" extraction:
/// - `<title>` text, falling back to the first `<h1>`
/// - `<article>` if present, otherwise `<body>`, otherwise the whole document
/// - the first non-empty paragraph of that container as excerpt
pub fn extract_readable(html: &str) -> ReadablePage {
    let doc = Html::parse_document(html);

    let title = first_text(&doc, "title").or_else(|| first_text(&doc, "h1"));

    let container = select_first(&doc, "article").or_else(|| select_first(&doc, "body"));
    let content_html = match container {
        Some(node) => node.inner_html(),
        None => doc.root_element().html(),
    };

    let excerpt = container.and_then(|node| {
        let sel = Selector::parse("p").ok()?;
        node.select(&sel)
            .map(|p| collapse_whitespace(&p.text().collect::<String>()))
            .find(|text| !text.is_empty())
            .map(|text| truncate_chars(&text, EXCERPT_CHARS))
    });

    let markdown = html2md::parse_html(&content_html).trim().to_string();
    let word_count = markdown.split_whitespace().count() as u32;

    ReadablePage {
        title,
        excerpt,
        markdown,
        word_count,
    }
}

/// `readable.md`: front-matter describing the capture, then the Markdown body.
pub fn build_readable_document(url: &str, page: &ReadablePage, captured_utc: &str) -> String {
    format!(
        "---\nurl: {url}\ntitle: {title}\ncaptured_utc: {captured_utc}\nword_count: {words}\n---\n\n{body}\n",
        title = page.title.as_deref().unwrap_or("untitled"),
        words = page.word_count,
        body = page.markdown,
    )
}

/// Body of a document written by [`build_readable_document`], without its front-matter.
pub fn strip_frontmatter(markdown: &str) -> &str {
    if let Some(rest) = markdown.strip_prefix("---\n") {
        if let Some(idx) = rest.find("\n---") {
            let after = &rest[idx + "\n---".len()..];
            return after.trim_start_matches('\n');
        }
    }
    markdown
}

fn select_first<'a>(doc: &'a Html, selector: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(selector).ok()?;
    doc.select(&sel).next()
}

fn first_text(doc: &Html, selector: &str) -> Option<String> {
    select_first(doc, selector)
        .map(|node| collapse_whitespace(&node.text().collect::<String>()))
        .filter(|text| !text.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn prefers_article_and_reads_title() {
        let html = r#"
        <html><head><title> Title </title></head>
        <body>
            <nav>Menu</nav>
            <article><h1>Heading</h1><p>Body   text</p></article>
        </body></html>
        "#;
        let page = extract_readable(html);
        assert_eq!(page.title.as_deref(), Some("Title"));
        assert_eq!(page.excerpt.as_deref(), Some("Body text"));
        assert!(page.markdown.contains("Heading"));
        assert!(!page.markdown.contains("Menu"));
    }

    #[test]
    fn falls_back_to_h1_for_title() {
        let page = extract_readable("<body><h1>Only heading</h1><p>x</p></body>");
        assert_eq!(page.title.as_deref(), Some("Only heading"));
    }

    #[test]
    fn paragraphs_become_markdown_blocks() {
        let page = extract_readable(
            "<html><body><article><p>A</p><p>B</p></article></body></html>",
        );
        assert_eq!(page.markdown, "A\n\nB");
        assert_eq!(page.word_count, 2);
    }

    #[test]
    fn long_excerpts_are_truncated_on_char_boundaries() {
        let text = "\u{e9}".repeat(EXCERPT_CHARS + 10);
        let page = extract_readable(&format!("<body><p>{text}</p></body>"));
        let excerpt = page.excerpt.unwrap();
        assert!(excerpt.ends_with("..."));
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 3);
    }

    #[test]
    fn readable_document_round_trips_through_strip() {
        let page = ReadablePage {
            title: Some("T".into()),
            excerpt: None,
            markdown: "hello world".into(),
            word_count: 2,
        };
        let doc = build_readable_document("https://example.com", &page, "2024-01-01T00:00:00Z");
        assert!(doc.contains("word_count: 2"));
        assert_eq!(strip_frontmatter(&doc), "hello world\n");
    }

    #[test]
    fn malformed_frontmatter_is_left_alone() {
        let markdown = "---\nkey: value\nbody\n";
        assert_eq!(strip_frontmatter(markdown), markdown);
    }
}
