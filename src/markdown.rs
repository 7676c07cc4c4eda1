//! Markdown to HTML with highlighted code blocks.
//!
//! Every code block is handed to a [`Highlighter`] together with its
//! language tag. Blocks without a tag (including indented blocks) are
//! highlighted as [`DEFAULT_LANGUAGE`], so README pages and static markdown
//! pages render code identically.
//!
//! # Example
//!
//! ```
//! use mwsite::markdown::render;
//!
//! let html = render("```js\nlet a = 1\n```", &|code: &str, lang: &str| {
//!     format!("[{}] {}", lang, code)
//! });
//! assert!(html.contains("[js] let a = 1"));
//! ```

use pulldown_cmark::{html, CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use std::collections::HashMap;
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::{SyntaxReference, SyntaxSet};
use syntect::util::LinesWithEndings;
use tracing::warn;

/// Language used for code blocks that declare none.
pub const DEFAULT_LANGUAGE: &str = "txt";

/// Turns source code into highlighted HTML.
///
/// Implementations must escape the code they return.
pub trait Highlighter: Send + Sync {
    fn highlight(&self, code: &str, language: &str) -> String;
}

impl<F> Highlighter for F
where
    F: Fn(&str, &str) -> String + Send + Sync,
{
    fn highlight(&self, code: &str, language: &str) -> String {
        self(code, language)
    }
}

/// [`Highlighter`] backed by syntect's bundled grammars.
///
/// Output uses CSS classes (`<span class="source js">`) rather than inline
/// styles. Unknown languages are rendered as plain text.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
}

impl SyntectHighlighter {
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    fn syntax_for(&self, language: &str) -> &SyntaxReference {
        self.syntaxes
            .find_syntax_by_token(language)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }
}

impl Default for SyntectHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, code: &str, language: &str) -> String {
        let syntax = self.syntax_for(language);
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);

        for line in LinesWithEndings::from(code) {
            if let Err(e) = generator.parse_html_for_line_which_includes_newline(line) {
                warn!("Highlighting {} block failed: {}", language, e);
                return escape_html(code);
            }
        }
        generator.finalize()
    }
}

/// Rendering switches that differ between READMEs and site pages.
#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Give each heading an `id` slug so it can be linked to.
    pub heading_ids: bool,
}

/// Renders markdown with default options.
pub fn render(markdown: &str, highlighter: &dyn Highlighter) -> String {
    render_with(markdown, highlighter, RenderOptions::default())
}

pub fn render_with(markdown: &str, highlighter: &dyn Highlighter, options: RenderOptions) -> String {
    let mut parser_options = Options::empty();
    parser_options.insert(Options::ENABLE_TABLES);
    parser_options.insert(Options::ENABLE_STRIKETHROUGH);
    parser_options.insert(Options::ENABLE_TASKLISTS);
    parser_options.insert(Options::ENABLE_FOOTNOTES);

    let mut pipeline = Pipeline::new(highlighter, options);
    for event in Parser::new_ext(markdown, parser_options) {
        pipeline.push(event);
    }

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, pipeline.events.into_iter());
    out
}

struct CodeBuffer {
    declared: String,
    source: String,
}

struct HeadingBuffer<'a> {
    start: Tag<'a>,
    inner: Vec<Event<'a>>,
    text: String,
}

/// Rewrites the parser's event stream: code blocks collapse into one
/// highlighted HTML event, headings optionally gain ids.
struct Pipeline<'a, 'h> {
    highlighter: &'h dyn Highlighter,
    options: RenderOptions,
    events: Vec<Event<'a>>,
    code: Option<CodeBuffer>,
    heading: Option<HeadingBuffer<'a>>,
    slugs: HashMap<String, usize>,
}

impl<'a, 'h> Pipeline<'a, 'h> {
    fn new(highlighter: &'h dyn Highlighter, options: RenderOptions) -> Self {
        Self {
            highlighter,
            options,
            events: Vec::new(),
            code: None,
            heading: None,
            slugs: HashMap::new(),
        }
    }

    fn push(&mut self, event: Event<'a>) {
        if let Some(code) = self.code.as_mut() {
            match event {
                Event::Text(text) => code.source.push_str(&text),
                Event::End(TagEnd::CodeBlock) => {
                    if let Some(code) = self.code.take() {
                        let html = self.highlight_block(&code);
                        self.events.push(Event::Html(html.into()));
                    }
                }
                _ => {}
            }
            return;
        }

        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let declared = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().unwrap_or("").to_string()
                    }
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some(CodeBuffer {
                    declared,
                    source: String::new(),
                });
            }
            Event::Start(start @ Tag::Heading { .. }) if self.options.heading_ids => {
                self.heading = Some(HeadingBuffer {
                    start,
                    inner: Vec::new(),
                    text: String::new(),
                });
            }
            Event::End(TagEnd::Heading(level)) if self.heading.is_some() => {
                if let Some(heading) = self.heading.take() {
                    self.flush_heading(heading, level);
                }
            }
            event => match self.heading.as_mut() {
                Some(heading) => {
                    if let Event::Text(text) | Event::Code(text) = &event {
                        heading.text.push_str(text);
                    }
                    heading.inner.push(event);
                }
                None => self.events.push(event),
            },
        }
    }

    fn highlight_block(&self, code: &CodeBuffer) -> String {
        let language = if code.declared.is_empty() {
            DEFAULT_LANGUAGE
        } else {
            code.declared.as_str()
        };
        let highlighted = self.highlighter.highlight(&code.source, language);

        if code.declared.is_empty() {
            format!("<pre><code>{}</code></pre>\n", highlighted)
        } else {
            format!(
                "<pre><code class=\"language-{}\">{}</code></pre>\n",
                escape_html(&code.declared),
                highlighted
            )
        }
    }

    fn flush_heading(&mut self, heading: HeadingBuffer<'a>, level: pulldown_cmark::HeadingLevel) {
        let start = match heading.start {
            Tag::Heading {
                level,
                id: None,
                classes,
                attrs,
            } => {
                let slug = self.unique_slug(&heading.text);
                Tag::Heading {
                    level,
                    id: Some(CowStr::from(slug)),
                    classes,
                    attrs,
                }
            }
            other => other,
        };

        self.events.push(Event::Start(start));
        self.events.extend(heading.inner);
        self.events.push(Event::End(TagEnd::Heading(level)));
    }

    fn unique_slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let count = self.slugs.entry(base.clone()).or_insert(0);
        let slug = if *count == 0 {
            base
        } else {
            format!("{}-{}", base, count)
        };
        *count += 1;
        slug
    }
}

/// Lowercases `text`, drops punctuation and turns whitespace into `-`.
pub fn slugify(text: &str) -> String {
    text.trim()
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('-')
            } else if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else {
                None
            }
        })
        .collect()
}

/// Escapes text for use in HTML content and double-quoted attributes.
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every highlighter invocation.
    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, String)>>,
    }

    impl Highlighter for Recorder {
        fn highlight(&self, code: &str, language: &str) -> String {
            self.calls
                .lock()
                .unwrap()
                .push((code.to_string(), language.to_string()));
            format!("<hl lang={}>{}</hl>", language, escape_html(code))
        }
    }

    impl Recorder {
        fn calls(&self) -> Vec<(String, String)> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[test]
    fn test_declared_language_is_passed_through() {
        let recorder = Recorder::default();
        let html = render("```js\nconst a = 1\n```\n", &recorder);

        assert_eq!(
            recorder.calls(),
            vec![("const a = 1\n".to_string(), "js".to_string())]
        );
        assert!(html.contains("<pre><code class=\"language-js\"><hl lang=js>"));
    }

    #[test]
    fn test_missing_language_defaults_to_txt() {
        let recorder = Recorder::default();
        render("```\nplain\n```\n\n    indented\n", &recorder);

        let languages: Vec<String> = recorder.calls().into_iter().map(|(_, l)| l).collect();
        assert_eq!(languages, vec!["txt", "txt"]);
    }

    #[test]
    fn test_info_string_uses_first_word() {
        let recorder = Recorder::default();
        render("```ts title=\"app.ts\"\nx\n```\n", &recorder);
        assert_eq!(recorder.calls()[0].1, "ts");
    }

    #[test]
    fn test_plain_markdown_never_invokes_highlighter() {
        let recorder = Recorder::default();
        let html = render("# Title\n\nSome *text* and `inline` code.\n", &recorder);

        assert!(recorder.calls().is_empty());
        assert_eq!(
            html,
            "<h1>Title</h1>\n<p>Some <em>text</em> and <code>inline</code> code.</p>\n"
        );
    }

    #[test]
    fn test_closure_highlighter() {
        let html = render("```rs\nfn main() {}\n```", &|code: &str, lang: &str| {
            format!("{}:{}", lang, code.trim())
        });
        assert!(html.contains("rs:fn main() {}"));
    }

    #[test]
    fn test_heading_ids_disabled_by_default() {
        let html = render("## Usage\n", &Recorder::default());
        assert_eq!(html, "<h2>Usage</h2>\n");
    }

    #[test]
    fn test_heading_ids_are_unique_slugs() {
        let options = RenderOptions { heading_ids: true };
        let html = render_with(
            "# Getting Started\n\n## API: `use()`\n\n## Getting Started\n",
            &Recorder::default(),
            options,
        );

        assert!(html.contains("<h1 id=\"getting-started\">Getting Started</h1>"));
        assert!(html.contains("<h2 id=\"api-use\">API: <code>use()</code></h2>"));
        assert!(html.contains("<h2 id=\"getting-started-1\">Getting Started</h2>"));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  req.query  "), "reqquery");
        assert_eq!(slugify("snake_case-name"), "snake_case-name");
    }

    #[test]
    fn test_syntect_highlighter_escapes_and_classes() {
        let highlighter = SyntectHighlighter::new();
        let html = highlighter.highlight("let a = \"<b>\";\n", "js");
        assert!(html.contains("<span class="));
        assert!(html.contains("&lt;b&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_syntect_unknown_language_falls_back_to_plain_text() {
        let highlighter = SyntectHighlighter::new();
        let html = highlighter.highlight("a < b\n", "no-such-language");
        assert!(html.contains("a &lt; b"));
    }
}
