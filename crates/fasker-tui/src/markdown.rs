//! Markdown to styled terminal lines for bot replies.
//!
//! Parsing is left to `pulldown-cmark`; this module only walks its event
//! stream and maps each tag onto a ratatui style. Top-level blocks are
//! separated by one blank line.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

fn code_style() -> Style {
    Style::default().fg(Color::Green)
}

fn dim_style() -> Style {
    Style::default().fg(Color::DarkGray)
}

fn marker_style() -> Style {
    Style::default().fg(Color::Yellow)
}

fn heading_style(level: HeadingLevel) -> Style {
    let style = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 | HeadingLevel::H2 => {
            style.fg(Color::Cyan).add_modifier(Modifier::UNDERLINED)
        }
        _ => style,
    }
}

fn link_style() -> Style {
    Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED)
}

/// Render a whole reply into display lines.
pub fn render_markdown(text: &str) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = Renderer::default();
    for event in Parser::new_ext(text, options) {
        renderer.event(event);
    }
    renderer.finish()
}

#[derive(Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    // Inline styles, innermost last; the effective style patches them in order
    styles: Vec<Style>,
    // One entry per open list: next number for ordered lists
    lists: Vec<Option<u64>>,
    // Destination shown after each open link, if any
    links: Vec<Option<String>>,
    quote_depth: usize,
    code_block: Option<String>,
}

impl Renderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => match self.code_block.as_mut() {
                Some(code) => code.push_str(&text),
                None => self.push_styled(text.to_string(), self.style()),
            },
            Event::Code(code) => {
                let style = self.style().patch(code_style());
                self.push_styled(code.to_string(), style);
            }
            Event::Html(html) => {
                for (i, part) in html.lines().enumerate() {
                    if i > 0 {
                        self.flush_line();
                    }
                    self.push_styled(part.to_string(), self.style());
                }
                if html.ends_with('\n') {
                    self.flush_line();
                }
            }
            Event::FootnoteReference(name) => {
                self.push_styled(format!("[^{}]", name), dim_style());
            }
            Event::SoftBreak | Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.block_gap();
                self.lines
                    .push(Line::from(Span::styled("─".repeat(40), dim_style())));
            }
            Event::TaskListMarker(done) => {
                let marker = if done { "[x] " } else { "[ ] " };
                self.push_styled(marker.to_string(), marker_style());
            }
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph => self.block_gap(),
            Tag::Heading(level, _, _) => {
                self.block_gap();
                self.styles.push(heading_style(level));
            }
            Tag::BlockQuote => {
                self.block_gap();
                self.quote_depth += 1;
                self.styles.push(Style::default().add_modifier(Modifier::ITALIC));
            }
            Tag::CodeBlock(kind) => {
                self.block_gap();
                let lang = match &kind {
                    CodeBlockKind::Fenced(info) => info.split_whitespace().next().unwrap_or(""),
                    CodeBlockKind::Indented => "",
                };
                let label = if lang.is_empty() {
                    "┌─".to_string()
                } else {
                    format!("┌─ {}", lang)
                };
                self.push_styled(label, dim_style());
                self.flush_line();
                self.code_block = Some(String::new());
            }
            Tag::List(first) => {
                self.block_gap();
                self.lists.push(first);
            }
            Tag::Item => {
                self.flush_line();
                let depth = self.lists.len();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{}. ", number);
                        *number += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let prefix = self.quote_prefix();
                self.current.extend(prefix);
                if depth > 1 {
                    self.current.push(Span::raw("  ".repeat(depth - 1)));
                }
                self.current.push(Span::styled(marker, marker_style()));
            }
            Tag::Emphasis => self.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.styles.push(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::Link(kind, dest, _) | Tag::Image(kind, dest, _) => {
                self.styles.push(link_style());
                let shown =
                    !matches!(kind, LinkType::Autolink | LinkType::Email) && !dest.is_empty();
                self.links.push(shown.then(|| dest.to_string()));
            }
            Tag::FootnoteDefinition(name) => {
                self.block_gap();
                self.push_styled(format!("[^{}]: ", name), dim_style());
            }
            Tag::Table(_) | Tag::TableHead | Tag::TableRow | Tag::TableCell => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Item | Tag::FootnoteDefinition(_) => self.flush_line(),
            Tag::Heading(..) => {
                self.styles.pop();
                self.flush_line();
            }
            Tag::BlockQuote => {
                self.flush_line();
                self.styles.pop();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Tag::CodeBlock(_) => {
                let code = self.code_block.take().unwrap_or_default();
                for line in code.lines() {
                    let mut spans = self.quote_prefix();
                    spans.push(Span::styled("│ ", dim_style()));
                    spans.push(Span::styled(line.to_string(), code_style()));
                    self.lines.push(Line::from(spans));
                }
                self.push_styled("└─".to_string(), dim_style());
                self.flush_line();
            }
            Tag::List(_) => {
                self.flush_line();
                self.lists.pop();
            }
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough => {
                self.styles.pop();
            }
            Tag::Link(..) | Tag::Image(..) => {
                self.styles.pop();
                if let Some(Some(dest)) = self.links.pop() {
                    self.push_styled(format!(" ({})", dest), dim_style());
                }
            }
            Tag::TableCell => self.push_styled(" ".to_string(), Style::default()),
            Tag::TableHead | Tag::TableRow => self.flush_line(),
            Tag::Table(_) => {}
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, style| acc.patch(*style))
    }

    fn quote_prefix(&self) -> Vec<Span<'static>> {
        (0..self.quote_depth)
            .map(|_| Span::styled("▎ ", dim_style()))
            .collect()
    }

    fn push_styled(&mut self, content: String, style: Style) {
        if self.current.is_empty() {
            let prefix = self.quote_prefix();
            self.current.extend(prefix);
            if !self.lists.is_empty() {
                // continuation lines line up under the item text
                self.current.push(Span::raw("  ".repeat(self.lists.len())));
            }
        }
        self.current.push(Span::styled(content, style));
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            self.lines.push(Line::from(std::mem::take(&mut self.current)));
        }
    }

    /// Blank line before a top-level block that follows other output.
    /// Inside a list the item marker is still pending, so nothing is flushed.
    fn block_gap(&mut self) {
        if !self.lists.is_empty() {
            return;
        }
        self.flush_line();
        if self.lines.last().is_some_and(|line| !line.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_line();
        self.lines
    }
}
