//! Markdown output for the `view` command.

use kdam::term::Colorizer;
use pulldown_cmark::{html, CodeBlockKind, Event, Options, Parser, Tag, TagEnd};

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

pub fn render_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    html_output
}

/// Plain text rendering of markdown with optional ANSI styling.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalRenderer {
    styled: bool,
}

impl TerminalRenderer {
    pub fn new(styled: bool) -> Self {
        Self { styled }
    }

    fn paint(&self, text: &str, styles: &[&str]) -> String {
        if !self.styled || styles.is_empty() {
            return text.to_string();
        }
        text.colorize(&styles.join(" "))
    }

    fn break_line(out: &mut String) {
        if !out.is_empty() && !out.ends_with('\n') {
            out.push('\n');
        }
    }

    pub fn render(&self, markdown: &str) -> String {
        let mut out = String::new();
        let mut styles: Vec<&'static str> = Vec::new();
        // None for bullets, the next number for ordered lists
        let mut lists: Vec<Option<u64>> = Vec::new();
        let mut links: Vec<String> = Vec::new();
        let mut quote_depth = 0;
        let mut in_code_block = false;

        for event in Parser::new_ext(markdown, options()) {
            match event {
                Event::Start(tag) => match tag {
                    Tag::Heading { level, .. } => {
                        let marker = "#".repeat(level as usize);
                        out.push_str(&self.paint(&marker, &["bold blue"]));
                        out.push(' ');
                        styles.push("bold blue");
                    }
                    Tag::Paragraph => {
                        if quote_depth > 0 {
                            out.push_str(&"> ".repeat(quote_depth));
                        }
                    }
                    Tag::BlockQuote => quote_depth += 1,
                    Tag::CodeBlock(kind) => {
                        in_code_block = true;
                        if let CodeBlockKind::Fenced(lang) = kind {
                            if !lang.is_empty() {
                                out.push_str(&self.paint(&format!("  [{lang}]"), &["dim"]));
                                out.push('\n');
                            }
                        }
                    }
                    Tag::List(start) => {
                        Self::break_line(&mut out);
                        lists.push(start);
                    }
                    Tag::Item => {
                        Self::break_line(&mut out);
                        out.push_str(&"  ".repeat(lists.len().saturating_sub(1)));
                        match lists.last_mut() {
                            Some(Some(n)) => {
                                out.push_str(&format!("{n}. "));
                                *n += 1;
                            }
                            _ => out.push_str("- "),
                        }
                    }
                    Tag::Emphasis => styles.push("italic"),
                    Tag::Strong => styles.push("bold"),
                    Tag::Strikethrough => out.push_str("~~"),
                    Tag::Link { dest_url, .. } => {
                        links.push(dest_url.into_string());
                        styles.push("underline");
                    }
                    Tag::Image { dest_url, .. } => {
                        links.push(dest_url.into_string());
                        out.push_str("[image: ");
                    }
                    _ => {}
                },
                Event::End(tag) => match tag {
                    TagEnd::Heading(_) => {
                        styles.pop();
                        out.push_str("\n\n");
                    }
                    TagEnd::Paragraph => {
                        out.push('\n');
                        if lists.is_empty() {
                            out.push('\n');
                        }
                    }
                    TagEnd::BlockQuote => quote_depth -= 1,
                    TagEnd::CodeBlock => {
                        in_code_block = false;
                        out.push('\n');
                    }
                    TagEnd::List(_) => {
                        lists.pop();
                        if lists.is_empty() {
                            Self::break_line(&mut out);
                            out.push('\n');
                        }
                    }
                    TagEnd::Item => Self::break_line(&mut out),
                    TagEnd::Emphasis | TagEnd::Strong => {
                        styles.pop();
                    }
                    TagEnd::Strikethrough => out.push_str("~~"),
                    TagEnd::Link => {
                        styles.pop();
                        if let Some(url) = links.pop() {
                            out.push_str(&format!(" ({url})"));
                        }
                    }
                    TagEnd::Image => {
                        if let Some(url) = links.pop() {
                            out.push_str(&format!("]({url})"));
                        }
                    }
                    _ => {}
                },
                Event::Text(text) if in_code_block => {
                    for line in text.lines() {
                        out.push_str("    ");
                        out.push_str(&self.paint(line, &["yellow"]));
                        out.push('\n');
                    }
                }
                Event::Text(text) => out.push_str(&self.paint(&text, &styles)),
                Event::Code(code) => out.push_str(&self.paint(&format!("`{code}`"), &["yellow"])),
                Event::SoftBreak => out.push(' '),
                Event::HardBreak => out.push('\n'),
                Event::Rule => out.push_str("----\n\n"),
                Event::TaskListMarker(done) => out.push_str(if done { "[x] " } else { "[ ] " }),
                _ => {}
            }
        }

        let mut rendered = out.trim_end().to_string();
        rendered.push('\n');
        rendered
    }
}
