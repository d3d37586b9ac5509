//! Markdown rendering for bot replies.
//!
//! Replies are parsed into a flat list of blocks first, so the egui side only
//! has to lay out styled runs of text and highlighted code.

use crate::theme::Theme;
use eframe::egui::{self, text::LayoutJob, Color32, FontId, Stroke, TextFormat};
use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};
use syntect::easy::HighlightLines;
use syntect::highlighting::ThemeSet;
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;
use tracing::debug;

static SYNTAX_SET: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

/// Code blocks always sit on a dark panel, whatever the app theme.
const CODE_THEME: &str = "base16-ocean.dark";
const PLAIN_CODE_COLOR: [u8; 3] = [0xEE, 0xEE, 0xEE];
const LIST_INDENT: f32 = 16.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SpanStyle {
    pub strong: bool,
    pub emphasis: bool,
    pub strikethrough: bool,
    pub code: bool,
    pub link: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TextKind {
    #[default]
    Paragraph,
    Heading(u8),
    ListItem {
        depth: usize,
        marker: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Text {
        kind: TextKind,
        quoted: bool,
        spans: Vec<Span>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
    Rule,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightedSpan {
    pub text: String,
    pub color: [u8; 3],
}

/// A block ready to lay out. Code is highlighted once, when the block is
/// prepared, instead of on every frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreparedBlock {
    Text {
        kind: TextKind,
        quoted: bool,
        spans: Vec<Span>,
    },
    Code(Vec<HighlightedSpan>),
    Rule,
}

#[derive(Default)]
struct BlockBuilder {
    blocks: Vec<Block>,
    spans: Vec<Span>,
    kind: TextKind,
    strong: usize,
    emphasis: usize,
    strikethrough: usize,
    link: usize,
    quote_depth: usize,
    lists: Vec<Option<u64>>,
    code: Option<(Option<String>, String)>,
}

impl BlockBuilder {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            strong: self.strong > 0,
            emphasis: self.emphasis > 0,
            strikethrough: self.strikethrough > 0,
            code: false,
            link: self.link > 0,
        }
    }

    fn push_text(&mut self, text: &str, style: SpanStyle) {
        if text.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(Span {
                text: text.to_string(),
                style,
            }),
        }
    }

    fn flush(&mut self) {
        let kind = std::mem::take(&mut self.kind);
        if self.spans.is_empty() {
            return;
        }
        self.blocks.push(Block::Text {
            kind,
            quoted: self.quote_depth > 0,
            spans: std::mem::take(&mut self.spans),
        });
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading(level, _, _) => {
                self.flush();
                self.kind = TextKind::Heading(heading_number(level));
            }
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{number}.");
                        *number += 1;
                        marker
                    }
                    _ => "•".to_string(),
                };
                self.kind = TextKind::ListItem {
                    depth: self.lists.len(),
                    marker,
                };
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Tag::Emphasis => self.emphasis += 1,
            Tag::Strong => self.strong += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link(..) | Tag::Image(..) => self.link += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Paragraph | Tag::Heading(..) | Tag::Item => self.flush(),
            Tag::BlockQuote => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
            }
            Tag::List(_) => {
                self.flush();
                self.lists.pop();
            }
            Tag::CodeBlock(_) => {
                if let Some((language, mut code)) = self.code.take() {
                    if code.ends_with('\n') {
                        code.pop();
                    }
                    self.blocks.push(Block::Code { language, code });
                }
            }
            Tag::Emphasis => self.emphasis = self.emphasis.saturating_sub(1),
            Tag::Strong => self.strong = self.strong.saturating_sub(1),
            Tag::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            Tag::Link(..) | Tag::Image(..) => self.link = self.link.saturating_sub(1),
            _ => {}
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) | Event::Html(text) => {
                if let Some((_, code)) = self.code.as_mut() {
                    code.push_str(&text);
                } else {
                    self.push_text(&text, self.style());
                }
            }
            Event::Code(text) => {
                let style = SpanStyle {
                    code: true,
                    ..self.style()
                };
                self.push_text(&text, style);
            }
            Event::SoftBreak => self.push_text(" ", self.style()),
            Event::HardBreak => self.push_text("\n", self.style()),
            Event::Rule => {
                self.flush();
                self.blocks.push(Block::Rule);
            }
            Event::TaskListMarker(checked) => {
                self.push_text(if checked { "[x] " } else { "[ ] " }, self.style());
            }
            Event::FootnoteReference(_) => {}
        }
    }
}

fn heading_number(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

pub fn parse_blocks(markdown: &str) -> Vec<Block> {
    let mut builder = BlockBuilder::default();
    for event in Parser::new_ext(markdown, Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS) {
        builder.event(event);
    }
    builder.flush();
    builder.blocks
}

fn plain_spans(code: &str) -> Vec<HighlightedSpan> {
    vec![HighlightedSpan {
        text: code.to_string(),
        color: PLAIN_CODE_COLOR,
    }]
}

/// Highlights `code`, guessing the syntax from its first line when no known
/// language tag is given.
pub fn highlight(code: &str, language: Option<&str>) -> Vec<HighlightedSpan> {
    let syntax = language
        .and_then(|token| SYNTAX_SET.find_syntax_by_token(token))
        .or_else(|| SYNTAX_SET.find_syntax_by_first_line(code))
        .unwrap_or_else(|| SYNTAX_SET.find_syntax_plain_text());
    let Some(theme) = THEME_SET.themes.get(CODE_THEME) else {
        return plain_spans(code);
    };

    let mut highlighter = HighlightLines::new(syntax, theme);
    let mut spans = Vec::new();
    for line in LinesWithEndings::from(code) {
        match highlighter.highlight_line(line, &SYNTAX_SET) {
            Ok(ranges) => spans.extend(ranges.into_iter().map(|(style, text)| HighlightedSpan {
                text: text.to_string(),
                color: [style.foreground.r, style.foreground.g, style.foreground.b],
            })),
            Err(err) => {
                debug!(syntax = %syntax.name, "highlighting failed: {err}");
                spans.push(HighlightedSpan {
                    text: line.to_string(),
                    color: PLAIN_CODE_COLOR,
                });
            }
        }
    }
    spans
}

fn heading_size(level: u8) -> f32 {
    match level {
        1 => 22.0,
        2 => 19.0,
        3 => 17.0,
        _ => 15.0,
    }
}

fn span_format(span: &Span, kind: &TextKind, quoted: bool, theme: &Theme, strong_color: Color32) -> TextFormat {
    let size = match kind {
        TextKind::Heading(level) => heading_size(*level),
        _ => 14.0,
    };
    let mut format = TextFormat {
        font_id: FontId::proportional(size),
        color: if quoted { theme.text_muted } else { theme.text_primary },
        italics: span.style.emphasis || quoted,
        ..Default::default()
    };
    if span.style.strong || matches!(kind, TextKind::Heading(_)) {
        format.color = strong_color;
    }
    if span.style.strikethrough {
        format.strikethrough = Stroke::new(1.0, format.color);
    }
    if span.style.link {
        format.color = theme.accent_primary;
        format.underline = Stroke::new(1.0, theme.accent_primary);
    }
    if span.style.code {
        format.font_id = FontId::monospace(size - 1.0);
        format.color = Color32::from_rgb(PLAIN_CODE_COLOR[0], PLAIN_CODE_COLOR[1], PLAIN_CODE_COLOR[2]);
        format.background = theme.code_background;
    }
    format
}

fn show_text(ui: &mut egui::Ui, kind: &TextKind, quoted: bool, spans: &[Span], theme: &Theme) {
    let strong_color = ui.visuals().strong_text_color();
    let mut job = LayoutJob::default();
    if let TextKind::ListItem { depth, marker } = kind {
        let indent = depth.saturating_sub(1) as f32 * LIST_INDENT;
        job.append(
            &format!("{marker} "),
            indent,
            TextFormat {
                font_id: FontId::proportional(14.0),
                color: theme.text_muted,
                ..Default::default()
            },
        );
    }
    if quoted {
        job.append(
            "▎ ",
            0.0,
            TextFormat {
                font_id: FontId::proportional(14.0),
                color: theme.text_muted,
                ..Default::default()
            },
        );
    }
    for span in spans {
        job.append(&span.text, 0.0, span_format(span, kind, quoted, theme, strong_color));
    }
    ui.add(egui::Label::new(job).wrap());
}

pub fn prepare(markdown: &str) -> Vec<PreparedBlock> {
    parse_blocks(markdown)
        .into_iter()
        .map(|block| match block {
            Block::Text {
                kind,
                quoted,
                spans,
            } => PreparedBlock::Text {
                kind,
                quoted,
                spans,
            },
            Block::Code { language, code } => PreparedBlock::Code(highlight(&code, language.as_deref())),
            Block::Rule => PreparedBlock::Rule,
        })
        .collect()
}

fn show_code(ui: &mut egui::Ui, spans: &[HighlightedSpan], theme: &Theme) {
    theme.code_frame().show(ui, |ui| {
        ui.set_width(ui.available_width());
        let mut job = LayoutJob::default();
        for span in spans {
            job.append(
                &span.text,
                0.0,
                TextFormat {
                    font_id: FontId::monospace(13.0),
                    color: Color32::from_rgb(span.color[0], span.color[1], span.color[2]),
                    ..Default::default()
                },
            );
        }
        egui::ScrollArea::horizontal()
            .id_salt(ui.next_auto_id())
            .show(ui, |ui| {
                ui.add(egui::Label::new(job).extend());
            });
    });
}

pub fn show(ui: &mut egui::Ui, blocks: &[PreparedBlock], theme: &Theme) {
    for block in blocks {
        match block {
            PreparedBlock::Text {
                kind,
                quoted,
                spans,
            } => show_text(ui, kind, *quoted, spans, theme),
            PreparedBlock::Code(spans) => show_code(ui, spans, theme),
            PreparedBlock::Rule => {
                ui.separator();
            }
        }
    }
}
