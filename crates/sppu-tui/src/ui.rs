use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};
use sppu_core::{ChatMessage, ChatPart, ChatRole, SavedNote};

use crate::app::{App, FocusPane, InputMode, PYQ_LINK};

const SIDEBAR_WIDTH: u16 = 34;

/// Wrap text to fit within a given width, returning multiple lines.
/// Breaks on word boundaries and keeps the line's leading indentation.
fn wrap_text_to_width(text: &str, width: usize) -> Vec<String> {
    let trimmed = text.trim_start();
    let indent = &text[..text.len() - trimmed.len()];
    let indent_len = indent.chars().count();

    if width == 0 || indent_len >= width {
        return vec![text.to_string()];
    }
    let width = width - indent_len;

    let mut lines = Vec::new();
    let mut current_line = String::new();
    let mut current_len = 0;

    for word in trimmed.split_whitespace() {
        let word_len = word.chars().count();

        if current_len == 0 {
            current_line = word.to_string();
            current_len = word_len;
        } else if current_len + 1 + word_len <= width {
            current_line.push(' ');
            current_line.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(format!("{}{}", indent, current_line));
            current_line = word.to_string();
            current_len = word_len;
        }
    }

    if !current_line.is_empty() {
        lines.push(format!("{}{}", indent, current_line));
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }
                spans.push(Span::styled(
                    bold_text,
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

/// A word with its style and whether whitespace came before it.
struct StyledWord {
    text: String,
    style: Style,
    spaced: bool,
}

fn split_styled_words(spans: &[Span<'static>]) -> Vec<StyledWord> {
    let mut words = Vec::new();
    let mut spaced = false;

    for span in spans {
        let mut current = String::new();
        for c in span.content.chars() {
            if c.is_whitespace() {
                if !current.is_empty() {
                    words.push(StyledWord {
                        text: std::mem::take(&mut current),
                        style: span.style,
                        spaced,
                    });
                }
                spaced = true;
            } else {
                current.push(c);
            }
        }
        if !current.is_empty() {
            words.push(StyledWord {
                text: current,
                style: span.style,
                spaced,
            });
            spaced = false;
        }
    }

    words
}

fn push_styled(spans: &mut Vec<Span<'static>>, text: String, style: Style) {
    if let Some(last) = spans.last_mut() {
        if last.style == style {
            last.content.to_mut().push_str(&text);
            return;
        }
    }
    spans.push(Span::styled(text, style));
}

fn indented_line(indent: &str, mut spans: Vec<Span<'static>>) -> Line<'static> {
    if !indent.is_empty() {
        spans.insert(0, Span::raw(indent.to_string()));
    }
    Line::from(spans)
}

/// Wrap already-styled spans on word boundaries, keeping leading indentation.
fn wrap_styled_line(line: Line<'static>, width: usize) -> Vec<Line<'static>> {
    let indent: String = line
        .spans
        .iter()
        .flat_map(|span| span.content.chars())
        .take_while(|c| c.is_whitespace())
        .collect();
    let indent_len = indent.chars().count();

    if width == 0 || indent_len >= width {
        return vec![line];
    }
    let width = width - indent_len;

    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_len = 0;

    for word in split_styled_words(&line.spans) {
        let word_len = word.text.chars().count();
        let gap = usize::from(word.spaced && current_len > 0);

        if current_len > 0 && current_len + gap + word_len > width {
            lines.push(indented_line(&indent, std::mem::take(&mut current)));
            current_len = 0;
        }

        let text = if word.spaced && current_len > 0 {
            format!(" {}", word.text)
        } else {
            word.text
        };
        current_len += text.chars().count();
        push_styled(&mut current, text, word.style);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(indented_line(&indent, current));
    }

    lines
}

/// Markdown text as wrapped, styled lines. `#` headings render bold.
fn markdown_lines(text: &str, width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let heading = raw.trim_start().trim_start_matches('#');
        if raw.trim_start().starts_with('#') {
            for piece in wrap_text_to_width(heading.trim(), width) {
                lines.push(Line::from(Span::styled(
                    piece,
                    Style::default().add_modifier(Modifier::BOLD),
                )));
            }
            continue;
        }
        lines.extend(wrap_styled_line(parse_markdown_line(raw), width));
    }
    lines
}

/// First input character shown so the cursor stays inside the box.
fn input_scroll(cursor: usize, width: usize) -> usize {
    cursor.saturating_sub(width.saturating_sub(1))
}

fn plain_lines(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    text.lines()
        .flat_map(|raw| wrap_text_to_width(raw, width))
        .map(|piece| Line::from(Span::styled(piece, style)))
        .collect()
}

/// Rendered chat history plus the line where each QnA starts.
struct ChatLayout {
    lines: Vec<Line<'static>>,
    qna_starts: Vec<usize>,
}

fn build_chat_layout(app: &App, width: usize) -> ChatLayout {
    let session = app.assistant.session();
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut qna_starts = Vec::new();

    for msg in session.messages() {
        push_message(app, msg, width, &mut lines, &mut qna_starts);
    }

    if session.is_loading() {
        lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
    }

    if let Some(error) = session.error() {
        lines.push(Line::from(Span::styled(
            "Error",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )));
        lines.extend(plain_lines(error, width, Style::default().fg(Color::Red)));
        lines.push(Line::default());
    }

    ChatLayout { lines, qna_starts }
}

fn push_message(
    app: &App,
    msg: &ChatMessage,
    width: usize,
    lines: &mut Vec<Line<'static>>,
    qna_starts: &mut Vec<usize>,
) {
    match msg.role {
        ChatRole::User => lines.push(Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))),
        ChatRole::Model => lines.push(Line::from(Span::styled(
            "AI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))),
    }

    if let Some(image) = &msg.image {
        lines.push(Line::from(Span::styled(
            format!("[image attached: {}]", image.mime_type),
            Style::default().fg(Color::DarkGray),
        )));
    }

    for part in &msg.parts {
        match part {
            ChatPart::Text { text } => match msg.role {
                ChatRole::User => lines.extend(plain_lines(text, width, Style::default())),
                ChatRole::Model => lines.extend(markdown_lines(text, width)),
            },
            ChatPart::MultiQnA { qnas } => {
                for (i, qna) in qnas.iter().enumerate() {
                    let global_idx = qna_starts.len();
                    qna_starts.push(lines.len());

                    let selected = app.selected_qna == Some(global_idx);
                    let question_style = if selected {
                        Style::default()
                            .fg(Color::White)
                            .bg(Color::Blue)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::White).add_modifier(Modifier::BOLD)
                    };

                    let question = format!("Q: {}", qna.question);
                    let mut question_lines: Vec<Line<'static>> =
                        plain_lines(&question, width, question_style);
                    if app.is_saved(qna) {
                        if let Some(last) = question_lines.last_mut() {
                            last.spans.push(Span::styled(
                                " [saved]",
                                Style::default().fg(Color::Green),
                            ));
                        }
                    }
                    lines.extend(question_lines);
                    lines.push(Line::default());
                    lines.extend(markdown_lines(&qna.answer, width));

                    if i + 1 < qnas.len() {
                        lines.push(Line::from(Span::styled(
                            "─".repeat(width.min(40)),
                            Style::default().fg(Color::DarkGray),
                        )));
                    }
                }
            }
        }
    }

    lines.push(Line::default());
}

fn note_lines(note: &SavedNote, width: usize) -> Vec<Line<'static>> {
    let mut lines = plain_lines(
        &note.question,
        width,
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
    );
    lines.push(Line::default());
    lines.extend(markdown_lines(&note.answer, width));
    lines
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, status, footer
    let [header_area, body_area, status_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area);

    let [sidebar_area, main_area] = Layout::horizontal([
        Constraint::Length(SIDEBAR_WIDTH),
        Constraint::Min(0),
    ])
    .areas(body_area);

    render_header(app, frame, header_area);
    render_sidebar(app, frame, sidebar_area);

    if app.is_chat_view() {
        render_chat(app, frame, main_area);
    } else {
        render_note(app, frame, main_area);
    }

    render_status(app, frame, status_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let count = app.assistant.notes().len();
    let notes_indicator = format!(" [{} saved]", count);

    let title = Line::from(vec![
        Span::styled(" SPPU AI Assistant ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(notes_indicator, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            app.assistant.service().model().to_string(),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let [info_area, notes_area] = Layout::vertical([
        Constraint::Length(7),
        Constraint::Min(0),
    ])
    .areas(area);

    let info = Text::from(vec![
        Line::from(vec![
            Span::styled(" n ", Style::default().bg(Color::DarkGray).fg(Color::White)),
            Span::raw(" New Chat"),
        ]),
        Line::default(),
        Line::from(Span::styled("PYQs", Style::default().fg(Color::Gray).bold())),
        Line::from(Span::styled(
            PYQ_LINK,
            Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
        )),
    ]);
    let info_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" SPPU AI Notes ");
    frame.render_widget(
        Paragraph::new(info).block(info_block).wrap(Wrap { trim: true }),
        info_area,
    );

    let focused = app.focus == FocusPane::Sidebar;
    let border_color = if focused { Color::Cyan } else { Color::DarkGray };
    let notes_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Saved Notes ");

    let notes = app.assistant.notes().notes();
    if notes.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No notes saved yet.",
            Style::default().fg(Color::DarkGray),
        ))
        .block(notes_block);
        frame.render_widget(empty, notes_area);
        return;
    }

    let active_id = app.assistant.router().active_note_id();
    let items: Vec<ListItem> = notes
        .iter()
        .map(|note| {
            let style = if active_id == Some(note.id.as_str()) {
                Style::default().bg(Color::DarkGray).fg(Color::White).bold()
            } else {
                Style::default()
            };
            ListItem::new(note.question.clone()).style(style)
        })
        .collect();

    let highlight_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let list = List::new(items)
        .block(notes_block)
        .highlight_style(highlight_style)
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, notes_area, &mut app.notes_state);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let attach_height = if app.attachment.is_some() { 1 } else { 0 };
    let [chat_area, attach_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(attach_height),
        Constraint::Length(3),
    ])
    .areas(area);

    let inner_width = chat_area.width.saturating_sub(2) as usize;
    let visible_height = chat_area.height.saturating_sub(2) as usize;
    let layout = build_chat_layout(app, inner_width);

    let max_scroll = layout.lines.len().saturating_sub(visible_height);
    let mut scroll = app.chat_scroll as usize;
    if app.chat_follow {
        scroll = max_scroll;
    } else if app.reveal_selection {
        if let Some(start) = app
            .selected_qna
            .and_then(|i| layout.qna_starts.get(i).copied())
        {
            if start < scroll || start >= scroll + visible_height {
                scroll = start;
            }
        }
    }
    app.reveal_selection = false;
    app.chat_scroll = scroll.min(max_scroll) as u16;

    let main_focused = app.focus == FocusPane::Main;
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if main_focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Chat ");

    let chat = Paragraph::new(Text::from(layout.lines))
        .block(chat_block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if let Some(attachment) = &app.attachment {
        let line = Line::from(vec![
            Span::styled(" image: ", Style::default().fg(Color::Magenta)),
            Span::raw(format!("{} ({})", attachment.file_name, attachment.image.mime_type)),
            Span::styled("  /detach to remove", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), attach_area);
    }

    let loading = app.assistant.session().is_loading();
    let editing = app.input_mode == InputMode::Editing;
    let (title, border_color) = if loading {
        (" Waiting for answer... ", Color::DarkGray)
    } else if editing {
        (" Ask a question (Enter to send, /attach <path> for an image) ", Color::Yellow)
    } else {
        (" Press i to type ", Color::DarkGray)
    };

    let input_style = if loading {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let input_width = input_area.width.saturating_sub(2) as usize;
    let offset = input_scroll(app.input_cursor, input_width);
    let input = Paragraph::new(app.input.as_str())
        .style(input_style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(title),
        )
        .scroll((0, offset as u16));
    frame.render_widget(input, input_area);

    if editing && main_focused {
        let cursor_x = input_area.x + 1 + (app.input_cursor - offset) as u16;
        frame.set_cursor_position((cursor_x, input_area.y + 1));
    }
}

fn render_note(app: &mut App, frame: &mut Frame, area: Rect) {
    let inner_width = area.width.saturating_sub(4) as usize;
    let visible_height = area.height.saturating_sub(2) as usize;

    let lines = match app.assistant.active_note() {
        Some(note) => note_lines(note, inner_width),
        None => vec![Line::from(Span::styled(
            "Select a note to view or start a new chat.",
            Style::default().fg(Color::DarkGray),
        ))],
    };

    let max_scroll = lines.len().saturating_sub(visible_height) as u16;
    app.note_scroll = app.note_scroll.min(max_scroll);

    let border_color = if app.focus == FocusPane::Main { Color::Cyan } else { Color::DarkGray };
    let note = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Note ")
                .padding(ratatui::widgets::Padding::horizontal(1)),
        )
        .scroll((app.note_scroll, 0));
    frame.render_widget(note, area);
}

fn render_status(app: &App, frame: &mut Frame, area: Rect) {
    if let Some(status) = &app.status {
        let line = Line::from(Span::styled(
            format!(" {}", status),
            Style::default().fg(Color::Yellow),
        ));
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match (app.input_mode, app.is_chat_view()) {
        (InputMode::Editing, _) => " INSERT ",
        (InputMode::Normal, true) => " CHAT ",
        (InputMode::Normal, false) => " NOTE ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: &[(&str, &str)] = match (app.input_mode, app.focus, app.is_chat_view()) {
        (InputMode::Editing, _, _) => &[("Enter", "send"), ("Esc", "normal mode"), ("Ctrl-C", "quit")],
        (InputMode::Normal, FocusPane::Sidebar, _) => {
            &[("j/k", "select"), ("Enter", "open"), ("Tab", "chat"), ("n", "new chat"), ("q", "quit")]
        }
        (InputMode::Normal, FocusPane::Main, true) => &[
            ("i", "type"),
            ("j/k", "select answer"),
            ("s", "save note"),
            ("Tab", "notes"),
            ("n", "new chat"),
            ("q", "quit"),
        ],
        (InputMode::Normal, FocusPane::Main, false) => {
            &[("j/k", "scroll"), ("Tab", "notes"), ("n", "new chat"), ("q", "quit")]
        }
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
