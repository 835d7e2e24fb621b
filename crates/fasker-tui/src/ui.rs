use fasker_core::Sender;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use unicode_width::UnicodeWidthChar;
use crate::app::{App, InputMode};
use crate::markdown::render_markdown;

const SIDEBAR_WIDTH: u16 = 30;
const SEND_BUTTON_WIDTH: u16 = 10;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let main_area = if app.sidebar_open() {
        let [sidebar_area, main_area] = Layout::horizontal([
            Constraint::Length(SIDEBAR_WIDTH.min(body_area.width / 2)),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_sidebar(app, frame, sidebar_area);
        main_area
    } else {
        app.new_chat_area = None;
        body_area
    };

    render_chat_screen(app, frame, main_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" FaskerAI ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("{} ", app.model), Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(title), area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " INSERT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: &[(&str, &str)] = match app.input_mode {
        InputMode::Editing => &[(" Enter ", " send "), (" Esc ", " normal ")],
        InputMode::Normal => &[
            (" i ", " type "),
            (" j/k ", " scroll "),
            (" b ", " sidebar "),
            (" n ", " new chat "),
            (" q ", " quit "),
        ],
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(*key, key_style));
        spans.push(Span::styled(*label, label_style));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_sidebar(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" FaskerAI ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    // "New Chat" action on the first inner row, clickable
    let new_chat_area = Rect::new(inner.x, inner.y, inner.width, 1.min(inner.height));
    app.new_chat_area = Some(new_chat_area);
    let new_chat = Paragraph::new(Line::from(vec![
        Span::styled(" + New Chat ", Style::default().bg(Color::Blue).fg(Color::White).bold()),
        Span::styled(" (n)", Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(new_chat, new_chat_area);

    let source = app.credential_source;
    let status_color = if source.is_connected() { Color::Green } else { Color::Red };
    let message_count = app.session.state().messages().len();

    let mut status_lines = vec![
        Line::from(Span::styled("Status", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("● ", Style::default().fg(status_color)),
            Span::raw(source.status_label()),
        ]),
        Line::from(vec![
            Span::styled("Model: ", Style::default().fg(Color::DarkGray)),
            Span::raw(app.model.clone()),
        ]),
        Line::from(vec![
            Span::styled("Messages: ", Style::default().fg(Color::DarkGray)),
            Span::raw(message_count.to_string()),
        ]),
    ];
    if !source.is_connected() {
        status_lines.push(Line::default());
        status_lines.push(Line::from(Span::styled(
            "Set GEMINI_API_KEY and restart.",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let status_area = Rect::new(
        inner.x,
        inner.y.saturating_add(2),
        inner.width,
        inner.height.saturating_sub(2),
    );
    frame.render_widget(
        Paragraph::new(Text::from(status_lines)).wrap(Wrap { trim: true }),
        status_area,
    );
}

/// Build the conversation as display lines; bot text goes through markdown.
fn chat_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();

    for msg in app.session.state().messages() {
        match msg.sender {
            Sender::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.text.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            Sender::Bot => {
                lines.push(Line::from(Span::styled(
                    "FaskerAI:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                lines.extend(render_markdown(&msg.text));
            }
        }
        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(Span::styled(
            "FaskerAI:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

/// Rows the lines take once wrapped to `width`
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(width))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, input_row] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);
    let [input_area, send_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(SEND_BUTTON_WIDTH),
    ])
    .areas(input_row);

    // Store areas for mouse hit-testing
    app.chat_area = Some(chat_area);
    app.input_area = Some(input_area);
    app.send_area = Some(send_area);

    let lines = chat_lines(app);
    let inner_width = chat_area.width.saturating_sub(2);
    let inner_height = chat_area.height.saturating_sub(2);
    app.update_chat_metrics(wrapped_height(&lines, inner_width), inner_height);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Chat ");

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if app.total_chat_lines > app.chat_height {
        let mut scrollbar_state = ScrollbarState::new(usize::from(
            app.total_chat_lines.saturating_sub(app.chat_height),
        ))
        .position(usize::from(app.chat_scroll));
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            chat_area,
            &mut scrollbar_state,
        );
    }

    render_input(app, frame, input_area);

    let send_style = if app.is_loading() || app.input().trim().is_empty() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
    };
    let send = Paragraph::new("Send")
        .alignment(Alignment::Center)
        .style(send_style)
        .block(Block::default().borders(Borders::ALL).border_style(send_style));
    frame.render_widget(send, send_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let input_border_color = if editing { Color::Yellow } else { Color::DarkGray };
    let title = if app.is_loading() {
        " Message (waiting for reply...) "
    } else {
        " Message (Enter to send) "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(title);

    // Inner width = total width - 2 (for borders)
    let inner_width = usize::from(area.width.saturating_sub(2));
    let (visible_text, cursor_col) = visible_input(app.input(), app.input_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing {
        let cursor_x = u16::try_from(cursor_col).unwrap_or(0);
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

/// Slice of the input that fits in `width` columns with the cursor in view,
/// plus the cursor's column within that slice. Wide characters take two
/// columns.
fn visible_input(input: &str, cursor: usize, width: usize) -> (String, usize) {
    let widths: Vec<usize> = input.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    // Scroll right until the cursor column fits inside the box
    let mut skip = 0;
    let mut cursor_col: usize = widths[..cursor].iter().sum();
    while width > 0 && cursor_col >= width && skip < cursor {
        cursor_col -= widths[skip];
        skip += 1;
    }

    let mut used = 0;
    let visible: String = input
        .chars()
        .zip(&widths)
        .skip(skip)
        .take_while(|(_, w)| {
            used += **w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();

    (visible, cursor_col)
}
