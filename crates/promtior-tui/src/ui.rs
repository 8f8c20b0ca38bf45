use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use promtior_core::{ChatMessage, ChatRole, Row};
use crate::app::{App, ChatPane, InputMode};

/// Split a line on `**` markers and render the enclosed parts in bold.
/// An unclosed trailing marker is kept as literal text.
fn styled_line(text: &str) -> Line<'static> {
    let parts: Vec<&str> = text.split("**").collect();
    let balanced = parts.len() % 2 == 1;
    let last = parts.len() - 1;

    let spans: Vec<Span<'static>> = parts
        .iter()
        .enumerate()
        .filter(|(_, part)| !part.is_empty())
        .map(|(i, part)| {
            if i % 2 == 0 {
                Span::raw(part.to_string())
            } else if balanced || i != last {
                Span::styled(part.to_string(), Style::default().add_modifier(Modifier::BOLD))
            } else {
                Span::raw(format!("**{}", part))
            }
        })
        .collect();

    Line::from(spans)
}

fn role_style(role: ChatRole) -> Style {
    match role {
        ChatRole::User => Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ChatRole::Bot => Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ChatRole::System => Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    }
}

fn push_message(lines: &mut Vec<Line<'static>>, msg: &ChatMessage) {
    // User rows sit on the right, like the sender side of a chat
    let alignment = match msg.role {
        ChatRole::User => Alignment::Right,
        ChatRole::Bot | ChatRole::System => Alignment::Left,
    };

    if let Some(label) = msg.role.label() {
        lines.push(Line::from(Span::styled(format!("{}:", label), role_style(msg.role))).alignment(alignment));
    }

    for line in msg.content.lines() {
        let line = match msg.role {
            ChatRole::Bot => styled_line(line),
            ChatRole::User => Line::from(line.to_string()),
            ChatRole::System => Line::from(Span::styled(line.to_string(), role_style(ChatRole::System))),
        };
        lines.push(line.alignment(alignment));
    }
    lines.push(Line::default());
}

fn chat_lines(chat: &ChatPane) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for row in chat.transcript.rows() {
        match row {
            Row::Message(msg) => push_message(&mut lines, msg),
            Row::Typing => {
                lines.push(Line::from(Span::styled(
                    chat.typing_text(),
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                )));
                lines.push(Line::default());
            }
        }
    }
    lines
}

/// The transcript as one wrapped paragraph. Both the renderer and the scroll
/// bookkeeping in [`ChatPane`] measure this same paragraph.
pub(crate) fn chat_paragraph(chat: &ChatPane) -> Paragraph<'static> {
    // No trimming: pretty-printed JSON replies rely on leading spaces
    Paragraph::new(Text::from(chat_lines(chat))).wrap(Wrap { trim: false })
}

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
    render_chat_screen(app, frame, body_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let status = if app.is_sending() {
        Span::styled(" [enviando] ", Style::default().fg(Color::Yellow))
    } else {
        Span::raw(" ")
    };

    let title = Line::from(vec![
        Span::styled(" Promtior · Asistente ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.client.base_url().to_string(), Style::default().fg(Color::Gray)),
        status,
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

/// Rows needed to show the banner text wrapped at `width`, capped at 3.
fn banner_height(error: &str, width: u16) -> u16 {
    if error.is_empty() {
        return 0;
    }
    let width = width.max(1) as usize;
    // +2 for the leading marker
    let chars = error.chars().count() + 2;
    chars.div_ceil(width).clamp(1, 3) as u16
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [chat_area, banner_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(banner_height(&app.chat.error, area.width)),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(chat_area);
    app.chat.fit_to_area(chat_area.width.saturating_sub(2), chat_area.height.saturating_sub(2));

    render_chat(&app.chat, frame, chat_area);

    if banner_area.height > 0 {
        let banner = Paragraph::new(Line::from(vec![
            Span::styled("! ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(app.chat.error.clone(), Style::default().fg(Color::Red)),
        ]))
        .wrap(Wrap { trim: true });
        frame.render_widget(banner, banner_area);
    }

    render_input(&app.chat, frame, input_area);
}

fn render_chat(chat: &ChatPane, frame: &mut Frame, area: Rect) {
    let border_color = if chat.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Conversación ");

    let paragraph = chat_paragraph(chat).block(block).scroll((chat.scroll, 0));
    frame.render_widget(paragraph, area);

    let max_scroll = chat.max_scroll();
    if max_scroll > 0 {
        let mut scrollbar_state = ScrollbarState::new(max_scroll as usize).position(chat.scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_input(chat: &ChatPane, frame: &mut Frame, area: Rect) {
    let editing = chat.input_mode == InputMode::Editing;
    let (title, border_color, text_color) = if !chat.input_enabled {
        (" Esperando respuesta... ", Color::DarkGray, Color::DarkGray)
    } else if editing {
        (" Mensaje (Enter para enviar) ", Color::Yellow, Color::Cyan)
    } else {
        (" Mensaje (i para escribir) ", Color::DarkGray, Color::Cyan)
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scrolling keeps the cursor inside the box
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 || chat.cursor < inner_width {
        0
    } else {
        chat.cursor - inner_width + 1
    };

    let visible_text: String = chat.input.chars().skip(scroll_offset).take(inner_width).collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(text_color))
        .block(block);
    frame.render_widget(input, area);

    if editing && chat.input_enabled {
        let cursor_x = (chat.cursor - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.chat.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.chat.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " ESCRIBIR ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.chat.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" enviar ", label_style),
            Span::styled(" PgUp/PgDn ", key_style),
            Span::styled(" desplazar ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" navegar ", label_style),
            Span::styled(" Ctrl+C ", key_style),
            Span::styled(" salir ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" desplazar ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" inicio/fin ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" escribir ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" salir ", label_style),
        ],
    };

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
