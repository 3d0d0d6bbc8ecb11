//! Dashboard screen rendering
//!
//! Renders the header, the search field, the scrollable output pane and the
//! status line.

use ratatui::{
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::{App, AppState};

/// Renders the whole dashboard, plus the help overlay when it is open
pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Length(3), // Search
            Constraint::Min(3),    // Output
            Constraint::Length(1), // Status
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "\u{1F324} Weather Dashboard",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   F1 help", Style::default().fg(Color::DarkGray)),
    ]));
    frame.render_widget(header, chunks[0]);

    let search = Paragraph::new(Line::from(vec![
        Span::raw(app.search.clone()),
        Span::styled("\u{2588}", Style::default().fg(Color::Gray)),
    ]))
    .block(
        Block::default()
            .title(" Search city (Enter to update) ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(search, chunks[1]);

    let output_lines: Vec<Line> = match app.state {
        AppState::Loading => vec![Line::from(Span::styled(
            "Loading weather data...",
            Style::default().fg(Color::Cyan),
        ))],
        AppState::Dashboard if app.output.is_empty() => vec![Line::from(Span::styled(
            "No weather data available",
            Style::default().fg(Color::DarkGray),
        ))],
        AppState::Dashboard => app.output.iter().map(|l| output_line(l)).collect(),
    };
    let output = Paragraph::new(output_lines)
        .block(Block::default().borders(Borders::ALL))
        .scroll((app.scroll_offset, 0));
    frame.render_widget(output, chunks[2]);

    frame.render_widget(Paragraph::new(status_line(app)), chunks[3]);

    if app.show_help {
        super::render_help_overlay(frame);
    }
}

/// Styles block headers bold; detail lines are plain
fn output_line(text: &str) -> Line<'static> {
    if text.starts_with(' ') || text.is_empty() {
        Line::from(text.to_string())
    } else {
        Line::from(Span::styled(
            text.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ))
    }
}

fn status_line(app: &App) -> Line<'static> {
    let color = if app.refreshing {
        Color::Yellow
    } else {
        Color::DarkGray
    };
    let mut spans = vec![Span::styled(app.status.clone(), Style::default().fg(color))];
    if let Some(path) = &app.map_path {
        spans.push(Span::styled(
            format!("  |  Map: {}", path.display()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}
