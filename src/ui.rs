//! Terminal UI rendering.
//!
//! This is the only place that writes to the screen. It reads [`App`]
//! state and draws widgets; it never changes anything except the list
//! scroll state ratatui needs for stateful widgets.
//!
//! ## For contributors
//!
//! * The layout is four rows: the filter form, the results pane, a wrapped
//!   status line and a one-line key help.
//! * Colours and styles are defined inline.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, Field};
use crate::pipeline::ResultView;

const HELP: &str = " Enter: search  F3: activity  Tab: next field  ←/→: status  ↑/↓: scroll  Esc: quit";

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [form_area, results_area, status_area, help_area] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(1),
        Constraint::Length(2),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_form(app, frame, form_area);
    draw_results(app, frame, results_area);
    draw_status(app, frame, status_area);
    frame.render_widget(
        Paragraph::new(Span::styled(HELP, Style::default().fg(Color::DarkGray))),
        help_area,
    );
}

fn field_spans<'a>(app: &App, field: Field, value: &'a str) -> Vec<Span<'a>> {
    let value_style = if app.focus == field {
        Style::default().fg(Color::Black).bg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };
    let shown = if field == Field::Status {
        format!("◂ {value} ▸")
    } else {
        format!("[{value}]")
    };
    vec![
        Span::styled(format!("{}: ", field.label()), Style::default().fg(Color::Cyan)),
        Span::styled(shown, value_style),
        Span::raw("  "),
    ]
}

/// Render the filter form.
fn draw_form(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = Vec::new();
    spans.extend(field_spans(app, Field::Project, &app.project));
    spans.extend(field_spans(app, Field::Status, app.selected_status()));
    spans.extend(field_spans(app, Field::DaysPast, &app.days_past));
    spans.extend(field_spans(app, Field::User, &app.user));

    let form = Paragraph::new(Line::from(spans))
        .block(Block::default().title(" JIRA ").borders(Borders::ALL));
    frame.render_widget(form, area);
}

/// Render the results pane.
fn draw_results(app: &mut App, frame: &mut Frame, area: Rect) {
    let (title, items): (&str, Vec<ListItem>) = match &app.results {
        None => {
            let hint = if app.ready {
                "Press Enter to search or F3 for the activity feed."
            } else {
                "Waiting for JIRA…"
            };
            let p = Paragraph::new(hint)
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title(" Results ").borders(Borders::ALL));
            frame.render_widget(p, area);
            return;
        }
        Some(ResultView::Empty(msg)) => {
            let p = Paragraph::new(msg.as_str())
                .block(Block::default().title(" Results ").borders(Borders::ALL));
            frame.render_widget(p, area);
            return;
        }
        Some(ResultView::Activity(lines)) => (
            " Activity ",
            lines
                .iter()
                .map(|line| {
                    ListItem::new(Line::from(vec![
                        Span::styled(
                            format!("{:<24}", line.when),
                            Style::default().fg(Color::DarkGray),
                        ),
                        Span::raw("- "),
                        Span::styled(line.title.as_str(), Style::default().fg(Color::White)),
                    ]))
                })
                .collect(),
        ),
        Some(ResultView::Issues(rows)) => (
            " Search results ",
            rows.iter()
                .map(|row| {
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{:<10}", row.key), Style::default().fg(Color::Cyan)),
                        Span::raw(" "),
                        Span::styled(
                            format!("{:<12}", row.status),
                            Style::default().fg(Color::Yellow),
                        ),
                        Span::raw(" "),
                        Span::styled(
                            format!("{:<18}", row.assignee_label()),
                            Style::default().fg(Color::Green),
                        ),
                        Span::raw(" "),
                        Span::styled(row.summary.as_str(), Style::default().fg(Color::White)),
                    ]))
                })
                .collect(),
        ),
    };

    let list = List::new(items)
        .block(Block::default().title(title).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

/// Render the status line.
fn draw_status(app: &App, frame: &mut Frame, area: Rect) {
    let color = if app.status.starts_with("ERROR.") {
        Color::Red
    } else {
        Color::Yellow
    };
    let status = Paragraph::new(Span::styled(app.status.as_str(), Style::default().fg(color)))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, area);
}
