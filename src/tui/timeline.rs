use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};

use super::app::App;
use crate::model::{Phase, RagStatus};
use crate::output::lane_cells;

const NAME_WIDTH: usize = 22;

fn phase_color(phase: Phase) -> Color {
    match phase {
        Phase::Requirements => Color::Blue,
        Phase::Design => Color::Magenta,
        Phase::Development => Color::Yellow,
        Phase::Cst => Color::Cyan,
        Phase::Uat => Color::Green,
    }
}

fn rag_color(rag: RagStatus) -> Color {
    match rag {
        RagStatus::Red => Color::Red,
        RagStatus::Amber => Color::Yellow,
        RagStatus::Green => Color::Green,
    }
}

pub fn render(frame: &mut Frame, app: &App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(2)])
        .split(frame.area());

    if app.show_history {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(rows[0]);
        render_lanes(frame, app, chunks[0]);
        render_history(frame, app, chunks[1]);
    } else {
        render_lanes(frame, app, rows[0]);
    }
    render_footer(frame, app, rows[1]);
}

fn header_line(app: &App) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(NAME_WIDTH))];
    for cell in app.config.grid() {
        let width = cell.width as usize;
        let label = if cell.label.chars().count() < width {
            cell.label.clone()
        } else {
            cell.first_day.format("%b").to_string()
        };
        let label: String = label.chars().take(width).collect();
        spans.push(Span::styled(
            format!("{label:<width$}"),
            Style::default().fg(Color::Gray).bold(),
        ));
    }
    Line::from(spans)
}

fn lane_line(app: &App, index: usize, today: Option<u16>) -> Line<'static> {
    let lane = &app.lanes[index];
    let width = app.config.content_width();
    let name: String = lane.name.chars().take(NAME_WIDTH - 4).collect();
    let mut spans = vec![
        Span::styled(
            format!("{} ", lane.status.icon()),
            Style::default().fg(rag_color(lane.rag_status)),
        ),
        Span::styled(
            format!("{name:<w$}  ", w = NAME_WIDTH - 4),
            Style::default().bold(),
        ),
    ];

    let Some(plan) = &lane.plan else {
        spans.push(Span::styled("(no plan)", Style::default().fg(Color::DarkGray)));
        return Line::from(spans);
    };

    for (col, cell) in lane_cells(plan, &app.config, width).into_iter().enumerate() {
        let span = match cell {
            Some(phase) => Span::styled(
                phase.glyph().to_string(),
                Style::default().fg(Color::Black).bg(phase_color(phase)),
            ),
            None if today == Some(col as u16) => {
                Span::styled("|", Style::default().fg(Color::Red))
            }
            None => Span::styled("·", Style::default().fg(Color::DarkGray)),
        };
        spans.push(span);
    }
    Line::from(spans)
}

fn render_lanes(frame: &mut Frame, app: &App, area: Rect) {
    let today = app.today_column();
    let mut items = vec![ListItem::new(header_line(app))];
    for i in 0..app.lanes.len() {
        let item = ListItem::new(lane_line(app, i, today));
        items.push(if i == app.cursor {
            item.style(Style::default().bg(Color::DarkGray))
        } else {
            item
        });
    }

    let window = &app.config.window;
    let title = format!(
        " Roadmap {} .. {} ",
        window.start().format("%Y-%m-%d"),
        window.end().format("%Y-%m-%d")
    );
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(title));
    frame.render_widget(list, area);
}

fn render_history(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .selected()
        .map(|l| format!(" History: {} ", l.name))
        .unwrap_or_else(|| " History ".to_string());

    let text = if app.history.is_empty() {
        "No plans.".to_string()
    } else {
        app.history
            .iter()
            .map(|p| {
                let marker = if p.is_active { " (active)" } else { "" };
                let phases: Vec<String> = p
                    .phases
                    .ranges()
                    .map(|(phase, range)| format!("  {:<13}{range}", phase.label()))
                    .collect();
                format!(
                    "v{}{marker}  {}\n{}\n",
                    p.version,
                    p.created_at.format("%Y-%m-%d %H:%M"),
                    phases.join("\n")
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    };

    let paragraph = Paragraph::new(text)
        .block(Block::default().borders(Borders::ALL).title(title))
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let mut lines = Vec::new();
    if let Some(err) = &app.error {
        lines.push(Line::styled(err.clone(), Style::default().fg(Color::Red)));
    }
    let mut legend: Vec<Span> = Phase::ALL
        .iter()
        .map(|p| {
            Span::styled(
                format!(" {} ", p.label()),
                Style::default().fg(Color::Black).bg(phase_color(*p)),
            )
        })
        .collect();
    legend.push(Span::raw(
        "  j/k select  h/l month  H/L year  t reset  enter history  r reload  q quit",
    ));
    lines.push(Line::from(legend));
    frame.render_widget(Paragraph::new(lines), area);
}
