use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Style},
    text::Line,
    widgets::{Block, Borders, Clear, Gauge, List, ListItem, Paragraph},
};

use super::app::App;
use super::view_model::{UiModal, UiView};
use super::widgets;

pub(crate) fn draw(f: &mut ratatui::Frame, app: &mut App) {
    let view = UiView::from_app(app);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Min(5),
            Constraint::Length(4),
            Constraint::Length(5),
        ])
        .split(f.area());

    let mut header_lines: Vec<Line> = view
        .header_lines
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();
    header_lines.push(Line::from(view.summary_line.as_str()));
    let header = Paragraph::new(header_lines)
        .block(Block::default().borders(Borders::ALL).title("Library"));
    f.render_widget(header, chunks[0]);

    if let Some(error) = view.list_error.as_deref() {
        let banner = widgets::error_text(error)
            .block(widgets::modal_block(&view.list_title));
        f.render_widget(banner, chunks[1]);
    } else {
        let items: Vec<ListItem> = view
            .track_labels
            .iter()
            .map(|label| ListItem::new(label.as_str()))
            .collect();
        let items = if items.is_empty() {
            vec![ListItem::new("<no tracks>")]
        } else {
            items
        };
        let list = widgets::draw_track_panel(&view.list_title, items);
        f.render_stateful_widget(list, chunks[1], &mut app.list_state);
    }

    match view.player.as_ref() {
        Some(player) => {
            let block = widgets::modal_block(&player.title);
            let inner = block.inner(chunks[2]);
            f.render_widget(block, chunks[2]);
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(1), Constraint::Length(1)])
                .split(inner);
            f.render_widget(Paragraph::new(Line::from(player.line.as_str())), rows[0]);
            if let Some(error) = player.error.as_deref() {
                f.render_widget(widgets::error_text(error), rows[1]);
            } else if let Some((ratio, label)) = player.gauge.as_ref() {
                let gauge_chunks = Layout::default()
                    .direction(Direction::Horizontal)
                    .constraints([Constraint::Min(10), Constraint::Length(20)])
                    .split(rows[1]);
                let gauge = Gauge::default()
                    .ratio(*ratio)
                    .style(Style::default().fg(Color::Black).bg(Color::White))
                    .gauge_style(Style::default().fg(Color::White).bg(Color::Black));
                f.render_widget(gauge, gauge_chunks[0]);
                f.render_widget(
                    Paragraph::new(Line::from(label.as_str())).alignment(Alignment::Right),
                    gauge_chunks[1],
                );
            }
        }
        None => {
            let idle = Paragraph::new("<no track loaded>")
                .block(widgets::modal_block("Player"));
            f.render_widget(idle, chunks[2]);
        }
    }

    let footer_block = Block::default().borders(Borders::ALL).title("Status");
    let footer_inner = footer_block.inner(chunks[3]);
    f.render_widget(footer_block, chunks[3]);
    let footer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
        .split(footer_inner);
    f.render_widget(
        Paragraph::new(Line::from(view.status_line.as_str())),
        footer_chunks[0],
    );
    if app.search_focused {
        f.render_widget(
            Paragraph::new(Line::from("search: type to filter, Enter or Esc to leave")),
            footer_chunks[1],
        );
    }
    f.render_widget(
        Paragraph::new(Line::from(view.keys_line.as_str())),
        footer_chunks[2],
    );

    if let Some(modal) = view.active_modal.as_ref() {
        draw_modal(f, app, modal);
    }
}

fn draw_modal(f: &mut ratatui::Frame, app: &App, modal: &UiModal) {
    match modal {
        UiModal::Form {
            title,
            lines,
            error,
            busy,
            layout,
        } => {
            let area = centered_rect(layout.width_pct, layout.height_pct, f.area());
            f.render_widget(Clear, area);
            let mut body: Vec<String> = lines.clone();
            body.push(String::new());
            if *busy {
                body.push("Saving...".to_string());
            } else if let Some(error) = error {
                body.push(format!("error: {error}"));
            }
            f.render_widget(widgets::draw_modal_text(title, &body.join("\n")), area);
        }
        UiModal::Confirm { title, body, layout } => {
            let area = centered_rect(layout.width_pct, layout.height_pct, f.area());
            f.render_widget(Clear, area);
            f.render_widget(widgets::draw_modal_text(title, body), area);
        }
        UiModal::Upload {
            title,
            body,
            error,
            busy: _,
            layout,
        } => {
            let area = centered_rect(layout.width_pct, layout.height_pct, f.area());
            f.render_widget(Clear, area);
            let mut body = body.clone();
            if let Some(error) = error {
                body.push_str(&format!("\n\nerror: {error}"));
            }
            f.render_widget(widgets::draw_modal_text(title, &body), area);
        }
        UiModal::Help { title, body, layout } => {
            let area = centered_rect(layout.width_pct, layout.height_pct, f.area());
            f.render_widget(Clear, area);
            f.render_widget(widgets::draw_modal_text(title, body), area);
        }
        UiModal::Logs { title, empty, layout } => {
            let area = centered_rect(layout.width_pct, layout.height_pct, f.area());
            f.render_widget(Clear, area);
            let block = widgets::modal_block(title);
            let inner = block.inner(area);
            let height = inner.height as usize;
            let total = app.logs.len();
            let end = total.saturating_sub(app.logs_scroll);
            let start = end.saturating_sub(height);
            let mut items = Vec::new();
            for line in app.logs.iter().skip(start).take(end.saturating_sub(start)) {
                items.push(ListItem::new(line.clone()));
            }
            if *empty || items.is_empty() {
                items.push(ListItem::new("<no logs>"));
            }
            let list = List::new(items).block(block);
            f.render_widget(list, area);
        }
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, r: ratatui::layout::Rect) -> ratatui::layout::Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1]);
    horizontal[1]
}
