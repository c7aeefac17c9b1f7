use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

pub(crate) fn modal_block(title: &str) -> Block<'_> {
    Block::default().title(title).borders(Borders::ALL)
}

pub(crate) fn draw_modal_text<'a>(title: &'a str, body: &'a str) -> Paragraph<'a> {
    Paragraph::new(body).block(modal_block(title))
}

pub(crate) fn draw_track_panel<'a>(title: &'a str, items: Vec<ListItem<'a>>) -> List<'a> {
    List::new(items)
        .block(modal_block(title))
        .highlight_style(Style::default().add_modifier(Modifier::BOLD))
        .highlight_symbol("> ")
}

pub(crate) fn error_text(message: &str) -> Paragraph<'_> {
    Paragraph::new(message).style(Style::default().fg(Color::Red))
}
