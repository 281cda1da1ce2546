use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &'static str, pad: usize, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{}{action}", " ".repeat(pad))),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-Q", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("F1/F2/F3", 4, "Check / History / Help"),
        key_line("Ctrl-L", 6, "Clear history"),
        key_line("Ctrl-S", 6, "Download history as results.csv"),
        key_line("Ctrl-Y", 6, "Copy exported path to clipboard"),
        Line::from(""),
        Line::from("Check tab:"),
        key_line("Tab", 9, "Switch between prompt and brand"),
        key_line("Enter", 7, "Run check"),
        key_line("Ctrl-R", 6, "Reset form (history is kept)"),
        Line::from(""),
        Line::from("History tab:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("↑/↓", Style::default().fg(Color::Magenta)),
            Span::raw(" or "),
            Span::styled("j/k", Style::default().fg(Color::Magenta)),
            Span::raw("  Navigate"),
        ]),
        key_line("q", 11, "Quit"),
        Line::from(""),
        Line::from("The CSV export holds prompt, mentioned and position; errors are only shown here."),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
