mod export;
mod help;
mod state;

use crate::cli::{build_config, Cli};
use crate::engine::HttpBackend;
use crate::model::{CheckEvent, ResultRecord};
use crate::orchestrator::{self, CheckOrchestrator, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs},
    Terminal,
};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use export::{copy_to_clipboard, download_path};
use help::draw_help;
use state::{push_wrapped_status_kv, Field, UiState};

const TAB_CHECK: usize = 0;
const TAB_HISTORY: usize = 1;
const TAB_HELP: usize = 2;

/// Rows the history tab scrolls by before the real height is known.
const HISTORY_PAGE: usize = 20;

pub async fn run(args: Cli) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<CheckEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let backend = HttpBackend::new(&build_config(&args))?;
    let mut checks = CheckOrchestrator::new(Arc::new(backend)).with_events(event_tx);

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let ui_handle = std::thread::spawn(move || run_threaded(args, event_rx, cmd_tx));

    let res = orchestrator::run_controller(&mut checks, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

/// Run the TUI loop on a dedicated thread.
pub fn run_threaded(
    args: Cli,
    mut event_rx: UnboundedReceiver<CheckEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    // UiState is owned by the UI thread only; no cross-thread mutation.
    let mut state = UiState {
        base_url: args.base_url.clone(),
        prompt: args.prompts.first().cloned().unwrap_or_default(),
        brand: args.brand.clone().unwrap_or_default(),
        ..Default::default()
    };

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        // Drain events without blocking to keep UI responsive.
        while let Ok(ev) = event_rx.try_recv() {
            state.apply_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                let ctrl = k.modifiers.contains(KeyModifiers::CONTROL);
                match k.code {
                    KeyCode::Char('c') | KeyCode::Char('q') if ctrl => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Char('q') if state.tab != TAB_CHECK => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    KeyCode::Char('r') if ctrl => {
                        state.reset_form();
                        state.info = "Form reset".into();
                    }
                    KeyCode::Char('l') if ctrl => {
                        let _ = cmd_tx.send(UiCommand::ClearHistory);
                    }
                    KeyCode::Char('s') if ctrl => download_csv(&mut state, &cmd_tx),
                    KeyCode::Char('y') if ctrl => copy_export_path(&mut state),
                    KeyCode::F(1) => state.tab = TAB_CHECK,
                    KeyCode::F(2) => state.tab = TAB_HISTORY,
                    KeyCode::F(3) => state.tab = TAB_HELP,
                    KeyCode::Tab | KeyCode::BackTab if state.tab == TAB_CHECK => {
                        state.toggle_focus();
                    }
                    KeyCode::Enter if state.tab == TAB_CHECK => submit(&mut state, &cmd_tx),
                    KeyCode::Backspace if state.tab == TAB_CHECK => {
                        state.focused_input().pop();
                    }
                    KeyCode::Char(c) if state.tab == TAB_CHECK && !ctrl => {
                        state.focused_input().push(c);
                    }
                    KeyCode::Up | KeyCode::Char('k') if state.tab == TAB_HISTORY => {
                        state.select_prev();
                    }
                    KeyCode::Down | KeyCode::Char('j') if state.tab == TAB_HISTORY => {
                        let visible = terminal
                            .size()
                            .map(|s| history_rows(s.height))
                            .unwrap_or(HISTORY_PAGE);
                        state.select_next(visible);
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

/// Records that fit on the history tab for a terminal of `height` rows.
fn history_rows(height: u16) -> usize {
    // tabs (3) + borders (2) + header and blank line (2)
    (height as usize).saturating_sub(7).max(1)
}

fn submit(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    // The trigger is disabled while a check is running.
    if state.is_busy() {
        state.info = "A check is already running".into();
        return;
    }
    let _ = cmd_tx.send(UiCommand::Submit {
        prompt: state.prompt.clone(),
        brand: state.brand.clone(),
    });
}

fn download_csv(state: &mut UiState, cmd_tx: &UnboundedSender<UiCommand>) {
    if state.history.is_empty() {
        state.info = "Nothing to download yet".into();
        return;
    }
    match download_path() {
        Ok(path) => {
            let _ = cmd_tx.send(UiCommand::ExportCsv(path));
        }
        Err(e) => state.info = format!("CSV export failed: {e:#}"),
    }
}

fn copy_export_path(state: &mut UiState) {
    let Some(path) = state.last_exported_path.clone() else {
        state.info = "No exported file path to copy. Download a CSV first (Ctrl-S)".into();
        return;
    };
    match copy_to_clipboard(&path) {
        Ok(_) => {
            let display_path = if path.chars().count() > 60 {
                format!("{}...", path.chars().take(57).collect::<String>())
            } else {
                path
            };
            state.info = format!("✓ Copied to clipboard: {}", display_path);
        }
        Err(e) => state.info = format!("Clipboard copy failed: {e:#}"),
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Check"),
        Line::from("History"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(Block::default().borders(Borders::ALL).title("mention-check"))
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        TAB_CHECK => draw_check(chunks[1], f, state),
        TAB_HISTORY => draw_history(chunks[1], f, state),
        _ => draw_help(chunks[1], f),
    }
}

fn input_block(title: &'static str, value: &str, focused: bool) -> Paragraph<'static> {
    let border = if focused {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let mut spans = vec![Span::raw(value.to_string())];
    if focused {
        spans.push(Span::styled("▏", Style::default().fg(Color::Yellow)));
    }
    Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(title),
    )
}

fn draw_check(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let main = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // Prompt
                Constraint::Length(3), // Brand
                Constraint::Length(6), // Status + banner
                Constraint::Min(0),    // Latest result + recent checks
            ]
            .as_ref(),
        )
        .split(area);

    f.render_widget(
        input_block("Prompt", &state.prompt, state.focus == Field::Prompt),
        main[0],
    );
    f.render_widget(
        input_block("Brand", &state.brand, state.focus == Field::Brand),
        main[1],
    );

    let (status_text, status_style) = if state.is_busy() {
        ("Checking…", Style::default().fg(Color::Yellow))
    } else {
        ("Ready", Style::default().fg(Color::Green))
    };
    let mut status_lines = vec![Line::from(vec![
        Span::styled("Status: ", Style::default().fg(Color::Gray)),
        Span::styled(status_text, status_style),
        Span::raw("   "),
        Span::styled("Backend: ", Style::default().fg(Color::Gray)),
        Span::raw(state.base_url.clone()),
    ])];
    if let Some(err) = state.error.as_deref() {
        push_wrapped_status_kv(
            &mut status_lines,
            "Error",
            err,
            main[2].width,
            Style::default().fg(Color::Red),
        );
    }
    push_wrapped_status_kv(
        &mut status_lines,
        "Info",
        &state.info,
        main[2].width,
        Style::default(),
    );
    let status = Paragraph::new(status_lines)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, main[2]);

    let bottom = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)].as_ref())
        .split(main[3]);

    let latest_lines = match state.history.first() {
        Some(r) => record_detail(r),
        None => vec![
            Line::from("No checks yet."),
            Line::from(""),
            Line::from("Type a prompt and a brand, then press Enter."),
        ],
    };
    let latest = Paragraph::new(latest_lines)
        .block(Block::default().borders(Borders::ALL).title("Latest Result"));
    f.render_widget(latest, bottom[0]);

    let max_items = (bottom[1].height as usize).saturating_sub(2);
    let recent: Vec<Line> = state
        .history
        .iter()
        .take(max_items)
        .map(|r| record_row(r, false))
        .collect();
    let recent = Paragraph::new(recent).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("Recent Checks ({})", state.history.len())),
    );
    f.render_widget(recent, bottom[1]);
}

fn mentioned_span(r: &ResultRecord) -> Span<'static> {
    if r.error().is_some() {
        Span::styled("error", Style::default().fg(Color::Red))
    } else if r.mentioned() {
        Span::styled("yes  ", Style::default().fg(Color::Green))
    } else {
        Span::styled("no   ", Style::default().fg(Color::Gray))
    }
}

fn position_text(r: &ResultRecord) -> String {
    r.position()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".into())
}

fn record_detail(r: &ResultRecord) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Prompt: ", Style::default().fg(Color::Gray)),
            Span::raw(r.prompt().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Mentioned: ", Style::default().fg(Color::Gray)),
            mentioned_span(r),
        ]),
        Line::from(vec![
            Span::styled("Position: ", Style::default().fg(Color::Gray)),
            Span::raw(position_text(r)),
        ]),
    ];
    if let Some(err) = r.error() {
        lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Gray)),
            Span::styled(err.to_string(), Style::default().fg(Color::Red)),
        ]));
    }
    lines
}

fn record_row(r: &ResultRecord, selected: bool) -> Line<'static> {
    let mut spans = vec![
        mentioned_span(r),
        Span::raw(format!(" {:>4}  ", position_text(r))),
        Span::raw(r.prompt().to_string()),
    ];
    if let Some(err) = r.error() {
        spans.push(Span::styled(
            format!("  ({err})"),
            Style::default().fg(Color::Red),
        ));
    }
    let line = Line::from(spans);
    if selected {
        line.style(Style::default().add_modifier(Modifier::REVERSED))
    } else {
        line
    }
}

fn draw_history(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut lines: Vec<Line> = Vec::new();

    // Subtract borders and the two header lines
    let max_items = (area.height as usize).saturating_sub(4).max(1);

    let total_count = state.history.len();
    let current_pos = if total_count > 0 {
        state.history_selected + 1
    } else {
        0
    };

    lines.push(Line::from(vec![
        Span::raw(format!("History ({}/{}) - ", current_pos, total_count)),
        Span::styled("↑/↓/j/k", Style::default().fg(Color::Magenta)),
        Span::raw(": navigate, "),
        Span::styled("Ctrl-S", Style::default().fg(Color::Magenta)),
        Span::raw(": download CSV, "),
        Span::styled("Ctrl-L", Style::default().fg(Color::Magenta)),
        Span::raw(": clear"),
    ]));
    lines.push(Line::from(Span::styled(
        "Ment.  Pos  Prompt",
        Style::default().fg(Color::Gray),
    )));

    // Keep the selected item visible even if the terminal shrank since the last keypress.
    let scroll_offset = {
        let mut offset = state
            .history_scroll_offset
            .min(total_count.saturating_sub(1));
        if state.history_selected < offset {
            offset = state.history_selected;
        } else if state.history_selected >= offset + max_items {
            offset = state.history_selected.saturating_sub(max_items - 1);
        }
        offset
    };

    if state.history.is_empty() {
        lines.push(Line::from("No checks yet."));
    }
    for (display_idx, r) in state
        .history
        .iter()
        .skip(scroll_offset)
        .take(max_items)
        .enumerate()
    {
        let history_idx = scroll_offset + display_idx;
        lines.push(record_row(r, history_idx == state.history_selected));
    }

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("History"));
    f.render_widget(p, area);
}
