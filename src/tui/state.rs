use crate::model::{CheckEvent, InfoEvent, ResultRecord, Status};
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};

/// Which form field receives typed characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Prompt,
    Brand,
}

/// Read-only mirror of the orchestrator plus form input. Owned by the UI thread.
pub struct UiState {
    pub tab: usize,
    pub info: String,
    pub base_url: String,

    pub prompt: String,
    pub brand: String,
    pub focus: Field,

    pub status: Status,
    pub error: Option<String>,

    pub history: Vec<ResultRecord>,
    pub history_selected: usize, // Index of selected history item (0 = most recent)
    pub history_scroll_offset: usize,
    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            base_url: String::new(),
            prompt: String::new(),
            brand: String::new(),
            focus: Field::Prompt,
            status: Status::Idle,
            error: None,
            history: Vec::new(),
            history_selected: 0,
            history_scroll_offset: 0,
            last_exported_path: None,
        }
    }
}

impl UiState {
    pub fn focused_input(&mut self) -> &mut String {
        match self.focus {
            Field::Prompt => &mut self.prompt,
            Field::Brand => &mut self.brand,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Field::Prompt => Field::Brand,
            Field::Brand => Field::Prompt,
        };
    }

    /// Clear the form fields; history is left alone.
    pub fn reset_form(&mut self) {
        self.prompt.clear();
        self.brand.clear();
        self.focus = Field::Prompt;
    }

    pub fn is_busy(&self) -> bool {
        self.status == Status::Busy
    }

    /// Fold an orchestrator notification into the mirror.
    pub fn apply_event(&mut self, ev: CheckEvent) {
        match ev {
            CheckEvent::StatusChanged(status) => {
                self.status = status;
                if status == Status::Busy {
                    self.info = "Checking…".into();
                }
            }
            CheckEvent::ErrorChanged(error) => self.error = error,
            CheckEvent::RecordAppended(record) => {
                self.info = if record.error().is_some() {
                    "Check failed".into()
                } else {
                    "Check complete".into()
                };
                self.history.insert(0, record);
                self.history_selected = 0;
                self.history_scroll_offset = 0;
            }
            CheckEvent::HistoryCleared => {
                self.history.clear();
                self.history_selected = 0;
                self.history_scroll_offset = 0;
                self.info = "History cleared".into();
            }
            CheckEvent::Info(info) => {
                if let InfoEvent::Exported { path, .. } = &info {
                    self.last_exported_path = Some(path.to_string_lossy().to_string());
                    self.info = format!("{} (Ctrl-Y to copy path)", info.to_message());
                } else {
                    self.info = info.to_message();
                }
            }
        }
    }

    pub fn select_prev(&mut self) {
        if self.history_selected > 0 {
            self.history_selected -= 1;
            if self.history_selected < self.history_scroll_offset {
                self.history_scroll_offset = self.history_selected;
            }
        }
    }

    pub fn select_next(&mut self, visible: usize) {
        if self.history_selected < self.history.len().saturating_sub(1) {
            self.history_selected += 1;
            let visible = visible.max(1);
            if self.history_selected >= self.history_scroll_offset + visible {
                self.history_scroll_offset = self.history_selected.saturating_sub(visible - 1);
            }
        }
    }
}

pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
    value_style: Style,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Account for borders (2 chars on each side)
    let usable_width = status_area_width.saturating_sub(4).max(1);
    let label_text = format!("{label}:");
    let label_width = label_text.chars().count() as u16;

    let value_chars: Vec<char> = value.chars().collect();
    let mut remaining = value_chars.as_slice();
    let mut first = true;

    while !remaining.is_empty() {
        let line_width = if first {
            usable_width.saturating_sub(label_width + 1).max(1)
        } else {
            usable_width.saturating_sub(2).max(1)
        };

        let chars_to_take = (remaining.len() as u16).min(line_width) as usize;
        let (line_chars, rest) = remaining.split_at(chars_to_take);
        let line_text: String = line_chars.iter().collect();

        if first {
            out.push(Line::from(vec![
                Span::styled(label_text.clone(), Style::default().fg(Color::Gray)),
                Span::raw(" "),
                Span::styled(line_text, value_style),
            ]));
            first = false;
        } else {
            out.push(Line::from(vec![
                Span::raw("  "),
                Span::styled(line_text, value_style),
            ]));
        }

        remaining = rest;
    }
}
