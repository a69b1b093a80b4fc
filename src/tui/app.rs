use chrono::Utc;

use crate::model::RoadmapPlan;
use crate::store::{Lane, Store};
use crate::timeline::{TimelineConfig, Window};

pub struct App {
    pub lanes: Vec<Lane>,
    pub cursor: usize,
    pub config: TimelineConfig,
    /// Window the session started with; `t` returns to it.
    pub home_window: Window,
    /// Months the visible window is shifted from `home_window`.
    pub month_offset: i32,
    pub show_history: bool,
    pub history: Vec<RoadmapPlan>,
    pub error: Option<String>,
}

impl App {
    pub fn new(store: &Store, config: TimelineConfig) -> Self {
        let mut app = App {
            lanes: Vec::new(),
            cursor: 0,
            config,
            home_window: config.window,
            month_offset: 0,
            show_history: false,
            history: Vec::new(),
            error: None,
        };
        app.refresh(store);
        app
    }

    /// Rebuild lanes from the store. Problems are shown, not returned.
    pub fn refresh(&mut self, store: &Store) {
        self.error = store
            .load_error()
            .map(|e| format!("stored data ignored: {e}"));
        match store.lanes() {
            Ok(lanes) => self.lanes = lanes,
            Err(e) => {
                self.lanes.clear();
                self.error = Some(format!("{e:#}"));
            }
        }
        if self.cursor >= self.lanes.len() {
            self.cursor = self.lanes.len().saturating_sub(1);
        }
        self.load_history(store);
    }

    pub fn load_history(&mut self, store: &Store) {
        self.history = match self.selected() {
            Some(lane) if self.show_history => store
                .history(&lane.capability_id)
                .into_iter()
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
    }

    pub fn selected(&self) -> Option<&Lane> {
        self.lanes.get(self.cursor)
    }

    pub fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_down(&mut self) {
        if self.cursor + 1 < self.lanes.len() {
            self.cursor += 1;
        }
    }

    /// Shifts are applied to `home_window` so day clamping never accumulates.
    pub fn shift_window(&mut self, months: i32) {
        let offset = self.month_offset.saturating_add(months);
        if let Some(window) = self.home_window.shift_months(offset) {
            self.month_offset = offset;
            self.config.window = window;
        }
    }

    pub fn reset_window(&mut self) {
        self.month_offset = 0;
        self.config.window = self.home_window;
    }

    pub fn toggle_history(&mut self) {
        self.show_history = !self.show_history;
    }

    /// Today's column inside the timeline, if visible.
    pub fn today_column(&self) -> Option<u16> {
        let width = self.config.content_width();
        crate::timeline::today_marker(Utc::now(), &self.config.window)
            .and_then(|f| crate::timeline::fraction_to_column(f, width))
    }
}
