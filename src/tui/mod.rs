//! Ratatui-based dashboard.
//!
//! Three pages talk to a running API: the cleaned dataset (scatter + table),
//! a prediction form, and a route planner that geocodes two places and prices
//! the trip between them.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
};

use crate::config::DashboardConfig;
use crate::data::{ApiClient, Geocoder};
use crate::domain::{CURRENCY, PredictionResponse, TripInput};
use crate::error::AppError;
use crate::model::ModelInfo;

mod dataset;
mod form;
mod plotters_chart;
mod route;

use dataset::DatasetView;
use form::{TripForm, trip_summary};
use route::{RouteFocus, RouteState};

const DEBUG_DIR: &str = "debug";

/// Start the dashboard.
pub fn run(config: &DashboardConfig) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(config);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Page {
    Dataset,
    Predict,
    Route,
}

impl Page {
    const ALL: [Page; 3] = [Page::Dataset, Page::Predict, Page::Route];

    fn title(self) -> &'static str {
        match self {
            Page::Dataset => "1 Dataset",
            Page::Predict => "2 Predict",
            Page::Route => "3 Route",
        }
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|p| *p == self).unwrap_or(0)
    }

    fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }
}

struct PredictState {
    form: TripForm,
    result: Option<Result<(TripInput, PredictionResponse), String>>,
}

struct App {
    api: ApiClient,
    geocoder: Geocoder,
    page: Page,
    status: String,
    model: Option<ModelInfo>,
    dataset: DatasetView,
    dataset_error: Option<String>,
    predict: PredictState,
    route: RouteState,
    debug_dir: PathBuf,
}

impl App {
    fn new(config: &DashboardConfig) -> Self {
        let mut app = Self {
            api: ApiClient::new(config.api_url.clone()),
            geocoder: Geocoder::new(config.geocoder_url.clone()),
            page: Page::Dataset,
            status: format!("Connecting to {}...", config.api_url),
            model: None,
            dataset: DatasetView::default(),
            dataset_error: None,
            predict: PredictState {
                form: TripForm::predict(),
                result: None,
            },
            route: RouteState::default(),
            debug_dir: PathBuf::from(DEBUG_DIR),
        };
        app.reload();
        app
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Fetch model info and the dataset from the API.
    fn reload(&mut self) {
        self.model = match self.api.model_info() {
            Ok(info) => Some(info),
            Err(err) => {
                tracing::warn!("model info unavailable: {err}");
                None
            }
        };

        match self.api.fetch_dataset() {
            Ok(records) => {
                self.status = format!("Loaded {} trips from {}", records.len(), self.api.base_url());
                self.dataset = DatasetView::new(records);
                self.dataset_error = None;
            }
            Err(err) => {
                self.status = err.to_string();
                self.dataset_error = Some(err.to_string());
            }
        }
    }

    /// Returns `true` when the app should quit.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }

        if self.is_editing() {
            self.handle_edit_key(key.code);
            return false;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.page = self.page.next(),
            KeyCode::Char('1') => self.page = Page::Dataset,
            KeyCode::Char('2') => self.page = Page::Predict,
            KeyCode::Char('3') => self.page = Page::Route,
            KeyCode::Char('r') => self.reload(),
            KeyCode::Char('d') => self.write_debug(),
            code => match self.page {
                Page::Dataset => self.handle_dataset_key(code),
                Page::Predict => self.handle_predict_key(code),
                Page::Route => self.handle_route_key(code),
            },
        }

        false
    }

    fn is_editing(&self) -> bool {
        match self.page {
            Page::Dataset => false,
            Page::Predict => self.predict.form.is_editing(),
            Page::Route => self.route.is_editing(),
        }
    }

    fn handle_edit_key(&mut self, code: KeyCode) {
        if self.page == Page::Route && self.route.editing_text {
            match code {
                KeyCode::Enter | KeyCode::Esc => self.route.editing_text = false,
                KeyCode::Backspace => {
                    if let Some(text) = self.route.text_mut() {
                        text.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(text) = self.route.text_mut() {
                        text.push(c);
                    }
                }
                _ => {}
            }
            return;
        }

        let form = match self.page {
            Page::Predict => &mut self.predict.form,
            Page::Route => &mut self.route.form,
            Page::Dataset => return,
        };
        match code {
            KeyCode::Esc => {
                form.cancel_edit();
                self.status = "Edit canceled.".to_string();
            }
            KeyCode::Enter => {
                if let Err(msg) = form.commit_edit() {
                    self.status = msg;
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(c) => form.push_char(c),
            _ => {}
        }
    }

    fn handle_dataset_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.dataset.scroll(-1),
            KeyCode::Down => self.dataset.scroll(1),
            KeyCode::PageUp => self.dataset.page(false),
            KeyCode::PageDown => self.dataset.page(true),
            KeyCode::Home => self.dataset.selected = 0,
            KeyCode::End => self.dataset.scroll(isize::MAX),
            _ => {}
        }
    }

    fn handle_predict_key(&mut self, code: KeyCode) {
        let form = &mut self.predict.form;
        match code {
            KeyCode::Up => form.select_prev(),
            KeyCode::Down => form.select_next(),
            KeyCode::Left => form.adjust(-1),
            KeyCode::Right => form.adjust(1),
            KeyCode::Char('[') => form.adjust(-10),
            KeyCode::Char(']') => form.adjust(10),
            KeyCode::Enter => {
                if form.begin_edit() {
                    self.status = "Type a value. Enter to apply, Esc to cancel.".to_string();
                }
            }
            KeyCode::Char('p') => self.run_prediction(),
            _ => {}
        }
    }

    fn handle_route_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Up => self.route.focus_prev(),
            KeyCode::Down => self.route.focus_next(),
            KeyCode::Left if self.route.focus == RouteFocus::Params => self.route.form.adjust(-1),
            KeyCode::Right if self.route.focus == RouteFocus::Params => self.route.form.adjust(1),
            KeyCode::Char('[') if self.route.focus == RouteFocus::Params => self.route.form.adjust(-10),
            KeyCode::Char(']') if self.route.focus == RouteFocus::Params => self.route.form.adjust(10),
            KeyCode::Enter => match self.route.focus {
                RouteFocus::From | RouteFocus::To => self.route.editing_text = true,
                RouteFocus::Params => {
                    self.route.form.begin_edit();
                }
            },
            KeyCode::Char('c') => {
                self.status = format!("Geocoding {} and {}...", self.route.from, self.route.to);
                self.route.calculate(&self.geocoder, &self.api);
                self.status = match &self.route.result {
                    Some(Ok(r)) => format!("Found locations! Distance: {:.2} km", r.distance_km),
                    Some(Err(e)) => e.clone(),
                    None => String::new(),
                };
            }
            _ => {}
        }
    }

    fn run_prediction(&mut self) {
        let trip = self.predict.form.trip.clone();
        match self.api.predict(&trip) {
            Ok(quote) => {
                self.status = "Prediction successful!".to_string();
                self.predict.result = Some(Ok((trip, quote)));
            }
            Err(err) => {
                self.status = err.to_string();
                self.predict.result = Some(Err(err.to_string()));
            }
        }
    }

    fn write_debug(&mut self) {
        let prediction = match &self.predict.result {
            Some(Ok((trip, quote))) => {
                let mut lines = vec![format!("{:.2} {}", quote.predicted_price, quote.currency)];
                lines.extend(trip_summary(trip));
                lines
            }
            Some(Err(e)) => vec![format!("error: {e}")],
            None => Vec::new(),
        };
        let snapshot = crate::debug::DashboardSnapshot {
            api_url: self.api.base_url(),
            model: self.model.as_ref(),
            records: &self.dataset.records,
            prediction,
            route: self.route.describe(),
        };
        self.status = match crate::debug::write_snapshot(&self.debug_dir, &snapshot) {
            Ok(path) => format!("Wrote debug snapshot: {}", path.display()),
            Err(err) => format!("Debug write failed: {err}"),
        };
    }

    fn currency(&self) -> &str {
        self.model.as_ref().map(|m| m.currency.as_str()).unwrap_or(CURRENCY)
    }

    /// Last successful prediction as a (distance, price) chart point.
    fn last_prediction_point(&self) -> Option<(f64, f64)> {
        match &self.predict.result {
            Some(Ok((trip, quote))) => Some((trip.trip_distance_km, quote.predicted_price)),
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        match self.page {
            Page::Dataset => dataset::draw(
                frame,
                chunks[1],
                &self.dataset,
                self.last_prediction_point(),
                self.currency(),
                self.dataset_error.as_deref(),
            ),
            Page::Predict => self.draw_predict(frame, chunks[1]),
            Page::Route => route::draw(frame, chunks[1], &self.route),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let model = match &self.model {
            Some(m) => {
                let r2 = m
                    .metrics
                    .as_ref()
                    .map(|x| format!(" (R² = {:.4})", x.r2))
                    .unwrap_or_default();
                format!("Powered by {} model {} v{}{r2}", m.display_name, m.name, m.version)
            }
            None => "model: -".to_string(),
        };
        let title = Line::from(vec![
            Span::styled("taxipred", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(" Taxi Price Prediction | "),
            Span::styled(model, Style::default().fg(Color::Gray)),
        ]);
        frame.render_widget(Paragraph::new(title), rows[0]);

        let tabs = Tabs::new(Page::ALL.iter().map(|p| p.title()))
            .select(self.page.index())
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, rows[1]);
    }

    fn draw_predict(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(46), Constraint::Min(20)])
            .split(area);

        let form = &self.predict.form;
        let lines: Vec<Line> = form
            .fields()
            .iter()
            .enumerate()
            .map(|(i, &field)| {
                let style = if i == form.selected() {
                    Style::default().fg(Color::Black).bg(Color::White)
                } else {
                    Style::default()
                };
                Line::from(vec![
                    Span::raw(format!("{:<26}", field.label())),
                    Span::styled(form.value_text(field), style),
                ])
            })
            .collect();
        let p = Paragraph::new(Text::from(lines))
            .block(Block::default().title("Trip Details").borders(Borders::ALL));
        frame.render_widget(p, cols[0]);

        let block = Block::default().title("Estimated Trip Price").borders(Borders::ALL);
        let text = match &self.predict.result {
            None => Text::from(Span::styled(
                "Press p to Predict Price.",
                Style::default().fg(Color::Gray),
            )),
            Some(Err(err)) => Text::from(Span::styled(err.clone(), Style::default().fg(Color::Red))),
            Some(Ok((trip, quote))) => {
                let mut lines = vec![
                    Line::from(Span::styled(
                        format!("{:.2} {}", quote.predicted_price, quote.currency),
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    Line::from("Trip Summary:"),
                ];
                lines.extend(trip_summary(trip).into_iter().map(|l| Line::from(format!("- {l}"))));
                Text::from(lines)
            }
        };
        frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), cols[1]);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = match self.page {
            Page::Dataset => "Tab/1-3 page  ↑/↓ PgUp/PgDn scroll  r reload  d debug  q quit",
            Page::Predict => "↑/↓ field  ←/→ [/] adjust  Enter type  p predict  Tab page  d debug  q quit",
            Page::Route => "↑/↓ field  Enter edit  ←/→ adjust  c calculate  Tab page  d debug  q quit",
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}
