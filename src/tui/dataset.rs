//! Dataset page: price-vs-distance scatter with trend line, and the trip table.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState},
};

use crate::domain::{Categorical, TripRecord};
use crate::io::ingest::{DatasetStats, compute_stats};
use crate::math::{TrendLine, fit_trend_line};

use super::plotters_chart::FarePlottersChart;

const PAGE_ROWS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct DatasetView {
    pub records: Vec<TripRecord>,
    pub stats: Option<DatasetStats>,
    pub trend: Option<TrendLine>,
    pub selected: usize,
}

/// Everything the chart widget needs, precomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub points: Vec<(f64, f64)>,
    pub trend: Vec<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
}

impl DatasetView {
    pub fn new(records: Vec<TripRecord>) -> Self {
        let stats = compute_stats(&records);
        let pairs: Vec<(f64, f64)> = records
            .iter()
            .map(|r| (r.trip.trip_distance_km, r.trip_price))
            .collect();
        let trend = fit_trend_line(&pairs);
        Self {
            records,
            stats,
            trend,
            selected: 0,
        }
    }

    pub fn scroll(&mut self, delta: isize) {
        if self.records.is_empty() {
            self.selected = 0;
            return;
        }
        let last = self.records.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    pub fn page(&mut self, forward: bool) {
        let delta = PAGE_ROWS as isize;
        self.scroll(if forward { delta } else { -delta });
    }

    pub fn summary(&self, currency: &str) -> String {
        match &self.stats {
            Some(s) => {
                let slope = self
                    .trend
                    .map(|t| format!(" | trend: {:.2} {currency}/km", t.slope))
                    .unwrap_or_default();
                format!(
                    "{} trips | distance {:.1}-{:.1} km | price {:.2}-{:.2} {currency} (mean {:.2}){slope}",
                    s.n_rows, s.distance_min, s.distance_max, s.price_min, s.price_max, s.price_mean
                )
            }
            None => "No trips loaded.".to_string(),
        }
    }

    /// Scatter, trend line and padded bounds. `extra` is included in the
    /// bounds so a highlighted prediction is always visible.
    pub fn chart_series(&self, extra: Option<(f64, f64)>) -> ChartSeries {
        let points: Vec<(f64, f64)> = self
            .records
            .iter()
            .map(|r| (r.trip.trip_distance_km, r.trip_price))
            .collect();

        let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(x, y) in points.iter().chain(extra.iter()) {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if !x_min.is_finite() || !x_max.is_finite() || x_max <= x_min {
            x_min = 0.0;
            x_max = 100.0;
        }

        let trend = match self.trend {
            Some(line) => vec![(x_min, line.at(x_min)), (x_max, line.at(x_max))],
            None => Vec::new(),
        };
        for &(_, y) in &trend {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
            y_min = 0.0;
            y_max = 1.0;
        }

        let x_pad = ((x_max - x_min) * 0.02).max(1e-12);
        let y_pad = ((y_max - y_min) * 0.05).max(1e-12);

        ChartSeries {
            points,
            trend,
            x_bounds: [x_min - x_pad, x_max + x_pad],
            y_bounds: [y_min - y_pad, y_max + y_pad],
        }
    }
}

pub fn draw(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &DatasetView,
    highlight: Option<(f64, f64)>,
    currency: &str,
    error: Option<&str>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage(55),
            Constraint::Length(1),
            Constraint::Min(5),
        ])
        .split(area);

    draw_chart(frame, chunks[0], view, highlight, currency, error);

    let summary = Paragraph::new(view.summary(currency)).style(Style::default().fg(Color::Gray));
    frame.render_widget(summary, chunks[1]);

    draw_table(frame, chunks[2], view);
}

fn draw_chart(
    frame: &mut Frame<'_>,
    area: Rect,
    view: &DatasetView,
    highlight: Option<(f64, f64)>,
    currency: &str,
    error: Option<&str>,
) {
    let block = Block::default().title("Trip Price vs Distance").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    frame.render_widget(Clear, inner);

    if view.records.is_empty() {
        let (text, color) = match error {
            Some(err) => (err.to_string(), Color::Red),
            None => ("Waiting for data...".to_string(), Color::Yellow),
        };
        frame.render_widget(Paragraph::new(text).style(Style::default().fg(color)), inner);
        return;
    }

    let series = view.chart_series(highlight);
    let widget = FarePlottersChart {
        trend: &series.trend,
        points: &series.points,
        highlight,
        x_bounds: series.x_bounds,
        y_bounds: series.y_bounds,
        x_label: "distance (km)",
        y_label: format!("price ({currency})"),
        fmt_x: fmt_axis,
        fmt_y: fmt_axis,
    };

    frame.render_widget(widget, inner);
}

fn draw_table(frame: &mut Frame<'_>, area: Rect, view: &DatasetView) {
    let header = Row::new(
        ["#", "km", "time", "day", "pax", "traffic", "weather", "base", "/km", "/min", "min", "price"]
            .into_iter()
            .map(Cell::from),
    )
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let rows = view.records.iter().enumerate().map(|(i, r)| {
        let t = &r.trip;
        Row::new(vec![
            Cell::from(i.to_string()),
            Cell::from(format!("{:.2}", t.trip_distance_km)),
            Cell::from(t.time_of_day.label()),
            Cell::from(t.day_of_week.label()),
            Cell::from(format!("{:.0}", t.passenger_count)),
            Cell::from(t.traffic_conditions.label()),
            Cell::from(t.weather.label()),
            Cell::from(format!("{:.2}", t.base_fare)),
            Cell::from(format!("{:.2}", t.per_km_rate)),
            Cell::from(format!("{:.2}", t.per_minute_rate)),
            Cell::from(format!("{:.1}", t.trip_duration_minutes)),
            Cell::from(format!("{:.2}", r.trip_price)),
        ])
    });

    let widths = [
        Constraint::Length(4),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(4),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(5),
        Constraint::Length(6),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().title("Cleaned Dataset").borders(Borders::ALL))
        .row_highlight_style(Style::default().fg(Color::Black).bg(Color::White));

    let mut state = TableState::default().with_selected(Some(view.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn fmt_axis(v: f64) -> String {
    format!("{v:.0}")
}
