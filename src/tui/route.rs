//! Route page: geocode two places, measure the geodesic distance and price
//! the trip.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Paragraph, Wrap,
        canvas::{Canvas, Line as CanvasLine, Map, MapResolution},
    },
};

use crate::data::geo::Location;
use crate::data::{ApiClient, ClientError, GeoPoint, Geocoder, geodesic_km};
use crate::domain::{Categorical, PredictionResponse, TripInput};

use super::form::TripForm;

pub const DEFAULT_FROM: &str = "Stockholm";
pub const DEFAULT_TO: &str = "Göteborg";

/// Minimum map window (degrees) so short trips still show the coastline.
const MIN_SPAN_DEG: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFocus {
    From,
    To,
    Params,
}

#[derive(Debug, Clone)]
pub struct RouteResult {
    pub from: Location,
    pub to: Location,
    pub distance_km: f64,
    pub trip: TripInput,
    pub quote: PredictionResponse,
}

#[derive(Debug, Clone)]
pub struct RouteState {
    pub from: String,
    pub to: String,
    pub focus: RouteFocus,
    pub editing_text: bool,
    pub form: TripForm,
    pub result: Option<Result<RouteResult, String>>,
}

impl Default for RouteState {
    fn default() -> Self {
        Self {
            from: DEFAULT_FROM.to_string(),
            to: DEFAULT_TO.to_string(),
            focus: RouteFocus::From,
            editing_text: false,
            form: TripForm::route(),
            result: None,
        }
    }
}

impl RouteState {
    pub fn is_editing(&self) -> bool {
        self.editing_text || self.form.is_editing()
    }

    pub fn focus_next(&mut self) {
        match self.focus {
            RouteFocus::From => self.focus = RouteFocus::To,
            RouteFocus::To => self.focus = RouteFocus::Params,
            RouteFocus::Params => self.form.select_next(),
        }
    }

    pub fn focus_prev(&mut self) {
        match self.focus {
            RouteFocus::From => {}
            RouteFocus::To => self.focus = RouteFocus::From,
            RouteFocus::Params if self.form.selected() == 0 => self.focus = RouteFocus::To,
            RouteFocus::Params => self.form.select_prev(),
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self.focus {
            RouteFocus::From => Some(&mut self.from),
            RouteFocus::To => Some(&mut self.to),
            RouteFocus::Params => None,
        }
    }

    /// Geocode both ends, compute the distance and ask the API for a price.
    pub fn calculate(&mut self, geocoder: &Geocoder, api: &ApiClient) {
        let from = geocoder.geocode(&self.from);
        let to = geocoder.geocode(&self.to);

        self.result = Some(resolve_endpoints(from, to).and_then(|(from, to)| {
            let distance_km = geodesic_km(from.point, to.point);
            let trip = TripInput {
                trip_distance_km: distance_km,
                ..self.form.trip.clone()
            };
            tracing::info!(
                "route {} -> {}: {distance_km:.2} km",
                from.query,
                to.query
            );
            let quote = api.predict(&trip).map_err(|e| match e {
                ClientError::Status(code) => format!("Prediction error: {code}"),
                other => other.to_string(),
            })?;
            Ok(RouteResult {
                from,
                to,
                distance_km,
                trip,
                quote,
            })
        }));
    }

    /// Lines for the debug snapshot.
    pub fn describe(&self) -> Vec<String> {
        match &self.result {
            Some(Ok(r)) => route_summary(r),
            Some(Err(e)) => vec![format!("error: {e}")],
            None => Vec::new(),
        }
    }
}

/// Combine both geocoding results; unknown places are reported together.
pub fn resolve_endpoints(
    from: Result<Location, ClientError>,
    to: Result<Location, ClientError>,
) -> Result<(Location, Location), String> {
    match (from, to) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (from, to) => {
            let mut errors = Vec::new();
            for err in [from.err(), to.err()].into_iter().flatten() {
                let msg = err.to_string();
                if !errors.contains(&msg) {
                    errors.push(msg);
                }
            }
            Err(errors.join(" | "))
        }
    }
}

/// Map window around both points: `(x_bounds, y_bounds)` in (lon, lat).
pub fn map_bounds(a: GeoPoint, b: GeoPoint) -> ([f64; 2], [f64; 2]) {
    let mid = a.midpoint(&b);
    let span = ((a.lat - b.lat).abs().max((a.lon - b.lon).abs()) * 1.5).max(MIN_SPAN_DEG);
    let half = span / 2.0;

    let lon = [(mid.lon - half).max(-180.0), (mid.lon + half).min(180.0)];
    let lat = [(mid.lat - half).max(-90.0), (mid.lat + half).min(90.0)];
    (lon, lat)
}

pub fn route_summary(r: &RouteResult) -> Vec<String> {
    let t = &r.trip;
    vec![
        format!("From: {}", place_label(&r.from)),
        format!("To: {}", place_label(&r.to)),
        format!("Distance: {:.2} km (calculated from route)", r.distance_km),
        format!("Duration: {:.0} minutes", t.trip_duration_minutes),
        format!("Time: {}, {}", t.time_of_day.label(), t.day_of_week.label()),
        format!("Traffic: {}, Weather: {}", t.traffic_conditions.label(), t.weather.label()),
        format!("Estimated price: {:.2} {}", r.quote.predicted_price, r.quote.currency),
    ]
}

/// The typed query plus the geocoder's full name for it, when it adds anything.
fn place_label(loc: &Location) -> String {
    if loc.display_name.is_empty() || loc.display_name == loc.query {
        loc.query.clone()
    } else {
        format!("{} ({})", loc.query, loc.display_name)
    }
}

pub fn draw(frame: &mut Frame<'_>, area: Rect, state: &RouteState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(46), Constraint::Min(20)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Min(0)])
        .split(cols[0]);

    draw_locations(frame, left[0], state);
    draw_params(frame, left[1], state);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(9)])
        .split(cols[1]);

    draw_map(frame, right[0], state);
    draw_result(frame, right[1], state);
}

fn draw_locations(frame: &mut Frame<'_>, area: Rect, state: &RouteState) {
    let line = |label: &str, value: &str, focus: RouteFocus| {
        let focused = state.focus == focus;
        let cursor = if focused && state.editing_text { "_" } else { "" };
        let style = if focused {
            Style::default().fg(Color::Black).bg(Color::White)
        } else {
            Style::default()
        };
        Line::from(vec![
            Span::raw(format!("{label:<6}")),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    };

    let text = Text::from(vec![
        line("From", &state.from, RouteFocus::From),
        line("To", &state.to, RouteFocus::To),
    ]);
    let p = Paragraph::new(text).block(Block::default().title("Locations").borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_params(frame: &mut Frame<'_>, area: Rect, state: &RouteState) {
    let form = &state.form;
    let lines: Vec<Line> = form
        .fields()
        .iter()
        .enumerate()
        .map(|(i, &field)| {
            let selected = state.focus == RouteFocus::Params && i == form.selected();
            let style = if selected {
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
        .block(Block::default().title("Trip & Pricing Parameters").borders(Borders::ALL));
    frame.render_widget(p, area);
}

fn draw_map(frame: &mut Frame<'_>, area: Rect, state: &RouteState) {
    let block = Block::default().title("Route Map").borders(Borders::ALL);

    let route = match &state.result {
        Some(Ok(r)) => Some((r.from.point, r.to.point)),
        _ => None,
    };
    let (x_bounds, y_bounds) = match route {
        Some((a, b)) => map_bounds(a, b),
        None => ([-180.0, 180.0], [-90.0, 90.0]),
    };

    let canvas = Canvas::default()
        .block(block)
        .x_bounds(x_bounds)
        .y_bounds(y_bounds)
        .paint(move |ctx| {
            ctx.draw(&Map {
                color: Color::DarkGray,
                resolution: MapResolution::High,
            });
            if let Some((a, b)) = route {
                ctx.layer();
                ctx.draw(&CanvasLine {
                    x1: a.lon,
                    y1: a.lat,
                    x2: b.lon,
                    y2: b.lat,
                    color: Color::Blue,
                });
                ctx.print(a.lon, a.lat, Span::styled("S", Style::default().fg(Color::Green)));
                ctx.print(b.lon, b.lat, Span::styled("E", Style::default().fg(Color::Red)));
            }
        });
    frame.render_widget(canvas, area);
}

fn draw_result(frame: &mut Frame<'_>, area: Rect, state: &RouteState) {
    let block = Block::default().title("Estimated Trip Price").borders(Borders::ALL);
    let text = match &state.result {
        None => Text::from(Span::styled(
            "Press c to calculate route & price.",
            Style::default().fg(Color::Gray),
        )),
        Some(Err(err)) => Text::from(Span::styled(err.clone(), Style::default().fg(Color::Red))),
        Some(Ok(r)) => {
            let mut lines = vec![Line::from(Span::styled(
                format!("{:.2} {}", r.quote.predicted_price, r.quote.currency),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ))];
            lines.extend(route_summary(r).into_iter().take(6).map(Line::from));
            Text::from(lines)
        }
    };
    frame.render_widget(Paragraph::new(text).wrap(Wrap { trim: true }).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::geo::tests::geocoder;
    use crate::domain::TripRecord;
    use crate::model::tests::shipped_model;
    use crate::server::{AppState, router, spawn_test_server};

    fn api() -> ApiClient {
        let records = vec![TripRecord {
            trip: TripInput::default(),
            trip_price: 40.0,
        }];
        ApiClient::new(spawn_test_server(router(AppState::new(shipped_model(), records))))
    }

    fn route(from: &str, to: &str) -> RouteState {
        RouteState {
            from: from.to_string(),
            to: to.to_string(),
            ..RouteState::default()
        }
    }

    #[test]
    fn calculate_prices_the_geodesic_distance() {
        let geo = geocoder();
        let mut state = RouteState::default();
        state.calculate(&geo, &api());

        let result = state.result.clone().unwrap().unwrap();
        let expected = geodesic_km(GeoPoint::new(59.3251172, 18.0710935), GeoPoint::new(57.7072326, 11.9670171));
        assert!((result.distance_km - expected).abs() < 1e-9);
        assert!(result.distance_km > 390.0 && result.distance_km < 400.0);
        assert_eq!(result.trip.trip_distance_km, result.distance_km);
        assert_eq!(result.trip.trip_duration_minutes, 180.0);
        assert!(result.quote.predicted_price > 0.0);
        assert_eq!(result.quote.currency, "SEK");

        let lines = state.describe();
        assert_eq!(lines[0], "From: Stockholm (Stockholm, Sverige)");
        assert!(lines[2].starts_with("Distance: "));
    }

    #[test]
    fn calculate_reports_unknown_places() {
        let geo = geocoder();
        let api = api();

        let mut state = route("Atlantis", "Göteborg");
        state.calculate(&geo, &api);
        assert_eq!(
            state.result.clone().unwrap().unwrap_err(),
            "Could not find location: Atlantis"
        );

        let mut state = route("Atlantis", "Lemuria");
        state.calculate(&geo, &api);
        assert_eq!(
            state.result.clone().unwrap().unwrap_err(),
            "Could not find location: Atlantis | Could not find location: Lemuria"
        );
    }

    #[test]
    fn rejected_prediction_reports_status() {
        // Same place twice gives distance 0, which the API refuses.
        let mut state = route("Stockholm", "Stockholm");
        state.calculate(&geocoder(), &api());
        assert_eq!(state.result.clone().unwrap().unwrap_err(), "Prediction error: 422");
        assert_eq!(state.describe(), vec!["error: Prediction error: 422".to_string()]);
    }

    fn loc(query: &str, lat: f64, lon: f64) -> Location {
        Location {
            query: query.to_string(),
            display_name: query.to_string(),
            point: GeoPoint::new(lat, lon),
        }
    }

    #[test]
    fn both_unknown_locations_are_reported() {
        let err = resolve_endpoints(
            Err(ClientError::NotFound("Atlantis".to_string())),
            Err(ClientError::NotFound("Lemuria".to_string())),
        )
        .unwrap_err();
        assert_eq!(
            err,
            "Could not find location: Atlantis | Could not find location: Lemuria"
        );
    }

    #[test]
    fn one_side_failing_keeps_its_message() {
        let err = resolve_endpoints(
            Ok(loc("Stockholm", 59.3, 18.1)),
            Err(ClientError::Connect {
                service: "geocoding service",
            }),
        )
        .unwrap_err();
        assert_eq!(err, "Cannot connect to geocoding service");

        let (a, b) = resolve_endpoints(Ok(loc("A", 1.0, 2.0)), Ok(loc("B", 3.0, 4.0))).unwrap();
        assert_eq!((a.query.as_str(), b.query.as_str()), ("A", "B"));
    }

    #[test]
    fn map_window_contains_both_ends() {
        let a = GeoPoint::new(59.3293, 18.0686);
        let b = GeoPoint::new(57.7089, 11.9746);
        let (lon, lat) = map_bounds(a, b);
        for p in [a, b] {
            assert!(lon[0] < p.lon && p.lon < lon[1]);
            assert!(lat[0] < p.lat && p.lat < lat[1]);
        }
        assert!((lon[1] - lon[0] - 9.1410).abs() < 1e-3);

        let (lon, lat) = map_bounds(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.1, 0.1));
        assert!((lon[1] - lon[0] - MIN_SPAN_DEG).abs() < 1e-9);
        assert!((lat[1] - lat[0] - MIN_SPAN_DEG).abs() < 1e-9);

        let (lon, _) = map_bounds(GeoPoint::new(0.0, -170.0), GeoPoint::new(0.0, 170.0));
        assert_eq!(lon, [-180.0, 180.0]);
    }

    #[test]
    fn focus_moves_through_inputs_then_params() {
        let mut state = RouteState::default();
        assert_eq!(state.from, "Stockholm");
        state.focus_next();
        assert_eq!(state.focus, RouteFocus::To);
        state.focus_next();
        assert_eq!(state.focus, RouteFocus::Params);
        state.focus_next();
        assert_eq!(state.form.selected(), 1);
        state.focus_prev();
        state.focus_prev();
        assert_eq!(state.focus, RouteFocus::To);
        assert!(state.text_mut().is_some());
    }
}
