//! Plotters-powered fare scatter widget for Ratatui.
//!
//! Plotters gives nicer axis and label rendering than Ratatui's built-in
//! `Chart`. Output goes into the Ratatui buffer through
//! `plotters-ratatui-backend`.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; all series and bounds are computed by
/// the caller.
pub struct FarePlottersChart<'a> {
    /// Two-point line series for the least squares trend.
    pub trend: &'a [(f64, f64)],
    /// One point per dataset trip (distance, price).
    pub points: &'a [(f64, f64)],
    /// The most recent prediction, drawn on top.
    pub highlight: Option<(f64, f64)>,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: String,
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl<'a> Widget for FarePlottersChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to build a chart in a tiny area.
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let x0 = self.x_bounds[0];
        let x1 = self.x_bounds[1];
        let y0 = self.y_bounds[0];
        let y1 = self.y_bounds[1];

        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res, so keep label areas compact.
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(&self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            let trend_color = RGBColor(0, 255, 255); // cyan
            let points_color = WHITE;
            let highlight_color = RGBColor(255, 255, 0); // yellow

            chart.draw_series(LineSeries::new(self.trend.iter().copied(), &trend_color))?;

            chart.draw_series(
                self.points
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), points_color)),
            )?;

            // `Circle` radii are mis-scaled by the ratatui backend; a colored
            // pixel is the reliable marker.
            chart.draw_series(
                self.highlight
                    .iter()
                    .map(|&(x, y)| Pixel::new((x, y), highlight_color)),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}
