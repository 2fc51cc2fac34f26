//! ASCII plotting for terminal output.
//!
//! Fixed-size grid with deterministic output.
//!
//! Plot elements:
//! - trips: `o` at (predicted, actual)
//! - perfect-prediction diagonal: `.`
//! - optional highlights: `O` (over-priced), `U` (under-priced)

use std::collections::HashSet;

use crate::domain::TripResidual;
use crate::report::Rankings;

/// Render an actual-vs-predicted scatter. Both axes share one price range so
/// the diagonal is `actual == predicted`.
pub fn render_ascii_plot(
    residuals: &[TripResidual],
    width: usize,
    height: usize,
    rankings: Option<&Rankings>,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (lo, hi) = price_range(residuals).unwrap_or((0.0, 1.0));
    let (lo, hi) = pad_range(lo, hi, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Diagonal first so points overlay it.
    draw_line(
        &mut grid,
        map_x(lo, lo, hi, width),
        map_y(lo, lo, hi, height),
        map_x(hi, lo, hi, width),
        map_y(hi, lo, hi, height),
        '.',
    );

    let (over_rows, under_rows): (HashSet<usize>, HashSet<usize>) = rankings
        .map(|r| {
            (
                r.over.iter().map(|x| x.row).collect(),
                r.under.iter().map(|x| x.row).collect(),
            )
        })
        .unwrap_or_default();

    for r in residuals {
        let x = map_x(r.predicted, lo, hi, width);
        let y = map_y(r.record.trip_price, lo, hi, height);

        let ch = if over_rows.contains(&r.row) {
            'O'
        } else if under_rows.contains(&r.row) {
            'U'
        } else {
            'o'
        };

        // Highlights win over plain points sharing a cell.
        if ch != 'o' || (grid[y][x] != 'O' && grid[y][x] != 'U') {
            grid[y][x] = ch;
        }
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: predicted (x) vs actual (y) | price=[{lo:.2}, {hi:.2}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn price_range(residuals: &[TripResidual]) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for r in residuals {
        for v in [r.predicted, r.record.trip_price] {
            min = min.min(v);
            max = max.max(v);
        }
    }
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(v: f64, lo: f64, hi: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(v: f64, lo: f64, hi: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((v - lo) / (hi - lo)).clamp(0.0, 1.0);
    // Highest price is row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{TripInput, TripRecord};

    fn residual(row: usize, actual: f64, predicted: f64) -> TripResidual {
        TripResidual {
            row,
            record: TripRecord {
                trip: TripInput::default(),
                trip_price: actual,
            },
            predicted,
            residual: actual - predicted,
        }
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let points = vec![residual(0, 10.0, 10.0), residual(1, 30.0, 20.0)];

        let txt = render_ascii_plot(&points, 10, 5, None);
        let expected = concat!(
            "Plot: predicted (x) vs actual (y) | price=[9.00, 31.00]\n",
            "     o  ..\n",
            "      ..  \n",
            "    ..    \n",
            "  ..      \n",
            "o.        \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn highlights_ranked_trips() {
        let points = vec![
            residual(0, 10.0, 10.0),
            residual(1, 30.0, 20.0),
            residual(2, 12.0, 25.0),
        ];
        let rankings = Rankings {
            over: vec![points[1].clone()],
            under: vec![points[2].clone()],
        };
        let txt = render_ascii_plot(&points, 20, 8, Some(&rankings));
        assert_eq!(txt.matches('O').count(), 1);
        assert_eq!(txt.matches('U').count(), 1);
        assert_eq!(txt.lines().count(), 9);
    }
}
