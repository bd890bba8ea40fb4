use base64::{engine::general_purpose::STANDARD, Engine as _};
use plotters::prelude::*;
use crate::errors::{AppError, AppResult};
use crate::models::Reading;

/// Number of most recent readings plotted on the history page.
pub const TREND_WINDOW: usize = 5;

const CHART_SIZE: (u32, u32) = (1000, 400);

#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub date: String,
    pub bmi: f64,
}

/// Takes the last `TREND_WINDOW` readings. History is stored oldest first,
/// so the result is already in chronological order.
pub fn recent_trend(history: &[Reading]) -> Vec<TrendPoint> {
    let start = history.len().saturating_sub(TREND_WINDOW);
    history[start..]
        .iter()
        .map(|r| TrendPoint {
            date: r.timestamp.format("%Y-%m-%d").to_string(),
            bmi: r.bmi,
        })
        .collect()
}

fn bmi_bounds(points: &[TrendPoint]) -> (f64, f64) {
    let min = points.iter().map(|p| p.bmi).fold(f64::INFINITY, f64::min);
    let max = points.iter().map(|p| p.bmi).fold(f64::NEG_INFINITY, f64::max);
    (min - 1.0, max + 1.0)
}

// x positions are reading indices; only whole indices get a date label
fn date_label(points: &[TrendPoint], x: f64) -> String {
    let index = x.round();
    if (x - index).abs() > 1e-6 || index < 0.0 {
        return String::new();
    }
    points
        .get(index as usize)
        .map(|p| p.date.clone())
        .unwrap_or_default()
}

fn draw_trend(points: &[TrendPoint], svg: &mut String) -> Result<(), Box<dyn std::error::Error>> {
    let root = SVGBackend::with_string(svg, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let (y_min, y_max) = bmi_bounds(points);
    let x_max = points.len() as f64 - 0.5;

    let mut chart = ChartBuilder::on(&root)
        .caption("BMI trend", ("sans-serif", 24))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(50)
        .build_cartesian_2d(-0.5f64..x_max, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_labels(points.len())
        .x_label_formatter(&|x| date_label(points, *x))
        .x_desc("date")
        .y_desc("BMI")
        .draw()?;

    let series = points.iter().enumerate().map(|(i, p)| (i as f64, p.bmi));
    chart.draw_series(LineSeries::new(series.clone(), &BLUE))?;
    chart.draw_series(series.map(|coord| Circle::new(coord, 4, BLUE.filled())))?;

    root.present()?;
    Ok(())
}

/// Renders the BMI trend as an SVG line chart.
pub fn render_trend_svg(points: &[TrendPoint]) -> AppResult<String> {
    let mut svg = String::new();
    draw_trend(points, &mut svg).map_err(|e| AppError::Chart(e.to_string()))?;
    Ok(svg)
}

/// Chart as an `<img>`-ready data URI, or `None` when there is nothing to plot.
pub fn trend_data_uri(history: &[Reading]) -> AppResult<Option<String>> {
    let points = recent_trend(history);
    if points.is_empty() {
        return Ok(None);
    }

    let svg = render_trend_svg(&points)?;
    Ok(Some(format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))))
}
