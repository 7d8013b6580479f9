//! Broadside S-parameter and polar emission-pattern plots.

use std::error::Error;
use std::f64::consts::PI;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;

use crate::analysis::AngleResult;
use crate::config::ImageFormat;
use crate::error::{AnalysisError, AnalysisResult};

const PLOT_SIZE: (u32, u32) = (1024, 768);
const POLAR_SIZE: (u32, u32) = (800, 800);
const FONT_SIZE_TITLE: i32 = 28;
const FONT_SIZE_LABEL: i32 = 16;
const LINE_WIDTH: u32 = 2;
const POLAR_RINGS: usize = 4;
const SPOKE_STEP_DEG: usize = 30;

const S11_COLOR: RGBColor = RGBColor(31, 119, 180);
const S12_COLOR: RGBColor = RGBColor(255, 127, 14);
const S21_COLOR: RGBColor = RGBColor(44, 160, 44);
const S22_COLOR: RGBColor = RGBColor(214, 39, 40);
const GRID_COLOR: RGBColor = RGBColor(200, 200, 200);

/// Plot range with 10% padding, or a fixed padding for flat data.
pub fn padded_range(min_val: f64, max_val: f64) -> (f64, f64) {
    let (min, max) = if min_val <= max_val {
        (min_val, max_val)
    } else {
        (max_val, min_val)
    };
    let range = max - min;
    let padding = if range < 1e-12 { 0.5 } else { range * 0.1 };
    (min - padding, max + padding)
}

/// Inner and outer gain of the polar axis. dB patterns put the weakest
/// finite gain at the centre; linear patterns start at zero.
pub fn radial_bounds(gains: &[f64], linear: bool) -> (f64, f64) {
    let finite = gains.iter().copied().filter(|g| g.is_finite());
    let (min, max) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), g| {
        (lo.min(g), hi.max(g))
    });
    if min > max {
        return (0., 1.);
    }
    let inner = if linear { min.min(0.) } else { min };
    let outer = if max > inner { max } else { inner + 1. };
    (inner, outer)
}

/// Maps `(angle rad, gain)` points onto the unit disc, dropping
/// non-finite gains.
pub fn polar_to_cartesian(points: &[(f64, f64)], inner: f64, outer: f64) -> Vec<(f64, f64)> {
    let span = outer - inner;
    points
        .iter()
        .filter(|(theta, gain)| theta.is_finite() && gain.is_finite())
        .map(|&(theta, gain)| {
            let rho = ((gain - inner) / span).max(0.);
            (rho * theta.cos(), rho * theta.sin())
        })
        .collect()
}

fn plot_error(e: Box<dyn Error>) -> AnalysisError {
    AnalysisError::Plot(e.to_string())
}

/// Draws the four S-parameter magnitudes of one measurement against
/// frequency.
pub fn broadside_sparams(path: &Path, antenna: &str, result: &AngleResult, format: ImageFormat) -> AnalysisResult<()> {
    let outcome = match format {
        ImageFormat::Png => draw_broadside(BitMapBackend::new(path, PLOT_SIZE).into_drawing_area(), antenna, result),
        ImageFormat::Svg => draw_broadside(SVGBackend::new(path, PLOT_SIZE).into_drawing_area(), antenna, result),
    };
    outcome.map_err(plot_error)
}

/// Draws the best-case gain per angle as a closed polar trace.
pub fn emission_pattern(
    path: &Path,
    antenna: &str,
    points: &[(f64, f64)],
    linear: bool,
    format: ImageFormat,
) -> AnalysisResult<()> {
    let outcome = match format {
        ImageFormat::Png => {
            draw_polar(BitMapBackend::new(path, POLAR_SIZE).into_drawing_area(), antenna, points, linear)
        }
        ImageFormat::Svg => {
            draw_polar(SVGBackend::new(path, POLAR_SIZE).into_drawing_area(), antenna, points, linear)
        }
    };
    outcome.map_err(plot_error)
}

fn draw_broadside<DB>(root: DrawingArea<DB, Shift>, antenna: &str, result: &AngleResult) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let freqs_ghz: Vec<f64> = result.frequency.f().iter().map(|f| f / 1e9).collect();
    let traces = [
        ("S11", &result.s11, S11_COLOR),
        ("S12", &result.s12, S12_COLOR),
        ("S21", &result.s21, S21_COLOR),
        ("S22", &result.s22, S22_COLOR),
    ];
    let y_max = traces
        .iter()
        .flat_map(|(_, values, _)| values.iter().copied())
        .filter(|v| v.is_finite())
        .fold(0., f64::max);
    let (x_min, x_max) = match (freqs_ghz.first(), freqs_ghz.last()) {
        (Some(&lo), Some(&hi)) if hi > lo => (lo, hi),
        (Some(&lo), _) => padded_range(lo, lo),
        _ => (0., 1.),
    };
    let (_, y_top) = padded_range(0., y_max);

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("S Parameters of Broadside of Antenna {}", antenna),
            ("sans-serif", FONT_SIZE_TITLE),
        )
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(60)
        .build_cartesian_2d(x_min..x_max, 0f64..y_top)?;

    chart
        .configure_mesh()
        .x_desc("Frequency (GHz)")
        .y_desc("Magnitude of S Parameter")
        .light_line_style(WHITE.mix(0.7))
        .label_style(("sans-serif", FONT_SIZE_LABEL))
        .draw()?;

    for (name, values, color) in traces {
        let data = freqs_ghz
            .iter()
            .copied()
            .zip(values.iter().copied())
            .filter(|(_, v)| v.is_finite());
        chart
            .draw_series(LineSeries::new(data, color.stroke_width(LINE_WIDTH)))?
            .label(name)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(LINE_WIDTH)));
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", FONT_SIZE_LABEL))
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_polar<DB>(
    root: DrawingArea<DB, Shift>,
    antenna: &str,
    points: &[(f64, f64)],
    linear: bool,
) -> Result<(), Box<dyn Error>>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;

    let gains: Vec<f64> = points.iter().map(|p| p.1).collect();
    let (inner, outer) = radial_bounds(&gains, linear);
    let units = if linear { "linear units" } else { "dBi" };

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("Emission gain of Antenna {} in {}", antenna, units),
            ("sans-serif", FONT_SIZE_TITLE),
        )
        .margin(20)
        .build_cartesian_2d(-1.2f64..1.2f64, -1.2f64..1.2f64)?;

    // Rings, labelled with the gain they represent
    for ring in 1..=POLAR_RINGS {
        let rho = ring as f64 / POLAR_RINGS as f64;
        let circle = (0..=360).map(|deg| {
            let theta = (deg as f64).to_radians();
            (rho * theta.cos(), rho * theta.sin())
        });
        chart.draw_series(LineSeries::new(circle, GRID_COLOR.stroke_width(1)))?;
        let value = inner + rho * (outer - inner);
        let label_theta = 22.5f64.to_radians();
        chart.draw_series(std::iter::once(Text::new(
            format!("{:.1}", value),
            (rho * label_theta.cos(), rho * label_theta.sin()),
            ("sans-serif", FONT_SIZE_LABEL - 2).into_font().color(&BLACK.mix(0.6)),
        )))?;
    }

    for deg in (0..360).step_by(SPOKE_STEP_DEG) {
        let theta = (deg as f64) * PI / 180.;
        let (x, y) = (theta.cos(), theta.sin());
        chart.draw_series(LineSeries::new(vec![(0., 0.), (x, y)], GRID_COLOR.stroke_width(1)))?;
        chart.draw_series(std::iter::once(Text::new(
            format!("{}°", deg),
            (1.1 * x - 0.04, 1.1 * y + 0.03),
            ("sans-serif", FONT_SIZE_LABEL).into_font(),
        )))?;
    }

    let trace = polar_to_cartesian(points, inner, outer);
    chart.draw_series(LineSeries::new(trace.iter().copied(), S11_COLOR.stroke_width(LINE_WIDTH)))?;
    chart.draw_series(trace.iter().map(|&p| Circle::new(p, 3, S11_COLOR.filled())))?;

    root.present()?;
    Ok(())
}
