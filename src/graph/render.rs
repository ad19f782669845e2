use base64::{ engine::general_purpose::STANDARD, Engine as _ };
use image::{ codecs::png::PngEncoder, ColorType, ImageEncoder };
use log::{ debug, error, warn };
use plotters::chart::SeriesAnno;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use std::fmt::Display;
use thiserror::Error;

use super::expr::{ evaluate_function, EvalError };
use super::font::{ legend_font_available, LEGEND_FONT_FAMILY };
use crate::models::graph::{ GraphConfig, DEFAULT_COLORS };

type Chart<'a, 'b> = ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

pub const WIDTH: u32 = 1000;
pub const HEIGHT: u32 = 700;
pub const SAMPLES: usize = 1000;

/// Gridlines are always one unit apart, whatever the config asks for.
const GRID_SPACING: f64 = 1.0;
const MAX_GRID_LINES: usize = 400;
const MARGIN: i32 = 24;
const LINE_WIDTH: u32 = 1;
const GRID_DASH: Stroke = Stroke::Dashed { size: 4, spacing: 3 };
const TICK_LEN: i32 = 4;
const ARROW_LEN: i32 = 12;
const ARROW_HALF_WIDTH: i32 = 5;
const LEGEND_FONT_SIZE: f64 = 16.0;
const LEGEND_SWATCH: i32 = 32;

const AXIS_COLOR: RGBColor = RGBColor(0, 0, 0);
const GRID_COLOR: RGBColor = RGBColor(176, 176, 176);
const LEGEND_BORDER: RGBColor = RGBColor(204, 204, 204);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Error plotting function {function}: {source}")]
    Function {
        function: String,
        #[source]
        source: EvalError,
    },
    #[error("Invalid {axis} range [{min}, {max}]")]
    InvalidRange {
        axis: &'static str,
        min: f64,
        max: f64,
    },
    #[error("Drawing failed: {0}")]
    Draw(String),
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

fn draw_err(e: impl Display) -> RenderError {
    RenderError::Draw(e.to_string())
}

/// Renders function graphs to PNG data URIs.
#[derive(Debug, Clone, Default)]
pub struct GraphRenderer {
    font_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stroke {
    Solid,
    Dashed {
        size: u32,
        spacing: u32,
    },
}

struct Curve {
    label: String,
    color: RGBColor,
    stroke: Stroke,
    points: Vec<(f64, f64)>,
}

impl GraphRenderer {
    pub fn new(font_path: Option<String>) -> Self {
        Self { font_path }
    }

    /// Plots every function into one image. Any bad function aborts the
    /// whole render; partial graphs are never produced.
    pub fn render(&self, functions: &[String], config: &GraphConfig) -> Result<String, RenderError> {
        let settings = &config.graph_config;
        let x_range = checked_range("x", settings.x_range)?;
        let y_range = checked_range("y", settings.y_range)?;
        let [x_min, x_max] = x_range;
        let [y_min, y_max] = y_range;
        if settings.grid_spacing != GRID_SPACING {
            debug!("Ignoring requested grid spacing {}, using {}", settings.grid_spacing, GRID_SPACING);
        }

        let xs = linspace(x_min, x_max, SAMPLES);
        let mut curves = Vec::with_capacity(functions.len());

        for (i, function) in functions.iter().enumerate() {
            let f = evaluate_function(function).map_err(|source| {
                error!("Error plotting function {}: {}", function, source);
                RenderError::Function { function: function.clone(), source }
            })?;
            let ys = f.eval_many(&xs);
            let points = xs
                .iter()
                .zip(ys)
                .map(|(&x, y)| (x, y.clamp(y_min, y_max)))
                .collect();

            curves.push(Curve {
                label: function.clone(),
                color: resolve_color(config.styling.color_for(i), i),
                stroke: stroke_for(config.styling.line_style_for(i)),
                points,
            });
        }

        let x_ticks = ticks(x_min, x_max, GRID_SPACING);
        let y_ticks = ticks(y_min, y_max, GRID_SPACING);
        let with_legend = !curves.is_empty() && legend_font_available(self.font_path.as_deref());
        let mut pixels = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
        {
            let root = BitMapBackend::with_buffer(&mut pixels, (WIDTH, HEIGHT)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .margin(MARGIN)
                .build_cartesian_2d(x_min..x_max, y_min..y_max)
                .map_err(draw_err)?;

            draw_grid(&mut chart, x_range, y_range, &x_ticks, &y_ticks)?;
            draw_axes(&mut chart, x_range, y_range, &x_ticks, &y_ticks)?;
            for curve in &curves {
                draw_curve(&mut chart, curve, with_legend)?;
            }

            if with_legend {
                chart
                    .configure_series_labels()
                    .position(SeriesLabelPosition::UpperRight)
                    .label_font((LEGEND_FONT_FAMILY, LEGEND_FONT_SIZE).into_font().color(&BLACK))
                    .background_style(&WHITE.mix(0.9))
                    .border_style(&LEGEND_BORDER)
                    .draw()
                    .map_err(draw_err)?;
            }
            root.present().map_err(draw_err)?;
        }

        let mut png = Vec::new();
        PngEncoder::new(&mut png).write_image(&pixels, WIDTH, HEIGHT, ColorType::Rgb8)?;
        debug!("Rendered {} function(s) into {} PNG bytes", curves.len(), png.len());

        Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
    }
}

fn checked_range(axis: &'static str, range: [f64; 2]) -> Result<[f64; 2], RenderError> {
    let [min, max] = range;
    if !min.is_finite() || !max.is_finite() || min >= max || !(max - min).is_finite() {
        return Err(RenderError::InvalidRange { axis, min, max });
    }
    Ok(range)
}

pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / ((n - 1) as f64);
            (0..n).map(|i| if i == n - 1 { end } else { start + step * (i as f64) }).collect()
        }
    }
}

/// Tick positions from `min` in steps of `step`, empty when there would be too many.
fn ticks(min: f64, max: f64, step: f64) -> Vec<f64> {
    let intervals = ((max - min) / step).floor();
    if !(intervals < MAX_GRID_LINES as f64) {
        warn!("Skipping gridlines for range [{}, {}], more than {} needed", min, max, MAX_GRID_LINES);
        return Vec::new();
    }
    (0..=intervals as usize).map(|i| min + step * (i as f64)).collect()
}

/// Dashed unit grid; the mesh from `configure_mesh` only draws solid lines.
fn draw_grid(
    chart: &mut Chart<'_, '_>,
    [x_min, x_max]: [f64; 2],
    [y_min, y_max]: [f64; 2],
    x_ticks: &[f64],
    y_ticks: &[f64]
) -> Result<(), RenderError> {
    let style = GRID_COLOR.mix(0.7).stroke_width(1);
    let lines = x_ticks
        .iter()
        .map(|&x| vec![(x, y_min), (x, y_max)])
        .chain(y_ticks.iter().map(|&y| vec![(x_min, y), (x_max, y)]));
    for line in lines {
        stroke_series(chart, line, GRID_DASH, style)?;
    }
    Ok(())
}

/// Spines through the origin (clamped into view) with unlabeled ticks and arrowheads.
fn draw_axes(
    chart: &mut Chart<'_, '_>,
    [x_min, x_max]: [f64; 2],
    [y_min, y_max]: [f64; 2],
    x_ticks: &[f64],
    y_ticks: &[f64]
) -> Result<(), RenderError> {
    let style = AXIS_COLOR.stroke_width(1);
    let ox = (0.0f64).clamp(x_min, x_max);
    let oy = (0.0f64).clamp(y_min, y_max);

    chart
        .draw_series([
            PathElement::new(vec![(x_min, oy), (x_max, oy)], style),
            PathElement::new(vec![(ox, y_min), (ox, y_max)], style),
        ])
        .map_err(draw_err)?;
    chart
        .draw_series(
            x_ticks
                .iter()
                .map(|&x| EmptyElement::at((x, oy)) + PathElement::new(vec![(0, 0), (0, TICK_LEN)], style))
        )
        .map_err(draw_err)?;
    chart
        .draw_series(
            y_ticks
                .iter()
                .map(|&y| EmptyElement::at((ox, y)) + PathElement::new(vec![(-TICK_LEN, 0), (0, 0)], style))
        )
        .map_err(draw_err)?;

    let arrow = AXIS_COLOR.stroke_width(2);
    chart
        .draw_series([
            EmptyElement::at((x_max, oy)) +
                PathElement::new(
                    vec![(-ARROW_LEN, -ARROW_HALF_WIDTH), (0, 0), (-ARROW_LEN, ARROW_HALF_WIDTH)],
                    arrow
                ),
            EmptyElement::at((ox, y_max)) +
                PathElement::new(
                    vec![(-ARROW_HALF_WIDTH, ARROW_LEN), (0, 0), (ARROW_HALF_WIDTH, ARROW_LEN)],
                    arrow
                ),
        ])
        .map_err(draw_err)?;
    Ok(())
}

fn draw_curve(chart: &mut Chart<'_, '_>, curve: &Curve, with_legend: bool) -> Result<(), RenderError> {
    let style = curve.color.stroke_width(LINE_WIDTH);
    let mut labelled = !with_legend;

    // NaN samples split the curve into separately drawn runs
    for run in curve.points.split(|(_, y)| !y.is_finite()).filter(|run| run.len() > 1) {
        let series = stroke_series(chart, run.to_vec(), curve.stroke, style)?;
        if !labelled {
            series
                .label(curve.label.as_str())
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + LEGEND_SWATCH, y)], style));
            labelled = true;
        }
    }
    Ok(())
}

fn stroke_series<'c, 'a, 'b>(
    chart: &'c mut Chart<'a, 'b>,
    points: Vec<(f64, f64)>,
    stroke: Stroke,
    style: ShapeStyle
) -> Result<&'c mut SeriesAnno<'a, BitMapBackend<'b>>, RenderError> {
    (match stroke {
        Stroke::Solid => chart.draw_series(LineSeries::new(points, style)),
        Stroke::Dashed { size, spacing } => chart.draw_series(DashedLineSeries::new(points, size, spacing, style)),
    }).map_err(draw_err)
}

/// Dash and gap lengths in pixels for a line style name.
fn stroke_for(style: &str) -> Stroke {
    match style.trim() {
        "solid" | "-" | "" => Stroke::Solid,
        "dashed" | "--" => Stroke::Dashed { size: 10, spacing: 5 },
        "dotted" | ":" => Stroke::Dashed { size: 2, spacing: 4 },
        "dashdot" | "-." => Stroke::Dashed { size: 14, spacing: 4 },
        other => {
            warn!("Unknown line style '{}', drawing solid", other);
            Stroke::Solid
        }
    }
}

fn resolve_color(color: &str, index: usize) -> RGBColor {
    parse_color(color).unwrap_or_else(|| {
        warn!("Unknown color '{}', using the default cycle", color);
        parse_color(DEFAULT_COLORS[index % DEFAULT_COLORS.len()]).unwrap_or(BLACK)
    })
}

/// `#rrggbb`, `#rgb`, single-letter and common colour names.
pub fn parse_color(color: &str) -> Option<RGBColor> {
    let color = color.trim();
    if let Some(hex) = color.strip_prefix('#') {
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        return match hex.len() {
            6 | 8 => Some(RGBColor(channel(&hex[0..2])?, channel(&hex[2..4])?, channel(&hex[4..6])?)),
            3 => {
                let c = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Some(RGBColor(c(0)?, c(1)?, c(2)?))
            }
            _ => None,
        };
    }

    let name = color.to_lowercase();
    let name = name.strip_prefix("tab:").unwrap_or(&name);
    let rgb = match name {
        "b" => (0, 0, 255),
        "g" => (0, 128, 0),
        "r" => (255, 0, 0),
        "c" => (0, 191, 191),
        "m" => (191, 0, 191),
        "y" => (191, 191, 0),
        "k" | "black" => (0, 0, 0),
        "w" | "white" => (255, 255, 255),
        "blue" => (31, 119, 180),
        "orange" => (255, 127, 14),
        "green" => (44, 160, 44),
        "red" => (214, 39, 40),
        "purple" => (148, 103, 189),
        "brown" => (140, 86, 75),
        "pink" => (227, 119, 194),
        "gray" | "grey" => (127, 127, 127),
        "olive" => (188, 189, 34),
        "cyan" => (23, 190, 207),
        "magenta" => (255, 0, 255),
        "yellow" => (255, 255, 0),
        "navy" => (0, 0, 128),
        "teal" => (0, 128, 128),
        _ => {
            return None;
        }
    };
    Some(RGBColor(rgb.0, rgb.1, rgb.2))
}
