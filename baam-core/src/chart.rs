//! SVG chart rendering with plotters.
//!
//! Produces the standalone vector markup each chart region holds: bar charts
//! (single, grouped, stacked or coloured per bar) and pie charts.

use crate::numfmt::format_axis_value;
use plotters::coord::ranged1d::SegmentValue;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error as StdError;

/// Categorical palette shared by pies and per-treatment bars
pub const PALETTE: [RGBColor; 6] = [
    RGBColor(0x00, 0x88, 0xFE),
    RGBColor(0x00, 0xC4, 0x9F),
    RGBColor(0xFF, 0xBB, 0x28),
    RGBColor(0xFF, 0x80, 0x42),
    RGBColor(0xEC, 0x48, 0x99),
    RGBColor(0x3B, 0x82, 0xF6),
];

pub const BLUE_500: RGBColor = RGBColor(0x3B, 0x82, 0xF6);
pub const EMERALD_500: RGBColor = RGBColor(0x10, 0xB9, 0x81);
pub const CYAN_500: RGBColor = RGBColor(0x06, 0xB6, 0xD4);
pub const AMBER_500: RGBColor = RGBColor(0xF5, 0x9E, 0x0B);
pub const PINK_500: RGBColor = RGBColor(0xEC, 0x48, 0x99);

const GRID: RGBColor = RGBColor(0x37, 0x41, 0x51);
const AXIS: RGBColor = RGBColor(0x4B, 0x55, 0x63);
const FONT: &str = "sans-serif";

type DrawResult = std::result::Result<(), Box<dyn StdError>>;

/// One named series of a bar chart
#[derive(Debug, Clone)]
pub struct BarSeries {
    pub name: String,
    pub color: RGBColor,
    pub values: Vec<f64>,
}

impl BarSeries {
    pub fn new(name: impl Into<String>, color: RGBColor, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            color,
            values,
        }
    }
}

/// How several series share one category slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarLayout {
    /// Side by side
    Grouped,
    /// On top of each other
    Stacked,
}

/// Bar chart description
#[derive(Debug, Clone)]
pub struct BarChart {
    pub categories: Vec<String>,
    pub series: Vec<BarSeries>,
    pub layout: BarLayout,
    /// Per-bar colour override, used when each category belongs to a group
    pub bar_colors: Option<Vec<RGBColor>>,
    /// Legend entries drawn when `bar_colors` is set
    pub color_legend: Vec<(String, RGBColor)>,
    /// Vertical category labels for long names
    pub rotate_labels: bool,
    pub legend: bool,
}

impl BarChart {
    pub fn new(categories: Vec<String>) -> Self {
        Self {
            categories,
            series: Vec::new(),
            layout: BarLayout::Grouped,
            bar_colors: None,
            color_legend: Vec::new(),
            rotate_labels: false,
            legend: false,
        }
    }

    pub fn series(mut self, series: BarSeries) -> Self {
        self.series.push(series);
        self
    }

    pub fn stacked(mut self) -> Self {
        self.layout = BarLayout::Stacked;
        self
    }

    pub fn rotated_labels(mut self) -> Self {
        self.rotate_labels = true;
        self
    }

    pub fn with_legend(mut self) -> Self {
        self.legend = true;
        self
    }

    /// Colour each bar individually and list the groups in a legend
    pub fn colored_bars(mut self, colors: Vec<RGBColor>, legend: Vec<(String, RGBColor)>) -> Self {
        self.bar_colors = Some(colors);
        self.color_legend = legend;
        self
    }

    /// Upper bound of the value axis
    fn value_max(&self) -> f64 {
        let n = self.categories.len();
        let max = match self.layout {
            BarLayout::Grouped => self
                .series
                .iter()
                .flat_map(|s| s.values.iter().copied())
                .fold(0.0_f64, f64::max),
            BarLayout::Stacked => (0..n)
                .map(|i| {
                    self.series
                        .iter()
                        .map(|s| s.values.get(i).copied().unwrap_or(0.0).max(0.0))
                        .sum::<f64>()
                })
                .fold(0.0_f64, f64::max),
        };
        if max > 0.0 && max.is_finite() {
            max * 1.05
        } else {
            1.0
        }
    }

    /// Render to standalone SVG markup of `width` × `height` pixels
    pub fn render_svg(&self, width: u32, height: u32) -> crate::Result<String> {
        let mut svg = String::new();
        self.draw(&mut svg, width, height)
            .map_err(|e| crate::Error::Chart(e.to_string()))?;
        Ok(svg)
    }

    fn draw(&self, svg: &mut String, width: u32, height: u32) -> DrawResult {
        let root = SVGBackend::with_string(svg, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let n = self.categories.len().max(1) as i32;
        let longest = self.categories.iter().map(|c| c.chars().count()).max().unwrap_or(0) as u32;
        let x_area = if self.rotate_labels {
            (longest * 6 + 10).clamp(30, (height / 3).max(30))
        } else {
            30
        };

        let mut chart = ChartBuilder::on(&root)
            .margin(12)
            .x_label_area_size(x_area)
            .y_label_area_size(70)
            .build_cartesian_2d((0..n).into_segmented(), 0f64..self.value_max())?;

        let categories = &self.categories;
        let x_label_style = if self.rotate_labels {
            TextStyle::from((FONT, 10).into_font())
                .transform(FontTransform::Rotate90)
                .pos(Pos::new(HPos::Left, VPos::Center))
        } else {
            TextStyle::from((FONT, 11).into_font())
        };
        chart
            .configure_mesh()
            .disable_x_mesh()
            .bold_line_style(GRID.mix(0.25))
            .light_line_style(TRANSPARENT)
            .axis_style(AXIS)
            .x_labels(categories.len().max(1))
            .x_label_style(x_label_style)
            .x_label_formatter(&|v| match v {
                SegmentValue::CenterOf(i) => categories.get(*i as usize).cloned().unwrap_or_default(),
                _ => String::new(),
            })
            .y_label_style((FONT, 11))
            .y_label_formatter(&|v| format_axis_value(*v))
            .draw()?;

        let (plot_w, _) = chart.plotting_area().dim_in_pixel();
        let slot = plot_w / n as u32;
        let pad = slot / 10;
        let groups = self.series.len().max(1) as u32;
        let bar_w = match self.layout {
            BarLayout::Grouped => (slot.saturating_sub(2 * pad) / groups).max(1),
            BarLayout::Stacked => slot.saturating_sub(2 * pad).max(1),
        };

        let mut bases = vec![0.0_f64; self.categories.len()];
        for (k, series) in self.series.iter().enumerate() {
            let k = k as u32;
            let mut bars = Vec::with_capacity(series.values.len());
            for (i, &value) in series.values.iter().enumerate().take(self.categories.len()) {
                let value = value.max(0.0);
                let (bottom, top) = match self.layout {
                    BarLayout::Grouped => (0.0, value),
                    BarLayout::Stacked => {
                        let bottom = bases[i];
                        bases[i] += value;
                        (bottom, bases[i])
                    }
                };
                let color = self
                    .bar_colors
                    .as_ref()
                    .and_then(|c| c.get(i).copied())
                    .unwrap_or(series.color);
                let (left, right) = match self.layout {
                    BarLayout::Grouped => {
                        let left = pad + k * bar_w;
                        (left, slot.saturating_sub(left + bar_w))
                    }
                    BarLayout::Stacked => (pad, pad),
                };
                let x = i as i32;
                let mut bar = Rectangle::new(
                    [
                        (SegmentValue::Exact(x), bottom),
                        (SegmentValue::Exact(x + 1), top),
                    ],
                    color.filled(),
                );
                bar.set_margin(0, 0, left, right);
                bars.push(bar);
            }
            let color = series.color;
            let anno = chart.draw_series(bars)?;
            if self.legend && self.bar_colors.is_none() {
                anno.label(series.name.clone()).legend(move |(x, y)| {
                    Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled())
                });
            }
        }

        for (name, color) in &self.color_legend {
            let color = *color;
            chart
                .draw_series(std::iter::empty::<Rectangle<(SegmentValue<i32>, f64)>>())?
                .label(name.clone())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));
        }

        if (self.legend && self.bar_colors.is_none() && !self.series.is_empty())
            || !self.color_legend.is_empty()
        {
            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperRight)
                .background_style(WHITE.mix(0.85))
                .border_style(AXIS)
                .label_font((FONT, 11))
                .draw()?;
        }

        root.present()?;
        Ok(())
    }
}

/// Pie chart description
#[derive(Debug, Clone)]
pub struct PieChart {
    pub slices: Vec<(String, f64)>,
    pub colors: Vec<RGBColor>,
    pub radius: f64,
}

impl PieChart {
    pub fn new(slices: Vec<(String, f64)>) -> Self {
        Self {
            slices,
            colors: PALETTE.to_vec(),
            radius: 90.0,
        }
    }

    pub fn colors(mut self, colors: Vec<RGBColor>) -> Self {
        self.colors = colors;
        self
    }

    fn color(&self, idx: usize) -> RGBColor {
        if self.colors.is_empty() {
            PALETTE[idx % PALETTE.len()]
        } else {
            self.colors[idx % self.colors.len()]
        }
    }

    /// Share of each slice in `[0, 1]`; all zero when the total is not positive
    pub fn fractions(&self) -> Vec<f64> {
        let total: f64 = self.slices.iter().map(|(_, v)| v.max(0.0)).sum();
        self.slices
            .iter()
            .map(|(_, v)| if total > 0.0 { v.max(0.0) / total } else { 0.0 })
            .collect()
    }

    pub fn render_svg(&self, width: u32, height: u32) -> crate::Result<String> {
        let mut svg = String::new();
        self.draw(&mut svg, width, height)
            .map_err(|e| crate::Error::Chart(e.to_string()))?;
        Ok(svg)
    }

    fn draw(&self, svg: &mut String, width: u32, height: u32) -> DrawResult {
        let root = SVGBackend::with_string(svg, (width, height)).into_drawing_area();
        root.fill(&WHITE)?;

        let cx = width as f64 / 2.0;
        let cy = height as f64 / 2.0;
        let r = self.radius.min(cy - 10.0).max(1.0);
        let label_style = TextStyle::from((FONT, 12).into_font())
            .color(&BLACK)
            .pos(Pos::new(HPos::Center, VPos::Center));

        // slices run counter-clockwise from three o'clock
        let mut start = 0.0_f64;
        for (idx, fraction) in self.fractions().into_iter().enumerate() {
            if fraction <= 0.0 {
                continue;
            }
            let sweep = fraction * std::f64::consts::TAU;
            let steps = ((sweep.to_degrees() / 2.0).ceil() as usize).max(2);
            let mut points = Vec::with_capacity(steps + 2);
            points.push((cx.round() as i32, cy.round() as i32));
            for s in 0..=steps {
                let a = start + sweep * s as f64 / steps as f64;
                points.push(((cx + r * a.cos()).round() as i32, (cy - r * a.sin()).round() as i32));
            }
            root.draw(&Polygon::new(points, self.color(idx).filled()))?;

            let mid = start + sweep / 2.0;
            let lx = (cx + (r + 18.0) * mid.cos()).round() as i32;
            let ly = (cy - (r + 18.0) * mid.sin()).round() as i32;
            root.draw(&Text::new(
                format!("{:.1}%", fraction * 100.0),
                (lx, ly),
                label_style.clone(),
            ))?;
            start += sweep;
        }

        let legend_style = TextStyle::from((FONT, 12).into_font()).color(&BLACK);
        for (idx, (name, _)) in self.slices.iter().enumerate() {
            let y = 16 + idx as i32 * 18;
            let x = width as i32 - 150;
            root.draw(&Rectangle::new([(x, y), (x + 10, y + 10)], self.color(idx).filled()))?;
            root.draw(&Text::new(name.clone(), (x + 16, y), legend_style.clone()))?;
        }

        root.present()?;
        Ok(())
    }
}
