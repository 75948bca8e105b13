//! Static Chart Renderer
//! Renders both case charts into one PNG.
//!
//! Layout:
//! 1. Title: region name centered
//! 2. "New Cases per Day" with 7-day trend lines
//! 3. "Cumulated Cases"
//!
//! Both charts carry the event markers of the view.

use crate::charts::view::{date_label, event_rgb, metric_rgb, x_of, ChartKind, ChartView};
use image::RgbImage;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Nothing to render: select at least one metric")]
    EmptyChart,
    #[error("Drawing failed: {0}")]
    Drawing(String),
    #[error("Image buffer does not match {width}x{height}")]
    Buffer { width: u32, height: u32 },
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

type DrawResult = Result<(), Box<dyn std::error::Error>>;

pub struct StaticChartRenderer;

impl StaticChartRenderer {
    pub const DEFAULT_SIZE: (u32, u32) = (1400, 1000);

    /// Render the view into an RGB image.
    pub fn render(view: &ChartView, (width, height): (u32, u32)) -> Result<RgbImage, RenderError> {
        if view.is_empty() {
            return Err(RenderError::EmptyChart);
        }

        let mut buffer = vec![0u8; width as usize * height as usize * 3];
        {
            let root = BitMapBackend::with_buffer(&mut buffer, (width, height)).into_drawing_area();
            Self::draw(&root, view).map_err(|e| RenderError::Drawing(e.to_string()))?;
        }

        RgbImage::from_raw(width, height, buffer).ok_or(RenderError::Buffer { width, height })
    }

    /// Render and save as PNG.
    pub fn save_png(view: &ChartView, path: &Path) -> Result<(), RenderError> {
        let img = Self::render(view, Self::DEFAULT_SIZE)?;
        img.save(path)?;
        tracing::info!(path = %path.display(), "Chart image saved");
        Ok(())
    }

    fn draw(root: &DrawingArea<BitMapBackend<'_>, Shift>, view: &ChartView) -> DrawResult {
        root.fill(&WHITE)?;
        let root = root.titled(&view.title, ("sans-serif", 30).into_font())?;

        let areas = root.split_evenly((2, 1));
        for (area, kind) in areas.iter().zip(ChartKind::ALL) {
            Self::draw_chart(area, view, kind)?;
        }

        root.present()?;
        Ok(())
    }

    fn draw_chart(
        area: &DrawingArea<BitMapBackend<'_>, Shift>,
        view: &ChartView,
        kind: ChartKind,
    ) -> DrawResult {
        let (x_min, x_max) = view.x_range().unwrap_or((0.0, 1.0));
        let y_max = view.y_max(kind) * 1.05;

        let mut chart = ChartBuilder::on(area)
            .caption(kind.y_axis_title(), ("sans-serif", 22).into_font())
            .margin(10)
            .x_label_area_size(35)
            .y_label_area_size(70)
            .build_cartesian_2d(x_min..x_max, 0.0..y_max)?;

        let label_days = |x: &f64| date_label(x.round());
        chart
            .configure_mesh()
            .x_labels(8)
            .x_label_formatter(&label_days)
            .y_desc(kind.y_axis_title())
            .draw()?;

        let half = view.bar_width() / 2.0;
        for &metric in &view.metrics {
            let (r, g, b) = metric_rgb(metric);
            let color = RGBColor(r, g, b);
            let offset = view.bar_offset(metric);

            chart
                .draw_series(view.bars(kind, metric).into_iter().map(|(x, y)| {
                    let x = x + offset;
                    Rectangle::new([(x - half, 0.0), (x + half, y)], color.filled())
                }))?
                .label(metric.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 10, y + 5)], color.filled()));

            if view.has_trend(kind) {
                let trend = RGBColor(r / 2, g / 2, b / 2);
                chart
                    .draw_series(LineSeries::new(view.trend(metric), trend.stroke_width(2)))?
                    .label(format!("{} (7-day avg)", metric.label()))
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 15, y)], trend.stroke_width(2)));
            }
        }

        for marker in view.visible_markers() {
            let (r, g, b) = event_rgb(marker.kind);
            let x = x_of(marker.date);
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x, 0.0), (x, y_max)],
                RGBColor(r, g, b).stroke_width(1),
            )))?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        Ok(())
    }
}
