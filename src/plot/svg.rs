//! Standalone SVG scatter plots

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use super::{PlotRenderer, ReferenceLine, ScatterSeries};
use crate::error::{EvalError, Result};

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 55.0;
const N_TICKS: usize = 5;

/// Writes `<file_stem>.svg` files into an output directory
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    output_dir: PathBuf,
    width: u32,
    height: u32,
}

/// Data range of one axis
#[derive(Debug, Clone, Copy, PartialEq)]
struct Range {
    min: f64,
    max: f64,
}

impl Range {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |acc: Option<Range>, v| {
            Some(match acc {
                None => Range { min: v, max: v },
                Some(r) => Range {
                    min: r.min.min(v),
                    max: r.max.max(v),
                },
            })
        })
    }

    fn union(self, other: Range) -> Self {
        Range {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Widen by 5% per side; a degenerate range becomes one unit wide
    fn padded(self) -> Self {
        let span = self.max - self.min;
        if span <= f64::EPSILON {
            return Range {
                min: self.min - 0.5,
                max: self.max + 0.5,
            };
        }
        Range {
            min: self.min - span * 0.05,
            max: self.max + span * 0.05,
        }
    }

    fn fraction(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }

    fn ticks(&self) -> impl Iterator<Item = f64> + '_ {
        (0..N_TICKS).map(move |i| self.min + (self.max - self.min) * i as f64 / (N_TICKS - 1) as f64)
    }
}

impl SvgRenderer {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            width: 640,
            height: 480,
        }
    }

    fn plot_width(&self) -> f64 {
        self.width as f64 - MARGIN_LEFT - MARGIN_RIGHT
    }

    fn plot_height(&self) -> f64 {
        self.height as f64 - MARGIN_TOP - MARGIN_BOTTOM
    }

    fn px(&self, range: &Range, v: f64) -> f64 {
        MARGIN_LEFT + range.fraction(v) * self.plot_width()
    }

    fn py(&self, range: &Range, v: f64) -> f64 {
        MARGIN_TOP + (1.0 - range.fraction(v)) * self.plot_height()
    }

    fn write_svg<W: Write>(&self, w: &mut W, series: &ScatterSeries) -> Result<()> {
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();

        let (x_range, y_range) = match (
            Range::of(points.iter().map(|p| p.0)),
            Range::of(points.iter().map(|p| p.1)),
        ) {
            (Some(x), Some(y)) => (x, y),
            _ => {
                return Err(EvalError::PresentationError(format!(
                    "'{}' has no finite points",
                    series.title
                )))
            }
        };

        // Shared axes keep the diagonal at 45 degrees
        let (x_range, y_range) = match series.reference {
            ReferenceLine::Diagonal => {
                let both = x_range.union(y_range).padded();
                (both, both)
            }
            ReferenceLine::Horizontal(c) => (
                x_range.padded(),
                y_range.union(Range { min: c, max: c }).padded(),
            ),
            ReferenceLine::None => (x_range.padded(), y_range.padded()),
        };

        let (width, height) = (self.width, self.height);
        writeln!(
            w,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="sans-serif" font-size="12">"#
        )
        .map_err(io_err)?;
        writeln!(w, r#"  <rect width="100%" height="100%" fill="white"/>"#).map_err(io_err)?;
        writeln!(
            w,
            r#"  <text x="{:.1}" y="24" text-anchor="middle" font-size="16">{}</text>"#,
            width as f64 / 2.0,
            escape_xml(&series.title)
        )
        .map_err(io_err)?;

        let left = MARGIN_LEFT;
        let right = MARGIN_LEFT + self.plot_width();
        let top = MARGIN_TOP;
        let bottom = MARGIN_TOP + self.plot_height();

        writeln!(
            w,
            r##"  <rect x="{left:.1}" y="{top:.1}" width="{:.1}" height="{:.1}" fill="none" stroke="#444"/>"##,
            self.plot_width(),
            self.plot_height()
        )
        .map_err(io_err)?;

        for t in x_range.ticks() {
            let x = self.px(&x_range, t);
            writeln!(
                w,
                r##"  <line x1="{x:.1}" y1="{bottom:.1}" x2="{x:.1}" y2="{:.1}" stroke="#444"/><text x="{x:.1}" y="{:.1}" text-anchor="middle">{}</text>"##,
                bottom + 5.0,
                bottom + 18.0,
                tick_label(t)
            )
            .map_err(io_err)?;
        }
        for t in y_range.ticks() {
            let y = self.py(&y_range, t);
            writeln!(
                w,
                r##"  <line x1="{:.1}" y1="{y:.1}" x2="{left:.1}" y2="{y:.1}" stroke="#444"/><text x="{:.1}" y="{:.1}" text-anchor="end">{}</text>"##,
                left - 5.0,
                left - 8.0,
                y + 4.0,
                tick_label(t)
            )
            .map_err(io_err)?;
        }

        writeln!(
            w,
            r#"  <text x="{:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            (left + right) / 2.0,
            self.height as f64 - 12.0,
            escape_xml(&series.x_label)
        )
        .map_err(io_err)?;
        writeln!(
            w,
            r#"  <text x="16" y="{:.1}" text-anchor="middle" transform="rotate(-90 16 {:.1})">{}</text>"#,
            (top + bottom) / 2.0,
            (top + bottom) / 2.0,
            escape_xml(&series.y_label)
        )
        .map_err(io_err)?;

        let reference = match series.reference {
            ReferenceLine::Diagonal => Some((
                (self.px(&x_range, x_range.min), self.py(&y_range, x_range.min)),
                (self.px(&x_range, x_range.max), self.py(&y_range, x_range.max)),
            )),
            ReferenceLine::Horizontal(c) => {
                let y = self.py(&y_range, c);
                Some(((left, y), (right, y)))
            }
            ReferenceLine::None => None,
        };
        if let Some(((x1, y1), (x2, y2))) = reference {
            writeln!(
                w,
                r##"  <line x1="{x1:.1}" y1="{y1:.1}" x2="{x2:.1}" y2="{y2:.1}" stroke="#d62728" stroke-dasharray="6 4"/>"##
            )
            .map_err(io_err)?;
        }

        writeln!(w, r##"  <g fill="#1f77b4" fill-opacity="0.6">"##).map_err(io_err)?;
        for (x, y) in &points {
            writeln!(
                w,
                r#"    <circle cx="{:.1}" cy="{:.1}" r="3"/>"#,
                self.px(&x_range, *x),
                self.py(&y_range, *y)
            )
            .map_err(io_err)?;
        }
        writeln!(w, "  </g>").map_err(io_err)?;
        writeln!(w, "</svg>").map_err(io_err)?;
        Ok(())
    }

    /// Render to an in-memory SVG document
    pub fn render_to_string(&self, series: &ScatterSeries) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_svg(&mut buffer, series)?;
        String::from_utf8(buffer)
            .map_err(|e| EvalError::PresentationError(format!("invalid UTF-8 in SVG: {}", e)))
    }
}

impl PlotRenderer for SvgRenderer {
    fn render(&self, series: &ScatterSeries, file_stem: &str) -> Result<PathBuf> {
        if self.plot_width() <= 0.0 || self.plot_height() <= 0.0 {
            return Err(EvalError::PresentationError(format!(
                "canvas {}x{} is smaller than the margins",
                self.width, self.height
            )));
        }

        fs::create_dir_all(&self.output_dir).map_err(io_err)?;
        let path = self.output_dir.join(format!("{}.svg", file_stem));
        let file = File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);

        self.write_svg(&mut writer, series)?;
        writer.flush().map_err(io_err)?;
        Ok(path)
    }
}

fn tick_label(v: f64) -> String {
    if v.abs() >= 1e4 || (v != 0.0 && v.abs() < 1e-2) {
        format!("{:.1e}", v)
    } else {
        format!("{:.2}", v)
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn io_err(e: std::io::Error) -> EvalError {
    EvalError::PresentationError(format!("failed to write SVG: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(reference: ReferenceLine) -> ScatterSeries {
        ScatterSeries {
            title: "A & B".to_string(),
            x_label: "x".to_string(),
            y_label: "y".to_string(),
            points: vec![(0.0, 1.0), (1.0, 2.0), (2.0, f64::NAN)],
            reference,
        }
    }

    #[test]
    fn test_svg_document() {
        let svg = SvgRenderer::new("unused")
            .render_to_string(&series(ReferenceLine::Diagonal))
            .unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert!(svg.contains("A &amp; B"));
        // NaN point is skipped
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("stroke-dasharray"));
    }

    #[test]
    fn test_no_reference_line() {
        let svg = SvgRenderer::new("unused")
            .render_to_string(&series(ReferenceLine::None))
            .unwrap();
        assert!(!svg.contains("stroke-dasharray"));
    }

    #[test]
    fn test_empty_series_fails() {
        let empty = ScatterSeries {
            points: vec![],
            ..series(ReferenceLine::None)
        };
        let result = SvgRenderer::new("unused").render_to_string(&empty);
        assert!(matches!(result, Err(EvalError::PresentationError(_))));
    }

    #[test]
    fn test_render_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path().join("plots"));

        let path = renderer
            .render(&series(ReferenceLine::Horizontal(0.0)), "residuals")
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "residuals.svg");
        let content = std::fs::read_to_string(path).unwrap();
        assert!(content.contains("<circle"));
    }

    #[test]
    fn test_degenerate_range() {
        let range = Range { min: 2.0, max: 2.0 }.padded();
        assert_eq!(range, Range { min: 1.5, max: 2.5 });
    }
}
