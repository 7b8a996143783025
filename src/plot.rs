//! SVG scatter plot of calibrated predictions against ground truth.
//!
//! Rendered as plain SVG text so the artifact opens in any browser without a
//! plotting backend.

use std::fmt::Write as _;

use crate::evaluation::{Correlation, ScatterPoint};

const WIDTH: f64 = 800.0;
const HEIGHT: f64 = 500.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const TICKS: usize = 5;

pub const X_LABEL: &str = "Predicted Score (after regression)";
pub const Y_LABEL: &str = "Ground Truth Score";

#[derive(Debug, Clone, Copy)]
struct Axis {
    min: f64,
    max: f64,
}

impl Axis {
    /// Span of the data, widened when empty or constant so it never collapses.
    fn fit(values: impl Iterator<Item = f64>) -> Self {
        let (min, max) = values
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !min.is_finite() {
            return Self { min: 0.0, max: 1.0 };
        }
        if (max - min).abs() < f64::EPSILON {
            return Self {
                min: min - 0.5,
                max: max + 0.5,
            };
        }
        let pad = (max - min) * 0.05;
        Self {
            min: min - pad,
            max: max + pad,
        }
    }

    fn unit(&self, v: f64) -> f64 {
        (v - self.min) / (self.max - self.min)
    }

    fn tick(&self, i: usize) -> f64 {
        self.min + (self.max - self.min) * i as f64 / (TICKS - 1) as f64
    }
}

fn escape_xml_chars(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Render the scatter series with a title and the Pearson annotation.
pub fn render_scatter_svg(title: &str, points: &[ScatterPoint], pearson: &Correlation) -> String {
    let plot_w = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_h = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let x_axis = Axis::fit(points.iter().map(|p| p.prediction));
    let y_axis = Axis::fit(points.iter().map(|p| p.ground_truth));
    let px = |v: f64| MARGIN_LEFT + x_axis.unit(v) * plot_w;
    let py = |v: f64| MARGIN_TOP + (1.0 - y_axis.unit(v)) * plot_h;

    // Writing into a String cannot fail.
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}" font-family="sans-serif">"#
    );
    let _ = writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#);

    // grid + tick labels
    for i in 0..TICKS {
        let xv = x_axis.tick(i);
        let x = px(xv);
        let _ = writeln!(
            svg,
            r##"<line x1="{x:.1}" y1="{MARGIN_TOP}" x2="{x:.1}" y2="{:.1}" stroke="#e0e0e0"/>"##,
            MARGIN_TOP + plot_h
        );
        let _ = writeln!(
            svg,
            r#"<text x="{x:.1}" y="{:.1}" font-size="11" text-anchor="middle">{xv:.2}</text>"#,
            MARGIN_TOP + plot_h + 16.0
        );

        let yv = y_axis.tick(i);
        let y = py(yv);
        let _ = writeln!(
            svg,
            r##"<line x1="{MARGIN_LEFT}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}" stroke="#e0e0e0"/>"##,
            MARGIN_LEFT + plot_w
        );
        let _ = writeln!(
            svg,
            r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="end">{yv:.2}</text>"#,
            MARGIN_LEFT - 6.0,
            y + 4.0
        );
    }

    let _ = writeln!(
        svg,
        r#"<rect x="{MARGIN_LEFT}" y="{MARGIN_TOP}" width="{plot_w}" height="{plot_h}" fill="none" stroke="black"/>"#
    );

    for p in points
        .iter()
        .filter(|p| p.prediction.is_finite() && p.ground_truth.is_finite())
    {
        let _ = writeln!(
            svg,
            r##"<circle cx="{:.2}" cy="{:.2}" r="3" fill="#1f77b4" fill-opacity="0.5"/>"##,
            px(p.prediction),
            py(p.ground_truth)
        );
    }

    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="28" font-size="16" text-anchor="middle">{}</text>"#,
        WIDTH / 2.0,
        escape_xml_chars(title)
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="13" text-anchor="middle">{}</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        HEIGHT - 16.0,
        X_LABEL
    );
    let _ = writeln!(
        svg,
        r#"<text x="18" y="{:.1}" font-size="13" text-anchor="middle" transform="rotate(-90 18 {:.1})">{}</text>"#,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0,
        Y_LABEL
    );
    let _ = writeln!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" font-size="13">Pearson Correlation: {}</text>"#,
        MARGIN_LEFT + 0.05 * plot_w,
        MARGIN_TOP + 0.05 * plot_h + 12.0,
        escape_xml_chars(&pearson.to_string())
    );
    svg.push_str("</svg>\n");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::UndefinedReason;

    fn points() -> Vec<ScatterPoint> {
        vec![
            ScatterPoint {
                prediction: 1.0,
                ground_truth: 0.5,
            },
            ScatterPoint {
                prediction: 3.0,
                ground_truth: 4.0,
            },
        ]
    }

    #[test]
    fn draws_one_circle_per_point_with_annotation() {
        let pearson = Correlation::Defined {
            value: 0.8123,
            p_value: None,
        };
        let svg = render_scatter_svg("Semantic Predictor", &points(), &pearson);
        assert!(svg.starts_with("<svg"));
        assert!(svg.trim_end().ends_with("</svg>"));
        assert_eq!(svg.matches("<circle").count(), 2);
        assert!(svg.contains("Pearson Correlation: 0.8123"));
        assert!(svg.contains(X_LABEL));
    }

    #[test]
    fn undefined_correlation_is_annotated_as_such() {
        let pearson = Correlation::Undefined {
            reason: UndefinedReason::ConstantPredictions,
        };
        let svg = render_scatter_svg("t", &[], &pearson);
        assert!(svg.contains("Pearson Correlation: undefined (constant predictions)"));
        assert_eq!(svg.matches("<circle").count(), 0);
    }

    #[test]
    fn title_is_escaped() {
        let pearson = Correlation::Undefined {
            reason: UndefinedReason::TooFewSamples,
        };
        let svg = render_scatter_svg("a <b> & c", &points(), &pearson);
        assert!(svg.contains("a &lt;b&gt; &amp; c"));
    }

    #[test]
    fn constant_axis_is_widened() {
        let axis = Axis::fit([2.5, 2.5].into_iter());
        assert!(axis.max > axis.min);
        assert!((axis.unit(2.5) - 0.5).abs() < 1e-12);
    }
}
