//! Render stage: turns derived metrics into PNG charts.
//!
//! The aggregation code only hands over numbers; everything about colours,
//! geometry and text lives here.

use std::f32::consts::PI;
use std::fs;
use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use chrono::NaiveDate;
use image::{Rgb, RgbImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut, draw_text_mut, text_size,
};
use imageproc::point::Point;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{ReportError, ReportResult};
use crate::reports::progress_as_f64;
use crate::types::{DailyProfitPoint, ProgressMetric, StaffShare};

pub trait ChartRenderer {
    /// Semicircular gauge of progress towards the profit target.
    fn render_gauge(&self, metric: &ProgressMetric, path: &Path) -> ReportResult<()>;

    /// Line chart of daily profit, points in the order given.
    fn render_line(&self, points: &[DailyProfitPoint], path: &Path) -> ReportResult<()>;

    /// Pie chart of the staff distribution, slices in the order given.
    fn render_pie(&self, shares: &[StaffShare], path: &Path) -> ReportResult<()>;
}

const WHITE: Rgb<u8> = Rgb([0xff, 0xff, 0xff]);
const GRAY: Rgb<u8> = Rgb([0x80, 0x80, 0x80]);
const LIGHT_GRAY: Rgb<u8> = Rgb([0xd0, 0xd0, 0xd0]);
const DARK_BLUE: Rgb<u8> = Rgb([0x00, 0x00, 0x8b]);
const LINE_BLUE: Rgb<u8> = Rgb([0x1f, 0x3f, 0xff]);
const RED: Rgb<u8> = Rgb([0xff, 0x00, 0x00]);

const GAUGE_BAR: Rgb<u8> = Rgb([0x71, 0xc9, 0xce]);
const GAUGE_STEPS: [(f32, f32, Rgb<u8>); 3] = [
    (0.0, 50.0, Rgb([0xe3, 0xfd, 0xfd])),
    (50.0, 80.0, Rgb([0xa6, 0xe3, 0xe9])),
    (80.0, 100.0, Rgb([0x71, 0xc9, 0xce])),
];

const PIE_COLORS: [Rgb<u8>; 10] = [
    Rgb([0x61, 0xc0, 0xbf]),
    Rgb([0xbb, 0xde, 0xd6]),
    Rgb([0xfa, 0xe3, 0xd9]),
    Rgb([0xff, 0xb6, 0xb9]),
    Rgb([0xc2, 0xc2, 0xf0]),
    Rgb([0xff, 0x66, 0x66]),
    Rgb([0xff, 0xcc, 0xff]),
    Rgb([0x99, 0xff, 0xcc]),
    Rgb([0xcc, 0xff, 0xcc]),
    Rgb([0xff, 0xb3, 0xe6]),
];

/// Segments per full turn when approximating arcs.
const ARC_STEPS: f32 = 360.0;

pub struct RasterRenderer {
    font: Option<FontVec>,
}

impl RasterRenderer {
    pub fn new() -> Self {
        Self { font: None }
    }

    pub fn with_font_file(path: &Path) -> ReportResult<Self> {
        let bytes = fs::read(path).map_err(|e| {
            ReportError::InvalidConfiguration(format!("cannot read font {}: {e}", path.display()))
        })?;
        let font = FontVec::try_from_vec(bytes).map_err(|e| {
            ReportError::InvalidConfiguration(format!("invalid font {}: {e}", path.display()))
        })?;
        Ok(Self { font: Some(font) })
    }

    fn text(&self, img: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, size: f32, s: &str) {
        if let Some(font) = &self.font {
            draw_text_mut(img, color, x, y, PxScale::from(size), font, s);
        }
    }

    /// Draw `s` horizontally centred on `cx`.
    fn text_centered(&self, img: &mut RgbImage, color: Rgb<u8>, cx: i32, y: i32, size: f32, s: &str) {
        if let Some(font) = &self.font {
            let (w, _) = text_size(PxScale::from(size), font, s);
            draw_text_mut(img, color, cx - w as i32 / 2, y, PxScale::from(size), font, s);
        }
    }
}

impl std::fmt::Debug for RasterRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterRenderer")
            .field("font", &self.font.is_some())
            .finish()
    }
}

impl Default for RasterRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn save(img: &RgbImage, path: &Path) -> ReportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    img.save(path)?;
    Ok(())
}

/// Point on a circle; angles in degrees, counter-clockwise from 3 o'clock,
/// with image y pointing down.
fn polar(cx: f32, cy: f32, r: f32, deg: f32) -> Point<i32> {
    let rad = deg * PI / 180.0;
    Point::new((cx + r * rad.cos()).round() as i32, (cy - r * rad.sin()).round() as i32)
}

fn arc(cx: f32, cy: f32, r: f32, from_deg: f32, to_deg: f32) -> Vec<Point<i32>> {
    let sweep = to_deg - from_deg;
    let steps = ((sweep.abs() / 360.0) * ARC_STEPS).ceil().max(1.0) as usize;
    let mut pts: Vec<Point<i32>> = Vec::with_capacity(steps + 1);
    for i in 0..=steps {
        let p = polar(cx, cy, r, from_deg + sweep * i as f32 / steps as f32);
        if pts.last() != Some(&p) {
            pts.push(p);
        }
    }
    pts
}

/// Fill a polygon, skipping shapes too small to draw.
fn fill(img: &mut RgbImage, mut poly: Vec<Point<i32>>, color: Rgb<u8>) {
    poly.dedup();
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }
    if poly.len() >= 3 {
        draw_polygon_mut(img, &poly, color);
    }
}

/// Ring segment between two radii, `from_deg` to `to_deg`.
fn fill_band(
    img: &mut RgbImage,
    (cx, cy): (f32, f32),
    (inner, outer): (f32, f32),
    (from_deg, to_deg): (f32, f32),
    color: Rgb<u8>,
) {
    if (to_deg - from_deg).abs() < f32::EPSILON {
        return;
    }
    let mut poly = arc(cx, cy, outer, from_deg, to_deg);
    poly.extend(arc(cx, cy, inner, to_deg, from_deg));
    fill(img, poly, color);
}

/// Gauge percent -> angle: 0% at 180 degrees, 100% at 0 degrees.
/// Line-chart heading naming the dates actually plotted.
fn line_title(points: &[DailyProfitPoint]) -> String {
    match (points.first(), points.last()) {
        (Some(first), Some(last)) if first.date != last.date => format!(
            "Daily profit {} to {}",
            first.date.format("%Y-%m-%d"),
            last.date.format("%Y-%m-%d")
        ),
        (Some(only), _) => format!("Daily profit {}", only.date.format("%Y-%m-%d")),
        _ => "Daily profit".to_string(),
    }
}

fn gauge_angle(percent: f32) -> f32 {
    180.0 - percent.clamp(0.0, 100.0) * 1.8
}

impl ChartRenderer for RasterRenderer {
    fn render_gauge(&self, metric: &ProgressMetric, path: &Path) -> ReportResult<()> {
        let (w, h) = (500u32, 400u32);
        let mut img = RgbImage::from_pixel(w, h, WHITE);
        let center = (w as f32 / 2.0, 300.0);
        let (inner, outer) = (110.0, 190.0);
        let progress = progress_as_f64(metric) as f32;

        self.text_centered(&mut img, DARK_BLUE, center.0 as i32, 20, 28.0, "Total Profit Progress");

        for (from, to, color) in GAUGE_STEPS {
            fill_band(&mut img, center, (inner, outer), (gauge_angle(from), gauge_angle(to)), color);
        }
        // Border around the dial.
        let rim = arc(center.0, center.1, outer + 2.0, 0.0, 180.0);
        for seg in rim.windows(2) {
            draw_line_segment_mut(
                &mut img,
                (seg[0].x as f32, seg[0].y as f32),
                (seg[1].x as f32, seg[1].y as f32),
                GRAY,
            );
        }

        // Value bar sits in the middle of the band.
        let bar = (inner + 25.0, outer - 25.0);
        fill_band(&mut img, center, bar, (gauge_angle(0.0), gauge_angle(progress)), GAUGE_BAR);

        // Threshold marker at the current value.
        let deg = gauge_angle(progress);
        let rad = deg * PI / 180.0;
        for offset in -2i32..=2 {
            let o = offset as f32;
            let start = (
                center.0 + (inner + 5.0) * rad.cos() + o * rad.sin(),
                center.1 - (inner + 5.0) * rad.sin() + o * rad.cos(),
            );
            let end = (
                center.0 + (outer - 5.0) * rad.cos() + o * rad.sin(),
                center.1 - (outer - 5.0) * rad.sin() + o * rad.cos(),
            );
            draw_line_segment_mut(&mut img, start, end, RED);
        }

        self.text_centered(
            &mut img,
            DARK_BLUE,
            center.0 as i32,
            center.1 as i32 - 60,
            48.0,
            &format!("{:.1}", progress),
        );
        let delta = progress - 100.0;
        self.text_centered(
            &mut img,
            DARK_BLUE,
            center.0 as i32,
            center.1 as i32 + 10,
            22.0,
            &format!("{:+.1}", delta),
        );
        for tick in [0.0f32, 20.0, 40.0, 60.0, 80.0, 100.0] {
            let p = polar(center.0, center.1, outer + 18.0, gauge_angle(tick));
            self.text_centered(&mut img, DARK_BLUE, p.x, p.y - 8, 14.0, &format!("{tick}"));
        }

        save(&img, path)
    }

    fn render_line(&self, points: &[DailyProfitPoint], path: &Path) -> ReportResult<()> {
        let (w, h) = (800u32, 500u32);
        let mut img = RgbImage::from_pixel(w, h, WHITE);
        let (left, right, top, bottom) = (80.0f32, 770.0f32, 50.0f32, 420.0f32);

        self.text_centered(&mut img, DARK_BLUE, w as i32 / 2, 12, 24.0, &line_title(points));

        draw_line_segment_mut(&mut img, (left, top), (left, bottom), GRAY);
        draw_line_segment_mut(&mut img, (left, bottom), (right, bottom), GRAY);

        let values: Vec<f32> = points
            .iter()
            .map(|p| p.profit.to_f32().unwrap_or(0.0))
            .collect();
        let lo = values.iter().copied().fold(0.0f32, f32::min);
        let mut hi = values.iter().copied().fold(0.0f32, f32::max);
        if (hi - lo).abs() < f32::EPSILON {
            hi = lo + 1.0;
        }
        let y_of = |v: f32| bottom - (v - lo) / (hi - lo) * (bottom - top);

        let zero = y_of(0.0);
        draw_line_segment_mut(&mut img, (left, zero), (right, zero), LIGHT_GRAY);
        self.text(&mut img, DARK_BLUE, 8, zero as i32 - 7, 14.0, "0");
        self.text(&mut img, DARK_BLUE, 8, top as i32 - 7, 14.0, &format!("{hi:.0}"));
        if lo < 0.0 {
            self.text(&mut img, DARK_BLUE, 8, bottom as i32 - 7, 14.0, &format!("{lo:.0}"));
        }

        let Some(first) = points.first().map(|p| p.date) else {
            return save(&img, path);
        };
        let last = points.last().map(|p| p.date).unwrap_or(first);
        let span = (last - first).num_days().max(1) as f32;
        let x_of = |d: NaiveDate| {
            let offset = (d - first).num_days() as f32;
            if points.len() == 1 {
                (left + right) / 2.0
            } else {
                left + 20.0 + offset / span * (right - left - 40.0)
            }
        };

        let coords: Vec<(f32, f32)> = points
            .iter()
            .zip(&values)
            .map(|(p, v)| (x_of(p.date), y_of(*v)))
            .collect();
        for seg in coords.windows(2) {
            draw_line_segment_mut(&mut img, seg[0], seg[1], LINE_BLUE);
            draw_line_segment_mut(&mut img, (seg[0].0, seg[0].1 + 1.0), (seg[1].0, seg[1].1 + 1.0), LINE_BLUE);
        }
        for ((x, y), p) in coords.iter().zip(points) {
            draw_filled_circle_mut(&mut img, (*x as i32, *y as i32), 4, LINE_BLUE);
            self.text(
                &mut img,
                DARK_BLUE,
                *x as i32 - 20,
                bottom as i32 + 10,
                12.0,
                &p.date.format("%m-%d").to_string(),
            );
        }

        save(&img, path)
    }

    fn render_pie(&self, shares: &[StaffShare], path: &Path) -> ReportResult<()> {
        let (w, h) = (700u32, 700u32);
        let mut img = RgbImage::from_pixel(w, h, WHITE);
        let (cx, cy, r) = (w as f32 / 2.0, h as f32 / 2.0 + 20.0, 260.0f32);

        self.text_centered(&mut img, DARK_BLUE, cx as i32, 12, 26.0, "Vehicles managed per staff member");

        let mut start = 90.0f32;
        for (i, share) in shares.iter().enumerate() {
            let sweep = share.percent as f32 * 3.6;
            let color = PIE_COLORS[i % PIE_COLORS.len()];
            if sweep >= 359.99 {
                draw_filled_circle_mut(&mut img, (cx as i32, cy as i32), r as i32, color);
            } else {
                let mut poly = vec![Point::new(cx.round() as i32, cy.round() as i32)];
                poly.extend(arc(cx, cy, r, start, start + sweep));
                fill(&mut img, poly, color);
            }

            let mid = start + sweep / 2.0;
            let inside = polar(cx, cy, r * 0.6, mid);
            self.text_centered(&mut img, DARK_BLUE, inside.x, inside.y - 8, 18.0, &share.label);
            let outside = polar(cx, cy, r + 22.0, mid);
            self.text_centered(&mut img, DARK_BLUE, outside.x, outside.y - 8, 18.0, &share.staff_name);

            start += sweep;
        }

        save(&img, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn metric(percent: rust_decimal::Decimal) -> ProgressMetric {
        ProgressMetric {
            total_profit: percent * dec!(10),
            target_profit: dec!(1000),
            progress_percent: percent,
        }
    }

    fn share(name: &str, percent: f64) -> StaffShare {
        StaffShare {
            staff_name: name.to_string(),
            car_count: 1,
            percent,
            label: format!("{:.1}%", percent),
        }
    }

    #[test]
    fn gauge_angles_span_half_circle() {
        assert_eq!(gauge_angle(0.0), 180.0);
        assert_eq!(gauge_angle(50.0), 90.0);
        assert_eq!(gauge_angle(100.0), 0.0);
        assert_eq!(gauge_angle(250.0), 0.0);
    }

    #[test]
    fn gauge_png_has_expected_size_and_needle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/gauge.png");
        RasterRenderer::new().render_gauge(&metric(dec!(22)), &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (500, 400));
        assert!(img.pixels().any(|p| *p == RED));
    }

    #[test]
    fn gauge_renders_bounds() {
        let dir = tempfile::tempdir().unwrap();
        for (i, pct) in [dec!(0), dec!(100)].into_iter().enumerate() {
            let path = dir.path().join(format!("gauge{i}.png"));
            RasterRenderer::new().render_gauge(&metric(pct), &path).unwrap();
            assert!(path.exists());
        }
    }

    #[test]
    fn line_title_follows_plotted_dates() {
        let point = |d: &str| DailyProfitPoint {
            date: NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            profit: dec!(1),
        };
        assert_eq!(line_title(&[]), "Daily profit");
        assert_eq!(line_title(&[point("2024-05-03")]), "Daily profit 2024-05-03");
        assert_eq!(
            line_title(&[point("2024-04-28"), point("2024-05-01"), point("2024-05-05")]),
            "Daily profit 2024-04-28 to 2024-05-05"
        );
    }

    #[test]
    fn line_chart_handles_empty_single_and_negative_series() {
        let d = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let series = [
            vec![],
            vec![DailyProfitPoint { date: d("2024-05-01"), profit: dec!(50) }],
            vec![
                DailyProfitPoint { date: d("2024-05-01"), profit: dec!(50) },
                DailyProfitPoint { date: d("2024-05-03"), profit: dec!(-10) },
            ],
        ];
        for (i, points) in series.iter().enumerate() {
            let path = dir.path().join(format!("line{i}.png"));
            RasterRenderer::new().render_line(points, &path).unwrap();
            let img = image::open(&path).unwrap().to_rgb8();
            assert_eq!(img.dimensions(), (800, 500));
            if !points.is_empty() {
                assert!(img.pixels().any(|p| *p == LINE_BLUE));
            }
        }
    }

    #[test]
    fn pie_uses_palette_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pie.png");
        RasterRenderer::new()
            .render_pie(&[share("Alice", 75.0), share("Bob", 25.0)], &path)
            .unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (700, 700));
        assert!(img.pixels().any(|p| *p == PIE_COLORS[0]));
        assert!(img.pixels().any(|p| *p == PIE_COLORS[1]));
    }

    #[test]
    fn pie_with_single_slice_is_full_circle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pie.png");
        RasterRenderer::new().render_pie(&[share("Solo", 100.0)], &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(*img.get_pixel(350, 370), PIE_COLORS[0]);
    }

    #[test]
    fn missing_font_is_a_configuration_error() {
        assert_matches!(
            RasterRenderer::with_font_file(Path::new("/nonexistent/font.ttf")),
            Err(ReportError::InvalidConfiguration(_))
        );
    }

    #[test]
    fn debug_output_reports_font_presence() {
        assert_eq!(format!("{:?}", RasterRenderer::new()), "RasterRenderer { font: false }");
    }
}
