use image::{GrayImage, Luma};
use imageproc::{
    drawing::{draw_filled_rect_mut, draw_line_segment_mut},
    rect::Rect,
};
use tracing::debug;

use crate::{
    mask::Mask,
    types::{BoxSet, DetectionSet, PolygonRegion, PolygonSet},
};

const FILL: Luma<u8> = Luma([Mask::ACTIVE]);

/// Rasterize raw detector output into a mask of the given size.
///
/// Regions are unioned; no regions yields an all-inactive mask.
pub fn rasterize(detections: &DetectionSet, width: u32, height: u32) -> Mask {
    match detections {
        DetectionSet::Polygons(polygons) => rasterize_polygons(polygons, width, height),
        DetectionSet::Boxes(boxes) => rasterize_boxes(boxes, width, height),
    }
}

/// Fill each box `[x1, x2] x [y1, y2]` inclusive, clipped to the canvas
pub fn rasterize_boxes(boxes: &BoxSet, width: u32, height: u32) -> Mask {
    let mut canvas = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return Mask::from_gray(canvas);
    }

    for region in boxes.iter() {
        let (x1, y1, x2, y2) = region.pixel_bounds();
        let x1 = x1.max(0);
        let y1 = y1.max(0);
        let x2 = x2.min(width as i64 - 1);
        let y2 = y2.min(height as i64 - 1);
        if x1 > x2 || y1 > y2 {
            continue;
        }
        let rect = Rect::at(x1 as i32, y1 as i32)
            .of_size((x2 - x1 + 1) as u32, (y2 - y1 + 1) as u32);
        draw_filled_rect_mut(&mut canvas, rect, FILL);
    }

    debug!(boxes = boxes.len(), width, height, "rasterized box set");
    Mask::from_gray(canvas)
}

/// Even-odd scanline fill of every polygon, boundary pixels included
pub fn rasterize_polygons(polygons: &PolygonSet, width: u32, height: u32) -> Mask {
    let mut canvas = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return Mask::from_gray(canvas);
    }

    for polygon in polygons.iter() {
        fill_polygon(&mut canvas, polygon);
    }

    debug!(polygons = polygons.len(), width, height, "rasterized polygon set");
    Mask::from_gray(canvas)
}

fn fill_polygon(canvas: &mut GrayImage, polygon: &PolygonRegion) {
    let points = polygon.pixel_vertices();
    let (width, height) = (canvas.width() as i64, canvas.height() as i64);

    match points.len() {
        0 => return,
        1 => {
            let (x, y) = points[0];
            if (0..width).contains(&x) && (0..height).contains(&y) {
                canvas.put_pixel(x as u32, y as u32, FILL);
            }
            return;
        }
        _ => {}
    }

    let edges: Vec<((i64, i64), (i64, i64))> = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(&a, &b)| (a, b))
        .collect();

    let y_min = points.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let y_max = points.iter().map(|p| p.1).max().unwrap_or(-1).min(height - 1);

    let mut crossings: Vec<f64> = Vec::new();
    for y in y_min..=y_max {
        crossings.clear();
        for &(p0, p1) in &edges {
            if p0.1 == p1.1 {
                continue;
            }
            let (lo, hi) = if p0.1 < p1.1 { (p0, p1) } else { (p1, p0) };
            // Half-open in y so shared vertices are counted once
            if lo.1 <= y && y < hi.1 {
                // saturated vertices overflow i64 differences
                let t = (y as f64 - lo.1 as f64) / (hi.1 as f64 - lo.1 as f64);
                crossings.push(lo.0 as f64 + t * (hi.0 as f64 - lo.0 as f64));
            }
        }
        crossings.sort_by(|a, b| a.total_cmp(b));

        for span in crossings.chunks_exact(2) {
            let from = (span[0].ceil() as i64).max(0);
            let to = (span[1].floor() as i64).min(width - 1);
            for x in from..=to {
                canvas.put_pixel(x as u32, y as u32, FILL);
            }
        }
    }

    let on_canvas = |p: (i64, i64)| (0..width).contains(&p.0) && (0..height).contains(&p.1);
    let limits = ((width - 1) as f64, (height - 1) as f64);
    for &(p0, p1) in &edges {
        let inside = on_canvas(p0) && on_canvas(p1);
        let (p0, p1) = ((p0.0 as f64, p0.1 as f64), (p1.0 as f64, p1.1 as f64));
        let segment = if inside { Some((p0, p1)) } else { clip_segment(p0, p1, limits) };
        if let Some((from, to)) = segment {
            draw_line_segment_mut(canvas, (from.0 as f32, from.1 as f32), (to.0 as f32, to.1 as f32), FILL);
        }
    }
}

/// Liang-Barsky clip of a segment to `[0, max.0] x [0, max.1]`
fn clip_segment(p0: (f64, f64), p1: (f64, f64), max: (f64, f64)) -> Option<((f64, f64), (f64, f64))> {
    let (dx, dy) = (p1.0 - p0.0, p1.1 - p0.1);
    let (mut enter, mut exit) = (0.0_f64, 1.0_f64);

    for (p, q) in [(-dx, p0.0), (dx, max.0 - p0.0), (-dy, p0.1), (dy, max.1 - p0.1)] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            enter = enter.max(r);
        } else {
            exit = exit.min(r);
        }
        if enter > exit {
            return None;
        }
    }

    Some((
        (p0.0 + enter * dx, p0.1 + enter * dy),
        (p0.0 + exit * dx, p0.1 + exit * dy),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoxRegion;

    fn square_polygon(from: f32, to: f32) -> PolygonRegion {
        PolygonRegion::new(vec![[from, from], [to, from], [to, to], [from, to]])
    }

    #[test]
    fn test_zero_detections_yield_empty_mask() {
        let boxes = rasterize(&DetectionSet::Boxes(BoxSet::default()), 64, 48);
        let polygons = rasterize(&DetectionSet::Polygons(PolygonSet::default()), 64, 48);
        assert_eq!(boxes.dimensions(), (64, 48));
        assert_eq!(polygons.dimensions(), (64, 48));
        assert!(boxes.is_empty());
        assert!(polygons.is_empty());
    }

    #[test]
    fn test_box_is_filled_inclusive() {
        let boxes = BoxSet::new(vec![BoxRegion::new(10.0, 10.0, 30.0, 30.0)]);
        let mask = rasterize_boxes(&boxes, 100, 100);
        assert_eq!(mask.bounding_box(), Some((10, 10, 30, 30)));
        assert_eq!(mask.active_count(), 21 * 21);
    }

    #[test]
    fn test_boxes_are_clipped_to_canvas() {
        let boxes = BoxSet::new(vec![
            BoxRegion::new(-20.0, -5.0, 4.0, 3.0),
            BoxRegion::new(200.0, 200.0, 300.0, 300.0),
        ]);
        let mask = rasterize_boxes(&boxes, 50, 50);
        assert_eq!(mask.bounding_box(), Some((0, 0, 4, 3)));
    }

    #[test]
    fn test_overlapping_boxes_union() {
        let boxes = BoxSet::new(vec![
            BoxRegion::new(0.0, 0.0, 9.0, 9.0),
            BoxRegion::new(5.0, 5.0, 14.0, 14.0),
        ]);
        let mask = rasterize_boxes(&boxes, 20, 20);
        assert_eq!(mask.active_count(), 100 + 100 - 25);
    }

    #[test]
    fn test_square_polygon_covers_its_boundary() {
        let polygons = PolygonSet::new(vec![square_polygon(20.0, 40.0)]);
        let mask = rasterize_polygons(&polygons, 100, 100);
        assert_eq!(mask.bounding_box(), Some((20, 20, 40, 40)));
        assert_eq!(mask.active_count(), 21 * 21);
    }

    #[test]
    fn test_triangle_interior() {
        let triangle = PolygonRegion::new(vec![[0.0, 0.0], [20.0, 0.0], [0.0, 20.0]]);
        let mask = rasterize_polygons(&PolygonSet::new(vec![triangle]), 30, 30);
        assert!(mask.is_active(2, 2));
        assert!(mask.is_active(9, 9));
        assert!(!mask.is_active(15, 15));
        assert!(!mask.is_active(25, 2));
    }

    #[test]
    fn test_concave_polygon_even_odd() {
        // U shape: the notch between the arms stays inactive
        let u_shape = PolygonRegion::new(vec![
            [0.0, 0.0], [6.0, 0.0], [6.0, 20.0], [14.0, 20.0],
            [14.0, 0.0], [20.0, 0.0], [20.0, 26.0], [0.0, 26.0],
        ]);
        let mask = rasterize_polygons(&PolygonSet::new(vec![u_shape]), 30, 30);
        assert!(mask.is_active(3, 10));
        assert!(mask.is_active(17, 10));
        assert!(!mask.is_active(10, 10));
        assert!(mask.is_active(10, 23));
    }

    #[test]
    fn test_degenerate_polygons() {
        let polygons = PolygonSet::new(vec![
            PolygonRegion::new(vec![]),
            PolygonRegion::new(vec![[3.0, 4.0]]),
            PolygonRegion::new(vec![[10.0, 10.0], [10.0, 15.0]]),
        ]);
        let mask = rasterize_polygons(&polygons, 20, 20);
        assert!(mask.is_active(3, 4));
        assert!(mask.is_active(10, 12));
        assert_eq!(mask.active_count(), 1 + 6);
    }

    #[test]
    fn test_far_out_vertices_are_clipped() {
        // a huge triangle enclosing the whole canvas
        let huge = PolygonRegion::new(vec![[-1e30, -1e30], [1e30, 5.0], [5.0, 1e30]]);
        let mask = rasterize_polygons(&PolygonSet::new(vec![huge]), 10, 10);
        assert_eq!(mask.active_count(), 100);

        // non-finite vertices saturate instead of failing
        let broken = PolygonRegion::new(vec![[f32::NAN, 3.0], [f32::INFINITY, 3.0], [5.0, f32::NEG_INFINITY]]);
        let mask = rasterize_polygons(&PolygonSet::new(vec![broken]), 10, 10);
        assert_eq!(mask.dimensions(), (10, 10));
        assert!(mask.is_active(0, 3));
        assert!(mask.is_active(4, 3));
        assert!(!mask.is_active(4, 8));
    }

    #[test]
    fn test_clip_segment() {
        let max = (9.0, 9.0);
        assert_eq!(clip_segment((-7.0, 4.0), (25.0, 4.0), max), Some(((0.0, 4.0), (9.0, 4.0))));
        assert_eq!(clip_segment((-5.0, -1.0), (20.0, -1.0), max), None);
        assert_eq!(clip_segment((12.0, 0.0), (20.0, 9.0), max), None);
        assert_eq!(clip_segment((2.0, 2.0), (6.0, 6.0), max), Some(((2.0, 2.0), (6.0, 6.0))));
    }

    #[test]
    fn test_polygon_partly_outside_canvas() {
        let polygons = PolygonSet::new(vec![square_polygon(-10.0, 5.0)]);
        let mask = rasterize_polygons(&polygons, 10, 10);
        assert_eq!(mask.bounding_box(), Some((0, 0, 5, 5)));
    }
}
