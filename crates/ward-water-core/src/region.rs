//! Spatial regions (wards) and their pixel footprints.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque region identifier: an integer ward number or a name.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegionId {
    Num(i64),
    Name(String),
}

impl fmt::Display for RegionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionId::Num(n) => write!(f, "{n}"),
            RegionId::Name(s) => f.write_str(s),
        }
    }
}

impl From<i64> for RegionId {
    fn from(v: i64) -> Self {
        RegionId::Num(v)
    }
}

impl From<i32> for RegionId {
    fn from(v: i32) -> Self {
        RegionId::Num(v.into())
    }
}

impl From<&str> for RegionId {
    fn from(v: &str) -> Self {
        RegionId::Name(v.to_owned())
    }
}

impl From<String> for RegionId {
    fn from(v: String) -> Self {
        RegionId::Name(v)
    }
}

/// Half-open pixel window `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelWindow {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl PixelWindow {
    pub fn area(&self) -> usize {
        (self.x1 - self.x0) * (self.y1 - self.y0)
    }
}

/// Region geometry in pixel coordinates of the analysed rasters.
///
/// A pixel belongs to a footprint when its centre `(x + 0.5, y + 0.5)` is
/// inside it. Polygons use the even-odd rule.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Footprint {
    /// Half-open pixel rectangle.
    Rect {
        x0: usize,
        y0: usize,
        x1: usize,
        y1: usize,
    },
    /// Closed ring; the last vertex connects back to the first.
    Polygon { vertices: Vec<Point2<f64>> },
}

impl Footprint {
    pub fn rect(x0: usize, y0: usize, x1: usize, y1: usize) -> Self {
        Footprint::Rect { x0, y0, x1, y1 }
    }

    pub fn polygon(vertices: impl IntoIterator<Item = [f64; 2]>) -> Self {
        Footprint::Polygon {
            vertices: vertices
                .into_iter()
                .map(|[x, y]| Point2::new(x, y))
                .collect(),
        }
    }

    /// Whether pixel `(x, y)` is covered.
    pub fn covers_pixel(&self, x: usize, y: usize) -> bool {
        match self {
            Footprint::Rect { x0, y0, x1, y1 } => x >= *x0 && x < *x1 && y >= *y0 && y < *y1,
            Footprint::Polygon { vertices } => {
                point_in_polygon(vertices, x as f64 + 0.5, y as f64 + 0.5)
            }
        }
    }

    /// Bounding window clipped to a `width x height` raster, `None` if empty.
    pub fn pixel_window(&self, width: usize, height: usize) -> Option<PixelWindow> {
        let (x0, y0, x1, y1) = match self {
            Footprint::Rect { x0, y0, x1, y1 } => (*x0, *y0, (*x1).min(width), (*y1).min(height)),
            Footprint::Polygon { vertices } => {
                if vertices.len() < 3 {
                    return None;
                }
                let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
                let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
                for p in vertices {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                if !(min_x.is_finite() && min_y.is_finite() && max_x.is_finite() && max_y.is_finite())
                {
                    return None;
                }
                let clamp = |v: f64, hi: usize| v.max(0.0).min(hi as f64) as usize;
                (
                    clamp(min_x.floor(), width),
                    clamp(min_y.floor(), height),
                    clamp(max_x.ceil(), width),
                    clamp(max_y.ceil(), height),
                )
            }
        };
        (x0 < x1 && y0 < y1).then_some(PixelWindow { x0, y0, x1, y1 })
    }

    /// Covered pixels of a `width x height` raster, visited every `step` pixels.
    pub fn pixels(
        &self,
        width: usize,
        height: usize,
        step: usize,
    ) -> impl Iterator<Item = (usize, usize)> + '_ {
        let step = step.max(1);
        let win = self.pixel_window(width, height);
        win.into_iter().flat_map(move |w| {
            (w.y0..w.y1)
                .step_by(step)
                .flat_map(move |y| (w.x0..w.x1).step_by(step).map(move |x| (x, y)))
                .filter(move |&(x, y)| self.covers_pixel(x, y))
        })
    }
}

fn point_in_polygon(vertices: &[Point2<f64>], px: f64, py: f64) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.y > py) != (b.y > py) {
            let x_cross = a.x + (py - a.y) * (b.x - a.x) / (b.y - a.y);
            if px < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// A region: identifier plus footprint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub id: RegionId,
    pub footprint: Footprint,
}

impl Region {
    pub fn new(id: impl Into<RegionId>, footprint: Footprint) -> Self {
        Self {
            id: id.into(),
            footprint,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_is_half_open_and_clipped() {
        let fp = Footprint::rect(1, 1, 10, 3);
        assert!(fp.covers_pixel(1, 1));
        assert!(!fp.covers_pixel(10, 1));
        assert!(!fp.covers_pixel(0, 2));
        assert_eq!(
            fp.pixel_window(4, 4),
            Some(PixelWindow {
                x0: 1,
                y0: 1,
                x1: 4,
                y1: 3
            })
        );
        assert_eq!(fp.pixels(4, 4, 1).count(), 6);
        assert_eq!(Footprint::rect(5, 5, 8, 8).pixel_window(4, 4), None);
    }

    #[test]
    fn triangle_covers_pixel_centres_below_diagonal() {
        let fp = Footprint::polygon([[0.0, 0.0], [4.0, 0.0], [0.0, 4.0]]);
        assert!(fp.covers_pixel(0, 0));
        assert!(fp.covers_pixel(2, 0));
        assert!(!fp.covers_pixel(3, 3));
        // centres with x + y < 3 lie inside
        assert_eq!(fp.pixels(8, 8, 1).count(), 6);
    }

    #[test]
    fn strided_pixels_skip_rows_and_columns() {
        let fp = Footprint::rect(0, 0, 6, 6);
        let sampled: Vec<_> = fp.pixels(6, 6, 2).collect();
        assert_eq!(sampled.len(), 9);
        assert!(sampled.contains(&(4, 2)));
        assert!(!sampled.contains(&(1, 0)));
    }

    #[test]
    fn region_ids_are_ordered_and_displayed() {
        let a = RegionId::from(61);
        let b = RegionId::from("Ward 74");
        assert!(a < b);
        assert_eq!(a.to_string(), "61");
        assert_eq!(b.to_string(), "Ward 74");
    }

    #[test]
    fn footprint_json_round_trip() {
        let json = r#"{"type":"polygon","vertices":[[0.0,0.0],[2.0,0.0],[2.0,2.0]]}"#;
        let fp: Footprint = serde_json::from_str(json).expect("polygon json");
        assert!(matches!(&fp, Footprint::Polygon { vertices } if vertices.len() == 3));

        let ids: Vec<RegionId> = serde_json::from_str(r#"[108, "north"]"#).expect("ids");
        assert_eq!(ids, vec![RegionId::Num(108), RegionId::from("north")]);
    }
}
