use itertools::Itertools;

use super::{four_point_center, grow, segment_distance, stroke_centers, swept_bounds, ShapeInfo};
use crate::consts::{le_eps, EPSILON_ABS};
use crate::data::{norm, sub, ImageGeometry};
use crate::Point3;

/// 球. 输入与 [`super::circle`] 相同, 半径取两个半轴中较大者.
///
/// 拖拽时形成三维胶囊.
pub fn sphere(geometry: &ImageGeometry, points: &[Point3], stroke: &[Point3]) -> Option<ShapeInfo> {
    let center = four_point_center(points)?;
    let radius = 0.5 * norm(sub(points[1], points[0])).max(norm(sub(points[3], points[2])));
    if radius <= EPSILON_ABS {
        return None;
    }

    let centers = stroke_centers(stroke, center);
    let bounds = swept_bounds(geometry, &centers, [grow(radius); 3])?;
    let segments: Vec<(Point3, Point3)> = if centers.len() == 1 {
        vec![(center, center)]
    } else {
        centers.into_iter().tuple_windows().collect()
    };

    Some(ShapeInfo {
        center_world: center,
        center_ijk: geometry.world_to_index(center),
        bounds,
        is_in_object: Box::new(move |p, _| {
            segments
                .iter()
                .any(|&(a, b)| le_eps(segment_distance(*p, a, b), radius, radius))
        }),
    })
}
