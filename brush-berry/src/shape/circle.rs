use itertools::Itertools;

use super::{
    densify, four_point_center, grow, segment_distance, slab_tolerance, stroke_centers, swept_bounds,
    within, ShapeInfo, ShapePredicate,
};
use crate::consts::{le_eps, EPSILON_ABS};
use crate::data::{cross, dot, norm, normalize, scale, sub, ImageGeometry};
use crate::Point3;

/// 圆/椭圆.
///
/// `points` 依次为外接椭圆的下, 上, 左, 右四个点. `stroke` 为拖拽时上一个中心.
///
/// 两个半径相等时使用圆测试, 拖拽形成胶囊状的扫掠区域; 否则在平面内
/// `(major, minor)` 局部基下使用椭圆二次型, 拖拽形成加密中心上椭圆的并.
pub fn circle(geometry: &ImageGeometry, points: &[Point3], stroke: &[Point3]) -> Option<ShapeInfo> {
    let center = four_point_center(points)?;
    let vertical = sub(points[1], points[0]);
    let horizontal = sub(points[3], points[2]);
    let (rx, ry) = (norm(horizontal) * 0.5, norm(vertical) * 0.5);
    if rx <= EPSILON_ABS || ry <= EPSILON_ABS {
        return None;
    }

    let u = normalize(horizontal)?;
    let v = normalize(sub(vertical, scale(u, dot(vertical, u))))?;
    let normal = cross(u, v);
    let t = slab_tolerance(geometry, normal);

    let centers = stroke_centers(stroke, center);
    let extent =
        [0, 1, 2].map(|a| (u[a] * grow(rx)).hypot(v[a] * grow(ry)) + normal[a].abs() * grow(t));
    let bounds = swept_bounds(geometry, &centers, extent)?;

    let is_in_object: ShapePredicate = if (rx - ry).abs() <= EPSILON_ABS * rx.max(1.0) {
        let segments: Vec<(Point3, Point3)> = if centers.len() == 1 {
            vec![(center, center)]
        } else {
            centers.into_iter().tuple_windows().collect()
        };
        Box::new(move |p, _| {
            segments.iter().any(|&(a, b)| {
                let h = dot(sub(*p, a), normal);
                within(h, t) && le_eps(segment_distance(sub(*p, scale(normal, h)), a, b), rx, rx)
            })
        })
    } else {
        let centers = densify(&centers, rx.min(ry));
        Box::new(move |p, _| {
            centers.iter().any(|c| {
                let d = sub(*p, *c);
                let (x, y) = (dot(d, u) / rx, dot(d, v) / ry);
                within(dot(d, normal), t) && le_eps((x * x + y * y).sqrt(), 1.0, 1.0)
            })
        })
    };

    Some(ShapeInfo {
        center_world: center,
        center_ijk: geometry.world_to_index(center),
        bounds,
        is_in_object,
    })
}
