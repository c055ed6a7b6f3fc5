use super::{
    densify, four_point_center, grow, slab_tolerance, stroke_centers, swept_bounds, within,
    ShapeInfo, ViewPlane,
};
use crate::consts::EPSILON_ABS;
use crate::data::{dot, sub, ImageGeometry};
use crate::Point3;

/// 正方形 (视平面坐标系下轴对齐). `points` 为四个角点.
///
/// 拖拽时中心先被加密, 使相邻中心距离不超过较短的半边长, 然后取所有中心上正方形测试的并.
pub fn square(
    geometry: &ImageGeometry,
    view: &ViewPlane,
    points: &[Point3],
    stroke: &[Point3],
) -> Option<ShapeInfo> {
    let center = four_point_center(points)?;
    let (right, up, normal) = view.basis()?;

    let (mut half_r, mut half_u) = (0.0f64, 0.0f64);
    for p in points {
        let d = sub(*p, center);
        half_r = half_r.max(dot(d, right).abs());
        half_u = half_u.max(dot(d, up).abs());
    }
    if half_r <= EPSILON_ABS || half_u <= EPSILON_ABS {
        return None;
    }
    let t = slab_tolerance(geometry, normal);

    let centers = densify(&stroke_centers(stroke, center), half_r.min(half_u));
    let extent = [0, 1, 2].map(|a| {
        right[a].abs() * grow(half_r) + up[a].abs() * grow(half_u) + normal[a].abs() * grow(t)
    });
    let bounds = swept_bounds(geometry, &centers, extent)?;

    Some(ShapeInfo {
        center_world: center,
        center_ijk: geometry.world_to_index(center),
        bounds,
        is_in_object: Box::new(move |p, _| {
            centers.iter().any(|c| {
                let d = sub(*p, *c);
                within(dot(d, right), half_r)
                    && within(dot(d, up), half_u)
                    && within(dot(d, normal), t)
            })
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::BoundsIjk;
    use crate::shape::tests::assert_bounds_contain;

    fn corners(c: Point3, half: f64) -> Vec<Point3> {
        vec![
            [c[0] - half, c[1] - half, c[2]],
            [c[0] + half, c[1] - half, c[2]],
            [c[0] + half, c[1] + half, c[2]],
            [c[0] - half, c[1] + half, c[2]],
        ]
    }

    #[test]
    fn test_square() {
        let g = ImageGeometry::axis_aligned([10, 10, 1], [1.0; 3]).unwrap();
        let shape = square(&g, &ViewPlane::default(), &corners([4.0, 4.0, 0.0], 1.0), &[]).unwrap();
        assert_eq!(shape.bounds, BoundsIjk::new([3, 3, 0], [5, 5, 0]).unwrap());
        assert_eq!(assert_bounds_contain(&g, &shape), 9);
    }

    #[test]
    fn test_fast_stroke_has_no_gaps() {
        let g = ImageGeometry::axis_aligned([20, 10, 1], [1.0; 3]).unwrap();
        // 只有两个采样点, 相距远大于边长.
        let shape = square(
            &g,
            &ViewPlane::default(),
            &corners([16.0, 5.0, 0.0], 1.0),
            &[[2.0, 5.0, 0.0]],
        )
        .unwrap();
        let row = (1..=17)
            .filter(|&i| shape.contains(&g.ijk_to_world([i, 5, 0]), [i, 5, 0]))
            .count();
        assert_eq!(row, 17);
        assert_eq!(assert_bounds_contain(&g, &shape), 17 * 3);
    }

    #[test]
    fn test_degenerate_view() {
        let g = ImageGeometry::axis_aligned([10, 10, 1], [1.0; 3]).unwrap();
        let view = ViewPlane {
            normal: [0.0; 3],
            view_up: [0.0, 1.0, 0.0],
        };
        assert!(square(&g, &view, &corners([4.0, 4.0, 0.0], 1.0), &[]).is_none());
    }
}
