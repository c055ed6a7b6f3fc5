use super::{four_point_center, grow, slab_tolerance, within, ShapeInfo, ViewPlane};
use crate::consts::{EPSILON, EPSILON_ABS};
use crate::data::{add, cross, dot, norm, normalize, scale, sub, ImageGeometry};
use crate::Point3;

/// 矩形. `points` 为四个角点 `p0, p1, p2, p3`, 其中 `p0 -> p1` 与 `p0 -> p3` 为两条边.
///
/// 候选点投影到两条边以及平面法向上: 两个边投影都在 `[0, length]` 内,
/// 且法向距离不超过法向体素间距的一半时接受. 法向取自视平面, 视平面退化时取两边叉积.
pub fn rectangle(geometry: &ImageGeometry, view: &ViewPlane, points: &[Point3]) -> Option<ShapeInfo> {
    let center = four_point_center(points)?;
    let p0 = points[0];
    let (e1, e2) = (sub(points[1], p0), sub(points[3], p0));
    let u = normalize(e1)?;
    let len_u = norm(e1);

    // 两条边平行时没有可用的基.
    let e2_perp = sub(e2, scale(u, dot(e2, u)));
    let len_v = norm(e2_perp);
    if len_v <= EPSILON_ABS + norm(e2) * EPSILON * 1e-2 {
        log::trace!("rectangle edges are parallel");
        return None;
    }
    let v = scale(e2_perp, 1.0 / len_v);

    let normal = match normalize(view.normal) {
        Some(n) if dot(n, u).abs() < EPSILON && dot(n, v).abs() < EPSILON => n,
        _ => cross(u, v),
    };
    let t = slab_tolerance(geometry, normal);

    // 谓词接受的区域是 p0 处展开的 (u, v) 矩形, 不一定是四个角点围成的平行四边形.
    let (eps_u, eps_v) = (grow(len_u) - len_u, grow(len_v) - len_v);
    let slab = grow(t);
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for a_u in [-eps_u, len_u + eps_u] {
        for a_v in [-eps_v, len_v + eps_v] {
            let corner = add(p0, add(scale(u, a_u), scale(v, a_v)));
            for a in 0..3 {
                lo[a] = lo[a].min(corner[a] - normal[a].abs() * slab);
                hi[a] = hi[a].max(corner[a] + normal[a].abs() * slab);
            }
        }
    }
    let bounds = geometry.bounds_of_world_box(lo, hi)?;

    Some(ShapeInfo {
        center_world: center,
        center_ijk: geometry.world_to_index(center),
        bounds,
        is_in_object: Box::new(move |p, _| {
            let d = sub(*p, p0);
            let (a, b) = (dot(d, u), dot(d, v));
            -eps_u <= a
                && a <= len_u + eps_u
                && -eps_v <= b
                && b <= len_v + eps_v
                && within(dot(d, normal), t)
        }),
    })
}
