//! 形状谓词生成器.
//!
//! 每种画笔形状根据用户画出的世界坐标点生成 [`ShapeInfo`]:
//! 中心, 索引空间包围盒, 以及成员谓词 `is_in_object(world, ijk)`.
//!
//! 所有生成器在点数不足或几何退化 (半径为 0, 矩形边平行) 时返回 `None`,
//! 调用方应把它当作 no-op 处理.

use std::fmt;
use std::iter;

use itertools::Itertools;

use crate::consts::{EPSILON, EPSILON_ABS};
use crate::data::{add, cross, dot, norm, normalize, scale, sub, BoundsIjk, ImageGeometry};
use crate::{Ijk, IjkSigned, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod circle;
mod rectangle;
mod sphere;
mod square;

pub use circle::circle;
pub use rectangle::rectangle;
pub use sphere::sphere;
pub use square::square;

/// 成员谓词. 参数为体素中心的世界坐标和整数索引.
pub type ShapePredicate = Box<dyn Fn(&Point3, Ijk) -> bool + Send + Sync>;

/// 视平面: 法向与向上方向. 用于在斜切面上构建平面内的基.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ViewPlane {
    /// 视平面法向 (指向观察者).
    pub normal: Point3,

    /// 视图的向上方向.
    pub view_up: Point3,
}

impl Default for ViewPlane {
    /// LPS 下的轴位视图.
    fn default() -> Self {
        Self {
            normal: [0.0, 0.0, 1.0],
            view_up: [0.0, -1.0, 0.0],
        }
    }
}

impl ViewPlane {
    /// 平面内的单位正交基 `(right, up, normal)`. 法向为零或与 `view_up` 平行时返回 `None`.
    pub fn basis(&self) -> Option<(Point3, Point3, Point3)> {
        let normal = normalize(self.normal)?;
        let up = normalize(sub(self.view_up, scale(normal, dot(self.view_up, normal))))?;
        let right = cross(up, normal);
        Some((right, up, normal))
    }
}

/// 形状生成器的输出.
pub struct ShapeInfo {
    /// 形状中心 (世界坐标).
    pub center_world: Point3,

    /// 形状中心四舍五入后的索引. 可能在体数据之外.
    pub center_ijk: IjkSigned,

    /// 截断到体数据内的包围盒. 保证包含谓词接受的所有体素.
    pub bounds: BoundsIjk,

    /// 成员谓词.
    pub is_in_object: ShapePredicate,
}

impl fmt::Debug for ShapeInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShapeInfo")
            .field("center_world", &self.center_world)
            .field("center_ijk", &self.center_ijk)
            .field("bounds", &self.bounds)
            .finish_non_exhaustive()
    }
}

impl ShapeInfo {
    /// 中心体素的整数索引. 中心不在体数据内时返回 `None`.
    #[inline]
    pub fn checked_center(&self, geometry: &ImageGeometry) -> Option<Ijk> {
        geometry.checked_ijk(self.center_ijk)
    }

    /// 调用成员谓词.
    #[inline]
    pub fn contains(&self, world: &Point3, ijk: Ijk) -> bool {
        (self.is_in_object)(world, ijk)
    }
}

/// 沿法向的容差: 法向上体素间距的一半.
#[inline]
pub(crate) fn slab_tolerance(geometry: &ImageGeometry, normal: Point3) -> f64 {
    geometry.spacing_in_normal_direction(normal) * 0.5
}

/// 笔触上的中心: 上一个中心 (若有), 再加上当前中心. 连续重复的点会被合并.
pub(crate) fn stroke_centers(stroke: &[Point3], center: Point3) -> Vec<Point3> {
    stroke
        .iter()
        .copied()
        .chain(iter::once(center))
        .dedup_by(|a, b| norm(sub(*a, *b)) <= EPSILON_ABS)
        .collect()
}

/// 线性插值加密, 使相邻中心的距离不超过 `max_step`.
///
/// `max_step` 非正时原样返回.
pub fn densify(centers: &[Point3], max_step: f64) -> Vec<Point3> {
    if centers.len() < 2 || max_step <= 0.0 {
        return centers.to_vec();
    }
    let mut ans = Vec::with_capacity(centers.len());
    for (a, b) in centers.iter().copied().tuple_windows() {
        let d = sub(b, a);
        let n = (norm(d) / max_step).ceil().max(1.0) as usize;
        ans.extend((0..n).map(|s| add(a, scale(d, s as f64 / n as f64))));
    }
    // `centers` 非空.
    ans.extend(centers.last().copied());
    ans
}

/// 点 `p` 到线段 `ab` 的距离.
pub(crate) fn segment_distance(p: Point3, a: Point3, b: Point3) -> f64 {
    let ab = sub(b, a);
    let len2 = dot(ab, ab);
    let ap = sub(p, a);
    if len2 <= EPSILON_ABS * EPSILON_ABS {
        return norm(ap);
    }
    let t = (dot(ap, ab) / len2).clamp(0.0, 1.0);
    norm(sub(ap, scale(ab, t)))
}

/// 以每个中心为中心, 各世界轴半宽为 `extent` 的盒子之并, 在索引空间中的包围盒.
pub(crate) fn swept_bounds(
    geometry: &ImageGeometry,
    centers: &[Point3],
    extent: Point3,
) -> Option<BoundsIjk> {
    let mut lo = [f64::INFINITY; 3];
    let mut hi = [f64::NEG_INFINITY; 3];
    for c in centers {
        for a in 0..3 {
            lo[a] = lo[a].min(c[a] - extent[a]);
            hi[a] = hi[a].max(c[a] + extent[a]);
        }
    }
    if centers.is_empty() {
        return None;
    }
    geometry.bounds_of_world_box(lo, hi)
}

/// 加上与谓词相同的误差后的长度. 包围盒必须按它计算.
#[inline]
pub(crate) fn grow(length: f64) -> f64 {
    length + length.abs() * EPSILON + EPSILON_ABS
}

/// `|value| <= half`, 误差与 [`crate::consts::le_eps`] 相同.
#[inline]
pub(crate) fn within(value: f64, half: f64) -> bool {
    value.abs() <= grow(half)
}

/// 四个点的质心. 点数不为 4 时返回 `None`.
pub(crate) fn four_point_center(points: &[Point3]) -> Option<Point3> {
    if points.len() != 4 {
        if !points.is_empty() {
            log::trace!("shape expects 4 points, got {}", points.len());
        }
        return None;
    }
    crate::data::mean(points)
}
