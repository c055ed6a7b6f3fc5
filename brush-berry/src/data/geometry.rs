//! 索引空间 (IJK) 与世界空间 (LPS) 之间的仿射变换.
//!
//! 体素 `(i, j, k)` 的世界坐标为 `origin + Σ direction[a] * spacing[a] * ijk[a]`.
//! 其中 `i` 增长最快, 与底层数组 `[k, j, i]` 的行优先布局一致.

use itertools::iproduct;
use nifti::NiftiHeader;

use crate::consts::EPSILON;
use crate::{BrushError, BrushResult, Ijk, IjkSigned, Point3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[inline]
pub(crate) fn add(a: Point3, b: Point3) -> Point3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

#[inline]
pub(crate) fn sub(a: Point3, b: Point3) -> Point3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

#[inline]
pub(crate) fn scale(a: Point3, k: f64) -> Point3 {
    [a[0] * k, a[1] * k, a[2] * k]
}

#[inline]
pub(crate) fn dot(a: Point3, b: Point3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

#[inline]
pub(crate) fn cross(a: Point3, b: Point3) -> Point3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

#[inline]
pub(crate) fn norm(a: Point3) -> f64 {
    dot(a, a).sqrt()
}

/// 单位化. 零向量返回 `None`.
#[inline]
pub(crate) fn normalize(a: Point3) -> Option<Point3> {
    let n = norm(a);
    (n > crate::consts::EPSILON_ABS).then(|| scale(a, 1.0 / n))
}

/// 点集的质心. 空集返回 `None`.
pub(crate) fn mean(points: &[Point3]) -> Option<Point3> {
    if points.is_empty() {
        return None;
    }
    let sum = points.iter().fold([0.0; 3], |acc, p| add(acc, *p));
    Some(scale(sum, 1.0 / points.len() as f64))
}

/// 索引空间中的轴对齐包围盒, 各轴均为闭区间.
///
/// 不变量: 每个轴上 `min <= max`, 且 `max` 小于对应维度.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BoundsIjk {
    /// 三个轴的下界 (含).
    pub min: Ijk,

    /// 三个轴的上界 (含).
    pub max: Ijk,
}

impl BoundsIjk {
    /// 创建包围盒. 任一轴 `min > max` 时返回 `None`.
    pub fn new(min: Ijk, max: Ijk) -> Option<Self> {
        (0..3).all(|a| min[a] <= max[a]).then_some(Self { min, max })
    }

    /// 覆盖维度为 `dimensions` 的整个体数据的包围盒.
    #[inline]
    pub fn full(dimensions: Ijk) -> Self {
        Self {
            min: [0; 3],
            max: dimensions.map(|d| d.saturating_sub(1)),
        }
    }

    /// 以 `center` 为中心, 各轴半径为 `radius` 的立方体, 截断到 `dimensions` 内.
    pub fn around(center: Ijk, radius: usize, dimensions: Ijk) -> Self {
        let mut min = [0; 3];
        let mut max = [0; 3];
        for a in 0..3 {
            let last = dimensions[a].saturating_sub(1);
            min[a] = center[a].saturating_sub(radius).min(last);
            max[a] = center[a].saturating_add(radius).min(last);
        }
        Self { min, max }
    }

    /// 判断 `ijk` 是否在包围盒内.
    #[inline]
    pub fn contains(&self, ijk: Ijk) -> bool {
        (0..3).all(|a| self.min[a] <= ijk[a] && ijk[a] <= self.max[a])
    }

    /// 扩张包围盒使其包含 `ijk`.
    #[inline]
    pub fn include(&mut self, ijk: Ijk) {
        for a in 0..3 {
            self.min[a] = self.min[a].min(ijk[a]);
            self.max[a] = self.max[a].max(ijk[a]);
        }
    }

    /// 包围盒内的体素个数.
    #[inline]
    pub fn voxel_count(&self) -> usize {
        (0..3).map(|a| self.max[a] - self.min[a] + 1).product()
    }
}

/// 标注/图像的几何信息: 维度、原点、spacing 和方向余弦.
///
/// 该结构是只读的, 并在构造时预先求出 index -> world 的每轴步进向量以及
/// world -> index 的逆矩阵.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry {
    dimensions: Ijk,
    origin: Point3,
    spacing: Point3,
    direction: [Point3; 3],
    steps: [Point3; 3],
    inverse: [[f64; 3]; 3],
}

impl ImageGeometry {
    /// 构建几何信息.
    ///
    /// `direction[a]` 是第 `a` 个索引轴在世界空间中的方向, 会被单位化.
    ///
    /// # 返回值
    ///
    /// 维度含 0, spacing 非正 (或非有限), 方向向量为零或三者共面时,
    /// 返回 `Err(BrushError::InvalidGeometry)`.
    pub fn new(
        dimensions: Ijk,
        origin: Point3,
        spacing: Point3,
        direction: [Point3; 3],
    ) -> BrushResult<Self> {
        if dimensions.iter().any(|d| *d == 0) {
            return Err(BrushError::InvalidGeometry(format!(
                "zero dimension in {dimensions:?}"
            )));
        }
        if spacing.iter().any(|s| !s.is_finite() || *s <= 0.0) {
            return Err(BrushError::InvalidGeometry(format!(
                "non-positive spacing {spacing:?}"
            )));
        }
        let mut unit = [[0.0; 3]; 3];
        for a in 0..3 {
            unit[a] = normalize(direction[a]).ok_or_else(|| {
                BrushError::InvalidGeometry(format!("zero direction for axis {a}"))
            })?;
        }
        let steps = [0, 1, 2].map(|a| scale(unit[a], spacing[a]));
        let inverse = invert_columns(&steps).ok_or_else(|| {
            BrushError::InvalidGeometry(format!("singular direction matrix {unit:?}"))
        })?;

        Ok(Self {
            dimensions,
            origin,
            spacing,
            direction: unit,
            steps,
            inverse,
        })
    }

    /// 原点为 0, 方向为单位阵的几何信息.
    #[inline]
    pub fn axis_aligned(dimensions: Ijk, spacing: Point3) -> BrushResult<Self> {
        Self::new(
            dimensions,
            [0.0; 3],
            spacing,
            [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        )
    }

    /// 从 nifti header 构建几何信息.
    ///
    /// 存在 sform 时使用 `srow_{x,y,z}`, 否则仅使用 `pixdim`.
    /// nifti 的世界坐标是 RAS, 这里统一转换为 LPS.
    pub fn from_nifti_header(header: &NiftiHeader) -> BrushResult<Self> {
        // [ndim, W, H, z, ...]
        let [_, w, h, z, ..] = header.dim;
        let dimensions = [w as usize, h as usize, (z as usize).max(1)];

        let (origin, steps) = if header.sform_code > 0 {
            let rows = [header.srow_x, header.srow_y, header.srow_z];
            let column = |c: usize| [rows[0][c] as f64, rows[1][c] as f64, rows[2][c] as f64];
            (column(3), [column(0), column(1), column(2)])
        } else {
            let [_, pw, ph, pz, ..] = header.pixdim;
            let mm = |v: f32| if v == 0.0 { 1.0 } else { v.abs() as f64 };
            (
                [0.0; 3],
                [
                    [mm(pw), 0.0, 0.0],
                    [0.0, mm(ph), 0.0],
                    [0.0, 0.0, mm(pz)],
                ],
            )
        };

        // RAS -> LPS
        let flip = |p: Point3| [-p[0], -p[1], p[2]];
        let steps = steps.map(flip);
        let spacing = steps.map(norm);
        Self::new(dimensions, flip(origin), spacing, steps)
    }

    /// `(i, j, k)` 三个方向的体素个数.
    #[inline]
    pub fn dimensions(&self) -> Ijk {
        self.dimensions
    }

    /// 体素总个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.dimensions.iter().product()
    }

    /// 原点, 即体素 `(0, 0, 0)` 的世界坐标.
    #[inline]
    pub fn origin(&self) -> Point3 {
        self.origin
    }

    /// 三个索引轴的体素间距 (毫米).
    #[inline]
    pub fn spacing(&self) -> Point3 {
        self.spacing
    }

    /// 三个索引轴的单位方向向量.
    #[inline]
    pub fn direction(&self) -> [Point3; 3] {
        self.direction
    }

    /// 沿第 `axis` 个索引轴前进一个体素时, 世界坐标的增量.
    #[inline]
    pub fn axis_step(&self, axis: usize) -> Point3 {
        self.steps[axis]
    }

    /// 单个体素的体积 (立方毫米).
    #[inline]
    pub fn voxel_volume(&self) -> f64 {
        self.spacing.iter().product()
    }

    /// 连续索引 -> 世界坐标.
    #[inline]
    pub fn index_to_world(&self, ijk: Point3) -> Point3 {
        let mut p = self.origin;
        for a in 0..3 {
            p = add(p, scale(self.steps[a], ijk[a]));
        }
        p
    }

    /// 整数索引 -> 世界坐标.
    #[inline]
    pub fn ijk_to_world(&self, ijk: Ijk) -> Point3 {
        self.index_to_world(ijk.map(|v| v as f64))
    }

    /// 世界坐标 -> 连续索引.
    #[inline]
    pub fn world_to_continuous_index(&self, world: Point3) -> Point3 {
        let d = sub(world, self.origin);
        [0, 1, 2].map(|r| dot(self.inverse[r], d))
    }

    /// 世界坐标 -> 四舍五入后的整数索引. 结果可能在体数据外部.
    #[inline]
    pub fn world_to_index(&self, world: Point3) -> IjkSigned {
        self.world_to_continuous_index(world)
            .map(|v| v.round() as i64)
    }

    /// 若有符号索引在体数据内部, 则返回对应的无符号索引.
    pub fn checked_ijk(&self, ijk: IjkSigned) -> Option<Ijk> {
        let mut ans = [0usize; 3];
        for a in 0..3 {
            if ijk[a] < 0 || ijk[a] as usize >= self.dimensions[a] {
                return None;
            }
            ans[a] = ijk[a] as usize;
        }
        Some(ans)
    }

    /// 判断索引是否合法.
    #[inline]
    pub fn contains(&self, ijk: Ijk) -> bool {
        (0..3).all(|a| ijk[a] < self.dimensions[a])
    }

    /// `(i, j, k)` -> 行优先展开后的标量数组偏移.
    #[inline]
    pub fn offset(&self, [i, j, k]: Ijk) -> usize {
        let [di, dj, _] = self.dimensions;
        i + di * (j + dj * k)
    }

    /// 标量数组偏移 -> `(i, j, k)`.
    #[inline]
    pub fn ijk_of(&self, offset: usize) -> Ijk {
        let [di, dj, _] = self.dimensions;
        [offset % di, (offset / di) % dj, offset / (di * dj)]
    }

    /// 沿 `normal` 方向的体素间距. 用于斜切面上的容差.
    pub fn spacing_in_normal_direction(&self, normal: Point3) -> f64 {
        let projected = [0, 1, 2].map(|a| dot(self.direction[a], normal) * self.spacing[a]);
        norm(projected)
    }

    /// 返回与 `normal` 平行的索引轴 (若存在).
    pub fn axis_parallel_to(&self, normal: Point3) -> Option<usize> {
        let normal = normalize(normal)?;
        (0..3).find(|&a| dot(self.direction[a], normal).abs() >= 1.0 - EPSILON * 1e-2)
    }

    /// 世界空间中的轴对齐盒 `[min, max]` 在索引空间中的整数包围盒,
    /// 截断到体数据范围内. 盒内不含任何体素中心时返回 `None`.
    pub fn bounds_of_world_box(&self, min: Point3, max: Point3) -> Option<BoundsIjk> {
        let mut lo = [f64::INFINITY; 3];
        let mut hi = [f64::NEG_INFINITY; 3];
        for (x, y, z) in iproduct!([min[0], max[0]], [min[1], max[1]], [min[2], max[2]]) {
            let c = self.world_to_continuous_index([x, y, z]);
            for a in 0..3 {
                lo[a] = lo[a].min(c[a]);
                hi[a] = hi[a].max(c[a]);
            }
        }

        // 体素中心位于整数索引上, 因此 [ceil(lo), floor(hi)] 已经是最紧的超集.
        let mut bmin = [0usize; 3];
        let mut bmax = [0usize; 3];
        for a in 0..3 {
            let last = self.dimensions[a] as i64 - 1;
            let (l, h) = (lo[a].ceil() as i64, hi[a].floor() as i64);
            if h < 0 || l > last || l > h {
                return None;
            }
            bmin[a] = l.clamp(0, last) as usize;
            bmax[a] = h.clamp(0, last) as usize;
        }
        BoundsIjk::new(bmin, bmax)
    }
}

/// 求以 `columns` 为列向量的 3x3 矩阵的逆. 奇异时返回 `None`.
fn invert_columns(columns: &[Point3; 3]) -> Option<[[f64; 3]; 3]> {
    // m[r][c]
    let m = [0, 1, 2].map(|r| [columns[0][r], columns[1][r], columns[2][r]]);
    let det = m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0]);
    let scale_ref: f64 = columns.iter().map(|c| norm(*c)).product();
    if !det.is_finite() || det.abs() <= scale_ref * 1e-9 {
        return None;
    }
    let inv_det = 1.0 / det;
    Some([
        [
            (m[1][1] * m[2][2] - m[1][2] * m[2][1]) * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            (m[1][2] * m[2][0] - m[1][0] * m[2][2]) * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            (m[1][0] * m[2][1] - m[1][1] * m[2][0]) * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ])
}
