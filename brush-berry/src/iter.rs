//! 有界体素迭代.
//!
//! 在 `[min, max]` 包围盒内按 `k -> j -> i` 的顺序 (即内存顺序) 遍历体素,
//! 只对通过形状谓词的体素调用回调. 迭代器本身从不修改数据.

use crate::data::{add, BoundsIjk, ImageGeometry, VoxelGrid, VoxelValue};
use crate::{Ijk, Point3};

/// 通过谓词的体素.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelPoint {
    /// 标量数组偏移.
    pub index: usize,

    /// 整数索引.
    pub ijk: Ijk,

    /// 体素中心的世界坐标.
    pub world: Point3,
}

/// 遍历 `bounds` 内的体素, 对满足 `is_in_object` 的体素调用 `callback`.
///
/// 世界坐标通过预先计算的每轴增量累加得到, 每个体素的开销为 O(1).
pub fn for_each_in_shape<P, F>(
    geometry: &ImageGeometry,
    bounds: &BoundsIjk,
    is_in_object: P,
    mut callback: F,
) where
    P: Fn(&Point3, Ijk) -> bool,
    F: FnMut(VoxelPoint),
{
    let [step_i, step_j, step_k] = [0, 1, 2].map(|a| geometry.axis_step(a));
    let (min, max) = (bounds.min, bounds.max);

    let mut world_k = geometry.ijk_to_world(min);
    for k in min[2]..=max[2] {
        let mut world_j = world_k;
        for j in min[1]..=max[1] {
            let mut world = world_j;
            let mut index = geometry.offset([min[0], j, k]);
            for i in min[0]..=max[0] {
                let ijk = [i, j, k];
                if is_in_object(&world, ijk) {
                    callback(VoxelPoint { index, ijk, world });
                }
                world = add(world, step_i);
                index += 1;
            }
            world_j = add(world_j, step_j);
        }
        world_k = add(world_k, step_k);
    }
}

/// 与 [`for_each_in_shape`] 相同, 但同时把体素值交给回调.
///
/// `bounds` 为 `None` 时遍历整个体数据. 多分量数据以分量视图的形式给出.
pub fn point_in_shape_callback<G, P, F>(
    grid: &G,
    bounds: Option<&BoundsIjk>,
    is_in_object: P,
    mut callback: F,
) where
    G: VoxelGrid + ?Sized,
    P: Fn(&Point3, Ijk) -> bool,
    F: FnMut(VoxelValue<'_, G::Elem>, &VoxelPoint),
{
    let geometry = grid.geometry();
    let full = BoundsIjk::full(geometry.dimensions());
    let bounds = bounds.unwrap_or(&full);
    for_each_in_shape(geometry, bounds, is_in_object, |point| {
        callback(grid.value_at(point.index), &point)
    });
}
