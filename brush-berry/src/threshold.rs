//! 阈值引擎.
//!
//! 静态阈值直接使用配置的区间; 动态阈值在按下时对点击处邻域采样得到初始区间,
//! 之后每次 `fill` 只用新中心处的单个体素扩张区间.

use itertools::{Itertools, MinMaxResult};
use ordered_float::OrderedFloat;

use crate::config::{ThresholdMode, ThresholdRange};
use crate::data::{BoundsIjk, ReferenceImage};
use crate::iter::for_each_in_shape;
use crate::Ijk;

/// 在以 `center` 为中心, 半径为 `radius` 的立方体邻域 (截断到体数据内) 中采样灰度的最小/最大值.
pub fn sample_range(reference: &ReferenceImage, center: Ijk, radius: usize) -> Option<ThresholdRange> {
    let geometry = reference.geometry();
    let bounds = BoundsIjk::around(center, radius, geometry.dimensions());
    let mut grays = Vec::with_capacity(bounds.voxel_count());
    for_each_in_shape(geometry, &bounds, |_, _| true, |p| {
        grays.push(OrderedFloat(reference.gray_at(p.index)))
    });
    match grays.into_iter().minmax() {
        MinMaxResult::NoElements => None,
        MinMaxResult::OneElement(v) => Some(ThresholdRange::point(v.0)),
        MinMaxResult::MinMax(lo, hi) => Some(ThresholdRange::new(lo.0, hi.0)),
    }
}

/// 更新动态阈值区间.
///
/// 区间尚未设置时, 采样 `center` 的邻域; 否则只用 `center` 处的体素扩张区间.
/// 返回更新后的区间. 区间永远不会收缩.
pub fn update_dynamic_range(
    range: &mut Option<ThresholdRange>,
    reference: &ReferenceImage,
    center: Ijk,
    radius: usize,
) -> Option<ThresholdRange> {
    match range {
        Some(r) => r.widen(reference.gray_at(reference.geometry().offset(center))),
        None => *range = sample_range(reference, center, radius),
    }
    *range
}

/// 当前有效的阈值区间. 动态模式使用交互状态中的区间.
#[inline]
pub fn effective_range(
    mode: &ThresholdMode,
    dynamic: Option<ThresholdRange>,
) -> Option<ThresholdRange> {
    match mode {
        ThresholdMode::Static(r) => Some(*r),
        ThresholdMode::Dynamic { .. } => dynamic,
    }
}

/// 以标量偏移为参数的阈值谓词. 灰度取 [`ReferenceImage::gray_at`].
pub fn is_in_threshold(
    reference: &ReferenceImage,
    range: ThresholdRange,
) -> impl Fn(usize) -> bool + '_ {
    move |index| range.contains(reference.gray_at(index))
}
