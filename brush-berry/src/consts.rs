//! 通用常量.

use crate::SegmentIndex;

/// 背景 (无分割) 的 segment index.
pub const BACKGROUND: SegmentIndex = 0;

/// 预览时默认使用的哨兵 segment index.
pub const DEFAULT_PREVIEW_SEGMENT_INDEX: SegmentIndex = 255;

/// 所有形状谓词共用的相对误差.
///
/// 相邻笔触采样点上的形状实例必须使用同一个误差, 否则两者之间会出现缝隙.
pub const EPSILON: f64 = 1e-2;

/// 绝对误差下限. 用于长度接近 0 的情形.
pub const EPSILON_ABS: f64 = 1e-6;

/// 洪水填充可编码的坐标范围为 `[-FLOOD_FILL_COORD_LIMIT, FLOOD_FILL_COORD_LIMIT]`.
///
/// 每个轴占用 16 bit, 超出该范围的坐标会导致 visited 集合冲突, 因此直接报错.
pub const FLOOD_FILL_COORD_LIMIT: i64 = 32767;

/// 像素是否是背景?
#[inline]
pub const fn is_background(index: SegmentIndex) -> bool {
    index == BACKGROUND
}

/// 带误差的 `a <= b`. 误差相对于 `scale` 计算.
#[inline]
pub fn le_eps(a: f64, b: f64, scale: f64) -> bool {
    a <= b + scale.abs() * EPSILON + EPSILON_ABS
}
