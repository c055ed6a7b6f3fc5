//! 预设策略.
//!
//! | 形状 | 填充 | 擦除 | 阈值填充 |
//! |:----|:----|:----|:----|
//! | 圆/椭圆 | [`fill_inside_circle`] | [`erase_inside_circle`] | [`threshold_inside_circle`] |
//! | 球 | [`fill_inside_sphere`] | [`erase_inside_sphere`] | [`threshold_inside_sphere`] |
//! | 矩形 | [`fill_inside_rectangle`] | [`erase_inside_rectangle`] | [`threshold_inside_rectangle`] |
//! | 正方形 | [`fill_inside_square`] | [`erase_inside_square`] | [`threshold_inside_square`] |
//!
//! 阈值和孤岛移除的参数来自 [`StrategyConfig`](crate::StrategyConfig); 未配置阈值时阈值填充与普通填充相同.

use super::compositions::{
    CircleShape, DetermineSegmentIndex, Erase, FillInsideShape, Preview, RectangleShape,
    RemoveIslands, SetValue, SphereShape, SquareShape, Statistics, Threshold,
};
use super::{BrushStrategy, Composition, StrategyBuilder};
use crate::BrushResult;

/// 在形状片段之后追加的片段.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Fill,
    Erase,
    Threshold,
}

fn assemble<S: Composition + 'static>(
    name: &'static str,
    shape: S,
    mode: Mode,
) -> BrushResult<BrushStrategy> {
    let builder = StrategyBuilder::new(name)
        .compose(shape)
        .compose(DetermineSegmentIndex);
    let builder = match mode {
        Mode::Fill => builder,
        Mode::Erase => builder.compose(Erase),
        Mode::Threshold => builder.compose(Threshold),
    };
    let builder = builder
        .compose(Preview)
        .compose(SetValue)
        .compose(FillInsideShape);
    let builder = match mode {
        Mode::Threshold => builder.compose(RemoveIslands),
        _ => builder,
    };
    builder.compose(Statistics).build()
}

/// 圆/椭圆内填充.
pub fn fill_inside_circle() -> BrushResult<BrushStrategy> {
    assemble("FILL_INSIDE_CIRCLE", CircleShape, Mode::Fill)
}

/// 圆/椭圆内擦除.
pub fn erase_inside_circle() -> BrushResult<BrushStrategy> {
    assemble("ERASE_INSIDE_CIRCLE", CircleShape, Mode::Erase)
}

/// 圆/椭圆内阈值填充, 可选孤岛移除.
pub fn threshold_inside_circle() -> BrushResult<BrushStrategy> {
    assemble("THRESHOLD_INSIDE_CIRCLE", CircleShape, Mode::Threshold)
}

/// 球内填充.
pub fn fill_inside_sphere() -> BrushResult<BrushStrategy> {
    assemble("FILL_INSIDE_SPHERE", SphereShape, Mode::Fill)
}

/// 球内擦除.
pub fn erase_inside_sphere() -> BrushResult<BrushStrategy> {
    assemble("ERASE_INSIDE_SPHERE", SphereShape, Mode::Erase)
}

/// 球内阈值填充.
pub fn threshold_inside_sphere() -> BrushResult<BrushStrategy> {
    assemble("THRESHOLD_INSIDE_SPHERE", SphereShape, Mode::Threshold)
}

/// 矩形内填充.
pub fn fill_inside_rectangle() -> BrushResult<BrushStrategy> {
    assemble("FILL_INSIDE_RECTANGLE", RectangleShape, Mode::Fill)
}

/// 矩形内擦除.
pub fn erase_inside_rectangle() -> BrushResult<BrushStrategy> {
    assemble("ERASE_INSIDE_RECTANGLE", RectangleShape, Mode::Erase)
}

/// 矩形内阈值填充.
pub fn threshold_inside_rectangle() -> BrushResult<BrushStrategy> {
    assemble("THRESHOLD_INSIDE_RECTANGLE", RectangleShape, Mode::Threshold)
}

/// 正方形内填充.
pub fn fill_inside_square() -> BrushResult<BrushStrategy> {
    assemble("FILL_INSIDE_SQUARE", SquareShape, Mode::Fill)
}

/// 正方形内擦除.
pub fn erase_inside_square() -> BrushResult<BrushStrategy> {
    assemble("ERASE_INSIDE_SQUARE", SquareShape, Mode::Erase)
}

/// 正方形内阈值填充.
pub fn threshold_inside_square() -> BrushResult<BrushStrategy> {
    assemble("THRESHOLD_INSIDE_SQUARE", SquareShape, Mode::Threshold)
}
