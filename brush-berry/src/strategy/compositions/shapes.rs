//! 形状片段. 每个片段在 `Initialize` 时根据形状点和笔触生成 [`ShapeInfo`](crate::ShapeInfo).

use crate::shape;
use crate::strategy::{Composition, InitializedOperationData, Initializer};
use crate::BrushResult;

/// 圆/椭圆. 拖拽时沿笔触扫掠.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircleShape;

/// 球. 拖拽时沿笔触扫掠.
#[derive(Debug, Clone, Copy, Default)]
pub struct SphereShape;

/// 任意方向的矩形. 不支持笔触.
#[derive(Debug, Clone, Copy, Default)]
pub struct RectangleShape;

/// 视平面内的正方形. 拖拽时笔触会先被加密.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquareShape;

impl Composition for CircleShape {
    fn name(&self) -> &'static str {
        "circle"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }
}

impl Initializer for CircleShape {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        op.shape = shape::circle(op.labelmap.geometry(), op.points, op.stroke_points);
        Ok(())
    }
}

impl Composition for SphereShape {
    fn name(&self) -> &'static str {
        "sphere"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }
}

impl Initializer for SphereShape {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        op.shape = shape::sphere(op.labelmap.geometry(), op.points, op.stroke_points);
        Ok(())
    }
}

impl Composition for RectangleShape {
    fn name(&self) -> &'static str {
        "rectangle"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }
}

impl Initializer for RectangleShape {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        op.shape = shape::rectangle(op.labelmap.geometry(), &op.view, op.points);
        Ok(())
    }
}

impl Composition for SquareShape {
    fn name(&self) -> &'static str {
        "square"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }
}

impl Initializer for SquareShape {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        op.shape = shape::square(op.labelmap.geometry(), &op.view, op.points, op.stroke_points);
        Ok(())
    }
}
