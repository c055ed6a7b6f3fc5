use crate::iter::for_each_in_shape;
use crate::strategy::{BrushStrategy, Composition, Filler, InitializedOperationData};
use crate::BrushResult;

/// 对形状内 (且通过阈值) 的每个体素调用 [`BrushStrategy::set_value`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FillInsideShape;

impl Composition for FillInsideShape {
    fn name(&self) -> &'static str {
        "fillInsideShape"
    }

    fn filler(&self) -> Option<&dyn Filler> {
        Some(self)
    }
}

impl Filler for FillInsideShape {
    fn fill(&self, strategy: &BrushStrategy, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        let Some(shape) = op.shape.take() else {
            return Ok(());
        };
        let geometry = op.labelmap.geometry().clone();
        let threshold = strategy.create_is_in_threshold(op);

        let mut visited = 0usize;
        for_each_in_shape(&geometry, &shape.bounds, &shape.is_in_object, |p| {
            if threshold.as_ref().map_or(true, |t| t(p.index)) {
                visited += 1;
                strategy.set_value(op, &p);
            }
        });
        log::trace!(
            "{visited} voxels inside {:?} passed to setValue (threshold: {})",
            shape.bounds,
            threshold.is_some()
        );

        op.shape = Some(shape);
        Ok(())
    }
}
