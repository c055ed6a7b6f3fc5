use crate::consts::BACKGROUND;
use crate::strategy::{Composition, InitializedOperationData, Initializer};
use crate::BrushResult;

/// 擦除: 把生效的 segment index 强制设为背景.
///
/// 必须放在 [`DetermineSegmentIndex`](super::DetermineSegmentIndex) 之后, 否则会被覆盖.
#[derive(Debug, Clone, Copy, Default)]
pub struct Erase;

impl Composition for Erase {
    fn name(&self) -> &'static str {
        "erase"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }
}

impl Initializer for Erase {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        op.segment_index = Some(BACKGROUND);
        Ok(())
    }
}
