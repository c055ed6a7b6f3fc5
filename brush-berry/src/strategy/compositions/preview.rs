use crate::strategy::{Composition, InitializedOperationData, PreviewHandler};
use crate::BrushResult;

/// 预览的提交与回滚. 只处理被跟踪的体素.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preview;

impl Composition for Preview {
    fn name(&self) -> &'static str {
        "preview"
    }

    fn preview_handler(&self) -> Option<&dyn PreviewHandler> {
        Some(self)
    }
}

impl PreviewHandler for Preview {
    fn accept_preview(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        let tracking = &op.state.tracking;
        let (Some(preview), Some(segment)) =
            (tracking.preview_segment_index(), tracking.segment_index())
        else {
            return Ok(());
        };
        let geometry = op.labelmap.geometry().clone();
        for (index, _) in tracking.iter() {
            if op.labelmap.get(index) == preview {
                op.labelmap.set(index, segment);
                op.modified_slices.insert(geometry.ijk_of(index)[2]);
            }
        }
        Ok(())
    }

    fn reject_preview(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        let tracking = &op.state.tracking;
        let geometry = op.labelmap.geometry().clone();
        for (index, original) in tracking.iter() {
            if op.labelmap.get(index) != original {
                op.labelmap.set(index, original);
                op.modified_slices.insert(geometry.ijk_of(index)[2]);
            }
        }
        Ok(())
    }
}
