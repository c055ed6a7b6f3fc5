use crate::consts::BACKGROUND;
use crate::iter::VoxelPoint;
use crate::strategy::{Composition, InitializedOperationData, ValueSetter};

/// `setValue`: 唯一修改 labelmap 体素的路径.
///
/// 1. 生效 segment index 为 `None` (清除预览) 时, 把哨兵置为背景, 其余体素不动.
/// 2. 当前值等于生效 segment index 或被锁定时跳过, 不写入也不标记切片.
/// 3. 当前值为哨兵且已被本次预览写过时跳过.
/// 4. 其余情况先记录当前值为原始值 (第一次写入为准), 再写入目标值.
///
/// 每次写入都会先记录原始值, 因此拒绝预览总能精确恢复 labelmap.
#[derive(Debug, Clone, Copy, Default)]
pub struct SetValue;

impl Composition for SetValue {
    fn name(&self) -> &'static str {
        "setValue"
    }

    fn value_setter(&self) -> Option<&dyn ValueSetter> {
        Some(self)
    }
}

impl ValueSetter for SetValue {
    fn set_value(&self, op: &mut InitializedOperationData<'_>, point: &VoxelPoint) {
        let index = point.index;
        let existing = op.labelmap.get(index);
        let preview = op.preview_segment_index;

        let Some(segment) = op.segment_index else {
            if Some(existing) != preview {
                return;
            }
            op.state.tracking.record(op.labelmap.geometry(), index, existing);
            op.state.tracking.set_targets(BACKGROUND, preview);
            op.labelmap.set(index, BACKGROUND);
            op.modified_slices.insert(point.ijk[2]);
            return;
        };

        if existing == segment || op.segments_locked.contains(&existing) {
            return;
        }
        if Some(existing) == preview && op.state.tracking.original(index).is_some() {
            return;
        }

        let target = preview.unwrap_or(segment);
        op.state.tracking.record(op.labelmap.geometry(), index, existing);
        op.state.tracking.set_targets(segment, preview);
        op.labelmap.set(index, target);
        op.modified_slices.insert(point.ijk[2]);
    }
}
