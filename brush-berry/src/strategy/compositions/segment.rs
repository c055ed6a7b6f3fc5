//! 点击处 segment index 的解析 ("扩展已有 segment").

use crate::consts::BACKGROUND;
use crate::iter::for_each_in_shape;
use crate::strategy::{
    CenterSegment, Composition, InitializedOperationData, Initializer, InteractionStarter,
};
use crate::BrushResult;

/// 按下时根据点击中心处的已有值决定生效的 segment index.
///
/// 只在 [`StrategyConfig::use_center_segment_index`](crate::StrategyConfig) 打开时生效:
///
/// 1. 中心为哨兵时, 穿透预览查看其下方已提交的值.
/// 2. 中心为非背景值 `c` 时, 扩展 `c`.
/// 3. 中心为背景, 且形状内有哨兵时, 清除覆盖到的预览.
/// 4. 中心为背景, 且形状内有当前 segment 时, 擦除.
/// 5. 其余情况使用工具的当前 segment index.
///
/// 解析在每次按下时只做一次, 结果保存在 [`InteractionState::center_segment`](crate::strategy::InteractionState).
#[derive(Debug, Clone, Copy, Default)]
pub struct DetermineSegmentIndex;

impl Composition for DetermineSegmentIndex {
    fn name(&self) -> &'static str {
        "determineSegmentIndex"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }

    fn interaction_starter(&self) -> Option<&dyn InteractionStarter> {
        Some(self)
    }
}

/// 把解析结果应用到生效 segment index.
fn apply(op: &mut InitializedOperationData<'_>) {
    match op.state.center_segment {
        CenterSegment::Active => {}
        CenterSegment::Index(index) => op.segment_index = Some(index),
        CenterSegment::ClearPreview => op.segment_index = None,
    }
}

impl Initializer for DetermineSegmentIndex {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        if op.config.use_center_segment_index {
            apply(op);
        }
        Ok(())
    }
}

impl InteractionStarter for DetermineSegmentIndex {
    fn on_interaction_start(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        if !op.config.use_center_segment_index {
            return Ok(());
        }
        let (Some(shape), Some(center)) = (op.shape.as_ref(), op.center_ijk()) else {
            return Ok(());
        };
        let geometry = op.labelmap.geometry();
        let center_index = geometry.offset(center);
        let value = op.labelmap.get(center_index);
        let preview = op.preview_segment_index;

        let resolved = if Some(value) == preview {
            let tracking = &op.state.tracking;
            match tracking.original(center_index) {
                Some(original) if original != BACKGROUND => CenterSegment::Index(original),
                _ => tracking
                    .segment_index()
                    .map_or(CenterSegment::Active, CenterSegment::Index),
            }
        } else if value != BACKGROUND {
            CenterSegment::Index(value)
        } else {
            let (mut has_preview, mut has_active) = (false, false);
            for_each_in_shape(geometry, &shape.bounds, &shape.is_in_object, |p| {
                let v = op.labelmap.get(p.index);
                has_preview |= Some(v) == preview;
                has_active |= v == op.active_segment_index;
            });
            if has_preview {
                CenterSegment::ClearPreview
            } else if has_active {
                CenterSegment::Index(BACKGROUND)
            } else {
                CenterSegment::Active
            }
        };

        log::debug!("center {center:?} holds {value}, resolved to {resolved:?}");
        op.state.center_segment = resolved;
        apply(op);
        Ok(())
    }
}
