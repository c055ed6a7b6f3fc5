use crate::config::ThresholdMode;
use crate::consts::BACKGROUND;
use crate::strategy::{
    Composition, InitializedOperationData, Initializer, OperationName, ThresholdFactory,
};
use crate::threshold::{effective_range, is_in_threshold, update_dynamic_range};
use crate::{BrushError, BrushResult};

/// 阈值片段: 检查参考图像, 维护动态阈值区间, 并提供 `createIsInThreshold`.
///
/// 没有配置阈值时不做任何事, 谓词为 `None` (不筛选).
/// 擦除 (生效 segment index 为背景) 与清除预览不受阈值约束.
#[derive(Debug, Clone, Copy, Default)]
pub struct Threshold;

impl Composition for Threshold {
    fn name(&self) -> &'static str {
        "threshold"
    }

    fn initializer(&self) -> Option<&dyn Initializer> {
        Some(self)
    }

    fn threshold_factory(&self) -> Option<&dyn ThresholdFactory> {
        Some(self)
    }
}

impl Initializer for Threshold {
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()> {
        let Some(mode) = op.config.threshold else {
            return Ok(());
        };
        if !matches!(
            op.operation,
            OperationName::InteractionStart | OperationName::Fill | OperationName::Preview
        ) {
            return Ok(());
        }
        let Some(reference) = op.reference else {
            return Err(BrushError::DataNotFound(format!(
                "thresholding `{}` requires a reference image",
                op.segmentation_id
            )));
        };

        if let ThresholdMode::Dynamic { radius } = mode {
            if let Some(center) = op.center_ijk() {
                let range =
                    update_dynamic_range(&mut op.state.dynamic_range, reference, center, radius);
                log::trace!("dynamic threshold at {center:?}: {range:?}");
            }
        }
        Ok(())
    }
}

impl ThresholdFactory for Threshold {
    fn create_is_in_threshold<'a>(
        &self,
        op: &InitializedOperationData<'a>,
    ) -> Option<Box<dyn Fn(usize) -> bool + 'a>> {
        let config = op.config;
        let mode = config.threshold.as_ref()?;
        if matches!(op.segment_index, None | Some(BACKGROUND)) {
            return None;
        }
        let reference = op.reference?;
        match effective_range(mode, op.state.dynamic_range) {
            Some(range) => Some(Box::new(is_in_threshold(reference, range))),
            // 动态区间尚未建立 (点击在体数据外), 不接受任何体素.
            None => Some(Box::new(|_: usize| false)),
        }
    }
}
