use std::collections::BTreeSet;

use super::{
    Composition, InitializedOperationData, OperationData, OperationName, PreviewTracking,
    SegmentStatistics,
};
use crate::consts::DEFAULT_PREVIEW_SEGMENT_INDEX;
use crate::data::{
    ResolvedData, SegmentationDataModified, SegmentationEvents, SegmentationStore,
};
use crate::iter::VoxelPoint;
use crate::shape::ViewPlane;
use crate::{BrushError, BrushResult, EnabledContext};

/// 按顺序收集组合片段.
#[derive(Default)]
pub struct StrategyBuilder {
    name: &'static str,
    compositions: Vec<Box<dyn Composition>>,
}

impl StrategyBuilder {
    /// 名为 `name` 的空策略.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            compositions: Vec::new(),
        }
    }

    /// 追加一个片段. 列表型回调按追加顺序执行.
    pub fn compose<C: Composition + 'static>(mut self, composition: C) -> Self {
        self.compositions.push(Box::new(composition));
        self
    }

    /// 构建策略.
    ///
    /// 两个片段同时提供同一个单例回调时返回 `Err(BrushError::CompositionConflict)`.
    pub fn build(self) -> BrushResult<BrushStrategy> {
        let compositions = self.compositions;
        let set_value = singleton_owner(&compositions, "setValue", |c| {
            c.value_setter().is_some()
        })?;
        let threshold = singleton_owner(&compositions, "createIsInThreshold", |c| {
            c.threshold_factory().is_some()
        })?;
        let statistics = singleton_owner(&compositions, "getStatistics", |c| {
            c.statistics_provider().is_some()
        })?;

        log::debug!(
            "built strategy `{}` from [{}]",
            self.name,
            compositions.iter().map(|c| c.name()).collect::<Vec<_>>().join(", ")
        );
        Ok(BrushStrategy {
            name: self.name,
            compositions,
            set_value,
            threshold,
            statistics,
        })
    }
}

/// 找到唯一提供某个单例回调的片段.
fn singleton_owner(
    compositions: &[Box<dyn Composition>],
    callback: &'static str,
    provides: fn(&dyn Composition) -> bool,
) -> BrushResult<Option<usize>> {
    let mut owner: Option<usize> = None;
    for (i, c) in compositions.iter().enumerate() {
        if !provides(c.as_ref()) {
            continue;
        }
        if let Some(first) = owner {
            return Err(BrushError::CompositionConflict {
                callback,
                first: compositions[first].name(),
                second: c.name(),
            });
        }
        owner = Some(i);
    }
    Ok(owner)
}

/// 组合完成的画笔策略.
///
/// 生命周期: [`init_down`](Self::init_down) -> 若干次 [`fill`](Self::fill) ->
/// [`complete_up`](Self::complete_up). 预览模式下之后还需要
/// [`accept_preview`](Self::accept_preview) 或 [`reject_preview`](Self::reject_preview).
pub struct BrushStrategy {
    name: &'static str,
    compositions: Vec<Box<dyn Composition>>,
    set_value: Option<usize>,
    threshold: Option<usize>,
    statistics: Option<usize>,
}

impl std::fmt::Debug for BrushStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrushStrategy")
            .field("name", &self.name)
            .field(
                "compositions",
                &self.compositions.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// 发送 "数据已修改" 通知. 没有切片被修改时不发送.
fn notify(
    events: &mut (dyn SegmentationEvents + '_),
    segmentation_id: String,
    slices: BTreeSet<usize>,
) {
    if slices.is_empty() {
        return;
    }
    events.data_modified(SegmentationDataModified {
        segmentation_id,
        modified_slices: slices.into_iter().collect(),
    });
}

impl BrushStrategy {
    /// 策略名.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 解析数据并依次执行所有 `Initialize` 回调.
    ///
    /// 所有可能失败的检查都在这里完成, 之后的回调不会再因为缺少数据而中途失败.
    /// 接受/拒绝预览只借出 labelmap: 不检查视平面方向, 不解析参考图像, 也不执行 `Initialize` 回调.
    fn initialize<'a, 's: 'a>(
        &self,
        view: ViewPlane,
        store: &'a mut (dyn SegmentationStore + 's),
        op: &'a mut OperationData,
        operation: OperationName,
    ) -> BrushResult<InitializedOperationData<'a>> {
        let OperationData {
            segmentation_id,
            data,
            segment_index,
            segments_locked,
            points,
            stroke_points,
            preview_segment_index,
            config,
            state,
        } = op;

        let mut locked = store.locked_segments(segmentation_id);
        locked.extend(segments_locked.iter().copied());
        let preview =
            (*preview_segment_index).or_else(|| store.preview_segment_index(segmentation_id));

        let settles_preview = matches!(
            operation,
            OperationName::AcceptPreview | OperationName::RejectPreview
        );
        let resolved = if settles_preview {
            ResolvedData {
                labelmap: store.resolve_labelmap(segmentation_id, data)?,
                reference: None,
            }
        } else {
            store.resolve(segmentation_id, data)?
        };
        if data.is_stack() && !settles_preview {
            let geometry = resolved.labelmap.geometry();
            if geometry.axis_parallel_to(view.normal) != Some(2) {
                return Err(BrushError::UnsupportedOrientation(format!(
                    "view normal {:?} is not aligned with the frames of `{segmentation_id}`",
                    view.normal
                )));
            }
        }

        let mut init = InitializedOperationData {
            operation,
            segmentation_id: segmentation_id.as_str(),
            is_stack: data.is_stack(),
            labelmap: resolved.labelmap,
            reference: resolved.reference,
            view,
            points: points.as_slice(),
            stroke_points: stroke_points.as_slice(),
            config,
            state,
            active_segment_index: *segment_index,
            segment_index: Some(*segment_index),
            preview_segment_index: preview,
            segments_locked: locked,
            shape: None,
            modified_slices: BTreeSet::new(),
        };
        if !settles_preview {
            for initializer in self.compositions.iter().filter_map(|c| c.initializer()) {
                initializer.initialize(&mut init)?;
            }
        }
        Ok(init)
    }

    /// 按下. 重置交互状态并执行所有 `OnInteractionStart` 回调.
    ///
    /// 上一次预览尚未接受或拒绝时返回 `Err(BrushError::PreviewPending)`.
    pub fn init_down(&self, ctx: &mut EnabledContext<'_>, op: &mut OperationData) -> BrushResult<()> {
        if op.state.tracking.is_preview_pending() {
            return Err(BrushError::PreviewPending(op.segmentation_id.clone()));
        }
        op.state.tracking.clear();
        op.state.reset_interaction();

        let mut init =
            self.initialize(ctx.view, &mut *ctx.store, op, OperationName::InteractionStart)?;
        for starter in self.compositions.iter().filter_map(|c| c.interaction_starter()) {
            starter.on_interaction_start(&mut init)?;
        }
        Ok(())
    }

    /// 填充.
    ///
    /// 形状退化时为 no-op. 形状中心与上一次相同时不会重复执行 (幂等).
    /// 预览模式下且至少有一个体素被修改时返回当前的预览跟踪.
    pub fn fill<'o>(
        &self,
        ctx: &mut EnabledContext<'_>,
        op: &'o mut OperationData,
    ) -> BrushResult<Option<&'o PreviewTracking>> {
        self.run_fill(ctx, op, OperationName::Fill)?;
        let tracking = &op.state.tracking;
        Ok(tracking.is_preview_pending().then_some(tracking))
    }

    fn run_fill(
        &self,
        ctx: &mut EnabledContext<'_>,
        op: &mut OperationData,
        operation: OperationName,
    ) -> BrushResult<()> {
        let (segmentation_id, slices) = {
            let mut init = self.initialize(ctx.view, &mut *ctx.store, op, operation)?;
            let Some(center) = init.shape.as_ref().map(|s| s.center_ijk) else {
                log::trace!("`{}`: no shape to fill", self.name);
                return Ok(());
            };
            if init.state.tracking.last_center() == Some(center) {
                log::trace!("`{}`: center {center:?} unchanged, fill skipped", self.name);
                return Ok(());
            }

            for filler in self.compositions.iter().filter_map(|c| c.filler()) {
                filler.fill(self, &mut init)?;
            }
            init.state.tracking.set_last_center(Some(center));
            if let Some(shape) = init.shape.as_ref() {
                init.state.stroke_centers.push(shape.center_world);
            }
            log::debug!(
                "`{}`: filled around {center:?}, {} voxels tracked",
                self.name,
                init.state.tracking.len()
            );
            (init.segmentation_id.to_owned(), std::mem::take(&mut init.modified_slices))
        };
        notify(&mut *ctx.events, segmentation_id, slices);
        Ok(())
    }

    /// 抬起. 执行所有 `OnInteractionEnd` 回调 (如孤岛移除).
    ///
    /// 非预览模式下交互到此结束, 跟踪记录被清空.
    pub fn complete_up(&self, ctx: &mut EnabledContext<'_>, op: &mut OperationData) -> BrushResult<()> {
        let (segmentation_id, slices) = {
            let mut init =
                self.initialize(ctx.view, &mut *ctx.store, op, OperationName::InteractionEnd)?;
            for ender in self.compositions.iter().filter_map(|c| c.interaction_ender()) {
                ender.on_interaction_end(self, &mut init)?;
            }
            (init.segmentation_id.to_owned(), std::mem::take(&mut init.modified_slices))
        };
        notify(&mut *ctx.events, segmentation_id, slices);

        if op.state.tracking.is_preview_pending() {
            op.state.tracking.set_last_center(None);
        } else {
            op.state.tracking.clear();
        }
        Ok(())
    }

    /// 接受预览: 把仍为哨兵的被跟踪体素改写为真实 segment index, 然后清空跟踪.
    pub fn accept_preview(&self, ctx: &mut EnabledContext<'_>, op: &mut OperationData) -> BrushResult<()> {
        self.finish_preview(ctx, op, OperationName::AcceptPreview)
    }

    /// 拒绝预览: 恢复所有被跟踪体素的原始值, 然后清空跟踪.
    pub fn reject_preview(&self, ctx: &mut EnabledContext<'_>, op: &mut OperationData) -> BrushResult<()> {
        self.finish_preview(ctx, op, OperationName::RejectPreview)
    }

    fn finish_preview(
        &self,
        ctx: &mut EnabledContext<'_>,
        op: &mut OperationData,
        operation: OperationName,
    ) -> BrushResult<()> {
        let (segmentation_id, slices) = {
            let mut init = self.initialize(ctx.view, &mut *ctx.store, op, operation)?;
            let tracked = init.state.tracking.len();
            for handler in self.compositions.iter().filter_map(|c| c.preview_handler()) {
                match operation {
                    OperationName::AcceptPreview => handler.accept_preview(&mut init)?,
                    _ => handler.reject_preview(&mut init)?,
                }
            }
            log::debug!("`{}`: {operation:?} over {tracked} tracked voxels", self.name);
            (init.segmentation_id.to_owned(), std::mem::take(&mut init.modified_slices))
        };
        op.state.tracking.clear();
        notify(&mut *ctx.events, segmentation_id, slices);
        Ok(())
    }

    /// 取消当前手势: 预览中则拒绝预览, 否则只清空交互状态 (已直接写入的数据保持不变).
    pub fn cancel(&self, ctx: &mut EnabledContext<'_>, op: &mut OperationData) -> BrushResult<()> {
        if op.state.tracking.is_preview_pending() {
            return self.reject_preview(ctx, op);
        }
        op.state.tracking.clear();
        op.state.reset_interaction();
        Ok(())
    }

    /// 悬停预览: 用新的位置替换尚未提交的预览.
    ///
    /// 没有配置预览哨兵时使用 [`DEFAULT_PREVIEW_SEGMENT_INDEX`].
    /// 形状中心与当前预览相同时直接返回当前预览; 否则先拒绝旧预览,
    /// 再按一次新的按下解析 segment index 并填充.
    pub fn preview<'o>(
        &self,
        ctx: &mut EnabledContext<'_>,
        op: &'o mut OperationData,
    ) -> BrushResult<Option<&'o PreviewTracking>> {
        if op.preview_segment_index.is_none()
            && ctx.store.preview_segment_index(&op.segmentation_id).is_none()
        {
            op.preview_segment_index = Some(DEFAULT_PREVIEW_SEGMENT_INDEX);
        }

        if op.state.tracking.is_preview_pending() {
            let unchanged = {
                let init = self.initialize(ctx.view, &mut *ctx.store, op, OperationName::Preview)?;
                let last = init.state.tracking.last_center();
                init.shape.as_ref().is_some_and(|s| last == Some(s.center_ijk))
            };
            if unchanged {
                log::trace!("`{}`: preview unchanged", self.name);
                return Ok(Some(&op.state.tracking));
            }
            self.reject_preview(ctx, op)?;
        }

        op.state.tracking.clear();
        op.state.reset_interaction();
        {
            let mut init = self.initialize(ctx.view, &mut *ctx.store, op, OperationName::Preview)?;
            for starter in self.compositions.iter().filter_map(|c| c.interaction_starter()) {
                starter.on_interaction_start(&mut init)?;
            }
        }
        self.run_fill(ctx, op, OperationName::Preview)?;
        let tracking = &op.state.tracking;
        Ok(tracking.is_preview_pending().then_some(tracking))
    }

    /// 统计生效 segment index 的体素个数, 体积和强度.
    ///
    /// 没有片段提供统计时返回 `Ok(None)`.
    pub fn get_statistics(
        &self,
        ctx: &mut EnabledContext<'_>,
        op: &mut OperationData,
    ) -> BrushResult<Option<SegmentStatistics>> {
        let Some(provider) = self
            .statistics
            .and_then(|i| self.compositions[i].statistics_provider())
        else {
            return Ok(None);
        };
        let init = self.initialize(ctx.view, &mut *ctx.store, op, OperationName::Statistics)?;
        Ok(provider.statistics(&init))
    }

    /// 处理形状内的一个体素. 没有片段提供 `setValue` 时为 no-op.
    #[inline]
    pub fn set_value(&self, op: &mut InitializedOperationData<'_>, point: &VoxelPoint) {
        if let Some(setter) = self.set_value.and_then(|i| self.compositions[i].value_setter()) {
            setter.set_value(op, point);
        }
    }

    /// 阈值谓词. 没有片段提供阈值或未配置阈值时返回 `None`, 即不做筛选.
    #[inline]
    pub fn create_is_in_threshold<'a>(
        &self,
        op: &InitializedOperationData<'a>,
    ) -> Option<Box<dyn Fn(usize) -> bool + 'a>> {
        self.threshold
            .and_then(|i| self.compositions[i].threshold_factory())
            .and_then(|f| f.create_is_in_threshold(op))
    }
}
