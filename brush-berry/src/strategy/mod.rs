//! 画笔策略.
//!
//! 一个策略由若干 composition (行为片段) 组合而成. 每个片段可以提供以下回调中的任意几个:
//!
//! | 回调 | 类型 | 组合规则 |
//! |:----|:----|:----|
//! | [`Initializer`] | 列表 | 按注册顺序依次执行 |
//! | [`InteractionStarter`] | 列表 | 按注册顺序依次执行 |
//! | [`InteractionEnder`] | 列表 | 按注册顺序依次执行 |
//! | [`Filler`] | 列表 | 按注册顺序依次执行 |
//! | [`PreviewHandler`] | 列表 | 按注册顺序依次执行 |
//! | [`ValueSetter`] | 单例 | 至多一个片段提供 |
//! | [`ThresholdFactory`] | 单例 | 至多一个片段提供 |
//! | [`StatisticsProvider`] | 单例 | 至多一个片段提供 |
//!
//! 单例冲突在 [`StrategyBuilder::build`] 时报告.

use std::collections::BTreeSet;

use crate::config::{StrategyConfig, ThresholdRange};
use crate::data::{
    Labelmap, ReferenceImage, SegmentationData, SegmentationEvents, SegmentationStore,
};
use crate::iter::VoxelPoint;
use crate::shape::{ShapeInfo, ViewPlane};
use crate::{BrushResult, Ijk, Point3, SegmentIndex};

mod composer;
pub mod compositions;
pub mod presets;
mod tracking;

pub use composer::{BrushStrategy, StrategyBuilder};
pub use compositions::statistics::{IntensitySummary, SegmentStatistics};
pub use tracking::PreviewTracking;

/// 策略当前执行的操作.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationName {
    /// 按下.
    InteractionStart,
    /// 填充 (按下后的每次拖拽).
    Fill,
    /// 抬起.
    InteractionEnd,
    /// 悬停预览.
    Preview,
    /// 接受预览.
    AcceptPreview,
    /// 拒绝预览.
    RejectPreview,
    /// 统计.
    Statistics,
}

/// 点击处 segment index 的解析结果.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CenterSegment {
    /// 使用工具的当前 segment index.
    #[default]
    Active,

    /// 使用指定的 segment index (`0` 表示擦除).
    Index(SegmentIndex),

    /// 清除覆盖到的预览.
    ClearPreview,
}

/// 跨越一次交互的状态. 由调用方与 [`OperationData`] 一起保存.
#[derive(Debug, Clone, Default)]
pub struct InteractionState {
    /// 被修改体素的原始值.
    pub tracking: PreviewTracking,

    /// 动态阈值区间. 每次按下时重置.
    pub dynamic_range: Option<ThresholdRange>,

    /// 按下时解析出的 segment index.
    pub center_segment: CenterSegment,

    /// 本次交互中每次实际填充时的形状中心 (世界坐标). 孤岛移除以它们为种子.
    pub stroke_centers: Vec<Point3>,
}

impl InteractionState {
    /// 重置除 tracking 外的交互状态.
    #[inline]
    pub(crate) fn reset_interaction(&mut self) {
        self.dynamic_range = None;
        self.center_segment = CenterSegment::Active;
        self.stroke_centers.clear();
    }
}

/// 一次策略调用的输入.
#[derive(Debug, Clone)]
pub struct OperationData {
    /// 分割 ID.
    pub segmentation_id: String,

    /// 目标数据.
    pub data: SegmentationData,

    /// 工具当前的 segment index.
    pub segment_index: SegmentIndex,

    /// 额外锁定的 segment index. 与存储中的锁定集合取并.
    pub segments_locked: BTreeSet<SegmentIndex>,

    /// 形状的世界坐标点. 圆/球为下, 上, 左, 右; 矩形/正方形为四个角点.
    pub points: Vec<Point3>,

    /// 拖拽时上一个形状中心. 形状会覆盖它与当前中心之间的整段扫掠区域.
    ///
    /// 至多一个点, 因此每次填充的开销与笔触长度无关.
    pub stroke_points: Vec<Point3>,

    /// 预览哨兵. `None` 时使用存储中的设置; 都没有时直接写入 (非预览模式).
    pub preview_segment_index: Option<SegmentIndex>,

    /// 策略配置.
    pub config: StrategyConfig,

    /// 交互状态.
    pub state: InteractionState,
}

impl OperationData {
    /// 以三维体数据为目标.
    pub fn volume(
        segmentation_id: impl Into<String>,
        volume_id: impl Into<String>,
        referenced_volume_id: Option<String>,
        segment_index: SegmentIndex,
    ) -> Self {
        Self::new(
            segmentation_id.into(),
            SegmentationData::Volume {
                volume_id: volume_id.into(),
                referenced_volume_id,
            },
            segment_index,
        )
    }

    /// 以任意目标数据创建.
    pub fn new(segmentation_id: String, data: SegmentationData, segment_index: SegmentIndex) -> Self {
        Self {
            segmentation_id,
            data,
            segment_index,
            segments_locked: BTreeSet::new(),
            points: Vec::new(),
            stroke_points: Vec::new(),
            preview_segment_index: None,
            config: StrategyConfig::default(),
            state: InteractionState::default(),
        }
    }

    /// 设置配置.
    pub fn with_config(mut self, config: StrategyConfig) -> Self {
        self.config = config;
        self
    }

    /// 设置预览哨兵.
    pub fn with_preview(mut self, preview_segment_index: SegmentIndex) -> Self {
        self.preview_segment_index = Some(preview_segment_index);
        self
    }

    /// 开始新的笔触: 清空之前的笔触并设置形状点.
    pub fn begin_stroke(&mut self, points: Vec<Point3>) {
        self.stroke_points.clear();
        self.points = points;
    }

    /// 记住当前形状中心, 并换成新的形状点. 供拖拽时使用.
    pub fn move_to(&mut self, points: Vec<Point3>) {
        self.stroke_points.clear();
        self.stroke_points.extend(crate::data::mean(&self.points));
        self.points = points;
    }
}

/// 策略运行时可用的外部服务.
pub struct EnabledContext<'c> {
    /// 分割状态存储.
    pub store: &'c mut dyn SegmentationStore,

    /// "数据已修改" 通知的接收方.
    pub events: &'c mut dyn SegmentationEvents,

    /// 当前视平面.
    pub view: ViewPlane,
}

/// 单次调用期间的已初始化数据.
pub struct InitializedOperationData<'a> {
    /// 当前操作.
    pub operation: OperationName,

    /// 分割 ID.
    pub segmentation_id: &'a str,

    /// 目标是否为 stack 帧.
    pub is_stack: bool,

    /// 可写的 labelmap.
    pub labelmap: &'a mut Labelmap,

    /// 参考图像.
    pub reference: Option<&'a ReferenceImage>,

    /// 视平面.
    pub view: ViewPlane,

    /// 形状点.
    pub points: &'a [Point3],

    /// 上一个形状中心.
    pub stroke_points: &'a [Point3],

    /// 策略配置.
    pub config: &'a StrategyConfig,

    /// 交互状态.
    pub state: &'a mut InteractionState,

    /// 工具的 segment index.
    pub active_segment_index: SegmentIndex,

    /// 生效的 segment index. `None` 表示清除预览.
    pub segment_index: Option<SegmentIndex>,

    /// 预览哨兵.
    pub preview_segment_index: Option<SegmentIndex>,

    /// 锁定的 segment index.
    pub segments_locked: BTreeSet<SegmentIndex>,

    /// 形状. 点数不足或几何退化时为 `None`.
    pub shape: Option<ShapeInfo>,

    /// 本次调用修改过的 `k` 切片.
    pub modified_slices: BTreeSet<usize>,
}

impl InitializedOperationData<'_> {
    /// 实际写入 labelmap 的值: 预览时为哨兵, 否则为生效的 segment index.
    #[inline]
    pub fn target_value(&self) -> Option<SegmentIndex> {
        self.segment_index
            .map(|s| self.preview_segment_index.unwrap_or(s))
    }

    /// 形状中心所在体素 (在体数据内时).
    #[inline]
    pub fn center_ijk(&self) -> Option<Ijk> {
        self.shape
            .as_ref()
            .and_then(|s| s.checked_center(self.labelmap.geometry()))
    }
}

/// 组合片段. 每个 getter 返回该片段提供的回调.
pub trait Composition: Send + Sync {
    /// 片段名, 用于报告冲突.
    fn name(&self) -> &'static str;

    /// `Initialize` 回调.
    fn initializer(&self) -> Option<&dyn Initializer> {
        None
    }

    /// `OnInteractionStart` 回调.
    fn interaction_starter(&self) -> Option<&dyn InteractionStarter> {
        None
    }

    /// `OnInteractionEnd` 回调.
    fn interaction_ender(&self) -> Option<&dyn InteractionEnder> {
        None
    }

    /// `Fill` 回调.
    fn filler(&self) -> Option<&dyn Filler> {
        None
    }

    /// `AcceptPreview`/`RejectPreview` 回调.
    fn preview_handler(&self) -> Option<&dyn PreviewHandler> {
        None
    }

    /// `setValue` 单例.
    fn value_setter(&self) -> Option<&dyn ValueSetter> {
        None
    }

    /// `createIsInThreshold` 单例.
    fn threshold_factory(&self) -> Option<&dyn ThresholdFactory> {
        None
    }

    /// `GetStatistics` 单例.
    fn statistics_provider(&self) -> Option<&dyn StatisticsProvider> {
        None
    }
}

/// 补充已初始化数据 (形状, 阈值, segment index 等).
pub trait Initializer {
    /// 每次调用时执行.
    fn initialize(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()>;
}

/// 只在按下时执行的准备工作.
pub trait InteractionStarter {
    /// 按下时执行.
    fn on_interaction_start(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()>;
}

/// 抬起时的收尾工作.
pub trait InteractionEnder {
    /// 抬起时执行.
    fn on_interaction_end(
        &self,
        strategy: &BrushStrategy,
        op: &mut InitializedOperationData<'_>,
    ) -> BrushResult<()>;
}

/// 体素修改循环.
pub trait Filler {
    /// 执行填充. 写入必须经过 [`BrushStrategy::set_value`].
    fn fill(&self, strategy: &BrushStrategy, op: &mut InitializedOperationData<'_>) -> BrushResult<()>;
}

/// 预览的提交与回滚.
pub trait PreviewHandler {
    /// 提交预览.
    fn accept_preview(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()>;

    /// 回滚预览.
    fn reject_preview(&self, op: &mut InitializedOperationData<'_>) -> BrushResult<()>;
}

/// 唯一允许修改 labelmap 体素的路径.
pub trait ValueSetter {
    /// 处理形状内的一个体素.
    fn set_value(&self, op: &mut InitializedOperationData<'_>, point: &VoxelPoint);
}

/// 以标量偏移为参数的阈值谓词工厂.
pub trait ThresholdFactory {
    /// 返回 `None` 表示不做筛选.
    fn create_is_in_threshold<'a>(
        &self,
        op: &InitializedOperationData<'a>,
    ) -> Option<Box<dyn Fn(usize) -> bool + 'a>>;
}

/// 分割统计.
pub trait StatisticsProvider {
    /// 统计生效 segment index (预览中则为哨兵) 的体素.
    fn statistics(&self, op: &InitializedOperationData<'_>) -> Option<SegmentStatistics>;
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Once;

    use ndarray::Array3;

    use super::compositions::{SetValue, Statistics};
    use super::presets;
    use super::*;
    use crate::consts::DEFAULT_PREVIEW_SEGMENT_INDEX;
    use crate::data::{ImageGeometry, InMemoryStore, SegmentationDataModified};
    use crate::BrushError;

    fn init_logger() {
        static INIT: Once = Once::new();
        INIT.call_once(|| {
            let _ = simple_logger::SimpleLogger::new()
                .with_level(log::LevelFilter::Warn)
                .init();
        });
    }

    fn plane() -> ImageGeometry {
        ImageGeometry::axis_aligned([10, 10, 1], [1.0; 3]).unwrap()
    }

    /// 以 `(x, y, 0)` 为中心, 半径为 `r` 的圆的四个点.
    fn circle_at(x: f64, y: f64, r: f64) -> Vec<Point3> {
        vec![[x, y - r, 0.0], [x, y + r, 0.0], [x - r, y, 0.0], [x + r, y, 0.0]]
    }

    fn in_circle(i: usize, j: usize, (ci, cj): (i64, i64), r2: i64) -> bool {
        let (di, dj) = (i as i64 - ci, j as i64 - cj);
        di * di + dj * dj <= r2
    }

    /// 灰度图. 未列出的体素为 0.
    fn reference(bright: &[([usize; 2], f32)]) -> ReferenceImage {
        let mut data = Array3::zeros([1, 10, 10]);
        for &([i, j], v) in bright {
            data[[0, j, i]] = v;
        }
        ReferenceImage::from_scalars(plane(), data).unwrap()
    }

    fn store(labelmap: Labelmap, image: Option<ReferenceImage>) -> InMemoryStore {
        let mut store = InMemoryStore::new();
        store.insert_labelmap("seg", labelmap);
        if let Some(image) = image {
            store.insert_image("ct", image);
        }
        store
    }

    fn volume_op(segment: SegmentIndex, with_reference: bool, points: Vec<Point3>) -> OperationData {
        let reference = with_reference.then(|| "ct".to_owned());
        let mut op = OperationData::volume("seg", "seg", reference, segment);
        op.begin_stroke(points);
        op
    }

    fn context<'c>(
        store: &'c mut InMemoryStore,
        events: &'c mut Vec<SegmentationDataModified>,
    ) -> EnabledContext<'c> {
        EnabledContext {
            store,
            events,
            view: ViewPlane::default(),
        }
    }

    /// 按下, 填充一次, 抬起.
    fn click(
        strategy: &BrushStrategy,
        ctx: &mut EnabledContext<'_>,
        op: &mut OperationData,
    ) -> BrushResult<()> {
        strategy.init_down(ctx, op)?;
        strategy.fill(ctx, op)?;
        strategy.complete_up(ctx, op)
    }

    #[test]
    fn test_circle_fill() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0));

        let mut ctx = context(&mut store, &mut events);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        assert!(strategy.fill(&mut ctx, &mut op).unwrap().is_none());
        strategy.complete_up(&mut ctx, &mut op).unwrap();
        assert!(op.state.tracking.is_empty());

        let lm = store.labelmap("seg").unwrap();
        for j in 0..10 {
            for i in 0..10 {
                let expected = if in_circle(i, j, (5, 5), 4) { 3 } else { 0 };
                assert_eq!(lm[[i, j, 0]], expected, "({i}, {j})");
            }
        }
        assert_eq!(
            events,
            vec![SegmentationDataModified {
                segmentation_id: "seg".to_owned(),
                modified_slices: vec![0],
            }]
        );
    }

    #[test]
    fn test_fill_is_idempotent() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0)).with_preview(200);

        let mut ctx = context(&mut store, &mut events);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        let first = strategy.fill(&mut ctx, &mut op).unwrap().cloned().unwrap();
        let second = strategy.fill(&mut ctx, &mut op).unwrap().cloned().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 13);
        drop(ctx);

        assert_eq!(store.labelmap("seg").unwrap().count(200), 13);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_preview_round_trip_and_locked_segments() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut before = Labelmap::zeros(plane());
        before[[5, 5, 0]] = 7;
        before[[4, 5, 0]] = 2;

        for accept in [false, true] {
            let mut store = store(before.clone(), None);
            store.lock("seg", 2);
            let mut events = Vec::new();
            let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0)).with_preview(255);

            let mut ctx = context(&mut store, &mut events);
            strategy.init_down(&mut ctx, &mut op).unwrap();
            assert_eq!(strategy.fill(&mut ctx, &mut op).unwrap().map(|t| t.len()), Some(12));
            op.move_to(circle_at(6.0, 5.0, 2.0));
            let tracking = strategy.fill(&mut ctx, &mut op).unwrap().unwrap();
            assert_eq!(tracking.original(5 + 10 * 5), Some(7));
            strategy.complete_up(&mut ctx, &mut op).unwrap();

            assert!(matches!(
                strategy.init_down(&mut ctx, &mut op),
                Err(BrushError::PreviewPending(_))
            ));

            if accept {
                strategy.accept_preview(&mut ctx, &mut op).unwrap();
            } else {
                strategy.reject_preview(&mut ctx, &mut op).unwrap();
            }
            assert!(op.state.tracking.is_empty());
            drop(ctx);

            let lm = store.labelmap("seg").unwrap();
            assert_eq!(lm[[4, 5, 0]], 2);
            if !accept {
                assert_eq!(lm, &before);
            } else {
                for j in 0..10 {
                    for i in 0..10 {
                        let painted = in_circle(i, j, (5, 5), 4) || in_circle(i, j, (6, 5), 4);
                        let expected = match (painted, [i, j]) {
                            (_, [4, 5]) => 2,
                            (true, _) => 3,
                            (false, _) => before[[i, j, 0]],
                        };
                        assert_eq!(lm[[i, j, 0]], expected, "({i}, {j})");
                    }
                }
            }
            // 两次填充 + 接受/拒绝.
            assert_eq!(events.len(), 3);
        }
    }

    #[test]
    fn test_resolve_center_segment() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let config = StrategyConfig::default().with_center_segment_index();
        let mut lm = Labelmap::zeros(plane());
        lm[[5, 5, 0]] = 3;
        lm[[3, 2, 0]] = 1;
        let mut store = store(lm, None);
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);

        // 点击已有 segment: 扩展它而不是当前 segment.
        let mut op = volume_op(1, false, circle_at(5.0, 5.0, 2.0)).with_config(config);
        click(&strategy, &mut ctx, &mut op).unwrap();
        assert_eq!(op.state.center_segment, CenterSegment::Index(3));

        // 点击背景, 形状内有当前 segment: 擦除.
        op.begin_stroke(circle_at(2.0, 2.0, 1.0));
        click(&strategy, &mut ctx, &mut op).unwrap();
        assert_eq!(op.state.center_segment, CenterSegment::Index(0));

        // 点击背景, 附近没有任何 segment: 使用当前 segment.
        op.begin_stroke(circle_at(8.0, 8.0, 1.0));
        click(&strategy, &mut ctx, &mut op).unwrap();
        assert_eq!(op.state.center_segment, CenterSegment::Active);
        drop(ctx);

        let lm = store.labelmap("seg").unwrap();
        assert_eq!(lm.count(3), 13);
        assert_eq!(lm[[3, 2, 0]], 0);
        assert_eq!(lm.count(1), 5);
        assert_eq!(lm[[8, 8, 0]], 1);
    }

    #[test]
    fn test_erase_preset() {
        init_logger();
        let strategy = presets::erase_inside_circle().unwrap();
        let lm = Labelmap::from_array(plane(), Array3::from_elem([1, 10, 10], 4)).unwrap();
        let mut store = store(lm, None);
        let mut events = Vec::new();
        let mut op = volume_op(4, false, circle_at(5.0, 5.0, 2.0));
        click(&strategy, &mut context(&mut store, &mut events), &mut op).unwrap();
        assert_eq!(store.labelmap("seg").unwrap().count(0), 13);
    }

    #[test]
    fn test_threshold_gating() {
        init_logger();
        let strategy = presets::threshold_inside_circle().unwrap();
        let image = reference(&[([5, 5], 100.0), ([6, 5], 200.0)]);
        let mut store = store(Labelmap::zeros(plane()), Some(image));
        let mut events = Vec::new();
        let config = StrategyConfig::default().with_static_threshold(110.0, 90.0);
        let mut op = volume_op(3, true, circle_at(5.0, 5.0, 2.0)).with_config(config);
        click(&strategy, &mut context(&mut store, &mut events), &mut op).unwrap();

        let lm = store.labelmap("seg").unwrap();
        assert_eq!(lm.count(3), 1);
        assert_eq!(lm[[5, 5, 0]], 3);
        assert_eq!(lm[[6, 5, 0]], 0);
    }

    #[test]
    fn test_threshold_requires_reference() {
        init_logger();
        let strategy = presets::threshold_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let config = StrategyConfig::default().with_static_threshold(0.0, 1.0);
        let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0)).with_config(config);
        let r = click(&strategy, &mut context(&mut store, &mut events), &mut op);
        assert!(matches!(r, Err(BrushError::DataNotFound(_))));
        assert_eq!(store.labelmap("seg").unwrap().count(0), 100);
        assert!(events.is_empty());
    }

    #[test]
    fn test_dynamic_threshold_only_widens() {
        init_logger();
        let strategy = presets::threshold_inside_circle().unwrap();
        let data = Array3::from_shape_fn([1, 10, 10], |(_, j, i)| (10 * j + i) as f32);
        let image = ReferenceImage::from_scalars(plane(), data).unwrap();
        let mut store = store(Labelmap::zeros(plane()), Some(image));
        let mut events = Vec::new();
        let config = StrategyConfig::default().with_dynamic_threshold(1);
        let mut op = volume_op(3, true, circle_at(5.0, 5.0, 1.0)).with_config(config);

        let mut ctx = context(&mut store, &mut events);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        assert_eq!(op.state.dynamic_range, Some(ThresholdRange::new(44.0, 66.0)));

        let mut width = 0.0;
        for (x, y) in [(5.0, 4.0), (5.0, 5.0), (8.0, 8.0), (1.0, 1.0), (5.0, 5.0)] {
            op.move_to(circle_at(x, y, 1.0));
            strategy.fill(&mut ctx, &mut op).unwrap();
            let range = op.state.dynamic_range.unwrap();
            assert!(range.width() >= width);
            width = range.width();
        }
        assert_eq!(op.state.dynamic_range, Some(ThresholdRange::new(11.0, 88.0)));
        strategy.complete_up(&mut ctx, &mut op).unwrap();

        // 下一次按下重新采样.
        op.begin_stroke(circle_at(5.0, 5.0, 1.0));
        strategy.init_down(&mut ctx, &mut op).unwrap();
        assert_eq!(op.state.dynamic_range, Some(ThresholdRange::new(44.0, 66.0)));
    }

    #[test]
    fn test_island_removal() {
        init_logger();
        let strategy = presets::threshold_inside_circle().unwrap();
        // (6, 6) 与中心对角相邻, (5, 3) 与中心不连通.
        let bright = [([4, 5], 100.0), ([5, 5], 100.0), ([6, 6], 100.0), ([5, 3], 100.0)];
        let base = StrategyConfig::default().with_static_threshold(90.0, 110.0);

        for (config, expected) in [
            (base.clone(), 4),
            (base.clone().with_island_removal(false), 2),
            (base.with_island_removal(true), 3),
        ] {
            let mut store = store(Labelmap::zeros(plane()), Some(reference(&bright)));
            let mut events = Vec::new();
            let mut op = volume_op(3, true, circle_at(5.0, 5.0, 2.0)).with_config(config);
            click(&strategy, &mut context(&mut store, &mut events), &mut op).unwrap();

            let lm = store.labelmap("seg").unwrap();
            assert_eq!(lm.count(3), expected);
            assert_eq!(lm[[5, 5, 0]], 3);
        }
    }

    #[test]
    fn test_composition_conflict() {
        let r = StrategyBuilder::new("twice")
            .compose(SetValue)
            .compose(Statistics)
            .compose(SetValue)
            .build();
        assert!(matches!(
            r,
            Err(BrushError::CompositionConflict {
                callback: "setValue",
                ..
            })
        ));
        assert!(StrategyBuilder::new("once").compose(SetValue).build().is_ok());
    }

    #[test]
    fn test_missing_data() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);

        let mut op = OperationData::volume("seg", "nope", None, 3);
        op.begin_stroke(circle_at(5.0, 5.0, 2.0));
        assert!(matches!(
            strategy.init_down(&mut ctx, &mut op),
            Err(BrushError::DataNotFound(_))
        ));

        let mut op = volume_op(3, true, circle_at(5.0, 5.0, 2.0));
        assert!(matches!(
            strategy.fill(&mut ctx, &mut op),
            Err(BrushError::DataNotFound(_))
        ));
        drop(ctx);
        assert_eq!(store.labelmap("seg").unwrap().count(0), 100);
        assert!(events.is_empty());
    }

    #[test]
    fn test_stack_orientation() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = InMemoryStore::new();
        store.insert_labelmap("frame-1", Labelmap::zeros(plane()));
        let data = SegmentationData::Stack {
            image_id_reference_map: BTreeMap::from([("img-1".to_owned(), "frame-1".to_owned())]),
            current_image_id: "img-1".to_owned(),
        };
        let mut op = OperationData::new("seg".to_owned(), data, 6);
        op.begin_stroke(circle_at(5.0, 5.0, 2.0));
        let mut events = Vec::new();

        let mut ctx = context(&mut store, &mut events);
        ctx.view = ViewPlane {
            normal: [1.0, 0.0, 0.0],
            view_up: [0.0, 0.0, 1.0],
        };
        assert!(matches!(
            click(&strategy, &mut ctx, &mut op),
            Err(BrushError::UnsupportedOrientation(_))
        ));
        ctx.view = ViewPlane::default();
        click(&strategy, &mut ctx, &mut op).unwrap();
        drop(ctx);

        assert_eq!(store.labelmap("frame-1").unwrap().count(6), 13);
    }

    #[test]
    fn test_statistics() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let image = ReferenceImage::from_scalars(plane(), Array3::from_elem([1, 10, 10], 50.0))
            .unwrap();
        let mut store = store(Labelmap::zeros(plane()), Some(image));
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);

        let mut op = volume_op(3, true, circle_at(5.0, 5.0, 2.0)).with_preview(255);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        let s = strategy.get_statistics(&mut ctx, &mut op).unwrap().unwrap();
        assert_eq!((s.segment_index, s.count), (255, 13));

        strategy.accept_preview(&mut ctx, &mut op).unwrap();
        let s = strategy.get_statistics(&mut ctx, &mut op).unwrap().unwrap();
        assert_eq!((s.segment_index, s.count), (3, 13));
        assert!((s.volume_mm3 - 13.0).abs() < 1e-9);
        let intensity = s.intensity.unwrap();
        assert_eq!((intensity.mean, intensity.std_dev), (50.0, 0.0));

        let bare = StrategyBuilder::new("bare").compose(SetValue).build().unwrap();
        assert!(bare.get_statistics(&mut ctx, &mut op).unwrap().is_none());
    }

    #[test]
    fn test_cancel() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);

        let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0)).with_preview(255);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        strategy.cancel(&mut ctx, &mut op).unwrap();
        assert!(op.state.tracking.is_empty());

        // 非预览模式下已写入的数据保持不变.
        let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0));
        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        strategy.cancel(&mut ctx, &mut op).unwrap();
        drop(ctx);
        assert_eq!(store.labelmap("seg").unwrap().count(3), 13);
        assert_eq!(store.labelmap("seg").unwrap().count(255), 0);
    }

    #[test]
    fn test_hover_preview() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);
        let mut op = volume_op(2, false, circle_at(5.0, 5.0, 2.0));

        let n = strategy.preview(&mut ctx, &mut op).unwrap().map(|t| t.len());
        assert_eq!(n, Some(13));
        assert_eq!(op.preview_segment_index, Some(DEFAULT_PREVIEW_SEGMENT_INDEX));
        // 位置不变.
        assert!(strategy.preview(&mut ctx, &mut op).unwrap().is_some());

        op.begin_stroke(circle_at(2.0, 2.0, 2.0));
        let tracking = strategy.preview(&mut ctx, &mut op).unwrap().unwrap();
        assert_eq!(tracking.original(5 + 10 * 5), None);
        strategy.accept_preview(&mut ctx, &mut op).unwrap();
        drop(ctx);

        let lm = store.labelmap("seg").unwrap();
        assert_eq!(lm.count(2), 13);
        assert_eq!(lm.count(DEFAULT_PREVIEW_SEGMENT_INDEX), 0);
        assert_eq!(lm[[5, 5, 0]], 0);
        assert_eq!(lm[[2, 2, 0]], 2);
        // 预览, 拒绝 + 预览, 接受.
        assert_eq!(events.len(), 4);
    }

    /// 以 `(x, y, 0)` 为中心, 半边长为 `half` 的正方形的四个角点.
    fn square_at(x: f64, y: f64, half: f64) -> Vec<Point3> {
        vec![
            [x - half, y - half, 0.0],
            [x + half, y - half, 0.0],
            [x + half, y + half, 0.0],
            [x - half, y + half, 0.0],
        ]
    }

    /// 当前目标 labelmap 的副本.
    fn current(ctx: &mut EnabledContext<'_>, op: &OperationData) -> Labelmap {
        ctx.store
            .resolve_labelmap(&op.segmentation_id, &op.data)
            .unwrap()
            .clone()
    }

    fn stack_op(segment: SegmentIndex) -> OperationData {
        let data = SegmentationData::Stack {
            image_id_reference_map: BTreeMap::from([("img-1".to_owned(), "frame-1".to_owned())]),
            current_image_id: "img-1".to_owned(),
        };
        OperationData::new("seg".to_owned(), data, segment)
    }

    #[test]
    fn test_settle_preview_ignores_view_and_reference() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let sagittal = ViewPlane {
            normal: [1.0, 0.0, 0.0],
            view_up: [0.0, 0.0, 1.0],
        };
        let mut frames = InMemoryStore::new();
        frames.insert_labelmap("frame-1", Labelmap::zeros(plane()));
        let mut events = Vec::new();
        let mut ctx = context(&mut frames, &mut events);

        // 视平面在填充后转动, 拒绝与取消仍然回滚.
        for cancel in [false, true] {
            let mut op = stack_op(6).with_preview(255);
            op.begin_stroke(circle_at(5.0, 5.0, 2.0));
            ctx.view = ViewPlane::default();
            strategy.init_down(&mut ctx, &mut op).unwrap();
            strategy.fill(&mut ctx, &mut op).unwrap();
            strategy.complete_up(&mut ctx, &mut op).unwrap();

            ctx.view = sagittal;
            if cancel {
                strategy.cancel(&mut ctx, &mut op).unwrap();
            } else {
                strategy.reject_preview(&mut ctx, &mut op).unwrap();
            }
            assert!(op.state.tracking.is_empty());
            assert_eq!(current(&mut ctx, &op).count(0), 100);

            // 没有遗留的预览阻塞下一次按下.
            ctx.view = ViewPlane::default();
            strategy.init_down(&mut ctx, &mut op).unwrap();
            strategy.cancel(&mut ctx, &mut op).unwrap();
        }
        drop(ctx);
        assert_eq!(frames.labelmap("frame-1").unwrap().count(0), 100);

        // 填充后参考图像不可用, 接受预览仍然成功.
        let image = ReferenceImage::from_scalars(plane(), Array3::zeros([1, 10, 10])).unwrap();
        let mut store = store(Labelmap::zeros(plane()), Some(image));
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);
        let mut op = volume_op(3, true, circle_at(5.0, 5.0, 2.0)).with_preview(255);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        op.data = SegmentationData::Volume {
            volume_id: "seg".to_owned(),
            referenced_volume_id: Some("gone".to_owned()),
        };
        strategy.accept_preview(&mut ctx, &mut op).unwrap();
        drop(ctx);
        assert_eq!(store.labelmap("seg").unwrap().count(3), 13);
    }

    #[test]
    fn test_reject_restores_stale_sentinel() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut before = Labelmap::zeros(plane());
        before[[5, 5, 0]] = 255;

        for accept in [false, true] {
            let mut store = store(before.clone(), None);
            let mut events = Vec::new();
            let mut ctx = context(&mut store, &mut events);
            let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0)).with_preview(255);
            strategy.init_down(&mut ctx, &mut op).unwrap();
            let tracking = strategy.fill(&mut ctx, &mut op).unwrap().unwrap();
            assert_eq!(tracking.original(5 + 10 * 5), Some(255));
            if accept {
                strategy.accept_preview(&mut ctx, &mut op).unwrap();
            } else {
                strategy.reject_preview(&mut ctx, &mut op).unwrap();
            }
            drop(ctx);

            let lm = store.labelmap("seg").unwrap();
            if accept {
                assert_eq!(lm.count(3), 13);
                assert_eq!(lm.count(255), 0);
            } else {
                assert_eq!(lm, &before);
            }
        }
    }

    #[test]
    fn test_clear_preview_is_reversible() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let config = StrategyConfig::default().with_center_segment_index();
        let mut before = Labelmap::zeros(plane());
        before[[6, 5, 0]] = 255;
        before[[0, 0, 0]] = 255;

        for accept in [false, true] {
            let mut store = store(before.clone(), None);
            let mut events = Vec::new();
            let mut ctx = context(&mut store, &mut events);
            let mut op = volume_op(3, false, circle_at(5.0, 5.0, 2.0))
                .with_config(config.clone())
                .with_preview(255);
            strategy.init_down(&mut ctx, &mut op).unwrap();
            assert_eq!(op.state.center_segment, CenterSegment::ClearPreview);
            let n = strategy.fill(&mut ctx, &mut op).unwrap().map(|t| t.len());
            assert_eq!(n, Some(1));
            if accept {
                strategy.accept_preview(&mut ctx, &mut op).unwrap();
            } else {
                strategy.reject_preview(&mut ctx, &mut op).unwrap();
            }
            drop(ctx);

            let lm = store.labelmap("seg").unwrap();
            if accept {
                // 形状外的哨兵不受影响.
                assert_eq!(lm.count(255), 1);
                assert_eq!(lm[[6, 5, 0]], 0);
            } else {
                assert_eq!(lm, &before);
            }
        }
    }

    #[test]
    fn test_long_stroke_fills_stay_local() {
        init_logger();
        let strategy = presets::fill_inside_circle().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);
        let mut op = volume_op(3, false, circle_at(2.0, 5.0, 2.0));

        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        for x in 3..=8 {
            op.move_to(circle_at(x as f64, 5.0, 2.0));
            assert_eq!(op.stroke_points, vec![[x as f64 - 1.0, 5.0, 0.0]]);
            let shape = crate::shape::circle(&plane(), &op.points, &op.stroke_points).unwrap();
            assert!(shape.bounds.max[0] - shape.bounds.min[0] <= 5);
            strategy.fill(&mut ctx, &mut op).unwrap();
        }
        assert_eq!(op.state.stroke_centers.len(), 7);
        strategy.complete_up(&mut ctx, &mut op).unwrap();
        drop(ctx);

        // 胶囊之并没有缺口.
        let lm = store.labelmap("seg").unwrap();
        assert_eq!(lm.count(3), 42);
        assert!((0..10).all(|i| lm[[i, 5, 0]] == 3));
    }

    #[test]
    fn test_shape_presets_round_trip() {
        init_logger();
        let rectangle = vec![[3.0, 3.0, 0.0], [6.0, 3.0, 0.0], [6.0, 5.0, 0.0], [3.0, 5.0, 0.0]];
        type Preset = fn() -> BrushResult<BrushStrategy>;
        let cases: [(Preset, Preset, Vec<Point3>, usize); 4] = [
            (presets::fill_inside_circle, presets::erase_inside_circle, circle_at(5.0, 5.0, 2.0), 13),
            (presets::fill_inside_sphere, presets::erase_inside_sphere, circle_at(5.0, 5.0, 2.0), 13),
            (presets::fill_inside_rectangle, presets::erase_inside_rectangle, rectangle, 12),
            (presets::fill_inside_square, presets::erase_inside_square, square_at(5.0, 5.0, 1.0), 9),
        ];
        let mut before = Labelmap::zeros(plane());
        before[[5, 5, 0]] = 7;

        for (fill, erase, points, expected) in cases {
            let (fill, erase) = (fill().unwrap(), erase().unwrap());
            let mut store = store(before.clone(), None);
            let mut events = Vec::new();
            let mut ctx = context(&mut store, &mut events);

            let mut op = volume_op(3, false, points.clone()).with_preview(255);
            strategy_round_trip(&fill, &mut ctx, &mut op, expected, false);
            assert_eq!(current(&mut ctx, &op), before, "{}", fill.name());
            strategy_round_trip(&fill, &mut ctx, &mut op, expected, true);
            assert_eq!(current(&mut ctx, &op).count(3), expected, "{}", fill.name());

            // 擦除: 先预览再拒绝, 然后直接擦除.
            let painted = current(&mut ctx, &op);
            let mut op = volume_op(3, false, points).with_preview(255);
            strategy_round_trip(&erase, &mut ctx, &mut op, expected, false);
            assert_eq!(current(&mut ctx, &op), painted, "{}", erase.name());
            op.preview_segment_index = None;
            click(&erase, &mut ctx, &mut op).unwrap();
            assert_eq!(current(&mut ctx, &op).count(3), 0, "{}", erase.name());
            assert_eq!(current(&mut ctx, &op).count(0), 100, "{}", erase.name());
        }

        // 正方形拖拽: 中心加密后没有缺口.
        let strategy = presets::fill_inside_square().unwrap();
        let mut store = store(Labelmap::zeros(plane()), None);
        let mut events = Vec::new();
        let mut ctx = context(&mut store, &mut events);
        let mut op = volume_op(3, false, square_at(2.0, 2.0, 1.0)).with_preview(255);
        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        op.move_to(square_at(7.0, 2.0, 1.0));
        let n = strategy.fill(&mut ctx, &mut op).unwrap().map(|t| t.len());
        assert_eq!(n, Some(24));
        strategy.reject_preview(&mut ctx, &mut op).unwrap();
        assert_eq!(current(&mut ctx, &op).count(0), 100);
    }

    /// 按下, 填充, 抬起, 然后接受或拒绝预览.
    fn strategy_round_trip(
        strategy: &BrushStrategy,
        ctx: &mut EnabledContext<'_>,
        op: &mut OperationData,
        expected: usize,
        accept: bool,
    ) {
        strategy.init_down(ctx, op).unwrap();
        let n = strategy.fill(ctx, op).unwrap().map(|t| t.len());
        assert_eq!(n, Some(expected), "{}", strategy.name());
        strategy.complete_up(ctx, op).unwrap();
        if accept {
            strategy.accept_preview(ctx, op).unwrap();
        } else {
            strategy.reject_preview(ctx, op).unwrap();
        }
        assert!(op.state.tracking.is_empty());
    }
}
