//! 画笔策略配置.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 闭区间 `[lower, upper]` 形式的强度范围.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdRange {
    /// 下界 (含).
    pub lower: f64,

    /// 上界 (含).
    pub upper: f64,
}

impl ThresholdRange {
    /// 创建范围. 两端会被自动排序.
    #[inline]
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            lower: a.min(b),
            upper: a.max(b),
        }
    }

    /// 只包含 `value` 的退化范围.
    #[inline]
    pub fn point(value: f64) -> Self {
        Self {
            lower: value,
            upper: value,
        }
    }

    /// `value` 是否在范围内?
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// 区间宽度.
    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// 扩张区间使其包含 `value`. 区间永远不会收缩.
    #[inline]
    pub fn widen(&mut self, value: f64) {
        self.lower = self.lower.min(value);
        self.upper = self.upper.max(value);
    }
}

/// 阈值模式.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ThresholdMode {
    /// 固定区间.
    Static(ThresholdRange),

    /// 按下时以点击处为中心, 在边长为 `2 * radius + 1` 的邻域中采样得到区间,
    /// 之后只用每次新中心处的体素值扩张区间.
    Dynamic {
        /// 采样邻域半径 (体素).
        radius: usize,
    },
}

impl ThresholdMode {
    /// 默认邻域半径的动态阈值.
    #[inline]
    pub const fn dynamic() -> Self {
        Self::Dynamic { radius: 1 }
    }
}

/// 孤岛移除选项.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IslandRemoval {
    /// 连通性是否包含对角邻居 (26-邻域). 否则为 6-邻域.
    pub diagonals: bool,
}

/// 单个画笔的策略配置.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct StrategyConfig {
    /// 阈值. `None` 表示不做强度筛选.
    pub threshold: Option<ThresholdMode>,

    /// 是否使用点击中心处已有的 segment index ("扩展已有 segment").
    pub use_center_segment_index: bool,

    /// 孤岛移除. `None` 表示关闭.
    pub island_removal: Option<IslandRemoval>,
}

impl StrategyConfig {
    /// 使用静态阈值 `[lower, upper]`.
    pub fn with_static_threshold(mut self, lower: f64, upper: f64) -> Self {
        self.threshold = Some(ThresholdMode::Static(ThresholdRange::new(lower, upper)));
        self
    }

    /// 使用半径为 `radius` 的动态阈值.
    pub fn with_dynamic_threshold(mut self, radius: usize) -> Self {
        self.threshold = Some(ThresholdMode::Dynamic { radius });
        self
    }

    /// 打开 "扩展已有 segment".
    pub fn with_center_segment_index(mut self) -> Self {
        self.use_center_segment_index = true;
        self
    }

    /// 打开孤岛移除.
    pub fn with_island_removal(mut self, diagonals: bool) -> Self {
        self.island_removal = Some(IslandRemoval { diagonals });
        self
    }
}
