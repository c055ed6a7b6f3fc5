//! 分割统计.

use ndarray::{ArrayView2, Axis};

use crate::data::{Labelmap, ReferenceImage};
use crate::strategy::{Composition, InitializedOperationData, StatisticsProvider};
use crate::SegmentIndex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
    }
}

/// 参考图像灰度的统计量.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct IntensitySummary {
    /// 均值.
    pub mean: f64,
    /// 总体标准差.
    pub std_dev: f64,
    /// 最小值.
    pub min: f64,
    /// 最大值.
    pub max: f64,
}

/// 某个 segment index 的统计结果.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SegmentStatistics {
    /// 被统计的 segment index (预览中为哨兵).
    pub segment_index: SegmentIndex,

    /// 体素个数.
    pub count: usize,

    /// 物理体积 (mm³).
    pub volume_mm3: f64,

    /// 灰度统计. 没有参考图像或体素个数为 0 时为 `None`.
    pub intensity: Option<IntensitySummary>,
}

#[derive(Debug, Clone, Copy)]
struct Accumulator {
    count: usize,
    sum: f64,
    sum_sq: f64,
    min: f64,
    max: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_sq: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        }
    }
}

impl Accumulator {
    #[inline]
    fn push(&mut self, gray: f64) {
        self.count += 1;
        self.sum += gray;
        self.sum_sq += gray * gray;
        self.min = self.min.min(gray);
        self.max = self.max.max(gray);
    }

    fn merge(self, other: Self) -> Self {
        Self {
            count: self.count + other.count,
            sum: self.sum + other.sum,
            sum_sq: self.sum_sq + other.sum_sq,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    fn summary(&self) -> Option<IntensitySummary> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let mean = self.sum / n;
        // 浮点误差可能使方差略小于 0.
        let variance = (self.sum_sq / n - mean * mean).max(0.0);
        Some(IntensitySummary {
            mean,
            std_dev: variance.sqrt(),
            min: self.min,
            max: self.max,
        })
    }
}

/// 统计第 `k` 个切片. 没有参考图像时灰度一律记为 0, 只有个数有意义.
fn accumulate_slice(
    labelmap: &Labelmap,
    reference: Option<&ReferenceImage>,
    k: usize,
    slice: ArrayView2<'_, SegmentIndex>,
    value: SegmentIndex,
) -> Accumulator {
    let geometry = labelmap.geometry();
    let mut acc = Accumulator::default();
    for ((j, i), v) in slice.indexed_iter() {
        if *v != value {
            continue;
        }
        let gray = reference.map_or(0.0, |r| r.gray_at(geometry.offset([i, j, k])));
        acc.push(gray);
    }
    acc
}

/// 统计整个 labelmap 中取值为 `value` 的体素.
pub fn segment_statistics(
    labelmap: &Labelmap,
    reference: Option<&ReferenceImage>,
    value: SegmentIndex,
) -> SegmentStatistics {
    let slices = labelmap.data().axis_iter(Axis(0));

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let acc = slices
                .into_par_iter()
                .enumerate()
                .map(|(k, s)| accumulate_slice(labelmap, reference, k, s, value))
                .reduce(Accumulator::default, Accumulator::merge);
        } else {
            let acc = slices
                .enumerate()
                .map(|(k, s)| accumulate_slice(labelmap, reference, k, s, value))
                .fold(Accumulator::default(), Accumulator::merge);
        }
    }

    SegmentStatistics {
        segment_index: value,
        count: acc.count,
        volume_mm3: acc.count as f64 * labelmap.geometry().voxel_volume(),
        intensity: reference.and_then(|_| acc.summary()),
    }
}

/// `GetStatistics`: 统计生效 segment index 的体素. 存在尚未提交的预览时统计哨兵.
#[derive(Debug, Clone, Copy, Default)]
pub struct Statistics;

impl Composition for Statistics {
    fn name(&self) -> &'static str {
        "statistics"
    }

    fn statistics_provider(&self) -> Option<&dyn StatisticsProvider> {
        Some(self)
    }
}

impl StatisticsProvider for Statistics {
    fn statistics(&self, op: &InitializedOperationData<'_>) -> Option<SegmentStatistics> {
        let tracking = &op.state.tracking;
        let value = match tracking.preview_segment_index() {
            Some(preview) if tracking.is_preview_pending() => preview,
            _ => op.segment_index?,
        };
        Some(segment_statistics(&*op.labelmap, op.reference, value))
    }
}
