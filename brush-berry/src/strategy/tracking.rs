use std::collections::{BTreeMap, BTreeSet};

use crate::data::{BoundsIjk, ImageGeometry};
use crate::{IjkSigned, SegmentIndex};

/// 一次交互 (或一次预览) 中被修改体素的原始值.
///
/// 不变量: 表中每个偏移自上次提交/回滚以来都被修改过, 并且记录的是第一次修改之前的值.
/// 因此回滚是精确的.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewTracking {
    originals: BTreeMap<usize, SegmentIndex>,
    slices: BTreeSet<usize>,
    bounds: Option<BoundsIjk>,
    segment_index: Option<SegmentIndex>,
    preview_segment_index: Option<SegmentIndex>,
    last_center: Option<IjkSigned>,
}

impl PreviewTracking {
    /// 记录 `index` 处的原始值. 已有记录时不覆盖.
    pub(crate) fn record(&mut self, geometry: &ImageGeometry, index: usize, original: SegmentIndex) {
        let ijk = geometry.ijk_of(index);
        self.originals.entry(index).or_insert(original);
        self.slices.insert(ijk[2]);
        match self.bounds.as_mut() {
            Some(b) => b.include(ijk),
            None => self.bounds = BoundsIjk::new(ijk, ijk),
        }
    }

    /// 忘记 `index` 处的记录 (该体素已被恢复为原始值).
    #[inline]
    pub(crate) fn forget(&mut self, index: usize) -> Option<SegmentIndex> {
        self.originals.remove(&index)
    }

    pub(crate) fn set_targets(&mut self, segment: SegmentIndex, preview: Option<SegmentIndex>) {
        self.segment_index = Some(segment);
        self.preview_segment_index = preview;
    }

    #[inline]
    pub(crate) fn last_center(&self) -> Option<IjkSigned> {
        self.last_center
    }

    #[inline]
    pub(crate) fn set_last_center(&mut self, center: Option<IjkSigned>) {
        self.last_center = center;
    }

    /// 清空全部记录.
    #[inline]
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// `index` 处的原始值.
    #[inline]
    pub fn original(&self, index: usize) -> Option<SegmentIndex> {
        self.originals.get(&index).copied()
    }

    /// 是否没有任何记录?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.originals.is_empty()
    }

    /// 被修改的体素个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.originals.len()
    }

    /// 按偏移升序迭代 `(偏移, 原始值)`.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (usize, SegmentIndex)> + '_ {
        self.originals.iter().map(|(k, v)| (*k, *v))
    }

    /// 被修改过的 `k` 切片 (升序).
    #[inline]
    pub fn modified_slices(&self) -> Vec<usize> {
        self.slices.iter().copied().collect()
    }

    /// 被修改体素的包围盒.
    #[inline]
    pub fn bounds(&self) -> Option<BoundsIjk> {
        self.bounds
    }

    /// 提交时写入的 segment index.
    #[inline]
    pub fn segment_index(&self) -> Option<SegmentIndex> {
        self.segment_index
    }

    /// 写入时使用的预览哨兵.
    #[inline]
    pub fn preview_segment_index(&self) -> Option<SegmentIndex> {
        self.preview_segment_index
    }

    /// 是否存在尚未接受或拒绝的预览?
    #[inline]
    pub fn is_preview_pending(&self) -> bool {
        self.preview_segment_index.is_some() && !self.is_empty()
    }
}
