use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::{Labelmap, ReferenceImage};
use crate::{BrushError, BrushResult, SegmentIndex};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一次操作的目标数据: 三维体数据, 或 stack 中的当前帧.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SegmentationData {
    /// 三维体数据.
    Volume {
        /// labelmap 体数据 ID.
        volume_id: String,
        /// 参考图像体数据 ID.
        referenced_volume_id: Option<String>,
    },

    /// 二维帧序列.
    Stack {
        /// 图像 ID -> 该帧 labelmap 的 ID.
        image_id_reference_map: BTreeMap<String, String>,
        /// 视图当前显示的图像 ID.
        current_image_id: String,
    },
}

impl SegmentationData {
    /// 是否为 stack.
    #[inline]
    pub fn is_stack(&self) -> bool {
        matches!(self, Self::Stack { .. })
    }
}

/// 在单次操作期间借出的数据.
#[derive(Debug)]
pub struct ResolvedData<'a> {
    /// 可写的 labelmap.
    pub labelmap: &'a mut Labelmap,

    /// 参考图像 (可能不存在).
    pub reference: Option<&'a ReferenceImage>,
}

/// 分割状态存储. 由调用方实现.
pub trait SegmentationStore {
    /// 解析 labelmap 和参考图像.
    ///
    /// 无法解析时必须返回 `Err(BrushError::DataNotFound)`, 且不修改任何数据.
    fn resolve(
        &mut self,
        segmentation_id: &str,
        data: &SegmentationData,
    ) -> BrushResult<ResolvedData<'_>>;

    /// 只解析 labelmap. 接受/拒绝预览时使用, 不要求参考图像存在.
    fn resolve_labelmap(
        &mut self,
        segmentation_id: &str,
        data: &SegmentationData,
    ) -> BrushResult<&mut Labelmap>;

    /// 被锁定的 segment index.
    fn locked_segments(&self, _segmentation_id: &str) -> BTreeSet<SegmentIndex> {
        BTreeSet::new()
    }

    /// 该分割的预览 segment index.
    fn preview_segment_index(&self, _segmentation_id: &str) -> Option<SegmentIndex> {
        None
    }
}

/// 纯内存存储.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    labelmaps: HashMap<String, Labelmap>,
    images: HashMap<String, ReferenceImage>,
    locked: HashMap<String, BTreeSet<SegmentIndex>>,
    preview: HashMap<String, SegmentIndex>,
}

impl InMemoryStore {
    /// 空存储.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册 labelmap (体数据或单帧).
    pub fn insert_labelmap(&mut self, id: impl Into<String>, labelmap: Labelmap) {
        self.labelmaps.insert(id.into(), labelmap);
    }

    /// 注册参考图像 (体数据或单帧).
    pub fn insert_image(&mut self, id: impl Into<String>, image: ReferenceImage) {
        self.images.insert(id.into(), image);
    }

    /// 锁定 `segmentation_id` 中的 `index`.
    pub fn lock(&mut self, segmentation_id: &str, index: SegmentIndex) {
        self.locked
            .entry(segmentation_id.to_owned())
            .or_default()
            .insert(index);
    }

    /// 解除锁定.
    pub fn unlock(&mut self, segmentation_id: &str, index: SegmentIndex) {
        if let Some(set) = self.locked.get_mut(segmentation_id) {
            set.remove(&index);
        }
    }

    /// 设置预览 segment index.
    pub fn set_preview_segment_index(&mut self, segmentation_id: &str, index: SegmentIndex) {
        self.preview.insert(segmentation_id.to_owned(), index);
    }

    /// 获取 labelmap.
    #[inline]
    pub fn labelmap(&self, id: &str) -> Option<&Labelmap> {
        self.labelmaps.get(id)
    }

    /// 获取参考图像.
    #[inline]
    pub fn image(&self, id: &str) -> Option<&ReferenceImage> {
        self.images.get(id)
    }
}

/// labelmap 的 ID.
fn labelmap_id<'d>(segmentation_id: &str, data: &'d SegmentationData) -> BrushResult<&'d str> {
    match data {
        SegmentationData::Volume { volume_id, .. } => Ok(volume_id.as_str()),
        SegmentationData::Stack {
            image_id_reference_map,
            current_image_id,
        } => image_id_reference_map
            .get(current_image_id)
            .map(String::as_str)
            .ok_or_else(|| {
                BrushError::DataNotFound(format!(
                    "labelmap frame of image `{current_image_id}` in `{segmentation_id}`"
                ))
            }),
    }
}

impl SegmentationStore for InMemoryStore {
    fn resolve(
        &mut self,
        segmentation_id: &str,
        data: &SegmentationData,
    ) -> BrushResult<ResolvedData<'_>> {
        let labelmap_id = labelmap_id(segmentation_id, data)?;
        let reference = match data {
            SegmentationData::Volume {
                referenced_volume_id: Some(id),
                ..
            } => Some(self.images.get(id).ok_or_else(|| {
                BrushError::DataNotFound(format!("reference volume `{id}`"))
            })?),
            SegmentationData::Volume { .. } => None,
            SegmentationData::Stack {
                current_image_id, ..
            } => self.images.get(current_image_id),
        };

        let labelmap = self
            .labelmaps
            .get_mut(labelmap_id)
            .ok_or_else(|| BrushError::DataNotFound(format!("labelmap `{labelmap_id}`")))?;

        if let Some(image) = reference {
            let (lhs, rhs) = (labelmap.geometry().dimensions(), image.geometry().dimensions());
            if lhs != rhs {
                return Err(BrushError::GeometryMismatch {
                    labelmap: lhs,
                    reference: rhs,
                });
            }
        }

        Ok(ResolvedData {
            labelmap,
            reference,
        })
    }

    fn resolve_labelmap(
        &mut self,
        segmentation_id: &str,
        data: &SegmentationData,
    ) -> BrushResult<&mut Labelmap> {
        let labelmap_id = labelmap_id(segmentation_id, data)?;
        self.labelmaps
            .get_mut(labelmap_id)
            .ok_or_else(|| BrushError::DataNotFound(format!("labelmap `{labelmap_id}`")))
    }

    fn locked_segments(&self, segmentation_id: &str) -> BTreeSet<SegmentIndex> {
        self.locked
            .get(segmentation_id)
            .cloned()
            .unwrap_or_default()
    }

    fn preview_segment_index(&self, segmentation_id: &str) -> Option<SegmentIndex> {
        self.preview.get(segmentation_id).copied()
    }
}
