//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{BrushError, BrushResult, Ijk, IjkSigned, Point3, SegmentIndex};

pub use crate::config::{IslandRemoval, StrategyConfig, ThresholdMode, ThresholdRange};
pub use crate::consts::{BACKGROUND, DEFAULT_PREVIEW_SEGMENT_INDEX};

pub use crate::data::{
    BoundsIjk, ImageGeometry, InMemoryStore, Labelmap, ReferenceImage, SegmentationData,
    SegmentationDataModified, SegmentationEvents, SegmentationStore, VoxelGrid, VoxelValue,
};

pub use crate::iter::{point_in_shape_callback, VoxelPoint};
pub use crate::shape::{ShapeInfo, ViewPlane};

pub use crate::strategy::presets;
pub use crate::strategy::{
    BrushStrategy, EnabledContext, OperationData, PreviewTracking, SegmentStatistics,
    StrategyBuilder,
};
