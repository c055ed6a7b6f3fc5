//! 画笔所操作的数据: 几何信息, labelmap, 参考图像, 以及外部存储/通知接口.

use ndarray::ArrayView1;

mod events;
mod geometry;
mod labelmap;
mod reference;
mod store;

pub use events::{SegmentationDataModified, SegmentationEvents};
pub use geometry::{BoundsIjk, ImageGeometry};
pub use labelmap::Labelmap;
pub use reference::ReferenceImage;
pub use store::{InMemoryStore, ResolvedData, SegmentationData, SegmentationStore};

pub(crate) use geometry::{add, cross, dot, mean, norm, normalize, scale, sub};

/// 单个体素的取值. 多分量图像返回分量数组的视图.
#[derive(Debug, Clone, PartialEq)]
pub enum VoxelValue<'a, T> {
    /// 单分量.
    Scalar(T),

    /// 多分量 (如 RGB/RGBA).
    Components(ArrayView1<'a, T>),
}

impl<T: Copy + Into<f64>> VoxelValue<'_, T> {
    /// 灰度值. 多分量时取前三个分量的欧氏模长.
    pub fn gray(&self) -> f64 {
        match self {
            Self::Scalar(v) => (*v).into(),
            Self::Components(c) => c
                .iter()
                .take(3)
                .map(|v| {
                    let v: f64 = (*v).into();
                    v * v
                })
                .sum::<f64>()
                .sqrt(),
        }
    }
}

/// 能按标量偏移随机读取的体数据.
pub trait VoxelGrid {
    /// 分量元素类型.
    type Elem: Copy;

    /// 几何信息.
    fn geometry(&self) -> &ImageGeometry;

    /// 按标量偏移读取. 越界时 panic.
    fn value_at(&self, index: usize) -> VoxelValue<'_, Self::Elem>;
}
