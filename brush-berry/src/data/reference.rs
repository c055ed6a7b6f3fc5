use std::path::Path;

use ndarray::{s, Array3, Array4, Axis};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use super::labelmap::{array_shape, reversed_raw};
use super::{ImageGeometry, VoxelGrid, VoxelValue};
use crate::{BrushError, BrushResult};

/// 与 labelmap 配准的参考图像 (只读). 仅供阈值与统计使用.
///
/// 数据布局为 `[k, j, i, c]`, `c` 为分量个数 (普通 CT 为 1).
#[derive(Debug, Clone)]
pub struct ReferenceImage {
    geometry: ImageGeometry,
    data: Array4<f32>,
}

impl ReferenceImage {
    /// 用 `[k, j, i]` 布局的单分量数组创建参考图像.
    pub fn from_scalars(geometry: ImageGeometry, data: Array3<f32>) -> BrushResult<Self> {
        Self::from_components(geometry, data.insert_axis(Axis(3)))
    }

    /// 用 `[k, j, i, c]` 布局的多分量数组创建参考图像.
    ///
    /// 前三维与几何维度不一致, 或分量个数为 0 时返回 `Err`.
    pub fn from_components(geometry: ImageGeometry, data: Array4<f32>) -> BrushResult<Self> {
        let s = data.shape();
        if s[..3] != array_shape(geometry.dimensions()) || s[3] == 0 {
            return Err(BrushError::GeometryMismatch {
                labelmap: geometry.dimensions(),
                reference: [s[2], s[1], s[0]],
            });
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };
        Ok(Self { geometry, data })
    }

    /// 打开 nii 文件格式的单分量参考图像, 体素值统一转换为 `f32`.
    pub fn open<P: AsRef<Path>>(path: P) -> BrushResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let geometry = ImageGeometry::from_nifti_header(obj.header())?;
        let raw = reversed_raw(obj.into_volume().into_ndarray::<f32>()?);
        let data = Array3::from_shape_vec(array_shape(geometry.dimensions()), raw)?;
        Self::from_scalars(geometry, data)
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// 每个体素的分量个数.
    #[inline]
    pub fn components(&self) -> usize {
        self.data.shape()[3]
    }

    /// 标量偏移 `index` 处的灰度值. 多分量图像取前三个分量的模长.
    ///
    /// 当 `index` 越界时 panic.
    #[inline]
    pub fn gray_at(&self, index: usize) -> f64 {
        self.value_at(index).gray()
    }
}

impl VoxelGrid for ReferenceImage {
    type Elem = f32;

    #[inline]
    fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    fn value_at(&self, index: usize) -> VoxelValue<'_, f32> {
        let [i, j, k] = self.geometry.ijk_of(index);
        if self.components() == 1 {
            VoxelValue::Scalar(self.data[[k, j, i, 0]])
        } else {
            VoxelValue::Components(self.data.slice(s![k, j, i, ..]))
        }
    }
}
