use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayD, ArrayView2, Axis};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use super::{ImageGeometry, VoxelGrid, VoxelValue};
use crate::{BrushError, BrushResult, Ijk, SegmentIndex};

/// 标注体数据. 体素值为 segment index, `0` 为背景.
///
/// 数据以 `[k, j, i]` 行优先布局保存, 因此标量偏移 `index` 与
/// [`ImageGeometry::offset`] 一致. 单帧 stack 图像对应 `k` 维为 1 的 labelmap.
#[derive(Debug, Clone, PartialEq)]
pub struct Labelmap {
    geometry: ImageGeometry,
    data: Array3<SegmentIndex>,
}

/// `(i, j, k)` 维度 -> `[k, j, i]` 数组形状.
#[inline]
pub(super) fn array_shape([di, dj, dk]: Ijk) -> [usize; 3] {
    [dk, dj, di]
}

/// 把 nifti 读出的 `[W, H, z, ...]` 数组重排为行优先的原始数据.
///
/// nifti 的数据字段按列优先存储, 轴逆序后即为行优先.
pub(super) fn reversed_raw<T: Clone>(volume: ArrayD<T>) -> Vec<T> {
    let reversed: Vec<usize> = (0..volume.ndim()).rev().collect();
    volume
        .permuted_axes(reversed)
        .as_standard_layout()
        .into_owned()
        .into_raw_vec()
}

impl Labelmap {
    /// 创建全为背景的 labelmap.
    pub fn zeros(geometry: ImageGeometry) -> Self {
        let data = Array3::zeros(array_shape(geometry.dimensions()));
        Self { geometry, data }
    }

    /// 用 `[k, j, i]` 布局的数组创建 labelmap.
    ///
    /// 数组形状与几何维度不一致时返回 `Err`.
    pub fn from_array(geometry: ImageGeometry, data: Array3<SegmentIndex>) -> BrushResult<Self> {
        let expected = array_shape(geometry.dimensions());
        if data.shape() != expected {
            let s = data.shape();
            return Err(BrushError::GeometryMismatch {
                labelmap: [s[2], s[1], s[0]],
                reference: geometry.dimensions(),
            });
        }
        let data = if data.is_standard_layout() {
            data
        } else {
            data.as_standard_layout().to_owned()
        };
        Ok(Self { geometry, data })
    }

    /// 打开 nii 文件格式的标注. 几何信息取自 header.
    pub fn open<P: AsRef<Path>>(path: P) -> BrushResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let geometry = ImageGeometry::from_nifti_header(obj.header())?;
        let raw = reversed_raw(obj.into_volume().into_ndarray::<u8>()?);
        let data = Array3::from_shape_vec(array_shape(geometry.dimensions()), raw)?;
        Ok(Self { geometry, data })
    }

    /// 几何信息.
    #[inline]
    pub fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    /// 按标量偏移读取.
    ///
    /// 数据总是标准布局, 偏移直接索引底层切片. 当 `index` 越界时 panic.
    #[inline]
    pub fn get(&self, index: usize) -> SegmentIndex {
        match self.data.as_slice() {
            Some(raw) => raw[index],
            None => self[self.geometry.ijk_of(index)],
        }
    }

    /// 按标量偏移写入.
    ///
    /// 当 `index` 越界时 panic.
    #[inline]
    pub fn set(&mut self, index: usize, value: SegmentIndex) {
        if let Some(raw) = self.data.as_slice_mut() {
            raw[index] = value;
            return;
        }
        let ijk = self.geometry.ijk_of(index);
        self[ijk] = value;
    }

    /// 第 `k` 层切片视图, 形状为 `[j, i]`.
    ///
    /// 当 `k` 越界时 panic.
    #[inline]
    pub fn slice_at(&self, k: usize) -> ArrayView2<'_, SegmentIndex> {
        self.data.index_axis(Axis(0), k)
    }

    /// `[k, j, i]` 布局的数据.
    #[inline]
    pub fn data(&self) -> &Array3<SegmentIndex> {
        &self.data
    }

    /// 统计等于 `value` 的体素个数.
    pub fn count(&self, value: SegmentIndex) -> usize {
        self.data.iter().filter(|v| **v == value).count()
    }
}

impl Index<Ijk> for Labelmap {
    type Output = SegmentIndex;

    #[inline]
    fn index(&self, [i, j, k]: Ijk) -> &Self::Output {
        &self.data[[k, j, i]]
    }
}

impl IndexMut<Ijk> for Labelmap {
    #[inline]
    fn index_mut(&mut self, [i, j, k]: Ijk) -> &mut Self::Output {
        &mut self.data[[k, j, i]]
    }
}

impl VoxelGrid for Labelmap {
    type Elem = SegmentIndex;

    #[inline]
    fn geometry(&self) -> &ImageGeometry {
        &self.geometry
    }

    #[inline]
    fn value_at(&self, index: usize) -> VoxelValue<'_, SegmentIndex> {
        VoxelValue::Scalar(self.get(index))
    }
}
