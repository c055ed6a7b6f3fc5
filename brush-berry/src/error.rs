//! 运行时错误.

use crate::Ijk;
use thiserror::Error;

/// 画笔引擎的运行时错误.
///
/// 退化几何 (零个点, 平行边等) 不属于错误, 对应的形状会直接成为 no-op.
#[derive(Debug, Error)]
pub enum BrushError {
    /// 无法根据给定 ID 找到 labelmap 或参考图像.
    ///
    /// 该检查发生在任何写入之前.
    #[error("data not found: {0}")]
    DataNotFound(String),

    /// 策略无法在该方向上工作 (如在非轴对齐的 stack 帧上绘制).
    #[error("unsupported orientation: {0}")]
    UnsupportedOrientation(String),

    /// 两个 composition 同时提供了同一个单例回调.
    #[error("composition conflict on `{callback}`: provided by both `{first}` and `{second}`")]
    CompositionConflict {
        /// 回调名.
        callback: &'static str,
        /// 先注册的 composition.
        first: &'static str,
        /// 后注册的 composition.
        second: &'static str,
    },

    /// 洪水填充坐标超出可编码范围.
    #[error("flood fill coordinate {coordinate} is outside of ±{limit}")]
    FloodFillOutOfRange {
        /// 越界的坐标分量.
        coordinate: i64,
        /// 可编码范围.
        limit: i64,
    },

    /// 上一次预览尚未被接受或拒绝.
    #[error("preview of segmentation `{0}` must be accepted or rejected first")]
    PreviewPending(String),

    /// 非法几何参数 (零维度, 非正 spacing, 不可逆方向矩阵等).
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// labelmap 与参考图像的形状不一致.
    #[error("labelmap dimensions {labelmap:?} do not match reference image {reference:?}")]
    GeometryMismatch {
        /// labelmap 的 `(i, j, k)` 维度.
        labelmap: Ijk,
        /// 参考图像的 `(i, j, k)` 维度.
        reference: Ijk,
    },

    /// 读取 nifti 文件失败.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// 数组形状错误.
    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

/// 画笔引擎运行时结果.
pub type BrushResult<T> = Result<T, BrushError>;
