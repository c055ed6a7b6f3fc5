//! 合成的带噪声体模. 代替真实数据集用于实验.
//!
//! 体模为 `size * size * depth` 的体数据 (`depth = max(size / 4, 1)`), 中心有一个灰度约为 100
//! 的球, 背景灰度在 `[0, 60)` 内均匀分布, 并随机散布少量灰度为 100 的噪点.

use std::env;

use brush_berry::prelude::*;
use ndarray::Array3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 默认边长.
pub const DEFAULT_SIZE: usize = 64;

/// 默认随机种子.
pub const DEFAULT_SEED: u64 = 42;

/// 噪点比例.
const SPECKLE_RATIO: f64 = 0.03;

/// 体模: 空 labelmap 与参考图像.
pub struct Phantom {
    /// 全为背景的 labelmap.
    pub labelmap: Labelmap,

    /// 参考图像.
    pub reference: ReferenceImage,
}

/// 获取体模边长.
///
/// 1. 若环境变量 `$BRUSH_PHANTOM_SIZE` 可解析为正整数, 则返回其值;
/// 2. 否则, 返回 [`DEFAULT_SIZE`].
pub fn size_from_env() -> usize {
    env::var("BRUSH_PHANTOM_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|s| *s > 0)
        .unwrap_or(DEFAULT_SIZE)
}

/// 获取随机种子. 读取 `$BRUSH_PHANTOM_SEED`, 缺省为 [`DEFAULT_SEED`].
pub fn seed_from_env() -> u64 {
    env::var("BRUSH_PHANTOM_SEED")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_SEED)
}

/// 体模的 `(i, j, k)` 维度.
#[inline]
pub fn dimensions(size: usize) -> Ijk {
    [size, size, (size / 4).max(1)]
}

/// 生成体模. 相同的 `size` 和 `seed` 总是得到相同的体模.
pub fn phantom(size: usize, seed: u64) -> BrushResult<Phantom> {
    let dims = dimensions(size);
    let geometry = ImageGeometry::axis_aligned(dims, [1.0; 3])?;
    let center = dims.map(|d| (d as f64 - 1.0) / 2.0);
    let r2 = (size as f64 / 4.0).powi(2);

    let mut rng = StdRng::seed_from_u64(seed);
    let gray = Array3::<f32>::from_shape_fn([dims[2], dims[1], dims[0]], |(k, j, i)| {
        let d2: f64 = [i, j, k]
            .iter()
            .zip(center)
            .map(|(x, c)| (*x as f64 - c).powi(2))
            .sum();
        if d2 <= r2 {
            rng.random_range(92.0..108.0)
        } else if rng.random_bool(SPECKLE_RATIO) {
            100.0
        } else {
            rng.random_range(0.0..60.0)
        }
    });

    Ok(Phantom {
        labelmap: Labelmap::zeros(geometry.clone()),
        reference: ReferenceImage::from_scalars(geometry, gray)?,
    })
}
