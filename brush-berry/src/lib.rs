#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 把用户在视图上画出的形状 (圆/椭圆, 球, 矩形, 正方形以及拖拽笔触)
//! 转换为分割 labelmap 上的体素级修改.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 是同步, 单线程的. 调用方 (UI 层) 负责对拖拽过程中的 `fill` 调用节流.
//! 2. 形状退化 (零个点, 平行边等) 时操作直接成为 no-op, 而不是报错.
//! 3. 洪水填充只支持 `±32767` 范围内的坐标, 见 [`consts::FLOOD_FILL_COORD_LIMIT`].
//!
//! # 开发计划
//!
//! ### 索引空间 <-> 世界空间的仿射变换 ✅
//!
//! 支持任意 (可逆) 方向余弦, 可从 nifti header 读取.
//!
//! 实现位于 `brush-berry/src/data/geometry.rs`.
//!
//! ### 形状谓词 ✅
//!
//! 圆/椭圆, 球, 矩形, 正方形. 拖拽笔触会被加密, 使相邻中心的距离不超过半边长.
//!
//! 实现位于 `brush-berry/src/shape`.
//!
//! ### 有界体素迭代 ✅
//!
//! 对每个轴预先计算世界坐标增量, 迭代时只做加法.
//!
//! 实现位于 `brush-berry/src/iter.rs`.
//!
//! ### 静态/动态阈值 ✅
//!
//! 动态阈值在一次交互中只会扩张, 不会收缩.
//!
//! 实现位于 `brush-berry/src/threshold.rs`.
//!
//! ### 策略组合与预览 ✅
//!
//! 1. 每种回调一个 trait, 单例回调在构建时检查冲突. ✅
//! 2. 预览跟踪只记录被修改体素的原始值, 支持精确回滚. ✅
//! 3. 点击处 segment index 的解析 (扩展/擦除/清除预览). ✅
//!
//! 实现位于 `brush-berry/src/strategy`.
//!
//! ### n 维洪水填充与孤岛移除 ✅
//!
//! 实现位于 `brush-berry/src/flood.rs` 和 `brush-berry/src/strategy/compositions/islands.rs`.
//!
//! ### 斜切面上的 stack 绘制 ⌛️
//!
//! 目前只支持与 `k` 轴对齐的 stack 帧, 其它方向返回
//! [`BrushError::UnsupportedOrientation`].

/// segment index. `0` 为背景.
pub type SegmentIndex = u8;

/// 三维索引 `(i, j, k)`. `i` 增长最快.
pub type Ijk = [usize; 3];

/// 有符号三维索引. 世界坐标映射到体数据之外时会出现负值.
pub type IjkSigned = [i64; 3];

/// 世界坐标 (LPS, 毫米), 同时也用作三维向量.
pub type Point3 = [f64; 3];

pub mod consts;
pub mod config;
pub mod data;
mod error;
pub mod flood;
pub mod iter;
pub mod prelude;
pub mod shape;
pub mod strategy;
pub mod threshold;

pub use error::{BrushError, BrushResult};

pub use config::{IslandRemoval, StrategyConfig, ThresholdMode, ThresholdRange};
pub use data::{
    BoundsIjk, ImageGeometry, InMemoryStore, Labelmap, ReferenceImage, SegmentationData,
    SegmentationDataModified, SegmentationEvents, SegmentationStore, VoxelGrid, VoxelValue,
};
pub use shape::{ShapeInfo, ViewPlane};
pub use strategy::{
    BrushStrategy, EnabledContext, OperationData, PreviewTracking, StrategyBuilder,
};
