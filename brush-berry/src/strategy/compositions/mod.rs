//! 可组合的行为片段.
//!
//! 预设策略见 [`presets`](super::presets). 自定义策略时注意片段顺序:
//! 形状 -> segment index 解析 -> 擦除/阈值 -> 预览 -> `setValue` -> 填充 -> 孤岛移除 -> 统计.

mod erase;
mod fill;
mod islands;
mod preview;
mod segment;
mod set_value;
mod shapes;
pub mod statistics;
mod threshold;

pub use erase::Erase;
pub use fill::FillInsideShape;
pub use islands::RemoveIslands;
pub use preview::Preview;
pub use segment::DetermineSegmentIndex;
pub use set_value::SetValue;
pub use shapes::{CircleShape, RectangleShape, SphereShape, SquareShape};
pub use statistics::Statistics;
pub use threshold::Threshold;
