//! n 维洪水填充.
//!
//! 从种子出发, 寻找与种子取值相同的连通分量, 并给出紧邻分量外部的边界点.
//! visited 集合使用整数编码的坐标: 每个轴占 16 bit, 因此坐标分量必须位于
//! `[-32767, 32767]` 内, 超出时返回 [`BrushError::FloodFillOutOfRange`],
//! 不会静默回绕.

use std::collections::HashSet;

use itertools::Itertools;

use crate::consts::FLOOD_FILL_COORD_LIMIT;
use crate::{BrushError, BrushResult};

/// 洪水填充的结果.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloodFillResult<const N: usize> {
    /// 连通分量中的点 (含种子), 按发现顺序排列.
    pub flooded: Vec<[i64; N]>,

    /// 与分量相邻, 但取值不同的点.
    pub boundaries: Vec<[i64; N]>,
}

/// 所有邻居偏移. 不含对角邻居时只保留恰有一个非零分量的偏移 (2N 个).
fn neighbour_offsets<const N: usize>(diagonals: bool) -> Vec<[i64; N]> {
    (0..N)
        .map(|_| -1i64..=1)
        .multi_cartesian_product()
        .map(|v| std::array::from_fn::<i64, N, _>(|a| v[a]))
        .filter(|d| {
            let nonzero = d.iter().filter(|v| **v != 0).count();
            nonzero > 0 && (diagonals || nonzero == 1)
        })
        .collect()
}

/// 把坐标编码为 visited 集合的键.
fn encode<const N: usize>(point: &[i64; N]) -> BrushResult<u64> {
    let mut key = 0u64;
    for &c in point.iter().rev() {
        if !(-FLOOD_FILL_COORD_LIMIT..=FLOOD_FILL_COORD_LIMIT).contains(&c) {
            return Err(BrushError::FloodFillOutOfRange {
                coordinate: c,
                limit: FLOOD_FILL_COORD_LIMIT,
            });
        }
        key = (key << 16) | (c + FLOOD_FILL_COORD_LIMIT + 1) as u64;
    }
    Ok(key)
}

/// 从 `seed` 开始洪水填充.
///
/// `getter` 返回某点的取值; 返回 `None` 表示该点不在定义域内, 既不属于分量也不算边界.
/// 种子本身不在定义域内时结果为空.
///
/// # 注意
///
/// `N` 必须在 `1..=3` 内, 否则程序 panic.
pub fn flood_fill<T, G, const N: usize>(
    mut getter: G,
    seed: [i64; N],
    diagonals: bool,
) -> BrushResult<FloodFillResult<N>>
where
    T: PartialEq,
    G: FnMut([i64; N]) -> Option<T>,
{
    assert!((1..=3).contains(&N), "flood fill supports 1 to 3 dimensions");

    let mut ans = FloodFillResult::default();
    let mut visited = HashSet::new();
    visited.insert(encode(&seed)?);
    let Some(target) = getter(seed) else {
        return Ok(ans);
    };

    let offsets = neighbour_offsets::<N>(diagonals);
    let mut stack = vec![seed];
    ans.flooded.push(seed);
    while let Some(p) = stack.pop() {
        for d in offsets.iter() {
            let q: [i64; N] = std::array::from_fn(|a| p[a] + d[a]);
            if !visited.insert(encode(&q)?) {
                continue;
            }
            match getter(q) {
                Some(v) if v == target => {
                    ans.flooded.push(q);
                    stack.push(q);
                }
                Some(_) => ans.boundaries.push(q),
                None => {}
            }
        }
    }
    Ok(ans)
}
