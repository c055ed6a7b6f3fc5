//! 孤岛移除.
//!
//! 阈值填充容易在笔触附近留下与笔触不连通的零星区域. 抬起时从笔触经过的体素出发做洪水填充,
//! 本次交互写入但未被连通到的体素会被恢复为原始值.

use std::collections::HashSet;

use crate::config::IslandRemoval;
use crate::consts::BACKGROUND;
use crate::data::{BoundsIjk, ImageGeometry, Labelmap};
use crate::flood::flood_fill;
use crate::strategy::{BrushStrategy, Composition, InitializedOperationData, InteractionEnder};
use crate::{BrushResult, Ijk, SegmentIndex};

/// `OnInteractionEnd`: 移除本次交互产生的孤岛.
///
/// 只在 [`StrategyConfig::island_removal`](crate::StrategyConfig) 打开时生效,
/// 且只会回滚本次交互写入的体素.
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveIslands;

impl Composition for RemoveIslands {
    fn name(&self) -> &'static str {
        "removeIslands"
    }

    fn interaction_ender(&self) -> Option<&dyn InteractionEnder> {
        Some(self)
    }
}

/// 在 `region` 内, 与任一种子连通的体素偏移.
///
/// 洪水填充在以 `region.min` 为原点的局部坐标中进行, 取值为 `segment` 或 `target` 的体素视为同一分量.
fn connected_offsets(
    labelmap: &Labelmap,
    region: &BoundsIjk,
    seeds: &[Ijk],
    segment: SegmentIndex,
    target: SegmentIndex,
    diagonals: bool,
) -> BrushResult<HashSet<usize>> {
    let geometry: &ImageGeometry = labelmap.geometry();
    let origin = region.min;
    let to_global = |p: [i64; 3]| -> Option<Ijk> {
        let mut ijk = [0usize; 3];
        for a in 0..3 {
            ijk[a] = origin[a] + usize::try_from(p[a]).ok()?;
        }
        region.contains(ijk).then_some(ijk)
    };
    let getter = |p: [i64; 3]| {
        to_global(p).map(|ijk| {
            let v = labelmap.get(geometry.offset(ijk));
            v == segment || v == target
        })
    };

    let mut connected = HashSet::new();
    for seed in seeds {
        if connected.contains(&geometry.offset(*seed)) {
            continue;
        }
        let local = std::array::from_fn(|a| (seed[a] - origin[a]) as i64);
        let ans = flood_fill(&getter, local, diagonals)?;
        connected.extend(
            ans.flooded
                .into_iter()
                .filter_map(&to_global)
                .map(|ijk| geometry.offset(ijk)),
        );
    }
    Ok(connected)
}

impl InteractionEnder for RemoveIslands {
    fn on_interaction_end(
        &self,
        _: &BrushStrategy,
        op: &mut InitializedOperationData<'_>,
    ) -> BrushResult<()> {
        let Some(IslandRemoval { diagonals }) = op.config.island_removal else {
            return Ok(());
        };
        let (Some(segment), Some(target)) = (op.segment_index, op.target_value()) else {
            return Ok(());
        };
        if segment == BACKGROUND {
            return Ok(());
        }
        let Some(mut region) = op.state.tracking.bounds() else {
            return Ok(());
        };
        let geometry = op.labelmap.geometry().clone();
        let painted: Vec<(usize, SegmentIndex)> = op
            .state
            .tracking
            .iter()
            .filter(|(index, _)| op.labelmap.get(*index) == target)
            .collect();
        if painted.is_empty() {
            return Ok(());
        }

        let seeds: Vec<Ijk> = op
            .state
            .stroke_centers
            .iter()
            .copied()
            .filter_map(|w| geometry.checked_ijk(geometry.world_to_index(w)))
            .filter(|ijk| {
                let v = op.labelmap.get(geometry.offset(*ijk));
                v == segment || v == target
            })
            .collect();
        if seeds.is_empty() {
            log::debug!("island removal skipped: no stroke point lies on the painted region");
            return Ok(());
        }
        for seed in seeds.iter() {
            region.include(*seed);
        }

        let connected =
            connected_offsets(&*op.labelmap, &region, &seeds, segment, target, diagonals)?;
        let mut removed = 0usize;
        for (index, original) in painted {
            if connected.contains(&index) {
                continue;
            }
            op.labelmap.set(index, original);
            op.state.tracking.forget(index);
            op.modified_slices.insert(geometry.ijk_of(index)[2]);
            removed += 1;
        }
        log::debug!(
            "island removal: {} connected, {removed} reverted, {} seeds",
            connected.len(),
            seeds.len()
        );
        Ok(())
    }
}
