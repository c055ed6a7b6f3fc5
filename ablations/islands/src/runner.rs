//! 程序运行函数.

use std::thread;
use std::time::Instant;

use brush_berry::prelude::*;
use utils::phantom;

use crate::result::{AblationResult, Profile};

/// 要比较的孤岛移除方式. `None` 为关闭, 否则为是否包含对角邻居.
const VARIANTS: [(&str, Option<bool>); 3] = [
    ("off", None),
    ("6-connected", Some(false)),
    ("26-connected", Some(true)),
];

/// 笔触: 在中间层上从左到右拖过体模中心的一串圆.
fn stroke(size: usize) -> Vec<Vec<Point3>> {
    let [_, _, depth] = phantom::dimensions(size);
    let (y, z) = ((size as f64 - 1.0) / 2.0, (depth / 2) as f64);
    let r = (size as f64 / 6.0).max(1.0);
    let step = (r / 2.0).max(1.0);

    let mut ans = Vec::new();
    let mut x = r;
    while x + r < size as f64 {
        ans.push(vec![[x, y - r, z], [x, y + r, z], [x - r, y, z], [x + r, y, z]]);
        x += step;
    }
    ans
}

/// 用阈值画笔沿笔触绘制一次, 并统计结果.
fn run_variant(size: usize, seed: u64, island: Option<bool>) -> Profile {
    let phantom = phantom::phantom(size, seed).expect("Building phantom error");
    let mut store = InMemoryStore::new();
    store.insert_labelmap("seg", phantom.labelmap);
    store.insert_image("ct", phantom.reference);

    let mut config = StrategyConfig::default().with_static_threshold(90.0, 110.0);
    if let Some(diagonals) = island {
        config = config.with_island_removal(diagonals);
    }
    let mut op = OperationData::volume("seg", "seg", Some("ct".to_owned()), 1).with_config(config);
    let strategy = presets::threshold_inside_circle().expect("Building strategy error");
    let mut events: Vec<SegmentationDataModified> = Vec::new();

    let start = Instant::now();
    {
        let mut ctx = EnabledContext {
            store: &mut store,
            events: &mut events,
            view: ViewPlane::default(),
        };
        let mut points = stroke(size).into_iter();
        op.begin_stroke(points.next().unwrap_or_default());
        strategy.init_down(&mut ctx, &mut op).unwrap();
        strategy.fill(&mut ctx, &mut op).unwrap();
        for p in points {
            op.move_to(p);
            strategy.fill(&mut ctx, &mut op).unwrap();
        }
        strategy.complete_up(&mut ctx, &mut op).unwrap();
    }
    let elapsed = start.elapsed();

    Profile {
        painted: store.labelmap("seg").map_or(0, |l| l.count(1)),
        notifications: events.len(),
        elapsed,
    }
}

/// 实际运行.
pub fn run() -> AblationResult {
    let (size, seed) = (phantom::size_from_env(), phantom::seed_from_env());
    println!(
        "Running island removal ablation (size = {size}, seed = {seed}, {} cpus)...",
        utils::cpus()
    );

    thread::scope(|s| {
        let handles = VARIANTS.map(|(_, v)| s.spawn(move || run_variant(size, seed, v)));

        AblationResult::from_iter(
            VARIANTS.map(|(name, _)| name).into_iter().zip(
                handles
                    .into_iter()
                    .map(|th| th.join().expect("Thread joining error")),
            ),
        )
    })
}
