//! 实验结果.

use std::io::{self, Write};
use std::time::Duration;

/// 单个变体的运行统计.
#[derive(Debug, Clone, Copy)]
pub struct Profile {
    /// 最终被绘制的体素个数.
    pub painted: usize,

    /// 收到的 "数据已修改" 通知个数.
    pub notifications: usize,

    /// 按下到抬起的总耗时.
    pub elapsed: Duration,
}

/// 将 `p` 的结果写进 `w` 中. `baseline` 为关闭孤岛移除时的绘制个数.
fn describe_into<W: Write>(name: &str, p: &Profile, baseline: usize, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Profile `{name}`:")?;
    writeln!(w, "{S4}Painted voxels: {}", p.painted)?;
    writeln!(
        w,
        "{S4}Removed as islands: {}",
        baseline.saturating_sub(p.painted)
    )?;
    writeln!(w, "{S4}Notifications: {}", p.notifications)?;
    write!(w, "{S4}Total time: {} us", p.elapsed.as_micros())?;
    Ok(())
}

/// 消融实验最终结果.
pub struct AblationResult {
    data: Vec<(&'static str, Profile)>,
}

impl AblationResult {
    pub fn from_iter<I: IntoIterator<Item = (&'static str, Profile)>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 分析运行结果, 写到标准输出.
    pub fn analyze(&self) -> io::Result<()> {
        let baseline = self.data.first().map_or(0, |(_, p)| p.painted);
        let mut out = io::stdout().lock();
        utils::sep_to(&mut out)?;

        for (key, profile) in self.data.iter() {
            describe_into(key, profile, baseline, &mut out)?;
            writeln!(out)?;
            utils::sep_to(&mut out)?;
        }
        Ok(())
    }
}
