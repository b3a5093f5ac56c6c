//! 差分参数重建.
//!
//! 码流中的 IID/ICC/IPD/OPD 都是差分值: 频率方向在包络内逐带累加,
//! 时间方向对前一包络 (或上一帧最后一个包络) 的同一频带累加.
//! IID/ICC 每次累加后钳位到合法范围, IPD/OPD 对 8 取模.

use super::huffman::ParamKind;

/// 参数值的合法范围处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ValueRange {
    /// 超出 `[lo, hi]` 时钳位
    Clamp(i32, i32),
    /// 按掩码取模
    Wrap(i32),
}

impl ValueRange {
    pub(crate) fn of(kind: ParamKind, fine: bool) -> Self {
        match kind {
            ParamKind::Iid if fine => Self::Clamp(-15, 15),
            ParamKind::Iid => Self::Clamp(-7, 7),
            ParamKind::Icc => Self::Clamp(0, 7),
            ParamKind::Ipd | ParamKind::Opd => Self::Wrap(7),
        }
    }

    /// 规整一个值, 返回 (结果, 是否越界)
    pub(crate) fn apply(self, value: i32) -> (i32, bool) {
        match self {
            Self::Clamp(lo, hi) => {
                let clamped = value.clamp(lo, hi);
                (clamped, clamped != value)
            }
            Self::Wrap(mask) => (value & mask, false),
        }
    }

    /// 值是否落在合法范围内
    pub(crate) fn contains(self, value: i32) -> bool {
        match self {
            Self::Clamp(lo, hi) => (lo..=hi).contains(&value),
            Self::Wrap(mask) => (0..=mask).contains(&value),
        }
    }

    /// 将一整行规整到范围内, 返回越界个数
    pub(crate) fn apply_row(self, row: &mut [i32]) -> usize {
        let mut violations = 0;
        for v in row.iter_mut() {
            let (value, clipped) = self.apply(*v);
            *v = value;
            violations += usize::from(clipped);
        }
        violations
    }
}

/// 由差分码重建一个包络的绝对值
///
/// - `raw`: 解码得到的差分值, 长度为码流中的频带数
/// - `prev`: 时间方向的参考行 (已展开), 仅 `time_delta` 时使用
/// - `stride`: 每个码元覆盖的频带数, 粗分辨率 IID/ICC 为 2
/// - `out`: 输出行, 按 `stride` 展开写入 `raw.len() * stride` 个值
///
/// 返回被钳位的值个数.
pub(crate) fn reconstruct(
    kind: ParamKind,
    fine: bool,
    time_delta: bool,
    raw: &[i32],
    prev: &[i32],
    stride: usize,
    out: &mut [i32],
) -> usize {
    let range = ValueRange::of(kind, fine);
    let mut violations = 0;
    let mut acc = 0;
    for (i, &delta) in raw.iter().enumerate() {
        let base = if time_delta { prev[i * stride] } else { acc };
        let (value, clipped) = range.apply(base + delta);
        violations += usize::from(clipped);
        acc = value;
        out[i * stride..(i + 1) * stride].fill(value);
    }
    violations
}

/// 计算一行绝对值在两个方向上的差分码
///
/// 返回 (频率方向, 时间方向). 粗分辨率时 `values` 为码流频带数, `prev` 为展开后的参考行.
pub(crate) fn deltas(
    kind: ParamKind,
    values: &[i32],
    prev: &[i32],
    stride: usize,
) -> (Vec<i32>, Vec<i32>) {
    let wrap = |d: i32| match kind {
        ParamKind::Ipd | ParamKind::Opd => d & 7,
        ParamKind::Iid | ParamKind::Icc => d,
    };
    let mut last = 0;
    let df = values
        .iter()
        .map(|&v| {
            let d = wrap(v - last);
            last = v;
            d
        })
        .collect();
    let dt = values
        .iter()
        .enumerate()
        .map(|(i, &v)| wrap(v - prev[i * stride]))
        .collect();
    (df, dt)
}
