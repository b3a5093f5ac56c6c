//! 混合滤波器组.
//!
//! 把最低的 3 个 (20 带模式) 或 5 个 (34 带模式) QMF 子带用 13 抽头复调制滤波器
//! 再细分, 其余 QMF 子带原样平移到混合域. 合成时把同一 QMF 子带拆出的混合子带直接相加.

use super::tables::{
    BandResolution, Cplx, G1_Q2, HYBRID_HISTORY, HybridBuffer, MAX_SLOTS, QMF_BANDS, QmfBuffer,
    SplitFilter, ps_tables,
};

/// 需要拆分的最大 QMF 子带数
const SPLIT_BANDS: usize = 5;
/// 滤波器抽头数
const TAPS: usize = 13;
/// 每个子带的分析缓冲长度: 历史 + 帧内时隙 + 前瞻
const BUF_LEN: usize = HYBRID_HISTORY + MAX_SLOTS + HYBRID_HISTORY;

/// 34 带模式各拆分子带在混合域的起始位置
const SPLIT_34_OFFSETS: [usize; SPLIT_BANDS] = [0, 12, 20, 24, 28];

/// 混合分析/合成
pub struct HybridFilterbank {
    /// 低端子带上一帧末尾的 6 个样本
    history: [[Cplx; HYBRID_HISTORY]; SPLIT_BANDS],
}

impl Default for HybridFilterbank {
    fn default() -> Self {
        Self::new()
    }
}

impl HybridFilterbank {
    pub fn new() -> Self {
        Self {
            history: [[[0.0; 2]; HYBRID_HISTORY]; SPLIT_BANDS],
        }
    }

    /// 清空历史
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 分析: QMF 域 → 混合域
    ///
    /// 每个子带读取 `slots + 6` 个时隙 (含前瞻), 输出 `slots` 个时隙.
    pub fn analyze(
        &mut self,
        input: &QmfBuffer,
        out: &mut HybridBuffer,
        res: BandResolution,
        slots: usize,
    ) {
        let mut bufs = [[[0.0f32; 2]; BUF_LEN]; SPLIT_BANDS];
        for (band, buf) in bufs.iter_mut().enumerate() {
            buf[..HYBRID_HISTORY].copy_from_slice(&self.history[band]);
            buf[HYBRID_HISTORY..HYBRID_HISTORY + slots + HYBRID_HISTORY]
                .copy_from_slice(&input[band][..slots + HYBRID_HISTORY]);
            self.history[band].copy_from_slice(&buf[slots..slots + HYBRID_HISTORY]);
        }

        let t = ps_tables();
        match res {
            BandResolution::Bands20 => {
                let mut temp = [[0.0f32; 2]; 8];
                for n in 0..slots {
                    complex_split(&bufs[0][n..n + TAPS], &t.f20_0_8, &mut temp);
                    // 8 路中 2/5 与 3/4 两两合并, 得到 6 个混合子带
                    out[0][n] = temp[6];
                    out[1][n] = temp[7];
                    out[2][n] = temp[0];
                    out[3][n] = temp[1];
                    out[4][n] = [temp[2][0] + temp[5][0], temp[2][1] + temp[5][1]];
                    out[5][n] = [temp[3][0] + temp[4][0], temp[3][1] + temp[4][1]];
                }
                real_split(&bufs[1], out, 6, true, slots);
                real_split(&bufs[2], out, 8, false, slots);
            }
            BandResolution::Bands34 => {
                split_into(&bufs[0], &t.f34_0_12, out, SPLIT_34_OFFSETS[0], slots);
                split_into(&bufs[1], &t.f34_1_8, out, SPLIT_34_OFFSETS[1], slots);
                for band in 2..SPLIT_BANDS {
                    split_into(&bufs[band], &t.f34_2_4, out, SPLIT_34_OFFSETS[band], slots);
                }
            }
        }

        let split = res.split_qmf_bands();
        let shift = res.hybrid_bands() - QMF_BANDS;
        for qmf in split..QMF_BANDS {
            out[qmf + shift][..slots].copy_from_slice(&input[qmf][..slots]);
        }
    }

    /// 合成: 混合域 → QMF 域, 只写 `out` 的前 `slots` 个时隙
    pub fn synthesize(input: &HybridBuffer, out: &mut QmfBuffer, res: BandResolution, slots: usize) {
        let groups: &[(usize, usize)] = match res {
            BandResolution::Bands20 => &[(0, 6), (6, 8), (8, 10)],
            BandResolution::Bands34 => &[(0, 12), (12, 20), (20, 24), (24, 28), (28, 32)],
        };
        for (qmf, &(start, end)) in groups.iter().enumerate() {
            for n in 0..slots {
                let mut re = 0.0f32;
                let mut im = 0.0f32;
                for band in &input[start..end] {
                    re += band[n][0];
                    im += band[n][1];
                }
                out[qmf][n] = [re, im];
            }
        }

        let shift = res.hybrid_bands() - QMF_BANDS;
        for qmf in groups.len()..QMF_BANDS {
            out[qmf][..slots].copy_from_slice(&input[qmf + shift][..slots]);
        }
    }
}

/// 对一个 13 样本窗口做 N 路复调制滤波
///
/// 实部与虚部分别累加, 利用抽头的共轭对称只计算 7 个系数.
fn complex_split<const N: usize>(win: &[Cplx], filter: &SplitFilter<N>, out: &mut [Cplx; N]) {
    for (taps, o) in filter.iter().zip(out.iter_mut()) {
        let mut sum_re = taps[6][0] * win[6][0];
        let mut sum_im = taps[6][0] * win[6][1];
        for j in 0..6 {
            let in0 = win[j];
            let in1 = win[12 - j];
            sum_re += taps[j][0] * (in0[0] + in1[0]) - taps[j][1] * (in0[1] - in1[1]);
            sum_im += taps[j][0] * (in0[1] + in1[1]) + taps[j][1] * (in0[0] - in1[0]);
        }
        *o = [sum_re, sum_im];
    }
}

fn split_into<const N: usize>(
    buf: &[Cplx; BUF_LEN],
    filter: &SplitFilter<N>,
    out: &mut HybridBuffer,
    offset: usize,
    slots: usize,
) {
    let mut temp = [[0.0f32; 2]; N];
    for n in 0..slots {
        complex_split(&buf[n..n + TAPS], filter, &mut temp);
        for (q, v) in temp.iter().enumerate() {
            out[offset + q][n] = *v;
        }
    }
}

/// 两路实数滤波: 同相分量与反相分量的和/差
fn real_split(buf: &[Cplx; BUF_LEN], out: &mut HybridBuffer, offset: usize, reverse: bool, slots: usize) {
    let (sum_band, diff_band) = if reverse {
        (offset + 1, offset)
    } else {
        (offset, offset + 1)
    };
    for n in 0..slots {
        let win = &buf[n..n + TAPS];
        let re_in = G1_Q2[6] * win[6][0];
        let im_in = G1_Q2[6] * win[6][1];
        let mut re_op = 0.0f32;
        let mut im_op = 0.0f32;
        for j in (0..6).step_by(2) {
            re_op += G1_Q2[j + 1] * (win[j + 1][0] + win[11 - j][0]);
            im_op += G1_Q2[j + 1] * (win[j + 1][1] + win[11 - j][1]);
        }
        out[sum_band][n] = [re_in + re_op, im_in + im_op];
        out[diff_band][n] = [re_in - re_op, im_in - im_op];
    }
}
