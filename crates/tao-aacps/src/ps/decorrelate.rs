//! 去相关器.
//!
//! 由单声道混合域信号生成与之不相关的环境声信号:
//! 低端子带经过三级分数延迟全通级联, 中段子带延迟 14 个时隙, 高端子带延迟 1 个时隙.
//! 每个参数频带按瞬态检测结果衰减输出, 避免全通滤波把瞬态拖成回声.

use log::debug;

use super::tables::{
    AP_LINKS, BandResolution, Cplx, HybridBuffer, MAX_ALLPASS_BANDS, MAX_AP_DELAY, MAX_DELAY,
    MAX_HYBRID_BANDS, MAX_PAR_BANDS, MAX_SLOTS, ps_tables,
};

/// 峰值衰减系数
const PEAK_DECAY: f32 = 0.765_928_3;
/// 平滑系数
const A_SMOOTH: f32 = 0.25;
/// 瞬态冲击因子
const TRANSIENT_IMPACT: f32 = 1.5;
/// 全通衰减斜率
const DECAY_SLOPE: f32 = 0.05;
/// 三级全通链路的增益
const AP_GAIN: [f32; AP_LINKS] = [0.651_439_06, 0.564_718_1, 0.489_541_66];

type DelayLine = [Cplx; MAX_SLOTS + MAX_DELAY];
type ApDelayLine = [Cplx; MAX_SLOTS + MAX_AP_DELAY];

/// 去相关器状态
pub struct Decorrelator {
    peak_decay_nrg: [f32; MAX_PAR_BANDS],
    power_smooth: [f32; MAX_PAR_BANDS],
    peak_decay_diff_smooth: [f32; MAX_PAR_BANDS],
    /// 每个混合子带的延迟线, 前 14 个位置为上一帧尾部
    delay: Box<[DelayLine; MAX_HYBRID_BANDS]>,
    /// 全通子带的三条链路延迟线, 前 5 个位置为上一帧尾部
    ap_delay: Box<[[ApDelayLine; AP_LINKS]; MAX_ALLPASS_BANDS]>,
    /// 状态对应的频带分辨率
    resolution: Option<BandResolution>,
}

impl Default for Decorrelator {
    fn default() -> Self {
        Self::new()
    }
}

impl Decorrelator {
    pub fn new() -> Self {
        Self {
            peak_decay_nrg: [0.0; MAX_PAR_BANDS],
            power_smooth: [0.0; MAX_PAR_BANDS],
            peak_decay_diff_smooth: [0.0; MAX_PAR_BANDS],
            delay: Box::new([[[0.0; 2]; MAX_SLOTS + MAX_DELAY]; MAX_HYBRID_BANDS]),
            ap_delay: Box::new([[[[0.0; 2]; MAX_SLOTS + MAX_AP_DELAY]; AP_LINKS]; MAX_ALLPASS_BANDS]),
            resolution: None,
        }
    }

    /// 清空全部延迟线与瞬态检测累加器
    pub fn reset(&mut self) {
        self.peak_decay_nrg = [0.0; MAX_PAR_BANDS];
        self.power_smooth = [0.0; MAX_PAR_BANDS];
        self.peak_decay_diff_smooth = [0.0; MAX_PAR_BANDS];
        self.delay.iter_mut().for_each(|line| line.fill([0.0; 2]));
        self.ap_delay
            .iter_mut()
            .flatten()
            .for_each(|line| line.fill([0.0; 2]));
        self.resolution = None;
    }

    /// 生成 `input` 的去相关信号
    ///
    /// 频带分辨率与上次调用不同时先清空状态.
    pub fn decorrelate(
        &mut self,
        input: &HybridBuffer,
        out: &mut HybridBuffer,
        res: BandResolution,
        slots: usize,
    ) {
        if self.resolution.is_some_and(|prev| prev != res) {
            debug!("PS: 频带分辨率切换为 {:?}, 重置去相关器", res);
            self.reset();
        }
        self.resolution = Some(res);

        let gains = self.transient_gains(input, res, slots);
        let k_to_i = res.band_to_par();
        let allpass_bands = res.allpass_bands();
        let short_delay_band = res.short_delay_band();
        let cutoff = res.decay_cutoff() as f32;
        let t = ps_tables();
        let (phi_fract, q_fract): (&[Cplx], &[[Cplx; AP_LINKS]]) = if res.is_34() {
            (&t.phi_fract_34, &t.q_fract_34)
        } else {
            (&t.phi_fract_20, &t.q_fract_20)
        };

        for k in 0..res.hybrid_bands() {
            let gain = &gains[k_to_i[k] as usize];
            let line = &mut self.delay[k];
            line.copy_within(slots..slots + MAX_DELAY, 0);
            line[MAX_DELAY..MAX_DELAY + slots].copy_from_slice(&input[k][..slots]);

            if k < allpass_bands {
                let slope = (1.0 - DECAY_SLOPE * (k as f32 - cutoff)).clamp(0.0, 1.0);
                let ap = &mut self.ap_delay[k];
                for link in ap.iter_mut() {
                    link.copy_within(slots..slots + MAX_AP_DELAY, 0);
                }
                allpass(line, ap, phi_fract[k], &q_fract[k], gain, slope, &mut out[k], slots);
            } else {
                // 中段延迟 14, 高端延迟 1
                let offset = if k < short_delay_band { 0 } else { MAX_DELAY - 1 };
                for n in 0..slots {
                    let d = line[n + offset];
                    out[k][n] = [gain[n] * d[0], gain[n] * d[1]];
                }
            }
        }
    }

    /// 瞬态检测, 得到每个参数频带每个时隙的衰减增益
    fn transient_gains(
        &mut self,
        input: &HybridBuffer,
        res: BandResolution,
        slots: usize,
    ) -> [[f32; MAX_SLOTS]; MAX_PAR_BANDS] {
        let mut power = [[0.0f32; MAX_SLOTS]; MAX_PAR_BANDS];
        let k_to_i = res.band_to_par();
        for (k, band) in input[..res.hybrid_bands()].iter().enumerate() {
            let p = &mut power[k_to_i[k] as usize];
            for n in 0..slots {
                p[n] += band[n][0] * band[n][0] + band[n][1] * band[n][1];
            }
        }

        let mut gains = [[1.0f32; MAX_SLOTS]; MAX_PAR_BANDS];
        for i in 0..res.par_bands() {
            for n in 0..slots {
                let p = power[i][n];
                self.peak_decay_nrg[i] = (PEAK_DECAY * self.peak_decay_nrg[i]).max(p);
                self.power_smooth[i] += A_SMOOTH * (p - self.power_smooth[i]);
                self.peak_decay_diff_smooth[i] +=
                    A_SMOOTH * (self.peak_decay_nrg[i] - p - self.peak_decay_diff_smooth[i]);
                let denom = TRANSIENT_IMPACT * self.peak_decay_diff_smooth[i];
                gains[i][n] = if denom > self.power_smooth[i] {
                    self.power_smooth[i] / denom
                } else {
                    1.0
                };
            }
        }
        gains
    }
}

/// 三级分数延迟全通级联
///
/// 输入取自延迟线中延迟 2 个时隙的位置, 先乘以相位因子,
/// 每级链路以 `a * slope` 为反馈增益, 链路延迟分别为 3/4/5.
#[allow(clippy::too_many_arguments)]
fn allpass(
    line: &DelayLine,
    ap: &mut [ApDelayLine; AP_LINKS],
    phi: Cplx,
    q: &[Cplx; AP_LINKS],
    gain: &[f32; MAX_SLOTS],
    slope: f32,
    out: &mut [Cplx; MAX_SLOTS],
    slots: usize,
) {
    let ag: [f32; AP_LINKS] = std::array::from_fn(|m| AP_GAIN[m] * slope);
    for n in 0..slots {
        let d = line[n + MAX_DELAY - 2];
        let mut in_re = d[0] * phi[0] - d[1] * phi[1];
        let mut in_im = d[0] * phi[1] + d[1] * phi[0];
        for m in 0..AP_LINKS {
            let a_re = ag[m] * in_re;
            let a_im = ag[m] * in_im;
            let link = ap[m][n + 2 - m];
            let apd_re = in_re;
            let apd_im = in_im;
            in_re = link[0] * q[m][0] - link[1] * q[m][1] - a_re;
            in_im = link[0] * q[m][1] + link[1] * q[m][0] - a_im;
            ap[m][n + MAX_AP_DELAY] = [apd_re + ag[m] * in_re, apd_im + ag[m] * in_im];
        }
        out[n] = [gain[n] * in_re, gain[n] * in_im];
    }
}
