//! 立体声混合.
//!
//! 每个包络每个参数频带由 IID/ICC 查表得到 2×2 混合矩阵, 有相位参数时再按
//! IPD/OPD 旋转成复矩阵. 矩阵在包络内逐时隙线性插值, 作用于
//! (单声道信号, 去相关信号) 得到左右声道.

use log::debug;

use super::params::MappedParams;
use super::remap::remap;
use super::tables::{
    BandResolution, Cplx, HybridBuffer, MAX_ENVELOPES, MAX_IPDOPD_BANDS, MAX_PAR_BANDS,
    mix_lut_row, ps_tables,
};

/// 一组矩阵系数在各参数频带上的实部与虚部
#[derive(Debug, Clone, Copy, PartialEq)]
struct MatrixBands {
    re: [f32; MAX_PAR_BANDS],
    im: [f32; MAX_PAR_BANDS],
}

impl MatrixBands {
    const ZERO: Self = Self {
        re: [0.0; MAX_PAR_BANDS],
        im: [0.0; MAX_PAR_BANDS],
    };
}

/// h11, h12, h21, h22
const COEFFS: usize = 4;

/// 立体声混合器状态
pub struct StereoMixer {
    /// `[系数][包络边界]`, 边界 0 为上一帧最后的矩阵
    h: [[MatrixBands; MAX_ENVELOPES + 1]; COEFFS],
    /// 每个相位频带最近两个 IPD 码值 (各 3 位)
    ipd_hist: [u8; MAX_IPDOPD_BANDS],
    opd_hist: [u8; MAX_IPDOPD_BANDS],
    /// 已保存矩阵对应的频带分辨率
    resolution: Option<BandResolution>,
    /// 上一帧的包络数
    last_env_count: usize,
}

impl Default for StereoMixer {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoMixer {
    pub fn new() -> Self {
        Self {
            h: [[MatrixBands::ZERO; MAX_ENVELOPES + 1]; COEFFS],
            ipd_hist: [0; MAX_IPDOPD_BANDS],
            opd_hist: [0; MAX_IPDOPD_BANDS],
            resolution: None,
            last_env_count: 0,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// 把参数作用到混合域信号
    ///
    /// `l` 输入单声道信号并输出左声道, `r` 输入去相关信号并输出右声道.
    pub fn apply(&mut self, params: &MappedParams, l: &mut HybridBuffer, r: &mut HybridBuffer) {
        let res = params.resolution;
        self.carry_over(res);
        self.build_matrices(params);

        let k_to_i = res.band_to_par();
        for e in 0..params.env_count {
            let start = params.borders[e];
            let stop = params.borders[e + 1];
            if stop <= start {
                continue;
            }
            let width = 1.0 / (stop - start) as f32;
            for k in 0..res.hybrid_bands() {
                let b = k_to_i[k] as usize;
                let mut h = [[0.0f32; COEFFS]; 2];
                let mut step = [[0.0f32; COEFFS]; 2];
                let invert = params.phase && res.is_phase_inverted(k);
                for c in 0..COEFFS {
                    h[0][c] = self.h[c][e].re[b];
                    step[0][c] = (self.h[c][e + 1].re[b] - h[0][c]) * width;
                    if params.phase {
                        let im = self.h[c][e].im[b];
                        h[1][c] = if invert { -im } else { im };
                        step[1][c] = (self.h[c][e + 1].im[b] - h[1][c]) * width;
                    }
                }
                let span = (start + 1) as usize..=stop as usize;
                if params.phase {
                    interpolate_complex(&mut l[k], &mut r[k], h, step, span);
                } else {
                    interpolate_real(&mut l[k], &mut r[k], h[0], step[0], span);
                }
            }
        }
        self.last_env_count = params.env_count;
    }

    /// 上一帧最后的矩阵作为本帧起点, 分辨率变化时先映射到新分辨率
    fn carry_over(&mut self, res: BandResolution) {
        if self.last_env_count > 0 {
            let last = self.last_env_count;
            for coeff in self.h.iter_mut() {
                coeff[0] = coeff[last];
            }
        }
        if self.resolution == Some(res) {
            return;
        }
        if let Some(prev) = self.resolution {
            debug!("PS: 混合矩阵从 {:?} 映射到 {:?}", prev, res);
            let from = prev.par_bands();
            let to = res.par_bands();
            for coeff in self.h.iter_mut() {
                let src = coeff[0];
                remap(&mut coeff[0].re[..to], &src.re[..from], true);
                remap(&mut coeff[0].im[..to], &src.im[..from], true);
            }
        }
        self.ipd_hist = [0; MAX_IPDOPD_BANDS];
        self.opd_hist = [0; MAX_IPDOPD_BANDS];
        self.resolution = Some(res);
    }

    /// 计算每个包络结束处的矩阵, 存到边界 e + 1
    fn build_matrices(&mut self, params: &MappedParams) {
        let t = ps_tables();
        let lut = if params.mixing_b { &t.mix_b } else { &t.mix_a };
        let res = params.resolution;
        let ipdopd_bands = res.ipdopd_bands();
        for e in 0..params.env_count {
            for b in 0..res.par_bands() {
                let row = mix_lut_row(params.iid[e][b], params.fine);
                let icc = params.icc[e][b].clamp(0, 7) as usize;
                let [h11, h12, h21, h22] = lut[row][icc];
                let (re, im) = if params.phase && b < ipdopd_bands {
                    let opd = self.smoothed_phase(b, params.opd[e][b], true);
                    let ipd = self.smoothed_phase(b, params.ipd[e][b], false);
                    // IPD 相对 OPD 的相位
                    let adj = [
                        opd[0] * ipd[0] + opd[1] * ipd[1],
                        opd[1] * ipd[0] - opd[0] * ipd[1],
                    ];
                    (
                        [h11 * opd[0], h12 * adj[0], h21 * opd[0], h22 * adj[0]],
                        [h11 * opd[1], h12 * adj[1], h21 * opd[1], h22 * adj[1]],
                    )
                } else {
                    ([h11, h12, h21, h22], [0.0; COEFFS])
                };
                for c in 0..COEFFS {
                    self.h[c][e + 1].re[b] = re[c];
                    self.h[c][e + 1].im[b] = im[c];
                }
            }
        }
    }

    /// 结合最近两个码值查平滑相量, 并更新历史
    fn smoothed_phase(&mut self, band: usize, value: i32, overall: bool) -> Cplx {
        let hist = if overall {
            &mut self.opd_hist[band]
        } else {
            &mut self.ipd_hist[band]
        };
        let idx = usize::from(*hist) * 8 + (value & 7) as usize;
        *hist = (idx & 0x3F) as u8;
        ps_tables().pd_smooth[idx]
    }
}

fn interpolate_real(
    l: &mut [Cplx],
    r: &mut [Cplx],
    mut h: [f32; COEFFS],
    step: [f32; COEFFS],
    span: std::ops::RangeInclusive<usize>,
) {
    for n in span {
        for c in 0..COEFFS {
            h[c] += step[c];
        }
        let s = l[n];
        let d = r[n];
        l[n] = [h[0] * s[0] + h[2] * d[0], h[0] * s[1] + h[2] * d[1]];
        r[n] = [h[1] * s[0] + h[3] * d[0], h[1] * s[1] + h[3] * d[1]];
    }
}

fn interpolate_complex(
    l: &mut [Cplx],
    r: &mut [Cplx],
    mut h: [[f32; COEFFS]; 2],
    step: [[f32; COEFFS]; 2],
    span: std::ops::RangeInclusive<usize>,
) {
    for n in span {
        for part in 0..2 {
            for c in 0..COEFFS {
                h[part][c] += step[part][c];
            }
        }
        let [hr, hi] = h;
        let s = l[n];
        let d = r[n];
        l[n] = [
            hr[0] * s[0] + hr[2] * d[0] - hi[0] * s[1] - hi[2] * d[1],
            hr[0] * s[1] + hr[2] * d[1] + hi[0] * s[0] + hi[2] * d[0],
        ];
        r[n] = [
            hr[1] * s[0] + hr[3] * d[0] - hi[1] * s[1] - hi[3] * d[1],
            hr[1] * s[1] + hr[3] * d[1] + hi[1] * s[0] + hi[3] * d[0],
        ];
    }
}
