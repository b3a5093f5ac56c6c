//! PS 常量、频带分辨率描述与运行时生成的查找表.
//!
//! 混合矩阵、分数延迟相位因子、IPD/OPD 平滑表和混合滤波器组系数
//! 都只依赖常数, 首次使用时生成一次, 之后只读共享.

use std::f64::consts::{FRAC_1_SQRT_2, PI, SQRT_2};
use std::sync::OnceLock;

/// 复数样本 `[实部, 虚部]`
pub type Cplx = [f32; 2];

/// QMF 子带数
pub const QMF_BANDS: usize = 64;
/// 每帧最大 QMF 时隙数
pub const MAX_SLOTS: usize = 32;
/// 混合分析需要的历史/前瞻时隙数
pub const HYBRID_HISTORY: usize = 6;
/// 输入 QMF 缓冲每个子带的时隙容量 (帧内时隙 + 前瞻)
pub const QMF_BUFFER_SLOTS: usize = MAX_SLOTS + HYBRID_HISTORY;
/// 每帧最大包络数 (含补齐的尾包络)
pub const MAX_ENVELOPES: usize = 5;
/// 最大参数频带数
pub const MAX_PAR_BANDS: usize = 34;
/// 最大相位参数频带数
pub const MAX_IPDOPD_BANDS: usize = 17;
/// 最大混合子带数
pub const MAX_HYBRID_BANDS: usize = 91;
/// 去相关延迟线的最大延迟
pub const MAX_DELAY: usize = 14;
/// 全通链路的最大延迟
pub const MAX_AP_DELAY: usize = 5;
/// 全通链路级数
pub const AP_LINKS: usize = 3;
/// 最大全通子带数
pub const MAX_ALLPASS_BANDS: usize = 50;

/// QMF 域缓冲: `[子带][时隙]`, 每个子带带 6 个前瞻时隙
pub type QmfBuffer = [[Cplx; QMF_BUFFER_SLOTS]; QMF_BANDS];
/// 混合域缓冲: `[混合子带][时隙]`
pub type HybridBuffer = [[Cplx; MAX_SLOTS]; MAX_HYBRID_BANDS];

/// 创建清零的 QMF 缓冲
pub fn new_qmf_buffer() -> Box<QmfBuffer> {
    Box::new([[[0.0; 2]; QMF_BUFFER_SLOTS]; QMF_BANDS])
}

pub(crate) fn new_hybrid_buffer() -> Box<HybridBuffer> {
    Box::new([[[0.0; 2]; MAX_SLOTS]; MAX_HYBRID_BANDS])
}

// ============================================================
// 频带分辨率
// ============================================================

/// 参数频带分辨率
///
/// 20 带与 34 带两套布局共用同一条处理流水线, 差异全部由这里给出的常数表体现.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BandResolution {
    /// 20 个参数频带 / 71 个混合子带
    #[default]
    Bands20,
    /// 34 个参数频带 / 91 个混合子带
    Bands34,
}

impl BandResolution {
    pub fn from_use34(use34: bool) -> Self {
        if use34 { Self::Bands34 } else { Self::Bands20 }
    }

    pub fn is_34(self) -> bool {
        self == Self::Bands34
    }

    /// 参数频带数
    pub const fn par_bands(self) -> usize {
        match self {
            Self::Bands20 => 20,
            Self::Bands34 => 34,
        }
    }

    /// 参与相位旋转的参数频带数
    pub const fn ipdopd_bands(self) -> usize {
        match self {
            Self::Bands20 => 11,
            Self::Bands34 => 17,
        }
    }

    /// 混合子带数
    pub const fn hybrid_bands(self) -> usize {
        match self {
            Self::Bands20 => 71,
            Self::Bands34 => 91,
        }
    }

    /// 走全通级联的混合子带数
    pub const fn allpass_bands(self) -> usize {
        match self {
            Self::Bands20 => 30,
            Self::Bands34 => 50,
        }
    }

    /// 使用 14 样本长延迟的子带上界 (不含)
    pub const fn short_delay_band(self) -> usize {
        match self {
            Self::Bands20 => 42,
            Self::Bands34 => 62,
        }
    }

    /// 全通衰减开始下降的子带
    pub const fn decay_cutoff(self) -> usize {
        match self {
            Self::Bands20 => 10,
            Self::Bands34 => 32,
        }
    }

    /// 被拆分的低端 QMF 子带数
    pub const fn split_qmf_bands(self) -> usize {
        match self {
            Self::Bands20 => 3,
            Self::Bands34 => 5,
        }
    }

    /// 混合子带 → 参数频带映射
    pub fn band_to_par(self) -> &'static [u8] {
        match self {
            Self::Bands20 => &K_TO_I_20,
            Self::Bands34 => &K_TO_I_34,
        }
    }

    /// 混合矩阵虚部需要取反的混合子带
    pub fn is_phase_inverted(self, k: usize) -> bool {
        match self {
            Self::Bands20 => k <= 1,
            Self::Bands34 => (9..=13).contains(&k),
        }
    }
}

const K_TO_I_20: [u8; 71] = [
    1, 0, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 15, 15, 16, 16, 16, 16, 17, 17, 17,
    17, 17, 18, 18, 18, 18, 18, 18, 18, 18, 18, 18, 18, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19,
    19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19, 19,
];

const K_TO_I_34: [u8; 91] = [
    0, 1, 2, 3, 4, 5, 6, 6, 7, 2, 1, 0, 10, 10, 4, 5, 6, 7, 8, 9, 10, 11, 12, 9, 14, 11, 12, 13, 14,
    15, 16, 13, 16, 17, 18, 19, 20, 21, 22, 22, 23, 23, 24, 24, 25, 25, 26, 26, 27, 27, 27, 28, 28,
    28, 29, 29, 29, 30, 30, 30, 31, 31, 31, 31, 32, 32, 32, 32, 33, 33, 33, 33, 33, 33, 33, 33, 33,
    33, 33, 33, 33, 33, 33, 33, 33, 33, 33, 33, 33, 33, 33,
];

// ============================================================
// 量化常数
// ============================================================

/// ICC 反量化值 (相关系数 ρ)
const ICC_INVQ: [f64; 8] = [1.0, 0.937, 0.84118, 0.60092, 0.36764, 0.0, -0.589, -1.0];

/// acos(ICC 反量化值)
const ACOS_ICC_INVQ: [f64; 8] = [
    0.0,
    0.35685527,
    0.57133466,
    0.92614472,
    1.1943263,
    PI / 2.0,
    2.2006171,
    PI,
];

/// IID 反量化值 10^(iid/20): 前 15 项为默认量化, 后 31 项为精细量化
const IID_INVQ: [f64; 46] = [
    0.05623413251903, 0.12589254117942, 0.19952623149689, 0.31622776601684, 0.44668359215096,
    0.63095734448019, 0.79432823472428, 1.0, 1.25892541179417, 1.58489319246111, 2.23872113856834,
    3.16227766016838, 5.01187233627272, 7.94328234724282, 17.7827941003892,
    0.00316227766017, 0.00562341325190, 0.01, 0.01778279410039, 0.03162277660168,
    0.05623413251903, 0.07943282347243, 0.11220184543020, 0.15848931924611, 0.22387211385683,
    0.31622776601684, 0.39810717055350, 0.50118723362727, 0.63095734448019, 0.79432823472428,
    1.0, 1.25892541179417, 1.58489319246111, 1.99526231496888, 2.51188643150958,
    3.16227766016838, 4.46683592150963, 6.30957344480193, 8.91250938133745, 12.5892541179417,
    17.7827941003892, 31.6227766016838, 56.2341325190349, 100.0, 177.827941003892,
    316.227766016837,
];

/// 混合矩阵 LUT 的行数
pub const MIX_LUT_ROWS: usize = 46;

/// 混合矩阵 LUT 行号: 默认量化 IID ∈ [-7, 7], 精细量化 IID ∈ [-15, 15]
pub fn mix_lut_row(iid: i32, fine: bool) -> usize {
    let row = iid + 7 + if fine { 23 } else { 0 };
    row.clamp(0, MIX_LUT_ROWS as i32 - 1) as usize
}

/// 分数延迟相位因子增益
const Q_PHI: f64 = 0.39;
/// 三级全通链路的分数延迟
const Q_LINK: [f64; AP_LINKS] = [0.43, 0.75, 0.347];

/// 20 带模式前 10 个全通子带的中心频率
const F_CENTER_20: [f64; 10] = [-3.0, -1.0, 1.0, 3.0, 5.0, 7.0, 10.0, 14.0, 18.0, 22.0];
/// 34 带模式前 32 个全通子带的中心频率 (单位 1/24)
const F_CENTER_34: [f64; 32] = [
    2.0, 6.0, 10.0, 14.0, 18.0, 22.0, 26.0, 30.0, 34.0, -10.0, -6.0, -2.0, 51.0, 57.0, 15.0, 21.0,
    27.0, 33.0, 39.0, 45.0, 54.0, 66.0, 78.0, 42.0, 102.0, 66.0, 78.0, 90.0, 102.0, 114.0, 126.0,
    90.0,
];

const IPDOPD_COS: [f64; 8] = [
    1.0,
    FRAC_1_SQRT_2,
    0.0,
    -FRAC_1_SQRT_2,
    -1.0,
    -FRAC_1_SQRT_2,
    0.0,
    FRAC_1_SQRT_2,
];
const IPDOPD_SIN: [f64; 8] = [
    0.0,
    FRAC_1_SQRT_2,
    1.0,
    FRAC_1_SQRT_2,
    0.0,
    -FRAC_1_SQRT_2,
    -1.0,
    -FRAC_1_SQRT_2,
];

// ============================================================
// 混合滤波器组原型
// ============================================================

const G0_Q8: [f64; 7] = [
    0.00746082949812,
    0.02270420949825,
    0.04546865930473,
    0.07266113929591,
    0.09885108575264,
    0.11793710567217,
    0.125,
];

const G0_Q12: [f64; 7] = [
    0.04081179924692,
    0.03812810994926,
    0.05144908135699,
    0.06399831151592,
    0.07428313801106,
    0.08100347892914,
    0.08333333333333,
];

const G1_Q8: [f64; 7] = [
    0.01565675600122,
    0.03752716391991,
    0.05417891378782,
    0.08417044116767,
    0.10307344158036,
    0.12222452249753,
    0.125,
];

const G2_Q4: [f64; 7] = [
    -0.05908211155639,
    -0.04871498374946,
    0.0,
    0.07778723915851,
    0.16486303567403,
    0.23279856662996,
    0.25,
];

/// 两路实数拆分滤波器 (对称, 奇数位为零)
pub const G1_Q2: [f32; 7] = [
    0.0,
    0.01899487526049,
    0.0,
    -0.07293139167538,
    0.0,
    0.30596630545168,
    0.5,
];

/// 复数拆分滤波器: `[输出子带][抽头 0..7]`, 抽头 6 为中心
pub type SplitFilter<const N: usize> = [[Cplx; 7]; N];

// ============================================================
// 表生成
// ============================================================

/// 运行时生成的全部 PS 查找表
pub struct PsTables {
    /// 混合过程 A: `[iid 行][icc][h11, h12, h21, h22]`
    pub mix_a: [[[f32; 4]; 8]; MIX_LUT_ROWS],
    /// 混合过程 B
    pub mix_b: [[[f32; 4]; 8]; MIX_LUT_ROWS],
    /// 20 带模式全通输入相位因子
    pub phi_fract_20: [Cplx; 30],
    /// 20 带模式各全通链路的分数延迟
    pub q_fract_20: [[Cplx; AP_LINKS]; 30],
    pub phi_fract_34: [Cplx; MAX_ALLPASS_BANDS],
    pub q_fract_34: [[Cplx; AP_LINKS]; MAX_ALLPASS_BANDS],
    /// IPD/OPD 平滑后的单位相量, 按 `前前 * 64 + 前 * 8 + 当前` 索引
    pub pd_smooth: [Cplx; 512],
    /// 20 带模式 QMF 子带 0 的 8 路拆分
    pub f20_0_8: SplitFilter<8>,
    /// 34 带模式 QMF 子带 0 的 12 路拆分
    pub f34_0_12: SplitFilter<12>,
    /// 34 带模式 QMF 子带 1 的 8 路拆分
    pub f34_1_8: SplitFilter<8>,
    /// 34 带模式 QMF 子带 2..4 的 4 路拆分
    pub f34_2_4: SplitFilter<4>,
}

static PS_TABLES: OnceLock<Box<PsTables>> = OnceLock::new();

/// 获取 PS 查找表 (首次调用时生成)
pub fn ps_tables() -> &'static PsTables {
    PS_TABLES.get_or_init(|| {
        let mut tables = Box::new(PsTables {
            mix_a: [[[0.0; 4]; 8]; MIX_LUT_ROWS],
            mix_b: [[[0.0; 4]; 8]; MIX_LUT_ROWS],
            phi_fract_20: [[0.0; 2]; 30],
            q_fract_20: [[[0.0; 2]; AP_LINKS]; 30],
            phi_fract_34: [[0.0; 2]; MAX_ALLPASS_BANDS],
            q_fract_34: [[[0.0; 2]; AP_LINKS]; MAX_ALLPASS_BANDS],
            pd_smooth: [[0.0; 2]; 512],
            f20_0_8: make_filter(&G0_Q8),
            f34_0_12: make_filter(&G0_Q12),
            f34_1_8: make_filter(&G1_Q8),
            f34_2_4: make_filter(&G2_Q4),
        });
        fill_mix_tables(&mut tables.mix_a, &mut tables.mix_b);
        fill_fract_tables(
            &mut tables.phi_fract_20,
            &mut tables.q_fract_20,
            |k| F_CENTER_20.get(k).map_or(k as f64 - 6.5, |&f| f * 0.125),
        );
        fill_fract_tables(
            &mut tables.phi_fract_34,
            &mut tables.q_fract_34,
            |k| F_CENTER_34.get(k).map_or(k as f64 - 26.5, |&f| f / 24.0),
        );
        fill_pd_smooth(&mut tables.pd_smooth);
        tables
    })
}

fn fill_mix_tables(
    mix_a: &mut [[[f32; 4]; 8]; MIX_LUT_ROWS],
    mix_b: &mut [[[f32; 4]; 8]; MIX_LUT_ROWS],
) {
    for (row, &c) in IID_INVQ.iter().enumerate() {
        let c1 = SQRT_2 / (1.0 + c * c).sqrt();
        let c2 = c * c1;
        for icc in 0..8 {
            // 过程 A: 旋转角由 ICC 决定, 再按 IID 不对称分配
            let alpha = 0.5 * ACOS_ICC_INVQ[icc];
            let beta = alpha * (c1 - c2) / SQRT_2;
            mix_a[row][icc] = [
                (c2 * (alpha + beta).cos()) as f32,
                (c1 * (beta - alpha).cos()) as f32,
                (c2 * (alpha + beta).sin()) as f32,
                (c1 * (beta - alpha).sin()) as f32,
            ];

            // 过程 B
            let rho = ICC_INVQ[icc].max(0.05);
            let mut alpha = if c == 1.0 {
                PI / 4.0
            } else {
                0.5 * (2.0 * c * rho).atan2(c * c - 1.0)
            };
            if alpha < 0.0 {
                alpha += PI / 2.0;
            }
            let mu = c + 1.0 / c;
            let mu = (1.0 + (4.0 * rho * rho - 4.0) / (mu * mu)).sqrt();
            let gamma = ((1.0 - mu) / (1.0 + mu)).sqrt().atan();
            let (alpha_s, alpha_c) = alpha.sin_cos();
            let (gamma_s, gamma_c) = gamma.sin_cos();
            mix_b[row][icc] = [
                (SQRT_2 * alpha_c * gamma_c) as f32,
                (SQRT_2 * alpha_s * gamma_c) as f32,
                (-SQRT_2 * alpha_s * gamma_s) as f32,
                (SQRT_2 * alpha_c * gamma_s) as f32,
            ];
        }
    }
}

fn fill_fract_tables(phi: &mut [Cplx], q: &mut [[Cplx; AP_LINKS]], f_center: impl Fn(usize) -> f64) {
    for (k, (phi_k, q_k)) in phi.iter_mut().zip(q.iter_mut()).enumerate() {
        let fk = f_center(k);
        let theta = -PI * Q_PHI * fk;
        *phi_k = [theta.cos() as f32, theta.sin() as f32];
        for (m, q_km) in q_k.iter_mut().enumerate() {
            let theta = -PI * Q_LINK[m] * fk;
            *q_km = [theta.cos() as f32, theta.sin() as f32];
        }
    }
}

fn fill_pd_smooth(table: &mut [Cplx; 512]) {
    for i in 0..8 {
        for j in 0..8 {
            for k in 0..8 {
                let re = 0.25 * IPDOPD_COS[i] + 0.5 * IPDOPD_COS[j] + IPDOPD_COS[k];
                let im = 0.25 * IPDOPD_SIN[i] + 0.5 * IPDOPD_SIN[j] + IPDOPD_SIN[k];
                let mag = 1.0 / (re * re + im * im).sqrt();
                table[i * 64 + j * 8 + k] = [(re * mag) as f32, (im * mag) as f32];
            }
        }
    }
}

/// 由实数原型生成 N 路复调制拆分滤波器
fn make_filter<const N: usize>(proto: &[f64; 7]) -> SplitFilter<N> {
    let mut filter = [[[0.0f32; 2]; 7]; N];
    for (q, taps) in filter.iter_mut().enumerate() {
        for (n, tap) in taps.iter_mut().enumerate() {
            let theta = 2.0 * PI * (q as f64 + 0.5) * (n as f64 - 6.0) / N as f64;
            *tap = [
                (proto[n] * theta.cos()) as f32,
                (-proto[n] * theta.sin()) as f32,
            ];
        }
    }
    filter
}
