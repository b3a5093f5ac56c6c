//! MPEG-4 AAC 参数立体声 (Parametric Stereo) 解码.
//!
//! 由单声道下混信号和少量空间参数重建立体声.
//!
//! # 每帧流程
//! 1. [`ParametricStereo::decode`] 解析边信息: 头部, 包络划分, IID/ICC 与扩展中的 IPD/OPD
//! 2. [`ParametricStereo::process`] 在 QMF 域处理:
//!    - 混合分析: 低端 QMF 子带再细分
//!    - 去相关: 生成环境声信号
//!    - 立体声混合: 按插值后的 2×2 矩阵合成左右声道
//!    - 混合合成: 回到 64 个 QMF 子带
//!
//! `decode` 与 `process` 每帧严格交替调用. 在收到第一个带头部的帧之前,
//! `process` 只把单声道复制到右声道.

pub mod config;
mod decorrelate;
mod delta;
pub mod header;
pub mod huffman;
mod huffman_tables;
mod hybrid;
pub mod params;
pub mod remap;
mod stereo;
pub mod tables;
pub mod writer;


use log::{debug, warn};
use tao_core::bitreader::BitReader;
use tao_core::{TaoError, TaoResult};

pub use config::{HuffmanStyle, PsConfig};
pub use decorrelate::Decorrelator;
pub use header::{PsFeatures, PsHeader};
pub use hybrid::HybridFilterbank;
pub use params::{MappedParams, ParameterFrame};
pub use stereo::StereoMixer;
pub use tables::{BandResolution, Cplx, QmfBuffer, new_qmf_buffer};
pub use writer::{DeltaPolicy, EncodedFrame, EnvelopeDesc, FrameDesc, PsWriter};

use tables::{HybridBuffer, new_hybrid_buffer};

/// 参数立体声解码器
///
/// 每个实例对应一路单声道→立体声流, 实例之间不共享可变状态.
pub struct ParametricStereo {
    config: PsConfig,
    header: PsHeader,
    params: ParameterFrame,
    /// 本帧是否带头部
    has_header: bool,
    /// 是否已收到过有效头部
    started: bool,
    hybrid: HybridFilterbank,
    decorrelator: Decorrelator,
    mixer: StereoMixer,
    l_buf: Box<HybridBuffer>,
    r_buf: Box<HybridBuffer>,
}

impl Default for ParametricStereo {
    fn default() -> Self {
        let config = PsConfig::default();
        Self::with_valid_config(config)
    }
}

impl ParametricStereo {
    /// 创建解码器, 配置非法时返回 [`TaoError::InvalidArgument`]
    pub fn new(config: PsConfig) -> TaoResult<Self> {
        config.validate()?;
        Ok(Self::with_valid_config(config))
    }

    fn with_valid_config(config: PsConfig) -> Self {
        Self {
            config,
            header: PsHeader::default(),
            params: ParameterFrame::new(config.slots_per_frame),
            has_header: false,
            started: false,
            hybrid: HybridFilterbank::new(),
            decorrelator: Decorrelator::new(),
            mixer: StereoMixer::new(),
            l_buf: new_hybrid_buffer(),
            r_buf: new_hybrid_buffer(),
        }
    }

    pub fn config(&self) -> &PsConfig {
        &self.config
    }

    /// 当前生效的头部
    pub fn header(&self) -> &PsHeader {
        &self.header
    }

    /// 当前保存的参数
    pub fn params(&self) -> &ParameterFrame {
        &self.params
    }

    /// 当前参数对应的处理分辨率
    pub fn resolution(&self) -> BandResolution {
        self.params.resolution()
    }

    /// 最近一次 `decode` 的帧是否带头部
    pub fn has_header(&self) -> bool {
        self.has_header
    }

    /// 是否已收到有效头部 (否则 `process` 输出单声道)
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// 解析一帧 PS 边信息
    ///
    /// `payload_bits` 为外层声明的边信息长度. 正常时返回实际消耗的位数;
    /// 遇到保留模式或读取超出声明长度时跳过整个载荷, 参数退回中性并回到单声道输出,
    /// 返回 `payload_bits`. 码流提前结束时返回 [`TaoError::Eof`], 解码器状态与
    /// `br` 的位置都保持不变.
    pub fn decode(&mut self, br: &mut BitReader, payload_bits: usize) -> TaoResult<usize> {
        let mut probe = br.clone();
        let start = probe.bits_read();
        let mut header = self.header;
        let mut params = self.params.clone();

        match self.parse_frame(&mut probe, &mut header, &mut params) {
            Ok(has_header) => {
                let consumed = probe.bits_read() - start;
                if consumed <= payload_bits {
                    br.skip_bits(consumed)?;
                    self.commit(header, params, has_header);
                    return Ok(consumed);
                }
                warn!(
                    "PS: 载荷声明 {} 位, 实际读取 {} 位, 丢弃本帧参数",
                    payload_bits, consumed
                );
            }
            Err(TaoError::InvalidData(msg)) => {
                warn!("PS: {}, 跳过 {} 位载荷", msg, payload_bits);
            }
            Err(e) => return Err(e),
        }

        br.skip_bits(payload_bits)?;
        self.params.reset_neutral(self.config.slots_per_frame);
        self.has_header = false;
        self.started = false;
        Ok(payload_bits)
    }

    fn parse_frame(
        &self,
        br: &mut BitReader,
        header: &mut PsHeader,
        params: &mut ParameterFrame,
    ) -> TaoResult<bool> {
        let has_header = br.read_bool()?;
        if has_header {
            *header = header.read(br)?;
        }
        params.parse(
            header,
            br,
            self.config.slots_per_frame,
            self.config.huffman_style,
        )?;
        Ok(has_header)
    }

    fn commit(&mut self, header: PsHeader, params: ParameterFrame, has_header: bool) {
        if header != self.header {
            debug!(
                "PS: 头部更新 {:?}, iid_mode={}, icc_mode={}",
                header.features, header.iid_mode, header.icc_mode
            );
        }
        if params.resolution() != self.params.resolution() {
            debug!("PS: 参数分辨率切换为 {:?}", params.resolution());
        }
        self.header = header;
        self.params = params;
        self.has_header = has_header;
        if has_header {
            self.started = true;
        }
    }

    /// 对一帧 QMF 信号做参数立体声处理
    ///
    /// `left` 输入单声道 (每个子带 `slots + 6` 个时隙, 含前瞻) 并输出左声道,
    /// `right` 输出右声道. 只写前 `slots` 个时隙.
    pub fn process(&mut self, left: &mut QmfBuffer, right: &mut QmfBuffer) {
        if !self.started {
            self.pass_through(left, right);
            return;
        }
        let slots = self.config.slots_per_frame;
        let mapped = self.params.mapped();
        let res = mapped.resolution;

        self.hybrid.analyze(left, &mut self.l_buf, res, slots);
        self.decorrelator
            .decorrelate(&self.l_buf, &mut self.r_buf, res, slots);
        self.mixer.apply(&mapped, &mut self.l_buf, &mut self.r_buf);
        HybridFilterbank::synthesize(&self.l_buf, left, res, slots);
        HybridFilterbank::synthesize(&self.r_buf, right, res, slots);
    }

    /// 单声道直通: 右声道复制左声道的前 `slots` 个时隙
    pub fn pass_through(&self, left: &QmfBuffer, right: &mut QmfBuffer) {
        let slots = self.config.slots_per_frame;
        for (r, l) in right.iter_mut().zip(left.iter()) {
            r[..slots].copy_from_slice(&l[..slots]);
        }
    }

    /// 回到初始状态 (清空全部参数与滤波器状态), 用于 seek 或重新配置
    pub fn flush(&mut self) {
        *self = Self::with_valid_config(self.config);
    }
}
