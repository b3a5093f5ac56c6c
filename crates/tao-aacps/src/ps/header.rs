//! PS 头部.

use bitflags::bitflags;
use tao_core::bitreader::BitReader;
use tao_core::bitwriter::BitWriter;
use tao_core::{TaoError, TaoResult};

bitflags! {
    /// 头部启用的参数种类
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PsFeatures: u8 {
        /// 强度差 (IID)
        const IID = 1;
        /// 相关性 (ICC)
        const ICC = 2;
        /// 扩展数据 (IPD/OPD 在扩展中传输)
        const EXT = 4;
    }
}

/// IID/ICC 模式对应的参数频带数
const PAR_BANDS: [usize; 6] = [10, 20, 34, 10, 20, 34];
/// IID 模式对应的相位参数频带数
const IPDOPD_BANDS: [usize; 6] = [5, 11, 17, 5, 11, 17];

/// PS 头部
///
/// 头部只在部分帧出现, 未出现时沿用上一次的值.
/// 某种参数未启用时其模式保持上次的值.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PsHeader {
    pub features: PsFeatures,
    /// IID 模式 0-5: 频带数 10/20/34, 3 以上为精细量化
    pub iid_mode: u8,
    /// ICC 模式 0-5: 频带数 10/20/34, 3 以上使用混合过程 B
    pub icc_mode: u8,
}

impl PsHeader {
    /// 构造头部, 模式超出 0-5 时返回错误
    pub fn new(features: PsFeatures, iid_mode: u8, icc_mode: u8) -> TaoResult<Self> {
        for (name, mode) in [("iid_mode", iid_mode), ("icc_mode", icc_mode)] {
            if usize::from(mode) >= PAR_BANDS.len() {
                return Err(TaoError::InvalidArgument(format!(
                    "PS: {} {} 超出范围 0-5",
                    name, mode
                )));
            }
        }
        Ok(Self {
            features,
            iid_mode,
            icc_mode,
        })
    }

    /// 读取头部内容 (`enable_ps_header` 之后的部分)
    ///
    /// 保留模式 6/7 返回 [`TaoError::InvalidData`].
    pub fn read(&self, br: &mut BitReader) -> TaoResult<Self> {
        let mut header = Self {
            features: PsFeatures::empty(),
            ..*self
        };
        if br.read_bool()? {
            header.features |= PsFeatures::IID;
            header.iid_mode = read_mode(br, "iid_mode")?;
        }
        if br.read_bool()? {
            header.features |= PsFeatures::ICC;
            header.icc_mode = read_mode(br, "icc_mode")?;
        }
        if br.read_bool()? {
            header.features |= PsFeatures::EXT;
        }
        Ok(header)
    }

    /// 写入头部内容 (不含 `enable_ps_header`)
    pub fn write(&self, bw: &mut BitWriter) {
        bw.write_bool(self.iid_enabled());
        if self.iid_enabled() {
            bw.write_bits(u32::from(self.iid_mode), 3);
        }
        bw.write_bool(self.icc_enabled());
        if self.icc_enabled() {
            bw.write_bits(u32::from(self.icc_mode), 3);
        }
        bw.write_bool(self.ext_enabled());
    }

    pub fn iid_enabled(&self) -> bool {
        self.features.contains(PsFeatures::IID)
    }

    pub fn icc_enabled(&self) -> bool {
        self.features.contains(PsFeatures::ICC)
    }

    pub fn ext_enabled(&self) -> bool {
        self.features.contains(PsFeatures::EXT)
    }

    /// IID 频带数 (展开后, 10 带模式按 20 带存放)
    pub fn iid_bands(&self) -> usize {
        PAR_BANDS[usize::from(self.iid_mode)].max(20)
    }

    pub fn icc_bands(&self) -> usize {
        PAR_BANDS[usize::from(self.icc_mode)].max(20)
    }

    /// IID 码流中的频带数与步长
    pub fn iid_coding(&self) -> (usize, usize) {
        coding(self.iid_mode)
    }

    pub fn icc_coding(&self) -> (usize, usize) {
        coding(self.icc_mode)
    }

    /// 相位参数频带数
    pub fn ipdopd_bands(&self) -> usize {
        IPDOPD_BANDS[usize::from(self.iid_mode)]
    }

    /// IID 是否为精细量化
    pub fn fine_iid(&self) -> bool {
        self.iid_mode > 2
    }

    /// 是否使用混合过程 B
    pub fn mixing_b(&self) -> bool {
        self.icc_mode > 2
    }

    /// 已启用的参数中是否有 34 带分辨率, 两者都未启用时返回 None
    pub fn use34(&self) -> Option<bool> {
        if !self.iid_enabled() && !self.icc_enabled() {
            return None;
        }
        Some(
            (self.iid_enabled() && PAR_BANDS[usize::from(self.iid_mode)] == 34)
                || (self.icc_enabled() && PAR_BANDS[usize::from(self.icc_mode)] == 34),
        )
    }
}

fn coding(mode: u8) -> (usize, usize) {
    let bands = PAR_BANDS[usize::from(mode)];
    if bands == 10 { (10, 2) } else { (bands, 1) }
}

fn read_mode(br: &mut BitReader, name: &str) -> TaoResult<u8> {
    let mode = br.read_bits(3)? as u8;
    if usize::from(mode) >= PAR_BANDS.len() {
        return Err(TaoError::InvalidData(format!(
            "PS: {} {} 为保留值",
            name, mode
        )));
    }
    Ok(mode)
}
