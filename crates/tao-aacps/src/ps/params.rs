//! 参数帧: 包络划分与各包络的 IID/ICC/IPD/OPD 绝对值.

use log::{debug, trace, warn};
use tao_core::TaoResult;
use tao_core::bitreader::BitReader;

use super::config::HuffmanStyle;
use super::delta::{ValueRange, reconstruct};
use super::header::PsHeader;
use super::huffman::{ParamKind, codebook};
use super::remap::remap;
use super::tables::{BandResolution, MAX_ENVELOPES, MAX_IPDOPD_BANDS, MAX_PAR_BANDS};

/// 包络数表 `[frame_class][num_env_idx]`
const ENVELOPE_COUNTS: [[usize; 4]; 2] = [[0, 1, 2, 4], [1, 2, 3, 4]];

type ParRow = [i32; MAX_PAR_BANDS];
type PhaseRow = [i32; MAX_IPDOPD_BANDS];

/// 一帧解码后的参数
///
/// 行按码流分辨率存放 (粗分辨率已展开为 20 带), 供下一帧时间差分引用.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterFrame {
    env_count: usize,
    /// 包络边界, `borders[0] = -1`, `borders[e + 1]` 为包络 e 的最后一个时隙
    borders: [i32; MAX_ENVELOPES + 1],
    iid: [ParRow; MAX_ENVELOPES],
    icc: [ParRow; MAX_ENVELOPES],
    ipd: [PhaseRow; MAX_ENVELOPES],
    opd: [PhaseRow; MAX_ENVELOPES],
    iid_bands: usize,
    icc_bands: usize,
    ipdopd_bands: usize,
    phase: bool,
    use34: bool,
    fine: bool,
    mixing_b: bool,
}

impl ParameterFrame {
    /// 单个覆盖整帧的中性包络
    pub fn new(slots: usize) -> Self {
        Self {
            env_count: 1,
            borders: neutral_borders(slots),
            iid: [[0; MAX_PAR_BANDS]; MAX_ENVELOPES],
            icc: [[0; MAX_PAR_BANDS]; MAX_ENVELOPES],
            ipd: [[0; MAX_IPDOPD_BANDS]; MAX_ENVELOPES],
            opd: [[0; MAX_IPDOPD_BANDS]; MAX_ENVELOPES],
            iid_bands: 20,
            icc_bands: 20,
            ipdopd_bands: 11,
            phase: false,
            use34: false,
            fine: false,
            mixing_b: false,
        }
    }

    /// 清零全部参数, 退回单个中性包络, 保留频带布局
    pub(crate) fn reset_neutral(&mut self, slots: usize) {
        *self = Self {
            iid_bands: self.iid_bands,
            icc_bands: self.icc_bands,
            ipdopd_bands: self.ipdopd_bands,
            use34: self.use34,
            fine: self.fine,
            mixing_b: self.mixing_b,
            ..Self::new(slots)
        };
    }

    /// 包络数 (含补齐的尾包络)
    pub fn env_count(&self) -> usize {
        self.env_count
    }

    /// 包络边界 `[-1, b1, .., slots - 1]`
    pub fn borders(&self) -> &[i32] {
        &self.borders[..=self.env_count]
    }

    /// 包络 `env` 的 IID 值
    pub fn iid(&self, env: usize) -> &[i32] {
        &self.iid[env][..self.iid_bands]
    }

    pub fn icc(&self, env: usize) -> &[i32] {
        &self.icc[env][..self.icc_bands]
    }

    /// 包络 `env` 的 IPD 值, 未启用相位参数时为空
    pub fn ipd(&self, env: usize) -> &[i32] {
        if self.phase {
            &self.ipd[env][..self.ipdopd_bands]
        } else {
            &[]
        }
    }

    pub fn opd(&self, env: usize) -> &[i32] {
        if self.phase {
            &self.opd[env][..self.ipdopd_bands]
        } else {
            &[]
        }
    }

    /// 本帧是否携带 IPD/OPD
    pub fn phase_enabled(&self) -> bool {
        self.phase
    }

    pub fn resolution(&self) -> BandResolution {
        BandResolution::from_use34(self.use34)
    }

    /// 解析一帧参数 (头部之后的部分)
    ///
    /// 出错时 `self` 可能只更新了一部分, 调用方应在副本上解析.
    pub(crate) fn parse(
        &mut self,
        header: &PsHeader,
        br: &mut BitReader,
        slots: usize,
        style: HuffmanStyle,
    ) -> TaoResult<()> {
        let prev_env_count = self.env_count;
        let frame_class = br.read_bit()? as usize;
        self.env_count = ENVELOPE_COUNTS[frame_class][br.read_bits(2)? as usize];
        self.read_borders(br, frame_class == 1, slots)?;

        // 时间差分的首个参考为上一帧最后一个包络
        let last = prev_env_count.checked_sub(1);
        let prev_iid = last.map_or([0; MAX_PAR_BANDS], |e| self.iid[e]);
        let prev_icc = last.map_or([0; MAX_PAR_BANDS], |e| self.icc[e]);
        let prev_ipd = last.map_or([0; MAX_IPDOPD_BANDS], |e| self.ipd[e]);
        let prev_opd = last.map_or([0; MAX_IPDOPD_BANDS], |e| self.opd[e]);

        self.iid_bands = header.iid_bands();
        self.icc_bands = header.icc_bands();
        self.ipdopd_bands = header.ipdopd_bands();
        self.fine = header.fine_iid();
        self.mixing_b = header.mixing_b();
        let mut violations = 0;

        if header.iid_enabled() {
            let (coded, stride) = header.iid_coding();
            let mut prev = prev_iid;
            for e in 0..self.env_count {
                let coding = RowCoding::new(ParamKind::Iid, self.fine, coded, stride);
                violations += coding.read(br, style, &prev, &mut self.iid[e])?;
                prev = self.iid[e];
            }
        } else {
            self.iid = [[0; MAX_PAR_BANDS]; MAX_ENVELOPES];
        }

        if header.icc_enabled() {
            let (coded, stride) = header.icc_coding();
            let mut prev = prev_icc;
            for e in 0..self.env_count {
                let coding = RowCoding::new(ParamKind::Icc, false, coded, stride);
                violations += coding.read(br, style, &prev, &mut self.icc[e])?;
                prev = self.icc[e];
            }
        } else {
            self.icc = [[0; MAX_PAR_BANDS]; MAX_ENVELOPES];
        }

        self.phase = false;
        if header.ext_enabled() {
            let mut cnt = br.read_bits(4)? as usize;
            if cnt == 15 {
                cnt += br.read_bits(8)? as usize;
            }
            let mut left = cnt * 8;
            while left > 7 {
                let id = br.read_bits(2)?;
                left -= 2;
                let used = if id == 0 {
                    self.read_ipdopd(br, style, &prev_ipd, &prev_opd, &mut violations)?
                } else {
                    0
                };
                if used > left {
                    warn!("PS: 扩展数据 {} 位超出剩余声明长度 {} 位", used, left);
                    self.phase = false;
                    left = 0;
                    break;
                }
                left -= used;
            }
            br.skip_bits(left)?;
        }

        violations += self.fix_up_envelopes(header, prev_env_count, slots);

        if !self.phase {
            self.ipd = [[0; MAX_IPDOPD_BANDS]; MAX_ENVELOPES];
            self.opd = [[0; MAX_IPDOPD_BANDS]; MAX_ENVELOPES];
        }
        if let Some(use34) = header.use34() {
            self.use34 = use34;
        }
        if violations > 0 {
            debug!("PS: {} 个参数超出范围, 已钳位", violations);
        }
        trace!(
            "PS: {} 个包络, 边界 {:?}, 相位 {}",
            self.env_count,
            self.borders(),
            self.phase
        );
        Ok(())
    }

    fn read_borders(&mut self, br: &mut BitReader, variable: bool, slots: usize) -> TaoResult<()> {
        let n = self.env_count;
        self.borders[0] = -1;
        if variable {
            let mut valid = true;
            for e in 1..=n {
                let border = br.read_bits(5)? as i32;
                valid &= border > self.borders[e - 1] && border < slots as i32;
                self.borders[e] = border;
            }
            if valid {
                return Ok(());
            }
            warn!(
                "PS: 包络边界 {:?} 非递增或超出帧长, 改用均匀划分",
                &self.borders[1..=n]
            );
        }
        for e in 1..=n {
            self.borders[e] = (e * slots / n) as i32 - 1;
        }
        Ok(())
    }

    /// 读取扩展 0 (IPD/OPD), 返回消耗的位数
    fn read_ipdopd(
        &mut self,
        br: &mut BitReader,
        style: HuffmanStyle,
        prev_ipd: &PhaseRow,
        prev_opd: &PhaseRow,
        violations: &mut usize,
    ) -> TaoResult<usize> {
        let start = br.bits_read();
        self.phase = br.read_bool()?;
        if self.phase {
            let mut prev = (*prev_ipd, *prev_opd);
            for e in 0..self.env_count {
                let ipd = RowCoding::new(ParamKind::Ipd, false, self.ipdopd_bands, 1);
                *violations += ipd.read(br, style, &prev.0, &mut self.ipd[e])?;
                let opd = RowCoding::new(ParamKind::Opd, false, self.ipdopd_bands, 1);
                *violations += opd.read(br, style, &prev.1, &mut self.opd[e])?;
                prev = (self.ipd[e], self.opd[e]);
            }
        }
        // reserved_ps
        br.skip_bits(1)?;
        Ok(br.bits_read() - start)
    }

    /// 包络数为 0 或最后边界不在帧尾时, 补一个以帧尾结束的包络
    fn fix_up_envelopes(&mut self, header: &PsHeader, prev_env_count: usize, slots: usize) -> usize {
        let last_slot = slots as i32 - 1;
        let n = self.env_count;
        if n > 0 && self.borders[n] >= last_slot {
            return 0;
        }
        if n == 0 {
            warn!("PS: 包络数为 0, 沿用上一帧最后一个包络");
        }
        let source = if n > 0 {
            Some(n - 1)
        } else {
            prev_env_count.checked_sub(1)
        };
        match source {
            Some(src) if src != n => {
                if header.iid_enabled() {
                    self.iid[n] = self.iid[src];
                }
                if header.icc_enabled() {
                    self.icc[n] = self.icc[src];
                }
                if self.phase {
                    self.ipd[n] = self.ipd[src];
                    self.opd[n] = self.opd[src];
                }
            }
            Some(_) => {}
            None => {
                self.iid[n] = [0; MAX_PAR_BANDS];
                self.icc[n] = [0; MAX_PAR_BANDS];
                self.ipd[n] = [0; MAX_IPDOPD_BANDS];
                self.opd[n] = [0; MAX_IPDOPD_BANDS];
            }
        }

        // 沿用的上一帧数值可能超出本帧的量化范围
        let violations = ValueRange::of(ParamKind::Iid, self.fine)
            .apply_row(&mut self.iid[n][..self.iid_bands])
            + ValueRange::of(ParamKind::Icc, false).apply_row(&mut self.icc[n][..self.icc_bands]);

        self.env_count = n + 1;
        self.borders[n + 1] = last_slot;
        violations
    }

    /// 映射到处理分辨率
    pub fn mapped(&self) -> MappedParams {
        let res = self.resolution();
        let mut m = MappedParams::neutral(res, 0);
        m.env_count = self.env_count;
        m.borders = self.borders;
        m.fine = self.fine;
        m.mixing_b = self.mixing_b;
        m.phase = self.phase;

        let par = res.par_bands();
        let pd = res.ipdopd_bands();
        for e in 0..self.env_count {
            remap(&mut m.iid[e][..par], &self.iid[e][..self.iid_bands], true);
            remap(&mut m.icc[e][..par], &self.icc[e][..self.icc_bands], true);
            if self.phase {
                remap(&mut m.ipd[e][..pd], &self.ipd[e][..self.ipdopd_bands], false);
                remap(&mut m.opd[e][..pd], &self.opd[e][..self.ipdopd_bands], false);
            }
        }
        m
    }
}

fn neutral_borders(slots: usize) -> [i32; MAX_ENVELOPES + 1] {
    let mut borders = [0; MAX_ENVELOPES + 1];
    borders[0] = -1;
    borders[1] = slots as i32 - 1;
    borders
}

/// 一行参数的编码方式
struct RowCoding {
    kind: ParamKind,
    fine: bool,
    coded: usize,
    stride: usize,
}

impl RowCoding {
    fn new(kind: ParamKind, fine: bool, coded: usize, stride: usize) -> Self {
        Self {
            kind,
            fine,
            coded,
            stride,
        }
    }

    /// 读方向位与差分码并重建一行, 返回钳位个数
    fn read<const N: usize>(
        &self,
        br: &mut BitReader,
        style: HuffmanStyle,
        prev: &[i32; N],
        out: &mut [i32; N],
    ) -> TaoResult<usize> {
        let time_delta = br.read_bool()?;
        let mut raw = [0i32; N];
        codebook(self.kind, self.fine, time_delta).decode_into(br, style, &mut raw[..self.coded])?;
        Ok(reconstruct(
            self.kind,
            self.fine,
            time_delta,
            &raw[..self.coded],
            prev,
            self.stride,
            out,
        ))
    }
}

/// 映射到处理分辨率后的参数, 供立体声混合使用
#[derive(Debug, Clone, PartialEq)]
pub struct MappedParams {
    pub resolution: BandResolution,
    pub env_count: usize,
    pub borders: [i32; MAX_ENVELOPES + 1],
    pub iid: [ParRow; MAX_ENVELOPES],
    pub icc: [ParRow; MAX_ENVELOPES],
    pub ipd: [PhaseRow; MAX_ENVELOPES],
    pub opd: [PhaseRow; MAX_ENVELOPES],
    /// IID 精细量化
    pub fine: bool,
    /// 混合过程 B
    pub mixing_b: bool,
    pub phase: bool,
}

impl MappedParams {
    /// 单个覆盖 `slots` 个时隙的中性包络
    pub fn neutral(resolution: BandResolution, slots: usize) -> Self {
        Self {
            resolution,
            env_count: 1,
            borders: neutral_borders(slots),
            iid: [[0; MAX_PAR_BANDS]; MAX_ENVELOPES],
            icc: [[0; MAX_PAR_BANDS]; MAX_ENVELOPES],
            ipd: [[0; MAX_IPDOPD_BANDS]; MAX_ENVELOPES],
            opd: [[0; MAX_IPDOPD_BANDS]; MAX_ENVELOPES],
            fine: false,
            mixing_b: false,
            phase: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ps::header::PsFeatures;
    use tao_core::bitwriter::BitWriter;

    fn parse_bits(frame: &mut ParameterFrame, header: &PsHeader, bw: BitWriter) -> usize {
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        frame.parse(header, &mut br, 32, HuffmanStyle::Tree).unwrap();
        br.bits_read()
    }

    #[test]
    fn test_固定边界() {
        let header = PsHeader::default();
        let mut frame = ParameterFrame::new(32);
        let mut bw = BitWriter::new();
        bw.write_bit(0); // frame_class
        bw.write_bits(3, 2); // 4 个包络
        assert_eq!(parse_bits(&mut frame, &header, bw), 3);
        assert_eq!(frame.borders(), &[-1, 7, 15, 23, 31]);
        assert_eq!(frame.env_count(), 4);
    }

    #[test]
    fn test_非递增边界回退为均匀划分() {
        let header = PsHeader::default();
        let mut frame = ParameterFrame::new(32);
        let mut bw = BitWriter::new();
        bw.write_bit(1);
        bw.write_bits(1, 2); // 2 个包络
        bw.write_bits(20, 5);
        bw.write_bits(10, 5);
        parse_bits(&mut frame, &header, bw);
        assert_eq!(frame.borders(), &[-1, 15, 31]);
    }

    #[test]
    fn test_末边界不在帧尾时补包络() {
        let header = PsHeader::new(PsFeatures::ICC, 1, 1).unwrap();
        let mut frame = ParameterFrame::new(32);
        let mut bw = BitWriter::new();
        bw.write_bit(1);
        bw.write_bits(0, 2); // 1 个包络
        bw.write_bits(9, 5);
        // ICC: 频率方向, 20 个差分 +1, 0, ...
        bw.write_bit(0);
        let book = codebook(ParamKind::Icc, false, false);
        book.encode(&mut bw, 1).unwrap();
        for _ in 1..20 {
            book.encode(&mut bw, 0).unwrap();
        }
        parse_bits(&mut frame, &header, bw);
        assert_eq!(frame.env_count(), 2);
        assert_eq!(frame.borders(), &[-1, 9, 31]);
        assert_eq!(frame.icc(1), frame.icc(0));
        assert!(frame.icc(1).iter().all(|&v| v == 1));
        assert!(frame.iid(1).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_未知扩展按长度跳过() {
        let header = PsHeader::new(PsFeatures::EXT, 0, 0).unwrap();
        let mut frame = ParameterFrame::new(32);
        let mut bw = BitWriter::new();
        bw.write_bit(0);
        bw.write_bits(1, 2);
        bw.write_bits(2, 4); // 2 字节扩展
        bw.write_bits(1, 2); // extension_id = 1
        bw.write_bits(0x3FFF, 14);
        assert_eq!(parse_bits(&mut frame, &header, bw), 3 + 4 + 16);
        assert!(!frame.phase_enabled());
        assert!(frame.ipd(0).is_empty());
    }

    #[test]
    fn test_映射到34带() {
        let header = PsHeader::new(PsFeatures::IID | PsFeatures::ICC, 0, 2).unwrap();
        let mut frame = ParameterFrame::new(32);
        let mut bw = BitWriter::new();
        bw.write_bit(0);
        bw.write_bits(1, 2);
        // IID 10 带: 首带 +2, 其余 0
        bw.write_bit(0);
        let iid = codebook(ParamKind::Iid, false, false);
        iid.encode(&mut bw, 2).unwrap();
        for _ in 1..10 {
            iid.encode(&mut bw, 0).unwrap();
        }
        // ICC 34 带全 0
        bw.write_bit(0);
        let icc = codebook(ParamKind::Icc, false, false);
        for _ in 0..34 {
            icc.encode(&mut bw, 0).unwrap();
        }
        parse_bits(&mut frame, &header, bw);
        assert_eq!(frame.resolution(), BandResolution::Bands34);
        assert_eq!(frame.iid(0).len(), 20);
        assert!(frame.iid(0).iter().all(|&v| v == 2));

        let m = frame.mapped();
        assert_eq!(m.resolution, BandResolution::Bands34);
        assert!(m.iid[0].iter().all(|&v| v == 2));
        assert_eq!(m.env_count, 1);
    }

    #[test]
    fn test_10带相位参数映射到34带() {
        let features = PsFeatures::IID | PsFeatures::ICC | PsFeatures::EXT;
        let header = PsHeader::new(features, 0, 2).unwrap();
        let mut frame = ParameterFrame::new(32);
        let mut bw = BitWriter::new();
        bw.write_bit(0);
        bw.write_bits(1, 2);
        bw.write_bit(0);
        let iid = codebook(ParamKind::Iid, false, false);
        for _ in 0..10 {
            iid.encode(&mut bw, 0).unwrap();
        }
        bw.write_bit(0);
        let icc = codebook(ParamKind::Icc, false, false);
        for _ in 0..34 {
            icc.encode(&mut bw, 0).unwrap();
        }

        // 扩展 0: IPD 频率差分全为 +1, OPD 全为 0
        let mut ext = BitWriter::new();
        ext.write_bits(0, 2);
        ext.write_bit(1);
        ext.write_bit(0);
        let ipd = codebook(ParamKind::Ipd, false, false);
        for _ in 0..5 {
            ipd.encode(&mut ext, 1).unwrap();
        }
        ext.write_bit(0);
        let opd = codebook(ParamKind::Opd, false, false);
        for _ in 0..5 {
            opd.encode(&mut ext, 0).unwrap();
        }
        ext.write_bit(0); // reserved_ps
        let cnt = ext.bits_written().div_ceil(8);
        bw.write_bits(cnt as u32, 4);
        bw.append(&ext);
        bw.write_bits(0, (cnt * 8 - ext.bits_written()) as u32);
        let total = bw.bits_written();

        assert_eq!(parse_bits(&mut frame, &header, bw), total);
        assert!(frame.phase_enabled());
        assert_eq!(frame.ipd(0), &[1, 2, 3, 4, 5]);
        assert_eq!(frame.opd(0), &[0; 5]);

        let m = frame.mapped();
        assert_eq!(m.resolution, BandResolution::Bands34);
        assert!(m.phase);
        assert_eq!(m.ipd[0], [1, 1, 1, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 5, 5, 0]);
        assert_eq!(m.opd[0], [0; MAX_IPDOPD_BANDS]);
    }
}
