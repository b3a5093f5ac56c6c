//! PS 边信息写入.
//!
//! 按与解码相同的语法和码本把一帧参数编码成码流, 并跟踪与解码端一致的跨帧状态,
//! 使时间方向差分引用上一帧最后一个包络.

use tao_core::bitwriter::BitWriter;
use tao_core::{TaoError, TaoResult};

use super::config::PsConfig;
use super::delta::{ValueRange, deltas};
use super::header::PsHeader;
use super::huffman::{ParamKind, PsCodebook, codebook};
use super::tables::{MAX_IPDOPD_BANDS, MAX_PAR_BANDS};

/// 差分方向选择
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeltaPolicy {
    /// 每行选码长较短的方向
    #[default]
    Auto,
    Frequency,
    Time,
}

/// 一个包络的参数, 按码流分辨率给出 (粗分辨率 IID/ICC 为 10 个值)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeDesc {
    pub iid: Vec<i32>,
    pub icc: Vec<i32>,
    pub ipd: Vec<i32>,
    pub opd: Vec<i32>,
}

/// 一帧的描述
#[derive(Debug, Clone, Default)]
pub struct FrameDesc {
    /// 本帧携带的头部, None 表示沿用上一个头部
    pub header: Option<PsHeader>,
    /// 可变边界 (每个包络的最后一个时隙), None 时使用均匀划分
    pub borders: Option<Vec<u8>>,
    pub envelopes: Vec<EnvelopeDesc>,
    /// 是否在扩展中传输 IPD/OPD
    pub phase: bool,
    pub policy: DeltaPolicy,
}

/// 编码结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrame {
    pub data: Vec<u8>,
    /// 有效位数
    pub bits: usize,
}

/// 跨帧状态: 当前头部与上一帧最后一个包络的参数
#[derive(Debug, Clone)]
struct WriterState {
    header: PsHeader,
    iid: [i32; MAX_PAR_BANDS],
    icc: [i32; MAX_PAR_BANDS],
    ipd: [i32; MAX_IPDOPD_BANDS],
    opd: [i32; MAX_IPDOPD_BANDS],
}

/// PS 边信息写入器
#[derive(Debug, Clone)]
pub struct PsWriter {
    slots: usize,
    state: WriterState,
}

impl PsWriter {
    pub fn new(config: &PsConfig) -> TaoResult<Self> {
        config.validate()?;
        Ok(Self {
            slots: config.slots_per_frame,
            state: WriterState {
                header: PsHeader::default(),
                iid: [0; MAX_PAR_BANDS],
                icc: [0; MAX_PAR_BANDS],
                ipd: [0; MAX_IPDOPD_BANDS],
                opd: [0; MAX_IPDOPD_BANDS],
            },
        })
    }

    /// 当前生效的头部
    pub fn header(&self) -> &PsHeader {
        &self.state.header
    }

    /// 编码一帧, 出错时状态不变
    pub fn write_frame(&mut self, frame: &FrameDesc) -> TaoResult<EncodedFrame> {
        let mut state = self.state.clone();
        let mut bw = BitWriter::new();

        bw.write_bool(frame.header.is_some());
        if let Some(header) = frame.header {
            header.write(&mut bw);
            state.header = header;
        }
        let header = state.header;
        let n = frame.envelopes.len();
        self.write_layout(&mut bw, frame, n)?;

        if header.iid_enabled() {
            let (coded, stride) = header.iid_coding();
            let fine = header.fine_iid();
            let rows: Vec<&[i32]> = frame.envelopes.iter().map(|e| e.iid.as_slice()).collect();
            let coding = (ParamKind::Iid, fine, coded, stride);
            write_rows(&mut bw, coding, &rows, &mut state.iid, frame.policy)?;
        } else {
            state.iid = [0; MAX_PAR_BANDS];
        }
        if header.icc_enabled() {
            let (coded, stride) = header.icc_coding();
            let rows: Vec<&[i32]> = frame.envelopes.iter().map(|e| e.icc.as_slice()).collect();
            let coding = (ParamKind::Icc, false, coded, stride);
            write_rows(&mut bw, coding, &rows, &mut state.icc, frame.policy)?;
        } else {
            state.icc = [0; MAX_PAR_BANDS];
        }

        if frame.phase && !header.ext_enabled() {
            return Err(TaoError::InvalidArgument(
                "PS: 相位参数需要在头部启用扩展".into(),
            ));
        }
        if header.ext_enabled() {
            let mut ext = BitWriter::new();
            ext.write_bits(0, 2); // extension_id
            ext.write_bool(frame.phase);
            if frame.phase {
                let coded = header.ipdopd_bands();
                let ipd = (ParamKind::Ipd, false, coded, 1);
                let opd = (ParamKind::Opd, false, coded, 1);
                for env in &frame.envelopes {
                    write_rows(&mut ext, ipd, &[env.ipd.as_slice()], &mut state.ipd, frame.policy)?;
                    write_rows(&mut ext, opd, &[env.opd.as_slice()], &mut state.opd, frame.policy)?;
                }
            }
            ext.write_bit(0); // reserved_ps
            let cnt = ext.bits_written().div_ceil(8);
            if cnt < 15 {
                bw.write_bits(cnt as u32, 4);
            } else {
                bw.write_bits(15, 4);
                bw.write_bits((cnt - 15) as u32, 8);
            }
            bw.append(&ext);
            bw.write_bits(0, (cnt * 8 - ext.bits_written()) as u32);
        }
        if !frame.phase {
            state.ipd = [0; MAX_IPDOPD_BANDS];
            state.opd = [0; MAX_IPDOPD_BANDS];
        }

        // 没有包络时解码端沿用上一帧的最后一个包络 (按本帧范围钳位)
        if n == 0 {
            let iid_bands = header.iid_bands();
            let icc_bands = header.icc_bands();
            ValueRange::of(ParamKind::Iid, header.fine_iid()).apply_row(&mut state.iid[..iid_bands]);
            ValueRange::of(ParamKind::Icc, false).apply_row(&mut state.icc[..icc_bands]);
        }

        let bits = bw.bits_written();
        self.state = state;
        Ok(EncodedFrame {
            data: bw.finish(),
            bits,
        })
    }

    /// 写包络类型、包络数与边界
    fn write_layout(&self, bw: &mut BitWriter, frame: &FrameDesc, n: usize) -> TaoResult<()> {
        let class = usize::from(frame.borders.is_some());
        let idx = match (class, n) {
            (0, 0) => 0,
            (0, 1) | (1, 2) => 1,
            (0, 2) | (1, 3) => 2,
            (_, 4) => 3,
            (1, 1) => 0,
            _ => {
                return Err(TaoError::InvalidArgument(format!(
                    "PS: {} 划分不支持 {} 个包络",
                    if class == 1 { "可变" } else { "均匀" },
                    n
                )));
            }
        };
        bw.write_bits(class as u32, 1);
        bw.write_bits(idx, 2);
        if let Some(borders) = &frame.borders {
            if borders.len() != n {
                return Err(TaoError::InvalidArgument(format!(
                    "PS: 边界数 {} 与包络数 {} 不一致",
                    borders.len(),
                    n
                )));
            }
            let mut prev = -1i32;
            for &b in borders {
                if i32::from(b) <= prev || usize::from(b) >= self.slots {
                    return Err(TaoError::InvalidArgument(format!(
                        "PS: 包络边界 {:?} 非递增或超出帧长",
                        borders
                    )));
                }
                prev = i32::from(b);
                bw.write_bits(u32::from(b), 5);
            }
        }
        Ok(())
    }
}

/// (参数种类, 精细量化, 码流频带数, 步长)
type RowCoding = (ParamKind, bool, usize, usize);

/// 写若干包络的一种参数, 并把最后一行 (展开后) 存入 `last`
fn write_rows<const N: usize>(
    bw: &mut BitWriter,
    (kind, fine, coded, stride): RowCoding,
    rows: &[&[i32]],
    last: &mut [i32; N],
    policy: DeltaPolicy,
) -> TaoResult<()> {
    let range = ValueRange::of(kind, fine);
    for values in rows {
        if values.len() != coded {
            return Err(TaoError::InvalidArgument(format!(
                "PS: {:?} 需要 {} 个值, 实际 {} 个",
                kind,
                coded,
                values.len()
            )));
        }
        if let Some(v) = values.iter().find(|&&v| !range.contains(v)) {
            return Err(TaoError::InvalidArgument(format!(
                "PS: {:?} 值 {} 超出范围",
                kind, v
            )));
        }

        let (df, dt) = deltas(kind, values, &last[..], stride);
        let df_book = codebook(kind, fine, false);
        let dt_book = codebook(kind, fine, true);
        let cost = |book: &PsCodebook, d: &[i32]| -> Option<u32> {
            d.iter().map(|&v| book.code_len(v)).sum()
        };
        let time_delta = match policy {
            DeltaPolicy::Frequency => false,
            DeltaPolicy::Time => true,
            DeltaPolicy::Auto => match (cost(df_book, &df), cost(dt_book, &dt)) {
                (Some(f), Some(t)) => t < f,
                (None, Some(_)) => true,
                _ => false,
            },
        };
        bw.write_bool(time_delta);
        let (book, symbols) = if time_delta { (dt_book, &dt) } else { (df_book, &df) };
        for &d in symbols {
            book.encode(bw, d)?;
        }
        for (i, &v) in values.iter().enumerate() {
            last[i * stride..(i + 1) * stride].fill(v);
        }
    }
    Ok(())
}
