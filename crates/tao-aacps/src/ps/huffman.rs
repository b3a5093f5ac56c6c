//! PS 参数 Huffman 解码.
//!
//! 每个码本既可以逐位走二叉树解码, 也可以按规范码长表解码,
//! 两种结构都由同一份 (码字, 码长) 数据在首次使用时构建.

use std::sync::OnceLock;

use tao_core::bitreader::BitReader;
use tao_core::bitwriter::BitWriter;
use tao_core::{TaoError, TaoResult};

use super::config::HuffmanStyle;
use super::huffman_tables::*;

/// 参数种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// 声道间强度差
    Iid,
    /// 声道间相关性
    Icc,
    /// 声道间相位差
    Ipd,
    /// 总体相位差
    Opd,
}

// ============================================================
// 规范码长表
// ============================================================

#[derive(Debug, Clone, Copy)]
struct CanonicalRow {
    len: u32,
    code: u32,
    symbol: usize,
}

fn build_rows(codes: &[u32], bits: &[u8]) -> Vec<CanonicalRow> {
    let mut rows: Vec<CanonicalRow> = codes
        .iter()
        .zip(bits)
        .enumerate()
        .map(|(symbol, (&code, &len))| CanonicalRow {
            len: u32::from(len),
            code,
            symbol,
        })
        .collect();
    rows.sort_by_key(|r| (r.len, r.code));
    rows
}

/// 先读入最短码长, 与当前行比较, 不匹配时扩展到下一行的码长继续比较
fn decode_rows(rows: &[CanonicalRow], br: &mut BitReader) -> TaoResult<usize> {
    let Some(first) = rows.first() else {
        return Err(TaoError::InvalidData("PS: 空 Huffman 码表".into()));
    };
    let mut len = first.len;
    let mut cw = br.read_bits(len)?;
    for row in rows {
        if row.len > len {
            let extra = row.len - len;
            cw = (cw << extra) | br.read_bits(extra)?;
            len = row.len;
        }
        if cw == row.code {
            return Ok(row.symbol);
        }
    }
    Err(TaoError::InvalidData("PS: 未匹配的 Huffman 码字".into()))
}

// ============================================================
// Huffman 二叉树
// ============================================================

/// 节点的一个分支
#[derive(Debug, Clone, Copy)]
enum Link {
    Empty,
    Node(u16),
    Leaf(u16),
}

/// 由规范码表插入生成的二叉树, 解码时逐位下行
struct HuffTree {
    links: Vec<[Link; 2]>,
    /// 码本中最长码字的位数
    max_len: u32,
}

impl HuffTree {
    /// 按码长顺序逐行插入: 码字除最低位外沿途建分支, 最低位挂叶子
    fn from_rows(rows: &[CanonicalRow]) -> Self {
        let mut links = vec![[Link::Empty; 2]];
        for row in rows {
            let mut node = 0usize;
            for depth in 1..row.len {
                let bit = ((row.code >> (row.len - depth)) & 1) as usize;
                node = match links[node][bit] {
                    Link::Node(next) => usize::from(next),
                    _ => {
                        let next = links.len();
                        links.push([Link::Empty; 2]);
                        links[node][bit] = Link::Node(next as u16);
                        next
                    }
                };
            }
            links[node][(row.code & 1) as usize] = Link::Leaf(row.symbol as u16);
        }
        Self {
            links,
            max_len: rows.last().map_or(0, |r| r.len),
        }
    }

    fn decode(&self, br: &mut BitReader) -> TaoResult<usize> {
        let mut node = 0usize;
        for _ in 0..self.max_len {
            match self.links[node][br.read_bit()? as usize] {
                Link::Leaf(symbol) => return Ok(usize::from(symbol)),
                Link::Node(next) => node = usize::from(next),
                Link::Empty => break,
            }
        }
        Err(TaoError::InvalidData("PS: Huffman 码字不在码本中".into()))
    }
}

// ============================================================
// 码本
// ============================================================

/// PS 参数码本
pub struct PsCodebook {
    name: &'static str,
    codes: &'static [u32],
    bits: &'static [u8],
    /// 符号索引 0 对应的值
    min_value: i32,
    /// 触发扩展读取的幅度 (AAC ESC 方式)
    escape: Option<i32>,
    tree: OnceLock<HuffTree>,
    rows: OnceLock<Vec<CanonicalRow>>,
}

impl PsCodebook {
    pub const fn new(
        name: &'static str,
        codes: &'static [u32],
        bits: &'static [u8],
        min_value: i32,
    ) -> Self {
        Self {
            name,
            codes,
            bits,
            min_value,
            escape: None,
            tree: OnceLock::new(),
            rows: OnceLock::new(),
        }
    }

    /// 启用 ESC 扩展: 解码幅度等于 `magnitude` 时继续读取一元前缀 + 尾数
    pub const fn with_escape(mut self, magnitude: i32) -> Self {
        self.escape = Some(magnitude);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 按 (码长, 码字) 排序的码表
    fn rows(&self) -> &[CanonicalRow] {
        self.rows.get_or_init(|| build_rows(self.codes, self.bits))
    }

    fn tree(&self) -> &HuffTree {
        self.tree.get_or_init(|| HuffTree::from_rows(self.rows()))
    }

    /// 可直接编码的值范围 (不含 ESC 扩展)
    pub fn value_range(&self) -> (i32, i32) {
        (self.min_value, self.min_value + self.codes.len() as i32 - 1)
    }

    /// 解码一个值
    pub fn decode(&self, br: &mut BitReader, style: HuffmanStyle) -> TaoResult<i32> {
        let symbol = match style {
            HuffmanStyle::Tree => self.tree().decode(br)?,
            HuffmanStyle::Canonical => decode_rows(self.rows(), br)?,
        };
        let value = symbol as i32 + self.min_value;
        match self.escape {
            Some(esc) if value.abs() == esc => {
                let magnitude = read_escape(br)?;
                Ok(if value < 0 { -magnitude } else { magnitude })
            }
            _ => Ok(value),
        }
    }

    /// 解码 `out.len()` 个值
    pub fn decode_into(
        &self,
        br: &mut BitReader,
        style: HuffmanStyle,
        out: &mut [i32],
    ) -> TaoResult<()> {
        for v in out.iter_mut() {
            *v = self.decode(br, style)?;
        }
        Ok(())
    }

    /// 写入一个值的码字
    pub fn encode(&self, bw: &mut BitWriter, value: i32) -> TaoResult<()> {
        let (lo, hi) = self.value_range();
        let (coded, escaped) = match self.escape {
            Some(esc) if value.abs() >= esc => (esc * value.signum(), Some(value.abs())),
            _ => (value, None),
        };
        if coded < lo || coded > hi {
            return Err(TaoError::InvalidArgument(format!(
                "PS: 值 {} 超出码本 {} 的范围 [{}, {}]",
                value, self.name, lo, hi
            )));
        }
        let symbol = (coded - lo) as usize;
        bw.write_bits(self.codes[symbol], u32::from(self.bits[symbol]));
        if let Some(magnitude) = escaped {
            write_escape(bw, magnitude)?;
        }
        Ok(())
    }

    /// 值的码字长度 (不含 ESC 扩展), 超出范围时返回 None
    pub fn code_len(&self, value: i32) -> Option<u32> {
        let (lo, hi) = self.value_range();
        (lo..=hi)
            .contains(&value)
            .then(|| u32::from(self.bits[(value - lo) as usize]))
    }
}

/// 读取 ESC 扩展 (一元前缀决定尾数位数, 起始 4 位)
fn read_escape(br: &mut BitReader) -> TaoResult<i32> {
    let n = 4 + br.read_unary(0, 11)?;
    let mantissa = br.read_bits(n)? as i32;
    Ok((1 << n) + mantissa)
}

fn write_escape(bw: &mut BitWriter, magnitude: i32) -> TaoResult<()> {
    if !(16..1 << 16).contains(&magnitude) {
        return Err(TaoError::InvalidArgument(format!(
            "PS: ESC 幅度 {} 超出范围",
            magnitude
        )));
    }
    let n = 31 - (magnitude as u32).leading_zeros();
    bw.write_unary(n - 4, 0);
    bw.write_bits(magnitude as u32 - (1 << n), n);
    Ok(())
}

static IID_FINE_DF_BOOK: PsCodebook =
    PsCodebook::new("iid_fine_df", &CODES_IID_FINE_DF, &BITS_IID_FINE_DF, -30);
static IID_FINE_DT_BOOK: PsCodebook =
    PsCodebook::new("iid_fine_dt", &CODES_IID_FINE_DT, &BITS_IID_FINE_DT, -30);
static IID_DF_BOOK: PsCodebook = PsCodebook::new("iid_df", &CODES_IID_DF, &BITS_IID_DF, -14);
static IID_DT_BOOK: PsCodebook = PsCodebook::new("iid_dt", &CODES_IID_DT, &BITS_IID_DT, -14);
static ICC_DF_BOOK: PsCodebook = PsCodebook::new("icc_df", &CODES_ICC_DF, &BITS_ICC_DF, -7);
static ICC_DT_BOOK: PsCodebook = PsCodebook::new("icc_dt", &CODES_ICC_DT, &BITS_ICC_DT, -7);
static IPD_DF_BOOK: PsCodebook = PsCodebook::new("ipd_df", &CODES_IPD_DF, &BITS_IPD_DF, 0);
static IPD_DT_BOOK: PsCodebook = PsCodebook::new("ipd_dt", &CODES_IPD_DT, &BITS_IPD_DT, 0);
static OPD_DF_BOOK: PsCodebook = PsCodebook::new("opd_df", &CODES_OPD_DF, &BITS_OPD_DF, 0);
static OPD_DT_BOOK: PsCodebook = PsCodebook::new("opd_dt", &CODES_OPD_DT, &BITS_OPD_DT, 0);

/// 按 (参数种类, 量化精度, 差分方向) 选择码本
///
/// `fine` 只对 IID 有意义.
pub fn codebook(kind: ParamKind, fine: bool, time_delta: bool) -> &'static PsCodebook {
    match (kind, fine, time_delta) {
        (ParamKind::Iid, true, false) => &IID_FINE_DF_BOOK,
        (ParamKind::Iid, true, true) => &IID_FINE_DT_BOOK,
        (ParamKind::Iid, false, false) => &IID_DF_BOOK,
        (ParamKind::Iid, false, true) => &IID_DT_BOOK,
        (ParamKind::Icc, _, false) => &ICC_DF_BOOK,
        (ParamKind::Icc, _, true) => &ICC_DT_BOOK,
        (ParamKind::Ipd, _, false) => &IPD_DF_BOOK,
        (ParamKind::Ipd, _, true) => &IPD_DT_BOOK,
        (ParamKind::Opd, _, false) => &OPD_DF_BOOK,
        (ParamKind::Opd, _, true) => &OPD_DT_BOOK,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_BOOKS: [(ParamKind, bool, bool); 10] = [
        (ParamKind::Iid, true, false),
        (ParamKind::Iid, true, true),
        (ParamKind::Iid, false, false),
        (ParamKind::Iid, false, true),
        (ParamKind::Icc, false, false),
        (ParamKind::Icc, false, true),
        (ParamKind::Ipd, false, false),
        (ParamKind::Ipd, false, true),
        (ParamKind::Opd, false, false),
        (ParamKind::Opd, false, true),
    ];

    #[test]
    fn test_码本为完备前缀码() {
        for &(kind, fine, dt) in &ALL_BOOKS {
            let book = codebook(kind, fine, dt);
            // Kraft 和恰为 1
            let kraft: f64 = book.bits.iter().map(|&l| 0.5f64.powi(i32::from(l))).sum();
            assert!((kraft - 1.0).abs() < 1e-12, "{} kraft={}", book.name(), kraft);
            let max_len = book.bits.iter().copied().max().unwrap_or(0);
            assert_eq!(book.tree().max_len, u32::from(max_len), "{}", book.name());
        }
    }

    #[test]
    fn test_全部符号往返_两种解码方式() {
        for &(kind, fine, dt) in &ALL_BOOKS {
            let book = codebook(kind, fine, dt);
            let (lo, hi) = book.value_range();
            let mut bw = BitWriter::new();
            for v in lo..=hi {
                book.encode(&mut bw, v).unwrap();
            }
            let total = bw.bits_written();
            let data = bw.finish();
            for style in [HuffmanStyle::Tree, HuffmanStyle::Canonical] {
                let mut br = BitReader::new(&data);
                for v in lo..=hi {
                    assert_eq!(book.decode(&mut br, style).unwrap(), v, "{}", book.name());
                }
                assert_eq!(br.bits_read(), total);
            }
        }
    }

    #[test]
    fn test_值范围() {
        assert_eq!(codebook(ParamKind::Iid, true, true).value_range(), (-30, 30));
        assert_eq!(codebook(ParamKind::Iid, false, false).value_range(), (-14, 14));
        assert_eq!(codebook(ParamKind::Icc, false, true).value_range(), (-7, 7));
        assert_eq!(codebook(ParamKind::Opd, false, false).value_range(), (0, 7));
    }

    #[test]
    fn test_零值为最短码字() {
        for &(kind, fine, dt) in &ALL_BOOKS {
            let book = codebook(kind, fine, dt);
            assert_eq!(book.code_len(0), Some(1), "{}", book.name());
        }
        assert_eq!(codebook(ParamKind::Icc, false, false).code_len(8), None);
    }

    #[test]
    fn test_超范围编码报错() {
        let mut bw = BitWriter::new();
        let book = codebook(ParamKind::Icc, false, false);
        assert!(matches!(
            book.encode(&mut bw, 8),
            Err(TaoError::InvalidArgument(_))
        ));
        assert_eq!(bw.bits_written(), 0);
    }

    #[test]
    fn test_esc_扩展() {
        // 33 个符号的完备码: 值 16 用 1 位码 `1`, 其余 32 个用 6 位码 `0xxxxx`
        static CODES: [u32; 33] = {
            let mut c = [0u32; 33];
            let mut i = 0;
            while i < 32 {
                c[i] = i as u32;
                i += 1;
            }
            c[32] = 1;
            c
        };
        static BITS: [u8; 33] = {
            let mut b = [6u8; 33];
            b[32] = 1;
            b
        };
        let book = PsCodebook::new("esc_test", &CODES, &BITS, -16).with_escape(16);
        let values = [0, 15, -15, 16, -16, 17, 100, -1000, 40000];
        let mut bw = BitWriter::new();
        for &v in &values {
            book.encode(&mut bw, v).unwrap();
        }
        let data = bw.finish();
        for style in [HuffmanStyle::Tree, HuffmanStyle::Canonical] {
            let mut br = BitReader::new(&data);
            for &v in &values {
                assert_eq!(book.decode(&mut br, style).unwrap(), v);
            }
        }
    }

    #[test]
    fn test_不完备码本_未知码字报错() {
        // 只有 `0` 与 `10` 两个码字, `11` 不在码本中
        static CODES: [u32; 2] = [0b0, 0b10];
        static BITS: [u8; 2] = [1, 2];
        let book = PsCodebook::new("partial_test", &CODES, &BITS, 0);
        assert_eq!(book.tree().max_len, 2);
        let data = [0b0101_1000];
        for style in [HuffmanStyle::Tree, HuffmanStyle::Canonical] {
            let mut br = BitReader::new(&data);
            assert_eq!(book.decode(&mut br, style).unwrap(), 0);
            assert_eq!(book.decode(&mut br, style).unwrap(), 1);
            assert!(matches!(
                book.decode(&mut br, style),
                Err(TaoError::InvalidData(_))
            ));
            assert_eq!(br.bits_read(), 5);
        }
    }

    #[test]
    fn test_截断码流返回_eof() {
        let book = codebook(ParamKind::Iid, false, true);
        // 20 位码字只给出 8 位
        let data = [0xFF];
        for style in [HuffmanStyle::Tree, HuffmanStyle::Canonical] {
            let mut br = BitReader::new(&data);
            assert!(matches!(book.decode(&mut br, style), Err(TaoError::Eof)));
        }
    }
}
