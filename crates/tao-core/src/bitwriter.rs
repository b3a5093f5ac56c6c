//! 比特流写入器.
//!
//! 按大端位序 (MSB first) 写入, 与 [`crate::bitreader::BitReader`] 对应.
//! 用于构造 PS 边信息载荷 (编码方向与测试码流).

/// 比特流写入器
///
/// # 示例
/// ```
/// use tao_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_bool(false);
/// bw.write_bits(0b001, 3);
/// bw.write_bits(0x55, 8);
/// assert_eq!(bw.finish(), vec![0b1011_0001, 0x55]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    /// 已完成的字节
    data: Vec<u8>,
    /// 未满一个字节的位, 右对齐
    acc: u64,
    /// `acc` 中的有效位数 (0-7)
    pending: u32,
}

impl BitWriter {
    /// 创建新的比特流写入器
    pub fn new() -> Self {
        Self::default()
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.pending as usize
    }

    /// 写入 N 个位 (最多 32 位), 取 `value` 的低 N 位
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32);
        if n == 0 {
            return;
        }
        let mask = (1u64 << n) - 1;
        self.acc = (self.acc << n) | (u64::from(value) & mask);
        self.pending += n;
        while self.pending >= 8 {
            self.pending -= 8;
            self.data.push((self.acc >> self.pending) as u8);
        }
        self.acc &= (1u64 << self.pending) - 1;
    }

    /// 写入 1 个位
    pub fn write_bit(&mut self, bit: u32) {
        self.write_bits(bit & 1, 1);
    }

    /// 写入标志位
    pub fn write_bool(&mut self, flag: bool) {
        self.write_bits(u32::from(flag), 1);
    }

    /// 写入一元编码: `count` 个 `!stop_bit` 后跟一个 `stop_bit`
    pub fn write_unary(&mut self, count: u32, stop_bit: u32) {
        let fill = 1 - (stop_bit & 1);
        for _ in 0..count {
            self.write_bit(fill);
        }
        self.write_bit(stop_bit);
    }

    /// 追加另一个写入器的全部位 (不做对齐)
    pub fn append(&mut self, other: &BitWriter) {
        for &byte in &other.data {
            self.write_bits(u32::from(byte), 8);
        }
        self.write_bits(other.acc as u32, other.pending);
    }

    /// 完成写入, 不足一个字节的尾部用 0 填充
    pub fn finish(mut self) -> Vec<u8> {
        if self.pending > 0 {
            let pad = 8 - self.pending;
            self.write_bits(0, pad);
        }
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitreader::BitReader;

    #[test]
    fn test_write_bits_跨字节() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b101, 3);
        bw.write_bits(0x1FF, 9);
        bw.write_bits(0xABCDE, 20);
        assert_eq!(bw.bits_written(), 32);
        assert_eq!(bw.finish(), vec![0b1011_1111, 0b1111_1010, 0xBC, 0xDE]);
    }

    #[test]
    fn test_write_unary() {
        let mut bw = BitWriter::new();
        bw.write_unary(3, 0);
        bw.write_unary(2, 1);
        assert_eq!(bw.bits_written(), 7);
        assert_eq!(bw.finish(), vec![0b1110_0010]);
    }

    #[test]
    fn test_append_保留位序() {
        let mut inner = BitWriter::new();
        inner.write_bits(0x3, 2);
        inner.write_bits(0xA5, 8);
        let mut outer = BitWriter::new();
        outer.write_bits(0x1, 1);
        outer.append(&inner);
        assert_eq!(outer.bits_written(), 11);

        let data = outer.finish();
        let mut br = BitReader::new(&data);
        assert_eq!(br.read_bits(1).unwrap(), 1);
        assert_eq!(br.read_bits(2).unwrap(), 3);
        assert_eq!(br.read_bits(8).unwrap(), 0xA5);
    }

    #[test]
    fn test_读写一致() {
        let fields: [(u32, u32); 6] = [(1, 1), (0x1F, 5), (0, 3), (0xFFFF_FFFF, 32), (7, 4), (2, 2)];
        let mut bw = BitWriter::new();
        for &(v, n) in &fields {
            bw.write_bits(v, n);
        }
        let data = bw.finish();
        let mut br = BitReader::new(&data);
        for &(v, n) in &fields {
            assert_eq!(br.read_bits(n).unwrap(), v);
        }
    }
}
