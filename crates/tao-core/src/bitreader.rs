//! 比特流读取器.
//!
//! 按大端位序 (MSB first) 从内存缓冲区读取, 内部用 64 位缓存批量装入字节.
//! PS 边信息等短载荷可通过 [`BitReader::with_limit`] 限定可读位数,
//! 读取越界统一返回 [`TaoError::Eof`].

use crate::{TaoError, TaoResult};

/// 比特流读取器
///
/// # 示例
/// ```
/// use tao_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.read_bits(4).unwrap(), 0b1011);
/// assert_eq!(br.peek_bits(4).unwrap(), 0b0001);
/// assert_eq!(br.read_bits(12).unwrap(), 0b0001_0101_0101);
/// assert!(br.read_bit().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 下一个待装入缓存的字节索引
    next_byte: usize,
    /// 位缓存, 有效位左对齐
    cache: u64,
    /// 缓存中的有效位数
    cached: u32,
    /// 可读总位数
    limit: usize,
    /// 已消费位数
    consumed: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器, 可读范围为整个缓冲区
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_limit(data, data.len() * 8)
    }

    /// 创建只允许读取前 `bits` 位的读取器
    ///
    /// `bits` 超过缓冲区长度时按缓冲区长度截断.
    pub fn with_limit(data: &'a [u8], bits: usize) -> Self {
        Self {
            data,
            next_byte: 0,
            cache: 0,
            cached: 0,
            limit: bits.min(data.len() * 8),
            consumed: 0,
        }
    }

    /// 当前位位置 (已读取的总位数)
    pub fn bits_read(&self) -> usize {
        self.consumed
    }

    /// 剩余可读位数
    pub fn bits_left(&self) -> usize {
        self.limit - self.consumed
    }

    /// 是否已读完
    pub fn is_eof(&self) -> bool {
        self.bits_left() == 0
    }

    fn refill(&mut self) {
        while self.cached <= 56 && self.next_byte < self.data.len() {
            self.cache |= u64::from(self.data[self.next_byte]) << (56 - self.cached);
            self.next_byte += 1;
            self.cached += 8;
        }
    }

    fn consume(&mut self, n: u32) {
        self.cache <<= n;
        self.cached -= n;
        self.consumed += n as usize;
    }

    /// 读取 1 个位
    pub fn read_bit(&mut self) -> TaoResult<u32> {
        self.read_bits(1)
    }

    /// 读取 1 个位并作为标志返回
    pub fn read_bool(&mut self) -> TaoResult<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    /// 窥视 N 个位 (最多 32 位, 不移动位置)
    pub fn peek_bits(&mut self, n: u32) -> TaoResult<u32> {
        if n == 0 {
            return Ok(0);
        }
        if n > 32 {
            return Err(TaoError::InvalidArgument(format!(
                "peek_bits: n={} 超过 32 位",
                n
            )));
        }
        if n as usize > self.bits_left() {
            return Err(TaoError::Eof);
        }
        if self.cached < n {
            self.refill();
        }
        Ok((self.cache >> (64 - n)) as u32)
    }

    /// 读取 N 个位 (最多 32 位)
    ///
    /// 返回值的低 N 位有效.
    pub fn read_bits(&mut self, n: u32) -> TaoResult<u32> {
        let value = self.peek_bits(n)?;
        if n > 0 {
            self.consume(n);
        }
        Ok(value)
    }

    /// 跳过 N 个位
    pub fn skip_bits(&mut self, n: usize) -> TaoResult<()> {
        if n > self.bits_left() {
            return Err(TaoError::Eof);
        }
        let mut remaining = n;
        while remaining > 0 {
            let step = remaining.min(32) as u32;
            self.read_bits(step)?;
            remaining -= step as usize;
        }
        Ok(())
    }

    /// 读取一元编码值
    ///
    /// 统计遇到 `stop_bit` 之前的位数, 例如 `read_unary(0)` 从 `1110...` 得到 3.
    /// 超过 `max` 仍未遇到终止位时返回 [`TaoError::InvalidData`].
    pub fn read_unary(&mut self, stop_bit: u32, max: u32) -> TaoResult<u32> {
        let stop = stop_bit & 1;
        let mut count = 0u32;
        while self.read_bit()? != stop {
            count += 1;
            if count > max {
                return Err(TaoError::InvalidData(format!(
                    "一元码长度超过上限 {}",
                    max
                )));
            }
        }
        Ok(count)
    }
}
