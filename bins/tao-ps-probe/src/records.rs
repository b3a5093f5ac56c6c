//! 载荷记录文件.
//!
//! 每条记录为 2 字节大端长度 + 对应字节数的 PS 边信息载荷, 首尾相接.

use anyhow::{Context, Result, bail};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// 读取全部记录
pub fn read_records(path: &Path) -> Result<Vec<Vec<u8>>> {
    let file = File::open(path)
        .with_context(|| format!("打开载荷文件失败, path={}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    while !reader.fill_buf()?.is_empty() {
        let len = reader
            .read_u16::<BigEndian>()
            .with_context(|| format!("第 {} 条记录的长度不完整", records.len()))?;
        let mut payload = vec![0u8; usize::from(len)];
        reader.read_exact(&mut payload).with_context(|| {
            format!("第 {} 条记录被截断, 声明 {} 字节", records.len(), len)
        })?;
        records.push(payload);
    }
    Ok(records)
}

/// 写出记录, 单条载荷不能超过 65535 字节
pub fn write_records(path: &Path, records: &[Vec<u8>]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("创建载荷文件失败, path={}", path.display()))?;
    let mut writer = BufWriter::new(file);
    for (index, payload) in records.iter().enumerate() {
        let Ok(len) = u16::try_from(payload.len()) else {
            bail!("第 {} 条记录过长: {} 字节", index, payload.len());
        };
        writer.write_u16::<BigEndian>(len)?;
        writer.write_all(payload)?;
    }
    writer.flush()?;
    Ok(())
}
