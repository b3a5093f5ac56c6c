//! PS 解码配置.

use serde::{Deserialize, Serialize};
use tao_core::{TaoError, TaoResult};

/// Huffman 解码方式
///
/// 两种方式解码结果完全一致, 只是查找过程不同.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HuffmanStyle {
    /// 逐位走二叉树
    #[default]
    Tree,
    /// 按码长排序的规范码表, 先读最短码长再逐步扩展
    Canonical,
}

/// PS 解码配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsConfig {
    /// 每帧 QMF 时隙数: 32 (1024 样本帧) 或 30 (960 样本帧)
    pub slots_per_frame: usize,
    /// Huffman 解码方式
    pub huffman_style: HuffmanStyle,
}

impl Default for PsConfig {
    fn default() -> Self {
        Self {
            slots_per_frame: 32,
            huffman_style: HuffmanStyle::Tree,
        }
    }
}

impl PsConfig {
    /// 校验配置
    pub fn validate(&self) -> TaoResult<()> {
        if !matches!(self.slots_per_frame, 30 | 32) {
            return Err(TaoError::InvalidArgument(format!(
                "PS: 不支持的每帧时隙数 {}, 仅支持 30 或 32",
                self.slots_per_frame
            )));
        }
        Ok(())
    }
}
