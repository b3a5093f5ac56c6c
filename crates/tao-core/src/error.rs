//! 统一错误类型定义.
//!
//! 所有 Tao crate 共用的错误类型, 支持跨模块传播.

use thiserror::Error;

/// Tao 统一错误类型
#[derive(Debug, Error)]
pub enum TaoError {
    /// 无效参数 (构造或配置阶段的误用)
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// 比特流已耗尽, 当前帧无法继续解析
    #[error("比特流已耗尽")]
    Eof,
}

/// Tao 统一 Result 类型
pub type TaoResult<T> = Result<T, TaoError>;
