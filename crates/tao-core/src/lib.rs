//! # tao-core
//!
//! Tao 核心库, 提供统一错误类型与按位读写工具.

pub mod bitreader;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{TaoError, TaoResult};
