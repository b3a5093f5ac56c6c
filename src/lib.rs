//! # Tao PS
//!
//! 纯 Rust 实现的 MPEG-4 AAC 参数立体声 (Parametric Stereo) 解码.
//!
//! 由单声道下混信号与少量空间参数 (强度差、相关性、相位差) 重建立体声,
//! 工作在 SBR 的 64 子带 QMF 域.
//!
//! # 快速开始
//!
//! ```rust
//! use tao_ps::ps::{EnvelopeDesc, FrameDesc, ParametricStereo, PsConfig, PsWriter};
//! use tao_ps::core::BitReader;
//!
//! let config = PsConfig::default();
//! let mut writer = PsWriter::new(&config).unwrap();
//! let mut ps = ParametricStereo::new(config).unwrap();
//!
//! let frame = writer
//!     .write_frame(&FrameDesc {
//!         envelopes: vec![EnvelopeDesc::default()],
//!         ..Default::default()
//!     })
//!     .unwrap();
//! let mut br = BitReader::new(&frame.data);
//! assert_eq!(ps.decode(&mut br, frame.bits).unwrap(), frame.bits);
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `tao-core` | 错误类型与按位读写 |
//! | `tao-aacps` | 参数立体声解码引擎 |

/// 错误类型与按位读写
pub use tao_core as core;

/// 参数立体声解码引擎
pub use tao_aacps::ps;

/// 获取版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
