//! # tao-aacps
//!
//! MPEG-4 AAC 参数立体声 (Parametric Stereo, HE-AAC v2) 解码库.
//!
//! 在 SBR 的 QMF 域中把单声道下混信号还原为立体声, 作为 AAC 解码器 SBR 阶段的一部分使用.
//!
//! ## 使用示例
//!
//! ```rust
//! use tao_aacps::ps::{ParametricStereo, PsConfig, new_qmf_buffer};
//! use tao_core::BitReader;
//!
//! let mut ps = ParametricStereo::new(PsConfig::default()).unwrap();
//!
//! // 不带头部、单个均匀包络的最简帧
//! let payload = [0b0001_0000];
//! let mut br = BitReader::new(&payload);
//! let used = ps.decode(&mut br, 8).unwrap();
//! assert_eq!(used, 4);
//!
//! let mut left = new_qmf_buffer();
//! let mut right = new_qmf_buffer();
//! ps.process(&mut left, &mut right);
//! ```

pub mod ps;

pub use ps::{ParametricStereo, PsConfig, PsWriter};
