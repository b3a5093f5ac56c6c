//! PS 参数 Huffman 码本数据.
//!
//! 每个码本两张表: 码字与码字长度, 按 `值 - 最小值` 索引.

// IID 精细量化, 频率方向差分 (-30..=30)
pub(super) const CODES_IID_FINE_DF: [u32; 61] = [
    0x3ffff, 0x3fffd, 0x3fffb, 0x3fff9, 0x3fff7, 0x3fff5, 0x3fff3, 0x3fff1,
    0x3ffef, 0x1fff5, 0x3ffed, 0x1fff3, 0x1fff1, 0xfff7, 0xfff5, 0x7ff9,
    0x3ffb, 0x3ff9, 0x1ffb, 0xffc, 0xffa, 0x7fb, 0x3fc, 0x3fa,
    0xfd, 0x7d, 0x3d, 0x1d, 0xd, 0x5, 0x0, 0x4,
    0xc, 0x1c, 0x3c, 0x7c, 0xfc, 0x1fc, 0x3fb, 0x7fa,
    0x7fc, 0xffb, 0x1ffa, 0x3ff8, 0x3ffa, 0x7ff8, 0xfff4, 0xfff6,
    0x1fff0, 0x1fff2, 0x3ffec, 0x1fff4, 0x3ffee, 0x3fff0, 0x3fff2, 0x3fff4,
    0x3fff6, 0x3fff8, 0x3fffa, 0x3fffc, 0x3fffe,
];

pub(super) const BITS_IID_FINE_DF: [u8; 61] = [
    18, 18, 18, 18, 18, 18, 18, 18, 18, 17, 18, 17, 17, 16, 16, 15,
    14, 14, 13, 12, 12, 11, 10, 10, 8, 7, 6, 5, 4, 3, 1, 3,
    4, 5, 6, 7, 8, 9, 10, 11, 11, 12, 13, 14, 14, 15, 16, 16,
    17, 17, 18, 17, 18, 18, 18, 18, 18, 18, 18, 18, 18,
];

// IID 精细量化, 时间方向差分 (-30..=30)
pub(super) const CODES_IID_FINE_DT: [u32; 61] = [
    0x3fff, 0x3ffe, 0x3ffd, 0x3ffc, 0x3ffb, 0x3ffa, 0x3ff9, 0x3ff8,
    0x3ff7, 0x3ff6, 0x3ff5, 0x3ff4, 0x3ff3, 0x3ff2, 0x1fea, 0x1fe8,
    0x1fe7, 0xff0, 0xfef, 0x7f5, 0x7f4, 0x7f3, 0x3f7, 0x3f5,
    0x1f9, 0xfb, 0x7c, 0x7a, 0x1d, 0x6, 0x0, 0x2,
    0x1c, 0x3c, 0x7b, 0xfa, 0x1f8, 0x3f4, 0x3f6, 0x7f2,
    0x3f8, 0xfee, 0x7f6, 0x1fe6, 0xff1, 0xff2, 0x1fe9, 0x1feb,
    0x1fec, 0x1fed, 0x1fee, 0x1fef, 0x1ff0, 0x1ff1, 0x1ff2, 0x1ff3,
    0x1ff4, 0x1ff5, 0x1ff6, 0x1ff7, 0x1ff8,
];

pub(super) const BITS_IID_FINE_DT: [u8; 61] = [
    14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 14, 13, 13,
    13, 12, 12, 11, 11, 11, 10, 10, 9, 8, 7, 7, 5, 3, 1, 2,
    5, 6, 7, 8, 9, 10, 10, 11, 10, 12, 11, 13, 12, 12, 13, 13,
    13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13, 13,
];

// IID 默认量化, 频率方向差分 (-14..=14)
pub(super) const CODES_IID_DF: [u32; 29] = [
    0x1fffb, 0x1fffc, 0x1fffd, 0x1fffa, 0xfffc, 0x7ffc, 0x1ffd, 0x3fe,
    0x1fe, 0x7e, 0x3c, 0x1d, 0xd, 0x5, 0x0, 0x4,
    0xc, 0x1c, 0x3d, 0x3e, 0xfe, 0x7fe, 0x1ffc, 0x3ffc,
    0x3ffd, 0x7ffd, 0x1fffe, 0x3fffe, 0x3ffff,
];

pub(super) const BITS_IID_DF: [u8; 29] = [
    17, 17, 17, 17, 16, 15, 13, 10, 9, 7, 6, 5, 4, 3, 1, 3,
    4, 5, 6, 6, 8, 11, 13, 14, 14, 15, 17, 18, 18,
];

// IID 默认量化, 时间方向差分 (-14..=14)
pub(super) const CODES_IID_DT: [u32; 29] = [
    0x7fffb, 0x7fffa, 0x7fff9, 0xffffc, 0xffffa, 0xffff8, 0x1fffd, 0x7ffe,
    0xffe, 0x3fe, 0xfe, 0x3e, 0xe, 0x2, 0x0, 0x6,
    0x1e, 0x7e, 0x1fe, 0x7fe, 0x1ffe, 0x3ffe, 0x1fffc, 0x7fff8,
    0xffff9, 0xffffb, 0xffffd, 0xffffe, 0xfffff,
];

pub(super) const BITS_IID_DT: [u8; 29] = [
    19, 19, 19, 20, 20, 20, 17, 15, 12, 10, 8, 6, 4, 2, 1, 3,
    5, 7, 9, 11, 13, 14, 17, 19, 20, 20, 20, 20, 20,
];

// ICC 频率方向差分 (-7..=7)
pub(super) const CODES_ICC_DF: [u32; 15] = [
    0x3fff, 0x3ffe, 0xffe, 0x3fe, 0x7e, 0x1e, 0x6, 0x0,
    0x2, 0xe, 0x3e, 0xfe, 0x1fe, 0x7fe, 0x1ffe,
];

pub(super) const BITS_ICC_DF: [u8; 15] = [
    14, 14, 12, 10, 7, 5, 3, 1, 2, 4, 6, 8, 9, 11, 13,
];

// ICC 时间方向差分 (-7..=7)
pub(super) const CODES_ICC_DT: [u32; 15] = [
    0x3fff, 0x1ffe, 0x7fe, 0x1fe, 0x7e, 0x1e, 0x6, 0x0,
    0x2, 0xe, 0x3e, 0xfe, 0x3fe, 0xffe, 0x3ffe,
];

pub(super) const BITS_ICC_DT: [u8; 15] = [
    14, 13, 11, 9, 7, 5, 3, 1, 2, 4, 6, 8, 10, 12, 14,
];

// IPD 频率方向差分 (0..=7)
pub(super) const CODES_IPD_DF: [u32; 8] = [
    0x0, 0x4, 0xa, 0xb, 0xc, 0xd, 0xe, 0xf,
];

pub(super) const BITS_IPD_DF: [u8; 8] = [
    1, 3, 4, 4, 4, 4, 4, 4,
];

// IPD 时间方向差分 (0..=7)
pub(super) const CODES_IPD_DT: [u32; 8] = [
    0x0, 0x4, 0xc, 0x1e, 0x1f, 0xd, 0xe, 0x5,
];

pub(super) const BITS_IPD_DT: [u8; 8] = [
    1, 3, 4, 5, 5, 4, 4, 3,
];

// OPD 频率方向差分 (0..=7)
pub(super) const CODES_OPD_DF: [u32; 8] = [
    0x0, 0x4, 0xc, 0xd, 0x1e, 0x1f, 0xe, 0x5,
];

pub(super) const BITS_OPD_DF: [u8; 8] = [
    1, 3, 4, 4, 5, 5, 4, 3,
];

// OPD 时间方向差分 (0..=7)
pub(super) const CODES_OPD_DT: [u32; 8] = [
    0x0, 0x4, 0xc, 0x1e, 0x1f, 0xd, 0xe, 0x5,
];

pub(super) const BITS_OPD_DT: [u8; 8] = [
    1, 3, 4, 5, 5, 4, 4, 3,
];
