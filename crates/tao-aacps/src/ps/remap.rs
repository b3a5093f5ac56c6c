//! 参数频带分辨率转换.
//!
//! 码流中的参数可以是 10/20/34 带 (相位参数 5/11/17 带), 处理流水线只按 20 或 34 带运行.
//! 每张映射表给出每个输出频带的加权抽头 `(源频带, 权重)`, 输出为加权平均.
//! 整数参数按整数除法截断, 浮点矩阵系数乘以 1/权重和.

use log::trace;

type Taps = &'static [(u8, u8)];

/// 一张映射表
struct MapTable {
    rows: &'static [Taps],
    /// `full = false` 时写入的输出频带数
    partial: usize,
    /// `full = false` 时紧随其后补一个 0
    zero_tail: bool,
}

/// 10 → 20: 每带复制两份
const MAP_10_TO_20: MapTable = MapTable {
    rows: &[
        &[(0, 1)],
        &[(0, 1)],
        &[(1, 1)],
        &[(1, 1)],
        &[(2, 1)],
        &[(2, 1)],
        &[(3, 1)],
        &[(3, 1)],
        &[(4, 1)],
        &[(4, 1)],
        &[(5, 1)],
        &[(5, 1)],
        &[(6, 1)],
        &[(6, 1)],
        &[(7, 1)],
        &[(7, 1)],
        &[(8, 1)],
        &[(8, 1)],
        &[(9, 1)],
        &[(9, 1)],
    ],
    partial: 10,
    zero_tail: true,
};

const MAP_10_TO_34: MapTable = MapTable {
    rows: &[
        &[(0, 1)],
        &[(0, 1)],
        &[(0, 1)],
        &[(1, 1)],
        &[(1, 1)],
        &[(1, 1)],
        &[(2, 1)],
        &[(2, 1)],
        &[(2, 1)],
        &[(2, 1)],
        &[(3, 1)],
        &[(3, 1)],
        &[(4, 1)],
        &[(4, 1)],
        &[(4, 1)],
        &[(4, 1)],
        &[(5, 1)],
        &[(5, 1)],
        &[(6, 1)],
        &[(6, 1)],
        &[(7, 1)],
        &[(7, 1)],
        &[(7, 1)],
        &[(7, 1)],
        &[(8, 1)],
        &[(8, 1)],
        &[(8, 1)],
        &[(8, 1)],
        &[(9, 1)],
        &[(9, 1)],
        &[(9, 1)],
        &[(9, 1)],
        &[(9, 1)],
        &[(9, 1)],
    ],
    partial: 16,
    zero_tail: true,
};

const MAP_20_TO_34: MapTable = MapTable {
    rows: &[
        &[(0, 1)],
        &[(0, 1), (1, 1)],
        &[(1, 1)],
        &[(2, 1)],
        &[(2, 1), (3, 1)],
        &[(3, 1)],
        &[(4, 1)],
        &[(4, 1)],
        &[(5, 1)],
        &[(5, 1)],
        &[(6, 1)],
        &[(7, 1)],
        &[(8, 1)],
        &[(8, 1)],
        &[(9, 1)],
        &[(9, 1)],
        &[(10, 1)],
        &[(11, 1)],
        &[(12, 1)],
        &[(13, 1)],
        &[(14, 1)],
        &[(14, 1)],
        &[(15, 1)],
        &[(15, 1)],
        &[(16, 1)],
        &[(16, 1)],
        &[(17, 1)],
        &[(17, 1)],
        &[(18, 1)],
        &[(18, 1)],
        &[(18, 1)],
        &[(18, 1)],
        &[(19, 1)],
        &[(19, 1)],
    ],
    partial: 17,
    zero_tail: false,
};

const MAP_34_TO_20: MapTable = MapTable {
    rows: &[
        &[(0, 2), (1, 1)],
        &[(1, 1), (2, 2)],
        &[(3, 2), (4, 1)],
        &[(4, 1), (5, 2)],
        &[(6, 1), (7, 1)],
        &[(8, 1), (9, 1)],
        &[(10, 1)],
        &[(11, 1)],
        &[(12, 1), (13, 1)],
        &[(14, 1), (15, 1)],
        &[(16, 1)],
        &[(17, 1)],
        &[(18, 1)],
        &[(19, 1)],
        &[(20, 1), (21, 1)],
        &[(22, 1), (23, 1)],
        &[(24, 1), (25, 1)],
        &[(26, 1), (27, 1)],
        &[(28, 1), (29, 1), (30, 1), (31, 1)],
        &[(32, 1), (33, 1)],
    ],
    partial: 11,
    zero_tail: false,
};

/// 可做频带映射的值类型
pub trait RemapValue: Copy + Default {
    /// 计算一个输出频带
    fn combine(taps: Taps, src: &[Self]) -> Self;
}

impl RemapValue for i32 {
    fn combine(taps: Taps, src: &[Self]) -> Self {
        let mut sum = 0i32;
        let mut weight = 0i32;
        for &(idx, w) in taps {
            sum += i32::from(w) * src[idx as usize];
            weight += i32::from(w);
        }
        sum / weight
    }
}

impl RemapValue for f32 {
    fn combine(taps: Taps, src: &[Self]) -> Self {
        let mut sum = 0.0f32;
        let mut weight = 0u8;
        for &(idx, w) in taps {
            sum += f32::from(w) * src[idx as usize];
            weight += w;
        }
        let scale = match weight {
            1 => 1.0,
            2 => 0.5,
            3 => 0.333_333_33,
            _ => 0.25,
        };
        sum * scale
    }
}

/// 频带数所属的分辨率档位
///
/// 参数频带 10/20/34 与相位频带 5/11/17 一一对应, 其余长度没有档位.
fn class_of(bands: usize) -> Option<usize> {
    match bands {
        5 | 10 => Some(10),
        11 | 20 => Some(20),
        17 | 34 => Some(34),
        _ => None,
    }
}

fn table_for(from: usize, to: usize) -> Option<&'static MapTable> {
    match (class_of(from)?, class_of(to)?) {
        (10, 20) => Some(&MAP_10_TO_20),
        (10, 34) => Some(&MAP_10_TO_34),
        (20, 34) => Some(&MAP_20_TO_34),
        (34, 20) => Some(&MAP_34_TO_20),
        _ => None,
    }
}

/// 把 `src` 映射到 `dst` 的分辨率
///
/// 档位由长度决定: 10/20/34 个参数频带, 相位参数的 5/11/17 分别落在 10/20/34 档.
/// 同档位或长度不属于任何档位时原样复制 `src.len()` 个值.
/// `full = false` 只写低端频带 (相位参数只覆盖低端), 高端输出保持原值.
///
/// 返回写入的输出个数.
pub fn remap<T: RemapValue>(dst: &mut [T], src: &[T], full: bool) -> usize {
    let Some(table) = table_for(src.len(), dst.len()) else {
        let n = src.len().min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        return n;
    };
    trace!("PS: 频带映射 {} → {} (full={})", src.len(), dst.len(), full);

    let count = if full {
        table.rows.len()
    } else {
        table.partial
    };
    for (out, &taps) in dst.iter_mut().zip(&table.rows[..count]) {
        *out = T::combine(taps, src);
    }
    if !full && table.zero_tail {
        dst[count] = T::default();
        return count + 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_同档位为恒等() {
        let src: Vec<i32> = (0..20).map(|i| i - 7).collect();
        let mut dst = [99i32; 20];
        assert_eq!(remap(&mut dst, &src, true), 20);
        assert_eq!(&dst[..], &src[..]);

        let src: Vec<f32> = (0..34).map(|i| i as f32 * 0.1).collect();
        let mut dst = [0.0f32; 34];
        remap(&mut dst, &src, true);
        assert_eq!(&dst[..], &src[..]);
    }

    #[test]
    fn test_每个输出恰好写一次() {
        let sentinel = i32::MIN;
        for (src_len, dst_len, full, expected) in [
            (10, 20, true, 20),
            (10, 34, true, 34),
            (20, 34, true, 34),
            (34, 20, true, 20),
            (5, 11, false, 11),
            (5, 17, false, 17),
            (11, 17, false, 17),
            (17, 11, false, 11),
        ] {
            let src = vec![1i32; src_len];
            let mut dst = vec![sentinel; dst_len];
            let written = remap(&mut dst, &src, full);
            assert_eq!(written, expected, "{} → {}", src_len, dst_len);
            assert!(dst.iter().all(|&v| v != sentinel), "{} → {}", src_len, dst_len);
            // 除补零的尾部外, 每个值都来自源数据
            let zeros = usize::from(!full && src_len == 5);
            assert_eq!(dst.iter().filter(|&&v| v == 1).count() + zeros, dst_len);
        }
    }

    #[test]
    fn test_相位频带_按档位映射() {
        // 5 → 17 走 10 → 34 的低端映射并补零
        let mut dst = [-9i32; 17];
        assert_eq!(remap(&mut dst, &[1, 2, 3, 4, 5], false), 17);
        assert_eq!(dst, [1, 1, 1, 2, 2, 2, 3, 3, 3, 3, 4, 4, 5, 5, 5, 5, 0]);

        // 11 → 17 走 20 → 34 的低端映射
        let src: Vec<i32> = (0..11).map(|i| i * 2).collect();
        let mut dst = [-9i32; 17];
        assert_eq!(remap(&mut dst, &src, false), 17);
        assert_eq!(dst, [0, 1, 2, 4, 5, 6, 8, 8, 10, 10, 12, 14, 16, 16, 18, 18, 20]);

        // 5 → 11 走 10 → 20
        let mut dst = [-9i32; 11];
        assert_eq!(remap(&mut dst, &[1, 2, 3, 4, 5], false), 11);
        assert_eq!(dst, [1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 0]);
    }

    #[test]
    fn test_部分映射不改动高端() {
        let src = [3i32; 20];
        let mut dst = [-1i32; 34];
        assert_eq!(remap(&mut dst, &src, false), 17);
        assert!(dst[..17].iter().all(|&v| v == 3));
        assert!(dst[17..].iter().all(|&v| v == -1));
    }

    #[test]
    fn test_34_到_20_整数截断() {
        let mut src = [0i32; 34];
        src[0] = -5;
        src[1] = 5;
        src[28] = 1;
        src[29] = 2;
        src[30] = 2;
        src[31] = 2;
        let mut dst = [0i32; 20];
        remap(&mut dst, &src, true);
        // (2 * -5 + 5) / 3 = -1 (向零截断)
        assert_eq!(dst[0], -1);
        // (5 + 0) / 3 = 1
        assert_eq!(dst[1], 1);
        // 7 / 4 = 1
        assert_eq!(dst[18], 1);
    }

    #[test]
    fn test_20_到_34_浮点平均() {
        let src: Vec<f32> = (0..20).map(|i| i as f32).collect();
        let mut dst = [0.0f32; 34];
        remap(&mut dst, &src, true);
        assert_eq!(dst[1], 0.5);
        assert_eq!(dst[4], 2.5);
        assert_eq!(dst[31], 18.0);
        assert_eq!(dst[33], 19.0);

        let mut back = [0.0f32; 20];
        remap(&mut back, &dst, true);
        assert_eq!(back[6], 6.0);
        assert_eq!(back[19], 19.0);
    }
}
