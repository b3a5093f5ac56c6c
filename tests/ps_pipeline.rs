//! 参数立体声端到端测试.
//!
//! 用写入器构造边信息码流, 逐帧 decode + process, 检查输出的左右声道.

use tao_ps::core::BitReader;
use tao_ps::ps::{
    EnvelopeDesc, FrameDesc, ParametricStereo, PsConfig, PsFeatures, PsHeader, PsWriter,
    QmfBuffer, new_qmf_buffer,
};

const SLOTS: usize = 32;

fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// 连续单声道信号的第 `index` 帧, 每个子带含 6 个前瞻时隙
fn mono_frame(index: usize) -> Box<QmfBuffer> {
    let mut buf = new_qmf_buffer();
    for (k, band) in buf.iter_mut().enumerate() {
        let freq = 0.05 + 0.013 * k as f32;
        for (i, s) in band.iter_mut().take(SLOTS + 6).enumerate() {
            let t = (index * SLOTS + i) as f32;
            let phase = freq * t + 0.7 * k as f32;
            *s = [0.4 * phase.cos(), 0.4 * phase.sin()];
        }
    }
    buf
}

fn energy(buf: &QmfBuffer) -> f64 {
    buf.iter()
        .flat_map(|band| band[..SLOTS].iter())
        .map(|s| f64::from(s[0] * s[0] + s[1] * s[1]))
        .sum()
}

/// 按给定参数连续处理若干帧, 返回每帧的 (输入, 左, 右)
fn run_stream(
    header: PsHeader,
    envelope: &EnvelopeDesc,
    frames: usize,
) -> Vec<(Box<QmfBuffer>, Box<QmfBuffer>, Box<QmfBuffer>)> {
    let config = PsConfig::default();
    let mut writer = PsWriter::new(&config).unwrap();
    let mut ps = ParametricStereo::new(config).unwrap();
    (0..frames)
        .map(|index| {
            let desc = FrameDesc {
                header: (index == 0).then_some(header),
                envelopes: vec![envelope.clone()],
                ..Default::default()
            };
            let encoded = writer.write_frame(&desc).unwrap();
            let mut br = BitReader::new(&encoded.data);
            assert_eq!(ps.decode(&mut br, encoded.bits).unwrap(), encoded.bits);

            let input = mono_frame(index);
            let mut left = input.clone();
            let mut right = new_qmf_buffer();
            ps.process(&mut left, &mut right);
            (input, left, right)
        })
        .collect()
}

#[test]
fn test_强度差把能量分配到左声道() {
    init_test_logging();
    let header = PsHeader::new(PsFeatures::IID | PsFeatures::ICC, 1, 1).unwrap();
    let envelope = EnvelopeDesc {
        iid: vec![7; 20],
        icc: vec![0; 20],
        ..Default::default()
    };
    let frames = run_stream(header, &envelope, 3);
    for (input, left, right) in &frames[1..] {
        let e_in = energy(input);
        let e_l = energy(left);
        let e_r = energy(right);
        log::debug!("输入 {:.3}, 左 {:.3}, 右 {:.3}", e_in, e_l, e_r);
        assert!(e_l > 100.0 * e_r);
        // 完全相关时总能量守恒
        assert!(((e_l + e_r) / (2.0 * e_in) - 1.0).abs() < 1e-3);
    }
}

#[test]
fn test_强度差取反时左右互换() {
    init_test_logging();
    let header = PsHeader::new(PsFeatures::IID | PsFeatures::ICC, 1, 1).unwrap();
    let to_left = EnvelopeDesc {
        iid: vec![4; 20],
        icc: vec![0; 20],
        ..Default::default()
    };
    let to_right = EnvelopeDesc {
        iid: vec![-4; 20],
        ..to_left.clone()
    };
    let a = run_stream(header, &to_left, 2);
    let b = run_stream(header, &to_right, 2);
    let (_, al, ar) = &a[1];
    let (_, bl, br) = &b[1];
    for k in 0..64 {
        for n in 0..SLOTS {
            for c in 0..2 {
                assert!((al[k][n][c] - br[k][n][c]).abs() < 1e-4);
                assert!((ar[k][n][c] - bl[k][n][c]).abs() < 1e-4);
            }
        }
    }
}

#[test]
fn test_反相关时左右反相() {
    init_test_logging();
    for iid_mode in [1, 2] {
        let header = PsHeader::new(PsFeatures::IID | PsFeatures::ICC, iid_mode, iid_mode).unwrap();
        let bands = header.iid_coding().0;
        let envelope = EnvelopeDesc {
            iid: vec![0; bands],
            icc: vec![7; bands],
            ..Default::default()
        };
        let frames = run_stream(header, &envelope, 3);
        let (input, left, right) = &frames[2];
        assert!(energy(left) > 0.01 * energy(input));
        for k in 0..64 {
            for n in 0..SLOTS {
                for c in 0..2 {
                    assert!((left[k][n][c] + right[k][n][c]).abs() < 1e-4);
                }
            }
        }
    }
}

#[test]
fn test_分辨率切换后输出有限() {
    init_test_logging();
    let config = PsConfig::default();
    let mut writer = PsWriter::new(&config).unwrap();
    let mut ps = ParametricStereo::new(config).unwrap();
    let h20 = PsHeader::new(PsFeatures::IID | PsFeatures::ICC | PsFeatures::EXT, 1, 1).unwrap();
    let h34 = PsHeader::new(PsFeatures::IID | PsFeatures::ICC | PsFeatures::EXT, 2, 2).unwrap();

    for index in 0..6 {
        let (header, bands, pd_bands) = if index % 3 == 2 { (h34, 34, 17) } else { (h20, 20, 11) };
        let desc = FrameDesc {
            header: Some(header),
            envelopes: vec![
                EnvelopeDesc {
                    iid: (0..bands as i32).map(|b| b % 15 - 7).collect(),
                    icc: (0..bands as i32).map(|b| b % 8).collect(),
                    ipd: (0..pd_bands as i32).map(|b| (b + index as i32) % 8).collect(),
                    opd: (0..pd_bands as i32).map(|b| (3 * b) % 8).collect(),
                };
                2
            ],
            phase: true,
            ..Default::default()
        };
        let encoded = writer.write_frame(&desc).unwrap();
        let mut br = BitReader::new(&encoded.data);
        ps.decode(&mut br, encoded.bits).unwrap();
        assert_eq!(ps.resolution().is_34(), bands == 34);

        let mut left = mono_frame(index);
        let mut right = new_qmf_buffer();
        ps.process(&mut left, &mut right);
        for band in left.iter().chain(right.iter()) {
            assert!(band[..SLOTS].iter().all(|s| s[0].is_finite() && s[1].is_finite()));
        }
    }
}

#[test]
fn test_独立实例结果一致() {
    let header = PsHeader::new(PsFeatures::IID | PsFeatures::ICC, 4, 4).unwrap();
    let envelope = EnvelopeDesc {
        iid: (0..20).map(|b| b - 10).collect(),
        icc: (0..20).map(|b| b % 8).collect(),
        ..Default::default()
    };
    let a = run_stream(header, &envelope, 3);
    let b = run_stream(header, &envelope, 3);
    for ((_, al, ar), (_, bl, br)) in a.iter().zip(b.iter()) {
        assert_eq!(al, bl);
        assert_eq!(ar, br);
    }
    assert!(!tao_ps::version().is_empty());
}
