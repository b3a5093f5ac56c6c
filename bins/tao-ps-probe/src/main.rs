//! tao-ps-probe - AAC 参数立体声边信息探测工具
//!
//! 逐条解码载荷记录文件中的 PS 边信息, 输出每帧的头部、包络划分与各参数的绝对值.

mod logging;
mod records;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process;

use tao_aacps::ps::{
    BandResolution, EnvelopeDesc, FrameDesc, ParametricStereo, PsConfig, PsFeatures, PsHeader,
    PsWriter, QmfBuffer, new_qmf_buffer,
};
use tao_core::{BitReader, TaoError};

/// AAC 参数立体声边信息探测工具
#[derive(Parser, Debug)]
#[command(name = "tao-ps-probe", version, about = "AAC 参数立体声边信息探测工具")]
struct Cli {
    /// 载荷记录文件 (每条: 2 字节大端长度 + 载荷)
    input: PathBuf,

    /// 解码配置文件 (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// 用合成单声道信号处理每帧并报告左右声道能量
    #[arg(long)]
    process: bool,

    /// 输出 JSON 格式
    #[arg(long)]
    json: bool,

    /// 先生成 N 帧演示载荷写入输入文件, 再探测
    #[arg(long, value_name = "N")]
    generate: Option<usize>,

    /// 日志详细程度 (-v/-vv/-vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// ============================================================
// 输出结构体
// ============================================================

/// 完整探测结果
#[derive(Serialize)]
struct ProbeOutput {
    file: String,
    slots_per_frame: usize,
    frames: Vec<FrameInfo>,
}

/// 单帧信息
#[derive(Serialize, Default)]
struct FrameInfo {
    index: usize,
    bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bits_used: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    has_header: bool,
    started: bool,
    resolution: u32,
    borders: Vec<i32>,
    envelopes: Vec<EnvelopeInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    energy: Option<EnergyInfo>,
}

/// 单个包络的参数
#[derive(Serialize)]
struct EnvelopeInfo {
    iid: Vec<i32>,
    icc: Vec<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ipd: Vec<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    opd: Vec<i32>,
}

/// 处理后的能量
#[derive(Serialize, Clone, Copy)]
struct EnergyInfo {
    input: f64,
    left: f64,
    right: f64,
}

// ============================================================
// 主逻辑
// ============================================================

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("tao-ps-probe", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }
    if let Err(e) = run(&cli) {
        eprintln!("错误: {e:#}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => PsConfig::default(),
    };
    tracing::debug!("解码配置: {:?}", config);

    if let Some(frames) = cli.generate {
        let payloads = demo_payloads(&config, frames)?;
        records::write_records(&cli.input, &payloads)?;
        tracing::info!("已生成 {} 帧演示载荷: {}", frames, cli.input.display());
    }

    let payloads = records::read_records(&cli.input)?;
    tracing::info!("读取 {} 条载荷记录", payloads.len());
    let frames = probe_payloads(&config, &payloads, cli.process)?;

    if cli.json {
        let output = ProbeOutput {
            file: cli.input.display().to_string(),
            slots_per_frame: config.slots_per_frame,
            frames,
        };
        let json = serde_json::to_string_pretty(&output).context("序列化 JSON 失败")?;
        println!("{json}");
    } else {
        for frame in &frames {
            print_frame_text(frame);
        }
        print_summary_text(&frames);
    }
    Ok(())
}

fn load_config(path: &Path) -> Result<PsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("读取配置文件失败, path={}", path.display()))?;
    let config: PsConfig = serde_json::from_str(&text)
        .with_context(|| format!("解析配置文件失败, path={}", path.display()))?;
    config.validate().context("配置无效")?;
    Ok(config)
}

/// 逐条解码载荷, 单条出错时记录错误并继续下一条
fn probe_payloads(config: &PsConfig, payloads: &[Vec<u8>], process: bool) -> Result<Vec<FrameInfo>> {
    let mut ps = ParametricStereo::new(*config).context("创建解码器失败")?;
    let slots = config.slots_per_frame;
    let mut frames = Vec::with_capacity(payloads.len());

    for (index, payload) in payloads.iter().enumerate() {
        let mut info = FrameInfo {
            index,
            bytes: payload.len(),
            ..Default::default()
        };
        let mut br = BitReader::new(payload);
        match ps.decode(&mut br, payload.len() * 8) {
            Ok(bits) => info.bits_used = Some(bits),
            Err(TaoError::Eof) => {
                tracing::warn!("第 {} 帧载荷不完整", index);
                info.error = Some(TaoError::Eof.to_string());
            }
            Err(e) => return Err(e).with_context(|| format!("第 {} 帧解码失败", index)),
        }
        fill_params(&mut info, &ps);

        if process {
            let mut left = tone_frame(index, slots);
            let input = energy(&left, slots);
            let mut right = new_qmf_buffer();
            ps.process(&mut left, &mut right);
            info.energy = Some(EnergyInfo {
                input,
                left: energy(&left, slots),
                right: energy(&right, slots),
            });
        }
        frames.push(info);
    }
    Ok(frames)
}

fn fill_params(info: &mut FrameInfo, ps: &ParametricStereo) {
    let params = ps.params();
    info.has_header = ps.has_header();
    info.started = ps.is_started();
    info.resolution = match ps.resolution() {
        BandResolution::Bands20 => 20,
        BandResolution::Bands34 => 34,
    };
    info.borders = params.borders().to_vec();
    info.envelopes = (0..params.env_count())
        .map(|e| EnvelopeInfo {
            iid: params.iid(e).to_vec(),
            icc: params.icc(e).to_vec(),
            ipd: params.ipd(e).to_vec(),
            opd: params.opd(e).to_vec(),
        })
        .collect();
}

/// 连续单频信号的第 `index` 帧, 含 6 个前瞻时隙
fn tone_frame(index: usize, slots: usize) -> Box<QmfBuffer> {
    let mut buf = new_qmf_buffer();
    for (k, band) in buf.iter_mut().enumerate() {
        let amp = 1.0 / (1.0 + k as f32);
        for (i, s) in band.iter_mut().take(slots + 6).enumerate() {
            let phase = 0.2 * (index * slots + i) as f32 + 0.5 * k as f32;
            *s = [amp * phase.cos(), amp * phase.sin()];
        }
    }
    buf
}

fn energy(buf: &QmfBuffer, slots: usize) -> f64 {
    buf.iter()
        .flat_map(|band| band[..slots].iter())
        .map(|s| f64::from(s[0] * s[0] + s[1] * s[1]))
        .sum()
}

/// 生成演示载荷: 声像左右摆动, 每 8 帧重发一次头部
fn demo_payloads(config: &PsConfig, frames: usize) -> Result<Vec<Vec<u8>>> {
    let header = PsHeader::new(PsFeatures::IID | PsFeatures::ICC | PsFeatures::EXT, 1, 1)
        .context("构造头部失败")?;
    let mut writer = PsWriter::new(config).context("创建写入器失败")?;
    let mut payloads = Vec::with_capacity(frames);
    for index in 0..frames {
        let pan = (index % 15) as i32 - 7;
        let envelope = EnvelopeDesc {
            iid: vec![pan; 20],
            icc: (0..20).map(|b| (b + index as i32) % 8).collect(),
            ipd: vec![(index % 8) as i32; 11],
            opd: vec![0; 11],
        };
        let desc = FrameDesc {
            header: (index % 8 == 0).then_some(header),
            envelopes: vec![envelope.clone(), envelope],
            phase: true,
            ..Default::default()
        };
        let encoded = writer
            .write_frame(&desc)
            .with_context(|| format!("编码第 {} 帧失败", index))?;
        payloads.push(encoded.data);
    }
    Ok(payloads)
}

/// 文本输出: 单帧
fn print_frame_text(frame: &FrameInfo) {
    println!("[FRAME #{}]", frame.index);
    println!("  载荷长度     : {} 字节", frame.bytes);
    if let Some(bits) = frame.bits_used {
        println!("  已用位数     : {bits}");
    }
    if let Some(ref err) = frame.error {
        println!("  错误         : {err}");
    }
    println!("  带头部       : {}", if frame.has_header { "是" } else { "否" });
    println!("  已启动       : {}", if frame.started { "是" } else { "否" });
    println!("  分辨率       : {} 带", frame.resolution);
    println!("  包络边界     : {:?}", frame.borders);
    for (e, env) in frame.envelopes.iter().enumerate() {
        println!("  包络 {e} IID   : {:?}", env.iid);
        println!("  包络 {e} ICC   : {:?}", env.icc);
        if !env.ipd.is_empty() {
            println!("  包络 {e} IPD   : {:?}", env.ipd);
            println!("  包络 {e} OPD   : {:?}", env.opd);
        }
    }
    if let Some(energy) = frame.energy {
        println!(
            "  能量         : 输入 {:.4}, 左 {:.4}, 右 {:.4}",
            energy.input, energy.left, energy.right
        );
    }
    println!("[/FRAME]");
    println!();
}

/// 文本输出: 汇总
fn print_summary_text(frames: &[FrameInfo]) {
    let errors = frames.iter().filter(|f| f.error.is_some()).count();
    let headers = frames.iter().filter(|f| f.has_header).count();
    println!("[SUMMARY]");
    println!("  帧数         : {}", frames.len());
    println!("  带头部帧数   : {headers}");
    println!("  出错帧数     : {errors}");
    println!("[/SUMMARY]");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_演示载荷逐帧解码() {
        let config = PsConfig::default();
        let payloads = demo_payloads(&config, 10).unwrap();
        let frames = probe_payloads(&config, &payloads, true).unwrap();
        assert_eq!(frames.len(), 10);
        for frame in &frames {
            assert!(frame.error.is_none());
            assert!(frame.started);
            assert_eq!(frame.has_header, frame.index % 8 == 0);
            assert_eq!(frame.borders, vec![-1, 15, 31]);
            assert_eq!(frame.envelopes.len(), 2);
            assert_eq!(frame.envelopes[0].ipd.len(), 11);
            let pan = (frame.index % 15) as i32 - 7;
            assert!(frame.envelopes[1].iid.iter().all(|&v| v == pan));
            assert!(frame.energy.is_some());
        }
    }

    #[test]
    fn test_截断载荷继续下一帧() {
        let config = PsConfig::default();
        let mut payloads = demo_payloads(&config, 3).unwrap();
        payloads[1].truncate(1);
        let frames = probe_payloads(&config, &payloads, false).unwrap();
        assert_eq!(frames[1].error.as_deref(), Some("比特流已耗尽"));
        assert!(frames[1].bits_used.is_none());
        assert!(frames[2].error.is_none());
        // 出错帧不改变已保存的参数
        assert_eq!(frames[1].envelopes.len(), frames[0].envelopes.len());
    }

    #[test]
    fn test_文件往返与配置() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("ps.json");
        std::fs::write(&config_path, r#"{"huffman_style": "canonical"}"#).unwrap();
        let config = load_config(&config_path).unwrap();
        assert_eq!(config.slots_per_frame, 32);

        let payload_path = dir.path().join("ps.bin");
        records::write_records(&payload_path, &demo_payloads(&config, 4).unwrap()).unwrap();
        let payloads = records::read_records(&payload_path).unwrap();
        let frames = probe_payloads(&config, &payloads, false).unwrap();
        assert_eq!(frames.len(), 4);
        assert!(serde_json::to_string(&frames).unwrap().contains("\"iid\""));

        std::fs::write(&config_path, r#"{"slots_per_frame": 16}"#).unwrap();
        assert!(load_config(&config_path).is_err());
    }
}
