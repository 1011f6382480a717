use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use uldl_sim::scenario::{Scenario, ScenarioConfig};

#[derive(Debug, Parser)]
#[command(
    name = "tcp-uldl",
    about = "Rate-paced downlink/uplink TCP traffic with throughput and cwnd/ssthresh/rtt traces"
)]
struct Args {
    /// 场景配置 JSON；不填则使用默认场景
    #[arg(long)]
    config: Option<PathBuf>,

    /// 追踪文件名前缀
    #[arg(long)]
    prefix_name: Option<String>,

    /// 仿真总时长（秒）
    #[arg(long)]
    sim_time: Option<f64>,

    /// 是否启用上行流量
    #[arg(long)]
    enable_ul: Option<bool>,

    /// 传输协议名称（仅记录在日志中）
    #[arg(long)]
    transport_prot: Option<String>,

    /// 追踪文件输出目录
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// 不记录 cwnd/ssthresh/rtt/ack/cong-state 追踪
    #[arg(long, default_value_t = false)]
    no_metrics: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut cfg = match &args.config {
        Some(path) => match ScenarioConfig::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => ScenarioConfig::default(),
    };
    if let Some(prefix) = args.prefix_name {
        cfg.prefix_name = prefix;
    }
    if let Some(t) = args.sim_time {
        cfg.sim_stop_s = t;
    }
    if let Some(ul) = args.enable_ul {
        cfg.enable_ul = ul;
    }
    if let Some(prot) = args.transport_prot {
        cfg.transport_prot = prot;
    }
    if let Some(dir) = args.out_dir {
        cfg.out_dir = dir;
    }
    if args.no_metrics {
        cfg.trace_metrics = false;
    }

    let summary = match Scenario::build(cfg).and_then(|mut s| s.run()) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::FAILURE;
        }
    };

    println!("done @ {}", summary.end);
    for f in &summary.flows {
        let (inst, avg) = f
            .last_sample
            .map(|s| (s.instantaneous_mbps, s.average_mbps))
            .unwrap_or((0.0, 0.0));
        println!(
            "  {}: units_sent={}, bytes_received={}, units_dropped={}, samples={}, throughput_mbps={:.3}, average_mbps={:.3}, dropped_pkts={}, retransmits={}, timeouts={}",
            f.dir.tag(),
            f.units_sent,
            f.bytes_received,
            f.units_dropped,
            f.samples,
            inst,
            avg,
            f.dropped_pkts,
            f.retransmits,
            f.timeouts
        );
    }
    ExitCode::SUCCESS
}
