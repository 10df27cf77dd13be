use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use dxf2svg_config::{AppConfig, ConfigError};
use dxf2svg_frontend::{
    ConversionRequest, DiagnosticReport, ReportFormat, convert, format_report,
};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

mod cli;

use cli::Cli;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let (config, config_error) = load_configuration(cli.config.clone());
    init_logging(&config);
    if let Some(err) = config_error {
        warn!(error = %err, "加载配置失败，使用内建默认值");
    }

    let mut request = ConversionRequest::from_config(&cli.input, &cli.output, &config);
    if let Some(layout) = cli.layout {
        request = request.with_layout(layout);
    }
    if let Some(background) = cli.background {
        request = request.with_background(background);
    }
    if let Some(line_color) = cli.line_color {
        request = request.with_line_color(line_color);
    }

    match convert(&request) {
        Ok(summary) => {
            info!(
                output = %summary.output.display(),
                layout = %summary.layout,
                paths = summary.paths,
                "SVG 已写入"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "转换失败");
            eprintln!("DXF conversion failed: {err}");
            if let Some(report) = err.report() {
                print_report(report, cli.report_format.into());
            }
            ExitCode::FAILURE
        }
    }
}

fn print_report(report: &DiagnosticReport, format: ReportFormat) {
    match format_report(report, format) {
        Ok(rendered) => eprintln!("{rendered}"),
        Err(err) => warn!(error = %err, "无法格式化诊断报告"),
    }
}

/// 显式指定的配置优先，其次自动发现。失败时返回默认配置和错误，待日志初始化后再报告。
fn load_configuration(override_path: Option<PathBuf>) -> (AppConfig, Option<ConfigError>) {
    let loaded = match override_path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::discover(),
    };
    match loaded {
        Ok(config) => (config, None),
        Err(err) => (AppConfig::default(), Some(err)),
    }
}

/// 日志写入 stderr；`RUST_LOG` 优先于配置中的等级。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
