//! 主程序入口
//!
//! 负责解析命令行参数、加载配置、读取拍摄时间、执行写入和显示结果。

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use exifshift::cli::{Cli, Command, ShiftArgs};
use exifshift::config::{Config, ShiftOptions};
use exifshift::date_utils;
use exifshift::exif::{ExifReader, LittleExifRewriter};
use exifshift::session::Session;
use exifshift::shifter::{BatchDateShifter, TimeOffsetPolicy, WriteMode};
use exifshift::{AppError, BatchResult, PhotoStatus, Result};

use clap::Parser;

/// 设置日志记录
fn setup_tracing(log_level: &str) {
    let level_filter = match log_level {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };

    tracing_subscriber::fmt()
        .with_max_level(level_filter)
        .with_target(false)
        .without_time()
        .init();
}

/// 保存失败文件列表
fn save_error_report(errors: &[(String, String)], report_path: &Path) -> Result<PathBuf> {
    let mut file = File::create(report_path)
        .map_err(|e: std::io::Error| AppError::file_access(report_path, e.to_string()))?;

    for (name, message) in errors {
        writeln!(file, "{}\t{}", name, message)
            .map_err(|e| AppError::file_access(report_path, e.to_string()))?;
    }

    Ok(report_path.to_path_buf())
}

/// 读取拍摄时间并计算预览
fn build_session(args: &ShiftArgs, policy: TimeOffsetPolicy) -> Result<Session<ExifReader>> {
    let paths = args.resolve_paths()?;
    let mut session = Session::new(ExifReader::new());
    session.select(&paths, date_utils::now());
    session.set_policy(policy);
    Ok(session)
}

/// 打印照片表格
fn print_table(session: &Session<ExifReader>) {
    match session.most_recent() {
        Some(latest) => {
            println!("最新照片:   {}", date_utils::format_display(Some(&latest)));
            if let Some(days) = session.days_since_most_recent() {
                println!("距今天数:   {}", days);
            }
        }
        None => println!("照片中没有找到有效的拍摄时间"),
    }
    let policy = match session.policy() {
        TimeOffsetPolicy::Automatic => "自动".to_string(),
        TimeOffsetPolicy::Manual { days } => format!("手动 {} 天", days),
    };
    println!("平移策略:   {}", policy);
    println!("时间差:     {}", date_utils::format_delta(&session.delta()));
    println!();

    let width = session
        .records()
        .iter()
        .map(|r| r.file_name().chars().count())
        .max()
        .unwrap_or(0)
        .max("File Name".len());

    println!("{:<width$}  {:<19}  {:<19}", "File Name", "Date Taken", "New Date");
    for record in session.records() {
        let new_date = match &record.status {
            PhotoStatus::Error(msg) => format!("Error: {}", msg),
            _ => date_utils::format_display(record.computed_timestamp.as_ref()),
        };
        println!(
            "{:<width$}  {:<19}  {}",
            record.file_name(),
            date_utils::format_display(record.original_timestamp.as_ref()),
            new_date
        );
    }
}

/// 打印写入统计
fn print_summary(result: &BatchResult) {
    println!("\n========== 处理统计 ==========");
    println!("总数量:     {}", result.total());
    println!("成功:       {}", result.success_count);
    println!("失败:       {}", result.error_count);
    println!("成功率:     {:.1}%", result.success_rate());

    if !result.per_file_errors.is_empty() {
        println!("\n失败的文件:");
        for (name, message) in &result.per_file_errors {
            println!("  {}: {}", name, message);
        }
    }
}

/// 执行 inspect 命令
fn inspect_command(config: &Config, args: &ShiftArgs) -> Result<()> {
    tracing::info!("执行 inspect 命令");
    let options = config.merge_cli(args);
    let session = build_session(args, options.policy)?;
    print_table(&session);
    Ok(())
}

/// 执行 apply 命令，返回是否全部成功
fn apply_command(config: &Config, args: &ShiftArgs, report: Option<&Path>) -> Result<bool> {
    tracing::info!("执行 apply 命令");
    let ShiftOptions {
        policy,
        mode,
        sync_file_time,
    } = config.merge_cli(args);

    let mut session = build_session(args, policy)?;
    print_table(&session);

    match &mode {
        WriteMode::InPlace => println!("\n写入方式:   原地修改"),
        WriteMode::CopyToFolder(dest) => println!("\n写入方式:   复制到 {}", dest.display()),
    }

    let shifter = BatchDateShifter::new(LittleExifRewriter::new()).with_sync_file_time(sync_file_time);
    let result = session.apply(&shifter, &mode)?;
    print_summary(&result);

    if let Some(report_path) = report {
        if !result.per_file_errors.is_empty() {
            let path = save_error_report(&result.per_file_errors, report_path)?;
            println!("\n失败的文件已保存到: {}", path.display());
        }
    }

    Ok(result.error_count == 0)
}

/// 执行 config 命令
fn config_command(config: &Config, config_path: &Path, validate: bool) -> Result<()> {
    if validate {
        println!("配置文件有效: {}", config_path.display());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}

fn run(cli: &Cli) -> Result<bool> {
    // 加载配置文件
    let (config_path, explicit) = cli.config_path();
    let config = Config::load(&config_path, explicit)?.apply_env_overrides();

    tracing::info!(
        "配置加载完成: mode={:?}, output_dir={}",
        config.mode,
        config.output_dir.display()
    );

    // 根据子命令执行相应操作
    match &cli.command {
        Command::Inspect { args } => {
            inspect_command(&config, args)?;
            Ok(true)
        }
        Command::Apply { args, report } => apply_command(&config, args, report.as_deref()),
        Command::Config { validate } => {
            config_command(&config, &config_path, *validate)?;
            Ok(true)
        }
    }
}

/// 主函数
fn main() -> ExitCode {
    // 解析命令行参数
    let cli = Cli::parse();

    // 设置日志
    setup_tracing(&cli.log_level);

    tracing::info!("exifshift 启动");
    tracing::debug!("日志级别: {}", cli.log_level);

    match run(&cli) {
        Ok(true) => {
            tracing::info!("程序执行完成");
            ExitCode::SUCCESS
        }
        Ok(false) => {
            tracing::warn!("部分文件处理失败");
            ExitCode::from(1)
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("错误: {}", e);
            ExitCode::from(2)
        }
    }
}
