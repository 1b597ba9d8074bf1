//! 评估程序依赖的通用组件.

use log::LevelFilter;
use simple_logger::SimpleLogger;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
pub fn sep_to<W: std::io::Write>(mut w: W) -> std::io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 初始化日志. 默认等级为 `Info`, 可由环境变量 `$RUST_LOG` 覆盖.
///
/// 重复初始化时什么也不做.
pub fn init_logger() {
    if SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .env()
        .init()
        .is_err()
    {
        log::debug!("logger already initialized");
    }
}
