//! 测试集与 MSSEG-2 上的定量评估.
//!
//! 环境变量见 `utils::loader`.

mod result;
mod runner;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    utils::init_logger();

    let res = runner::run()?;
    res.analyze()?;
    Ok(())
}
