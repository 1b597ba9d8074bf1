#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 将体素级的标签/预测 3D 体数据转换为离散的病灶实例,
//! 并在整个队列 (cohort) 上计算实例级的检测指标 (TP/FP/FN 及 F1).
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 标签取值只能为 0 (背景), 1 (基线病灶) 或 2 (新发/演变病灶).
//!   其它取值在混淆矩阵统计时会被视为错误.
//! 2. 数据不一致 (形状不同, 文件缺失) 不会导致 panic,
//!   而是以 [`EvalError`] 的形式返回, 并由队列评估流程记录.
//!   唯有匹配算法自身的不变量被破坏时, 整个评估才会中止.
//!
//! # 开发计划
//!
//! ### 26-邻域三维连通分量 (病灶实例) 提取 ✅
//!
//! 实现位于 `lesion-berry/src/instance`.
//!
//! ### 真值/预测实例编号空间隔离 ✅
//!
//! 预测实例编号整体偏移真值实例个数, 保证两个编号空间不相交.
//!
//! 实现位于 `lesion-berry/src/instance`.
//!
//! ### 基于体素重叠的多对多实例匹配 ✅
//!
//! 一个预测实例可以同时命中多个真值实例, 反之亦然.
//! 每次匹配后都会检查计数守恒.
//!
//! 实现位于 `lesion-berry/src/matching.rs`.
//!
//! ### 单病例病灶级指标 & 检测 F1 ✅
//!
//! 实现位于 `lesion-berry/src/metrics.rs`.
//!
//! ### 队列评估与按病例编号合并的结果表 ✅
//!
//! 实现位于 `lesion-berry/src/cohort`.
//!
//! ### 全局体素混淆矩阵 ✅
//!
//! 实现位于 `lesion-berry/src/confusion.rs`.
//!
//! ### nnU-Net `summary.json` 体素指标解析 ✅
//!
//! 实现位于 `lesion-berry/src/dataset/summary.rs`.
//!
//! ### 多线程队列评估 ✅
//!
//! 需要打开 `rayon` feature.

/// 三维索引, 按 (z, H, W) 组织.
pub type Idx3d = (usize, usize, usize);

/// 病灶实例编号. 0 代表背景.
pub type InstanceId = u32;

mod data;
mod error;

pub mod cohort;
pub mod confusion;
pub mod consts;
pub mod dataset;
pub mod instance;
pub mod matching;
pub mod metrics;
pub mod prelude;

pub use data::{CaseVolumes, LabelVolume};
pub use error::{EvalError, EvalResult};

pub use cohort::{CohortEvaluator, CohortReport, CohortTable};
pub use confusion::ConfusionMatrix;
pub use consts::LesionClass;
pub use instance::InstanceMap;
pub use matching::MatchSets;
pub use metrics::LesionCounts;
