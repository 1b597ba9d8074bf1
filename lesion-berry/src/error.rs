//! 运行时错误.

use thiserror::Error;

use crate::dataset::Dataset;
use crate::{Idx3d, InstanceId};

/// 评估流程中的所有错误.
#[derive(Debug, Error)]
pub enum EvalError {
    /// 真值体数据与预测体数据形状不一致. 依次为真值形状, 预测形状.
    #[error("shape mismatch: ground truth {0:?}, prediction {1:?}")]
    ShapeMismatch(Idx3d, Idx3d),

    /// 匹配结果不满足计数守恒. 说明匹配算法本身有缺陷.
    #[error(
        "invariant violated on {side} side: {matched} matched + {unmatched} unmatched != {instances} instances"
    )]
    InvariantViolation {
        /// "ground truth" 或 "prediction".
        side: &'static str,
        /// 该侧被命中的实例数.
        matched: usize,
        /// 该侧未命中的实例数.
        unmatched: usize,
        /// 该侧的实例总数.
        instances: InstanceId,
    },

    /// 合并结果表时, 某个病例编号只出现在一侧.
    #[error("case `{0}` is missing from one side of the merge")]
    MergeKeyMismatch(String),

    /// 合并结果表时, 两侧出现同名列.
    #[error("column `{0}` exists on both sides of the merge")]
    DuplicateColumn(String),

    /// 追加到结果表的单元格个数与列数不一致. 依次为列数, 单元格个数.
    #[error("row has {1} cells, table has {0} columns")]
    CellCountMismatch(usize, usize),

    /// 同一张结果表中出现重复病例编号.
    #[error("case `{0}` appears more than once")]
    DuplicateCase(String),

    /// 体素值不在标签字母表 {0, 1, 2} 内.
    #[error("voxel label {0} is out of range")]
    LabelOutOfRange(u8),

    /// 文件名不符合病例命名约定.
    #[error("cannot derive a case id from `{0}`")]
    CaseId(String),

    /// 数据集未配置路径.
    #[error("dataset {0:?} is not configured")]
    DatasetNotConfigured(Dataset),

    /// nifti 文件内容不是合法的 3D 标签体数据.
    #[error("malformed volume: {0}")]
    MalformedVolume(String),

    /// nifti 文件读取或解码错误.
    #[error("volume: {0}")]
    Volume(#[from] nifti::NiftiError),

    /// `summary.json` 解析错误.
    #[error("summary: {0}")]
    Summary(#[from] serde_json::Error),

    /// npy 写入错误.
    #[error("npy: {0}")]
    Npy(#[from] ndarray_npy::WriteNpyError),

    /// 其他底层 I/O 错误.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl EvalError {
    /// 该错误是否只影响单个病例?
    ///
    /// 为 `true` 时, 队列评估会记录该病例失败并继续;
    /// 否则中止整个评估.
    pub fn is_case_local(&self) -> bool {
        matches!(
            self,
            Self::ShapeMismatch(..)
                | Self::LabelOutOfRange(_)
                | Self::MalformedVolume(_)
                | Self::Volume(_)
                | Self::Io(_)
        )
    }
}

/// 评估运行时结果.
pub type EvalResult<T> = Result<T, EvalError>;
