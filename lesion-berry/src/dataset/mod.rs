//! 数据集操作.

use std::path::{Path, PathBuf};

use crate::{CaseVolumes, EvalResult};

mod case_id;
mod nifti_provider;
mod summary;

pub use case_id::{list_case_ids, CaseIdParser};
pub use nifti_provider::NiftiProvider;
pub use summary::{voxel_table, CaseVoxelMetrics, SummaryJson, VoxelMetricSource};

/// 待评估的数据集.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Dataset {
    /// 自有测试集, 同时含有基线病灶与新发病灶标注.
    TestSplit,

    /// MSSEG-2 (含 MS Open Data 低分辨率子集), 只标注新发病灶.
    Msseg2,
}

impl Dataset {
    /// 全部数据集.
    pub const ALL: [Dataset; 2] = [Dataset::TestSplit, Dataset::Msseg2];
}

/// 单个数据集的标签目录与预测目录.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DatasetPaths {
    /// 真值标签目录.
    pub labels_dir: PathBuf,

    /// 模型预测目录. `summary.json` 也位于该目录下.
    pub predictions_dir: PathBuf,
}

impl DatasetPaths {
    /// 由两个目录创建.
    pub fn new(labels_dir: impl Into<PathBuf>, predictions_dir: impl Into<PathBuf>) -> Self {
        Self {
            labels_dir: labels_dir.into(),
            predictions_dir: predictions_dir.into(),
        }
    }

    /// 位于 `{用户主目录}/dataset/{name}/labels` 与 `{用户主目录}/dataset/{name}/predictions`
    /// 下的数据集. 无法获取用户主目录时返回 `None`.
    pub fn under_home(name: &str) -> Option<Self> {
        Some(Self {
            labels_dir: home_dataset_dir_with([name, "labels"])?,
            predictions_dir: home_dataset_dir_with([name, "predictions"])?,
        })
    }
}

/// 体数据加载器配置: 文件命名约定与各数据集的目录.
#[derive(Clone, Debug)]
pub struct ProviderConfig {
    /// 文件命名约定.
    pub parser: CaseIdParser,

    /// 自有测试集目录.
    pub test_split: Option<DatasetPaths>,

    /// MSSEG-2 目录.
    pub msseg2: Option<DatasetPaths>,
}

impl ProviderConfig {
    /// 获取 `dataset` 的目录配置.
    pub fn paths(&self, dataset: Dataset) -> Option<&DatasetPaths> {
        match dataset {
            Dataset::TestSplit => self.test_split.as_ref(),
            Dataset::Msseg2 => self.msseg2.as_ref(),
        }
    }
}

impl Default for ProviderConfig {
    /// 标签以 `.nii.gz` 保存, 两个数据集均位于 `{用户主目录}/dataset` 下.
    fn default() -> Self {
        Self {
            parser: CaseIdParser::nnunet_labels(),
            test_split: DatasetPaths::under_home("test"),
            msseg2: DatasetPaths::under_home("msseg2"),
        }
    }
}

/// 按病例编号与数据集提供 (真值, 预测) 体数据.
///
/// 返回的任何错误都只影响该病例.
pub trait VolumeProvider {
    /// 加载 `dataset` 中编号为 `case_id` 的病例.
    fn load(&self, case_id: &str, dataset: Dataset) -> EvalResult<CaseVolumes>;
}

impl<T: VolumeProvider + ?Sized> VolumeProvider for &T {
    #[inline]
    fn load(&self, case_id: &str, dataset: Dataset) -> EvalResult<CaseVolumes> {
        (**self).load(case_id, dataset)
    }
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
