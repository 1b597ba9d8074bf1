//! 对 `lesion-berry::dataset` 的更一层封装. 提供更直接的数据集加载器.

use lesion_berry::dataset::{
    self, CaseIdParser, Dataset, DatasetPaths, NiftiProvider, ProviderConfig,
};
use std::env;
use std::path::PathBuf;

/// 1. 若环境变量 `var` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/{parts}`. 无法获取用户主目录时返回 `None`.
fn dir_from_env_or_home(var: &str, parts: &[&str]) -> Option<PathBuf> {
    match env::var(var) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => dataset::home_dataset_dir_with(parts),
    }
}

/// 获取测试集输入影像路径, 用于列出测试集病例.
///
/// 1. 若环境变量 `$LESION_TEST_IMAGES_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/test/images`.
pub fn test_images_dir_from_env_or_home() -> Option<PathBuf> {
    dir_from_env_or_home("LESION_TEST_IMAGES_DIR", &["test", "images"])
}

/// 获取测试集标签与预测路径.
///
/// 分别来自 `$LESION_TEST_LABELS_DIR` 与 `$LESION_TEST_PREDICTIONS_DIR`,
/// 缺省为 `$HOME/dataset/test/labels` 与 `$HOME/dataset/test/predictions`.
pub fn test_split_from_env_or_home() -> Option<DatasetPaths> {
    Some(DatasetPaths::new(
        dir_from_env_or_home("LESION_TEST_LABELS_DIR", &["test", "labels"])?,
        dir_from_env_or_home("LESION_TEST_PREDICTIONS_DIR", &["test", "predictions"])?,
    ))
}

/// 获取 MSSEG-2 标签与预测路径.
///
/// 分别来自 `$LESION_MSSEG2_LABELS_DIR` 与 `$LESION_MSSEG2_PREDICTIONS_DIR`,
/// 缺省为 `$HOME/dataset/msseg2/labels` 与 `$HOME/dataset/msseg2/predictions`.
pub fn msseg2_from_env_or_home() -> Option<DatasetPaths> {
    Some(DatasetPaths::new(
        dir_from_env_or_home("LESION_MSSEG2_LABELS_DIR", &["msseg2", "labels"])?,
        dir_from_env_or_home("LESION_MSSEG2_PREDICTIONS_DIR", &["msseg2", "predictions"])?,
    ))
}

/// 获取结果输出路径.
///
/// 1. 若环境变量 `$LESION_OUTPUT_DIR` 非空, 则返回其值;
/// 2. 否则, 返回当前目录.
pub fn output_dir_from_env() -> PathBuf {
    match env::var("LESION_OUTPUT_DIR") {
        Ok(d) if !d.is_empty() => PathBuf::from(d),
        _ => PathBuf::from("."),
    }
}

/// 是否并发评估各病例.
///
/// 仅当环境变量 `$LESION_PARALLEL` 为 `1`, `true` 或 `yes` (不区分大小写) 时返回 `true`.
pub fn parallel_from_env() -> bool {
    env::var("LESION_PARALLEL").map_or(false, |v| flag_enabled(&v))
}

fn flag_enabled(v: &str) -> bool {
    matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes")
}

/// 从环境变量或者 `$HOME/dataset` 读取的加载器配置.
pub fn config_from_env_or_home() -> ProviderConfig {
    ProviderConfig {
        parser: CaseIdParser::nnunet_labels(),
        test_split: test_split_from_env_or_home(),
        msseg2: msseg2_from_env_or_home(),
    }
}

/// 从环境变量或者 `$HOME/dataset` 下创建 nifti 体数据加载器.
#[inline]
pub fn provider_from_env_or_home() -> NiftiProvider {
    NiftiProvider::from_config(config_from_env_or_home())
}

/// 获取 `dataset` 的目录配置. 未配置时返回 `None`.
pub fn paths_from_env_or_home(dataset: Dataset) -> Option<DatasetPaths> {
    match dataset {
        Dataset::TestSplit => test_split_from_env_or_home(),
        Dataset::Msseg2 => msseg2_from_env_or_home(),
    }
}
