//! 基于本地 nifti 文件的体数据加载器.

use std::collections::HashMap;
use std::path::PathBuf;

use super::{CaseIdParser, Dataset, DatasetPaths, ProviderConfig, VolumeProvider};
use crate::{CaseVolumes, EvalError, EvalResult};

/// 从 `{labels_dir}/{case_id}.nii.gz` 与 `{predictions_dir}/{case_id}.nii.gz`
/// 加载病例. 文件名由 [`CaseIdParser::file_name`] 生成.
#[derive(Clone, Debug, Default)]
pub struct NiftiProvider {
    parser: CaseIdParser,
    paths: HashMap<Dataset, DatasetPaths>,
}

impl NiftiProvider {
    /// 创建尚未配置任何数据集的加载器.
    pub fn new(parser: CaseIdParser) -> Self {
        Self {
            parser,
            paths: HashMap::new(),
        }
    }

    /// 由配置创建. 配置中缺失的数据集保持未配置状态.
    pub fn from_config(config: ProviderConfig) -> Self {
        let mut ans = Self::new(config.parser);
        for dataset in Dataset::ALL {
            let paths = match dataset {
                Dataset::TestSplit => config.test_split.clone(),
                Dataset::Msseg2 => config.msseg2.clone(),
            };
            if let Some(p) = paths {
                ans.paths.insert(dataset, p);
            }
        }
        ans
    }

    /// 配置 `dataset` 的目录.
    pub fn with_dataset(mut self, dataset: Dataset, paths: DatasetPaths) -> Self {
        self.paths.insert(dataset, paths);
        self
    }

    /// 获取 `dataset` 的目录配置.
    #[inline]
    pub fn paths(&self, dataset: Dataset) -> Option<&DatasetPaths> {
        self.paths.get(&dataset)
    }

    /// 病例 `case_id` 的 (真值, 预测) 文件路径.
    ///
    /// `dataset` 未配置时返回 `EvalError::DatasetNotConfigured`.
    pub fn case_paths(&self, case_id: &str, dataset: Dataset) -> EvalResult<(PathBuf, PathBuf)> {
        let paths = self
            .paths(dataset)
            .ok_or(EvalError::DatasetNotConfigured(dataset))?;
        let name = self.parser.file_name(case_id);
        Ok((paths.labels_dir.join(&name), paths.predictions_dir.join(&name)))
    }
}

impl VolumeProvider for NiftiProvider {
    fn load(&self, case_id: &str, dataset: Dataset) -> EvalResult<CaseVolumes> {
        let (truth, pred) = self.case_paths(case_id, dataset)?;
        CaseVolumes::open(truth, pred)
    }
}

#[cfg(test)]
mod tests {
    use super::NiftiProvider;
    use crate::dataset::{CaseIdParser, Dataset, DatasetPaths, ProviderConfig, VolumeProvider};
    use crate::EvalError;
    use std::path::Path;

    fn provider(root: &Path) -> NiftiProvider {
        NiftiProvider::new(CaseIdParser::nnunet_labels()).with_dataset(
            Dataset::Msseg2,
            DatasetPaths::new(root.join("labels"), root.join("predictions")),
        )
    }

    #[test]
    fn test_case_paths() {
        let p = provider(Path::new("/data"));
        let (truth, pred) = p.case_paths("patient03", Dataset::Msseg2).unwrap();
        assert_eq!(truth, Path::new("/data/labels/patient03.nii.gz"));
        assert_eq!(pred, Path::new("/data/predictions/patient03.nii.gz"));

        let err = p.case_paths("013", Dataset::TestSplit).unwrap_err();
        assert!(matches!(err, EvalError::DatasetNotConfigured(Dataset::TestSplit)));
        assert!(!err.is_case_local());
    }

    #[test]
    fn test_missing_file_is_case_local() {
        let dir = tempfile::tempdir().unwrap();
        let err = provider(dir.path()).load("013", Dataset::Msseg2).unwrap_err();
        assert!(err.is_case_local());
    }

    #[test]
    fn test_from_config() {
        let config = ProviderConfig {
            parser: CaseIdParser::nnunet_labels(),
            test_split: Some(DatasetPaths::new("/t/l", "/t/p")),
            msseg2: None,
        };
        let p = NiftiProvider::from_config(config);
        assert!(p.paths(Dataset::TestSplit).is_some());
        assert!(p.paths(Dataset::Msseg2).is_none());
    }
}
