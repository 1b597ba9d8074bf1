//! 由文件名推导病例编号.

use std::fs;
use std::path::Path;

use itertools::Itertools;

use crate::consts::{CHANNEL_0000, NII_GZ};
use crate::{EvalError, EvalResult};

/// 文件命名约定: `{case_id}{channel_suffix}{extension}`.
///
/// nnU-Net 的输入影像形如 `013_0000.nii.gz`, 标签与预测形如 `013.nii.gz`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CaseIdParser {
    extension: String,
    channel_suffix: Option<String>,
}

impl CaseIdParser {
    /// 只有扩展名, 没有通道后缀的命名约定.
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            channel_suffix: None,
        }
    }

    /// 追加通道后缀.
    pub fn with_channel_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.channel_suffix = Some(suffix.into());
        self
    }

    /// nnU-Net 输入影像: `{case_id}_0000.nii.gz`.
    #[inline]
    pub fn nnunet_images() -> Self {
        Self::new(NII_GZ).with_channel_suffix(CHANNEL_0000)
    }

    /// nnU-Net 标签及预测: `{case_id}.nii.gz`.
    #[inline]
    pub fn nnunet_labels() -> Self {
        Self::new(NII_GZ)
    }

    /// 扩展名.
    #[inline]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// 通道后缀.
    #[inline]
    pub fn channel_suffix(&self) -> Option<&str> {
        self.channel_suffix.as_deref()
    }

    /// 从路径或文件名 `file` 中解析病例编号. 路径中的目录部分会被忽略.
    ///
    /// 文件名不以约定的后缀结尾, 或去掉后缀后为空时, 返回 `EvalError::CaseId`.
    pub fn parse(&self, file: &str) -> EvalResult<String> {
        let name = file.rsplit(['/', '\\']).next().unwrap_or(file);
        let stem = name
            .strip_suffix(self.extension.as_str())
            .ok_or_else(|| EvalError::CaseId(file.to_string()))?;
        let stem = match self.channel_suffix.as_deref() {
            Some(suffix) => stem
                .strip_suffix(suffix)
                .ok_or_else(|| EvalError::CaseId(file.to_string()))?,
            None => stem,
        };
        if stem.is_empty() {
            return Err(EvalError::CaseId(file.to_string()));
        }
        Ok(stem.to_string())
    }

    /// 病例 `case_id` 对应的文件名.
    pub fn file_name(&self, case_id: &str) -> String {
        format!(
            "{case_id}{}{}",
            self.channel_suffix.as_deref().unwrap_or(""),
            self.extension
        )
    }
}

impl Default for CaseIdParser {
    #[inline]
    fn default() -> Self {
        Self::nnunet_labels()
    }
}

/// 列出目录 `dir` 下所有符合命名约定的病例编号, 按字典序排列并去重.
/// 不符合约定的文件 (如 `summary.json`) 以及子目录会被跳过.
pub fn list_case_ids<P: AsRef<Path>>(dir: P, parser: &CaseIdParser) -> EvalResult<Vec<String>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str().map(|n| parser.parse(n)) {
            Some(Ok(id)) => ids.push(id),
            _ => log::debug!("skip {:?}", entry.path()),
        }
    }
    Ok(ids.into_iter().sorted_unstable().dedup().collect())
}
