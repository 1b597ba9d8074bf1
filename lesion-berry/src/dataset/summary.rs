//! nnU-Net `summary.json` 体素级指标解析.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use super::CaseIdParser;
use crate::cohort::{Cell, CohortTable};
use crate::consts::{LesionClass, SUMMARY_JSON};
use crate::EvalResult;

/// 单个病例的体素级指标: 类别标签 -> 指标名 -> 取值.
///
/// 取值为 `None` 代表该指标无定义 (文件中为 `NaN` 或 `null`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CaseVoxelMetrics {
    /// 病例编号.
    pub case_id: String,

    /// 按类别标签组织的指标.
    pub by_class: BTreeMap<u8, BTreeMap<String, Option<f64>>>,
}

/// 体素级指标来源.
pub trait VoxelMetricSource {
    /// 从 `location` 读取所有病例的体素级指标, 保持文件中的病例顺序.
    fn load(&self, location: &Path) -> EvalResult<Vec<CaseVoxelMetrics>>;
}

#[derive(Deserialize)]
struct RawSummary {
    metric_per_case: Vec<RawCase>,
}

#[derive(Deserialize)]
struct RawCase {
    prediction_file: String,
    #[serde(default)]
    metrics: BTreeMap<String, BTreeMap<String, Option<f64>>>,
}

/// nnU-Net 评估输出 `summary.json` 的解析器.
///
/// 只使用其中的 `metric_per_case[].prediction_file` 与 `metric_per_case[].metrics`.
#[derive(Clone, Debug, Default)]
pub struct SummaryJson {
    parser: CaseIdParser,
}

impl SummaryJson {
    /// 用 `parser` 从 `prediction_file` 推导病例编号.
    pub fn new(parser: CaseIdParser) -> Self {
        Self { parser }
    }

    /// 解析 `summary.json` 的文本内容.
    ///
    /// # 注意
    ///
    /// 1. nnU-Net 会把无定义的指标写为 `NaN`, 解析时视作 `None`.
    /// 2. 无法解析为 `u8` 的类别键会被跳过.
    pub fn parse_str(&self, text: &str) -> EvalResult<Vec<CaseVoxelMetrics>> {
        let raw: RawSummary = serde_json::from_str(&replace_non_finite(text))?;
        raw.metric_per_case
            .into_iter()
            .map(|case| -> EvalResult<CaseVoxelMetrics> {
                let case_id = self.parser.parse(&case.prediction_file)?;
                let by_class = case
                    .metrics
                    .into_iter()
                    .filter_map(|(k, v)| match k.parse::<u8>() {
                        Ok(label) => Some((label, v)),
                        Err(_) => {
                            log::debug!("{case_id}: skip metric group `{k}`");
                            None
                        }
                    })
                    .collect();
                Ok(CaseVoxelMetrics { case_id, by_class })
            })
            .collect()
    }
}

impl VoxelMetricSource for SummaryJson {
    /// `location` 为目录时读取其中的 `summary.json`, 否则将其视为文件本身.
    fn load(&self, location: &Path) -> EvalResult<Vec<CaseVoxelMetrics>> {
        let path = if location.is_dir() {
            Cow::Owned(location.join(SUMMARY_JSON))
        } else {
            Cow::Borrowed(location)
        };
        log::info!("loading voxel metrics from {}", path.display());
        self.parse_str(&fs::read_to_string(&*path)?)
    }
}

/// 将字符串以外的 `NaN`, `Infinity` 与 `-Infinity` 替换为 `null`.
fn replace_non_finite(text: &str) -> Cow<'_, str> {
    const TOKENS: [&str; 3] = ["-Infinity", "Infinity", "NaN"];
    if !TOKENS.iter().any(|t| text.contains(t)) {
        return Cow::Borrowed(text);
    }

    let mut ans = String::with_capacity(text.len());
    let (mut in_string, mut escaped) = (false, false);
    let mut rest = text;
    while let Some(c) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
        } else if c == '"' {
            in_string = true;
        } else if let Some(t) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            ans.push_str("null");
            rest = &rest[t.len()..];
            continue;
        }
        ans.push(c);
        rest = &rest[c.len_utf8()..];
    }
    Cow::Owned(ans)
}

/// 将体素级指标展开为结果表. 基线病灶 (类别 1) 的指标以 `b_` 为前缀,
/// 新发病灶 (类别 2) 的指标以 `new_` 为前缀, 其他类别被忽略.
///
/// 列为所有病例中出现过的 (类别, 指标) 组合, 先按类别再按指标名排序.
/// 病例缺少某类别或某指标时, 对应单元格缺失.
pub fn voxel_table(cases: &[CaseVoxelMetrics]) -> EvalResult<CohortTable> {
    let mut keys: Vec<(LesionClass, &str)> = Vec::new();
    for class in LesionClass::ALL {
        let mut names: Vec<&str> = cases
            .iter()
            .filter_map(|c| c.by_class.get(&class.label()))
            .flat_map(|m| m.keys().map(String::as_str))
            .collect();
        names.sort_unstable();
        names.dedup();
        keys.extend(names.into_iter().map(|n| (class, n)));
    }

    let mut table = CohortTable::new(
        keys.iter()
            .map(|(class, name)| format!("{}{name}", class.voxel_prefix())),
    );
    for case in cases {
        let cells = keys
            .iter()
            .map(|(class, name)| {
                let value = case.by_class.get(&class.label())?.get(*name)?;
                Some(match value {
                    Some(v) if v.is_finite() => Cell::Float(*v),
                    _ => Cell::NotApplicable,
                })
            })
            .collect();
        table.push_row(case.case_id.as_str(), cells)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::{replace_non_finite, voxel_table, SummaryJson, VoxelMetricSource};
    use crate::cohort::Cell;
    use crate::dataset::CaseIdParser;
    use crate::EvalError;

    const SUMMARY: &str = r#"{
        "foreground_mean": {"Dice": 0.5},
        "metric_per_case": [
            {
                "metrics": {
                    "1": {"Dice": 0.8, "n_ref": 120},
                    "2": {"Dice": NaN, "n_ref": 0}
                },
                "prediction_file": "/res/pred/013.nii.gz",
                "reference_file": "/res/labels/013.nii.gz"
            },
            {
                "metrics": {
                    "2": {"Dice": 0.5, "n_ref": 40},
                    "mean": {"Dice": 0.5}
                },
                "prediction_file": "/res/pred/patient02.nii.gz",
                "reference_file": "/res/labels/NaN.nii.gz"
            }
        ]
    }"#;

    #[test]
    fn test_replace_non_finite() {
        assert_eq!(replace_non_finite("[1, 2]"), "[1, 2]");
        assert_eq!(
            replace_non_finite(r#"{"a": NaN, "b": -Infinity, "NaN": "x\"NaN"}"#),
            r#"{"a": null, "b": null, "NaN": "x\"NaN"}"#
        );
    }

    #[test]
    fn test_parse_summary() {
        let cases = SummaryJson::default().parse_str(SUMMARY).unwrap();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].case_id, "013");
        assert_eq!(cases[0].by_class[&1]["Dice"], Some(0.8));
        assert_eq!(cases[0].by_class[&2]["Dice"], None);
        assert_eq!(cases[1].case_id, "patient02");
        assert_eq!(cases[1].by_class.len(), 1);
    }

    #[test]
    fn test_voxel_table() {
        let cases = SummaryJson::default().parse_str(SUMMARY).unwrap();
        let t = voxel_table(&cases).unwrap();
        assert_eq!(t.columns(), ["b_Dice", "b_n_ref", "new_Dice", "new_n_ref"]);
        assert_eq!(t.get("013", "b_n_ref"), Some(Cell::Float(120.0)));
        assert_eq!(t.get("013", "new_Dice"), Some(Cell::NotApplicable));
        assert_eq!(t.get("patient02", "new_Dice"), Some(Cell::Float(0.5)));
        // 没有基线病灶指标: 单元格缺失.
        assert_eq!(t.get("patient02", "b_Dice"), None);
        assert!(t.row("patient02").is_some());
    }

    #[test]
    fn test_bad_prediction_file() {
        let text = r#"{"metric_per_case": [{"metrics": {}, "prediction_file": "x.nii"}]}"#;
        let err = SummaryJson::new(CaseIdParser::nnunet_labels())
            .parse_str(text)
            .unwrap_err();
        assert!(matches!(err, EvalError::CaseId(_)));

        let err = SummaryJson::default().parse_str("{}").unwrap_err();
        assert!(matches!(err, EvalError::Summary(_)));
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("summary.json"), SUMMARY).unwrap();
        let source = SummaryJson::default();
        let from_dir = source.load(dir.path()).unwrap();
        let from_file = source.load(&dir.path().join("summary.json")).unwrap();
        assert_eq!(from_dir, from_file);
        assert!(source.load(&dir.path().join("missing.json")).is_err());
    }
}
