//! 程序运行函数.

use crate::result::{DatasetResult, EvaluationResult};
use lesion_berry::dataset::{list_case_ids, voxel_table, SummaryJson, VoxelMetricSource};
use lesion_berry::prelude::*;
use std::path::{Path, PathBuf};
use utils::loader;

/// 评估单个数据集: 病灶级指标, 体素级指标合并与混淆矩阵导出.
fn evaluate(
    provider: &NiftiProvider,
    dataset: Dataset,
    case_ids: &[String],
    classes: &[LesionClass],
    output: &Path,
) -> EvalResult<(CohortTable, CohortReport)> {
    let paths = provider
        .paths(dataset)
        .ok_or(EvalError::DatasetNotConfigured(dataset))?;

    let evaluator = CohortEvaluator::new(provider, dataset).with_classes(classes);
    let report = if loader::parallel_from_env() {
        evaluator.par_evaluate(case_ids)?
    } else {
        evaluator.evaluate(case_ids)?
    };

    let voxel = voxel_table(&SummaryJson::default().load(&paths.predictions_dir)?)?;
    let table = report.merged_with(&voxel)?;

    let npy = output.join(format!("{dataset:?}ConfusionMatrix.npy"));
    report.confusion.save_npy(&npy)?;
    log::info!("confusion matrix saved to {}", npy.display());

    Ok((table, report))
}

fn into_result(
    name: &'static str,
    by_resolution: bool,
    (table, report): (CohortTable, CohortReport),
) -> DatasetResult {
    DatasetResult {
        name,
        table,
        confusion: report.confusion,
        failures: report.failed_case_ids().map(str::to_string).collect(),
        by_resolution,
    }
}

fn expect_dir(dir: Option<PathBuf>, what: &str) -> EvalResult<PathBuf> {
    match dir {
        Some(d) if d.is_dir() => Ok(d),
        Some(d) => Err(EvalError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{what} directory {} does not exist", d.display()),
        ))),
        None => Err(EvalError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("cannot resolve {what} directory"),
        ))),
    }
}

/// 实际运行.
pub fn run() -> EvalResult<EvaluationResult> {
    let provider = loader::provider_from_env_or_home();
    let output = expect_dir(Some(loader::output_dir_from_env()), "output")?;

    // 测试集: 病例来自输入影像目录, 评估两类病灶.
    let images = expect_dir(loader::test_images_dir_from_env_or_home(), "test images")?;
    let test_ids = list_case_ids(&images, &CaseIdParser::nnunet_images())?;
    log::info!("test split: {} cases", test_ids.len());
    let test = evaluate(
        &provider,
        Dataset::TestSplit,
        &test_ids,
        &LesionClass::ALL,
        &output,
    )?;

    // MSSEG-2: 病例来自标签目录, 只评估新发病灶.
    let labels = expect_dir(
        loader::paths_from_env_or_home(Dataset::Msseg2).map(|p| p.labels_dir),
        "MSSEG-2 labels",
    )?;
    let msseg2_ids = list_case_ids(&labels, &CaseIdParser::nnunet_labels())?;
    log::info!("MSSEG-2: {} cases", msseg2_ids.len());
    let msseg2 = evaluate(
        &provider,
        Dataset::Msseg2,
        &msseg2_ids,
        &[LesionClass::New],
        &output,
    )?;

    Ok(EvaluationResult::from_iter([
        into_result("test split", false, test),
        into_result("MSSEG-2", true, msseg2),
    ]))
}
