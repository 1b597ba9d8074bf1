use std::collections::HashMap;

use lesion_berry::prelude::*;
use ndarray::Array3;

const SHAPE: Idx3d = (3, 6, 6);

/// 内存中的病例集合.
#[derive(Default)]
struct InMemory {
    cases: HashMap<String, (Array3<u8>, Array3<u8>)>,
}

impl InMemory {
    fn insert(&mut self, id: &str, truth: &[(Idx3d, u8)], pred: &[(Idx3d, u8)]) {
        let paint = |on: &[(Idx3d, u8)]| {
            let mut data = Array3::<u8>::zeros(SHAPE);
            for (p, v) in on {
                data[*p] = *v;
            }
            data
        };
        self.cases.insert(id.to_string(), (paint(truth), paint(pred)));
    }
}

impl VolumeProvider for InMemory {
    fn load(&self, case_id: &str, _dataset: Dataset) -> EvalResult<CaseVolumes> {
        let (truth, pred) = self
            .cases
            .get(case_id)
            .ok_or_else(|| EvalError::Io(std::io::ErrorKind::NotFound.into()))?;
        CaseVolumes::new(truth.clone().into(), pred.clone().into())
    }
}

fn provider() -> InMemory {
    let mut p = InMemory::default();
    // c1: 一个新发病灶被完整命中, 一个基线病灶被漏检.
    p.insert(
        "c1",
        &[((0, 0, 0), NEW), ((0, 0, 1), NEW), ((2, 5, 5), BASAL)],
        &[((0, 0, 1), NEW)],
    );
    // c2: 没有任何新发病灶, 预测出一个假阳性.
    p.insert("c2", &[((1, 1, 1), BASAL)], &[((1, 1, 1), BASAL), ((2, 4, 0), NEW)]);
    p
}

fn voxel_metrics(ids: &[&str]) -> CohortTable {
    let mut t = CohortTable::new(["b_Dice", "new_Dice", "new_n_ref"]);
    for id in ids {
        t.push_row(
            *id,
            vec![
                Some(Cell::Float(0.5)),
                Some(Cell::NotApplicable),
                Some(Cell::Float(0.0)),
            ],
        )
        .unwrap();
    }
    t
}

#[test]
fn test_cohort_merge() {
    let _ = simple_logger::SimpleLogger::new().init();

    let p = provider();
    let report = CohortEvaluator::new(&p, Dataset::TestSplit)
        .evaluate(&["c1", "c2"])
        .unwrap();
    assert!(report.failures.is_empty());

    let merged = report.merged_with(&voxel_metrics(&["c2", "c1"])).unwrap();
    assert_eq!(merged.len(), 2);
    assert_eq!(merged.columns().len(), 3 + 12);
    assert_eq!(merged.columns()[0], "b_Dice");
    assert_eq!(merged.get("c1", "new_lesion_tp"), Some(Cell::Int(1)));
    assert_eq!(merged.get("c1", "basal_lesion_fn"), Some(Cell::Int(1)));
    assert_eq!(merged.get("c2", "new_lesion_fp"), Some(Cell::Int(1)));
    assert_eq!(merged.get("c2", "new_lesion_F1"), Some(Cell::Float(0.0)));
    assert_eq!(merged.get("c2", "basal_lesion_F1"), Some(Cell::Float(1.0)));

    // 按真值新发病灶个数拆分.
    let (zero, positive) = merged.split_by_zero("n_ref_new_lesions").unwrap();
    assert_eq!(zero.case_ids().collect::<Vec<_>>(), vec!["c2"]);
    assert_eq!(positive.case_ids().collect::<Vec<_>>(), vec!["c1"]);

    let new_only = positive.select_containing("new_");
    assert!(new_only.columns().iter().all(|c| c.contains("new_")));
    assert_eq!(new_only.columns().len(), 2 + 6);
}

#[test]
fn test_cohort_merge_key_mismatch() {
    let p = provider();
    let report = CohortEvaluator::new(&p, Dataset::TestSplit)
        .evaluate(&["c1", "c2"])
        .unwrap();

    let err = report.merged_with(&voxel_metrics(&["c1"])).unwrap_err();
    assert!(matches!(err, EvalError::MergeKeyMismatch(ref id) if id == "c2"));

    let err = report
        .merged_with(&voxel_metrics(&["c1", "c2", "c3"]))
        .unwrap_err();
    assert!(matches!(err, EvalError::MergeKeyMismatch(ref id) if id == "c3"));

    // 单类别结果表之间同样严格合并.
    let basal = report.table(LesionClass::Basal).unwrap();
    let new = report.table(LesionClass::New).unwrap();
    let new_c1 = new.filter_case_id("c1");
    assert!(matches!(
        basal.merge(&new_c1),
        Err(EvalError::MergeKeyMismatch(_))
    ));
}

#[test]
fn test_failed_cases_are_excluded() {
    let mut p = provider();
    p.cases.insert(
        "c3".to_string(),
        (Array3::zeros(SHAPE), Array3::zeros((3, 6, 5))),
    );
    let report = CohortEvaluator::new(&p, Dataset::Msseg2)
        .with_classes(&[LesionClass::New])
        .evaluate(&["c1", "c2", "c3", "c4"])
        .unwrap();

    assert_eq!(report.failed_case_ids().collect::<Vec<_>>(), vec!["c3", "c4"]);
    assert!(report
        .failures
        .iter()
        .all(|f| f.error.is_case_local()));

    // 体素级指标中含有失败病例, 合并前被剔除.
    let merged = report
        .merged_with(&voxel_metrics(&["c1", "c2", "c3", "c4"]))
        .unwrap();
    assert_eq!(merged.case_ids().collect::<Vec<_>>(), vec!["c1", "c2"]);

    // 混淆矩阵只包含成功病例.
    let voxels = (SHAPE.0 * SHAPE.1 * SHAPE.2) as u64;
    assert_eq!(report.confusion.total(), 2 * voxels);
    assert_eq!(report.confusion.get(NEW, NEW), 1);
    assert_eq!(report.confusion.get(NEW, BACKGROUND), 1);
    assert_eq!(report.confusion.get(BASAL, BASAL), 1);
    assert_eq!(report.confusion.get(BASAL, BACKGROUND), 1);
    assert_eq!(report.confusion.get(BACKGROUND, NEW), 1);
}

#[test]
fn test_describe_subset() {
    let p = provider();
    let report = CohortEvaluator::new(&p, Dataset::Msseg2)
        .with_classes(&[LesionClass::New])
        .evaluate(&["c1", "c2"])
        .unwrap();
    let table = report.lesion_table().unwrap();

    let summary = table.describe();
    let f1 = summary
        .iter()
        .find(|s| s.column == "new_lesion_F1")
        .unwrap();
    assert_eq!(f1.count, 2);
    assert_eq!(f1.min, Some(0.0));
    assert_eq!(f1.max, Some(1.0));
    assert!((f1.mean.unwrap() - 0.5).abs() < 1e-12);

    assert!(table.filter_case_id("patient").is_empty());
}
