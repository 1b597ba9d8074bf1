//! 队列评估: 逐病例计算病灶级指标, 汇总为按病例编号组织的结果表,
//! 并累加全局体素混淆矩阵.

mod table;

pub use table::{Cell, CohortTable, ColumnSummary, RowView};

use crate::confusion::ConfusionMatrix;
use crate::consts::LesionClass;
use crate::dataset::{Dataset, VolumeProvider};
use crate::metrics::{lesion_counts, LesionCounts};
use crate::{EvalError, EvalResult};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
    }
}

/// 用 `class` 类的病灶级计数构造结果表.
///
/// `rows` 中病例编号重复时返回 `EvalError::DuplicateCase`.
pub fn lesion_table<'a, I>(class: LesionClass, rows: I) -> EvalResult<CohortTable>
where
    I: IntoIterator<Item = (&'a str, LesionCounts)>,
{
    let mut table = CohortTable::new(LesionCounts::columns(class));
    for (case_id, counts) in rows {
        table.push_row(case_id, counts.cells())?;
    }
    Ok(table)
}

/// 被跳过的病例及其原因.
#[derive(Debug)]
pub struct CaseFailure {
    /// 病例编号.
    pub case_id: String,

    /// 失败原因. 总是满足 [`EvalError::is_case_local`].
    pub error: EvalError,
}

/// 一次队列评估的全部结果.
#[derive(Debug, Default)]
pub struct CohortReport {
    /// 每个病灶类别一张结果表, 顺序与评估时指定的类别顺序一致.
    pub tables: Vec<(LesionClass, CohortTable)>,

    /// 所有成功病例的体素混淆矩阵之和.
    pub confusion: ConfusionMatrix,

    /// 失败病例, 按输入顺序排列. 它们不出现在任何结果表中.
    pub failures: Vec<CaseFailure>,
}

impl CohortReport {
    /// 获取 `class` 类的结果表.
    pub fn table(&self, class: LesionClass) -> Option<&CohortTable> {
        self.tables.iter().find(|(c, _)| *c == class).map(|(_, t)| t)
    }

    /// 失败病例编号.
    pub fn failed_case_ids(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.case_id.as_str())
    }

    /// 按病例编号合并所有类别的结果表.
    pub fn lesion_table(&self) -> EvalResult<CohortTable> {
        CohortTable::merge_all(self.tables.iter().map(|(_, t)| t))
    }

    /// 将体素级指标表 `voxel` 与所有类别的结果表按病例编号严格合并.
    /// 结果中体素级指标列在前.
    ///
    /// 失败病例会先从 `voxel` 中剔除; 此后任何只出现在一侧的病例编号都会导致
    /// `EvalError::MergeKeyMismatch`.
    pub fn merged_with(&self, voxel: &CohortTable) -> EvalResult<CohortTable> {
        let lesion = self.lesion_table()?;
        voxel.without_cases(self.failed_case_ids()).merge(&lesion)
    }
}

/// 单个成功病例的评估结果.
struct CaseOutcome {
    counts: Vec<LesionCounts>,
    confusion: ConfusionMatrix,
}

/// 队列评估器.
///
/// 通过 `provider` 逐个加载 `dataset` 中的病例, 对每个类别计算病灶级计数.
pub struct CohortEvaluator<'a, P: VolumeProvider + ?Sized> {
    provider: &'a P,
    dataset: Dataset,
    classes: Vec<LesionClass>,
}

impl<'a, P: VolumeProvider + ?Sized> CohortEvaluator<'a, P> {
    /// 评估全部病灶类别.
    pub fn new(provider: &'a P, dataset: Dataset) -> Self {
        Self {
            provider,
            dataset,
            classes: LesionClass::ALL.to_vec(),
        }
    }

    /// 只评估 `classes` 中的类别, 结果表按该顺序排列. 重复项会被忽略.
    pub fn with_classes(mut self, classes: &[LesionClass]) -> Self {
        self.classes.clear();
        for c in classes {
            if !self.classes.contains(c) {
                self.classes.push(*c);
            }
        }
        self
    }

    /// 待评估的数据集.
    #[inline]
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// 待评估的类别.
    #[inline]
    pub fn classes(&self) -> &[LesionClass] {
        &self.classes
    }

    fn evaluate_case(&self, case_id: &str) -> EvalResult<CaseOutcome> {
        let case = self.provider.load(case_id, self.dataset)?;
        let counts = self
            .classes
            .iter()
            .map(|c| lesion_counts(&case, *c))
            .collect::<EvalResult<Vec<_>>>()?;
        let mut confusion = ConfusionMatrix::new();
        confusion.accumulate_case(&case)?;
        log::debug!("{case_id}: shape = {:?}, counts = {counts:?}", case.shape());
        Ok(CaseOutcome { counts, confusion })
    }

    /// 按输入顺序组装结果. 遇到第一个非单病例错误时中止.
    fn assemble<'s, I>(&self, outcomes: I) -> EvalResult<CohortReport>
    where
        I: IntoIterator<Item = (&'s str, EvalResult<CaseOutcome>)>,
    {
        let mut rows: Vec<(&str, Vec<LesionCounts>)> = Vec::new();
        let mut report = CohortReport::default();

        for (case_id, outcome) in outcomes {
            match outcome {
                Ok(o) => {
                    report.confusion.merge(&o.confusion);
                    rows.push((case_id, o.counts));
                }
                Err(e) if e.is_case_local() => {
                    log::warn!("skip case {case_id}: {e}");
                    report.failures.push(CaseFailure {
                        case_id: case_id.to_string(),
                        error: e,
                    });
                }
                Err(e) => return Err(e),
            }
        }

        for (i, class) in self.classes.iter().enumerate() {
            let table = lesion_table(*class, rows.iter().map(|(id, c)| (*id, c[i])))?;
            log::info!("{class} lesion table: {} cases", table.len());
            report.tables.push((*class, table));
        }
        log::info!(
            "{:?}: {} cases evaluated, {} failed",
            self.dataset,
            rows.len(),
            report.failures.len()
        );
        Ok(report)
    }

    /// 顺序评估 `case_ids` 中的所有病例.
    ///
    /// # 注意
    ///
    /// 1. 加载失败, 形状不一致或体素值非法的病例会被记录在
    ///   [`CohortReport::failures`] 中, 评估继续进行.
    /// 2. 匹配计数守恒被破坏, 或病例编号重复时, 整个评估中止.
    pub fn evaluate<S: AsRef<str>>(&self, case_ids: &[S]) -> EvalResult<CohortReport> {
        log::info!("evaluating {} cases of {:?}", case_ids.len(), self.dataset);
        self.assemble(case_ids.iter().map(|id| {
            let id = id.as_ref();
            (id, self.evaluate_case(id))
        }))
    }
}

/// 并发操作部分
#[cfg(feature = "rayon")]
impl<'a, P: VolumeProvider + Sync + ?Sized> CohortEvaluator<'a, P> {
    /// 借助 `rayon` 并行评估 `case_ids` 中的所有病例.
    ///
    /// 结果与 [`CohortEvaluator::evaluate`] 完全一致: 行序与输入顺序相同,
    /// 混淆矩阵的累加与顺序无关.
    pub fn par_evaluate<S: AsRef<str> + Sync>(&self, case_ids: &[S]) -> EvalResult<CohortReport> {
        log::info!(
            "evaluating {} cases of {:?} in parallel",
            case_ids.len(),
            self.dataset
        );
        let outcomes: Vec<_> = case_ids
            .par_iter()
            .map(|id| self.evaluate_case(id.as_ref()))
            .collect();
        self.assemble(case_ids.iter().map(|id| id.as_ref()).zip(outcomes))
    }
}
