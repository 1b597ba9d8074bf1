//! 评估结果.

use lesion_berry::cohort::{CohortTable, ColumnSummary};
use lesion_berry::ConfusionMatrix;
use std::io::{self, Write};

/// 按真值新发病灶个数拆分结果表所用的列.
const NEW_LESION_COUNT: &str = "n_ref_new_lesions";

/// 新发病灶相关列的列名片段.
const NEW_FRAGMENT: &str = "new_";

/// MS Open Data 低分辨率病例的编号片段.
const LOW_RES_FRAGMENT: &str = "patient";

#[inline]
fn cell_to_display(c: Option<lesion_berry::cohort::Cell>) -> String {
    match c {
        Some(c) => c.to_string(),
        None => "/".to_string(),
    }
}

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.6}"),
        None => "/".to_string(),
    }
}

/// 将 `table` 逐行写进 `w` 中.
fn table_into<W: Write>(table: &CohortTable, w: &mut W) -> io::Result<()> {
    writeln!(w, "case_id\t{}", table.columns().join("\t"))?;
    for row in table.rows() {
        let cells: Vec<String> = row.cells().map(|c| cell_to_display(*c)).collect();
        writeln!(w, "{}\t{}", row.case_id(), cells.join("\t"))?;
    }
    writeln!(w, "[{} rows x {} columns]", table.len(), table.columns().len() + 1)
}

/// 将描述性统计写进 `w` 中.
fn summary_into<W: Write>(summary: &[ColumnSummary], w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    for s in summary {
        writeln!(w, "`{}`:", s.column)?;
        writeln!(w, "{S4}count: {}", s.count)?;
        writeln!(w, "{S4}mean: {}", f64_to_display(s.mean))?;
        writeln!(w, "{S4}std: {}", f64_to_display(s.std))?;
        writeln!(w, "{S4}min: {}", f64_to_display(s.min))?;
        writeln!(w, "{S4}max: {}", f64_to_display(s.max))?;
    }
    Ok(())
}

/// 将混淆矩阵写进 `w` 中. 行为真值, 列为预测.
fn confusion_into<W: Write>(cm: &ConfusionMatrix, w: &mut W) -> io::Result<()> {
    writeln!(w, "truth \\ pred\t0\t1\t2")?;
    for t in 0..3u8 {
        writeln!(w, "{t}\t{}\t{}\t{}", cm.get(t, 0), cm.get(t, 1), cm.get(t, 2))?;
    }
    write!(w, "accuracy: {}", f64_to_display(cm.accuracy()))
}

/// 单个数据集的评估结果.
pub struct DatasetResult {
    /// 数据集名.
    pub name: &'static str,

    /// 体素级指标与病灶级指标合并后的结果表.
    pub table: CohortTable,

    /// 全局体素混淆矩阵.
    pub confusion: ConfusionMatrix,

    /// 失败病例编号.
    pub failures: Vec<String>,

    /// 是否按低分辨率子集分别描述.
    pub by_resolution: bool,
}

impl DatasetResult {
    fn write_into<W: Write>(&self, w: &mut W) -> io::Result<()> {
        writeln!(w, "Dataset `{}`: {} cases", self.name, self.table.len())?;
        if !self.failures.is_empty() {
            writeln!(w, "Skipped cases: {}", self.failures.join(", "))?;
        }

        let new_only = self.table.select_containing(NEW_FRAGMENT);
        match new_only.split_by_zero(NEW_LESION_COUNT) {
            Some((zero, positive)) => {
                writeln!(w, "Cases without new lesions:")?;
                table_into(&zero, w)?;
                writeln!(w, "Cases with new lesions:")?;
                table_into(&positive, w)?;
            }
            None => writeln!(w, "No `{NEW_LESION_COUNT}` column, subsets skipped")?,
        }

        if self.by_resolution {
            let low = new_only.filter_case_id(LOW_RES_FRAGMENT);
            let high = new_only.filter(|r| !r.case_id().contains(LOW_RES_FRAGMENT));
            writeln!(w, "Low resolution subset ({} cases):", low.len())?;
            summary_into(&low.describe(), w)?;
            writeln!(w, "High resolution subset ({} cases):", high.len())?;
            summary_into(&high.describe(), w)?;
        }

        writeln!(w, "Confusion matrix:")?;
        confusion_into(&self.confusion, w)
    }
}

/// 全部评估结果.
pub struct EvaluationResult {
    data: Vec<DatasetResult>,
}

impl EvaluationResult {
    pub fn from_iter<I: IntoIterator<Item = DatasetResult>>(it: I) -> Self {
        Self {
            data: it.into_iter().collect(),
        }
    }

    /// 打印运行结果.
    pub fn analyze(&self) -> io::Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();

        utils::sep_to(&mut lock)?;
        for result in self.data.iter() {
            result.write_into(&mut lock)?;
            writeln!(lock)?;
            utils::sep_to(&mut lock)?;
        }
        Ok(())
    }
}
