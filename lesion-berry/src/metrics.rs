//! 单病例、单类别的病灶级检测指标.

use serde::{Deserialize, Serialize};

use crate::cohort::Cell;
use crate::consts::LesionClass;
use crate::matching::match_instances;
use crate::{CaseVolumes, EvalError, EvalResult, InstanceId, InstanceMap, LabelVolume};

/// 检测 F1: `2·TP / (2·TP + FP + FN)`.
///
/// 分母为 0 (即 TP = FP = FN = 0, 两侧都没有该类病灶) 时无定义, 返回 `None`.
/// 其余情况下结果位于 \[0, 1\].
#[inline]
pub fn f1_score(tp: u32, fp: u32, fn_: u32) -> Option<f64> {
    let denom = 2 * tp as u64 + fp as u64 + fn_ as u64;
    (denom != 0).then(|| 2.0 * tp as f64 / denom as f64)
}

/// 单病例、单类别的病灶级计数.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct LesionCounts {
    /// 真值实例个数.
    pub n_truth: InstanceId,

    /// 预测实例个数.
    pub n_pred: InstanceId,

    /// 被命中的真值实例个数.
    pub true_positive: u32,

    /// 未命中任何真值的预测实例个数.
    pub false_positive: u32,

    /// 未被任何预测命中的真值实例个数.
    pub false_negative: u32,
}

impl LesionCounts {
    /// 检测 F1. 见 [`f1_score`].
    #[inline]
    pub fn f1(&self) -> Option<f64> {
        f1_score(self.true_positive, self.false_positive, self.false_negative)
    }

    /// 病灶级结果表中 `class` 类的列名, 与 [`LesionCounts::cells`] 一一对应.
    pub fn columns(class: LesionClass) -> Vec<String> {
        let c = class.name();
        vec![
            format!("n_ref_{c}_lesions"),
            format!("n_pred_{c}_lesions"),
            format!("{c}_lesion_tp"),
            format!("{c}_lesion_fp"),
            format!("{c}_lesion_fn"),
            format!("{c}_lesion_F1"),
        ]
    }

    /// 病灶级结果表中的一行数据.
    pub fn cells(&self) -> Vec<Option<Cell>> {
        let f1 = match self.f1() {
            Some(f) => Cell::Float(f),
            None => Cell::NotApplicable,
        };
        vec![
            Some(Cell::Int(self.n_truth as u64)),
            Some(Cell::Int(self.n_pred as u64)),
            Some(Cell::Int(self.true_positive as u64)),
            Some(Cell::Int(self.false_positive as u64)),
            Some(Cell::Int(self.false_negative as u64)),
            Some(f1),
        ]
    }
}

/// 计算 `truth` 与 `pred` 在 `class` 类上的病灶级计数.
///
/// 流程: 二值化 -> 26-邻域实例提取 -> 预测编号偏移 -> 重叠匹配 -> 守恒检查.
pub fn lesion_counts_of(
    truth: &LabelVolume,
    pred: &LabelVolume,
    class: LesionClass,
) -> EvalResult<LesionCounts> {
    if truth.shape() != pred.shape() {
        return Err(EvalError::ShapeMismatch(truth.shape(), pred.shape()));
    }
    let truth = InstanceMap::from_volume(truth, class);
    let pred = InstanceMap::from_volume(pred, class).reconciled(truth.count());
    let sets = match_instances(&truth, &pred)?;
    Ok(sets.counts(truth.count(), pred.count()))
}

/// 计算单个病例在 `class` 类上的病灶级计数.
#[inline]
pub fn lesion_counts(case: &CaseVolumes, class: LesionClass) -> EvalResult<LesionCounts> {
    lesion_counts_of(&case.truth, &case.pred, class)
}
