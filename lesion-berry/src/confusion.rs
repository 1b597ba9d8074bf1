//! 全局体素级混淆矩阵.

use std::ops::AddAssign;
use std::path::Path;

use ndarray::{Array2, ArrayView3, Zip};
use serde::{Deserialize, Serialize};

use crate::consts::{label, LABEL_ALPHABET_LEN};
use crate::{CaseVolumes, EvalError, EvalResult};

const N: usize = LABEL_ALPHABET_LEN;

/// 标签字母表 {0, 1, 2} 上的 3×3 混淆矩阵.
///
/// 第 `i` 行第 `j` 列为真值为 `i`、预测为 `j` 的体素个数.
/// 累加满足交换律, 病例的累加顺序不影响结果.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[u64; N]; N],
}

impl AddAssign<&ConfusionMatrix> for ConfusionMatrix {
    fn add_assign(&mut self, rhs: &ConfusionMatrix) {
        for (row, other) in self.counts.iter_mut().zip(rhs.counts.iter()) {
            for (a, b) in row.iter_mut().zip(other.iter()) {
                *a += *b;
            }
        }
    }
}

impl ConfusionMatrix {
    /// 全零矩阵.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 将 `truth` 与 `pred` 逐体素累加进矩阵.
    ///
    /// 形状不一致时返回 `EvalError::ShapeMismatch`; 出现字母表外的体素值时
    /// 返回 `EvalError::LabelOutOfRange`. 出错时矩阵保持不变.
    pub fn accumulate(&mut self, truth: ArrayView3<u8>, pred: ArrayView3<u8>) -> EvalResult<()> {
        if truth.dim() != pred.dim() {
            return Err(EvalError::ShapeMismatch(truth.dim(), pred.dim()));
        }
        let mut local = Self::new();
        let mut bad: Option<u8> = None;
        Zip::from(&truth).and(&pred).for_each(|&t, &p| {
            if label::is_valid(t) && label::is_valid(p) {
                local.counts[t as usize][p as usize] += 1;
            } else if bad.is_none() {
                bad = Some(if label::is_valid(t) { p } else { t });
            }
        });
        if let Some(v) = bad {
            return Err(EvalError::LabelOutOfRange(v));
        }
        *self += &local;
        Ok(())
    }

    /// 将单个病例累加进矩阵.
    #[inline]
    pub fn accumulate_case(&mut self, case: &CaseVolumes) -> EvalResult<()> {
        self.accumulate(case.truth.data(), case.pred.data())
    }

    /// 合并另一个矩阵.
    #[inline]
    pub fn merge(&mut self, other: &ConfusionMatrix) {
        *self += other;
    }

    /// 真值为 `truth`、预测为 `pred` 的体素个数. 越界时 panic.
    #[inline]
    pub fn get(&self, truth: u8, pred: u8) -> u64 {
        self.counts[truth as usize][pred as usize]
    }

    /// 体素总数.
    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// 对角线体素个数 / 体素总数. 空矩阵返回 `None`.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        let diag: u64 = (0..N).map(|i| self.counts[i][i]).sum();
        (total != 0).then(|| diag as f64 / total as f64)
    }

    /// 转换为 `ndarray` 矩阵.
    pub fn to_array(&self) -> Array2<u64> {
        Array2::from_shape_fn((N, N), |(i, j)| self.counts[i][j])
    }

    /// 以 npy 格式保存到 `path`.
    pub fn save_npy<P: AsRef<Path>>(&self, path: P) -> EvalResult<()> {
        ndarray_npy::write_npy(path, &self.to_array())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ConfusionMatrix;
    use crate::EvalError;
    use ndarray::{array, Array3};
    use ndarray_npy::read_npy;

    fn vol(values: &[u8]) -> Array3<u8> {
        Array3::from_shape_vec((1, 1, values.len()), values.to_vec()).unwrap()
    }

    #[test]
    fn test_accumulate() {
        let mut cm = ConfusionMatrix::new();
        cm.accumulate(vol(&[0, 0, 1, 2, 2]).view(), vol(&[0, 1, 1, 2, 0]).view())
            .unwrap();
        assert_eq!(cm.get(0, 0), 1);
        assert_eq!(cm.get(0, 1), 1);
        assert_eq!(cm.get(1, 1), 1);
        assert_eq!(cm.get(2, 2), 1);
        assert_eq!(cm.get(2, 0), 1);
        assert_eq!(cm.total(), 5);
        assert!((cm.accuracy().unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(ConfusionMatrix::new().accuracy(), None);
    }

    #[test]
    fn test_order_independent() {
        let cases = [
            (vol(&[0, 1, 2]), vol(&[2, 1, 0])),
            (vol(&[1, 1, 0, 0]), vol(&[1, 0, 0, 2])),
            (vol(&[2]), vol(&[2])),
        ];
        let mut forward = ConfusionMatrix::new();
        for (t, p) in cases.iter() {
            forward.accumulate(t.view(), p.view()).unwrap();
        }
        let mut backward = ConfusionMatrix::new();
        for (t, p) in cases.iter().rev() {
            backward.accumulate(t.view(), p.view()).unwrap();
        }
        assert_eq!(forward, backward);

        let mut merged = ConfusionMatrix::new();
        for (t, p) in cases.iter() {
            let mut part = ConfusionMatrix::new();
            part.accumulate(t.view(), p.view()).unwrap();
            merged.merge(&part);
        }
        assert_eq!(forward, merged);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut cm = ConfusionMatrix::new();
        let err = cm
            .accumulate(vol(&[0, 3]).view(), vol(&[0, 0]).view())
            .unwrap_err();
        assert!(matches!(err, EvalError::LabelOutOfRange(3)));
        assert_eq!(cm, ConfusionMatrix::new());

        let err = cm
            .accumulate(vol(&[0]).view(), vol(&[0, 0]).view())
            .unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch(..)));
    }

    #[test]
    fn test_save_npy() {
        let mut cm = ConfusionMatrix::new();
        cm.accumulate(vol(&[0, 1, 2, 2]).view(), vol(&[0, 1, 2, 1]).view())
            .unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cm.npy");
        cm.save_npy(&path).unwrap();

        let back: ndarray::Array2<u64> = read_npy(&path).unwrap();
        assert_eq!(back, array![[1u64, 0, 0], [0, 1, 0], [0, 1, 1]]);
        assert_eq!(back, cm.to_array());
    }
}
