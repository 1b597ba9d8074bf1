use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::{EvalError, EvalResult, Idx3d};

/// nii 格式的 3D 标签体数据 (真值或模型预测). 标签值以 `u8` 保存,
/// 按 (z, H, W) 组织.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelVolume {
    data: Array3<u8>,
}

impl Index<Idx3d> for LabelVolume {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl From<Array3<u8>> for LabelVolume {
    #[inline]
    fn from(data: Array3<u8>) -> Self {
        Self::from_array(data)
    }
}

impl LabelVolume {
    /// 打开 nii 文件格式的 3D 标签. `path` 为 nii 文件的本地路径. 如果打开成功,
    /// 则返回 `Ok(Self)`, 否则返回 `Err`.
    ///
    /// 预测结果可能以浮点数保存, 读取时会被转换为 `u8`.
    pub fn open<P: AsRef<Path>>(path: P) -> EvalResult<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let [_, w, h, z, ..] = obj.header().dim;
        let shape = (z as usize, h as usize, w as usize);

        let data = obj.into_volume().into_ndarray::<u8>()?;
        if data.ndim() != 3 {
            return Err(EvalError::MalformedVolume(format!(
                "expected 3 dimensions, found {}",
                data.ndim()
            )));
        }

        // [W, H, z] -> [z, H, W]
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = data
            .permuted_axes([2, 1, 0].as_slice())
            .as_standard_layout()
            .into_owned();

        let data = Array3::<u8>::from_shape_vec(shape, data.into_raw_vec())
            .map_err(|e| EvalError::MalformedVolume(e.to_string()))?;

        Ok(Self { data })
    }

    /// 根据已按 (z, H, W) 组织的裸标签数据直接创建实体.
    ///
    /// 该方法不检查体素取值. 非法取值会在统计混淆矩阵时报错.
    #[inline]
    pub fn from_array(data: Array3<u8>) -> Self {
        Self { data }
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u8, Ix3> {
        self.data.view()
    }
}

/// 单个病例的真值标签与预测标签.
///
/// 该结构完全透明, 仅包含两个公开的 `truth` 和 `pred` 子结构.
/// 通过 [`CaseVolumes::new`] 或 [`CaseVolumes::open`] 创建时保证二者形状一致.
#[derive(Debug, Clone)]
pub struct CaseVolumes {
    /// 真值标签.
    pub truth: LabelVolume,

    /// 模型预测.
    pub pred: LabelVolume,
}

impl CaseVolumes {
    /// 组合真值与预测. 若两者形状不一致, 则返回 `EvalError::ShapeMismatch`.
    pub fn new(truth: LabelVolume, pred: LabelVolume) -> EvalResult<Self> {
        if truth.shape() != pred.shape() {
            return Err(EvalError::ShapeMismatch(truth.shape(), pred.shape()));
        }
        Ok(Self { truth, pred })
    }

    /// 分别打开 nii 文件格式的真值和预测. 如果任一文件打开失败, 或两者形状不一致,
    /// 则返回 `Err`.
    pub fn open(truth_path: impl AsRef<Path>, pred_path: impl AsRef<Path>) -> EvalResult<Self> {
        let truth = LabelVolume::open(truth_path.as_ref())?;
        let pred = LabelVolume::open(pred_path.as_ref())?;
        Self::new(truth, pred)
    }

    /// 获取数据形状大小.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.truth.shape()
    }
}

#[cfg(test)]
mod tests {
    use super::{CaseVolumes, LabelVolume};
    use crate::EvalError;
    use ndarray::{Array3, Array4};
    use nifti::writer::WriterOptions;

    /// 以 [W, H, z] 组织的 (4, 3, 2) 测试数据, 只有 [3, 1, 0] 处为 `value`.
    fn raw_whz<T: Clone + Default>(value: T) -> Array3<T> {
        let mut a = Array3::from_elem((4, 3, 2), T::default());
        a[(3, 1, 0)] = value;
        a
    }

    #[test]
    fn test_open_reorders_axes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("013.nii.gz");
        WriterOptions::new(&path).write_nifti(&raw_whz(2u8)).unwrap();

        let vol = LabelVolume::open(&path).unwrap();
        assert_eq!(vol.shape(), (2, 3, 4));
        assert_eq!(vol[(0, 1, 3)], 2);
        assert_eq!(vol.data().iter().filter(|p| **p != 0).count(), 1);
    }

    #[test]
    fn test_open_float_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let label = dir.path().join("label.nii.gz");
        let pred = dir.path().join("pred.nii.gz");
        WriterOptions::new(&label).write_nifti(&raw_whz(2u8)).unwrap();
        WriterOptions::new(&pred).write_nifti(&raw_whz(2.0f32)).unwrap();

        let case = CaseVolumes::open(&label, &pred).unwrap();
        assert_eq!(case.shape(), (2, 3, 4));
        assert_eq!(case.truth, case.pred);
    }

    #[test]
    fn test_open_rejects_4d() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("4d.nii.gz");
        WriterOptions::new(&path)
            .write_nifti(&Array4::<u8>::zeros((4, 3, 2, 2)))
            .unwrap();

        let err = LabelVolume::open(&path).unwrap_err();
        assert!(matches!(err, EvalError::MalformedVolume(_)));
        assert!(err.is_case_local());
    }

    #[test]
    fn test_case_shape_mismatch() {
        let truth = LabelVolume::from_array(Array3::zeros((2, 2, 2)));
        let pred = LabelVolume::from_array(Array3::zeros((2, 2, 3)));
        let err = CaseVolumes::new(truth, pred).unwrap_err();
        assert!(matches!(err, EvalError::ShapeMismatch((2, 2, 2), (2, 2, 3))));
        assert!(err.is_case_local());
    }
}
