use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VectorError {
    #[error("index {index} out of range for vector of size {size}")]
    OutOfBounds { index: usize, size: usize },
    #[error("allocation of vector of size {requested} failed")]
    OutOfMemory { requested: usize },
}

/// Owning, fixed-size buffer of doubles used as root-finder working storage.
///
/// The size is fixed at construction. `clone` copies the storage, `take`
/// moves it out and leaves an empty buffer behind. Element access through
/// [`NumericVector::get`] and [`NumericVector::set`] is bounds-checked.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericVector {
    data: Vec<f64>,
}

impl NumericVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero-initialized buffer of `size` elements.
    pub fn zeros(size: usize) -> Result<Self, VectorError> {
        let mut data = allocate(size)?;
        data.resize(size, 0.0);
        Ok(Self { data })
    }

    pub fn from_slice(values: &[f64]) -> Result<Self, VectorError> {
        let mut data = allocate(values.len())?;
        data.extend_from_slice(values);
        Ok(Self { data })
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<f64, VectorError> {
        self.range_check(index)?;
        Ok(self.data[index])
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut f64, VectorError> {
        self.range_check(index)?;
        Ok(&mut self.data[index])
    }

    pub fn set(&mut self, index: usize, value: f64) -> Result<(), VectorError> {
        *self.get_mut(index)? = value;
        Ok(())
    }

    /// Replaces the contents with a copy of `other`, reusing the storage when
    /// the sizes agree.
    pub fn assign(&mut self, other: &[f64]) -> Result<(), VectorError> {
        if self.data.len() != other.len() {
            let mut data = allocate(other.len())?;
            data.extend_from_slice(other);
            self.data = data;
        } else {
            self.data.copy_from_slice(other);
        }
        Ok(())
    }

    /// Transfers the storage out of `self`, which is left empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, f64> {
        self.data.iter_mut()
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, value| acc.max(value.abs()))
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|value| value.is_finite())
    }

    fn range_check(&self, index: usize) -> Result<(), VectorError> {
        if index >= self.data.len() {
            return Err(VectorError::OutOfBounds {
                index,
                size: self.data.len(),
            });
        }
        Ok(())
    }
}

fn allocate(size: usize) -> Result<Vec<f64>, VectorError> {
    let mut data = Vec::new();
    data.try_reserve_exact(size)
        .map_err(|_| VectorError::OutOfMemory { requested: size })?;
    Ok(data)
}

impl<'a> IntoIterator for &'a NumericVector {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &'a mut NumericVector {
    type Item = &'a mut f64;
    type IntoIter = std::slice::IterMut<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}

impl From<Vec<f64>> for NumericVector {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl<const N: usize> From<[f64; N]> for NumericVector {
    fn from(values: [f64; N]) -> Self {
        Self {
            data: values.to_vec(),
        }
    }
}

impl Display for NumericVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("(")?;
        for (index, value) in self.data.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")
    }
}
