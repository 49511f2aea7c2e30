use ndarray::{Array2, ArrayView1, Axis};

use super::{VectorIndex, sort_neighbors};
use crate::error::{Error, Result};

/// 暴力搜索的内积索引，结果精确
pub struct FlatIndex {
    data: Array2<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self { data: Array2::zeros((0, dimension)) }
    }

    pub fn dimension(&self) -> usize {
        self.data.ncols()
    }
}

impl VectorIndex for FlatIndex {
    fn ntotal(&self) -> usize {
        self.data.nrows()
    }

    fn add(&mut self, vector: &[f32]) -> Result<()> {
        self.data
            .push(Axis(0), ArrayView1::from(vector))
            .map_err(|e| Error::index(format!("添加向量失败: {e}")))
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension() {
            return Err(Error::Consistency(format!(
                "查询向量维度为 {}，索引为 {}",
                query.len(),
                self.dimension()
            )));
        }
        let scores = self.data.dot(&ArrayView1::from(query));
        let mut neighbors = scores.into_iter().enumerate().collect::<Vec<_>>();
        sort_neighbors(&mut neighbors);
        neighbors.truncate(k);
        Ok(neighbors)
    }
}
