use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use super::{VectorIndex, sort_neighbors};
use crate::error::{Error, Result};

/// 基于 usearch HNSW 图的近似内积索引
pub struct HnswIndex {
    index: Index,
    dimension: usize,
}

impl HnswIndex {
    pub fn new(dimension: usize, capacity: usize) -> Result<Self> {
        let options = IndexOptions {
            dimensions: dimension,
            metric: MetricKind::IP,
            quantization: ScalarKind::F32,
            // 此处为 usearch 默认参数
            connectivity: 32,
            expansion_add: 40,
            expansion_search: 16,
            ..Default::default()
        };
        let index = Index::new(&options).map_err(Error::index)?;
        index.reserve(capacity).map_err(Error::index)?;
        Ok(Self { index, dimension })
    }
}

impl VectorIndex for HnswIndex {
    fn ntotal(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(Error::index(format!("向量维度为 {}，索引为 {}", vector.len(), self.dimension)));
        }
        if self.index.size() >= self.index.capacity() {
            self.index.reserve(self.index.capacity().max(16) * 2).map_err(Error::index)?;
        }
        let key = self.index.size() as u64;
        self.index.add(key, vector).map_err(Error::index)
    }

    fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(Error::Consistency(format!(
                "查询向量维度为 {}，索引为 {}",
                query.len(),
                self.dimension
            )));
        }
        let ntotal = self.index.size();
        let k = k.min(ntotal);
        if k == 0 {
            return Ok(vec![]);
        }

        // 近似搜索在内积相同的候选中任意取舍，需要多取一些候选，
        // 直到第 k 个结果严格优于下一个，或者已经取回全部向量
        let mut count = ntotal.min(k + k.max(16));
        loop {
            let mut neighbors = self.search_raw(query, count)?;
            sort_neighbors(&mut neighbors);
            let settled = match (neighbors.get(k - 1), neighbors.get(k)) {
                (Some(kth), Some(next)) => kth.1 > next.1,
                _ => true,
            };
            if settled || count >= ntotal {
                neighbors.truncate(k);
                return Ok(neighbors);
            }
            count = ntotal.min(count * 2);
        }
    }
}

impl HnswIndex {
    /// 返回 usearch 找到的 count 个近邻，未排序
    fn search_raw(&self, query: &[f32], count: usize) -> Result<Vec<(usize, f32)>> {
        // 扩展因子不能小于 count，否则返回结果可能不足 count 个
        self.index.change_expansion_search(count.max(16));
        let matches = self.index.search(query, count).map_err(Error::index)?;
        // usearch 的内积距离为 1 - dot
        Ok(matches
            .keys
            .into_iter()
            .zip(matches.distances)
            .map(|(key, distance)| (key as usize, 1. - distance))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ties_keep_insertion_order() {
        let mut index = HnswIndex::new(2, 8).unwrap();
        for _ in 0..40 {
            index.add(&[0.5, 0.5]).unwrap();
        }
        index.add(&[0.1, 0.1]).unwrap();

        let result = index.search(&[1., 1.], 3).unwrap();
        assert_eq!(result, vec![(0, 1.0), (1, 1.0), (2, 1.0)]);
    }

    #[test]
    fn distinct_scores() {
        let mut index = HnswIndex::new(2, 4).unwrap();
        index.add(&[1., 0.]).unwrap();
        index.add(&[0., 1.]).unwrap();
        index.add(&[0.9, 0.1]).unwrap();

        let ids = index.search(&[1., 0.], 2).unwrap().into_iter().map(|(i, _)| i).collect::<Vec<_>>();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(index.search(&[1., 0.], 10).unwrap().len(), 3);
    }
}
