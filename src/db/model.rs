/// 数据库中的一行特征向量记录
#[derive(sqlx::FromRow)]
pub struct EmbeddingRow {
    /// 自增 ID，从 1 开始
    pub id: i64,
    /// 图片名，通常为内容标识
    pub name: String,
    /// 按本机字节序排列的 f32 数组
    pub embedding: Vec<u8>,
}

/// 解码后的特征向量记录
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRecord {
    /// 记录 ID，一经分配不会改变
    pub id: i64,
    /// 用于在图片归档中查找原图的名称
    pub display_name: String,
    /// 特征向量
    pub embedding: Vec<f32>,
}
