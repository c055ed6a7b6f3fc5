/// "分割数据已修改" 通知. 渲染层据此只重新上传被修改的切片.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentationDataModified {
    /// 被修改的分割.
    pub segmentation_id: String,

    /// 被修改的 `k` 切片, 升序且无重复.
    pub modified_slices: Vec<usize>,
}

/// 通知的接收方.
pub trait SegmentationEvents {
    /// 接收一次修改通知.
    fn data_modified(&mut self, event: SegmentationDataModified);
}

/// 记录所有通知, 主要用于测试.
impl SegmentationEvents for Vec<SegmentationDataModified> {
    #[inline]
    fn data_modified(&mut self, event: SegmentationDataModified) {
        self.push(event);
    }
}

/// 丢弃所有通知.
impl SegmentationEvents for () {
    #[inline]
    fn data_modified(&mut self, _: SegmentationDataModified) {}
}
