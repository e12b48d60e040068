/// A cached value together with the metadata its shard's policy keeps for it.
pub(crate) struct Entry<V, M> {
    pub(crate) value: V,
    pub(crate) meta: M,
}

impl<V, M> Entry<V, M> {
    pub(crate) fn new(value: V, meta: M) -> Self {
        Self { value, meta }
    }

    pub(crate) fn value(&self) -> &V {
        &self.value
    }

    pub(crate) fn into_value(self) -> V {
        self.value
    }
}
