use crate::define_index_newtype;

define_index_newtype!(NodeIdx);

impl NodeIdx {
    /// Position of the directed arc `(self, to)` in a flat row-major matrix.
    #[inline(always)]
    pub(crate) fn arc_index(self, to: NodeIdx, num_nodes: usize) -> usize {
        self.get() * num_nodes + to.get()
    }
}
