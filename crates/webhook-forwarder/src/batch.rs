//! In-progress batch buffer.

/// Upper bound on records preallocated per batch.
const MAX_PREALLOCATED: usize = 1024;

/// Records accumulated since the last flush, in arrival order.
#[derive(Debug)]
pub struct BatchBuffer<R> {
    records: Vec<R>,
    batch_size: usize,
}

impl<R> BatchBuffer<R> {
    /// `batch_size` of 0 means the buffer never reports itself full.
    pub fn new(batch_size: usize) -> Self {
        Self {
            records: Vec::with_capacity(initial_capacity(batch_size)),
            batch_size,
        }
    }

    pub fn push(&mut self, record: R) {
        self.records.push(record);
    }

    /// Whether the size trigger has been reached.
    pub fn is_full(&self) -> bool {
        self.batch_size > 0 && self.records.len() >= self.batch_size
    }

    /// Take the buffered records, leaving the buffer empty.
    pub fn take(&mut self) -> Vec<R> {
        std::mem::replace(
            &mut self.records,
            Vec::with_capacity(initial_capacity(self.batch_size)),
        )
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn initial_capacity(batch_size: usize) -> usize {
    batch_size.min(MAX_PREALLOCATED)
}
