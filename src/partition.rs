/// A contiguous slice of top-level row indices owned by one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partition {
    pub start: usize,
    pub end: usize,
}

impl Partition {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split `[0, total)` into at most `workers` contiguous partitions by
/// integer division, folding the remainder into the last one. Partitions
/// that would be empty are dropped, so the result covers the range exactly
/// with no overlap.
pub fn split(total: usize, workers: usize) -> Vec<Partition> {
    assert!(workers >= 1, "worker count must be at least 1");
    let chunk = total / workers;
    let mut partitions = Vec::with_capacity(workers);
    for i in 0..workers {
        let start = i * chunk;
        let end = if i == workers - 1 { total } else { start + chunk };
        if end > start {
            partitions.push(Partition { start, end });
        }
    }
    partitions
}

// ── Tests ──
