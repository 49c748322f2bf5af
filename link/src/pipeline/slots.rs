use super::Row;

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Pending,
    Filled(Vec<Row>),
    /// The shard failed; contributes nothing but no longer blocks later slots.
    Failed,
}

/// Fixed-length slot array for one dataset load.
///
/// The merged dataset is `initial` followed by every settled slot in index
/// order, stopping at the first slot still pending.
#[derive(Debug, Clone)]
pub struct ShardSlots {
    initial: Vec<Row>,
    slots: Vec<Slot>,
}

impl ShardSlots {
    pub fn new(initial: Vec<Row>, count: usize) -> Self {
        Self {
            initial,
            slots: vec![Slot::Pending; count],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store the rows of shard `index`. Returns `false` if the index is out
    /// of range or the slot was already settled.
    pub fn fill(&mut self, index: usize, rows: Vec<Row>) -> bool {
        self.settle(index, Slot::Filled(rows))
    }

    pub fn fail(&mut self, index: usize) -> bool {
        self.settle(index, Slot::Failed)
    }

    fn settle(&mut self, index: usize, value: Slot) -> bool {
        match self.slots.get_mut(index) {
            Some(slot) if *slot == Slot::Pending => {
                *slot = value;
                true
            }
            _ => false,
        }
    }

    pub fn filled_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| matches!(s, Slot::Filled(_)))
            .count()
    }

    /// Every slot holds rows.
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(|s| matches!(s, Slot::Filled(_)))
    }

    /// No slot is pending any more.
    pub fn is_settled(&self) -> bool {
        self.slots.iter().all(|s| *s != Slot::Pending)
    }

    pub fn merged(&self) -> Vec<Row> {
        let mut merged = self.initial.clone();
        for slot in &self.slots {
            match slot {
                Slot::Pending => break,
                Slot::Filled(rows) => merged.extend(rows.iter().cloned()),
                Slot::Failed => {}
            }
        }
        merged
    }
}
