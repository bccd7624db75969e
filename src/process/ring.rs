/*!
 * Process Ring
 *
 * Circular dispatch order over the live process control records.
 *
 * # Layout
 *
 * - **Arena**: every PCR lives in `slots` at its job index for the whole run;
 *   removal only unlinks it, so indices stay stable
 * - **Links**: each PCR holds the slot index of its successor
 * - **Cursor**: `active` is the dispatched node, `predecessor` the node whose
 *   link points at it, which makes unlinking the active node O(1)
 *
 * A ring of one node links to itself.
 */

use super::types::Pcr;
use crate::config::JobSpec;
use crate::core::types::JobIndex;

/// Circular ordered collection of live PCRs
#[derive(Debug, Clone)]
pub struct ProcessRing {
    slots: Vec<Pcr>,
    active: Option<usize>,
    predecessor: usize,
    live: usize,
}

impl ProcessRing {
    /// One PCR per specification, linked in input order, first job active
    pub fn build<I>(specs: I) -> Self
    where
        I: IntoIterator<Item = JobSpec>,
    {
        let specs: Vec<JobSpec> = specs.into_iter().collect();
        let count = specs.len();
        let slots: Vec<Pcr> = specs
            .into_iter()
            .enumerate()
            .map(|(index, spec)| Pcr::new(index, spec, (index + 1) % count))
            .collect();

        Self {
            slots,
            active: (count > 0).then_some(0),
            predecessor: count.saturating_sub(1),
            live: count,
        }
    }

    /// Number of live PCRs
    #[inline]
    pub fn len(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether exactly one PCR remains and links to itself
    #[inline]
    pub fn is_single(&self) -> bool {
        self.live == 1
    }

    pub fn active(&self) -> Option<&Pcr> {
        self.active.map(|slot| &self.slots[slot])
    }

    pub fn active_mut(&mut self) -> Option<&mut Pcr> {
        let slot = self.active?;
        Some(&mut self.slots[slot])
    }

    /// The node whose link points at the active node
    pub fn predecessor(&self) -> Option<&Pcr> {
        self.active.map(|_| &self.slots[self.predecessor])
    }

    /// Any PCR by job index, live or removed
    pub fn get(&self, index: JobIndex) -> Option<&Pcr> {
        self.slots.get(index)
    }

    /// All PCRs in launch order, including removed ones
    pub fn records(&self) -> impl Iterator<Item = &Pcr> {
        self.slots.iter()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut Pcr> {
        self.slots.iter_mut()
    }

    /// Move to the next live node. The old active node survived its quantum,
    /// so it becomes the predecessor.
    pub fn advance(&mut self) {
        if let Some(current) = self.active {
            self.predecessor = current;
            self.active = Some(self.slots[current].next);
        }
    }

    /// Unlink the active node and make its successor active.
    ///
    /// The predecessor is unchanged: it now links to the new active node.
    /// Returns the job index of the removed node.
    pub fn remove_active(&mut self) -> Option<JobIndex> {
        let current = self.active?;
        let removed = self.slots[current].index();
        self.live -= 1;

        if self.live == 0 {
            self.active = None;
            return Some(removed);
        }

        let successor = self.slots[current].next;
        self.slots[self.predecessor].next = successor;
        self.slots[current].next = current;
        self.active = Some(successor);
        Some(removed)
    }

    /// Live job indices in dispatch order, starting at the active node
    pub fn live_order(&self) -> Vec<JobIndex> {
        let mut order = Vec::with_capacity(self.live);
        let Some(start) = self.active else {
            return order;
        };
        let mut cursor = start;
        for _ in 0..self.live {
            order.push(self.slots[cursor].index());
            cursor = self.slots[cursor].next;
        }
        order
    }

    /// Verify the links form one cycle over exactly the live nodes and that
    /// the predecessor links to the active node.
    pub fn check_integrity(&self) -> Result<(), String> {
        let Some(start) = self.active else {
            return if self.live == 0 {
                Ok(())
            } else {
                Err(format!("{} live nodes but no active node", self.live))
            };
        };

        let mut cursor = start;
        for step in 0..self.live {
            cursor = self.slots[cursor].next;
            if cursor == start && step + 1 != self.live {
                return Err(format!(
                    "cycle closed after {} nodes, expected {}",
                    step + 1,
                    self.live
                ));
            }
        }
        if cursor != start {
            return Err(format!("no cycle back to active after {} nodes", self.live));
        }
        if self.slots[self.predecessor].next != start {
            return Err(format!(
                "predecessor {} links to {}, not active {}",
                self.predecessor, self.slots[self.predecessor].next, start
            ));
        }
        Ok(())
    }
}
