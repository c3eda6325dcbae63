//! Server-owned client identity bookkeeping
//!
//! The registry hands out identities on first contact and tracks the set of
//! identities it has seen. The set is used only for connection counting and
//! logging, never for authorization. The server wraps it in a mutex scoped
//! exactly to the read-modify-write in [`ClientRegistry::observe`].

use std::collections::BTreeSet;

/// Result of presenting a client id to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Observation {
    /// The identity the exchange proceeds under (assigned or echoed)
    pub client_id: u32,
    /// Whether this identity was added to the connected set
    pub is_new: bool,
    /// Size of the connected set after the observation
    pub total_connected: usize,
}

/// Monotonic identity allocator plus the set of identities seen
#[derive(Debug)]
pub struct ClientRegistry {
    next_id: u32,
    seen: BTreeSet<u32>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            seen: BTreeSet::new(),
        }
    }

    /// Observe the id presented in a PENDING message.
    ///
    /// `0` means unassigned: allocate the next unused integer. A non-zero
    /// id never seen before (a client that kept its id across a server
    /// restart) is recorded as a new connection, and the counter is bumped
    /// past it so a later allocation cannot collide.
    pub fn observe(&mut self, presented: u32) -> Observation {
        if presented == 0 {
            let assigned = self.next_id;
            self.next_id += 1;
            self.seen.insert(assigned);
            return Observation {
                client_id: assigned,
                is_new: true,
                total_connected: self.seen.len(),
            };
        }
        let is_new = self.seen.insert(presented);
        if is_new && presented >= self.next_id {
            self.next_id = presented + 1;
        }
        Observation {
            client_id: presented,
            is_new,
            total_connected: self.seen.len(),
        }
    }

    /// Number of distinct identities seen
    pub fn connected(&self) -> usize {
        self.seen.len()
    }
}

impl Default for ClientRegistry {
    fn default() -> Self {
        Self::new()
    }
}
