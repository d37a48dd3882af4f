//! Role Registry: satu slot per role
//!
//! Kapasitas tepat satu process id per role. Bukan queue, bukan set.
//! Holder pertama yang masih hidup selalu menang; klaim kedua diabaikan
//! sampai holder pertama terbukti mati.

use super::liveness::Liveness;
use crate::protocol::ServiceRole;

/// Registry milik relay. Semua mutasi lewat method di sini.
#[derive(Debug)]
pub struct RoleRegistry<L> {
    slots: [Option<u32>; 3],
    liveness: L,
}

impl<L: Liveness> RoleRegistry<L> {
    /// Membuat registry kosong
    pub fn new(liveness: L) -> Self {
        Self {
            slots: [None; 3],
            liveness,
        }
    }

    /// Store `pid` iff the slot is empty or its holder is no longer live.
    ///
    /// Returns `true` when the slot now holds `pid`.
    pub fn register(&mut self, role: ServiceRole, pid: u32) -> bool {
        let slot = &mut self.slots[role.index()];
        match *slot {
            Some(held) if self.liveness.process_exists(held) => false,
            _ => {
                *slot = Some(pid);
                true
            }
        }
    }

    /// Check-and-evict lookup
    ///
    /// Mengembalikan holder hanya jika masih hidup. Jika tidak, slot
    /// dikosongkan. Jangan cache hasilnya; panggil sebelum setiap forward.
    pub fn lookup_live(&mut self, role: ServiceRole) -> Option<u32> {
        let slot = &mut self.slots[role.index()];
        let pid = (*slot)?;
        if self.liveness.process_exists(pid) {
            Some(pid)
        } else {
            *slot = None;
            None
        }
    }

    /// Clear the slot, e.g. after a send to its holder failed
    pub fn evict(&mut self, role: ServiceRole) -> Option<u32> {
        self.slots[role.index()].take()
    }

    /// Current holder without a liveness check
    #[inline(always)]
    pub fn peek(&self, role: ServiceRole) -> Option<u32> {
        self.slots[role.index()]
    }
}
