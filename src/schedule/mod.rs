mod slot;
mod timer;

pub use slot::{next_slot, wait_for_next_slot, DEFAULT_SLOT_INTERVAL};
pub use timer::{SystemTimer, Timer};

#[cfg(test)]
pub use timer::testing;
