pub mod intrusive_list;
pub mod purge_queue;
pub mod slot_arena;
pub mod type_set;

pub use intrusive_list::IntrusiveList;
pub use purge_queue::{DrainLimit, DrainTicket, PurgeQueue};
pub use slot_arena::{SlotArena, SlotId};
pub use type_set::TypeSet;
