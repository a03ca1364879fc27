pub mod roster;
pub mod snapshot;

pub use roster::Roster;
pub use snapshot::PlayerSnapshot;
