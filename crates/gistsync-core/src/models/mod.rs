pub mod snippet;
pub mod sync_state;
