mod filled_join_step;
mod join_step;
mod sort_for_join_step;

pub use filled_join_step::FilledJoinStep;
pub use join_step::JoinStep;
pub use sort_for_join_step::{sort_description_for_keys, SortForJoinStep};
