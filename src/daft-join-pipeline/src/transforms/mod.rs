mod joining;
mod sorting;

pub use joining::{FinishCounter, JoiningTransform};
pub use sorting::{
    FinishSortingTransform, MergeSortingTransform, MergingSortedTransform,
    PartialSortingTransform,
};
