pub mod item;
pub mod space;

pub use item::*;
pub use space::*;
