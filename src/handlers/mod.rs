pub mod items;
pub mod sales;
pub mod spaces;
