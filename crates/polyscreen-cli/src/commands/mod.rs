pub mod evaluate;
pub mod screen;
pub mod sort;
