pub mod prober;
pub mod trials;
