pub mod fft;
pub mod grid;
pub mod types;
pub mod window;
