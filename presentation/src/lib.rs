pub mod cli;
pub mod renderer;
