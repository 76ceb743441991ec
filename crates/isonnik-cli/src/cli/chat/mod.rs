//! Interactive chat in the terminal: the session renderer, slash commands
//! and the loop. Entry point: `loop_runner::run_chat_loop`.

pub mod banner;
pub mod commands;
pub mod input;
pub mod loop_runner;
pub mod renderer;
