mod async_task;
pub mod autosave;
mod batch;
mod canvas;
mod editor;
mod gateway;
mod history;
mod image_utils;
pub mod keyboard;
mod mask;
mod notify;
pub mod project;
mod session;
pub mod storage;
mod stroke;

pub use async_task::*;
pub use batch::*;
pub use canvas::*;
pub use editor::*;
pub use gateway::*;
pub use history::*;
pub use image_utils::*;
pub use mask::*;
pub use notify::*;
pub use session::*;
pub use stroke::*;

#[cfg(not(target_arch = "wasm32"))]
pub use storage::file::FileStore;
pub use storage::in_memory::InMemoryStore;
