pub mod render;
pub mod state;

pub use render::render;
pub use state::{StadiumView, ViewEvent, ViewState};
