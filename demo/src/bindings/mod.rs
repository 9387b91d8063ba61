//! Bindings between a screen and the SDK objects it owns.
//!
//! Each binding owns one [`Lifecycle`](crate::lifecycle::Lifecycle) slot and knows how to
//! create its SDK object and, more importantly, how to take it down again in the order the SDK
//! requires. Screens compose bindings; they never touch SDK objects directly.

pub mod call_state;
pub mod encoder_ui;
pub mod player_ui;
pub mod video_client;

pub use call_state::CallStateBinding;
pub use encoder_ui::EncoderUiBinding;
pub use player_ui::PlayerUiBinding;
pub use video_client::VideoClientBinding;
