//! The demo's two screens.
//!
//! A screen is activated when it is shown and deactivated when it goes away. Activation acquires
//! the screen's resources in dependency order (client first, UI state last) and deactivation
//! releases them in reverse. [`EncoderScreen::render`] and [`ManifestScreen::render`] produce
//! the screen's control tree, which only includes SDK-bound controls once the state backing
//! them is live.

use std::fmt;

pub mod encoder;
pub mod manifest;

pub use encoder::EncoderScreen;
pub use manifest::ManifestScreen;

/// A control provided by the SDK's UI kit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    EncoderVideo,
    CameraButton,
    MicrophoneButton,
    FullscreenButton,
    SettingsButton,
    EncoderVideoDeviceSelect,
    EncoderAudioDeviceSelect,
    EncoderResolutionSelect,
    TestMicButton,
    PlayerGetSoundButton,
    PlayerVideo,
    PlayerPlayButton,
    PlayerAudioButton,
    PlayerVolumeRange,
    PlayerBitrateButton,
    PlayerFullscreenButton,
    PlayerOverlayButton,
}

impl fmt::Display for Control {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlBarVariant {
    Encoder,
    Player,
}

/// One node of a rendered screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Heading(String),
    TextInput { placeholder: String, value: String },
    Button(String),
    JoinBroadcastButton { stream_name: String },
    Control(Control),
    MediaContainer(Vec<Node>),
    ControlBar {
        variant: ControlBarVariant,
        children: Vec<Node>,
    },
    SettingsSidebar(Vec<Node>),
}

impl Node {
    fn children(&self) -> &[Node] {
        match self {
            Node::MediaContainer(children)
            | Node::ControlBar { children, .. }
            | Node::SettingsSidebar(children) => children,
            _ => &[],
        }
    }

    /// Depth-first search for `control`.
    pub fn contains(&self, control: Control) -> bool {
        *self == Node::Control(control) || self.children().iter().any(|c| c.contains(control))
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}", "", indent = depth * 2)?;
        match self {
            Node::Heading(text) => writeln!(f, "Heading {text:?}")?,
            Node::TextInput { placeholder, value } => {
                writeln!(f, "TextInput placeholder={placeholder:?} value={value:?}")?
            }
            Node::Button(label) => writeln!(f, "Button {label:?}")?,
            Node::JoinBroadcastButton { stream_name } => {
                writeln!(f, "JoinBroadcastButton streamName={stream_name:?}")?
            }
            Node::Control(control) => writeln!(f, "{control}")?,
            Node::MediaContainer(_) => writeln!(f, "MediaContainer")?,
            Node::ControlBar { variant, .. } => writeln!(f, "ControlBar {variant:?}")?,
            Node::SettingsSidebar(_) => writeln!(f, "SettingsSidebar")?,
        }
        for child in self.children() {
            child.write_tree(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

/// Display adapter for a whole rendered screen.
pub struct Layout<'a>(pub &'a [Node]);

impl fmt::Display for Layout<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return writeln!(f, "(nothing rendered)");
        }
        for node in self.0 {
            node.write_tree(f, 0)?;
        }
        Ok(())
    }
}
